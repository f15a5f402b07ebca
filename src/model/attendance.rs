use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use strum_macros::{AsRefStr, EnumString};

/// Reason stored when a submission carries none.
pub const NOT_APPLICABLE: &str = "N/A";

/// Status persisted on a ledger row.
///
/// The database keeps the historical codes (`HADIR`, `IJIN`, `ALPHA`); the
/// legacy `TIDAK HADIR` code and anything unrecognised read back as `Absent`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, AsRefStr, EnumString)]
pub enum AttendanceStatus {
    #[strum(serialize = "HADIR")]
    Present,
    #[strum(serialize = "IJIN")]
    OnLeave,
    #[strum(to_string = "ALPHA", serialize = "TIDAK HADIR")]
    Absent,
}

impl AttendanceStatus {
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(AttendanceStatus::Absent)
    }
}

/// Effective status of an employee on a given day.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DayStatus {
    Recorded(AttendanceStatus),
    /// No ledger row exists for the day. Never stored.
    Unrecorded,
}

impl DayStatus {
    pub fn code(&self) -> &'static str {
        match self {
            DayStatus::Recorded(AttendanceStatus::Present) => "PRESENT",
            DayStatus::Recorded(AttendanceStatus::OnLeave) => "ON_LEAVE",
            DayStatus::Recorded(AttendanceStatus::Absent) => "ABSENT",
            DayStatus::Unrecorded => "ABSENT_UNEXCUSED",
        }
    }

    pub fn label(&self, locale: LabelLocale) -> &'static str {
        match (self, locale) {
            (DayStatus::Recorded(AttendanceStatus::Present), LabelLocale::En) => "Present",
            (DayStatus::Recorded(AttendanceStatus::OnLeave), LabelLocale::En) => "Leave",
            (_, LabelLocale::En) => "Unexcused",
            (DayStatus::Recorded(AttendanceStatus::Present), LabelLocale::Id) => "Hadir",
            (DayStatus::Recorded(AttendanceStatus::OnLeave), LabelLocale::Id) => "Izin",
            (_, LabelLocale::Id) => "Alpha",
        }
    }
}

/// Language used for human readable status labels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum LabelLocale {
    #[default]
    #[strum(serialize = "en")]
    En,
    #[strum(serialize = "id")]
    Id,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub status: AttendanceStatus,
    pub date: NaiveDate,
    pub time_in: NaiveTime,
    pub time_out: Option<NaiveTime>,
    pub photo: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub reason: String,
    pub created_at: NaiveDateTime,
}

/// A validated submission about to be written to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub employee_id: u64,
    pub status: AttendanceStatus,
    pub date: NaiveDate,
    pub time_in: NaiveTime,
    pub time_out: Option<NaiveTime>,
    pub photo: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub reason: String,
}

/// A ledger row joined with the owning employee's name.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub employee_name: String,
    pub record: AttendanceRecord,
}
