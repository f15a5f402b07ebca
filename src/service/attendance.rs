//! Attendance derivation and submission validation.
//!
//! Submissions are parsed and checked completely before anything is written;
//! a rejected submission leaves the ledger and the evidence store untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::geofence::{ensure_within, validate_coordinates};
use crate::{
    error::AttendanceError,
    model::attendance::{
        AttendanceRecord, AttendanceStatus, DayStatus, LabelLocale, NOT_APPLICABLE, NewAttendance,
    },
    store::Store,
    utils::{
        clock::Clock,
        evidence::EvidenceStore,
        time_format::{format_date, format_time, parse_date, parse_optional_time, parse_time},
    },
};

/// Shown instead of a time-out for presence rows that have none yet.
pub const NOT_CLOCKED_OUT: &str = "Not clocked out";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckInSubmission {
    #[schema(example = "2024-06-01")]
    pub date: Option<String>,
    #[schema(example = "08:00:00")]
    pub time: Option<String>,
    #[schema(example = "17:00:00", nullable = true)]
    pub time_out: Option<String>,
    /// Opaque photo payload; stored as evidence, never interpreted.
    #[schema(nullable = true)]
    pub photo: Option<String>,
    #[schema(example = json!(-6.2))]
    pub latitude: Option<f64>,
    #[schema(example = 106.8)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LeaveSubmission {
    #[schema(example = "2024-06-02")]
    pub date: Option<String>,
    #[schema(example = "07:30:00")]
    pub time: Option<String>,
    #[schema(example = "Family event")]
    pub reason: Option<String>,
    #[schema(nullable = true)]
    pub photo: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ClockOutSubmission {
    /// Defaults to today.
    #[schema(example = "2024-06-01", nullable = true)]
    pub date: Option<String>,
    #[schema(example = "17:05:00")]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DisplayRow {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Siti Rahma")]
    pub employee_name: Option<String>,
    #[schema(example = "Present")]
    pub status: String,
    #[schema(example = "PRESENT")]
    pub status_code: String,
    #[schema(example = "2024-06-01")]
    pub date: String,
    #[schema(example = "08:00:00")]
    pub time: String,
    #[schema(example = "Not clocked out")]
    pub time_out: String,
    pub photo: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[schema(example = "N/A")]
    pub reason: String,
}

/// Effective status of `employee_id` on `date`.
///
/// No record means unexcused absence. Several records for the same day are a
/// consistency violation; the most recently written one wins.
pub async fn derive_status_for_day(
    store: &dyn Store,
    employee_id: u64,
    date: NaiveDate,
) -> Result<DayStatus, AttendanceError> {
    let records = store.attendance_for_day(employee_id, date).await?;
    Ok(match most_recent(records, employee_id, date) {
        Some(record) => DayStatus::Recorded(record.status),
        None => DayStatus::Unrecorded,
    })
}

pub async fn validate_check_in(
    store: &dyn Store,
    evidence: &dyn EvidenceStore,
    employee_id: u64,
    submission: &CheckInSubmission,
) -> Result<AttendanceRecord, AttendanceError> {
    let date = parse_date("date", submission.date.as_deref())?;
    let time_in = parse_time("time", submission.time.as_deref())?;
    let time_out = parse_optional_time("time_out", submission.time_out.as_deref())?;
    if time_out.is_some_and(|out| out < time_in) {
        return Err(AttendanceError::MalformedInput {
            field: "time_out",
            reason: "is earlier than time".into(),
        });
    }

    let latitude = submission
        .latitude
        .ok_or(AttendanceError::MissingField("latitude"))?;
    let longitude = submission
        .longitude
        .ok_or(AttendanceError::MissingField("longitude"))?;
    validate_coordinates(latitude, longitude)?;

    ensure_employee(store, employee_id).await?;

    match store.active_policy().await? {
        Some(policy) => {
            let distance_m = ensure_within(&policy, latitude, longitude).inspect_err(|_| {
                info!(employee_id, latitude, longitude, "Check-in rejected: outside geofence");
            })?;
            debug!(employee_id, distance_m, "Check-in inside geofence");
        }
        None => warn!(
            employee_id,
            "Consistency violation: no location policy configured; accepting check-in without geofence"
        ),
    }

    let record = upsert_with_evidence(
        store,
        evidence,
        submission.photo.as_deref(),
        NewAttendance {
            employee_id,
            status: AttendanceStatus::Present,
            date,
            time_in,
            time_out,
            photo: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
            reason: NOT_APPLICABLE.to_string(),
        },
    )
    .await?;

    info!(employee_id, record_id = record.id, %date, "Check-in recorded");
    Ok(record)
}

pub async fn validate_leave_request(
    store: &dyn Store,
    evidence: &dyn EvidenceStore,
    employee_id: u64,
    submission: &LeaveSubmission,
) -> Result<AttendanceRecord, AttendanceError> {
    let date = parse_date("date", submission.date.as_deref())?;
    let time_in = parse_time("time", submission.time.as_deref())?;
    let reason = submission
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or(AttendanceError::MissingField("reason"))?;

    ensure_employee(store, employee_id).await?;

    let record = upsert_with_evidence(
        store,
        evidence,
        submission.photo.as_deref(),
        NewAttendance {
            employee_id,
            status: AttendanceStatus::OnLeave,
            date,
            time_in,
            time_out: None,
            photo: None,
            latitude: None,
            longitude: None,
            reason: reason.to_string(),
        },
    )
    .await?;

    info!(employee_id, record_id = record.id, %date, "Leave request recorded");
    Ok(record)
}

/// Sets the time-out on the day's presence record.
pub async fn record_clock_out(
    store: &dyn Store,
    clock: &dyn Clock,
    employee_id: u64,
    submission: &ClockOutSubmission,
) -> Result<AttendanceRecord, AttendanceError> {
    let date = match submission.date.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => parse_date("date", Some(d))?,
        _ => clock.today(),
    };
    let time_out = parse_time("time", submission.time.as_deref())?;

    let records = store.attendance_for_day(employee_id, date).await?;
    let check_in = most_recent(records, employee_id, date)
        .filter(|r| r.status == AttendanceStatus::Present)
        .ok_or(AttendanceError::NotFound("check-in for the day"))?;
    if time_out < check_in.time_in {
        return Err(AttendanceError::MalformedInput {
            field: "time",
            reason: "is earlier than the check-in time".into(),
        });
    }

    let record = store
        .set_time_out(employee_id, date, time_out)
        .await?
        .ok_or(AttendanceError::NotFound("check-in for the day"))?;

    info!(employee_id, record_id = record.id, %date, "Clock-out recorded");
    Ok(record)
}

/// The employee's own records, oldest first.
pub async fn employee_recap(
    store: &dyn Store,
    employee_id: u64,
    locale: LabelLocale,
) -> Result<Vec<DisplayRow>, AttendanceError> {
    let records = store.attendance_for_employee(employee_id).await?;
    debug!(employee_id, count = records.len(), "Recap fetched");
    Ok(records
        .iter()
        .map(|record| format_for_display(record, locale))
        .collect())
}

pub fn format_for_display(record: &AttendanceRecord, locale: LabelLocale) -> DisplayRow {
    let status = DayStatus::Recorded(record.status);
    let time_out = match (record.time_out, record.status) {
        (Some(t), _) => format_time(t),
        (None, AttendanceStatus::Present) => NOT_CLOCKED_OUT.to_string(),
        (None, _) => NOT_APPLICABLE.to_string(),
    };

    DisplayRow {
        id: record.id,
        employee_id: record.employee_id,
        employee_name: None,
        status: status.label(locale).to_string(),
        status_code: status.code().to_string(),
        date: format_date(record.date),
        time: format_time(record.time_in),
        time_out,
        photo: record.photo.clone(),
        latitude: record.latitude,
        longitude: record.longitude,
        reason: record.reason.clone(),
    }
}

fn most_recent(
    records: Vec<AttendanceRecord>,
    employee_id: u64,
    date: NaiveDate,
) -> Option<AttendanceRecord> {
    if records.len() > 1 {
        warn!(
            employee_id,
            %date,
            count = records.len(),
            "Consistency violation: several attendance records for one day; using the most recent"
        );
    }
    records.into_iter().max_by_key(|r| (r.created_at, r.id))
}

async fn ensure_employee(store: &dyn Store, employee_id: u64) -> Result<(), AttendanceError> {
    match store.find_employee(employee_id).await? {
        Some(_) => Ok(()),
        None => Err(AttendanceError::NotFound("employee")),
    }
}

async fn store_evidence(
    evidence: &dyn EvidenceStore,
    photo: Option<&str>,
) -> Result<Option<String>, AttendanceError> {
    match photo.filter(|p| !p.trim().is_empty()) {
        Some(payload) => evidence
            .store(payload)
            .await
            .map(Some)
            .map_err(AttendanceError::Evidence),
        None => Ok(None),
    }
}

/// Stores the photo, then the ledger row. The photo is removed again when the
/// row cannot be written.
async fn upsert_with_evidence(
    store: &dyn Store,
    evidence: &dyn EvidenceStore,
    photo: Option<&str>,
    mut entry: NewAttendance,
) -> Result<AttendanceRecord, AttendanceError> {
    entry.photo = store_evidence(evidence, photo).await?;

    match store.upsert_attendance(&entry).await {
        Ok(record) => Ok(record),
        Err(e) => {
            if let Some(reference) = entry.photo.as_deref() {
                if let Err(rm) = evidence.remove(reference).await {
                    warn!(reference, error = %rm, "Failed to remove orphaned evidence");
                }
            }
            Err(e.into())
        }
    }
}
