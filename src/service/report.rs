use futures::{StreamExt, stream::BoxStream};

use super::attendance::{DisplayRow, format_for_display};
use crate::{error::AttendanceError, model::attendance::LabelLocale, store::Store};

/// Every ledger row with the owning employee's name, ordered by date,
/// employee id and record id. Rows are formatted as they stream in.
pub fn build_attendance_report<'a>(
    store: &'a dyn Store,
    locale: LabelLocale,
) -> BoxStream<'a, Result<DisplayRow, AttendanceError>> {
    store
        .report_entries()
        .map(move |entry| -> Result<DisplayRow, AttendanceError> {
            let entry = entry?;
            let mut row = format_for_display(&entry.record, locale);
            row.employee_name = Some(entry.employee_name);
            Ok(row)
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{
            attendance::{AttendanceStatus, NOT_APPLICABLE, NewAttendance},
            employee::NewEmployee,
        },
        store::{EmployeeStore, LedgerStore, memory::MemoryStore},
    };
    use chrono::{NaiveDate, NaiveTime};
    use futures::TryStreamExt;

    async fn employee(store: &MemoryStore, name: &str, email: &str) -> u64 {
        store
            .create_employee(
                "hash",
                &NewEmployee {
                    name: name.into(),
                    gender: "female".into(),
                    email: email.into(),
                    phone_number: "0812".into(),
                    photo_profile: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    fn entry(employee_id: u64, date: (i32, u32, u32), status: AttendanceStatus) -> NewAttendance {
        NewAttendance {
            employee_id,
            status,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time_in: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            time_out: None,
            photo: None,
            latitude: None,
            longitude: None,
            reason: NOT_APPLICABLE.into(),
        }
    }

    #[actix_web::test]
    async fn report_is_ordered_and_named() {
        let store = MemoryStore::new();
        let ani = employee(&store, "Ani", "ani@company.com").await;
        let budi = employee(&store, "Budi", "budi@company.com").await;

        store
            .upsert_attendance(&entry(budi, (2024, 6, 2), AttendanceStatus::Present))
            .await
            .unwrap();
        store
            .upsert_attendance(&entry(budi, (2024, 6, 1), AttendanceStatus::OnLeave))
            .await
            .unwrap();
        store
            .upsert_attendance(&entry(ani, (2024, 6, 1), AttendanceStatus::Present))
            .await
            .unwrap();

        let rows: Vec<DisplayRow> = build_attendance_report(&store, LabelLocale::En)
            .try_collect()
            .await
            .unwrap();

        let order: Vec<(&str, &str, &str)> = rows
            .iter()
            .map(|r| {
                (
                    r.date.as_str(),
                    r.employee_name.as_deref().unwrap(),
                    r.status.as_str(),
                )
            })
            .collect();
        assert_eq!(
            order,
            [
                ("2024-06-01", "Ani", "Present"),
                ("2024-06-01", "Budi", "Leave"),
                ("2024-06-02", "Budi", "Present"),
            ]
        );
    }

    #[actix_web::test]
    async fn empty_ledger_gives_empty_report() {
        let store = MemoryStore::new();
        let rows: Vec<DisplayRow> = build_attendance_report(&store, LabelLocale::Id)
            .try_collect()
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
