use std::sync::Arc;

use actix_web::{HttpResponse, http::header::ContentType, web, web::Bytes};
use futures::{SinkExt, StreamExt, channel::mpsc, future::ready, stream};
use tracing::{debug, error};

use crate::{
    auth::auth::AuthUser, config::Config, error::AttendanceError, model::attendance::LabelLocale,
    service::report::build_attendance_report, store::Store,
};

/// Rows encoded ahead of the client.
const REPORT_BUFFER: usize = 64;

type Chunk = Result<Bytes, AttendanceError>;

/// Encodes the report as one JSON array, a row per chunk, so it is never held
/// in memory as a whole. Stops early once the response is dropped.
async fn produce_report(store: Arc<dyn Store>, locale: LabelLocale, mut tx: mpsc::Sender<Chunk>) {
    let mut rows = build_attendance_report(store.as_ref(), locale);
    let mut count = 0usize;

    while let Some(row) = rows.next().await {
        let chunk = row.and_then(|row| {
            let mut buf = if count == 0 { b"[".to_vec() } else { b",".to_vec() };
            serde_json::to_writer(&mut buf, &row)?;
            Ok(Bytes::from(buf))
        });
        let failed = chunk.is_err();
        if let Err(e) = &chunk {
            error!(error = ?e, rows_sent = count, "Attendance report aborted");
        }
        if tx.send(chunk).await.is_err() || failed {
            return;
        }
        count += 1;
    }

    let closing: &'static [u8] = if count == 0 { b"[]" } else { b"]" };
    let _ = tx.send(Ok(Bytes::from_static(closing))).await;
    debug!(count, "Attendance report streamed");
}

/// Attendance report endpoint
#[utoipa::path(
    get,
    path = "/api/admin/report",
    responses(
        (status = 200, description = "Every attendance record with employee names", body = [DisplayRow]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn attendance_report(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;

    let (tx, mut rx) = mpsc::channel::<Chunk>(REPORT_BUFFER);
    actix_web::rt::spawn(produce_report(store.into_inner(), config.label_locale, tx));

    // A failure before the first row still gets a proper error status.
    let first = match rx.next().await {
        Some(chunk) => chunk?,
        None => Bytes::from_static(b"[]"),
    };

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .streaming(stream::once(ready(Ok::<_, AttendanceError>(first))).chain(rx)))
}
