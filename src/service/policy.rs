use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::geofence::validate_coordinates;
use crate::{
    error::AttendanceError,
    model::location::{LocationPolicy, PolicySettings},
    store::Store,
    utils::time_format::{format_date_time, format_time, parse_time},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PolicyInput {
    #[schema(example = json!(-6.2))]
    pub latitude: Option<f64>,
    #[schema(example = 106.8)]
    pub longitude: Option<f64>,
    /// Meters.
    #[schema(example = 100.0)]
    pub radius: Option<f64>,
    #[schema(example = "08:00:00")]
    pub clock_in: Option<String>,
    #[schema(example = "17:00:00")]
    pub clock_out: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PolicyView {
    #[schema(example = json!(-6.2))]
    pub latitude: f64,
    #[schema(example = 106.8)]
    pub longitude: f64,
    #[schema(example = 100.0)]
    pub radius: f64,
    #[schema(example = "08:00:00")]
    pub clock_in: String,
    #[schema(example = "17:00:00")]
    pub clock_out: String,
    #[schema(example = "2024-06-01 07:00:00")]
    pub updated_at: String,
}

impl From<LocationPolicy> for PolicyView {
    fn from(policy: LocationPolicy) -> Self {
        Self {
            latitude: policy.latitude,
            longitude: policy.longitude,
            radius: policy.radius_m,
            clock_in: format_time(policy.clock_in),
            clock_out: format_time(policy.clock_out),
            updated_at: format_date_time(policy.updated_at),
        }
    }
}

pub async fn get_active_policy(store: &dyn Store) -> Result<LocationPolicy, AttendanceError> {
    store
        .active_policy()
        .await?
        .ok_or(AttendanceError::NotConfigured)
}

/// Replaces the active policy. Any earlier policy stops applying.
pub async fn set_policy(
    store: &dyn Store,
    input: &PolicyInput,
) -> Result<LocationPolicy, AttendanceError> {
    let latitude = input
        .latitude
        .ok_or(AttendanceError::MissingField("latitude"))?;
    let longitude = input
        .longitude
        .ok_or(AttendanceError::MissingField("longitude"))?;
    validate_coordinates(latitude, longitude)?;

    let radius_m = input.radius.ok_or(AttendanceError::MissingField("radius"))?;
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(AttendanceError::MalformedInput {
            field: "radius",
            reason: "must be a positive number of meters".into(),
        });
    }

    let clock_in = parse_time("clock_in", input.clock_in.as_deref())?;
    let clock_out = parse_time("clock_out", input.clock_out.as_deref())?;

    let policy = store
        .replace_policy(&PolicySettings {
            latitude,
            longitude,
            radius_m,
            clock_in,
            clock_out,
        })
        .await?;

    info!(latitude, longitude, radius_m, "Location policy replaced");
    Ok(policy)
}
