use crate::{error::AttendanceError, model::location::LocationPolicy};

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AttendanceError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AttendanceError::MalformedInput {
            field: "latitude",
            reason: format!("{latitude} is outside -90..=90"),
        });
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AttendanceError::MalformedInput {
            field: "longitude",
            reason: format!("{longitude} is outside -180..=180"),
        });
    }
    Ok(())
}

/// Returns the distance from the policy center when the point is inside the
/// fence.
pub fn ensure_within(
    policy: &LocationPolicy,
    latitude: f64,
    longitude: f64,
) -> Result<f64, AttendanceError> {
    let distance_m = haversine_distance_m(policy.latitude, policy.longitude, latitude, longitude);
    if distance_m > policy.radius_m {
        return Err(AttendanceError::OutsideGeofence {
            distance_m,
            radius_m: policy.radius_m,
        });
    }
    Ok(distance_m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn policy_at_origin(radius_m: f64) -> LocationPolicy {
        LocationPolicy {
            latitude: 0.0,
            longitude: 0.0,
            radius_m,
            clock_in: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            clock_out: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            updated_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn distance_along_the_equator() {
        let d = haversine_distance_m(0.0, 0.0, 0.0, 0.002);
        assert!((d - 222.4).abs() < 0.5, "got {d}");

        let d = haversine_distance_m(0.0, 0.0, 0.0, 0.0005);
        assert!((d - 55.6).abs() < 0.5, "got {d}");
    }

    #[test]
    fn same_point_is_zero_distance() {
        assert_eq!(haversine_distance_m(-6.2, 106.8, -6.2, 106.8), 0.0);
    }

    #[test]
    fn fence_rejects_points_beyond_radius() {
        let policy = policy_at_origin(100.0);

        let err = ensure_within(&policy, 0.0, 0.002).unwrap_err();
        assert!(matches!(err, AttendanceError::OutsideGeofence { radius_m, .. } if radius_m == 100.0));

        let d = ensure_within(&policy, 0.0, 0.0005).unwrap();
        assert!(d < 100.0);
    }

    #[test]
    fn coordinates_must_be_on_the_globe() {
        assert!(validate_coordinates(-6.2, 106.8).is_ok());
        assert!(matches!(
            validate_coordinates(91.0, 0.0),
            Err(AttendanceError::MalformedInput { field: "latitude", .. })
        ));
        assert!(matches!(
            validate_coordinates(0.0, f64::NAN),
            Err(AttendanceError::MalformedInput { field: "longitude", .. })
        ));
    }
}
