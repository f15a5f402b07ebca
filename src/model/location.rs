use chrono::{NaiveDateTime, NaiveTime};

/// The office geofence and official working window. There is at most one.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPolicy {
    pub latitude: f64,
    pub longitude: f64,
    /// Allowed distance from the center, in meters.
    pub radius_m: f64,
    pub clock_in: NaiveTime,
    pub clock_out: NaiveTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicySettings {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub clock_in: NaiveTime,
    pub clock_out: NaiveTime,
}
