pub mod attendance;
pub mod employee;
pub mod geofence;
pub mod policy;
pub mod report;
