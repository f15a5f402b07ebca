pub mod attendance;
pub mod employee;
pub mod leave;
pub mod location;
pub mod report;
