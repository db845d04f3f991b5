pub mod attendance;
pub mod backup;
pub mod core;
pub mod fees;
pub mod performance;
pub mod reports;
pub mod students;
pub mod teachers;
