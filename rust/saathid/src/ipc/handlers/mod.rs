pub mod analytics;
pub mod attendance;
pub mod backup_exchange;
pub mod classes;
pub mod core;
pub mod feedback;
pub mod marks;
pub mod session;
pub mod students;
