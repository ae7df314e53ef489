pub mod attendance;
pub mod guard;
pub mod location;
pub mod payroll;
pub mod uniform;
