pub mod attendance;
pub mod employee;
pub mod location;
pub mod role;
pub mod salary;
pub mod uniform;
