pub mod attendance;
pub mod geofence;
pub mod locks;
pub mod payroll;
pub mod uniform;
