//! Storage seams of the attendance core. Handlers and services only see
//! these traits; `MySqlStore` backs them in production.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppResult;
use crate::model::{
    attendance::{AttendanceRecord, CloseAttendance, NewAttendance},
    employee::Employee,
    location::Location,
    salary::{Salary, SalaryComponents},
    uniform::{NewDelivery, UniformDelivery, UniformItem},
};

pub mod mysql;

#[cfg(test)]
pub mod memory;

pub use mysql::MySqlStore;

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn profile(&self, employee_id: u64) -> AppResult<Option<Employee>>;

    /// Shift the employee is actively assigned to on `date`
    async fn active_shift_on(&self, employee_id: u64, date: NaiveDate) -> AppResult<Option<u64>>;
}

#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Locations the employee is cleared for, never any other
    async fn assigned_to(&self, employee_id: u64) -> AppResult<Vec<Location>>;

    async fn find(&self, location_id: u64) -> AppResult<Option<Location>>;

    /// Fails with `Conflict` when the pair is already assigned
    async fn assign(&self, employee_id: u64, location_id: u64) -> AppResult<()>;

    /// Fails with `NotFound` when there is no such assignment
    async fn unassign(&self, employee_id: u64, location_id: u64) -> AppResult<()>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn open_record_for(&self, employee_id: u64) -> AppResult<Option<AttendanceRecord>>;

    /// Fails with `AlreadyCheckedIn` if the storage already holds an open
    /// record for the employee.
    async fn insert_open(&self, record: NewAttendance) -> AppResult<AttendanceRecord>;

    /// Closes the record if it is still open, otherwise `NoOpenRecord`.
    async fn close(&self, close: CloseAttendance) -> AppResult<AttendanceRecord>;
}

#[async_trait]
pub trait SalaryLedger: Send + Sync {
    /// Adds to the employee's deductions, creating the salary row on demand
    async fn add_deduction(&self, employee_id: u64, amount: f64) -> AppResult<Salary>;

    async fn salary(&self, employee_id: u64) -> AppResult<Option<Salary>>;

    /// Writes everything but deductions, creating the row on demand
    async fn save_components(&self, employee_id: u64, components: SalaryComponents) -> AppResult<Salary>;
}

#[async_trait]
pub trait UniformRepository: Send + Sync {
    async fn catalog(&self) -> AppResult<Vec<UniformItem>>;

    /// Stores the delivery and its lines atomically
    async fn create_delivery(&self, delivery: NewDelivery) -> AppResult<UniformDelivery>;

    async fn delivery(&self, delivery_id: u64) -> AppResult<Option<UniformDelivery>>;

    /// Flips an unfinalized delivery to finalized. `false` when it was
    /// missing or already finalized, so only one caller ever wins.
    async fn mark_finalized(&self, delivery_id: u64) -> AppResult<bool>;

    /// Undoes `mark_finalized` after its side effects failed
    async fn reopen(&self, delivery_id: u64) -> AppResult<()>;
}
