//! In-memory repositories for tests

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::model::{
    attendance::{AttendanceRecord, CloseAttendance, NewAttendance},
    employee::Employee,
    location::Location,
    salary::{Salary, SalaryComponents},
    uniform::{NewDelivery, PricedLine, UniformDelivery, UniformItem},
};
use crate::repo::{
    AttendanceRepository, EmployeeRepository, LocationRepository, SalaryLedger, UniformRepository,
};

#[derive(Default)]
struct State {
    employees: Vec<Employee>,
    locations: Vec<Location>,
    assignments: Vec<(u64, u64)>,
    shifts: Vec<(u64, NaiveDate, u64)>,
    records: Vec<AttendanceRecord>,
    salaries: HashMap<u64, Salary>,
    items: Vec<UniformItem>,
    deliveries: Vec<UniformDelivery>,
    delivery_lines: Vec<(u64, PricedLine)>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employee(self, id: u64, full_name: &str) -> Self {
        self.state.lock().unwrap().employees.push(Employee {
            id,
            full_name: full_name.to_string(),
            national_id: format!("10000000{id:02}"),
            phone_number: format!("+9665000000{id:02}"),
            hire_date: None,
            supervisor_id: None,
        });
        self
    }

    pub fn with_location(self, location: Location) -> Self {
        self.state.lock().unwrap().locations.push(location);
        self
    }

    pub fn assign(self, employee_id: u64, location_id: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if !state.assignments.contains(&(employee_id, location_id)) {
                state.assignments.push((employee_id, location_id));
            }
        }
        self
    }

    pub fn with_shift(self, employee_id: u64, date: NaiveDate, shift_id: u64) -> Self {
        self.state.lock().unwrap().shifts.push((employee_id, date, shift_id));
        self
    }

    pub fn with_item(self, id: u64, name: &str, price: f64) -> Self {
        self.state.lock().unwrap().items.push(UniformItem {
            id,
            name: name.to_string(),
            price,
        });
        self
    }

    pub fn with_salary(self, salary: Salary) -> Self {
        self.state.lock().unwrap().salaries.insert(salary.employee_id, salary);
        self
    }

    pub fn is_assigned(&self, employee_id: u64, location_id: u64) -> bool {
        self.state
            .lock()
            .unwrap()
            .assignments
            .contains(&(employee_id, location_id))
    }

    pub fn delivery_lines(&self, delivery_id: u64) -> Vec<PricedLine> {
        self.state
            .lock()
            .unwrap()
            .delivery_lines
            .iter()
            .filter(|(d, _)| *d == delivery_id)
            .map(|(_, l)| l.clone())
            .collect()
    }

    pub fn records_for(&self, employee_id: u64) -> Vec<AttendanceRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect()
    }

    pub fn salary_of(&self, employee_id: u64) -> Option<Salary> {
        self.state.lock().unwrap().salaries.get(&employee_id).cloned()
    }
}

#[async_trait]
impl EmployeeRepository for MemoryStore {
    async fn profile(&self, employee_id: u64) -> AppResult<Option<Employee>> {
        let state = self.state.lock().unwrap();
        Ok(state.employees.iter().find(|e| e.id == employee_id).cloned())
    }

    async fn active_shift_on(&self, employee_id: u64, date: NaiveDate) -> AppResult<Option<u64>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .shifts
            .iter()
            .rev()
            .find(|(e, d, _)| *e == employee_id && *d == date)
            .map(|(_, _, shift)| *shift))
    }
}

#[async_trait]
impl LocationRepository for MemoryStore {
    async fn assigned_to(&self, employee_id: u64) -> AppResult<Vec<Location>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .locations
            .iter()
            .filter(|l| state.assignments.contains(&(employee_id, l.id)))
            .cloned()
            .collect())
    }

    async fn find(&self, location_id: u64) -> AppResult<Option<Location>> {
        let state = self.state.lock().unwrap();
        Ok(state.locations.iter().find(|l| l.id == location_id).cloned())
    }

    async fn assign(&self, employee_id: u64, location_id: u64) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.assignments.contains(&(employee_id, location_id)) {
            return Err(AppError::Conflict(format!(
                "Employee {employee_id} is already assigned to location {location_id}"
            )));
        }
        state.assignments.push((employee_id, location_id));
        Ok(())
    }

    async fn unassign(&self, employee_id: u64, location_id: u64) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.assignments.len();
        state.assignments.retain(|pair| *pair != (employee_id, location_id));
        if state.assignments.len() == before {
            return Err(AppError::NotFound("location assignment"));
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn open_record_for(&self, employee_id: u64) -> AppResult<Option<AttendanceRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .find(|r| r.employee_id == employee_id && r.is_open())
            .cloned())
    }

    async fn insert_open(&self, record: NewAttendance) -> AppResult<AttendanceRecord> {
        let mut state = self.state.lock().unwrap();
        if let Some(open) = state
            .records
            .iter()
            .find(|r| r.employee_id == record.employee_id && r.is_open())
        {
            return Err(AppError::AlreadyCheckedIn { record_id: open.id });
        }

        let created = AttendanceRecord {
            id: state.records.len() as u64 + 1,
            employee_id: record.employee_id,
            location_id: record.location_id,
            shift_id: record.shift_id,
            check_in_time: record.check_in_time,
            check_out_time: None,
            work_type: record.work_type,
            notes: Some(record.notes),
        };
        state.records.push(created.clone());
        Ok(created)
    }

    async fn close(&self, close: CloseAttendance) -> AppResult<AttendanceRecord> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == close.record_id && r.is_open())
            .ok_or(AppError::NoOpenRecord)?;

        record.check_out_time = Some(close.check_out_time);
        record.notes = Some(close.notes);
        if record.location_id.is_none() {
            record.location_id = close.backfill_location_id;
        }
        Ok(record.clone())
    }
}

#[async_trait]
impl SalaryLedger for MemoryStore {
    async fn add_deduction(&self, employee_id: u64, amount: f64) -> AppResult<Salary> {
        let mut state = self.state.lock().unwrap();
        let salary = state
            .salaries
            .entry(employee_id)
            .or_insert_with(|| Salary::empty(employee_id));
        salary.deductions += amount;
        Ok(salary.clone())
    }

    async fn salary(&self, employee_id: u64) -> AppResult<Option<Salary>> {
        Ok(self.state.lock().unwrap().salaries.get(&employee_id).cloned())
    }

    async fn save_components(&self, employee_id: u64, c: SalaryComponents) -> AppResult<Salary> {
        let mut state = self.state.lock().unwrap();
        let salary = state
            .salaries
            .entry(employee_id)
            .or_insert_with(|| Salary::empty(employee_id));
        salary.base_salary = c.base_salary;
        salary.bonuses = c.bonuses;
        salary.overtime = c.overtime;
        salary.pay_date = c.pay_date;
        Ok(salary.clone())
    }
}

#[async_trait]
impl UniformRepository for MemoryStore {
    async fn catalog(&self) -> AppResult<Vec<UniformItem>> {
        Ok(self.state.lock().unwrap().items.clone())
    }

    async fn create_delivery(&self, delivery: NewDelivery) -> AppResult<UniformDelivery> {
        let mut state = self.state.lock().unwrap();
        let created = UniformDelivery {
            id: state.deliveries.len() as u64 + 1,
            employee_id: delivery.employee_id,
            location_id: delivery.location_id,
            delivered_at: Utc::now(),
            total_value: delivery.total_value(),
            payment_method: delivery.payment_method,
            is_finalized: false,
        };
        state.deliveries.push(created.clone());
        for line in delivery.lines {
            state.delivery_lines.push((created.id, line));
        }
        Ok(created)
    }

    async fn delivery(&self, delivery_id: u64) -> AppResult<Option<UniformDelivery>> {
        let state = self.state.lock().unwrap();
        Ok(state.deliveries.iter().find(|d| d.id == delivery_id).cloned())
    }

    async fn mark_finalized(&self, delivery_id: u64) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .deliveries
            .iter_mut()
            .find(|d| d.id == delivery_id && !d.is_finalized)
        {
            Some(d) => {
                d.is_finalized = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reopen(&self, delivery_id: u64) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(d) = state.deliveries.iter_mut().find(|d| d.id == delivery_id) {
            d.is_finalized = false;
        }
        Ok(())
    }
}
