use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct Salary {
    pub employee_id: u64,
    #[schema(example = 4500.0)]
    pub base_salary: f64,
    #[schema(example = 300.0)]
    pub bonuses: f64,
    #[schema(example = 150.0)]
    pub deductions: f64,
    #[schema(example = 600.0)]
    pub overtime: f64,
    #[schema(value_type = Option<String>, format = "date")]
    pub pay_date: Option<NaiveDate>,
}

impl Salary {
    pub fn empty(employee_id: u64) -> Self {
        Salary {
            employee_id,
            base_salary: 0.0,
            bonuses: 0.0,
            deductions: 0.0,
            overtime: 0.0,
            pay_date: None,
        }
    }

    pub fn total(&self) -> f64 {
        self.base_salary + self.bonuses + self.overtime - self.deductions
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSalary {
    #[schema(example = 4800.0)]
    pub base_salary: Option<f64>,
    #[schema(example = 250.0)]
    pub bonuses: Option<f64>,
    #[schema(example = 400.0)]
    pub overtime: Option<f64>,
    #[schema(example = "2026-11-01", value_type = Option<String>, format = "date")]
    pub pay_date: Option<NaiveDate>,
}

/// Salary fields set by payroll staff; deductions only move through the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryComponents {
    pub base_salary: f64,
    pub bonuses: f64,
    pub overtime: f64,
    pub pay_date: Option<NaiveDate>,
}
