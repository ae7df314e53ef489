use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::{AppError, ErrorBody};
use crate::model::role::Capability;
use crate::model::salary::{Salary, SalaryComponents, UpdateSalary};
use crate::repo::{EmployeeRepository, SalaryLedger};

#[derive(Serialize, ToSchema)]
pub struct SalaryResponse {
    #[serde(flatten)]
    pub salary: Salary,
    /// base + bonuses + overtime - deductions
    #[schema(example = 5250.0)]
    pub total: f64,
}

impl From<Salary> for SalaryResponse {
    fn from(salary: Salary) -> Self {
        SalaryResponse {
            total: salary.total(),
            salary,
        }
    }
}

#[utoipa::path(
    get,
    path = "/payroll/salary/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, body = SalaryResponse),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "No salary on file", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_salary(
    auth: AuthUser,
    ledger: web::Data<dyn SalaryLedger>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManagePayroll)?;

    let salary = ledger
        .salary(path.into_inner())
        .await?
        .ok_or(AppError::NotFound("salary"))?;

    Ok(HttpResponse::Ok().json(SalaryResponse::from(salary)))
}

/// Set salary components; deductions are only changed by finalized deliveries
#[utoipa::path(
    put,
    path = "/payroll/salary/{employee_id}",
    request_body = UpdateSalary,
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Salary updated", body = SalaryResponse),
        (status = 400, description = "Negative amount", body = ErrorBody),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_salary(
    auth: AuthUser,
    ledger: web::Data<dyn SalaryLedger>,
    employees: web::Data<dyn EmployeeRepository>,
    path: web::Path<u64>,
    body: web::Json<UpdateSalary>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManagePayroll)?;
    let employee_id = path.into_inner();

    for (field, value) in [
        ("base_salary", body.base_salary),
        ("bonuses", body.bonuses),
        ("overtime", body.overtime),
    ] {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return Err(AppError::Validation(format!("{field} must be a non-negative amount")));
        }
    }

    let current = match ledger.salary(employee_id).await? {
        Some(s) => s,
        None => {
            if employees.profile(employee_id).await?.is_none() {
                return Err(AppError::NotFound("employee"));
            }
            Salary::empty(employee_id)
        }
    };

    let components = SalaryComponents {
        base_salary: body.base_salary.unwrap_or(current.base_salary),
        bonuses: body.bonuses.unwrap_or(current.bonuses),
        overtime: body.overtime.unwrap_or(current.overtime),
        pay_date: body.pay_date.or(current.pay_date),
    };
    let salary = ledger.save_components(employee_id, components).await?;

    info!(employee_id, by = auth.user_id, "Salary updated");
    Ok(HttpResponse::Ok().json(SalaryResponse::from(salary)))
}
