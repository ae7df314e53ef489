use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;
use tracing::{debug, error};

use crate::error::{AppError, AppResult};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceRow, CloseAttendance, NewAttendance},
    employee::Employee,
    location::{Location, LocationRow},
    salary::{Salary, SalaryComponents},
    uniform::{NewDelivery, UniformDelivery, UniformDeliveryRow, UniformItem},
};
use crate::repo::{
    AttendanceRepository, EmployeeRepository, LocationRepository, SalaryLedger, UniformRepository,
};

pub const LOCATION_COLUMNS: &str =
    "l.id, l.name, l.client_name, l.gps_coordinates, l.gps_radius, l.use_polygon, l.polygon_coords, l.instructions";

const DELIVERY_COLUMNS: &str =
    "id, employee_id, location_id, delivered_at, total_value, payment_method, is_finalized";

const ATTENDANCE_COLUMNS: &str =
    "id, employee_id, location_id, shift_id, check_in_time, check_out_time, work_type, notes";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn record_by_id(&self, record_id: u64) -> AppResult<Option<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE id = ?");
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AttendanceRecord::from))
    }
}

#[async_trait]
impl EmployeeRepository for MySqlStore {
    async fn profile(&self, employee_id: u64) -> AppResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, full_name, national_id, phone_number, hire_date, supervisor_id
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn active_shift_on(&self, employee_id: u64, date: NaiveDate) -> AppResult<Option<u64>> {
        let shift_id = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT shift_id
            FROM employee_shift_assignments
            WHERE employee_id = ? AND date = ? AND active = TRUE
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(shift_id)
    }
}

#[async_trait]
impl LocationRepository for MySqlStore {
    async fn assigned_to(&self, employee_id: u64) -> AppResult<Vec<Location>> {
        let sql = format!(
            r#"
            SELECT {LOCATION_COLUMNS}
            FROM locations l
            INNER JOIN employee_location_assignments a ON a.location_id = l.id
            WHERE a.employee_id = ?
            ORDER BY l.id
            "#
        );
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        debug!(employee_id, count = rows.len(), "Loaded assigned locations");
        Ok(rows.into_iter().map(Location::from).collect())
    }

    async fn find(&self, location_id: u64) -> AppResult<Option<Location>> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations l WHERE l.id = ?");
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(location_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Location::from))
    }

    async fn assign(&self, employee_id: u64, location_id: u64) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO employee_location_assignments (employee_id, location_id) VALUES (?, ?)",
        )
        .bind(employee_id)
        .bind(location_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if AppError::is_duplicate_key(&e) => Err(AppError::Conflict(format!(
                "Employee {employee_id} is already assigned to location {location_id}"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn unassign(&self, employee_id: u64, location_id: u64) -> AppResult<()> {
        let done = sqlx::query(
            "DELETE FROM employee_location_assignments WHERE location_id = ? AND employee_id = ?",
        )
        .bind(location_id)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(AppError::NotFound("location assignment"));
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceRepository for MySqlStore {
    async fn open_record_for(&self, employee_id: u64) -> AppResult<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records \
             WHERE employee_id = ? AND check_out_time IS NULL \
             ORDER BY check_in_time DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AttendanceRecord::from))
    }

    async fn insert_open(&self, record: NewAttendance) -> AppResult<AttendanceRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records
            (employee_id, location_id, shift_id, check_in_time, work_type, notes)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.location_id)
        .bind(record.shift_id)
        .bind(record.check_in_time)
        .bind(record.work_type.to_string())
        .bind(&record.notes)
        .execute(&self.pool)
        .await;

        let inserted = match result {
            Ok(done) => done,
            Err(e) if AppError::is_duplicate_key(&e) => {
                // lost a race against another check-in for the same employee
                let open = self.open_record_for(record.employee_id).await?;
                return Err(AppError::AlreadyCheckedIn {
                    record_id: open.map(|r| r.id).unwrap_or_default(),
                });
            }
            Err(e) => {
                error!(error = %e, employee_id = record.employee_id, "Check-in insert failed");
                return Err(e.into());
            }
        };

        self.record_by_id(inserted.last_insert_id())
            .await?
            .ok_or(AppError::NotFound("attendance record"))
    }

    async fn close(&self, close: CloseAttendance) -> AppResult<AttendanceRecord> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_out_time = ?,
                notes = ?,
                location_id = COALESCE(location_id, ?)
            WHERE id = ?
            AND check_out_time IS NULL
            "#,
        )
        .bind(close.check_out_time)
        .bind(&close.notes)
        .bind(close.backfill_location_id)
        .bind(close.record_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NoOpenRecord);
        }

        self.record_by_id(close.record_id)
            .await?
            .ok_or(AppError::NoOpenRecord)
    }
}

impl MySqlStore {
    async fn salary_row(&self, employee_id: u64) -> AppResult<Option<Salary>> {
        let salary = sqlx::query_as::<_, Salary>(
            r#"
            SELECT employee_id, base_salary, bonuses, deductions, overtime, pay_date
            FROM salaries
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(salary)
    }
}

#[async_trait]
impl SalaryLedger for MySqlStore {
    async fn add_deduction(&self, employee_id: u64, amount: f64) -> AppResult<Salary> {
        // single statement so concurrent deductions add up
        sqlx::query(
            r#"
            INSERT INTO salaries (employee_id, deductions)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE deductions = deductions + VALUES(deductions)
            "#,
        )
        .bind(employee_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        self.salary_row(employee_id)
            .await?
            .ok_or(AppError::NotFound("salary"))
    }

    async fn salary(&self, employee_id: u64) -> AppResult<Option<Salary>> {
        self.salary_row(employee_id).await
    }

    async fn save_components(&self, employee_id: u64, c: SalaryComponents) -> AppResult<Salary> {
        // deductions stay untouched so a concurrent uniform deduction is never overwritten
        sqlx::query(
            r#"
            INSERT INTO salaries (employee_id, base_salary, bonuses, overtime, pay_date)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                base_salary = VALUES(base_salary),
                bonuses = VALUES(bonuses),
                overtime = VALUES(overtime),
                pay_date = VALUES(pay_date)
            "#,
        )
        .bind(employee_id)
        .bind(c.base_salary)
        .bind(c.bonuses)
        .bind(c.overtime)
        .bind(c.pay_date)
        .execute(&self.pool)
        .await?;

        self.salary_row(employee_id)
            .await?
            .ok_or(AppError::NotFound("salary"))
    }
}

#[async_trait]
impl UniformRepository for MySqlStore {
    async fn catalog(&self) -> AppResult<Vec<UniformItem>> {
        let items = sqlx::query_as::<_, UniformItem>("SELECT id, name, price FROM uniform_items")
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn create_delivery(&self, delivery: NewDelivery) -> AppResult<UniformDelivery> {
        let mut tx = self.pool.begin().await?;
        let done = sqlx::query(
            r#"
            INSERT INTO uniform_deliveries (employee_id, location_id, total_value, payment_method)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(delivery.employee_id)
        .bind(delivery.location_id)
        .bind(delivery.total_value())
        .bind(delivery.payment_method.to_string())
        .execute(&mut *tx)
        .await?;
        let delivery_id = done.last_insert_id();

        for line in &delivery.lines {
            sqlx::query(
                r#"
                INSERT INTO uniform_delivery_items (delivery_id, item_id, quantity, value, notes)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(delivery_id)
            .bind(line.item_id)
            .bind(line.quantity)
            .bind(line.value)
            .bind(&line.notes)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.delivery(delivery_id)
            .await?
            .ok_or(AppError::NotFound("uniform delivery"))
    }

    async fn delivery(&self, delivery_id: u64) -> AppResult<Option<UniformDelivery>> {
        let sql = format!("SELECT {DELIVERY_COLUMNS} FROM uniform_deliveries WHERE id = ?");
        let row = sqlx::query_as::<_, UniformDeliveryRow>(&sql)
            .bind(delivery_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UniformDelivery::try_from)
            .transpose()
            .map_err(|e| {
                error!(error = %e, delivery_id, "Stored payment method is not recognised");
                AppError::Database(sqlx::Error::Decode(Box::new(e)))
            })
    }

    async fn mark_finalized(&self, delivery_id: u64) -> AppResult<bool> {
        let done = sqlx::query(
            "UPDATE uniform_deliveries SET is_finalized = TRUE WHERE id = ? AND is_finalized = FALSE",
        )
        .bind(delivery_id)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn reopen(&self, delivery_id: u64) -> AppResult<()> {
        sqlx::query("UPDATE uniform_deliveries SET is_finalized = FALSE WHERE id = ?")
            .bind(delivery_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
