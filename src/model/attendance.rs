use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkType {
    #[default]
    Official,
    Coverage,
    Overtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckAction {
    CheckIn,
    CheckOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub location_id: Option<u64>,
    pub shift_id: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub check_in_time: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<DateTime<Utc>>,
    pub work_type: WorkType,
    pub notes: Option<String>,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.check_out_time.is_none()
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    pub location_id: Option<u64>,
    pub shift_id: Option<u64>,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub work_type: String,
    pub notes: Option<String>,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            location_id: row.location_id,
            shift_id: row.shift_id,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            work_type: row.work_type.parse().unwrap_or_default(),
            notes: row.notes,
        }
    }
}

/// Values for a freshly opened record
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub employee_id: u64,
    pub location_id: Option<u64>,
    pub shift_id: Option<u64>,
    pub check_in_time: DateTime<Utc>,
    pub work_type: WorkType,
    pub notes: String,
}

/// Mutation applied once when a record is closed
#[derive(Debug, Clone)]
pub struct CloseAttendance {
    pub record_id: u64,
    pub check_out_time: DateTime<Utc>,
    pub notes: String,
    /// Only written when the record has no location yet
    pub backfill_location_id: Option<u64>,
}
