use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// Employee profile as supplied by the employee directory
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct Employee {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = "Faisal Abdullah Al-Harbi")]
    pub full_name: String,
    #[schema(example = "1098765432")]
    pub national_id: String,
    #[schema(example = "+966501234567")]
    pub phone_number: String,
    #[schema(value_type = Option<String>, format = "date")]
    pub hire_date: Option<NaiveDate>,
    pub supervisor_id: Option<u64>,
}
