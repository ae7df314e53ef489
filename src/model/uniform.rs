use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid to the supplier directly
    Direct,
    /// Taken from the employee's salary
    Deduction,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct UniformItem {
    pub id: u64,
    #[schema(example = "Winter jacket")]
    pub name: String,
    #[schema(example = 120.0)]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UniformDelivery {
    pub id: u64,
    pub employee_id: u64,
    pub location_id: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub delivered_at: DateTime<Utc>,
    pub total_value: f64,
    pub payment_method: PaymentMethod,
    pub is_finalized: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct UniformDeliveryRow {
    pub id: u64,
    pub employee_id: u64,
    pub location_id: Option<u64>,
    pub delivered_at: DateTime<Utc>,
    pub total_value: f64,
    pub payment_method: String,
    pub is_finalized: bool,
}

impl TryFrom<UniformDeliveryRow> for UniformDelivery {
    type Error = strum::ParseError;

    fn try_from(row: UniformDeliveryRow) -> Result<Self, Self::Error> {
        Ok(UniformDelivery {
            id: row.id,
            employee_id: row.employee_id,
            location_id: row.location_id,
            delivered_at: row.delivered_at,
            total_value: row.total_value,
            payment_method: row.payment_method.parse()?,
            is_finalized: row.is_finalized,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliveryLine {
    #[schema(example = 2)]
    pub item_id: u64,
    #[schema(example = 1)]
    pub quantity: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDelivery {
    #[schema(example = 12)]
    pub employee_id: u64,
    pub location_id: Option<u64>,
    pub payment_method: PaymentMethod,
    pub items: Vec<DeliveryLine>,
}

/// A priced line: value is item price times quantity
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub item_id: u64,
    pub quantity: u32,
    pub value: f64,
    pub notes: Option<String>,
}

/// A priced delivery ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewDelivery {
    pub employee_id: u64,
    pub location_id: Option<u64>,
    pub payment_method: PaymentMethod,
    pub lines: Vec<PricedLine>,
}

impl NewDelivery {
    pub fn total_value(&self) -> f64 {
        self.lines.iter().map(|l| l.value).sum()
    }
}

pub fn price_lines(lines: &[DeliveryLine], catalog: &[UniformItem]) -> Result<Vec<PricedLine>, String> {
    lines
        .iter()
        .map(|line| {
            if line.quantity == 0 {
                return Err(format!("Quantity for item {} must be at least 1", line.item_id));
            }
            let item = catalog
                .iter()
                .find(|i| i.id == line.item_id)
                .ok_or_else(|| format!("Uniform item {} does not exist", line.item_id))?;
            Ok(PricedLine {
                item_id: item.id,
                quantity: line.quantity,
                value: item.price * f64::from(line.quantity),
                notes: line.notes.clone(),
            })
        })
        .collect()
}
