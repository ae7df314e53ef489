use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::error::AppResult;
use crate::events::{DomainEvent, EventSubscriber};
use crate::model::uniform::PaymentMethod;
use crate::repo::SalaryLedger;

/// Applies payroll consequences of domain events
pub struct PayrollService {
    ledger: Arc<dyn SalaryLedger>,
}

impl PayrollService {
    pub fn new(ledger: Arc<dyn SalaryLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl EventSubscriber for PayrollService {
    async fn handle(&self, event: &DomainEvent) -> AppResult<()> {
        match event {
            DomainEvent::UniformDeliveryFinalized {
                delivery_id,
                employee_id,
                total_value,
                payment_method: PaymentMethod::Deduction,
            } => {
                let salary = self.ledger.add_deduction(*employee_id, *total_value).await?;
                info!(
                    delivery_id,
                    employee_id,
                    amount = total_value,
                    deductions = salary.deductions,
                    "Uniform value deducted from salary"
                );
                Ok(())
            }
            DomainEvent::UniformDeliveryFinalized { .. } => Ok(()),
        }
    }
}
