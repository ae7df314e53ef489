use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::error::{AppError, AppResult};
use crate::events::{DomainEvent, EventBus};
use crate::model::uniform::{CreateDelivery, NewDelivery, PricedLine, UniformDelivery, price_lines};
use crate::repo::{EmployeeRepository, UniformRepository};

#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    pub delivery: UniformDelivery,
    pub lines: Vec<PricedLine>,
}

/// Uniform deliveries: pricing on create, a one-way finalize that publishes
/// `UniformDeliveryFinalized` for payroll.
pub struct UniformService {
    deliveries: Arc<dyn UniformRepository>,
    employees: Arc<dyn EmployeeRepository>,
    events: EventBus,
}

impl UniformService {
    pub fn new(
        deliveries: Arc<dyn UniformRepository>,
        employees: Arc<dyn EmployeeRepository>,
        events: EventBus,
    ) -> Self {
        Self {
            deliveries,
            employees,
            events,
        }
    }

    #[instrument(name = "uniform_record", skip(self, request), fields(employee_id = request.employee_id))]
    pub async fn record(&self, request: CreateDelivery) -> AppResult<RecordedDelivery> {
        if request.items.is_empty() {
            return Err(AppError::Validation("A delivery needs at least one item".into()));
        }
        if self.employees.profile(request.employee_id).await?.is_none() {
            return Err(AppError::NotFound("employee"));
        }

        let catalog = self.deliveries.catalog().await?;
        let lines = price_lines(&request.items, &catalog).map_err(AppError::Validation)?;

        let delivery = self
            .deliveries
            .create_delivery(NewDelivery {
                employee_id: request.employee_id,
                location_id: request.location_id,
                payment_method: request.payment_method,
                lines: lines.clone(),
            })
            .await?;

        info!(
            delivery_id = delivery.id,
            total_value = delivery.total_value,
            payment_method = %delivery.payment_method,
            "Uniform delivery recorded"
        );
        Ok(RecordedDelivery { delivery, lines })
    }

    /// Finalizes exactly once. A repeat is a `Conflict`; if a subscriber
    /// fails the delivery is reopened so a retry applies the effects once.
    #[instrument(name = "uniform_finalize", skip(self))]
    pub async fn finalize(&self, delivery_id: u64) -> AppResult<UniformDelivery> {
        if !self.deliveries.mark_finalized(delivery_id).await? {
            return match self.deliveries.delivery(delivery_id).await? {
                None => Err(AppError::NotFound("uniform delivery")),
                Some(_) => Err(AppError::Conflict(format!(
                    "Delivery {delivery_id} is already finalized"
                ))),
            };
        }

        let delivery = self
            .deliveries
            .delivery(delivery_id)
            .await?
            .ok_or(AppError::NotFound("uniform delivery"))?;

        let event = DomainEvent::UniformDeliveryFinalized {
            delivery_id,
            employee_id: delivery.employee_id,
            total_value: delivery.total_value,
            payment_method: delivery.payment_method,
        };
        if let Err(e) = self.events.publish(event).await {
            error!(error = %e, "Finalize side effects failed, reopening delivery");
            self.deliveries.reopen(delivery_id).await?;
            return Err(e);
        }

        info!(employee_id = delivery.employee_id, "Uniform delivery finalized");
        Ok(delivery)
    }
}
