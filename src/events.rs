//! Domain events published by one part of the service and consumed by
//! another, so cross-cutting effects are wired explicitly in `main`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::AppResult;
use crate::model::uniform::PaymentMethod;

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    UniformDeliveryFinalized {
        delivery_id: u64,
        employee_id: u64,
        total_value: f64,
        payment_method: PaymentMethod,
    },
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> AppResult<()>;
}

#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Delivers to every subscriber in order and stops at the first failure
    pub async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        debug!(?event, subscribers = self.subscribers.len(), "Publishing event");
        for subscriber in &self.subscribers {
            subscriber.handle(&event).await?;
        }
        Ok(())
    }
}
