//! Domain event publication
//!
//! Events are drained from aggregates after the store has committed, so a
//! failed publish never undoes a state change; it is logged and dropped.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::events::DomainEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>);
}

/// Writes events to the log. Used when no broker is configured.
#[derive(Clone, Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            info!(subject = event.subject(), ?event, "Domain event");
        }
    }
}

/// Publishes each event as JSON on `{prefix}.{subject}`.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self { Self { client, prefix: prefix.into() } }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = format!("{}.{}", self.prefix, event.subject());
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(e) => { warn!(%subject, error = %e, "Could not encode event"); continue; }
            };
            if let Err(e) = self.client.publish(subject.clone(), payload.into()).await {
                warn!(%subject, error = %e, "Event publish failed");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Keeps everything it is handed, for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingPublisher {
        events: Mutex<Vec<DomainEvent>>,
    }

    impl RecordingPublisher {
        pub(crate) fn events(&self) -> Vec<DomainEvent> { self.events.lock().unwrap().clone() }
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, events: Vec<DomainEvent>) { self.events.lock().unwrap().extend(events); }
    }

    #[test]
    fn test_event_payload_shape() {
        use crate::domain::events::OrderEvent;
        use crate::domain::value_objects::OrderId;
        let order_id = OrderId::new();
        let event = DomainEvent::Order(OrderEvent::PaymentCompleted { order_id });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["aggregate"], "order");
        assert_eq!(json["type"], "payment_completed");
        assert_eq!(json["order_id"], order_id.to_string());
        assert_eq!(event.subject(), "order.payment_completed");
    }
}
