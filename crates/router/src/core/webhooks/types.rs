use common_enums::EventType;
use serde::{Deserialize, Serialize};

use crate::types::storage;

/// A business event raised by the payment core.
#[derive(Clone, Debug)]
pub struct OutgoingEvent {
    pub event: EventType,
    pub merchant_id: String,
    /// Id of the payment or refund the event is about
    pub primary_object_id: String,
    pub data: serde_json::Value,
    pub sequence_key: Option<String>,
    /// `event_id` or `idempotent_event_id` of an event that must be acknowledged first
    pub dependency_key: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone, Debug)]
pub enum EmitOutcome {
    Enqueued {
        message: storage::WebhookMessage,
        deliveries: Vec<storage::WebhookDelivery>,
    },
    /// The event was emitted before, nothing was queued.
    Duplicate { idempotent_event_id: String },
}

/// Body POSTed to merchant endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingWebhookBody {
    pub id: String,
    pub event: EventType,
    pub event_id: String,
    pub merchant_id: String,
    pub data: serde_json::Value,
    pub sequence_key: Option<String>,
    pub dependency_key: Option<String>,
    #[serde(rename = "metaData")]
    pub metadata: Option<serde_json::Value>,
}

impl From<&storage::WebhookMessage> for OutgoingWebhookBody {
    fn from(message: &storage::WebhookMessage) -> Self {
        Self {
            id: message.id.clone(),
            event: message.event,
            event_id: message.event_id.clone(),
            merchant_id: message.merchant_id.clone(),
            data: message.data.clone(),
            sequence_key: message.sequence_key.clone(),
            dependency_key: message.dependency_key.clone(),
            metadata: message.metadata.clone(),
        }
    }
}

/// Payload of a `merchant_webhook` queue message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryTask {
    pub delivery_id: String,
    pub message_id: String,
    pub endpoint_id: i64,
    pub url: String,
    /// Serialized [`OutgoingWebhookBody`], sent byte for byte as signed
    pub body: String,
    pub signature: String,
}

/// Payload of an `internal_webhook` queue message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InternalWebhookTask {
    pub message_id: String,
    pub body: OutgoingWebhookBody,
    /// Times the message was put back because its dependency could not be found
    #[serde(default)]
    pub deferrals: u32,
}
