use common_utils::date_time;
use time::PrimitiveDateTime;

use crate::enums as storage_enums;

#[derive(Clone, Debug)]
pub struct WebhookMessageNew {
    pub id: String,
    pub event_id: String,
    pub idempotent_event_id: String,
    pub event: storage_enums::EventType,
    pub merchant_id: String,
    pub data: serde_json::Value,
    pub sequence_key: Option<String>,
    pub dependency_key: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub status: storage_enums::WebhookMessageStatus,
}

/// A business event addressed to a merchant.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookMessage {
    pub id: String,
    /// Unique per message, receivers de-duplicate on it.
    pub event_id: String,
    /// `<primary object id>_<event>`, unique among queued messages.
    pub idempotent_event_id: String,
    pub event: storage_enums::EventType,
    pub merchant_id: String,
    pub data: serde_json::Value,
    pub sequence_key: Option<String>,
    pub dependency_key: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub status: storage_enums::WebhookMessageStatus,
    /// Set once the internal task and every endpoint delivery are on the queue
    pub published: bool,
    pub created_at: PrimitiveDateTime,
}

impl From<WebhookMessageNew> for WebhookMessage {
    fn from(new: WebhookMessageNew) -> Self {
        Self {
            id: new.id,
            event_id: new.event_id,
            idempotent_event_id: new.idempotent_event_id,
            event: new.event,
            merchant_id: new.merchant_id,
            data: new.data,
            sequence_key: new.sequence_key,
            dependency_key: new.dependency_key,
            metadata: new.metadata,
            status: new.status,
            published: false,
            created_at: date_time::now(),
        }
    }
}
