use common_utils::date_time;
use time::PrimitiveDateTime;

use crate::enums as storage_enums;

#[derive(Clone, Debug)]
pub struct WebhookDeliveryNew {
    pub id: String,
    pub message_id: String,
    pub event_id: String,
    pub merchant_id: String,
    pub endpoint_id: i64,
    pub url: String,
}

/// Delivery of one message to one merchant endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookDelivery {
    pub id: String,
    pub message_id: String,
    pub event_id: String,
    pub merchant_id: String,
    pub endpoint_id: i64,
    pub url: String,
    pub attempts: u32,
    pub status: storage_enums::DeliveryStatus,
    pub last_response_code: Option<u16>,
    pub last_error: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

impl From<WebhookDeliveryNew> for WebhookDelivery {
    fn from(new: WebhookDeliveryNew) -> Self {
        let now = date_time::now();
        Self {
            id: new.id,
            message_id: new.message_id,
            event_id: new.event_id,
            merchant_id: new.merchant_id,
            endpoint_id: new.endpoint_id,
            url: new.url,
            attempts: 0,
            status: storage_enums::DeliveryStatus::Pending,
            last_response_code: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug)]
pub enum WebhookDeliveryUpdate {
    Delivered {
        attempts: u32,
        response_code: u16,
    },
    AttemptFailed {
        attempts: u32,
        response_code: Option<u16>,
        error: String,
    },
    Dead {
        attempts: u32,
        response_code: Option<u16>,
        error: String,
    },
    /// Manual replay of a dead delivery, the retry budget starts over.
    Requeued,
}

impl WebhookDeliveryUpdate {
    pub fn apply_changeset(self, source: WebhookDelivery) -> WebhookDelivery {
        let updated_at = date_time::now();
        match self {
            Self::Delivered {
                attempts,
                response_code,
            } => WebhookDelivery {
                attempts,
                status: storage_enums::DeliveryStatus::Delivered,
                last_response_code: Some(response_code),
                updated_at,
                ..source
            },
            Self::AttemptFailed {
                attempts,
                response_code,
                error,
            } => WebhookDelivery {
                attempts,
                last_response_code: response_code,
                last_error: Some(error),
                updated_at,
                ..source
            },
            Self::Dead {
                attempts,
                response_code,
                error,
            } => WebhookDelivery {
                attempts,
                status: storage_enums::DeliveryStatus::Dead,
                last_response_code: response_code,
                last_error: Some(error),
                updated_at,
                ..source
            },
            Self::Requeued => WebhookDelivery {
                attempts: 0,
                status: storage_enums::DeliveryStatus::Pending,
                updated_at,
                ..source
            },
        }
    }
}
