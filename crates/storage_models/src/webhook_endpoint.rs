use common_utils::date_time;
use masking::Secret;
use time::PrimitiveDateTime;

use crate::enums as storage_enums;

#[derive(Clone, Debug)]
pub struct MerchantWebhookEndpointNew {
    pub merchant_id: String,
    pub url: String,
    pub subscribed_events: Vec<storage_enums::EventType>,
    pub secret: Secret<String>,
}

#[derive(Clone, Debug)]
pub struct MerchantWebhookEndpoint {
    pub id: i64,
    pub merchant_id: String,
    pub url: String,
    pub subscribed_events: Vec<storage_enums::EventType>,
    pub secret: Secret<String>,
    pub disabled: bool,
    pub created_at: PrimitiveDateTime,
}

impl MerchantWebhookEndpointNew {
    pub fn into_endpoint(self, id: i64) -> MerchantWebhookEndpoint {
        MerchantWebhookEndpoint {
            id,
            merchant_id: self.merchant_id,
            url: self.url,
            subscribed_events: self.subscribed_events,
            secret: self.secret,
            disabled: false,
            created_at: date_time::now(),
        }
    }
}

impl MerchantWebhookEndpoint {
    pub fn is_subscribed_to(&self, event: storage_enums::EventType) -> bool {
        !self.disabled && self.subscribed_events.contains(&event)
    }
}
