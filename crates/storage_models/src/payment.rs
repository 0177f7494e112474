use common_utils::date_time;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::enums as storage_enums;

#[derive(Clone, Debug)]
pub struct PaymentNew {
    pub payment_id: String,
    pub merchant_id: String,
    pub gateway_id: i64,
    pub total_amount: i64,
    pub currency: String,
    pub return_url: Option<String>,
    pub subscription_id: Option<String>,
    pub invoice_id: Option<String>,
    pub expire_time: Option<PrimitiveDateTime>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: String,
    pub merchant_id: String,
    pub gateway_id: i64,
    pub gateway_payment_id: Option<String>,
    pub gateway_payment_intent_id: Option<String>,
    pub total_amount: i64,
    pub currency: String,
    pub status: storage_enums::PaymentStatus,
    pub authorize_status: storage_enums::AuthorizeStatus,
    pub paid_time: Option<PrimitiveDateTime>,
    pub expire_time: Option<PrimitiveDateTime>,
    pub last_error: Option<String>,
    pub return_url: Option<String>,
    pub subscription_id: Option<String>,
    pub invoice_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: PrimitiveDateTime,
    pub last_updated: PrimitiveDateTime,
}

impl PaymentNew {
    pub fn into_payment(self) -> Payment {
        let now = date_time::now();
        Payment {
            payment_id: self.payment_id,
            merchant_id: self.merchant_id,
            gateway_id: self.gateway_id,
            gateway_payment_id: None,
            gateway_payment_intent_id: None,
            total_amount: self.total_amount,
            currency: self.currency,
            status: storage_enums::PaymentStatus::Created,
            authorize_status: storage_enums::AuthorizeStatus::Initiated,
            paid_time: None,
            expire_time: self.expire_time,
            last_error: None,
            return_url: self.return_url,
            subscription_id: self.subscription_id,
            invoice_id: self.invoice_id,
            metadata: self.metadata,
            created_at: now,
            last_updated: now,
        }
    }
}

impl Payment {
    /// Value of a string key in the payment metadata, e.g. `CancelUrl`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(key))
            .and_then(serde_json::Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Clone, Debug)]
pub enum PaymentUpdate {
    /// Terminal transition. Only ever applied through the conditional update on `Created`.
    StatusUpdate {
        status: storage_enums::PaymentStatus,
        gateway_payment_id: Option<String>,
        paid_time: Option<PrimitiveDateTime>,
        last_error: Option<String>,
    },
    GatewayReferenceUpdate {
        gateway_payment_id: Option<String>,
        gateway_payment_intent_id: Option<String>,
        authorize_status: Option<storage_enums::AuthorizeStatus>,
    },
    MetadataUpdate {
        metadata: serde_json::Value,
    },
}

#[derive(Clone, Debug, Default)]
pub struct PaymentUpdateInternal {
    pub status: Option<storage_enums::PaymentStatus>,
    pub authorize_status: Option<storage_enums::AuthorizeStatus>,
    pub gateway_payment_id: Option<String>,
    pub gateway_payment_intent_id: Option<String>,
    pub paid_time: Option<PrimitiveDateTime>,
    pub last_error: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl PaymentUpdate {
    pub fn apply_changeset(self, source: Payment) -> Payment {
        let internal = PaymentUpdateInternal::from(self);
        Payment {
            status: internal.status.unwrap_or(source.status),
            authorize_status: internal.authorize_status.unwrap_or(source.authorize_status),
            gateway_payment_id: internal.gateway_payment_id.or(source.gateway_payment_id),
            gateway_payment_intent_id: internal
                .gateway_payment_intent_id
                .or(source.gateway_payment_intent_id),
            paid_time: internal.paid_time.or(source.paid_time),
            last_error: internal.last_error.or(source.last_error),
            metadata: internal.metadata.or(source.metadata),
            last_updated: date_time::now(),
            ..source
        }
    }
}

impl From<PaymentUpdate> for PaymentUpdateInternal {
    fn from(payment_update: PaymentUpdate) -> Self {
        match payment_update {
            PaymentUpdate::StatusUpdate {
                status,
                gateway_payment_id,
                paid_time,
                last_error,
            } => Self {
                status: Some(status),
                gateway_payment_id,
                paid_time,
                last_error,
                ..Default::default()
            },
            PaymentUpdate::GatewayReferenceUpdate {
                gateway_payment_id,
                gateway_payment_intent_id,
                authorize_status,
            } => Self {
                gateway_payment_id,
                gateway_payment_intent_id,
                authorize_status,
                ..Default::default()
            },
            PaymentUpdate::MetadataUpdate { metadata } => Self {
                metadata: Some(metadata),
                ..Default::default()
            },
        }
    }
}
