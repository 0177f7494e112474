use common_utils::date_time;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::enums as storage_enums;

#[derive(Clone, Debug)]
pub struct RefundNew {
    pub refund_id: String,
    pub merchant_id: String,
    pub payment_id: String,
    pub gateway_id: i64,
    pub refund_amount: i64,
    pub currency: String,
    pub reason: Option<String>,
    pub refund_type: storage_enums::RefundType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub refund_id: String,
    pub merchant_id: String,
    pub payment_id: String,
    pub gateway_id: i64,
    pub gateway_refund_id: Option<String>,
    pub refund_amount: i64,
    pub currency: String,
    pub reason: Option<String>,
    pub status: storage_enums::RefundStatus,
    pub refund_type: storage_enums::RefundType,
    pub last_error: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub last_updated: PrimitiveDateTime,
}

impl RefundNew {
    pub fn into_refund(self) -> Refund {
        let now = date_time::now();
        Refund {
            refund_id: self.refund_id,
            merchant_id: self.merchant_id,
            payment_id: self.payment_id,
            gateway_id: self.gateway_id,
            gateway_refund_id: None,
            refund_amount: self.refund_amount,
            currency: self.currency,
            reason: self.reason,
            status: storage_enums::RefundStatus::Created,
            refund_type: self.refund_type,
            last_error: None,
            created_at: now,
            last_updated: now,
        }
    }
}

#[derive(Clone, Debug)]
pub enum RefundUpdate {
    StatusUpdate {
        status: storage_enums::RefundStatus,
        gateway_refund_id: Option<String>,
        last_error: Option<String>,
    },
    GatewayReferenceUpdate {
        gateway_refund_id: String,
    },
}

impl RefundUpdate {
    pub fn apply_changeset(self, source: Refund) -> Refund {
        match self {
            Self::StatusUpdate {
                status,
                gateway_refund_id,
                last_error,
            } => Refund {
                status,
                gateway_refund_id: gateway_refund_id.or(source.gateway_refund_id),
                last_error: last_error.or(source.last_error),
                last_updated: date_time::now(),
                ..source
            },
            Self::GatewayReferenceUpdate { gateway_refund_id } => Refund {
                gateway_refund_id: Some(gateway_refund_id),
                last_updated: date_time::now(),
                ..source
            },
        }
    }
}
