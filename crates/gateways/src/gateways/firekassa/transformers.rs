use common_enums::PaymentStatus;
use common_utils::{date_time, errors::CustomResult};
use gateway_interfaces::{
    api::{from_major_unit_str, to_major_unit_string},
    errors::GatewayError,
    types::{GatewayNewPaymentRequest, GatewayPaymentDetail},
    webhooks::{value_at_path, IncomingWebhookEvent},
};
use router_env::logger;
use serde::{Deserialize, Serialize};

use crate::utils::normalise_status;

/// Fields covered by the webhook signature, in signing order.
pub const SIGNED_FIELDS: [&str; 11] = [
    "account",
    "amount",
    "commission",
    "currency",
    "error",
    "error_code",
    "id",
    "order_id",
    "site_id",
    "status",
    "type",
];

/// Currency of a FireKassa transaction that reports none.
const DEFAULT_CURRENCY: &str = "RUB";

#[derive(Debug, Serialize)]
pub struct FirekassaInvoiceRequest {
    pub order_id: String,
    /// Major units
    pub amount: String,
    pub currency: Option<String>,
    pub success_url: Option<String>,
    pub fail_url: Option<String>,
    pub notification_url: Option<String>,
}

impl From<&GatewayNewPaymentRequest> for FirekassaInvoiceRequest {
    fn from(item: &GatewayNewPaymentRequest) -> Self {
        Self {
            order_id: item.payment_id.clone(),
            amount: to_major_unit_string(item.amount, &item.currency),
            currency: Some(item.currency.clone()),
            success_url: Some(item.success_redirect_url.clone()),
            fail_url: Some(item.failure_redirect_url.clone()),
            notification_url: Some(item.webhook_url.clone()),
        }
    }
}

impl FirekassaInvoiceRequest {
    /// Minimal invoice used to check credentials.
    pub fn credential_check(order_id: String) -> Self {
        Self {
            order_id,
            amount: "100.00".to_string(),
            currency: None,
            success_url: None,
            fail_url: None,
            notification_url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FirekassaInvoiceResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub payment_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FirekassaTransactionResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub updated_at: Option<String>,
    pub payment_error: Option<String>,
    pub error: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        serde_json::Value::String(text) => Some(text),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }))
}

pub fn payment_status(status: &str) -> PaymentStatus {
    match normalise_status(status).as_str() {
        "process" => PaymentStatus::Created,
        "paid" => PaymentStatus::Success,
        "expired" | "failed" | "declined" => PaymentStatus::Failed,
        "cancelled" | "canceled" => PaymentStatus::Cancelled,
        other => {
            logger::warn!(status = other, "unknown firekassa status");
            PaymentStatus::Created
        }
    }
}

impl FirekassaTransactionResponse {
    /// Amounts are read in the precision of the reported currency, RUB when none is reported.
    pub fn into_detail(
        self,
        gateway_payment_id: &str,
    ) -> CustomResult<GatewayPaymentDetail, GatewayError> {
        let status = payment_status(self.status.as_deref().unwrap_or_default());
        let paid_time = (status == PaymentStatus::Success).then(|| {
            self.updated_at
                .as_deref()
                .and_then(date_time::parse_rfc3339)
                .unwrap_or_else(date_time::now)
        });
        let amount = self
            .amount
            .as_deref()
            .map(|amount| {
                from_major_unit_str(amount, self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))
            })
            .transpose()?;
        Ok(GatewayPaymentDetail {
            gateway_payment_id: self.id.unwrap_or_else(|| gateway_payment_id.to_string()),
            status,
            amount,
            currency: self.currency,
            paid_time,
            reason: self.payment_error.filter(|error| !error.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FirekassaErrorResponse {
    pub error: Option<String>,
    pub message: Option<String>,
    pub code: Option<String>,
}

/// Canonical string signed by FireKassa: the non-empty values of [`SIGNED_FIELDS`] in order,
/// lower-cased, followed by the `X-Time` header.
pub fn webhook_signing_string(body: &serde_json::Value, timestamp: &str) -> String {
    let mut signing_string = SIGNED_FIELDS
        .iter()
        .filter_map(|field| value_at_path(body, field))
        .map(|value| value.to_lowercase())
        .collect::<String>();
    signing_string.push_str(timestamp);
    signing_string.to_lowercase()
}

/// Event of a notification, only deposits reconcile payments.
pub fn webhook_event(body: &serde_json::Value) -> IncomingWebhookEvent {
    match value_at_path(body, "type").as_deref() {
        Some("deposit") => {
            match payment_status(&value_at_path(body, "status").unwrap_or_default()) {
                PaymentStatus::Success => IncomingWebhookEvent::PaymentIntentSuccess,
                PaymentStatus::Failed => IncomingWebhookEvent::PaymentIntentFailure,
                PaymentStatus::Cancelled => IncomingWebhookEvent::PaymentIntentCancelled,
                PaymentStatus::Created => IncomingWebhookEvent::PaymentIntentProcessing,
            }
        }
        Some("withdrawal") => {
            logger::info!(
                id = value_at_path(body, "id"),
                status = value_at_path(body, "status"),
                "firekassa withdrawal notification ignored"
            );
            IncomingWebhookEvent::EventNotSupported
        }
        other => {
            logger::warn!(transaction_type = other, "unhandled firekassa transaction type");
            IncomingWebhookEvent::EventNotSupported
        }
    }
}
