//! Request and response beans exchanged with gateway adapters

use common_enums::{GatewayType, PaymentStatus, RefundStatus};
use serde::Serialize;
use time::PrimitiveDateTime;

/// Raw provider response
#[derive(Clone, Debug)]
pub struct Response {
    pub headers: Option<http::HeaderMap>,
    pub response: bytes::Bytes,
    pub status_code: u16,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body rendered for audit logs
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.response).into_owned()
    }
}

/// Provider error normalised by `GatewayCommon::build_error_response`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status_code: u16,
    pub code: String,
    pub message: String,
    pub reason: Option<String>,
}

impl ErrorResponse {
    /// Text stored in `last_error` and surfaced in failure results.
    pub fn describe(&self) -> String {
        match &self.reason {
            Some(reason) => format!("{}: {}", self.code, reason),
            None => format!("{}: {}", self.code, self.message),
        }
    }
}

/// Shape of the acknowledgement returned to the provider for a webhook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookResponseKind {
    /// `{"status":"ok"}`
    JsonStatusOk,
    /// The literal `OK`
    PlainOk,
}

/// Static description of an adapter.
#[derive(Clone, Debug, Serialize)]
pub struct GatewayInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub supported_payment_types: &'static [&'static str],
    pub auto_charge: bool,
    pub is_staging: bool,
    pub gateway_type: GatewayType,
    pub webhook_response: WebhookResponseKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayTestResponse {
    pub icon: String,
    pub gateway_type: GatewayType,
}

#[derive(Clone, Debug)]
pub struct GatewayNewPaymentRequest {
    pub payment_id: String,
    pub merchant_id: String,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
    pub customer_email: Option<String>,
    pub country: Option<String>,
    /// Platform redirect endpoint for a completed checkout, ends with `success=true`
    pub success_redirect_url: String,
    /// Platform redirect endpoint for an abandoned or failed checkout, ends with `success=false`
    pub failure_redirect_url: String,
    /// Platform endpoint receiving the provider's notifications
    pub webhook_url: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayNewPaymentResponse {
    pub gateway_payment_id: Option<String>,
    pub gateway_payment_intent_id: Option<String>,
    pub redirect_link: Option<String>,
    pub status: PaymentStatus,
    pub reason: Option<String>,
}

impl GatewayNewPaymentResponse {
    /// Provider-side validation failure, reported as a failed payment rather than an error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            gateway_payment_id: None,
            gateway_payment_intent_id: None,
            redirect_link: None,
            status: PaymentStatus::Failed,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayPaymentDetail {
    pub gateway_payment_id: String,
    pub status: PaymentStatus,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub paid_time: Option<PrimitiveDateTime>,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayCaptureResponse {
    pub status: PaymentStatus,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayCancelResponse {
    pub status: PaymentStatus,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayRefundResponse {
    pub gateway_refund_id: Option<String>,
    pub status: RefundStatus,
    pub refund_amount: Option<i64>,
    pub reason: Option<String>,
}

impl GatewayRefundResponse {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            gateway_refund_id: None,
            status: RefundStatus::Failed,
            refund_amount: None,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GatewayPaymentMethodRequest {
    pub merchant_id: String,
    pub customer_id: String,
    pub payment_method_id: Option<String>,
    pub data: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayPaymentMethod {
    pub id: String,
    pub kind: String,
    pub last4: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerchantBalance {
    pub currency: String,
    pub amount: i64,
}

#[derive(Clone, Debug)]
pub struct CryptoFiatTransRequest {
    pub amount: i64,
    pub fiat_currency: String,
    pub crypto_currency: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CryptoFiatTransResponse {
    pub crypto_amount: String,
    pub rate: String,
}
