use common_enums::{PaymentStatus, RefundStatus};
use common_utils::{date_time, errors::CustomResult};
use error_stack::report;
use gateway_interfaces::{
    api::{from_major_unit_str, to_major_unit_string},
    errors::GatewayError,
    types::{GatewayNewPaymentRequest, GatewayPaymentDetail, GatewayRefundResponse},
};
use masking::Secret;
use serde::{Deserialize, Serialize};
use storage_models::{Payment, Refund};

fn to_decimal_amount(amount: i64, currency: &str) -> Result<f64, GatewayError> {
    to_major_unit_string(amount, currency)
        .parse::<f64>()
        .map_err(|_| GatewayError::RequestEncodingFailed)
}

/// Airwallex reports major units as JSON numbers, parsed through their shortest decimal form.
fn to_minor_amount(amount: f64, currency: Option<&str>) -> CustomResult<i64, GatewayError> {
    if !amount.is_finite() {
        return Err(report!(GatewayError::ResponseHandlingFailed)
            .attach_printable(format!("Invalid amount {amount}")));
    }
    from_major_unit_str(&amount.to_string(), currency.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
pub struct AirwallexAuthUpdateResponse {
    pub token: Secret<String>,
    /// RFC 3339
    pub expires_at: Option<String>,
    /// Seconds
    pub expires_in: Option<i64>,
}

impl AirwallexAuthUpdateResponse {
    /// Token expiry as a unix timestamp, 30 minutes when the provider sends none.
    pub fn expires_at_unix(&self, now: i64) -> i64 {
        self.expires_at
            .as_deref()
            .and_then(date_time::parse_rfc3339)
            .map(|expiry| expiry.assume_utc().unix_timestamp())
            .or_else(|| self.expires_in.map(|seconds| now.saturating_add(seconds)))
            .unwrap_or_else(|| now.saturating_add(30 * 60))
    }
}

#[derive(Debug, Serialize)]
pub struct AirwallexPaymentMethodType {
    #[serde(rename = "type")]
    pub method_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AirwallexIntentRequest {
    // Unique ID to be sent for each transaction/operation request to the gateway
    pub request_id: String,
    pub amount: f64,
    pub currency: String,
    pub merchant_order_id: String,
    pub description: String,
    pub payment_method: AirwallexPaymentMethodType,
    pub return_url: String,
}

impl TryFrom<&GatewayNewPaymentRequest> for AirwallexIntentRequest {
    type Error = GatewayError;

    fn try_from(item: &GatewayNewPaymentRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            request_id: item.payment_id.clone(),
            amount: to_decimal_amount(item.amount, &item.currency)?,
            currency: item.currency.to_uppercase(),
            merchant_order_id: item.payment_id.clone(),
            description: item
                .description
                .clone()
                .unwrap_or_else(|| item.payment_id.clone()),
            payment_method: AirwallexPaymentMethodType {
                method_type: "card",
            },
            return_url: item.success_redirect_url.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AirwallexPaymentsCaptureRequest {
    pub request_id: String,
    pub amount: f64,
}

impl TryFrom<&Payment> for AirwallexPaymentsCaptureRequest {
    type Error = GatewayError;

    fn try_from(item: &Payment) -> Result<Self, Self::Error> {
        Ok(Self {
            request_id: format!("{}_capture", item.payment_id),
            amount: to_decimal_amount(item.total_amount, &item.currency)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AirwallexPaymentsCancelRequest {
    pub request_id: String,
    pub cancellation_reason: Option<String>,
}

impl From<&Payment> for AirwallexPaymentsCancelRequest {
    fn from(item: &Payment) -> Self {
        Self {
            request_id: format!("{}_cancel", item.payment_id),
            cancellation_reason: Some("Cancelled by merchant".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AirwallexPaymentStatus {
    Succeeded,
    Failed,
    Pending,
    RequiresPaymentMethod,
    RequiresCustomerAction,
    RequiresCapture,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl From<AirwallexPaymentStatus> for PaymentStatus {
    fn from(item: AirwallexPaymentStatus) -> Self {
        match item {
            AirwallexPaymentStatus::Succeeded => Self::Success,
            AirwallexPaymentStatus::Failed => Self::Failed,
            AirwallexPaymentStatus::Cancelled => Self::Cancelled,
            AirwallexPaymentStatus::Pending
            | AirwallexPaymentStatus::RequiresPaymentMethod
            | AirwallexPaymentStatus::RequiresCustomerAction
            | AirwallexPaymentStatus::RequiresCapture
            | AirwallexPaymentStatus::Unknown => Self::Created,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AirwallexPaymentError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AirwallexPaymentsResponse {
    pub id: String,
    pub status: AirwallexPaymentStatus,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub updated_at: Option<String>,
    pub client_secret: Option<Secret<String>>,
    pub last_payment_error: Option<AirwallexPaymentError>,
}

impl TryFrom<AirwallexPaymentsResponse> for GatewayPaymentDetail {
    type Error = error_stack::Report<GatewayError>;

    fn try_from(item: AirwallexPaymentsResponse) -> Result<Self, Self::Error> {
        let status = PaymentStatus::from(item.status);
        let paid_time = match status {
            PaymentStatus::Success => item
                .updated_at
                .as_deref()
                .and_then(date_time::parse_rfc3339)
                .or_else(|| Some(date_time::now())),
            _ => None,
        };
        let amount = item
            .amount
            .map(|amount| to_minor_amount(amount, item.currency.as_deref()))
            .transpose()?;
        Ok(Self {
            gateway_payment_id: item.id,
            status,
            amount,
            currency: item.currency,
            paid_time,
            reason: item
                .last_payment_error
                .and_then(|error| error.message.or(error.code)),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AirwallexRefundRequest {
    // Unique ID to be sent for each transaction/operation request to the gateway
    pub request_id: String,
    pub amount: Option<f64>,
    pub reason: Option<String>,
    // Identifier for the PaymentIntent for which Refund is requested
    pub payment_intent_id: String,
}

impl TryFrom<(&Payment, &Refund)> for AirwallexRefundRequest {
    type Error = GatewayError;

    fn try_from((payment, refund): (&Payment, &Refund)) -> Result<Self, Self::Error> {
        let payment_intent_id = payment
            .gateway_payment_intent_id
            .clone()
            .or_else(|| payment.gateway_payment_id.clone())
            .ok_or(GatewayError::MissingRequiredField {
                field_name: "gateway_payment_intent_id",
            })?;
        Ok(Self {
            request_id: refund.refund_id.clone(),
            amount: Some(to_decimal_amount(refund.refund_amount, &refund.currency)?),
            reason: refund.reason.clone(),
            payment_intent_id,
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AirwallexRefundStatus {
    Succeeded,
    Settled,
    Failed,
    Received,
    Accepted,
    Pending,
    #[serde(other)]
    Unknown,
}

impl From<AirwallexRefundStatus> for RefundStatus {
    fn from(item: AirwallexRefundStatus) -> Self {
        match item {
            AirwallexRefundStatus::Succeeded | AirwallexRefundStatus::Settled => Self::Success,
            AirwallexRefundStatus::Failed => Self::Failed,
            AirwallexRefundStatus::Received
            | AirwallexRefundStatus::Accepted
            | AirwallexRefundStatus::Pending
            | AirwallexRefundStatus::Unknown => Self::Created,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AirwallexRefundResponse {
    pub id: String,
    pub status: AirwallexRefundStatus,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub failure_reason: Option<String>,
}

impl TryFrom<AirwallexRefundResponse> for GatewayRefundResponse {
    type Error = error_stack::Report<GatewayError>;

    fn try_from(item: AirwallexRefundResponse) -> Result<Self, Self::Error> {
        let refund_amount = item
            .amount
            .map(|amount| to_minor_amount(amount, item.currency.as_deref()))
            .transpose()?;
        Ok(Self {
            gateway_refund_id: Some(item.id),
            status: RefundStatus::from(item.status),
            refund_amount,
            reason: item.failure_reason,
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AirwallexErrorResponse {
    pub code: String,
    pub message: String,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AirwallexWebhookObject {
    pub id: String,
    pub status: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub reason: Option<String>,
    pub last_payment_error: Option<AirwallexPaymentError>,
}

#[derive(Debug, Deserialize)]
pub struct AirwallexWebhookData {
    pub object: AirwallexWebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct AirwallexWebhookEventDetails {
    pub id: Option<String>,
    pub name: String,
    pub data: AirwallexWebhookData,
}

#[derive(Debug, Deserialize)]
pub struct AirwallexWebhookEventName {
    pub name: String,
}
