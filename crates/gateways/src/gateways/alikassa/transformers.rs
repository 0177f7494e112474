use common_enums::{PaymentStatus, RefundStatus};
use common_utils::date_time;
use gateway_interfaces::{
    types::{GatewayNewPaymentRequest, GatewayPaymentDetail, GatewayRefundResponse},
    webhooks::IncomingWebhookEvent,
};
use router_env::logger;
use serde::{Deserialize, Serialize};
use storage_models::{Payment, Refund};

use crate::utils::normalise_status;

#[derive(Debug, Deserialize)]
pub struct AlikassaResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> AlikassaResponse<T> {
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_else(|| "request was not successful".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlikassaInvoiceRequest {
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub order_id: String,
    pub description: String,
    pub return_url: String,
    pub fail_url: String,
    pub payment_type: &'static str,
}

impl From<&GatewayNewPaymentRequest> for AlikassaInvoiceRequest {
    fn from(item: &GatewayNewPaymentRequest) -> Self {
        Self {
            amount: item.amount,
            currency: item.currency.clone(),
            order_id: item.payment_id.clone(),
            description: format!("Payment for order {}", item.payment_id),
            return_url: item.success_redirect_url.clone(),
            fail_url: item.failure_redirect_url.clone(),
            payment_type: "card",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AlikassaInvoiceData {
    pub invoice_id: String,
    pub status: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub link: Option<String>,
    pub updated_at: Option<String>,
}

pub fn payment_status(status: &str) -> PaymentStatus {
    match normalise_status(status).as_str() {
        "pending" => PaymentStatus::Created,
        "succeeded" | "completed" => PaymentStatus::Success,
        "failed" | "declined" => PaymentStatus::Failed,
        "cancelled" | "canceled" => PaymentStatus::Cancelled,
        other => {
            logger::warn!(status = other, "unknown alikassa invoice status");
            PaymentStatus::Created
        }
    }
}

pub fn refund_status(status: &str) -> RefundStatus {
    match normalise_status(status).as_str() {
        "pending" => RefundStatus::Created,
        "succeeded" | "completed" => RefundStatus::Success,
        "failed" | "declined" => RefundStatus::Failed,
        "cancelled" | "canceled" => RefundStatus::Cancelled,
        other => {
            logger::warn!(status = other, "unknown alikassa refund status");
            RefundStatus::Created
        }
    }
}

impl From<AlikassaInvoiceData> for GatewayPaymentDetail {
    fn from(item: AlikassaInvoiceData) -> Self {
        let status = payment_status(&item.status);
        let paid_time = (status == PaymentStatus::Success).then(|| {
            item.updated_at
                .as_deref()
                .and_then(date_time::parse_rfc3339)
                .unwrap_or_else(date_time::now)
        });
        Self {
            gateway_payment_id: item.invoice_id,
            status,
            amount: item.amount,
            currency: item.currency,
            paid_time,
            reason: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlikassaRefundRequest {
    pub payment_id: String,
    pub amount: i64,
    pub currency: String,
    pub reason: Option<String>,
}

impl TryFrom<(&Payment, &Refund)> for AlikassaRefundRequest {
    type Error = gateway_interfaces::errors::GatewayError;

    fn try_from((payment, refund): (&Payment, &Refund)) -> Result<Self, Self::Error> {
        Ok(Self {
            payment_id: payment.gateway_payment_id.clone().ok_or(
                Self::Error::MissingRequiredField {
                    field_name: "gateway_payment_id",
                },
            )?,
            amount: refund.refund_amount,
            currency: refund.currency.clone(),
            reason: refund.reason.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AlikassaRefundData {
    pub refund_id: String,
    pub status: String,
    pub amount: Option<i64>,
}

impl From<AlikassaRefundData> for GatewayRefundResponse {
    fn from(item: AlikassaRefundData) -> Self {
        Self {
            gateway_refund_id: Some(item.refund_id),
            status: refund_status(&item.status),
            refund_amount: item.amount,
            reason: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AlikassaErrorResponse {
    pub error: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlikassaWebhookObject {
    pub id: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlikassaWebhookBody {
    pub event: String,
    pub payment: Option<AlikassaWebhookObject>,
    pub refund: Option<AlikassaWebhookObject>,
}

impl AlikassaWebhookBody {
    pub fn event_type(&self) -> IncomingWebhookEvent {
        match (self.event.as_str(), &self.payment, &self.refund) {
            ("payment.finished", Some(payment), _) => {
                match payment_status(payment.status.as_deref().unwrap_or_default()) {
                    PaymentStatus::Success => IncomingWebhookEvent::PaymentIntentSuccess,
                    PaymentStatus::Failed => IncomingWebhookEvent::PaymentIntentFailure,
                    PaymentStatus::Cancelled => IncomingWebhookEvent::PaymentIntentCancelled,
                    PaymentStatus::Created => IncomingWebhookEvent::PaymentIntentProcessing,
                }
            }
            ("refund.finished", _, Some(refund)) => {
                match refund_status(refund.status.as_deref().unwrap_or_default()) {
                    RefundStatus::Success => IncomingWebhookEvent::RefundSuccess,
                    RefundStatus::Failed => IncomingWebhookEvent::RefundFailure,
                    RefundStatus::Cancelled => IncomingWebhookEvent::RefundCancelled,
                    RefundStatus::Created => IncomingWebhookEvent::RefundProcessing,
                }
            }
            _ => IncomingWebhookEvent::EventNotSupported,
        }
    }

    /// Raw provider status of the object the event is about.
    pub fn object_status(&self) -> Option<String> {
        match self.event.as_str() {
            "refund.finished" => self.refund.as_ref(),
            _ => self.payment.as_ref(),
        }
        .and_then(|object| object.status.clone())
    }
}
