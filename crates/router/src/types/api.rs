use serde::{Deserialize, Serialize};

/// Query of `GET /gateway/{gateway_id}/redirect`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GatewayRedirectQuery {
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
    pub success: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RedirectStatus {
    Paid,
    Failed,
    Cancelled,
    Pending,
    Invalid,
}

/// Status page rendered when there is no URL to send the user to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRedirectResponse {
    pub payment_id: Option<String>,
    pub status: RedirectStatus,
    pub success: bool,
    pub message: String,
    pub return_url: Option<String>,
}

/// Payment creation input of the checkout flow.
#[derive(Clone, Debug, Default)]
pub struct PaymentCreateRequest {
    pub merchant_id: String,
    pub gateway_id: i64,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
    pub customer_email: Option<String>,
    pub country: Option<String>,
    pub return_url: Option<String>,
    pub subscription_id: Option<String>,
    pub invoice_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaymentCreateResponse {
    pub payment_id: String,
    pub status: common_enums::PaymentStatus,
    /// Hosted payment page, absent when the provider answered synchronously
    pub redirect_link: Option<String>,
    pub reason: Option<String>,
}
