#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Created,
    Success,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    /// `Success`, `Failed` and `Cancelled` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Created)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthorizeStatus {
    #[default]
    Initiated,
    Authorized,
    CaptureRequested,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefundStatus {
    #[default]
    Created,
    Success,
    Failed,
    Cancelled,
}

impl RefundStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Created)
    }
}

/// How a refund was settled.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefundType {
    /// Settled by the provider
    #[default]
    Gateway,
    /// Marked as refunded by the merchant outside of the provider
    Marked,
}

/// Providers with an adapter in this build.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    Ord,
    PartialOrd,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GatewayName {
    Airwallex,
    Alikassa,
    Blockonomics,
    Firekassa,
    Mulenpay,
}

#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GatewayType {
    #[default]
    Card,
    Crypto,
    Local,
}

/// Events delivered to merchant webhook endpoints.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum EventType {
    #[serde(rename = "payment.succeeded")]
    #[strum(serialize = "payment.succeeded")]
    PaymentSucceeded,
    #[serde(rename = "payment.failed")]
    #[strum(serialize = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "payment.cancelled")]
    #[strum(serialize = "payment.cancelled")]
    PaymentCancelled,
    #[serde(rename = "refund.succeeded")]
    #[strum(serialize = "refund.succeeded")]
    RefundSucceeded,
    #[serde(rename = "refund.failed")]
    #[strum(serialize = "refund.failed")]
    RefundFailed,
    #[serde(rename = "refund.cancelled")]
    #[strum(serialize = "refund.cancelled")]
    RefundCancelled,
}

#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WebhookMessageStatus {
    /// Queued for delivery
    #[default]
    Pending,
    /// Kept for the merchant portal, never queued
    Persisted,
    Archived,
    /// The event it depends on was never emitted, held for manual inspection
    Dead,
}

#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Delivered,
    /// Retry budget exhausted, held for manual inspection
    Dead,
}
