//! Types.

use serde::Deserialize;
use strum::{Display, EnumString};

/// Category and tag of log event.
#[derive(Debug, Default, Deserialize, Clone, Display, EnumString)]
pub enum Tag {
    /// General.
    #[default]
    General,

    /// API: incoming web request.
    ApiIncomingRequest,
    /// API: outgoing web request.
    ApiOutgoingRequest,

    /// Call initiated to a payment gateway.
    InitiatedToGateway,
    /// Response received from a payment gateway.
    GatewayResponse,

    /// Message published to the queue.
    QueuePublish,
    /// Message consumed from the queue.
    QueueConsume,

    /// Event: general.
    Event,
}

/// API and worker flows, attached to spans as the `flow` field.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Health check
    HealthCheck,
    /// Inbound gateway webhook
    IncomingWebhookReceive,
    /// User returning from a hosted payment page
    GatewayRedirect,
    /// Gateway instance setup
    GatewaySetup,
    /// Gateway instance edit
    GatewayEdit,
    /// Gateway archive
    GatewayArchive,
    /// Gateway restore
    GatewayRestore,
    /// Gateway set default
    GatewaySetDefault,
    /// Payment creation at the provider
    PaymentCreate,
    /// Payment reconciliation
    PaymentReconcile,
    /// Refund reconciliation
    RefundReconcile,
    /// Outgoing event emission
    OutgoingWebhookEmit,
    /// Outgoing webhook delivery
    OutgoingWebhookDelivery,
    /// Internal listener dispatch
    InternalWebhookDispatch,
    /// Manual retry of a dead delivery or message
    OutgoingWebhookRetryDead,
    /// Sweep of messages whose publishing was interrupted
    OutgoingWebhookRepublish,
}
