pub mod gateway_http_log;
pub mod merchant_gateway;
pub mod payment;
pub mod refund;
pub mod webhook_delivery;
pub mod webhook_endpoint;
pub mod webhook_message;

pub use storage_impl::MockDb;

pub use self::gateway_http_log::StoreHttpLogger;
pub use crate::core::errors::CustomResult;

#[async_trait::async_trait]
pub trait StorageInterface:
    Send
    + Sync
    + dyn_clone::DynClone
    + std::fmt::Debug
    + gateway_http_log::GatewayHttpLogInterface
    + merchant_gateway::MerchantGatewayInterface
    + payment::PaymentInterface
    + refund::RefundInterface
    + webhook_delivery::WebhookDeliveryInterface
    + webhook_endpoint::WebhookEndpointInterface
    + webhook_message::WebhookMessageInterface
    + 'static
{
}

impl StorageInterface for MockDb {}

dyn_clone::clone_trait_object!(StorageInterface);
