pub mod gateway_http_log;
pub mod merchant_gateway;
pub mod payment;
pub mod refund;
pub mod webhook_delivery;
pub mod webhook_endpoint;
pub mod webhook_message;

pub use common_enums as enums;

pub use self::{
    gateway_http_log::{GatewayHttpLog, GatewayHttpLogNew},
    merchant_gateway::{MerchantGateway, MerchantGatewayNew, MerchantGatewayUpdate},
    payment::{Payment, PaymentNew, PaymentUpdate},
    refund::{Refund, RefundNew, RefundUpdate},
    webhook_delivery::{WebhookDelivery, WebhookDeliveryNew, WebhookDeliveryUpdate},
    webhook_endpoint::{MerchantWebhookEndpoint, MerchantWebhookEndpointNew},
    webhook_message::{WebhookMessage, WebhookMessageNew},
};
