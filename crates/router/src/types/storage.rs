pub use storage_models::{
    enums, GatewayHttpLog, GatewayHttpLogNew, MerchantGateway, MerchantGatewayNew,
    MerchantGatewayUpdate, MerchantWebhookEndpoint, MerchantWebhookEndpointNew, Payment,
    PaymentNew, PaymentUpdate, Refund, RefundNew, RefundUpdate, WebhookDelivery,
    WebhookDeliveryNew, WebhookDeliveryUpdate, WebhookMessage, WebhookMessageNew,
};
