/// Topic consumed by the internal listeners
pub const INTERNAL_WEBHOOK_TOPIC: &str = "internal_webhook";

/// Topic consumed by the merchant webhook delivery workers
pub const MERCHANT_WEBHOOK_TOPIC: &str = "merchant_webhook";

pub const EVENT_ID_PREFIX: &str = "evt";
pub const WEBHOOK_MESSAGE_ID_PREFIX: &str = "whm";
pub const WEBHOOK_DELIVERY_ID_PREFIX: &str = "whd";

/// Metadata keys of an outgoing event
pub const METADATA_PERSISTENCE: &str = "Persistence";
pub const METADATA_SUBSCRIPTION_ID: &str = "SubscriptionId";

/// Payment metadata key holding the URL used when the user abandons the checkout
pub const METADATA_CANCEL_URL: &str = "CancelUrl";

/// Deferrals of a message whose dependency was never emitted before it is dead-lettered
pub const MAX_UNKNOWN_DEPENDENCY_DEFERRALS: u32 = 10;
