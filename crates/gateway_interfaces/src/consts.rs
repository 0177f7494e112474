/// Timeout applied to every provider call unless configured otherwise
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;

/// Placeholder code when the provider did not send one
pub const NO_ERROR_CODE: &str = "No error code";

/// Placeholder message when the provider did not send one
pub const NO_ERROR_MESSAGE: &str = "No error message";

/// Largest accepted age of a timestamped webhook
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// How long a resolved gateway instance is served from memory
pub const DEFAULT_INSTANCE_CACHE_TTL_SECS: u64 = 30;
