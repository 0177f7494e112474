use serde::Deserialize;

/// Base URLs of the provider APIs, one entry per adapter.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Gateways {
    pub airwallex: GatewayParams,
    pub alikassa: GatewayParams,
    pub blockonomics: GatewayParams,
    pub firekassa: GatewayParams,
    pub mulenpay: GatewayParams,
    /// Timeout for a single provider call
    pub request_timeout_secs: u64,
    /// Largest accepted age of a timestamped webhook
    pub webhook_tolerance_secs: i64,
    /// Lifetime of a cached gateway instance, edits made outside the registry show up after it
    pub instance_cache_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GatewayParams {
    pub base_url: String,
}

impl GatewayParams {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for Gateways {
    fn default() -> Self {
        Self {
            airwallex: GatewayParams::new("https://api.airwallex.com"),
            alikassa: GatewayParams::new("https://api.alikassa.com"),
            blockonomics: GatewayParams::new("https://www.blockonomics.co"),
            firekassa: GatewayParams::new("https://admin.vanilapay.com"),
            mulenpay: GatewayParams::new("https://api.mulenpay.ru"),
            request_timeout_secs: crate::consts::DEFAULT_GATEWAY_TIMEOUT_SECS,
            webhook_tolerance_secs: crate::consts::DEFAULT_WEBHOOK_TOLERANCE_SECS,
            instance_cache_ttl_secs: crate::consts::DEFAULT_INSTANCE_CACHE_TTL_SECS,
        }
    }
}

impl Gateways {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn instance_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.instance_cache_ttl_secs)
    }
}
