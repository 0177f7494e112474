/// Header Constants
pub(crate) mod headers {
    pub(crate) const ACCEPT: &str = "Accept";
    pub(crate) const AUTHORIZATION: &str = "Authorization";
    pub(crate) const CONTENT_TYPE: &str = "Content-Type";
    pub(crate) const SIGNATURE: &str = "Signature";
    pub(crate) const X_API_KEY: &str = "x-api-key";
    pub(crate) const X_API_SECRET: &str = "X-API-Secret";
    pub(crate) const X_AIRWALLEX_SIGNATURE: &str = "x-airwallex-signature";
    pub(crate) const X_ALIKASSA_SIGNATURE: &str = "x-alikassa-signature";
    pub(crate) const X_CLIENT_ID: &str = "x-client-id";
    pub(crate) const X_MULENPAY_SIGNATURE: &str = "x-mulenpay-signature";
    pub(crate) const X_SIGN: &str = "x-sign";
    pub(crate) const X_SIGNATURE: &str = "x-signature";
    pub(crate) const X_TIME: &str = "x-time";
}

/// Seconds before expiry at which a cached access token is refreshed
pub const ACCESS_TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
