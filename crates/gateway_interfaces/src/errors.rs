//! Errors raised by gateway adapters

/// Error raised by an adapter operation or by webhook verification.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GatewayError {
    #[error("The gateway rejected the configured key or secret")]
    CredentialInvalid,
    #[error("{flow} is not supported by {gateway}")]
    NotSupported {
        flow: &'static str,
        gateway: &'static str,
    },
    #[error("The gateway could not be reached or did not answer in time")]
    ProviderUnavailable,
    #[error("Failed to encode gateway request")]
    RequestEncodingFailed,
    #[error("Failed to deserialize gateway response")]
    ResponseDeserializationFailed,
    #[error("Failed to handle gateway response")]
    ResponseHandlingFailed,
    #[error("The gateway returned an unexpected response with status {status_code}")]
    UnexpectedResponse { status_code: u16 },
    #[error("Missing required field: {field_name}")]
    MissingRequiredField { field_name: &'static str },
    #[error("Signature not found for incoming webhook")]
    WebhookSignatureNotFound,
    #[error("Failed to verify webhook source")]
    WebhookSourceVerificationFailed,
    #[error("Could not find the webhook secret of the gateway")]
    WebhookVerificationSecretNotFound,
    #[error("Incoming webhook timestamp is outside the accepted window")]
    WebhookTimestampExpired,
    #[error("Failed to decode webhook event body")]
    WebhookBodyDecodingFailed,
    #[error("Incoming webhook object reference ID not found")]
    WebhookReferenceIdNotFound,
    #[error("Incoming webhook event type not found")]
    WebhookEventTypeNotFound,
    #[error("Incoming webhook event resource object not found")]
    WebhookResourceObjectNotFound,
}

impl GatewayError {
    /// The outcome of the call is unknown, the entity must stay in its current state.
    pub fn is_unknown_outcome(&self) -> bool {
        matches!(self, Self::ProviderUnavailable)
    }

    pub fn not_supported(flow: &'static str, gateway: &'static str) -> Self {
        Self::NotSupported { flow, gateway }
    }
}

/// Failures of the HTTP client itself
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ApiClientError {
    #[error("Failed to construct the request")]
    RequestBuildFailed,
    #[error("URL encoding of request payload failed")]
    UrlEncodingFailed,
    #[error("Failed to send request")]
    RequestNotSent(String),
    #[error("Server responded with Request Timeout")]
    RequestTimeoutReceived,
    #[error("Connection closed before a message could complete")]
    ConnectionClosed,
    #[error("Failed to decode response")]
    ResponseDecodingFailed,
}

impl ApiClientError {
    pub fn is_timeout_or_connection_error(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeoutReceived | Self::ConnectionClosed | Self::RequestNotSent(_)
        )
    }
}
