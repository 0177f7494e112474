pub mod utils;

pub use common_utils::errors::CustomResult;
pub use gateway_interfaces::errors::GatewayError;
pub use scheduler::errors::{ProcessTrackerError, QueueError};
pub use storage_impl::errors::{ApplicationError, ApplicationResult, StorageError};

pub use self::api_error_response::ApiErrorResponse;
use crate::services::ApplicationResponse;

pub type RouterResult<T> = CustomResult<T, ApiErrorResponse>;
pub type RouterResponse<T> = CustomResult<ApplicationResponse<T>, ApiErrorResponse>;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WebhooksFlowError {
    #[error("Failed to store the webhook message")]
    MessageInsertFailed,
    #[error("Webhook message not found")]
    MessageNotFound,
    #[error("Failed to update the webhook message")]
    MessageUpdateFailed,
    #[error("Webhook message is not dead-lettered")]
    MessageNotDead,
    #[error("Failed to look up the merchant webhook endpoints")]
    EndpointLookupFailed,
    #[error("Merchant webhook endpoint not found")]
    EndpointNotFound,
    #[error("Failed to store the webhook delivery")]
    DeliveryInsertFailed,
    #[error("Webhook delivery not found")]
    DeliveryNotFound,
    #[error("Webhook delivery is not dead-lettered")]
    DeliveryNotDead,
    #[error("Failed to update the webhook delivery")]
    DeliveryUpdateFailed,
    #[error("Outgoing webhook body encoding failed")]
    OutgoingWebhookEncodingFailed,
    #[error("Failed to sign the outgoing webhook")]
    OutgoingWebhookSigningFailed,
    #[error("Failed to publish to the queue")]
    QueuePublishFailed,
    #[error("Internal listener {listener} failed")]
    ListenerFailed { listener: &'static str },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("Gateway {gateway_id} does not exist or is archived")]
    GatewayNotFound { gateway_id: i64 },
    #[error("No adapter is configured for {gateway_name}")]
    GatewayNotConfigured { gateway_name: String },
    #[error("The merchant's only active gateway can not be archived")]
    LastGatewayProtected,
    #[error("Gateway {gateway_id} is archived")]
    GatewayArchived { gateway_id: i64 },
    #[error("The gateway rejected the credentials")]
    CredentialInvalid,
    #[error("Credential check could not be completed")]
    CredentialCheckFailed,
    #[error("Storage operation failed")]
    StorageFailure,
}

/// Failures reported by the invoice, subscription and operation log services.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CollaboratorError {
    #[error("Invoice update failed")]
    InvoiceUpdateFailed,
    #[error("Subscription update failed")]
    SubscriptionUpdateFailed,
    #[error("Failed to append to the operation log")]
    OptLogFailed,
}

pub mod api_error_response {
    use actix_web::{http::StatusCode, ResponseError};
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum ApiErrorResponse {
        #[error("Webhook signature verification failed")]
        WebhookAuthenticationFailed,
        #[error("Webhook body could not be processed")]
        WebhookBadRequest,
        #[error("Webhook processing failed")]
        WebhookProcessingFailure,
        #[error("Gateway not found")]
        GatewayNotFound,
        #[error("Gateway {gateway_name} is not configured")]
        GatewayNotConfigured { gateway_name: String },
        #[error("Gateway is archived")]
        GatewayArchived,
        #[error("The merchant's only active gateway can not be archived")]
        LastGatewayProtected,
        #[error("Gateway credentials are invalid")]
        InvalidGatewayCredentials,
        #[error("Payment not found")]
        PaymentNotFound,
        #[error("Refund not found")]
        RefundNotFound,
        #[error("Webhook delivery not found")]
        WebhookDeliveryNotFound,
        #[error("Webhook delivery is not dead-lettered")]
        WebhookDeliveryNotDead,
        #[error("Missing required param: {field_name}")]
        MissingRequiredField { field_name: &'static str },
        #[error("Invalid request data: {message}")]
        InvalidRequestData { message: String },
        #[error("The gateway is unavailable, try again later")]
        GatewayUnavailable,
        #[error("{flow} is not supported by the gateway")]
        NotSupported { flow: String },
        #[error("Something went wrong")]
        InternalServerError,
    }

    #[derive(Debug, Serialize)]
    struct ErrorBody<'a> {
        #[serde(rename = "type")]
        error_type: &'static str,
        code: &'static str,
        message: &'a str,
    }

    #[derive(Debug, Serialize)]
    struct ErrorResponse<'a> {
        error: ErrorBody<'a>,
    }

    impl ApiErrorResponse {
        pub fn error_type(&self) -> &'static str {
            match self.status_code().as_u16() {
                401 => "authentication_error",
                404 => "object_not_found",
                500..=599 => "api_error",
                _ => "invalid_request",
            }
        }

        pub fn error_code(&self) -> &'static str {
            match self {
                Self::WebhookAuthenticationFailed => "WE_01",
                Self::WebhookBadRequest => "WE_02",
                Self::WebhookProcessingFailure => "WE_03",
                Self::WebhookDeliveryNotFound => "WE_04",
                Self::WebhookDeliveryNotDead => "WE_05",
                Self::GatewayNotFound => "GW_01",
                Self::GatewayNotConfigured { .. } => "GW_02",
                Self::GatewayArchived => "GW_03",
                Self::LastGatewayProtected => "GW_04",
                Self::InvalidGatewayCredentials => "GW_05",
                Self::GatewayUnavailable => "GW_06",
                Self::NotSupported { .. } => "GW_07",
                Self::PaymentNotFound => "HE_02",
                Self::RefundNotFound => "HE_03",
                Self::MissingRequiredField { .. } => "IR_04",
                Self::InvalidRequestData { .. } => "IR_06",
                Self::InternalServerError => "HE_00",
            }
        }

        /// `{"error": {"type", "code", "message"}}`
        pub fn to_json(&self) -> String {
            let message = self.to_string();
            let body = ErrorResponse {
                error: ErrorBody {
                    error_type: self.error_type(),
                    code: self.error_code(),
                    message: &message,
                },
            };
            serde_json::to_string(&body).unwrap_or_else(|_| {
                r#"{"error":{"type":"api_error","code":"HE_00","message":"Something went wrong"}}"#
                    .to_string()
            })
        }
    }

    impl ResponseError for ApiErrorResponse {
        fn status_code(&self) -> StatusCode {
            match self {
                Self::WebhookAuthenticationFailed => StatusCode::UNAUTHORIZED,
                Self::WebhookBadRequest
                | Self::MissingRequiredField { .. }
                | Self::InvalidRequestData { .. }
                | Self::InvalidGatewayCredentials => StatusCode::BAD_REQUEST,
                Self::GatewayNotFound
                | Self::PaymentNotFound
                | Self::RefundNotFound
                | Self::WebhookDeliveryNotFound => StatusCode::NOT_FOUND,
                Self::GatewayArchived
                | Self::LastGatewayProtected
                | Self::WebhookDeliveryNotDead => StatusCode::CONFLICT,
                Self::GatewayNotConfigured { .. } | Self::NotSupported { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                Self::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                Self::WebhookProcessingFailure | Self::InternalServerError => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }

        fn error_response(&self) -> actix_web::HttpResponse {
            use actix_web::http::header;

            actix_web::HttpResponseBuilder::new(self.status_code())
                .insert_header((header::CONTENT_TYPE, mime::APPLICATION_JSON))
                .body(self.to_json())
        }
    }

}
