use crate::{
    core::errors::{self, GatewayError, RegistryError},
    logger,
};

pub trait StorageErrorExt {
    fn to_not_found_response(
        self,
        not_found_response: errors::ApiErrorResponse,
    ) -> error_stack::Report<errors::ApiErrorResponse>;

    fn to_duplicate_response(
        self,
        duplicate_response: errors::ApiErrorResponse,
    ) -> error_stack::Report<errors::ApiErrorResponse>;
}

impl StorageErrorExt for error_stack::Report<errors::StorageError> {
    fn to_not_found_response(
        self,
        not_found_response: errors::ApiErrorResponse,
    ) -> error_stack::Report<errors::ApiErrorResponse> {
        if self.current_context().is_db_not_found() {
            self.change_context(not_found_response)
        } else {
            self.change_context(errors::ApiErrorResponse::InternalServerError)
        }
    }

    fn to_duplicate_response(
        self,
        duplicate_response: errors::ApiErrorResponse,
    ) -> error_stack::Report<errors::ApiErrorResponse> {
        if self.current_context().is_db_unique_violation() {
            self.change_context(duplicate_response)
        } else {
            self.change_context(errors::ApiErrorResponse::InternalServerError)
        }
    }
}

pub trait GatewayErrorExt {
    fn to_gateway_failed_response(self) -> error_stack::Report<errors::ApiErrorResponse>;
}

impl GatewayErrorExt for error_stack::Report<GatewayError> {
    fn to_gateway_failed_response(self) -> error_stack::Report<errors::ApiErrorResponse> {
        let response = match self.current_context() {
            GatewayError::ProviderUnavailable => errors::ApiErrorResponse::GatewayUnavailable,
            GatewayError::CredentialInvalid => errors::ApiErrorResponse::InvalidGatewayCredentials,
            GatewayError::NotSupported { flow, .. } => errors::ApiErrorResponse::NotSupported {
                flow: (*flow).to_string(),
            },
            GatewayError::WebhookSignatureNotFound
            | GatewayError::WebhookSourceVerificationFailed
            | GatewayError::WebhookVerificationSecretNotFound
            | GatewayError::WebhookTimestampExpired => {
                errors::ApiErrorResponse::WebhookAuthenticationFailed
            }
            GatewayError::WebhookBodyDecodingFailed
            | GatewayError::WebhookReferenceIdNotFound
            | GatewayError::WebhookEventTypeNotFound
            | GatewayError::WebhookResourceObjectNotFound => {
                errors::ApiErrorResponse::WebhookBadRequest
            }
            error => {
                logger::error!(?error, "gateway call failed");
                errors::ApiErrorResponse::InternalServerError
            }
        };
        self.change_context(response)
    }
}

pub trait RegistryErrorExt {
    fn to_registry_response(self) -> error_stack::Report<errors::ApiErrorResponse>;
}

impl RegistryErrorExt for error_stack::Report<RegistryError> {
    fn to_registry_response(self) -> error_stack::Report<errors::ApiErrorResponse> {
        let response = match self.current_context() {
            RegistryError::GatewayNotFound { .. } => errors::ApiErrorResponse::GatewayNotFound,
            RegistryError::GatewayNotConfigured { gateway_name } => {
                errors::ApiErrorResponse::GatewayNotConfigured {
                    gateway_name: gateway_name.clone(),
                }
            }
            RegistryError::LastGatewayProtected => errors::ApiErrorResponse::LastGatewayProtected,
            RegistryError::GatewayArchived { .. } => errors::ApiErrorResponse::GatewayArchived,
            RegistryError::CredentialInvalid => errors::ApiErrorResponse::InvalidGatewayCredentials,
            RegistryError::CredentialCheckFailed => errors::ApiErrorResponse::GatewayUnavailable,
            RegistryError::StorageFailure => errors::ApiErrorResponse::InternalServerError,
        };
        self.change_context(response)
    }
}

pub trait WebhooksFlowErrorExt {
    fn to_webhook_flow_response(self) -> error_stack::Report<errors::ApiErrorResponse>;
}

impl WebhooksFlowErrorExt for error_stack::Report<errors::WebhooksFlowError> {
    fn to_webhook_flow_response(self) -> error_stack::Report<errors::ApiErrorResponse> {
        let response = match self.current_context() {
            errors::WebhooksFlowError::DeliveryNotFound => {
                errors::ApiErrorResponse::WebhookDeliveryNotFound
            }
            errors::WebhooksFlowError::DeliveryNotDead | errors::WebhooksFlowError::MessageNotDead => {
                errors::ApiErrorResponse::WebhookDeliveryNotDead
            }
            _ => errors::ApiErrorResponse::WebhookProcessingFailure,
        };
        self.change_context(response)
    }
}
