//! Verification and parsing of provider callbacks

use common_utils::{
    crypto::{self, SignatureEncoding, VerifySignature},
    errors::CustomResult,
};
use error_stack::ResultExt;
use masking::{ExposeInterface, PeekInterface};
use storage_models::MerchantGateway;

use crate::{api::GatewayCommon, errors::GatewayError, types::WebhookResponseKind};

/// Raw inbound webhook
#[derive(Debug)]
pub struct IncomingWebhookRequestDetails<'a> {
    pub method: http::Method,
    pub headers: &'a http::HeaderMap,
    pub body: &'a [u8],
    pub query_params: String,
}

impl IncomingWebhookRequestDetails<'_> {
    /// Value of a header, `None` when absent or not valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Provider event, normalised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncomingWebhookEvent {
    PaymentIntentSuccess,
    PaymentIntentFailure,
    PaymentIntentCancelled,
    PaymentIntentProcessing,
    RefundSuccess,
    RefundFailure,
    RefundCancelled,
    RefundProcessing,
    EventNotSupported,
}

impl IncomingWebhookEvent {
    pub fn is_refund_event(self) -> bool {
        matches!(
            self,
            Self::RefundSuccess
                | Self::RefundFailure
                | Self::RefundCancelled
                | Self::RefundProcessing
        )
    }
}

/// Provider identifier of the object an event refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectReferenceId {
    /// `Payment::gateway_payment_id`
    PaymentId(String),
    /// `Refund::gateway_refund_id`
    RefundId(String),
}

/// Webhook handling of an adapter.
///
/// The default verification is HMAC over the raw body, with the signature read from a header
/// and compared in constant time.
pub trait IncomingWebhook: GatewayCommon + Sync {
    fn get_webhook_source_verification_algorithm(
        &self,
        _request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<Box<dyn VerifySignature + Send>, GatewayError> {
        Ok(Box::new(crypto::NoAlgorithm))
    }

    fn get_webhook_signature_encoding(&self) -> SignatureEncoding {
        SignatureEncoding::Hex
    }

    fn get_webhook_source_verification_merchant_secret(
        &self,
        gateway: &MerchantGateway,
    ) -> CustomResult<Vec<u8>, GatewayError> {
        gateway
            .webhook_secret
            .clone()
            .map(|secret| secret.expose().into_bytes())
            .ok_or(GatewayError::WebhookVerificationSecretNotFound.into())
    }

    /// Signature as carried by the request, still encoded.
    fn get_webhook_source_verification_signature(
        &self,
        _request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<String, GatewayError> {
        Ok(String::new())
    }

    fn get_webhook_source_verification_message(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
        _secret: &[u8],
    ) -> CustomResult<Vec<u8>, GatewayError> {
        Ok(request.body.to_vec())
    }

    fn verify_webhook_source(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
        gateway: &MerchantGateway,
    ) -> CustomResult<bool, GatewayError> {
        let algorithm = self.get_webhook_source_verification_algorithm(request)?;
        let secret = self.get_webhook_source_verification_merchant_secret(gateway)?;
        let signature = self.get_webhook_source_verification_signature(request)?;
        let message = self.get_webhook_source_verification_message(request, &secret)?;

        crypto::decode_and_verify(
            algorithm.as_ref(),
            self.get_webhook_signature_encoding(),
            &secret,
            &signature,
            &message,
        )
        .change_context(GatewayError::WebhookSourceVerificationFailed)
        .attach_printable("Webhook source verification failed")
    }

    fn get_webhook_object_reference_id(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<ObjectReferenceId, GatewayError>;

    fn get_webhook_event_type(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<IncomingWebhookEvent, GatewayError>;

    /// Event name as sent by the provider, kept for audit.
    fn get_webhook_event_name(
        &self,
        _request: &IncomingWebhookRequestDetails<'_>,
    ) -> Option<String> {
        None
    }

    fn get_webhook_resource_object(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<serde_json::Value, GatewayError>;

    /// Provider reason attached to a failed or cancelled object.
    fn get_webhook_failure_reason(
        &self,
        _request: &IncomingWebhookRequestDetails<'_>,
    ) -> Option<String> {
        None
    }

    fn get_webhook_api_response(&self) -> WebhookResponseKind {
        WebhookResponseKind::JsonStatusOk
    }
}

/// Parse the webhook body, JSON first and `application/x-www-form-urlencoded` as fallback.
pub fn parse_webhook_body(
    request: &IncomingWebhookRequestDetails<'_>,
) -> CustomResult<serde_json::Value, GatewayError> {
    serde_json::from_slice::<serde_json::Value>(request.body)
        .or_else(|_| {
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(request.body).map(|pairs| {
                serde_json::Value::Object(
                    pairs
                        .into_iter()
                        .map(|(key, value)| (key, serde_json::Value::String(value)))
                        .collect(),
                )
            })
        })
        .change_context(GatewayError::WebhookBodyDecodingFailed)
}

/// Value of a query string parameter of the callback URL, `None` when absent or empty.
pub fn query_param(request: &IncomingWebhookRequestDetails<'_>, name: &str) -> Option<String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(request.query_params.trim_start_matches('?'))
        .ok()?
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Text of a JSON value found at a dotted path, numbers are rendered as text.
pub fn value_at_path(value: &serde_json::Value, path: &str) -> Option<String> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .and_then(|found| match found {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Number(number) => Some(number.to_string()),
            serde_json::Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        })
        .filter(|text| !text.is_empty())
}

/// Secret rendered for HMAC keys, used by adapters keyed on a credential.
pub fn secret_bytes(secret: &masking::Secret<String>) -> Vec<u8> {
    secret.peek().as_bytes().to_vec()
}
