use common_utils::crypto::{self, SignatureEncoding};
use error_stack::ResultExt;
use masking::PeekInterface;

use crate::{
    consts,
    core::errors::{CustomResult, WebhooksFlowError},
    types::storage,
};

pub fn get_idempotent_event_id(primary_object_id: &str, event: common_enums::EventType) -> String {
    format!("{primary_object_id}_{event}")
}

/// A `Persistence` key next to a `SubscriptionId` key asks for a portal copy of the message.
/// Only the presence of the keys counts, `"Persistence": false` still asks for the copy.
pub fn requires_persisted_copy(metadata: Option<&serde_json::Value>) -> bool {
    metadata
        .and_then(serde_json::Value::as_object)
        .is_some_and(|metadata| {
            metadata.contains_key(consts::METADATA_PERSISTENCE)
                && metadata.contains_key(consts::METADATA_SUBSCRIPTION_ID)
        })
}

/// Base64 HMAC-SHA256 of the body keyed by the endpoint secret.
pub fn sign_outgoing_body(
    endpoint: &storage::MerchantWebhookEndpoint,
    body: &str,
) -> CustomResult<String, WebhooksFlowError> {
    crypto::sign_and_encode(
        &crypto::HmacSha256,
        SignatureEncoding::Base64,
        endpoint.secret.peek().as_bytes(),
        body.as_bytes(),
    )
    .change_context(WebhooksFlowError::OutgoingWebhookSigningFailed)
    .attach_printable_lazy(|| format!("endpoint_id = {}", endpoint.id))
}

pub fn to_http_header_map(headers: &actix_web::http::header::HeaderMap) -> http::HeaderMap {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = http::header::HeaderName::from_bytes(name.as_str().as_bytes()).ok()?;
            let value = http::header::HeaderValue::from_bytes(value.as_bytes()).ok()?;
            Some((name, value))
        })
        .collect()
}
