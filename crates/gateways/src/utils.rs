use common_utils::{
    errors::CustomResult,
    ext_traits::BytesExt,
    request::Request,
};
use error_stack::ResultExt;
use gateway_interfaces::{
    api::GatewayCommon,
    api_client::{call_gateway_api, GatewayCallContext},
    consts,
    errors::GatewayError,
    types::{ErrorResponse, Response},
};
use masking::Maskable;
use router_env::logger;
use serde::de::DeserializeOwned;
use storage_models::MerchantGateway;

use crate::constants::headers;

/// Call the provider and parse a 2xx body as `T`.
///
/// A non-2xx response is returned as `Ok(Err(_))`, normalised through the adapter's
/// `build_error_response`.
pub(crate) async fn send_and_parse<T: DeserializeOwned>(
    adapter: &(dyn GatewayCommon + Sync),
    ctx: &GatewayCallContext<'_>,
    gateway: &MerchantGateway,
    operation: &'static str,
    request: Request,
    type_name: &'static str,
) -> CustomResult<Result<T, ErrorResponse>, GatewayError> {
    match call_gateway_api(ctx, gateway, operation, request).await? {
        Ok(response) => response
            .response
            .parse_struct(type_name)
            .change_context(GatewayError::ResponseDeserializationFailed)
            .map(Ok),
        Err(response) => Ok(Err(error_response(adapter, &response))),
    }
}

/// Normalised error, falling back to the raw body when the provider shape is unknown.
pub(crate) fn error_response(adapter: &(dyn GatewayCommon + Sync), res: &Response) -> ErrorResponse {
    adapter.build_error_response(res).unwrap_or_else(|error| {
        logger::warn!(?error, gateway = adapter.id(), "unrecognised error body");
        ErrorResponse {
            status_code: res.status_code,
            code: consts::NO_ERROR_CODE.to_string(),
            message: res.body_text(),
            reason: None,
        }
    })
}

/// 401 and 403 mean the provider rejected the credentials.
pub(crate) fn is_credential_rejection(error: &ErrorResponse) -> bool {
    matches!(error.status_code, 401 | 403)
}

/// Provider-side validation failures, answered with a failed result instead of an error.
pub(crate) fn is_validation_rejection(error: &ErrorResponse) -> bool {
    (400..500).contains(&error.status_code) && !is_credential_rejection(error)
}

/// Turn a non-validation provider error into a typed failure.
pub(crate) fn unexpected(error: ErrorResponse) -> error_stack::Report<GatewayError> {
    let context = if is_credential_rejection(&error) {
        GatewayError::CredentialInvalid
    } else {
        GatewayError::UnexpectedResponse {
            status_code: error.status_code,
        }
    };
    error_stack::report!(context).attach_printable(error.describe())
}

pub(crate) fn json_headers(content_type: &'static str) -> Vec<(String, Maskable<String>)> {
    vec![
        (headers::CONTENT_TYPE.to_string(), content_type.into()),
        (headers::ACCEPT.to_string(), content_type.into()),
    ]
}

/// Lower-cased, trimmed provider status
pub(crate) fn normalise_status(status: &str) -> String {
    status.trim().to_ascii_lowercase()
}

/// Join the configured base URL and an API path.
pub(crate) fn build_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
