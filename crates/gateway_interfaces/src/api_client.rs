//! HTTP client shared by all adapters

use std::{fmt::Debug, time::Duration};

use common_utils::{
    errors::CustomResult,
    request::{Method, Request, RequestContent},
};
use error_stack::{report, ResultExt};
use masking::PeekInterface;
use router_env::{instrument, logger, tracing, Tag};
use storage_models::{GatewayHttpLogNew, MerchantGateway};

use crate::{
    configs::Gateways,
    errors::{ApiClientError, GatewayError},
    types::Response,
};

/// Transport used for provider and merchant endpoint calls.
#[async_trait::async_trait]
pub trait ApiClient: dyn_clone::DynClone + Send + Sync + Debug {
    async fn send_request(
        &self,
        request: Request,
        timeout: Duration,
    ) -> CustomResult<Response, ApiClientError>;
}

dyn_clone::clone_trait_object!(ApiClient);

/// Sink for the gateway HTTP audit log.
#[async_trait::async_trait]
pub trait GatewayHttpLogger: Send + Sync {
    /// Failures are logged by the implementation, they never fail the provider call.
    async fn record(&self, entry: GatewayHttpLogNew);
}

#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> CustomResult<Self, ApiClientError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .change_context(ApiClientError::RequestBuildFailed)
            .attach_printable("Failed to construct base client")?;
        Ok(Self { client })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
    }
}

#[async_trait::async_trait]
impl ApiClient for ReqwestClient {
    async fn send_request(
        &self,
        request: Request,
        timeout: Duration,
    ) -> CustomResult<Response, ApiClientError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url)
            .timeout(timeout);

        for (name, value) in request.headers {
            builder = builder.header(name, value.into_inner());
        }

        builder = match request.body {
            Some(RequestContent::Json(payload)) => builder.json(&payload),
            Some(RequestContent::FormUrlEncoded(payload)) => builder.form(&payload),
            Some(RequestContent::RawBytes(payload)) => builder.body(payload),
            None => builder,
        };

        let response = builder.send().await.map_err(|error| {
            let context = if error.is_timeout() {
                ApiClientError::RequestTimeoutReceived
            } else if error.is_connect() {
                ApiClientError::ConnectionClosed
            } else {
                ApiClientError::RequestNotSent(error.to_string())
            };
            report!(context).attach_printable(error.to_string())
        })?;

        let status_code = response.status().as_u16();
        let headers = Some(response.headers().clone());
        let body = response.bytes().await.map_err(|error| {
            let context = if error.is_timeout() {
                ApiClientError::RequestTimeoutReceived
            } else {
                ApiClientError::ResponseDecodingFailed
            };
            report!(context).attach_printable(error.to_string())
        })?;

        Ok(Response {
            headers,
            response: body,
            status_code,
        })
    }
}

/// Everything an adapter needs to perform a provider call, passed explicitly per call.
#[derive(Clone, Copy)]
pub struct GatewayCallContext<'a> {
    pub api_client: &'a dyn ApiClient,
    pub http_log: &'a dyn GatewayHttpLogger,
    pub gateways: &'a Gateways,
}

impl Debug for GatewayCallContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCallContext")
            .field("gateways", self.gateways)
            .finish()
    }
}

/// Send a provider request and record it in the audit log.
///
/// Returns `Ok(Ok(_))` for 2xx responses and `Ok(Err(_))` for any other status, so the adapter
/// decides how to read an error body. Timeouts and transport failures become
/// [`GatewayError::ProviderUnavailable`].
#[instrument(skip_all, fields(gateway = %gateway.log_label(), operation = operation))]
pub async fn call_gateway_api(
    ctx: &GatewayCallContext<'_>,
    gateway: &MerchantGateway,
    operation: &'static str,
    request: Request,
) -> CustomResult<Result<Response, Response>, GatewayError> {
    let url = request.url.clone();
    let method = request.method;
    let request_body = request
        .body
        .as_ref()
        .map(|body| body.get_inner_value().peek().clone());
    let masked_headers = request
        .headers
        .iter()
        .filter(|(_, value)| value.is_masked())
        .count();

    logger::info!(tag = ?Tag::InitiatedToGateway, %method, %url, masked_headers, "calling gateway");
    let started = std::time::Instant::now();
    let result = ctx
        .api_client
        .send_request(request, ctx.gateways.request_timeout())
        .await;
    let latency_ms = started.elapsed().as_millis();

    let mut entry = GatewayHttpLogNew {
        gateway_id: gateway.id,
        gateway_label: gateway.log_label(),
        operation: operation.to_string(),
        url,
        request: request_body,
        response: None,
        status_code: None,
        error: None,
    };

    match result {
        Ok(response) => {
            logger::info!(
                tag = ?Tag::GatewayResponse,
                status_code = response.status_code,
                latency_ms,
            );
            entry.response = Some(response.body_text());
            entry.status_code = Some(response.status_code);
            ctx.http_log.record(entry).await;
            if response.is_success() {
                Ok(Ok(response))
            } else {
                Ok(Err(response))
            }
        }
        Err(error) => {
            logger::error!(tag = ?Tag::GatewayResponse, ?error, latency_ms);
            entry.error = Some(error.current_context().to_string());
            ctx.http_log.record(entry).await;
            let context = if error.current_context().is_timeout_or_connection_error() {
                GatewayError::ProviderUnavailable
            } else {
                GatewayError::ResponseHandlingFailed
            };
            Err(error.change_context(context))
        }
    }
}

/// Test doubles shared by adapter tests.
pub mod mock {
    use std::sync::Arc;

    use storage_models::GatewayHttpLogNew;
    use tokio::sync::Mutex;

    use super::GatewayHttpLogger;

    /// Collects audit entries in memory.
    #[derive(Clone, Debug, Default)]
    pub struct RecordingHttpLogger {
        pub entries: Arc<Mutex<Vec<GatewayHttpLogNew>>>,
    }

    #[async_trait::async_trait]
    impl GatewayHttpLogger for RecordingHttpLogger {
        async fn record(&self, entry: GatewayHttpLogNew) {
            self.entries.lock().await.push(entry);
        }
    }
}
