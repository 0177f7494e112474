use std::future::Future;

use actix_web::{http::header, HttpRequest, HttpResponse, ResponseError};
use error_stack::Report;
use router_env::{instrument, logger, tracing, Flow, Tag};
use serde::Serialize;

use crate::{
    core::errors::{ApiErrorResponse, RouterResponse},
    routes::AppState,
};

/// Successful result of a core flow, rendered by [`server_wrap`].
#[derive(Debug, Eq, PartialEq)]
pub enum ApplicationResponse<R> {
    Json(R),
    /// Plain text body, for providers that expect a literal acknowledgement
    TextPlain(String),
    /// `302 Found` to the given URL
    Redirect(String),
    StatusOk,
}

/// Run a core flow and render its result or error.
///
/// Errors are logged with their full report and rendered through
/// [`ApiErrorResponse`]'s `ResponseError` implementation.
#[instrument(skip_all, fields(flow = ?flow))]
pub async fn server_wrap<'a, T, Q, F, Fut>(
    flow: Flow,
    state: &'a AppState,
    request: &'a HttpRequest,
    payload: T,
    func: F,
) -> HttpResponse
where
    F: FnOnce(&'a AppState, T) -> Fut,
    Fut: Future<Output = RouterResponse<Q>>,
    Q: Serialize,
{
    logger::info!(
        tag = ?Tag::ApiIncomingRequest,
        method = %request.method(),
        path = %request.path(),
    );
    let started = std::time::Instant::now();
    let response = match func(state, payload).await {
        Ok(response) => http_response(response),
        Err(error) => log_and_return_error_response(error),
    };
    logger::info!(
        tag = ?Tag::ApiIncomingRequest,
        status_code = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis(),
    );
    response
}

fn http_response<Q: Serialize>(response: ApplicationResponse<Q>) -> HttpResponse {
    match response {
        ApplicationResponse::Json(body) => match serde_json::to_string(&body) {
            Ok(body) => HttpResponse::Ok()
                .content_type(mime::APPLICATION_JSON)
                .body(body),
            Err(error) => {
                logger::error!(?error, "failed to serialize json response");
                ApiErrorResponse::InternalServerError.error_response()
            }
        },
        ApplicationResponse::TextPlain(text) => HttpResponse::Ok()
            .content_type(mime::TEXT_PLAIN)
            .body(text),
        ApplicationResponse::Redirect(url) => HttpResponse::Found()
            .append_header((header::LOCATION, url))
            .finish(),
        ApplicationResponse::StatusOk => HttpResponse::Ok().finish(),
    }
}

pub fn log_and_return_error_response(error: Report<ApiErrorResponse>) -> HttpResponse {
    logger::error!(?error);
    error.current_context().error_response()
}
