use actix_web::HttpRequest;
use common_enums::{PaymentStatus, RefundStatus};
use error_stack::{report, ResultExt};
use gateway_interfaces::{
    types::WebhookResponseKind,
    webhooks::{IncomingWebhookEvent, IncomingWebhookRequestDetails, ObjectReferenceId},
};
use router_env::{instrument, logger, tracing};

use super::utils;
use crate::{
    core::{
        errors::{
            self,
            utils::{GatewayErrorExt, RegistryErrorExt},
            RouterResponse,
        },
        reconciliation::{self, PaymentTransition, RefundTransition, TransitionSource},
    },
    db::{payment::PaymentInterface, refund::RefundInterface},
    routes::AppState,
    services::ApplicationResponse,
};

/// Acknowledgement body expected by the provider.
pub fn webhook_ack(kind: WebhookResponseKind) -> ApplicationResponse<serde_json::Value> {
    match kind {
        WebhookResponseKind::JsonStatusOk => {
            ApplicationResponse::Json(serde_json::json!({ "status": "ok" }))
        }
        WebhookResponseKind::PlainOk => ApplicationResponse::TextPlain("OK".to_string()),
    }
}

fn payment_status_of(event: IncomingWebhookEvent) -> Option<PaymentStatus> {
    match event {
        IncomingWebhookEvent::PaymentIntentSuccess => Some(PaymentStatus::Success),
        IncomingWebhookEvent::PaymentIntentFailure => Some(PaymentStatus::Failed),
        IncomingWebhookEvent::PaymentIntentCancelled => Some(PaymentStatus::Cancelled),
        IncomingWebhookEvent::PaymentIntentProcessing => Some(PaymentStatus::Created),
        _ => None,
    }
}

fn refund_status_of(event: IncomingWebhookEvent) -> Option<RefundStatus> {
    match event {
        IncomingWebhookEvent::RefundSuccess => Some(RefundStatus::Success),
        IncomingWebhookEvent::RefundFailure => Some(RefundStatus::Failed),
        IncomingWebhookEvent::RefundCancelled => Some(RefundStatus::Cancelled),
        IncomingWebhookEvent::RefundProcessing => Some(RefundStatus::Created),
        _ => None,
    }
}

/// Verify, parse and apply a provider notification for the gateway instance `gateway_id`.
#[instrument(skip(state, req, body))]
pub async fn receive_incoming_webhook(
    state: &AppState,
    req: &HttpRequest,
    body: actix_web::web::Bytes,
    gateway_id: i64,
) -> RouterResponse<serde_json::Value> {
    let (adapter, gateway) = state
        .registry
        .resolve(state.store.as_ref(), gateway_id)
        .await
        .map_err(|error| error.to_registry_response())?;

    let headers = utils::to_http_header_map(req.headers());
    let request_details = IncomingWebhookRequestDetails {
        method: http::Method::from_bytes(req.method().as_str().as_bytes())
            .unwrap_or(http::Method::POST),
        headers: &headers,
        body: &body,
        query_params: req.query_string().to_string(),
    };

    match adapter.verify_webhook_source(&request_details, &gateway) {
        Ok(true) => {}
        Ok(false) => {
            logger::warn!(
                gateway = %gateway.log_label(),
                body = %String::from_utf8_lossy(&body),
                "webhook signature mismatch"
            );
            return Err(report!(errors::ApiErrorResponse::WebhookAuthenticationFailed));
        }
        Err(error) => {
            logger::warn!(gateway = %gateway.log_label(), ?error, "webhook verification failed");
            return Err(error.change_context(errors::ApiErrorResponse::WebhookAuthenticationFailed));
        }
    }

    let ack = webhook_ack(adapter.get_webhook_api_response());
    let event_type = adapter
        .get_webhook_event_type(&request_details)
        .map_err(|error| error.to_gateway_failed_response())?;
    let event_name = adapter.get_webhook_event_name(&request_details);
    logger::info!(?event_type, ?event_name, gateway = %gateway.log_label(), "webhook verified");

    if event_type == IncomingWebhookEvent::EventNotSupported {
        return Ok(ack);
    }

    let reference = adapter
        .get_webhook_object_reference_id(&request_details)
        .map_err(|error| error.to_gateway_failed_response())?;
    let reason = adapter.get_webhook_failure_reason(&request_details);
    let source = TransitionSource::Webhook { event_name };

    match reference {
        ObjectReferenceId::PaymentId(gateway_payment_id) => {
            let Some(status) = payment_status_of(event_type) else {
                logger::warn!(?event_type, "payment reference with a non-payment event");
                return Ok(ack);
            };
            let payment = match state
                .store
                .find_payment_by_gateway_payment_id(gateway.id, &gateway_payment_id)
                .await
            {
                Ok(payment) => payment,
                Err(error) if error.current_context().is_db_not_found() => {
                    logger::warn!(%gateway_payment_id, "webhook for an unknown payment, dropping");
                    return Ok(ack);
                }
                Err(error) => {
                    return Err(error.change_context(errors::ApiErrorResponse::InternalServerError))
                }
            };

            reconciliation::reconcile_payment(
                state,
                payment,
                PaymentTransition {
                    status,
                    gateway_payment_id: None,
                    paid_time: None,
                    reason,
                    source,
                },
            )
            .await
            .change_context(errors::ApiErrorResponse::WebhookProcessingFailure)?;
        }
        ObjectReferenceId::RefundId(gateway_refund_id) => {
            let Some(status) = refund_status_of(event_type) else {
                logger::warn!(?event_type, "refund reference with a non-refund event");
                return Ok(ack);
            };
            let refund = match state
                .store
                .find_refund_by_gateway_refund_id(gateway.id, &gateway_refund_id)
                .await
            {
                Ok(refund) => refund,
                Err(error) if error.current_context().is_db_not_found() => {
                    logger::warn!(%gateway_refund_id, "webhook for an unknown refund, dropping");
                    return Ok(ack);
                }
                Err(error) => {
                    return Err(error.change_context(errors::ApiErrorResponse::InternalServerError))
                }
            };

            reconciliation::reconcile_refund(
                state,
                refund,
                RefundTransition {
                    status,
                    gateway_refund_id: None,
                    reason,
                    source,
                },
            )
            .await
            .change_context(errors::ApiErrorResponse::WebhookProcessingFailure)?;
        }
    }

    Ok(ack)
}
