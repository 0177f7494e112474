use common_utils::generate_id_with_default_len;
use error_stack::{report, ResultExt};
use gateway_interfaces::types::GatewayNewPaymentRequest;
use router_env::{instrument, logger, tracing, Flow};

use super::reconciliation::{self, PaymentTransition, TransitionSource};
use crate::{
    core::errors::{
        self,
        utils::{GatewayErrorExt, RegistryErrorExt, StorageErrorExt},
        RouterResult,
    },
    db::payment::PaymentInterface,
    routes::AppState,
    types::{
        api::{PaymentCreateRequest, PaymentCreateResponse},
        storage,
    },
};

const PAYMENT_ID_PREFIX: &str = "pay";

/// Platform URLs handed to the provider for a payment on `gateway_id`.
#[derive(Debug, PartialEq, Eq)]
pub struct CallbackUrls {
    pub success_redirect_url: String,
    pub failure_redirect_url: String,
    pub webhook_url: String,
}

pub fn callback_urls(base_url: &str, gateway_id: i64, payment_id: &str) -> CallbackUrls {
    let base_url = base_url.trim_end_matches('/');
    let redirect = format!("{base_url}/gateway/{gateway_id}/redirect?paymentId={payment_id}");
    CallbackUrls {
        success_redirect_url: format!("{redirect}&success=true"),
        failure_redirect_url: format!("{redirect}&success=false"),
        webhook_url: format!("{base_url}/gateway/{gateway_id}/webhook"),
    }
}

/// Create the payment locally and open it at the provider.
///
/// A provider that can not be reached leaves the payment in `Created`; the webhook or the
/// redirect poll settles it later.
#[instrument(skip_all, fields(flow = ?Flow::PaymentCreate, merchant_id = %request.merchant_id, gateway_id = request.gateway_id))]
pub async fn create_gateway_payment(
    state: &AppState,
    request: PaymentCreateRequest,
) -> RouterResult<PaymentCreateResponse> {
    let (adapter, gateway) = state
        .registry
        .resolve(state.store.as_ref(), request.gateway_id)
        .await
        .map_err(|error| error.to_registry_response())?;
    if gateway.merchant_id != request.merchant_id {
        return Err(report!(errors::ApiErrorResponse::GatewayNotFound))
            .attach_printable("gateway belongs to another merchant");
    }
    if request.amount <= 0 {
        return Err(report!(errors::ApiErrorResponse::InvalidRequestData {
            message: "amount must be greater than zero".to_string(),
        }));
    }
    if let Some(country) = request.country.as_deref() {
        if !gateway.allows_country(country) {
            return Err(report!(errors::ApiErrorResponse::InvalidRequestData {
                message: format!("gateway does not accept payments from {country}"),
            }));
        }
    }

    let payment = state
        .store
        .insert_payment(storage::PaymentNew {
            payment_id: generate_id_with_default_len(PAYMENT_ID_PREFIX),
            merchant_id: request.merchant_id.clone(),
            gateway_id: gateway.id,
            total_amount: request.amount,
            currency: request.currency.clone(),
            return_url: request.return_url.clone(),
            subscription_id: request.subscription_id.clone(),
            invoice_id: request.invoice_id.clone(),
            expire_time: None,
            metadata: request.metadata.clone(),
        })
        .await
        .map_err(|error| error.to_duplicate_response(errors::ApiErrorResponse::InternalServerError))?;

    let urls = callback_urls(&state.conf.server.base_url, gateway.id, &payment.payment_id);
    let gateway_request = GatewayNewPaymentRequest {
        payment_id: payment.payment_id.clone(),
        merchant_id: request.merchant_id,
        amount: request.amount,
        currency: request.currency,
        description: request.description,
        customer_email: request.customer_email,
        country: request.country,
        success_redirect_url: urls.success_redirect_url,
        failure_redirect_url: urls.failure_redirect_url,
        webhook_url: urls.webhook_url,
        metadata: request.metadata,
    };

    let response = adapter
        .new_payment(&state.gateway_call_context(), &gateway, &gateway_request)
        .await
        .map_err(|error| error.to_gateway_failed_response())?;

    let mut payment = payment;
    if response.gateway_payment_id.is_some() || response.gateway_payment_intent_id.is_some() {
        payment = state
            .store
            .update_payment(
                payment,
                storage::PaymentUpdate::GatewayReferenceUpdate {
                    gateway_payment_id: response.gateway_payment_id.clone(),
                    gateway_payment_intent_id: response.gateway_payment_intent_id.clone(),
                    authorize_status: None,
                },
            )
            .await
            .change_context(errors::ApiErrorResponse::InternalServerError)?;
    }

    if response.status.is_terminal() {
        logger::info!(status = %response.status, "provider settled the payment synchronously");
        payment = reconciliation::reconcile_payment(
            state,
            payment,
            PaymentTransition {
                status: response.status,
                gateway_payment_id: response.gateway_payment_id.clone(),
                paid_time: None,
                reason: response.reason.clone(),
                source: TransitionSource::GatewayResponse,
            },
        )
        .await
        .change_context(errors::ApiErrorResponse::InternalServerError)?
        .into_inner();
    }

    Ok(PaymentCreateResponse {
        payment_id: payment.payment_id,
        status: payment.status,
        redirect_link: response.redirect_link,
        reason: response.reason,
    })
}
