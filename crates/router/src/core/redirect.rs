use common_enums::PaymentStatus;
use error_stack::ResultExt;
use router_env::{instrument, logger, tracing};

use super::reconciliation::{self, PaymentTransition, TransitionSource};
use crate::{
    consts,
    core::errors::{self, RouterResponse},
    db::payment::PaymentInterface,
    routes::AppState,
    services::ApplicationResponse,
    types::{
        api::{GatewayRedirectQuery, GatewayRedirectResponse, RedirectStatus},
        storage,
    },
};

/// Merchant URL the user is sent back to, with the payment outcome appended as query.
///
/// A failed or abandoned payment prefers the `CancelUrl` from the payment metadata.
pub fn get_payment_redirect_url(payment: &storage::Payment, success: bool) -> Option<String> {
    let target = if success {
        payment.return_url.as_deref()
    } else {
        payment
            .metadata_str(consts::METADATA_CANCEL_URL)
            .or(payment.return_url.as_deref())
    }
    .filter(|url| !url.is_empty())?;

    let query = serde_urlencoded::to_string(&[
        ("paymentId", payment.payment_id.as_str()),
        ("subId", payment.subscription_id.as_deref().unwrap_or_default()),
        ("invoiceId", payment.invoice_id.as_deref().unwrap_or_default()),
        ("success", if success { "true" } else { "false" }),
    ][..])
    .ok()?;
    let separator = if target.contains('?') { '&' } else { '?' };
    Some(format!("{target}{separator}{query}"))
}

fn invalid_payment(payment_id: Option<String>) -> ApplicationResponse<GatewayRedirectResponse> {
    ApplicationResponse::Json(GatewayRedirectResponse {
        payment_id,
        status: RedirectStatus::Invalid,
        success: false,
        message: "Invalid payment".to_string(),
        return_url: None,
    })
}

/// Ask the provider for the current outcome and apply it. Any failure leaves the payment as is.
async fn poll_payment(state: &AppState, payment: storage::Payment) -> storage::Payment {
    let Some(gateway_payment_id) = payment
        .gateway_payment_id
        .clone()
        .or_else(|| payment.gateway_payment_intent_id.clone())
    else {
        logger::info!("payment has no gateway reference yet");
        return payment;
    };

    let (adapter, gateway) = match state
        .registry
        .resolve(state.store.as_ref(), payment.gateway_id)
        .await
    {
        Ok(resolved) => resolved,
        Err(error) => {
            logger::warn!(?error, "gateway could not be resolved for status poll");
            return payment;
        }
    };

    let detail = match adapter
        .payment_detail(&state.gateway_call_context(), &gateway, &gateway_payment_id)
        .await
    {
        Ok(detail) => detail,
        Err(error) => {
            logger::warn!(?error, "payment status poll failed");
            return payment;
        }
    };

    let fallback = payment.clone();
    match reconciliation::reconcile_payment(
        state,
        payment,
        PaymentTransition::from_detail(detail, TransitionSource::Redirect),
    )
    .await
    {
        Ok(outcome) => outcome.into_inner(),
        Err(error) => {
            logger::error!(?error, "failed to apply polled payment status");
            fallback
        }
    }
}

/// The user came back from the provider's hosted page.
#[instrument(skip(state))]
pub async fn handle_gateway_redirect(
    state: &AppState,
    gateway_id: i64,
    query: GatewayRedirectQuery,
) -> RouterResponse<GatewayRedirectResponse> {
    let Some(payment_id) = query.payment_id.filter(|payment_id| !payment_id.is_empty()) else {
        return Ok(invalid_payment(None));
    };

    let payment = match state.store.find_payment_by_payment_id(&payment_id).await {
        Ok(payment) if payment.gateway_id == gateway_id => payment,
        Ok(_) => {
            logger::warn!(%payment_id, "payment belongs to another gateway");
            return Ok(invalid_payment(Some(payment_id)));
        }
        Err(error) if error.current_context().is_db_not_found() => {
            return Ok(invalid_payment(Some(payment_id)));
        }
        Err(error) => {
            return Err(error)
                .change_context(errors::ApiErrorResponse::InternalServerError)
                .attach_printable("failed to look up the redirected payment");
        }
    };

    let payment = if payment.status.is_terminal() {
        payment
    } else {
        poll_payment(state, payment).await
    };

    let (status, success, message) = match payment.status {
        PaymentStatus::Success => (RedirectStatus::Paid, true, "Payment succeeded"),
        PaymentStatus::Failed => (RedirectStatus::Failed, false, "Payment failed"),
        PaymentStatus::Cancelled => (RedirectStatus::Cancelled, false, "Payment cancelled"),
        PaymentStatus::Created => (
            RedirectStatus::Pending,
            query.success.unwrap_or(false),
            "Payment pending, please wait",
        ),
    };

    if status != RedirectStatus::Pending {
        if let Some(url) = get_payment_redirect_url(&payment, success) {
            return Ok(ApplicationResponse::Redirect(url));
        }
    }

    Ok(ApplicationResponse::Json(GatewayRedirectResponse {
        return_url: payment.return_url.clone(),
        payment_id: Some(payment.payment_id),
        status,
        success,
        message: message.to_string(),
    }))
}
