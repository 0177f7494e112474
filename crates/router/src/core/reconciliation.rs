//! Applies provider outcomes to payments and refunds.
//!
//! A record leaves `Created` at most once. The transition is a conditional update in storage, so
//! concurrent webhook and redirect handling converge on a single winner, and only the winner runs
//! the side effects.

use common_enums::{EventType, PaymentStatus, RefundStatus};
use error_stack::ResultExt;
use gateway_interfaces::types::{GatewayPaymentDetail, GatewayRefundResponse};
use router_env::{instrument, logger, tracing, Flow};
use time::PrimitiveDateTime;

use super::webhooks::{self, types::OutgoingEvent};
use crate::{
    consts,
    core::errors::{CustomResult, StorageError},
    db::{payment::PaymentInterface, refund::RefundInterface},
    routes::AppState,
    services::collaborators::OptLogEntry,
    types::storage,
};

/// Where an outcome came from, kept in the operation log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionSource {
    /// Provider webhook, with the provider's own event name
    Webhook { event_name: Option<String> },
    /// Status poll after the user came back from the hosted page
    Redirect,
    /// Synchronous answer to the create call
    GatewayResponse,
}

impl TransitionSource {
    fn describe(&self) -> String {
        match self {
            Self::Webhook {
                event_name: Some(event_name),
            } => format!("webhook:{event_name}"),
            Self::Webhook { event_name: None } => "webhook".to_string(),
            Self::Redirect => "redirect".to_string(),
            Self::GatewayResponse => "gateway_response".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PaymentTransition {
    pub status: PaymentStatus,
    pub gateway_payment_id: Option<String>,
    pub paid_time: Option<PrimitiveDateTime>,
    pub reason: Option<String>,
    pub source: TransitionSource,
}

impl PaymentTransition {
    pub fn from_detail(detail: GatewayPaymentDetail, source: TransitionSource) -> Self {
        Self {
            status: detail.status,
            gateway_payment_id: Some(detail.gateway_payment_id),
            paid_time: detail.paid_time,
            reason: detail.reason,
            source,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RefundTransition {
    pub status: RefundStatus,
    pub gateway_refund_id: Option<String>,
    pub reason: Option<String>,
    pub source: TransitionSource,
}

impl RefundTransition {
    pub fn from_response(response: GatewayRefundResponse, source: TransitionSource) -> Self {
        Self {
            status: response.status,
            gateway_refund_id: response.gateway_refund_id,
            reason: response.reason,
            source,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileOutcome<T> {
    /// This call moved the record out of `Created`.
    Applied(T),
    /// Nothing changed: the record was already terminal, the outcome is still unknown, or a
    /// concurrent call won.
    Unchanged(T),
}

impl<T> ReconcileOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Applied(record) | Self::Unchanged(record) => record,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[instrument(skip_all, fields(flow = ?Flow::PaymentReconcile, payment_id = %payment.payment_id, target = %transition.status))]
pub async fn reconcile_payment(
    state: &AppState,
    payment: storage::Payment,
    transition: PaymentTransition,
) -> CustomResult<ReconcileOutcome<storage::Payment>, StorageError> {
    if payment.status.is_terminal() || !transition.status.is_terminal() {
        logger::debug!(current = %payment.status, "no transition to apply");
        return Ok(ReconcileOutcome::Unchanged(payment));
    }

    let failed = transition.status != PaymentStatus::Success;
    let update = storage::PaymentUpdate::StatusUpdate {
        status: transition.status,
        gateway_payment_id: transition.gateway_payment_id.clone(),
        paid_time: (!failed)
            .then(|| transition.paid_time.unwrap_or_else(common_utils::date_time::now)),
        last_error: if failed {
            Some(
                transition
                    .reason
                    .clone()
                    .unwrap_or_else(|| format!("payment {}", transition.status)),
            )
        } else {
            None
        },
    };

    let Some(updated) = state
        .store
        .update_payment_status_if_created(&payment.payment_id, update)
        .await
        .attach_printable("conditional payment status update failed")?
    else {
        let current = state
            .store
            .find_payment_by_payment_id(&payment.payment_id)
            .await?;
        logger::info!(current = %current.status, "payment already settled by another caller");
        return Ok(ReconcileOutcome::Unchanged(current));
    };

    logger::info!(source = %transition.source.describe(), "payment status changed");
    on_payment_transition(state, &updated, &transition.source).await;
    Ok(ReconcileOutcome::Applied(updated))
}

async fn on_payment_transition(
    state: &AppState,
    payment: &storage::Payment,
    source: &TransitionSource,
) {
    let (event, notify) = match payment.status {
        PaymentStatus::Success => (
            EventType::PaymentSucceeded,
            futures::future::join(
                state.invoices.update_status_on_payment_success(payment),
                state.subscriptions.update_status_on_payment_success(payment),
            )
            .await,
        ),
        PaymentStatus::Failed | PaymentStatus::Cancelled => (
            if payment.status == PaymentStatus::Failed {
                EventType::PaymentFailed
            } else {
                EventType::PaymentCancelled
            },
            futures::future::join(
                state.invoices.update_status_on_payment_failure(payment),
                state.subscriptions.update_status_on_payment_failure(payment),
            )
            .await,
        ),
        PaymentStatus::Created => return,
    };
    if let (Err(error), _) | (_, Err(error)) = &notify {
        logger::error!(?error, payment_id = %payment.payment_id, "collaborator update failed");
    }

    append_opt_log(
        state,
        &payment.merchant_id,
        format!("payment:{}", payment.payment_id),
        format!(
            "payment {} on gateway {}: {}{}",
            payment.payment_id,
            payment.gateway_id,
            payment.status,
            payment
                .last_error
                .as_deref()
                .map(|reason| format!(" ({reason})"))
                .unwrap_or_default()
        ),
        source,
    )
    .await;

    let event = OutgoingEvent {
        event,
        merchant_id: payment.merchant_id.clone(),
        primary_object_id: payment.payment_id.clone(),
        data: serde_json::to_value(payment).unwrap_or_default(),
        sequence_key: Some(payment.payment_id.clone()),
        dependency_key: None,
        metadata: event_metadata(payment.subscription_id.as_deref()),
    };
    if let Err(error) = webhooks::emit(state, event).await {
        logger::error!(
            ?error,
            payment_id = %payment.payment_id,
            "failed to emit payment event, left to the republish sweep"
        );
    }
}

#[instrument(skip_all, fields(flow = ?Flow::RefundReconcile, refund_id = %refund.refund_id, target = %transition.status))]
pub async fn reconcile_refund(
    state: &AppState,
    refund: storage::Refund,
    transition: RefundTransition,
) -> CustomResult<ReconcileOutcome<storage::Refund>, StorageError> {
    if refund.status.is_terminal() || !transition.status.is_terminal() {
        logger::debug!(current = %refund.status, "no transition to apply");
        return Ok(ReconcileOutcome::Unchanged(refund));
    }

    let failed = transition.status != RefundStatus::Success;
    let update = storage::RefundUpdate::StatusUpdate {
        status: transition.status,
        gateway_refund_id: transition.gateway_refund_id.clone(),
        last_error: failed.then(|| {
            transition
                .reason
                .clone()
                .unwrap_or_else(|| format!("refund {}", transition.status))
        }),
    };

    let Some(updated) = state
        .store
        .update_refund_status_if_created(&refund.refund_id, update)
        .await
        .attach_printable("conditional refund status update failed")?
    else {
        let current = state
            .store
            .find_refund_by_refund_id(&refund.refund_id)
            .await?;
        logger::info!(current = %current.status, "refund already settled by another caller");
        return Ok(ReconcileOutcome::Unchanged(current));
    };

    logger::info!(source = %transition.source.describe(), "refund status changed");
    on_refund_transition(state, &updated, &transition.source).await;
    Ok(ReconcileOutcome::Applied(updated))
}

async fn on_refund_transition(
    state: &AppState,
    refund: &storage::Refund,
    source: &TransitionSource,
) {
    let (event, notify) = match refund.status {
        RefundStatus::Success => (
            EventType::RefundSucceeded,
            futures::future::join(
                state.invoices.update_status_on_refund_success(refund),
                state.subscriptions.update_status_on_refund_success(refund),
            )
            .await,
        ),
        RefundStatus::Failed | RefundStatus::Cancelled => (
            if refund.status == RefundStatus::Failed {
                EventType::RefundFailed
            } else {
                EventType::RefundCancelled
            },
            futures::future::join(
                state.invoices.update_status_on_refund_failure(refund),
                state.subscriptions.update_status_on_refund_failure(refund),
            )
            .await,
        ),
        RefundStatus::Created => return,
    };
    if let (Err(error), _) | (_, Err(error)) = &notify {
        logger::error!(?error, refund_id = %refund.refund_id, "collaborator update failed");
    }

    append_opt_log(
        state,
        &refund.merchant_id,
        format!("refund:{}", refund.refund_id),
        format!(
            "refund {} of payment {}: {}",
            refund.refund_id, refund.payment_id, refund.status
        ),
        source,
    )
    .await;

    let subscription_id = state
        .store
        .find_payment_by_payment_id(&refund.payment_id)
        .await
        .ok()
        .and_then(|payment| payment.subscription_id);
    let event = OutgoingEvent {
        event,
        merchant_id: refund.merchant_id.clone(),
        primary_object_id: refund.refund_id.clone(),
        data: serde_json::to_value(refund).unwrap_or_default(),
        sequence_key: Some(refund.payment_id.clone()),
        dependency_key: Some(webhooks::utils::get_idempotent_event_id(
            &refund.payment_id,
            EventType::PaymentSucceeded,
        )),
        metadata: event_metadata(subscription_id.as_deref()),
    };
    if let Err(error) = webhooks::emit(state, event).await {
        logger::error!(
            ?error,
            refund_id = %refund.refund_id,
            "failed to emit refund event, left to the republish sweep"
        );
    }
}

async fn append_opt_log(
    state: &AppState,
    merchant_id: &str,
    target: String,
    content: String,
    source: &TransitionSource,
) {
    let entry = OptLogEntry {
        merchant_id: merchant_id.to_string(),
        target,
        content,
        source: source.describe(),
    };
    if let Err(error) = state.opt_log.append_opt_log(entry).await {
        logger::error!(?error, "failed to append operation log");
    }
}

fn event_metadata(subscription_id: Option<&str>) -> Option<serde_json::Value> {
    subscription_id
        .filter(|subscription_id| !subscription_id.is_empty())
        .map(|subscription_id| {
            serde_json::json!({
                consts::METADATA_SUBSCRIPTION_ID: subscription_id,
                consts::METADATA_PERSISTENCE: true,
            })
        })
}
