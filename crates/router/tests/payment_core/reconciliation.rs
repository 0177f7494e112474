use common_enums::{EventType, PaymentStatus, WebhookMessageStatus};
use router::{
    consts,
    core::reconciliation::{self, PaymentTransition, ReconcileOutcome, TransitionSource},
    db::payment::PaymentInterface,
};

use crate::utils;

fn transition(status: PaymentStatus, source: TransitionSource) -> PaymentTransition {
    PaymentTransition {
        status,
        gateway_payment_id: None,
        paid_time: None,
        reason: Some("declined by issuer".to_string()),
        source,
    }
}

#[tokio::test]
async fn concurrent_outcomes_converge_on_one_winner() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let payment = ctx.open_payment(&gateway, "pay_1", "mp_1").await;

    let (webhook, redirect) = tokio::join!(
        reconciliation::reconcile_payment(
            &ctx.state,
            payment.clone(),
            transition(
                PaymentStatus::Success,
                TransitionSource::Webhook { event_name: None }
            ),
        ),
        reconciliation::reconcile_payment(
            &ctx.state,
            payment,
            transition(PaymentStatus::Failed, TransitionSource::Redirect),
        ),
    );
    let (webhook, redirect) = (webhook.unwrap(), redirect.unwrap());

    assert_ne!(webhook.is_applied(), redirect.is_applied());
    let winner = (if webhook.is_applied() { webhook } else { redirect }).into_inner();
    let stored = ctx.db.find_payment_by_payment_id("pay_1").await.unwrap();
    assert_eq!(stored.status, winner.status);

    assert_eq!(ctx.collaborators.calls().await.len(), 2);
    assert_eq!(ctx.collaborators.opt_logs().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_successes_apply_side_effects_once() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    for url in [
        "https://merchant.example.com/billing",
        "https://merchant.example.com/crm",
    ] {
        ctx.endpoint(url.to_string(), vec![EventType::PaymentSucceeded])
            .await;
    }
    let payment = ctx.open_payment(&gateway, "pay_1", "mp_1").await;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let state = ctx.state.clone();
            let payment = payment.clone();
            tokio::spawn(async move {
                reconciliation::reconcile_payment(
                    &state,
                    payment,
                    transition(
                        PaymentStatus::Success,
                        TransitionSource::Webhook { event_name: None },
                    ),
                )
                .await
            })
        })
        .collect();
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_applied()).count(), 1);
    assert!(outcomes
        .into_iter()
        .all(|outcome| outcome.into_inner().status == PaymentStatus::Success));

    assert_eq!(ctx.collaborators.calls().await.len(), 2);
    assert_eq!(ctx.collaborators.opt_logs().await.len(), 1);
    let queued = ctx
        .db
        .webhook_messages
        .lock()
        .await
        .iter()
        .filter(|message| message.status == WebhookMessageStatus::Pending)
        .count();
    assert_eq!(queued, 1);
    assert_eq!(ctx.db.webhook_deliveries.lock().await.len(), 2);
    assert_eq!(ctx.queue.pending_count(consts::MERCHANT_WEBHOOK_TOPIC).await, 2);
}

#[tokio::test]
async fn terminal_payment_is_never_changed() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let payment = ctx.open_payment(&gateway, "pay_1", "mp_1").await;

    let settled = reconciliation::reconcile_payment(
        &ctx.state,
        payment,
        transition(PaymentStatus::Cancelled, TransitionSource::Redirect),
    )
    .await
    .unwrap();
    assert!(settled.is_applied());
    let settled = settled.into_inner();
    assert_eq!(settled.last_error.as_deref(), Some("declined by issuer"));

    let again = reconciliation::reconcile_payment(
        &ctx.state,
        settled,
        transition(PaymentStatus::Success, TransitionSource::Redirect),
    )
    .await
    .unwrap();
    assert!(matches!(
        again,
        ReconcileOutcome::Unchanged(ref payment) if payment.status == PaymentStatus::Cancelled
    ));
}

#[tokio::test]
async fn unknown_outcome_leaves_the_payment_open() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let payment = ctx.open_payment(&gateway, "pay_1", "mp_1").await;

    let outcome = reconciliation::reconcile_payment(
        &ctx.state,
        payment,
        transition(PaymentStatus::Created, TransitionSource::Redirect),
    )
    .await
    .unwrap();

    assert!(!outcome.is_applied());
    assert_eq!(outcome.into_inner().status, PaymentStatus::Created);
    assert!(ctx.collaborators.calls().await.is_empty());
    assert!(ctx.db.webhook_messages.lock().await.is_empty());
}

#[tokio::test]
async fn stale_copy_of_a_settled_payment_reports_the_stored_status() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let stale = ctx.open_payment(&gateway, "pay_1", "mp_1").await;

    reconciliation::reconcile_payment(
        &ctx.state,
        stale.clone(),
        transition(PaymentStatus::Success, TransitionSource::Redirect),
    )
    .await
    .unwrap();

    // `stale` still says Created, the conditional update must refuse it.
    let outcome = reconciliation::reconcile_payment(
        &ctx.state,
        stale,
        transition(PaymentStatus::Failed, TransitionSource::Redirect),
    )
    .await
    .unwrap();
    assert!(matches!(
        outcome,
        ReconcileOutcome::Unchanged(ref payment) if payment.status == PaymentStatus::Success
    ));
}
