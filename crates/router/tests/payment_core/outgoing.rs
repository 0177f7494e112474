use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use common_enums::{DeliveryStatus, EventType, WebhookMessageStatus};
use common_utils::crypto::{self, SignatureEncoding};
use error_stack::report;
use router::{
    consts,
    core::{
        errors::{CustomResult, WebhooksFlowError},
        webhooks::{
            self,
            types::{EmitOutcome, OutgoingEvent, OutgoingWebhookBody},
        },
    },
    db::webhook_message::WebhookMessageInterface,
    routes::AppState,
    workflows::{
        InternalWebhookListener, InternalWebhookWorkflow, ListenerRegistry,
        OutgoingWebhookDeliveryWorkflow,
    },
};
use scheduler::{InMemoryQueue, MessageQueue, QueueWorkflow};
use tokio::sync::Mutex;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::utils::{self, FailingQueue, ENDPOINT_SECRET, MERCHANT_ID};

fn payment_event(
    event: EventType,
    payment_id: &str,
    sequence_key: Option<&str>,
    dependency_key: Option<String>,
) -> OutgoingEvent {
    OutgoingEvent {
        event,
        merchant_id: MERCHANT_ID.to_string(),
        primary_object_id: payment_id.to_string(),
        data: serde_json::json!({ "payment_id": payment_id }),
        sequence_key: sequence_key.map(str::to_string),
        dependency_key,
        metadata: None,
    }
}

/// Remembers the order events reached it in.
#[derive(Default)]
struct RecordingListener {
    seen: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl InternalWebhookListener for RecordingListener {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn on_event(
        &self,
        _state: &AppState,
        body: &OutgoingWebhookBody,
    ) -> CustomResult<(), WebhooksFlowError> {
        self.seen.lock().await.push(body.id.clone());
        Ok(())
    }
}

#[tokio::test]
async fn emit_fans_out_to_subscribed_endpoints_once() {
    let ctx = utils::setup().await;
    ctx.endpoint(
        "https://merchant.example.com/payments".to_string(),
        vec![EventType::PaymentSucceeded, EventType::PaymentFailed],
    )
    .await;
    ctx.endpoint(
        "https://merchant.example.com/refunds".to_string(),
        vec![EventType::RefundSucceeded],
    )
    .await;

    let event = payment_event(EventType::PaymentSucceeded, "pay_1", Some("pay_1"), None);
    let EmitOutcome::Enqueued {
        message,
        deliveries,
    } = webhooks::emit(&ctx.state, event.clone()).await.unwrap()
    else {
        panic!("first emit must enqueue");
    };
    assert_eq!(message.idempotent_event_id, "pay_1_payment.succeeded");
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].url, "https://merchant.example.com/payments");

    let again = webhooks::emit(&ctx.state, event).await.unwrap();
    let EmitOutcome::Duplicate {
        idempotent_event_id,
    } = again
    else {
        panic!("second emit must be a duplicate");
    };
    assert_eq!(idempotent_event_id, "pay_1_payment.succeeded");

    assert_eq!(ctx.db.webhook_messages.lock().await.len(), 1);
    assert_eq!(ctx.queue.pending_count(consts::MERCHANT_WEBHOOK_TOPIC).await, 1);
    assert_eq!(ctx.queue.pending_count(consts::INTERNAL_WEBHOOK_TOPIC).await, 1);
}

#[tokio::test]
async fn delivery_is_signed_with_the_endpoint_secret() {
    let ctx = utils::setup().await;
    let merchant = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&merchant)
        .await;
    ctx.endpoint(
        format!("{}/hooks", merchant.uri()),
        vec![EventType::PaymentSucceeded],
    )
    .await;

    webhooks::emit(
        &ctx.state,
        payment_event(EventType::PaymentSucceeded, "pay_1", Some("pay_1"), None),
    )
    .await
    .unwrap();
    assert_eq!(ctx.drain(&OutgoingWebhookDeliveryWorkflow).await, 1);

    let requests = merchant.received_requests().await.unwrap();
    let received = &requests[0];
    let expected = crypto::sign_and_encode(
        &crypto::HmacSha256,
        SignatureEncoding::Base64,
        ENDPOINT_SECRET.as_bytes(),
        &received.body,
    )
    .unwrap();
    assert_eq!(
        received.headers.get("X-Signature").unwrap().to_str().unwrap(),
        expected
    );
    let body: OutgoingWebhookBody = serde_json::from_slice(&received.body).unwrap();
    assert_eq!(body.event, EventType::PaymentSucceeded);
    assert_eq!(body.sequence_key.as_deref(), Some("pay_1"));

    let delivery = ctx.db.webhook_deliveries.lock().await[0].clone();
    assert_eq!(delivery.status, DeliveryStatus::Delivered);
    assert_eq!(delivery.attempts, 1);
    assert_eq!(delivery.last_response_code, Some(200));
}

#[tokio::test]
async fn failing_endpoint_is_dead_lettered_and_can_be_replayed() {
    let ctx = utils::setup().await;
    let merchant = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&merchant)
        .await;
    ctx.endpoint(
        format!("{}/hooks", merchant.uri()),
        vec![EventType::PaymentFailed],
    )
    .await;

    webhooks::emit(
        &ctx.state,
        payment_event(EventType::PaymentFailed, "pay_1", Some("pay_1"), None),
    )
    .await
    .unwrap();
    assert_eq!(ctx.drain(&OutgoingWebhookDeliveryWorkflow).await, 3);

    let dead = webhooks::list_dead_deliveries(&ctx.state, MERCHANT_ID)
        .await
        .unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].attempts, 3);
    assert_eq!(dead[0].last_response_code, Some(500));
    assert_eq!(
        dead[0].last_error.as_deref(),
        Some("endpoint responded with 500: upstream down")
    );

    assert_eq!(
        webhooks::retry_dead_delivery(&ctx.state, "merchant_other", &dead[0].id)
            .await
            .unwrap_err()
            .current_context(),
        &WebhooksFlowError::DeliveryNotFound
    );

    merchant.reset().await;
    Mock::given(method("POST"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&merchant)
        .await;
    let requeued = webhooks::retry_dead_delivery(&ctx.state, MERCHANT_ID, &dead[0].id)
        .await
        .unwrap();
    assert_eq!(requeued.status, DeliveryStatus::Pending);
    assert_eq!(requeued.attempts, 0);
    assert_eq!(ctx.drain(&OutgoingWebhookDeliveryWorkflow).await, 1);

    let delivery = ctx.db.webhook_deliveries.lock().await[0].clone();
    assert_eq!(delivery.status, DeliveryStatus::Delivered);
    assert_eq!(delivery.attempts, 1);
    assert_eq!(
        webhooks::retry_dead_delivery(&ctx.state, MERCHANT_ID, &delivery.id)
            .await
            .unwrap_err()
            .current_context(),
        &WebhooksFlowError::DeliveryNotDead
    );
}

#[tokio::test]
async fn dependent_event_waits_for_its_dependency() {
    let mut ctx = utils::setup().await;
    let listener = Arc::new(RecordingListener::default());
    ctx.state = ctx
        .state
        .clone()
        .with_listeners(ListenerRegistry::new().register(listener.clone()));

    let EmitOutcome::Enqueued { message: refund, .. } = webhooks::emit(
        &ctx.state,
        payment_event(
            EventType::RefundSucceeded,
            "ref_1",
            None,
            Some("pay_1_payment.succeeded".to_string()),
        ),
    )
    .await
    .unwrap()
    else {
        panic!("refund event must enqueue");
    };
    let EmitOutcome::Enqueued { message: payment, .. } = webhooks::emit(
        &ctx.state,
        payment_event(EventType::PaymentSucceeded, "pay_1", None, None),
    )
    .await
    .unwrap()
    else {
        panic!("payment event must enqueue");
    };

    assert_eq!(ctx.drain(&InternalWebhookWorkflow).await, 3);
    assert_eq!(*listener.seen.lock().await, vec![payment.id, refund.id]);
    assert!(ctx
        .db
        .webhook_messages
        .lock()
        .await
        .iter()
        .all(|message| message.status == WebhookMessageStatus::Archived));
}

/// Fails every `payment.succeeded` until opened.
#[derive(Default)]
struct GatedListener {
    open: AtomicBool,
    seen: Mutex<Vec<EventType>>,
}

#[async_trait::async_trait]
impl InternalWebhookListener for GatedListener {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn on_event(
        &self,
        _state: &AppState,
        body: &OutgoingWebhookBody,
    ) -> CustomResult<(), WebhooksFlowError> {
        if body.event == EventType::PaymentSucceeded && !self.open.load(Ordering::SeqCst) {
            return Err(report!(WebhooksFlowError::ListenerFailed {
                listener: self.name()
            }));
        }
        self.seen.lock().await.push(body.event);
        Ok(())
    }
}

#[tokio::test]
async fn dependent_event_is_held_until_its_dependency_is_acknowledged() {
    let mut ctx = utils::setup().await;
    let listener = Arc::new(GatedListener::default());
    ctx.state = ctx
        .state
        .clone()
        .with_listeners(ListenerRegistry::new().register(listener.clone()));

    webhooks::emit(
        &ctx.state,
        payment_event(EventType::PaymentSucceeded, "pay_1", Some("lane_1"), None),
    )
    .await
    .unwrap();
    let EmitOutcome::Enqueued { message: refund, .. } = webhooks::emit(
        &ctx.state,
        payment_event(
            EventType::RefundSucceeded,
            "ref_1",
            Some("lane_2"),
            Some("pay_1_payment.succeeded".to_string()),
        ),
    )
    .await
    .unwrap()
    else {
        panic!("refund event must enqueue");
    };

    // Well past the number of deferrals allowed for a dependency that was never emitted.
    let mut held = Vec::new();
    for _ in 0..consts::MAX_UNKNOWN_DEPENDENCY_DEFERRALS + 5 {
        held.extend(ctx.run_once_keeping_failures(&InternalWebhookWorkflow).await);
    }
    assert_eq!(held.len(), 1);
    assert!(listener.seen.lock().await.is_empty());
    let refund = ctx.db.find_webhook_message_by_id(&refund.id).await.unwrap();
    assert_eq!(refund.status, WebhookMessageStatus::Pending);

    listener.open.store(true, Ordering::SeqCst);
    InternalWebhookWorkflow
        .execute_workflow(&ctx.state, &held[0])
        .await
        .unwrap();
    ctx.queue.commit(&held[0].topic, &held[0].id).await.unwrap();
    ctx.drain(&InternalWebhookWorkflow).await;

    assert_eq!(
        *listener.seen.lock().await,
        vec![EventType::PaymentSucceeded, EventType::RefundSucceeded]
    );
}

#[tokio::test]
async fn never_emitted_dependency_is_dead_lettered_and_can_be_replayed() {
    let mut ctx = utils::setup().await;
    let listener = Arc::new(RecordingListener::default());
    ctx.state = ctx
        .state
        .clone()
        .with_listeners(ListenerRegistry::new().register(listener.clone()));

    webhooks::emit(
        &ctx.state,
        payment_event(
            EventType::PaymentCancelled,
            "pay_1",
            None,
            Some("pay_9_payment.succeeded".to_string()),
        ),
    )
    .await
    .unwrap();

    let handled = ctx.drain(&InternalWebhookWorkflow).await;
    assert_eq!(
        handled,
        usize::try_from(consts::MAX_UNKNOWN_DEPENDENCY_DEFERRALS).unwrap() + 1
    );
    assert!(listener.seen.lock().await.is_empty());
    let dead = webhooks::list_dead_messages(&ctx.state, MERCHANT_ID)
        .await
        .unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].status, WebhookMessageStatus::Dead);

    assert_eq!(
        webhooks::retry_dead_message(&ctx.state, "merchant_other", &dead[0].id)
            .await
            .unwrap_err()
            .current_context(),
        &WebhooksFlowError::MessageNotFound
    );

    let EmitOutcome::Enqueued {
        message: dependency,
        ..
    } = webhooks::emit(
        &ctx.state,
        payment_event(EventType::PaymentSucceeded, "pay_9", None, None),
    )
    .await
    .unwrap()
    else {
        panic!("dependency must enqueue");
    };
    let requeued = webhooks::retry_dead_message(&ctx.state, MERCHANT_ID, &dead[0].id)
        .await
        .unwrap();
    assert_eq!(requeued.status, WebhookMessageStatus::Pending);
    ctx.drain(&InternalWebhookWorkflow).await;

    assert_eq!(
        *listener.seen.lock().await,
        vec![dependency.id, dead[0].id.clone()]
    );
    assert_eq!(
        webhooks::retry_dead_message(&ctx.state, MERCHANT_ID, &dead[0].id)
            .await
            .unwrap_err()
            .current_context(),
        &WebhooksFlowError::MessageNotDead
    );
}

#[tokio::test]
async fn failing_endpoint_does_not_hold_back_healthy_endpoints() {
    let mut ctx = utils::setup().await;
    let mut conf = (*ctx.state.conf).clone();
    conf.webhook_delivery.retry.start_after = 3600;
    ctx.state.conf = Arc::new(conf);

    let failing = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&failing)
        .await;
    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&healthy)
        .await;
    for merchant in [&failing, &healthy] {
        ctx.endpoint(
            format!("{}/hooks", merchant.uri()),
            vec![EventType::PaymentSucceeded, EventType::RefundSucceeded],
        )
        .await;
    }

    webhooks::emit(
        &ctx.state,
        payment_event(EventType::PaymentSucceeded, "pay_1", Some("pay_1"), None),
    )
    .await
    .unwrap();
    assert_eq!(ctx.drain(&OutgoingWebhookDeliveryWorkflow).await, 2);

    // Emitted while the failed delivery waits an hour for its retry.
    webhooks::emit(
        &ctx.state,
        payment_event(EventType::RefundSucceeded, "ref_1", Some("pay_1"), None),
    )
    .await
    .unwrap();
    assert_eq!(ctx.drain(&OutgoingWebhookDeliveryWorkflow).await, 1);

    let received: Vec<EventType> = healthy
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| {
            serde_json::from_slice::<OutgoingWebhookBody>(&request.body)
                .unwrap()
                .event
        })
        .collect();
    assert_eq!(
        received,
        vec![EventType::PaymentSucceeded, EventType::RefundSucceeded]
    );
    // The retry and the refund event for the failing endpoint stay queued, in that order.
    assert_eq!(ctx.queue.pending_count(consts::MERCHANT_WEBHOOK_TOPIC).await, 2);
}

#[tokio::test]
async fn interrupted_publishing_is_resumed_by_the_next_emit() {
    let queue = InMemoryQueue::new(Duration::from_secs(60));
    let ctx = utils::setup_with_queue(queue.clone(), Box::new(FailingQueue::new(queue, &[0]))).await;
    ctx.endpoint(
        "https://merchant.example.com/hooks".to_string(),
        vec![EventType::PaymentSucceeded],
    )
    .await;
    let event = payment_event(EventType::PaymentSucceeded, "pay_1", Some("pay_1"), None);

    assert_eq!(
        webhooks::emit(&ctx.state, event.clone())
            .await
            .unwrap_err()
            .current_context(),
        &WebhooksFlowError::QueuePublishFailed
    );
    let stored = ctx.db.webhook_messages.lock().await.clone();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].published);
    assert_eq!(ctx.queue.pending_count(consts::INTERNAL_WEBHOOK_TOPIC).await, 0);

    let EmitOutcome::Enqueued {
        message,
        deliveries,
    } = webhooks::emit(&ctx.state, event.clone()).await.unwrap()
    else {
        panic!("an unpublished event must be published again");
    };
    assert_eq!(message.id, stored[0].id);
    assert!(message.published);
    assert_eq!(deliveries.len(), 1);
    assert_eq!(ctx.queue.pending_count(consts::INTERNAL_WEBHOOK_TOPIC).await, 1);
    assert_eq!(ctx.queue.pending_count(consts::MERCHANT_WEBHOOK_TOPIC).await, 1);

    assert!(matches!(
        webhooks::emit(&ctx.state, event).await.unwrap(),
        EmitOutcome::Duplicate { .. }
    ));
    assert_eq!(ctx.db.webhook_deliveries.lock().await.len(), 1);
}

#[tokio::test]
async fn republish_sweep_finishes_interrupted_publishing() {
    let queue = InMemoryQueue::new(Duration::from_secs(60));
    // The internal task goes out, the delivery does not.
    let ctx = utils::setup_with_queue(queue.clone(), Box::new(FailingQueue::new(queue, &[1]))).await;
    let merchant = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&merchant)
        .await;
    ctx.endpoint(
        format!("{}/hooks", merchant.uri()),
        vec![EventType::PaymentSucceeded],
    )
    .await;

    assert!(webhooks::emit(
        &ctx.state,
        payment_event(EventType::PaymentSucceeded, "pay_1", Some("pay_1"), None),
    )
    .await
    .is_err());
    assert_eq!(ctx.queue.pending_count(consts::MERCHANT_WEBHOOK_TOPIC).await, 0);

    assert_eq!(webhooks::republish_stale_messages(&ctx.state).await.unwrap(), 1);
    assert_eq!(webhooks::republish_stale_messages(&ctx.state).await.unwrap(), 0);
    assert_eq!(ctx.drain(&OutgoingWebhookDeliveryWorkflow).await, 1);

    let deliveries = ctx.db.webhook_deliveries.lock().await.clone();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].status, DeliveryStatus::Delivered);
}
