use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use common_enums::{EventType, GatewayName};
use common_utils::crypto::{self, SignatureEncoding};
use error_stack::report;
use gateway_interfaces::{api_client::ReqwestClient, configs::GatewayParams};
use masking::Secret;
use router::{
    configs::settings::Settings,
    db::{
        merchant_gateway::MerchantGatewayInterface, payment::PaymentInterface,
        refund::RefundInterface, webhook_endpoint::WebhookEndpointInterface, MockDb,
    },
    routes::{AppState, Collaborators},
    services::collaborators::mock::RecordingCollaborators,
    types::storage,
};
use scheduler::{
    errors::{CustomResult, QueueError},
    utils::RetryMapping,
    InMemoryQueue, MessageQueue, QueueMessage, QueueMessageNew, QueueWorkflow,
};
use wiremock::MockServer;

pub const MERCHANT_ID: &str = "merchant_acme";
pub const WEBHOOK_SECRET: &str = "whsec_mulenpay";
pub const ENDPOINT_SECRET: &str = "endpoint_secret";

pub struct TestContext {
    pub state: AppState,
    pub db: MockDb,
    pub queue: InMemoryQueue,
    pub collaborators: RecordingCollaborators,
    /// Stands in for the provider APIs
    pub provider: MockServer,
}

/// Settings with zero delays and a two-retry schedule.
pub fn test_settings(provider_url: &str) -> Settings {
    let mut conf = Settings::default();
    conf.server.base_url = "https://billing.example.com".to_string();
    conf.gateways.airwallex = GatewayParams::new(provider_url);
    conf.gateways.firekassa = GatewayParams::new(provider_url);
    conf.gateways.alikassa = GatewayParams::new(provider_url);
    conf.gateways.blockonomics = GatewayParams::new(provider_url);
    conf.gateways.mulenpay = GatewayParams::new(provider_url);
    conf.webhook_delivery.producer.initial_delay_ms = 0;
    conf.webhook_delivery.producer.dependency_retry_delay_ms = 0;
    conf.webhook_delivery.producer.republish_after_ms = 0;
    conf.webhook_delivery.request_timeout_secs = 5;
    conf.webhook_delivery.retry = RetryMapping {
        start_after: 0,
        frequency: vec![0],
        count: vec![1],
    };
    conf
}

pub async fn setup() -> TestContext {
    let queue = InMemoryQueue::new(std::time::Duration::from_secs(60));
    setup_with_queue(queue.clone(), Box::new(queue)).await
}

/// `publisher` is what the application sends through, `queue` is what the test inspects.
pub async fn setup_with_queue(
    queue: InMemoryQueue,
    publisher: Box<dyn MessageQueue>,
) -> TestContext {
    let provider = MockServer::start().await;
    let db = MockDb::new();
    let collaborators = RecordingCollaborators::default();
    let state = AppState::with_storage(
        test_settings(&provider.uri()),
        Box::new(db.clone()),
        publisher,
        Box::new(ReqwestClient::new().unwrap()),
    )
    .with_collaborators(Collaborators::shared(collaborators.clone()));

    TestContext {
        state,
        db,
        queue,
        collaborators,
        provider,
    }
}

impl TestContext {
    pub async fn mulenpay_gateway(&self) -> storage::MerchantGateway {
        self.db
            .insert_merchant_gateway(gateway_new(GatewayName::Mulenpay))
            .await
            .unwrap()
    }

    /// A `Created` payment already known to the provider as `gateway_payment_id`.
    pub async fn open_payment(
        &self,
        gateway: &storage::MerchantGateway,
        payment_id: &str,
        gateway_payment_id: &str,
    ) -> storage::Payment {
        let payment = self
            .db
            .insert_payment(storage::PaymentNew {
                payment_id: payment_id.to_string(),
                merchant_id: MERCHANT_ID.to_string(),
                gateway_id: gateway.id,
                total_amount: 1000,
                currency: "USD".to_string(),
                return_url: Some("https://shop.example.com/done".to_string()),
                subscription_id: Some("sub_1".to_string()),
                invoice_id: Some("inv_1".to_string()),
                expire_time: None,
                metadata: None,
            })
            .await
            .unwrap();
        self.db
            .update_payment(
                payment,
                storage::PaymentUpdate::GatewayReferenceUpdate {
                    gateway_payment_id: Some(gateway_payment_id.to_string()),
                    gateway_payment_intent_id: None,
                    authorize_status: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn open_refund(
        &self,
        payment: &storage::Payment,
        refund_id: &str,
        gateway_refund_id: &str,
    ) -> storage::Refund {
        let refund = self
            .db
            .insert_refund(storage::RefundNew {
                refund_id: refund_id.to_string(),
                merchant_id: payment.merchant_id.clone(),
                payment_id: payment.payment_id.clone(),
                gateway_id: payment.gateway_id,
                refund_amount: 500,
                currency: payment.currency.clone(),
                reason: None,
                refund_type: storage::enums::RefundType::Gateway,
            })
            .await
            .unwrap();
        self.db
            .update_refund(
                refund,
                storage::RefundUpdate::GatewayReferenceUpdate {
                    gateway_refund_id: gateway_refund_id.to_string(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn endpoint(
        &self,
        url: String,
        subscribed_events: Vec<EventType>,
    ) -> storage::MerchantWebhookEndpoint {
        self.db
            .insert_webhook_endpoint(storage::MerchantWebhookEndpointNew {
                merchant_id: MERCHANT_ID.to_string(),
                url,
                subscribed_events,
                secret: Secret::new(ENDPOINT_SECRET.to_string()),
            })
            .await
            .unwrap()
    }

    /// Run one batch of `workflow`, committing what succeeded. Returns the batch size.
    pub async fn run_once(&self, workflow: &dyn QueueWorkflow<AppState>) -> usize {
        let messages = self.queue.consume(workflow.topic(), 10).await.unwrap();
        for message in &messages {
            workflow
                .execute_workflow(&self.state, message)
                .await
                .expect("workflow failed");
            self.queue.commit(&message.topic, &message.id).await.unwrap();
        }
        messages.len()
    }

    /// Run one batch of `workflow`, committing only what succeeded. Returns the messages that
    /// failed, which stay in flight.
    pub async fn run_once_keeping_failures(
        &self,
        workflow: &dyn QueueWorkflow<AppState>,
    ) -> Vec<QueueMessage> {
        let messages = self.queue.consume(workflow.topic(), 10).await.unwrap();
        let mut failed = Vec::new();
        for message in messages {
            match workflow.execute_workflow(&self.state, &message).await {
                Ok(()) => self.queue.commit(&message.topic, &message.id).await.unwrap(),
                Err(_) => failed.push(message),
            }
        }
        failed
    }

    /// Run `workflow` until its topic is empty. Returns the number of messages handled.
    pub async fn drain(&self, workflow: &dyn QueueWorkflow<AppState>) -> usize {
        let mut handled = 0;
        loop {
            match self.run_once(workflow).await {
                0 => break handled,
                count => handled += count,
            }
        }
    }
}

pub fn gateway_new(gateway_name: GatewayName) -> storage::MerchantGatewayNew {
    storage::MerchantGatewayNew {
        merchant_id: MERCHANT_ID.to_string(),
        gateway_name,
        display_name: None,
        gateway_key: Secret::new("key".to_string()),
        gateway_secret: Secret::new("secret".to_string()),
        webhook_secret: Some(Secret::new(WEBHOOK_SECRET.to_string())),
        payment_types: vec!["card".to_string()],
        country_restrictions: Vec::new(),
        sort: 0,
        metadata: None,
    }
}

/// Hex HMAC-SHA256 of `body`, as MulenPay signs its callbacks.
pub fn mulenpay_signature(body: &str) -> String {
    crypto::sign_and_encode(
        &crypto::HmacSha256,
        SignatureEncoding::Hex,
        WEBHOOK_SECRET.as_bytes(),
        body.as_bytes(),
    )
    .unwrap()
}

pub fn mulenpay_event(event: &str, object: &str, id: &str, status: &str) -> String {
    let mut body = serde_json::Map::new();
    body.insert("event".to_string(), event.into());
    body.insert(
        object.to_string(),
        serde_json::json!({ "id": id, "status": status }),
    );
    serde_json::Value::Object(body).to_string()
}

/// Queue rejecting the sends at the given positions, counted from 0.
#[derive(Clone, Debug)]
pub struct FailingQueue {
    inner: InMemoryQueue,
    failing_sends: Arc<Vec<usize>>,
    sends: Arc<AtomicUsize>,
}

impl FailingQueue {
    pub fn new(inner: InMemoryQueue, failing_sends: &[usize]) -> Self {
        Self {
            inner,
            failing_sends: Arc::new(failing_sends.to_vec()),
            sends: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl MessageQueue for FailingQueue {
    async fn send(&self, message: QueueMessageNew) -> CustomResult<String, QueueError> {
        let position = self.sends.fetch_add(1, Ordering::SeqCst);
        if self.failing_sends.contains(&position) {
            return Err(report!(QueueError::PublishFailed));
        }
        self.inner.send(message).await
    }

    async fn consume(
        &self,
        topic: &str,
        max_messages: usize,
    ) -> CustomResult<Vec<QueueMessage>, QueueError> {
        self.inner.consume(topic, max_messages).await
    }

    async fn commit(&self, topic: &str, message_id: &str) -> CustomResult<(), QueueError> {
        self.inner.commit(topic, message_id).await
    }
}
