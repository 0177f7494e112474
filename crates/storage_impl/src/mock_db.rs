use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use futures::lock::Mutex;
use storage_models as store;

/// In-memory store.
///
/// Each table sits behind its own lock. Conditional updates hold the table lock for the whole
/// check-and-write, which is what makes them atomic.
#[derive(Clone, Debug, Default)]
pub struct MockDb {
    pub payments: Arc<Mutex<Vec<store::Payment>>>,
    pub refunds: Arc<Mutex<Vec<store::Refund>>>,
    pub merchant_gateways: Arc<Mutex<Vec<store::MerchantGateway>>>,
    pub webhook_messages: Arc<Mutex<Vec<store::WebhookMessage>>>,
    pub webhook_deliveries: Arc<Mutex<Vec<store::WebhookDelivery>>>,
    pub webhook_endpoints: Arc<Mutex<Vec<store::MerchantWebhookEndpoint>>>,
    pub gateway_http_logs: Arc<Mutex<Vec<store::GatewayHttpLog>>>,
    id_sequence: Arc<AtomicI64>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next value of the store-wide numeric id sequence, starting at 1.
    pub fn next_id(&self) -> i64 {
        self.id_sequence
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1)
    }
}
