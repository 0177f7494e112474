use std::{
    collections::{HashSet, VecDeque},
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use error_stack::report;
use futures::lock::Mutex;

use crate::errors::{CustomResult, QueueError};

/// A message to be published.
#[derive(Debug, Clone)]
pub struct QueueMessageNew {
    pub topic: String,
    pub tag: String,
    pub body: String,
    /// Time before the message becomes visible to consumers
    pub delay_ms: u64,
    /// Messages sharing a key are handed out one at a time, in publish order
    pub sequence_key: Option<String>,
}

impl QueueMessageNew {
    pub fn new(topic: impl Into<String>, tag: impl Into<String>, body: String) -> Self {
        Self {
            topic: topic.into(),
            tag: tag.into(),
            body,
            delay_ms: 0,
            sequence_key: None,
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_sequence_key(mut self, sequence_key: Option<String>) -> Self {
        self.sequence_key = sequence_key.filter(|key| !key.is_empty());
        self
    }
}

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    pub topic: String,
    pub tag: String,
    pub body: String,
    pub sequence_key: Option<String>,
    /// Number of times the message was handed out, starting at 1
    pub delivery_count: u32,
}

/// At-least-once topic queue. A consumed message stays invisible until it is committed or its
/// visibility timeout elapses, after which it is handed out again.
#[async_trait::async_trait]
pub trait MessageQueue: Send + Sync + dyn_clone::DynClone + Debug {
    async fn send(&self, message: QueueMessageNew) -> CustomResult<String, QueueError>;

    async fn consume(
        &self,
        topic: &str,
        max_messages: usize,
    ) -> CustomResult<Vec<QueueMessage>, QueueError>;

    async fn commit(&self, topic: &str, message_id: &str) -> CustomResult<(), QueueError>;
}

dyn_clone::clone_trait_object!(MessageQueue);

#[derive(Debug)]
struct StoredMessage {
    message: QueueMessage,
    visible_at: Instant,
}

#[derive(Debug)]
struct InFlight {
    message: QueueMessage,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<StoredMessage>,
    in_flight: Vec<InFlight>,
}

impl QueueState {
    fn expire_in_flight(&mut self, now: Instant) {
        let (expired, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|entry| entry.deadline <= now);
        self.in_flight = alive;
        // Put expired messages back at the head so that per-key order is kept.
        for entry in expired.into_iter().rev() {
            self.ready.push_front(StoredMessage {
                message: entry.message,
                visible_at: now,
            });
        }
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryQueue {
    state: Arc<Mutex<QueueState>>,
    visibility_timeout: Duration,
    id_sequence: Arc<AtomicU64>,
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            visibility_timeout,
            id_sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Messages waiting or in flight on `topic`.
    pub async fn pending_count(&self, topic: &str) -> usize {
        let state = self.state.lock().await;
        state
            .ready
            .iter()
            .filter(|stored| stored.message.topic == topic)
            .count()
            + state
                .in_flight
                .iter()
                .filter(|entry| entry.message.topic == topic)
                .count()
    }
}

#[async_trait::async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send(&self, message: QueueMessageNew) -> CustomResult<String, QueueError> {
        if message.topic.is_empty() {
            return Err(report!(QueueError::PublishFailed).attach_printable("topic must not be empty"));
        }
        let id = format!(
            "msg_{}",
            self.id_sequence.fetch_add(1, Ordering::Relaxed)
        );
        let stored = StoredMessage {
            message: QueueMessage {
                id: id.clone(),
                topic: message.topic,
                tag: message.tag,
                body: message.body,
                sequence_key: message.sequence_key,
                delivery_count: 0,
            },
            visible_at: Instant::now() + Duration::from_millis(message.delay_ms),
        };
        self.state.lock().await.ready.push_back(stored);
        Ok(id)
    }

    async fn consume(
        &self,
        topic: &str,
        max_messages: usize,
    ) -> CustomResult<Vec<QueueMessage>, QueueError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.expire_in_flight(now);

        // A key with a message in flight, or with an earlier message still waiting, is blocked.
        let mut blocked_keys: HashSet<String> = state
            .in_flight
            .iter()
            .filter(|entry| entry.message.topic == topic)
            .filter_map(|entry| entry.message.sequence_key.clone())
            .collect();

        let mut taken = Vec::new();
        let mut remaining = VecDeque::with_capacity(state.ready.len());
        while let Some(stored) = state.ready.pop_front() {
            if stored.message.topic != topic || taken.len() >= max_messages {
                remaining.push_back(stored);
                continue;
            }
            let key = stored.message.sequence_key.clone();
            let is_blocked = key
                .as_ref()
                .is_some_and(|key| blocked_keys.contains(key));
            if is_blocked || stored.visible_at > now {
                if let Some(key) = key {
                    blocked_keys.insert(key);
                }
                remaining.push_back(stored);
                continue;
            }
            if let Some(key) = key {
                blocked_keys.insert(key);
            }
            let mut message = stored.message;
            message.delivery_count += 1;
            taken.push(message);
        }
        state.ready = remaining;

        let deadline = now + self.visibility_timeout;
        state
            .in_flight
            .extend(taken.iter().cloned().map(|message| InFlight { message, deadline }));
        Ok(taken)
    }

    async fn commit(&self, topic: &str, message_id: &str) -> CustomResult<(), QueueError> {
        let mut state = self.state.lock().await;
        let position = state
            .in_flight
            .iter()
            .position(|entry| entry.message.id == message_id && entry.message.topic == topic)
            .ok_or_else(|| report!(QueueError::MessageNotInFlight(message_id.to_owned())))?;
        state.in_flight.swap_remove(position);
        Ok(())
    }
}
