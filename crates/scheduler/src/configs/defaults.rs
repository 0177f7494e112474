use crate::{settings, utils::RetryMapping};

impl Default for settings::ConsumerSettings {
    fn default() -> Self {
        Self {
            disabled: false,
            consumer_group: "WEBHOOK_DELIVERY_GROUP".into(),
            batch_size: 50,
            max_concurrency: 16,
            loop_interval: 200,
            graceful_shutdown_interval: 30_000,
        }
    }
}

impl Default for settings::ProducerSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            dependency_retry_delay_ms: 1_000,
            republish_after_ms: 30_000,
            republish_interval_ms: 60_000,
        }
    }
}

impl Default for RetryMapping {
    fn default() -> Self {
        Self {
            start_after: 60,
            frequency: vec![300],
            count: vec![5],
        }
    }
}
