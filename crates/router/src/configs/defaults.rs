use super::settings::{Server, WebhookDeliverySettings};

impl Default for Server {
    fn default() -> Self {
        Self {
            port: 8080,
            workers: num_workers(),
            host: "localhost".into(),
            base_url: "http://localhost:8080".into(),
            shutdown_timeout: 30,
        }
    }
}

impl Default for WebhookDeliverySettings {
    fn default() -> Self {
        Self {
            retry: Default::default(),
            consumer: Default::default(),
            producer: Default::default(),
            request_timeout_secs: 30,
            visibility_timeout_secs: 60,
        }
    }
}

fn num_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}
