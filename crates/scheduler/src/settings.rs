use common_utils::{ext_traits::ConfigExt, fp_utils::when};
use serde::Deserialize;
use storage_impl::errors::ApplicationError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    pub disabled: bool,
    pub consumer_group: String,
    /// Largest number of messages pulled in one poll
    pub batch_size: usize,
    /// Messages processed at the same time
    pub max_concurrency: usize,
    /// Poll interval, in milliseconds
    pub loop_interval: u64,
    /// Time given to in-flight messages on shutdown, in milliseconds
    pub graceful_shutdown_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerSettings {
    /// Delay before a freshly published delivery becomes visible
    pub initial_delay_ms: u64,
    /// Delay before a message waiting on its dependency is looked at again
    pub dependency_retry_delay_ms: u64,
    /// Age after which a stored message that was never fully queued is published again
    pub republish_after_ms: u64,
    /// Interval of the sweep publishing such messages
    pub republish_interval_ms: u64,
}

impl ConsumerSettings {
    pub fn validate(&self) -> Result<(), ApplicationError> {
        when(self.consumer_group.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "consumer group must not be empty".into(),
            ))
        })?;
        when(self.batch_size.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "consumer batch size must be greater than zero".into(),
            ))
        })?;
        when(self.max_concurrency.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "consumer max concurrency must be greater than zero".into(),
            ))
        })
    }
}

impl ProducerSettings {
    pub fn validate(&self) -> Result<(), ApplicationError> {
        when(self.dependency_retry_delay_ms.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "dependency retry delay must be greater than zero".into(),
            ))
        })?;
        when(self.republish_interval_ms.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "republish interval must be greater than zero".into(),
            ))
        })
    }
}
