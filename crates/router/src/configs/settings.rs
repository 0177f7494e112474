use std::path::PathBuf;

use config::{Environment, File};
use gateway_interfaces::configs::Gateways;
use router_env::{config::Log, env, logger};
use scheduler::{
    settings::{ConsumerSettings, ProducerSettings},
    utils::RetryMapping,
};
use serde::Deserialize;

use crate::core::errors::{ApplicationError, ApplicationResult};

#[derive(clap::Parser, Default)]
#[command(version, about = "Payment core server")]
pub struct CmdLineConf {
    /// Config file.
    /// Application will look for "config/<env>.toml" if this option isn't specified.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: Server,
    pub log: Log,
    pub gateways: Gateways,
    pub webhook_delivery: WebhookDeliverySettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    pub port: u16,
    pub workers: usize,
    pub host: String,
    /// Public URL of this service, used to build the redirect and webhook URLs handed to providers
    pub base_url: String,
    /// Seconds given to in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebhookDeliverySettings {
    pub retry: RetryMapping,
    pub consumer: ConsumerSettings,
    pub producer: ProducerSettings,
    /// Timeout of a single POST to a merchant endpoint
    pub request_timeout_secs: u64,
    /// Time a consumed message stays hidden before it is handed out again
    pub visibility_timeout_secs: u64,
}

impl WebhookDeliverySettings {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn visibility_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.visibility_timeout_secs)
    }
}

impl Settings {
    pub fn new() -> ApplicationResult<Self> {
        Self::with_config_path(None)
    }

    pub fn with_config_path(config_path: Option<PathBuf>) -> ApplicationResult<Self> {
        let environment = env::which();
        let config_path = config_path.unwrap_or_else(|| {
            let mut path = env::workspace_path();
            path.push("config");
            path.push(format!("{}.toml", environment.config_file_stem()));
            path
        });

        let config = config::Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("ROUTER")
                    .try_parsing(true)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("webhook_delivery.retry.frequency")
                    .with_list_parse_key("webhook_delivery.retry.count"),
            )
            .build()?;

        serde_path_to_error::deserialize(config).map_err(|error| {
            logger::error!(%error, "Unable to deserialize application configuration");
            eprintln!("Unable to deserialize application configuration: {error}");
            ApplicationError::from(error.into_inner())
        })
    }

    pub fn validate(&self) -> ApplicationResult<()> {
        self.server.validate()?;
        self.validate_gateways()?;
        self.webhook_delivery.validate()?;
        self.webhook_delivery.consumer.validate()?;
        self.webhook_delivery.producer.validate()?;
        Ok(())
    }
}
