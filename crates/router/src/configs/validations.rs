use common_utils::{ext_traits::ConfigExt, fp_utils::when};

use crate::core::errors::ApplicationError;

impl super::settings::Server {
    pub fn validate(&self) -> Result<(), ApplicationError> {
        when(self.host.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "server host must not be empty".into(),
            ))
        })?;
        when(self.workers.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "server workers must be greater than zero".into(),
            ))
        })?;
        when(
            !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")),
            || {
                Err(ApplicationError::InvalidConfigurationValueError(
                    "server base URL must be an absolute http(s) URL".into(),
                ))
            },
        )
    }
}

impl super::settings::Settings {
    pub(super) fn validate_gateways(&self) -> Result<(), ApplicationError> {
        let gateways = &self.gateways;
        for (name, params) in [
            ("airwallex", &gateways.airwallex),
            ("alikassa", &gateways.alikassa),
            ("blockonomics", &gateways.blockonomics),
            ("firekassa", &gateways.firekassa),
            ("mulenpay", &gateways.mulenpay),
        ] {
            when(params.base_url.is_default_or_empty(), || {
                Err(ApplicationError::InvalidConfigurationValueError(format!(
                    "{name} base URL must not be empty"
                )))
            })?;
        }
        when(gateways.request_timeout_secs.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "gateway request timeout must be greater than zero".into(),
            ))
        })?;
        when(gateways.webhook_tolerance_secs <= 0, || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "webhook tolerance must be greater than zero".into(),
            ))
        })
    }
}

impl super::settings::WebhookDeliverySettings {
    pub fn validate(&self) -> Result<(), ApplicationError> {
        when(self.request_timeout_secs.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "webhook delivery timeout must be greater than zero".into(),
            ))
        })?;
        when(self.visibility_timeout_secs.is_default_or_empty(), || {
            Err(ApplicationError::InvalidConfigurationValueError(
                "queue visibility timeout must be greater than zero".into(),
            ))
        })?;
        when(
            self.retry.frequency.len() != self.retry.count.len(),
            || {
                Err(ApplicationError::InvalidConfigurationValueError(
                    "retry frequency and count must have the same length".into(),
                ))
            },
        )
    }
}
