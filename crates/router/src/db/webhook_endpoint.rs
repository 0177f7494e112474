use error_stack::report;

use super::MockDb;
use crate::{
    core::errors::{self, CustomResult},
    types::storage,
};

#[async_trait::async_trait]
pub trait WebhookEndpointInterface {
    async fn insert_webhook_endpoint(
        &self,
        endpoint: storage::MerchantWebhookEndpointNew,
    ) -> CustomResult<storage::MerchantWebhookEndpoint, errors::StorageError>;

    async fn find_webhook_endpoint_by_id(
        &self,
        id: i64,
    ) -> CustomResult<storage::MerchantWebhookEndpoint, errors::StorageError>;

    async fn list_webhook_endpoints_by_merchant_id(
        &self,
        merchant_id: &str,
    ) -> CustomResult<Vec<storage::MerchantWebhookEndpoint>, errors::StorageError>;
}

#[async_trait::async_trait]
impl WebhookEndpointInterface for MockDb {
    async fn insert_webhook_endpoint(
        &self,
        endpoint: storage::MerchantWebhookEndpointNew,
    ) -> CustomResult<storage::MerchantWebhookEndpoint, errors::StorageError> {
        let endpoint = endpoint.into_endpoint(self.next_id());
        self.webhook_endpoints.lock().await.push(endpoint.clone());
        Ok(endpoint)
    }

    async fn find_webhook_endpoint_by_id(
        &self,
        id: i64,
    ) -> CustomResult<storage::MerchantWebhookEndpoint, errors::StorageError> {
        self.webhook_endpoints
            .lock()
            .await
            .iter()
            .find(|endpoint| endpoint.id == id)
            .cloned()
            .ok_or_else(|| {
                report!(errors::StorageError::ValueNotFound(format!(
                    "No webhook endpoint available for id = {id}"
                )))
            })
    }

    async fn list_webhook_endpoints_by_merchant_id(
        &self,
        merchant_id: &str,
    ) -> CustomResult<Vec<storage::MerchantWebhookEndpoint>, errors::StorageError> {
        Ok(self
            .webhook_endpoints
            .lock()
            .await
            .iter()
            .filter(|endpoint| endpoint.merchant_id == merchant_id)
            .cloned()
            .collect())
    }
}
