use error_stack::report;

use super::MockDb;
use crate::{
    core::errors::{self, CustomResult},
    types::storage::{self, enums},
};

#[async_trait::async_trait]
pub trait WebhookDeliveryInterface {
    async fn insert_webhook_delivery(
        &self,
        delivery: storage::WebhookDeliveryNew,
    ) -> CustomResult<storage::WebhookDelivery, errors::StorageError>;

    async fn find_webhook_delivery_by_id(
        &self,
        id: &str,
    ) -> CustomResult<storage::WebhookDelivery, errors::StorageError>;

    async fn update_webhook_delivery(
        &self,
        id: &str,
        delivery: storage::WebhookDeliveryUpdate,
    ) -> CustomResult<storage::WebhookDelivery, errors::StorageError>;

    async fn list_webhook_deliveries_by_message_id(
        &self,
        message_id: &str,
    ) -> CustomResult<Vec<storage::WebhookDelivery>, errors::StorageError>;

    async fn list_webhook_deliveries_by_merchant_id_status(
        &self,
        merchant_id: &str,
        status: enums::DeliveryStatus,
    ) -> CustomResult<Vec<storage::WebhookDelivery>, errors::StorageError>;
}

fn delivery_not_found(id: &str) -> error_stack::Report<errors::StorageError> {
    report!(errors::StorageError::ValueNotFound(format!(
        "No webhook delivery available for id = {id}"
    )))
}

#[async_trait::async_trait]
impl WebhookDeliveryInterface for MockDb {
    async fn insert_webhook_delivery(
        &self,
        delivery: storage::WebhookDeliveryNew,
    ) -> CustomResult<storage::WebhookDelivery, errors::StorageError> {
        let mut deliveries = self.webhook_deliveries.lock().await;
        if deliveries.iter().any(|existing| existing.id == delivery.id) {
            return Err(report!(errors::StorageError::DuplicateValue {
                entity: "webhook_delivery",
                key: Some(delivery.id),
            }));
        }
        let delivery = storage::WebhookDelivery::from(delivery);
        deliveries.push(delivery.clone());
        Ok(delivery)
    }

    async fn find_webhook_delivery_by_id(
        &self,
        id: &str,
    ) -> CustomResult<storage::WebhookDelivery, errors::StorageError> {
        self.webhook_deliveries
            .lock()
            .await
            .iter()
            .find(|delivery| delivery.id == id)
            .cloned()
            .ok_or_else(|| delivery_not_found(id))
    }

    async fn update_webhook_delivery(
        &self,
        id: &str,
        delivery: storage::WebhookDeliveryUpdate,
    ) -> CustomResult<storage::WebhookDelivery, errors::StorageError> {
        let mut deliveries = self.webhook_deliveries.lock().await;
        let stored = deliveries
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or_else(|| delivery_not_found(id))?;
        *stored = delivery.apply_changeset(stored.clone());
        Ok(stored.clone())
    }

    async fn list_webhook_deliveries_by_message_id(
        &self,
        message_id: &str,
    ) -> CustomResult<Vec<storage::WebhookDelivery>, errors::StorageError> {
        Ok(self
            .webhook_deliveries
            .lock()
            .await
            .iter()
            .filter(|delivery| delivery.message_id == message_id)
            .cloned()
            .collect())
    }

    async fn list_webhook_deliveries_by_merchant_id_status(
        &self,
        merchant_id: &str,
        status: enums::DeliveryStatus,
    ) -> CustomResult<Vec<storage::WebhookDelivery>, errors::StorageError> {
        Ok(self
            .webhook_deliveries
            .lock()
            .await
            .iter()
            .filter(|delivery| delivery.merchant_id == merchant_id && delivery.status == status)
            .cloned()
            .collect())
    }
}
