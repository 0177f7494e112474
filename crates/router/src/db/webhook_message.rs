use error_stack::report;
use time::PrimitiveDateTime;

use super::MockDb;
use crate::{
    core::errors::{self, CustomResult},
    types::storage::{self, enums},
};

#[async_trait::async_trait]
pub trait WebhookMessageInterface {
    /// Fails with `DuplicateValue` when a queued message with the same `idempotent_event_id`
    /// exists. `Persisted` copies do not take part in the check.
    async fn insert_webhook_message(
        &self,
        message: storage::WebhookMessageNew,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError>;

    async fn find_webhook_message_by_id(
        &self,
        id: &str,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError>;

    /// Matches `reference` against `event_id` or `idempotent_event_id`.
    async fn find_webhook_message_by_event_reference(
        &self,
        merchant_id: &str,
        reference: &str,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError>;

    async fn list_webhook_messages_by_merchant_id(
        &self,
        merchant_id: &str,
    ) -> CustomResult<Vec<storage::WebhookMessage>, errors::StorageError>;

    async fn update_webhook_message_status(
        &self,
        id: &str,
        status: enums::WebhookMessageStatus,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError>;

    async fn mark_webhook_message_published(
        &self,
        id: &str,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError>;

    /// Queued messages created at or before `created_before` whose publishing never completed.
    async fn list_unpublished_webhook_messages(
        &self,
        created_before: PrimitiveDateTime,
    ) -> CustomResult<Vec<storage::WebhookMessage>, errors::StorageError>;

    async fn list_webhook_messages_by_merchant_id_status(
        &self,
        merchant_id: &str,
        status: enums::WebhookMessageStatus,
    ) -> CustomResult<Vec<storage::WebhookMessage>, errors::StorageError>;
}

fn message_not_found(id: &str) -> error_stack::Report<errors::StorageError> {
    report!(errors::StorageError::ValueNotFound(format!(
        "No webhook message available for id = {id}"
    )))
}

fn is_queued(message: &storage::WebhookMessage) -> bool {
    message.status != enums::WebhookMessageStatus::Persisted
}

#[async_trait::async_trait]
impl WebhookMessageInterface for MockDb {
    async fn insert_webhook_message(
        &self,
        message: storage::WebhookMessageNew,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError> {
        let mut messages = self.webhook_messages.lock().await;
        if message.status != enums::WebhookMessageStatus::Persisted
            && messages.iter().any(|existing| {
                is_queued(existing) && existing.idempotent_event_id == message.idempotent_event_id
            })
        {
            return Err(report!(errors::StorageError::DuplicateValue {
                entity: "webhook_message",
                key: Some(message.idempotent_event_id),
            }));
        }
        let message = storage::WebhookMessage::from(message);
        messages.push(message.clone());
        Ok(message)
    }

    async fn find_webhook_message_by_id(
        &self,
        id: &str,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError> {
        self.webhook_messages
            .lock()
            .await
            .iter()
            .find(|message| message.id == id)
            .cloned()
            .ok_or_else(|| message_not_found(id))
    }

    async fn find_webhook_message_by_event_reference(
        &self,
        merchant_id: &str,
        reference: &str,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError> {
        self.webhook_messages
            .lock()
            .await
            .iter()
            .find(|message| {
                message.merchant_id == merchant_id
                    && is_queued(message)
                    && (message.event_id == reference || message.idempotent_event_id == reference)
            })
            .cloned()
            .ok_or_else(|| {
                report!(errors::StorageError::ValueNotFound(format!(
                    "No webhook message available for merchant_id = {merchant_id} and reference = {reference}"
                )))
            })
    }

    async fn list_webhook_messages_by_merchant_id(
        &self,
        merchant_id: &str,
    ) -> CustomResult<Vec<storage::WebhookMessage>, errors::StorageError> {
        Ok(self
            .webhook_messages
            .lock()
            .await
            .iter()
            .filter(|message| message.merchant_id == merchant_id)
            .cloned()
            .collect())
    }

    async fn update_webhook_message_status(
        &self,
        id: &str,
        status: enums::WebhookMessageStatus,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError> {
        let mut messages = self.webhook_messages.lock().await;
        let message = messages
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or_else(|| message_not_found(id))?;
        message.status = status;
        Ok(message.clone())
    }

    async fn mark_webhook_message_published(
        &self,
        id: &str,
    ) -> CustomResult<storage::WebhookMessage, errors::StorageError> {
        let mut messages = self.webhook_messages.lock().await;
        let message = messages
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or_else(|| message_not_found(id))?;
        message.published = true;
        Ok(message.clone())
    }

    async fn list_unpublished_webhook_messages(
        &self,
        created_before: PrimitiveDateTime,
    ) -> CustomResult<Vec<storage::WebhookMessage>, errors::StorageError> {
        Ok(self
            .webhook_messages
            .lock()
            .await
            .iter()
            .filter(|message| {
                is_queued(message) && !message.published && message.created_at <= created_before
            })
            .cloned()
            .collect())
    }

    async fn list_webhook_messages_by_merchant_id_status(
        &self,
        merchant_id: &str,
        status: enums::WebhookMessageStatus,
    ) -> CustomResult<Vec<storage::WebhookMessage>, errors::StorageError> {
        Ok(self
            .webhook_messages
            .lock()
            .await
            .iter()
            .filter(|message| message.merchant_id == merchant_id && message.status == status)
            .cloned()
            .collect())
    }
}
