use error_stack::report;

use super::MockDb;
use crate::{
    core::errors::{self, CustomResult},
    types::storage,
};

#[async_trait::async_trait]
pub trait RefundInterface {
    async fn insert_refund(
        &self,
        refund: storage::RefundNew,
    ) -> CustomResult<storage::Refund, errors::StorageError>;

    async fn find_refund_by_refund_id(
        &self,
        refund_id: &str,
    ) -> CustomResult<storage::Refund, errors::StorageError>;

    async fn find_refund_by_gateway_refund_id(
        &self,
        gateway_id: i64,
        gateway_refund_id: &str,
    ) -> CustomResult<storage::Refund, errors::StorageError>;

    async fn update_refund(
        &self,
        this: storage::Refund,
        refund: storage::RefundUpdate,
    ) -> CustomResult<storage::Refund, errors::StorageError>;

    /// Conditional update on `status = Created`, `None` when the refund is already terminal.
    async fn update_refund_status_if_created(
        &self,
        refund_id: &str,
        refund: storage::RefundUpdate,
    ) -> CustomResult<Option<storage::Refund>, errors::StorageError>;
}

fn refund_not_found(refund_id: &str) -> error_stack::Report<errors::StorageError> {
    report!(errors::StorageError::ValueNotFound(format!(
        "No refund available for refund_id = {refund_id}"
    )))
}

#[async_trait::async_trait]
impl RefundInterface for MockDb {
    async fn insert_refund(
        &self,
        refund: storage::RefundNew,
    ) -> CustomResult<storage::Refund, errors::StorageError> {
        let mut refunds = self.refunds.lock().await;
        if refunds
            .iter()
            .any(|existing| existing.refund_id == refund.refund_id)
        {
            return Err(report!(errors::StorageError::DuplicateValue {
                entity: "refund",
                key: Some(refund.refund_id),
            }));
        }
        let refund = refund.into_refund();
        refunds.push(refund.clone());
        Ok(refund)
    }

    async fn find_refund_by_refund_id(
        &self,
        refund_id: &str,
    ) -> CustomResult<storage::Refund, errors::StorageError> {
        self.refunds
            .lock()
            .await
            .iter()
            .find(|refund| refund.refund_id == refund_id)
            .cloned()
            .ok_or_else(|| refund_not_found(refund_id))
    }

    async fn find_refund_by_gateway_refund_id(
        &self,
        gateway_id: i64,
        gateway_refund_id: &str,
    ) -> CustomResult<storage::Refund, errors::StorageError> {
        self.refunds
            .lock()
            .await
            .iter()
            .find(|refund| {
                refund.gateway_id == gateway_id
                    && refund.gateway_refund_id.as_deref() == Some(gateway_refund_id)
            })
            .cloned()
            .ok_or_else(|| {
                report!(errors::StorageError::ValueNotFound(format!(
                    "No refund available for gateway_id = {gateway_id} and gateway_refund_id = {gateway_refund_id}"
                )))
            })
    }

    async fn update_refund(
        &self,
        this: storage::Refund,
        refund: storage::RefundUpdate,
    ) -> CustomResult<storage::Refund, errors::StorageError> {
        let mut refunds = self.refunds.lock().await;
        let stored = refunds
            .iter_mut()
            .find(|stored| stored.refund_id == this.refund_id)
            .ok_or_else(|| refund_not_found(&this.refund_id))?;
        *stored = refund.apply_changeset(stored.clone());
        Ok(stored.clone())
    }

    async fn update_refund_status_if_created(
        &self,
        refund_id: &str,
        refund: storage::RefundUpdate,
    ) -> CustomResult<Option<storage::Refund>, errors::StorageError> {
        let mut refunds = self.refunds.lock().await;
        let stored = refunds
            .iter_mut()
            .find(|stored| stored.refund_id == refund_id)
            .ok_or_else(|| refund_not_found(refund_id))?;
        if stored.status.is_terminal() {
            return Ok(None);
        }
        *stored = refund.apply_changeset(stored.clone());
        Ok(Some(stored.clone()))
    }
}
