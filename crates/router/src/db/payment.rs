use error_stack::report;

use super::MockDb;
use crate::{
    core::errors::{self, CustomResult},
    types::storage,
};

#[async_trait::async_trait]
pub trait PaymentInterface {
    async fn insert_payment(
        &self,
        payment: storage::PaymentNew,
    ) -> CustomResult<storage::Payment, errors::StorageError>;

    async fn find_payment_by_payment_id(
        &self,
        payment_id: &str,
    ) -> CustomResult<storage::Payment, errors::StorageError>;

    /// Lookup by the provider's payment or payment intent id.
    async fn find_payment_by_gateway_payment_id(
        &self,
        gateway_id: i64,
        gateway_payment_id: &str,
    ) -> CustomResult<storage::Payment, errors::StorageError>;

    async fn update_payment(
        &self,
        this: storage::Payment,
        payment: storage::PaymentUpdate,
    ) -> CustomResult<storage::Payment, errors::StorageError>;

    /// Apply `payment` only while the stored status is still `Created`.
    ///
    /// Returns `None` when the payment already reached a terminal status, including when a
    /// concurrent caller won the race.
    async fn update_payment_status_if_created(
        &self,
        payment_id: &str,
        payment: storage::PaymentUpdate,
    ) -> CustomResult<Option<storage::Payment>, errors::StorageError>;
}

#[async_trait::async_trait]
impl PaymentInterface for MockDb {
    async fn insert_payment(
        &self,
        payment: storage::PaymentNew,
    ) -> CustomResult<storage::Payment, errors::StorageError> {
        let mut payments = self.payments.lock().await;
        if payments
            .iter()
            .any(|existing| existing.payment_id == payment.payment_id)
        {
            return Err(report!(errors::StorageError::DuplicateValue {
                entity: "payment",
                key: Some(payment.payment_id),
            }));
        }
        let payment = payment.into_payment();
        payments.push(payment.clone());
        Ok(payment)
    }

    async fn find_payment_by_payment_id(
        &self,
        payment_id: &str,
    ) -> CustomResult<storage::Payment, errors::StorageError> {
        self.payments
            .lock()
            .await
            .iter()
            .find(|payment| payment.payment_id == payment_id)
            .cloned()
            .ok_or_else(|| {
                report!(errors::StorageError::ValueNotFound(format!(
                    "No payment available for payment_id = {payment_id}"
                )))
            })
    }

    async fn find_payment_by_gateway_payment_id(
        &self,
        gateway_id: i64,
        gateway_payment_id: &str,
    ) -> CustomResult<storage::Payment, errors::StorageError> {
        self.payments
            .lock()
            .await
            .iter()
            .find(|payment| {
                payment.gateway_id == gateway_id
                    && (payment.gateway_payment_id.as_deref() == Some(gateway_payment_id)
                        || payment.gateway_payment_intent_id.as_deref()
                            == Some(gateway_payment_id))
            })
            .cloned()
            .ok_or_else(|| {
                report!(errors::StorageError::ValueNotFound(format!(
                    "No payment available for gateway_id = {gateway_id} and gateway_payment_id = {gateway_payment_id}"
                )))
            })
    }

    async fn update_payment(
        &self,
        this: storage::Payment,
        payment: storage::PaymentUpdate,
    ) -> CustomResult<storage::Payment, errors::StorageError> {
        let mut payments = self.payments.lock().await;
        let stored = payments
            .iter_mut()
            .find(|stored| stored.payment_id == this.payment_id)
            .ok_or_else(|| {
                report!(errors::StorageError::ValueNotFound(format!(
                    "No payment available for payment_id = {}",
                    this.payment_id
                )))
            })?;
        *stored = payment.apply_changeset(stored.clone());
        Ok(stored.clone())
    }

    async fn update_payment_status_if_created(
        &self,
        payment_id: &str,
        payment: storage::PaymentUpdate,
    ) -> CustomResult<Option<storage::Payment>, errors::StorageError> {
        let mut payments = self.payments.lock().await;
        let stored = payments
            .iter_mut()
            .find(|stored| stored.payment_id == payment_id)
            .ok_or_else(|| {
                report!(errors::StorageError::ValueNotFound(format!(
                    "No payment available for payment_id = {payment_id}"
                )))
            })?;
        if stored.status.is_terminal() {
            return Ok(None);
        }
        *stored = payment.apply_changeset(stored.clone());
        Ok(Some(stored.clone()))
    }
}
