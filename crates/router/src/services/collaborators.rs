//! Boundaries to the invoice, subscription and operation-log services owned by the billing
//! platform. The payment core only notifies them.

use error_stack::report;
use router_env::logger;
use storage_models::{Payment, Refund};

use crate::core::errors::{CollaboratorError, CustomResult};

#[async_trait::async_trait]
pub trait InvoiceService: Send + Sync {
    async fn update_status_on_payment_success(
        &self,
        payment: &Payment,
    ) -> CustomResult<(), CollaboratorError>;

    /// The invoice stays open so that it can be paid again.
    async fn update_status_on_payment_failure(
        &self,
        payment: &Payment,
    ) -> CustomResult<(), CollaboratorError>;

    async fn update_status_on_refund_success(
        &self,
        refund: &Refund,
    ) -> CustomResult<(), CollaboratorError>;

    async fn update_status_on_refund_failure(
        &self,
        refund: &Refund,
    ) -> CustomResult<(), CollaboratorError>;
}

#[async_trait::async_trait]
pub trait SubscriptionService: Send + Sync {
    async fn update_status_on_payment_success(
        &self,
        payment: &Payment,
    ) -> CustomResult<(), CollaboratorError>;

    async fn update_status_on_payment_failure(
        &self,
        payment: &Payment,
    ) -> CustomResult<(), CollaboratorError>;

    async fn update_status_on_refund_success(
        &self,
        refund: &Refund,
    ) -> CustomResult<(), CollaboratorError>;

    async fn update_status_on_refund_failure(
        &self,
        refund: &Refund,
    ) -> CustomResult<(), CollaboratorError>;
}

/// Merchant-visible audit trail entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptLogEntry {
    pub merchant_id: String,
    /// `Payment(pay_..)`, `Refund(ref_..)`, ...
    pub target: String,
    pub content: String,
    /// Provider event name or flow that caused the entry
    pub source: String,
}

#[async_trait::async_trait]
pub trait OptLog: Send + Sync {
    async fn append_opt_log(&self, entry: OptLogEntry) -> CustomResult<(), CollaboratorError>;
}

/// Collaborators that only log, used when the payment core runs on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingCollaborators;

#[async_trait::async_trait]
impl InvoiceService for LoggingCollaborators {
    async fn update_status_on_payment_success(
        &self,
        payment: &Payment,
    ) -> CustomResult<(), CollaboratorError> {
        logger::info!(payment_id = %payment.payment_id, invoice_id = ?payment.invoice_id, "invoice paid");
        Ok(())
    }

    async fn update_status_on_payment_failure(
        &self,
        payment: &Payment,
    ) -> CustomResult<(), CollaboratorError> {
        logger::info!(payment_id = %payment.payment_id, invoice_id = ?payment.invoice_id, "invoice payment failed");
        Ok(())
    }

    async fn update_status_on_refund_success(
        &self,
        refund: &Refund,
    ) -> CustomResult<(), CollaboratorError> {
        logger::info!(refund_id = %refund.refund_id, "invoice refunded");
        Ok(())
    }

    async fn update_status_on_refund_failure(
        &self,
        refund: &Refund,
    ) -> CustomResult<(), CollaboratorError> {
        logger::info!(refund_id = %refund.refund_id, "invoice refund failed");
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriptionService for LoggingCollaborators {
    async fn update_status_on_payment_success(
        &self,
        payment: &Payment,
    ) -> CustomResult<(), CollaboratorError> {
        logger::info!(payment_id = %payment.payment_id, subscription_id = ?payment.subscription_id, "subscription payment succeeded");
        Ok(())
    }

    async fn update_status_on_payment_failure(
        &self,
        payment: &Payment,
    ) -> CustomResult<(), CollaboratorError> {
        logger::info!(payment_id = %payment.payment_id, subscription_id = ?payment.subscription_id, "subscription payment failed");
        Ok(())
    }

    async fn update_status_on_refund_success(
        &self,
        refund: &Refund,
    ) -> CustomResult<(), CollaboratorError> {
        logger::info!(refund_id = %refund.refund_id, "subscription refund succeeded");
        Ok(())
    }

    async fn update_status_on_refund_failure(
        &self,
        refund: &Refund,
    ) -> CustomResult<(), CollaboratorError> {
        logger::info!(refund_id = %refund.refund_id, "subscription refund failed");
        Ok(())
    }
}

#[async_trait::async_trait]
impl OptLog for LoggingCollaborators {
    async fn append_opt_log(&self, entry: OptLogEntry) -> CustomResult<(), CollaboratorError> {
        if entry.merchant_id.is_empty() {
            return Err(report!(CollaboratorError::OptLogFailed)
                .attach_printable("operation log entry has no merchant"));
        }
        logger::info!(
            merchant_id = %entry.merchant_id,
            target = %entry.target,
            source = %entry.source,
            "{}",
            entry.content
        );
        Ok(())
    }
}

/// Recording doubles, shared by the tests of the core flows.
pub mod mock {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum CollaboratorCall {
        InvoicePaymentSuccess(String),
        InvoicePaymentFailure(String),
        InvoiceRefundSuccess(String),
        InvoiceRefundFailure(String),
        SubscriptionPaymentSuccess(String),
        SubscriptionPaymentFailure(String),
        SubscriptionRefundSuccess(String),
        SubscriptionRefundFailure(String),
    }

    #[derive(Clone, Debug, Default)]
    pub struct RecordingCollaborators {
        pub calls: Arc<Mutex<Vec<CollaboratorCall>>>,
        pub opt_logs: Arc<Mutex<Vec<OptLogEntry>>>,
    }

    impl RecordingCollaborators {
        pub async fn calls(&self) -> Vec<CollaboratorCall> {
            self.calls.lock().await.clone()
        }

        pub async fn opt_logs(&self) -> Vec<OptLogEntry> {
            self.opt_logs.lock().await.clone()
        }

        async fn record(&self, call: CollaboratorCall) -> CustomResult<(), CollaboratorError> {
            self.calls.lock().await.push(call);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl InvoiceService for RecordingCollaborators {
        async fn update_status_on_payment_success(
            &self,
            payment: &Payment,
        ) -> CustomResult<(), CollaboratorError> {
            self.record(CollaboratorCall::InvoicePaymentSuccess(payment.payment_id.clone()))
                .await
        }

        async fn update_status_on_payment_failure(
            &self,
            payment: &Payment,
        ) -> CustomResult<(), CollaboratorError> {
            self.record(CollaboratorCall::InvoicePaymentFailure(payment.payment_id.clone()))
                .await
        }

        async fn update_status_on_refund_success(
            &self,
            refund: &Refund,
        ) -> CustomResult<(), CollaboratorError> {
            self.record(CollaboratorCall::InvoiceRefundSuccess(refund.refund_id.clone()))
                .await
        }

        async fn update_status_on_refund_failure(
            &self,
            refund: &Refund,
        ) -> CustomResult<(), CollaboratorError> {
            self.record(CollaboratorCall::InvoiceRefundFailure(refund.refund_id.clone()))
                .await
        }
    }

    #[async_trait::async_trait]
    impl SubscriptionService for RecordingCollaborators {
        async fn update_status_on_payment_success(
            &self,
            payment: &Payment,
        ) -> CustomResult<(), CollaboratorError> {
            self.record(CollaboratorCall::SubscriptionPaymentSuccess(
                payment.payment_id.clone(),
            ))
            .await
        }

        async fn update_status_on_payment_failure(
            &self,
            payment: &Payment,
        ) -> CustomResult<(), CollaboratorError> {
            self.record(CollaboratorCall::SubscriptionPaymentFailure(
                payment.payment_id.clone(),
            ))
            .await
        }

        async fn update_status_on_refund_success(
            &self,
            refund: &Refund,
        ) -> CustomResult<(), CollaboratorError> {
            self.record(CollaboratorCall::SubscriptionRefundSuccess(
                refund.refund_id.clone(),
            ))
            .await
        }

        async fn update_status_on_refund_failure(
            &self,
            refund: &Refund,
        ) -> CustomResult<(), CollaboratorError> {
            self.record(CollaboratorCall::SubscriptionRefundFailure(
                refund.refund_id.clone(),
            ))
            .await
        }
    }

    #[async_trait::async_trait]
    impl OptLog for RecordingCollaborators {
        async fn append_opt_log(&self, entry: OptLogEntry) -> CustomResult<(), CollaboratorError> {
            self.opt_logs.lock().await.push(entry);
            Ok(())
        }
    }
}
