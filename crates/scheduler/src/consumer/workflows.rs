use async_trait::async_trait;
use router_env::logger;

use crate::{
    db::queue::QueueMessage,
    errors::{CustomResult, ProcessTrackerError},
};

#[async_trait]
pub trait QueueWorkflow<T>: Send + Sync {
    /// Topic this workflow consumes.
    fn topic(&self) -> &str;

    // The core execution of the workflow. `Ok` commits the message.
    async fn execute_workflow<'a>(
        &'a self,
        state: &'a T,
        message: &'a QueueMessage,
    ) -> CustomResult<(), ProcessTrackerError>;

    // Callback after an error from `execute_workflow`. The message is left uncommitted and is
    // redelivered once its visibility timeout elapses.
    async fn error_handler<'a>(
        &'a self,
        _state: &'a T,
        message: &'a QueueMessage,
        error: error_stack::Report<ProcessTrackerError>,
    ) {
        logger::error!(
            message_id = %message.id,
            topic = %message.topic,
            delivery_count = message.delivery_count,
            ?error,
            "Failed while executing workflow"
        );
    }
}
