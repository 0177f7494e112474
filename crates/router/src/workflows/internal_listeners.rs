//! In-process consumers of every emitted event, independent of merchant subscriptions.

use std::{fmt, sync::Arc};

use error_stack::ResultExt;
use router_env::{instrument, logger, tracing, Flow, Tag};
use scheduler::{
    errors::{CustomResult, ProcessTrackerError},
    QueueMessage, QueueWorkflow,
};

use crate::{
    consts,
    core::{
        errors::WebhooksFlowError,
        webhooks::{
            outgoing::publish,
            types::{InternalWebhookTask, OutgoingWebhookBody},
        },
    },
    db::webhook_message::WebhookMessageInterface,
    routes::AppState,
    types::storage::enums,
};

#[async_trait::async_trait]
pub trait InternalWebhookListener: Send + Sync {
    fn name(&self) -> &'static str;

    /// An error leaves the queue message uncommitted, so every listener sees it again.
    async fn on_event(
        &self,
        state: &AppState,
        body: &OutgoingWebhookBody,
    ) -> CustomResult<(), WebhooksFlowError>;
}

/// Listeners run by [`InternalWebhookWorkflow`], in registration order.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn InternalWebhookListener>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.listeners.iter().map(|listener| listener.name()))
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the listeners the service runs with.
    pub fn with_default_listeners() -> Self {
        Self::new().register(Arc::new(EventLogListener))
    }

    pub fn register(mut self, listener: Arc<dyn InternalWebhookListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.listeners.iter().map(|listener| listener.name()).collect()
    }

    async fn dispatch(
        &self,
        state: &AppState,
        body: &OutgoingWebhookBody,
    ) -> CustomResult<(), WebhooksFlowError> {
        for listener in &self.listeners {
            listener
                .on_event(state, body)
                .await
                .change_context(WebhooksFlowError::ListenerFailed {
                    listener: listener.name(),
                })?;
        }
        Ok(())
    }
}

/// Writes every event to the structured log.
#[derive(Debug, Clone, Copy)]
pub struct EventLogListener;

#[async_trait::async_trait]
impl InternalWebhookListener for EventLogListener {
    fn name(&self) -> &'static str {
        "event_log"
    }

    async fn on_event(
        &self,
        _state: &AppState,
        body: &OutgoingWebhookBody,
    ) -> CustomResult<(), WebhooksFlowError> {
        logger::info!(
            tag = ?Tag::Event,
            event = %body.event,
            event_id = %body.event_id,
            merchant_id = %body.merchant_id,
            sequence_key = ?body.sequence_key,
        );
        Ok(())
    }
}

pub struct InternalWebhookWorkflow;

enum DependencyState {
    Ready,
    /// Emitted but not acknowledged by the listeners yet
    Waiting,
    /// No message matches the dependency key
    Unknown,
}

async fn dependency_state(
    state: &AppState,
    body: &OutgoingWebhookBody,
) -> CustomResult<DependencyState, ProcessTrackerError> {
    let Some(reference) = body.dependency_key.as_deref().filter(|key| !key.is_empty()) else {
        return Ok(DependencyState::Ready);
    };
    match state
        .store
        .find_webhook_message_by_event_reference(&body.merchant_id, reference)
        .await
    {
        Ok(message) if message.status == enums::WebhookMessageStatus::Archived => {
            Ok(DependencyState::Ready)
        }
        Ok(_) => Ok(DependencyState::Waiting),
        Err(error) if error.current_context().is_db_not_found() => Ok(DependencyState::Unknown),
        Err(error) => Err(error.change_context(ProcessTrackerError::EStorageError)),
    }
}

/// Put the task back on its lane, to be looked at again after the dependency delay.
async fn defer(
    state: &AppState,
    message: &QueueMessage,
    task: &InternalWebhookTask,
) -> CustomResult<(), ProcessTrackerError> {
    publish(
        state.queue.as_ref(),
        consts::INTERNAL_WEBHOOK_TOPIC,
        &message.tag,
        task,
        state.conf.webhook_delivery.producer.dependency_retry_delay_ms,
        message.sequence_key.clone(),
    )
    .await
    .change_context(ProcessTrackerError::RepublishFailed)
    .map(|_| ())
}

/// Move the message to `status`, tolerating a row that was removed meanwhile.
async fn settle_message(
    state: &AppState,
    message_id: &str,
    status: enums::WebhookMessageStatus,
) -> CustomResult<(), ProcessTrackerError> {
    match state
        .store
        .update_webhook_message_status(message_id, status)
        .await
    {
        Ok(_) => Ok(()),
        Err(error) if error.current_context().is_db_not_found() => {
            logger::warn!(%message_id, "webhook message row is gone");
            Ok(())
        }
        Err(error) => Err(error.change_context(ProcessTrackerError::EStorageError)),
    }
}

#[async_trait::async_trait]
impl QueueWorkflow<AppState> for InternalWebhookWorkflow {
    fn topic(&self) -> &str {
        consts::INTERNAL_WEBHOOK_TOPIC
    }

    #[instrument(skip_all, fields(flow = ?Flow::InternalWebhookDispatch, queue_message_id = %message.id))]
    async fn execute_workflow<'a>(
        &'a self,
        state: &'a AppState,
        message: &'a QueueMessage,
    ) -> CustomResult<(), ProcessTrackerError> {
        let task: InternalWebhookTask = match serde_json::from_str(&message.body) {
            Ok(task) => task,
            Err(error) => {
                logger::error!(%error, "dropping malformed internal webhook task");
                return Ok(());
            }
        };

        match dependency_state(state, &task.body).await? {
            DependencyState::Ready => {}
            // A dependency that exists is waited for as long as it takes.
            DependencyState::Waiting => {
                defer(state, message, &task).await?;
                logger::info!(
                    message_id = %task.message_id,
                    dependency_key = ?task.body.dependency_key,
                    "dependency not acknowledged yet, message deferred"
                );
                return Ok(());
            }
            DependencyState::Unknown if task.deferrals < consts::MAX_UNKNOWN_DEPENDENCY_DEFERRALS => {
                let deferred = InternalWebhookTask {
                    deferrals: task.deferrals + 1,
                    ..task
                };
                defer(state, message, &deferred).await?;
                logger::info!(
                    message_id = %deferred.message_id,
                    dependency_key = ?deferred.body.dependency_key,
                    deferrals = deferred.deferrals,
                    "dependency not emitted yet, message deferred"
                );
                return Ok(());
            }
            DependencyState::Unknown => {
                settle_message(state, &task.message_id, enums::WebhookMessageStatus::Dead).await?;
                logger::error!(
                    message_id = %task.message_id,
                    dependency_key = ?task.body.dependency_key,
                    "dependency was never emitted, message dead-lettered"
                );
                return Ok(());
            }
        }

        state
            .listeners
            .dispatch(state, &task.body)
            .await
            .change_context(ProcessTrackerError::FlowExecutionError {
                flow: "internal_listeners",
            })
            .attach_printable_lazy(|| format!("message_id = {}", task.message_id))?;

        settle_message(state, &task.message_id, enums::WebhookMessageStatus::Archived).await
    }
}
