pub mod workflows;

use std::{sync::Arc, time::Duration};

use error_stack::ResultExt;
use router_env::{instrument, logger, tracing, Tag};
use tokio::sync::{mpsc, Semaphore};

use self::workflows::QueueWorkflow;
use crate::{
    db::queue::{MessageQueue, QueueMessage},
    errors::{CustomResult, ProcessTrackerError},
    settings::ConsumerSettings,
};

pub trait SchedulerAppState: Clone + Send + Sync + 'static {
    fn get_queue(&self) -> Box<dyn MessageQueue>;
}

/// Poll `workflow.topic()` until a shutdown signal is received, running at most
/// `max_concurrency` messages at a time.
#[instrument(skip_all, fields(consumer_group = %settings.consumer_group))]
pub async fn start_consumer<T: SchedulerAppState>(
    state: T,
    settings: Arc<ConsumerSettings>,
    workflow: Arc<dyn QueueWorkflow<T>>,
    mut shutdown: mpsc::Receiver<()>,
) -> CustomResult<(), ProcessTrackerError> {
    if settings.disabled {
        logger::info!(topic = workflow.topic(), "consumer is disabled");
        return Ok(());
    }

    let permits = Arc::new(Semaphore::new(settings.max_concurrency));
    let mut interval = tokio::time::interval(Duration::from_millis(settings.loop_interval));
    logger::info!(topic = workflow.topic(), "starting consumer");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                logger::info!(topic = workflow.topic(), "shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                if let Err(error) =
                    consumer_operations(&state, &settings, &workflow, &permits).await
                {
                    // Errors stop at this level so that the loop keeps polling.
                    logger::error!(?error, "consumer iteration failed");
                }
            }
        }
    }

    let grace = Duration::from_millis(settings.graceful_shutdown_interval);
    let max_permits = u32::try_from(settings.max_concurrency).unwrap_or(u32::MAX);
    match tokio::time::timeout(grace, permits.acquire_many(max_permits)).await {
        Ok(_) => logger::info!("all in-flight messages finished"),
        Err(_) => logger::warn!("graceful shutdown interval elapsed with messages in flight"),
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn consumer_operations<T: SchedulerAppState>(
    state: &T,
    settings: &ConsumerSettings,
    workflow: &Arc<dyn QueueWorkflow<T>>,
    permits: &Arc<Semaphore>,
) -> CustomResult<(), ProcessTrackerError> {
    let capacity = settings.batch_size.min(permits.available_permits());
    if capacity == 0 {
        return Ok(());
    }

    let messages = state
        .get_queue()
        .consume(workflow.topic(), capacity)
        .await
        .change_context(ProcessTrackerError::QueueFetchFailed)?;

    for message in messages {
        let permit = Arc::clone(permits)
            .acquire_owned()
            .await
            .change_context(ProcessTrackerError::QueueFetchFailed)
            .attach_printable("consumer semaphore closed")?;
        let state = state.clone();
        let workflow = Arc::clone(workflow);
        tokio::spawn(async move {
            run_executor(&state, workflow.as_ref(), message).await;
            drop(permit);
        });
    }
    Ok(())
}

pub async fn run_executor<T: SchedulerAppState>(
    state: &T,
    workflow: &dyn QueueWorkflow<T>,
    message: QueueMessage,
) {
    logger::info!(
        tag = ?Tag::QueueConsume,
        message_id = %message.id,
        topic = %message.topic,
        delivery_count = message.delivery_count
    );
    match workflow.execute_workflow(state, &message).await {
        Ok(()) => {
            if let Err(error) = state
                .get_queue()
                .commit(&message.topic, &message.id)
                .await
                .change_context(ProcessTrackerError::CommitFailed)
            {
                logger::error!(?error, message_id = %message.id);
            }
        }
        Err(error) => workflow.error_handler(state, &message, error).await,
    }
}
