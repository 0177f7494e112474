use common_utils::{
    consts::X_SIGNATURE,
    request::{Method, RequestBuilder, RequestContent},
};
use error_stack::ResultExt;
use router_env::{instrument, logger, tracing, Flow, Tag};
use scheduler::{
    errors::{CustomResult, ProcessTrackerError},
    QueueMessage, QueueWorkflow,
};

use crate::{
    consts,
    core::webhooks::{outgoing::publish, types::DeliveryTask},
    db::webhook_delivery::WebhookDeliveryInterface,
    routes::AppState,
    types::storage::{self, enums},
};

/// Longest part of a merchant response body kept on the delivery row
const MAX_RECORDED_RESPONSE_LEN: usize = 256;

pub struct OutgoingWebhookDeliveryWorkflow;

/// Result of one POST to a merchant endpoint.
#[derive(Debug)]
struct AttemptResult {
    response_code: Option<u16>,
    error: Option<String>,
}

impl AttemptResult {
    fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[async_trait::async_trait]
impl QueueWorkflow<AppState> for OutgoingWebhookDeliveryWorkflow {
    fn topic(&self) -> &str {
        consts::MERCHANT_WEBHOOK_TOPIC
    }

    #[instrument(skip_all, fields(flow = ?Flow::OutgoingWebhookDelivery, queue_message_id = %message.id))]
    async fn execute_workflow<'a>(
        &'a self,
        state: &'a AppState,
        message: &'a QueueMessage,
    ) -> CustomResult<(), ProcessTrackerError> {
        let task: DeliveryTask = match serde_json::from_str(&message.body) {
            Ok(task) => task,
            Err(error) => {
                // Redelivering an unreadable body can not succeed.
                logger::error!(%error, "dropping malformed delivery task");
                return Ok(());
            }
        };

        let delivery = match state.store.find_webhook_delivery_by_id(&task.delivery_id).await {
            Ok(delivery) => delivery,
            Err(error) if error.current_context().is_db_not_found() => {
                logger::warn!(delivery_id = %task.delivery_id, "delivery row is gone, dropping task");
                return Ok(());
            }
            Err(error) => return Err(error.change_context(ProcessTrackerError::EStorageError)),
        };
        if delivery.status != enums::DeliveryStatus::Pending {
            logger::info!(
                delivery_id = %delivery.id,
                status = %delivery.status,
                "delivery already settled"
            );
            return Ok(());
        }

        let attempt = send_to_endpoint(state, &task).await;
        let attempts = delivery.attempts.saturating_add(1);

        if attempt.is_success() {
            state
                .store
                .update_webhook_delivery(
                    &delivery.id,
                    storage::WebhookDeliveryUpdate::Delivered {
                        attempts,
                        response_code: attempt.response_code.unwrap_or_default(),
                    },
                )
                .await
                .change_context(ProcessTrackerError::EStorageError)?;
            logger::info!(tag = ?Tag::Event, delivery_id = %delivery.id, attempts, "webhook delivered");
            return Ok(());
        }

        let error = attempt.error.unwrap_or_default();
        let retry_count = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        match state
            .conf
            .webhook_delivery
            .retry
            .get_schedule_time(retry_count)
        {
            Some(delay_secs) => {
                state
                    .store
                    .update_webhook_delivery(
                        &delivery.id,
                        storage::WebhookDeliveryUpdate::AttemptFailed {
                            attempts,
                            response_code: attempt.response_code,
                            error: error.clone(),
                        },
                    )
                    .await
                    .change_context(ProcessTrackerError::EStorageError)?;
                let delay_ms = u64::try_from(delay_secs).unwrap_or_default().saturating_mul(1000);
                publish(
                    state.queue.as_ref(),
                    consts::MERCHANT_WEBHOOK_TOPIC,
                    &message.tag,
                    &task,
                    delay_ms,
                    message.sequence_key.clone(),
                )
                .await
                .change_context(ProcessTrackerError::RepublishFailed)?;
                logger::warn!(
                    delivery_id = %delivery.id,
                    attempts,
                    delay_secs,
                    %error,
                    "webhook delivery failed, retry scheduled"
                );
            }
            None => {
                state
                    .store
                    .update_webhook_delivery(
                        &delivery.id,
                        storage::WebhookDeliveryUpdate::Dead {
                            attempts,
                            response_code: attempt.response_code,
                            error: error.clone(),
                        },
                    )
                    .await
                    .change_context(ProcessTrackerError::EStorageError)?;
                logger::error!(
                    delivery_id = %delivery.id,
                    attempts,
                    %error,
                    "webhook delivery dead-lettered"
                );
            }
        }
        Ok(())
    }
}

async fn send_to_endpoint(state: &AppState, task: &DeliveryTask) -> AttemptResult {
    let request = RequestBuilder::new()
        .method(Method::Post)
        .url(&task.url)
        .attach_default_headers()
        .header(http::header::CONTENT_TYPE.as_str(), mime::APPLICATION_JSON.as_ref())
        .header(X_SIGNATURE, &task.signature)
        .set_body(RequestContent::RawBytes(task.body.clone().into_bytes()))
        .build();

    logger::debug!(tag = ?Tag::ApiOutgoingRequest, url = %task.url, delivery_id = %task.delivery_id);
    let response = state
        .api_client
        .send_request(request, state.conf.webhook_delivery.request_timeout())
        .await;

    match response {
        Ok(response) if (200..300).contains(&response.status_code) => AttemptResult {
            response_code: Some(response.status_code),
            error: None,
        },
        Ok(response) => {
            let body = String::from_utf8_lossy(&response.response);
            AttemptResult {
                response_code: Some(response.status_code),
                error: Some(format!(
                    "endpoint responded with {}: {}",
                    response.status_code,
                    body.chars().take(MAX_RECORDED_RESPONSE_LEN).collect::<String>()
                )),
            }
        }
        Err(error) => AttemptResult {
            response_code: None,
            error: Some(error.current_context().to_string()),
        },
    }
}
