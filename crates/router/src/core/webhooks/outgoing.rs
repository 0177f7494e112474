use common_utils::{ext_traits::Encode, generate_id_with_default_len};
use error_stack::{report, ResultExt};
use router_env::{instrument, logger, tracing, Flow, Tag};
use scheduler::{MessageQueue, QueueMessageNew};
use serde::Serialize;

use super::{
    types::{DeliveryTask, EmitOutcome, InternalWebhookTask, OutgoingEvent, OutgoingWebhookBody},
    utils,
};
use crate::{
    consts,
    core::errors::{CustomResult, WebhooksFlowError},
    db::{
        webhook_delivery::WebhookDeliveryInterface, webhook_endpoint::WebhookEndpointInterface,
        webhook_message::WebhookMessageInterface,
    },
    routes::AppState,
    types::storage::{self, enums},
};

/// Persist an event and queue it for the internal listeners and every subscribed endpoint.
///
/// Emitting the same event for the same object twice queues nothing the second time, unless the
/// first call stored the message but failed to queue it. Such a message is published again.
#[instrument(skip_all, fields(flow = ?Flow::OutgoingWebhookEmit, event = %event.event, merchant_id = %event.merchant_id))]
pub async fn emit(
    state: &AppState,
    event: OutgoingEvent,
) -> CustomResult<EmitOutcome, WebhooksFlowError> {
    let idempotent_event_id =
        utils::get_idempotent_event_id(&event.primary_object_id, event.event);
    let merchant_id = event.merchant_id.clone();
    let message_new = storage::WebhookMessageNew {
        id: generate_id_with_default_len(consts::WEBHOOK_MESSAGE_ID_PREFIX),
        event_id: generate_id_with_default_len(consts::EVENT_ID_PREFIX),
        idempotent_event_id: idempotent_event_id.clone(),
        event: event.event,
        merchant_id: event.merchant_id,
        data: event.data,
        sequence_key: event.sequence_key,
        dependency_key: event.dependency_key,
        metadata: event.metadata,
        status: enums::WebhookMessageStatus::Pending,
    };

    let message = match state.store.insert_webhook_message(message_new.clone()).await {
        Ok(message) => {
            if utils::requires_persisted_copy(message.metadata.as_ref()) {
                let copy = storage::WebhookMessageNew {
                    id: generate_id_with_default_len(consts::WEBHOOK_MESSAGE_ID_PREFIX),
                    status: enums::WebhookMessageStatus::Persisted,
                    ..message_new
                };
                if let Err(error) = state.store.insert_webhook_message(copy).await {
                    logger::warn!(message_id = %message.id, ?error, "failed to store persisted copy");
                }
            }
            message
        }
        Err(error) if error.current_context().is_db_unique_violation() => {
            let existing = state
                .store
                .find_webhook_message_by_event_reference(&merchant_id, &idempotent_event_id)
                .await
                .change_context(WebhooksFlowError::MessageNotFound)?;
            if !is_stale_unpublished(state, &existing) {
                logger::info!(%idempotent_event_id, "event already emitted, skipping");
                return Ok(EmitOutcome::Duplicate {
                    idempotent_event_id,
                });
            }
            logger::warn!(message_id = %existing.id, "event stored but never queued, publishing again");
            existing
        }
        Err(error) => return Err(error.change_context(WebhooksFlowError::MessageInsertFailed)),
    };

    let (message, deliveries) = publish_message(state, message).await?;
    Ok(EmitOutcome::Enqueued {
        message,
        deliveries,
    })
}

/// A message another emitter may still be publishing is left alone for a grace period.
fn is_stale_unpublished(state: &AppState, message: &storage::WebhookMessage) -> bool {
    !message.published && message.created_at <= republish_cutoff(state)
}

fn republish_cutoff(state: &AppState) -> time::PrimitiveDateTime {
    let grace = state.conf.webhook_delivery.producer.republish_after_ms;
    common_utils::date_time::now()
        - time::Duration::milliseconds(i64::try_from(grace).unwrap_or(i64::MAX))
}

/// Queue the internal task and one delivery per subscribed endpoint, then mark the message
/// published. Delivery rows left by an earlier attempt are reused.
async fn publish_message(
    state: &AppState,
    message: storage::WebhookMessage,
) -> CustomResult<(storage::WebhookMessage, Vec<storage::WebhookDelivery>), WebhooksFlowError> {
    let body = OutgoingWebhookBody::from(&message);
    publish(
        state.queue.as_ref(),
        consts::INTERNAL_WEBHOOK_TOPIC,
        &message.event.to_string(),
        &InternalWebhookTask {
            message_id: message.id.clone(),
            body: body.clone(),
            deferrals: 0,
        },
        0,
        message.sequence_key.clone(),
    )
    .await?;

    let serialized_body = body
        .encode_to_string_of_json()
        .change_context(WebhooksFlowError::OutgoingWebhookEncodingFailed)?;
    let endpoints = state
        .store
        .list_webhook_endpoints_by_merchant_id(&message.merchant_id)
        .await
        .change_context(WebhooksFlowError::EndpointLookupFailed)?;
    let existing = state
        .store
        .list_webhook_deliveries_by_message_id(&message.id)
        .await
        .change_context(WebhooksFlowError::DeliveryInsertFailed)?;

    let mut deliveries = Vec::new();
    for endpoint in endpoints
        .iter()
        .filter(|endpoint| endpoint.is_subscribed_to(message.event))
    {
        let delivery = match existing
            .iter()
            .find(|delivery| delivery.endpoint_id == endpoint.id)
        {
            Some(delivery) => delivery.clone(),
            None => state
                .store
                .insert_webhook_delivery(storage::WebhookDeliveryNew {
                    id: generate_id_with_default_len(consts::WEBHOOK_DELIVERY_ID_PREFIX),
                    message_id: message.id.clone(),
                    event_id: message.event_id.clone(),
                    merchant_id: message.merchant_id.clone(),
                    endpoint_id: endpoint.id,
                    url: endpoint.url.clone(),
                })
                .await
                .change_context(WebhooksFlowError::DeliveryInsertFailed)?,
        };

        if delivery.status == enums::DeliveryStatus::Pending {
            enqueue_delivery(
                state,
                &message,
                &delivery,
                endpoint,
                serialized_body.clone(),
                state.conf.webhook_delivery.producer.initial_delay_ms,
            )
            .await?;
        }
        deliveries.push(delivery);
    }

    let message = state
        .store
        .mark_webhook_message_published(&message.id)
        .await
        .change_context(WebhooksFlowError::MessageUpdateFailed)?;
    logger::info!(
        tag = ?Tag::Event,
        message_id = %message.id,
        event_id = %message.event_id,
        deliveries = deliveries.len(),
        "event emitted"
    );
    Ok((message, deliveries))
}

/// Publish messages whose first publishing attempt failed part way. Returns how many were
/// published.
#[instrument(skip_all, fields(flow = ?Flow::OutgoingWebhookRepublish))]
pub async fn republish_stale_messages(state: &AppState) -> CustomResult<usize, WebhooksFlowError> {
    let messages = state
        .store
        .list_unpublished_webhook_messages(republish_cutoff(state))
        .await
        .change_context(WebhooksFlowError::MessageNotFound)?;

    let mut published = 0;
    for message in messages {
        let message_id = message.id.clone();
        match publish_message(state, message).await {
            Ok(_) => published += 1,
            Err(error) => logger::error!(?error, %message_id, "republishing webhook message failed"),
        }
    }
    Ok(published)
}

/// Lane of one endpoint's deliveries for a sequence key. A failing endpoint holds back only its
/// own later deliveries.
fn delivery_lane(sequence_key: Option<&str>, endpoint_id: i64) -> Option<String> {
    sequence_key
        .filter(|key| !key.is_empty())
        .map(|key| format!("{key}:{endpoint_id}"))
}

async fn enqueue_delivery(
    state: &AppState,
    message: &storage::WebhookMessage,
    delivery: &storage::WebhookDelivery,
    endpoint: &storage::MerchantWebhookEndpoint,
    body: String,
    delay_ms: u64,
) -> CustomResult<(), WebhooksFlowError> {
    let signature = utils::sign_outgoing_body(endpoint, &body)?;
    let task = DeliveryTask {
        delivery_id: delivery.id.clone(),
        message_id: message.id.clone(),
        endpoint_id: endpoint.id,
        url: endpoint.url.clone(),
        body,
        signature,
    };
    publish(
        state.queue.as_ref(),
        consts::MERCHANT_WEBHOOK_TOPIC,
        &message.event.to_string(),
        &task,
        delay_ms,
        delivery_lane(message.sequence_key.as_deref(), endpoint.id),
    )
    .await
    .map(|_| ())
}

/// Serialize `payload` and send it to `topic`.
pub(crate) async fn publish<T: Serialize>(
    queue: &dyn MessageQueue,
    topic: &str,
    tag: &str,
    payload: &T,
    delay_ms: u64,
    sequence_key: Option<String>,
) -> CustomResult<String, WebhooksFlowError> {
    let body = serde_json::to_string(payload)
        .change_context(WebhooksFlowError::OutgoingWebhookEncodingFailed)?;
    let message_id = queue
        .send(
            QueueMessageNew::new(topic, tag, body)
                .with_delay_ms(delay_ms)
                .with_sequence_key(sequence_key),
        )
        .await
        .change_context(WebhooksFlowError::QueuePublishFailed)
        .attach_printable_lazy(|| format!("topic = {topic}"))?;
    logger::debug!(tag = ?Tag::QueuePublish, topic, %message_id, delay_ms);
    Ok(message_id)
}

/// Deliveries of `merchant_id` that ran out of retries.
pub async fn list_dead_deliveries(
    state: &AppState,
    merchant_id: &str,
) -> CustomResult<Vec<storage::WebhookDelivery>, WebhooksFlowError> {
    state
        .store
        .list_webhook_deliveries_by_merchant_id_status(merchant_id, enums::DeliveryStatus::Dead)
        .await
        .change_context(WebhooksFlowError::DeliveryNotFound)
}

/// Put a dead delivery back on the queue with a fresh retry budget.
#[instrument(skip(state), fields(flow = ?Flow::OutgoingWebhookRetryDead))]
pub async fn retry_dead_delivery(
    state: &AppState,
    merchant_id: &str,
    delivery_id: &str,
) -> CustomResult<storage::WebhookDelivery, WebhooksFlowError> {
    let delivery = state
        .store
        .find_webhook_delivery_by_id(delivery_id)
        .await
        .change_context(WebhooksFlowError::DeliveryNotFound)?;
    if delivery.merchant_id != merchant_id {
        return Err(report!(WebhooksFlowError::DeliveryNotFound))
            .attach_printable("delivery belongs to another merchant");
    }
    if delivery.status != enums::DeliveryStatus::Dead {
        return Err(report!(WebhooksFlowError::DeliveryNotDead))
            .attach_printable_lazy(|| format!("delivery status is {}", delivery.status));
    }

    let message = state
        .store
        .find_webhook_message_by_id(&delivery.message_id)
        .await
        .change_context(WebhooksFlowError::MessageNotFound)?;
    let endpoint = state
        .store
        .find_webhook_endpoint_by_id(delivery.endpoint_id)
        .await
        .change_context(WebhooksFlowError::EndpointNotFound)?;
    let body = OutgoingWebhookBody::from(&message)
        .encode_to_string_of_json()
        .change_context(WebhooksFlowError::OutgoingWebhookEncodingFailed)?;

    let delivery = state
        .store
        .update_webhook_delivery(&delivery.id, storage::WebhookDeliveryUpdate::Requeued)
        .await
        .change_context(WebhooksFlowError::DeliveryUpdateFailed)?;
    enqueue_delivery(state, &message, &delivery, &endpoint, body, 0).await?;

    logger::info!(delivery_id = %delivery.id, "dead delivery requeued");
    Ok(delivery)
}

/// Messages of `merchant_id` dead-lettered because their dependency was never emitted.
pub async fn list_dead_messages(
    state: &AppState,
    merchant_id: &str,
) -> CustomResult<Vec<storage::WebhookMessage>, WebhooksFlowError> {
    state
        .store
        .list_webhook_messages_by_merchant_id_status(merchant_id, enums::WebhookMessageStatus::Dead)
        .await
        .change_context(WebhooksFlowError::MessageNotFound)
}

/// Hand a dead-lettered message back to the internal listeners, waiting on its dependency again.
#[instrument(skip(state), fields(flow = ?Flow::OutgoingWebhookRetryDead))]
pub async fn retry_dead_message(
    state: &AppState,
    merchant_id: &str,
    message_id: &str,
) -> CustomResult<storage::WebhookMessage, WebhooksFlowError> {
    let message = state
        .store
        .find_webhook_message_by_id(message_id)
        .await
        .change_context(WebhooksFlowError::MessageNotFound)?;
    if message.merchant_id != merchant_id {
        return Err(report!(WebhooksFlowError::MessageNotFound))
            .attach_printable("message belongs to another merchant");
    }
    if message.status != enums::WebhookMessageStatus::Dead {
        return Err(report!(WebhooksFlowError::MessageNotDead))
            .attach_printable_lazy(|| format!("message status is {}", message.status));
    }

    let message = state
        .store
        .update_webhook_message_status(&message.id, enums::WebhookMessageStatus::Pending)
        .await
        .change_context(WebhooksFlowError::MessageUpdateFailed)?;
    publish(
        state.queue.as_ref(),
        consts::INTERNAL_WEBHOOK_TOPIC,
        &message.event.to_string(),
        &InternalWebhookTask {
            message_id: message.id.clone(),
            body: OutgoingWebhookBody::from(&message),
            deferrals: 0,
        },
        0,
        message.sequence_key.clone(),
    )
    .await?;

    logger::info!(message_id = %message.id, "dead message requeued");
    Ok(message)
}
