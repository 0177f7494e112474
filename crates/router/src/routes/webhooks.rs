use actix_web::{web, HttpRequest, Responder};
use router_env::{instrument, tracing, Flow};

use super::app::AppState;
use crate::{core::webhooks, services::api};

#[instrument(skip_all, fields(flow = ?Flow::IncomingWebhookReceive))]
pub async fn receive_incoming_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
    path: web::Path<i64>,
) -> impl Responder {
    let gateway_id = path.into_inner();

    api::server_wrap(
        Flow::IncomingWebhookReceive,
        state.get_ref(),
        &req,
        body,
        |state, body| webhooks::receive_incoming_webhook(state, &req, body, gateway_id),
    )
    .await
}
