use actix_web::{web, HttpRequest, Responder};
use router_env::{instrument, tracing, Flow};

use super::app::AppState;
use crate::{core::redirect, services::api, types::api::GatewayRedirectQuery};

/// Landing page of the user coming back from the provider checkout.
#[instrument(skip_all, fields(flow = ?Flow::GatewayRedirect))]
pub async fn gateway_redirect(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<GatewayRedirectQuery>,
) -> impl Responder {
    let gateway_id = path.into_inner();

    api::server_wrap(
        Flow::GatewayRedirect,
        state.get_ref(),
        &req,
        query.into_inner(),
        |state, query| redirect::handle_gateway_redirect(state, gateway_id, query),
    )
    .await
}
