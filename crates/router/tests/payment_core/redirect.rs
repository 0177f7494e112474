use actix_web::{http::StatusCode, test};
use common_enums::PaymentStatus;
use router::{
    core::reconciliation::{self, PaymentTransition, TransitionSource},
    db::payment::PaymentInterface,
    types::api::{GatewayRedirectResponse, RedirectStatus},
};
use wiremock::{
    matchers::{any, method, path},
    Mock, ResponseTemplate,
};

use crate::utils;

fn redirect_request(gateway_id: i64, query: &str) -> actix_http::Request {
    test::TestRequest::get()
        .uri(&format!("/gateway/{gateway_id}/redirect?{query}"))
        .to_request()
}

fn location<B>(response: &actix_web::dev::ServiceResponse<B>) -> String {
    response
        .headers()
        .get("location")
        .expect("location header")
        .to_str()
        .unwrap()
        .to_string()
}

#[actix_web::test]
async fn settled_payment_redirects_without_polling() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let payment = ctx.open_payment(&gateway, "pay_1", "mp_1").await;
    reconciliation::reconcile_payment(
        &ctx.state,
        payment,
        PaymentTransition {
            status: PaymentStatus::Success,
            gateway_payment_id: None,
            paid_time: None,
            reason: None,
            source: TransitionSource::Webhook { event_name: None },
        },
    )
    .await
    .unwrap();
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&ctx.provider)
        .await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let response = test::call_service(
        &app,
        redirect_request(gateway.id, "paymentId=pay_1&success=false"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "https://shop.example.com/done?paymentId=pay_1&subId=sub_1&invoiceId=inv_1&success=true"
    );
}

#[actix_web::test]
async fn provider_outage_keeps_the_user_waiting() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    ctx.open_payment(&gateway, "pay_1", "mp_1").await;
    Mock::given(method("GET"))
        .and(path("/api/v2/payments/mp_1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.provider)
        .await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let response = test::call_service(
        &app,
        redirect_request(gateway.id, "paymentId=pay_1&success=true"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let page: GatewayRedirectResponse = test::read_body_json(response).await;
    assert_eq!(page.status, RedirectStatus::Pending);
    assert_eq!(page.payment_id.as_deref(), Some("pay_1"));
    let payment = ctx.db.find_payment_by_payment_id("pay_1").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Created);
    assert!(ctx.collaborators.calls().await.is_empty());
}

#[actix_web::test]
async fn polled_success_settles_and_redirects() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    ctx.open_payment(&gateway, "pay_1", "mp_1").await;
    Mock::given(method("GET"))
        .and(path("/api/v2/payments/mp_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "payment_id": "mp_1",
                "status": "completed",
                "amount": 1000,
                "currency": "USD",
                "updated_at": "2026-01-05T10:00:00Z"
            }
        })))
        .expect(1)
        .mount(&ctx.provider)
        .await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let response = test::call_service(
        &app,
        redirect_request(gateway.id, "paymentId=pay_1&success=true"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(location(&response)
        .ends_with("paymentId=pay_1&subId=sub_1&invoiceId=inv_1&success=true"));
    let payment = ctx.db.find_payment_by_payment_id("pay_1").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
    assert!(payment.paid_time.is_some());
    assert_eq!(ctx.collaborators.calls().await.len(), 2);

    let http_logs = ctx.db.gateway_http_logs.lock().await.clone();
    assert_eq!(http_logs.len(), 1);
    assert_eq!(http_logs[0].operation, "PaymentDetail");
    assert_eq!(http_logs[0].status_code, Some(200));
}

#[actix_web::test]
async fn unknown_or_missing_payment_is_invalid() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let response = test::call_service(&app, redirect_request(gateway.id, "success=true")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: GatewayRedirectResponse = test::read_body_json(response).await;
    assert_eq!(page.status, RedirectStatus::Invalid);
    assert_eq!(page.payment_id, None);

    let response =
        test::call_service(&app, redirect_request(gateway.id, "paymentId=pay_missing")).await;
    let page: GatewayRedirectResponse = test::read_body_json(response).await;
    assert_eq!(page.status, RedirectStatus::Invalid);
    assert_eq!(page.payment_id.as_deref(), Some("pay_missing"));
}
