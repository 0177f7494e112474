use actix_web::{http::StatusCode, test};
use common_enums::{GatewayName, PaymentStatus, RefundStatus, WebhookMessageStatus};
use router::{
    db::{
        merchant_gateway::MerchantGatewayInterface, payment::PaymentInterface,
        refund::RefundInterface,
    },
    services::collaborators::mock::CollaboratorCall,
};

use crate::utils::{self, mulenpay_event, mulenpay_signature};

fn webhook_request(gateway_id: i64, body: String, signature: &str) -> actix_http::Request {
    test::TestRequest::post()
        .uri(&format!("/gateway/{gateway_id}/webhook"))
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-mulenpay-signature", signature))
        .set_payload(body)
        .to_request()
}

#[actix_web::test]
async fn signed_webhook_settles_the_payment() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    ctx.open_payment(&gateway, "pay_1", "mp_1").await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let body = mulenpay_event("payment.finished", "payment", "mp_1", "completed");
    let signature = mulenpay_signature(&body);
    let response = test::call_service(&app, webhook_request(gateway.id, body, &signature)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let ack: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(ack, serde_json::json!({ "status": "ok" }));

    let payment = ctx.db.find_payment_by_payment_id("pay_1").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
    assert!(payment.paid_time.is_some());
    assert_eq!(
        ctx.collaborators.calls().await,
        vec![
            CollaboratorCall::InvoicePaymentSuccess("pay_1".into()),
            CollaboratorCall::SubscriptionPaymentSuccess("pay_1".into()),
        ]
    );
    let opt_logs = ctx.collaborators.opt_logs().await;
    assert_eq!(opt_logs.len(), 1);
    assert_eq!(opt_logs[0].source, "webhook:payment.finished");

    // One queued message plus the portal copy, since the payment belongs to a subscription.
    let messages = ctx.db.webhook_messages.lock().await.clone();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].status, WebhookMessageStatus::Pending);
    assert_eq!(messages[1].status, WebhookMessageStatus::Persisted);
    assert_eq!(messages[0].event_id, messages[1].event_id);
}

#[actix_web::test]
async fn tampered_body_is_rejected() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    ctx.open_payment(&gateway, "pay_1", "mp_1").await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let signed = mulenpay_event("payment.finished", "payment", "mp_1", "failed");
    let signature = mulenpay_signature(&signed);
    let tampered = mulenpay_event("payment.finished", "payment", "mp_1", "completed");
    let response =
        test::call_service(&app, webhook_request(gateway.id, tampered, &signature)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payment = ctx.db.find_payment_by_payment_id("pay_1").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Created);
    assert!(ctx.collaborators.calls().await.is_empty());
    assert!(ctx.db.webhook_messages.lock().await.is_empty());
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let request = test::TestRequest::post()
        .uri(&format!("/gateway/{}/webhook", gateway.id))
        .set_payload(mulenpay_event("payment.finished", "payment", "mp_1", "completed"))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn webhook_for_an_unknown_payment_is_acknowledged_and_dropped() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let body = mulenpay_event("payment.finished", "payment", "mp_unknown", "completed");
    let signature = mulenpay_signature(&body);
    let response = test::call_service(&app, webhook_request(gateway.id, body, &signature)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(ctx.db.webhook_messages.lock().await.is_empty());
    assert!(ctx.collaborators.calls().await.is_empty());
}

#[actix_web::test]
async fn redelivered_webhook_applies_side_effects_once() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    ctx.open_payment(&gateway, "pay_1", "mp_1").await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let body = mulenpay_event("payment.finished", "payment", "mp_1", "completed");
    let signature = mulenpay_signature(&body);
    for _ in 0..2 {
        let response =
            test::call_service(&app, webhook_request(gateway.id, body.clone(), &signature)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(ctx.collaborators.calls().await.len(), 2);
    assert_eq!(ctx.collaborators.opt_logs().await.len(), 1);
    let queued = ctx
        .db
        .webhook_messages
        .lock()
        .await
        .iter()
        .filter(|message| message.status == WebhookMessageStatus::Pending)
        .count();
    assert_eq!(queued, 1);
}

#[actix_web::test]
async fn late_failure_does_not_undo_a_success() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    ctx.open_payment(&gateway, "pay_1", "mp_1").await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    for status in ["completed", "failed"] {
        let body = mulenpay_event("payment.finished", "payment", "mp_1", status);
        let signature = mulenpay_signature(&body);
        let response =
            test::call_service(&app, webhook_request(gateway.id, body, &signature)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let payment = ctx.db.find_payment_by_payment_id("pay_1").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
    assert!(payment.last_error.is_none());
}

#[actix_web::test]
async fn refund_webhook_settles_the_refund() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let payment = ctx.open_payment(&gateway, "pay_1", "mp_1").await;
    ctx.open_refund(&payment, "ref_1", "mr_1").await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let body = mulenpay_event("refund.finished", "refund", "mr_1", "declined");
    let signature = mulenpay_signature(&body);
    let response = test::call_service(&app, webhook_request(gateway.id, body, &signature)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let refund = ctx.db.find_refund_by_refund_id("ref_1").await.unwrap();
    assert_eq!(refund.status, RefundStatus::Failed);
    assert_eq!(
        ctx.collaborators.calls().await,
        vec![
            CollaboratorCall::InvoiceRefundFailure("ref_1".into()),
            CollaboratorCall::SubscriptionRefundFailure("ref_1".into()),
        ]
    );
}

#[actix_web::test]
async fn unsupported_event_is_acknowledged() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let body = serde_json::json!({ "event": "payout.finished" }).to_string();
    let signature = mulenpay_signature(&body);
    let response = test::call_service(&app, webhook_request(gateway.id, body, &signature)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_web::test]
async fn unknown_gateway_instance_is_not_found() {
    let ctx = utils::setup().await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let body = mulenpay_event("payment.finished", "payment", "mp_1", "completed");
    let signature = mulenpay_signature(&body);
    let response = test::call_service(&app, webhook_request(404, body, &signature)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn bitcoin_callback_by_query_string_settles_the_payment() {
    let ctx = utils::setup().await;
    let gateway = ctx
        .db
        .insert_merchant_gateway(utils::gateway_new(GatewayName::Blockonomics))
        .await
        .unwrap();
    ctx.open_payment(&gateway, "pay_1", "bc1qfresh").await;
    let app = test::init_service(router::mk_app(ctx.state.clone())).await;

    let unconfirmed = test::TestRequest::get()
        .uri(&format!(
            "/gateway/{}/webhook?secret={}&addr=bc1qfresh&status=0&value=100000&txid=tx_9",
            gateway.id,
            utils::WEBHOOK_SECRET
        ))
        .to_request();
    let response = test::call_service(&app, unconfirmed).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payment = ctx.db.find_payment_by_payment_id("pay_1").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Created);

    let confirmed = test::TestRequest::get()
        .uri(&format!(
            "/gateway/{}/webhook?secret={}&addr=bc1qfresh&status=2&value=100000&txid=tx_9",
            gateway.id,
            utils::WEBHOOK_SECRET
        ))
        .to_request();
    let response = test::call_service(&app, confirmed).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test::read_body(response).await, "OK");
    let payment = ctx.db.find_payment_by_payment_id("pay_1").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);

    let forged = test::TestRequest::get()
        .uri(&format!(
            "/gateway/{}/webhook?secret=guess&addr=bc1qfresh&status=2&value=1",
            gateway.id
        ))
        .to_request();
    let response = test::call_service(&app, forged).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
