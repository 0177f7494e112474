use common_enums::{GatewayName, PaymentStatus, RefundStatus, RefundType};
use gateway_interfaces::{
    api::Gateway,
    types::{GatewayNewPaymentRequest, WebhookResponseKind},
    webhooks::{IncomingWebhook, IncomingWebhookEvent, ObjectReferenceId},
};
use gateways::Alikassa;
use storage_models::{PaymentNew, RefundNew};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::utils;

fn merchant_gateway() -> storage_models::MerchantGateway {
    utils::merchant_gateway(
        GatewayName::Alikassa,
        "shop_42",
        "ak_secret",
        Some("ak_webhook_secret"),
    )
}

fn new_payment_request() -> GatewayNewPaymentRequest {
    GatewayNewPaymentRequest {
        payment_id: "pay_acme_5".to_string(),
        merchant_id: "acme".to_string(),
        amount: 99_900,
        currency: "RUB".to_string(),
        description: None,
        customer_email: None,
        country: Some("RU".to_string()),
        success_redirect_url: "https://core.test/gateway/7/redirect?paymentId=pay_acme_5&success=true"
            .to_string(),
        failure_redirect_url:
            "https://core.test/gateway/7/redirect?paymentId=pay_acme_5&success=false".to_string(),
        webhook_url: "https://core.test/gateway/7/webhook".to_string(),
        metadata: None,
    }
}

fn paid_payment(gateway_id: i64) -> storage_models::Payment {
    let mut payment = PaymentNew {
        payment_id: "pay_acme_5".to_string(),
        merchant_id: "acme".to_string(),
        gateway_id,
        total_amount: 99_900,
        currency: "RUB".to_string(),
        return_url: None,
        subscription_id: None,
        invoice_id: None,
        expire_time: None,
        metadata: None,
    }
    .into_payment();
    payment.gateway_payment_id = Some("inv_77".to_string());
    payment.status = PaymentStatus::Success;
    payment
}

fn refund(gateway_id: i64) -> storage_models::Refund {
    RefundNew {
        refund_id: "ref_5".to_string(),
        merchant_id: "acme".to_string(),
        payment_id: "pay_acme_5".to_string(),
        gateway_id,
        refund_amount: 30_000,
        currency: "RUB".to_string(),
        reason: None,
        refund_type: RefundType::Gateway,
    }
    .into_refund()
}

#[tokio::test]
async fn should_create_invoice_with_shop_credentials() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("POST"))
        .and(path("/api/v1/invoice/create"))
        .and(header("Authorization", "Bearer shop_42"))
        .and(header("X-API-Secret", "ak_secret"))
        .and(body_partial_json(serde_json::json!({
            "amount": 99_900,
            "currency": "RUB",
            "order_id": "pay_acme_5",
            "fail_url": "https://core.test/gateway/7/redirect?paymentId=pay_acme_5&success=false"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "invoice_id": "inv_77",
                "status": "pending",
                "amount": 99_900,
                "currency": "RUB",
                "link": "https://pay.alikassa.test/inv_77"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = Alikassa::new()
        .new_payment(&context.ctx(), &merchant_gateway(), &new_payment_request())
        .await
        .unwrap();
    assert_eq!(response.gateway_payment_id.as_deref(), Some("inv_77"));
    assert_eq!(
        response.redirect_link.as_deref(),
        Some("https://pay.alikassa.test/inv_77")
    );
    assert_eq!(response.status, PaymentStatus::Created);
    assert_eq!(context.logged_operations().await[0].gateway_label, "alikassa-7");
}

#[tokio::test]
async fn should_read_paid_invoice_detail() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v1/invoice/inv_77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "invoice_id": "inv_77",
                "status": "succeeded",
                "amount": 99_900,
                "currency": "RUB",
                "created_at": "2026-04-01T09:00:00Z",
                "updated_at": "2026-04-01T09:05:00Z"
            }
        })))
        .mount(&server)
        .await;

    let detail = Alikassa::new()
        .payment_detail(&context.ctx(), &merchant_gateway(), "inv_77")
        .await
        .unwrap();
    assert_eq!(detail.status, PaymentStatus::Success);
    assert_eq!(detail.amount, Some(99_900));
    assert!(detail.paid_time.is_some());
}

#[tokio::test]
async fn should_keep_refund_status_when_cancel_is_refused() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    let gateway = merchant_gateway();

    Mock::given(method("POST"))
        .and(path("/api/v1/refund/create"))
        .and(body_partial_json(serde_json::json!({
            "payment_id": "inv_77",
            "amount": 30_000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {"refund_id": "akr_3", "status": "pending", "amount": 30_000}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/refund/akr_3/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": "refund already sent"
        })))
        .mount(&server)
        .await;

    let adapter = Alikassa::new();
    let mut refund = refund(gateway.id);
    let response = adapter
        .refund(&context.ctx(), &gateway, &paid_payment(gateway.id), &refund)
        .await
        .unwrap();
    assert_eq!(response.gateway_refund_id.as_deref(), Some("akr_3"));
    assert_eq!(response.status, RefundStatus::Created);

    refund.gateway_refund_id = response.gateway_refund_id;
    let cancelled = adapter
        .refund_cancel(&context.ctx(), &gateway, &refund)
        .await
        .unwrap();
    assert_eq!(cancelled.status, RefundStatus::Created);
    assert_eq!(cancelled.reason.as_deref(), Some("refund already sent"));
}

#[tokio::test]
async fn should_report_an_empty_rouble_balance() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    let balances = Alikassa::new()
        .merchant_balances_query(&context.ctx(), &merchant_gateway())
        .await
        .unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].currency, "RUB");
    assert_eq!(balances[0].amount, 0);
    assert!(context.logged_operations().await.is_empty());
}

#[test]
fn should_verify_signed_payment_webhook() {
    let adapter = Alikassa::new();
    let gateway = merchant_gateway();
    let body = serde_json::json!({
        "event": "payment.finished",
        "payment": {"id": "inv_77", "status": "declined"}
    })
    .to_string();
    let signature = utils::hex_hmac_sha256("ak_webhook_secret", body.as_bytes());
    let headers = utils::headers(&[("x-alikassa-signature", &signature)]);
    let request = utils::webhook_request(&headers, body.as_bytes());

    assert!(adapter.verify_webhook_source(&request, &gateway).unwrap());
    assert_eq!(
        adapter.get_webhook_event_type(&request).unwrap(),
        IncomingWebhookEvent::PaymentIntentFailure
    );
    assert_eq!(
        adapter.get_webhook_object_reference_id(&request).unwrap(),
        ObjectReferenceId::PaymentId("inv_77".to_string())
    );
    assert_eq!(
        adapter.get_webhook_failure_reason(&request).as_deref(),
        Some("AliKassa status declined")
    );
    assert_eq!(adapter.get_webhook_api_response(), WebhookResponseKind::JsonStatusOk);

    let tampered = body.replace("declined", "succeeded");
    let request = utils::webhook_request(&headers, tampered.as_bytes());
    assert!(!adapter.verify_webhook_source(&request, &gateway).unwrap());
}

#[test]
fn should_reject_unsigned_webhook() {
    let adapter = Alikassa::new();
    let body = br#"{"event":"refund.finished","refund":{"id":"akr_3","status":"succeeded"}}"#;
    let headers = http::HeaderMap::new();
    let request = utils::webhook_request(&headers, body);

    assert!(adapter
        .verify_webhook_source(&request, &merchant_gateway())
        .is_err());
    assert_eq!(
        adapter.get_webhook_object_reference_id(&request).unwrap(),
        ObjectReferenceId::RefundId("akr_3".to_string())
    );
}
