use common_enums::{GatewayName, PaymentStatus};
use common_utils::date_time;
use gateway_interfaces::{
    api::Gateway,
    errors::GatewayError,
    types::{GatewayNewPaymentRequest, WebhookResponseKind},
    webhooks::{IncomingWebhook, IncomingWebhookEvent, ObjectReferenceId},
};
use gateways::Firekassa;
use wiremock::{
    matchers::{body_partial_json, header, header_exists, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::utils;

fn merchant_gateway() -> storage_models::MerchantGateway {
    utils::merchant_gateway(GatewayName::Firekassa, "fk_site_key", "fk_secret", None)
}

fn deposit_body(status: &str) -> String {
    serde_json::json!({
        "id": 981,
        "order_id": "pay_acme_3",
        "type": "deposit",
        "status": status,
        "amount": "100.00",
        "currency": "RUB",
        "site_id": 7
    })
    .to_string()
}

fn signed_headers(body: &str, timestamp: &str) -> http::HeaderMap {
    let value: serde_json::Value = serde_json::from_str(body).unwrap();
    let signing_string = gateways_signing_string(&value, timestamp);
    let signature = utils::hex_hmac_sha512("fk_site_key", signing_string.as_bytes());
    utils::headers(&[("x-sign", &signature), ("x-time", timestamp)])
}

fn gateways_signing_string(body: &serde_json::Value, timestamp: &str) -> String {
    gateways::gateways::firekassa::transformers::webhook_signing_string(body, timestamp)
}

#[tokio::test]
async fn should_create_invoice_with_decimal_amount() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("POST"))
        .and(path("/api/v2/invoices"))
        .and(header("Authorization", "Bearer fk_site_key"))
        .and(header_exists("Signature"))
        .and(body_partial_json(serde_json::json!({
            "order_id": "pay_acme_3",
            "amount": "100.00",
            "currency": "RUB"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 981,
            "payment_url": "https://pay.firekassa.test/981"
        })))
        .mount(&server)
        .await;

    let request = GatewayNewPaymentRequest {
        payment_id: "pay_acme_3".to_string(),
        merchant_id: "acme".to_string(),
        amount: 10_000,
        currency: "RUB".to_string(),
        description: None,
        customer_email: None,
        country: None,
        success_redirect_url: "https://core.test/gateway/7/redirect?paymentId=pay_acme_3&success=true"
            .to_string(),
        failure_redirect_url:
            "https://core.test/gateway/7/redirect?paymentId=pay_acme_3&success=false".to_string(),
        webhook_url: "https://core.test/gateway/7/webhook".to_string(),
        metadata: None,
    };
    let response = Firekassa::default()
        .new_payment(&context.ctx(), &merchant_gateway(), &request)
        .await
        .unwrap();
    assert_eq!(response.gateway_payment_id.as_deref(), Some("981"));
    assert_eq!(
        response.redirect_link.as_deref(),
        Some("https://pay.firekassa.test/981")
    );
    assert_eq!(response.status, PaymentStatus::Created);
}

#[tokio::test]
async fn should_read_transaction_status() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v2/transactions/981"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 981,
            "status": "paid",
            "amount": "100.00",
            "currency": "RUB"
        })))
        .mount(&server)
        .await;

    let detail = Firekassa::default()
        .payment_detail(&context.ctx(), &merchant_gateway(), "981")
        .await
        .unwrap();
    assert_eq!(detail.status, PaymentStatus::Success);
    assert_eq!(detail.amount, Some(10_000));
    assert!(detail.paid_time.is_some());
}

#[tokio::test]
async fn should_report_server_errors_as_unexpected_response() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v2/transactions/981"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let error = Firekassa::default()
        .payment_detail(&context.ctx(), &merchant_gateway(), "981")
        .await
        .unwrap_err();
    assert_eq!(
        error.current_context(),
        &GatewayError::UnexpectedResponse { status_code: 502 }
    );
}

#[tokio::test]
async fn should_not_support_refunds() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    let gateway = merchant_gateway();
    let payment = storage_models::PaymentNew {
        payment_id: "pay_acme_3".to_string(),
        merchant_id: "acme".to_string(),
        gateway_id: gateway.id,
        total_amount: 10_000,
        currency: "RUB".to_string(),
        return_url: None,
        subscription_id: None,
        invoice_id: None,
        expire_time: None,
        metadata: None,
    }
    .into_payment();
    let refund = storage_models::RefundNew {
        refund_id: "ref_3".to_string(),
        merchant_id: "acme".to_string(),
        payment_id: payment.payment_id.clone(),
        gateway_id: gateway.id,
        refund_amount: 10_000,
        currency: "RUB".to_string(),
        reason: None,
        refund_type: common_enums::RefundType::Gateway,
    }
    .into_refund();

    let error = Firekassa::default()
        .refund(&context.ctx(), &gateway, &payment, &refund)
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        GatewayError::NotSupported { .. }
    ));
    assert!(context.logged_operations().await.is_empty());
}

#[test]
fn should_verify_signed_deposit_webhook() {
    let adapter = Firekassa::default();
    let gateway = merchant_gateway();
    let body = deposit_body("paid");
    let timestamp = date_time::now_unix_timestamp().to_string();
    let headers = signed_headers(&body, &timestamp);
    let request = utils::webhook_request(&headers, body.as_bytes());

    assert!(adapter.verify_webhook_source(&request, &gateway).unwrap());
    assert_eq!(
        adapter.get_webhook_event_type(&request).unwrap(),
        IncomingWebhookEvent::PaymentIntentSuccess
    );
    assert_eq!(
        adapter.get_webhook_object_reference_id(&request).unwrap(),
        ObjectReferenceId::PaymentId("981".to_string())
    );
    assert_eq!(
        adapter.get_webhook_event_name(&request).as_deref(),
        Some("deposit.paid")
    );
    assert_eq!(adapter.get_webhook_api_response(), WebhookResponseKind::PlainOk);
}

#[test]
fn should_reject_tampered_deposit_webhook() {
    let adapter = Firekassa::default();
    let gateway = merchant_gateway();
    let timestamp = date_time::now_unix_timestamp().to_string();
    let headers = signed_headers(&deposit_body("paid"), &timestamp);
    let tampered = deposit_body("paid").replace("100.00", "1000.00");
    let request = utils::webhook_request(&headers, tampered.as_bytes());

    assert!(!adapter.verify_webhook_source(&request, &gateway).unwrap());
}

#[test]
fn should_reject_stale_webhook_even_with_valid_signature() {
    let adapter = Firekassa::new(300);
    let gateway = merchant_gateway();
    let body = deposit_body("paid");
    let timestamp = (date_time::now_unix_timestamp() - 3600).to_string();
    let headers = signed_headers(&body, &timestamp);
    let request = utils::webhook_request(&headers, body.as_bytes());

    let error = adapter
        .verify_webhook_source(&request, &gateway)
        .unwrap_err();
    assert_eq!(
        error.current_context(),
        &GatewayError::WebhookTimestampExpired
    );
}

#[test]
fn should_ignore_withdrawal_notifications() {
    let adapter = Firekassa::default();
    let body = serde_json::json!({"id": 12, "type": "withdrawal", "status": "paid"}).to_string();
    let headers = http::HeaderMap::new();
    let request = utils::webhook_request(&headers, body.as_bytes());

    assert_eq!(
        adapter.get_webhook_event_type(&request).unwrap(),
        IncomingWebhookEvent::EventNotSupported
    );
}
