use common_enums::{GatewayName, PaymentStatus, RefundStatus};
use gateway_interfaces::{
    api::Gateway,
    errors::GatewayError,
    types::GatewayNewPaymentRequest,
    webhooks::{IncomingWebhook, IncomingWebhookEvent, ObjectReferenceId},
};
use gateways::Airwallex;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::utils;

fn new_payment_request() -> GatewayNewPaymentRequest {
    GatewayNewPaymentRequest {
        payment_id: "pay_acme_1".to_string(),
        merchant_id: "acme".to_string(),
        amount: 2599,
        currency: "USD".to_string(),
        description: Some("Pro plan".to_string()),
        customer_email: None,
        country: None,
        success_redirect_url: "https://core.test/gateway/7/redirect?paymentId=pay_acme_1&success=true"
            .to_string(),
        failure_redirect_url:
            "https://core.test/gateway/7/redirect?paymentId=pay_acme_1&success=false".to_string(),
        webhook_url: "https://core.test/gateway/7/webhook".to_string(),
        metadata: None,
    }
}

async fn mount_login(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/authentication/login"))
        .and(header("x-client-id", "client_1"))
        .and(header("x-api-key", "api_key_1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": "bearer_1",
            "expires_at": "2099-01-01T00:00:00Z"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn should_create_payment_intent_and_reuse_token() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    let gateway = utils::merchant_gateway(GatewayName::Airwallex, "client_1", "api_key_1", None);
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/pa/payment_intents/create"))
        .and(header("Authorization", "Bearer bearer_1"))
        .and(body_partial_json(serde_json::json!({
            "request_id": "pay_acme_1",
            "amount": 25.99,
            "currency": "USD"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "int_hk_1",
            "status": "REQUIRES_PAYMENT_METHOD",
            "client_secret": "cs_1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pa/payment_intents/int_hk_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "int_hk_1",
            "status": "SUCCEEDED",
            "amount": 25.99,
            "currency": "USD",
            "updated_at": "2024-05-01T10:00:00Z"
        })))
        .mount(&server)
        .await;

    let adapter = Airwallex::new();
    let response = adapter
        .new_payment(&context.ctx(), &gateway, &new_payment_request())
        .await
        .unwrap();
    assert_eq!(response.gateway_payment_id.as_deref(), Some("int_hk_1"));
    assert_eq!(response.status, PaymentStatus::Created);

    let detail = adapter
        .payment_detail(&context.ctx(), &gateway, "int_hk_1")
        .await
        .unwrap();
    assert_eq!(detail.status, PaymentStatus::Success);
    assert_eq!(detail.amount, Some(2599));
    assert!(detail.paid_time.is_some());

    let operations: Vec<String> = context
        .logged_operations()
        .await
        .into_iter()
        .map(|entry| entry.operation)
        .collect();
    assert_eq!(
        operations,
        vec!["AccessTokenAuth", "NewPayment", "PaymentDetail"]
    );
}

#[tokio::test]
async fn should_reject_invalid_credentials() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    let gateway = utils::merchant_gateway(GatewayName::Airwallex, "client_1", "wrong", None);

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "code": "credentials_invalid",
            "message": "Invalid credentials"
        })))
        .mount(&server)
        .await;

    let error = Airwallex::new()
        .test(&context.ctx(), &gateway)
        .await
        .unwrap_err();
    assert_eq!(error.current_context(), &GatewayError::CredentialInvalid);
}

#[tokio::test]
async fn should_log_in_again_after_the_api_key_rotates() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/authentication/login"))
        .and(header("x-client-id", "client_1"))
        .and(header("x-api-key", "api_key_2"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": "bearer_2",
            "expires_at": "2099-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = Airwallex::new();
    let original = utils::merchant_gateway(GatewayName::Airwallex, "client_1", "api_key_1", None);
    let rotated = utils::merchant_gateway(GatewayName::Airwallex, "client_1", "api_key_2", None);
    adapter.test(&context.ctx(), &original).await.unwrap();
    adapter.test(&context.ctx(), &rotated).await.unwrap();
    adapter.test(&context.ctx(), &original).await.unwrap();
}

#[tokio::test]
async fn should_drop_a_token_the_api_rejects() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    let gateway = utils::merchant_gateway(GatewayName::Airwallex, "client_1", "api_key_1", None);
    mount_login(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pa/payment_intents/int_hk_1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "code": "unauthorized",
            "message": "Access token expired"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pa/payment_intents/int_hk_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "int_hk_1",
            "status": "REQUIRES_PAYMENT_METHOD"
        })))
        .mount(&server)
        .await;

    let adapter = Airwallex::new();
    let error = adapter
        .payment_detail(&context.ctx(), &gateway, "int_hk_1")
        .await
        .unwrap_err();
    assert_eq!(error.current_context(), &GatewayError::CredentialInvalid);

    let detail = adapter
        .payment_detail(&context.ctx(), &gateway, "int_hk_1")
        .await
        .unwrap();
    assert_eq!(detail.status, PaymentStatus::Created);
}

#[tokio::test]
async fn should_report_validation_errors_as_failed_payment() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    let gateway = utils::merchant_gateway(GatewayName::Airwallex, "client_1", "api_key_1", None);
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/pa/payment_intents/create"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": "validation_error",
            "message": "currency is not supported",
            "source": "currency"
        })))
        .mount(&server)
        .await;

    let response = Airwallex::new()
        .new_payment(&context.ctx(), &gateway, &new_payment_request())
        .await
        .unwrap();
    assert_eq!(response.status, PaymentStatus::Failed);
    assert_eq!(response.reason.as_deref(), Some("validation_error: currency"));
}

#[tokio::test]
async fn should_map_timeouts_to_provider_unavailable() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    let gateway = utils::merchant_gateway(GatewayName::Airwallex, "client_1", "api_key_1", None);
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/pa/payment_intents/int_slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;

    let error = Airwallex::new()
        .payment_detail(&context.ctx(), &gateway, "int_slow")
        .await
        .unwrap_err();
    assert!(error.current_context().is_unknown_outcome());

    let entries = context.logged_operations().await;
    let last = entries.last().unwrap();
    assert_eq!(last.operation, "PaymentDetail");
    assert!(last.error.is_some());
}

#[tokio::test]
async fn should_refund_through_refunds_endpoint() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    let gateway = utils::merchant_gateway(GatewayName::Airwallex, "client_1", "api_key_1", None);
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/pa/refunds/create"))
        .and(body_partial_json(serde_json::json!({
            "payment_intent_id": "int_hk_1",
            "amount": 10.0
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "rfd_1",
            "status": "RECEIVED",
            "amount": 10.0
        })))
        .mount(&server)
        .await;

    let mut payment = storage_models::PaymentNew {
        payment_id: "pay_acme_1".to_string(),
        merchant_id: "acme".to_string(),
        gateway_id: gateway.id,
        total_amount: 2599,
        currency: "USD".to_string(),
        return_url: None,
        subscription_id: None,
        invoice_id: None,
        expire_time: None,
        metadata: None,
    }
    .into_payment();
    payment.gateway_payment_intent_id = Some("int_hk_1".to_string());
    let refund = storage_models::RefundNew {
        refund_id: "ref_1".to_string(),
        merchant_id: "acme".to_string(),
        payment_id: payment.payment_id.clone(),
        gateway_id: gateway.id,
        refund_amount: 1000,
        currency: "USD".to_string(),
        reason: None,
        refund_type: common_enums::RefundType::Gateway,
    }
    .into_refund();

    let response = Airwallex::new()
        .refund(&context.ctx(), &gateway, &payment, &refund)
        .await
        .unwrap();
    assert_eq!(response.gateway_refund_id.as_deref(), Some("rfd_1"));
    assert_eq!(response.status, RefundStatus::Created);
    assert_eq!(response.refund_amount, Some(1000));
}

#[test]
fn should_verify_webhook_signature_and_parse_event() {
    let adapter = Airwallex::new();
    let gateway = utils::merchant_gateway(
        GatewayName::Airwallex,
        "client_1",
        "api_key_1",
        Some("whsec_airwallex"),
    );
    let body = serde_json::json!({
        "id": "evt_1",
        "name": "payment_intent.succeeded",
        "data": {"object": {"id": "int_hk_1", "status": "SUCCEEDED", "amount": 25.99}}
    })
    .to_string();
    let signature = utils::hex_hmac_sha256("whsec_airwallex", body.as_bytes());

    let headers = utils::headers(&[("x-airwallex-signature", &signature)]);
    let request = utils::webhook_request(&headers, body.as_bytes());
    assert!(adapter.verify_webhook_source(&request, &gateway).unwrap());
    assert_eq!(
        adapter.get_webhook_event_type(&request).unwrap(),
        IncomingWebhookEvent::PaymentIntentSuccess
    );
    assert_eq!(
        adapter.get_webhook_object_reference_id(&request).unwrap(),
        ObjectReferenceId::PaymentId("int_hk_1".to_string())
    );
    assert_eq!(
        adapter.get_webhook_event_name(&request).as_deref(),
        Some("payment_intent.succeeded")
    );

    // Fallback header name
    let headers = utils::headers(&[("x-signature", &signature)]);
    let request = utils::webhook_request(&headers, body.as_bytes());
    assert!(adapter.verify_webhook_source(&request, &gateway).unwrap());

    let tampered = body.replace("25.99", "2599");
    let headers = utils::headers(&[("x-airwallex-signature", &signature)]);
    let request = utils::webhook_request(&headers, tampered.as_bytes());
    assert!(!adapter.verify_webhook_source(&request, &gateway).unwrap());
}

#[test]
fn should_reject_webhook_without_signature() {
    let adapter = Airwallex::new();
    let gateway = utils::merchant_gateway(
        GatewayName::Airwallex,
        "client_1",
        "api_key_1",
        Some("whsec_airwallex"),
    );
    let headers = http::HeaderMap::new();
    let request = utils::webhook_request(&headers, b"{}");
    let error = adapter
        .verify_webhook_source(&request, &gateway)
        .unwrap_err();
    assert_eq!(
        error.current_context(),
        &GatewayError::WebhookSignatureNotFound
    );
}
