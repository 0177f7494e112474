use common_enums::{GatewayName, PaymentStatus};
use gateway_interfaces::{
    api::Gateway,
    errors::GatewayError,
    types::{CryptoFiatTransRequest, GatewayNewPaymentRequest, WebhookResponseKind},
    webhooks::{
        IncomingWebhook, IncomingWebhookEvent, IncomingWebhookRequestDetails, ObjectReferenceId,
    },
};
use gateways::Blockonomics;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use crate::utils;

fn merchant_gateway() -> storage_models::MerchantGateway {
    let mut gateway = utils::merchant_gateway(
        GatewayName::Blockonomics,
        "bo_key",
        "bo_api_key",
        Some("bo_hook_secret"),
    );
    gateway.payment_types = vec!["BTC".to_string()];
    gateway
}

fn new_payment_request() -> GatewayNewPaymentRequest {
    GatewayNewPaymentRequest {
        payment_id: "pay_acme_9".to_string(),
        merchant_id: "acme".to_string(),
        amount: 5000,
        currency: "USD".to_string(),
        description: None,
        customer_email: None,
        country: None,
        success_redirect_url: "https://core.test/gateway/7/redirect?paymentId=pay_acme_9&success=true"
            .to_string(),
        failure_redirect_url:
            "https://core.test/gateway/7/redirect?paymentId=pay_acme_9&success=false".to_string(),
        webhook_url: "https://core.test/gateway/7/webhook".to_string(),
        metadata: None,
    }
}

fn address_balance(addr: &str, confirmed: i64, unconfirmed: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "response": [{"addr": addr, "confirmed": confirmed, "unconfirmed": unconfirmed}]
    }))
}

fn callback<'a>(headers: &'a http::HeaderMap, query: &str) -> IncomingWebhookRequestDetails<'a> {
    IncomingWebhookRequestDetails {
        method: http::Method::GET,
        headers,
        body: b"",
        query_params: query.to_string(),
    }
}

#[tokio::test]
async fn should_skip_addresses_that_already_hold_funds() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/price"))
        .and(query_param("crypto", "BTC"))
        .and(query_param("currency", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"price": 50_000.0})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/new_address"))
        .and(header("Authorization", "Bearer bo_api_key"))
        .and(body_partial_json(serde_json::json!({
            "match_callback": "https://core.test/gateway/7/webhook"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"address": "bc1qused"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/new_address"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"address": "bc1qfresh"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/balance"))
        .and(body_partial_json(serde_json::json!({"addr": "bc1qused"})))
        .respond_with(address_balance("bc1qused", 0, 2500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/balance"))
        .and(body_partial_json(serde_json::json!({"addr": "bc1qfresh"})))
        .respond_with(address_balance("bc1qfresh", 0, 0))
        .mount(&server)
        .await;

    let response = Blockonomics::new()
        .new_payment(&context.ctx(), &merchant_gateway(), &new_payment_request())
        .await
        .unwrap();
    assert_eq!(response.status, PaymentStatus::Created);
    assert_eq!(response.gateway_payment_id.as_deref(), Some("bc1qfresh"));
    assert_eq!(response.gateway_payment_intent_id.as_deref(), Some("bc1qfresh"));
    assert_eq!(
        response.redirect_link.as_deref(),
        Some("bitcoin:bc1qfresh?amount=0.00100000")
    );

    let operations: Vec<_> = context
        .logged_operations()
        .await
        .into_iter()
        .map(|entry| entry.operation)
        .collect();
    assert_eq!(
        operations,
        ["Price", "NewAddress", "AddressBalance", "NewAddress", "AddressBalance"]
    );
}

#[tokio::test]
async fn should_reject_coins_without_a_balance_endpoint() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());
    let mut gateway = merchant_gateway();
    gateway.payment_types = vec!["usdt".to_string()];

    let response = Blockonomics::new()
        .new_payment(&context.ctx(), &gateway, &new_payment_request())
        .await
        .unwrap();
    assert_eq!(response.status, PaymentStatus::Failed);
    assert!(response.reason.unwrap().contains("USDT"));
    assert!(context.logged_operations().await.is_empty());
}

#[tokio::test]
async fn should_settle_on_confirmed_balance() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("POST"))
        .and(path("/api/balance"))
        .and(body_partial_json(serde_json::json!({"addr": "bc1qfresh"})))
        .respond_with(address_balance("bc1qfresh", 100_000, 0))
        .mount(&server)
        .await;

    let detail = Blockonomics::new()
        .payment_detail(&context.ctx(), &merchant_gateway(), "bc1qfresh")
        .await
        .unwrap();
    assert_eq!(detail.status, PaymentStatus::Success);
    assert_eq!(detail.amount, Some(100_000));
    assert_eq!(detail.currency.as_deref(), Some("BTC"));
    assert_eq!(detail.reason.as_deref(), Some("Confirmed"));
}

#[tokio::test]
async fn should_report_account_balance_in_satoshis() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/balance"))
        .and(header("Authorization", "Bearer bo_api_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"BTC": 0.0125})))
        .mount(&server)
        .await;

    let balances = Blockonomics::new()
        .merchant_balances_query(&context.ctx(), &merchant_gateway())
        .await
        .unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].currency, "BTC");
    assert_eq!(balances[0].amount, 1_250_000);
    assert_eq!(
        context.logged_operations().await[0].operation,
        "MerchantBalancesQuery"
    );
}

#[tokio::test]
async fn should_quote_fiat_in_crypto() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/price"))
        .and(query_param("crypto", "BTC"))
        .and(query_param("currency", "EUR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"price": 60_000.0})))
        .expect(1)
        .mount(&server)
        .await;

    let quote = Blockonomics::new()
        .crypto_fiat_trans(
            &context.ctx(),
            &CryptoFiatTransRequest {
                amount: 3000,
                fiat_currency: "eur".to_string(),
                crypto_currency: "btc".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(quote.crypto_amount, "0.00050000");
    assert_eq!(quote.rate, "60000");
    assert!(context.logged_operations().await.is_empty());
}

#[tokio::test]
async fn should_fail_quote_on_missing_price() {
    let server = MockServer::start().await;
    let context = utils::TestContext::new(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"price": 0.0})))
        .mount(&server)
        .await;

    let error = Blockonomics::new()
        .crypto_fiat_trans(
            &context.ctx(),
            &CryptoFiatTransRequest {
                amount: 3000,
                fiat_currency: "USD".to_string(),
                crypto_currency: "BTC".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(error.current_context(), &GatewayError::ResponseHandlingFailed);
}

#[test]
fn should_verify_callback_by_shared_secret() {
    let adapter = Blockonomics::new();
    let gateway = merchant_gateway();
    let headers = http::HeaderMap::new();
    let request = callback(
        &headers,
        "secret=bo_hook_secret&addr=bc1qfresh&status=2&crypto=BTC&txid=tx_9&value=100000",
    );

    assert!(adapter.verify_webhook_source(&request, &gateway).unwrap());
    assert_eq!(
        adapter.get_webhook_event_type(&request).unwrap(),
        IncomingWebhookEvent::PaymentIntentSuccess
    );
    assert_eq!(
        adapter.get_webhook_object_reference_id(&request).unwrap(),
        ObjectReferenceId::PaymentId("bc1qfresh".to_string())
    );
    assert_eq!(
        adapter.get_webhook_resource_object(&request).unwrap()["txid"],
        "tx_9"
    );
    assert_eq!(adapter.get_webhook_api_response(), WebhookResponseKind::PlainOk);

    let request = callback(&headers, "secret=guess&addr=bc1qfresh&status=2&value=100000");
    assert!(!adapter.verify_webhook_source(&request, &gateway).unwrap());

    let request = callback(&headers, "addr=bc1qfresh&status=2&value=100000");
    assert!(adapter.verify_webhook_source(&request, &gateway).is_err());
}

#[test]
fn should_read_json_callback_body() {
    let adapter = Blockonomics::new();
    let headers = http::HeaderMap::new();
    let body = serde_json::json!({
        "addr": "bc1qfresh", "status": 1, "crypto": "BTC", "txid": "tx_9", "value": 100_000
    })
    .to_string();
    let request = IncomingWebhookRequestDetails {
        method: http::Method::POST,
        headers: &headers,
        body: body.as_bytes(),
        query_params: "secret=bo_hook_secret".to_string(),
    };

    assert!(adapter
        .verify_webhook_source(&request, &merchant_gateway())
        .unwrap());
    assert_eq!(
        adapter.get_webhook_event_type(&request).unwrap(),
        IncomingWebhookEvent::PaymentIntentProcessing
    );
    assert_eq!(
        adapter.get_webhook_event_name(&request).as_deref(),
        Some("Partially Confirmed")
    );
}
