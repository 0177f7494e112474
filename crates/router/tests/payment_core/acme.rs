//! Checkout of a subscription invoice, from payment creation to the merchant notification.

use actix_web::{http::StatusCode, test};
use common_enums::{DeliveryStatus, EventType, PaymentStatus, WebhookMessageStatus};
use router::{
    core::payments,
    db::payment::PaymentInterface,
    services::collaborators::mock::CollaboratorCall,
    types::api::PaymentCreateRequest,
    workflows::{InternalWebhookWorkflow, OutgoingWebhookDeliveryWorkflow},
};
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::utils::{self, mulenpay_event, mulenpay_signature, MERCHANT_ID};

#[actix_web::test]
async fn subscription_checkout_end_to_end() {
    let ctx = utils::setup().await;
    let gateway = ctx.mulenpay_gateway().await;
    let merchant = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&merchant)
        .await;
    ctx.endpoint(
        format!("{}/hooks", merchant.uri()),
        vec![EventType::PaymentSucceeded],
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/payments"))
        .and(body_partial_json(serde_json::json!({
            "amount": 4900,
            "currency": "EUR"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "payment_id": "mp_1",
                "status": "pending",
                "link": "https://checkout.mulenpay.example/mp_1"
            }
        })))
        .expect(1)
        .mount(&ctx.provider)
        .await;

    let created = payments::create_gateway_payment(
        &ctx.state,
        PaymentCreateRequest {
            merchant_id: MERCHANT_ID.to_string(),
            gateway_id: gateway.id,
            amount: 4900,
            currency: "EUR".to_string(),
            description: Some("Pro plan, January".to_string()),
            return_url: Some("https://shop.example.com/done".to_string()),
            subscription_id: Some("sub_1".to_string()),
            invoice_id: Some("inv_1".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(created.status, PaymentStatus::Created);
    assert_eq!(
        created.redirect_link.as_deref(),
        Some("https://checkout.mulenpay.example/mp_1")
    );
    let payment = ctx
        .db
        .find_payment_by_payment_id(&created.payment_id)
        .await
        .unwrap();
    assert_eq!(payment.gateway_payment_id.as_deref(), Some("mp_1"));

    let app = test::init_service(router::mk_app(ctx.state.clone())).await;
    let body = mulenpay_event("payment.finished", "payment", "mp_1", "completed");
    let request = test::TestRequest::post()
        .uri(&format!("/gateway/{}/webhook", gateway.id))
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-mulenpay-signature", mulenpay_signature(&body)))
        .set_payload(body)
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let payment = ctx
        .db
        .find_payment_by_payment_id(&created.payment_id)
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(
        ctx.collaborators.calls().await,
        vec![
            CollaboratorCall::InvoicePaymentSuccess(created.payment_id.clone()),
            CollaboratorCall::SubscriptionPaymentSuccess(created.payment_id.clone()),
        ]
    );

    let queued: Vec<_> = ctx
        .db
        .webhook_messages
        .lock()
        .await
        .iter()
        .filter(|message| message.status == WebhookMessageStatus::Pending)
        .cloned()
        .collect();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].event, EventType::PaymentSucceeded);
    assert_eq!(queued[0].sequence_key.as_deref(), Some(created.payment_id.as_str()));

    assert_eq!(ctx.drain(&InternalWebhookWorkflow).await, 1);
    assert_eq!(ctx.drain(&OutgoingWebhookDeliveryWorkflow).await, 1);

    let delivery = ctx.db.webhook_deliveries.lock().await[0].clone();
    assert_eq!(delivery.status, DeliveryStatus::Delivered);
    assert_eq!(delivery.event_id, queued[0].event_id);
    let archived = ctx
        .db
        .webhook_messages
        .lock()
        .await
        .iter()
        .find(|message| message.id == queued[0].id)
        .map(|message| message.status);
    assert_eq!(archived, Some(WebhookMessageStatus::Archived));
}
