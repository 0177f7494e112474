pub mod transformers;

use std::{collections::HashMap, sync::Arc};

use common_enums::{GatewayName, GatewayType};
use common_utils::{
    crypto::{self, GenerateDigest},
    date_time,
    errors::CustomResult,
    ext_traits::{ByteSliceExt, BytesExt, Encode},
    request::{Method, Request, RequestBuilder, RequestContent},
};
use error_stack::{report, ResultExt};
use gateway_interfaces::{
    api::{Gateway, GatewayCommon},
    api_client::GatewayCallContext,
    configs::Gateways,
    errors::GatewayError,
    types::{
        ErrorResponse, GatewayCancelResponse, GatewayCaptureResponse, GatewayInfo,
        GatewayNewPaymentRequest, GatewayNewPaymentResponse, GatewayPaymentDetail,
        GatewayRefundResponse, GatewayTestResponse, Response, WebhookResponseKind,
    },
    webhooks::{IncomingWebhook, IncomingWebhookEvent, IncomingWebhookRequestDetails, ObjectReferenceId},
};
use masking::{Mask, Maskable, PeekInterface, Secret};
use router_env::logger;
use serde::de::DeserializeOwned;
use storage_models::{MerchantGateway, Payment, Refund};
use tokio::sync::RwLock;
use transformers as airwallex;

use crate::{
    constants::{self, headers},
    utils,
};

const ICON: &str = "https://static.airwallex.com/icons/airwallex.png";

#[derive(Clone, Debug)]
struct CachedAccessToken {
    token: Secret<String>,
    expires_at: i64,
}

impl CachedAccessToken {
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at > now.saturating_add(constants::ACCESS_TOKEN_REFRESH_MARGIN_SECS)
    }
}

/// Client id and a digest of the API key, so a rotated key never reuses an old token.
type TokenCacheKey = (String, String);

/// Airwallex payment intents.
///
/// Calls are authorised with a bearer token obtained from the login endpoint. Tokens are cached
/// per credential pair until shortly before they expire, and dropped as soon as Airwallex
/// rejects them.
#[derive(Clone, Debug, Default)]
pub struct Airwallex {
    access_tokens: Arc<RwLock<HashMap<TokenCacheKey, CachedAccessToken>>>,
}

impl Airwallex {
    pub fn new() -> Self {
        Self::default()
    }

    fn token_cache_key(gateway: &MerchantGateway) -> CustomResult<TokenCacheKey, GatewayError> {
        let secret_digest = crypto::Sha256
            .generate_digest(gateway.gateway_secret.peek().as_bytes())
            .change_context(GatewayError::RequestEncodingFailed)?;
        Ok((gateway.gateway_key.peek().clone(), hex::encode(secret_digest)))
    }

    async fn forget_access_token(&self, gateway: &MerchantGateway) {
        if let Ok(key) = Self::token_cache_key(gateway) {
            if self.access_tokens.write().await.remove(&key).is_some() {
                logger::info!(gateway_id = gateway.id, "airwallex access token evicted");
            }
        }
    }

    /// [`utils::send_and_parse`] that evicts the cached token when the credentials are rejected.
    async fn send<T: DeserializeOwned>(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        operation: &'static str,
        request: Request,
        type_name: &'static str,
    ) -> CustomResult<Result<T, ErrorResponse>, GatewayError> {
        let response =
            utils::send_and_parse(self, ctx, gateway, operation, request, type_name).await?;
        if matches!(&response, Err(error) if utils::is_credential_rejection(error)) {
            self.forget_access_token(gateway).await;
        }
        Ok(response)
    }

    async fn get_access_token(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
    ) -> CustomResult<Secret<String>, GatewayError> {
        let cache_key = Self::token_cache_key(gateway)?;
        let now = date_time::now_unix_timestamp();

        if let Some(cached) = self.access_tokens.read().await.get(&cache_key) {
            if cached.is_fresh(now) {
                return Ok(cached.token.clone());
            }
        }

        let request = RequestBuilder::new()
            .method(Method::Post)
            .url(&utils::build_url(
                self.base_url(ctx.gateways),
                "/api/v1/authentication/login",
            ))
            .attach_default_headers()
            .headers(utils::json_headers(self.common_get_content_type()))
            .headers(vec![
                (
                    headers::X_CLIENT_ID.to_string(),
                    gateway.gateway_key.clone().into_masked(),
                ),
                (
                    headers::X_API_KEY.to_string(),
                    gateway.gateway_secret.clone().into_masked(),
                ),
            ])
            .build();

        let response: airwallex::AirwallexAuthUpdateResponse = self.send(
            ctx,
            gateway,
            "AccessTokenAuth",
            request,
            "AirwallexAuthUpdateResponse",
        )
        .await?
        .map_err(utils::unexpected)?;

        let cached = CachedAccessToken {
            expires_at: response.expires_at_unix(now),
            token: response.token,
        };
        let token = cached.token.clone();
        self.access_tokens.write().await.insert(cache_key, cached);
        Ok(token)
    }

    async fn build_headers(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
    ) -> CustomResult<Vec<(String, Maskable<String>)>, GatewayError> {
        let token = self.get_access_token(ctx, gateway).await?;
        let mut header = utils::json_headers(self.common_get_content_type());
        header.push((
            headers::AUTHORIZATION.to_string(),
            format!("Bearer {}", token.peek()).into_masked(),
        ));
        Ok(header)
    }

    fn parse_webhook(
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<airwallex::AirwallexWebhookEventDetails, GatewayError> {
        request
            .body
            .parse_struct("AirwallexWebhookEventDetails")
            .change_context(GatewayError::WebhookBodyDecodingFailed)
    }
}

impl GatewayCommon for Airwallex {
    fn id(&self) -> &'static str {
        "airwallex"
    }

    fn gateway_name(&self) -> GatewayName {
        GatewayName::Airwallex
    }

    fn base_url<'a>(&self, gateways: &'a Gateways) -> &'a str {
        gateways.airwallex.base_url.as_ref()
    }

    fn build_error_response(&self, res: &Response) -> CustomResult<ErrorResponse, GatewayError> {
        let response: airwallex::AirwallexErrorResponse = res
            .response
            .parse_struct("AirwallexErrorResponse")
            .change_context(GatewayError::ResponseDeserializationFailed)?;
        logger::info!(gateway_response=?response);

        Ok(ErrorResponse {
            status_code: res.status_code,
            code: response.code,
            message: response.message,
            reason: response.source,
        })
    }
}

#[async_trait::async_trait]
impl Gateway for Airwallex {
    fn info(&self) -> GatewayInfo {
        GatewayInfo {
            name: "airwallex",
            display_name: "Airwallex",
            description: "Use Airwallex to accept card payments worldwide",
            supported_payment_types: &["card"],
            auto_charge: false,
            is_staging: false,
            gateway_type: GatewayType::Card,
            webhook_response: self.get_webhook_api_response(),
        }
    }

    async fn test(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
    ) -> CustomResult<GatewayTestResponse, GatewayError> {
        self.get_access_token(ctx, gateway).await?;
        Ok(GatewayTestResponse {
            icon: ICON.to_string(),
            gateway_type: GatewayType::Card,
        })
    }

    async fn new_payment(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        request: &GatewayNewPaymentRequest,
    ) -> CustomResult<GatewayNewPaymentResponse, GatewayError> {
        let gateway_req = airwallex::AirwallexIntentRequest::try_from(request)?;
        let body = gateway_req
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
        let http_request = RequestBuilder::new()
            .method(Method::Post)
            .url(&utils::build_url(
                self.base_url(ctx.gateways),
                "/api/v1/pa/payment_intents/create",
            ))
            .attach_default_headers()
            .headers(self.build_headers(ctx, gateway).await?)
            .set_body(RequestContent::Json(body))
            .build();

        let response: airwallex::AirwallexPaymentsResponse = match self.send(
            ctx,
            gateway,
            "NewPayment",
            http_request,
            "AirwallexPaymentsResponse",
        )
        .await?
        {
            Ok(response) => response,
            Err(error) if utils::is_validation_rejection(&error) => {
                return Ok(GatewayNewPaymentResponse::rejected(error.describe()))
            }
            Err(error) => return Err(utils::unexpected(error)),
        };

        Ok(GatewayNewPaymentResponse {
            gateway_payment_id: Some(response.id.clone()),
            gateway_payment_intent_id: Some(response.id),
            // The hosted page is launched from the client secret on the checkout page.
            redirect_link: None,
            status: response.status.into(),
            reason: response
                .last_payment_error
                .and_then(|error| error.message.or(error.code)),
        })
    }

    async fn payment_detail(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        gateway_payment_id: &str,
    ) -> CustomResult<GatewayPaymentDetail, GatewayError> {
        let http_request = RequestBuilder::new()
            .method(Method::Get)
            .url(&utils::build_url(
                self.base_url(ctx.gateways),
                &format!("/api/v1/pa/payment_intents/{gateway_payment_id}"),
            ))
            .attach_default_headers()
            .headers(self.build_headers(ctx, gateway).await?)
            .build();

        let response: airwallex::AirwallexPaymentsResponse = self.send(
            ctx,
            gateway,
            "PaymentDetail",
            http_request,
            "AirwallexPaymentsResponse",
        )
        .await?
        .map_err(utils::unexpected)?;

        GatewayPaymentDetail::try_from(response)
    }

    async fn capture(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        payment: &Payment,
    ) -> CustomResult<GatewayCaptureResponse, GatewayError> {
        let intent_id = payment_intent_id(payment)?;
        let body = airwallex::AirwallexPaymentsCaptureRequest::try_from(payment)?
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
        let http_request = RequestBuilder::new()
            .method(Method::Post)
            .url(&utils::build_url(
                self.base_url(ctx.gateways),
                &format!("/api/v1/pa/payment_intents/{intent_id}/capture"),
            ))
            .attach_default_headers()
            .headers(self.build_headers(ctx, gateway).await?)
            .set_body(RequestContent::Json(body))
            .build();

        let response: airwallex::AirwallexPaymentsResponse = self.send(
            ctx,
            gateway,
            "Capture",
            http_request,
            "AirwallexPaymentsResponse",
        )
        .await?
        .map_err(utils::unexpected)?;

        Ok(GatewayCaptureResponse {
            status: response.status.into(),
            reason: None,
        })
    }

    async fn cancel(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        payment: &Payment,
    ) -> CustomResult<GatewayCancelResponse, GatewayError> {
        let intent_id = payment_intent_id(payment)?;
        let body = airwallex::AirwallexPaymentsCancelRequest::from(payment)
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
        let http_request = RequestBuilder::new()
            .method(Method::Post)
            .url(&utils::build_url(
                self.base_url(ctx.gateways),
                &format!("/api/v1/pa/payment_intents/{intent_id}/cancel"),
            ))
            .attach_default_headers()
            .headers(self.build_headers(ctx, gateway).await?)
            .set_body(RequestContent::Json(body))
            .build();

        let response: airwallex::AirwallexPaymentsResponse = self.send(
            ctx,
            gateway,
            "Cancel",
            http_request,
            "AirwallexPaymentsResponse",
        )
        .await?
        .map_err(utils::unexpected)?;

        Ok(GatewayCancelResponse {
            status: response.status.into(),
            reason: None,
        })
    }

    async fn refund(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        payment: &Payment,
        refund: &Refund,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        let body = airwallex::AirwallexRefundRequest::try_from((payment, refund))?
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
        let http_request = RequestBuilder::new()
            .method(Method::Post)
            .url(&utils::build_url(
                self.base_url(ctx.gateways),
                "/api/v1/pa/refunds/create",
            ))
            .attach_default_headers()
            .headers(self.build_headers(ctx, gateway).await?)
            .set_body(RequestContent::Json(body))
            .build();

        match self.send::<airwallex::AirwallexRefundResponse>(
            ctx,
            gateway,
            "Refund",
            http_request,
            "AirwallexRefundResponse",
        )
        .await?
        {
            Ok(response) => GatewayRefundResponse::try_from(response),
            Err(error) if utils::is_validation_rejection(&error) => {
                Ok(GatewayRefundResponse::rejected(error.describe()))
            }
            Err(error) => Err(utils::unexpected(error)),
        }
    }

    async fn refund_detail(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        gateway_refund_id: &str,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        let http_request = RequestBuilder::new()
            .method(Method::Get)
            .url(&utils::build_url(
                self.base_url(ctx.gateways),
                &format!("/api/v1/pa/refunds/{gateway_refund_id}"),
            ))
            .attach_default_headers()
            .headers(self.build_headers(ctx, gateway).await?)
            .build();

        let response: airwallex::AirwallexRefundResponse = self.send(
            ctx,
            gateway,
            "RefundDetail",
            http_request,
            "AirwallexRefundResponse",
        )
        .await?
        .map_err(utils::unexpected)?;

        GatewayRefundResponse::try_from(response)
    }
}

fn payment_intent_id(payment: &Payment) -> CustomResult<&str, GatewayError> {
    payment
        .gateway_payment_intent_id
        .as_deref()
        .or(payment.gateway_payment_id.as_deref())
        .ok_or_else(|| {
            report!(GatewayError::MissingRequiredField {
                field_name: "gateway_payment_intent_id",
            })
        })
}

impl IncomingWebhook for Airwallex {
    fn get_webhook_source_verification_algorithm(
        &self,
        _request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<Box<dyn crypto::VerifySignature + Send>, GatewayError> {
        Ok(Box::new(crypto::HmacSha256))
    }

    fn get_webhook_source_verification_signature(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<String, GatewayError> {
        request
            .header(headers::X_AIRWALLEX_SIGNATURE)
            .or_else(|| request.header(headers::X_SIGNATURE))
            .map(str::to_string)
            .ok_or(report!(GatewayError::WebhookSignatureNotFound))
    }

    fn get_webhook_object_reference_id(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<ObjectReferenceId, GatewayError> {
        let details = Self::parse_webhook(request)?;
        if details.name.starts_with("refund.") {
            Ok(ObjectReferenceId::RefundId(details.data.object.id))
        } else {
            Ok(ObjectReferenceId::PaymentId(details.data.object.id))
        }
    }

    fn get_webhook_event_type(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<IncomingWebhookEvent, GatewayError> {
        let details: airwallex::AirwallexWebhookEventName = request
            .body
            .parse_struct("AirwallexWebhookEventName")
            .change_context(GatewayError::WebhookEventTypeNotFound)?;
        Ok(match details.name.as_str() {
            "payment_intent.succeeded" => IncomingWebhookEvent::PaymentIntentSuccess,
            "payment_intent.failed" => IncomingWebhookEvent::PaymentIntentFailure,
            "payment_intent.canceled" | "payment_intent.cancelled" => {
                IncomingWebhookEvent::PaymentIntentCancelled
            }
            "refund.succeeded" | "refund.settled" => IncomingWebhookEvent::RefundSuccess,
            "refund.failed" => IncomingWebhookEvent::RefundFailure,
            _ => IncomingWebhookEvent::EventNotSupported,
        })
    }

    fn get_webhook_event_name(&self, request: &IncomingWebhookRequestDetails<'_>) -> Option<String> {
        let details: Result<airwallex::AirwallexWebhookEventName, _> =
            request.body.parse_struct("AirwallexWebhookEventName");
        details.ok().map(|details| details.name)
    }

    fn get_webhook_resource_object(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<serde_json::Value, GatewayError> {
        let body: serde_json::Value = request
            .body
            .parse_struct("AirwallexWebhookBody")
            .change_context(GatewayError::WebhookBodyDecodingFailed)?;
        body.pointer("/data/object")
            .cloned()
            .ok_or(report!(GatewayError::WebhookResourceObjectNotFound))
    }

    fn get_webhook_failure_reason(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> Option<String> {
        Self::parse_webhook(request).ok().and_then(|details| {
            let object = details.data.object;
            object
                .last_payment_error
                .and_then(|error| error.message.or(error.code))
                .or(object.reason)
        })
    }

    fn get_webhook_api_response(&self) -> WebhookResponseKind {
        WebhookResponseKind::JsonStatusOk
    }
}
