pub mod transformers;

use common_enums::{GatewayName, GatewayType, PaymentStatus};
use common_utils::{
    crypto::{self, SignMessage},
    date_time,
    errors::CustomResult,
    ext_traits::{BytesExt, Encode},
    request::{Method, Request, RequestBuilder, RequestContent},
};
use error_stack::{report, ResultExt};
use gateway_interfaces::{
    api::{Gateway, GatewayCommon},
    api_client::{call_gateway_api, GatewayCallContext},
    configs::Gateways,
    consts,
    errors::GatewayError,
    types::{
        ErrorResponse, GatewayCancelResponse, GatewayInfo, GatewayNewPaymentRequest,
        GatewayNewPaymentResponse, GatewayPaymentDetail, GatewayTestResponse, Response,
        WebhookResponseKind,
    },
    webhooks::{
        parse_webhook_body, value_at_path, IncomingWebhook, IncomingWebhookEvent,
        IncomingWebhookRequestDetails, ObjectReferenceId,
    },
};
use masking::{Mask, Maskable, PeekInterface};
use router_env::logger;
use storage_models::{MerchantGateway, Payment};
use transformers as firekassa;

use crate::{constants::headers, utils};

const ICON: &str = "https://firekassa.com/static/icon.png";

/// FireKassa invoices.
///
/// Notifications are signed with the site key and carry a timestamp. Notifications older than
/// the configured tolerance are rejected.
#[derive(Clone, Copy, Debug)]
pub struct Firekassa {
    webhook_tolerance_secs: i64,
}

impl Default for Firekassa {
    fn default() -> Self {
        Self::new(consts::DEFAULT_WEBHOOK_TOLERANCE_SECS)
    }
}

impl Firekassa {
    pub fn new(webhook_tolerance_secs: i64) -> Self {
        Self {
            webhook_tolerance_secs,
        }
    }

    fn build_headers(
        &self,
        gateway: &MerchantGateway,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> CustomResult<Vec<(String, Maskable<String>)>, GatewayError> {
        let mut header = utils::json_headers(self.common_get_content_type());
        header.append(&mut self.get_auth_header(gateway)?);

        let secret = gateway.gateway_secret.peek();
        if !secret.is_empty() {
            let payload = match body {
                Some(body) => format!("{path}{body}"),
                None => path.to_string(),
            };
            let signature = crypto::HmacSha512
                .sign_message(secret.as_bytes(), payload.as_bytes())
                .change_context(GatewayError::RequestEncodingFailed)?;
            header.push((
                headers::SIGNATURE.to_string(),
                hex::encode(signature).into_masked(),
            ));
        }
        Ok(header)
    }

    fn request(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> CustomResult<Request, GatewayError> {
        let builder = RequestBuilder::new()
            .method(method)
            .url(&utils::build_url(self.base_url(ctx.gateways), path))
            .attach_default_headers()
            .headers(self.build_headers(gateway, path, body.as_ref())?);
        Ok(match body {
            Some(body) => builder.set_body(RequestContent::Json(body)),
            None => builder,
        }
        .build())
    }

    fn check_timestamp(&self, timestamp: &str) -> CustomResult<(), GatewayError> {
        let sent_at = timestamp
            .parse::<i64>()
            .ok()
            .or_else(|| {
                date_time::parse_rfc3339(timestamp).map(|sent| sent.assume_utc().unix_timestamp())
            })
            .ok_or(report!(GatewayError::WebhookTimestampExpired))
            .attach_printable_lazy(|| format!("Unreadable X-Time header {timestamp}"))?;
        let age = date_time::now_unix_timestamp().saturating_sub(sent_at);
        if age.abs() > self.webhook_tolerance_secs {
            return Err(report!(GatewayError::WebhookTimestampExpired))
                .attach_printable(format!("Webhook is {age}s old"));
        }
        Ok(())
    }
}

impl GatewayCommon for Firekassa {
    fn id(&self) -> &'static str {
        "firekassa"
    }

    fn gateway_name(&self) -> GatewayName {
        GatewayName::Firekassa
    }

    fn base_url<'a>(&self, gateways: &'a Gateways) -> &'a str {
        gateways.firekassa.base_url.as_ref()
    }

    fn get_auth_header(
        &self,
        gateway: &MerchantGateway,
    ) -> CustomResult<Vec<(String, Maskable<String>)>, GatewayError> {
        Ok(vec![(
            headers::AUTHORIZATION.to_string(),
            format!("Bearer {}", gateway.gateway_key.peek()).into_masked(),
        )])
    }

    fn build_error_response(&self, res: &Response) -> CustomResult<ErrorResponse, GatewayError> {
        let response: firekassa::FirekassaErrorResponse = res
            .response
            .parse_struct("FirekassaErrorResponse")
            .change_context(GatewayError::ResponseDeserializationFailed)?;
        logger::info!(gateway_response=?response);

        Ok(ErrorResponse {
            status_code: res.status_code,
            code: response
                .code
                .unwrap_or_else(|| consts::NO_ERROR_CODE.to_string()),
            message: response
                .message
                .clone()
                .or(response.error.clone())
                .unwrap_or_else(|| consts::NO_ERROR_MESSAGE.to_string()),
            reason: response.error,
        })
    }
}

#[async_trait::async_trait]
impl Gateway for Firekassa {
    fn info(&self) -> GatewayInfo {
        GatewayInfo {
            name: "firekassa",
            display_name: "FireKassa",
            description: "FireKassa payment gateway for the Russian market",
            supported_payment_types: &["card", "sbp"],
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
        let body = firekassa::FirekassaInvoiceRequest::credential_check(
            common_utils::generate_id_with_default_len("test"),
        )
        .encode_to_value()
        .change_context(GatewayError::RequestEncodingFailed)?;
        let request = self.request(ctx, gateway, Method::Post, "/api/v2/invoices", Some(body))?;

        let response: firekassa::FirekassaInvoiceResponse = utils::send_and_parse(
            self,
            ctx,
            gateway,
            "Test",
            request,
            "FirekassaInvoiceResponse",
        )
        .await?
        .map_err(utils::unexpected)?;

        match (response.error.filter(|error| !error.is_empty()), response.id) {
            (None, Some(_)) => Ok(GatewayTestResponse {
                icon: ICON.to_string(),
                gateway_type: GatewayType::Card,
            }),
            (error, _) => Err(report!(GatewayError::CredentialInvalid)).attach_printable(
                error.unwrap_or_else(|| "invalid request, payment id is empty".to_string()),
            ),
        }
    }

    async fn new_payment(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        request: &GatewayNewPaymentRequest,
    ) -> CustomResult<GatewayNewPaymentResponse, GatewayError> {
        let body = firekassa::FirekassaInvoiceRequest::from(request)
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
        let http_request =
            self.request(ctx, gateway, Method::Post, "/api/v2/invoices", Some(body))?;

        let response: firekassa::FirekassaInvoiceResponse = match utils::send_and_parse(
            self,
            ctx,
            gateway,
            "NewPayment",
            http_request,
            "FirekassaInvoiceResponse",
        )
        .await?
        {
            Ok(response) => response,
            Err(error) if utils::is_validation_rejection(&error) => {
                return Ok(GatewayNewPaymentResponse::rejected(error.describe()))
            }
            Err(error) => return Err(utils::unexpected(error)),
        };

        if let Some(error) = response.error.filter(|error| !error.is_empty()) {
            return Ok(GatewayNewPaymentResponse::rejected(error));
        }
        let gateway_payment_id = response
            .id
            .ok_or(report!(GatewayError::ResponseHandlingFailed))
            .attach_printable("invalid request, payment id is empty")?;

        Ok(GatewayNewPaymentResponse {
            gateway_payment_id: Some(gateway_payment_id.clone()),
            gateway_payment_intent_id: Some(gateway_payment_id),
            redirect_link: response.payment_url,
            status: firekassa::payment_status("process"),
            reason: None,
        })
    }

    async fn payment_detail(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        gateway_payment_id: &str,
    ) -> CustomResult<GatewayPaymentDetail, GatewayError> {
        let http_request = self.request(
            ctx,
            gateway,
            Method::Get,
            &format!("/api/v2/transactions/{gateway_payment_id}"),
            None,
        )?;

        let response: firekassa::FirekassaTransactionResponse = utils::send_and_parse(
            self,
            ctx,
            gateway,
            "PaymentDetail",
            http_request,
            "FirekassaTransactionResponse",
        )
        .await?
        .map_err(utils::unexpected)?;

        if let Some(error) = response.error.as_deref().filter(|error| !error.is_empty()) {
            return Err(report!(GatewayError::ResponseHandlingFailed))
                .attach_printable(format!("FireKassa payment detail failed: {error}"));
        }
        response.into_detail(gateway_payment_id)
    }

    async fn cancel(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        payment: &Payment,
    ) -> CustomResult<GatewayCancelResponse, GatewayError> {
        let gateway_payment_id =
            payment
                .gateway_payment_id
                .as_deref()
                .ok_or(report!(GatewayError::MissingRequiredField {
                    field_name: "gateway_payment_id",
                }))?;
        let http_request = self.request(
            ctx,
            gateway,
            Method::Post,
            &format!("/api/v2/invoices/{gateway_payment_id}/cancel"),
            Some(serde_json::json!({})),
        )?;

        match call_gateway_api(ctx, gateway, "Cancel", http_request).await? {
            Ok(_) => Ok(GatewayCancelResponse {
                status: PaymentStatus::Cancelled,
                reason: None,
            }),
            Err(response) => Err(utils::unexpected(utils::error_response(self, &response))),
        }
    }
}

impl IncomingWebhook for Firekassa {
    fn get_webhook_source_verification_algorithm(
        &self,
        _request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<Box<dyn crypto::VerifySignature + Send>, GatewayError> {
        Ok(Box::new(crypto::HmacSha512))
    }

    /// Signed with the site key rather than a dedicated webhook secret.
    fn get_webhook_source_verification_merchant_secret(
        &self,
        gateway: &MerchantGateway,
    ) -> CustomResult<Vec<u8>, GatewayError> {
        let key = gateway.gateway_key.peek();
        if key.is_empty() {
            return Err(report!(GatewayError::WebhookVerificationSecretNotFound));
        }
        Ok(key.as_bytes().to_vec())
    }

    fn get_webhook_source_verification_signature(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<String, GatewayError> {
        request
            .header(headers::X_SIGN)
            .map(str::to_string)
            .ok_or(report!(GatewayError::WebhookSignatureNotFound))
    }

    fn get_webhook_source_verification_message(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
        _secret: &[u8],
    ) -> CustomResult<Vec<u8>, GatewayError> {
        let timestamp = request
            .header(headers::X_TIME)
            .ok_or(report!(GatewayError::WebhookSignatureNotFound))
            .attach_printable("Missing X-Time header")?;
        let body = parse_webhook_body(request)?;
        Ok(firekassa::webhook_signing_string(&body, timestamp).into_bytes())
    }

    fn verify_webhook_source(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
        gateway: &MerchantGateway,
    ) -> CustomResult<bool, GatewayError> {
        let timestamp = request
            .header(headers::X_TIME)
            .ok_or(report!(GatewayError::WebhookSignatureNotFound))
            .attach_printable("Missing X-Time header")?;
        self.check_timestamp(timestamp)?;

        let secret = self.get_webhook_source_verification_merchant_secret(gateway)?;
        let signature = self.get_webhook_source_verification_signature(request)?;
        let message = self.get_webhook_source_verification_message(request, &secret)?;

        crypto::decode_and_verify(
            &crypto::HmacSha512,
            self.get_webhook_signature_encoding(),
            &secret,
            &signature,
            &message,
        )
        .change_context(GatewayError::WebhookSourceVerificationFailed)
    }

    fn get_webhook_object_reference_id(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<ObjectReferenceId, GatewayError> {
        let body = parse_webhook_body(request)?;
        value_at_path(&body, "id")
            .map(ObjectReferenceId::PaymentId)
            .ok_or(report!(GatewayError::WebhookReferenceIdNotFound))
    }

    fn get_webhook_event_type(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<IncomingWebhookEvent, GatewayError> {
        let body =
            parse_webhook_body(request).change_context(GatewayError::WebhookEventTypeNotFound)?;
        Ok(firekassa::webhook_event(&body))
    }

    fn get_webhook_event_name(&self, request: &IncomingWebhookRequestDetails<'_>) -> Option<String> {
        let body = parse_webhook_body(request).ok()?;
        let transaction_type = value_at_path(&body, "type")?;
        Some(match value_at_path(&body, "status") {
            Some(status) => format!("{transaction_type}.{}", status.to_lowercase()),
            None => transaction_type,
        })
    }

    fn get_webhook_resource_object(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<serde_json::Value, GatewayError> {
        parse_webhook_body(request)
    }

    fn get_webhook_failure_reason(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> Option<String> {
        let body = parse_webhook_body(request).ok()?;
        match (value_at_path(&body, "error_code"), value_at_path(&body, "error")) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (code, message) => message.or(code),
        }
    }

    fn get_webhook_api_response(&self) -> WebhookResponseKind {
        WebhookResponseKind::PlainOk
    }
}
