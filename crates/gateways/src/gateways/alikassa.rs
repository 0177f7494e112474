pub mod transformers;

use common_enums::{GatewayName, GatewayType, PaymentStatus, RefundStatus};
use common_utils::{
    crypto,
    errors::CustomResult,
    ext_traits::{ByteSliceExt, BytesExt, Encode},
    request::{Method, Request, RequestBuilder, RequestContent},
};
use error_stack::{report, ResultExt};
use gateway_interfaces::{
    api::{Gateway, GatewayCommon},
    api_client::{self, GatewayCallContext},
    configs::Gateways,
    consts,
    errors::GatewayError,
    types::{
        ErrorResponse, GatewayCancelResponse, GatewayInfo, GatewayNewPaymentRequest,
        GatewayNewPaymentResponse, GatewayPaymentDetail, GatewayRefundResponse,
        GatewayTestResponse, MerchantBalance, Response, WebhookResponseKind,
    },
    webhooks::{
        IncomingWebhook, IncomingWebhookEvent, IncomingWebhookRequestDetails, ObjectReferenceId,
    },
};
use masking::{Mask, Maskable, PeekInterface};
use router_env::logger;
use storage_models::{MerchantGateway, Payment, Refund};
use transformers as alikassa;

use crate::{constants::headers, utils};

const ICON: &str = "https://alikassa.com/static/icon.svg";

/// AliKassa invoices paid on a hosted card page.
#[derive(Clone, Copy, Debug, Default)]
pub struct Alikassa;

impl Alikassa {
    pub fn new() -> Self {
        Self
    }

    fn parse_webhook(
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<alikassa::AlikassaWebhookBody, GatewayError> {
        request
            .body
            .parse_struct("AlikassaWebhookBody")
            .change_context(GatewayError::WebhookBodyDecodingFailed)
    }

    fn request(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> CustomResult<Request, GatewayError> {
        let mut header = utils::json_headers(self.common_get_content_type());
        header.append(&mut self.get_auth_header(gateway)?);
        let builder = RequestBuilder::new()
            .method(method)
            .url(&utils::build_url(self.base_url(ctx.gateways), path))
            .attach_default_headers()
            .headers(header);
        Ok(match body {
            Some(body) => builder.set_body(RequestContent::Json(body)),
            None => builder,
        }
        .build())
    }

    /// Cancellation endpoints answer with the envelope only, the outcome is its `success` flag.
    async fn cancel_object(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        operation: &'static str,
        path: String,
    ) -> CustomResult<Result<(), String>, GatewayError> {
        let http_request =
            self.request(ctx, gateway, Method::Post, &path, Some(serde_json::json!({})))?;
        let response: alikassa::AlikassaResponse<serde_json::Value> = utils::send_and_parse(
            self,
            ctx,
            gateway,
            operation,
            http_request,
            "AlikassaCancelResponse",
        )
        .await?
        .map_err(utils::unexpected)?;
        Ok(response.into_result().map(|_| ()))
    }
}

impl GatewayCommon for Alikassa {
    fn id(&self) -> &'static str {
        "alikassa"
    }

    fn gateway_name(&self) -> GatewayName {
        GatewayName::Alikassa
    }

    fn base_url<'a>(&self, gateways: &'a Gateways) -> &'a str {
        gateways.alikassa.base_url.as_ref()
    }

    /// `gateway_key` is the shop id, `gateway_secret` the API secret.
    fn get_auth_header(
        &self,
        gateway: &MerchantGateway,
    ) -> CustomResult<Vec<(String, Maskable<String>)>, GatewayError> {
        Ok(vec![
            (
                headers::AUTHORIZATION.to_string(),
                format!("Bearer {}", gateway.gateway_key.peek()).into_masked(),
            ),
            (
                headers::X_API_SECRET.to_string(),
                gateway.gateway_secret.clone().into_masked(),
            ),
        ])
    }

    fn build_error_response(&self, res: &Response) -> CustomResult<ErrorResponse, GatewayError> {
        let response: alikassa::AlikassaErrorResponse = res
            .response
            .parse_struct("AlikassaErrorResponse")
            .change_context(GatewayError::ResponseDeserializationFailed)?;
        logger::info!(gateway_response=?response);

        Ok(ErrorResponse {
            status_code: res.status_code,
            code: response
                .code
                .unwrap_or_else(|| consts::NO_ERROR_CODE.to_string()),
            message: response
                .error
                .clone()
                .unwrap_or_else(|| consts::NO_ERROR_MESSAGE.to_string()),
            reason: response.error,
        })
    }
}

#[async_trait::async_trait]
impl Gateway for Alikassa {
    fn info(&self) -> GatewayInfo {
        GatewayInfo {
            name: "alikassa",
            display_name: "AliKassa",
            description: "AliKassa payment gateway for the Russian market",
            supported_payment_types: &["card"],
            auto_charge: false,
            is_staging: true,
            gateway_type: GatewayType::Card,
            webhook_response: self.get_webhook_api_response(),
        }
    }

    async fn test(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
    ) -> CustomResult<GatewayTestResponse, GatewayError> {
        let request = self.request(ctx, gateway, Method::Get, "/test", None)?;
        match api_client::call_gateway_api(ctx, gateway, "Test", request).await? {
            Ok(_) => Ok(GatewayTestResponse {
                icon: ICON.to_string(),
                gateway_type: GatewayType::Card,
            }),
            Err(response) => Err(utils::unexpected(utils::error_response(self, &response))),
        }
    }

    async fn new_payment(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        request: &GatewayNewPaymentRequest,
    ) -> CustomResult<GatewayNewPaymentResponse, GatewayError> {
        let body = alikassa::AlikassaInvoiceRequest::from(request)
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
        let http_request =
            self.request(ctx, gateway, Method::Post, "/api/v1/invoice/create", Some(body))?;

        let response: alikassa::AlikassaResponse<alikassa::AlikassaInvoiceData> =
            match utils::send_and_parse(
                self,
                ctx,
                gateway,
                "NewPayment",
                http_request,
                "AlikassaInvoiceResponse",
            )
            .await?
            {
                Ok(response) => response,
                Err(error) if utils::is_validation_rejection(&error) => {
                    return Ok(GatewayNewPaymentResponse::rejected(error.describe()))
                }
                Err(error) => return Err(utils::unexpected(error)),
            };

        match response.into_result() {
            Ok(invoice) => Ok(GatewayNewPaymentResponse {
                gateway_payment_id: Some(invoice.invoice_id.clone()),
                gateway_payment_intent_id: Some(invoice.invoice_id),
                redirect_link: invoice.link,
                status: alikassa::payment_status(&invoice.status),
                reason: None,
            }),
            Err(reason) => Ok(GatewayNewPaymentResponse::rejected(format!(
                "AliKassa payment creation failed: {reason}"
            ))),
        }
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
            &format!("/api/v1/invoice/{gateway_payment_id}"),
            None,
        )?;

        let response: alikassa::AlikassaResponse<alikassa::AlikassaInvoiceData> =
            utils::send_and_parse(
                self,
                ctx,
                gateway,
                "PaymentDetail",
                http_request,
                "AlikassaInvoiceDetailResponse",
            )
            .await?
            .map_err(utils::unexpected)?;

        response
            .into_result()
            .map(GatewayPaymentDetail::from)
            .map_err(|error| {
                report!(GatewayError::ResponseHandlingFailed)
                    .attach_printable(format!("AliKassa payment detail failed: {error}"))
            })
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

        Ok(
            match self
                .cancel_object(
                    ctx,
                    gateway,
                    "Cancel",
                    format!("/api/v1/invoice/{gateway_payment_id}/cancel"),
                )
                .await?
            {
                Ok(()) => GatewayCancelResponse {
                    status: PaymentStatus::Cancelled,
                    reason: None,
                },
                Err(reason) => GatewayCancelResponse {
                    status: payment.status,
                    reason: Some(reason),
                },
            },
        )
    }

    async fn refund(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        payment: &Payment,
        refund: &Refund,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        let body = alikassa::AlikassaRefundRequest::try_from((payment, refund))?
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
        let http_request =
            self.request(ctx, gateway, Method::Post, "/api/v1/refund/create", Some(body))?;

        let response: alikassa::AlikassaResponse<alikassa::AlikassaRefundData> =
            match utils::send_and_parse(
                self,
                ctx,
                gateway,
                "Refund",
                http_request,
                "AlikassaRefundResponse",
            )
            .await?
            {
                Ok(response) => response,
                Err(error) if utils::is_validation_rejection(&error) => {
                    return Ok(GatewayRefundResponse::rejected(error.describe()))
                }
                Err(error) => return Err(utils::unexpected(error)),
            };

        Ok(match response.into_result() {
            Ok(data) => data.into(),
            Err(error) => {
                GatewayRefundResponse::rejected(format!("AliKassa refund failed: {error}"))
            }
        })
    }

    async fn refund_detail(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        gateway_refund_id: &str,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        let http_request = self.request(
            ctx,
            gateway,
            Method::Get,
            &format!("/api/v1/refund/{gateway_refund_id}"),
            None,
        )?;

        let response: alikassa::AlikassaResponse<alikassa::AlikassaRefundData> =
            utils::send_and_parse(
                self,
                ctx,
                gateway,
                "RefundDetail",
                http_request,
                "AlikassaRefundResponse",
            )
            .await?
            .map_err(utils::unexpected)?;

        response
            .into_result()
            .map(GatewayRefundResponse::from)
            .map_err(|error| {
                report!(GatewayError::ResponseHandlingFailed)
                    .attach_printable(format!("AliKassa refund detail failed: {error}"))
            })
    }

    async fn refund_cancel(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        refund: &Refund,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        let gateway_refund_id =
            refund
                .gateway_refund_id
                .as_deref()
                .ok_or(report!(GatewayError::MissingRequiredField {
                    field_name: "gateway_refund_id",
                }))?;
        let outcome = self
            .cancel_object(
                ctx,
                gateway,
                "RefundCancel",
                format!("/api/v1/refund/{gateway_refund_id}/cancel"),
            )
            .await?;

        Ok(GatewayRefundResponse {
            gateway_refund_id: Some(gateway_refund_id.to_string()),
            status: if outcome.is_ok() {
                RefundStatus::Cancelled
            } else {
                refund.status
            },
            refund_amount: Some(refund.refund_amount),
            reason: outcome.err(),
        })
    }

    /// AliKassa has no balance endpoint, a zero rouble balance is reported.
    async fn merchant_balances_query(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
    ) -> CustomResult<Vec<MerchantBalance>, GatewayError> {
        Ok(vec![MerchantBalance {
            currency: "RUB".to_string(),
            amount: 0,
        }])
    }
}

impl IncomingWebhook for Alikassa {
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
            .header(headers::X_ALIKASSA_SIGNATURE)
            .map(str::to_string)
            .ok_or(report!(GatewayError::WebhookSignatureNotFound))
    }

    fn get_webhook_object_reference_id(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<ObjectReferenceId, GatewayError> {
        let body = Self::parse_webhook(request)?;
        match (body.event.as_str(), body.payment, body.refund) {
            ("refund.finished", _, Some(refund)) => Ok(ObjectReferenceId::RefundId(refund.id)),
            ("payment.finished", Some(payment), _) => Ok(ObjectReferenceId::PaymentId(payment.id)),
            _ => Err(report!(GatewayError::WebhookReferenceIdNotFound)),
        }
    }

    fn get_webhook_event_type(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<IncomingWebhookEvent, GatewayError> {
        Ok(Self::parse_webhook(request)
            .change_context(GatewayError::WebhookEventTypeNotFound)?
            .event_type())
    }

    fn get_webhook_event_name(&self, request: &IncomingWebhookRequestDetails<'_>) -> Option<String> {
        Self::parse_webhook(request).ok().map(|body| body.event)
    }

    fn get_webhook_resource_object(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<serde_json::Value, GatewayError> {
        let body: serde_json::Value = request
            .body
            .parse_struct("AlikassaWebhookBody")
            .change_context(GatewayError::WebhookBodyDecodingFailed)?;
        let key = match body.get("event").and_then(serde_json::Value::as_str) {
            Some("refund.finished") => "refund",
            _ => "payment",
        };
        body.get(key)
            .cloned()
            .ok_or(report!(GatewayError::WebhookResourceObjectNotFound))
    }

    fn get_webhook_failure_reason(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> Option<String> {
        Self::parse_webhook(request)
            .ok()
            .and_then(|body| body.object_status())
            .map(|status| format!("AliKassa status {status}"))
    }

    fn get_webhook_api_response(&self) -> WebhookResponseKind {
        WebhookResponseKind::JsonStatusOk
    }
}
