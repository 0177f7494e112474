pub mod transformers;

use common_enums::{GatewayName, GatewayType, PaymentStatus, RefundStatus};
use common_utils::{
    crypto,
    errors::CustomResult,
    ext_traits::{ByteSliceExt, BytesExt, Encode},
    request::{Method, RequestBuilder, RequestContent},
};
use error_stack::{report, ResultExt};
use gateway_interfaces::{
    api::{Gateway, GatewayCommon},
    api_client::GatewayCallContext,
    configs::Gateways,
    consts,
    errors::GatewayError,
    types::{
        ErrorResponse, GatewayCancelResponse, GatewayInfo, GatewayNewPaymentRequest,
        GatewayNewPaymentResponse, GatewayPaymentDetail, GatewayRefundResponse,
        GatewayTestResponse, Response, WebhookResponseKind,
    },
    webhooks::{IncomingWebhook, IncomingWebhookEvent, IncomingWebhookRequestDetails, ObjectReferenceId},
};
use masking::{Mask, Maskable, PeekInterface};
use router_env::logger;
use storage_models::{MerchantGateway, Payment, Refund};
use transformers as mulenpay;

use crate::{constants::headers, utils};

const ICON: &str = "https://mulenpay.ru/static/icon.svg";

/// MulenPay hosted card payments.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mulenpay;

impl Mulenpay {
    pub fn new() -> Self {
        Self
    }

    fn parse_webhook(
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<mulenpay::MulenpayWebhookBody, GatewayError> {
        request
            .body
            .parse_struct("MulenpayWebhookBody")
            .change_context(GatewayError::WebhookBodyDecodingFailed)
    }

    fn build_headers(
        &self,
        gateway: &MerchantGateway,
    ) -> CustomResult<Vec<(String, Maskable<String>)>, GatewayError> {
        let mut header = utils::json_headers(self.common_get_content_type());
        header.append(&mut self.get_auth_header(gateway)?);
        Ok(header)
    }

    fn request(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> CustomResult<common_utils::request::Request, GatewayError> {
        let builder = RequestBuilder::new()
            .method(method)
            .url(&utils::build_url(self.base_url(ctx.gateways), path))
            .attach_default_headers()
            .headers(self.build_headers(gateway)?);
        Ok(match body {
            Some(body) => builder.set_body(RequestContent::Json(body)),
            None => builder,
        }
        .build())
    }
}

impl GatewayCommon for Mulenpay {
    fn id(&self) -> &'static str {
        "mulenpay"
    }

    fn gateway_name(&self) -> GatewayName {
        GatewayName::Mulenpay
    }

    fn base_url<'a>(&self, gateways: &'a Gateways) -> &'a str {
        gateways.mulenpay.base_url.as_ref()
    }

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
        let response: mulenpay::MulenpayErrorResponse = res
            .response
            .parse_struct("MulenpayErrorResponse")
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
impl Gateway for Mulenpay {
    fn info(&self) -> GatewayInfo {
        GatewayInfo {
            name: "mulenpay",
            display_name: "MulenPay",
            description: "MulenPay payment gateway for the Russian market",
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
        match gateway_interfaces::api_client::call_gateway_api(ctx, gateway, "Test", request)
            .await?
        {
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
        let body = mulenpay::MulenpayPaymentsRequest::from(request)
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
        let http_request =
            self.request(ctx, gateway, Method::Post, "/api/v2/payments", Some(body))?;

        let response: mulenpay::MulenpayResponse<mulenpay::MulenpayPaymentData> =
            match utils::send_and_parse(
                self,
                ctx,
                gateway,
                "NewPayment",
                http_request,
                "MulenpayPaymentResponse",
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
            Ok(data) => Ok(GatewayNewPaymentResponse {
                gateway_payment_id: Some(data.payment_id.clone()),
                gateway_payment_intent_id: Some(data.payment_id),
                redirect_link: data.link,
                status: mulenpay::payment_status(&data.status),
                reason: None,
            }),
            Err(reason) => Ok(GatewayNewPaymentResponse::rejected(reason)),
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
            &format!("/api/v2/payments/{gateway_payment_id}"),
            None,
        )?;

        let response: mulenpay::MulenpayResponse<mulenpay::MulenpayPaymentData> =
            utils::send_and_parse(
                self,
                ctx,
                gateway,
                "PaymentDetail",
                http_request,
                "MulenpayPaymentDetailResponse",
            )
            .await?
            .map_err(utils::unexpected)?;

        response
            .into_result()
            .map(GatewayPaymentDetail::from)
            .map_err(|error| {
                report!(GatewayError::ResponseHandlingFailed)
                    .attach_printable(format!("MulenPay payment detail failed: {error}"))
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
        let http_request = self.request(
            ctx,
            gateway,
            Method::Post,
            &format!("/api/v2/payments/{gateway_payment_id}/cancel"),
            Some(serde_json::json!({})),
        )?;

        let response: mulenpay::MulenpayResponse<serde_json::Value> = utils::send_and_parse(
            self,
            ctx,
            gateway,
            "Cancel",
            http_request,
            "MulenpayCancelResponse",
        )
        .await?
        .map_err(utils::unexpected)?;

        match response.into_result() {
            Ok(_) => Ok(GatewayCancelResponse {
                status: PaymentStatus::Cancelled,
                reason: None,
            }),
            Err(reason) => Ok(GatewayCancelResponse {
                status: payment.status,
                reason: Some(reason),
            }),
        }
    }

    async fn refund(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        payment: &Payment,
        refund: &Refund,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        let body = mulenpay::MulenpayRefundRequest::try_from((payment, refund))?
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
        let http_request =
            self.request(ctx, gateway, Method::Post, "/api/v2/refunds", Some(body))?;

        let response: mulenpay::MulenpayResponse<mulenpay::MulenpayRefundData> =
            match utils::send_and_parse(
                self,
                ctx,
                gateway,
                "Refund",
                http_request,
                "MulenpayRefundResponse",
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
            Err(error) => GatewayRefundResponse::rejected(format!("MulenPay refund failed: {error}")),
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
            &format!("/api/v2/refunds/{gateway_refund_id}"),
            None,
        )?;

        let response: mulenpay::MulenpayResponse<mulenpay::MulenpayRefundData> =
            utils::send_and_parse(
                self,
                ctx,
                gateway,
                "RefundDetail",
                http_request,
                "MulenpayRefundResponse",
            )
            .await?
            .map_err(utils::unexpected)?;

        response
            .into_result()
            .map(GatewayRefundResponse::from)
            .map_err(|error| {
                report!(GatewayError::ResponseHandlingFailed)
                    .attach_printable(format!("MulenPay refund detail failed: {error}"))
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
        let http_request = self.request(
            ctx,
            gateway,
            Method::Post,
            &format!("/api/v2/refunds/{gateway_refund_id}/cancel"),
            Some(serde_json::json!({})),
        )?;

        let response: mulenpay::MulenpayResponse<serde_json::Value> = utils::send_and_parse(
            self,
            ctx,
            gateway,
            "RefundCancel",
            http_request,
            "MulenpayRefundCancelResponse",
        )
        .await?
        .map_err(utils::unexpected)?;

        Ok(match response.into_result() {
            Ok(_) => GatewayRefundResponse {
                gateway_refund_id: Some(gateway_refund_id.to_string()),
                status: RefundStatus::Cancelled,
                refund_amount: Some(refund.refund_amount),
                reason: None,
            },
            Err(reason) => GatewayRefundResponse {
                gateway_refund_id: Some(gateway_refund_id.to_string()),
                status: refund.status,
                refund_amount: Some(refund.refund_amount),
                reason: Some(reason),
            },
        })
    }
}

impl IncomingWebhook for Mulenpay {
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
            .header(headers::X_MULENPAY_SIGNATURE)
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
            (_, Some(payment), _) => Ok(ObjectReferenceId::PaymentId(payment.id)),
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
            .parse_struct("MulenpayWebhookBody")
            .change_context(GatewayError::WebhookBodyDecodingFailed)?;
        body.get("refund")
            .or_else(|| body.get("payment"))
            .cloned()
            .ok_or(report!(GatewayError::WebhookResourceObjectNotFound))
    }

    fn get_webhook_failure_reason(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> Option<String> {
        Self::parse_webhook(request).ok().and_then(|body| {
            body.refund
                .or(body.payment)
                .and_then(|object| object.reason.or(object.status))
        })
    }

    fn get_webhook_api_response(&self) -> WebhookResponseKind {
        WebhookResponseKind::JsonStatusOk
    }
}
