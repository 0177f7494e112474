pub mod transformers;

use common_enums::{GatewayName, GatewayType, PaymentStatus, RefundStatus};
use common_utils::{
    crypto::{self, SignatureEncoding},
    errors::CustomResult,
    ext_traits::{ByteSliceExt, BytesExt, Encode},
    request::{Method, Request, RequestBuilder, RequestContent},
};
use error_stack::{report, ResultExt};
use gateway_interfaces::{
    api::{format_decimal_units, parse_decimal_units, Gateway, GatewayCommon},
    api_client::{self, GatewayCallContext},
    configs::Gateways,
    consts,
    errors::GatewayError,
    types::{
        CryptoFiatTransRequest, CryptoFiatTransResponse, ErrorResponse, GatewayCancelResponse,
        GatewayInfo, GatewayNewPaymentRequest, GatewayNewPaymentResponse, GatewayPaymentDetail,
        GatewayRefundResponse, GatewayTestResponse, MerchantBalance, Response,
        WebhookResponseKind,
    },
    webhooks::{
        self, IncomingWebhook, IncomingWebhookEvent, IncomingWebhookRequestDetails,
        ObjectReferenceId,
    },
};
use masking::{Mask, Maskable, PeekInterface};
use router_env::logger;
use serde::de::DeserializeOwned;
use storage_models::{MerchantGateway, Payment, Refund};
use transformers as blockonomics;

use crate::{constants::headers, utils};

const ICON: &str = "https://www.blockonomics.co/img/logo.png";

/// Fresh addresses requested before giving up on finding an unused one
const MAX_ADDRESS_ATTEMPTS: u32 = 5;

/// Callback query parameter carrying the merchant's webhook secret
const CALLBACK_SECRET_PARAM: &str = "secret";

const CALLBACK_FIELDS: [&str; 5] = ["addr", "status", "crypto", "txid", "value"];

/// Bitcoin payments to a fresh Blockonomics address per payment.
///
/// `gateway_secret` is the Blockonomics API key. Callbacks carry no signature, the merchant
/// appends `?secret=<webhook secret>` to the callback URL configured at Blockonomics.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blockonomics;

impl Blockonomics {
    pub fn new() -> Self {
        Self
    }

    fn request(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: Option<&MerchantGateway>,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> CustomResult<Request, GatewayError> {
        let mut header = utils::json_headers(self.common_get_content_type());
        if let Some(gateway) = gateway {
            header.append(&mut self.get_auth_header(gateway)?);
        }
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

    /// Calls made for a merchant instance are audited, the public price feed is only logged.
    async fn send<T: DeserializeOwned>(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: Option<&MerchantGateway>,
        operation: &'static str,
        request: Request,
        type_name: &'static str,
    ) -> CustomResult<Result<T, ErrorResponse>, GatewayError> {
        if let Some(gateway) = gateway {
            return utils::send_and_parse(self, ctx, gateway, operation, request, type_name).await;
        }

        logger::info!(operation, url = %request.url, "calling blockonomics");
        let response = ctx
            .api_client
            .send_request(request, ctx.gateways.request_timeout())
            .await
            .map_err(|error| {
                let context = if error.current_context().is_timeout_or_connection_error() {
                    GatewayError::ProviderUnavailable
                } else {
                    GatewayError::ResponseHandlingFailed
                };
                error.change_context(context)
            })?;
        if !response.is_success() {
            return Ok(Err(utils::error_response(self, &response)));
        }
        response
            .response
            .parse_struct(type_name)
            .change_context(GatewayError::ResponseDeserializationFailed)
            .map(Ok)
    }

    /// Fiat price of one coin.
    async fn price(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: Option<&MerchantGateway>,
        crypto: &str,
        currency: &str,
    ) -> CustomResult<f64, GatewayError> {
        let path = format!(
            "/api/price?crypto={}&currency={}",
            crypto.to_ascii_uppercase(),
            currency.to_ascii_uppercase()
        );
        let request = self.request(ctx, gateway, Method::Get, &path, None)?;
        let response: blockonomics::BlockonomicsPriceResponse = self
            .send(ctx, gateway, "Price", request, "BlockonomicsPriceResponse")
            .await?
            .map_err(utils::unexpected)?;

        if response.price.is_finite() && response.price > 0.0 {
            Ok(response.price)
        } else {
            Err(report!(GatewayError::ResponseHandlingFailed)
                .attach_printable(format!("Invalid {crypto} price {}", response.price)))
        }
    }

    async fn address_balance(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        operation: &'static str,
        address: &str,
    ) -> CustomResult<blockonomics::BlockonomicsAddressBalance, GatewayError> {
        let body = blockonomics::BlockonomicsBalanceRequest {
            addr: address.to_string(),
        }
        .encode_to_value()
        .change_context(GatewayError::RequestEncodingFailed)?;
        let request = self.request(ctx, Some(gateway), Method::Post, "/api/balance", Some(body))?;
        let response: blockonomics::BlockonomicsBalanceResponse = self
            .send(ctx, Some(gateway), operation, request, "BlockonomicsBalanceResponse")
            .await?
            .map_err(utils::unexpected)?;
        Ok(response.of(address))
    }

    /// An address that never received funds, so its whole confirmed balance belongs to the
    /// payment. `Ok(Err(_))` carries a provider rejection.
    async fn unused_address(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        webhook_url: &str,
    ) -> CustomResult<Result<String, String>, GatewayError> {
        for attempt in 1..=MAX_ADDRESS_ATTEMPTS {
            let body = blockonomics::BlockonomicsNewAddressRequest {
                match_callback: webhook_url.to_string(),
            }
            .encode_to_value()
            .change_context(GatewayError::RequestEncodingFailed)?;
            let request = self.request(
                ctx,
                Some(gateway),
                Method::Post,
                &format!("/api/new_address?crypto={}", blockonomics::PAYMENT_CRYPTO),
                Some(body),
            )?;
            let response: blockonomics::BlockonomicsNewAddressResponse = match self
                .send(
                    ctx,
                    Some(gateway),
                    "NewAddress",
                    request,
                    "BlockonomicsNewAddressResponse",
                )
                .await?
            {
                Ok(response) => response,
                Err(error) if utils::is_validation_rejection(&error) => {
                    return Ok(Err(error.describe()))
                }
                Err(error) => return Err(utils::unexpected(error)),
            };
            let address = response
                .address
                .filter(|address| !address.is_empty())
                .ok_or(report!(GatewayError::ResponseHandlingFailed))
                .attach_printable("Blockonomics returned no address")?;

            let balance = self
                .address_balance(ctx, gateway, "AddressBalance", &address)
                .await?;
            if balance.confirmed == 0 && balance.unconfirmed == 0 {
                return Ok(Ok(address));
            }
            logger::warn!(
                %address,
                attempt,
                confirmed = balance.confirmed,
                unconfirmed = balance.unconfirmed,
                "blockonomics address already holds funds, requesting another"
            );
        }

        Err(report!(GatewayError::ResponseHandlingFailed)).attach_printable(format!(
            "No unused Blockonomics address after {MAX_ADDRESS_ATTEMPTS} attempts"
        ))
    }

    /// Callback fields from the JSON body, or from the query string of a GET callback.
    fn callback_value(
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<serde_json::Value, GatewayError> {
        if request.body.is_empty() {
            return Ok(serde_json::Value::Object(
                CALLBACK_FIELDS
                    .into_iter()
                    .filter_map(|field| {
                        webhooks::query_param(request, field)
                            .map(|value| (field.to_string(), serde_json::Value::String(value)))
                    })
                    .collect(),
            ));
        }
        request
            .body
            .parse_struct("BlockonomicsCallback")
            .change_context(GatewayError::WebhookBodyDecodingFailed)
    }

    fn parse_callback(
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<blockonomics::BlockonomicsCallback, GatewayError> {
        serde_json::from_value(Self::callback_value(request)?)
            .change_context(GatewayError::WebhookBodyDecodingFailed)
    }
}

impl GatewayCommon for Blockonomics {
    fn id(&self) -> &'static str {
        "blockonomics"
    }

    fn gateway_name(&self) -> GatewayName {
        GatewayName::Blockonomics
    }

    fn base_url<'a>(&self, gateways: &'a Gateways) -> &'a str {
        gateways.blockonomics.base_url.as_ref()
    }

    fn get_auth_header(
        &self,
        gateway: &MerchantGateway,
    ) -> CustomResult<Vec<(String, Maskable<String>)>, GatewayError> {
        Ok(vec![(
            headers::AUTHORIZATION.to_string(),
            format!("Bearer {}", gateway.gateway_secret.peek()).into_masked(),
        )])
    }

    fn build_error_response(&self, res: &Response) -> CustomResult<ErrorResponse, GatewayError> {
        let response: blockonomics::BlockonomicsErrorResponse = res
            .response
            .parse_struct("BlockonomicsErrorResponse")
            .change_context(GatewayError::ResponseDeserializationFailed)?;
        logger::info!(gateway_response=?response);

        let message = response.message.or(response.error);
        Ok(ErrorResponse {
            status_code: res.status_code,
            code: consts::NO_ERROR_CODE.to_string(),
            message: message
                .clone()
                .unwrap_or_else(|| consts::NO_ERROR_MESSAGE.to_string()),
            reason: message,
        })
    }
}

#[async_trait::async_trait]
impl Gateway for Blockonomics {
    fn info(&self) -> GatewayInfo {
        GatewayInfo {
            name: "blockonomics",
            display_name: "Blockonomics",
            description: "Bitcoin payments to a fresh address per payment",
            supported_payment_types: &[blockonomics::PAYMENT_CRYPTO],
            auto_charge: false,
            is_staging: false,
            gateway_type: GatewayType::Crypto,
            webhook_response: self.get_webhook_api_response(),
        }
    }

    async fn test(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
    ) -> CustomResult<GatewayTestResponse, GatewayError> {
        let request = self.request(ctx, Some(gateway), Method::Get, "/api/currencies", None)?;
        match api_client::call_gateway_api(ctx, gateway, "Test", request).await? {
            Ok(_) => Ok(GatewayTestResponse {
                icon: ICON.to_string(),
                gateway_type: GatewayType::Crypto,
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
        let crypto = blockonomics::payment_crypto(&gateway.payment_types);
        if crypto != blockonomics::PAYMENT_CRYPTO {
            return Ok(GatewayNewPaymentResponse::rejected(format!(
                "Blockonomics payments in {crypto} are not supported"
            )));
        }

        let price = self
            .price(ctx, Some(gateway), &crypto, &request.currency)
            .await?;
        let satoshis =
            blockonomics::crypto_units(request.amount, &request.currency, &crypto, price)?;
        let address = match self
            .unused_address(ctx, gateway, &request.webhook_url)
            .await?
        {
            Ok(address) => address,
            Err(reason) => return Ok(GatewayNewPaymentResponse::rejected(reason)),
        };
        logger::info!(
            payment_id = %request.payment_id,
            %address,
            satoshis,
            price,
            "blockonomics address assigned"
        );

        Ok(GatewayNewPaymentResponse {
            gateway_payment_id: Some(address.clone()),
            gateway_payment_intent_id: Some(address.clone()),
            redirect_link: Some(blockonomics::payment_uri(&address, satoshis)),
            status: PaymentStatus::Created,
            reason: None,
        })
    }

    async fn payment_detail(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        gateway_payment_id: &str,
    ) -> CustomResult<GatewayPaymentDetail, GatewayError> {
        self.address_balance(ctx, gateway, "PaymentDetail", gateway_payment_id)
            .await
            .map(GatewayPaymentDetail::from)
    }

    /// Nothing to cancel at the provider, an abandoned address simply receives no funds.
    async fn cancel(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _payment: &Payment,
    ) -> CustomResult<GatewayCancelResponse, GatewayError> {
        Ok(GatewayCancelResponse {
            status: PaymentStatus::Cancelled,
            reason: None,
        })
    }

    /// Bitcoin is returned by the merchant, the refund stays open until they mark it.
    async fn refund(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _payment: &Payment,
        refund: &Refund,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        Ok(GatewayRefundResponse {
            gateway_refund_id: Some(refund.refund_id.clone()),
            status: RefundStatus::Created,
            refund_amount: Some(refund.refund_amount),
            reason: None,
        })
    }

    async fn refund_cancel(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        refund: &Refund,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        Ok(GatewayRefundResponse {
            gateway_refund_id: refund.gateway_refund_id.clone(),
            status: RefundStatus::Cancelled,
            refund_amount: Some(refund.refund_amount),
            reason: refund.reason.clone(),
        })
    }

    async fn merchant_balances_query(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
    ) -> CustomResult<Vec<MerchantBalance>, GatewayError> {
        let request = self.request(ctx, Some(gateway), Method::Get, "/api/balance", None)?;
        let response: blockonomics::BlockonomicsAccountBalance = self
            .send(
                ctx,
                Some(gateway),
                "MerchantBalancesQuery",
                request,
                "BlockonomicsAccountBalance",
            )
            .await?
            .map_err(utils::unexpected)?;

        let Some(btc) = response.btc else {
            return Ok(Vec::new());
        };
        let exponent = blockonomics::crypto_exponent(blockonomics::PAYMENT_CRYPTO);
        Ok(vec![MerchantBalance {
            currency: blockonomics::PAYMENT_CRYPTO.to_string(),
            amount: parse_decimal_units(&btc.to_string(), exponent)?,
        }])
    }

    async fn crypto_fiat_trans(
        &self,
        ctx: &GatewayCallContext<'_>,
        request: &CryptoFiatTransRequest,
    ) -> CustomResult<CryptoFiatTransResponse, GatewayError> {
        let price = self
            .price(ctx, None, &request.crypto_currency, &request.fiat_currency)
            .await?;
        let units = blockonomics::crypto_units(
            request.amount,
            &request.fiat_currency,
            &request.crypto_currency,
            price,
        )?;

        Ok(CryptoFiatTransResponse {
            crypto_amount: format_decimal_units(
                units,
                blockonomics::crypto_exponent(&request.crypto_currency),
            ),
            rate: price.to_string(),
        })
    }
}

impl IncomingWebhook for Blockonomics {
    fn get_webhook_source_verification_algorithm(
        &self,
        _request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<Box<dyn crypto::VerifySignature + Send>, GatewayError> {
        Ok(Box::new(crypto::SharedSecret))
    }

    fn get_webhook_signature_encoding(&self) -> SignatureEncoding {
        SignatureEncoding::Plain
    }

    fn get_webhook_source_verification_signature(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<String, GatewayError> {
        webhooks::query_param(request, CALLBACK_SECRET_PARAM)
            .ok_or(report!(GatewayError::WebhookSignatureNotFound))
    }

    fn get_webhook_object_reference_id(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<ObjectReferenceId, GatewayError> {
        Self::parse_callback(request)?
            .reference()
            .map(ObjectReferenceId::PaymentId)
            .ok_or(report!(GatewayError::WebhookReferenceIdNotFound))
    }

    fn get_webhook_event_type(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<IncomingWebhookEvent, GatewayError> {
        Ok(Self::parse_callback(request)
            .change_context(GatewayError::WebhookEventTypeNotFound)?
            .event_type())
    }

    fn get_webhook_event_name(&self, request: &IncomingWebhookRequestDetails<'_>) -> Option<String> {
        Self::parse_callback(request)
            .ok()
            .map(|callback| callback.status_label().to_string())
    }

    fn get_webhook_resource_object(
        &self,
        request: &IncomingWebhookRequestDetails<'_>,
    ) -> CustomResult<serde_json::Value, GatewayError> {
        Self::callback_value(request)
    }

    fn get_webhook_api_response(&self) -> WebhookResponseKind {
        WebhookResponseKind::PlainOk
    }
}
