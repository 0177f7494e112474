//! Capability interface implemented by every payment provider adapter

use common_enums::GatewayName;
use common_utils::{errors::CustomResult, ext_traits::BytesExt};
use error_stack::{report, ResultExt};
use masking::Maskable;
use storage_models::{MerchantGateway, Payment, Refund};

use crate::{
    api_client::GatewayCallContext,
    configs::Gateways,
    consts,
    errors::GatewayError,
    types::{
        CryptoFiatTransRequest, CryptoFiatTransResponse, ErrorResponse, GatewayCancelResponse,
        GatewayCaptureResponse, GatewayInfo, GatewayNewPaymentRequest, GatewayNewPaymentResponse,
        GatewayPaymentDetail, GatewayPaymentMethod, GatewayPaymentMethodRequest,
        GatewayRefundResponse, GatewayTestResponse, MerchantBalance, Response,
    },
    webhooks::IncomingWebhook,
};

/// Generic error body, used when an adapter has no specific error shape.
#[derive(Debug, serde::Deserialize)]
struct GenericErrorResponse {
    code: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Common behaviour of every adapter
pub trait GatewayCommon {
    /// Name of the adapter, matches `MerchantGateway::gateway_name`
    fn id(&self) -> &'static str;

    fn gateway_name(&self) -> GatewayName;

    fn common_get_content_type(&self) -> &'static str {
        "application/json"
    }

    /// The base URL for interacting with the provider's API.
    fn base_url<'a>(&self, gateways: &'a Gateways) -> &'a str;

    /// HTTP headers used for authorization.
    fn get_auth_header(
        &self,
        _gateway: &MerchantGateway,
    ) -> CustomResult<Vec<(String, Maskable<String>)>, GatewayError> {
        Ok(Vec::new())
    }

    /// Normalise a non-2xx provider response.
    fn build_error_response(&self, res: &Response) -> CustomResult<ErrorResponse, GatewayError> {
        let response: GenericErrorResponse = res
            .response
            .parse_struct("GenericErrorResponse")
            .change_context(GatewayError::ResponseDeserializationFailed)?;

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
            reason: response.error.or(response.message),
        })
    }
}

/// Capabilities of a payment provider.
///
/// Every operation takes the merchant's gateway instance explicitly. Capabilities an adapter does
/// not override fail with [`GatewayError::NotSupported`].
#[async_trait::async_trait]
pub trait Gateway: GatewayCommon + IncomingWebhook + Send + Sync {
    fn info(&self) -> GatewayInfo;

    /// Validate credentials before an instance is saved.
    async fn test(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
    ) -> CustomResult<GatewayTestResponse, GatewayError>;

    /// Provider validation errors are returned as a `Failed` response with a reason.
    async fn new_payment(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        request: &GatewayNewPaymentRequest,
    ) -> CustomResult<GatewayNewPaymentResponse, GatewayError>;

    async fn payment_detail(
        &self,
        ctx: &GatewayCallContext<'_>,
        gateway: &MerchantGateway,
        gateway_payment_id: &str,
    ) -> CustomResult<GatewayPaymentDetail, GatewayError>;

    async fn capture(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _payment: &Payment,
    ) -> CustomResult<GatewayCaptureResponse, GatewayError> {
        Err(GatewayError::not_supported("Capture", self.id()).into())
    }

    async fn cancel(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _payment: &Payment,
    ) -> CustomResult<GatewayCancelResponse, GatewayError> {
        Err(GatewayError::not_supported("Cancel", self.id()).into())
    }

    async fn refund(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _payment: &Payment,
        _refund: &Refund,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        Err(GatewayError::not_supported("Refund", self.id()).into())
    }

    async fn refund_detail(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _gateway_refund_id: &str,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        Err(GatewayError::not_supported("RefundDetail", self.id()).into())
    }

    async fn refund_cancel(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _refund: &Refund,
    ) -> CustomResult<GatewayRefundResponse, GatewayError> {
        Err(GatewayError::not_supported("RefundCancel", self.id()).into())
    }

    async fn payment_method_list(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _request: &GatewayPaymentMethodRequest,
    ) -> CustomResult<Vec<GatewayPaymentMethod>, GatewayError> {
        Err(GatewayError::not_supported("PaymentMethodList", self.id()).into())
    }

    async fn payment_method_attach(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _request: &GatewayPaymentMethodRequest,
    ) -> CustomResult<GatewayPaymentMethod, GatewayError> {
        Err(GatewayError::not_supported("PaymentMethodAttach", self.id()).into())
    }

    async fn payment_method_detach(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _request: &GatewayPaymentMethodRequest,
    ) -> CustomResult<(), GatewayError> {
        Err(GatewayError::not_supported("PaymentMethodDetach", self.id()).into())
    }

    async fn payment_method_create_and_bind(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
        _request: &GatewayPaymentMethodRequest,
    ) -> CustomResult<GatewayPaymentMethod, GatewayError> {
        Err(GatewayError::not_supported("PaymentMethodCreateAndBind", self.id()).into())
    }

    async fn merchant_balances_query(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _gateway: &MerchantGateway,
    ) -> CustomResult<Vec<MerchantBalance>, GatewayError> {
        Err(GatewayError::not_supported("MerchantBalancesQuery", self.id()).into())
    }

    async fn crypto_fiat_trans(
        &self,
        _ctx: &GatewayCallContext<'_>,
        _request: &CryptoFiatTransRequest,
    ) -> CustomResult<CryptoFiatTransResponse, GatewayError> {
        Err(GatewayError::not_supported("CryptoFiatTrans", self.id()).into())
    }
}

const ZERO_DECIMAL_CURRENCIES: [&str; 16] = [
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];
const THREE_DECIMAL_CURRENCIES: [&str; 7] = ["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

/// Digits after the decimal point of an ISO 4217 currency, 2 for codes not listed.
pub fn minor_unit_exponent(currency: &str) -> u32 {
    let currency = currency.trim().to_ascii_uppercase();
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.as_str()) {
        0
    } else if THREE_DECIMAL_CURRENCIES.contains(&currency.as_str()) {
        3
    } else {
        2
    }
}

/// Render minor units as a decimal major-unit string, `1050 USD` becomes `"10.50"`,
/// `1050 JPY` stays `"1050"`.
pub fn to_major_unit_string(amount: i64, currency: &str) -> String {
    format_decimal_units(amount, minor_unit_exponent(currency))
}

/// Render units of `10^-exponent` as a plain decimal string with exactly `exponent` fraction
/// digits, `12_345` with exponent 8 becomes `"0.00012345"`.
pub fn format_decimal_units(amount: i64, exponent: u32) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let amount = u128::from(amount.unsigned_abs());
    if exponent == 0 {
        return format!("{sign}{amount}");
    }
    let scale = 10_u128.checked_pow(exponent).unwrap_or(u128::MAX);
    let width = usize::try_from(exponent).unwrap_or_default();
    format!("{sign}{}.{:0width$}", amount / scale, amount % scale)
}

/// Parse a decimal major-unit string into minor units of `currency`, `"10.5" USD` becomes
/// `1050`. Precision the currency cannot hold is rejected rather than rounded away.
pub fn from_major_unit_str(amount: &str, currency: &str) -> CustomResult<i64, GatewayError> {
    parse_decimal_units(amount, minor_unit_exponent(currency))
        .attach_printable_lazy(|| format!("Invalid {currency} amount {amount}"))
}

/// Parse a plain decimal string into units of `10^-exponent`, `"0.5"` with exponent 8 becomes
/// `50_000_000`. A leading minus is kept, exponent notation and digits past `exponent` are
/// rejected.
pub fn parse_decimal_units(amount: &str, exponent: u32) -> CustomResult<i64, GatewayError> {
    let invalid = || {
        report!(GatewayError::ResponseHandlingFailed)
            .attach_printable(format!("Invalid decimal amount {amount}"))
    };
    let trimmed = amount.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (major, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if major.is_empty() || !major.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let fraction = fraction.trim_end_matches('0');
    let width = usize::try_from(exponent).unwrap_or_default();
    if fraction.len() > width {
        return Err(invalid());
    }

    let major: i64 = major.parse().map_err(|_| invalid())?;
    let minor: i64 = if width == 0 {
        0
    } else {
        format!("{fraction:0<width$}").parse().map_err(|_| invalid())?
    };
    let value = 10_i64
        .checked_pow(exponent)
        .and_then(|scale| major.checked_mul(scale))
        .and_then(|major| major.checked_add(minor))
        .ok_or_else(invalid)?;
    Ok(if negative { -value } else { value })
}
