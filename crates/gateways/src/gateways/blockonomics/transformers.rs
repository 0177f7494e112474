use common_enums::PaymentStatus;
use common_utils::{date_time, errors::CustomResult};
use error_stack::report;
use gateway_interfaces::{
    api::{format_decimal_units, parse_decimal_units, to_major_unit_string},
    errors::GatewayError,
    types::GatewayPaymentDetail,
    webhooks::IncomingWebhookEvent,
};
use serde::{Deserialize, Serialize};

/// Coin payments are taken in, addresses of other coins have no balance endpoint.
pub const PAYMENT_CRYPTO: &str = "BTC";

/// Callback status meaning the transaction has two or more confirmations
const CONFIRMED: i64 = 2;

/// Digits after the decimal point of the smallest unit of a coin, 8 when unknown.
pub fn crypto_exponent(crypto: &str) -> u32 {
    match crypto.trim().to_ascii_uppercase().as_str() {
        "USDT" | "XRP" | "ADA" => 6,
        "DOT" => 10,
        "ETH" | "LINK" | "UNI" => 18,
        _ => 8,
    }
}

/// Smallest-unit amount of `crypto` bought by a fiat amount at `price` fiat per coin, rounded
/// down.
pub fn crypto_units(
    fiat_amount: i64,
    fiat_currency: &str,
    crypto: &str,
    price: f64,
) -> CustomResult<i64, GatewayError> {
    let invalid = |detail: String| {
        report!(GatewayError::ResponseHandlingFailed).attach_printable(detail)
    };
    if !price.is_finite() || price <= 0.0 {
        return Err(invalid(format!("Invalid {crypto} price {price}")));
    }
    let fiat: f64 = to_major_unit_string(fiat_amount, fiat_currency)
        .parse()
        .map_err(|_| invalid(format!("Invalid {fiat_currency} amount {fiat_amount}")))?;
    let coins = fiat / price;
    let exponent = crypto_exponent(crypto);
    let width = usize::try_from(exponent).unwrap_or_default();
    // One spare digit is rendered and dropped so the formatter does not round up.
    let rendered = format!("{coins:.prec$}", prec = width.saturating_add(1));
    let truncated = rendered
        .get(..rendered.len().saturating_sub(1))
        .unwrap_or_default();
    parse_decimal_units(truncated, exponent)
}

/// Coin chosen by the merchant instance, the first configured payment type.
pub fn payment_crypto(payment_types: &[String]) -> String {
    payment_types
        .first()
        .map(|crypto| crypto.trim().to_ascii_uppercase())
        .filter(|crypto| !crypto.is_empty())
        .unwrap_or_else(|| PAYMENT_CRYPTO.to_string())
}

/// BIP 21 URI a wallet opens to pay `satoshis` to `address`.
pub fn payment_uri(address: &str, satoshis: i64) -> String {
    format!(
        "bitcoin:{address}?amount={}",
        format_decimal_units(satoshis, crypto_exponent(PAYMENT_CRYPTO))
    )
}

#[derive(Debug, Deserialize)]
pub struct BlockonomicsPriceResponse {
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct BlockonomicsNewAddressRequest {
    pub match_callback: String,
}

#[derive(Debug, Deserialize)]
pub struct BlockonomicsNewAddressResponse {
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlockonomicsBalanceRequest {
    pub addr: String,
}

#[derive(Debug, Deserialize)]
pub struct BlockonomicsAddressBalance {
    pub addr: String,
    /// Satoshis
    #[serde(default)]
    pub confirmed: i64,
    /// Satoshis
    #[serde(default)]
    pub unconfirmed: i64,
}

#[derive(Debug, Deserialize)]
pub struct BlockonomicsBalanceResponse {
    #[serde(default)]
    pub response: Vec<BlockonomicsAddressBalance>,
}

impl BlockonomicsBalanceResponse {
    /// Balance of `address`, an address the provider does not list holds nothing.
    pub fn of(self, address: &str) -> BlockonomicsAddressBalance {
        self.response
            .into_iter()
            .find(|balance| balance.addr == address)
            .unwrap_or(BlockonomicsAddressBalance {
                addr: address.to_string(),
                confirmed: 0,
                unconfirmed: 0,
            })
    }
}

/// Addresses are handed out with an empty balance, so anything confirmed on one pays it.
impl From<BlockonomicsAddressBalance> for GatewayPaymentDetail {
    fn from(item: BlockonomicsAddressBalance) -> Self {
        let (status, reason) = if item.confirmed > 0 {
            (PaymentStatus::Success, "Confirmed")
        } else if item.unconfirmed > 0 {
            (PaymentStatus::Created, "Unconfirmed")
        } else {
            (PaymentStatus::Created, "Pending")
        };
        Self {
            gateway_payment_id: item.addr,
            status,
            amount: (item.confirmed > 0).then_some(item.confirmed),
            currency: Some(PAYMENT_CRYPTO.to_string()),
            paid_time: (status == PaymentStatus::Success).then(date_time::now),
            reason: Some(reason.to_string()),
        }
    }
}

/// Account balances keyed by coin, in whole coins.
#[derive(Debug, Deserialize)]
pub struct BlockonomicsAccountBalance {
    #[serde(rename = "BTC")]
    pub btc: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BlockonomicsErrorResponse {
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Payment callback, sent as a query string or a JSON body.
#[derive(Debug, Deserialize)]
pub struct BlockonomicsCallback {
    pub addr: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub status: Option<i64>,
    pub crypto: Option<String>,
    pub txid: Option<String>,
    /// Smallest units received
    #[serde(default, deserialize_with = "lenient_i64")]
    pub value: Option<i64>,
}

impl BlockonomicsCallback {
    pub fn reference(&self) -> Option<String> {
        self.addr.clone().filter(|addr| !addr.is_empty())
    }

    pub fn event_type(&self) -> IncomingWebhookEvent {
        match (self.status, self.value) {
            (Some(status), Some(value)) if status >= CONFIRMED && value > 0 => {
                IncomingWebhookEvent::PaymentIntentSuccess
            }
            (Some(_), _) => IncomingWebhookEvent::PaymentIntentProcessing,
            (None, _) => IncomingWebhookEvent::EventNotSupported,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.status {
            Some(status) if status >= CONFIRMED => "Confirmed",
            Some(1) => "Partially Confirmed",
            _ => "Unconfirmed",
        }
    }
}

/// Query string values arrive as text, JSON bodies carry numbers.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(number)) => Some(number),
        Some(NumberOrText::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}
