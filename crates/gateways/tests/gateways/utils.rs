use common_enums::GatewayName;
use common_utils::crypto::{self, SignatureEncoding};
use gateway_interfaces::{
    api_client::{mock::RecordingHttpLogger, GatewayCallContext, ReqwestClient},
    configs::{GatewayParams, Gateways},
    webhooks::IncomingWebhookRequestDetails,
};
use masking::Secret;
use storage_models::{GatewayHttpLogNew, MerchantGateway, MerchantGatewayNew};

pub struct TestContext {
    client: ReqwestClient,
    http_log: RecordingHttpLogger,
    gateways: Gateways,
}

impl TestContext {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: ReqwestClient::new().unwrap(),
            http_log: RecordingHttpLogger::default(),
            gateways: Gateways {
                airwallex: GatewayParams::new(base_url),
                alikassa: GatewayParams::new(base_url),
                blockonomics: GatewayParams::new(base_url),
                firekassa: GatewayParams::new(base_url),
                mulenpay: GatewayParams::new(base_url),
                request_timeout_secs: 2,
                ..Gateways::default()
            },
        }
    }

    pub fn ctx(&self) -> GatewayCallContext<'_> {
        GatewayCallContext {
            api_client: &self.client,
            http_log: &self.http_log,
            gateways: &self.gateways,
        }
    }

    pub async fn logged_operations(&self) -> Vec<GatewayHttpLogNew> {
        self.http_log.entries.lock().await.clone()
    }
}

pub fn merchant_gateway(
    gateway_name: GatewayName,
    key: &str,
    secret: &str,
    webhook_secret: Option<&str>,
) -> MerchantGateway {
    MerchantGatewayNew {
        merchant_id: "acme".to_string(),
        gateway_name,
        display_name: None,
        gateway_key: Secret::new(key.to_string()),
        gateway_secret: Secret::new(secret.to_string()),
        webhook_secret: webhook_secret.map(|secret| Secret::new(secret.to_string())),
        payment_types: vec!["card".to_string()],
        country_restrictions: Vec::new(),
        sort: 0,
        metadata: None,
    }
    .into_merchant_gateway(7, true)
}

pub fn webhook_request<'a>(
    headers: &'a http::HeaderMap,
    body: &'a [u8],
) -> IncomingWebhookRequestDetails<'a> {
    IncomingWebhookRequestDetails {
        method: http::Method::POST,
        headers,
        body,
        query_params: String::new(),
    }
}

pub fn headers(pairs: &[(&'static str, &str)]) -> http::HeaderMap {
    pairs
        .iter()
        .map(|(name, value)| {
            (
                http::header::HeaderName::from_static(name),
                http::HeaderValue::from_str(value).unwrap(),
            )
        })
        .collect()
}

pub fn hex_hmac_sha256(secret: &str, message: &[u8]) -> String {
    crypto::sign_and_encode(
        &crypto::HmacSha256,
        SignatureEncoding::Hex,
        secret.as_bytes(),
        message,
    )
    .unwrap()
}

pub fn hex_hmac_sha512(secret: &str, message: &[u8]) -> String {
    crypto::sign_and_encode(
        &crypto::HmacSha512,
        SignatureEncoding::Hex,
        secret.as_bytes(),
        message,
    )
    .unwrap()
}
