use common_utils::date_time;
use masking::Secret;
use time::PrimitiveDateTime;

use crate::enums as storage_enums;

#[derive(Clone, Debug)]
pub struct MerchantGatewayNew {
    pub merchant_id: String,
    pub gateway_name: storage_enums::GatewayName,
    pub display_name: Option<String>,
    pub gateway_key: Secret<String>,
    pub gateway_secret: Secret<String>,
    pub webhook_secret: Option<Secret<String>>,
    pub payment_types: Vec<String>,
    pub country_restrictions: Vec<String>,
    pub sort: i64,
    pub metadata: Option<serde_json::Value>,
}

/// One merchant-configured instance of a provider.
#[derive(Clone, Debug)]
pub struct MerchantGateway {
    pub id: i64,
    pub merchant_id: String,
    pub gateway_name: storage_enums::GatewayName,
    pub display_name: Option<String>,
    pub gateway_key: Secret<String>,
    pub gateway_secret: Secret<String>,
    pub webhook_secret: Option<Secret<String>>,
    pub payment_types: Vec<String>,
    pub country_restrictions: Vec<String>,
    pub is_default: bool,
    pub archived: bool,
    pub sort: i64,
    pub metadata: Option<serde_json::Value>,
    pub created_at: PrimitiveDateTime,
    pub last_updated: PrimitiveDateTime,
}

impl MerchantGatewayNew {
    pub fn into_merchant_gateway(self, id: i64, is_default: bool) -> MerchantGateway {
        let now = date_time::now();
        MerchantGateway {
            id,
            merchant_id: self.merchant_id,
            gateway_name: self.gateway_name,
            display_name: self.display_name,
            gateway_key: self.gateway_key,
            gateway_secret: self.gateway_secret,
            webhook_secret: self.webhook_secret,
            payment_types: self.payment_types,
            country_restrictions: self.country_restrictions,
            is_default,
            archived: false,
            sort: self.sort,
            metadata: self.metadata,
            created_at: now,
            last_updated: now,
        }
    }
}

impl MerchantGateway {
    /// Label used in audit logs, `<gateway name>-<id>`.
    pub fn log_label(&self) -> String {
        format!("{}-{}", self.gateway_name, self.id)
    }

    /// Whether the instance may process payments from `country` (ISO 3166 alpha-2).
    /// An empty restriction list allows every country.
    pub fn allows_country(&self, country: &str) -> bool {
        self.country_restrictions.is_empty()
            || self
                .country_restrictions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(country))
    }
}

#[derive(Clone, Debug, Default)]
pub struct MerchantGatewayUpdate {
    pub display_name: Option<String>,
    pub gateway_key: Option<Secret<String>>,
    pub gateway_secret: Option<Secret<String>>,
    pub webhook_secret: Option<Secret<String>>,
    pub payment_types: Option<Vec<String>>,
    pub country_restrictions: Option<Vec<String>>,
    pub sort: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

impl MerchantGatewayUpdate {
    pub fn changes_credentials(&self) -> bool {
        self.gateway_key.is_some() || self.gateway_secret.is_some()
    }

    pub fn apply_changeset(self, source: MerchantGateway) -> MerchantGateway {
        MerchantGateway {
            display_name: self.display_name.or(source.display_name),
            gateway_key: self.gateway_key.unwrap_or(source.gateway_key),
            gateway_secret: self.gateway_secret.unwrap_or(source.gateway_secret),
            webhook_secret: self.webhook_secret.or(source.webhook_secret),
            payment_types: self.payment_types.unwrap_or(source.payment_types),
            country_restrictions: self
                .country_restrictions
                .unwrap_or(source.country_restrictions),
            sort: self.sort.unwrap_or(source.sort),
            metadata: self.metadata.or(source.metadata),
            last_updated: date_time::now(),
            ..source
        }
    }
}
