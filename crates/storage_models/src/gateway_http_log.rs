use common_utils::date_time;
use time::PrimitiveDateTime;

/// Audit record of one call made to a provider.
#[derive(Clone, Debug)]
pub struct GatewayHttpLogNew {
    pub gateway_id: i64,
    pub gateway_label: String,
    pub operation: String,
    pub url: String,
    pub request: Option<String>,
    pub response: Option<String>,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct GatewayHttpLog {
    pub id: i64,
    pub gateway_id: i64,
    pub gateway_label: String,
    pub operation: String,
    pub url: String,
    pub request: Option<String>,
    pub response: Option<String>,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub created_at: PrimitiveDateTime,
}

impl GatewayHttpLogNew {
    pub fn into_log(self, id: i64) -> GatewayHttpLog {
        GatewayHttpLog {
            id,
            gateway_id: self.gateway_id,
            gateway_label: self.gateway_label,
            operation: self.operation,
            url: self.url,
            request: self.request,
            response: self.response,
            status_code: self.status_code,
            error: self.error,
            created_at: date_time::now(),
        }
    }
}
