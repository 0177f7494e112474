use error_stack::ResultExt;
use gateway_interfaces::api_client::GatewayHttpLogger;
use router_env::logger;

use super::{MockDb, StorageInterface};
use crate::{
    core::errors::{self, CustomResult},
    types::storage,
};

#[async_trait::async_trait]
pub trait GatewayHttpLogInterface {
    async fn insert_gateway_http_log(
        &self,
        log: storage::GatewayHttpLogNew,
    ) -> CustomResult<storage::GatewayHttpLog, errors::StorageError>;

    async fn list_gateway_http_logs_by_gateway_id(
        &self,
        gateway_id: i64,
    ) -> CustomResult<Vec<storage::GatewayHttpLog>, errors::StorageError>;
}

#[async_trait::async_trait]
impl GatewayHttpLogInterface for MockDb {
    async fn insert_gateway_http_log(
        &self,
        log: storage::GatewayHttpLogNew,
    ) -> CustomResult<storage::GatewayHttpLog, errors::StorageError> {
        let log = log.into_log(self.next_id());
        self.gateway_http_logs.lock().await.push(log.clone());
        Ok(log)
    }

    async fn list_gateway_http_logs_by_gateway_id(
        &self,
        gateway_id: i64,
    ) -> CustomResult<Vec<storage::GatewayHttpLog>, errors::StorageError> {
        Ok(self
            .gateway_http_logs
            .lock()
            .await
            .iter()
            .filter(|log| log.gateway_id == gateway_id)
            .cloned()
            .collect())
    }
}

/// Writes provider call audit records into the store.
#[derive(Clone, Debug)]
pub struct StoreHttpLogger {
    store: Box<dyn StorageInterface>,
}

impl StoreHttpLogger {
    pub fn new(store: Box<dyn StorageInterface>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl GatewayHttpLogger for StoreHttpLogger {
    async fn record(&self, log: storage::GatewayHttpLogNew) {
        let label = log.gateway_label.clone();
        if let Err(error) = self
            .store
            .insert_gateway_http_log(log)
            .await
            .attach_printable("Failed to persist gateway http log")
        {
            logger::warn!(gateway = %label, ?error);
        }
    }
}
