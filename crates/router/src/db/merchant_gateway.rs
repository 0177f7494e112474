use error_stack::report;

use super::MockDb;
use crate::{
    core::errors::{self, CustomResult},
    types::storage,
};

/// Result of an archive request.
#[derive(Clone, Debug)]
pub enum ArchiveOutcome {
    Archived {
        archived: storage::MerchantGateway,
        /// Same-provider instance that took over the default flag, if any.
        promoted: Option<storage::MerchantGateway>,
    },
    /// The instance is the merchant's only active gateway and was left untouched.
    SoleActiveInstance,
}

#[async_trait::async_trait]
pub trait MerchantGatewayInterface {
    /// The new instance becomes default when no active default exists for its provider.
    async fn insert_merchant_gateway(
        &self,
        gateway: storage::MerchantGatewayNew,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError>;

    async fn find_merchant_gateway_by_id(
        &self,
        id: i64,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError>;

    async fn list_merchant_gateways_by_merchant_id(
        &self,
        merchant_id: &str,
        include_archived: bool,
    ) -> CustomResult<Vec<storage::MerchantGateway>, errors::StorageError>;

    async fn update_merchant_gateway(
        &self,
        id: i64,
        gateway: storage::MerchantGatewayUpdate,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError>;

    /// Marks `id` as the default of its provider and clears the flag on its siblings.
    async fn set_default_merchant_gateway(
        &self,
        id: i64,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError>;

    async fn archive_merchant_gateway(
        &self,
        id: i64,
    ) -> CustomResult<ArchiveOutcome, errors::StorageError>;

    async fn restore_merchant_gateway(
        &self,
        id: i64,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError>;
}

fn gateway_not_found(id: i64) -> error_stack::Report<errors::StorageError> {
    report!(errors::StorageError::ValueNotFound(format!(
        "No merchant gateway available for id = {id}"
    )))
}

fn find_mut(
    gateways: &mut [storage::MerchantGateway],
    id: i64,
) -> CustomResult<&mut storage::MerchantGateway, errors::StorageError> {
    gateways
        .iter_mut()
        .find(|gateway| gateway.id == id)
        .ok_or_else(|| gateway_not_found(id))
}

fn has_active_default(
    gateways: &[storage::MerchantGateway],
    merchant_id: &str,
    gateway_name: storage::enums::GatewayName,
) -> bool {
    gateways.iter().any(|gateway| {
        gateway.merchant_id == merchant_id
            && gateway.gateway_name == gateway_name
            && gateway.is_default
            && !gateway.archived
    })
}

#[async_trait::async_trait]
impl MerchantGatewayInterface for MockDb {
    async fn insert_merchant_gateway(
        &self,
        gateway: storage::MerchantGatewayNew,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError> {
        let mut gateways = self.merchant_gateways.lock().await;
        let is_default =
            !has_active_default(&gateways, &gateway.merchant_id, gateway.gateway_name);
        let gateway = gateway.into_merchant_gateway(self.next_id(), is_default);
        gateways.push(gateway.clone());
        Ok(gateway)
    }

    async fn find_merchant_gateway_by_id(
        &self,
        id: i64,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError> {
        self.merchant_gateways
            .lock()
            .await
            .iter()
            .find(|gateway| gateway.id == id)
            .cloned()
            .ok_or_else(|| gateway_not_found(id))
    }

    async fn list_merchant_gateways_by_merchant_id(
        &self,
        merchant_id: &str,
        include_archived: bool,
    ) -> CustomResult<Vec<storage::MerchantGateway>, errors::StorageError> {
        let mut gateways: Vec<_> = self
            .merchant_gateways
            .lock()
            .await
            .iter()
            .filter(|gateway| {
                gateway.merchant_id == merchant_id && (include_archived || !gateway.archived)
            })
            .cloned()
            .collect();
        gateways.sort_by_key(|gateway| (gateway.sort, gateway.id));
        Ok(gateways)
    }

    async fn update_merchant_gateway(
        &self,
        id: i64,
        gateway: storage::MerchantGatewayUpdate,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError> {
        let mut gateways = self.merchant_gateways.lock().await;
        let existing = find_mut(&mut gateways, id)?;
        let updated = gateway.apply_changeset(existing.clone());
        *existing = updated.clone();
        Ok(updated)
    }

    async fn set_default_merchant_gateway(
        &self,
        id: i64,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError> {
        let mut gateways = self.merchant_gateways.lock().await;
        let target = find_mut(&mut gateways, id)?.clone();
        let now = common_utils::date_time::now();

        let mut selected = None;
        for gateway in gateways.iter_mut().filter(|gateway| {
            gateway.merchant_id == target.merchant_id && gateway.gateway_name == target.gateway_name
        }) {
            let is_default = gateway.id == id;
            if gateway.is_default != is_default {
                gateway.is_default = is_default;
                gateway.last_updated = now;
            }
            if is_default {
                selected = Some(gateway.clone());
            }
        }
        selected.ok_or_else(|| gateway_not_found(id))
    }

    async fn archive_merchant_gateway(
        &self,
        id: i64,
    ) -> CustomResult<ArchiveOutcome, errors::StorageError> {
        let mut gateways = self.merchant_gateways.lock().await;
        let target = find_mut(&mut gateways, id)?.clone();

        let other_active = gateways
            .iter()
            .filter(|gateway| {
                gateway.merchant_id == target.merchant_id && !gateway.archived && gateway.id != id
            })
            .count();
        if !target.archived && other_active == 0 {
            return Ok(ArchiveOutcome::SoleActiveInstance);
        }

        let now = common_utils::date_time::now();
        let archived = {
            let gateway = find_mut(&mut gateways, id)?;
            gateway.archived = true;
            gateway.is_default = false;
            gateway.last_updated = now;
            gateway.clone()
        };

        let promoted = if target.is_default {
            gateways
                .iter_mut()
                .filter(|gateway| {
                    gateway.merchant_id == target.merchant_id
                        && gateway.gateway_name == target.gateway_name
                        && !gateway.archived
                })
                .min_by_key(|gateway| (gateway.sort, gateway.id))
                .map(|gateway| {
                    gateway.is_default = true;
                    gateway.last_updated = now;
                    gateway.clone()
                })
        } else {
            None
        };

        Ok(ArchiveOutcome::Archived { archived, promoted })
    }

    async fn restore_merchant_gateway(
        &self,
        id: i64,
    ) -> CustomResult<storage::MerchantGateway, errors::StorageError> {
        let mut gateways = self.merchant_gateways.lock().await;
        let target = find_mut(&mut gateways, id)?.clone();
        if !target.archived {
            return Ok(target);
        }
        let is_default = !has_active_default(&gateways, &target.merchant_id, target.gateway_name);
        let gateway = find_mut(&mut gateways, id)?;
        gateway.archived = false;
        gateway.is_default = is_default;
        gateway.last_updated = common_utils::date_time::now();
        Ok(gateway.clone())
    }
}
