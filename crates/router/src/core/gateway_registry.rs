use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use common_enums::GatewayName;
use error_stack::{report, ResultExt};
use gateway_interfaces::{api::Gateway, configs::Gateways, consts, GatewayCallContext};
use router_env::{instrument, logger, tracing, Flow};
use tokio::sync::RwLock;

use crate::{
    core::errors::{CustomResult, GatewayError, RegistryError},
    db::{
        merchant_gateway::{ArchiveOutcome, MerchantGatewayInterface},
        StorageInterface,
    },
    types::storage,
};

/// Adapters by provider name, plus a read-mostly cache of configured instances.
pub struct GatewayRegistry {
    adapters: HashMap<GatewayName, Arc<dyn Gateway>>,
    instances: RwLock<InstanceCache>,
    cache_ttl: Duration,
}

#[derive(Default)]
struct InstanceCache {
    /// Bumped on every invalidation, a load that started before it must not be cached
    generation: u64,
    entries: HashMap<i64, CachedInstance>,
}

struct CachedInstance {
    gateway: storage::MerchantGateway,
    loaded_at: Instant,
}

enum CacheLookup {
    Hit(storage::MerchantGateway),
    Miss { generation: u64 },
}

impl fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.adapters.keys().collect();
        names.sort();
        f.debug_struct("GatewayRegistry")
            .field("adapters", &names)
            .finish()
    }
}

/// Instance after an archive request, with the sibling that became default if any.
#[derive(Clone, Debug)]
pub struct ArchivedGateway {
    pub archived: storage::MerchantGateway,
    pub promoted: Option<storage::MerchantGateway>,
}

impl GatewayRegistry {
    pub fn new(adapters: Vec<Arc<dyn Gateway>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.gateway_name(), adapter))
            .collect();
        Self {
            adapters,
            instances: RwLock::new(InstanceCache::default()),
            cache_ttl: Duration::from_secs(consts::DEFAULT_INSTANCE_CACHE_TTL_SECS),
        }
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Every adapter shipped with this build.
    pub fn with_default_adapters(gateways: &Gateways) -> Self {
        Self::new(vec![
            Arc::new(gateways::Airwallex::new()),
            Arc::new(gateways::Alikassa::new()),
            Arc::new(gateways::Blockonomics::new()),
            Arc::new(gateways::Firekassa::new(gateways.webhook_tolerance_secs)),
            Arc::new(gateways::Mulenpay::new()),
        ])
        .with_cache_ttl(gateways.instance_cache_ttl())
    }

    pub fn adapter(
        &self,
        gateway_name: GatewayName,
    ) -> CustomResult<Arc<dyn Gateway>, RegistryError> {
        self.adapters
            .get(&gateway_name)
            .cloned()
            .ok_or_else(|| {
                report!(RegistryError::GatewayNotConfigured {
                    gateway_name: gateway_name.to_string(),
                })
            })
    }

    async fn invalidate(&self) {
        let mut cache = self.instances.write().await;
        cache.generation = cache.generation.wrapping_add(1);
        cache.entries.clear();
    }

    async fn lookup(&self, gateway_id: i64) -> CacheLookup {
        let cache = self.instances.read().await;
        match cache.entries.get(&gateway_id) {
            Some(cached) if cached.loaded_at.elapsed() < self.cache_ttl => {
                CacheLookup::Hit(cached.gateway.clone())
            }
            _ => CacheLookup::Miss {
                generation: cache.generation,
            },
        }
    }

    /// Cache `gateway` unless the cache was invalidated since `generation` was read.
    async fn remember(&self, generation: u64, gateway: storage::MerchantGateway) {
        let mut cache = self.instances.write().await;
        if cache.generation != generation {
            logger::debug!(gateway_id = gateway.id, "cache invalidated during load, not caching");
            return;
        }
        cache.entries.insert(
            gateway.id,
            CachedInstance {
                gateway,
                loaded_at: Instant::now(),
            },
        );
    }

    async fn load(
        &self,
        db: &dyn StorageInterface,
        gateway_id: i64,
    ) -> CustomResult<storage::MerchantGateway, RegistryError> {
        let generation = match self.lookup(gateway_id).await {
            CacheLookup::Hit(gateway) => return Ok(gateway),
            CacheLookup::Miss { generation } => generation,
        };

        let gateway = db
            .find_merchant_gateway_by_id(gateway_id)
            .await
            .map_err(|error| {
                if error.current_context().is_db_not_found() {
                    error.change_context(RegistryError::GatewayNotFound { gateway_id })
                } else {
                    error.change_context(RegistryError::StorageFailure)
                }
            })?;
        self.remember(generation, gateway.clone()).await;
        Ok(gateway)
    }

    async fn load_owned(
        &self,
        db: &dyn StorageInterface,
        merchant_id: &str,
        gateway_id: i64,
    ) -> CustomResult<storage::MerchantGateway, RegistryError> {
        let gateway = self.load(db, gateway_id).await?;
        if gateway.merchant_id != merchant_id {
            return Err(report!(RegistryError::GatewayNotFound { gateway_id }))
                .attach_printable("gateway belongs to another merchant");
        }
        Ok(gateway)
    }

    /// Adapter and configuration of an active instance.
    pub async fn resolve(
        &self,
        db: &dyn StorageInterface,
        gateway_id: i64,
    ) -> CustomResult<(Arc<dyn Gateway>, storage::MerchantGateway), RegistryError> {
        let gateway = self.load(db, gateway_id).await?;
        if gateway.archived {
            return Err(report!(RegistryError::GatewayNotFound { gateway_id }))
                .attach_printable("gateway is archived");
        }
        let adapter = self.adapter(gateway.gateway_name)?;
        Ok((adapter, gateway))
    }

    #[instrument(skip(self, db), fields(flow = ?Flow::GatewaySetDefault))]
    pub async fn set_default(
        &self,
        db: &dyn StorageInterface,
        merchant_id: &str,
        gateway_id: i64,
    ) -> CustomResult<storage::MerchantGateway, RegistryError> {
        let gateway = self.load_owned(db, merchant_id, gateway_id).await?;
        if gateway.archived {
            return Err(report!(RegistryError::GatewayArchived { gateway_id }));
        }

        let updated = db
            .set_default_merchant_gateway(gateway_id)
            .await
            .change_context(RegistryError::StorageFailure)?;
        self.invalidate().await;
        logger::info!(gateway = %updated.log_label(), "default gateway changed");
        Ok(updated)
    }

    #[instrument(skip(self, db), fields(flow = ?Flow::GatewayArchive))]
    pub async fn archive(
        &self,
        db: &dyn StorageInterface,
        merchant_id: &str,
        gateway_id: i64,
    ) -> CustomResult<ArchivedGateway, RegistryError> {
        self.load_owned(db, merchant_id, gateway_id).await?;

        let outcome = db
            .archive_merchant_gateway(gateway_id)
            .await
            .change_context(RegistryError::StorageFailure)?;
        self.invalidate().await;

        match outcome {
            ArchiveOutcome::Archived { archived, promoted } => {
                logger::info!(
                    gateway = %archived.log_label(),
                    promoted = ?promoted.as_ref().map(storage::MerchantGateway::log_label),
                    "gateway archived"
                );
                Ok(ArchivedGateway { archived, promoted })
            }
            ArchiveOutcome::SoleActiveInstance => {
                Err(report!(RegistryError::LastGatewayProtected))
            }
        }
    }

    #[instrument(skip(self, db), fields(flow = ?Flow::GatewayRestore))]
    pub async fn restore(
        &self,
        db: &dyn StorageInterface,
        merchant_id: &str,
        gateway_id: i64,
    ) -> CustomResult<storage::MerchantGateway, RegistryError> {
        self.load_owned(db, merchant_id, gateway_id).await?;

        let restored = db
            .restore_merchant_gateway(gateway_id)
            .await
            .change_context(RegistryError::StorageFailure)?;
        self.invalidate().await;
        logger::info!(gateway = %restored.log_label(), is_default = restored.is_default, "gateway restored");
        Ok(restored)
    }

    /// Store a new instance once the provider accepted its credentials.
    #[instrument(skip_all, fields(flow = ?Flow::GatewaySetup, merchant_id = %gateway.merchant_id))]
    pub async fn setup_gateway(
        &self,
        db: &dyn StorageInterface,
        ctx: &GatewayCallContext<'_>,
        gateway: storage::MerchantGatewayNew,
    ) -> CustomResult<storage::MerchantGateway, RegistryError> {
        let adapter = self.adapter(gateway.gateway_name)?;
        check_credentials(adapter.as_ref(), ctx, &gateway.clone().into_merchant_gateway(0, false))
            .await?;

        let created = db
            .insert_merchant_gateway(gateway)
            .await
            .change_context(RegistryError::StorageFailure)?;
        self.invalidate().await;
        logger::info!(gateway = %created.log_label(), is_default = created.is_default, "gateway configured");
        Ok(created)
    }

    /// Changed credentials are checked against the provider before they are stored.
    #[instrument(skip(self, db, ctx, update), fields(flow = ?Flow::GatewayEdit))]
    pub async fn edit_gateway(
        &self,
        db: &dyn StorageInterface,
        ctx: &GatewayCallContext<'_>,
        merchant_id: &str,
        gateway_id: i64,
        update: storage::MerchantGatewayUpdate,
    ) -> CustomResult<storage::MerchantGateway, RegistryError> {
        let current = self.load_owned(db, merchant_id, gateway_id).await?;
        if current.archived {
            return Err(report!(RegistryError::GatewayArchived { gateway_id }));
        }

        if update.changes_credentials() {
            let adapter = self.adapter(current.gateway_name)?;
            let candidate = update.clone().apply_changeset(current);
            check_credentials(adapter.as_ref(), ctx, &candidate).await?;
        }

        let updated = db
            .update_merchant_gateway(gateway_id, update)
            .await
            .change_context(RegistryError::StorageFailure)?;
        self.invalidate().await;
        Ok(updated)
    }
}

async fn check_credentials(
    adapter: &dyn Gateway,
    ctx: &GatewayCallContext<'_>,
    gateway: &storage::MerchantGateway,
) -> CustomResult<(), RegistryError> {
    match adapter.test(ctx, gateway).await {
        Ok(_) => Ok(()),
        Err(error) => {
            logger::warn!(gateway = adapter.id(), ?error, "credential check failed");
            let context = match error.current_context() {
                GatewayError::CredentialInvalid => RegistryError::CredentialInvalid,
                _ => RegistryError::CredentialCheckFailed,
            };
            Err(error.change_context(context))
        }
    }
}
