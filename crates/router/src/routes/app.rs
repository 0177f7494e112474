use std::sync::Arc;

use actix_web::{web, Scope};
use gateway_interfaces::{
    api_client::{ApiClient, GatewayHttpLogger, ReqwestClient},
    GatewayCallContext,
};
use scheduler::{InMemoryQueue, MessageQueue, SchedulerAppState};

use super::{health::health, redirect::gateway_redirect, webhooks::receive_incoming_webhook};
use crate::{
    configs::settings::Settings,
    core::{
        errors::{ApplicationError, ApplicationResult},
        gateway_registry::GatewayRegistry,
    },
    db::{MockDb, StorageInterface, StoreHttpLogger},
    services::collaborators::{InvoiceService, LoggingCollaborators, OptLog, SubscriptionService},
    workflows::ListenerRegistry,
};

/// Services owned by the rest of the billing platform.
#[derive(Clone)]
pub struct Collaborators {
    pub invoices: Arc<dyn InvoiceService>,
    pub subscriptions: Arc<dyn SubscriptionService>,
    pub opt_log: Arc<dyn OptLog>,
}

impl Collaborators {
    pub fn logging() -> Self {
        Self::shared(LoggingCollaborators)
    }

    /// One value serving all three roles.
    pub fn shared<C>(collaborators: C) -> Self
    where
        C: InvoiceService + SubscriptionService + OptLog + Clone + 'static,
    {
        Self {
            invoices: Arc::new(collaborators.clone()),
            subscriptions: Arc::new(collaborators.clone()),
            opt_log: Arc::new(collaborators),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub flow_name: String,
    pub store: Box<dyn StorageInterface>,
    pub queue: Box<dyn MessageQueue>,
    pub conf: Arc<Settings>,
    pub api_client: Box<dyn ApiClient>,
    pub http_logger: Arc<dyn GatewayHttpLogger>,
    pub registry: Arc<GatewayRegistry>,
    pub invoices: Arc<dyn InvoiceService>,
    pub subscriptions: Arc<dyn SubscriptionService>,
    pub opt_log: Arc<dyn OptLog>,
    pub listeners: ListenerRegistry,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("flow_name", &self.flow_name)
            .field("store", &self.store)
            .field("queue", &self.queue)
            .field("registry", &self.registry)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn with_storage(
        conf: Settings,
        store: Box<dyn StorageInterface>,
        queue: Box<dyn MessageQueue>,
        api_client: Box<dyn ApiClient>,
    ) -> Self {
        let registry = Arc::new(GatewayRegistry::with_default_adapters(&conf.gateways));
        let http_logger = Arc::new(StoreHttpLogger::new(store.clone()));
        let collaborators = Collaborators::logging();
        Self {
            flow_name: String::from("default"),
            store,
            queue,
            conf: Arc::new(conf),
            api_client,
            http_logger,
            registry,
            invoices: collaborators.invoices,
            subscriptions: collaborators.subscriptions,
            opt_log: collaborators.opt_log,
            listeners: ListenerRegistry::with_default_listeners(),
        }
    }

    /// In-memory store and queue, provider calls over HTTP.
    pub fn new(conf: Settings) -> ApplicationResult<Self> {
        let api_client = ReqwestClient::new()
            .map_err(|error| ApplicationError::ApiClientError(format!("{error:?}")))?;
        let queue = InMemoryQueue::new(conf.webhook_delivery.visibility_timeout());
        Ok(Self::with_storage(
            conf,
            Box::new(MockDb::new()),
            Box::new(queue),
            Box::new(api_client),
        ))
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.invoices = collaborators.invoices;
        self.subscriptions = collaborators.subscriptions;
        self.opt_log = collaborators.opt_log;
        self
    }

    pub fn with_listeners(mut self, listeners: ListenerRegistry) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn with_registry(mut self, registry: GatewayRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn gateway_call_context(&self) -> GatewayCallContext<'_> {
        GatewayCallContext {
            api_client: self.api_client.as_ref(),
            http_log: self.http_logger.as_ref(),
            gateways: &self.conf.gateways,
        }
    }
}

impl SchedulerAppState for AppState {
    fn get_queue(&self) -> Box<dyn MessageQueue> {
        self.queue.clone()
    }
}

pub struct Health;

impl Health {
    pub fn server(state: AppState) -> Scope {
        web::scope("")
            .app_data(web::Data::new(state))
            .service(web::resource("/health").route(web::get().to(health)))
    }
}

pub struct Gateway;

impl Gateway {
    pub fn server(state: AppState) -> Scope {
        web::scope("/gateway")
            .app_data(web::Data::new(state))
            .service(
                web::resource("/{gateway_id}/webhook")
                    .route(web::post().to(receive_incoming_webhook))
                    .route(web::get().to(receive_incoming_webhook)),
            )
            .service(
                web::resource("/{gateway_id}/redirect").route(web::get().to(gateway_redirect)),
            )
    }
}
