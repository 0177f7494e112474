#![forbid(unsafe_code)]

pub mod configs;
pub mod consts;
pub mod core;
pub mod db;
pub mod env;
pub mod routes;
pub mod services;
pub mod types;
pub mod workflows;

use std::{sync::Arc, time::Duration};

use actix_web::{
    body::MessageBody,
    dev::{Server, ServiceFactory, ServiceRequest},
};
use scheduler::QueueWorkflow;
use tokio::{sync::mpsc, task::JoinHandle};

pub use self::env::logger;
use crate::{
    configs::settings::Settings,
    core::errors::{self, ApplicationResult},
    routes::AppState,
};

pub fn mk_app(
    state: AppState,
) -> actix_web::App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    actix_web::App::new()
        .wrap(router_env::tracing_actix_web::TracingLogger::default())
        .service(routes::Gateway::server(state.clone()))
        .service(routes::Health::server(state))
}

/// Running queue consumers, stopped with [`Consumers::shutdown`].
#[derive(Debug)]
pub struct Consumers {
    shutdown: Vec<mpsc::Sender<()>>,
    handles: Vec<JoinHandle<errors::CustomResult<(), errors::ProcessTrackerError>>>,
}

impl Consumers {
    /// Signal every consumer and wait for its in-flight messages.
    pub async fn shutdown(self) {
        for sender in self.shutdown {
            let _ = sender.send(()).await;
        }
        for handle in self.handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => logger::error!(?error, "consumer stopped with an error"),
                Err(error) => logger::error!(%error, "consumer task panicked"),
            }
        }
    }
}

/// Publish, every `republish_interval_ms`, the messages whose first publishing attempt was cut
/// short.
pub async fn start_republish_sweeper(
    state: AppState,
    mut shutdown: mpsc::Receiver<()>,
) -> errors::CustomResult<(), errors::ProcessTrackerError> {
    let period = Duration::from_millis(state.conf.webhook_delivery.producer.republish_interval_ms);
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = interval.tick() => {
                match crate::core::webhooks::republish_stale_messages(&state).await {
                    Ok(0) => {}
                    Ok(count) => logger::info!(count, "republished webhook messages"),
                    Err(error) => logger::error!(?error, "republish sweep failed"),
                }
            }
        }
    }
    Ok(())
}

/// Spawn the merchant delivery and internal listener consumers, and the republish sweep.
pub fn start_consumers(state: &AppState) -> Consumers {
    let settings = Arc::new(state.conf.webhook_delivery.consumer.clone());
    let workflows: [Arc<dyn QueueWorkflow<AppState>>; 2] = [
        Arc::new(workflows::OutgoingWebhookDeliveryWorkflow),
        Arc::new(workflows::InternalWebhookWorkflow),
    ];

    let mut consumers = Consumers {
        shutdown: Vec::with_capacity(workflows.len() + 1),
        handles: Vec::with_capacity(workflows.len() + 1),
    };
    for workflow in workflows {
        let (tx, rx) = mpsc::channel(1);
        consumers.shutdown.push(tx);
        consumers.handles.push(tokio::spawn(scheduler::start_consumer(
            state.clone(),
            Arc::clone(&settings),
            workflow,
            rx,
        )));
    }

    let (tx, rx) = mpsc::channel(1);
    consumers.shutdown.push(tx);
    consumers
        .handles
        .push(tokio::spawn(start_republish_sweeper(state.clone(), rx)));
    consumers
}

pub async fn start_server(conf: Settings) -> ApplicationResult<(Server, Consumers)> {
    logger::debug!(startup_config=?conf);
    let server = conf.server.clone();
    let state = AppState::new(conf)?;
    let consumers = start_consumers(&state);

    let web_server = actix_web::HttpServer::new(move || mk_app(state.clone()))
        .bind((server.host.as_str(), server.port))?
        .workers(server.workers)
        .shutdown_timeout(server.shutdown_timeout)
        .run();
    Ok((web_server, consumers))
}
