use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use log::*;
use payin_engine::{
    core_api::CaptureFlowApi,
    events::{EventHandlers, EventHooks},
    jobs::{CaptureScheduler, JobPool},
    traits::{PaymentIntentStore, PaymentProviderGateway},
    SqliteDatabase,
};
use tokio::task::JoinHandle;

use crate::{config::WorkerConfig, errors::WorkerError, stripe::StripeGateway};

/// Wires up the store, gateway, pool and scheduler, starts the periodic workers, and runs until ctrl-c.
pub async fn run_worker(config: WorkerConfig) -> Result<(), WorkerError> {
    payin_engine::sqlite::create_database_if_missing(&config.database_url)
        .await
        .map_err(|e| WorkerError::InitializeError(e.to_string()))?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| WorkerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| WorkerError::InitializeError(e.to_string()))?;

    let gateway = StripeGateway::new(&config.provider)?;
    match gateway.balance().await {
        Ok(balance) => info!("🏦️ Provider reachable. Available balance: {} {}", balance.available, balance.currency),
        Err(e) => warn!("🏦️ Provider balance probe failed: {e}. Captures will be attempted anyway."),
    }

    let mut hooks = EventHooks::default();
    hooks.on_capture_completed(|event| {
        Box::pin(async move {
            info!("🧾️ Intent {} settled for {} {}", event.intent.id, event.receipt.amount, event.receipt.currency);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_capture_failed(|event| {
        Box::pin(async move {
            warn!("🧾️ Intent {} failed to capture: {}", event.intent.id, event.decline);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(32, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let pool = Arc::new(JobPool::new("capture", config.pool_capacity));
    let api = Arc::new(CaptureFlowApi::new(db.clone(), gateway, producers));
    let scheduler = Arc::new(
        CaptureScheduler::new(db, api, Arc::clone(&pool))
            .with_page_size(config.page_size)
            .with_stale_after(config.stale_after),
    );

    let discovery = start_discovery_worker(Arc::clone(&scheduler), config.discovery_interval);
    let recovery = config.recovery_enabled.then(|| start_recovery_worker(scheduler, config.recovery_interval));

    tokio::signal::ctrl_c().await?;
    info!("🛑️ Shutdown signal received");
    discovery.abort();
    if let Some(handle) = recovery {
        handle.abort();
    }
    pool.shutdown(config.shutdown_grace).await;
    Ok(())
}

/// Starts the discovery worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_discovery_worker<S, G>(scheduler: Arc<CaptureScheduler<S, G>>, interval: Duration) -> JoinHandle<()>
where
    S: PaymentIntentStore + 'static,
    G: PaymentProviderGateway + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("📅️ Capture discovery worker started");
        loop {
            timer.tick().await;
            match scheduler.discovery_pass().await {
                Ok(summary) if summary.dispatched > 0 => {
                    info!(
                        "📅️ Dispatched {} capture job(s) over {} page(s)",
                        summary.dispatched, summary.pages
                    );
                },
                Ok(_) => debug!("📅️ No intents due for capture"),
                Err(e) => error!("📅️ Discovery pass failed: {e}"),
            }
        }
    })
}

/// Starts the staleness recovery worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_recovery_worker<S, G>(scheduler: Arc<CaptureScheduler<S, G>>, interval: Duration) -> JoinHandle<()>
where
    S: PaymentIntentStore + 'static,
    G: PaymentProviderGateway + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🔁️ Staleness recovery worker started");
        loop {
            timer.tick().await;
            match scheduler.recovery_pass().await {
                Ok(stats) if stats.dispatched > 0 => info!("🔁️ Re-armed {} stuck capture(s)", stats.dispatched),
                Ok(_) => debug!("🔁️ No stuck captures found"),
                Err(e) => error!("🔁️ Recovery pass failed: {e}"),
            }
        }
    })
}
