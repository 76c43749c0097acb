//! The runtime: spawns node tasks and the coordinator, and tears them down.

use std::sync::Arc;
use std::time::Duration;

use ob_03_consensus::{IntervalScheduler, RoundScheduler};
use parking_lot::Mutex;
use shared_bus::MessagePublisher;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::{ConfigError, NodeConfig, ServiceContainer};
use crate::node::{run_adversary, run_listener, run_observer, run_worker};

/// How long `shutdown` waits for each task before aborting it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The simulation runtime orchestrating every service.
pub struct NodeRuntime {
    /// Service container with all initialized services.
    container: Arc<ServiceContainer>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
    /// Spawned tasks, joined on shutdown.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NodeRuntime {
    /// Create a runtime from configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the configuration does not validate.
    pub fn new(config: NodeConfig) -> Result<Self, ConfigError> {
        info!("Creating Ouroboros runtime");
        let container = Arc::new(ServiceContainer::new(config)?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Start nodes and the coordinator with rounds every
    /// `consensus.round_interval_ms`.
    pub fn start(&self) {
        let period = self.container.config.consensus.round_interval();
        self.start_with(IntervalScheduler::new(period));
    }

    /// Start nodes and the coordinator on a custom round scheduler.
    ///
    /// ## Startup Sequence
    ///
    /// 1. Subscribe every node to the broker and flush anything buffered
    /// 2. Spawn one listener, one worker and (if enabled) one adversary per
    ///    node
    /// 3. Spawn the observer, if enabled
    /// 4. Spawn the coordinator loop
    pub fn start_with<S>(&self, scheduler: S)
    where
        S: RoundScheduler + 'static,
    {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            warn!("Runtime already started");
            return;
        }

        info!("===========================================");
        info!("  Ouroboros Consensus Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let container = &self.container;
        let sim = &container.config.simulation;
        let period = sim.advance_interval();
        let (adversary_min, adversary_max) = sim.adversary_interval();
        let publisher: Arc<dyn MessagePublisher> = container.broker.clone();
        for node in &container.sim_nodes {
            let id = node.id();
            let subscription = container.broker.subscribe(id);
            match container.broker.deliver_buffered(id, subscription.id()) {
                Ok(0) => {}
                Ok(flushed) => info!(node_id = %id, flushed, "Delivered buffered messages"),
                Err(e) => warn!(node_id = %id, error = %e, "Buffer flush failed"),
            }

            tasks.push(tokio::spawn(run_listener(
                node.clone(),
                subscription,
                self.shutdown_rx.clone(),
            )));
            tasks.push(tokio::spawn(run_worker(
                node.clone(),
                publisher.clone(),
                period,
                self.shutdown_rx.clone(),
            )));
            if sim.adversaries {
                tasks.push(tokio::spawn(run_adversary(
                    node.clone(),
                    adversary_min,
                    adversary_max,
                    self.shutdown_rx.clone(),
                )));
            }
        }

        if sim.observer {
            tasks.push(tokio::spawn(run_observer(
                publisher.clone(),
                sim.observer_interval(),
                sim.observer_strength,
                self.shutdown_rx.clone(),
            )));
        }

        let coordinator = container.coordinator.clone();
        let shutdown = self.shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            coordinator.run(scheduler, shutdown).await;
        }));

        info!(
            nodes = container.sim_nodes.len(),
            adversaries = sim.adversaries,
            observer = sim.observer,
            tasks = tasks.len(),
            "Runtime started"
        );
    }

    /// Shut the runtime down.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Signal shutdown to every task
    /// 2. Join each task, aborting any that overrun `SHUTDOWN_GRACE`
    /// 3. Log final trust scores
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let abort = task.abort_handle();
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Task ended abnormally"),
                Err(_) => {
                    abort.abort();
                    warn!("Task did not stop in time, aborted");
                }
            }
        }

        for record in self.container.trust.snapshot() {
            info!(
                node_id = %record.node_id,
                score = record.score,
                successes = record.successes,
                failures = record.failures,
                "Final trust"
            );
        }
        info!(
            rounds = self.container.coordinator.current_round(),
            published = self.container.history.len(),
            "Shutdown complete"
        );
    }

    /// Whether `start` has run and `shutdown` has not.
    pub fn is_running(&self) -> bool {
        !self.tasks.lock().is_empty()
    }

    /// Get a reference to the service container.
    pub fn container(&self) -> Arc<ServiceContainer> {
        Arc::clone(&self.container)
    }
}
