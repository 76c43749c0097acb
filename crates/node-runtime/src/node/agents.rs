//! Adversary and observer tasks.
//!
//! Both perturb node states between consensus rounds. The adversary acts
//! on one node directly; the observer only broadcasts `Influence` messages
//! and leaves it to each node's listener to apply them.

use super::{SimNode, DEFAULT_ATTRIBUTE_KEYS};
use ob_telemetry::log_node_event;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_bus::MessagePublisher;
use shared_types::{Attributes, Message, MessageKind, NodeId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Sender id carried by observer broadcasts. Never assigned to a node.
pub const OBSERVER_ID: NodeId = NodeId(u32::MAX);

/// Challenge `node` after a random pause drawn from `[min, max]`, until
/// shutdown.
pub async fn run_adversary(
    node: Arc<SimNode>,
    min: Duration,
    max: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let (low, high) = (min.min(max), min.max(max));
    let mut rng = StdRng::from_entropy();

    loop {
        let pause = rng.gen_range(low..=high);
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = time::sleep(pause) => {
                node.challenge(&mut rng);
            }
        }
    }
    log_node_event!(debug, "adversary", node.id(), "Adversary stopped");
}

/// One factor per default attribute key, uniform in `[-strength, strength]`.
pub fn random_influence<R: Rng + ?Sized>(rng: &mut R, strength: f64) -> Attributes {
    let strength = if strength.is_finite() { strength.abs() } else { 0.0 };
    DEFAULT_ATTRIBUTE_KEYS
        .iter()
        .map(|key| (key.to_string(), rng.gen_range(-strength..=strength)))
        .collect()
}

/// Broadcast a random influence every `period` until shutdown.
///
/// The first broadcast goes out one full period after start.
pub async fn run_observer(
    publisher: Arc<dyn MessagePublisher>,
    period: Duration,
    strength: f64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    let mut rng = StdRng::from_entropy();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let influence = random_influence(&mut rng, strength);
                let payload = match serde_json::to_value(&influence) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Influence not serializable");
                        continue;
                    }
                };
                info!(?influence, "Observer injecting influence");
                publisher
                    .publish(Message::broadcast(OBSERVER_ID, MessageKind::Influence, payload))
                    .await;
            }
        }
    }
    debug!("Observer stopped");
}
