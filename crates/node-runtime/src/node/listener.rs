//! Per-node background tasks.

use super::SimNode;
use ob_telemetry::log_node_event;
use shared_bus::{MessagePublisher, Subscription};
use shared_types::{Attributes, ConsensusResult, Message, MessageKind, NodeState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Drain `subscription` into `node` until shutdown or the broker goes away.
///
/// `consensus` results are folded in, `influence` payloads are applied as
/// observer influence, everything else is only logged.
pub async fn run_listener(
    node: Arc<SimNode>,
    mut subscription: Subscription,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            message = subscription.recv() => match message {
                Some(message) => handle(&node, &message),
                None => break,
            },
        }
    }
    log_node_event!(debug, "node", node.id(), "Listener stopped");
}

fn handle(node: &SimNode, message: &Message) {
    match message.kind {
        MessageKind::Consensus => match ConsensusResult::from_message(message) {
            Ok(result) => {
                node.fold_consensus(&result);
            }
            Err(e) => {
                log_node_event!(warn, "node", node.id(), "Malformed consensus payload", error = %e);
            }
        },
        MessageKind::Influence => match message.payload_as::<Attributes>() {
            Ok(influence) => {
                node.apply_influence(&influence);
            }
            Err(e) => {
                log_node_event!(warn, "node", node.id(), "Malformed influence payload", error = %e);
            }
        },
        MessageKind::StateSnapshot => match message.payload_as::<NodeState>() {
            Ok(peer) => {
                log_node_event!(trace, "node", node.id(), "Peer snapshot", peer = %peer.node_id, round_counter = peer.round_counter);
            }
            Err(e) => {
                log_node_event!(warn, "node", node.id(), "Malformed snapshot payload", error = %e);
            }
        },
        MessageKind::Heartbeat => {
            log_node_event!(trace, "node", node.id(), "Peer heartbeat", sender = %message.sender);
        }
    }
}

/// Advance `node` once per `period` until it reaches its recursion limit or
/// shutdown fires.
///
/// Every tick broadcasts a `state_snapshot` when the counter moved, or a
/// `heartbeat` when it could not (the node is not `Active`).
pub async fn run_worker(
    node: Arc<SimNode>,
    publisher: Arc<dyn MessagePublisher>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let message = if node.advance() {
                    snapshot(&node)
                } else {
                    Some(heartbeat(&node))
                };
                if let Some(message) = message {
                    publisher.publish(message).await;
                }
                if node.is_exhausted() {
                    log_node_event!(info, "node", node.id(), "Recursion limit reached", limit = node.recursion_limit());
                    break;
                }
            }
        }
    }
}

fn snapshot(node: &SimNode) -> Option<Message> {
    match serde_json::to_value(node.state()) {
        Ok(payload) => Some(Message::broadcast(node.id(), MessageKind::StateSnapshot, payload)),
        Err(e) => {
            log_node_event!(warn, "node", node.id(), "Snapshot not serializable", error = %e);
            None
        }
    }
}

fn heartbeat(node: &SimNode) -> Message {
    let payload = serde_json::json!({
        "status": node.status(),
        "round_counter": node.round_counter(),
    });
    Message::broadcast(node.id(), MessageKind::Heartbeat, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ob_01_proof_verifier::{ProofScheme, ZkpManager};
    use shared_bus::MessageBroker;
    use shared_types::{NodeId, NodeStatus};
    use std::collections::BTreeSet;

    fn node(id: u32) -> Arc<SimNode> {
        Arc::new(
            SimNode::new(NodeId(id), ProofScheme::Commitment, Arc::new(ZkpManager::default()))
                .with_recursion_limit(5),
        )
    }

    async fn settle<F: Fn() -> bool>(check: F) {
        time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_listener_folds_consensus_and_influence() {
        let broker = MessageBroker::new();
        let node = node(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_listener(node.clone(), broker.subscribe(NodeId(1)), shutdown_rx));

        let result = ConsensusResult::new(
            1,
            [("utilitarian".to_string(), 1.0)].into_iter().collect(),
            BTreeSet::from([NodeId(2)]),
        );
        broker
            .broadcast(NodeId(0), MessageKind::Consensus, result.to_payload().unwrap())
            .await;
        settle(|| node.last_merged_round() == Some(1)).await;

        let before = node.attributes()["virtue"];
        broker
            .broadcast(NodeId(0), MessageKind::Influence, serde_json::json!({"virtue": 1.0}))
            .await;
        settle(|| node.attributes()["virtue"] > before).await;

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_listener_survives_malformed_payload() {
        let broker = MessageBroker::new();
        let node = node(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_listener(node.clone(), broker.subscribe(NodeId(1)), shutdown_rx));

        broker
            .broadcast(NodeId(0), MessageKind::Consensus, serde_json::json!({"round": "x"}))
            .await;
        let result = ConsensusResult::new(4, Attributes::new(), BTreeSet::new());
        broker
            .broadcast(NodeId(0), MessageKind::Consensus, result.to_payload().unwrap())
            .await;
        settle(|| node.last_merged_round() == Some(4)).await;

        drop(shutdown_tx);
        task.await.unwrap();
    }

    fn drain_kinds(subscription: &mut Subscription) -> Vec<MessageKind> {
        let mut kinds = Vec::new();
        while let Ok(Some(message)) = subscription.try_recv() {
            kinds.push(message.kind);
        }
        kinds
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_stops_at_recursion_limit() {
        let broker = Arc::new(MessageBroker::new());
        let mut peer = broker.subscribe(NodeId(2));
        let node = node(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        run_worker(node.clone(), broker.clone(), Duration::from_millis(300), shutdown_rx).await;
        assert_eq!(node.round_counter(), 5);
        assert_eq!(drain_kinds(&mut peer), vec![MessageKind::StateSnapshot; 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_stops_on_shutdown() {
        let broker = Arc::new(MessageBroker::new());
        let node = node(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_worker(
            node.clone(),
            broker.clone(),
            Duration::from_millis(300),
            shutdown_rx,
        ));

        time::sleep(Duration::from_millis(650)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(node.round_counter(), 2);
        assert_eq!(broker.buffer_status().messages_published, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_carries_state() {
        let broker = Arc::new(MessageBroker::new());
        let mut peer = broker.subscribe(NodeId(2));
        let node = node(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_worker(
            node.clone(),
            broker.clone(),
            Duration::from_millis(300),
            shutdown_rx,
        ));

        let message = time::timeout(Duration::from_secs(1), peer.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.sender, NodeId(1));
        let state: NodeState = message.payload_as().unwrap();
        assert_eq!(state.round_counter, 1);
        assert_eq!(state.attributes, node.attributes());

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_frozen_node_sends_heartbeats() {
        let broker = Arc::new(MessageBroker::new());
        let mut peer = broker.subscribe(NodeId(2));
        let node = node(1);
        node.set_status(NodeStatus::Frozen);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_worker(
            node.clone(),
            broker.clone(),
            Duration::from_millis(300),
            shutdown_rx,
        ));

        time::sleep(Duration::from_millis(950)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(node.round_counter(), 0);
        assert_eq!(drain_kinds(&mut peer), vec![MessageKind::Heartbeat; 3]);
    }
}
