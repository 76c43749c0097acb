use super::*;
use crate::ports::NodeError;
use crate::scheduler::ManualScheduler;
use async_trait::async_trait;
use ob_01_proof_verifier::{CommitmentBundle, ProofBundle, ZkpManager};
use parking_lot::Mutex as SyncMutex;
use shared_bus::Delivery;
use shared_types::Attributes;
use std::time::Duration;

// Mock implementations for testing
#[derive(Default)]
struct MockPublisher {
    published: SyncMutex<Vec<Message>>,
}

impl MockPublisher {
    fn count(&self) -> usize {
        self.published.lock().len()
    }

    fn results(&self) -> Vec<ConsensusResult> {
        self.published
            .lock()
            .iter()
            .map(|m| ConsensusResult::from_message(m).unwrap())
            .collect()
    }
}

#[async_trait]
impl MessagePublisher for MockPublisher {
    async fn publish(&self, message: Message) -> Delivery {
        self.published.lock().push(message);
        Delivery::Delivered { channels: 0 }
    }
}

#[derive(Clone, Copy)]
enum Behavior {
    Honest,
    CorruptProof,
    Stall,
    Unavailable,
    Unnormalized,
    Schnorr,
}

struct MockNode {
    id: NodeId,
    x: f64,
    behavior: Behavior,
    zkp: Arc<ZkpManager>,
}

impl MockNode {
    fn state(&self) -> NodeState {
        let mut attributes = Attributes::new();
        attributes.insert("x".into(), self.x);
        attributes.insert("y".into(), 1.0 - self.x);
        NodeState::new(self.id, attributes)
    }
}

#[async_trait]
impl NodeHandle for MockNode {
    fn id(&self) -> NodeId {
        self.id
    }

    async fn verifiable_state(&self) -> Result<StateBundle, NodeError> {
        let mut state = self.state();
        let proof = match self.behavior {
            Behavior::Honest => ProofBundle::Commitment(CommitmentBundle::prove(&state)),
            Behavior::CorruptProof => {
                let mut bundle = CommitmentBundle::prove(&state);
                bundle.proof.0[0] ^= 0x01;
                ProofBundle::Commitment(bundle)
            }
            Behavior::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                ProofBundle::Commitment(CommitmentBundle::prove(&state))
            }
            Behavior::Unavailable => return Err(NodeError::Unavailable("offline".into())),
            Behavior::Unnormalized => {
                state.attributes.insert("z".into(), 0.5);
                ProofBundle::Commitment(CommitmentBundle::prove(&state))
            }
            Behavior::Schnorr => {
                ProofBundle::Schnorr(self.zkp.create_state_proof(self.id, &state)?)
            }
        };
        Ok(StateBundle { state, proof })
    }
}

struct Harness {
    coordinator: Arc<Coordinator>,
    publisher: Arc<MockPublisher>,
    trust: Arc<TrustLedger>,
}

fn harness(nodes: &[(u32, f64, Behavior)], config: ConsensusConfig) -> Harness {
    let zkp = Arc::new(ZkpManager::default());
    let table = Arc::new(NodeTable::new());
    for &(id, x, behavior) in nodes {
        if matches!(behavior, Behavior::Schnorr) {
            zkp.initialize_node(NodeId(id));
        }
        table.register(Arc::new(MockNode {
            id: NodeId(id),
            x,
            behavior,
            zkp: Arc::clone(&zkp),
        }));
    }

    let publisher = Arc::new(MockPublisher::default());
    let trust = Arc::new(TrustLedger::default());
    let coordinator = Arc::new(Coordinator::new(CoordinatorDependencies {
        nodes: table,
        verifier: StateVerifier::new(zkp),
        trust: Arc::clone(&trust),
        publisher: publisher.clone(),
        config,
    }));

    Harness {
        coordinator,
        publisher,
        trust,
    }
}

fn honest(ids: std::ops::RangeInclusive<u32>) -> Vec<(u32, f64, Behavior)> {
    ids.map(|id| (id, 0.5, Behavior::Honest)).collect()
}

// === QUORUM ===

#[tokio::test]
async fn test_four_of_six_reaches_aggregation() {
    let mut nodes = honest(1..=4);
    nodes.push((5, 0.5, Behavior::CorruptProof));
    nodes.push((6, 0.5, Behavior::CorruptProof));
    let h = harness(&nodes, ConsensusConfig::default());

    let report = h.coordinator.run_round().await;

    assert_eq!(report.phase, RoundPhase::Published);
    assert_eq!(report.valid.len(), 4);
    assert_eq!(report.failed, vec![NodeId(5), NodeId(6)]);
    assert_eq!(h.publisher.count(), 1);
}

#[tokio::test]
async fn test_three_of_six_fails_quorum() {
    let mut nodes = honest(1..=3);
    for id in 4..=6 {
        nodes.push((id, 0.5, Behavior::CorruptProof));
    }
    let h = harness(&nodes, ConsensusConfig::default());

    let report = h.coordinator.run_round().await;

    assert_eq!(report.phase, RoundPhase::QuorumFailed);
    assert_eq!(
        report.error,
        Some(ConsensusError::QuorumNotMet {
            valid: 3,
            required: 4,
            peers: 6
        })
    );
    assert!(report.result.is_none());
    assert_eq!(h.publisher.count(), 0);
    assert!(h.trust.is_empty());
}

#[tokio::test]
async fn test_no_peers() {
    let h = harness(&[], ConsensusConfig::default());
    let report = h.coordinator.run_round().await;

    assert_eq!(report.phase, RoundPhase::QuorumFailed);
    assert_eq!(report.error, Some(ConsensusError::NoPeers));
    assert_eq!(h.publisher.count(), 0);
}

#[tokio::test]
async fn test_custom_quorum() {
    let nodes = vec![
        (1, 0.5, Behavior::Honest),
        (2, 0.5, Behavior::Honest),
        (3, 0.5, Behavior::CorruptProof),
    ];
    let config = ConsensusConfig {
        quorum: "1/1".parse().unwrap(),
        ..ConsensusConfig::default()
    };
    let h = harness(&nodes, config);
    assert_eq!(h.coordinator.run_round().await.phase, RoundPhase::QuorumFailed);
}

// === TRUST ===

#[tokio::test]
async fn test_trust_updates_after_publish() {
    let mut nodes = honest(1..=4);
    nodes.push((5, 0.5, Behavior::CorruptProof));
    nodes.push((6, 0.5, Behavior::Unavailable));
    let h = harness(&nodes, ConsensusConfig::default());

    let report = h.coordinator.run_round().await;
    assert!(report.is_published());

    assert_eq!(h.trust.score(NodeId(1)), Some(1.0));
    assert_eq!(h.trust.record(NodeId(1)).unwrap().successes, 1);
    let failed = h.trust.score(NodeId(5)).unwrap();
    assert!((failed - 0.8).abs() < 1e-9);
    assert_eq!(h.trust.score(NodeId(6)), None);
    assert_eq!(report.absent, vec![NodeId(6)]);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_node_is_absent_not_failed() {
    let nodes = vec![
        (1, 0.5, Behavior::Honest),
        (2, 0.5, Behavior::Honest),
        (3, 0.5, Behavior::Stall),
    ];
    let h = harness(&nodes, ConsensusConfig::default());

    let started = tokio::time::Instant::now();
    let report = h.coordinator.run_round().await;

    assert_eq!(started.elapsed(), Duration::from_secs(1));
    assert!(report.is_published());
    assert_eq!(report.absent, vec![NodeId(3)]);
    assert!(report.failed.is_empty());
    assert_eq!(h.trust.score(NodeId(3)), None);
}

#[tokio::test]
async fn test_unnormalized_state_is_verification_failure() {
    let nodes = vec![
        (1, 0.5, Behavior::Honest),
        (2, 0.5, Behavior::Honest),
        (3, 0.5, Behavior::Unnormalized),
    ];
    let h = harness(&nodes, ConsensusConfig::default());

    let report = h.coordinator.run_round().await;
    assert_eq!(report.failed, vec![NodeId(3)]);
    assert!(report.is_published());
}

// === AGGREGATION ===

#[tokio::test]
async fn test_result_is_trust_weighted() {
    let nodes = vec![
        (1, 0.2, Behavior::Honest),
        (2, 0.5, Behavior::Honest),
        (3, 0.8, Behavior::Honest),
    ];
    let h = harness(&nodes, ConsensusConfig::default());
    for _ in 0..5 {
        h.trust.update(NodeId(3), false);
    }

    let report = h.coordinator.run_round().await;
    let result = report.result.unwrap();

    let expected = (0.2 + 0.5 + 0.1 * 0.8) / 2.1;
    assert!((result.attributes["x"] - expected).abs() < 1e-9);
    assert_eq!(result.contributing_nodes.len(), 3);
    assert_eq!(result.round, 1);

    let published = h.publisher.results();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].round, result.round);
    assert_eq!(published[0].contributing_nodes, result.contributing_nodes);
}

#[tokio::test]
async fn test_failed_nodes_excluded_from_result() {
    let nodes = vec![
        (1, 0.2, Behavior::Honest),
        (2, 0.4, Behavior::Honest),
        (3, 0.9, Behavior::CorruptProof),
    ];
    let h = harness(&nodes, ConsensusConfig::default());

    let result = h.coordinator.run_round().await.result.unwrap();
    assert!((result.attributes["x"] - 0.3).abs() < 1e-9);
    assert!(!result.contributing_nodes.contains(&NodeId(3)));
}

// === SCHNORR ===

#[tokio::test]
async fn test_schnorr_nodes_verify() {
    let nodes = vec![
        (1, 0.3, Behavior::Schnorr),
        (2, 0.6, Behavior::Schnorr),
        (3, 0.9, Behavior::Honest),
    ];
    let h = harness(&nodes, ConsensusConfig::default());

    let report = h.coordinator.run_round().await;
    assert_eq!(report.valid, vec![NodeId(1), NodeId(2), NodeId(3)]);
}

// === ROUNDS ===

#[tokio::test]
async fn test_rounds_are_numbered_sequentially() {
    let h = harness(&honest(1..=3), ConsensusConfig::default());

    for expected in 1..=3 {
        let report = h.coordinator.run_round().await;
        assert_eq!(report.round, expected);
        assert_eq!(h.coordinator.phase(), RoundPhase::Idle);
    }
    assert_eq!(h.coordinator.current_round(), 3);

    let rounds: Vec<_> = h.publisher.results().iter().map(|r| r.round).collect();
    assert_eq!(rounds, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_concurrent_calls_do_not_overlap() {
    let h = harness(&honest(1..=3), ConsensusConfig::default());

    let (a, b) = tokio::join!(h.coordinator.run_round(), h.coordinator.run_round());
    let mut rounds = vec![a.round, b.round];
    rounds.sort_unstable();
    assert_eq!(rounds, vec![1, 2]);
    assert_eq!(h.publisher.count(), 2);
}

#[tokio::test]
async fn test_run_with_manual_scheduler() {
    let h = harness(&honest(1..=3), ConsensusConfig::default());
    let (scheduler, trigger) = ManualScheduler::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let coordinator = Arc::clone(&h.coordinator);
    let task = tokio::spawn(async move { coordinator.run(scheduler, shutdown_rx).await });

    trigger.trigger();
    trigger.trigger();

    let publisher = Arc::clone(&h.publisher);
    tokio::time::timeout(Duration::from_secs(5), async move {
        while publisher.count() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("two rounds");

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
    assert_eq!(h.coordinator.current_round(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_collection_publishes_nothing() {
    let nodes = vec![
        (1, 0.5, Behavior::Stall),
        (2, 0.5, Behavior::Stall),
        (3, 0.5, Behavior::Stall),
    ];
    let config = ConsensusConfig {
        collection_timeout_ms: 10_000,
        ..ConsensusConfig::default()
    };
    let h = harness(&nodes, config);
    let (scheduler, trigger) = ManualScheduler::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let coordinator = Arc::clone(&h.coordinator);
    let task = tokio::spawn(async move { coordinator.run(scheduler, shutdown_rx).await });

    trigger.trigger();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.coordinator.phase(), RoundPhase::Collecting);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();

    assert_eq!(h.coordinator.current_round(), 1);
    assert_eq!(h.coordinator.phase(), RoundPhase::Idle);
    assert_eq!(h.publisher.count(), 0);
    assert!(h.trust.is_empty());
}

#[tokio::test]
async fn test_run_exits_when_shutdown_sender_dropped() {
    let h = harness(&honest(1..=3), ConsensusConfig::default());
    let (scheduler, _trigger) = ManualScheduler::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(shutdown_tx);

    tokio::time::timeout(Duration::from_secs(1), h.coordinator.run(scheduler, shutdown_rx))
        .await
        .expect("run should stop");
    assert_eq!(h.coordinator.current_round(), 0);
}
