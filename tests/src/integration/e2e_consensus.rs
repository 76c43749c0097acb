//! # End-to-End Consensus Rounds
//!
//! Full rounds over real services: simulated nodes prove their state, the
//! coordinator verifies, enforces quorum, aggregates by trust and publishes
//! through the broker to every subscriber.
//!
//! ## Scenarios
//!
//! 1. **Corrupted node**: three nodes, one tampering with its proof
//! 2. **Zero trust**: a node whose trust fell to zero is verified but does not
//!    weigh in
//! 3. **Quorum failure**: nothing is published, no trust moves
//! 4. **Stalled node**: absent after the collection timeout, trust untouched
//! 5. **Schnorr runtime**: the full runtime over successive rounds

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use node_runtime::{NodeConfig, NodeRuntime, SimNode};
    use ob_01_proof_verifier::{ProofScheme, StateBundle, StateVerifier, ZkpManager};
    use ob_02_trust_ledger::{TrustConfig, TrustLedger};
    use ob_03_consensus::{
        aggregate, ConsensusConfig, ConsensusError, Coordinator, CoordinatorDependencies,
        ManualScheduler, NodeError, NodeHandle, NodeTable, RoundPhase,
    };
    use shared_bus::{MessageBroker, Subscription};
    use shared_types::{Attributes, ConsensusResult, MessageKind, NodeId, NodeState};
    use tokio::time::timeout;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const A: NodeId = NodeId(1);
    const B: NodeId = NodeId(2);
    const C: NodeId = NodeId(3);

    fn attrs(x: f64) -> Attributes {
        [("x".to_string(), x), ("y".to_string(), 1.0 - x)]
            .into_iter()
            .collect()
    }

    struct Network {
        broker: Arc<MessageBroker>,
        trust: Arc<TrustLedger>,
        zkp: Arc<ZkpManager>,
        nodes: Arc<NodeTable>,
        coordinator: Coordinator,
    }

    impl Network {
        fn new(trust: TrustConfig) -> Self {
            let broker = Arc::new(MessageBroker::new());
            let trust = Arc::new(TrustLedger::new(trust));
            let zkp = Arc::new(ZkpManager::default());
            let nodes = Arc::new(NodeTable::new());
            let coordinator = Coordinator::new(CoordinatorDependencies {
                nodes: nodes.clone(),
                verifier: StateVerifier::new(zkp.clone()),
                trust: trust.clone(),
                publisher: broker.clone(),
                config: ConsensusConfig::default(),
            });
            Self {
                broker,
                trust,
                zkp,
                nodes,
                coordinator,
            }
        }

        fn add(&self, id: NodeId, x: f64, faulty: bool) -> Arc<SimNode> {
            let node = Arc::new(
                SimNode::new(id, ProofScheme::Commitment, self.zkp.clone())
                    .with_attributes(attrs(x))
                    .with_faulty(faulty),
            );
            let handle: Arc<dyn NodeHandle> = node.clone();
            self.nodes.register(handle);
            node
        }

        fn subscribe_all(&self) -> Vec<Subscription> {
            self.nodes
                .ids()
                .into_iter()
                .map(|id| self.broker.subscribe(id))
                .collect()
        }
    }

    async fn next_result(subscription: &mut Subscription) -> ConsensusResult {
        let message = timeout(Duration::from_secs(1), subscription.recv())
            .await
            .expect("no message within timeout")
            .expect("broker closed");
        assert_eq!(message.kind, MessageKind::Consensus);
        assert!(message.is_broadcast());
        ConsensusResult::from_message(&message).unwrap()
    }

    /// Never answers within any reasonable collection timeout.
    struct StalledNode(NodeId);

    #[async_trait]
    impl NodeHandle for StalledNode {
        fn id(&self) -> NodeId {
            self.0
        }

        async fn verifiable_state(&self) -> Result<StateBundle, NodeError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(NodeError::Unavailable("stalled".into()))
        }
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[tokio::test]
    async fn test_corrupted_node_is_excluded_and_penalised() {
        let network = Network::new(TrustConfig::default());
        network.add(A, 0.2, false);
        network.add(B, 0.5, false);
        network.add(C, 0.8, true);
        let mut subscribers = network.subscribe_all();

        let report = network.coordinator.run_round().await;

        assert_eq!(report.phase, RoundPhase::Published);
        assert_eq!(report.valid, vec![A, B]);
        assert_eq!(report.failed, vec![C]);
        assert!(report.absent.is_empty());

        let result = report.result.expect("published round carries its result");
        assert_eq!(result.contributing_nodes, BTreeSet::from([A, B]));
        assert!((result.attributes["x"] - 0.35).abs() < 1e-9);
        assert!((result.attributes["y"] - 0.65).abs() < 1e-9);

        // Broadcast reaches all three, the corrupted node included
        for subscription in &mut subscribers {
            let received = next_result(subscription).await;
            assert_eq!(received.round, report.round);
            assert_eq!(received.contributing_nodes, result.contributing_nodes);
        }

        let trust = &network.trust;
        assert_eq!(trust.score(A), Some(1.0));
        assert_eq!(trust.score(B), Some(1.0));
        assert!((trust.score(C).unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(trust.record(C).unwrap().failures, 1);
    }

    #[test]
    fn test_zero_weight_state_is_excluded_from_aggregate() {
        let states: Vec<NodeState> = [(A, 0.2), (B, 0.5), (C, 0.8)]
            .into_iter()
            .map(|(id, x)| NodeState::new(id, attrs(x)))
            .collect();
        let refs: Vec<&NodeState> = states.iter().collect();

        let result = aggregate(&refs, &[1.0, 1.0, 0.0]);

        assert!((result.attributes["x"] - 0.35).abs() < 1e-9);
        assert_eq!(result.contributors, BTreeSet::from([A, B]));
    }

    #[tokio::test]
    async fn test_node_with_zero_trust_verifies_but_does_not_contribute() {
        let network = Network::new(TrustConfig {
            minimum_trust: 0.0,
            failure_delta: -1.0,
            ..TrustConfig::default()
        });
        network.add(A, 0.2, false);
        network.add(B, 0.5, false);
        network.add(C, 0.8, true);

        let first = network.coordinator.run_round().await;
        assert!(first.is_published());
        assert_eq!(network.trust.score(C), Some(0.0));

        // C comes back honest with the same state
        network.add(C, 0.8, false);
        let second = network.coordinator.run_round().await;

        assert_eq!(second.round, first.round + 1);
        assert_eq!(second.valid, vec![A, B, C]);
        let result = second.result.unwrap();
        assert_eq!(result.contributing_nodes, BTreeSet::from([A, B]));
        assert!((result.attributes["x"] - 0.35).abs() < 1e-9);

        // Success still recorded, weight recovers
        assert!((network.trust.score(C).unwrap() - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_quorum_failure_publishes_nothing() {
        let network = Network::new(TrustConfig::default());
        let honest = network.add(A, 0.2, false);
        network.add(B, 0.5, true);
        network.add(C, 0.8, true);
        let mut subscribers = network.subscribe_all();
        let before = honest.attributes();

        let report = network.coordinator.run_round().await;

        assert_eq!(report.phase, RoundPhase::QuorumFailed);
        assert_eq!(
            report.error,
            Some(ConsensusError::QuorumNotMet {
                valid: 1,
                required: 2,
                peers: 3,
            })
        );
        assert!(report.result.is_none());
        for subscription in &mut subscribers {
            assert_eq!(subscription.try_recv().unwrap(), None);
        }
        assert!(network.trust.is_empty());
        assert_eq!(honest.attributes(), before);
        assert_eq!(network.broker.buffer_status().messages_published, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_node_is_absent_and_keeps_trust() {
        let network = Network::new(TrustConfig::default());
        network.add(A, 0.2, false);
        network.add(B, 0.5, false);
        network.add(C, 0.8, false);
        network.nodes.register(Arc::new(StalledNode(NodeId(4))));

        let started = tokio::time::Instant::now();
        let report = network.coordinator.run_round().await;

        // 3 of 4 meets ceil(2 * 4 / 3) = 3
        assert!(report.is_published());
        assert_eq!(report.absent, vec![NodeId(4)]);
        let limit = network.coordinator.config().collection_timeout();
        assert!(started.elapsed() >= limit);
        assert!(started.elapsed() < limit + Duration::from_millis(100));
        assert_eq!(network.trust.score(NodeId(4)), None);
        assert_eq!(network.trust.len(), 3);
    }

    #[tokio::test]
    async fn test_schnorr_runtime_over_successive_rounds() {
        let mut config = NodeConfig::default();
        config.simulation.scheme = ProofScheme::Schnorr;
        config.simulation.faulty_nodes.insert(B);
        let runtime = NodeRuntime::new(config).unwrap();
        let services = runtime.container();

        let (scheduler, trigger) = ManualScheduler::new();
        runtime.start_with(scheduler);
        assert!(trigger.trigger());
        assert!(trigger.trigger());

        timeout(Duration::from_secs(30), async {
            while services.trust.record(B).map_or(0, |r| r.failures) < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("two rounds did not complete");

        let rounds: Vec<u64> = services.history.snapshot().iter().map(|r| r.round).collect();
        assert_eq!(rounds, vec![1, 2]);
        for result in services.history.snapshot() {
            assert_eq!(result.contributing_nodes, BTreeSet::from([A, C]));
        }
        assert!((services.trust.score(B).unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(services.trust.record(A).unwrap().successes, 2);

        runtime.shutdown().await;
    }
}
