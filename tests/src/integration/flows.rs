//! # Integration Test Flows
//!
//! Broker flows between services:
//!
//! 1. **Handler isolation**: a failing consensus handler does not stop the
//!    history observer or the coordinator
//! 2. **Offline delivery**: a node that joins late receives its direct
//!    messages in order, but never broadcasts published before it subscribed
//! 3. **Influence to consensus**: an influence broadcast reshapes every node's
//!    state and the next round's result follows it
//! 4. **Adversarial drift**: challenged nodes diverge, and folding the next
//!    consensus halves the spread between them

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    use node_runtime::node::run_listener;
    use node_runtime::SimNode;
    use ob_01_proof_verifier::{ProofScheme, StateVerifier, ZkpManager};
    use ob_02_trust_ledger::TrustLedger;
    use ob_03_consensus::{
        ConsensusConfig, ConsensusHistory, Coordinator, CoordinatorDependencies, NodeHandle,
        NodeTable,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared_bus::{handler_fn, Delivery, HandlerError, MessageBroker, MessageHandler};
    use shared_types::{Message, MessageKind, NodeId, Recipient};
    use tokio::sync::watch;
    use tokio::time::timeout;

    fn honest_nodes(zkp: &Arc<ZkpManager>, count: u32) -> (Arc<NodeTable>, Vec<Arc<SimNode>>) {
        let table = Arc::new(NodeTable::new());
        let mut nodes = Vec::new();
        for id in 1..=count {
            let node = Arc::new(SimNode::new(NodeId(id), ProofScheme::Commitment, zkp.clone()));
            let handle: Arc<dyn NodeHandle> = node.clone();
            table.register(handle);
            nodes.push(node);
        }
        (table, nodes)
    }

    fn coordinator(
        broker: &Arc<MessageBroker>,
        zkp: &Arc<ZkpManager>,
        table: &Arc<NodeTable>,
    ) -> Coordinator {
        Coordinator::new(CoordinatorDependencies {
            nodes: table.clone(),
            verifier: StateVerifier::new(zkp.clone()),
            trust: Arc::new(TrustLedger::default()),
            publisher: broker.clone(),
            config: ConsensusConfig::default(),
        })
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_history() {
        let broker = Arc::new(MessageBroker::new());
        let zkp = Arc::new(ZkpManager::default());
        let (table, _nodes) = honest_nodes(&zkp, 3);

        let failing = handler_fn("always-fails", |_message: Message| async {
            Err::<(), _>(HandlerError::Failed("observer offline".into()))
        });
        broker.register_handler(MessageKind::Consensus, failing);
        let history = Arc::new(ConsensusHistory::default());
        let observer: Arc<dyn MessageHandler> = history.clone();
        broker.register_handler(MessageKind::Consensus, observer);
        assert_eq!(broker.handler_count(MessageKind::Consensus), 2);

        let coordinator = coordinator(&broker, &zkp, &table);
        let first = coordinator.run_round().await;
        let second = coordinator.run_round().await;

        assert!(first.is_published() && second.is_published());
        let rounds: Vec<u64> = history.snapshot().iter().map(|r| r.round).collect();
        assert_eq!(rounds, vec![first.round, second.round]);
        assert_eq!(
            history.latest().unwrap().contributing_nodes,
            BTreeSet::from([NodeId(1), NodeId(2), NodeId(3)])
        );
    }

    #[tokio::test]
    async fn test_late_joiner_gets_direct_messages_only() {
        let broker = Arc::new(MessageBroker::new());
        let zkp = Arc::new(ZkpManager::default());
        let (table, _nodes) = honest_nodes(&zkp, 3);
        let late = NodeId(3);

        let _early: Vec<_> = [NodeId(1), NodeId(2)]
            .into_iter()
            .map(|id| broker.subscribe(id))
            .collect();

        // Consensus broadcast while node 3 is offline
        let report = coordinator(&broker, &zkp, &table).run_round().await;
        assert!(report.is_published());

        // Two direct snapshots queue up for it
        for seq in 0..2 {
            let delivery = broker
                .publish(Message::new(
                    NodeId(1),
                    Recipient::Node(late),
                    MessageKind::StateSnapshot,
                    serde_json::json!({ "seq": seq }),
                ))
                .await;
            assert_eq!(
                delivery,
                Delivery::Buffered {
                    buffered: seq + 1,
                    evicted: false
                }
            );
        }
        assert_eq!(broker.buffered_count(late), 2);

        let mut subscription = broker.subscribe(late);
        assert_eq!(broker.deliver_buffered(late, subscription.id()), Ok(2));
        assert_eq!(broker.buffered_count(late), 0);

        for seq in 0..2 {
            let message = timeout(Duration::from_secs(1), subscription.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(message.kind, MessageKind::StateSnapshot);
            assert_eq!(message.payload["seq"], serde_json::json!(seq));
        }
        assert_eq!(subscription.try_recv().unwrap(), None);

        let status = broker.buffer_status();
        assert_eq!(status.total_buffered_messages, 0);
        assert_eq!(status.subscribers_count, 3);
    }

    #[tokio::test]
    async fn test_influence_flows_into_next_consensus() {
        let broker = Arc::new(MessageBroker::new());
        let zkp = Arc::new(ZkpManager::default());
        let (table, nodes) = honest_nodes(&zkp, 3);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listeners: Vec<_> = nodes
            .iter()
            .map(|node| {
                tokio::spawn(run_listener(
                    node.clone(),
                    broker.subscribe(node.id()),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        // Doubling one of three equal shares gives it half the mass
        broker
            .broadcast(
                NodeId(0),
                MessageKind::Influence,
                serde_json::json!({ "virtue": 1.0 }),
            )
            .await;
        timeout(Duration::from_secs(5), async {
            while !nodes
                .iter()
                .all(|node| (node.attributes()["virtue"] - 0.5).abs() < 1e-9)
            {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("influence not applied");

        let report = coordinator(&broker, &zkp, &table).run_round().await;
        let result = report.result.unwrap();
        assert!((result.attributes["virtue"] - 0.5).abs() < 1e-9);
        assert!((result.attributes["utilitarian"] - 0.25).abs() < 1e-9);

        // Every node folds the result it helped produce
        timeout(Duration::from_secs(5), async {
            while !nodes
                .iter()
                .all(|node| node.last_merged_round() == Some(report.round))
            {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("consensus not folded");

        shutdown_tx.send(true).unwrap();
        for listener in listeners {
            listener.await.unwrap();
        }
    }

    fn spread(nodes: &[Arc<SimNode>]) -> f64 {
        let mut widest: f64 = 0.0;
        for a in nodes {
            for b in nodes {
                let (a, b) = (a.attributes(), b.attributes());
                for (key, value) in &a {
                    widest = widest.max((value - b[key]).abs());
                }
            }
        }
        widest
    }

    #[tokio::test]
    async fn test_consensus_reconciles_adversarial_drift() {
        let broker = Arc::new(MessageBroker::new());
        let zkp = Arc::new(ZkpManager::default());
        let (table, nodes) = honest_nodes(&zkp, 3);

        for (seed, node) in nodes.iter().enumerate() {
            node.advance();
            node.advance();
            assert!(node.challenge(&mut StdRng::seed_from_u64(seed as u64 + 1)));
        }
        let drift = spread(&nodes);
        assert!(drift > 0.0);

        let report = coordinator(&broker, &zkp, &table).run_round().await;
        let result = report.result.unwrap();
        assert_eq!(result.contributing_nodes.len(), 3);

        // Every node moves halfway to the same target
        for node in &nodes {
            assert!(node.fold_consensus(&result));
            assert!(node.state().check_distribution().is_ok());
        }
        assert!((spread(&nodes) - drift / 2.0).abs() < 1e-9);
    }
}
