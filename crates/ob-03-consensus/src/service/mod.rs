//! Consensus Coordinator - round protocol
//!
//! # Round
//! 1. Collecting: fetch every peer's bundle concurrently, each bounded by the
//!    collection timeout. Timeouts and fetch errors mark the peer absent.
//! 2. Verifying: distribution check, then the bundle's proof scheme.
//!    Failures are logged and excluded.
//! 3. Quorum: `|valid| >= ceil(n/d * P)` over all known peers `P`.
//! 4. Aggregating: trust-weighted mean over keys common to all valid states.
//! 5. Published: broadcast a `consensus` message, then success updates for
//!    valid peers and failure updates for failed peers. Absent peers are
//!    left alone.
//!
//! A failed quorum publishes nothing and touches no trust score.

use crate::domain::{aggregate, ConsensusConfig, ConsensusError, RoundPhase, RoundReport};
use crate::nodes::NodeTable;
use crate::ports::{MessagePublisher, NodeHandle};
use crate::scheduler::RoundScheduler;
use crate::state::CoordinatorState;
use futures::future::join_all;
use ob_01_proof_verifier::{StateBundle, StateVerifier};
use ob_02_trust_ledger::TrustLedger;
use shared_types::{ConsensusResult, Message, MessageKind, NodeId, NodeState};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Dependencies for Coordinator
pub struct CoordinatorDependencies {
    pub nodes: Arc<NodeTable>,
    pub verifier: StateVerifier,
    pub trust: Arc<TrustLedger>,
    pub publisher: Arc<dyn MessagePublisher>,
    pub config: ConsensusConfig,
}

/// Consensus Coordinator
///
/// Owns nothing long-lived beyond its round counter; peers, trust and the
/// broker are shared.
pub struct Coordinator {
    nodes: Arc<NodeTable>,
    verifier: StateVerifier,
    trust: Arc<TrustLedger>,
    publisher: Arc<dyn MessagePublisher>,
    config: ConsensusConfig,
    state: CoordinatorState,
    /// Held for the whole of a round so rounds never overlap.
    round_lock: Mutex<()>,
}

enum Collected {
    Responded(NodeId, StateBundle),
    Absent(NodeId),
}

impl Coordinator {
    pub fn new(deps: CoordinatorDependencies) -> Self {
        Self {
            nodes: deps.nodes,
            verifier: deps.verifier,
            trust: deps.trust,
            publisher: deps.publisher,
            config: deps.config,
            state: CoordinatorState::new(),
            round_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Last round started (0 before the first).
    pub fn current_round(&self) -> u64 {
        self.state.current_round()
    }

    pub fn phase(&self) -> RoundPhase {
        self.state.phase()
    }

    /// Run one full round and return to `Idle`.
    pub async fn run_round(&self) -> RoundReport {
        let _guard = self.round_lock.lock().await;
        let round = self.state.begin_round();
        let mut report = RoundReport::new(round);

        info!(round, peers = self.nodes.len(), "Consensus round started");
        self.execute(&mut report).await;
        self.state.transition(round, RoundPhase::Idle);

        report
    }

    /// Run rounds on `scheduler` until `shutdown` flips to true or its
    /// sender is dropped. A round in flight at shutdown is abandoned before
    /// it publishes.
    pub async fn run<S: RoundScheduler>(&self, mut scheduler: S, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.config.round_interval_ms,
            quorum = %self.config.quorum,
            "Coordinator started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = scheduler.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    warn!(round = self.current_round(), "Shutdown during round, abandoning it");
                    break;
                }
                report = self.run_round() => {
                    debug!(round = report.round, phase = %report.phase, "Round finished");
                }
            }
        }

        self.state.transition(self.current_round(), RoundPhase::Idle);
        info!(rounds = self.current_round(), "Coordinator stopped");
    }

    async fn execute(&self, report: &mut RoundReport) {
        let round = report.round;
        let handles = self.nodes.handles();
        let peers = handles.len();

        self.enter(report, RoundPhase::Collecting);
        let collected = self.collect(round, &handles).await;

        self.enter(report, RoundPhase::Verifying);
        let mut valid: Vec<(NodeId, NodeState)> = Vec::new();
        for entry in collected {
            match entry {
                Collected::Absent(node_id) => report.absent.push(node_id),
                Collected::Responded(node_id, bundle) => {
                    if self.verify(round, node_id, &bundle) {
                        report.valid.push(node_id);
                        valid.push((node_id, bundle.state));
                    } else {
                        report.failed.push(node_id);
                    }
                }
            }
        }

        if peers == 0 {
            warn!(round, "Quorum failed: no peers registered");
            self.fail(report, ConsensusError::NoPeers);
            return;
        }

        let required = self.config.quorum.required(peers);
        if !self.config.quorum.is_met(valid.len(), peers) {
            warn!(
                round,
                valid = valid.len(),
                required,
                peers,
                "Quorum failed, retrying next interval"
            );
            self.fail(
                report,
                ConsensusError::QuorumNotMet {
                    valid: valid.len(),
                    required,
                    peers,
                },
            );
            return;
        }
        self.enter(report, RoundPhase::QuorumMet);

        self.enter(report, RoundPhase::Aggregating);
        let ids: Vec<NodeId> = valid.iter().map(|(id, _)| *id).collect();
        let weights = self.trust.weights_for(&ids);
        let states: Vec<&NodeState> = valid.iter().map(|(_, s)| s).collect();
        let aggregate = aggregate(&states, &weights);

        let result = ConsensusResult::new(round, aggregate.attributes, aggregate.contributors);
        let payload = match result.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(round, error = %e, "Could not encode consensus result");
                report.error = Some(ConsensusError::Encoding(e));
                return;
            }
        };

        let delivery = self
            .publisher
            .publish(Message::broadcast(
                self.config.coordinator_id,
                MessageKind::Consensus,
                payload,
            ))
            .await;

        for node_id in &report.valid {
            self.trust.update(*node_id, true);
        }
        for node_id in &report.failed {
            self.trust.update(*node_id, false);
        }

        self.enter(report, RoundPhase::Published);
        info!(
            round,
            contributors = result.contributing_nodes.len(),
            attributes = result.attributes.len(),
            ?delivery,
            "Consensus result published"
        );
        report.result = Some(result);
    }

    async fn collect(&self, round: u64, handles: &[Arc<dyn NodeHandle>]) -> Vec<Collected> {
        let limit = self.config.collection_timeout();
        let requests = handles.iter().map(|node| async move {
            let node_id = node.id();
            match timeout(limit, node.verifiable_state()).await {
                Ok(Ok(bundle)) => Collected::Responded(node_id, bundle),
                Ok(Err(e)) => {
                    let error = ConsensusError::NodeUnavailable {
                        node_id,
                        reason: e.to_string(),
                    };
                    warn!(round, %node_id, %error, "Node absent from round");
                    Collected::Absent(node_id)
                }
                Err(_) => {
                    warn!(round, %node_id, timeout_ms = limit.as_millis() as u64, "Node timed out");
                    Collected::Absent(node_id)
                }
            }
        });
        join_all(requests).await
    }

    fn verify(&self, round: u64, node_id: NodeId, bundle: &StateBundle) -> bool {
        if let Err(e) = bundle.state.check_distribution() {
            warn!(round, %node_id, error = %e, "State verification failed: bad distribution");
            return false;
        }

        match self.verifier.verify(node_id, bundle) {
            Ok(true) => {
                debug!(round, %node_id, scheme = %bundle.proof.scheme(), "Proof verified");
                true
            }
            Ok(false) => {
                warn!(round, %node_id, scheme = %bundle.proof.scheme(), "State verification failed");
                false
            }
            Err(e) => {
                warn!(round, %node_id, error = %e, "State verification failed");
                false
            }
        }
    }

    fn enter(&self, report: &mut RoundReport, phase: RoundPhase) {
        self.state.transition(report.round, phase);
        report.phase = phase;
    }

    fn fail(&self, report: &mut RoundReport, error: ConsensusError) {
        self.enter(report, RoundPhase::QuorumFailed);
        report.error = Some(error);
    }
}

#[cfg(test)]
mod tests;
