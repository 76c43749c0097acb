//! # Node Configuration
//!
//! Unified configuration for every subsystem and the simulation itself.
//!
//! Defaults carry the protocol constants; `from_env` overlays `OB_`-prefixed
//! environment variables. A variable that is set but does not parse is an
//! error, never silently ignored.

use crate::node::{MergePolicy, DEFAULT_RECURSION_LIMIT, OBSERVER_ID};
use num_bigint::BigUint;
use ob_01_proof_verifier::encoding::biguint_from_hex;
use ob_01_proof_verifier::{GroupParameters, ProofScheme, ZkpError};
use ob_02_trust_ledger::TrustConfig;
use ob_03_consensus::{ConsensusConfig, ConsensusError, Quorum};
use shared_bus::BrokerConfig;
use shared_types::NodeId;
use std::collections::BTreeSet;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeConfig {
    /// Message broker configuration.
    pub broker: BrokerConfig,
    /// Trust ledger configuration.
    pub trust: TrustConfig,
    /// Consensus coordinator configuration.
    pub consensus: ConsensusConfig,
    /// Schnorr group parameters.
    pub group: GroupParameters,
    /// Simulated node population.
    pub simulation: SimulationConfig,
}

/// Simulated node population.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Nodes get ids `1..=node_count`.
    pub node_count: u32,
    /// Proof scheme every node uses.
    pub scheme: ProofScheme,
    /// Nodes that tamper with their proofs.
    pub faulty_nodes: BTreeSet<NodeId>,
    /// How nodes fold published consensus results.
    pub merge_policy: MergePolicy,
    /// Round counter cap per node.
    pub recursion_limit: u64,
    /// Pause between node advances (milliseconds).
    pub advance_interval_ms: u64,
    /// Run one adversary per node.
    pub adversaries: bool,
    /// Shortest pause between adversarial challenges (milliseconds).
    pub adversary_min_interval_ms: u64,
    /// Longest pause between adversarial challenges (milliseconds).
    pub adversary_max_interval_ms: u64,
    /// Run the influence observer.
    pub observer: bool,
    /// Pause between observer broadcasts (milliseconds).
    pub observer_interval_ms: u64,
    /// Largest absolute influence factor per attribute.
    pub observer_strength: f64,
}

impl SimulationConfig {
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (1..=self.node_count).map(NodeId)
    }

    pub fn advance_interval(&self) -> Duration {
        Duration::from_millis(self.advance_interval_ms)
    }

    /// `(min, max)` pause between adversarial challenges.
    pub fn adversary_interval(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.adversary_min_interval_ms),
            Duration::from_millis(self.adversary_max_interval_ms),
        )
    }

    pub fn observer_interval(&self) -> Duration {
        Duration::from_millis(self.observer_interval_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            node_count: 3,
            scheme: ProofScheme::Commitment,
            faulty_nodes: BTreeSet::new(),
            merge_policy: MergePolicy::default(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            advance_interval_ms: 300,
            adversaries: true,
            adversary_min_interval_ms: 1_000,
            adversary_max_interval_ms: 2_000,
            observer: true,
            observer_interval_ms: 3_000,
            observer_strength: 0.05,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable is set but does not parse.
    #[error("{key}={value:?} is invalid: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Values parse but are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Quorum(#[from] ConsensusError),

    #[error(transparent)]
    Group(#[from] ZkpError),
}

impl NodeConfig {
    /// Defaults overlaid with `OB_*` environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OB_ROUND_INTERVAL_MS`, `OB_COLLECTION_TIMEOUT_MS`, `OB_QUORUM` (`n/d`)
    /// - `OB_BUFFER_CAPACITY`
    /// - `OB_INITIAL_TRUST`, `OB_MINIMUM_TRUST`, `OB_TRUST_SUCCESS_DELTA`,
    ///   `OB_TRUST_FAILURE_DELTA`
    /// - `OB_PROOF_SCHEME` (`commitment` | `schnorr`)
    /// - `OB_NODE_COUNT`, `OB_FAULTY_NODES` (comma separated ids),
    ///   `OB_MERGE_POLICY` (`overwrite` | `blend:<alpha>`),
    ///   `OB_RECURSION_LIMIT`, `OB_ADVANCE_INTERVAL_MS`
    /// - `OB_ADVERSARIES` (`true` | `false`), `OB_ADVERSARY_MIN_INTERVAL_MS`,
    ///   `OB_ADVERSARY_MAX_INTERVAL_MS`
    /// - `OB_OBSERVER` (`true` | `false`), `OB_OBSERVER_INTERVAL_MS`,
    ///   `OB_OBSERVER_STRENGTH`
    /// - `OB_GROUP_P`, `OB_GROUP_Q`, `OB_GROUP_G` (hex)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let mut config = Self::default();

        // Consensus
        vars.set("OB_ROUND_INTERVAL_MS", &mut config.consensus.round_interval_ms)?;
        vars.set("OB_COLLECTION_TIMEOUT_MS", &mut config.consensus.collection_timeout_ms)?;
        vars.set::<Quorum>("OB_QUORUM", &mut config.consensus.quorum)?;

        // Broker
        vars.set("OB_BUFFER_CAPACITY", &mut config.broker.buffer_capacity)?;

        // Trust
        vars.set("OB_INITIAL_TRUST", &mut config.trust.initial_trust)?;
        vars.set("OB_MINIMUM_TRUST", &mut config.trust.minimum_trust)?;
        vars.set("OB_TRUST_SUCCESS_DELTA", &mut config.trust.success_delta)?;
        vars.set("OB_TRUST_FAILURE_DELTA", &mut config.trust.failure_delta)?;

        // Simulation
        vars.set::<ProofScheme>("OB_PROOF_SCHEME", &mut config.simulation.scheme)?;
        vars.set("OB_NODE_COUNT", &mut config.simulation.node_count)?;
        vars.set::<MergePolicy>("OB_MERGE_POLICY", &mut config.simulation.merge_policy)?;
        vars.set("OB_RECURSION_LIMIT", &mut config.simulation.recursion_limit)?;
        vars.set("OB_ADVANCE_INTERVAL_MS", &mut config.simulation.advance_interval_ms)?;
        vars.set("OB_ADVERSARIES", &mut config.simulation.adversaries)?;
        vars.set("OB_ADVERSARY_MIN_INTERVAL_MS", &mut config.simulation.adversary_min_interval_ms)?;
        vars.set("OB_ADVERSARY_MAX_INTERVAL_MS", &mut config.simulation.adversary_max_interval_ms)?;
        vars.set("OB_OBSERVER", &mut config.simulation.observer)?;
        vars.set("OB_OBSERVER_INTERVAL_MS", &mut config.simulation.observer_interval_ms)?;
        vars.set("OB_OBSERVER_STRENGTH", &mut config.simulation.observer_strength)?;
        if let Some(raw) = vars.get("OB_FAULTY_NODES") {
            config.simulation.faulty_nodes = parse_node_list(&raw).map_err(|reason| {
                ConfigError::InvalidValue {
                    key: "OB_FAULTY_NODES".into(),
                    value: raw.clone(),
                    reason,
                }
            })?;
        }

        // Schnorr group
        vars.set_hex("OB_GROUP_P", &mut config.group.p)?;
        vars.set_hex("OB_GROUP_Q", &mut config.group.q)?;
        vars.set_hex("OB_GROUP_G", &mut config.group.g)?;

        Ok(config)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Invalid` - trust bounds, zero capacity or timings,
    ///   bad node population, merge factor or agent settings
    /// - `ConfigError::Quorum` - fraction outside `(0, 1]`
    /// - `ConfigError::Group` - `(p, q, g)` is not a valid subgroup
    pub fn validate(&self) -> Result<(), ConfigError> {
        let trust = &self.trust;
        let bounds = [
            trust.initial_trust,
            trust.minimum_trust,
            trust.success_delta,
            trust.failure_delta,
        ];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid("trust values must be finite".into()));
        }
        if !(0.0 <= trust.minimum_trust
            && trust.minimum_trust <= trust.initial_trust
            && trust.initial_trust <= 1.0)
        {
            return Err(ConfigError::Invalid(format!(
                "trust bounds must satisfy 0 <= minimum ({}) <= initial ({}) <= 1",
                trust.minimum_trust, trust.initial_trust
            )));
        }

        self.consensus.quorum.validate()?;

        if self.broker.buffer_capacity == 0 {
            return Err(ConfigError::Invalid("buffer capacity must be non-zero".into()));
        }
        if self.consensus.round_interval_ms == 0 || self.consensus.collection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "round interval and collection timeout must be non-zero".into(),
            ));
        }

        let sim = &self.simulation;
        if sim.node_count == 0 {
            return Err(ConfigError::Invalid("at least one node is required".into()));
        }
        if let Some(id) = sim.faulty_nodes.iter().find(|id| id.0 == 0 || id.0 > sim.node_count) {
            return Err(ConfigError::Invalid(format!(
                "faulty node {id} is outside 1..={}",
                sim.node_count
            )));
        }
        let coordinator = self.consensus.coordinator_id;
        if coordinator.0 >= 1 && coordinator.0 <= sim.node_count {
            return Err(ConfigError::Invalid(format!(
                "coordinator id {coordinator} collides with a node id"
            )));
        }
        if sim.node_count >= OBSERVER_ID.0 {
            return Err(ConfigError::Invalid(format!(
                "node ids must stay below the observer id {OBSERVER_ID}"
            )));
        }
        if !sim.merge_policy.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "merge factor must be in (0, 1], got {}",
                sim.merge_policy.alpha()
            )));
        }
        if sim.adversaries
            && (sim.adversary_min_interval_ms == 0
                || sim.adversary_min_interval_ms > sim.adversary_max_interval_ms)
        {
            return Err(ConfigError::Invalid(format!(
                "adversary interval must satisfy 0 < min ({}) <= max ({})",
                sim.adversary_min_interval_ms, sim.adversary_max_interval_ms
            )));
        }
        if sim.observer {
            if sim.observer_interval_ms == 0 {
                return Err(ConfigError::Invalid("observer interval must be non-zero".into()));
            }
            if !(0.0..1.0).contains(&sim.observer_strength) {
                return Err(ConfigError::Invalid(format!(
                    "observer strength must be in [0, 1), got {}",
                    sim.observer_strength
                )));
            }
        }

        self.group.validate()?;
        Ok(())
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn set<T>(&self, key: &str, slot: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        if let Some(raw) = self.get(key) {
            *slot = raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.into(),
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn set_hex(&self, key: &str, slot: &mut BigUint) -> Result<(), ConfigError> {
        if let Some(raw) = self.get(key) {
            *slot = biguint_from_hex(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                key: key.into(),
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

fn parse_node_list(raw: &str) -> Result<BTreeSet<NodeId>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map(NodeId)
                .map_err(|e| format!("{part:?}: {e}"))
        })
        .collect()
}
