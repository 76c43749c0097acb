//! # Core Domain Entities
//!
//! Defines the node-facing entities exchanged between the external nodes and
//! the consensus core.
//!
//! ## Clusters
//!
//! - **Identity**: `NodeId`
//! - **State**: `NodeState`, `NodeStatus`, `Attributes`

use crate::errors::StateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tolerance applied when checking that an attribute vector sums to one.
pub const DISTRIBUTION_EPSILON: f64 = 1e-6;

/// Attribute vector of a node.
///
/// A `BTreeMap` keeps iteration sorted by key, so every encoding of the
/// same state is byte-identical regardless of insertion order.
pub type Attributes = BTreeMap<String, f64>;

/// Unique identifier for a node in the network.
///
/// Ids are non-negative on the wire; `-1` is reserved for broadcast.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Raw numeric id.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Operational status reported by a node alongside its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Normal operation; the node advances its round counter.
    #[default]
    Active,
    /// Recovering; the node keeps its state but does not advance.
    Annealing,
    /// The node's attribute vector is contested.
    Crisis,
    /// The node is paused by an observer.
    Frozen,
}

impl NodeStatus {
    /// Stable lowercase name used in the canonical encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Active => "active",
            NodeStatus::Annealing => "annealing",
            NodeStatus::Crisis => "crisis",
            NodeStatus::Frozen => "frozen",
        }
    }
}

/// Snapshot of a node's verifiable state.
///
/// Produced by the node, consumed by the core. The core checks the
/// distribution invariant (`attributes` non-negative, summing to one) but
/// never repairs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    /// The node this state belongs to.
    pub node_id: NodeId,
    /// Number of rounds the node has advanced through.
    pub round_counter: u64,
    /// Normalised attribute vector.
    pub attributes: Attributes,
    /// Operational status.
    pub status: NodeStatus,
}

impl NodeState {
    /// Create an `Active` state at round zero.
    pub fn new(node_id: NodeId, attributes: Attributes) -> Self {
        Self {
            node_id,
            round_counter: 0,
            attributes,
            status: NodeStatus::Active,
        }
    }

    /// Check the distribution invariant.
    ///
    /// # Errors
    ///
    /// - `StateError::EmptyAttributes` - no attributes at all
    /// - `StateError::NonFinite` - a value is NaN or infinite
    /// - `StateError::NegativeAttribute` - a value is below zero
    /// - `StateError::NotNormalized` - values do not sum to 1 ± `DISTRIBUTION_EPSILON`
    pub fn check_distribution(&self) -> Result<(), StateError> {
        if self.attributes.is_empty() {
            return Err(StateError::EmptyAttributes);
        }

        let mut sum = 0.0;
        for (key, &value) in &self.attributes {
            if !value.is_finite() {
                return Err(StateError::NonFinite { key: key.clone() });
            }
            if value < 0.0 {
                return Err(StateError::NegativeAttribute {
                    key: key.clone(),
                    value,
                });
            }
            sum += value;
        }

        if (sum - 1.0).abs() > DISTRIBUTION_EPSILON {
            return Err(StateError::NotNormalized { sum });
        }
        Ok(())
    }

    /// Deterministic byte encoding used as hash input by the proof schemes.
    ///
    /// Fields appear in a fixed order, attributes in key order, keys are
    /// length-prefixed and values are encoded by their IEEE-754 bit pattern,
    /// so equal states always encode identically and distinct states never
    /// collide on formatting.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = format!(
            "node:{}|round:{}|status:{}",
            self.node_id.0,
            self.round_counter,
            self.status.as_str()
        );
        for (key, value) in &self.attributes {
            out.push_str(&format!(
                "|attr:{}:{}={:016x}",
                key.len(),
                key,
                value.to_bits()
            ));
        }
        out.into_bytes()
    }
}

/// Rescale `attributes` in place so the values sum to one.
///
/// Returns `false` and leaves the vector untouched when the total is not
/// strictly positive.
pub fn normalize_attributes(attributes: &mut Attributes) -> bool {
    let total: f64 = attributes.values().sum();
    if !(total.is_finite() && total > 0.0) {
        return false;
    }
    for value in attributes.values_mut() {
        *value /= total;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, f64)]) -> Attributes {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(7).to_string(), "node-7");
    }

    #[test]
    fn test_valid_distribution() {
        let state = NodeState::new(NodeId(1), attrs(&[("a", 0.25), ("b", 0.75)]));
        assert!(state.check_distribution().is_ok());
    }

    #[test]
    fn test_distribution_within_epsilon() {
        let state = NodeState::new(NodeId(1), attrs(&[("a", 0.5), ("b", 0.5 + 5e-7)]));
        assert!(state.check_distribution().is_ok());
    }

    #[test]
    fn test_negative_attribute_rejected() {
        let state = NodeState::new(NodeId(1), attrs(&[("a", 1.2), ("b", -0.2)]));
        assert!(matches!(
            state.check_distribution(),
            Err(StateError::NegativeAttribute { .. })
        ));
    }

    #[test]
    fn test_unnormalized_rejected() {
        let state = NodeState::new(NodeId(1), attrs(&[("a", 0.4), ("b", 0.4)]));
        assert!(matches!(
            state.check_distribution(),
            Err(StateError::NotNormalized { .. })
        ));
    }

    #[test]
    fn test_empty_and_nan_rejected() {
        let empty = NodeState::new(NodeId(1), Attributes::new());
        assert_eq!(empty.check_distribution(), Err(StateError::EmptyAttributes));

        let nan = NodeState::new(NodeId(1), attrs(&[("a", f64::NAN)]));
        assert!(matches!(
            nan.check_distribution(),
            Err(StateError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_canonical_bytes_ignore_insertion_order() {
        let mut first = Attributes::new();
        first.insert("x".into(), 0.3);
        first.insert("y".into(), 0.7);

        let mut second = Attributes::new();
        second.insert("y".into(), 0.7);
        second.insert("x".into(), 0.3);

        let a = NodeState::new(NodeId(2), first);
        let b = NodeState::new(NodeId(2), second);
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn test_canonical_bytes_sensitive_to_every_field() {
        let base = NodeState::new(NodeId(2), attrs(&[("x", 0.3), ("y", 0.7)]));

        let mut other_round = base.clone();
        other_round.round_counter = 1;
        let mut other_status = base.clone();
        other_status.status = NodeStatus::Frozen;
        let mut other_value = base.clone();
        other_value.attributes.insert("x".into(), 0.3000001);

        assert_ne!(base.canonical_bytes(), other_round.canonical_bytes());
        assert_ne!(base.canonical_bytes(), other_status.canonical_bytes());
        assert_ne!(base.canonical_bytes(), other_value.canonical_bytes());
    }

    #[test]
    fn test_normalize_attributes() {
        let mut values = attrs(&[("a", 2.0), ("b", 6.0)]);
        assert!(normalize_attributes(&mut values));
        assert!((values["a"] - 0.25).abs() < 1e-12);
        assert!((values["b"] - 0.75).abs() < 1e-12);

        let mut zeros = attrs(&[("a", 0.0)]);
        assert!(!normalize_attributes(&mut zeros));
    }
}
