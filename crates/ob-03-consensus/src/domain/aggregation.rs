//! Trust-weighted aggregation

use shared_types::{Attributes, NodeId, NodeState};
use std::collections::BTreeSet;

/// Output of `aggregate`.
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    pub attributes: Attributes,
    /// Nodes with strictly positive weight.
    pub contributors: BTreeSet<NodeId>,
}

/// Weighted mean of every key present in all `states`.
///
/// `weights[i]` belongs to `states[i]`. Nodes with non-positive weight
/// contribute nothing; a key whose total weight is zero is omitted.
pub fn aggregate(states: &[&NodeState], weights: &[f64]) -> Aggregate {
    let Some(first) = states.first() else {
        return Aggregate {
            attributes: Attributes::new(),
            contributors: BTreeSet::new(),
        };
    };

    let common = first
        .attributes
        .keys()
        .filter(|key| states.iter().all(|s| s.attributes.contains_key(*key)));

    let mut attributes = Attributes::new();
    for key in common {
        let (mut weighted, mut total) = (0.0, 0.0);
        for (state, &weight) in states.iter().zip(weights) {
            if weight > 0.0 {
                weighted += weight * state.attributes[key];
                total += weight;
            }
        }
        if total > 0.0 {
            attributes.insert(key.clone(), weighted / total);
        }
    }

    let contributors = states
        .iter()
        .zip(weights)
        .filter(|(_, &w)| w > 0.0)
        .map(|(s, _)| s.node_id)
        .collect();

    Aggregate {
        attributes,
        contributors,
    }
}
