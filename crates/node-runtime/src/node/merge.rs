//! How a node folds a published consensus result into its own attributes.

use shared_types::{normalize_attributes, Attributes};
use std::fmt;
use std::str::FromStr;

/// Default pull toward the consensus value.
pub const DEFAULT_BLEND_ALPHA: f64 = 0.5;

/// Merge policy for received consensus results.
///
/// For every key in the result: `local = (1 - alpha) * local + alpha * consensus`.
/// Keys the node lacks count as zero locally, keys absent from the result
/// keep their local value, and the vector is renormalised afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergePolicy {
    /// Replace local values with the consensus values (`alpha = 1`).
    Overwrite,
    /// Move `alpha` of the way toward the consensus value.
    Blend(f64),
}

impl MergePolicy {
    pub fn alpha(&self) -> f64 {
        match self {
            Self::Overwrite => 1.0,
            Self::Blend(alpha) => *alpha,
        }
    }

    /// `alpha` must lie in `(0, 1]`.
    pub fn is_valid(&self) -> bool {
        let alpha = self.alpha();
        alpha.is_finite() && alpha > 0.0 && alpha <= 1.0
    }

    /// Fold `consensus` into `local`.
    ///
    /// Returns `false` and leaves `local` untouched if the merged vector
    /// cannot be normalised.
    pub fn merge(&self, local: &mut Attributes, consensus: &Attributes) -> bool {
        let alpha = self.alpha();
        let mut merged = local.clone();
        for (key, &target) in consensus {
            let current = merged.entry(key.clone()).or_insert(0.0);
            *current = (1.0 - alpha) * *current + alpha * target;
        }
        if !normalize_attributes(&mut merged) {
            return false;
        }
        *local = merged;
        true
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::Blend(DEFAULT_BLEND_ALPHA)
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => f.write_str("overwrite"),
            Self::Blend(alpha) => write!(f, "blend:{alpha}"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    /// Parses `overwrite`, `blend` or `blend:<alpha>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let policy = match s.split_once(':') {
            None if s == "overwrite" => Self::Overwrite,
            None if s == "blend" => Self::default(),
            Some(("blend", alpha)) => {
                let alpha: f64 = alpha
                    .trim()
                    .parse()
                    .map_err(|e| format!("invalid blend factor {alpha:?}: {e}"))?;
                Self::Blend(alpha)
            }
            _ => return Err(format!("unknown merge policy {s:?}")),
        };
        if !policy.is_valid() {
            return Err(format!("blend factor must be in (0, 1], got {}", policy.alpha()));
        }
        Ok(policy)
    }
}
