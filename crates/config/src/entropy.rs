#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Smallest sample worth scoring; one byte per profile window plus the head.
pub const MIN_PREVIEW_BUDGET: usize = 16;
/// Keeps the estimator bounded on the interception path.
pub const MAX_PREVIEW_BUDGET: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Entropy {
    /// Number of leading bytes of a write that are examined.
    pub preview_budget: usize,
}

impl Default for Entropy {
    fn default() -> Self {
        Self {
            preview_budget: 4096,
        }
    }
}

impl Entropy {
    pub fn clamp(self) -> Self {
        Self {
            preview_budget: self
                .preview_budget
                .clamp(MIN_PREVIEW_BUDGET, MAX_PREVIEW_BUDGET),
        }
    }
}
