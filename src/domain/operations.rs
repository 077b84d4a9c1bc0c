//! Post-processing operations a project can select.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A remote post-processing step applied to the base PDF.
///
/// Declaration order is the canonical application order: watermark first,
/// then linearize, so the linearized file is the one that gets delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformOp {
    /// Stamp a visible text overlay on every page
    Watermark,

    /// Rewrite the file for fast web view
    Linearize,
}

impl TransformOp {
    pub const ALL: [TransformOp; 2] = [TransformOp::Watermark, TransformOp::Linearize];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Watermark => "watermark",
            Self::Linearize => "linearize",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Watermark => "Inject \"OFFICIAL COPY\" overlays",
            Self::Linearize => "Fast linearization for court portals",
        }
    }
}

impl fmt::Display for TransformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformOp {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "watermark" => Ok(Self::Watermark),
            "linearize" => Ok(Self::Linearize),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transform operation '{0}' (expected one of: watermark, linearize)")]
pub struct UnknownOperation(pub String);

/// Sort into canonical order and drop duplicates
pub fn canonical_order(ops: &[TransformOp]) -> Vec<TransformOp> {
    let mut ordered = ops.to_vec();
    ordered.sort();
    ordered.dedup();
    ordered
}

/// Parse a list of operation identifiers
pub fn parse_operations<S: AsRef<str>>(ids: &[S]) -> Result<Vec<TransformOp>, UnknownOperation> {
    ids.iter().map(|id| id.as_ref().parse()).collect()
}
