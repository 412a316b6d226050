//! Sample design inference.
//!
//! ```text
//!  raw headers ──▶ naming ──▶ normalized names ──▶ hierarchy ──▶ AnalysisDesign
//!  row ids     ──▶ duplicates ──▶ unique row index
//! ```

pub mod duplicates;
pub mod hierarchy;
pub mod naming;

use thiserror::Error;

pub use duplicates::resolve_duplicates;
pub use hierarchy::{build_design, AnalysisDesign, CollisionPolicy, Node};
pub use naming::{normalize_columns, ColumnMatcher, NamingScheme, SpectronautRule};

/// Structural problems with sample naming. Any of these makes the
/// design unsafe to use, so the reader processing the file is aborted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("Inconsistent sample naming: '{name}' has {found} '_'-separated tokens, expected {expected}")]
    InconsistentArity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Sample naming collision: '{first}' and '{second}' both normalize to '{name}'")]
    Collision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Duplicate sample '{0}' in analysis design")]
    DuplicateSample(String),

    #[error("Sample '{name}' conflicts with the design at token '{token}': a group and a sample share the name")]
    BranchLeafConflict { name: String, token: String },

    #[error("Unsupported sample name shape in column '{header}': {tokens} tokens")]
    UnsupportedShape { header: String, tokens: usize },

    #[error("No sample identifier found in column '{0}'")]
    MissingIdentifier(String),
}
