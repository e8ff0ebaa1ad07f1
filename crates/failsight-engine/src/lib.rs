// Error types
pub mod error;

// Result aggregation
pub mod aggregate;

// Failure/log correlation
pub mod correlate;

// Analysis context assembly
pub mod context;

pub use aggregate::{aggregate, split_failures};
pub use context::{CorrelationOptions, attach_correlated_logs, build_context, gather_excerpts};
pub use correlate::{
    LogCandidate, extract_excerpts, extract_keywords, find_related_logs, rank_candidates,
    score_candidates,
};
pub use error::{Error, Result};
