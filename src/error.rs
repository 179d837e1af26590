//! Errors surfaced by the tree and the search.

use thiserror::Error;

use crate::inference::InferenceError;
use crate::rules::Move;

/// Why a prior vector was rejected by [`Tree::expand`](crate::tree::Tree::expand).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriorsError {
    #[error("{priors} priors for {moves} legal moves")]
    LengthMismatch { moves: usize, priors: usize },
    #[error("prior {value} for edge {index} is negative")]
    Negative { index: usize, value: f32 },
    #[error("prior for edge {index} is not finite")]
    NonFinite { index: usize },
    #[error("priors sum to {sum}, not 1")]
    NotNormalized { sum: f32 },
    #[error("no legal moves to expand")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("illegal move {mv}")]
    IllegalMove { mv: Move },
    #[error("node is already expanded")]
    AlreadyExpanded,
    #[error("invalid priors: {0}")]
    InvalidPriors(#[from] PriorsError),
    #[error("inference failed: {0}")]
    InferenceFailure(#[from] InferenceError),
    #[error("invalid search configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("cannot search a terminal position")]
    TerminalRoot,
    #[error("search stopped before any simulation completed")]
    Cancelled,
}
