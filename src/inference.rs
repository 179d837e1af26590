//! The policy/value inference boundary.
//!
//! An [`InferenceEngine`] maps an [`EncodedPosition`] to priors over that
//! position's legal moves plus a value in [-1, 1] for the player who moved
//! into it.
//! Engines take `&self` so one engine can serve several searches; an engine
//! that batches internally must keep every result paired with its input.

use std::sync::Arc;

use thiserror::Error;

use crate::codec::EncodedPosition;
use crate::constants::ACTIONS;
use crate::rules::Move;

/// Network output for one position.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// One prior per legal move, in the order of `EncodedPosition::legal_moves`.
    pub priors: Vec<f32>,
    /// Expected outcome for the player who made the last move.
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("inference backend failed: {0}")]
    Backend(String),
    #[error("malformed network input: expected {expected} features, got {got}")]
    MalformedInput { expected: usize, got: usize },
    #[error("batched inference returned {got} results for {expected} inputs")]
    BatchSize { expected: usize, got: usize },
    #[error("network produced a non-finite value")]
    NonFiniteValue,
    #[error("model returned {got} logits, expected {expected}")]
    LogitsLength { expected: usize, got: usize },
    #[error("network produced a non-finite logit for {mv}")]
    NonFiniteLogit { mv: Move },
    #[error("every legal move has a -inf logit")]
    NoLegalMass,
}

pub trait InferenceEngine {
    fn evaluate(&self, input: &EncodedPosition) -> Result<Evaluation, InferenceError>;

    /// Evaluate several positions; results are returned in input order.
    fn evaluate_batch(&self, inputs: &[EncodedPosition]) -> Result<Vec<Evaluation>, InferenceError> {
        inputs.iter().map(|input| self.evaluate(input)).collect()
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for &E {
    fn evaluate(&self, input: &EncodedPosition) -> Result<Evaluation, InferenceError> {
        (**self).evaluate(input)
    }

    fn evaluate_batch(&self, inputs: &[EncodedPosition]) -> Result<Vec<Evaluation>, InferenceError> {
        (**self).evaluate_batch(inputs)
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Arc<E> {
    fn evaluate(&self, input: &EncodedPosition) -> Result<Evaluation, InferenceError> {
        (**self).evaluate(input)
    }

    fn evaluate_batch(&self, inputs: &[EncodedPosition]) -> Result<Vec<Evaluation>, InferenceError> {
        (**self).evaluate_batch(inputs)
    }
}

/// Uniform priors over the legal moves and a neutral value.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformInference;

impl InferenceEngine for UniformInference {
    fn evaluate(&self, input: &EncodedPosition) -> Result<Evaluation, InferenceError> {
        let n = input.legal_moves.len();
        if n == 0 {
            return Err(InferenceError::Backend("position has no legal moves".into()));
        }
        Ok(Evaluation {
            priors: vec![1.0 / n as f32; n],
            value: 0.0,
        })
    }
}

/// Softmax of dense action-space logits restricted to `legal` moves.
///
/// Returns one probability per legal move. A legal logit may be `-inf`
/// (probability 0), but NaN, `+inf` and an all `-inf` mask are errors.
pub fn masked_softmax(logits: &[f32], legal: &[Move]) -> Result<Vec<f32>, InferenceError> {
    if logits.len() != ACTIONS {
        return Err(InferenceError::LogitsLength {
            expected: ACTIONS,
            got: logits.len(),
        });
    }
    let mut max = f32::NEG_INFINITY;
    for &mv in legal {
        let logit = logits[mv.index()];
        if logit.is_nan() || logit == f32::INFINITY {
            return Err(InferenceError::NonFiniteLogit { mv });
        }
        max = max.max(logit);
    }
    if legal.is_empty() {
        return Ok(Vec::new());
    }
    if max == f32::NEG_INFINITY {
        return Err(InferenceError::NoLegalMass);
    }

    let mut probs: Vec<f32> = legal.iter().map(|m| (logits[m.index()] - max).exp()).collect();
    let sum: f32 = probs.iter().sum();
    for p in &mut probs {
        *p /= sum;
    }
    Ok(probs)
}

/// Adapter for models that emit logits over the full action space.
///
/// `model` receives the feature planes and returns `(logits, value)` with
/// `logits.len() == ACTIONS`. The adapter checks the input size, masks
/// illegal moves and normalises the legal ones.
pub struct LogitsInference<F> {
    model: F,
    input_len: usize,
}

impl<F> LogitsInference<F>
where
    F: Fn(&[f32]) -> Result<(Vec<f32>, f32), InferenceError>,
{
    pub fn new(model: F) -> Self {
        Self::with_input_len(model, EncodedPosition::LEN)
    }

    pub fn with_input_len(model: F, input_len: usize) -> Self {
        Self { model, input_len }
    }
}

impl<F> InferenceEngine for LogitsInference<F>
where
    F: Fn(&[f32]) -> Result<(Vec<f32>, f32), InferenceError>,
{
    fn evaluate(&self, input: &EncodedPosition) -> Result<Evaluation, InferenceError> {
        if input.planes.len() != self.input_len {
            return Err(InferenceError::MalformedInput {
                expected: self.input_len,
                got: input.planes.len(),
            });
        }
        let (logits, value) = (self.model)(&input.planes)?;
        Ok(Evaluation {
            priors: masked_softmax(&logits, &input.legal_moves)?,
            value,
        })
    }
}
