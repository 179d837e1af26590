//! Shared fixtures: a toy game with a fixed branching factor and a
//! scripted inference engine that counts its calls.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use michi_zero::codec::{EncodedPosition, PositionCodec};
use michi_zero::inference::{Evaluation, InferenceEngine, InferenceError};
use michi_zero::rules::{Move, MoveError, Outcome, Rules};
use michi_zero::search::StopHandle;
use michi_zero::tree::Tree;

/// Every position has `branching` moves until `depth` moves were played.
/// The finished game is won by the player to move when the move sum is even.
#[derive(Clone, Copy, Debug)]
pub struct Chain {
    pub branching: usize,
    pub depth: usize,
}

impl Rules for Chain {
    type State = Vec<u16>;

    fn legal_moves(&self, state: &Vec<u16>) -> Vec<Move> {
        if self.is_terminal(state) {
            return Vec::new();
        }
        (0..self.branching).filter_map(Move::from_index).collect()
    }

    fn apply_move(&self, state: &Vec<u16>, mv: Move) -> Result<Vec<u16>, MoveError> {
        if self.is_terminal(state) {
            return Err(MoveError::GameOver);
        }
        if mv.index() >= self.branching {
            return Err(MoveError::Occupied);
        }
        let mut next = state.clone();
        next.push(mv.index() as u16);
        Ok(next)
    }

    fn is_terminal(&self, state: &Vec<u16>) -> bool {
        state.len() >= self.depth
    }

    fn outcome(&self, state: &Vec<u16>) -> Option<Outcome> {
        if !self.is_terminal(state) {
            return None;
        }
        let sum: u32 = state.iter().map(|&m| u32::from(m)).sum();
        Some(if sum % 2 == 0 { Outcome::Win } else { Outcome::Loss })
    }
}

/// Encodes the move history as one feature per move.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChainCodec;

impl PositionCodec<Vec<u16>> for ChainCodec {
    fn encode(&self, state: &Vec<u16>, legal_moves: &[Move]) -> EncodedPosition {
        EncodedPosition {
            planes: state.iter().map(|&m| f32::from(m)).collect(),
            legal_moves: legal_moves.to_vec(),
        }
    }
}

/// Returns `priors` when their length matches the legal moves (uniform
/// otherwise) and the same `value` for every position.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    pub priors: Vec<f32>,
    pub value: f32,
    /// 1-based evaluation that fails with a backend error.
    pub fail_on_call: Option<usize>,
    /// Drop the last result of every batch.
    pub short_batches: bool,
    /// Raise this flag on the given 1-based evaluation.
    pub stop_on_call: Option<(usize, StopHandle)>,
    pub calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(priors: &[f32], value: f32) -> Self {
        Self {
            priors: priors.to_vec(),
            value,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }
}

impl InferenceEngine for ScriptedEngine {
    fn evaluate(&self, input: &EncodedPosition) -> Result<Evaluation, InferenceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(InferenceError::Backend("scripted failure".into()));
        }
        if let Some((at, stop)) = &self.stop_on_call {
            if *at == call {
                stop.stop();
            }
        }

        let n = input.legal_moves.len();
        let priors = if self.priors.len() == n {
            self.priors.clone()
        } else {
            vec![1.0 / n as f32; n]
        };
        Ok(Evaluation {
            priors,
            value: self.value,
        })
    }

    fn evaluate_batch(&self, inputs: &[EncodedPosition]) -> Result<Vec<Evaluation>, InferenceError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = inputs
            .iter()
            .map(|input| self.evaluate(input))
            .collect::<Result<Vec<_>, _>>()?;
        if self.short_batches {
            out.pop();
        }
        Ok(out)
    }
}

/// Check visit bookkeeping over the whole tree:
/// - an expanded node has `1 + sum(edge visits)` visits
/// - a child has as many visits as the edge leading to it
/// - no virtual loss is left anywhere
pub fn assert_consistent<S: Clone>(tree: &Tree<S>) {
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let node = tree.node(id);
        assert_eq!(node.in_flight, 0, "node {id:?} still reserved");
        if node.expanded {
            assert_eq!(node.visits, 1 + node.edge_visits(), "node {id:?}");
            let sum: f32 = node.edges.iter().map(|e| e.prior).sum();
            assert!((sum - 1.0).abs() < 1e-4, "priors of {id:?} sum to {sum}");
        } else {
            assert!(node.edges.is_empty());
        }
        for edge in &node.edges {
            assert_eq!(edge.in_flight, 0, "edge {} of {id:?} still reserved", edge.mv);
            match edge.child {
                Some(child) => {
                    assert_eq!(tree.node(child).visits, edge.visits);
                    stack.push(child);
                }
                None => assert_eq!(edge.visits, 0),
            }
        }
    }
}
