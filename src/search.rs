//! PUCT Monte Carlo Tree Search guided by a policy/value network.
//!
//! Each simulation descends from the root along the edge maximising
//! `Q + c * P * sqrt(N(parent)) / (1 + N(edge))`, evaluates the leaf it
//! reaches (terminal outcome or one inference call), expands it and backs
//! the value up the path with alternating sign.
//!
//! Two drivers share the selection and backup code:
//! - sequential: one leaf per inference call, fully deterministic
//! - batched: several leaves per `evaluate_batch` call, kept apart by
//!   virtual loss

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, trace};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Gamma;

use crate::codec::{EncodedPosition, PositionCodec};
use crate::config::{DirichletNoise, SearchConfig, SearchMode};
use crate::constants::ACTIONS;
use crate::error::{PriorsError, SearchError};
use crate::inference::{InferenceEngine, InferenceError};
use crate::node::{Edge, Node, NodeId};
use crate::rules::{Move, Rules};
use crate::tree::{Tree, validate_priors};

/// Edges walked by one simulation, root first: `(node, edge index)`.
type Path = Vec<(NodeId, usize)>;

/// Outcome of one search call.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// Move distribution over the root edges, in edge order.
    pub policy: Vec<(Move, f32)>,
    /// Expected outcome for the player to move at the root.
    pub value: f32,
    /// Visit counts of the root edges, in edge order.
    pub visits: Vec<(Move, u32)>,
    pub best_move: Move,
    /// Simulations completed by this call.
    pub simulations: u32,
}

impl SearchResult {
    /// Policy over the full action space, indexed by [`Move::index`].
    pub fn dense_policy(&self) -> Vec<f32> {
        let mut dense = vec![0.0; ACTIONS];
        for &(mv, p) in &self.policy {
            dense[mv.index()] = p;
        }
        dense
    }

    /// Draw a move from `policy`; falls back to `best_move` for a degenerate policy.
    pub fn sample_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Move {
        match WeightedIndex::new(self.policy.iter().map(|&(_, p)| p)) {
            Ok(dist) => self.policy[dist.sample(rng)].0,
            Err(_) => self.best_move,
        }
    }
}

/// Requests that a running search stop after its current simulation.
///
/// The request stays in effect until [`StopHandle::reset`].
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A leaf selected in a batched round, waiting for its evaluation.
struct PendingLeaf {
    path: Path,
    leaf: NodeId,
}

pub struct Search<R, C, E> {
    rules: R,
    codec: C,
    engine: E,
    rng: ChaCha8Rng,
    stop: StopHandle,
}

impl<R, C, E> Search<R, C, E>
where
    R: Rules,
    C: PositionCodec<R::State>,
    E: InferenceEngine,
{
    /// `seed` drives the root noise; the search has no other randomness.
    pub fn new(rules: R, codec: C, engine: E, seed: u64) -> Self {
        Self {
            rules,
            codec,
            engine,
            rng: ChaCha8Rng::seed_from_u64(seed),
            stop: StopHandle::default(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Share an existing stop flag, e.g. one handle for several searches.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Run up to `config.simulations` simulations on `tree` and summarise the root.
    ///
    /// Statistics already in the tree (from an earlier search on the same
    /// subtree) are kept and extended.
    pub fn run(&mut self, tree: &mut Tree<R::State>, config: &SearchConfig) -> Result<SearchResult, SearchError> {
        config.validate()?;
        if tree.root_node().terminal {
            return Err(SearchError::TerminalRoot);
        }

        let start = Instant::now();
        let budget = config.simulations;
        let mut completed = 0u32;
        self.apply_root_noise(tree, config.noise)?;

        while completed < budget && !self.should_stop(start, config) {
            completed += match config.mode {
                SearchMode::Sequential => {
                    self.simulate(tree, config.c_puct)?;
                    1
                }
                SearchMode::Batched { batch_size, virtual_loss } => {
                    let round = batch_size.min((budget - completed) as usize);
                    self.run_round(tree, config.c_puct, round, virtual_loss)?
                }
            };
            self.apply_root_noise(tree, config.noise)?;
        }

        if !tree.root_node().expanded {
            return Err(SearchError::Cancelled);
        }

        let result = summarise(tree.root_node(), config.temperature, completed);
        debug!(
            "search: {} simulations in {:.1?}, {} nodes, value {:.3}, best {}",
            completed,
            start.elapsed(),
            tree.len(),
            result.value,
            result.best_move
        );
        Ok(result)
    }

    fn should_stop(&self, start: Instant, config: &SearchConfig) -> bool {
        self.stop.is_stopped() || config.time_limit.is_some_and(|limit| start.elapsed() >= limit)
    }

    /// One selection, evaluation and backup.
    fn simulate(&mut self, tree: &mut Tree<R::State>, c_puct: f32) -> Result<(), SearchError> {
        let (path, leaf) = self.select(tree, c_puct, 0.0)?;

        let value = if tree.node(leaf).terminal {
            self.terminal_value(tree.node(leaf))
        } else {
            let input = self.encode_leaf(tree.node(leaf))?;
            let eval = self.engine.evaluate(&input)?;
            let value = checked_value(eval.value)?;
            tree.expand(leaf, &input.legal_moves, &eval.priors)?;
            value
        };

        trace!("simulation: depth {}, leaf value {:.3}", path.len(), value);
        backup(tree, &path, leaf, value);
        Ok(())
    }

    /// One batched round of at most `round` simulations.
    ///
    /// Returns the number of simulations completed. On error every
    /// reservation taken by the round has been removed.
    fn run_round(
        &mut self,
        tree: &mut Tree<R::State>,
        c_puct: f32,
        round: usize,
        virtual_loss: f32,
    ) -> Result<u32, SearchError> {
        let mut pending: Vec<PendingLeaf> = Vec::with_capacity(round);
        let mut inputs: Vec<EncodedPosition> = Vec::with_capacity(round);
        let mut completed = 0u32;

        while pending.len() + (completed as usize) < round {
            let (path, leaf) = match self.select(tree, c_puct, virtual_loss) {
                Ok(selected) => selected,
                Err(err) => {
                    release_all(tree, &pending);
                    return Err(err);
                }
            };

            if tree.node(leaf).terminal {
                let value = self.terminal_value(tree.node(leaf));
                backup(tree, &path, leaf, value);
                completed += 1;
                continue;
            }
            if tree.node(leaf).in_flight > 0 {
                // Already waiting for its evaluation in this round
                break;
            }

            let input = match self.encode_leaf(tree.node(leaf)) {
                Ok(input) => input,
                Err(err) => {
                    release_all(tree, &pending);
                    return Err(err);
                }
            };
            reserve(tree, &path, leaf);
            pending.push(PendingLeaf { path, leaf });
            inputs.push(input);
        }

        if pending.is_empty() {
            return Ok(completed);
        }

        let evals = match self.evaluate_round(&inputs) {
            Ok(evals) => evals,
            Err(err) => {
                release_all(tree, &pending);
                return Err(err);
            }
        };

        release_all(tree, &pending);
        for ((p, input), (priors, value)) in pending.iter().zip(&inputs).zip(evals) {
            tree.expand(p.leaf, &input.legal_moves, &priors)?;
            backup(tree, &p.path, p.leaf, value);
        }

        let leaves = pending.len() as u32;
        trace!("round: {leaves} leaves evaluated, {completed} terminal");
        Ok(completed + leaves)
    }

    /// Evaluate a round's leaves and check every result before any is applied.
    fn evaluate_round(&self, inputs: &[EncodedPosition]) -> Result<Vec<(Vec<f32>, f32)>, SearchError> {
        let evals = self.engine.evaluate_batch(inputs)?;
        if evals.len() != inputs.len() {
            return Err(InferenceError::BatchSize {
                expected: inputs.len(),
                got: evals.len(),
            }
            .into());
        }
        evals
            .into_iter()
            .zip(inputs)
            .map(|(eval, input)| -> Result<(Vec<f32>, f32), SearchError> {
                validate_priors(&input.legal_moves, &eval.priors)?;
                Ok((eval.priors, checked_value(eval.value)?))
            })
            .collect()
    }

    /// Walk from the root to the first unexpanded or terminal node.
    fn select(
        &self,
        tree: &mut Tree<R::State>,
        c_puct: f32,
        virtual_loss: f32,
    ) -> Result<(Path, NodeId), SearchError> {
        let mut path = Path::new();
        let mut id = tree.root();
        loop {
            let node = tree.node(id);
            if !node.expanded || node.terminal {
                return Ok((path, id));
            }
            let edge = select_edge(node, c_puct, virtual_loss);
            path.push((id, edge));
            id = tree.child_of(id, edge, &self.rules)?;
        }
    }

    fn encode_leaf(&self, node: &Node<R::State>) -> Result<EncodedPosition, SearchError> {
        let legal = self.rules.legal_moves(&node.state);
        if legal.is_empty() {
            return Err(PriorsError::Empty.into());
        }
        Ok(self.codec.encode(&node.state, &legal))
    }

    /// Final result for the player who moved into `node`.
    fn terminal_value(&self, node: &Node<R::State>) -> f32 {
        self.rules.outcome(&node.state).map_or(0.0, |o| o.flip().value())
    }

    /// Mix Dirichlet noise into the root priors once per root.
    fn apply_root_noise(&mut self, tree: &mut Tree<R::State>, noise: Option<DirichletNoise>) -> Result<(), SearchError> {
        let Some(noise) = noise else {
            return Ok(());
        };
        let root = tree.root_node();
        if !root.expanded || root.noise_applied {
            return Ok(());
        }

        // Dirichlet(alpha) as normalised Gamma(alpha, 1) draws; works for a single edge too
        let gamma = Gamma::new(f64::from(noise.alpha), 1.0)
            .map_err(|_| SearchError::InvalidConfig("dirichlet alpha must be positive"))?;
        let samples: Vec<f64> = (0..root.edges.len()).map(|_| gamma.sample(&mut self.rng)).collect();
        let sum: f64 = samples.iter().sum();

        let root_id = tree.root();
        let root = tree.node_mut(root_id);
        if sum.is_finite() && sum > 0.0 {
            for (edge, x) in root.edges.iter_mut().zip(samples) {
                let eta = (x / sum) as f32;
                edge.prior = (1.0 - noise.epsilon) * edge.prior + noise.epsilon * eta;
            }
        }
        root.noise_applied = true;
        Ok(())
    }
}

/// PUCT edge choice; the lowest index wins ties.
fn select_edge<S>(node: &Node<S>, c_puct: f32, virtual_loss: f32) -> usize {
    let sqrt_n = ((node.visits + node.in_flight) as f32).sqrt();
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;

    for (i, e) in node.edges.iter().enumerate() {
        let n = e.visits + e.in_flight;
        let q = if n == 0 {
            0.0
        } else {
            (e.total_value - e.in_flight as f32 * virtual_loss) / n as f32
        };
        let u = c_puct * e.prior * sqrt_n / (1.0 + n as f32);
        let score = q + u;
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

/// Add the leaf visit and propagate `leaf_value` up the path.
///
/// `leaf_value` is for the player who moved into the leaf. The edge entering
/// the leaf gets it unchanged and the sign flips at every level above.
fn backup<S: Clone>(tree: &mut Tree<S>, path: &[(NodeId, usize)], leaf: NodeId, leaf_value: f32) {
    tree.node_mut(leaf).visits += 1;
    let mut value = leaf_value;
    for &(id, edge) in path.iter().rev() {
        let node = tree.node_mut(id);
        node.visits += 1;
        let e = &mut node.edges[edge];
        e.visits += 1;
        e.total_value += value;
        value = -value;
    }
}

fn reserve<S: Clone>(tree: &mut Tree<S>, path: &[(NodeId, usize)], leaf: NodeId) {
    tree.node_mut(leaf).in_flight += 1;
    for &(id, edge) in path {
        let node = tree.node_mut(id);
        node.in_flight += 1;
        node.edges[edge].in_flight += 1;
    }
}

fn release<S: Clone>(tree: &mut Tree<S>, path: &[(NodeId, usize)], leaf: NodeId) {
    let node = tree.node_mut(leaf);
    node.in_flight = node.in_flight.saturating_sub(1);
    for &(id, edge) in path {
        let node = tree.node_mut(id);
        node.in_flight = node.in_flight.saturating_sub(1);
        let e = &mut node.edges[edge];
        e.in_flight = e.in_flight.saturating_sub(1);
    }
}

fn release_all<S: Clone>(tree: &mut Tree<S>, pending: &[PendingLeaf]) {
    for p in pending {
        release(tree, &p.path, p.leaf);
    }
}

/// Clamp a network value into [-1, 1], rejecting NaN and infinities.
fn checked_value(value: f32) -> Result<f32, InferenceError> {
    if value.is_finite() {
        Ok(value.clamp(-1.0, 1.0))
    } else {
        Err(InferenceError::NonFiniteValue)
    }
}

/// Index of the largest key, lowest index on ties.
fn argmax_by<S, K: PartialOrd>(node: &Node<S>, key: impl Fn(&Edge) -> K) -> usize {
    let mut best = 0;
    for i in 1..node.edges.len() {
        if key(&node.edges[i]) > key(&node.edges[best]) {
            best = i;
        }
    }
    best
}

fn summarise<S>(root: &Node<S>, temperature: f32, simulations: u32) -> SearchResult {
    let edges = &root.edges;
    let max_visits = edges.iter().map(|e| e.visits).max().unwrap_or(0);

    let best = if max_visits == 0 {
        argmax_by(root, |e| e.prior)
    } else {
        argmax_by(root, |e| e.visits)
    };

    let probs: Vec<f32> = if temperature == 0.0 {
        (0..edges.len()).map(|i| if i == best { 1.0 } else { 0.0 }).collect()
    } else if max_visits == 0 {
        edges.iter().map(|e| e.prior).collect()
    } else {
        let inv_t = 1.0 / f64::from(temperature);
        let weights: Vec<f64> = edges
            .iter()
            .map(|e| (f64::from(e.visits) / f64::from(max_visits)).powf(inv_t))
            .collect();
        let sum: f64 = weights.iter().sum();
        weights.iter().map(|w| (w / sum) as f32).collect()
    };

    let total_visits: u32 = edges.iter().map(|e| e.visits).sum();
    let value = if total_visits == 0 {
        0.0
    } else {
        edges.iter().map(|e| e.total_value).sum::<f32>() / total_visits as f32
    };

    SearchResult {
        policy: edges.iter().map(|e| e.mv).zip(probs).collect(),
        value,
        visits: edges.iter().map(|e| (e.mv, e.visits)).collect(),
        best_move: edges[best].mv,
        simulations,
    }
}
