//! Self-play game generation.
//!
//! A [`SelfPlay`] driver plays one game against itself with a fresh tree,
//! reusing the searched subtree after every move, and returns the training
//! samples of the game with the final result filled in.

use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::codec::{HistoryPlanes, PositionCodec};
use crate::config::SelfPlayConfig;
use crate::error::SearchError;
use crate::inference::InferenceEngine;
use crate::position::{Position, area_score};
use crate::rules::{GoRules, Move, Outcome};
use crate::search::{Search, StopHandle};
use crate::tree::Tree;

/// One position of a finished game.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSample {
    /// Network input planes of the position.
    pub planes: Vec<f32>,
    /// Search policy over the full action space.
    pub policy: Vec<f32>,
    pub black_to_play: bool,
    /// Game result for the player to move: +1 win, 0 draw, -1 loss.
    pub z: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameRecord {
    pub moves: Vec<Move>,
    pub samples: Vec<TrainingSample>,
    /// Final area score from Black's side, komi included.
    pub black_score: f32,
    /// Result for Black.
    pub outcome: Outcome,
}

pub struct SelfPlay<E> {
    search: Search<GoRules, HistoryPlanes, E>,
    config: SelfPlayConfig,
    rng: ChaCha8Rng,
}

impl<E: InferenceEngine> SelfPlay<E> {
    pub fn new(engine: E, config: SelfPlayConfig, seed: u64) -> Self {
        Self {
            search: Search::new(GoRules, HistoryPlanes, engine, seed),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.search.stop_handle()
    }

    /// Play one game to the end or to `max_moves`.
    pub fn play_game(&mut self) -> Result<GameRecord, SearchError> {
        self.config.search.validate()?;
        let stop = self.search.stop_handle();
        let mut tree = Tree::new(&GoRules, Position::with_komi(self.config.komi));
        let mut moves = Vec::new();
        let mut samples = Vec::new();

        while !tree.root_node().terminal && moves.len() < self.config.max_moves {
            if stop.is_stopped() {
                return Err(SearchError::Cancelled);
            }
            let mut search_config = self.config.search.clone();
            search_config.temperature = self.config.temperature_at(moves.len());
            let result = self.search.run(&mut tree, &search_config)?;

            let pos = &tree.root_node().state;
            let legal: Vec<Move> = result.visits.iter().map(|&(mv, _)| mv).collect();
            samples.push(TrainingSample {
                planes: HistoryPlanes.encode(pos, &legal).planes,
                policy: result.dense_policy(),
                black_to_play: pos.black_to_play(),
                z: 0.0,
            });

            let mv = result.sample_move(&mut self.rng);
            debug!("move {}: {} (value {:.3})", moves.len() + 1, mv, result.value);
            tree.advance(&GoRules, mv)?;
            moves.push(mv);
        }

        let pos = &tree.root_node().state;
        let score = area_score(pos);
        let black_score = if pos.black_to_play() { score } else { -score };
        let outcome = outcome_of(black_score);
        for sample in &mut samples {
            let z = outcome.value();
            sample.z = if sample.black_to_play { z } else { -z };
        }

        info!(
            "game finished after {} moves: B{:+.1} ({:?} for Black)",
            moves.len(),
            black_score,
            outcome
        );
        Ok(GameRecord {
            moves,
            samples,
            black_score,
            outcome,
        })
    }
}

fn outcome_of(score: f32) -> Outcome {
    if score > 0.0 {
        Outcome::Win
    } else if score < 0.0 {
        Outcome::Loss
    } else {
        Outcome::Draw
    }
}
