//! Monte Carlo playouts (random game simulation).
//!
//! A playout plays random legal moves until the game ends, then scores the
//! result. [`PlayoutInference`] wraps playouts behind the inference boundary
//! so the search can run without a trained network: uniform priors, and a
//! value taken from a few random games.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::codec::{EncodedPosition, decode_current};
use crate::constants::{BOARD_IMAX, BOARD_IMIN, DEFAULT_KOMI, EMPTY, STONE_TO_PLAY};
use crate::inference::{Evaluation, InferenceEngine, InferenceError};
use crate::position::{Position, area_score, is_eye, pass_move, play_move};

/// Perform a Monte Carlo playout from the given position.
///
/// Plays random legal moves until two consecutive passes or the game length limit.
/// Returns +1 if the player to move at the start wins, -1 if they lose, 0 on a tie.
pub fn mcplayout<R: Rng>(pos: &mut Position, rng: &mut R) -> f32 {
    let start_n = pos.n;

    while !pos.is_over() {
        let played = match choose_random_move(pos, rng) {
            Some(pt) => play_move(pos, pt),
            None => pass_move(pos),
        };
        if played.is_err() {
            break;
        }
    }

    let s = area_score(pos);
    let s = if start_n % 2 != pos.n % 2 { -s } else { s };
    s.signum() * f32::from(s != 0.0)
}

/// Choose a random legal move that does not fill one of our own true eyes.
fn choose_random_move<R: Rng>(pos: &Position, rng: &mut R) -> Option<usize> {
    let mut candidates: Vec<usize> = (BOARD_IMIN..BOARD_IMAX)
        .filter(|&pt| pos.color[pt] == EMPTY && is_eye(pos, pt) != STONE_TO_PLAY)
        .collect();

    // Partial Fisher-Yates: try candidates in random order until one is legal
    let n = candidates.len();
    for i in 0..n {
        let j = rng.gen_range(i..n);
        candidates.swap(i, j);

        let pt = candidates[i];
        let mut test_pos = pos.clone();
        if play_move(&mut test_pos, pt).is_ok() {
            return Some(pt);
        }
    }

    None
}

/// Network stand-in built on random playouts.
///
/// The position is rebuilt from the newest planes of the encoding, so the
/// engine works behind any codec producing the 17-plane history layout.
/// Each call seeds its own RNG from the engine seed and the input planes.
pub struct PlayoutInference {
    seed: u64,
    playouts: usize,
    komi: f32,
}

impl PlayoutInference {
    pub fn new(seed: u64, playouts: usize) -> Self {
        Self {
            seed,
            playouts: playouts.max(1),
            komi: DEFAULT_KOMI,
        }
    }

    pub fn with_komi(mut self, komi: f32) -> Self {
        self.komi = komi;
        self
    }

    fn position_seed(&self, input: &EncodedPosition) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        for v in &input.planes {
            v.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl InferenceEngine for PlayoutInference {
    fn evaluate(&self, input: &EncodedPosition) -> Result<Evaluation, InferenceError> {
        let pos = decode_current(input, self.komi).ok_or(InferenceError::MalformedInput {
            expected: EncodedPosition::LEN,
            got: input.planes.len(),
        })?;
        let moves = input.legal_moves.len();
        if moves == 0 {
            return Err(InferenceError::Backend("position has no legal moves".into()));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.position_seed(input));
        let total: f32 = (0..self.playouts)
            .map(|_| mcplayout(&mut pos.clone(), &mut rng))
            .sum();

        // Playouts score for the player to move; the value is for the one who moved
        Ok(Evaluation {
            priors: vec![1.0 / moves as f32; moves],
            value: -total / self.playouts as f32,
        })
    }
}
