//! Search and self-play configuration.
//!
//! Defaults come from [`crate::constants`].

use std::time::Duration;

use crate::constants::{
    BATCH_SIZE, C_PUCT, DIRICHLET_ALPHA, DIRICHLET_EPSILON, MAX_GAME_LEN, N_SIMS,
    TEMPERATURE_DROP_MOVE, VIRTUAL_LOSS,
};
use crate::error::SearchError;

/// Dirichlet exploration noise mixed into the root priors:
/// `P' = (1 - epsilon) * P + epsilon * Dir(alpha)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirichletNoise {
    pub alpha: f32,
    pub epsilon: f32,
}

impl Default for DirichletNoise {
    fn default() -> Self {
        Self {
            alpha: DIRICHLET_ALPHA,
            epsilon: DIRICHLET_EPSILON,
        }
    }
}

/// How simulations are scheduled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SearchMode {
    /// One simulation at a time, one inference call per new leaf.
    Sequential,
    /// Up to `batch_size` leaves per inference call, kept apart by virtual loss.
    Batched { batch_size: usize, virtual_loss: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    pub simulations: u32,
    /// PUCT exploration constant.
    pub c_puct: f32,
    pub noise: Option<DirichletNoise>,
    /// Visit-count temperature for the returned policy; 0 selects the most visited move.
    pub temperature: f32,
    pub mode: SearchMode,
    /// Wall-clock budget, checked between simulations.
    pub time_limit: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            simulations: N_SIMS,
            c_puct: C_PUCT,
            noise: None,
            temperature: 1.0,
            mode: SearchMode::Sequential,
            time_limit: None,
        }
    }
}

impl SearchConfig {
    pub fn with_simulations(simulations: u32) -> Self {
        Self {
            simulations,
            ..Default::default()
        }
    }

    /// Greedy search without exploration noise.
    pub fn for_evaluation(simulations: u32) -> Self {
        Self {
            simulations,
            temperature: 0.0,
            noise: None,
            ..Default::default()
        }
    }

    /// Root noise, temperature 1 and batched inference.
    pub fn for_self_play(simulations: u32) -> Self {
        Self {
            simulations,
            noise: Some(DirichletNoise::default()),
            temperature: 1.0,
            mode: SearchMode::Batched {
                batch_size: BATCH_SIZE,
                virtual_loss: VIRTUAL_LOSS,
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.simulations == 0 {
            return Err(SearchError::InvalidConfig("simulations must be positive"));
        }
        if !self.c_puct.is_finite() || self.c_puct <= 0.0 {
            return Err(SearchError::InvalidConfig("c_puct must be finite and positive"));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(SearchError::InvalidConfig("temperature must be finite and non-negative"));
        }
        if let Some(noise) = self.noise {
            if !noise.alpha.is_finite() || noise.alpha <= 0.0 {
                return Err(SearchError::InvalidConfig("dirichlet alpha must be positive"));
            }
            if !(0.0..=1.0).contains(&noise.epsilon) {
                return Err(SearchError::InvalidConfig("dirichlet epsilon must be in [0, 1]"));
            }
        }
        if let SearchMode::Batched { batch_size, virtual_loss } = self.mode {
            if batch_size == 0 {
                return Err(SearchError::InvalidConfig("batch size must be positive"));
            }
            if !virtual_loss.is_finite() || virtual_loss < 0.0 {
                return Err(SearchError::InvalidConfig("virtual loss must be finite and non-negative"));
            }
        }
        Ok(())
    }
}

/// Parameters of a self-play game.
#[derive(Clone, Debug, PartialEq)]
pub struct SelfPlayConfig {
    pub search: SearchConfig,
    /// Moves before this index use `search.temperature`, later moves are greedy.
    pub temperature_drop_move: usize,
    pub max_moves: usize,
    pub komi: f32,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::for_self_play(N_SIMS),
            temperature_drop_move: TEMPERATURE_DROP_MOVE,
            max_moves: MAX_GAME_LEN,
            komi: crate::constants::DEFAULT_KOMI,
        }
    }
}

impl SelfPlayConfig {
    /// Temperature for the move with index `move_number`.
    pub fn temperature_at(&self, move_number: usize) -> f32 {
        if move_number < self.temperature_drop_move {
            self.search.temperature
        } else {
            0.0
        }
    }
}
