//! Michi-Zero: an AlphaZero-style MCTS engine for 9x9 Go.
//!
//! The search combines PUCT tree statistics with priors and values from a
//! policy/value network. Everything around the search core is reached
//! through a trait, so the core never inspects a game state or a tensor.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions and default engine parameters
//! - [`position`] - Core game logic (board state, moves, captures, scoring)
//! - [`rules`] - The `Rules` trait, moves and the 9x9 Go rules
//! - [`codec`] - Network input encoding (17 history planes)
//! - [`inference`] - The policy/value network boundary
//! - [`playout`] - Random playouts and a playout-backed evaluator
//! - [`node`], [`tree`] - Arena search tree
//! - [`config`] - Search and self-play parameters
//! - [`search`] - PUCT search, sequential and batched
//! - [`selfplay`] - Self-play game generation
//!
//! ## Example
//!
//! ```
//! use michi_zero::codec::HistoryPlanes;
//! use michi_zero::config::SearchConfig;
//! use michi_zero::inference::UniformInference;
//! use michi_zero::position::Position;
//! use michi_zero::rules::GoRules;
//! use michi_zero::search::Search;
//! use michi_zero::tree::Tree;
//!
//! let mut search = Search::new(GoRules, HistoryPlanes, UniformInference, 42);
//! let mut tree = Tree::new(&GoRules, Position::new());
//!
//! let result = search.run(&mut tree, &SearchConfig::for_evaluation(64)).unwrap();
//! println!("Best move: {}", result.best_move);
//!
//! // Keep the searched subtree for the next move
//! tree.advance(&GoRules, result.best_move).unwrap();
//! ```

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod node;
pub mod playout;
pub mod position;
pub mod rules;
pub mod search;
pub mod selfplay;
pub mod tree;
