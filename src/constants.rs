//! Constants for board dimensions, the action space, and search parameters.
//!
//! The board uses a 1D array representation with padding for boundary detection.
//! The network sees a dense `N * N + 1` action space (every point plus pass).

// =============================================================================
// Board Geometry
// =============================================================================

/// Board size (NxN).
#[cfg(feature = "board9x9")]
pub const N: usize = 9;

#[cfg(not(feature = "board9x9"))]
compile_error!("The 'board9x9' feature must be enabled: the search core targets 9x9 Go");

/// Board width including padding on both sides.
pub const W: usize = N + 2;

/// Total board array size including all padding.
pub const BOARDSIZE: usize = (N + 1) * W + 1;

/// First valid board index (skips top and left padding).
pub const BOARD_IMIN: usize = N + 1;

/// Last valid board index (before bottom padding).
pub const BOARD_IMAX: usize = BOARDSIZE - N - 1;

/// Number of playable points.
pub const POINTS: usize = N * N;

/// Maximum game length before the game is scored as it stands.
pub const MAX_GAME_LEN: usize = N * N * 3;

/// Default komi (compensation points for White).
pub const DEFAULT_KOMI: f32 = 7.5;

// =============================================================================
// Action Space
// =============================================================================

/// Size of the dense action space: one entry per point plus pass.
pub const ACTIONS: usize = POINTS + 1;

/// Dense action index of the pass move.
pub const PASS_INDEX: usize = POINTS;

// =============================================================================
// Network Input
// =============================================================================

/// Number of past board snapshots kept per colour.
pub const HISTORY_LEN: usize = 8;

/// Number of input planes: black history, white history, colour to play.
pub const PLANES: usize = 2 * HISTORY_LEN + 1;

// =============================================================================
// MCTS (Monte Carlo Tree Search) Parameters
// =============================================================================

/// Default number of simulations per move.
pub const N_SIMS: u32 = 800;

/// Default PUCT exploration constant.
pub const C_PUCT: f32 = 1.0;

/// Allowed distance of a prior vector's sum from 1 before it is rejected.
pub const PRIOR_SUM_TOLERANCE: f32 = 1e-4;

/// Root Dirichlet noise concentration.
pub const DIRICHLET_ALPHA: f32 = 0.3;

/// Fraction of each root prior replaced by Dirichlet noise.
pub const DIRICHLET_EPSILON: f32 = 0.25;

/// Default leaves per inference call in batched mode.
pub const BATCH_SIZE: usize = 8;

/// Default virtual loss applied per in-flight simulation.
pub const VIRTUAL_LOSS: f32 = 1.0;

// =============================================================================
// Self-play Parameters
// =============================================================================

/// Move number at which self-play switches from temperature 1 to greedy.
pub const TEMPERATURE_DROP_MOVE: usize = 15;

// =============================================================================
// Neighbor Offsets
// =============================================================================

/// Offsets to neighboring points in the 1D board array.
/// Order: North, East, South, West, NE, SE, SW, NW
pub const DELTA: [isize; 8] = [
    -(N as isize) - 1, // North (up one row)
    1,                 // East (right one column)
    (N as isize) + 1,  // South (down one row)
    -1,                // West (left one column)
    -(N as isize),     // NE (diagonal)
    W as isize,        // SE (diagonal)
    N as isize,        // SW (diagonal)
    -(W as isize),     // NW (diagonal)
];

// =============================================================================
// Stone Color Constants (as bytes for direct comparison)
// =============================================================================

/// Stone of the player to move.
pub const STONE_TO_PLAY: u8 = b'X';

/// Stone of the opponent.
pub const STONE_OPPONENT: u8 = b'x';

/// Empty point.
pub const EMPTY: u8 = b'.';

/// Out of bounds (padding).
pub const OUT: u8 = b' ';
