//! The rules-engine boundary consumed by the search, and its 9x9 Go implementation.
//!
//! The search core never looks inside a game state. It only uses the four
//! operations of [`Rules`]: legal moves, state transition, terminal test and
//! outcome.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::constants::{ACTIONS, BOARD_IMAX, BOARD_IMIN, EMPTY, N, PASS_INDEX};
pub use crate::position::MoveError;
use crate::position::{Point, Position, area_score, index_of, pass_move, play_move, point_of};

/// An action: a board point in dense row-major order, or pass.
///
/// The index doubles as the position of the move in the network's policy vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move(u16);

impl Move {
    pub const PASS: Move = Move(PASS_INDEX as u16);

    /// Move at a dense action index, if the index is in range.
    pub fn from_index(index: usize) -> Option<Move> {
        (index < ACTIONS).then_some(Move(index as u16))
    }

    /// Move at `row`, `col` counted from the top-left point.
    pub fn at(row: usize, col: usize) -> Option<Move> {
        (row < N && col < N).then(|| Move((row * N + col) as u16))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_pass(self) -> bool {
        self == Move::PASS
    }

    pub(crate) fn from_point(pt: Point) -> Move {
        Move(index_of(pt) as u16)
    }

    pub(crate) fn point(self) -> Point {
        point_of(self.index())
    }
}

impl fmt::Display for Move {
    /// GTP coordinates: columns A-J skipping I, rows counted from the bottom.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pass() {
            return f.write_str("pass");
        }
        let row = self.index() / N;
        let col = self.index() % N;
        let mut c = b'A' + col as u8;
        if c >= b'I' {
            c += 1;
        }
        write!(f, "{}{}", c as char, N - row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid coordinate: {0:?}")]
pub struct ParseMoveError(String);

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("pass") {
            return Ok(Move::PASS);
        }
        let err = || ParseMoveError(s.to_string());

        let bytes = s.as_bytes();
        let (&col_char, digits) = bytes.split_first().ok_or_else(err)?;
        let col_char = col_char.to_ascii_uppercase();
        if !col_char.is_ascii_uppercase() || col_char == b'I' {
            return Err(err());
        }
        // Skip 'I' column (Go convention to avoid confusion with 'J')
        let col = (col_char - b'A') as usize - usize::from(col_char > b'I');

        let row: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|d| d.parse().ok())
            .ok_or_else(err)?;
        if row == 0 || row > N {
            return Err(err());
        }
        Move::at(N - row, col).ok_or_else(err)
    }
}

/// Result of a finished game for one player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    /// Scalar value: +1 win, 0 draw, -1 loss.
    pub fn value(self) -> f32 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.0,
            Outcome::Loss => -1.0,
        }
    }

    /// The same result seen by the other player.
    pub fn flip(self) -> Outcome {
        match self {
            Outcome::Win => Outcome::Loss,
            Outcome::Draw => Outcome::Draw,
            Outcome::Loss => Outcome::Win,
        }
    }
}

/// Pure state-transition interface of a two-player alternating game.
pub trait Rules {
    type State: Clone;

    /// All legal moves, in a stable order. Edge order in the tree follows it.
    fn legal_moves(&self, state: &Self::State) -> Vec<Move>;

    /// State reached by playing `mv`. The input state is not modified.
    fn apply_move(&self, state: &Self::State, mv: Move) -> Result<Self::State, MoveError>;

    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Result for the player to move in `state`; `None` unless terminal.
    fn outcome(&self, state: &Self::State) -> Option<Outcome>;
}

/// Area-scored 9x9 Go: simple ko, no suicide, ends after two passes.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoRules;

impl Rules for GoRules {
    type State = Position;

    fn legal_moves(&self, pos: &Position) -> Vec<Move> {
        if pos.is_over() {
            return Vec::new();
        }
        let mut moves: Vec<Move> = (BOARD_IMIN..BOARD_IMAX)
            .filter(|&pt| pos.color[pt] == EMPTY && pt != pos.ko)
            .filter(|&pt| {
                let mut child = pos.clone();
                play_move(&mut child, pt).is_ok()
            })
            .map(Move::from_point)
            .collect();
        moves.push(Move::PASS);
        moves
    }

    fn apply_move(&self, pos: &Position, mv: Move) -> Result<Position, MoveError> {
        let mut child = pos.clone();
        if mv.is_pass() {
            pass_move(&mut child)?;
        } else {
            play_move(&mut child, mv.point())?;
        }
        Ok(child)
    }

    fn is_terminal(&self, pos: &Position) -> bool {
        pos.is_over()
    }

    fn outcome(&self, pos: &Position) -> Option<Outcome> {
        if !pos.is_over() {
            return None;
        }
        let score = area_score(pos);
        Some(if score > 0.0 {
            Outcome::Win
        } else if score < 0.0 {
            Outcome::Loss
        } else {
            Outcome::Draw
        })
    }
}
