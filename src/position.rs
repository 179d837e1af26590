//! Go position representation and move execution.
//!
//! This module provides the game logic behind [`GoRules`](crate::rules::GoRules):
//! - Board state representation using a 1D array with padding
//! - Stone placement and capture detection
//! - Ko and suicide rules
//! - Consecutive-pass tracking and area scoring
//! - Absolute-colour board snapshots for the network input
//!
//! The board uses a color-swapping scheme where the current player's stones
//! are always `'X'` and the opponent's stones are `'x'`. This simplifies
//! move generation by always checking from the perspective of `'X'`.

use thiserror::Error;

use crate::constants::*;

/// A point on the board, represented as an index into the 1D board array.
pub type Point = usize;

/// Board snapshot with absolute colours: 1 = Black, -1 = White, 0 = empty.
/// Indexed row-major from the top-left point (A9 on 9x9).
pub type Grid = [i8; POINTS];

/// Reasons a move cannot be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("illegal move: point not empty")]
    Occupied,
    #[error("illegal move: retakes ko")]
    Ko,
    #[error("illegal move: suicide")]
    Suicide,
    #[error("illegal move: game is over")]
    GameOver,
}

/// A Go position (board state).
///
/// The board is represented as a 1D array with padding around the edges.
/// Colors are swapped after each move so that the current player is always `'X'`.
#[derive(Clone)]
pub struct Position {
    /// Board state: 'X' = current player, 'x' = opponent, '.' = empty, ' ' = out of bounds
    pub color: [u8; BOARDSIZE],
    /// Move number, passes included (0 = start of game, Black to play)
    pub n: usize,
    /// Ko point (0 if no ko)
    pub ko: Point,
    /// Last move played (0 for pass or start of game)
    pub last: Point,
    /// Number of consecutive passes ending at this position
    pub passes: u8,
    /// Stones captured by the player to move
    pub cap: u32,
    /// Stones captured by the opponent
    pub cap_x: u32,
    /// Komi (compensation points for White)
    pub komi: f32,
    /// Most recent absolute snapshots, newest first
    history: [Grid; HISTORY_LEN],
    /// Number of valid entries in `history`
    history_len: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    pub fn new() -> Self {
        Self::with_komi(DEFAULT_KOMI)
    }

    pub fn with_komi(komi: f32) -> Self {
        let mut p = Position {
            color: [OUT; BOARDSIZE],
            n: 0,
            ko: 0,
            last: 0,
            passes: 0,
            cap: 0,
            cap_x: 0,
            komi,
            history: [[0; POINTS]; HISTORY_LEN],
            history_len: 0,
        };
        empty_position(&mut p);
        p
    }

    /// True when Black is the player to move.
    #[inline]
    pub fn black_to_play(&self) -> bool {
        self.n % 2 == 0
    }

    /// True once two consecutive passes were played or the move cap is reached.
    pub fn is_over(&self) -> bool {
        self.passes >= 2 || self.n >= MAX_GAME_LEN
    }

    /// Absolute-colour view of the current board.
    pub fn grid(&self) -> Grid {
        let (to_play, opponent) = if self.black_to_play() { (1, -1) } else { (-1, 1) };
        let mut grid = [0i8; POINTS];
        for (i, g) in grid.iter_mut().enumerate() {
            *g = match self.color[point_of(i)] {
                STONE_TO_PLAY => to_play,
                STONE_OPPONENT => opponent,
                _ => 0,
            };
        }
        grid
    }

    /// Snapshots of past boards, newest first (at most [`HISTORY_LEN`]).
    pub fn history(&self) -> &[Grid] {
        &self.history[..self.history_len]
    }

    fn push_history(&mut self) {
        self.history.copy_within(0..HISTORY_LEN - 1, 1);
        self.history[0] = self.grid();
        self.history_len = (self.history_len + 1).min(HISTORY_LEN);
    }
}

/// Reset a position to the initial empty board state.
///
/// The board is laid out as a 1D array with padding:
/// - Index 0 to N: top padding (out of bounds)
/// - Each row: left padding + N playable points
/// - Bottom padding
pub fn empty_position(pos: &mut Position) {
    let mut k = 0;
    for _col in 0..=N {
        pos.color[k] = OUT;
        k += 1;
    }
    for _row in 1..=N {
        pos.color[k] = OUT;
        k += 1;
        for _col in 1..=N {
            pos.color[k] = EMPTY;
            k += 1;
        }
    }
    for _col in 0..W {
        pos.color[k] = OUT;
        k += 1;
    }
    pos.ko = 0;
    pos.last = 0;
    pos.passes = 0;
    pos.cap = 0;
    pos.cap_x = 0;
    pos.n = 0;
    pos.history_len = 0;
}

/// Board point for a row-major grid index (row 0 is the top edge).
#[inline]
pub fn point_of(index: usize) -> Point {
    (index / N + 1) * (N + 1) + index % N + 1
}

/// Row-major grid index for a board point.
#[inline]
pub fn index_of(pt: Point) -> usize {
    (pt / (N + 1) - 1) * N + pt % (N + 1) - 1
}

/// Swap stone colors (X <-> x) to change the current player.
fn swap_color(pos: &mut Position) {
    for c in &mut pos.color {
        *c = match *c {
            STONE_TO_PLAY => STONE_OPPONENT,
            STONE_OPPONENT => STONE_TO_PLAY,
            other => other,
        };
    }
}

/// Hand the turn to the opponent after a stone or a pass.
fn end_turn(pos: &mut Position, last: Point) {
    swap_color(pos);
    std::mem::swap(&mut pos.cap, &mut pos.cap_x);
    pos.n += 1;
    pos.last = last;
    pos.push_history();
}

/// Execute a pass move. Passing clears the ko.
pub fn pass_move(pos: &mut Position) -> Result<(), MoveError> {
    if pos.is_over() {
        return Err(MoveError::GameOver);
    }
    pos.ko = 0;
    pos.passes += 1;
    end_turn(pos, 0);
    Ok(())
}

/// Check if a point is "eyeish" (surrounded by stones of one color).
///
/// Returns the color of the surrounding stones, or 0 if not eyeish.
/// This may return a colour for false eyes.
pub fn is_eyeish(pos: &Position, pt: Point) -> u8 {
    let mut eyecolor: u8 = 0;
    let mut othercolor: u8 = 0;
    for n in neighbors(pt) {
        let c = pos.color[n];
        if c == OUT {
            continue;
        }
        if c == EMPTY {
            return 0;
        }
        if eyecolor == 0 {
            eyecolor = c;
            othercolor = if c == STONE_TO_PLAY {
                STONE_OPPONENT
            } else {
                STONE_TO_PLAY
            };
        } else if c == othercolor {
            return 0;
        }
    }
    eyecolor
}

/// Check if a point is a true eye.
///
/// A true eye is eyeish and has at most one "bad" diagonal at the edge,
/// none in the center. A diagonal is bad if it holds an opponent stone.
pub fn is_eye(pos: &Position, pt: Point) -> u8 {
    let eyecolor = is_eyeish(pos, pt);
    if eyecolor == 0 {
        return 0;
    }
    let falsecolor = if eyecolor == STONE_TO_PLAY {
        STONE_OPPONENT
    } else {
        STONE_TO_PLAY
    };
    let mut at_edge = false;
    let mut false_count = 0;

    for d in diagonal_neighbors(pt) {
        if pos.color[d] == OUT {
            at_edge = true;
        } else if pos.color[d] == falsecolor {
            false_count += 1;
        }
    }

    let tolerance = if at_edge { 1 } else { 0 };
    if false_count > tolerance {
        return 0;
    }
    eyecolor
}

/// Play a stone at the given point for the player to move.
///
/// Handles legality checking, captures, ko detection, and color swapping.
/// On error the position is left unchanged.
pub fn play_move(pos: &mut Position, pt: Point) -> Result<(), MoveError> {
    if pos.is_over() {
        return Err(MoveError::GameOver);
    }
    if pos.color[pt] != EMPTY {
        return Err(MoveError::Occupied);
    }
    if pt == pos.ko {
        return Err(MoveError::Ko);
    }

    // Playing into an enemy eye is the only way to create a ko
    let in_enemy_eye = is_eyeish(pos, pt) == STONE_OPPONENT;

    pos.color[pt] = STONE_TO_PLAY;
    let mut captured = 0u32;
    let mut capture_point: Point = 0;
    let mut to_remove: Vec<Point> = Vec::new();

    for n in neighbors(pt) {
        if pos.color[n] == STONE_OPPONENT && group_liberties(pos, n) == 0 {
            // Neighbours can share a group; collect each once
            if to_remove.contains(&n) {
                continue;
            }
            captured += collect_group(pos, n, &mut to_remove);
            capture_point = n;
        }
    }

    if captured == 0 && group_liberties(pos, pt) == 0 {
        pos.color[pt] = EMPTY;
        return Err(MoveError::Suicide);
    }

    for &r in &to_remove {
        pos.color[r] = EMPTY;
    }

    pos.ko = if captured == 1 && in_enemy_eye {
        capture_point
    } else {
        0
    };
    pos.cap += captured;
    pos.passes = 0;
    end_turn(pos, pt);
    Ok(())
}

/// Area score from the perspective of the player to move.
///
/// Stones count for their owner and an empty region counts for a colour
/// when it borders only that colour. Komi goes to White.
pub fn area_score(pos: &Position) -> f32 {
    let mut s = 0.0f32;
    let mut visited = [false; BOARDSIZE];

    for pt in BOARD_IMIN..BOARD_IMAX {
        match pos.color[pt] {
            STONE_TO_PLAY => s += 1.0,
            STONE_OPPONENT => s -= 1.0,
            EMPTY if !visited[pt] => {
                let (size, owner) = empty_region(pos, pt, &mut visited);
                match owner {
                    Some(STONE_TO_PLAY) => s += size as f32,
                    Some(STONE_OPPONENT) => s -= size as f32,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    if pos.black_to_play() {
        s - pos.komi
    } else {
        s + pos.komi
    }
}

/// Flood-fill an empty region, returning its size and its sole bordering colour.
fn empty_region(pos: &Position, start: Point, visited: &mut [bool; BOARDSIZE]) -> (u32, Option<u8>) {
    let mut stack = vec![start];
    let mut size = 0u32;
    let mut border: u8 = 0;
    let mut mixed = false;

    while let Some(pt) = stack.pop() {
        if visited[pt] {
            continue;
        }
        visited[pt] = true;
        size += 1;
        for n in neighbors(pt) {
            match pos.color[n] {
                EMPTY if !visited[n] => stack.push(n),
                c @ (STONE_TO_PLAY | STONE_OPPONENT) => {
                    if border == 0 {
                        border = c;
                    } else if border != c {
                        mixed = true;
                    }
                }
                _ => {}
            }
        }
    }

    let owner = if mixed || border == 0 { None } else { Some(border) };
    (size, owner)
}

/// Get the 4 orthogonal neighbors (N, E, S, W) of a point.
#[inline]
fn neighbors(pt: Point) -> [Point; 4] {
    [
        (pt as isize + DELTA[0]) as usize,
        (pt as isize + DELTA[1]) as usize,
        (pt as isize + DELTA[2]) as usize,
        (pt as isize + DELTA[3]) as usize,
    ]
}

/// Get the 4 diagonal neighbors (NE, SE, SW, NW) of a point.
#[inline]
fn diagonal_neighbors(pt: Point) -> [Point; 4] {
    [
        (pt as isize + DELTA[4]) as usize,
        (pt as isize + DELTA[5]) as usize,
        (pt as isize + DELTA[6]) as usize,
        (pt as isize + DELTA[7]) as usize,
    ]
}

/// Collect all stones in a group starting from a point.
///
/// Returns the number of stones in the group and appends them to `out`.
fn collect_group(pos: &Position, start: Point, out: &mut Vec<Point>) -> u32 {
    let color = pos.color[start];
    let mut stack = vec![start];
    let mut visited = [false; BOARDSIZE];
    let mut count = 0u32;

    while let Some(pt) = stack.pop() {
        if visited[pt] {
            continue;
        }
        visited[pt] = true;

        if pos.color[pt] == color {
            out.push(pt);
            count += 1;
            for n in neighbors(pt) {
                if !visited[n] && pos.color[n] == color {
                    stack.push(n);
                }
            }
        }
    }
    count
}

/// Count the number of liberties (empty adjacent points) of a group.
pub fn group_liberties(pos: &Position, start: Point) -> u32 {
    let color = pos.color[start];
    let mut stack = vec![start];
    let mut visited = [false; BOARDSIZE];
    let mut liberty_visited = [false; BOARDSIZE];
    let mut libs = 0u32;

    while let Some(pt) = stack.pop() {
        if visited[pt] {
            continue;
        }
        visited[pt] = true;

        if pos.color[pt] == color {
            for n in neighbors(pt) {
                match pos.color[n] {
                    EMPTY => {
                        if !liberty_visited[n] {
                            liberty_visited[n] = true;
                            libs += 1;
                        }
                    }
                    c if c == color && !visited[n] => stack.push(n),
                    _ => {}
                }
            }
        }
    }
    libs
}
