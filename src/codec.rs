//! Network input encoding.
//!
//! A [`PositionCodec`] turns a game state into the flat tensor the policy/value
//! network consumes. The encoding also carries the legal moves of the
//! position, because the network's prior vector is defined over exactly
//! those moves and in that order.

use crate::constants::{HISTORY_LEN, PLANES, POINTS, STONE_OPPONENT, STONE_TO_PLAY};
use crate::position::{Position, point_of};
use crate::rules::Move;

/// A position ready for inference.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedPosition {
    /// Row-major `[planes, N, N]` features.
    pub planes: Vec<f32>,
    /// Moves the returned priors must cover, in order.
    pub legal_moves: Vec<Move>,
}

impl EncodedPosition {
    /// Number of feature values per position for the 9x9 history encoding.
    pub const LEN: usize = PLANES * POINTS;

    /// Features of one plane.
    pub fn plane(&self, index: usize) -> &[f32] {
        &self.planes[index * POINTS..(index + 1) * POINTS]
    }
}

pub trait PositionCodec<S> {
    fn encode(&self, state: &S, legal_moves: &[Move]) -> EncodedPosition;
}

/// AlphaGo Zero style planes for a 9x9 position.
///
/// - Planes 0-7: Black stones, newest snapshot first
/// - Planes 8-15: White stones, newest snapshot first
/// - Plane 16: all ones when Black is to play, zeros otherwise
///
/// Snapshots missing at the start of a game stay zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct HistoryPlanes;

impl PositionCodec<Position> for HistoryPlanes {
    fn encode(&self, pos: &Position, legal_moves: &[Move]) -> EncodedPosition {
        let mut planes = vec![0.0f32; EncodedPosition::LEN];

        // The current board is always plane 0 even before any move was played
        let current = pos.grid();
        let history = pos.history();
        let snapshots = std::iter::once(&current).chain(history.iter().skip(1));

        for (age, grid) in snapshots.take(HISTORY_LEN).enumerate() {
            let black = age * POINTS;
            let white = (HISTORY_LEN + age) * POINTS;
            for (i, &c) in grid.iter().enumerate() {
                match c {
                    1 => planes[black + i] = 1.0,
                    -1 => planes[white + i] = 1.0,
                    _ => {}
                }
            }
        }

        if pos.black_to_play() {
            planes[2 * HISTORY_LEN * POINTS..].fill(1.0);
        }

        EncodedPosition {
            planes,
            legal_moves: legal_moves.to_vec(),
        }
    }
}

/// Rebuild a playable position from the newest planes of an encoding.
///
/// Ko, capture counts and older history are not recoverable from the
/// planes; the result is good enough for evaluators that only need the
/// current stones and the colour to play.
pub fn decode_current(encoded: &EncodedPosition, komi: f32) -> Option<Position> {
    if encoded.planes.len() != EncodedPosition::LEN {
        return None;
    }
    let black_to_play = encoded.plane(2 * HISTORY_LEN).first().copied()? > 0.5;
    let black = encoded.plane(0);
    let white = encoded.plane(HISTORY_LEN);

    let mut pos = Position::with_komi(komi);
    if !black_to_play {
        pos.n = 1;
    }
    let (mine, theirs) = if black_to_play { (black, white) } else { (white, black) };
    for i in 0..POINTS {
        if mine[i] > 0.5 {
            pos.color[point_of(i)] = STONE_TO_PLAY;
        } else if theirs[i] > 0.5 {
            pos.color[point_of(i)] = STONE_OPPONENT;
        }
    }
    Some(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{GoRules, Rules};

    fn play(pos: &Position, row: usize, col: usize) -> Position {
        GoRules.apply_move(pos, Move::at(row, col).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_board_encoding() {
        let pos = Position::new();
        let legal = GoRules.legal_moves(&pos);
        let enc = HistoryPlanes.encode(&pos, &legal);

        assert_eq!(enc.planes.len(), PLANES * POINTS);
        assert_eq!(enc.legal_moves, legal);
        for p in 0..2 * HISTORY_LEN {
            assert!(enc.plane(p).iter().all(|&v| v == 0.0));
        }
        assert!(enc.plane(2 * HISTORY_LEN).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_history_planes_shift() {
        let pos = play(&Position::new(), 0, 0);
        let pos = play(&pos, 8, 8);
        let enc = HistoryPlanes.encode(&pos, &[]);

        // Newest snapshot holds both stones
        assert_eq!(enc.plane(0)[0], 1.0);
        assert_eq!(enc.plane(HISTORY_LEN)[80], 1.0);
        // One move earlier White had not played yet
        assert_eq!(enc.plane(1)[0], 1.0);
        assert_eq!(enc.plane(HISTORY_LEN + 1)[80], 0.0);
        // Black to play again
        assert_eq!(enc.plane(2 * HISTORY_LEN)[0], 1.0);
    }

    #[test]
    fn test_white_to_play_plane() {
        let pos = play(&Position::new(), 4, 4);
        let enc = HistoryPlanes.encode(&pos, &[]);
        assert!(enc.plane(2 * HISTORY_LEN).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_decode_current_restores_stones() {
        let pos = play(&Position::new(), 2, 3);
        let pos = play(&pos, 6, 6);
        let pos = play(&pos, 4, 4);
        let enc = HistoryPlanes.encode(&pos, &[]);
        let decoded = decode_current(&enc, pos.komi).unwrap();

        assert_eq!(decoded.grid(), pos.grid());
        assert_eq!(decoded.black_to_play(), pos.black_to_play());
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        let enc = EncodedPosition {
            planes: vec![0.0; 3],
            legal_moves: Vec::new(),
        };
        assert!(decode_current(&enc, 7.5).is_none());
    }
}
