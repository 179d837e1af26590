//! Tree nodes and the edges between them.

use crate::rules::Move;

/// Index of a node in the tree arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Statistics for one move out of a node.
///
/// `total_value` is accumulated from the perspective of the player to move
/// at the parent node, so `mean_value` ranks the parent's choices directly.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub mv: Move,
    pub visits: u32,
    pub total_value: f32,
    pub prior: f32,
    pub child: Option<NodeId>,
    /// Virtual-loss reservations of the current batch round.
    pub in_flight: u32,
}

impl Edge {
    pub fn new(mv: Move, prior: f32) -> Self {
        Self {
            mv,
            visits: 0,
            total_value: 0.0,
            prior,
            child: None,
            in_flight: 0,
        }
    }

    /// Mean backed-up value (Q), 0 for an unvisited edge.
    #[inline]
    pub fn mean_value(&self) -> f32 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_value / self.visits as f32
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node<S> {
    pub state: S,
    pub expanded: bool,
    pub terminal: bool,
    pub visits: u32,
    pub in_flight: u32,
    pub edges: Vec<Edge>,
    /// Root exploration noise has been mixed into the priors.
    pub(crate) noise_applied: bool,
}

impl<S> Node<S> {
    pub fn new(state: S, terminal: bool) -> Self {
        Self {
            state,
            expanded: false,
            terminal,
            visits: 0,
            in_flight: 0,
            edges: Vec::new(),
            noise_applied: false,
        }
    }

    /// Position of the edge playing `mv`, if any.
    pub fn edge_index(&self, mv: Move) -> Option<usize> {
        self.edges.iter().position(|e| e.mv == mv)
    }

    pub fn edge_visits(&self) -> u32 {
        self.edges.iter().map(|e| e.visits).sum()
    }
}
