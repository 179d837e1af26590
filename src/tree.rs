//! Arena-backed search tree.
//!
//! Nodes live in one `Vec` and refer to their children by [`NodeId`]. Edges
//! are created when a node is expanded; the child behind an edge is created
//! the first time a simulation walks it. Advancing to a child keeps that
//! subtree and compacts the arena.

use crate::constants::PRIOR_SUM_TOLERANCE;
use crate::error::{PriorsError, SearchError};
use crate::node::{Edge, Node, NodeId};
use crate::rules::{Move, Rules};

#[derive(Clone, Debug)]
pub struct Tree<S> {
    nodes: Vec<Node<S>>,
    root: NodeId,
}

impl<S: Clone> Tree<S> {
    /// Tree holding a single unexpanded root.
    pub fn new<R: Rules<State = S>>(rules: &R, state: S) -> Self {
        let terminal = rules.is_terminal(&state);
        Self {
            nodes: vec![Node::new(state, terminal)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn root_node(&self) -> &Node<S> {
        self.node(self.root)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node<S> {
        &mut self.nodes[id.index()]
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Materialise one edge per legal move.
    ///
    /// Priors must be finite, non-negative and sum to 1 within
    /// [`PRIOR_SUM_TOLERANCE`]; accepted priors are renormalised exactly.
    /// On error the node is left untouched.
    pub fn expand(&mut self, id: NodeId, legal_moves: &[Move], priors: &[f32]) -> Result<(), SearchError> {
        if self.node(id).expanded {
            return Err(SearchError::AlreadyExpanded);
        }
        let sum = validate_priors(legal_moves, priors)?;

        let node = self.node_mut(id);
        node.edges = legal_moves
            .iter()
            .zip(priors)
            .map(|(&mv, &p)| Edge::new(mv, p / sum))
            .collect();
        node.expanded = true;
        Ok(())
    }

    /// Child behind `edge` of node `id`, created on first use.
    pub fn child_of<R: Rules<State = S>>(&mut self, id: NodeId, edge: usize, rules: &R) -> Result<NodeId, SearchError> {
        let parent = self.node(id);
        let e = &parent.edges[edge];
        if let Some(child) = e.child {
            return Ok(child);
        }

        let mv = e.mv;
        let state = rules
            .apply_move(&parent.state, mv)
            .map_err(|_| SearchError::IllegalMove { mv })?;
        let terminal = rules.is_terminal(&state);

        let child = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(state, terminal));
        self.node_mut(id).edges[edge].child = Some(child);
        Ok(child)
    }

    /// Make the child reached by `mv` the new root.
    ///
    /// Statistics of the kept subtree are preserved and every other node is
    /// released. On error the tree is unchanged.
    pub fn advance<R: Rules<State = S>>(&mut self, rules: &R, mv: Move) -> Result<(), SearchError> {
        let root = self.root;

        if !self.node(root).expanded {
            let state = &self.node(root).state;
            if !rules.legal_moves(state).contains(&mv) {
                return Err(SearchError::IllegalMove { mv });
            }
            let next = rules
                .apply_move(state, mv)
                .map_err(|_| SearchError::IllegalMove { mv })?;
            *self = Tree::new(rules, next);
            return Ok(());
        }

        let edge = self
            .node(root)
            .edge_index(mv)
            .ok_or(SearchError::IllegalMove { mv })?;
        let child = self.child_of(root, edge, rules)?;
        self.retain_subtree(child);
        Ok(())
    }

    /// Keep only `new_root` and its descendants, renumbered breadth-first.
    fn retain_subtree(&mut self, new_root: NodeId) {
        let mut order = vec![new_root];
        let mut i = 0;
        while i < order.len() {
            let id = order[i];
            order.extend(self.node(id).edges.iter().filter_map(|e| e.child));
            i += 1;
        }

        let mut remap = vec![None; self.nodes.len()];
        for (new, old) in order.iter().enumerate() {
            remap[old.index()] = Some(NodeId(new as u32));
        }

        let mut slots: Vec<Option<Node<S>>> = std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        self.nodes = order
            .iter()
            .filter_map(|old| slots[old.index()].take())
            .map(|mut node| {
                for e in &mut node.edges {
                    e.child = e.child.and_then(|c| remap[c.index()]);
                }
                node
            })
            .collect();
        self.root = NodeId(0);
    }
}

/// Check a prior vector against its moves, returning the prior sum.
pub(crate) fn validate_priors(legal_moves: &[Move], priors: &[f32]) -> Result<f32, PriorsError> {
    if legal_moves.is_empty() {
        return Err(PriorsError::Empty);
    }
    if priors.len() != legal_moves.len() {
        return Err(PriorsError::LengthMismatch {
            moves: legal_moves.len(),
            priors: priors.len(),
        });
    }
    for (index, &value) in priors.iter().enumerate() {
        if !value.is_finite() {
            return Err(PriorsError::NonFinite { index });
        }
        if value < 0.0 {
            return Err(PriorsError::Negative { index, value });
        }
    }
    let sum: f32 = priors.iter().sum();
    if (sum - 1.0).abs() > PRIOR_SUM_TOLERANCE {
        return Err(PriorsError::NotNormalized { sum });
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use crate::rules::GoRules;

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    fn expanded_tree() -> (Tree<Position>, Vec<Move>) {
        let mut tree = Tree::new(&GoRules, Position::new());
        let legal = GoRules.legal_moves(&tree.root_node().state);
        let priors = vec![1.0 / legal.len() as f32; legal.len()];
        tree.expand(tree.root(), &legal, &priors).unwrap();
        (tree, legal)
    }

    #[test]
    fn test_new_tree_has_unexpanded_root() {
        let tree = Tree::new(&GoRules, Position::new());
        assert_eq!(tree.len(), 1);
        let root = tree.root_node();
        assert!(!root.expanded);
        assert!(!root.terminal);
        assert!(root.edges.is_empty());
    }

    #[test]
    fn test_expand_creates_edges_only() {
        let (tree, legal) = expanded_tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_node().edges.len(), legal.len());
        assert!(tree.root_node().edges.iter().all(|e| e.child.is_none()));
    }

    #[test]
    fn test_expand_twice() {
        let (mut tree, legal) = expanded_tree();
        let priors = vec![1.0 / legal.len() as f32; legal.len()];
        assert_eq!(tree.expand(tree.root(), &legal, &priors), Err(SearchError::AlreadyExpanded));
    }

    #[test]
    fn test_expand_rejects_bad_priors() {
        let mut tree = Tree::new(&GoRules, Position::new());
        let root = tree.root();
        let moves = [mv("A1"), mv("B1")];

        let cases: [(&[f32], PriorsError); 4] = [
            (&[1.0], PriorsError::LengthMismatch { moves: 2, priors: 1 }),
            (&[1.5, -0.5], PriorsError::Negative { index: 1, value: -0.5 }),
            (&[f32::NAN, 1.0], PriorsError::NonFinite { index: 0 }),
            (&[0.5, 0.6], PriorsError::NotNormalized { sum: 1.1 }),
        ];
        for (priors, expected) in cases {
            match tree.expand(root, &moves, priors) {
                Err(SearchError::InvalidPriors(PriorsError::NotNormalized { sum })) => {
                    assert!(matches!(expected, PriorsError::NotNormalized { .. }));
                    assert!((sum - 1.1).abs() < 1e-6);
                }
                other => assert_eq!(other, Err(SearchError::InvalidPriors(expected))),
            }
            assert!(!tree.root_node().expanded);
        }
        assert_eq!(
            tree.expand(root, &[], &[]),
            Err(SearchError::InvalidPriors(PriorsError::Empty))
        );
    }

    #[test]
    fn test_expand_renormalises_within_tolerance() {
        let mut tree = Tree::new(&GoRules, Position::new());
        let root = tree.root();
        tree.expand(root, &[mv("A1"), mv("B1")], &[0.50004, 0.50004]).unwrap();
        let sum: f32 = tree.root_node().edges.iter().map(|e| e.prior).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_child_created_lazily_once() {
        let (mut tree, _) = expanded_tree();
        let root = tree.root();
        let a = tree.child_of(root, 3, &GoRules).unwrap();
        let b = tree.child_of(root, 3, &GoRules).unwrap();
        assert_eq!(a, b);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.node(a).state.n, 1);
    }

    #[test]
    fn test_child_of_illegal_edge() {
        let mut tree = Tree::new(&GoRules, Position::new());
        let root = tree.root();
        let point = mv("E5");
        tree.expand(root, &[point], &[1.0]).unwrap();
        let child = tree.child_of(root, 0, &GoRules).unwrap();
        // E5 is occupied one move later
        tree.expand(child, &[point], &[1.0]).unwrap();
        assert_eq!(
            tree.child_of(child, 0, &GoRules),
            Err(SearchError::IllegalMove { mv: point })
        );
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_advance_keeps_subtree() {
        let (mut tree, legal) = expanded_tree();
        let root = tree.root();
        let c0 = tree.child_of(root, 0, &GoRules).unwrap();
        tree.child_of(root, 1, &GoRules).unwrap();
        tree.node_mut(root).edges[0].visits = 3;
        tree.node_mut(c0).visits = 3;

        let reply = GoRules.legal_moves(&tree.node(c0).state);
        let priors = vec![1.0 / reply.len() as f32; reply.len()];
        tree.expand(c0, &reply, &priors).unwrap();
        tree.child_of(c0, 5, &GoRules).unwrap();
        assert_eq!(tree.len(), 4);

        tree.advance(&GoRules, legal[0]).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root(), NodeId(0));
        let root = tree.root_node();
        assert_eq!(root.visits, 3);
        assert_eq!(root.state.n, 1);
        assert_eq!(root.edges[5].child, Some(NodeId(1)));
        assert_eq!(tree.node(NodeId(1)).state.n, 2);
    }

    #[test]
    fn test_advance_creates_missing_child() {
        let (mut tree, _) = expanded_tree();
        tree.advance(&GoRules, Move::PASS).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_node().state.passes, 1);
        assert!(!tree.root_node().expanded);
    }

    #[test]
    fn test_advance_illegal_leaves_tree() {
        let mut tree = Tree::new(&GoRules, Position::new());
        let root = tree.root();
        tree.expand(root, &[mv("A1"), Move::PASS], &[0.5, 0.5]).unwrap();
        tree.child_of(root, 0, &GoRules).unwrap();

        assert_eq!(
            tree.advance(&GoRules, mv("E5")),
            Err(SearchError::IllegalMove { mv: mv("E5") })
        );
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root(), root);
        assert_eq!(tree.root_node().edges.len(), 2);
    }

    #[test]
    fn test_advance_unexpanded_root_checks_legality() {
        let mut tree = Tree::new(&GoRules, Position::new());
        tree.advance(&GoRules, mv("E5")).unwrap();
        assert_eq!(tree.root_node().state.n, 1);

        assert_eq!(
            tree.advance(&GoRules, mv("E5")),
            Err(SearchError::IllegalMove { mv: mv("E5") })
        );
        assert_eq!(tree.root_node().state.n, 1);
    }

    #[test]
    fn test_terminal_flag_cached() {
        let mut tree = Tree::new(&GoRules, Position::new());
        tree.advance(&GoRules, Move::PASS).unwrap();
        tree.advance(&GoRules, Move::PASS).unwrap();
        assert!(tree.root_node().terminal);
        assert!(tree.advance(&GoRules, Move::PASS).is_err());
    }
}
