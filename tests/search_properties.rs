//! Property-based tests for the search invariants:
//! - root visits equal the simulations run on a fresh tree
//! - every expanded node has `1 + sum(edge visits)` visits
//! - the policy sums to 1 and the value stays in [-1, 1]
//! - no virtual loss survives a batched search

mod common;

use common::{Chain, ChainCodec, ScriptedEngine, assert_consistent};
use michi_zero::config::{DirichletNoise, SearchConfig, SearchMode};
use michi_zero::search::Search;
use michi_zero::tree::Tree;
use proptest::prelude::*;

/// Tolerance for the policy sum
const POLICY_SUM_TOLERANCE: f32 = 1e-5;

// =============================================================================
// Strategies for generating test inputs
// =============================================================================

fn arb_game() -> impl Strategy<Value = Chain> {
    (1usize..5, 1usize..6).prop_map(|(branching, depth)| Chain { branching, depth })
}

/// Sequential, or batched with 1-6 leaves per round
fn arb_mode() -> impl Strategy<Value = SearchMode> {
    prop_oneof![
        Just(SearchMode::Sequential),
        (1usize..7, 0.0f32..2.0).prop_map(|(batch_size, virtual_loss)| SearchMode::Batched {
            batch_size,
            virtual_loss
        }),
    ]
}

fn arb_config() -> impl Strategy<Value = SearchConfig> {
    (1u32..80, arb_mode(), 0.0f32..2.0, any::<bool>(), 0.1f32..4.0).prop_map(
        |(simulations, mode, temperature, noise, c_puct)| SearchConfig {
            simulations,
            c_puct,
            noise: noise.then(DirichletNoise::default),
            temperature,
            mode,
            time_limit: None,
        },
    )
}

proptest! {
    #[test]
    fn prop_search_keeps_tree_consistent(
        game in arb_game(),
        config in arb_config(),
        value in -1.0f32..=1.0,
        seed in any::<u64>(),
    ) {
        let engine = ScriptedEngine::new(&[], value);
        let mut search = Search::new(game, ChainCodec, &engine, seed);
        let mut tree = Tree::new(&game, Vec::new());
        let result = search.run(&mut tree, &config).unwrap();

        prop_assert_eq!(result.simulations, config.simulations);
        prop_assert_eq!(tree.root_node().visits, config.simulations);
        assert_consistent(&tree);

        let sum: f32 = result.policy.iter().map(|&(_, p)| p).sum();
        prop_assert!((sum - 1.0).abs() < POLICY_SUM_TOLERANCE, "policy sums to {}", sum);
        prop_assert!((-1.0..=1.0).contains(&result.value));
        prop_assert!(result.policy.iter().all(|&(_, p)| p >= 0.0));
    }

    #[test]
    fn prop_sequential_search_is_deterministic(
        game in arb_game(),
        simulations in 1u32..60,
        seed in any::<u64>(),
    ) {
        let config = SearchConfig {
            noise: Some(DirichletNoise::default()),
            ..SearchConfig::with_simulations(simulations)
        };
        let run = || {
            let engine = ScriptedEngine::new(&[], 0.25);
            let mut search = Search::new(game, ChainCodec, &engine, seed);
            let mut tree = Tree::new(&game, Vec::new());
            search.run(&mut tree, &config).unwrap()
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn prop_advance_preserves_subtree_visits(
        game in arb_game(),
        simulations in 2u32..60,
    ) {
        let engine = ScriptedEngine::new(&[], 0.0);
        let mut search = Search::new(game, ChainCodec, &engine, 1);
        let mut tree = Tree::new(&game, Vec::new());
        let result = search.run(&mut tree, &SearchConfig::for_evaluation(simulations)).unwrap();

        let (mv, visits) = result.visits[0];
        tree.advance(&game, mv).unwrap();
        prop_assert_eq!(tree.root_node().visits, visits);
        assert_consistent(&tree);
    }
}
