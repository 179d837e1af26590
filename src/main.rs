//! Michi-Zero command line.
//!
//! ## Usage
//!
//! - `michi-zero search --moves D4,E5` - Search a position reached by a move list
//! - `michi-zero selfplay --games 8` - Play self-play games in parallel
//!
//! Positions are evaluated with random playouts; no trained network is bundled.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use flexi_logger::Logger;
use log::info;
use rayon::prelude::*;

use michi_zero::codec::HistoryPlanes;
use michi_zero::config::{DirichletNoise, SearchConfig, SearchMode, SelfPlayConfig};
use michi_zero::constants::{BATCH_SIZE, C_PUCT, DEFAULT_KOMI, MAX_GAME_LEN, N_SIMS, TEMPERATURE_DROP_MOVE, VIRTUAL_LOSS};
use michi_zero::inference::{InferenceEngine, UniformInference};
use michi_zero::playout::PlayoutInference;
use michi_zero::position::Position;
use michi_zero::rules::{GoRules, Move};
use michi_zero::search::Search;
use michi_zero::selfplay::SelfPlay;
use michi_zero::tree::Tree;

/// Michi-Zero: AlphaZero-style MCTS for 9x9 Go
#[derive(Parser)]
#[command(name = "michi-zero")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one position and print the move distribution
    Search {
        /// Comma-separated moves from the empty board, e.g. "D4,E5,pass"
        #[arg(long, value_delimiter = ',')]
        moves: Vec<Move>,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Play self-play games and print a summary of each
    Selfplay {
        #[arg(long, default_value_t = 1)]
        games: usize,
        /// Moves played with temperature before switching to greedy play
        #[arg(long, default_value_t = TEMPERATURE_DROP_MOVE)]
        temperature_drop: usize,
        #[arg(long, default_value_t = MAX_GAME_LEN)]
        max_moves: usize,
        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Evaluator {
    /// Uniform priors, value from random playouts
    Playout,
    /// Uniform priors, neutral value
    Uniform,
}

#[derive(clap::Args)]
struct SearchArgs {
    #[arg(long, default_value_t = N_SIMS)]
    simulations: u32,
    #[arg(long, default_value_t = C_PUCT)]
    c_puct: f32,
    #[arg(long, default_value_t = 1.0)]
    temperature: f32,
    /// Leaves per inference call; 1 runs the sequential search
    #[arg(long, default_value_t = BATCH_SIZE)]
    batch_size: usize,
    #[arg(long, default_value_t = VIRTUAL_LOSS)]
    virtual_loss: f32,
    /// Mix Dirichlet noise into the root priors
    #[arg(long)]
    noise: bool,
    /// Per-move time limit in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,
    #[arg(long, default_value_t = DEFAULT_KOMI)]
    komi: f32,
    #[arg(long, value_enum, default_value_t = Evaluator::Playout)]
    evaluator: Evaluator,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl SearchArgs {
    fn config(&self) -> Result<SearchConfig> {
        let mode = if self.batch_size <= 1 {
            SearchMode::Sequential
        } else {
            SearchMode::Batched {
                batch_size: self.batch_size,
                virtual_loss: self.virtual_loss,
            }
        };
        let config = SearchConfig {
            simulations: self.simulations,
            c_puct: self.c_puct,
            noise: self.noise.then(DirichletNoise::default),
            temperature: self.temperature,
            mode,
            time_limit: self.time_limit_ms.map(Duration::from_millis),
        };
        config.validate()?;
        Ok(config)
    }

    fn engine(&self) -> Arc<dyn InferenceEngine + Send + Sync> {
        match self.evaluator {
            Evaluator::Playout => Arc::new(PlayoutInference::new(self.seed, 1).with_komi(self.komi)),
            Evaluator::Uniform => Arc::new(UniformInference),
        }
    }
}

fn main() -> Result<()> {
    let _logger = Logger::try_with_env_or_str("info")?.log_to_stderr().start()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { moves, search } => run_search(&moves, &search),
        Commands::Selfplay {
            games,
            temperature_drop,
            max_moves,
            search,
        } => run_selfplay(games, temperature_drop, max_moves, &search),
    }
}

fn run_search(moves: &[Move], args: &SearchArgs) -> Result<()> {
    let config = args.config()?;
    let mut tree = Tree::new(&GoRules, Position::with_komi(args.komi));
    for &mv in moves {
        tree.advance(&GoRules, mv).with_context(|| format!("cannot play {mv}"))?;
    }

    let mut search = Search::new(GoRules, HistoryPlanes, args.engine(), args.seed);
    let result = search.run(&mut tree, &config)?;

    let mut ranked: Vec<_> = result.policy.iter().zip(&result.visits).collect();
    ranked.sort_by(|a, b| b.1.1.cmp(&a.1.1));
    println!("best move: {}  value: {:+.3}  simulations: {}", result.best_move, result.value, result.simulations);
    for &(&(mv, p), &(_, n)) in ranked.iter().take(10) {
        println!("{:>5} {n:>6} {p:.3}", mv.to_string());
    }
    Ok(())
}

fn run_selfplay(games: usize, temperature_drop: usize, max_moves: usize, args: &SearchArgs) -> Result<()> {
    if games == 0 {
        bail!("--games must be positive");
    }
    let config = SelfPlayConfig {
        search: args.config()?,
        temperature_drop_move: temperature_drop,
        max_moves,
        komi: args.komi,
    };
    let engine = args.engine();

    info!("playing {games} games with {} simulations per move", config.search.simulations);
    let records = (0..games)
        .into_par_iter()
        .map(|game| {
            let seed = args.seed.wrapping_add(game as u64);
            SelfPlay::new(Arc::clone(&engine), config.clone(), seed).play_game()
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (i, game) in records.iter().enumerate() {
        println!(
            "game {:>3}: {:>3} moves, B{:+.1} ({:?} for Black)",
            i + 1,
            game.moves.len(),
            game.black_score,
            game.outcome
        );
    }
    let black_wins = records.iter().filter(|g| g.black_score > 0.0).count();
    println!("Black won {black_wins} of {games}");
    Ok(())
}
