use clap::Parser;
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tileswap_solver::generator::{DifficultyProfile, Generator, GeneratorConfig, PuzzleKind};
use tileswap_solver::solver::SearchLimits;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Goal kind of the generated puzzles
    #[clap(value_enum, short, long, default_value_t = PuzzleKind::DirectMatch)]
    kind: PuzzleKind,

    /// Grid height
    #[clap(short, long, default_value_t = 3)]
    rows: usize,

    /// Grid width
    #[clap(short, long, default_value_t = 3)]
    cols: usize,

    /// Number of distinct symbols
    #[clap(short, long, default_value_t = 3)]
    symbols: u16,

    /// Minimum number of moves the puzzle must require
    #[clap(short, long, default_value_t = 4)]
    min_moves: usize,

    /// Number of puzzles to generate
    #[clap(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Seed for reproducible puzzles; random when omitted
    #[clap(long)]
    seed: Option<u64>,

    /// Attempts per puzzle before giving up
    #[clap(short, long, default_value_t = tileswap_solver::generator::DEFAULT_MAX_ATTEMPTS)]
    attempts: usize,

    /// Attempts run concurrently
    #[clap(short, long, default_value_t = 1)]
    workers: usize,

    /// Maximum solver node expansions per attempt
    #[clap(long, default_value_t = tileswap_solver::solver::DEFAULT_MAX_EXPANSIONS)]
    max_expansions: usize,

    /// Solver time limit per attempt, in milliseconds
    #[clap(long)]
    timeout_ms: Option<u64>,

    /// Enable debug messages
    #[clap(short, long, default_value_t = false)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.debug {
        env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    let config = GeneratorConfig {
        max_attempts: args.attempts,
        search_limits: SearchLimits {
            max_expansions: Some(args.max_expansions),
            timeout: args.timeout_ms.map(Duration::from_millis),
        },
        workers: args.workers,
    };
    let mut generator = match args.seed {
        Some(seed) => Generator::new(config, seed),
        None => Generator::from_entropy(config),
    };
    let profile = DifficultyProfile {
        kind: args.kind,
        ..DifficultyProfile::new(args.rows, args.cols, args.symbols, args.min_moves)
    };

    let mut failures = 0;
    for i in 0..args.count {
        match generator.generate(&profile) {
            Ok(puzzle) => {
                println!("--- Puzzle {} (id {}) ---", i + 1, puzzle.id);
                println!("Start grid:\n{}\n", puzzle.grid);
                println!("Par: {}", puzzle.solution.par);
                for (step, mv) in puzzle.solution.moves.iter().enumerate() {
                    println!("  Move {}: {}", step + 1, mv);
                }
                println!();
            }
            Err(e) => {
                eprintln!("Puzzle {}: {}", i + 1, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        eprintln!("{} of {} puzzles could not be generated", failures, args.count);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
