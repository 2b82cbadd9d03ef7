use clap::Parser;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tileswap_solver::heuristics::Goal;
use tileswap_solver::solver::{SearchLimits, SolveError, Solver};
use tileswap_solver::utils::grids_from_text;
use tileswap_solver::Grid;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Maximum number of nodes the solver may expand
    #[clap(short = 'n', long, default_value_t = tileswap_solver::solver::DEFAULT_MAX_EXPANSIONS)]
    max_expansions: usize,

    /// Give up after this many seconds
    #[clap(short, long)]
    timeout: Option<u64>,

    /// Enable debug messages
    #[clap(short, long, default_value_t = false)]
    debug: bool,

    /// Path to the puzzle file: the start grid, a blank line, then the target grid
    puzzle_file: PathBuf,
}

fn read_puzzle_file(path: &PathBuf) -> Result<(Grid, Grid), String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;

    let mut grids = grids_from_text(&content)
        .map_err(|e| format!("Invalid grid format: {}", e))?
        .into_iter();

    match (grids.next(), grids.next(), grids.next()) {
        (Some(start), Some(target), None) => Ok((start, target)),
        _ => Err("Expected exactly two grids (start and target) separated by a blank line".to_string()),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.debug {
        env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    let (start, target) = match read_puzzle_file(&args.puzzle_file) {
        Ok(grids) => grids,
        Err(msg) => {
            eprintln!("{}: {}", args.puzzle_file.display(), msg);
            return ExitCode::FAILURE;
        }
    };
    println!("Loaded puzzle from {}\n", args.puzzle_file.display());
    println!("Start grid:\n{}\n", start);
    println!("Target grid:\n{}\n", target);

    let goal = Goal::direct_match(target);
    let limits = SearchLimits {
        max_expansions: Some(args.max_expansions),
        timeout: args.timeout.map(Duration::from_secs),
    };

    match Solver::new().with_limits(limits).solve_with_stats(&start, &goal) {
        Ok((path, stats)) => {
            println!(
                "Optimal solution: par {} ({} nodes expanded)\n",
                path.par, stats.expanded
            );
            let mut grid = start;
            for (i, mv) in path.moves.iter().enumerate() {
                println!("Move {}: {}", i + 1, mv);
                println!("{}\n", grid.to_string_with_highlight(Some(mv)));
                grid = match grid.apply(mv) {
                    Ok(next) => next,
                    Err(e) => {
                        eprintln!("Solver returned an illegal move: {}", e);
                        return ExitCode::FAILURE;
                    }
                };
            }
            println!("Final grid:\n{}", grid);
            ExitCode::SUCCESS
        }
        Err(SolveError::NoSolutionFound) => {
            println!("No solution exists from this state.");
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("Search stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
