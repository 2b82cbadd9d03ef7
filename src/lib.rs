//! # Tile Swap Puzzle Library
//!
//! This library generates swap puzzles that are guaranteed to be solvable in at
//! least a requested number of moves, and an A* solver that proves their par.
//!
//! It is used by two binaries:
//! - `puzzle_generator`: Builds puzzles from a difficulty profile and prints
//!   the start grid together with its optimal solution.
//! - `puzzle_solver`: Takes a start grid and a target grid from a file and
//!   prints an optimal sequence of swaps.
//!
//! ## Modules
//! - `engine`: Grid representation (`Grid`), tiles, positions, and swap moves.
//! - `heuristics`: Goals (`DirectMatch`, `RuleBased`) and their admissible heuristics.
//! - `solver`: A* search producing optimal `SolutionPath`s.
//! - `generator`: The shuffle-then-verify puzzle generator.
//! - `error`: Error types surfaced to callers.
//! - `utils`: Parsing grids from text.

pub mod engine;
pub mod error;
pub mod generator;
pub mod heuristics;
pub mod solver;
pub mod utils;

pub use crate::engine::{Grid, Move, Position, Symbol, Tile};
pub use crate::error::{PuzzleError, SwapViolation};
pub use crate::generator::{DifficultyProfile, GenerationResult, Generator, GeneratorConfig, PuzzleKind};
pub use crate::heuristics::{heuristic, Goal, Rule};
pub use crate::solver::{try_find_solution, SearchLimits, SolutionPath, SolveError, Solver};
