//! Error types shared by the grid model and the puzzle generator.
//!
//! Solver-local negative results live in [`crate::solver::SolveError`]; they are
//! absorbed by the generator's retry loop and never surface through
//! [`crate::generator::Generator::generate`].

use crate::engine::Position;
use crate::generator::PuzzleKind;
use thiserror::Error;

/// Why a requested swap was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SwapViolation {
    /// One of the positions lies outside the grid.
    #[error("position out of bounds")]
    OutOfBounds,
    /// One of the tiles is locked in place.
    #[error("tile is locked")]
    Locked,
    /// The positions are not orthogonal neighbours.
    #[error("positions are not adjacent")]
    NotAdjacent,
}

/// Caller-visible failures of this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuzzleError {
    /// A swap broke the adjacency, lock or bounds rules. Always a caller bug.
    #[error("illegal swap {a} <-> {b}: {reason}")]
    IllegalSwap {
        a: Position,
        b: Position,
        reason: SwapViolation,
    },
    /// Every attempt in the retry budget was unsolvable or too easy.
    #[error("puzzle generation exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: usize },
    /// The requested puzzle kind has no construction rule.
    #[error("unsupported goal kind: {0}")]
    UnsupportedGoalKind(PuzzleKind),
    /// A grid could not be built from the supplied cells.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    /// A difficulty profile has a zero dimension or an empty symbol pool.
    #[error("invalid difficulty profile: {0}")]
    InvalidProfile(String),
}
