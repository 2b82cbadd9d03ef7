//! A* search over grid states reachable by adjacent swaps.
//!
//! The open set is a binary heap ordered by lowest `g + h`, then lowest `h`,
//! then insertion order, so repeated runs on the same input pop nodes in the
//! same order and return the same path. Replacing an open node with a cheaper
//! equivalent is done lazily: a best-known `g` is kept per fingerprint and
//! outdated heap entries are skipped when popped.
use crate::engine::{Fingerprint, Grid, Move};
use crate::error::PuzzleError;
use crate::heuristics::Goal;
use log::{debug, trace};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Node expansions allowed by [`SearchLimits::default`].
pub const DEFAULT_MAX_EXPANSIONS: usize = 1_000_000;

/// Bounds that guarantee a search terminates on large or hard grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchLimits {
    /// Maximum number of nodes expanded before giving up.
    pub max_expansions: Option<usize>,
    /// Maximum wall-clock time spent searching.
    pub timeout: Option<Duration>,
}

impl SearchLimits {
    pub fn unbounded() -> Self {
        SearchLimits {
            max_expansions: None,
            timeout: None,
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_expansions: Some(DEFAULT_MAX_EXPANSIONS),
            timeout: None,
        }
    }
}

/// Negative search outcomes.
///
/// `NoSolutionFound` is a proof that the goal is unreachable; the other two
/// variants only mean the search stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("no solution exists from this state")]
    NoSolutionFound,
    #[error("search budget exceeded after {expanded} expansions")]
    SearchBudgetExceeded { expanded: usize },
    #[error("search cancelled")]
    Cancelled,
}

/// A minimal move sequence from some state to goal satisfaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolutionPath {
    pub moves: Vec<Move>,
    /// Number of moves; the proven minimum when produced by the solver.
    pub par: usize,
}

impl SolutionPath {
    pub fn new(moves: Vec<Move>) -> Self {
        let par = moves.len();
        SolutionPath { moves, par }
    }

    /// Replays the path on `start` and returns the final grid.
    pub fn apply_to(&self, start: &Grid) -> Result<Grid, PuzzleError> {
        let mut grid = start.clone();
        for mv in &self.moves {
            grid.apply_in_place(mv)?;
        }
        Ok(grid)
    }
}

/// Counters describing one search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub expanded: usize,
    pub generated: usize,
    pub stale_skipped: usize,
}

/// Arena entry used only to rebuild the path once the goal is popped.
struct NodeRecord {
    parent: Option<usize>,
    mv: Option<Move>,
}

struct OpenEntry {
    f: u32,
    h: u32,
    g: u32,
    seq: u64,
    node: usize,
    grid: Grid,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.h == other.h && self.seq == other.seq
    }
}

impl Eq for OpenEntry {}

// BinaryHeap is a max-heap: the "greatest" entry is the one with the lowest
// (f, h, seq).
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Configurable A* solver.
///
/// # Examples
/// ```
/// use tileswap_solver::heuristics::Goal;
/// use tileswap_solver::solver::{SearchLimits, Solver};
/// use tileswap_solver::utils::grid_from_str_array;
///
/// let start = grid_from_str_array(&["2 1", "1 2"]).unwrap();
/// let goal = Goal::direct_match(grid_from_str_array(&["1 1", "2 2"]).unwrap());
/// let path = Solver::new()
///     .with_limits(SearchLimits::unbounded())
///     .solve(&start, &goal)
///     .unwrap();
/// assert_eq!(path.par, 1);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Solver<'a> {
    limits: SearchLimits,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Solver<'a> {
    pub fn new() -> Self {
        Solver {
            limits: SearchLimits::default(),
            cancel: None,
        }
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Stops the search with `SolveError::Cancelled` once `flag` is set. The flag
    /// is checked once per expansion.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn solve(&self, start: &Grid, goal: &Goal) -> Result<SolutionPath, SolveError> {
        self.solve_with_stats(start, goal).map(|(path, _)| path)
    }

    pub fn solve_with_stats(
        &self,
        start: &Grid,
        goal: &Goal,
    ) -> Result<(SolutionPath, SearchStats), SolveError> {
        let mut stats = SearchStats::default();

        if !goal.is_reachable_from(start) {
            debug!("goal unreachable from start state, skipping search");
            return Err(SolveError::NoSolutionFound);
        }

        let started_at = Instant::now();
        let mut arena = vec![NodeRecord {
            parent: None,
            mv: None,
        }];
        let mut open = BinaryHeap::new();
        let mut best_g: HashMap<Fingerprint, u32> = HashMap::new();
        let mut closed: HashSet<Fingerprint> = HashSet::new();

        let h0 = goal.heuristic(start);
        best_g.insert(start.fingerprint(), 0);
        open.push(OpenEntry {
            f: h0,
            h: h0,
            g: 0,
            seq: 0,
            node: 0,
            grid: start.clone(),
        });
        let mut seq = 1u64;

        while let Some(current) = open.pop() {
            let fingerprint = current.grid.fingerprint();
            if closed.contains(&fingerprint)
                || best_g.get(&fingerprint).is_some_and(|&g| current.g > g)
            {
                stats.stale_skipped += 1;
                continue;
            }

            if self
                .cancel
                .is_some_and(|flag| flag.load(AtomicOrdering::Relaxed))
            {
                debug!("search cancelled after {} expansions", stats.expanded);
                return Err(SolveError::Cancelled);
            }

            if current.h == 0 {
                let path = reconstruct_path(&arena, current.node);
                debug!(
                    "solved with par {} ({} expanded, {} generated, {} stale)",
                    path.par, stats.expanded, stats.generated, stats.stale_skipped
                );
                return Ok((path, stats));
            }

            let over_budget = self
                .limits
                .max_expansions
                .is_some_and(|max| stats.expanded >= max)
                || self
                    .limits
                    .timeout
                    .is_some_and(|limit| started_at.elapsed() >= limit);
            if over_budget {
                debug!("search budget exceeded after {} expansions", stats.expanded);
                return Err(SolveError::SearchBudgetExceeded {
                    expanded: stats.expanded,
                });
            }

            trace!(
                "expanding g={} h={} state {}",
                current.g,
                current.h,
                fingerprint
            );
            stats.expanded += 1;
            closed.insert(fingerprint);

            for (mv, next) in current.grid.neighbors() {
                let next_fingerprint = next.fingerprint();
                if closed.contains(&next_fingerprint) {
                    continue;
                }
                let g = current.g + 1;
                if best_g
                    .get(&next_fingerprint)
                    .is_some_and(|&known| known <= g)
                {
                    continue;
                }
                best_g.insert(next_fingerprint, g);

                let h = goal.heuristic(&next);
                arena.push(NodeRecord {
                    parent: Some(current.node),
                    mv: Some(mv),
                });
                open.push(OpenEntry {
                    f: g + h,
                    h,
                    g,
                    seq,
                    node: arena.len() - 1,
                    grid: next,
                });
                seq += 1;
                stats.generated += 1;
            }
        }

        debug!(
            "state space exhausted after {} expansions, no solution",
            stats.expanded
        );
        Err(SolveError::NoSolutionFound)
    }
}

fn reconstruct_path(arena: &[NodeRecord], mut node: usize) -> SolutionPath {
    let mut moves = Vec::new();
    while let Some(mv) = arena[node].mv {
        moves.push(mv);
        match arena[node].parent {
            Some(parent) => node = parent,
            None => break,
        }
    }
    moves.reverse();
    SolutionPath::new(moves)
}

/// Finds an optimal path from `start` to `goal` with the default search limits.
pub fn solve(start: &Grid, goal: &Goal) -> Result<SolutionPath, SolveError> {
    Solver::new().solve(start, goal)
}

/// Returns the optimal path if one is found; a pure function of its inputs.
pub fn try_find_solution(grid: &Grid, goal: &Goal) -> Option<SolutionPath> {
    solve(grid, goal).ok()
}
