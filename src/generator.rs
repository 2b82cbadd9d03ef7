//! Puzzle generation by shuffling a solved grid and proving its par.
//!
//! Each attempt builds a fresh solved grid, scrambles it with random legal
//! swaps and asks the solver for the true optimal path back. Attempts that are
//! unsolvable, too easy, or over the search budget are retried until the
//! attempt budget runs out.
use crate::engine::{cell_count, Grid, Move};
use crate::error::PuzzleError;
use crate::heuristics::Goal;
use crate::solver::{SearchLimits, SolutionPath, SolveError, Solver};
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

/// Attempts made by [`GeneratorConfig::default`].
pub const DEFAULT_MAX_ATTEMPTS: usize = 20;

/// The kind of goal a generated puzzle uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum PuzzleKind {
    DirectMatch,
    RuleBased,
}

impl fmt::Display for PuzzleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PuzzleKind::DirectMatch => "direct-match",
            PuzzleKind::RuleBased => "rule-based",
        };
        write!(f, "{}", s)
    }
}

/// What the caller asks the generator for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DifficultyProfile {
    pub kind: PuzzleKind,
    pub rows: usize,
    pub cols: usize,
    /// Size of the symbol pool; the pool is cycled to fill the grid.
    pub unique_symbols: u16,
    /// The generated puzzle's par is at least this.
    pub min_solution_moves: usize,
}

impl DifficultyProfile {
    /// A direct-match profile.
    pub fn new(rows: usize, cols: usize, unique_symbols: u16, min_solution_moves: usize) -> Self {
        DifficultyProfile {
            kind: PuzzleKind::DirectMatch,
            rows,
            cols,
            unique_symbols,
            min_solution_moves,
        }
    }

    /// Number of random swaps applied to the solved grid:
    /// `floor(min_solution_moves * 1.5) + 5`.
    pub fn shuffle_length(&self) -> usize {
        self.min_solution_moves * 3 / 2 + 5
    }

    fn validate(&self) -> Result<(), PuzzleError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(PuzzleError::InvalidProfile(format!(
                "grid must be at least 1x1, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.unique_symbols == 0 {
            return Err(PuzzleError::InvalidProfile(
                "unique symbol count must be positive".to_string(),
            ));
        }
        cell_count(self.rows, self.cols)
            .map_err(|_| {
                PuzzleError::InvalidProfile(format!(
                    "{}x{} grid is too large",
                    self.rows, self.cols
                ))
            })
            .map(|_| ())
    }
}

/// A finished puzzle. Only produced when every constraint holds.
#[derive(Clone, Debug)]
pub struct GenerationResult {
    pub id: String,
    /// Shuffled start state.
    pub grid: Grid,
    pub goal: Goal,
    /// Optimal path from `grid` to `goal`, as proven by the solver.
    pub solution: SolutionPath,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub max_attempts: usize,
    /// Limits applied to every solver run.
    pub search_limits: SearchLimits,
    /// Attempts run concurrently per batch. `1` runs them one by one.
    pub workers: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            search_limits: SearchLimits::default(),
            workers: 1,
        }
    }
}

enum AttemptOutcome {
    Accepted(GenerationResult),
    TooEasy { par: usize, shuffled: usize },
    Unsolvable,
    Abandoned(SolveError),
}

/// Seeded puzzle generator.
///
/// Each attempt draws its own seed from the generator's RNG up front, so the
/// outcome for a given seed does not depend on `workers`.
pub struct Generator {
    config: GeneratorConfig,
    rng: SmallRng,
}

impl Generator {
    pub fn new(config: GeneratorConfig, seed: u64) -> Self {
        Generator {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy(config: GeneratorConfig) -> Self {
        Generator {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates a puzzle whose par is at least `profile.min_solution_moves`.
    ///
    /// # Errors
    /// * `PuzzleError::UnsupportedGoalKind` if `profile.kind` has no construction
    ///   rule. No attempt is made.
    /// * `PuzzleError::InvalidProfile` for a zero or oversized dimension, or an
    ///   empty symbol pool.
    /// * `PuzzleError::GenerationExhausted` once every attempt failed.
    pub fn generate(&mut self, profile: &DifficultyProfile) -> Result<GenerationResult, PuzzleError> {
        if profile.kind != PuzzleKind::DirectMatch {
            return Err(PuzzleError::UnsupportedGoalKind(profile.kind));
        }
        profile.validate()?;

        let max_attempts = self.config.max_attempts;
        let seeds: Vec<u64> = (0..max_attempts).map(|_| self.rng.gen()).collect();
        let workers = self.config.workers.max(1);
        let limits = self.config.search_limits;

        debug!(
            "generating {}x{} puzzle, {} symbols, par >= {}, {} shuffles per attempt",
            profile.rows,
            profile.cols,
            profile.unique_symbols,
            profile.min_solution_moves,
            profile.shuffle_length()
        );

        for (batch_index, batch) in seeds.chunks(workers).enumerate() {
            let outcomes = if workers == 1 {
                batch
                    .iter()
                    .map(|&seed| run_attempt(profile, seed, limits, None))
                    .collect::<Vec<_>>()
            } else {
                run_batch(batch, |seed, cancel| {
                    run_attempt(profile, seed, limits, Some(cancel))
                })
            };

            for (offset, outcome) in outcomes.into_iter().enumerate() {
                let attempt = batch_index * workers + offset + 1;
                match outcome? {
                    AttemptOutcome::Accepted(result) => {
                        info!(
                            "puzzle {} generated on attempt {} with par {}",
                            result.id, attempt, result.solution.par
                        );
                        return Ok(result);
                    }
                    AttemptOutcome::TooEasy { par, shuffled } => debug!(
                        "attempt {}: par {} below {} after {} shuffles, retrying",
                        attempt, par, profile.min_solution_moves, shuffled
                    ),
                    AttemptOutcome::Unsolvable => {
                        debug!("attempt {}: shuffled grid has no solution, retrying", attempt)
                    }
                    AttemptOutcome::Abandoned(err) => {
                        warn!("attempt {}: {}, retrying", attempt, err)
                    }
                }
            }
        }

        warn!("no acceptable puzzle after {} attempts", max_attempts);
        Err(PuzzleError::GenerationExhausted {
            attempts: max_attempts,
        })
    }
}

/// An accepted puzzle or an error ends the search; later attempts are moot.
fn ends_search(outcome: &Result<AttemptOutcome, PuzzleError>) -> bool {
    matches!(outcome, Ok(AttemptOutcome::Accepted(_)) | Err(_))
}

/// Runs one attempt per seed on scoped threads.
///
/// Returns outcomes in seed order, up to and including the first one that ends
/// the search. Once attempt `i` ends the search, attempts after `i` are
/// cancelled; attempts before `i` still run to completion, so the result is the
/// one a sequential run would produce.
fn run_batch<F>(seeds: &[u64], attempt: F) -> Vec<Result<AttemptOutcome, PuzzleError>>
where
    F: Fn(u64, &AtomicBool) -> Result<AttemptOutcome, PuzzleError> + Sync,
{
    let cancel_flags: Vec<AtomicBool> = seeds.iter().map(|_| AtomicBool::new(false)).collect();
    let mut slots: Vec<Option<Result<AttemptOutcome, PuzzleError>>> =
        seeds.iter().map(|_| None).collect();
    let (sender, receiver) = mpsc::channel();
    let attempt = &attempt;

    thread::scope(|scope| {
        for (index, (&seed, cancel)) in seeds.iter().zip(&cancel_flags).enumerate() {
            let sender = sender.clone();
            scope.spawn(move || {
                // The receiver is gone once an earlier attempt ended the search.
                let _ = sender.send((index, attempt(seed, cancel)));
            });
        }
        drop(sender);

        let mut finished = 0;
        for (index, outcome) in receiver.iter() {
            if ends_search(&outcome) {
                for flag in &cancel_flags[index + 1..] {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            slots[index] = Some(outcome);
            let mut decided = false;
            while let Some(Some(outcome)) = slots.get(finished) {
                finished += 1;
                if ends_search(outcome) {
                    decided = true;
                    break;
                }
            }
            if decided || finished == slots.len() {
                break;
            }
        }
        slots.into_iter().take(finished).flatten().collect()
    })
}

fn run_attempt(
    profile: &DifficultyProfile,
    seed: u64,
    limits: SearchLimits,
    cancel: Option<&AtomicBool>,
) -> Result<AttemptOutcome, PuzzleError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let solved = Grid::uniform_cycle(profile.rows, profile.cols, profile.unique_symbols)?;
    let goal = Goal::direct_match(solved.clone());
    let (start, ideal) = shuffle(&solved, profile.shuffle_length(), &mut rng)?;
    let id = format!("{:016x}", rng.gen::<u64>());

    // The reversed shuffle only proves solvability; the solver gives the par.
    let mut solver = Solver::new().with_limits(limits);
    if let Some(flag) = cancel {
        solver = solver.with_cancel(flag);
    }
    let outcome = match solver.solve(&start, &goal) {
        Ok(solution) if solution.par >= profile.min_solution_moves => {
            debug!(
                "puzzle {}: par {} (shuffle witness {})",
                id,
                solution.par,
                ideal.len()
            );
            AttemptOutcome::Accepted(GenerationResult {
                id,
                grid: start,
                goal,
                solution,
            })
        }
        Ok(solution) => AttemptOutcome::TooEasy {
            par: solution.par,
            shuffled: ideal.len(),
        },
        Err(SolveError::NoSolutionFound) => AttemptOutcome::Unsolvable,
        Err(err) => AttemptOutcome::Abandoned(err),
    };
    Ok(outcome)
}

/// Applies `steps` uniformly chosen legal swaps to a copy of `solved`.
///
/// Returns the shuffled grid and the reversed move list, which leads back to
/// `solved` but is not necessarily shortest. Stops early if no swap is legal.
pub fn shuffle<R: Rng + ?Sized>(
    solved: &Grid,
    steps: usize,
    rng: &mut R,
) -> Result<(Grid, Vec<Move>), PuzzleError> {
    let mut grid = solved.clone();
    let mut applied = Vec::with_capacity(steps);
    for _ in 0..steps {
        let moves = grid.legal_swaps();
        let Some(mv) = moves.choose(rng).copied() else {
            break;
        };
        grid.apply_in_place(&mv)?;
        applied.push(mv);
    }
    let ideal = applied.iter().rev().map(Move::inverse).collect();
    Ok((grid, ideal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{solve, SearchLimits};
    use crate::utils::grid_from_str_array;
    use std::time::{Duration, Instant};

    fn accepted(id: &str) -> AttemptOutcome {
        let grid = Grid::uniform_cycle(1, 1, 1).unwrap();
        AttemptOutcome::Accepted(GenerationResult {
            id: id.to_string(),
            goal: Goal::direct_match(grid.clone()),
            grid,
            solution: SolutionPath::new(Vec::new()),
        })
    }

    /// Blocks until cancelled; gives up after 30 s so a missing cancel shows up
    /// as a slow batch rather than a hung test.
    fn wait_for_cancel(cancel: &AtomicBool) -> Result<AttemptOutcome, PuzzleError> {
        let deadline = Instant::now() + Duration::from_secs(30);
        while !cancel.load(Ordering::Relaxed) {
            if Instant::now() >= deadline {
                return Ok(AttemptOutcome::Unsolvable);
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(AttemptOutcome::Abandoned(SolveError::Cancelled))
    }

    #[test]
    fn test_shuffle_length_formula() {
        assert_eq!(DifficultyProfile::new(3, 3, 3, 0).shuffle_length(), 5);
        assert_eq!(DifficultyProfile::new(3, 3, 3, 3).shuffle_length(), 9);
        assert_eq!(DifficultyProfile::new(3, 3, 3, 10).shuffle_length(), 20);
    }

    #[test]
    fn test_shuffle_ideal_path_returns_to_solved() {
        let solved = Grid::uniform_cycle(3, 4, 5).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let (start, ideal) = shuffle(&solved, 15, &mut rng).unwrap();
        assert_eq!(ideal.len(), 15);
        assert_eq!(SolutionPath::new(ideal).apply_to(&start).unwrap(), solved);
    }

    #[test]
    fn test_shuffle_stops_without_legal_moves() {
        let frozen = grid_from_str_array(&["#1 #2"]).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let (start, ideal) = shuffle(&frozen, 10, &mut rng).unwrap();
        assert_eq!(start, frozen);
        assert!(ideal.is_empty());
    }

    #[test]
    fn test_generate_unsupported_kind() {
        let mut generator = Generator::new(GeneratorConfig::default(), 3);
        let profile = DifficultyProfile {
            kind: PuzzleKind::RuleBased,
            ..DifficultyProfile::new(3, 3, 3, 2)
        };
        assert_eq!(
            generator.generate(&profile).unwrap_err(),
            PuzzleError::UnsupportedGoalKind(PuzzleKind::RuleBased)
        );
    }

    #[test]
    fn test_generate_invalid_profile() {
        let mut generator = Generator::new(GeneratorConfig::default(), 3);
        assert!(matches!(
            generator.generate(&DifficultyProfile::new(0, 3, 3, 1)),
            Err(PuzzleError::InvalidProfile(_))
        ));
        assert!(matches!(
            generator.generate(&DifficultyProfile::new(2, 2, 0, 1)),
            Err(PuzzleError::InvalidProfile(_))
        ));
        assert!(matches!(
            generator.generate(&DifficultyProfile::new(usize::MAX, 2, 3, 1)),
            Err(PuzzleError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_generate_single_cell_zero_moves() {
        let config = GeneratorConfig {
            max_attempts: 1,
            ..GeneratorConfig::default()
        };
        let mut generator = Generator::new(config, 11);
        let result = generator.generate(&DifficultyProfile::new(1, 1, 1, 0)).unwrap();
        assert_eq!(result.solution.par, 0);
        assert!(result.goal.is_satisfied(&result.grid));
        assert_eq!(result.id.len(), 16);
    }

    #[test]
    fn test_generate_exhausts_on_unreachable_par() {
        let config = GeneratorConfig {
            max_attempts: 20,
            ..GeneratorConfig::default()
        };
        let mut generator = Generator::new(config, 5);
        assert_eq!(
            generator
                .generate(&DifficultyProfile::new(2, 2, 2, 50))
                .unwrap_err(),
            PuzzleError::GenerationExhausted { attempts: 20 }
        );
    }

    #[test]
    fn test_generate_meets_minimum_and_is_optimal() {
        let profile = DifficultyProfile::new(2, 3, 4, 3);
        for seed in 0..5 {
            let mut generator = Generator::new(GeneratorConfig::default(), seed);
            let result = generator.generate(&profile).unwrap();
            assert!(result.solution.par >= profile.min_solution_moves);
            assert_eq!(result.solution.par, result.solution.moves.len());

            let resolved = solve(&result.grid, &result.goal).unwrap();
            assert_eq!(resolved.par, result.solution.par);

            let end = result.solution.apply_to(&result.grid).unwrap();
            assert!(result.goal.is_satisfied(&end));
        }
    }

    #[test]
    fn test_generate_is_deterministic_per_seed() {
        let profile = DifficultyProfile::new(2, 3, 4, 3);
        let mut a = Generator::new(GeneratorConfig::default(), 99);
        let mut b = Generator::new(GeneratorConfig::default(), 99);
        let ra = a.generate(&profile).unwrap();
        let rb = b.generate(&profile).unwrap();
        assert_eq!(ra.id, rb.id);
        assert_eq!(ra.grid, rb.grid);
        assert_eq!(ra.solution, rb.solution);
    }

    #[test]
    fn test_parallel_attempts_match_sequential() {
        let profile = DifficultyProfile::new(2, 3, 4, 4);
        let mut sequential = Generator::new(GeneratorConfig::default(), 2024);
        let mut parallel = Generator::new(
            GeneratorConfig {
                workers: 4,
                ..GeneratorConfig::default()
            },
            2024,
        );
        match (sequential.generate(&profile), parallel.generate(&profile)) {
            (Ok(s), Ok(p)) => {
                assert_eq!(s.id, p.id);
                assert_eq!(s.grid, p.grid);
                assert_eq!(s.solution, p.solution);
            }
            (Err(s), Err(p)) => assert_eq!(s, p),
            (s, p) => panic!("outcomes diverged: {:?} vs {:?}", s.is_ok(), p.is_ok()),
        }
    }

    #[test]
    fn test_tight_search_budget_is_absorbed() {
        let config = GeneratorConfig {
            max_attempts: 3,
            search_limits: SearchLimits {
                max_expansions: Some(0),
                timeout: None,
            },
            workers: 1,
        };
        let mut generator = Generator::new(config, 8);
        assert_eq!(
            generator
                .generate(&DifficultyProfile::new(3, 3, 9, 4))
                .unwrap_err(),
            PuzzleError::GenerationExhausted { attempts: 3 }
        );
    }

    #[test]
    fn test_batch_stops_on_first_success() {
        let started = Instant::now();
        let outcomes = run_batch(&[0, 1, 2, 3], |seed, cancel| match seed {
            0 => Ok(accepted("first")),
            _ => wait_for_cancel(cancel),
        });
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(&outcomes[0], Ok(AttemptOutcome::Accepted(r)) if r.id == "first"));
    }

    #[test]
    fn test_batch_prefers_lowest_accepted_attempt() {
        let started = Instant::now();
        let outcomes = run_batch(&[0, 1, 2], |seed, cancel| match seed {
            0 => {
                thread::sleep(Duration::from_millis(50));
                Ok(accepted("slow"))
            }
            1 => Ok(accepted("fast")),
            _ => wait_for_cancel(cancel),
        });
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(&outcomes[0], Ok(AttemptOutcome::Accepted(r)) if r.id == "slow"));
    }

    #[test]
    fn test_batch_without_success_keeps_every_outcome_in_order() {
        let outcomes = run_batch(&[0, 1, 2], |seed, _| {
            Ok(AttemptOutcome::TooEasy {
                par: seed as usize,
                shuffled: 5,
            })
        });
        let pars: Vec<usize> = outcomes
            .iter()
            .map(|outcome| match outcome {
                Ok(AttemptOutcome::TooEasy { par, .. }) => *par,
                _ => panic!("unexpected outcome"),
            })
            .collect();
        assert_eq!(pars, vec![0, 1, 2]);
    }

    #[test]
    fn test_cancelled_attempt_is_abandoned() {
        let flag = AtomicBool::new(true);
        let outcome = run_attempt(
            &DifficultyProfile::new(3, 3, 9, 4),
            1,
            SearchLimits::unbounded(),
            Some(&flag),
        )
        .unwrap();
        assert!(matches!(
            outcome,
            AttemptOutcome::Abandoned(SolveError::Cancelled)
        ));
    }
}
