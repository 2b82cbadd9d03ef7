//! Goal definitions and the heuristics the solver uses to rank states.
//!
//! Every heuristic here returns `0` exactly when the goal is satisfied.
use crate::engine::{Grid, Position, Symbol};
use crate::generator::PuzzleKind;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A goal defined by a target layout every tile's symbol must reach.
///
/// Symbols may repeat in the target. A tile counts as in place when the target
/// holds its symbol at the tile's cell; otherwise its distance is the Manhattan
/// distance to the nearest target cell with the same symbol.
#[derive(Clone, Debug)]
pub struct DirectMatch {
    target: Grid,
    /// For each target symbol, the distance from every cell (row-major) to the
    /// nearest target cell holding that symbol. Built once per goal.
    distances: HashMap<Symbol, Box<[u32]>>,
}

impl DirectMatch {
    pub fn new(target: Grid) -> Self {
        let mut homes: HashMap<Symbol, Vec<Position>> = HashMap::new();
        for tile in target.tiles() {
            homes.entry(tile.symbol).or_default().push(tile.position);
        }

        let cell_count = target.rows() * target.cols();
        let distances = homes
            .into_iter()
            .map(|(symbol, positions)| {
                let table = (0..cell_count)
                    .map(|idx| {
                        let from = target.position_of(idx);
                        positions
                            .iter()
                            .map(|p| from.manhattan(p) as u32)
                            .min()
                            .unwrap_or(0)
                    })
                    .collect();
                (symbol, table)
            })
            .collect();

        DirectMatch { target, distances }
    }

    pub fn target(&self) -> &Grid {
        &self.target
    }

    fn same_shape(&self, grid: &Grid) -> bool {
        grid.rows() == self.target.rows() && grid.cols() == self.target.cols()
    }

    pub fn is_satisfied(&self, grid: &Grid) -> bool {
        self.same_shape(grid) && grid.symbols() == self.target.symbols()
    }

    /// Sum of every tile's distance to its nearest home cell.
    ///
    /// A symbol absent from the target costs `rows + cols`.
    pub fn total_displacement(&self, grid: &Grid) -> u32 {
        let missing = (self.target.rows() + self.target.cols()) as u32;
        grid.symbols()
            .iter()
            .enumerate()
            .map(|(idx, symbol)| match self.distances.get(symbol) {
                Some(table) => table.get(idx).copied().unwrap_or(missing),
                None => missing,
            })
            .sum()
    }

    /// `floor(total displacement / 2)`: one adjacent swap moves two tiles by one
    /// step each, so it lowers the total by at most 2.
    ///
    /// Never `0` for an unsatisfied grid, even when the target is unreachable.
    pub fn heuristic(&self, grid: &Grid) -> u32 {
        if self.is_satisfied(grid) {
            return 0;
        }
        if !self.same_shape(grid) {
            return 1;
        }
        (self.total_displacement(grid) / 2).max(1)
    }

    /// Cheap necessary conditions for the target to be reachable from `grid` by
    /// swaps: same shape, same symbol multiset, and every locked tile already
    /// holding its target symbol.
    pub fn is_reachable_from(&self, grid: &Grid) -> bool {
        if !self.same_shape(grid) {
            return false;
        }
        let mut have = grid.symbols().to_vec();
        let mut want = self.target.symbols().to_vec();
        have.sort_unstable();
        want.sort_unstable();
        if have != want {
            return false;
        }
        grid.tiles()
            .filter(|t| t.locked)
            .all(|t| self.target.symbol_at(t.position) == Some(t.symbol))
    }
}

/// Predicate closure wrapped by [`Rule::Custom`].
pub type RulePredicate = Arc<dyn Fn(&Grid) -> bool + Send + Sync>;

/// A named, caller-supplied rule.
#[derive(Clone)]
pub struct CustomRule {
    name: String,
    predicate: RulePredicate,
}

impl CustomRule {
    pub fn new(name: impl Into<String>, predicate: impl Fn(&Grid) -> bool + Send + Sync + 'static) -> Self {
        CustomRule {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule").field("name", &self.name).finish()
    }
}

/// One independently testable predicate over a grid.
#[derive(Clone, Debug)]
pub enum Rule {
    /// The cell at `position` holds `symbol`.
    SymbolAt { position: Position, symbol: Symbol },
    /// Every cell of the row holds the same symbol.
    RowUniform(usize),
    /// Every cell of the column holds the same symbol.
    ColumnUniform(usize),
    Custom(CustomRule),
}

impl Rule {
    pub fn is_satisfied(&self, grid: &Grid) -> bool {
        match self {
            Rule::SymbolAt { position, symbol } => grid.symbol_at(*position) == Some(*symbol),
            Rule::RowUniform(row) => {
                *row < grid.rows()
                    && all_equal((0..grid.cols()).map(|c| grid.symbol_at(Position::new(*row, c))))
            }
            Rule::ColumnUniform(col) => {
                *col < grid.cols()
                    && all_equal((0..grid.rows()).map(|r| grid.symbol_at(Position::new(r, *col))))
            }
            Rule::Custom(rule) => (rule.predicate)(grid),
        }
    }
}

fn all_equal(mut symbols: impl Iterator<Item = Option<Symbol>>) -> bool {
    match symbols.next() {
        Some(first) => symbols.all(|s| s == first),
        None => true,
    }
}

/// An ordered set of rules, satisfied when all of them are.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        RuleSet { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn unsatisfied_count(&self, grid: &Grid) -> u32 {
        self.rules.iter().filter(|r| !r.is_satisfied(grid)).count() as u32
    }

    pub fn is_satisfied(&self, grid: &Grid) -> bool {
        self.rules.iter().all(|r| r.is_satisfied(grid))
    }

    /// Count of unsatisfied rules.
    ///
    /// Admissible only if every unsatisfied rule needs at least one move of its
    /// own. A rule that needs several swaps can make this overestimate, in which
    /// case solver paths are not guaranteed to be optimal.
    pub fn heuristic(&self, grid: &Grid) -> u32 {
        self.unsatisfied_count(grid)
    }
}

/// What a puzzle asks the player to reach.
#[derive(Clone, Debug)]
pub enum Goal {
    DirectMatch(DirectMatch),
    RuleBased(RuleSet),
}

impl Goal {
    pub fn direct_match(target: Grid) -> Self {
        Goal::DirectMatch(DirectMatch::new(target))
    }

    pub fn rule_based(rules: Vec<Rule>) -> Self {
        Goal::RuleBased(RuleSet::new(rules))
    }

    pub fn kind(&self) -> PuzzleKind {
        match self {
            Goal::DirectMatch(_) => PuzzleKind::DirectMatch,
            Goal::RuleBased(_) => PuzzleKind::RuleBased,
        }
    }

    pub fn is_satisfied(&self, grid: &Grid) -> bool {
        match self {
            Goal::DirectMatch(goal) => goal.is_satisfied(grid),
            Goal::RuleBased(rules) => rules.is_satisfied(grid),
        }
    }

    pub fn heuristic(&self, grid: &Grid) -> u32 {
        match self {
            Goal::DirectMatch(goal) => goal.heuristic(grid),
            Goal::RuleBased(rules) => rules.heuristic(grid),
        }
    }

    /// `false` only when the goal provably cannot be reached from `grid`.
    pub fn is_reachable_from(&self, grid: &Grid) -> bool {
        match self {
            Goal::DirectMatch(goal) => goal.is_reachable_from(grid),
            Goal::RuleBased(_) => true,
        }
    }
}

/// Estimated number of moves from `grid` to `goal`; `0` iff the goal is met.
pub fn heuristic(grid: &Grid, goal: &Goal) -> u32 {
    goal.heuristic(grid)
}
