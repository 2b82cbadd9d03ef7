//! Grid and move model for swap puzzles.
//!
//! This module defines the puzzle's fundamental components:
//! - `Symbol`: The opaque identifier distinguishing tile kinds.
//! - `Position` and `Tile`: Cell addressing and a read-only view of one cell.
//! - `Move`: A swap between two orthogonally adjacent, unlocked tiles.
//! - `Grid`: The fixed-shape container of tiles, with swap legality and
//!   neighbour enumeration used by the solver.
//!
//! A grid stores its state as a flat, row-major slice of symbol ids. The lock
//! mask never changes after construction and is shared between clones, so a
//! search state costs one small allocation per copy.
use crate::error::{PuzzleError, SwapViolation};
use std::fmt;
use std::sync::Arc;

/// Identifier of a tile kind. Tiles with equal symbols are interchangeable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub u16);

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A (row, column) address on a grid, 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }

    /// Manhattan distance `|Δrow| + |Δcol|` between two positions.
    pub fn manhattan(&self, other: &Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// Two positions are adjacent when they differ by exactly one row or one
    /// column, not both.
    ///
    /// # Examples
    /// ```
    /// use tileswap_solver::engine::Position;
    /// assert!(Position::new(1, 1).is_adjacent(&Position::new(1, 2)));
    /// assert!(!Position::new(1, 1).is_adjacent(&Position::new(2, 2)));
    /// assert!(!Position::new(1, 1).is_adjacent(&Position::new(1, 1)));
    /// ```
    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.manhattan(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Read-only view of one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub position: Position,
    pub symbol: Symbol,
    /// Locked tiles occupy their cell but can never be swapped.
    pub locked: bool,
}

impl Tile {
    pub const fn new(position: Position, symbol: Symbol, locked: bool) -> Self {
        Tile {
            position,
            symbol,
            locked,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Swap,
}

/// A single player move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub kind: MoveKind,
    pub a: Position,
    pub b: Position,
}

impl Move {
    pub const fn swap(a: Position, b: Position) -> Self {
        Move {
            kind: MoveKind::Swap,
            a,
            b,
        }
    }

    /// Returns the move that undoes this one. A swap is its own inverse.
    pub fn inverse(&self) -> Move {
        match self.kind {
            MoveKind::Swap => *self,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MoveKind::Swap => write!(f, "swap {} <-> {}", self.a, self.b),
        }
    }
}

/// Canonical key of a grid's symbol layout.
///
/// Two grids with identical symbols in identical cells share a fingerprint,
/// whichever physical tiles put them there.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Box<[Symbol]>);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, symbol) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", symbol)?;
        }
        Ok(())
    }
}

/// Number of cells in a `rows x cols` grid, or `InvalidGrid` if it overflows.
pub(crate) fn cell_count(rows: usize, cols: usize) -> Result<usize, PuzzleError> {
    rows.checked_mul(cols).ok_or_else(|| {
        PuzzleError::InvalidGrid(format!("{}x{} grid is too large", rows, cols))
    })
}

/// A rectangular grid of tiles with a fixed shape.
///
/// Every position in `[0, rows) x [0, cols)` holds exactly one tile. Mutating
/// operations return a new grid and leave `self` untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Box<[Symbol]>,
    locked: Arc<[bool]>,
}

impl Grid {
    /// Creates a grid with no locked tiles from row-major symbols.
    ///
    /// # Errors
    /// Returns `PuzzleError::InvalidGrid` if a dimension is zero or the number of
    /// symbols does not equal `rows * cols`.
    pub fn new(rows: usize, cols: usize, symbols: Vec<Symbol>) -> Result<Self, PuzzleError> {
        let locked = vec![false; symbols.len()];
        Self::with_locks(rows, cols, symbols, locked)
    }

    /// Creates a grid from row-major symbols and a matching row-major lock mask.
    pub fn with_locks(
        rows: usize,
        cols: usize,
        symbols: Vec<Symbol>,
        locked: Vec<bool>,
    ) -> Result<Self, PuzzleError> {
        if rows == 0 || cols == 0 {
            return Err(PuzzleError::InvalidGrid(format!(
                "grid dimensions must be non-zero, got {}x{}",
                rows, cols
            )));
        }
        let expected = cell_count(rows, cols)?;
        if symbols.len() != expected {
            return Err(PuzzleError::InvalidGrid(format!(
                "expected {} symbols for a {}x{} grid, found {}",
                expected,
                rows,
                cols,
                symbols.len()
            )));
        }
        if locked.len() != expected {
            return Err(PuzzleError::InvalidGrid(format!(
                "expected {} lock flags for a {}x{} grid, found {}",
                expected,
                rows,
                cols,
                locked.len()
            )));
        }
        Ok(Grid {
            rows,
            cols,
            cells: symbols.into_boxed_slice(),
            locked: locked.into(),
        })
    }

    /// Creates a grid from individual tiles, in any order.
    ///
    /// # Errors
    /// Returns `PuzzleError::InvalidGrid` if a tile is out of bounds, two tiles
    /// share a position, or a position is left without a tile.
    pub fn from_tiles(
        rows: usize,
        cols: usize,
        tiles: impl IntoIterator<Item = Tile>,
    ) -> Result<Self, PuzzleError> {
        let mut slots: Vec<Option<(Symbol, bool)>> = vec![None; cell_count(rows, cols)?];
        for tile in tiles {
            let Tile {
                position,
                symbol,
                locked,
            } = tile;
            if position.row >= rows || position.col >= cols {
                return Err(PuzzleError::InvalidGrid(format!(
                    "tile at {} lies outside a {}x{} grid",
                    position, rows, cols
                )));
            }
            let slot = &mut slots[position.row * cols + position.col];
            if slot.is_some() {
                return Err(PuzzleError::InvalidGrid(format!(
                    "two tiles share position {}",
                    position
                )));
            }
            *slot = Some((symbol, locked));
        }

        let mut symbols = Vec::with_capacity(slots.len());
        let mut locks = Vec::with_capacity(slots.len());
        for (idx, slot) in slots.into_iter().enumerate() {
            match slot {
                Some((symbol, locked)) => {
                    symbols.push(symbol);
                    locks.push(locked);
                }
                None => {
                    return Err(PuzzleError::InvalidGrid(format!(
                        "no tile at position {}",
                        Position::new(idx / cols, idx % cols)
                    )))
                }
            }
        }
        Self::with_locks(rows, cols, symbols, locks)
    }

    /// Creates the canonical solved layout: cell `i` (row-major) holds symbol
    /// `i % unique_symbols`, so the pool is cycled and usage stays balanced.
    ///
    /// # Examples
    /// ```
    /// use tileswap_solver::engine::{Grid, Position, Symbol};
    /// let grid = Grid::uniform_cycle(2, 3, 2).unwrap();
    /// assert_eq!(grid.symbol_at(Position::new(0, 2)), Some(Symbol(0)));
    /// assert_eq!(grid.symbol_at(Position::new(1, 0)), Some(Symbol(1)));
    /// ```
    pub fn uniform_cycle(rows: usize, cols: usize, unique_symbols: u16) -> Result<Self, PuzzleError> {
        if unique_symbols == 0 {
            return Err(PuzzleError::InvalidGrid(
                "symbol pool must not be empty".to_string(),
            ));
        }
        let symbols = (0..cell_count(rows, cols)?)
            .map(|i| Symbol((i % unique_symbols as usize) as u16))
            .collect();
        Self::new(rows, cols, symbols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major symbol layout.
    pub fn symbols(&self) -> &[Symbol] {
        &self.cells
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Converts a row-major cell index back into a position.
    pub fn position_of(&self, index: usize) -> Position {
        Position::new(index / self.cols, index % self.cols)
    }

    fn index(&self, pos: Position) -> usize {
        pos.row * self.cols + pos.col
    }

    pub fn symbol_at(&self, pos: Position) -> Option<Symbol> {
        self.contains(pos).then(|| self.cells[self.index(pos)])
    }

    /// Returns `false` for out-of-bounds positions.
    pub fn is_locked(&self, pos: Position) -> bool {
        self.contains(pos) && self.locked[self.index(pos)]
    }

    pub fn tile(&self, pos: Position) -> Option<Tile> {
        self.contains(pos).then(|| {
            let idx = self.index(pos);
            Tile::new(pos, self.cells[idx], self.locked[idx])
        })
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.cells
            .iter()
            .zip(self.locked.iter())
            .enumerate()
            .map(|(idx, (&symbol, &locked))| Tile::new(self.position_of(idx), symbol, locked))
    }

    /// Checks whether swapping the tiles at `a` and `b` is legal.
    pub fn check_swap(&self, a: Position, b: Position) -> Result<(), PuzzleError> {
        let violation = if !self.contains(a) || !self.contains(b) {
            Some(SwapViolation::OutOfBounds)
        } else if self.is_locked(a) || self.is_locked(b) {
            Some(SwapViolation::Locked)
        } else if !a.is_adjacent(&b) {
            Some(SwapViolation::NotAdjacent)
        } else {
            None
        };
        match violation {
            Some(reason) => Err(PuzzleError::IllegalSwap { a, b, reason }),
            None => Ok(()),
        }
    }

    /// Returns a copy of this grid with the tiles at `a` and `b` exchanged.
    ///
    /// # Errors
    /// Returns `PuzzleError::IllegalSwap` if either position is out of bounds,
    /// either tile is locked, or the positions are not adjacent.
    pub fn swap(&self, a: Position, b: Position) -> Result<Grid, PuzzleError> {
        self.check_swap(a, b)?;
        let mut next = self.clone();
        next.exchange(a, b);
        Ok(next)
    }

    /// Applies a move, returning the resulting grid.
    pub fn apply(&self, mv: &Move) -> Result<Grid, PuzzleError> {
        match mv.kind {
            MoveKind::Swap => self.swap(mv.a, mv.b),
        }
    }

    /// Applies a move to this grid in place.
    pub(crate) fn apply_in_place(&mut self, mv: &Move) -> Result<(), PuzzleError> {
        match mv.kind {
            MoveKind::Swap => {
                self.check_swap(mv.a, mv.b)?;
                self.exchange(mv.a, mv.b);
                Ok(())
            }
        }
    }

    fn exchange(&mut self, a: Position, b: Position) {
        let (ia, ib) = (self.index(a), self.index(b));
        self.cells.swap(ia, ib);
    }

    /// Every adjacent pair, row-major: the right neighbour of a cell comes
    /// before its lower neighbour.
    fn swap_candidates(&self) -> impl Iterator<Item = Move> + '_ {
        let (rows, cols) = (self.rows, self.cols);
        (0..rows * cols).flat_map(move |idx| {
            let a = Position::new(idx / cols, idx % cols);
            let right = (a.col + 1 < cols).then(|| Move::swap(a, Position::new(a.row, a.col + 1)));
            let down = (a.row + 1 < rows).then(|| Move::swap(a, Position::new(a.row + 1, a.col)));
            right.into_iter().chain(down)
        })
    }

    fn legal_swap_iter(&self) -> impl Iterator<Item = Move> + '_ {
        self.swap_candidates()
            .filter(move |mv| !self.is_locked(mv.a) && !self.is_locked(mv.b))
    }

    /// Returns every legal single swap from the current state.
    pub fn legal_swaps(&self) -> Vec<Move> {
        self.legal_swap_iter().collect()
    }

    /// Lazily enumerates every legal single swap together with the grid it
    /// produces. The order is deterministic (see `legal_swaps`).
    pub fn neighbors(&self) -> impl Iterator<Item = (Move, Grid)> + '_ {
        self.legal_swap_iter().map(move |mv| {
            let mut next = self.clone();
            next.exchange(mv.a, mv.b);
            (mv, next)
        })
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint(self.cells.clone())
    }

    fn cell_width(&self) -> usize {
        self.cells
            .iter()
            .map(|s| s.to_string().len())
            .max()
            .unwrap_or(1)
            + 1
    }

    /// Renders the grid with the two cells touched by `mv` wrapped in brackets.
    ///
    /// Locked tiles are prefixed with `#`.
    pub fn to_string_with_highlight(&self, mv: Option<&Move>) -> String {
        let width = self.cell_width();
        let mut output = String::new();
        for r in 0..self.rows {
            if r > 0 {
                output.push('\n');
            }
            for c in 0..self.cols {
                let pos = Position::new(r, c);
                let idx = self.index(pos);
                let token = if self.locked[idx] {
                    format!("#{}", self.cells[idx])
                } else {
                    self.cells[idx].to_string()
                };
                let is_highlight = mv.map_or(false, |m| m.a == pos || m.b == pos);
                if is_highlight {
                    output.push_str(&format!("[{:>width$}]", token, width = width));
                } else {
                    output.push_str(&format!(" {:>width$} ", token, width = width));
                }
            }
        }
        output
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.cell_width();
        for r in 0..self.rows {
            if r > 0 {
                writeln!(f)?;
            }
            for c in 0..self.cols {
                let idx = r * self.cols + c;
                let token = if self.locked[idx] {
                    format!("#{}", self.cells[idx])
                } else {
                    self.cells[idx].to_string()
                };
                write!(f, "{:>width$}", token, width = width)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::grid_from_str_array;

    fn syms(values: &[u16]) -> Vec<Symbol> {
        values.iter().copied().map(Symbol).collect()
    }

    #[test]
    fn test_new_rejects_wrong_cell_count() {
        let err = Grid::new(2, 2, syms(&[1, 2, 3])).unwrap_err();
        assert!(matches!(err, PuzzleError::InvalidGrid(_)));
        assert!(Grid::new(0, 3, Vec::new()).is_err());
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        let err = Grid::new(usize::MAX, 2, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert!(matches!(
            Grid::uniform_cycle(usize::MAX, 2, 3),
            Err(PuzzleError::InvalidGrid(_))
        ));
        assert!(matches!(
            Grid::from_tiles(2, usize::MAX, Vec::new()),
            Err(PuzzleError::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_from_tiles_any_order() {
        let tiles = vec![
            Tile::new(Position::new(1, 1), Symbol(4), false),
            Tile::new(Position::new(0, 0), Symbol(1), true),
            Tile::new(Position::new(1, 0), Symbol(3), false),
            Tile::new(Position::new(0, 1), Symbol(2), false),
        ];
        let grid = Grid::from_tiles(2, 2, tiles).unwrap();
        assert_eq!(grid.symbols(), &syms(&[1, 2, 3, 4])[..]);
        assert!(grid.is_locked(Position::new(0, 0)));
        assert!(!grid.is_locked(Position::new(1, 1)));
    }

    #[test]
    fn test_from_tiles_rejects_duplicates_and_gaps() {
        let dup = vec![
            Tile::new(Position::new(0, 0), Symbol(1), false),
            Tile::new(Position::new(0, 0), Symbol(2), false),
        ];
        let err = Grid::from_tiles(1, 2, dup).unwrap_err();
        assert!(err.to_string().contains("share position"));

        let gap = vec![Tile::new(Position::new(0, 0), Symbol(1), false)];
        let err = Grid::from_tiles(1, 2, gap).unwrap_err();
        assert!(err.to_string().contains("no tile at position (0, 1)"));

        let outside = vec![Tile::new(Position::new(3, 0), Symbol(1), false)];
        assert!(Grid::from_tiles(1, 1, outside).is_err());
    }

    #[test]
    fn test_uniform_cycle_balances_symbols() {
        let grid = Grid::uniform_cycle(3, 3, 4).unwrap();
        assert_eq!(grid.symbols(), &syms(&[0, 1, 2, 3, 0, 1, 2, 3, 0])[..]);
        assert!(Grid::uniform_cycle(2, 2, 0).is_err());
    }

    #[test]
    fn test_swap_success_leaves_original_untouched() {
        let grid = grid_from_str_array(&["1 2", "3 4"]).unwrap();
        let swapped = grid.swap(Position::new(0, 0), Position::new(0, 1)).unwrap();
        assert_eq!(swapped.symbols(), &syms(&[2, 1, 3, 4])[..]);
        assert_eq!(grid.symbols(), &syms(&[1, 2, 3, 4])[..]);
    }

    #[test]
    fn test_swap_violations() {
        let grid = grid_from_str_array(&["1 #2", "3 4"]).unwrap();
        let reason = |a: Position, b: Position| match grid.swap(a, b) {
            Err(PuzzleError::IllegalSwap { reason, .. }) => reason,
            other => panic!("expected IllegalSwap, got {:?}", other),
        };
        assert_eq!(
            reason(Position::new(0, 0), Position::new(0, 1)),
            SwapViolation::Locked
        );
        assert_eq!(
            reason(Position::new(0, 0), Position::new(1, 1)),
            SwapViolation::NotAdjacent
        );
        assert_eq!(
            reason(Position::new(1, 1), Position::new(2, 1)),
            SwapViolation::OutOfBounds
        );
        assert_eq!(
            reason(Position::new(1, 0), Position::new(1, 0)),
            SwapViolation::NotAdjacent
        );
    }

    #[test]
    fn test_swap_is_an_involution() {
        let grid = grid_from_str_array(&["1 2 3", "4 5 6"]).unwrap();
        for mv in grid.legal_swaps() {
            let twice = grid.apply(&mv).unwrap().apply(&mv.inverse()).unwrap();
            assert_eq!(twice, grid, "move {} applied twice", mv);
        }
    }

    #[test]
    fn test_neighbors_order_and_count() {
        let grid = grid_from_str_array(&["1 2", "3 4"]).unwrap();
        let moves: Vec<Move> = grid.neighbors().map(|(mv, _)| mv).collect();
        assert_eq!(
            moves,
            vec![
                Move::swap(Position::new(0, 0), Position::new(0, 1)),
                Move::swap(Position::new(0, 0), Position::new(1, 0)),
                Move::swap(Position::new(0, 1), Position::new(1, 1)),
                Move::swap(Position::new(1, 0), Position::new(1, 1)),
            ]
        );
        for (mv, next) in grid.neighbors() {
            assert_eq!(next, grid.apply(&mv).unwrap());
        }
    }

    #[test]
    fn test_neighbors_skip_locked_tiles() {
        let grid = grid_from_str_array(&["#1 2", "3 4"]).unwrap();
        assert_eq!(grid.legal_swaps().len(), 2);

        let frozen = grid_from_str_array(&["#1 #2", "#3 #4"]).unwrap();
        assert_eq!(frozen.neighbors().count(), 0);

        let single = grid_from_str_array(&["7"]).unwrap();
        assert!(single.legal_swaps().is_empty());
    }

    #[test]
    fn test_fingerprint_ignores_tile_identity() {
        let grid = grid_from_str_array(&["1 1", "2 2"]).unwrap();
        let swapped = grid.swap(Position::new(0, 0), Position::new(0, 1)).unwrap();
        assert_eq!(grid.fingerprint(), swapped.fingerprint());
        assert_eq!(grid.fingerprint().to_string(), "1,1,2,2");

        let other = grid.swap(Position::new(0, 0), Position::new(1, 0)).unwrap();
        assert_ne!(grid.fingerprint(), other.fingerprint());
    }

    #[test]
    fn test_tiles_iterates_row_major() {
        let grid = grid_from_str_array(&["5 #6"]).unwrap();
        let tiles: Vec<Tile> = grid.tiles().collect();
        assert_eq!(
            tiles,
            vec![
                Tile::new(Position::new(0, 0), Symbol(5), false),
                Tile::new(Position::new(0, 1), Symbol(6), true),
            ]
        );
        assert_eq!(grid.tile(Position::new(0, 2)), None);
    }

    #[test]
    fn test_display_board_formatting() {
        let grid = grid_from_str_array(&["1 #2", "10 3"]).unwrap();
        assert_eq!(grid.to_string(), "  1 #2\n 10  3");

        let mv = Move::swap(Position::new(1, 0), Position::new(1, 1));
        assert_eq!(
            grid.to_string_with_highlight(Some(&mv)),
            "   1   #2 \n[ 10][  3]"
        );
    }
}
