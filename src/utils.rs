use crate::engine::{Grid, Symbol};
use crate::error::PuzzleError;

/// Parses an array of string slices into a `Grid`.
///
/// Each string slice is one row, starting from row 0, holding whitespace-separated
/// symbol ids. A token prefixed with `#` is a locked tile. All rows must have the
/// same number of tokens.
///
/// # Returns
/// * `Ok(Grid)` if parsing is successful.
/// * `Err(PuzzleError::InvalidGrid)` if there are no rows, rows have differing
///   lengths, or a token is not a `u16` (optionally `#`-prefixed).
///
/// # Examples
/// ```
/// use tileswap_solver::utils::grid_from_str_array;
/// use tileswap_solver::engine::{Position, Symbol};
///
/// let grid = grid_from_str_array(&["1 2", "#3 1"]).unwrap();
/// assert_eq!(grid.rows(), 2);
/// assert_eq!(grid.symbol_at(Position::new(1, 0)), Some(Symbol(3)));
/// assert!(grid.is_locked(Position::new(1, 0)));
///
/// assert!(grid_from_str_array(&["1 x"]).is_err());
/// assert!(grid_from_str_array(&["1 2", "3"]).is_err());
/// ```
pub fn grid_from_str_array(s: &[&str]) -> Result<Grid, PuzzleError> {
    if s.is_empty() {
        return Err(PuzzleError::InvalidGrid("no rows given".to_string()));
    }

    let mut cols = None;
    let mut symbols = Vec::new();
    let mut locked = Vec::new();

    for (r, row_str) in s.iter().enumerate() {
        let tokens: Vec<&str> = row_str.split_whitespace().collect();
        match cols {
            None => cols = Some(tokens.len()),
            Some(expected) if expected != tokens.len() => {
                return Err(PuzzleError::InvalidGrid(format!(
                    "row {} has {} cells, expected {}",
                    r,
                    tokens.len(),
                    expected
                )));
            }
            Some(_) => {}
        }

        for (c, token) in tokens.iter().enumerate() {
            let (is_locked, digits) = match token.strip_prefix('#') {
                Some(rest) => (true, rest),
                None => (false, *token),
            };
            let id = digits.parse::<u16>().map_err(|_| {
                PuzzleError::InvalidGrid(format!(
                    "unrecognized token '{}' in row {} col {}",
                    token, r, c
                ))
            })?;
            symbols.push(Symbol(id));
            locked.push(is_locked);
        }
    }

    Grid::with_locks(s.len(), cols.unwrap_or(0), symbols, locked)
}

/// Parses several grids from text, one grid per block of non-empty lines.
///
/// Blocks are separated by one or more blank lines; lines starting with `//`
/// are ignored.
pub fn grids_from_text(text: &str) -> Result<Vec<Grid>, PuzzleError> {
    let mut grids = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.starts_with("//") {
            continue;
        }
        if line.is_empty() {
            if !block.is_empty() {
                grids.push(grid_from_str_array(&block)?);
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        grids.push(grid_from_str_array(&block)?);
    }
    Ok(grids)
}
