use crate::*;

/// A position on the board: depth row and column.
///
/// Columns include the two permanent sentinel columns 0 and `cols + 1`,
/// so usable columns run `1..=cols`. Depth 0 is the shared start row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn at(row: usize, col: usize) -> Self {
        Self { row, col }
    }
    /// The three forward neighbors one depth deeper: diagonal-left,
    /// straight, diagonal-right. Caller filters by matrix weight.
    pub fn forward(&self) -> [Cell; 3] {
        [
            Cell::at(self.row + 1, self.col - 1),
            Cell::at(self.row + 1, self.col),
            Cell::at(self.row + 1, self.col + 1),
        ]
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Board geometry: a diamond lattice of `rows` depth rows by `cols` usable
/// columns, flanked by sentinel columns that are permanently off-board.
///
/// The set of columns reachable at each depth is bounded by how far a piece
/// could have diagonally walked from the start, widening by one column per
/// side each row until the full board width is available. Computing the
/// bound here, once, replaces the ad-hoc zero-masking the per-row
/// initialization would otherwise re-derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lattice {
    cols: usize,
    rows: usize,
}

impl Default for Lattice {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS).expect("default dimensions are valid")
    }
}

impl Lattice {
    pub fn new(cols: usize, rows: usize) -> Result<Self> {
        if cols < 1 || rows < 2 {
            return Err(Error::Config(format!(
                "lattice must be at least 1 column by 2 rows, got {}x{}",
                cols, rows
            )));
        }
        Ok(Self { cols, rows })
    }
    /// Number of usable columns.
    pub fn cols(&self) -> usize {
        self.cols
    }
    /// Number of depth rows.
    pub fn rows(&self) -> usize {
        self.rows
    }
    /// Total column count including both sentinels.
    pub fn width(&self) -> usize {
        self.cols + 2
    }
    /// The shared starting column at depth 0.
    pub fn center(&self) -> usize {
        (self.cols + 2) / 2
    }
    /// Both agents start here.
    pub fn start(&self) -> Cell {
        Cell::at(0, self.center())
    }
    /// Reaching this depth wins the game.
    pub fn goal(&self) -> usize {
        self.rows - 1
    }
    /// True for the two permanently zero-weight off-board columns.
    pub fn is_sentinel(&self, col: usize) -> bool {
        col == 0 || col == self.cols + 1
    }
    /// Inclusive range of columns a piece could occupy at `depth`, having
    /// diagonally walked from the center start.
    pub fn reachable(&self, depth: usize) -> std::ops::RangeInclusive<usize> {
        let lo = self.center().saturating_sub(depth).max(1);
        let hi = (self.center() + depth).min(self.cols);
        lo..=hi
    }
    /// True if the cell is on the board and inside the reachable diamond.
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && self.reachable(cell.row).contains(&cell.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_center_and_start() {
        let lattice = Lattice::default();
        assert_eq!(lattice.center(), 3);
        assert_eq!(lattice.start(), Cell::at(0, 3));
        assert_eq!(lattice.goal(), 7);
        assert_eq!(lattice.width(), 7);
    }

    #[test]
    fn diamond_widens_then_saturates() {
        let lattice = Lattice::default();
        assert_eq!(lattice.reachable(0), 3..=3);
        assert_eq!(lattice.reachable(1), 2..=4);
        assert_eq!(lattice.reachable(2), 1..=5);
        assert_eq!(lattice.reachable(7), 1..=5);
    }

    #[test]
    fn sentinels_are_never_reachable() {
        let lattice = Lattice::default();
        for depth in 0..lattice.rows() {
            assert!(!lattice.reachable(depth).contains(&0));
            assert!(!lattice.reachable(depth).contains(&6));
        }
        assert!(lattice.is_sentinel(0));
        assert!(lattice.is_sentinel(6));
        assert!(!lattice.is_sentinel(3));
    }

    #[test]
    fn containment_respects_depth() {
        let lattice = Lattice::default();
        assert!(lattice.contains(Cell::at(0, 3)));
        assert!(!lattice.contains(Cell::at(0, 2)));
        assert!(lattice.contains(Cell::at(1, 2)));
        assert!(!lattice.contains(Cell::at(8, 3)));
    }

    #[test]
    fn degenerate_dimensions_rejected() {
        assert!(Lattice::new(0, 8).is_err());
        assert!(Lattice::new(5, 1).is_err());
    }
}
