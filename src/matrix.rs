use crate::*;

/// A row-stochastic probability table over the lattice.
///
/// One row per depth, one column per board column including the two
/// sentinel columns. Sentinel cells and cells outside the reachable
/// diamond hold exactly 0.0 and are never touched by normalization or
/// learning; every other cell of a row starts at a uniform weight so the
/// row sums to 1.0. Depth 0 is a point mass on the starting column.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbMatrix {
    lattice: Lattice,
    weights: Vec<Vec<Probability>>,
}

impl ProbMatrix {
    pub fn new(lattice: Lattice) -> Self {
        let mut weights = vec![vec![0.0; lattice.width()]; lattice.rows()];
        for (depth, row) in weights.iter_mut().enumerate() {
            let reachable = lattice.reachable(depth);
            let uniform = 1.0 / reachable.clone().count() as Probability;
            for col in reachable {
                row[col] = uniform;
            }
        }
        Self { lattice, weights }
    }

    /// Rebuilds a matrix from externally supplied rows, enforcing the
    /// structural invariants: exact dimensions, finite non-negative
    /// weights, zeros outside the reachable diamond, row-stochastic sums.
    pub fn from_rows(lattice: Lattice, rows: Vec<Vec<Probability>>) -> Result<Self> {
        if rows.len() != lattice.rows() {
            return Err(Error::MalformedStrategy(format!(
                "expected {} rows, found {}",
                lattice.rows(),
                rows.len()
            )));
        }
        for (depth, row) in rows.iter().enumerate() {
            if row.len() != lattice.width() {
                return Err(Error::MalformedStrategy(format!(
                    "row {} has {} columns, expected {}",
                    depth,
                    row.len(),
                    lattice.width()
                )));
            }
            for (col, &weight) in row.iter().enumerate() {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(Error::MalformedStrategy(format!(
                        "weight {} at ({}, {}) is not a probability",
                        weight, depth, col
                    )));
                }
                if weight != 0.0 && !lattice.reachable(depth).contains(&col) {
                    return Err(Error::MalformedStrategy(format!(
                        "nonzero weight at ({}, {}) outside the reachable diamond",
                        depth, col
                    )));
                }
            }
            let sum = row.iter().sum::<Probability>();
            if (sum - 1.0).abs() > LOAD_SUM_TOLERANCE {
                return Err(Error::MalformedStrategy(format!(
                    "row {} sums to {}, expected 1.0",
                    depth, sum
                )));
            }
        }
        Ok(Self {
            lattice,
            weights: rows,
        })
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }
    /// Ordered rows, each an ordered sequence of weights. Serialization order.
    pub fn rows(&self) -> &[Vec<Probability>] {
        &self.weights
    }
    pub fn row(&self, depth: usize) -> &[Probability] {
        &self.weights[depth]
    }

    /// Weight at a cell. Out-of-range access is a caller defect.
    pub fn get(&self, cell: Cell) -> Result<Probability> {
        self.weights
            .get(cell.row)
            .and_then(|row| row.get(cell.col))
            .copied()
            .ok_or(Error::OutsideLattice(cell))
    }

    /// Overwrites the weight at a cell. No value validation; callers
    /// renormalize the row before the mutation becomes observable.
    pub fn set(&mut self, cell: Cell, weight: Probability) -> Result<()> {
        self.weights
            .get_mut(cell.row)
            .and_then(|row| row.get_mut(cell.col))
            .map(|slot| *slot = weight)
            .ok_or(Error::OutsideLattice(cell))
    }

    /// Restores the row-stochastic invariant after an additive update.
    ///
    /// If the row picked up a negative weight, every nonzero non-sentinel
    /// cell is first shifted up by `|min| + MINFLOAT` so the most negative
    /// cell lands just above zero; zero cells stay zero. The row is then
    /// divided through by its sum.
    pub fn normalize_row(&mut self, depth: usize) -> Result<()> {
        let width = self.lattice.width();
        let row = self
            .weights
            .get_mut(depth)
            .ok_or(Error::OutsideLattice(Cell::at(depth, 0)))?;
        let min = row.iter().copied().fold(Probability::INFINITY, Probability::min);
        if min < 0.0 {
            let shift = min.abs() + MINFLOAT;
            for weight in row[1..width - 1].iter_mut().filter(|w| **w != 0.0) {
                *weight += shift;
            }
        }
        let sum = row.iter().sum::<Probability>();
        for weight in row[1..width - 1].iter_mut() {
            *weight /= sum;
        }
        Ok(())
    }

    /// Renormalizes every row.
    pub fn normalize_all(&mut self) -> Result<()> {
        for depth in 0..self.lattice.rows() {
            self.normalize_row(depth)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(matrix: &ProbMatrix, depth: usize) -> Probability {
        matrix.row(depth).iter().sum()
    }

    #[test]
    fn initial_rows_are_stochastic() {
        let matrix = ProbMatrix::new(Lattice::default());
        for depth in 0..8 {
            assert!((sum(&matrix, depth) - 1.0).abs() < ROW_SUM_TOLERANCE);
        }
    }

    #[test]
    fn start_row_is_a_point_mass() {
        let matrix = ProbMatrix::new(Lattice::default());
        assert_eq!(matrix.get(Cell::at(0, 3)).unwrap(), 1.0);
        assert_eq!(matrix.get(Cell::at(0, 2)).unwrap(), 0.0);
        assert_eq!(matrix.get(Cell::at(0, 4)).unwrap(), 0.0);
    }

    #[test]
    fn second_row_splits_across_three_cells() {
        let matrix = ProbMatrix::new(Lattice::default());
        for col in 2..=4 {
            let w = matrix.get(Cell::at(1, col)).unwrap();
            assert!((w - 1.0 / 3.0).abs() < ROW_SUM_TOLERANCE);
        }
        assert_eq!(matrix.get(Cell::at(1, 1)).unwrap(), 0.0);
        assert_eq!(matrix.get(Cell::at(1, 5)).unwrap(), 0.0);
    }

    #[test]
    fn sentinels_stay_zero_through_normalization() {
        let mut matrix = ProbMatrix::new(Lattice::default());
        matrix.set(Cell::at(3, 2), 5.0).unwrap();
        matrix.normalize_row(3).unwrap();
        assert_eq!(matrix.get(Cell::at(3, 0)).unwrap(), 0.0);
        assert_eq!(matrix.get(Cell::at(3, 6)).unwrap(), 0.0);
        assert!((sum(&matrix, 3) - 1.0).abs() < ROW_SUM_TOLERANCE);
    }

    #[test]
    fn negative_weight_shifts_before_scaling() {
        let mut matrix = ProbMatrix::new(Lattice::default());
        matrix.set(Cell::at(3, 3), -0.3).unwrap();
        matrix.normalize_row(3).unwrap();
        let w = matrix.get(Cell::at(3, 3)).unwrap();
        assert!(w > 0.0);
        assert!(w < 1e-3);
        assert!((sum(&matrix, 3) - 1.0).abs() < ROW_SUM_TOLERANCE);
        assert!(matrix.row(3).iter().all(|w| *w >= 0.0));
    }

    #[test]
    fn out_of_range_access_is_a_defect() {
        let matrix = ProbMatrix::new(Lattice::default());
        assert!(matches!(
            matrix.get(Cell::at(8, 3)),
            Err(Error::OutsideLattice(_))
        ));
        assert!(matches!(
            matrix.get(Cell::at(0, 7)),
            Err(Error::OutsideLattice(_))
        ));
    }

    #[test]
    fn import_rejects_wrong_shape_and_bad_sums() {
        let lattice = Lattice::default();
        let good = ProbMatrix::new(lattice).rows().to_vec();
        assert!(ProbMatrix::from_rows(lattice, good.clone()).is_ok());

        let mut short = good.clone();
        short.pop();
        assert!(matches!(
            ProbMatrix::from_rows(lattice, short),
            Err(Error::MalformedStrategy(_))
        ));

        let mut lopsided = good.clone();
        lopsided[4][2] = 0.9;
        assert!(matches!(
            ProbMatrix::from_rows(lattice, lopsided),
            Err(Error::MalformedStrategy(_))
        ));

        let mut offboard = good;
        offboard[0][1] = 0.1;
        offboard[0][3] = 0.9;
        assert!(matches!(
            ProbMatrix::from_rows(lattice, offboard),
            Err(Error::MalformedStrategy(_))
        ));
    }
}
