use crate::*;
use rand::Rng;
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::SmallRng;
use std::io::BufRead;
use std::io::Write;

/// Marker line opening the step-matrix block of a strategy file.
const MARKER_MOVE: &str = "# player move";
/// Marker line opening the prediction-matrix block of a strategy file.
const MARKER_PRED: &str = "# player pred";

/// One round's decision: the cell this side steps into and the cell it
/// predicts the opponent will step into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub step: Cell,
    pub guess: Cell,
}

/// A MensIco player.
///
/// Owns its position, its belief about the opponent's position, a win
/// counter, and the two probability matrices that drive its decisions:
/// `steps` over its own forward moves and `guesses` over the opponent's.
/// The matrices are mutated only through the decision/learning methods;
/// positions are mutated only by the [`Game`] after outcome resolution.
#[derive(Debug, Clone)]
pub struct Agent {
    pub(crate) position: Cell,
    pub(crate) belief: Cell,
    pub(crate) wins: u32,
    pub(crate) steps: ProbMatrix,
    pub(crate) guesses: ProbMatrix,
    rng: SmallRng,
}

impl Agent {
    /// Creates an agent at the lattice start with freshly initialized
    /// matrices. A seed makes every decision reproducible.
    pub fn new(lattice: Lattice, seed: Option<u64>) -> Self {
        Self {
            position: lattice.start(),
            belief: lattice.start(),
            wins: 0,
            steps: ProbMatrix::new(lattice),
            guesses: ProbMatrix::new(lattice),
            rng: match seed {
                Some(seed) => SmallRng::seed_from_u64(seed),
                None => SmallRng::from_os_rng(),
            },
        }
    }

    pub fn position(&self) -> Cell {
        self.position
    }
    pub fn belief(&self) -> Cell {
        self.belief
    }
    pub fn wins(&self) -> u32 {
        self.wins
    }
    pub fn steps(&self) -> &ProbMatrix {
        &self.steps
    }
    pub fn guesses(&self) -> &ProbMatrix {
        &self.guesses
    }
    pub(crate) fn record_win(&mut self) {
        self.wins += 1;
    }
    pub(crate) fn reset_wins(&mut self) {
        self.wins = 0;
    }
    pub(crate) fn relocate(&mut self, position: Cell) {
        self.position = position;
    }
    pub(crate) fn suspect(&mut self, belief: Cell) {
        self.belief = belief;
    }

    /// Decides this round's step and prediction.
    ///
    /// Each axis independently builds its candidate set from the forward
    /// neighbors with strictly positive weight, then with probability
    /// `explore` samples proportionally to the stored weights, otherwise
    /// uniformly at random. An empty candidate set means the agent's
    /// position lies outside the lattice's valid range; that is a caller
    /// defect, not a recoverable game state.
    pub fn decide(&mut self, explore: Probability) -> Result<Decision> {
        let step = Self::choose(&mut self.rng, &self.steps, self.position, explore)?;
        let guess = Self::choose(&mut self.rng, &self.guesses, self.belief, explore)?;
        Ok(Decision { step, guess })
    }

    fn choose(
        rng: &mut SmallRng,
        matrix: &ProbMatrix,
        from: Cell,
        explore: Probability,
    ) -> Result<Cell> {
        let mut candidates = Vec::with_capacity(3);
        let mut weights = Vec::with_capacity(3);
        for cell in from.forward() {
            let weight = matrix.get(cell)?;
            if weight > 0.0 {
                candidates.push(cell);
                weights.push(weight);
            }
        }
        if candidates.is_empty() {
            return Err(Error::OutsideLattice(from));
        }
        if rng.random::<Probability>() < explore {
            let index = WeightedIndex::new(weights)
                .expect("at least one candidate weight > 0")
                .sample(rng);
            Ok(candidates[index])
        } else {
            Ok(candidates[rng.random_range(0..candidates.len())])
        }
    }

    /// Validates an externally supplied decision (i.e. a human move):
    /// both cells must carry nonzero weight in the respective matrix.
    /// Nothing is mutated on rejection; the caller re-prompts.
    pub fn confirm(&self, decision: Decision) -> Result<Decision> {
        if self.steps.get(decision.step)? == 0.0 {
            return Err(Error::InvalidMove(decision.step));
        }
        if self.guesses.get(decision.guess)? == 0.0 {
            return Err(Error::InvalidMove(decision.guess));
        }
        Ok(decision)
    }

    /// Writes both matrices to a line-oriented text file: a `# player move`
    /// marker, one comma-separated line per step-matrix row, a
    /// `# player pred` marker, then the prediction-matrix rows.
    pub fn save_strategy(&self, path: &std::path::Path) -> Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        writeln!(file, "{}", MARKER_MOVE)?;
        Self::write_rows(&mut file, &self.steps)?;
        writeln!(file, "{}", MARKER_PRED)?;
        Self::write_rows(&mut file, &self.guesses)?;
        file.flush()?;
        log::debug!("[agent] strategy saved to {}", path.display());
        Ok(())
    }

    fn write_rows(file: &mut impl Write, matrix: &ProbMatrix) -> Result<()> {
        for row in matrix.rows() {
            let line = row
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    /// Replaces both matrices from a strategy file.
    ///
    /// Loading is strict and atomic: both blocks are parsed and validated
    /// against this agent's lattice before either matrix is swapped in, so
    /// a malformed file leaves the agent exactly as it was.
    pub fn load_strategy(&mut self, path: &std::path::Path) -> Result<()> {
        let file = std::io::BufReader::new(std::fs::File::open(path)?);
        let mut blocks: Vec<Vec<Vec<Probability>>> = Vec::new();
        for line in file.lines() {
            let line = line?;
            if line.starts_with('#') {
                blocks.push(Vec::new());
                continue;
            }
            let row = line
                .split(',')
                .map(|w| w.trim().parse::<Probability>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::MalformedStrategy(format!("unparseable weight: {}", e)))?;
            blocks
                .last_mut()
                .ok_or_else(|| Error::MalformedStrategy("missing marker line".to_string()))?
                .push(row);
        }
        let [moves, preds] = <[_; 2]>::try_from(blocks)
            .map_err(|_| Error::MalformedStrategy("expected exactly two blocks".to_string()))?;
        let lattice = *self.steps.lattice();
        let steps = ProbMatrix::from_rows(lattice, moves)?;
        let guesses = ProbMatrix::from_rows(lattice, preds)?;
        self.steps = steps;
        self.guesses = guesses;
        log::debug!("[agent] strategy loaded from {}", path.display());
        Ok(())
    }
}
