use crate::*;

/// Divergence metrics for scoring how closely one agent's policies track
/// another's. Selected by id 0..=3 on the wire ([`TryFrom<u8>`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Divergence {
    /// `Σ √((a-b)²)` over matched cells.
    Rmse,
    /// `Σ a·ln(a/b)`, skipping pairs where either value is exactly zero.
    KullbackLeibler,
    /// `Σ (a-b)²/b`, skipping zero denominators.
    ChiSquare,
    /// Per row, the gap between each side's modal cell and the other
    /// side's weight on that same cell.
    GreatestDifference,
}

impl TryFrom<u8> for Divergence {
    type Error = Error;
    fn try_from(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Rmse),
            1 => Ok(Self::KullbackLeibler),
            2 => Ok(Self::ChiSquare),
            3 => Ok(Self::GreatestDifference),
            id => Err(Error::UnknownDivergence(id)),
        }
    }
}

impl std::fmt::Display for Divergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rmse => "rmse",
            Self::KullbackLeibler => "kullback-leibler",
            Self::ChiSquare => "chi-square",
            Self::GreatestDifference => "greatest-difference",
        };
        write!(f, "{}", name)
    }
}

/// Scores the divergence between two agents' matrix pairs.
///
/// Two comparisons are aggregated, then halved:
///
/// 1. P's prediction matrix against Q's step matrix, row by row.
/// 2. P's step matrix against the *evasion* transform of Q's prediction
///    matrix, skipping the point-mass start row: each nonzero weight is
///    inverted and the row rescaled to sum 1, turning "where Q expects P
///    to step" into "where P should step to evade Q".
///
/// The greatest-difference metric compares both pairs directly, start row
/// included, with no evasion transform.
///
/// Stateless per call apart from caching the last computed value.
#[derive(Debug)]
pub struct ErrorMeter<'a> {
    p_steps: &'a ProbMatrix,
    p_guesses: &'a ProbMatrix,
    q_steps: &'a ProbMatrix,
    q_guesses: &'a ProbMatrix,
    divergence: Divergence,
    value: Option<Energy>,
}

impl<'a> ErrorMeter<'a> {
    pub fn between(p: &'a Agent, q: &'a Agent, divergence: Divergence) -> Self {
        Self {
            p_steps: p.steps(),
            p_guesses: p.guesses(),
            q_steps: q.steps(),
            q_guesses: q.guesses(),
            divergence,
            value: None,
        }
    }

    pub fn divergence(&self) -> Divergence {
        self.divergence
    }
    /// Last computed value, if any.
    pub fn value(&self) -> Option<Energy> {
        self.value
    }
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Computes the selected divergence and caches it.
    pub fn measure(&mut self) -> Energy {
        let value = match self.divergence {
            Divergence::Rmse => self.accumulate(|a, b| (a - b).abs()),
            Divergence::KullbackLeibler => self.accumulate(|a, b| {
                if a == 0.0 || b == 0.0 {
                    0.0
                } else {
                    a * (a / b).ln()
                }
            }),
            Divergence::ChiSquare => self.accumulate(|a, b| {
                if b == 0.0 {
                    0.0
                } else {
                    (a - b).powi(2) / b
                }
            }),
            Divergence::GreatestDifference => self.greatest(),
        };
        self.value = Some(value);
        value
    }

    /// Sums a cellwise contribution over both comparison pairs, applying
    /// the evasion transform to the second pair, then halves the total.
    fn accumulate(&self, contribution: impl Fn(Probability, Probability) -> Energy) -> Energy {
        let mut total = 0.0;
        for (p, q) in self.p_guesses.rows().iter().zip(self.q_steps.rows()) {
            for (a, b) in p.iter().zip(q) {
                total += contribution(*a, *b);
            }
        }
        for (p, q) in self
            .p_steps
            .rows()
            .iter()
            .zip(self.q_guesses.rows())
            .skip(1)
        {
            let evade = Self::evasion(q);
            for (a, b) in p.iter().zip(&evade) {
                total += contribution(*a, *b);
            }
        }
        total / 2.0
    }

    /// Inverts a prediction row into an evasion row: reciprocal of every
    /// nonzero weight, rescaled to sum 1.
    fn evasion(row: &[Probability]) -> Vec<Probability> {
        let mut inverted = row
            .iter()
            .map(|&w| if w == 0.0 { 0.0 } else { 1.0 / w })
            .collect::<Vec<_>>();
        let sum = inverted.iter().sum::<Probability>();
        for w in inverted.iter_mut() {
            *w /= sum;
        }
        inverted
    }

    fn greatest(&self) -> Energy {
        let mut total = 0.0;
        for (p, q) in self.p_guesses.rows().iter().zip(self.q_steps.rows()) {
            total += Self::contrast(p, q);
        }
        for (p, q) in self.p_steps.rows().iter().zip(self.q_guesses.rows()) {
            total += Self::contrast(p, q);
        }
        total / 2.0
    }

    /// Gap between each row's modal cell and the other row's weight there.
    fn contrast(p: &[Probability], q: &[Probability]) -> Energy {
        let pi = Self::argmax(p);
        let qi = Self::argmax(q);
        (p[pi] - q[pi]) + (q[qi] - p[qi])
    }

    /// Index of the first maximal cell, matching ordered-scan semantics.
    fn argmax(row: &[Probability]) -> usize {
        row.iter()
            .enumerate()
            .fold(0, |best, (i, w)| if *w > row[best] { i } else { best })
    }
}
