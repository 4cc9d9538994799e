use crate::*;

/// One resolved round, as seen by the learning side.
///
/// `i_can_step` is true when this side's step was *not* predicted by the
/// opponent; `opp_can_step` is true when the opponent's step was *not*
/// predicted by this side. `mine` and `theirs` are the two simultaneous
/// decisions exactly as they were made.
#[derive(Debug, Clone, Copy)]
pub struct Feedback {
    pub i_can_step: bool,
    pub opp_can_step: bool,
    pub mine: Decision,
    pub theirs: Decision,
}

impl Feedback {
    /// Update direction for the own-step cell: rewarded when the step
    /// went through, penalized when it was frozen.
    fn step_sign(&self) -> Probability {
        if self.i_can_step { 1.0 } else { -1.0 }
    }
    /// Update direction for the prediction cell: rewarded when the
    /// opponent was frozen, penalized when the prediction missed.
    fn guess_sign(&self) -> Probability {
        if self.opp_can_step { -1.0 } else { 1.0 }
    }
}

/// The interchangeable learning rules.
///
/// All rules operate on the row containing the learner's step target
/// and/or the row containing its prediction target, and renormalize every
/// row they touched before returning. Rules are selected by id 0..=6 on
/// the wire ([`TryFrom<u8>`]); gradient descent (id 6) is intentionally
/// unimplemented and fails fast without mutating anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LearningRule {
    /// No change.
    Null,
    /// Scale the acted-on cells by ×1.1 / ×0.9 per outcome.
    Multiplicative,
    /// `w ← w + α·sign·Σ(three predecessor cells behind the target)`.
    BackpropSum,
    /// `w ← w + α·sign·(predecessor cell at the current position)`.
    BackpropSingle,
    /// Boosting-style reweight of losing cells by `√((1-ε)/ε)`.
    BoostingReweight,
    /// Bayesian counting over rational weights: ×1.1 on the acted-on
    /// cell's numerator or denominator.
    BayesianCounting,
    /// Not implemented; always fails with [`Error::UnsupportedLearningMethod`].
    GradientDescent,
}

impl TryFrom<u8> for LearningRule {
    type Error = Error;
    fn try_from(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Null),
            1 => Ok(Self::Multiplicative),
            2 => Ok(Self::BackpropSum),
            3 => Ok(Self::BackpropSingle),
            4 => Ok(Self::BoostingReweight),
            5 => Ok(Self::BayesianCounting),
            6 => Ok(Self::GradientDescent),
            id => Err(Error::UnknownLearningMethod(id)),
        }
    }
}

impl std::fmt::Display for LearningRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Multiplicative => "multiplicative",
            Self::BackpropSum => "backprop-sum",
            Self::BackpropSingle => "backprop-single",
            Self::BoostingReweight => "boosting-reweight",
            Self::BayesianCounting => "bayesian-counting",
            Self::GradientDescent => "gradient-descent",
        };
        write!(f, "{}", name)
    }
}

impl LearningRule {
    /// Applies this rule to the learner's matrices for one round.
    pub fn apply(&self, agent: &mut Agent, feedback: &Feedback, alpha: Probability) -> Result<()> {
        match self {
            Self::Null => Ok(()),
            Self::Multiplicative => Self::multiplicative(agent, feedback),
            Self::BackpropSum => Self::backprop_sum(agent, feedback, alpha),
            Self::BackpropSingle => Self::backprop_single(agent, feedback, alpha),
            Self::BoostingReweight => Self::boosting(agent, feedback),
            Self::BayesianCounting => Self::bayesian(agent, feedback),
            Self::GradientDescent => Err(Error::UnsupportedLearningMethod),
        }
    }

    fn multiplicative(agent: &mut Agent, fb: &Feedback) -> Result<()> {
        let step_factor = match fb.i_can_step {
            true => FACTOR_UP,
            false => FACTOR_DOWN,
        };
        let guess_factor = match fb.opp_can_step {
            true => FACTOR_DOWN,
            false => FACTOR_UP,
        };
        let step = agent.steps.get(fb.mine.step)? * step_factor;
        agent.steps.set(fb.mine.step, step)?;
        let guess = agent.guesses.get(fb.mine.guess)? * guess_factor;
        agent.guesses.set(fb.mine.guess, guess)?;
        agent.steps.normalize_row(fb.mine.step.row)?;
        agent.guesses.normalize_row(fb.mine.guess.row)
    }

    fn backprop_sum(agent: &mut Agent, fb: &Feedback, alpha: Probability) -> Result<()> {
        let basis = Self::predecessors(&agent.steps, fb.mine.step)?;
        let step = agent.steps.get(fb.mine.step)? + alpha * fb.step_sign() * basis;
        agent.steps.set(fb.mine.step, step)?;
        let basis = Self::predecessors(&agent.guesses, fb.mine.guess)?;
        let guess = agent.guesses.get(fb.mine.guess)? + alpha * fb.guess_sign() * basis;
        agent.guesses.set(fb.mine.guess, guess)?;
        agent.steps.normalize_row(fb.mine.step.row)?;
        agent.guesses.normalize_row(fb.mine.guess.row)
    }

    fn backprop_single(agent: &mut Agent, fb: &Feedback, alpha: Probability) -> Result<()> {
        let basis = agent.steps.get(agent.position)?;
        let step = agent.steps.get(fb.mine.step)? + alpha * fb.step_sign() * basis;
        agent.steps.set(fb.mine.step, step)?;
        let basis = agent.guesses.get(agent.belief)?;
        let guess = agent.guesses.get(fb.mine.guess)? + alpha * fb.guess_sign() * basis;
        agent.guesses.set(fb.mine.guess, guess)?;
        agent.steps.normalize_row(fb.mine.step.row)?;
        agent.guesses.normalize_row(fb.mine.guess.row)
    }

    /// Sum of the three cells directly behind the target cell.
    fn predecessors(matrix: &ProbMatrix, target: Cell) -> Result<Probability> {
        let row = target
            .row
            .checked_sub(1)
            .ok_or(Error::OutsideLattice(target))?;
        Ok(matrix.get(Cell::at(row, target.col - 1))?
            + matrix.get(Cell::at(row, target.col))?
            + matrix.get(Cell::at(row, target.col + 1))?)
    }

    fn boosting(agent: &mut Agent, fb: &Feedback) -> Result<()> {
        match (fb.i_can_step, fb.opp_can_step) {
            // step landed, prediction missed: shrink only the prediction
            (true, true) => {
                let eps = agent.guesses.get(fb.mine.guess)? + agent.guesses.get(fb.theirs.step)?;
                let guess = agent.guesses.get(fb.mine.guess)? * Self::reweight(eps);
                agent.guesses.set(fb.mine.guess, guess)?;
                agent.guesses.normalize_row(fb.mine.guess.row)
            }
            // both calls won: nothing lost, nothing to reweight
            (true, false) => Ok(()),
            // step frozen and prediction missed: shrink both
            (false, true) => {
                let eps = Self::forward_mass(&agent.steps, agent.position)?;
                let step = agent.steps.get(fb.mine.step)? * Self::reweight(eps);
                agent.steps.set(fb.mine.step, step)?;
                let eps = agent.guesses.get(fb.mine.guess)? + agent.guesses.get(fb.theirs.step)?;
                let guess = agent.guesses.get(fb.mine.guess)? * Self::reweight(eps);
                agent.guesses.set(fb.mine.guess, guess)?;
                agent.steps.normalize_row(fb.mine.step.row)?;
                agent.guesses.normalize_row(fb.mine.guess.row)
            }
            // step frozen, prediction hit: shrink only the step
            (false, false) => {
                let eps = Self::forward_mass(&agent.steps, agent.position)?;
                let step = agent.steps.get(fb.mine.step)? * Self::reweight(eps);
                agent.steps.set(fb.mine.step, step)?;
                agent.steps.normalize_row(fb.mine.step.row)
            }
        }
    }

    /// Weight mass over the three forward neighbors of a position.
    fn forward_mass(matrix: &ProbMatrix, from: Cell) -> Result<Probability> {
        from.forward()
            .iter()
            .try_fold(0.0, |sum, cell| Ok(sum + matrix.get(*cell)?))
    }

    /// Boosting reweight factor `exp(½·ln((1-ε)/ε)) = √((1-ε)/ε)`.
    /// Error estimates outside [0.5, 1.0) snap to fixed substitutes.
    fn reweight(eps: Probability) -> Probability {
        let eps = if eps < 0.5 {
            BOOST_FLOOR
        } else if eps >= 1.0 {
            BOOST_CEIL
        } else {
            eps
        };
        ((1.0 - eps) / eps).sqrt()
    }

    fn bayesian(agent: &mut Agent, fb: &Feedback) -> Result<()> {
        Self::recount(&mut agent.steps, fb.mine.step, fb.i_can_step)?;
        Self::recount(&mut agent.guesses, fb.mine.guess, !fb.opp_can_step)?;
        agent.steps.normalize_row(fb.mine.step.row)?;
        agent.guesses.normalize_row(fb.mine.guess.row)
    }

    /// Rational counting update around `target`: the up-to-3 live cells
    /// become fractions over a common power-of-two denominator, then the
    /// acted-on cell scales by ×1.1 up (reward) or down (penalty) before
    /// the weights are written back.
    ///
    /// Numerators stay floating point over the integer denominator: an
    /// integer numerator would truncate any weight below one scale unit
    /// to zero (killing a live cell for good, since sampling and
    /// renormalization both leave zeros alone) and would floor a small
    /// ×1.1 reward to a no-op. The writeback floors live cells at a
    /// strictly positive weight for the same reason.
    fn recount(matrix: &mut ProbMatrix, target: Cell, reward: bool) -> Result<()> {
        let mut cells = vec![target];
        for col in [target.col.wrapping_sub(1), target.col + 1] {
            let neighbor = Cell::at(target.row, col);
            if matrix.get(neighbor)? != 0.0 {
                cells.push(neighbor);
            }
        }
        let mut fractions = cells
            .iter()
            .map(|cell| {
                matrix
                    .get(*cell)
                    .map(|w| (*cell, w * RATIONAL_SCALE as Probability, RATIONAL_SCALE))
            })
            .collect::<Result<Vec<_>>>()?;
        let common = fractions.iter().fold(1, |acc, (_, _, den)| lcm(acc, *den));
        debug_assert_eq!(common, RATIONAL_SCALE);
        match reward {
            true => fractions[0].1 *= FACTOR_UP,
            false => fractions[0].1 /= FACTOR_UP,
        }
        let floor = MINFLOAT / RATIONAL_SCALE as Probability;
        for (cell, num, den) in fractions {
            matrix.set(cell, (num / den as Probability).max(floor))?;
        }
        Ok(())
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Learner two rounds in, about to act on rows 2 (step) and 2 (guess).
    fn learner() -> Agent {
        let mut agent = Agent::new(Lattice::default(), Some(42));
        agent.relocate(Cell::at(1, 3));
        agent.suspect(Cell::at(1, 3));
        agent
    }

    fn feedback(i_can_step: bool, opp_can_step: bool) -> Feedback {
        Feedback {
            i_can_step,
            opp_can_step,
            mine: Decision {
                step: Cell::at(2, 3),
                guess: Cell::at(2, 4),
            },
            theirs: Decision {
                step: Cell::at(2, 2),
                guess: Cell::at(2, 3),
            },
        }
    }

    fn row_sum(matrix: &ProbMatrix, depth: usize) -> Probability {
        matrix.row(depth).iter().sum()
    }

    #[test]
    fn id_dispatch_covers_all_rules() {
        assert_eq!(LearningRule::try_from(0).unwrap(), LearningRule::Null);
        assert_eq!(LearningRule::try_from(5).unwrap(), LearningRule::BayesianCounting);
        assert_eq!(LearningRule::try_from(6).unwrap(), LearningRule::GradientDescent);
        assert!(matches!(
            LearningRule::try_from(9),
            Err(Error::UnknownLearningMethod(9))
        ));
    }

    #[test]
    fn null_rule_changes_nothing() {
        let mut agent = learner();
        let before = agent.clone();
        LearningRule::Null
            .apply(&mut agent, &feedback(true, true), LEARNING_CONSTANT)
            .unwrap();
        assert_eq!(before.steps().rows(), agent.steps().rows());
        assert_eq!(before.guesses().rows(), agent.guesses().rows());
    }

    #[test]
    fn multiplicative_scales_then_renormalizes() {
        let mut agent = learner();
        let fb = feedback(true, true);
        LearningRule::Multiplicative
            .apply(&mut agent, &fb, LEARNING_CONSTANT)
            .unwrap();
        // uniform 0.2 row: step cell ×1.1 → 0.22 over a 1.02 total,
        // guess cell ×0.9 → 0.18 over a 0.98 total
        let step = agent.steps().get(fb.mine.step).unwrap();
        let guess = agent.guesses().get(fb.mine.guess).unwrap();
        assert!((step - 0.22 / 1.02).abs() < 1e-9);
        assert!((guess - 0.18 / 0.98).abs() < 1e-9);
        assert!((row_sum(agent.steps(), 2) - 1.0).abs() < ROW_SUM_TOLERANCE);
        assert!((row_sum(agent.guesses(), 2) - 1.0).abs() < ROW_SUM_TOLERANCE);
    }

    #[test]
    fn backprop_sum_adds_predecessor_mass() {
        let mut agent = learner();
        let fb = feedback(true, true);
        LearningRule::BackpropSum
            .apply(&mut agent, &fb, LEARNING_CONSTANT)
            .unwrap();
        // predecessors of (2,3) are the three thirds of row 1: basis 1.0,
        // so the step cell goes 0.2 + 0.5 = 0.7 over a 1.5 total
        let step = agent.steps().get(fb.mine.step).unwrap();
        assert!((step - 0.7 / 1.5).abs() < 1e-9);
        // the guess cell goes negative (0.2 - 0.5·⅔) and the shift rule
        // leaves it barely positive after renormalization
        let guess = agent.guesses().get(fb.mine.guess).unwrap();
        assert!(guess > 0.0);
        assert!(guess < 1e-6);
        assert!((row_sum(agent.steps(), 2) - 1.0).abs() < ROW_SUM_TOLERANCE);
        assert!((row_sum(agent.guesses(), 2) - 1.0).abs() < ROW_SUM_TOLERANCE);
    }

    #[test]
    fn backprop_single_uses_the_current_position() {
        let mut agent = learner();
        let fb = feedback(false, false);
        // basis is the weight under the agent's own feet: ⅓ at (1,3)
        LearningRule::BackpropSingle
            .apply(&mut agent, &fb, LEARNING_CONSTANT)
            .unwrap();
        let expected = 0.2 - 0.5 / 3.0; // pre-normalization
        let total = 1.0 + expected - 0.2;
        let step = agent.steps().get(fb.mine.step).unwrap();
        assert!((step - expected / total).abs() < 1e-9);
        assert!((row_sum(agent.steps(), 2) - 1.0).abs() < ROW_SUM_TOLERANCE);
    }

    #[test]
    fn boosting_skips_the_double_win_branch() {
        let mut agent = learner();
        let before = agent.clone();
        LearningRule::BoostingReweight
            .apply(&mut agent, &feedback(true, false), LEARNING_CONSTANT)
            .unwrap();
        assert_eq!(before.steps().rows(), agent.steps().rows());
        assert_eq!(before.guesses().rows(), agent.guesses().rows());
    }

    #[test]
    fn boosting_shrinks_losing_cells() {
        let mut agent = learner();
        let fb = feedback(true, true);
        let before = agent.guesses().get(fb.mine.guess).unwrap();
        LearningRule::BoostingReweight
            .apply(&mut agent, &fb, LEARNING_CONSTANT)
            .unwrap();
        // ε = 0.2 + 0.2 → snapped to the 0.6 floor → factor √(0.4/0.6) < 1
        let after = agent.guesses().get(fb.mine.guess).unwrap();
        assert!(after < before);
        assert!((row_sum(agent.guesses(), 2) - 1.0).abs() < ROW_SUM_TOLERANCE);
    }

    #[test]
    fn bayesian_counting_moves_by_a_tenth() {
        let mut agent = learner();
        let fb = feedback(true, true);
        LearningRule::BayesianCounting
            .apply(&mut agent, &fb, LEARNING_CONSTANT)
            .unwrap();
        // reward: numerator ×1.1 → 0.22 over a 1.02 total
        let step = agent.steps().get(fb.mine.step).unwrap();
        assert!((step - 0.22 / 1.02).abs() < 1e-6);
        // penalty: denominator ×1.1 → 0.2/1.1 over a (0.8 + 0.2/1.1) total
        let guess = agent.guesses().get(fb.mine.guess).unwrap();
        let expected = (0.2 / 1.1) / (0.8 + 0.2 / 1.1);
        assert!((guess - expected).abs() < 1e-6);
        assert!((row_sum(agent.steps(), 2) - 1.0).abs() < ROW_SUM_TOLERANCE);
        assert!((row_sum(agent.guesses(), 2) - 1.0).abs() < ROW_SUM_TOLERANCE);
    }

    #[test]
    fn bayesian_counting_keeps_tiny_weights_alive() {
        let mut agent = learner();
        let fb = feedback(true, true);
        // below one unit of the fixed-point scale; renormalization's
        // negative-shift rule leaves weights this small behind
        agent.steps.set(fb.mine.step, 5e-11).unwrap();
        LearningRule::BayesianCounting
            .apply(&mut agent, &fb, LEARNING_CONSTANT)
            .unwrap();
        let step = agent.steps().get(fb.mine.step).unwrap();
        assert!(step > 0.0, "rewarded live cell was zeroed");
        // reward still lands: ×1.1 over the 0.8 + 5.5e-11 row total
        let expected = (5e-11 * 1.1) / (0.8 + 5e-11 * 1.1);
        assert!(((step - expected) / expected).abs() < 1e-9);
        assert!((row_sum(agent.steps(), 2) - 1.0).abs() < ROW_SUM_TOLERANCE);
    }

    #[test]
    fn bayesian_counting_rewards_tiny_weights_by_a_tenth() {
        let mut agent = learner();
        let fb = feedback(true, true);
        agent.steps.set(fb.mine.step, 1e-9).unwrap();
        let before = agent.steps().get(fb.mine.step).unwrap();
        LearningRule::BayesianCounting
            .apply(&mut agent, &fb, LEARNING_CONSTANT)
            .unwrap();
        let step = agent.steps().get(fb.mine.step).unwrap();
        // the row total is ~0.8, so the normalized ratio is ~1.375
        let ratio = step / before;
        assert!((ratio - 1.1 / (0.8 + 1.1e-9)).abs() < 1e-6, "ratio {}", ratio);
    }

    #[test]
    fn gradient_descent_fails_without_mutation() {
        let mut agent = learner();
        let before = agent.clone();
        let result =
            LearningRule::GradientDescent.apply(&mut agent, &feedback(true, true), LEARNING_CONSTANT);
        assert!(matches!(result, Err(Error::UnsupportedLearningMethod)));
        assert_eq!(before.steps().rows(), agent.steps().rows());
        assert_eq!(before.guesses().rows(), agent.guesses().rows());
    }

    #[test]
    fn every_rule_preserves_row_stochasticity() {
        let rules = [
            LearningRule::Null,
            LearningRule::Multiplicative,
            LearningRule::BackpropSum,
            LearningRule::BackpropSingle,
            LearningRule::BoostingReweight,
            LearningRule::BayesianCounting,
        ];
        for rule in rules {
            for (i, opp) in [(true, true), (true, false), (false, true), (false, false)] {
                let mut agent = learner();
                rule.apply(&mut agent, &feedback(i, opp), LEARNING_CONSTANT)
                    .unwrap();
                for matrix in [agent.steps(), agent.guesses()] {
                    for depth in 0..8 {
                        let sum = row_sum(matrix, depth);
                        assert!(
                            (sum - 1.0).abs() < ROW_SUM_TOLERANCE,
                            "{} ({}, {}) row {} sums to {}",
                            rule,
                            i,
                            opp,
                            depth,
                            sum
                        );
                        assert_eq!(matrix.row(depth)[0], 0.0);
                        assert_eq!(matrix.row(depth)[6], 0.0);
                    }
                }
            }
        }
    }
}
