use crate::*;
use std::io::Write;

/// One point of an iteration-indexed series.
pub type Sample = (usize, Energy);

/// Multi-game training harness.
///
/// Plays games back to back on one [`Game`], recording two series along
/// the way: the divergence between the learner's matrices and the
/// opponent's after each game, and the learner's cumulative win ratio.
/// Learned matrices and win counters carry across games; positions and
/// the round counter reset between them.
#[derive(Debug)]
pub struct Session {
    game: Game,
    errors: Vec<Sample>,
    ratios: Vec<Sample>,
}

impl Session {
    pub fn new(lattice: Lattice, config: Config) -> Result<Self> {
        Ok(Self {
            game: Game::new(lattice, config)?,
            errors: Vec::new(),
            ratios: Vec::new(),
        })
    }

    pub fn game(&self) -> &Game {
        &self.game
    }
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }
    /// Per-game divergence samples recorded so far.
    pub fn errors(&self) -> &[Sample] {
        &self.errors
    }
    /// Per-game cumulative win-ratio samples recorded so far.
    pub fn ratios(&self) -> &[Sample] {
        &self.ratios
    }
    pub fn wins(&self, side: Side) -> u32 {
        self.game.wins(side)
    }
    pub fn reset_wins(&mut self) {
        self.game.reset_wins();
    }

    /// Plays `games` full games, sampling both series after each one.
    ///
    /// The win ratio counts learner wins within this call over games
    /// played so far in it; draws count for neither side. The counters
    /// themselves keep accumulating across calls until the caller asks
    /// for [`Session::reset_wins`].
    pub fn run(&mut self, games: usize) -> Result<()> {
        let divergence = self.game.config().divergence;
        log::info!(
            "[session] running {} games with {} learning and {} divergence",
            games,
            self.game.config().learning,
            divergence,
        );
        let baseline = self.game.wins(Side::Learner);
        for index in 0..games {
            while !self.game.is_over() {
                self.game.step()?;
            }
            let error = ErrorMeter::between(
                self.game.agent(Side::Learner),
                self.game.agent(Side::Opponent),
                divergence,
            )
            .measure();
            let ratio =
                (self.game.wins(Side::Learner) - baseline) as Energy / (index + 1) as Energy;
            self.errors.push((index, error));
            self.ratios.push((index, ratio));
            log::debug!(
                "[session] game {}: error {:.6} win ratio {:.3}",
                index,
                error,
                ratio,
            );
            self.game.reset();
        }
        log::info!(
            "[session] finished: learner {} opponent {} of {} games",
            self.game.wins(Side::Learner),
            self.game.wins(Side::Opponent),
            games,
        );
        Ok(())
    }

    /// Writes a series as `iteration; value` lines, one sample per line.
    pub fn write_series(path: &std::path::Path, series: &[Sample]) -> Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        for (iteration, value) in series {
            writeln!(file, "{}; {}", iteration, value)?;
        }
        file.flush()?;
        log::debug!(
            "[session] {} samples written to {}",
            series.len(),
            path.display(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(learning: LearningRule) -> Session {
        let config = Config {
            learning,
            seed: Some(42),
            ..Config::default()
        };
        Session::new(Lattice::default(), config).unwrap()
    }

    #[test]
    fn run_records_one_sample_per_game() {
        let mut session = session(LearningRule::BackpropSum);
        session.run(20).unwrap();
        assert_eq!(session.errors().len(), 20);
        assert_eq!(session.ratios().len(), 20);
        for (index, (iteration, error)) in session.errors().iter().enumerate() {
            assert_eq!(*iteration, index);
            assert!(error.is_finite());
        }
        for (_, ratio) in session.ratios() {
            assert!((0.0..=1.0).contains(ratio));
        }
        // every game ended and the board came back to the start
        assert!(!session.game().is_over());
        assert_eq!(session.game().round(), 0);
    }

    #[test]
    fn win_ratio_accounts_for_draws() {
        let mut session = session(LearningRule::Null);
        session.run(50).unwrap();
        let learner = session.wins(Side::Learner) as f64;
        let (_, last) = session.ratios().last().copied().unwrap();
        assert!((last - learner / 50.0).abs() < 1e-12);
        // draws leave both counters short of the game count
        assert!(session.wins(Side::Learner) + session.wins(Side::Opponent) <= 50);
    }

    #[test]
    fn consecutive_runs_accumulate_wins() {
        let mut session = session(LearningRule::Null);
        session.run(30).unwrap();
        let first = session.wins(Side::Learner);
        session.run(30).unwrap();
        let total = session.wins(Side::Learner);
        assert!(total >= first);
        assert_eq!(session.ratios().len(), 60);
        // the second run's ratios count only its own wins
        let (_, last) = session.ratios().last().copied().unwrap();
        assert!((last - (total - first) as f64 / 30.0).abs() < 1e-12);
        // zeroing the counters stays an explicit, caller-owned operation
        session.reset_wins();
        assert_eq!(session.wins(Side::Learner), 0);
        assert_eq!(session.wins(Side::Opponent), 0);
    }

    #[test]
    fn runs_are_reproducible_under_a_seed() {
        let mut a = session(LearningRule::Multiplicative);
        let mut b = session(LearningRule::Multiplicative);
        a.run(10).unwrap();
        b.run(10).unwrap();
        assert_eq!(a.errors(), b.errors());
        assert_eq!(a.ratios(), b.ratios());
    }

    #[test]
    fn series_files_are_line_oriented() {
        let path = std::env::temp_dir().join("mensico_series.txt");
        Session::write_series(&path, &[(0, 0.5), (1, 0.25)]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(content, "0; 0.5\n1; 0.25\n");
    }
}
