use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use mensico::*;
use std::path::PathBuf;

/// Batch-train the learning side of MensIco against its static opponent.
#[derive(Parser)]
#[command(name = "train", about = "Train a MensIco learning agent")]
struct Cli {
    /// Number of games to play
    #[arg(long, default_value_t = 1000)]
    games: usize,

    /// Usable board columns, sentinels excluded
    #[arg(long, default_value_t = DEFAULT_COLS)]
    cols: usize,

    /// Board rows, start row included
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    rows: usize,

    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Learning rule id 0..=6, overriding the config
    #[arg(long)]
    learning: Option<u8>,

    /// Divergence metric id 0..=3, overriding the config
    #[arg(long)]
    divergence: Option<u8>,

    /// Exploitation probability for the learner
    #[arg(long)]
    explore_learner: Option<f64>,

    /// Exploitation probability for the opponent
    #[arg(long)]
    explore_opponent: Option<f64>,

    /// Learning constant for the backprop-style rules
    #[arg(long)]
    alpha: Option<f64>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the per-game error series
    #[arg(long)]
    errors: Option<PathBuf>,

    /// Where to write the per-game win-ratio series
    #[arg(long)]
    ratios: Option<PathBuf>,

    /// Strategy file to preload into the learner
    #[arg(long)]
    load: Option<PathBuf>,

    /// Strategy file to write the learner's matrices to afterward
    #[arg(long)]
    save: Option<PathBuf>,
}

impl Cli {
    /// Resolves the effective configuration: file (or defaults), then
    /// command-line overrides, then validation.
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(id) = self.learning {
            config.learning = LearningRule::try_from(id)?;
        }
        if let Some(id) = self.divergence {
            config.divergence = Divergence::try_from(id)?;
        }
        if let Some(p) = self.explore_learner {
            config.explore_learner = p;
        }
        if let Some(p) = self.explore_opponent {
            config.explore_opponent = p;
        }
        if let Some(alpha) = self.alpha {
            config.learning_constant = alpha;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    mensico::log();
    let cli = Cli::parse();
    let config = cli.config()?;
    let lattice = Lattice::new(cli.cols, cli.rows)?;
    let mut session = Session::new(lattice, config)?;
    if let Some(path) = &cli.load {
        session
            .game_mut()
            .learner_mut()
            .load_strategy(path)
            .with_context(|| format!("loading strategy from {}", path.display()))?;
    }
    session.run(cli.games)?;
    if let Some(path) = &cli.errors {
        Session::write_series(path, session.errors())?;
    }
    if let Some(path) = &cli.ratios {
        Session::write_series(path, session.ratios())?;
    }
    if let Some(path) = &cli.save {
        session.game().agent(Side::Learner).save_strategy(path)?;
    }
    log::info!(
        "[train] learner won {} and lost {} of {} games",
        session.wins(Side::Learner),
        session.wins(Side::Opponent),
        cli.games,
    );
    Ok(())
}
