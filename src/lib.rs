//! Engine for MensIco, a two-agent, perfect-information, simultaneous-guess
//! board game. Each side races toward the far row while predicting the
//! opponent's next step; a correct prediction freezes the predicted side for
//! the round. Side 1 is a learning agent that adapts two row-stochastic
//! probability matrices (its own step policy and its model of the opponent)
//! after every round using one of several interchangeable update rules.
//!
//! # Module Structure
//!
//! - `lattice` — Board geometry: reachable columns per depth, sentinels
//! - `matrix` — Row-stochastic probability tables with renormalization
//! - `agent` — Decision sampling, move validation, strategy files
//! - `learning` — The interchangeable learning rules
//! - `game` — Turn state machine: freeze resolution, termination, reset
//! - `meter` — Divergence metrics between two agents' matrix pairs
//! - `session` — Multi-game harness: win/error series, delimited logging
//! - `config` — Explicit tunables replacing process-wide globals

mod agent;
mod config;
mod error;
mod game;
mod lattice;
mod learning;
mod matrix;
mod meter;
mod session;

pub use agent::*;
pub use config::*;
pub use error::*;
pub use game::*;
pub use lattice::*;
pub use learning::*;
pub use matrix::*;
pub use meter::*;
pub use session::*;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Matrix weights, sampling distributions, and exploration parameters.
pub type Probability = f64;
/// Divergence values produced by the error meter.
pub type Energy = f64;

// ============================================================================
// BOARD PARAMETERS
// ============================================================================
/// Default number of usable columns (excluding the two sentinel columns).
pub const DEFAULT_COLS: usize = 5;
/// Default number of depth rows; the goal row is `DEFAULT_ROWS - 1`.
pub const DEFAULT_ROWS: usize = 8;

// ============================================================================
// LEARNING PARAMETERS
// ============================================================================
/// Smallest weight shift used during row renormalization (2^-30).
/// Keeps shifted cells strictly positive without perturbing large weights.
pub const MINFLOAT: Probability = 1.0 / ((1u64 << 30) as Probability);
/// Default learning constant (α) for the backprop-style rules.
pub const LEARNING_CONSTANT: Probability = 0.5;
/// Multiplicative reward factor: the acted-on cell grows by 10%.
pub const FACTOR_UP: Probability = 1.1;
/// Multiplicative penalty factor: the acted-on cell shrinks by 10%.
pub const FACTOR_DOWN: Probability = 0.9;
/// Lower substitute for out-of-range boosting error estimates (ε < 0.5).
pub const BOOST_FLOOR: Probability = 0.6;
/// Upper substitute for out-of-range boosting error estimates (ε ≥ 1.0).
pub const BOOST_CEIL: Probability = 0.9;
/// Common fixed-point denominator for the Bayesian counting rule.
pub const RATIONAL_SCALE: u64 = 1 << 32;

// ============================================================================
// NUMERIC TOLERANCES
// ============================================================================
/// Row-stochastic tolerance enforced after any mutating operation.
pub const ROW_SUM_TOLERANCE: Probability = 1e-9;
/// Looser tolerance for rows that survived a text round-trip.
pub const LOAD_SUM_TOLERANCE: Probability = 1e-6;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging: INFO to the terminal, full per-round DEBUG
/// detail to a timestamped file under `logs/`. Filtered to this crate and
/// its binaries so dependency noise never reaches the round traces.
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .add_filter_allow_str("mensico")
        .add_filter_allow_str("train")
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/mensico-{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
