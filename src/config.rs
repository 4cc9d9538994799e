use crate::*;

/// Engine tunables, passed into [`Game`] construction.
///
/// These were process-wide mutable globals in earlier incarnations of the
/// game; carrying them explicitly keeps concurrent games independent.
///
/// Exploration probabilities select between the learned distribution
/// (probability `explore_*`) and a uniform pick among live candidates.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exploitation probability for the learning side.
    pub explore_learner: Probability,
    /// Exploitation probability for the static opponent.
    pub explore_opponent: Probability,
    /// Learning constant (α) for the backprop-style rules.
    pub learning_constant: Probability,
    /// Update rule applied after every round.
    pub learning: LearningRule,
    /// Divergence metric used by the error meter.
    pub divergence: Divergence,
    /// Seed for reproducible decision sampling; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            explore_learner: 1.0,
            explore_opponent: 1.0,
            learning_constant: LEARNING_CONSTANT,
            learning: LearningRule::BackpropSum,
            divergence: Divergence::KullbackLeibler,
            seed: None,
        }
    }
}

impl Config {
    /// Loads a configuration from a JSON file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.explore_learner) {
            return Err(Error::Config(format!(
                "explore_learner must be within [0, 1], got {}",
                self.explore_learner
            )));
        }
        if !(0.0..=1.0).contains(&self.explore_opponent) {
            return Err(Error::Config(format!(
                "explore_opponent must be within [0, 1], got {}",
                self.explore_opponent
            )));
        }
        if !self.learning_constant.is_finite() || self.learning_constant <= 0.0 {
            return Err(Error::Config(format!(
                "learning_constant must be positive, got {}",
                self.learning_constant
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_reference_globals() {
        let config = Config::default();
        assert_eq!(config.explore_learner, 1.0);
        assert_eq!(config.explore_opponent, 1.0);
        assert_eq!(config.learning_constant, 0.5);
        assert_eq!(config.learning, LearningRule::BackpropSum);
        assert_eq!(config.divergence, Divergence::KullbackLeibler);
    }

    #[test]
    fn validation_bounds_the_probabilities() {
        let mut config = Config::default();
        config.explore_learner = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.explore_learner = 1.0;
        config.learning_constant = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn loads_partial_json_over_defaults() {
        let path = std::env::temp_dir().join("mensico_config.json");
        std::fs::write(&path, r#"{ "learning": "Multiplicative", "seed": 9 }"#).unwrap();
        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.learning, LearningRule::Multiplicative);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.explore_learner, 1.0);
    }
}
