//! Run parameters.

use crate::error::{Result, SimulationError};
use crate::genome::Alphabet;
use crate::matching::Payoffs;
use crate::population::Seeding;
use crate::strategy_space::StrategySpace;
use serde::{Deserialize, Serialize};

/// `initial_strategy` value meaning "draw every gene at random".
pub const RANDOM_STRATEGY: &str = "random";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub steps: usize,
    pub population_size: usize,
    pub payoffs: Payoffs,
    /// Probability that a played action is flipped.
    pub action_error: f64,
    /// Expected number of rounds a partnership lasts without leaving.
    pub mean_interactions: f64,
    pub prob_revision: f64,
    pub prob_experimentation: f64,
    pub leave_option: bool,
    /// [`RANDOM_STRATEGY`], a strategy alias, or a genome name like `C-C-D-C-D`.
    pub initial_strategy: String,
}

impl SimulationConfig {
    pub fn baseline() -> Self {
        SimulationConfig {
            seed: 42,
            steps: 1000,
            population_size: 1000,
            payoffs: Payoffs::default(),
            action_error: 0.05,
            mean_interactions: 10.0,
            prob_revision: 0.1,
            prob_experimentation: 0.01,
            leave_option: true,
            initial_strategy: RANDOM_STRATEGY.to_string(),
        }
    }

    /// Parse and validate a TOML document; missing keys take baseline values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn alphabet(&self) -> Alphabet {
        Alphabet::from_leave_option(self.leave_option)
    }

    pub fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(invalid(format!(
                "population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        for (name, p) in [
            ("action_error", self.action_error),
            ("prob_revision", self.prob_revision),
            ("prob_experimentation", self.prob_experimentation),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(format!("{name} must lie in [0, 1], got {p}")));
            }
        }
        if !(self.mean_interactions >= 1.0 && self.mean_interactions.is_finite()) {
            return Err(invalid(format!(
                "mean_interactions must be a finite value >= 1, got {}",
                self.mean_interactions
            )));
        }
        let Payoffs { cc, cd, dc, dd } = self.payoffs;
        if ![cc, cd, dc, dd].iter().all(|v| v.is_finite()) {
            return Err(invalid("payoffs must be finite".to_string()));
        }
        self.seeding(&StrategySpace::new(self.alphabet()))?;
        Ok(())
    }

    pub fn seeding(&self, space: &StrategySpace) -> Result<Seeding> {
        if self.initial_strategy.trim().eq_ignore_ascii_case(RANDOM_STRATEGY) {
            Ok(Seeding::Random)
        } else {
            Ok(Seeding::Fixed(space.resolve(&self.initial_strategy)?))
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

fn invalid(message: String) -> SimulationError {
    SimulationError::InvalidConfig(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_is_valid() {
        assert!(SimulationConfig::baseline().validate().is_ok());
    }

    #[test]
    fn toml_overrides_baseline() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 7
            population_size = 50
            leave_option = false
            initial_strategy = "tit-for-tat"

            [payoffs]
            cc = 4.0
            cd = 0.0
            dc = 6.0
            dd = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.population_size, 50);
        assert_eq!(config.payoffs.dc, 6.0);
        assert_eq!(config.mean_interactions, 10.0);
        assert_eq!(config.alphabet(), Alphabet::CooperateDefect);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let mut config = SimulationConfig::baseline();
        config.action_error = 1.5;
        assert!(matches!(config.validate(), Err(SimulationError::InvalidConfig(_))));

        let mut config = SimulationConfig::baseline();
        config.population_size = 1;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::baseline();
        config.mean_interactions = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn leave_genome_needs_leave_option() {
        let mut config = SimulationConfig::baseline();
        config.leave_option = false;
        config.initial_strategy = "C-C-L-C-L".to_string();
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidGenomeName { .. })
        ));

        config.leave_option = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            SimulationConfig::from_toml_str("population_size = \"many\""),
            Err(SimulationError::ConfigParse(_))
        ));
    }

    #[test]
    fn seeding_token() {
        let space = StrategySpace::new(Alphabet::WithLeave);
        let mut config = SimulationConfig::baseline();
        assert_eq!(config.seeding(&space).unwrap(), Seeding::Random);
        config.initial_strategy = "D-D-D-D-D".to_string();
        assert_eq!(config.seeding(&space).unwrap(), Seeding::Fixed(121));
    }
}
