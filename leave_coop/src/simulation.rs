//! Step orchestration.
//!
//! One step runs, in order: pairing, play, intention update, statistics,
//! exogenous then endogenous separation, revision, and population correction.

use crate::config::SimulationConfig;
use crate::error::{Result, SimulationError};
use crate::matching::{form_pairs, play_round, update_intentions};
use crate::population::Population;
use crate::revision::{revise, StrategyAggregates};
use crate::separation::separate;
use crate::statistics::StepStats;
use crate::strategy_space::StrategySpace;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

pub struct Simulation {
    config: SimulationConfig,
    space: StrategySpace,
    population: Population,
    rng: StdRng,
    step: usize,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let space = StrategySpace::new(config.alphabet());
        let seeding = config.seeding(&space)?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let population = Population::initialize(config.population_size, seeding, &space, &mut rng);

        info!(
            seed = config.seed,
            population = config.population_size,
            strategies = space.len(),
            leave_option = config.leave_option,
            initial_strategy = %config.initial_strategy,
            "simulation initialised"
        );

        Ok(Simulation {
            config,
            space,
            population,
            rng,
            step: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn space(&self) -> &StrategySpace {
        &self.space
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Number of completed steps.
    pub fn current_step(&self) -> usize {
        self.step
    }

    /// Advance one step and return its statistics.
    pub fn step(&mut self) -> StepStats {
        let config = &self.config;

        form_pairs(&mut self.population, &mut self.rng);
        play_round(
            &mut self.population,
            &config.payoffs,
            config.action_error,
            &mut self.rng,
        );
        update_intentions(&mut self.population);

        let aggregates = StrategyAggregates::compute(&self.population, &self.space);
        let mut stats = StepStats::record(self.step, &self.population, &aggregates);

        let report = separate(
            &mut self.population,
            config.mean_interactions,
            config.leave_option,
            &mut self.rng,
        );
        stats.record_separation(&report);

        let outcome = revise(
            &mut self.population,
            &self.space,
            &aggregates,
            &report.exogenous_pool,
            config.prob_revision,
            config.prob_experimentation,
            &mut self.rng,
        );
        stats.record_revision(&outcome);

        self.population
            .resize_to(config.population_size, &self.space, &mut self.rng);
        debug_assert!(self.population.partners_are_symmetric());
        stats.record_unpartnered(&self.population);

        debug!(
            step = self.step,
            cc = stats.outcomes.cc,
            cd = stats.outcomes.cd,
            dd = stats.outcomes.dd,
            exogenous = stats.exogenous_breaks,
            endogenous = stats.endogenous_breaks,
            revised = stats.revised,
            mutated = stats.mutated,
            "step complete"
        );

        self.step += 1;
        stats
    }

    pub fn run(&mut self, steps: usize) -> Vec<StepStats> {
        (0..steps).map(|_| self.step()).collect()
    }

    /// Swap in new parameters between steps.
    ///
    /// The leave option fixes the strategy alphabet and cannot change. The seed
    /// only matters at construction. A new population size is reached by the
    /// correction at the end of the next step.
    pub fn update_config(&mut self, config: SimulationConfig) -> Result<()> {
        config.validate()?;
        if config.leave_option != self.config.leave_option {
            return Err(SimulationError::LeaveOptionChanged);
        }
        let seeding = config.seeding(&self.space)?;
        self.population.set_seeding(seeding);
        info!(
            step = self.step,
            population = config.population_size,
            "configuration updated"
        );
        self.config = config;
        Ok(())
    }

    /// The `n` most common strategies as `(genome name, count)`, most common first.
    pub fn top_strategies(&self, n: usize) -> Vec<(String, usize)> {
        let aggregates = StrategyAggregates::compute(&self.population, &self.space);
        let mut ranked: Vec<(usize, usize)> = aggregates
            .count
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, count)| count > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(n)
            .filter_map(|(id, count)| self.space.name_of(id).ok().map(|name| (name, count)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(initial: &str, leave_option: bool) -> SimulationConfig {
        SimulationConfig {
            population_size: 20,
            leave_option,
            initial_strategy: initial.to_string(),
            ..SimulationConfig::baseline()
        }
    }

    #[test]
    fn population_size_is_held() {
        let mut simulation = Simulation::new(config("random", true)).unwrap();
        for stats in simulation.run(50) {
            assert_eq!(stats.population, 20);
            assert_eq!(stats.histogram.iter().sum::<usize>(), 20);
        }
        assert_eq!(simulation.population().len(), 20);
        assert_eq!(simulation.current_step(), 50);
    }

    #[test]
    fn resize_mid_run() {
        let mut simulation = Simulation::new(config("random", true)).unwrap();
        simulation.run(3);

        let grown = config("always-cooperate", true).with_population(31);
        simulation.update_config(grown).unwrap();
        let stats = simulation.step();

        // The step plays with the old head count and corrects at its end.
        assert_eq!(stats.population, 20);
        assert_eq!(simulation.population().len(), 31);
        assert!(simulation.population().partners_are_symmetric());

        let shrunk = config("always-cooperate", true).with_population(8);
        simulation.update_config(shrunk).unwrap();
        simulation.step();
        assert_eq!(simulation.population().len(), 8);
        assert!(simulation.population().partners_are_symmetric());
    }

    #[test]
    fn unpartnered_share_includes_agents_added_at_step_end() {
        let mut simulation = Simulation::new(config("always-cooperate", false)).unwrap();
        simulation.run(2);

        let grown = config("always-cooperate", false).with_population(40);
        simulation.update_config(grown).unwrap();
        let stats = simulation.step();

        let population = simulation.population();
        assert_eq!(population.len(), 40);
        assert!(population.unpartnered_count() >= 20);
        assert_relative_eq!(
            stats.unpartnered_share,
            population.unpartnered_count() as f64 / 40.0
        );
    }

    #[test]
    fn leave_option_is_fixed_for_a_run() {
        let mut simulation = Simulation::new(config("random", true)).unwrap();
        assert!(matches!(
            simulation.update_config(config("random", false)),
            Err(SimulationError::LeaveOptionChanged)
        ));
    }

    #[test]
    fn invalid_initial_strategy_is_fatal() {
        assert!(matches!(
            Simulation::new(config("C-C-C", true)),
            Err(SimulationError::InvalidGenomeName { .. })
        ));
    }

    #[test]
    fn same_seed_same_history() {
        let mut a = Simulation::new(config("random", true)).unwrap();
        let mut b = Simulation::new(config("random", true)).unwrap();
        assert_eq!(a.run(40), b.run(40));
    }

    #[test]
    fn top_strategies_are_ranked() {
        let simulation = Simulation::new(config("grim", false)).unwrap();
        assert_eq!(simulation.top_strategies(3), vec![("C-C-D-D-D".to_string(), 20)]);
    }

    impl SimulationConfig {
        fn with_population(mut self, population_size: usize) -> Self {
            self.population_size = population_size;
            self
        }
    }
}
