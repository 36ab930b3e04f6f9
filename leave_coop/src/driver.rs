//! Drives a [`Simulation`] from the discrete-event loop.
//!
//! Event flow: `Step` at t → one simulation step → `Step` at t + 1, until the
//! configured number of steps is reached. `Reconfigure` events swap parameters
//! between steps, the way a front-end would when a slider moves.

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::simulation::Simulation;
use crate::statistics::StepStats;
use des::{Agent, EventLoop, Response};
use tracing::warn;

#[derive(Debug, Clone)]
pub enum Event {
    Step,
    Reconfigure(Box<SimulationConfig>),
}

/// Everything a run produced, as reported through `Agent::stats`.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub config: SimulationConfig,
    pub series: Vec<StepStats>,
    pub top_strategies: Vec<(String, usize)>,
}

pub struct SimulationDriver {
    simulation: Simulation,
    max_steps: usize,
    series: Vec<StepStats>,
}

impl SimulationDriver {
    pub fn new(simulation: Simulation, max_steps: usize) -> Self {
        SimulationDriver {
            simulation,
            max_steps,
            series: Vec::with_capacity(max_steps),
        }
    }

    pub fn from_config(config: SimulationConfig) -> Result<Self> {
        let max_steps = config.steps;
        Ok(Self::new(Simulation::new(config)?, max_steps))
    }
}

impl Agent<Event, RunReport> for SimulationDriver {
    fn act(&mut self, current_t: usize, event: &Event) -> Response<Event, RunReport> {
        match event {
            Event::Step => {
                if self.series.len() >= self.max_steps {
                    return Response::new();
                }
                self.series.push(self.simulation.step());
                Response::event(current_t + 1, Event::Step)
            }
            Event::Reconfigure(config) => {
                if let Err(e) = self.simulation.update_config(config.as_ref().clone()) {
                    warn!(error = %e, t = current_t, "rejected configuration change");
                }
                Response::new()
            }
        }
    }

    fn stats(&self) -> RunReport {
        RunReport {
            config: self.simulation.config().clone(),
            series: self.series.clone(),
            top_strategies: self.simulation.top_strategies(10),
        }
    }
}

/// Build an event loop that runs `config.steps` steps, applying each
/// `(step, config)` change before that step is played.
pub fn build_event_loop(
    config: SimulationConfig,
    changes: Vec<(usize, SimulationConfig)>,
) -> Result<EventLoop<Event, RunReport>> {
    let driver = SimulationDriver::from_config(config)?;
    let mut events = Vec::with_capacity(changes.len() + 1);
    // Reconfigure events are queued first so they win ties with the step at the same time.
    for (t, change) in changes {
        events.push((t, Event::Reconfigure(Box::new(change))));
    }
    events.push((0, Event::Step));
    let agents: Vec<Box<dyn Agent<Event, RunReport>>> = vec![Box::new(driver)];
    Ok(EventLoop::new(events, agents))
}

/// Run a single configuration through the event loop and return its report.
pub fn run_to_completion(config: SimulationConfig) -> Result<RunReport> {
    let steps = config.steps;
    let mut event_loop = build_event_loop(config, Vec::new())?;
    event_loop.run(steps);
    Ok(event_loop
        .stats()
        .pop()
        .expect("event loop holds the simulation driver"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(steps: usize) -> SimulationConfig {
        SimulationConfig {
            steps,
            population_size: 16,
            ..SimulationConfig::baseline()
        }
    }

    #[test]
    fn runs_exactly_the_configured_steps() {
        let report = run_to_completion(small(25)).unwrap();
        assert_eq!(report.series.len(), 25);
        let steps: Vec<usize> = report.series.iter().map(|s| s.step).collect();
        assert_eq!(steps, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn event_loop_matches_direct_stepping() {
        let report = run_to_completion(small(30)).unwrap();
        let mut simulation = Simulation::new(small(30)).unwrap();
        assert_eq!(report.series, simulation.run(30));
    }

    #[test]
    fn reconfigure_event_applies_before_step() {
        let mut bigger = small(10);
        bigger.population_size = 40;
        let mut event_loop = build_event_loop(small(10), vec![(4, bigger)]).unwrap();
        event_loop.run(10);
        let report = event_loop.stats().pop().unwrap();

        // Step 4 is played at the old size and corrected at its end.
        assert_eq!(report.series[4].population, 16);
        assert_eq!(report.series[5].population, 40);
        assert_eq!(report.config.population_size, 40);
    }

    #[test]
    fn rejected_reconfigure_leaves_run_untouched() {
        let mut no_leave = small(6);
        no_leave.leave_option = false;
        let mut event_loop = build_event_loop(small(6), vec![(2, no_leave)]).unwrap();
        event_loop.run(6);
        let report = event_loop.stats().pop().unwrap();

        assert!(report.config.leave_option);
        assert_eq!(report.series.len(), 6);
    }
}
