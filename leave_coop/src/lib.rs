//! Evolution of cooperation in a repeated Prisoner's Dilemma with a leave option.
//!
//! Agents play memory-one strategies against a partner they keep until the
//! partnership breaks, either at random (exogenous separation) or because one
//! side chooses to leave (endogenous separation). Agents freed by random
//! separation may revise their strategy by fitness-proportional imitation,
//! occasionally mutating a single gene instead.
//!
//! Components:
//! - `genome` / `strategy_space`: strategy encoding and enumeration
//! - `population`: the agent arena with symmetric partner links
//! - `matching`, `separation`, `revision`: the per-step dynamics
//! - `statistics`: what each step reports
//! - `simulation` / `driver`: step orchestration, directly or via the event loop

pub mod config;
pub mod driver;
pub mod error;
pub mod genome;
pub mod matching;
pub mod output;
pub mod population;
pub mod revision;
pub mod separation;
pub mod simulation;
pub mod statistics;
pub mod strategy_space;

pub use config::{SimulationConfig, RANDOM_STRATEGY};
pub use driver::{run_to_completion, Event, RunReport, SimulationDriver};
pub use error::{Result, SimulationError};
pub use genome::{Action, Alphabet, Context, Genome, StrategyId};
pub use matching::Payoffs;
pub use population::{Population, Seeding};
pub use simulation::Simulation;
pub use statistics::{ContextDistribution, OutcomeShares, StepStats};
pub use strategy_space::StrategySpace;
