//! Export of run results for analysis outside the simulation.
//!
//! Per-step rows go to CSV; a run summary with the configuration and final
//! strategy mix goes to JSON.

use crate::config::SimulationConfig;
use crate::driver::RunReport;
use crate::error::Result;
use crate::genome::Context;
use crate::statistics::StepStats;
use crate::strategy_space::StrategySpace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;

/// One flat CSV row per step. Context columns are shares of the population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRow {
    pub step: usize,
    pub population: usize,
    pub pairs_played: usize,
    pub share_cc: f64,
    pub share_cd: f64,
    pub share_dd: f64,
    pub cc_cooperate: f64,
    pub cc_defect: f64,
    pub cc_leave: f64,
    pub cd_cooperate: f64,
    pub cd_defect: f64,
    pub cd_leave: f64,
    pub dc_cooperate: f64,
    pub dc_defect: f64,
    pub dc_leave: f64,
    pub dd_cooperate: f64,
    pub dd_defect: f64,
    pub dd_leave: f64,
    pub first_move_cooperate: f64,
    pub mean_payoff: Option<f64>,
    pub mean_payoff_new: Option<f64>,
    pub unpartnered_share: f64,
    pub exogenous_breaks: usize,
    pub endogenous_breaks: usize,
    pub revised: usize,
    pub mutated: usize,
    pub dominant_strategy: Option<String>,
}

impl StepRow {
    pub fn from_stats(stats: &StepStats, space: &StrategySpace) -> Self {
        let shares = |context: Context| stats.context(context).shares(stats.population);
        let (cc_cooperate, cc_defect, cc_leave) = shares(Context::CC);
        let (cd_cooperate, cd_defect, cd_leave) = shares(Context::CD);
        let (dc_cooperate, dc_defect, dc_leave) = shares(Context::DC);
        let (dd_cooperate, dd_defect, dd_leave) = shares(Context::DD);

        StepRow {
            step: stats.step,
            population: stats.population,
            pairs_played: stats.pairs_played,
            share_cc: stats.outcomes.cc,
            share_cd: stats.outcomes.cd,
            share_dd: stats.outcomes.dd,
            cc_cooperate,
            cc_defect,
            cc_leave,
            cd_cooperate,
            cd_defect,
            cd_leave,
            dc_cooperate,
            dc_defect,
            dc_leave,
            dd_cooperate,
            dd_defect,
            dd_leave,
            first_move_cooperate: stats.first_move_cooperator_share(),
            mean_payoff: stats.mean_payoff,
            mean_payoff_new: stats.mean_payoff_new,
            unpartnered_share: stats.unpartnered_share,
            exogenous_breaks: stats.exogenous_breaks,
            endogenous_breaks: stats.endogenous_breaks,
            revised: stats.revised,
            mutated: stats.mutated,
            dominant_strategy: stats
                .dominant_strategy()
                .and_then(|(id, _)| space.name_of(id).ok()),
        }
    }
}

pub fn write_csv<W: io::Write>(writer: W, rows: &[StepRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Run-level summary for JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub config: SimulationConfig,
    pub steps: usize,
    /// Means over the last `tail` steps.
    pub tail: usize,
    pub mean_share_cc: f64,
    pub mean_share_dd: f64,
    pub mean_payoff: f64,
    pub mean_unpartnered_share: f64,
    /// Final strategy mix by genome name, strategies with no holders omitted.
    pub final_histogram: BTreeMap<String, usize>,
}

impl RunSummary {
    /// Summarise `report`, averaging the last `tail` steps.
    pub fn from_report(report: &RunReport, space: &StrategySpace, tail: usize) -> Self {
        let window = &report.series[report.series.len().saturating_sub(tail)..];
        let average = |f: &dyn Fn(&StepStats) -> f64| {
            if window.is_empty() {
                0.0
            } else {
                window.iter().map(f).sum::<f64>() / window.len() as f64
            }
        };

        let final_histogram = report
            .series
            .last()
            .map(|last| {
                last.histogram
                    .iter()
                    .enumerate()
                    .filter(|&(_, &count)| count > 0)
                    .filter_map(|(id, &count)| space.name_of(id).ok().map(|name| (name, count)))
                    .collect()
            })
            .unwrap_or_default();

        RunSummary {
            config: report.config.clone(),
            steps: report.series.len(),
            tail: window.len(),
            mean_share_cc: average(&|s: &StepStats| s.outcomes.cc),
            mean_share_dd: average(&|s: &StepStats| s.outcomes.dd),
            mean_payoff: average(&|s: &StepStats| s.mean_payoff.unwrap_or(0.0)),
            mean_unpartnered_share: average(&|s: &StepStats| s.unpartnered_share),
            final_histogram,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
