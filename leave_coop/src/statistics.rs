//! Per-step population statistics.

use crate::genome::{Action, Context, StrategyId, RESPONSE_GENES};
use crate::matching::round_actions;
use crate::population::Population;
use crate::revision::{RevisionOutcome, StrategyAggregates};
use crate::separation::SeparationReport;
use serde::{Deserialize, Serialize};

/// Shares of pairs that played ending in mutual cooperation, mixed play, or mutual defection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeShares {
    pub cc: f64,
    pub cd: f64,
    pub dd: f64,
}

/// How many agents respond to one context with each action.
///
/// `leave` only counts agents whose first move is Defect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDistribution {
    pub cooperate: usize,
    pub defect: usize,
    pub leave: usize,
}

impl ContextDistribution {
    /// Counts as fractions of `population`.
    pub fn shares(&self, population: usize) -> (f64, f64, f64) {
        if population == 0 {
            return (0.0, 0.0, 0.0);
        }
        let n = population as f64;
        (
            self.cooperate as f64 / n,
            self.defect as f64 / n,
            self.leave as f64 / n,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    pub step: usize,
    pub population: usize,
    pub pairs_played: usize,
    pub outcomes: OutcomeShares,
    /// Indexed by [`Context::index`].
    pub contexts: [ContextDistribution; RESPONSE_GENES],
    pub first_move_cooperators: usize,
    /// Head count per strategy id over the whole strategy space.
    pub histogram: Vec<usize>,
    /// Mean over the whole population, agents that sat out counting as 0.
    pub mean_payoff: Option<f64>,
    /// Mean over agents whose partnership started this round.
    pub mean_payoff_new: Option<f64>,
    /// Measured at the end of the step, after revision and resizing.
    pub unpartnered_share: f64,
    pub exogenous_breaks: usize,
    pub endogenous_breaks: usize,
    pub revised: usize,
    pub mutated: usize,
}

impl StepStats {
    /// Summarise the round just played.
    pub fn record(step: usize, population: &Population, aggregates: &StrategyAggregates) -> Self {
        let mut pair_outcomes = [0usize; 3];
        for i in 0..population.len() {
            // Count each pair once, from its lower-indexed member.
            let Some(partner) = population.agent(i).partner() else {
                continue;
            };
            if partner < i {
                continue;
            }
            if let Some((own, other)) = round_actions(population, i) {
                let slot = match Context::of(own, other) {
                    Context::CC => 0,
                    Context::CD | Context::DC => 1,
                    Context::DD => 2,
                };
                pair_outcomes[slot] += 1;
            }
        }
        let pairs_played: usize = pair_outcomes.iter().sum();
        let outcomes = if pairs_played == 0 {
            OutcomeShares::default()
        } else {
            let n = pairs_played as f64;
            OutcomeShares {
                cc: pair_outcomes[0] as f64 / n,
                cd: pair_outcomes[1] as f64 / n,
                dd: pair_outcomes[2] as f64 / n,
            }
        };

        let mut contexts = [ContextDistribution::default(); RESPONSE_GENES];
        let mut first_move_cooperators = 0;
        for agent in population.agents() {
            let genome = agent.genome();
            if genome.action_first == Action::Cooperate {
                first_move_cooperators += 1;
            }
            for context in Context::ALL {
                let tally = &mut contexts[context.index()];
                match genome.response(context) {
                    Action::Cooperate => tally.cooperate += 1,
                    Action::Defect => tally.defect += 1,
                    Action::Leave if genome.action_first == Action::Defect => tally.leave += 1,
                    Action::Leave => {}
                }
            }
        }

        // Agents that sat out count as earning nothing.
        let mean_payoff = mean(population.agents().iter().map(|a| a.payoff().unwrap_or(0.0)));
        let mean_payoff_new = mean(
            population
                .agents()
                .iter()
                .filter(|a| a.is_new_partnership())
                .filter_map(|a| a.payoff()),
        );

        StepStats {
            step,
            population: population.len(),
            pairs_played,
            outcomes,
            contexts,
            first_move_cooperators,
            histogram: aggregates.count.clone(),
            mean_payoff,
            mean_payoff_new,
            unpartnered_share: 0.0,
            exogenous_breaks: 0,
            endogenous_breaks: 0,
            revised: 0,
            mutated: 0,
        }
    }

    pub fn record_separation(&mut self, report: &SeparationReport) {
        self.exogenous_breaks = report.exogenous_breaks;
        self.endogenous_breaks = report.endogenous_breaks;
    }

    /// Snapshot of the population once the step has fully completed.
    pub fn record_unpartnered(&mut self, population: &Population) {
        self.unpartnered_share = if population.is_empty() {
            0.0
        } else {
            population.unpartnered_count() as f64 / population.len() as f64
        };
    }

    pub fn record_revision(&mut self, outcome: &RevisionOutcome) {
        self.revised = outcome.revised;
        self.mutated = outcome.mutated;
    }

    pub fn context(&self, context: Context) -> &ContextDistribution {
        &self.contexts[context.index()]
    }

    /// Most common strategy, lowest id on ties.
    pub fn dominant_strategy(&self) -> Option<(StrategyId, usize)> {
        self.histogram
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, count)| count > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
    }

    pub fn first_move_cooperator_share(&self) -> f64 {
        if self.population == 0 {
            0.0
        } else {
            self.first_move_cooperators as f64 / self.population as f64
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Alphabet;
    use crate::matching::{form_pairs, play_round, Payoffs};
    use crate::population::Seeding;
    use crate::strategy_space::StrategySpace;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn played(
        seeding_names: &[&str],
        alphabet: Alphabet,
        error: f64,
        seed: u64,
    ) -> (Population, StrategySpace) {
        let mut rng = StdRng::seed_from_u64(seed);
        let space = StrategySpace::new(alphabet);
        let first = space.resolve(seeding_names[0]).unwrap();
        let mut population = Population::initialize(0, Seeding::Fixed(first), &space, &mut rng);
        for (k, name) in seeding_names.iter().enumerate() {
            population.set_seeding(Seeding::Fixed(space.resolve(name).unwrap()));
            population.resize_to(k + 1, &space, &mut rng);
        }
        form_pairs(&mut population, &mut rng);
        play_round(&mut population, &Payoffs::default(), error, &mut rng);
        (population, space)
    }

    #[test]
    fn outcome_shares_sum_to_one() {
        let names = [
            "always-cooperate",
            "always-defect",
            "tit-for-tat",
            "grim",
            "always-defect",
            "always-cooperate",
            "grim",
            "tit-for-tat",
        ];
        let (population, space) = played(&names, Alphabet::CooperateDefect, 0.3, 12);
        let aggregates = StrategyAggregates::compute(&population, &space);

        let stats = StepStats::record(0, &population, &aggregates);

        assert_eq!(stats.pairs_played, 4);
        assert_relative_eq!(stats.outcomes.cc + stats.outcomes.cd + stats.outcomes.dd, 1.0);
        assert_eq!(stats.histogram.iter().sum::<usize>(), 8);
    }

    #[test]
    fn mutual_defection_everywhere() {
        let (population, space) =
            played(&["always-defect"; 4], Alphabet::CooperateDefect, 0.0, 1);
        let aggregates = StrategyAggregates::compute(&population, &space);

        let stats = StepStats::record(3, &population, &aggregates);

        assert_eq!(stats.step, 3);
        assert_eq!(stats.outcomes, OutcomeShares { cc: 0.0, cd: 0.0, dd: 1.0 });
        assert_eq!(stats.mean_payoff, Some(1.0));
        assert_eq!(stats.mean_payoff_new, Some(1.0));
        assert_eq!(stats.first_move_cooperators, 0);
        assert_eq!(stats.dominant_strategy(), Some((31, 4)));
        for context in Context::ALL {
            let expected = ContextDistribution { cooperate: 0, defect: 4, leave: 0 };
            assert_eq!(*stats.context(context), expected);
        }
    }

    #[test]
    fn leave_tally_only_counts_defecting_openers() {
        let (population, space) =
            played(&["out-for-tat", "always-leave"], Alphabet::WithLeave, 0.0, 1);
        let aggregates = StrategyAggregates::compute(&population, &space);

        let stats = StepStats::record(0, &population, &aggregates);

        // out-for-tat opens with C, so its L responses are not tallied.
        let cd = stats.context(Context::CD);
        assert_eq!((cd.cooperate, cd.defect, cd.leave), (0, 0, 1));
        let cc = stats.context(Context::CC);
        assert_eq!((cc.cooperate, cc.defect, cc.leave), (1, 0, 1));
        assert_eq!(cc.shares(2), (0.5, 0.0, 0.5));
        assert_eq!(stats.first_move_cooperators, 1);
    }

    #[test]
    fn agent_sitting_out_counts_as_zero_payoff() {
        let (population, space) =
            played(&["always-cooperate"; 3], Alphabet::CooperateDefect, 0.0, 4);
        let aggregates = StrategyAggregates::compute(&population, &space);

        let stats = StepStats::record(0, &population, &aggregates);

        assert_eq!(stats.pairs_played, 1);
        assert_eq!(stats.outcomes.cc, 1.0);
        assert_relative_eq!(stats.mean_payoff.unwrap(), 2.0);
        assert_eq!(stats.mean_payoff_new, Some(3.0));
        // Same total as the revision aggregates.
        let total: f64 = aggregates.payoff.iter().sum();
        assert_relative_eq!(stats.mean_payoff.unwrap() * 3.0, total);
        assert_eq!(stats.histogram.iter().sum::<usize>(), 3);
    }

    #[test]
    fn separation_and_revision_counts_are_recorded() {
        let (mut population, space) =
            played(&["always-cooperate"; 4], Alphabet::CooperateDefect, 0.0, 4);
        let aggregates = StrategyAggregates::compute(&population, &space);
        let mut stats = StepStats::record(0, &population, &aggregates);

        let former = population.break_partnership(0).unwrap();
        let report = SeparationReport {
            exogenous_pool: vec![0, former],
            exogenous_breaks: 1,
            endogenous_breaks: 0,
        };
        stats.record_separation(&report);
        stats.record_revision(&RevisionOutcome { revised: 2, mutated: 1, uniform_fallback: false });
        stats.record_unpartnered(&population);

        assert_eq!(stats.unpartnered_share, 0.5);
        assert_eq!(stats.exogenous_breaks, 1);
        assert_eq!((stats.revised, stats.mutated), (2, 1));
    }
}
