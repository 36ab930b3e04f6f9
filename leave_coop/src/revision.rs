//! Evolutionary update: fitness-proportional imitation with experimentation.

use crate::genome::{digit_action, StrategyId, GENE_COUNT};
use crate::population::Population;
use crate::strategy_space::StrategySpace;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use tracing::warn;

/// Chance that a mutation hits the first move when the leave option is on.
pub const FIRST_MOVE_MUTATION_SHARE: f64 = 0.2;

/// Summed latest-round payoff and head count per strategy id.
///
/// Rebuilt from the population every step.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyAggregates {
    pub payoff: Vec<f64>,
    pub count: Vec<usize>,
}

impl StrategyAggregates {
    pub fn compute(population: &Population, space: &StrategySpace) -> Self {
        let mut payoff = vec![0.0; space.len()];
        let mut count = vec![0; space.len()];
        for agent in population.agents() {
            payoff[agent.strategy()] += agent.payoff().unwrap_or(0.0);
            count[agent.strategy()] += 1;
        }
        StrategyAggregates { payoff, count }
    }

    /// Sampling weights; negative aggregates carry no weight.
    pub fn weights(&self) -> Vec<f64> {
        self.payoff.iter().map(|&p| p.max(0.0)).collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RevisionOutcome {
    pub revised: usize,
    pub mutated: usize,
    /// Set when no strategy had positive fitness and ids were drawn uniformly.
    pub uniform_fallback: bool,
}

/// Each pool member independently enters the revision set with `prob_revision`.
pub fn select_revision_set<R: Rng>(pool: &[usize], prob_revision: f64, rng: &mut R) -> Vec<usize> {
    pool.iter()
        .copied()
        .filter(|_| rng.random_bool(prob_revision))
        .collect()
}

/// Draw `n` strategy ids with replacement, proportionally to aggregate payoff.
///
/// With no positive weight anywhere the draw is uniform over the whole space
/// and the returned flag is set.
pub fn sample_strategies<R: Rng>(
    aggregates: &StrategyAggregates,
    n: usize,
    rng: &mut R,
) -> (Vec<StrategyId>, bool) {
    if n == 0 {
        return (Vec::new(), false);
    }
    match WeightedIndex::new(aggregates.weights()) {
        Ok(distribution) => ((0..n).map(|_| distribution.sample(rng)).collect(), false),
        Err(_) => {
            let strategies = aggregates.payoff.len();
            let ids = (0..n).map(|_| rng.random_range(0..strategies)).collect();
            (ids, true)
        }
    }
}

/// Change exactly one gene of `id` to a different symbol.
///
/// With the leave option the first move is hit with probability
/// [`FIRST_MOVE_MUTATION_SHARE`], otherwise one of the four responses moves to
/// one of its two alternatives. Without it one of the five genes is flipped.
pub fn mutate<R: Rng>(id: StrategyId, space: &StrategySpace, rng: &mut R) -> StrategyId {
    let alphabet = space.alphabet();
    let genome = space
        .genome(id)
        .expect("mutated strategy lies inside the strategy space");

    let gene = if alphabet.leave_enabled() {
        if rng.random_bool(FIRST_MOVE_MUTATION_SHARE) {
            0
        } else {
            rng.random_range(1..GENE_COUNT)
        }
    } else {
        rng.random_range(0..GENE_COUNT)
    };

    let radix = alphabet.gene_radix(gene);
    let current = genome.gene(gene).digit();
    let shift = if radix > 2 {
        1 + rng.random_range(0..radix - 1)
    } else {
        1
    };
    let mutated = genome.with_gene(gene, digit_action((current + shift) % radix));
    space
        .encode(&mutated)
        .expect("mutation stays inside the alphabet")
}

/// Revise a random subset of the exogenously separated pool.
///
/// Drawn strategies are proportional to `aggregates`; each reviser instead
/// mutates its own strategy with `prob_experimentation`.
pub fn revise<R: Rng>(
    population: &mut Population,
    space: &StrategySpace,
    aggregates: &StrategyAggregates,
    pool: &[usize],
    prob_revision: f64,
    prob_experimentation: f64,
    rng: &mut R,
) -> RevisionOutcome {
    let revisers = select_revision_set(pool, prob_revision, rng);
    let (draws, uniform_fallback) = sample_strategies(aggregates, revisers.len(), rng);
    if uniform_fallback {
        warn!(
            revisers = revisers.len(),
            "no strategy has positive payoff; revising uniformly"
        );
    }

    let mut mutated = 0;
    for (&i, &drawn) in revisers.iter().zip(&draws) {
        let strategy = if rng.random_bool(prob_experimentation) {
            mutated += 1;
            mutate(population.agent(i).strategy(), space, rng)
        } else {
            drawn
        };
        let genome = space
            .genome(strategy)
            .expect("revised strategy lies inside the strategy space");
        population.agent_mut(i).adopt(strategy, genome);
    }

    RevisionOutcome {
        revised: revisers.len(),
        mutated,
        uniform_fallback,
    }
}
