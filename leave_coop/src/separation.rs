//! Partnership dissolution: random (exogenous) and chosen (endogenous).

use crate::genome::Action;
use crate::population::Population;
use rand::Rng;

/// Per-agent break probability such that a partnership, tested by both
/// partners, survives a round with probability `1 - 1/mean_interactions`.
///
/// Partnership length is then geometric with mean `mean_interactions`.
pub fn exogenous_break_probability(mean_interactions: f64) -> f64 {
    1.0 - (1.0 - 1.0 / mean_interactions).sqrt()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeparationReport {
    /// Agents left unpartnered by exogenous separation, the revision pool.
    pub exogenous_pool: Vec<usize>,
    pub exogenous_breaks: usize,
    pub endogenous_breaks: usize,
}

/// Each partnered agent breaks up independently with the calibrated probability.
///
/// Returns both former partners of every dissolved pair.
pub fn separate_exogenously<R: Rng>(
    population: &mut Population,
    mean_interactions: f64,
    rng: &mut R,
) -> Vec<usize> {
    let p = exogenous_break_probability(mean_interactions);
    let mut pool = Vec::new();
    for i in 0..population.len() {
        if !population.agent(i).is_partnered() {
            continue;
        }
        if rng.random_bool(p) {
            if let Some(partner) = population.break_partnership(i) {
                pool.push(i);
                pool.push(partner);
            }
        }
    }
    pool
}

/// Dissolve every partnership in which an agent intends to leave.
///
/// Returns the number of partnerships dissolved.
pub fn separate_endogenously(population: &mut Population) -> usize {
    let mut breaks = 0;
    for i in 0..population.len() {
        let agent = population.agent(i);
        if agent.is_partnered() && agent.next_action() == Action::Leave {
            population.break_partnership(i);
            breaks += 1;
        }
    }
    breaks
}

/// Exogenous separation, then (with the leave option) endogenous separation.
pub fn separate<R: Rng>(
    population: &mut Population,
    mean_interactions: f64,
    leave_option: bool,
    rng: &mut R,
) -> SeparationReport {
    let exogenous_pool = separate_exogenously(population, mean_interactions, rng);
    let exogenous_breaks = exogenous_pool.len() / 2;
    let endogenous_breaks = if leave_option {
        separate_endogenously(population)
    } else {
        0
    };
    SeparationReport {
        exogenous_pool,
        exogenous_breaks,
        endogenous_breaks,
    }
}
