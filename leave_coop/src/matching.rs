//! Pairing, play and intention updates for one round.

use crate::genome::{Action, Context};
use crate::population::Population;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

// ============================================================================
// Payoff Calculation
// ============================================================================

/// Payoff table indexed by (own action, partner action).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payoffs {
    pub cc: f64, // Reward
    pub cd: f64, // Sucker
    pub dc: f64, // Temptation
    pub dd: f64, // Punishment
}

impl Payoffs {
    pub fn payoff(&self, own: Action, partner: Action) -> f64 {
        match Context::of(own, partner) {
            Context::CC => self.cc,
            Context::CD => self.cd,
            Context::DC => self.dc,
            Context::DD => self.dd,
        }
    }
}

impl Default for Payoffs {
    fn default() -> Self {
        Payoffs {
            cc: 3.0,
            cd: 0.0,
            dc: 5.0,
            dd: 1.0,
        }
    }
}

// ============================================================================
// Round
// ============================================================================

/// Pair up every unpartnered agent at random; returns the number of new pairs.
///
/// Continuing partnerships are marked as not new. With an odd number of
/// unpartnered agents one of them sits out the round.
pub fn form_pairs<R: Rng>(population: &mut Population, rng: &mut R) -> usize {
    let mut eligible = Vec::new();
    for (i, agent) in population.agents_mut().iter_mut().enumerate() {
        agent.set_new_partnership(false);
        if !agent.is_partnered() {
            eligible.push(i);
        }
    }

    eligible.shuffle(rng);
    let mut formed = 0;
    for pair in eligible.chunks_exact(2) {
        population.join(pair[0], pair[1]);
        population.agent_mut(pair[0]).set_new_partnership(true);
        population.agent_mut(pair[1]).set_new_partnership(true);
        formed += 1;
    }
    formed
}

/// Every partnered agent plays its next action, flipped with probability
/// `action_error`, and collects its payoff against its partner.
pub fn play_round<R: Rng>(
    population: &mut Population,
    payoffs: &Payoffs,
    action_error: f64,
    rng: &mut R,
) {
    for agent in population.agents_mut() {
        if !agent.is_partnered() {
            agent.sit_out();
            continue;
        }
        let intended = agent.next_action();
        debug_assert_ne!(intended, Action::Leave, "leave must be resolved before play");
        let active = if rng.random_bool(action_error) {
            intended.flipped()
        } else {
            intended
        };
        agent.record_play(active);
    }

    for i in 0..population.len() {
        if let Some((own, partner)) = round_actions(population, i) {
            population.agent_mut(i).record_payoff(payoffs.payoff(own, partner));
        }
    }
}

/// Set each partnered agent's next action from its genome and the round's outcome.
///
/// The result may be Leave, which separation resolves before the next round.
pub fn update_intentions(population: &mut Population) {
    for i in 0..population.len() {
        if let Some((own, partner)) = round_actions(population, i) {
            let next = population
                .agent(i)
                .genome()
                .response(Context::of(own, partner));
            population.agent_mut(i).set_next_action(next);
        }
    }
}

/// (own, partner) active actions of agent `i` this round.
pub(crate) fn round_actions(population: &Population, i: usize) -> Option<(Action, Action)> {
    let agent = population.agent(i);
    let partner = population.agent(agent.partner()?);
    Some((agent.active_action()?, partner.active_action()?))
}
