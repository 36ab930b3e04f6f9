//! The agent arena.
//!
//! Partners are stored as indices into the arena. The relation is kept
//! symmetric by routing every change through [`Population::join`] and
//! [`Population::break_partnership`].

use crate::genome::{Action, Alphabet, Genome, StrategyId, RESPONSE_GENES};
use crate::strategy_space::StrategySpace;
use rand::Rng;
use rand::seq::index;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Seeding {
    /// Every gene drawn independently and uniformly from the active alphabet.
    Random,
    /// All agents share one strategy.
    Fixed(StrategyId),
}

#[derive(Clone, Debug)]
pub struct Agent {
    strategy: StrategyId,
    genome: Genome,
    partner: Option<usize>,
    next_action: Action,
    active_action: Option<Action>,
    payoff: Option<f64>,
    new_partnership: bool,
}

impl Agent {
    fn new(strategy: StrategyId, genome: Genome) -> Self {
        Agent {
            strategy,
            genome,
            partner: None,
            next_action: genome.action_first,
            active_action: None,
            payoff: None,
            new_partnership: false,
        }
    }

    pub fn strategy(&self) -> StrategyId {
        self.strategy
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn partner(&self) -> Option<usize> {
        self.partner
    }

    pub fn is_partnered(&self) -> bool {
        self.partner.is_some()
    }

    pub fn next_action(&self) -> Action {
        self.next_action
    }

    /// Action played in the latest round, `None` if the agent sat out.
    pub fn active_action(&self) -> Option<Action> {
        self.active_action
    }

    /// Payoff from the latest round, `None` if the agent sat out.
    pub fn payoff(&self) -> Option<f64> {
        self.payoff
    }

    pub fn is_new_partnership(&self) -> bool {
        self.new_partnership
    }

    pub(crate) fn set_next_action(&mut self, action: Action) {
        self.next_action = action;
    }

    pub(crate) fn record_play(&mut self, active_action: Action) {
        self.active_action = Some(active_action);
    }

    pub(crate) fn record_payoff(&mut self, payoff: f64) {
        self.payoff = Some(payoff);
    }

    pub(crate) fn sit_out(&mut self) {
        self.active_action = None;
        self.payoff = None;
    }

    pub(crate) fn set_new_partnership(&mut self, new_partnership: bool) {
        self.new_partnership = new_partnership;
    }

    /// Switch to a new strategy and restart from its first move.
    pub(crate) fn adopt(&mut self, strategy: StrategyId, genome: Genome) {
        debug_assert!(self.partner.is_none(), "revising agent is still partnered");
        self.strategy = strategy;
        self.genome = genome;
        self.next_action = genome.action_first;
    }
}

#[derive(Clone, Debug)]
pub struct Population {
    agents: Vec<Agent>,
    seeding: Seeding,
}

impl Population {
    pub fn initialize<R: Rng>(
        size: usize,
        seeding: Seeding,
        space: &StrategySpace,
        rng: &mut R,
    ) -> Self {
        let mut population = Population {
            agents: Vec::with_capacity(size),
            seeding,
        };
        population.grow(size, space, rng);
        population
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, index: usize) -> &Agent {
        &self.agents[index]
    }

    pub(crate) fn agent_mut(&mut self, index: usize) -> &mut Agent {
        &mut self.agents[index]
    }

    pub(crate) fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn seeding(&self) -> Seeding {
        self.seeding
    }

    /// Rule used for agents created by later top-ups.
    pub fn set_seeding(&mut self, seeding: Seeding) {
        self.seeding = seeding;
    }

    pub fn unpartnered_count(&self) -> usize {
        self.agents.iter().filter(|a| !a.is_partnered()).count()
    }

    /// Make `a` and `b` mutual partners. Both must be unpartnered.
    pub fn join(&mut self, a: usize, b: usize) {
        assert_ne!(a, b, "agent {a} cannot partner itself");
        assert!(
            self.agents[a].partner.is_none() && self.agents[b].partner.is_none(),
            "agents {a} and {b} must be unpartnered to join"
        );
        self.agents[a].partner = Some(b);
        self.agents[b].partner = Some(a);
    }

    /// Dissolve the partnership `index` holds, if any, and return the former partner.
    ///
    /// Both sides lose their partner reference and go back to their first move.
    pub fn break_partnership(&mut self, index: usize) -> Option<usize> {
        let partner = self.agents[index].partner.take()?;
        let former = &mut self.agents[partner];
        debug_assert_eq!(former.partner, Some(index));
        former.partner = None;
        former.next_action = former.genome.action_first;
        let agent = &mut self.agents[index];
        agent.next_action = agent.genome.action_first;
        Some(partner)
    }

    /// Whether every partner reference points back at its owner.
    pub fn partners_are_symmetric(&self) -> bool {
        self.agents.iter().enumerate().all(|(i, agent)| match agent.partner {
            Some(p) => p != i && p < self.agents.len() && self.agents[p].partner == Some(i),
            None => true,
        })
    }

    /// Add or remove agents until the population holds exactly `target`.
    ///
    /// New agents follow the seeding rule. Removed agents are a uniformly random
    /// subset, and their partnerships are dissolved before they go.
    pub fn resize_to<R: Rng>(&mut self, target: usize, space: &StrategySpace, rng: &mut R) {
        let current = self.agents.len();
        if current < target {
            debug!(added = target - current, "topping up population");
            self.grow(target - current, space, rng);
        } else if current > target {
            debug!(removed = current - target, "trimming population");
            self.shrink(current - target, rng);
        }
        assert_eq!(self.agents.len(), target, "population size correction failed");
    }

    fn grow<R: Rng>(&mut self, count: usize, space: &StrategySpace, rng: &mut R) {
        for _ in 0..count {
            let agent = self.spawn(space, rng);
            self.agents.push(agent);
        }
    }

    fn spawn<R: Rng>(&self, space: &StrategySpace, rng: &mut R) -> Agent {
        let strategy = match self.seeding {
            Seeding::Fixed(id) => id,
            Seeding::Random => random_strategy(space.alphabet(), rng),
        };
        let genome = space
            .genome(strategy)
            .expect("seeding strategy lies inside the strategy space");
        Agent::new(strategy, genome)
    }

    fn shrink<R: Rng>(&mut self, excess: usize, rng: &mut R) {
        let mut doomed = vec![false; self.agents.len()];
        for victim in index::sample(rng, self.agents.len(), excess).into_iter() {
            self.break_partnership(victim);
            doomed[victim] = true;
        }

        // Survivors are compacted in order; remap their partner handles.
        let mut remap = vec![None; self.agents.len()];
        let mut next = 0;
        for (old, gone) in doomed.iter().enumerate() {
            if !gone {
                remap[old] = Some(next);
                next += 1;
            }
        }

        let agents = std::mem::take(&mut self.agents);
        self.agents = agents
            .into_iter()
            .zip(doomed)
            .filter(|(_, gone)| !gone)
            .map(|(mut agent, _)| {
                agent.partner = agent.partner.and_then(|p| remap[p]);
                agent
            })
            .collect();
    }
}

/// Draw each gene independently from its own alphabet.
fn random_strategy<R: Rng>(alphabet: Alphabet, rng: &mut R) -> StrategyId {
    let radix = alphabet.radix();
    (0..RESPONSE_GENES).fold(rng.random_range(0..2), |id, _| {
        id * radix + rng.random_range(0..radix)
    })
}
