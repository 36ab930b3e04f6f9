//! Enumeration of every strategy reachable under the active alphabet.

use crate::error::{Result, SimulationError};
use crate::genome::{self, Alphabet, Genome, StrategyId};
use std::ops::Range;

/// Well-known memory-one strategies, `(alias, genome name)`.
const ALIASES: [(&str, &str); 7] = [
    ("always-cooperate", "C-C-C-C-C"),
    ("always-defect", "D-D-D-D-D"),
    ("tit-for-tat", "C-C-D-C-D"),
    ("win-stay-lose-shift", "C-C-D-D-C"),
    ("grim", "C-C-D-D-D"),
    ("out-for-tat", "C-C-L-C-L"),
    ("always-leave", "D-L-L-L-L"),
];

#[derive(Clone, Debug)]
pub struct StrategySpace {
    alphabet: Alphabet,
    genomes: Vec<Genome>,
}

impl StrategySpace {
    pub fn new(alphabet: Alphabet) -> Self {
        let genomes = (0..alphabet.strategy_count())
            .map(|id| genome::decode(id, alphabet))
            .collect::<Result<Vec<_>>>()
            .expect("every id below strategy_count decodes");
        StrategySpace { alphabet, genomes }
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn ids(&self) -> Range<StrategyId> {
        0..self.genomes.len()
    }

    pub fn genome(&self, id: StrategyId) -> Result<Genome> {
        self.genomes
            .get(id)
            .copied()
            .ok_or(SimulationError::InvalidStrategyId {
                id,
                count: self.genomes.len(),
            })
    }

    pub fn encode(&self, genome: &Genome) -> Result<StrategyId> {
        genome::encode(genome, self.alphabet)
    }

    pub fn id_of(&self, name: &str) -> Result<StrategyId> {
        genome::name_to_id(name, self.alphabet)
    }

    pub fn name_of(&self, id: StrategyId) -> Result<String> {
        Ok(self.genome(id)?.to_string())
    }

    /// Accepts an alias (e.g. `tit-for-tat`) or a literal genome name.
    pub fn resolve(&self, token: &str) -> Result<StrategyId> {
        let token = token.trim();
        match ALIASES.iter().find(|(alias, _)| alias.eq_ignore_ascii_case(token)) {
            Some((_, name)) => self.id_of(name),
            None => self.id_of(token),
        }
    }

    /// Aliases usable under this alphabet.
    pub fn aliases(&self) -> Vec<(&'static str, StrategyId)> {
        ALIASES
            .iter()
            .filter_map(|(alias, name)| self.id_of(name).ok().map(|id| (*alias, id)))
            .collect()
    }
}
