//! Strategy genomes and their integer encoding.
//!
//! A genome is a first move plus four memory-one responses, one for each
//! outcome of the previous round. Genomes are encoded as mixed-radix integers:
//! the first move is the most significant digit (radix 2) followed by the
//! responses to CC, CD, DC and DD (radix 2, or 3 when the leave option is on).
//!
//! The textual form joins the five gene symbols with hyphens, e.g. `D-C-L-C-C`.

use crate::error::{Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type StrategyId = usize;

/// Number of conditional (response) genes.
pub const RESPONSE_GENES: usize = 4;
/// First move plus the responses.
pub const GENE_COUNT: usize = RESPONSE_GENES + 1;

// ============================================================================
// Actions
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Cooperate,
    Defect,
    Leave,
}

impl Action {
    pub fn digit(self) -> usize {
        match self {
            Action::Cooperate => 0,
            Action::Defect => 1,
            Action::Leave => 2,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Action::Cooperate => 'C',
            Action::Defect => 'D',
            Action::Leave => 'L',
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Action> {
        match symbol {
            "C" => Some(Action::Cooperate),
            "D" => Some(Action::Defect),
            "L" => Some(Action::Leave),
            _ => None,
        }
    }

    /// Swap Cooperate and Defect; Leave is never played so it is left alone.
    pub fn flipped(self) -> Action {
        match self {
            Action::Cooperate => Action::Defect,
            Action::Defect => Action::Cooperate,
            Action::Leave => Action::Leave,
        }
    }
}

// ============================================================================
// Outcome contexts
// ============================================================================

/// Joint outcome of a round from one player's point of view (own action first).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Context {
    CC,
    CD,
    DC,
    DD,
}

impl Context {
    pub const ALL: [Context; RESPONSE_GENES] = [Context::CC, Context::CD, Context::DC, Context::DD];

    /// Leave is never an active action, so anything other than Cooperate counts as Defect.
    pub fn of(own: Action, partner: Action) -> Context {
        match (own, partner) {
            (Action::Cooperate, Action::Cooperate) => Context::CC,
            (Action::Cooperate, _) => Context::CD,
            (_, Action::Cooperate) => Context::DC,
            _ => Context::DD,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Context::CC => 0,
            Context::CD => 1,
            Context::DC => 2,
            Context::DD => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Context::CC => "CC",
            Context::CD => "CD",
            Context::DC => "DC",
            Context::DD => "DD",
        }
    }
}

// ============================================================================
// Alphabet
// ============================================================================

/// Set of symbols the response genes range over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alphabet {
    CooperateDefect,
    WithLeave,
}

impl Alphabet {
    pub fn from_leave_option(leave_option: bool) -> Alphabet {
        if leave_option {
            Alphabet::WithLeave
        } else {
            Alphabet::CooperateDefect
        }
    }

    pub fn leave_enabled(self) -> bool {
        self == Alphabet::WithLeave
    }

    /// Radix of the response genes.
    pub fn radix(self) -> usize {
        match self {
            Alphabet::CooperateDefect => 2,
            Alphabet::WithLeave => 3,
        }
    }

    /// Radix of gene `index`; the first move is always binary.
    pub fn gene_radix(self, index: usize) -> usize {
        if index == 0 {
            2
        } else {
            self.radix()
        }
    }

    /// 32 without the leave option, 162 with it.
    pub fn strategy_count(self) -> usize {
        2 * self.radix().pow(RESPONSE_GENES as u32)
    }
}

// ============================================================================
// Genome
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genome {
    pub action_first: Action,
    /// Responses indexed by [`Context::index`].
    pub responses: [Action; RESPONSE_GENES],
}

impl Genome {
    pub fn new(action_first: Action, responses: [Action; RESPONSE_GENES]) -> Genome {
        Genome {
            action_first,
            responses,
        }
    }

    pub fn response(&self, context: Context) -> Action {
        self.responses[context.index()]
    }

    /// Gene 0 is the first move, genes 1..=4 the responses.
    pub fn gene(&self, index: usize) -> Action {
        if index == 0 {
            self.action_first
        } else {
            self.responses[index - 1]
        }
    }

    pub fn with_gene(mut self, index: usize, action: Action) -> Genome {
        if index == 0 {
            self.action_first = action;
        } else {
            self.responses[index - 1] = action;
        }
        self
    }

    pub fn genes(&self) -> [Action; GENE_COUNT] {
        let mut genes = [self.action_first; GENE_COUNT];
        genes[1..].copy_from_slice(&self.responses);
        genes
    }

    fn check(&self, alphabet: Alphabet) -> Result<()> {
        if self.action_first == Action::Leave {
            return Err(invalid_name(self.to_string(), "first move cannot be L"));
        }
        if !alphabet.leave_enabled() && self.responses.contains(&Action::Leave) {
            return Err(invalid_name(
                self.to_string(),
                "L is not available without the leave option",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<String> = self
            .genes()
            .iter()
            .map(|action| action.symbol().to_string())
            .collect();
        write!(f, "{}", symbols.join("-"))
    }
}

fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> SimulationError {
    SimulationError::InvalidGenomeName {
        name: name.into(),
        reason: reason.into(),
    }
}

// ============================================================================
// Codec
// ============================================================================

pub fn encode(genome: &Genome, alphabet: Alphabet) -> Result<StrategyId> {
    genome.check(alphabet)?;
    let radix = alphabet.radix();
    let id = genome
        .responses
        .iter()
        .fold(genome.action_first.digit(), |acc, response| {
            acc * radix + response.digit()
        });
    Ok(id)
}

pub fn decode(id: StrategyId, alphabet: Alphabet) -> Result<Genome> {
    let count = alphabet.strategy_count();
    if id >= count {
        return Err(SimulationError::InvalidStrategyId { id, count });
    }

    let radix = alphabet.radix();
    let mut rest = id;
    let mut responses = [Action::Cooperate; RESPONSE_GENES];
    // Least significant digit is the DD response.
    for slot in responses.iter_mut().rev() {
        *slot = digit_action(rest % radix);
        rest /= radix;
    }
    let action_first = digit_action(rest % 2);

    Ok(Genome::new(action_first, responses))
}

// Digits come from `% radix` with radix <= 3.
pub(crate) fn digit_action(digit: usize) -> Action {
    match digit {
        0 => Action::Cooperate,
        1 => Action::Defect,
        _ => Action::Leave,
    }
}

pub fn parse_name(name: &str, alphabet: Alphabet) -> Result<Genome> {
    let tokens: Vec<&str> = name.split('-').map(str::trim).collect();
    if tokens.len() != GENE_COUNT {
        return Err(invalid_name(
            name,
            format!("expected {} genes, found {}", GENE_COUNT, tokens.len()),
        ));
    }

    let mut genes = [Action::Cooperate; GENE_COUNT];
    for (gene, token) in genes.iter_mut().zip(&tokens) {
        *gene = Action::from_symbol(token)
            .ok_or_else(|| invalid_name(name, format!("unknown symbol {:?}", token)))?;
    }

    let mut responses = [Action::Cooperate; RESPONSE_GENES];
    responses.copy_from_slice(&genes[1..]);
    let genome = Genome::new(genes[0], responses);
    genome.check(alphabet).map_err(|_| {
        let reason = if genome.action_first == Action::Leave {
            "first move cannot be L"
        } else {
            "L is not available without the leave option"
        };
        invalid_name(name, reason)
    })?;
    Ok(genome)
}

pub fn name_to_id(name: &str, alphabet: Alphabet) -> Result<StrategyId> {
    encode(&parse_name(name, alphabet)?, alphabet)
}

pub fn id_to_name(id: StrategyId, alphabet: Alphabet) -> Result<String> {
    Ok(decode(id, alphabet)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_counts() {
        assert_eq!(Alphabet::CooperateDefect.strategy_count(), 32);
        assert_eq!(Alphabet::WithLeave.strategy_count(), 162);
    }

    #[test]
    fn decode_then_encode_is_identity() {
        for alphabet in [Alphabet::CooperateDefect, Alphabet::WithLeave] {
            for id in 0..alphabet.strategy_count() {
                let genome = decode(id, alphabet).unwrap();
                assert_eq!(encode(&genome, alphabet).unwrap(), id);
            }
        }
    }

    #[test]
    fn encode_then_decode_is_identity() {
        let symbols = [Action::Cooperate, Action::Defect, Action::Leave];
        let mut checked = 0;
        for first in [Action::Cooperate, Action::Defect] {
            for a in symbols {
                for b in symbols {
                    for c in symbols {
                        for d in symbols {
                            let genome = Genome::new(first, [a, b, c, d]);
                            let id = encode(&genome, Alphabet::WithLeave).unwrap();
                            assert_eq!(decode(id, Alphabet::WithLeave).unwrap(), genome);
                            checked += 1;
                        }
                    }
                }
            }
        }
        assert_eq!(checked, 162);
    }

    #[test]
    fn first_move_is_most_significant() {
        let all_c = Genome::new(Action::Cooperate, [Action::Cooperate; 4]);
        let d_first = all_c.with_gene(0, Action::Defect);
        assert_eq!(encode(&all_c, Alphabet::WithLeave).unwrap(), 0);
        assert_eq!(encode(&d_first, Alphabet::WithLeave).unwrap(), 81);
        assert_eq!(encode(&d_first, Alphabet::CooperateDefect).unwrap(), 16);

        let dd_leave = all_c.with_gene(4, Action::Leave);
        assert_eq!(encode(&dd_leave, Alphabet::WithLeave).unwrap(), 2);
    }

    #[test]
    fn names_round_trip() {
        for alphabet in [Alphabet::CooperateDefect, Alphabet::WithLeave] {
            for id in 0..alphabet.strategy_count() {
                let name = id_to_name(id, alphabet).unwrap();
                assert_eq!(name_to_id(&name, alphabet).unwrap(), id);
            }
        }
        assert_eq!(
            id_to_name(name_to_id("D-C-L-C-C", Alphabet::WithLeave).unwrap(), Alphabet::WithLeave)
                .unwrap(),
            "D-C-L-C-C"
        );
    }

    #[test]
    fn rejects_bad_names() {
        let cases = [
            ("C-C-C-C", Alphabet::WithLeave),
            ("C-C-C-C-C-C", Alphabet::WithLeave),
            ("C-C-X-C-C", Alphabet::WithLeave),
            ("L-C-C-C-C", Alphabet::WithLeave),
            ("C-C-L-C-C", Alphabet::CooperateDefect),
            ("", Alphabet::CooperateDefect),
        ];
        for (name, alphabet) in cases {
            assert!(
                matches!(
                    name_to_id(name, alphabet),
                    Err(SimulationError::InvalidGenomeName { .. })
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn encode_rejects_leave_outside_alphabet() {
        let genome = Genome::new(Action::Cooperate, [Action::Leave; 4]);
        assert!(encode(&genome, Alphabet::CooperateDefect).is_err());
        assert!(encode(&genome, Alphabet::WithLeave).is_ok());
    }

    #[test]
    fn decode_rejects_out_of_range_ids() {
        assert!(matches!(
            decode(32, Alphabet::CooperateDefect),
            Err(SimulationError::InvalidStrategyId { id: 32, count: 32 })
        ));
        assert!(decode(161, Alphabet::WithLeave).is_ok());
        assert!(decode(162, Alphabet::WithLeave).is_err());
    }

    #[test]
    fn context_selection() {
        use Action::*;
        assert_eq!(Context::of(Cooperate, Cooperate), Context::CC);
        assert_eq!(Context::of(Cooperate, Defect), Context::CD);
        assert_eq!(Context::of(Defect, Cooperate), Context::DC);
        assert_eq!(Context::of(Defect, Defect), Context::DD);
    }
}
