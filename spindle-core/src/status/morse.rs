//! Morse letters blinked for each controller state.

use crate::machine::SpindleState;

/// Longest letter in the table.
pub const MAX_SYMBOLS: usize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Symbol {
    Dot,
    Dash,
}

use Symbol::{Dash, Dot};

/// Ordered dot/dash sequence for one letter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MorsePattern {
    pub letter: char,
    symbols: &'static [Symbol],
}

impl MorsePattern {
    /// Panics at compile time when used in a const and `symbols` is empty or
    /// longer than [`MAX_SYMBOLS`].
    #[must_use]
    pub const fn new(letter: char, symbols: &'static [Symbol]) -> Self {
        assert!(!symbols.is_empty() && symbols.len() <= MAX_SYMBOLS);
        Self { letter, symbols }
    }

    #[must_use]
    pub const fn symbols(&self) -> &'static [Symbol] {
        self.symbols
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

const ERROR: MorsePattern = MorsePattern::new('X', &[Dash, Dot, Dot, Dash]);
const COLD_START: MorsePattern = MorsePattern::new('S', &[Dot, Dot, Dot]);
const ESTOPPED: MorsePattern = MorsePattern::new('T', &[Dash]);
const READY: MorsePattern = MorsePattern::new('R', &[Dot, Dash, Dot]);
const FWD_START: MorsePattern = MorsePattern::new('A', &[Dot, Dash]);
const FWD: MorsePattern = MorsePattern::new('B', &[Dash, Dot, Dot, Dot]);
const FWD_SPINDOWN: MorsePattern = MorsePattern::new('Z', &[Dash, Dash, Dot, Dot]);
const REV_START: MorsePattern = MorsePattern::new('I', &[Dot, Dot]);
const REV: MorsePattern = MorsePattern::new('J', &[Dot, Dash, Dash, Dash]);
const REV_SPINDOWN: MorsePattern = MorsePattern::new('K', &[Dash, Dot, Dash]);

/// Pattern blinked while the controller sits in `state`.
#[must_use]
pub const fn pattern_for(state: SpindleState) -> MorsePattern {
    match state {
        SpindleState::Error => ERROR,
        SpindleState::ColdStart => COLD_START,
        SpindleState::Estopped => ESTOPPED,
        SpindleState::Ready => READY,
        SpindleState::FwdStart => FWD_START,
        SpindleState::Fwd => FWD,
        SpindleState::FwdSpindown => FWD_SPINDOWN,
        SpindleState::RevStart => REV_START,
        SpindleState::Rev => REV,
        SpindleState::RevSpindown => REV_SPINDOWN,
    }
}

impl SpindleState {
    /// Letter blinked on the status LED for this state.
    #[must_use]
    pub const fn letter(self) -> char {
        pattern_for(self).letter
    }
}
