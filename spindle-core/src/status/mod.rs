//! Non-blocking status LED sequencer.
//!
//! The current state is shown as a repeating Morse letter. A sequence is a
//! list of phase durations: index 0 is the silent inter-letter gap, then an
//! (on, off) pair per symbol. Odd phases light the LED. The sequencer only
//! compares deadlines against the tick clock, so it is correct at any polling
//! rate.

use crate::config::StatusTiming;
use crate::machine::SpindleState;
use crate::timer::{Ticks, deadline_reached};

pub mod morse;

pub use morse::{MAX_SYMBOLS, MorsePattern, Symbol, pattern_for};

/// Longest sequence: the gap plus an on/off pair per symbol.
pub const MAX_PHASES: usize = 1 + 2 * MAX_SYMBOLS;

/// Phase durations (milliseconds) for one letter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSequence {
    phases: [u32; MAX_PHASES],
    len: usize,
}

impl StatusSequence {
    /// Lays out `pattern` using `timing`.
    #[must_use]
    pub fn build(pattern: MorsePattern, timing: &StatusTiming) -> Self {
        let mut phases = [0; MAX_PHASES];
        phases[0] = timing.gap_ms();
        let mut len = 1;
        for symbol in pattern.symbols().iter().take(MAX_SYMBOLS) {
            phases[len] = match symbol {
                Symbol::Dot => timing.dot_ms(),
                Symbol::Dash => timing.dash_ms(),
            };
            phases[len + 1] = timing.interval_ms();
            len += 2;
        }
        Self { phases, len }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.phases[..self.len]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Duration of phase `index`, wrapping around the sequence.
    #[must_use]
    pub const fn duration(&self, index: usize) -> u32 {
        self.phases[index % self.len]
    }

    /// Total length of one repetition.
    #[must_use]
    pub fn period(&self) -> u32 {
        self.as_slice().iter().sum()
    }
}

/// Drives the status LED from the observed state.
#[derive(Clone, Debug)]
pub struct StatusSequencer {
    timing: StatusTiming,
    shown: Option<SpindleState>,
    sequence: StatusSequence,
    phase: usize,
    deadline: Ticks,
}

impl StatusSequencer {
    #[must_use]
    pub fn new(timing: StatusTiming) -> Self {
        Self {
            timing,
            shown: None,
            sequence: StatusSequence::build(pattern_for(SpindleState::ColdStart), &timing),
            phase: 0,
            deadline: 0,
        }
    }

    /// Updates the sequencer and returns whether the LED should be lit.
    ///
    /// A state different from the one last shown restarts the sequence at the
    /// gap; otherwise the cursor advances once the current phase has run out.
    pub fn poll(&mut self, state: SpindleState, now: Ticks) -> bool {
        if self.shown != Some(state) {
            self.sequence = StatusSequence::build(pattern_for(state), &self.timing);
            self.shown = Some(state);
            self.phase = 0;
            self.deadline = now.wrapping_add(self.sequence.duration(0));
        } else if deadline_reached(now, self.deadline) {
            self.phase = (self.phase + 1) % self.sequence.len();
            self.deadline = now.wrapping_add(self.sequence.duration(self.phase));
        }
        self.is_lit()
    }

    #[must_use]
    pub const fn is_lit(&self) -> bool {
        self.phase % 2 == 1
    }

    #[must_use]
    pub const fn phase(&self) -> usize {
        self.phase
    }

    #[must_use]
    pub const fn deadline(&self) -> Ticks {
        self.deadline
    }

    #[must_use]
    pub const fn shown(&self) -> Option<SpindleState> {
        self.shown
    }

    #[must_use]
    pub const fn sequence(&self) -> &StatusSequence {
        &self.sequence
    }
}
