//! Spindle direction/enable state machine.
//!
//! Every direction change is routed through a timed spindown state so the
//! direction relay never switches while the drive bus is energized. Each
//! target state has an allow-list of predecessors; a transition requested
//! from anywhere else lands in [`SpindleState::Error`] instead.

use core::fmt;

use crate::config::SpindleTiming;
use crate::io::{Direction, InputSample};
use crate::timer::Oneshot;

pub mod outputs;

pub use outputs::project;

/// Closed set of controller states. `ColdStart` is the power-on state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SpindleState {
    Error,
    ColdStart,
    Estopped,
    Ready,
    FwdStart,
    Fwd,
    FwdSpindown,
    RevStart,
    Rev,
    RevSpindown,
}

impl SpindleState {
    pub const ALL: [SpindleState; 10] = [
        SpindleState::Error,
        SpindleState::ColdStart,
        SpindleState::Estopped,
        SpindleState::Ready,
        SpindleState::FwdStart,
        SpindleState::Fwd,
        SpindleState::FwdSpindown,
        SpindleState::RevStart,
        SpindleState::Rev,
        SpindleState::RevSpindown,
    ];

    /// Short lowercase label used in logs and the emulator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            SpindleState::Error => "error",
            SpindleState::ColdStart => "cold-start",
            SpindleState::Estopped => "estopped",
            SpindleState::Ready => "ready",
            SpindleState::FwdStart => "fwd-start",
            SpindleState::Fwd => "fwd",
            SpindleState::FwdSpindown => "fwd-spindown",
            SpindleState::RevStart => "rev-start",
            SpindleState::Rev => "rev",
            SpindleState::RevSpindown => "rev-spindown",
        }
    }

    /// Direction family for the spindle states, `None` otherwise.
    #[must_use]
    pub const fn family(self) -> Option<Direction> {
        match self {
            SpindleState::FwdStart | SpindleState::Fwd | SpindleState::FwdSpindown => {
                Some(Direction::Forward)
            }
            SpindleState::RevStart | SpindleState::Rev | SpindleState::RevSpindown => {
                Some(Direction::Reverse)
            }
            SpindleState::Error
            | SpindleState::ColdStart
            | SpindleState::Estopped
            | SpindleState::Ready => None,
        }
    }

    #[must_use]
    pub const fn is_start(self) -> bool {
        matches!(self, SpindleState::FwdStart | SpindleState::RevStart)
    }

    #[must_use]
    pub const fn is_spindown(self) -> bool {
        matches!(self, SpindleState::FwdSpindown | SpindleState::RevSpindown)
    }

    const fn start_of(direction: Direction) -> Self {
        match direction {
            Direction::Forward => SpindleState::FwdStart,
            Direction::Reverse => SpindleState::RevStart,
        }
    }

    const fn running_of(direction: Direction) -> Self {
        match direction {
            Direction::Forward => SpindleState::Fwd,
            Direction::Reverse => SpindleState::Rev,
        }
    }

    const fn spindown_of(direction: Direction) -> Self {
        match direction {
            Direction::Forward => SpindleState::FwdSpindown,
            Direction::Reverse => SpindleState::RevSpindown,
        }
    }
}

impl fmt::Display for SpindleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure reported when a transition is requested from a disallowed state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransitionError {
    pub from: SpindleState,
    pub to: SpindleState,
}

impl TransitionError {
    #[must_use]
    pub const fn new(from: SpindleState, to: SpindleState) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal transition {} -> {}", self.from, self.to)
    }
}

/// Checks `to` against its predecessor allow-list.
///
/// # Errors
///
/// Returns [`TransitionError`] when `from` may not move to `to`.
pub const fn check_transition(
    from: SpindleState,
    to: SpindleState,
) -> Result<(), TransitionError> {
    use SpindleState as S;

    let allowed = match to {
        S::Error => true,
        S::ColdStart => false,
        S::Estopped => matches!(
            from,
            S::Error | S::ColdStart | S::Ready | S::FwdSpindown | S::RevSpindown
        ),
        S::Ready => matches!(from, S::Estopped | S::FwdSpindown | S::RevSpindown),
        S::FwdStart => matches!(from, S::Ready | S::FwdSpindown),
        S::Fwd => matches!(from, S::FwdStart),
        S::FwdSpindown => matches!(from, S::FwdStart | S::Fwd),
        S::RevStart => matches!(from, S::Ready | S::RevSpindown),
        S::Rev => matches!(from, S::RevStart),
        S::RevSpindown => matches!(from, S::RevStart | S::Rev),
    };

    if allowed {
        Ok(())
    } else {
        Err(TransitionError::new(from, to))
    }
}

/// Why the machine entered [`SpindleState::Error`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultCause {
    /// Forward and reverse were asserted together.
    DirectionConflict,
    /// A transition was requested from a state not on its allow-list.
    IllegalTransition(TransitionError),
}

impl fmt::Display for FaultCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCause::DirectionConflict => f.write_str("forward+reverse asserted"),
            FaultCause::IllegalTransition(err) => fmt::Display::fmt(err, f),
        }
    }
}

/// State change produced by a single evaluation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: SpindleState,
    pub to: SpindleState,
    pub fault: Option<FaultCause>,
}

/// The spindle controller state machine.
#[derive(Clone, Debug)]
pub struct SpindleMachine {
    state: SpindleState,
    timing: SpindleTiming,
    last_fault: Option<FaultCause>,
}

impl SpindleMachine {
    /// Enters `ColdStart` and arms the power-on holdoff.
    pub fn power_on<T: Oneshot>(timing: SpindleTiming, timer: &T) -> Self {
        timer.arm(timing.cold_start_ms);
        Self {
            state: SpindleState::ColdStart,
            timing,
            last_fault: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SpindleState {
        self.state
    }

    #[must_use]
    pub const fn timing(&self) -> SpindleTiming {
        self.timing
    }

    /// Cause of the most recent entry (or re-arm) of `Error`.
    #[must_use]
    pub const fn last_fault(&self) -> Option<FaultCause> {
        self.last_fault
    }

    /// Runs one evaluation against freshly sampled inputs.
    ///
    /// Returns the transition taken, if the state changed. Re-arming the
    /// recovery timer while already in `Error` is not reported.
    pub fn evaluate<T: Oneshot>(&mut self, inputs: &InputSample, timer: &T) -> Option<Transition> {
        match self.state {
            SpindleState::Error => {
                if inputs.direction_conflict() {
                    self.fault(FaultCause::DirectionConflict, timer)
                } else if timer.is_expired() {
                    self.advance(SpindleState::Estopped, timer)
                } else {
                    None
                }
            }
            SpindleState::ColdStart => {
                if timer.is_expired() {
                    self.advance(SpindleState::Estopped, timer)
                } else {
                    None
                }
            }
            SpindleState::Estopped => {
                if inputs.direction_conflict() {
                    self.fault(FaultCause::DirectionConflict, timer)
                } else if inputs.estop_ok {
                    self.advance(SpindleState::Ready, timer)
                } else {
                    None
                }
            }
            SpindleState::Ready => {
                if inputs.direction_conflict() {
                    self.fault(FaultCause::DirectionConflict, timer)
                } else if !inputs.estop_ok {
                    self.advance(SpindleState::Estopped, timer)
                } else if inputs.forward {
                    self.advance(SpindleState::FwdStart, timer)
                } else if inputs.reverse {
                    self.advance(SpindleState::RevStart, timer)
                } else {
                    None
                }
            }
            SpindleState::FwdStart | SpindleState::RevStart => {
                self.evaluate_start(inputs, timer)
            }
            SpindleState::Fwd | SpindleState::Rev => self.evaluate_running(inputs, timer),
            SpindleState::FwdSpindown | SpindleState::RevSpindown => {
                self.evaluate_spindown(inputs, timer)
            }
        }
    }

    fn evaluate_start<T: Oneshot>(
        &mut self,
        inputs: &InputSample,
        timer: &T,
    ) -> Option<Transition> {
        let direction = self.family();
        let (requested, opposing) = requests(inputs, direction);
        if opposing {
            self.fault(FaultCause::DirectionConflict, timer)
        } else if !inputs.estop_ok || !requested {
            self.advance(SpindleState::spindown_of(direction), timer)
        } else if timer.is_expired() {
            self.advance(SpindleState::running_of(direction), timer)
        } else {
            None
        }
    }

    fn evaluate_running<T: Oneshot>(
        &mut self,
        inputs: &InputSample,
        timer: &T,
    ) -> Option<Transition> {
        let direction = self.family();
        let (requested, opposing) = requests(inputs, direction);
        if opposing {
            self.fault(FaultCause::DirectionConflict, timer)
        } else if !inputs.estop_ok || !requested {
            self.advance(SpindleState::spindown_of(direction), timer)
        } else {
            None
        }
    }

    fn evaluate_spindown<T: Oneshot>(
        &mut self,
        inputs: &InputSample,
        timer: &T,
    ) -> Option<Transition> {
        let direction = self.family();
        let (requested, opposing) = requests(inputs, direction);
        if opposing {
            self.fault(FaultCause::DirectionConflict, timer)
        } else if inputs.estop_ok && requested {
            self.advance(SpindleState::start_of(direction), timer)
        } else if timer.is_expired() {
            if inputs.estop_ok {
                self.advance(SpindleState::Ready, timer)
            } else {
                self.advance(SpindleState::Estopped, timer)
            }
        } else {
            None
        }
    }

    /// Direction family of the current state; only called from spindle states.
    fn family(&self) -> Direction {
        self.state.family().unwrap_or_default()
    }

    /// Oneshot duration armed on entry to `state`; zero cancels.
    const fn timer_for(&self, state: SpindleState) -> u16 {
        match state {
            SpindleState::Error => self.timing.error_recover_ms,
            SpindleState::ColdStart => self.timing.cold_start_ms,
            SpindleState::FwdStart | SpindleState::RevStart => self.timing.start_pulse_ms,
            SpindleState::FwdSpindown | SpindleState::RevSpindown => self.timing.coast_ms,
            SpindleState::Estopped
            | SpindleState::Ready
            | SpindleState::Fwd
            | SpindleState::Rev => 0,
        }
    }

    fn advance<T: Oneshot>(&mut self, to: SpindleState, timer: &T) -> Option<Transition> {
        if let Err(err) = check_transition(self.state, to) {
            return self.fault(FaultCause::IllegalTransition(err), timer);
        }

        timer.arm(self.timer_for(to));
        let from = self.state;
        self.state = to;
        Some(Transition {
            from,
            to,
            fault: None,
        })
    }

    fn fault<T: Oneshot>(&mut self, cause: FaultCause, timer: &T) -> Option<Transition> {
        timer.arm(self.timer_for(SpindleState::Error));
        self.last_fault = Some(cause);
        let from = self.state;
        self.state = SpindleState::Error;
        if from == SpindleState::Error {
            None
        } else {
            Some(Transition {
                from,
                to: SpindleState::Error,
                fault: Some(cause),
            })
        }
    }
}

/// Splits the direction inputs into (same family, opposing family).
const fn requests(inputs: &InputSample, direction: Direction) -> (bool, bool) {
    match direction {
        Direction::Forward => (inputs.forward, inputs.reverse),
        Direction::Reverse => (inputs.reverse, inputs.forward),
    }
}
