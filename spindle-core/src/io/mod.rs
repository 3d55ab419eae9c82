//! Boundary between the control core and the board's digital I/O.
//!
//! The core only ever sees normalized booleans: `true` means "asserted"
//! regardless of how the signal is wired. The catalog below records pin and
//! polarity metadata so the firmware adapter can perform that normalization
//! without hardcoding it per signal.

/// Identifier for every signal crossing the I/O boundary.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignalId {
    LightIn,
    Forward,
    Reverse,
    EstopOk,
    LightOut,
    Inhibit,
    Start,
    Direction,
    Status,
}

impl SignalId {
    /// Deterministic index for lookups into [`ALL_SIGNALS`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            SignalId::LightIn => 0,
            SignalId::Forward => 1,
            SignalId::Reverse => 2,
            SignalId::EstopOk => 3,
            SignalId::LightOut => 4,
            SignalId::Inhibit => 5,
            SignalId::Start => 6,
            SignalId::Direction => 7,
            SignalId::Status => 8,
        }
    }
}

/// Which way a signal flows relative to the adapter board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignalDirection {
    Input,
    Output,
}

/// Electrical polarity of a signal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

/// Metadata describing how a signal is routed on the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SignalLine {
    pub id: SignalId,
    pub name: &'static str,
    pub mcu_pin: &'static str,
    pub direction: SignalDirection,
    pub polarity: Polarity,
    /// Inputs rely on the MCU's internal pull-up when set.
    pub pull_up: bool,
}

impl SignalLine {
    #[must_use]
    pub const fn input(id: SignalId, name: &'static str, mcu_pin: &'static str) -> Self {
        Self {
            id,
            name,
            mcu_pin,
            direction: SignalDirection::Input,
            polarity: Polarity::ActiveLow,
            pull_up: true,
        }
    }

    #[must_use]
    pub const fn output(id: SignalId, name: &'static str, mcu_pin: &'static str) -> Self {
        Self {
            id,
            name,
            mcu_pin,
            direction: SignalDirection::Output,
            polarity: Polarity::ActiveHigh,
            pull_up: false,
        }
    }

    /// Converts a sampled pin level into the logical "asserted" value.
    #[must_use]
    pub const fn is_asserted(&self, level_high: bool) -> bool {
        match self.polarity {
            Polarity::ActiveLow => !level_high,
            Polarity::ActiveHigh => level_high,
        }
    }

    /// Converts a logical value into the pin level to drive.
    #[must_use]
    pub const fn level_for(&self, asserted: bool) -> bool {
        match self.polarity {
            Polarity::ActiveLow => !asserted,
            Polarity::ActiveHigh => asserted,
        }
    }
}

/// Compile-time catalog of every signal on the adapter board.
pub const ALL_SIGNALS: [SignalLine; 9] = [
    SignalLine::input(SignalId::LightIn, "LIGHT_IN", "PB2"),
    SignalLine::input(SignalId::Forward, "SPINDLE_FWD", "PB1"),
    SignalLine::input(SignalId::Reverse, "SPINDLE_REV", "PB0"),
    SignalLine::input(SignalId::EstopOk, "ESTOP_OK", "PA7"),
    SignalLine::output(SignalId::LightOut, "LIGHT_OUT", "PA0"),
    SignalLine::output(SignalId::Inhibit, "INHIBIT", "PA1"),
    SignalLine::output(SignalId::Start, "START", "PA2"),
    SignalLine::output(SignalId::Direction, "DIRECTION", "PA3"),
    SignalLine::output(SignalId::Status, "STATUS_LED", "PA4"),
];

/// Retrieve signal metadata by identifier.
#[must_use]
pub const fn signal_by_id(id: SignalId) -> SignalLine {
    ALL_SIGNALS[id.as_index()]
}

/// Inputs sampled fresh on every loop iteration, already normalized.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct InputSample {
    pub light: bool,
    pub forward: bool,
    pub reverse: bool,
    pub estop_ok: bool,
}

impl InputSample {
    /// Builds a sample from raw pin levels using the catalog polarities.
    #[must_use]
    pub const fn from_levels(light: bool, forward: bool, reverse: bool, estop_ok: bool) -> Self {
        Self {
            light: signal_by_id(SignalId::LightIn).is_asserted(light),
            forward: signal_by_id(SignalId::Forward).is_asserted(forward),
            reverse: signal_by_id(SignalId::Reverse).is_asserted(reverse),
            estop_ok: signal_by_id(SignalId::EstopOk).is_asserted(estop_ok),
        }
    }

    /// Forward and reverse requested at the same time.
    #[must_use]
    pub const fn direction_conflict(&self) -> bool {
        self.forward && self.reverse
    }
}

/// Relay position for the direction output.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Logical output level (`false` = forward, `true` = reverse).
    #[must_use]
    pub const fn is_reverse(self) -> bool {
        matches!(self, Direction::Reverse)
    }
}

/// Output levels the control loop wants on the board this iteration.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OutputIntent {
    pub light: bool,
    pub inhibit: bool,
    pub start: bool,
    pub direction: Direction,
    pub status_led: bool,
}

/// Source of normalized input samples.
pub trait InputSampler {
    /// Samples every input once.
    fn sample(&mut self) -> InputSample;
}

/// Sink for output intents.
pub trait OutputDriver {
    /// Applies every output level in `intent`.
    fn drive(&mut self, intent: &OutputIntent);
}

/// Output driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopOutputDriver;

impl NoopOutputDriver {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl OutputDriver for NoopOutputDriver {
    fn drive(&mut self, _: &OutputIntent) {}
}
