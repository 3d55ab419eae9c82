//! Build-time timing constants for the spindle adapter.
//!
//! Nothing here is adjustable at runtime; firmware and emulator both pick the
//! `DEFAULT` sets below and hand them to the control loop.

/// Millisecond holdoffs used by the state machine's oneshot timer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SpindleTiming {
    /// Duration of the contactor start pulse.
    pub start_pulse_ms: u16,
    /// Holdoff after the drive is de-energized before direction may change.
    pub coast_ms: u16,
    /// Holdoff after power-up before leaving `ColdStart`.
    pub cold_start_ms: u16,
    /// Minimum time spent in `Error` before automatic recovery.
    pub error_recover_ms: u16,
}

impl SpindleTiming {
    pub const DEFAULT: Self = Self {
        start_pulse_ms: 500,
        coast_ms: 1_000,
        cold_start_ms: 2_000,
        error_recover_ms: 5_000,
    };
}

impl Default for SpindleTiming {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Morse timing for the status indicator, expressed in units of `unit_ms`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusTiming {
    pub unit_ms: u32,
    pub dot_units: u32,
    pub dash_units: u32,
    pub interval_units: u32,
    pub gap_units: u32,
}

impl StatusTiming {
    pub const DEFAULT: Self = Self {
        unit_ms: 100,
        dot_units: 1,
        dash_units: 3,
        interval_units: 1,
        gap_units: 7,
    };

    #[must_use]
    pub const fn dot_ms(&self) -> u32 {
        self.dot_units * self.unit_ms
    }

    #[must_use]
    pub const fn dash_ms(&self) -> u32 {
        self.dash_units * self.unit_ms
    }

    #[must_use]
    pub const fn interval_ms(&self) -> u32 {
        self.interval_units * self.unit_ms
    }

    #[must_use]
    pub const fn gap_ms(&self) -> u32 {
        self.gap_units * self.unit_ms
    }
}

impl Default for StatusTiming {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete build-time configuration for a control loop.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlConfig {
    pub spindle: SpindleTiming,
    pub status: StatusTiming,
}

impl ControlConfig {
    pub const DEFAULT: Self = Self {
        spindle: SpindleTiming::DEFAULT,
        status: StatusTiming::DEFAULT,
    };
}
