//! Board GPIO adapters for the spindle control core.
//!
//! Pin assignments and polarities come from the signal catalog in
//! `spindle-core`; this module only owns the Embassy GPIO handles and applies
//! the catalog's normalization when sampling or driving them.

use embassy_stm32::gpio::{Input, Level, Output};
use spindle_core::io::{
    InputSample, InputSampler, OutputDriver, OutputIntent, SignalId, signal_by_id,
};

/// The four controller-facing inputs (active low, pulled up).
pub struct BoardInputs<'d> {
    light: Input<'d>,
    forward: Input<'d>,
    reverse: Input<'d>,
    estop_ok: Input<'d>,
}

impl<'d> BoardInputs<'d> {
    pub fn new(
        light: Input<'d>,
        forward: Input<'d>,
        reverse: Input<'d>,
        estop_ok: Input<'d>,
    ) -> Self {
        Self {
            light,
            forward,
            reverse,
            estop_ok,
        }
    }
}

impl InputSampler for BoardInputs<'_> {
    fn sample(&mut self) -> InputSample {
        InputSample::from_levels(
            self.light.is_high(),
            self.forward.is_high(),
            self.reverse.is_high(),
            self.estop_ok.is_high(),
        )
    }
}

/// The five drive-facing outputs.
pub struct BoardOutputs<'d> {
    light: Output<'d>,
    inhibit: Output<'d>,
    start: Output<'d>,
    direction: Output<'d>,
    status: Output<'d>,
}

impl<'d> BoardOutputs<'d> {
    pub fn new(
        light: Output<'d>,
        inhibit: Output<'d>,
        start: Output<'d>,
        direction: Output<'d>,
        status: Output<'d>,
    ) -> Self {
        Self {
            light,
            inhibit,
            start,
            direction,
            status,
        }
    }

    fn output_mut(&mut self, id: SignalId) -> Option<&mut Output<'d>> {
        match id {
            SignalId::LightOut => Some(&mut self.light),
            SignalId::Inhibit => Some(&mut self.inhibit),
            SignalId::Start => Some(&mut self.start),
            SignalId::Direction => Some(&mut self.direction),
            SignalId::Status => Some(&mut self.status),
            SignalId::LightIn | SignalId::Forward | SignalId::Reverse | SignalId::EstopOk => None,
        }
    }

    fn set(&mut self, id: SignalId, asserted: bool) {
        let level = Level::from(signal_by_id(id).level_for(asserted));
        if let Some(output) = self.output_mut(id) {
            output.set_level(level);
        }
    }
}

impl OutputDriver for BoardOutputs<'_> {
    fn drive(&mut self, intent: &OutputIntent) {
        self.set(SignalId::LightOut, intent.light);
        self.set(SignalId::Inhibit, intent.inhibit);
        self.set(SignalId::Start, intent.start);
        self.set(SignalId::Direction, intent.direction.is_reverse());
        self.set(SignalId::Status, intent.status_led);
    }
}
