//! Single-threaded control loop.
//!
//! One [`ControlLoop::step`] is one iteration: evaluate the state machine
//! against the sampled inputs, log any transition, poll the status sequencer,
//! and project the outputs. Nothing in here blocks; all timing comes from the
//! shared tick/oneshot service.

use crate::config::ControlConfig;
use crate::io::{Direction, InputSample, InputSampler, OutputDriver, OutputIntent};
use crate::machine::{SpindleMachine, SpindleState, Transition, project};
use crate::status::StatusSequencer;
use crate::telemetry::TransitionLog;
use crate::timer::{Oneshot, TickClock};

/// Everything the main loop owns, borrowing the interrupt-shared timers.
pub struct ControlLoop<'a, T>
where
    T: TickClock + Oneshot,
{
    timers: &'a T,
    machine: SpindleMachine,
    status: StatusSequencer,
    log: TransitionLog,
    direction: Direction,
    last_outputs: OutputIntent,
}

impl<'a, T> ControlLoop<'a, T>
where
    T: TickClock + Oneshot,
{
    /// Powers the controller on in `ColdStart` with the cold-start holdoff armed.
    pub fn new(timers: &'a T, config: ControlConfig) -> Self {
        Self {
            timers,
            machine: SpindleMachine::power_on(config.spindle, timers),
            status: StatusSequencer::new(config.status),
            log: TransitionLog::new(),
            direction: Direction::Forward,
            last_outputs: OutputIntent::default(),
        }
    }

    /// Runs one iteration and returns the outputs to drive.
    pub fn step(&mut self, inputs: &InputSample) -> OutputIntent {
        self.step_traced(inputs).0
    }

    /// Like [`ControlLoop::step`], also returning the transition taken.
    pub fn step_traced(&mut self, inputs: &InputSample) -> (OutputIntent, Option<Transition>) {
        let transition = self.machine.evaluate(inputs, self.timers);
        let now = self.timers.now();
        if let Some(transition) = transition {
            self.log.record(transition, now);
        }

        let state = self.machine.state();
        let status_led = self.status.poll(state, now);

        let mut outputs = project(state, inputs.light, self.direction);
        outputs.status_led = status_led;
        self.direction = outputs.direction;
        self.last_outputs = outputs;
        (outputs, transition)
    }

    /// Samples, steps, and drives the outputs.
    pub fn run_once<S, D>(&mut self, sampler: &mut S, driver: &mut D) -> Option<Transition>
    where
        S: InputSampler,
        D: OutputDriver,
    {
        let inputs = sampler.sample();
        let (outputs, transition) = self.step_traced(&inputs);
        driver.drive(&outputs);
        transition
    }

    #[must_use]
    pub fn state(&self) -> SpindleState {
        self.machine.state()
    }

    #[must_use]
    pub fn machine(&self) -> &SpindleMachine {
        &self.machine
    }

    #[must_use]
    pub fn status(&self) -> &StatusSequencer {
        &self.status
    }

    #[must_use]
    pub fn log(&self) -> &TransitionLog {
        &self.log
    }

    #[must_use]
    pub fn last_outputs(&self) -> OutputIntent {
        self.last_outputs
    }

    #[must_use]
    pub fn timers(&self) -> &'a T {
        self.timers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TickTimers;

    struct FixedInputs(InputSample);

    impl InputSampler for FixedInputs {
        fn sample(&mut self) -> InputSample {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingDriver {
        driven: Option<OutputIntent>,
        calls: usize,
    }

    impl OutputDriver for RecordingDriver {
        fn drive(&mut self, intent: &OutputIntent) {
            self.driven = Some(*intent);
            self.calls += 1;
        }
    }

    #[test]
    fn run_once_drives_projected_outputs() {
        let timers = TickTimers::new();
        let mut control = ControlLoop::new(&timers, ControlConfig::DEFAULT);
        let mut sampler = FixedInputs(InputSample {
            light: true,
            ..InputSample::default()
        });
        let mut driver = RecordingDriver::default();

        assert_eq!(control.run_once(&mut sampler, &mut driver), None);
        assert_eq!(driver.calls, 1);
        let driven = driver.driven.expect("outputs not driven");
        assert!(!driven.light, "lamp stays off during cold start");
        assert_eq!(driven, control.last_outputs());
    }

    #[test]
    fn transitions_land_in_the_log() {
        let timers = TickTimers::new();
        let mut control = ControlLoop::new(&timers, ControlConfig::DEFAULT);
        let idle = InputSample::default();

        timers.advance(2_000);
        let (_, transition) = control.step_traced(&idle);
        assert_eq!(
            transition.map(|t| t.to),
            Some(SpindleState::Estopped)
        );
        let record = control.log().latest().copied().expect("missing record");
        assert_eq!(record.at, 2_000);
        assert_eq!(record.from, SpindleState::ColdStart);
        assert_eq!(control.status().shown(), Some(SpindleState::Estopped));
    }

    #[test]
    fn error_holds_reverse_relay_until_estopped() {
        let timers = TickTimers::new();
        let mut control = ControlLoop::new(&timers, ControlConfig::DEFAULT);
        let ready = InputSample {
            estop_ok: true,
            ..InputSample::default()
        };
        let reverse = InputSample {
            reverse: true,
            ..ready
        };

        timers.advance(2_000);
        control.step(&ready);
        control.step(&ready);
        assert_eq!(control.state(), SpindleState::Ready);

        let out = control.step(&reverse);
        assert_eq!(out.direction, Direction::Reverse);
        timers.advance(500);
        control.step(&reverse);
        assert_eq!(control.state(), SpindleState::Rev);

        let out = control.step(&InputSample {
            forward: true,
            ..reverse
        });
        assert_eq!(control.state(), SpindleState::Error);
        assert_eq!(out.direction, Direction::Reverse);
        assert!(!out.inhibit);

        timers.advance(5_000);
        let out = control.step(&ready);
        assert_eq!(control.state(), SpindleState::Estopped);
        assert_eq!(out.direction, Direction::Forward);
    }
}
