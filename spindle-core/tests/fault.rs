use spindle_core::config::{ControlConfig, SpindleTiming};
use spindle_core::io::InputSample;
use spindle_core::machine::{FaultCause, SpindleState};
use spindle_core::timer::TickTimers;
use spindle_core::ControlLoop;

const TIMING: SpindleTiming = SpindleTiming::DEFAULT;

const IDLE: InputSample = InputSample {
    light: false,
    forward: false,
    reverse: false,
    estop_ok: true,
};
const FORWARD: InputSample = InputSample {
    forward: true,
    ..IDLE
};
const REVERSE: InputSample = InputSample {
    reverse: true,
    ..IDLE
};
const CONFLICT: InputSample = InputSample {
    forward: true,
    reverse: true,
    ..IDLE
};

fn tick_and_step(
    timers: &TickTimers,
    control: &mut ControlLoop<'_, TickTimers>,
    inputs: InputSample,
    ms: u32,
) {
    for _ in 0..ms {
        timers.on_tick();
        control.step(&inputs);
    }
}

/// Drives a fresh controller into `target` using only legal input sequences.
fn drive_to(timers: &TickTimers, control: &mut ControlLoop<'_, TickTimers>, target: SpindleState) {
    let coast = u32::from(TIMING.coast_ms);
    let pulse = u32::from(TIMING.start_pulse_ms);

    if target == SpindleState::ColdStart {
        return;
    }
    tick_and_step(
        timers,
        control,
        InputSample::default(),
        u32::from(TIMING.cold_start_ms),
    );
    if target == SpindleState::Estopped {
        return;
    }
    control.step(&IDLE);
    match target {
        SpindleState::Ready => {}
        SpindleState::Error => {
            control.step(&CONFLICT);
        }
        SpindleState::FwdStart => {
            control.step(&FORWARD);
        }
        SpindleState::Fwd => {
            control.step(&FORWARD);
            tick_and_step(timers, control, FORWARD, pulse);
        }
        SpindleState::FwdSpindown => {
            control.step(&FORWARD);
            tick_and_step(timers, control, FORWARD, pulse);
            tick_and_step(timers, control, IDLE, coast / 2);
        }
        SpindleState::RevStart => {
            control.step(&REVERSE);
        }
        SpindleState::Rev => {
            control.step(&REVERSE);
            tick_and_step(timers, control, REVERSE, pulse);
        }
        SpindleState::RevSpindown => {
            control.step(&REVERSE);
            tick_and_step(timers, control, REVERSE, pulse);
            tick_and_step(timers, control, IDLE, coast / 2);
        }
        SpindleState::ColdStart | SpindleState::Estopped => unreachable!(),
    }
    assert_eq!(control.state(), target, "failed to reach {target}");
}

#[test]
fn conflict_faults_within_one_iteration_from_every_state() {
    for state in SpindleState::ALL {
        let timers = TickTimers::new();
        let mut control = ControlLoop::new(&timers, ControlConfig::DEFAULT);
        drive_to(&timers, &mut control, state);

        let out = control.step(&CONFLICT);
        if state == SpindleState::ColdStart {
            assert_eq!(control.state(), SpindleState::ColdStart);
        } else {
            assert_eq!(control.state(), SpindleState::Error, "from {state}");
            assert!(!out.inhibit && !out.start && !out.light);
            assert_eq!(
                control.machine().last_fault(),
                Some(FaultCause::DirectionConflict)
            );
            assert_eq!(timers.remaining(), TIMING.error_recover_ms);
        }
    }
}

#[test]
fn recovery_waits_for_full_holdoff() {
    let timers = TickTimers::new();
    let mut control = ControlLoop::new(&timers, ControlConfig::DEFAULT);
    drive_to(&timers, &mut control, SpindleState::Error);

    // Inputs change repeatedly but nothing can shorten the holdoff.
    let recover = u32::from(TIMING.error_recover_ms);
    tick_and_step(&timers, &mut control, IDLE, recover / 2);
    tick_and_step(&timers, &mut control, FORWARD, recover / 4);
    tick_and_step(&timers, &mut control, InputSample::default(), recover / 4 - 1);
    assert_eq!(control.state(), SpindleState::Error);

    tick_and_step(&timers, &mut control, FORWARD, 1);
    assert_eq!(control.state(), SpindleState::Estopped);
}

#[test]
fn persistent_conflict_keeps_restarting_holdoff() {
    let timers = TickTimers::new();
    let mut control = ControlLoop::new(&timers, ControlConfig::DEFAULT);
    drive_to(&timers, &mut control, SpindleState::Error);

    tick_and_step(&timers, &mut control, CONFLICT, 20_000);
    assert_eq!(control.state(), SpindleState::Error);

    let recover = u32::from(TIMING.error_recover_ms);
    tick_and_step(&timers, &mut control, IDLE, recover - 1);
    assert_eq!(control.state(), SpindleState::Error);
    tick_and_step(&timers, &mut control, IDLE, 1);
    assert_eq!(control.state(), SpindleState::Estopped);

    assert_eq!(control.log().fault_count(), 1, "re-arming is not a new fault");
}

#[test]
fn recovery_resumes_normal_sequencing() {
    let timers = TickTimers::new();
    let mut control = ControlLoop::new(&timers, ControlConfig::DEFAULT);
    drive_to(&timers, &mut control, SpindleState::Error);

    tick_and_step(&timers, &mut control, IDLE, u32::from(TIMING.error_recover_ms));
    assert_eq!(control.state(), SpindleState::Estopped);
    control.step(&IDLE);
    assert_eq!(control.state(), SpindleState::Ready);
    control.step(&REVERSE);
    assert_eq!(control.state(), SpindleState::RevStart);

    let record = control
        .log()
        .oldest_first()
        .find(|record| record.is_fault())
        .copied()
        .expect("fault not logged");
    assert_eq!(record.from, SpindleState::Ready);
    assert_eq!(record.to, SpindleState::Error);
}
