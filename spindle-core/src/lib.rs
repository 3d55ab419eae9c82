#![no_std]

// Control core for the spindle adapter board.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Interrupt-shared state goes through `critical-section`,
// so host builds need an implementation (the `std` feature) linked in.

pub mod config;
pub mod control;
pub mod io;
pub mod machine;
pub mod status;
pub mod telemetry;
pub mod timer;

pub use config::{ControlConfig, SpindleTiming, StatusTiming};
pub use control::ControlLoop;
pub use io::{Direction, InputSample, OutputIntent};
pub use machine::{FaultCause, SpindleState, Transition};
pub use timer::{Oneshot, TickClock, TickTimers, Ticks};
