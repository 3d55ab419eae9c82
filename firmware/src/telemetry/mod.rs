#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Transition logging for the firmware target.
//!
//! Every state change recorded by the control loop is echoed over RTT with
//! `defmt`. Host builds print the same lines to stdout so the formatting can
//! be exercised in tests.

use spindle_core::config::SpindleTiming;
use spindle_core::machine::FaultCause;
use spindle_core::telemetry::TransitionRecord;

/// Tracks which records have already been logged.
pub struct TransitionLogger {
    next_id: u32,
}

impl TransitionLogger {
    pub const fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Logs `record` unless it was already emitted.
    pub fn emit(&mut self, record: &TransitionRecord) -> bool {
        if record.id.wrapping_sub(self.next_id) > u32::MAX / 2 {
            return false;
        }
        self.next_id = record.id.wrapping_add(1);

        match record.fault {
            Some(cause) => log_fault(record, fault_label(cause)),
            None => log_transition(record),
        }
        true
    }
}

pub const fn fault_label(cause: FaultCause) -> &'static str {
    match cause {
        FaultCause::DirectionConflict => "forward+reverse",
        FaultCause::IllegalTransition(_) => "illegal-transition",
    }
}

#[cfg(target_os = "none")]
pub fn log_boot(timing: &SpindleTiming) {
    defmt::info!(
        "spindle: boot start={=u16}ms coast={=u16}ms cold={=u16}ms recover={=u16}ms",
        timing.start_pulse_ms,
        timing.coast_ms,
        timing.cold_start_ms,
        timing.error_recover_ms
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_boot(timing: &SpindleTiming) {
    println!(
        "spindle: boot start={}ms coast={}ms cold={}ms recover={}ms",
        timing.start_pulse_ms, timing.coast_ms, timing.cold_start_ms, timing.error_recover_ms
    );
}

#[cfg(target_os = "none")]
fn log_transition(record: &TransitionRecord) {
    match record.dwell_ms {
        Some(dwell) => defmt::info!(
            "spindle: {} -> {} [{}] t={=u32}ms dwell={=u32}ms",
            record.from.label(),
            record.to.label(),
            record.to.letter(),
            record.at,
            dwell
        ),
        None => defmt::info!(
            "spindle: {} -> {} [{}] t={=u32}ms",
            record.from.label(),
            record.to.label(),
            record.to.letter(),
            record.at
        ),
    }
}

#[cfg(not(target_os = "none"))]
fn log_transition(record: &TransitionRecord) {
    match record.dwell_ms {
        Some(dwell) => println!(
            "spindle: {} -> {} [{}] t={}ms dwell={}ms",
            record.from.label(),
            record.to.label(),
            record.to.letter(),
            record.at,
            dwell
        ),
        None => println!(
            "spindle: {} -> {} [{}] t={}ms",
            record.from.label(),
            record.to.label(),
            record.to.letter(),
            record.at
        ),
    }
}

#[cfg(target_os = "none")]
fn log_fault(record: &TransitionRecord, cause: &'static str) {
    defmt::warn!(
        "spindle: fault ({}) in {} t={=u32}ms; outputs off, relay held",
        cause,
        record.from.label(),
        record.at
    );
}

#[cfg(not(target_os = "none"))]
fn log_fault(record: &TransitionRecord, cause: &'static str) {
    println!(
        "spindle: fault ({}) in {} t={}ms; outputs off, relay held",
        cause,
        record.from.label(),
        record.at
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_core::machine::{SpindleState, TransitionError};

    fn record(id: u32, fault: Option<FaultCause>) -> TransitionRecord {
        TransitionRecord {
            id,
            at: 2_000 + id,
            from: SpindleState::Ready,
            to: if fault.is_some() {
                SpindleState::Error
            } else {
                SpindleState::FwdStart
            },
            fault,
            dwell_ms: None,
        }
    }

    #[test]
    fn emits_each_record_once() {
        let mut logger = TransitionLogger::new();
        assert!(logger.emit(&record(0, None)));
        assert!(!logger.emit(&record(0, None)));
        assert!(logger.emit(&record(1, Some(FaultCause::DirectionConflict))));
        assert!(logger.emit(&record(5, None)), "gaps from ring eviction are fine");
        assert!(!logger.emit(&record(3, None)));
    }

    #[test]
    fn fault_labels_name_the_cause() {
        assert_eq!(fault_label(FaultCause::DirectionConflict), "forward+reverse");
        let err = TransitionError::new(SpindleState::Ready, SpindleState::Fwd);
        assert_eq!(
            fault_label(FaultCause::IllegalTransition(err)),
            "illegal-transition"
        );
    }
}
