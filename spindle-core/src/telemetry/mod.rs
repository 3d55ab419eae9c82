//! Transition history kept by the control loop.
//!
//! Records live in a fixed-size ring so the firmware can keep a short trail
//! of recent state changes without allocation. The emulator prints the same
//! trail with its `trace` command.

use heapless::{HistoryBuf, OldestOrdered};

use crate::machine::{FaultCause, SpindleState, Transition};
use crate::timer::Ticks;

/// Identifier assigned to each recorded transition.
pub type EventId = u32;

/// Total number of transitions retained in memory.
pub const TRANSITION_LOG_CAPACITY: usize = 32;

/// One recorded state change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransitionRecord {
    pub id: EventId,
    pub at: Ticks,
    pub from: SpindleState,
    pub to: SpindleState,
    pub fault: Option<FaultCause>,
    /// Milliseconds spent in `from`, when the entry into `from` was recorded.
    pub dwell_ms: Option<u32>,
}

impl TransitionRecord {
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

/// Fixed-capacity ring of recent transitions.
pub struct TransitionLog<const CAPACITY: usize = TRANSITION_LOG_CAPACITY> {
    ring: HistoryBuf<TransitionRecord, CAPACITY>,
    last_transition_at: Option<Ticks>,
    next_event_id: EventId,
    fault_count: u32,
}

impl<const CAPACITY: usize> TransitionLog<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_transition_at: None,
            next_event_id: 0,
            fault_count: 0,
        }
    }

    /// Records `transition` at tick `at`.
    pub fn record(&mut self, transition: Transition, at: Ticks) -> EventId {
        let dwell_ms = self
            .last_transition_at
            .map(|previous| at.wrapping_sub(previous));
        self.last_transition_at = Some(at);

        if transition.fault.is_some() {
            self.fault_count = self.fault_count.saturating_add(1);
        }

        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(TransitionRecord {
            id,
            at,
            from: transition.from,
            to: transition.to,
            fault: transition.fault,
            dwell_ms,
        });
        id
    }

    /// Iterates over retained records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TransitionRecord> {
        self.ring.oldest_ordered()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&TransitionRecord> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of entries into `Error` since power-on, including evicted ones.
    #[must_use]
    pub const fn fault_count(&self) -> u32 {
        self.fault_count
    }
}

impl<const CAPACITY: usize> Default for TransitionLog<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(from: SpindleState, to: SpindleState) -> Transition {
        Transition {
            from,
            to,
            fault: None,
        }
    }

    #[test]
    fn records_dwell_between_transitions() {
        let mut log: TransitionLog = TransitionLog::new();

        let first = log.record(
            transition(SpindleState::ColdStart, SpindleState::Estopped),
            2_000,
        );
        assert_eq!(first, 0);
        assert_eq!(log.latest().map(|r| r.dwell_ms), Some(None));

        let second = log.record(transition(SpindleState::Estopped, SpindleState::Ready), 2_350);
        assert_eq!(second, 1);
        let latest = log.latest().copied().expect("record missing");
        assert_eq!(latest.dwell_ms, Some(350));
        assert_eq!(latest.to, SpindleState::Ready);
        assert!(!latest.is_fault());
    }

    #[test]
    fn counts_faults_past_eviction() {
        let mut log: TransitionLog<2> = TransitionLog::new();
        for at in 0..4 {
            log.record(
                Transition {
                    from: SpindleState::Ready,
                    to: SpindleState::Error,
                    fault: Some(FaultCause::DirectionConflict),
                },
                at,
            );
        }

        assert_eq!(log.len(), 2);
        assert_eq!(log.fault_count(), 4);
        let ids: heapless::Vec<EventId, 2> = log.oldest_first().map(|r| r.id).collect();
        assert_eq!(ids.as_slice(), &[2, 3]);
    }
}
