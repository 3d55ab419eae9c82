//! Millisecond tick clock and oneshot countdown shared with the 1 kHz interrupt.
//!
//! The interrupt handler calls [`TickTimers::on_tick`] once per millisecond.
//! The control loop reads the clock and arms/polls the countdown through the
//! [`TickClock`] and [`Oneshot`] traits. Every access to the shared cells runs
//! inside a `critical_section::with` scope, which restores the previous
//! interrupt state on every exit path. The MCU cannot read the 32-bit counter
//! atomically with respect to the interrupt, so there is no lock-free path.

use core::cell::Cell;

use critical_section::Mutex;

/// Raw monotonic tick count (milliseconds). Wraps after roughly 49.7 days.
pub type Ticks = u32;

/// Monotonic millisecond source.
pub trait TickClock {
    /// Returns the current tick count.
    fn now(&self) -> Ticks;
}

/// Single countdown timer that latches once it reaches zero.
pub trait Oneshot {
    /// Starts a countdown of `duration_ms`, clobbering any running countdown
    /// and clearing the expired latch. A zero duration cancels.
    fn arm(&self, duration_ms: u16);

    /// Reports whether the last armed countdown has run out. The latch holds
    /// until the next [`Oneshot::arm`].
    fn is_expired(&self) -> bool;

    /// Cancels any running countdown.
    fn cancel(&self) {
        self.arm(0);
    }
}

/// Returns `true` once `now` has reached or passed `deadline`.
///
/// Uses the signed wrapping difference so the comparison survives counter
/// wraparound as long as the interval is under 2^31 ticks.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn deadline_reached(now: Ticks, deadline: Ticks) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct TimerCells {
    ticks: Ticks,
    countdown: u16,
    expired: bool,
}

/// Interrupt-shared tick counter plus oneshot countdown.
///
/// Firmware places one of these in a `static`; host code and tests can keep
/// one on the stack and call [`TickTimers::on_tick`] to simulate time.
pub struct TickTimers {
    cells: Mutex<Cell<TimerCells>>,
}

impl TickTimers {
    /// Creates a timer service at tick zero with no countdown running.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: Mutex::new(Cell::new(TimerCells {
                ticks: 0,
                countdown: 0,
                expired: false,
            })),
        }
    }

    /// Advances the clock by one millisecond. Call from the 1 kHz interrupt.
    pub fn on_tick(&self) {
        critical_section::with(|cs| {
            let cell = self.cells.borrow(cs);
            let mut cells = cell.get();
            cells.ticks = cells.ticks.wrapping_add(1);
            if cells.countdown != 0 {
                cells.countdown -= 1;
                if cells.countdown == 0 {
                    cells.expired = true;
                }
            }
            cell.set(cells);
        });
    }

    /// Advances the clock by `count` milliseconds.
    pub fn advance(&self, count: u32) {
        for _ in 0..count {
            self.on_tick();
        }
    }

    /// Remaining countdown in milliseconds (zero when idle or expired).
    #[must_use]
    pub fn remaining(&self) -> u16 {
        critical_section::with(|cs| self.cells.borrow(cs).get().countdown)
    }
}

impl Default for TickTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for TickTimers {
    fn now(&self) -> Ticks {
        critical_section::with(|cs| self.cells.borrow(cs).get().ticks)
    }
}

impl Oneshot for TickTimers {
    fn arm(&self, duration_ms: u16) {
        critical_section::with(|cs| {
            let cell = self.cells.borrow(cs);
            let mut cells = cell.get();
            cells.expired = false;
            cells.countdown = duration_ms;
            cell.set(cells);
        });
    }

    fn is_expired(&self) -> bool {
        critical_section::with(|cs| self.cells.borrow(cs).get().expired)
    }
}

impl<T: TickClock + ?Sized> TickClock for &T {
    fn now(&self) -> Ticks {
        (**self).now()
    }
}

impl<T: Oneshot + ?Sized> Oneshot for &T {
    fn arm(&self, duration_ms: u16) {
        (**self).arm(duration_ms);
    }

    fn is_expired(&self) -> bool {
        (**self).is_expired()
    }
}
