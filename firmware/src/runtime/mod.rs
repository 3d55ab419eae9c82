use cortex_m::interrupt;
use cortex_m::peripheral::SYST;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::register::primask;
use cortex_m_rt::{entry, exception};
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use spindle_core::{ControlConfig, ControlLoop, TickTimers};

use crate::hw::{BoardInputs, BoardOutputs};
use crate::telemetry::{self, TransitionLogger};

/// Core clock after `hal::init` with the default config (HSI16, no PLL).
const SYSCLK_HZ: u32 = 16_000_000;
/// Tick clock rate; the oneshot timer counts in these units.
const TICK_HZ: u32 = 1_000;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Tick counter and oneshot countdown shared with the SysTick handler.
static TIMERS: TickTimers = TickTimers::new();

#[exception]
fn SysTick() {
    TIMERS.on_tick();
}

fn start_tick(syst: &mut SYST) {
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(SYSCLK_HZ / TICK_HZ - 1);
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();
}

#[entry]
fn main() -> ! {
    // Claim the core peripherals before the HAL gets a chance to steal them.
    let mut core = cortex_m::Peripherals::take().expect("core peripherals already taken");
    let p = hal::init(hal::Config::default());

    let mut inputs = BoardInputs::new(
        Input::new(p.PB2, Pull::Up),
        Input::new(p.PB1, Pull::Up),
        Input::new(p.PB0, Pull::Up),
        Input::new(p.PA7, Pull::Up),
    );
    let mut outputs = BoardOutputs::new(
        Output::new(p.PA0, Level::Low, Speed::Low),
        Output::new(p.PA1, Level::Low, Speed::Low),
        Output::new(p.PA2, Level::Low, Speed::Low),
        Output::new(p.PA3, Level::Low, Speed::Low),
        Output::new(p.PA4, Level::Low, Speed::Low),
    );

    let config = ControlConfig::DEFAULT;
    telemetry::log_boot(&config.spindle);

    let mut control = ControlLoop::new(&TIMERS, config);
    let mut logger = TransitionLogger::new();
    start_tick(&mut core.SYST);

    loop {
        if control.run_once(&mut inputs, &mut outputs).is_some()
            && let Some(record) = control.log().latest()
        {
            logger.emit(record);
        }
    }
}
