//! Output projection from the current state.

use super::SpindleState;
use crate::io::{Direction, OutputIntent};

/// Computes the output levels for `state`.
///
/// `light` is the sampled lamp request and `held` is the direction currently
/// on the relay. Only `Error` reads `held`: it leaves the relay where it was,
/// since the fault may have hit while the drive was still energized. The
/// status LED is filled in by the status sequencer, not here.
#[must_use]
pub const fn project(state: SpindleState, light: bool, held: Direction) -> OutputIntent {
    let (light, inhibit, start, direction) = match state {
        SpindleState::ColdStart => (false, false, false, Direction::Forward),
        SpindleState::Estopped | SpindleState::Ready => (light, false, false, Direction::Forward),
        SpindleState::FwdStart => (light, true, true, Direction::Forward),
        SpindleState::Fwd => (light, true, false, Direction::Forward),
        SpindleState::FwdSpindown => (light, false, false, Direction::Forward),
        SpindleState::RevStart => (light, true, true, Direction::Reverse),
        SpindleState::Rev => (light, true, false, Direction::Reverse),
        SpindleState::RevSpindown => (light, false, false, Direction::Reverse),
        SpindleState::Error => (false, false, false, held),
    };

    OutputIntent {
        light,
        inhibit,
        start,
        direction,
        status_led: false,
    }
}
