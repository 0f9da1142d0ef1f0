//! Capacity admission - decides whether a generator may start another dock
//!
//! A granted [`Permit`] holds one unit of capacity until it is either
//! committed to the ledger or released. Capacity is per generator; there is
//! no pool shared between stations.

use thiserror::Error;

use crate::components::GeneratorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AdmissionDenied {
    #[error("concurrent dock limit reached")]
    ConcurrentLimitReached,
    #[error("total generated dock limit reached")]
    TotalLimitReached,
}

/// Single-use proof that capacity was available when it was granted.
///
/// Not `Clone`: it is moved into exactly one instantiation attempt and then
/// consumed by [`ledger::record`](super::ledger::record) or [`release`].
#[derive(Debug)]
#[must_use = "a permit holds capacity until it is recorded or released"]
pub struct Permit {
    /// Session the permit was granted in
    issuer: u64,
}

/// Grant a permit if both capacity limits allow one more dock.
///
/// Permits already in flight count against both limits. The total limit is
/// reported first since it never clears within a round.
pub fn try_admit(state: &mut GeneratorState) -> Result<Permit, AdmissionDenied> {
    let in_flight = state.session.in_flight as usize;
    let ledger = &state.session.ledger;

    if ledger.generated_len() + in_flight >= state.config.max_total_generated as usize {
        return Err(AdmissionDenied::TotalLimitReached);
    }
    if ledger.active_len() + in_flight >= state.config.max_concurrent_docks as usize {
        return Err(AdmissionDenied::ConcurrentLimitReached);
    }

    state.session.in_flight += 1;
    Ok(Permit {
        issuer: state.session.id,
    })
}

/// Give an unused permit's capacity back
pub fn release(state: &mut GeneratorState, permit: Permit) {
    redeem(state, permit);
}

/// Retire a permit from the in-flight count. Used on both commit and release.
///
/// A permit from another generator, or from a session that has since been
/// reset, is ignored.
pub(crate) fn redeem(state: &mut GeneratorState, permit: Permit) {
    let Permit { issuer } = permit;
    if issuer != state.session.id {
        log::error!(
            "Ignoring permit from session {} redeemed against session {}",
            issuer,
            state.session.id
        );
        return;
    }
    state.session.in_flight = state.session.in_flight.saturating_sub(1);
}
