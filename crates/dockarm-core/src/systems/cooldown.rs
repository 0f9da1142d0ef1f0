//! Cooldown clock - gates how often a generator may unlock a dock

use crate::clock::Timestamp;
use crate::components::GeneratorState;

/// Whether the cooldown has elapsed at `now`
pub fn is_eligible(state: &GeneratorState, now: Timestamp) -> bool {
    now >= state.next_unlock_at
}

/// Start a full cooldown from `now`
pub fn arm(state: &mut GeneratorState, now: Timestamp) {
    arm_for(state, now, state.config.unlock_cooldown_secs);
}

/// Push the deadline to `now + secs`. Never moves it backwards.
pub(crate) fn arm_for(state: &mut GeneratorState, now: Timestamp, secs: f64) {
    state.next_unlock_at = state.next_unlock_at.max(now.after(secs));
}

/// Seconds left until the generator becomes eligible
pub fn remaining(state: &GeneratorState, now: Timestamp) -> f64 {
    state.next_unlock_at.since(now)
}
