//! The `PredictionRollback` state machine (spec §6 `UpdateMode`, §9 Design
//! Note "Rollback discipline"): when an authoritative snapshot disagrees
//! with the client's predicted state, the client rewinds to that snapshot
//! and replays forward tick by tick so predicted fields re-converge while
//! non-predicted fields stay pinned to authority.

use entityplex_shared::{ClockSource, EntityManager, RoleHooks, UpdateMode};

/// Bounds how many ticks a single rollback will replay, so a wildly stale
/// snapshot can't stall a frame (spec Invariant around `MAX_TICKS_PER_UPDATE`
/// shares the same rationale: bound the worst case per frame).
#[derive(Debug, Clone, Copy)]
pub struct RollbackController {
    max_replay_ticks: u16,
}

impl Default for RollbackController {
    fn default() -> Self {
        Self {
            max_replay_ticks: 32,
        }
    }
}

impl RollbackController {
    pub fn new(max_replay_ticks: u16) -> Self {
        Self { max_replay_ticks }
    }

    /// Replays `ticks_to_replay` logic ticks (clamped to `max_replay_ticks`)
    /// with `manager` in `PredictionRollback` mode, restoring `Normal` mode
    /// afterward regardless of how many ticks actually ran.
    pub fn reconcile<H: RoleHooks, C: ClockSource>(
        &self,
        manager: &mut EntityManager<H, C>,
        ticks_to_replay: u16,
    ) {
        let ticks = ticks_to_replay.min(self.max_replay_ticks);
        manager.set_update_mode(UpdateMode::PredictionRollback);
        for _ in 0..ticks {
            manager.replay_tick();
        }
        manager.set_update_mode(UpdateMode::Normal);
    }
}
