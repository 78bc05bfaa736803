//! Converges the client's simulated tick toward the server's by slewing
//! [`EntityManager::set_speed_multiplier`] (spec §4.4 rationale: "`MaxTicks =
//! DeltaTimeTicks + SpeedMultiplier*SlowdownTicks`").
//!
//! A client-side tick-sync controller acting through the core's
//! `SpeedMultiplier` knob rather than driving tick rate directly.

use entityplex_shared::{wrapping_diff, ClockSource, EntityManager, RoleHooks};

/// How aggressively the client nudges its tick rate to track the server.
/// `target_tick_offset` is how far ahead of the server tick the client wants
/// to stay buffered (enough room to smooth out jitter without every packet
/// forcing a rollback).
#[derive(Debug, Clone, Copy)]
pub struct SpeedSlewController {
    target_tick_offset: i16,
}

impl Default for SpeedSlewController {
    fn default() -> Self {
        Self {
            target_tick_offset: 2,
        }
    }
}

impl SpeedSlewController {
    pub fn new(target_tick_offset: i16) -> Self {
        Self { target_tick_offset }
    }

    /// Adjusts `manager`'s speed multiplier based on how far `observed_server_tick`
    /// sits from the client's own tick, proportionally and clamped to
    /// `[-1.0, 1.0]` so a single noisy packet can't cause a runaway slew.
    pub fn update<H: RoleHooks, C: ClockSource>(
        &self,
        manager: &mut EntityManager<H, C>,
        observed_server_tick: u16,
    ) {
        let offset = wrapping_diff(manager.tick(), observed_server_tick) - self.target_tick_offset;
        let multiplier = (f32::from(offset) / 10.0).clamp(-1.0, 1.0);
        manager.set_speed_multiplier(multiplier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entityplex_shared::{
        impl_internal_entity, ClassFlags, ClassRegistry, EntityConstructorParams, EntityHeader,
        EntityKind, EntityLogic, EntityManagerConfig, InternalEntity, Mode,
    };

    struct A {
        header: EntityHeader,
    }
    impl_internal_entity!(A);
    impl EntityLogic for A {}

    fn ctor(p: EntityConstructorParams) -> Box<dyn InternalEntity> {
        Box::new(A {
            header: EntityHeader::new(p.id, p.version, p.class_id, p.is_local, EntityKind::EntityLogic),
        })
    }

    fn registry() -> ClassRegistry {
        let mut reg = ClassRegistry::new();
        reg.register_entity_logic::<A>(1, ctor, ClassFlags::UPDATEABLE, vec![], 0, vec![])
            .unwrap();
        reg.finish().unwrap();
        reg
    }

    #[test]
    fn server_ahead_of_client_speeds_up() {
        use crate::hooks::ClientHooks;
        let mut mgr = EntityManager::new(
            Mode::Client,
            registry(),
            EntityManagerConfig::default(),
            ClientHooks::new(),
        );
        let slew = SpeedSlewController::new(2);
        slew.update(&mut mgr, 20);
        assert!(mgr.speed_multiplier() > 0.0);
    }

    #[test]
    fn client_already_at_target_offset_does_not_slew() {
        use crate::hooks::ClientHooks;
        let mut mgr = EntityManager::new(
            Mode::Client,
            registry(),
            EntityManagerConfig::default(),
            ClientHooks::new(),
        );
        let slew = SpeedSlewController::new(2);
        slew.update(&mut mgr, 2);
        assert_eq!(mgr.speed_multiplier(), 0.0);
    }
}
