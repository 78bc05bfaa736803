//! The server-role specialization of [`entityplex_shared::EntityManager`]
//! (spec §2 "Role Specializations (server/client)").

use std::ops::{Deref, DerefMut};

use entityplex_shared::{
    ClassId, ClassRegistry, EntityManager, EntityManagerConfig, EntityManagerError, EntityId,
    EntityStore, Mode, NetPlayer,
};

use crate::delta::DeltaSink;
use crate::hooks::ServerHooks;
use crate::id_allocator::{IdAllocationError, SyncedIdAllocator};

#[derive(Debug, Clone, Copy)]
pub struct ServerEntityManagerConfig {
    pub entity_manager: EntityManagerConfig,
}

impl Default for ServerEntityManagerConfig {
    fn default() -> Self {
        Self {
            entity_manager: EntityManagerConfig::default(),
        }
    }
}

/// Owns the authoritative [`EntityManager`], plus the id allocator the core
/// itself deliberately leaves to the role specialization (spec §4.2
/// "Policies": "ids are not recycled by the core itself").
pub struct ServerEntityManager<S: DeltaSink> {
    core: EntityManager<ServerHooks<S>>,
    ids: SyncedIdAllocator,
}

impl<S: DeltaSink> ServerEntityManager<S> {
    pub fn new(registry: ClassRegistry, config: ServerEntityManagerConfig, sink: S) -> Self {
        Self {
            core: EntityManager::new(Mode::Server, registry, config.entity_manager, ServerHooks::new(sink)),
            ids: SyncedIdAllocator::new(),
        }
    }

    /// Allocates a fresh synced entity id and constructs an instance of
    /// `class_id` there (spec §4.2 `AddEntity` + `ConstructEntity`).
    pub fn spawn_entity(&mut self, class_id: ClassId) -> Result<EntityId, EntityManagerError> {
        let (id, version) = self
            .ids
            .allocate()
            .map_err(|IdAllocationError::Exhausted { max }| {
                entityplex_shared::EntityStoreError::InvalidEntityId { id: 0, max }
            })?;
        self.core.add_entity(id, version, class_id, false)?;
        Ok(id)
    }

    /// Destroys and removes `id`, releasing it back to the allocator with a
    /// bumped version (spec §4.2 `DestroyInternal` + `RemoveEntity`, spec
    /// Invariant 8).
    pub fn despawn_entity(&mut self, id: EntityId) {
        self.core.destroy_entity(id);
        self.core.remove_entity(id);
        self.ids.release(id);
    }

    /// Rewinds every lag-compensated entity to `player`'s observed server
    /// tick, runs `op` against that rewound state, then restores
    /// present-time state (spec §4.5 "Lag-Compensation Protocol") — the
    /// server's hit-detection rewind, the protocol's primary use case.
    pub fn rewind_for_hit_detection<P: NetPlayer, R>(
        &mut self,
        player: &P,
        op: impl FnOnce(&mut EntityStore) -> R,
    ) -> R {
        self.core.with_lag_compensation(player, op)
    }
}

impl<S: DeltaSink> Deref for ServerEntityManager<S> {
    type Target = EntityManager<ServerHooks<S>>;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

impl<S: DeltaSink> DerefMut for ServerEntityManager<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entityplex_shared::{
        impl_internal_entity, ClassFlags, EntityConstructorParams, EntityHeader, EntityKind,
        EntityLogic, EntitySharedReference, InternalEntity,
    };

    use crate::delta::BufferedDeltaSink;

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
    fn spawn_assigns_the_first_synced_id() {
        let mut mgr = ServerEntityManager::new(
            registry(),
            ServerEntityManagerConfig::default(),
            BufferedDeltaSink::new(),
        );
        let id = mgr.spawn_entity(1).unwrap();
        assert_eq!(id, 1);
        assert_eq!(mgr.entities_count(), 1);
    }

    struct Shooter {
        header: EntityHeader,
        rewound_to: std::cell::Cell<Option<u16>>,
    }
    impl InternalEntity for Shooter {
        fn header(&self) -> &EntityHeader {
            &self.header
        }

        fn header_mut(&mut self) -> &mut EntityHeader {
            &mut self.header
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }

        fn on_lag_compensation_enable(&mut self, rewind_to_tick: u16) {
            self.rewound_to.set(Some(rewind_to_tick));
        }

        fn on_lag_compensation_disable(&mut self) {
            self.rewound_to.set(None);
        }
    }
    impl EntityLogic for Shooter {}

    fn ctor_shooter(p: EntityConstructorParams) -> Box<dyn InternalEntity> {
        Box::new(Shooter {
            header: EntityHeader::new(p.id, p.version, p.class_id, p.is_local, EntityKind::EntityLogic),
            rewound_to: std::cell::Cell::new(None),
        })
    }

    fn registry_with_lag_compensated_class() -> ClassRegistry {
        let mut reg = ClassRegistry::new();
        reg.register_entity_logic::<Shooter>(1, ctor_shooter, ClassFlags::UPDATEABLE, vec![], 1, vec![])
            .unwrap();
        reg.finish().unwrap();
        reg
    }

    struct FakePlayer {
        tick: u16,
    }
    impl entityplex_shared::NetPlayer for FakePlayer {
        fn simulated_server_tick(&self) -> u16 {
            self.tick
        }

        fn player_id(&self) -> u8 {
            1
        }
    }

    #[test]
    fn rewind_for_hit_detection_rewinds_and_restores_on_the_server() {
        let mut mgr = ServerEntityManager::new(
            registry_with_lag_compensated_class(),
            ServerEntityManagerConfig::default(),
            BufferedDeltaSink::new(),
        );
        let id = mgr.spawn_entity(1).unwrap();
        let player = FakePlayer { tick: 42 };

        let observed = mgr.rewind_for_hit_detection(&player, |store| {
            let entity = store.get(id).unwrap().as_any().downcast_ref::<Shooter>().unwrap();
            entity.rewound_to.get()
        });

        assert_eq!(observed, Some(42));
        let entity = mgr.get_entity_by_id::<Shooter>(EntitySharedReference::new(id, 0)).unwrap();
        assert_eq!(entity.rewound_to.get(), None);
    }

    #[test]
    fn despawn_then_spawn_bumps_the_version() {
        let mut mgr = ServerEntityManager::new(
            registry(),
            ServerEntityManagerConfig::default(),
            BufferedDeltaSink::new(),
        );
        let id = mgr.spawn_entity(1).unwrap();
        let stale = EntitySharedReference::new(id, 0);
        mgr.despawn_entity(id);

        let reused = mgr.spawn_entity(1).unwrap();
        assert_eq!(reused, id);
        assert!(mgr.get_entity_by_id::<A>(stale).is_none());
        assert!(mgr
            .get_entity_by_id::<A>(EntitySharedReference::new(id, 1))
            .is_some());
    }
}
