//! The client-role specialization of [`entityplex_shared::EntityManager`]
//! (spec §2 "Role Specializations (server/client)").

use std::ops::{Deref, DerefMut};

use entityplex_shared::{
    ClassId, ClassRegistry, EntityManager, EntityManagerConfig, EntityManagerError,
    EntitySharedReference, Mode,
};

use crate::hooks::ClientHooks;
use crate::id_allocator::{LocalIdAllocationError, LocalIdAllocator};
use crate::reconcile::Predictable;
use crate::rollback::RollbackController;
use crate::speed_slew::SpeedSlewController;

#[derive(Debug, Clone, Copy)]
pub struct ClientEntityManagerConfig {
    pub entity_manager: EntityManagerConfig,
    pub max_replay_ticks: u16,
    pub target_tick_offset: i16,
}

impl Default for ClientEntityManagerConfig {
    fn default() -> Self {
        Self {
            entity_manager: EntityManagerConfig::default(),
            max_replay_ticks: 32,
            target_tick_offset: 2,
        }
    }
}

/// Owns the predicting [`EntityManager`], the local (non-synced) id
/// allocator a client needs for purely local entities, the rollback state
/// machine, and the speed-slew controller (spec §2 "Role Specializations").
pub struct ClientEntityManager {
    core: EntityManager<ClientHooks>,
    local_ids: LocalIdAllocator,
    rollback: RollbackController,
    speed_slew: SpeedSlewController,
}

impl ClientEntityManager {
    pub fn new(registry: ClassRegistry, config: ClientEntityManagerConfig) -> Self {
        Self {
            core: EntityManager::new(
                Mode::Client,
                registry,
                config.entity_manager,
                ClientHooks::new(),
            ),
            local_ids: LocalIdAllocator::new(),
            rollback: RollbackController::new(config.max_replay_ticks),
            speed_slew: SpeedSlewController::new(config.target_tick_offset),
        }
    }

    /// Constructs a purely local entity (never replicated, never touched by
    /// rollback replay of synced state) using the client's own id range
    /// (spec §3 "local (non-synced) ids").
    pub fn spawn_local_entity(
        &mut self,
        class_id: ClassId,
    ) -> Result<entityplex_shared::EntityId, EntityManagerError> {
        let (id, version) = self
            .local_ids
            .allocate()
            .map_err(|LocalIdAllocationError::Exhausted { max, .. }| {
                entityplex_shared::EntityStoreError::InvalidEntityId { id: 0, max }
            })?;
        self.core.add_entity(id, version, class_id, true)?;
        Ok(id)
    }

    pub fn despawn_local_entity(&mut self, id: entityplex_shared::EntityId) {
        self.core.destroy_entity(id);
        self.core.remove_entity(id);
        self.local_ids.release(id);
    }

    /// Rewinds and replays `ticks_to_replay` logic ticks to reconcile
    /// predicted state against a freshly received authoritative snapshot
    /// (spec §9 Design Note "Rollback discipline").
    pub fn reconcile(&mut self, ticks_to_replay: u16) {
        self.rollback.reconcile(&mut self.core, ticks_to_replay);
    }

    /// Nudges `SpeedMultiplier` toward the observed server tick (spec §4.4).
    pub fn slew_toward_server_tick(&mut self, observed_server_tick: u16) {
        self.speed_slew.update(&mut self.core, observed_server_tick);
    }

    /// Copies every non-predicted field's authoritative value into `reference`'s
    /// live slot (spec §3 `EntityFieldInfo::IsPredicted`, §9 Design Note
    /// "Rollback discipline"). Called after a rollback's replay has put the
    /// fixed/received values in place, before gameplay resumes reading them.
    pub fn reconcile_non_predicted_fields<T: Predictable + 'static>(
        &mut self,
        reference: EntitySharedReference,
    ) {
        let Some(entity) = self.core.store().get(reference.id()) else {
            return;
        };
        let class_id = entity.header().class_id();
        let Some(class_data) = self.core.registry().class_data(class_id) else {
            return;
        };
        let field_ids: Vec<_> = class_data
            .fields
            .iter()
            .filter(|info| !info.is_predicted())
            .map(|info| info.field_id)
            .collect();
        if field_ids.is_empty() {
            return;
        }
        if let Some(entity) = self.core.get_entity_by_id_mut::<T>(reference) {
            for field_id in field_ids {
                entity.reconcile_field(field_id);
            }
        }
    }
}

impl Deref for ClientEntityManager {
    type Target = EntityManager<ClientHooks>;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

impl DerefMut for ClientEntityManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entityplex_shared::{
        impl_internal_entity, ClassFlags, EntityConstructorParams, EntityFieldInfo, EntityHeader,
        EntityKind, EntityLogic, InternalEntity, SyncFlags, TrackedField,
    };

    struct A {
        header: EntityHeader,
        // Field 1 (`always_rollback`, predicted): its own fixed/predicted pair.
        field1_fixed: TrackedField<u32>,
        field1_predicted: TrackedField<u32>,
        // Field 2 (`never_roll_back`, non-predicted): its own fixed/predicted pair.
        field2_fixed: TrackedField<u32>,
        field2_predicted: TrackedField<u32>,
    }
    impl_internal_entity!(A);
    impl EntityLogic for A {}

    impl Predictable for A {
        fn reconcile_field(&mut self, field_id: u16) {
            if field_id == self.field1_fixed.field_id() {
                let authoritative = *self.field1_fixed.get();
                self.field1_predicted.set_unconditionally(authoritative);
            } else if field_id == self.field2_fixed.field_id() {
                let authoritative = *self.field2_fixed.get();
                self.field2_predicted.set_unconditionally(authoritative);
            }
        }
    }

    fn ctor(p: EntityConstructorParams) -> Box<dyn InternalEntity> {
        Box::new(A {
            header: EntityHeader::new(p.id, p.version, p.class_id, p.is_local, EntityKind::EntityLogic),
            field1_fixed: TrackedField::new(1, 0),
            field1_predicted: TrackedField::new(1, 0),
            field2_fixed: TrackedField::new(2, 0),
            field2_predicted: TrackedField::new(2, 0),
        })
    }

    fn registry() -> ClassRegistry {
        let mut reg = ClassRegistry::new();
        reg.register_entity_logic::<A>(
            1,
            ctor,
            ClassFlags::UPDATEABLE,
            vec![
                EntityFieldInfo {
                    field_id: 1,
                    size_bytes: 4,
                    sync_flags: SyncFlags {
                        always_rollback: true,
                        ..SyncFlags::default()
                    },
                    has_change_notification: false,
                    fixed_offset: 0,
                    predicted_offset: 0,
                },
                EntityFieldInfo {
                    field_id: 2,
                    size_bytes: 4,
                    sync_flags: SyncFlags {
                        never_roll_back: true,
                        ..SyncFlags::default()
                    },
                    has_change_notification: false,
                    fixed_offset: 4,
                    predicted_offset: 4,
                },
            ],
            0,
            vec![],
        )
        .unwrap();
        reg.finish().unwrap();
        reg
    }

    #[test]
    fn spawn_local_assigns_an_id_above_the_synced_range() {
        let mut mgr = ClientEntityManager::new(registry(), ClientEntityManagerConfig::default());
        let id = mgr.spawn_local_entity(1).unwrap();
        assert!(id > entityplex_shared::MAX_SYNCED_ENTITY_COUNT);
    }

    #[test]
    fn despawn_then_spawn_bumps_the_version() {
        let mut mgr = ClientEntityManager::new(registry(), ClientEntityManagerConfig::default());
        let id = mgr.spawn_local_entity(1).unwrap();
        mgr.despawn_local_entity(id);
        let reused = mgr.spawn_local_entity(1).unwrap();
        assert_eq!(reused, id);
        assert!(mgr
            .get_entity_by_id::<A>(EntitySharedReference::new(id, 1))
            .is_some());
    }

    #[test]
    fn reconcile_non_predicted_fields_overwrites_only_the_non_predicted_slot() {
        let mut mgr = ClientEntityManager::new(registry(), ClientEntityManagerConfig::default());
        let id = mgr.spawn_local_entity(1).unwrap();
        let reference = EntitySharedReference::new(id, 0);

        {
            let entity = mgr.get_entity_by_id_mut::<A>(reference).unwrap();
            // field 1 is predicted: diverges from its authoritative value and
            // must be left alone by reconciliation.
            entity.field1_fixed.set_unconditionally(50);
            entity.field1_predicted.set_unconditionally(11);
            // field 2 is non-predicted: its predicted slot must be snapped
            // back to the authoritative value.
            entity.field2_fixed.set_unconditionally(99);
            entity.field2_predicted.set_unconditionally(7);
        }

        mgr.reconcile_non_predicted_fields::<A>(reference);

        let entity = mgr.get_entity_by_id::<A>(reference).unwrap();
        assert_eq!(*entity.field1_predicted.get(), 11, "predicted field must not be reconciled");
        assert_eq!(*entity.field2_predicted.get(), 99, "non-predicted field must match authority");
    }
}
