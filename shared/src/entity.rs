use std::any::Any;

use crate::class_registry::ClassId;

/// 16-bit entity id. `0` is reserved as invalid (spec §3). Synced entity ids
/// occupy `[1, MaxSyncedEntityCount]`; local ids occupy
/// `(MaxSyncedEntityCount, MaxEntityCount]`.
pub type EntityId = u16;

/// Monotonically increasing generation counter for a reused [`EntityId`] slot.
pub type Version = u16;

/// A `{Id, Version}` handle. Resolves to a live entity only when the stored
/// entity at `id` has the same `version` (spec Invariant 8, Design Note
/// "Stable entity handle across id reuse").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntitySharedReference {
    pub id: EntityId,
    pub version: Version,
}

impl EntitySharedReference {
    pub fn new(id: EntityId, version: Version) -> Self {
        Self { id, version }
    }
}

/// Common header every concrete entity embeds. Spec §3 `InternalEntity`.
///
/// A sum-typed implementation would fold this into an enum variant's shared
/// fields; here it is a plain struct that concrete entity types hold and
/// expose through [`InternalEntity::header`]/[`InternalEntity::header_mut`],
/// which keeps the store's bookkeeping (id, version, alive/destroyed
/// bookkeeping) out of gameplay-specific state.
/// Which of the three spec §3 entity shapes a header belongs to. Used in
/// place of a runtime trait-object check so the lag-compensation predicate
/// (spec Invariant 4, "e is EntityLogic") can be evaluated without downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    EntityLogic,
    ControllerLogic,
    SingletonEntityLogic,
}

#[derive(Debug, Clone)]
pub struct EntityHeader {
    id: EntityId,
    version: Version,
    class_id: ClassId,
    is_local: bool,
    is_destroyed: bool,
    kind: EntityKind,
}

impl EntityHeader {
    pub fn new(
        id: EntityId,
        version: Version,
        class_id: ClassId,
        is_local: bool,
        kind: EntityKind,
    ) -> Self {
        Self {
            id,
            version,
            class_id,
            is_local,
            is_destroyed: false,
            kind,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn is_destroyed(&self) -> bool {
        self.is_destroyed
    }

    pub fn shared_reference(&self) -> EntitySharedReference {
        EntitySharedReference::new(self.id, self.version)
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.is_destroyed = true;
    }
}

/// Abstract base of every entity (spec §3 `InternalEntity`). Concrete entity
/// types implement this by holding an [`EntityHeader`] and forwarding to it;
/// `as_any`/`as_any_mut` back typed queries (`GetEntityById<T>`, `GetEntities<T>`)
/// by letting the store downcast a `dyn InternalEntity` to its concrete type.
pub trait InternalEntity: Any {
    fn header(&self) -> &EntityHeader;
    fn header_mut(&mut self) -> &mut EntityHeader;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Invoked once, after singleton/filter insertion, before alive/lag-set
    /// membership (spec §5 "Construction ordering").
    fn on_constructed(&mut self) {}

    /// Invoked when the entity transitions to destroyed, before it is removed
    /// from `EntitiesDict` (spec §4.2 `destroy`).
    fn on_destroyed(&mut self) {}

    /// Invoked once per member of `LagCompensatedEntities` when lag
    /// compensation is enabled for a player action, passing the server tick
    /// to rewind to (spec §4.5 `enable`). Entities that declare a
    /// lag-compensated field count implement this to swap their rewindable
    /// fields to the buffered historical value.
    fn on_lag_compensation_enable(&mut self, _rewind_to_tick: u16) {}

    /// Symmetric to [`InternalEntity::on_lag_compensation_enable`] (spec §4.5
    /// `disable`).
    fn on_lag_compensation_disable(&mut self) {}
}

/// Marker for a non-controller, world-replicable entity. Eligible for
/// lag-compensation (spec §3 `EntityLogic`).
pub trait EntityLogic: InternalEntity {}

/// Marker for a player's controller entity. Always receives a FilterId, even
/// as the sole instance (spec §3 `ControllerLogic`).
pub trait ControllerLogic: InternalEntity {}

/// Marker for an entity class of which at most one instance exists at a time,
/// stored in a singleton slot rather than a filter (spec §3
/// `SingletonEntityLogic`).
pub trait SingletonEntityLogic: InternalEntity {}

/// Declares the boilerplate `InternalEntity` forwarding for a concrete entity
/// type that embeds an `EntityHeader` field named `header`.
#[macro_export]
macro_rules! impl_internal_entity {
    ($ty:ty) => {
        impl $crate::entity::InternalEntity for $ty {
            fn header(&self) -> &$crate::entity::EntityHeader {
                &self.header
            }

            fn header_mut(&mut self) -> &mut $crate::entity::EntityHeader {
                &mut self.header
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }
    };
}
