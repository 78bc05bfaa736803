use std::any::TypeId;
use std::collections::HashMap;

use crate::entity::{ControllerLogic, EntityKind, EntityLogic, InternalEntity, SingletonEntityLogic};
use crate::error::ClassRegistryError;

/// 16-bit stable class id, assigned by the host's type map collaborator
/// (spec §6) and never reassigned at runtime.
pub type ClassId = u16;

/// 16-bit dense filter id. Dense separately for singletons and non-singletons
/// (spec §4.1 rationale): a non-singleton class indexes into
/// `EntityFilter`/`AllEntities` scans, a singleton class indexes into the
/// singleton slot array. The two spaces overlap numerically but are never
/// compared against each other.
pub type FilterId = u16;

/// Stable per-field id within a class's field list.
pub type FieldId = u16;

/// FilterId reserved for the pre-registered controller base type (spec §4.1,
/// Design Note: "a historical constant ... not essential").
pub const CONTROLLER_BASE_FILTER_ID: FilterId = 0;

bitflags::bitflags! {
    /// The only core-visible bits of a class's flags word (spec §3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClassFlags: u8 {
        /// Entity receives `OnLogicTick`-driven updates while alive.
        const UPDATEABLE = 0b0000_0001;
        /// Entity remains alive-and-updated on a client as well as the server.
        const UPDATE_ON_CLIENT = 0b0000_0010;
    }
}

/// Per-field synchronization flags, independent of the three bits that
/// combine into `IsPredicted` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncFlags {
    /// Field's predicted slot is always rolled forward, even on other
    /// players' entities.
    pub always_rollback: bool,
    /// Field is only meaningful to players other than the entity's owner
    /// (excluded from prediction).
    pub only_for_other_players: bool,
    /// Field must never be rolled back, regardless of the other two bits.
    pub never_roll_back: bool,
}

impl SyncFlags {
    /// `IsPredicted = AlwaysRollback OR (NOT OnlyForOtherPlayers AND NOT NeverRollBack)`
    /// (spec §3).
    pub fn is_predicted(&self) -> bool {
        self.always_rollback || (!self.only_for_other_players && !self.never_roll_back)
    }
}

/// Describes one field of an entity class (spec §3 `EntityFieldInfo`).
#[derive(Debug, Clone, Copy)]
pub struct EntityFieldInfo {
    pub field_id: FieldId,
    pub size_bytes: u16,
    pub sync_flags: SyncFlags,
    pub has_change_notification: bool,
    /// Byte offset into per-entity state holding the authoritative value.
    pub fixed_offset: u16,
    /// Byte offset into per-entity state holding the predicted value.
    pub predicted_offset: u16,
}

impl EntityFieldInfo {
    pub fn is_predicted(&self) -> bool {
        self.sync_flags.is_predicted()
    }
}

/// Constructs a concrete entity from its allocated identity. The type map
/// collaborator (spec §6) supplies one of these per registered class.
pub type EntityConstructor = fn(EntityConstructorParams) -> Box<dyn InternalEntity>;

/// Identity assigned to a new entity before its constructor runs.
#[derive(Debug, Clone, Copy)]
pub struct EntityConstructorParams {
    pub id: crate::entity::EntityId,
    pub version: crate::entity::Version,
    pub class_id: ClassId,
    pub is_local: bool,
}

/// Per-class metadata (spec §3 `EntityClassData`).
#[derive(Clone)]
pub struct EntityClassData {
    pub class_id: ClassId,
    pub filter_id: FilterId,
    pub kind: EntityKind,
    pub constructor: EntityConstructor,
    pub flags: ClassFlags,
    pub fields: Vec<EntityFieldInfo>,
    pub lag_compensated_count: u16,
    /// FilterIds of this class's registered ancestors, nearest-first, so
    /// construction/destruction can fan out to every base filter (spec §4.1).
    pub base_ids: Vec<FilterId>,
}

impl EntityClassData {
    pub fn is_updateable(&self) -> bool {
        self.flags.contains(ClassFlags::UPDATEABLE)
    }

    pub fn is_update_on_client(&self) -> bool {
        self.flags.contains(ClassFlags::UPDATE_ON_CLIENT)
    }

    /// Singletons draw their FilterId from the dense singleton counter and
    /// live in [`crate::filters::FilterRegistry`]'s slot array rather than a
    /// materialized filter (spec §4.3).
    pub fn is_singleton(&self) -> bool {
        self.kind == EntityKind::SingletonEntityLogic
    }
}

struct PendingRegistration {
    type_id: TypeId,
    type_name: &'static str,
    class_id: ClassId,
    kind: EntityKind,
    constructor: EntityConstructor,
    flags: ClassFlags,
    fields: Vec<EntityFieldInfo>,
    lag_compensated_count: u16,
    /// Ancestor ClassIds, nearest-first, up to but not including the
    /// abstract roots (spec §4.1).
    ancestor_class_ids: Vec<ClassId>,
}

/// Maps each entity subtype to a stable ClassId, a dense FilterId, and its
/// base FilterId chain (spec §4.1).
///
/// Registration is two-pass: `register` stages every class and assigns its
/// own FilterId immediately (registration-order independent as far as
/// ClassId goes, since the caller supplies ClassId); `finish` then walks each
/// class's already-registered ancestors to build `base_ids`, exactly as spec
/// §4.1 describes.
pub struct ClassRegistry {
    class_data: HashMap<ClassId, EntityClassData>,
    type_to_class: HashMap<TypeId, ClassId>,
    name_to_class: HashMap<&'static str, ClassId>,
    filter_counter: FilterId,
    singleton_counter: FilterId,
    pending: Vec<PendingRegistration>,
    finished: bool,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            class_data: HashMap::new(),
            type_to_class: HashMap::new(),
            name_to_class: HashMap::new(),
            // FilterId 0 is reserved for the pre-registered controller base type.
            filter_counter: CONTROLLER_BASE_FILTER_ID + 1,
            singleton_counter: 0,
            pending: Vec::new(),
            finished: false,
        }
    }

    /// Stage a class for registration. `ancestor_class_ids` must already have
    /// been passed to an earlier `register_*` call in this batch
    /// (registration order matters only insofar as ancestors must precede
    /// descendants). Private: the three public `register_*` entry points
    /// each fix `kind` to the marker trait they require of `T`, so a class
    /// can never be registered with a kind its type doesn't actually
    /// implement.
    #[allow(clippy::too_many_arguments)]
    fn register_impl<T: 'static>(
        &mut self,
        class_id: ClassId,
        kind: EntityKind,
        constructor: EntityConstructor,
        flags: ClassFlags,
        fields: Vec<EntityFieldInfo>,
        lag_compensated_count: u16,
        ancestor_class_ids: Vec<ClassId>,
    ) -> Result<(), ClassRegistryError> {
        if self.finished {
            // Re-opening for a fresh registration batch (e.g. after `Reset`)
            // is allowed; a duplicate id within the same batch is not.
            self.finished = false;
        }
        if self.class_data.contains_key(&class_id)
            || self.pending.iter().any(|p| p.class_id == class_id)
        {
            return Err(ClassRegistryError::DuplicateClassId { class_id });
        }

        let is_singleton = kind == EntityKind::SingletonEntityLogic;
        let filter_id = if is_singleton {
            let id = self.singleton_counter;
            self.singleton_counter += 1;
            id
        } else {
            let id = self.filter_counter;
            self.filter_counter += 1;
            id
        };

        self.pending.push(PendingRegistration {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            class_id,
            kind,
            constructor,
            flags,
            fields,
            lag_compensated_count,
            ancestor_class_ids,
        });

        // Stage the FilterId assignment immediately so a later class in the
        // same batch can use this one as an ancestor.
        self.class_data.insert(
            class_id,
            EntityClassData {
                class_id,
                filter_id,
                kind,
                constructor,
                flags,
                fields: Vec::new(),
                lag_compensated_count,
                base_ids: Vec::new(),
            },
        );

        Ok(())
    }

    /// Registers a world-replicable entity class, eligible for lag
    /// compensation (spec §3 `EntityLogic`).
    #[allow(clippy::too_many_arguments)]
    pub fn register_entity_logic<T: EntityLogic>(
        &mut self,
        class_id: ClassId,
        constructor: EntityConstructor,
        flags: ClassFlags,
        fields: Vec<EntityFieldInfo>,
        lag_compensated_count: u16,
        ancestor_class_ids: Vec<ClassId>,
    ) -> Result<(), ClassRegistryError> {
        self.register_impl::<T>(
            class_id,
            EntityKind::EntityLogic,
            constructor,
            flags,
            fields,
            lag_compensated_count,
            ancestor_class_ids,
        )
    }

    /// Registers a player controller class. Always draws a FilterId, even as
    /// the sole instance (spec §3 `ControllerLogic`).
    #[allow(clippy::too_many_arguments)]
    pub fn register_controller_logic<T: ControllerLogic>(
        &mut self,
        class_id: ClassId,
        constructor: EntityConstructor,
        flags: ClassFlags,
        fields: Vec<EntityFieldInfo>,
        ancestor_class_ids: Vec<ClassId>,
    ) -> Result<(), ClassRegistryError> {
        self.register_impl::<T>(
            class_id,
            EntityKind::ControllerLogic,
            constructor,
            flags,
            fields,
            0,
            ancestor_class_ids,
        )
    }

    /// Registers a class of which at most one instance exists at a time
    /// (spec §3 `SingletonEntityLogic`).
    pub fn register_singleton<T: SingletonEntityLogic>(
        &mut self,
        class_id: ClassId,
        constructor: EntityConstructor,
        flags: ClassFlags,
        fields: Vec<EntityFieldInfo>,
        ancestor_class_ids: Vec<ClassId>,
    ) -> Result<(), ClassRegistryError> {
        self.register_impl::<T>(
            class_id,
            EntityKind::SingletonEntityLogic,
            constructor,
            flags,
            fields,
            0,
            ancestor_class_ids,
        )
    }

    /// Second pass: resolve every pending class's ancestor chain to FilterIds
    /// and lock the registry (spec §4.1 "second pass").
    pub fn finish(&mut self) -> Result<(), ClassRegistryError> {
        let pending = std::mem::take(&mut self.pending);
        for p in pending {
            let mut base_ids = Vec::with_capacity(p.ancestor_class_ids.len());
            for ancestor in &p.ancestor_class_ids {
                let ancestor_data = self.class_data.get(ancestor).ok_or(
                    ClassRegistryError::UnregisteredClass {
                        class_id: *ancestor,
                    },
                )?;
                if ancestor_data.is_singleton() != (p.kind == EntityKind::SingletonEntityLogic) {
                    return Err(ClassRegistryError::MixedSingletonAncestry {
                        class_id: p.class_id,
                    });
                }
                base_ids.push(ancestor_data.filter_id);
            }

            let data = self
                .class_data
                .get_mut(&p.class_id)
                .expect("staged during register()");
            data.fields = p.fields;
            data.base_ids = base_ids;

            self.type_to_class.insert(p.type_id, p.class_id);
            self.name_to_class.insert(p.type_name, p.class_id);
        }
        self.finished = true;
        Ok(())
    }

    pub fn class_data(&self, class_id: ClassId) -> Option<&EntityClassData> {
        self.class_data.get(&class_id)
    }

    pub fn class_id_of<T: 'static>(&self) -> Option<ClassId> {
        self.type_to_class.get(&TypeId::of::<T>()).copied()
    }

    pub fn class_id_by_name(&self, type_name: &'static str) -> Option<ClassId> {
        self.name_to_class.get(type_name).copied()
    }

    pub fn filter_id_of<T: 'static>(&self) -> Option<FilterId> {
        self.class_id_of::<T>()
            .and_then(|id| self.class_data.get(&id))
            .map(|d| d.filter_id)
    }

    pub fn is_registered(&self, class_id: ClassId) -> bool {
        self.class_data.contains_key(&class_id)
    }

    /// One past the highest non-singleton FilterId handed out so far; sizes
    /// the non-singleton filter space.
    pub fn filter_count(&self) -> FilterId {
        self.filter_counter
    }

    /// One past the highest singleton FilterId handed out so far; sizes the
    /// singleton slot array.
    pub fn singleton_count(&self) -> FilterId {
        self.singleton_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! stub_internal_entity {
        ($ty:ident) => {
            struct $ty;
            impl crate::entity::InternalEntity for $ty {
                fn header(&self) -> &crate::entity::EntityHeader {
                    unimplemented!()
                }
                fn header_mut(&mut self) -> &mut crate::entity::EntityHeader {
                    unimplemented!()
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

    stub_internal_entity!(A);
    impl EntityLogic for A {}
    stub_internal_entity!(B);
    impl EntityLogic for B {}
    stub_internal_entity!(D);
    impl EntityLogic for D {}
    stub_internal_entity!(Single);
    impl SingletonEntityLogic for Single {}

    fn ctor(_: EntityConstructorParams) -> Box<dyn InternalEntity> {
        unimplemented!("test constructor stub")
    }

    #[test]
    fn base_id_fan_out_resolves_ancestor_filter_ids() {
        let mut reg = ClassRegistry::new();
        reg.register_entity_logic::<A>(1, ctor, ClassFlags::empty(), vec![], 0, vec![])
            .unwrap();
        reg.register_entity_logic::<B>(2, ctor, ClassFlags::empty(), vec![], 0, vec![1])
            .unwrap();
        reg.register_entity_logic::<D>(3, ctor, ClassFlags::empty(), vec![], 0, vec![1, 2])
            .unwrap();
        reg.finish().unwrap();

        let a_filter = reg.class_data(1).unwrap().filter_id;
        let b_filter = reg.class_data(2).unwrap().filter_id;
        let d_data = reg.class_data(3).unwrap();
        assert_eq!(d_data.base_ids, vec![a_filter, b_filter]);
    }

    #[test]
    fn singleton_and_non_singleton_counters_are_independent() {
        let mut reg = ClassRegistry::new();
        reg.register_entity_logic::<A>(1, ctor, ClassFlags::empty(), vec![], 0, vec![])
            .unwrap();
        reg.register_singleton::<Single>(2, ctor, ClassFlags::empty(), vec![], vec![])
            .unwrap();
        reg.finish().unwrap();

        // Non-singleton FilterId space starts after the reserved controller slot.
        assert_eq!(reg.class_data(1).unwrap().filter_id, CONTROLLER_BASE_FILTER_ID + 1);
        // Singleton FilterId space starts at 0, independently.
        assert_eq!(reg.class_data(2).unwrap().filter_id, 0);
    }

    #[test]
    fn duplicate_class_id_is_rejected() {
        let mut reg = ClassRegistry::new();
        reg.register_entity_logic::<A>(1, ctor, ClassFlags::empty(), vec![], 0, vec![])
            .unwrap();
        let err = reg
            .register_entity_logic::<B>(1, ctor, ClassFlags::empty(), vec![], 0, vec![])
            .unwrap_err();
        assert_eq!(err, ClassRegistryError::DuplicateClassId { class_id: 1 });
    }
}
