use std::collections::HashMap;

use log::warn;

use crate::class_registry::{ClassId, ClassRegistry};
use crate::constants::MAX_ENTITY_COUNT;
use crate::entity::{EntityId, EntityKind, EntitySharedReference, InternalEntity, Version};
use crate::error::EntityStoreError;
use crate::ordered_set::OrderedEntitySet;
use crate::role::Mode;

struct Slot {
    entity: Box<dyn InternalEntity>,
}

/// The id→entity table and its derived membership sets (spec §4.2):
/// `EntitiesDict`, `AllEntities`, `AliveEntities`, `LagCompensatedEntities`.
///
/// Ids are not recycled by the store itself (spec §4.2 "Policies"); the role
/// specialization that allocates ids decides when an id is safe to reuse and
/// supplies the bumped [`Version`] at `add` time. The store only enforces
/// range and version checks on lookup.
pub struct EntityStore {
    mode: Mode,
    entities: Vec<Option<Slot>>,
    entities_count: usize,
    all_entities: OrderedEntitySet,
    alive_entities: OrderedEntitySet,
    lag_compensated_entities: OrderedEntitySet,
    class_pool: HashMap<ClassId, Vec<Box<dyn InternalEntity>>>,
}

impl EntityStore {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            // Index 0 is never used (0 is the invalid entity id); size the
            // table so ids `1..=MAX_ENTITY_COUNT` index directly.
            entities: (0..=MAX_ENTITY_COUNT).map(|_| None).collect(),
            entities_count: 0,
            all_entities: OrderedEntitySet::new(),
            alive_entities: OrderedEntitySet::new(),
            lag_compensated_entities: OrderedEntitySet::new(),
            class_pool: HashMap::new(),
        }
    }

    pub fn entities_count(&self) -> usize {
        self.entities_count
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// `AddEntity(params)` (spec §4.2): validates id and class, invokes the
    /// class constructor (recycling a pooled allocation of the same class
    /// when one is available), and installs the result into `EntitiesDict`.
    pub fn add(
        &mut self,
        registry: &ClassRegistry,
        id: EntityId,
        version: Version,
        class_id: ClassId,
        is_local: bool,
    ) -> Result<(), EntityStoreError> {
        if id == 0 || id as u32 > MAX_ENTITY_COUNT as u32 {
            return Err(EntityStoreError::InvalidEntityId {
                id,
                max: MAX_ENTITY_COUNT,
            });
        }
        let class_data = registry
            .class_data(class_id)
            .ok_or(EntityStoreError::UnregisteredClass { class_id })?;

        if self.entities[id as usize].is_some() {
            return Err(EntityStoreError::SlotOccupied { id });
        }

        let params = crate::class_registry::EntityConstructorParams {
            id,
            version,
            class_id,
            is_local,
        };

        let mut entity = match self.class_pool.get_mut(&class_id).and_then(Vec::pop) {
            Some(mut recycled) => {
                *recycled.header_mut() = crate::entity::EntityHeader::new(
                    id,
                    version,
                    class_id,
                    is_local,
                    class_data.kind,
                );
                recycled
            }
            None => (class_data.constructor)(params),
        };
        debug_assert_eq!(entity.header().id(), id);

        self.entities[id as usize] = Some(Slot { entity });
        self.entities_count += 1;
        Ok(())
    }

    /// `ConstructEntity` (spec §4.2): adds to `AllEntities`, to
    /// `AliveEntities`/`LagCompensatedEntities` if their predicates hold, and
    /// invokes `OnConstructed` (after set membership updates complete,
    /// before alive/lag membership is computed, matching spec §5
    /// "Construction ordering" except `OnConstructed` itself is the final
    /// step here since alive/lag membership derives purely from class data
    /// with no observable side effect for `OnConstructed` to race).
    ///
    /// Returns whether the entity was added to `AliveEntities`, so the
    /// caller can invoke `OnAliveEntityAdded`.
    pub fn construct(&mut self, registry: &ClassRegistry, id: EntityId) -> bool {
        let class_id = self.entities[id as usize]
            .as_ref()
            .expect("construct called on unknown id")
            .entity
            .header()
            .class_id();
        let class_data = registry
            .class_data(class_id)
            .expect("construct called with unregistered class");

        self.all_entities.insert(id);

        if let Some(slot) = self.entities[id as usize].as_mut() {
            slot.entity.on_constructed();
        }

        let header = self.entities[id as usize]
            .as_ref()
            .unwrap()
            .entity
            .header();
        let is_alive = Self::alive_predicate(self.mode, class_data, header.is_local());
        let is_lag_compensated =
            Self::lag_compensated_predicate(class_data, header.is_local(), header.kind());

        if is_alive {
            self.alive_entities.insert(id);
        }
        if is_lag_compensated {
            self.lag_compensated_entities.insert(id);
        }
        is_alive
    }

    /// `DestroyInternal` (spec §4.2): symmetric to `construct` minus
    /// `AllEntities` membership, which persists until `remove`.
    pub fn destroy(&mut self, id: EntityId) {
        let Some(slot) = self.entities[id as usize].as_mut() else {
            warn!("destroy called on empty entity slot {id}");
            return;
        };
        slot.entity.header_mut().mark_destroyed();
        slot.entity.on_destroyed();
        self.alive_entities.remove(id);
        self.lag_compensated_entities.remove(id);
    }

    /// `RemoveEntity` (spec §4.2): requires `IsDestroyed`; logs and proceeds
    /// otherwise (spec §7 `LogicWarning`, §9 Open Questions resolved in
    /// favor of not aborting). Releases the allocation back to the class
    /// pool.
    pub fn remove(&mut self, registry: &ClassRegistry, id: EntityId) {
        let Some(mut slot) = self.entities[id as usize].take() else {
            warn!("remove called on empty entity slot {id}");
            return;
        };
        if !slot.entity.header().is_destroyed() {
            warn!(
                "removing entity {id} that was never marked destroyed (spec §7 LogicWarning)"
            );
        }
        self.all_entities.remove(id);
        self.entities_count -= 1;

        let class_id = slot.entity.header().class_id();
        if registry.is_registered(class_id) {
            self.class_pool.entry(class_id).or_default().push(slot.entity);
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&dyn InternalEntity> {
        self.entities
            .get(id as usize)
            .and_then(|s| s.as_ref())
            .map(|s| s.entity.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Box<dyn InternalEntity>> {
        self.entities
            .get_mut(id as usize)
            .and_then(|s| s.as_mut())
            .map(|s| &mut s.entity)
    }

    /// `GetEntityById<T>(ref)` (spec §4.2): `id != 0`, slot occupied, runtime
    /// type matches `T`, and stored version equals `ref.version`.
    pub fn get_by_id<T: 'static>(&self, reference: EntitySharedReference) -> Option<&T> {
        if reference.id == 0 {
            return None;
        }
        let entity = self.get(reference.id)?;
        if entity.header().version() != reference.version {
            return None;
        }
        entity.as_any().downcast_ref::<T>()
    }

    pub fn get_by_id_mut<T: 'static>(
        &mut self,
        reference: EntitySharedReference,
    ) -> Option<&mut T> {
        if reference.id == 0 {
            return None;
        }
        let version_ok = self
            .get(reference.id)
            .map(|e| e.header().version() == reference.version)
            .unwrap_or(false);
        if !version_ok {
            return None;
        }
        self.get_mut(reference.id)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn all_entities(&self) -> &OrderedEntitySet {
        &self.all_entities
    }

    pub fn alive_entities(&self) -> &OrderedEntitySet {
        &self.alive_entities
    }

    pub fn lag_compensated_entities(&self) -> &OrderedEntitySet {
        &self.lag_compensated_entities
    }

    /// Recomputes whether `id` belongs in `AliveEntities` right now, without
    /// mutating membership. Exposed for the lifecycle orchestrator to assert
    /// against (spec §8 "`AliveEntities` membership equals the alive
    /// predicate at all times").
    pub fn alive_predicate(
        mode: Mode,
        class_data: &crate::class_registry::EntityClassData,
        is_local: bool,
    ) -> bool {
        class_data.is_updateable()
            && (mode == Mode::Server || is_local || (mode == Mode::Client && class_data.is_update_on_client()))
    }

    pub fn lag_compensated_predicate(
        class_data: &crate::class_registry::EntityClassData,
        is_local: bool,
        kind: EntityKind,
    ) -> bool {
        !is_local && kind == EntityKind::EntityLogic && class_data.lag_compensated_count > 0
    }
}
