use std::collections::HashMap;

use crate::class_registry::{ClassId, ClassRegistry, FilterId};
use crate::entity::EntityId;
use crate::error::QueryError;
use crate::ordered_set::OrderedEntitySet;
use crate::store::EntityStore;

/// One queryable collection per non-singleton FilterId, lazily materialized;
/// one slot per singleton FilterId (spec §4.3).
pub struct FilterRegistry {
    singleton_slots: Vec<Option<EntityId>>,
    /// Presence of a key means the filter has been materialized (spec §4.3
    /// "A filter for `T` is materialized on first request").
    filters: HashMap<FilterId, OrderedEntitySet>,
}

impl FilterRegistry {
    pub fn new(registry: &ClassRegistry) -> Self {
        Self {
            singleton_slots: vec![None; registry.singleton_count() as usize],
            filters: HashMap::new(),
        }
    }

    fn fan_out_ids(class_data: &crate::class_registry::EntityClassData) -> impl Iterator<Item = FilterId> + '_ {
        std::iter::once(class_data.filter_id).chain(class_data.base_ids.iter().copied())
    }

    /// Fan out a freshly constructed entity into its own FilterId and every
    /// base FilterId (spec Invariants 5 & 6).
    pub fn on_construct(&mut self, registry: &ClassRegistry, class_id: ClassId, entity_id: EntityId) {
        let class_data = registry
            .class_data(class_id)
            .expect("on_construct called with unregistered class");

        if class_data.is_singleton() {
            for fid in Self::fan_out_ids(class_data) {
                if let Some(slot) = self.singleton_slots.get_mut(fid as usize) {
                    *slot = Some(entity_id);
                }
            }
        } else {
            for fid in Self::fan_out_ids(class_data) {
                if let Some(set) = self.filters.get_mut(&fid) {
                    set.insert(entity_id);
                }
            }
        }
    }

    /// Symmetric removal on destruction (spec Invariants 5 & 6).
    pub fn on_destroy(&mut self, registry: &ClassRegistry, class_id: ClassId, entity_id: EntityId) {
        let class_data = registry
            .class_data(class_id)
            .expect("on_destroy called with unregistered class");

        if class_data.is_singleton() {
            for fid in Self::fan_out_ids(class_data) {
                if let Some(slot) = self.singleton_slots.get_mut(fid as usize) {
                    if *slot == Some(entity_id) {
                        *slot = None;
                    }
                }
            }
        } else {
            for fid in Self::fan_out_ids(class_data) {
                if let Some(set) = self.filters.get_mut(&fid) {
                    set.remove(entity_id);
                }
            }
        }
    }

    /// `GetEntities<T>` (spec §4.3): materializes the filter on first
    /// request by scanning `AllEntities` once, then returns it. Every
    /// subsequent call reuses the live, continuously-maintained set.
    pub fn get_entities<T: 'static>(
        &mut self,
        registry: &ClassRegistry,
        store: &EntityStore,
    ) -> Result<&OrderedEntitySet, QueryError> {
        let fid = registry
            .filter_id_of::<T>()
            .ok_or(QueryError::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            })?;

        if !self.filters.contains_key(&fid) {
            let mut set = OrderedEntitySet::new();
            for id in store.all_entities().iter() {
                let Some(entity) = store.get(id) else { continue };
                if entity.header().is_destroyed() {
                    continue;
                }
                let class_data = registry
                    .class_data(entity.header().class_id())
                    .expect("live entity with unregistered class");
                if Self::fan_out_ids(class_data).any(|f| f == fid) {
                    set.insert(id);
                }
            }
            self.filters.insert(fid, set);
        }
        Ok(self.filters.get(&fid).unwrap())
    }

    /// `GetSingleton<T>`/`HasSingleton<T>` (spec §4.3): checks both presence
    /// and that the stored instance is still of runtime type `T`.
    pub fn get_singleton<'a, T: 'static>(
        &self,
        registry: &ClassRegistry,
        store: &'a EntityStore,
    ) -> Result<Option<&'a T>, QueryError> {
        let fid = registry
            .filter_id_of::<T>()
            .ok_or(QueryError::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            })?;
        let Some(Some(id)) = self.singleton_slots.get(fid as usize) else {
            return Ok(None);
        };
        Ok(store.get(*id).and_then(|e| e.as_any().downcast_ref::<T>()))
    }

    pub fn has_singleton<T: 'static>(
        &self,
        registry: &ClassRegistry,
        store: &EntityStore,
    ) -> Result<bool, QueryError> {
        Ok(self.get_singleton::<T>(registry, store)?.is_some())
    }

    /// `Reset` (spec §3 "Manager" lifecycle): drops every materialized
    /// filter and clears every singleton slot.
    pub fn reset(&mut self) {
        self.filters.clear();
        for slot in &mut self.singleton_slots {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_registry::{ClassFlags, EntityConstructorParams};
    use crate::entity::{impl_internal_entity, EntityHeader, EntityKind, EntityLogic, InternalEntity};
    use crate::role::Mode;

    macro_rules! stub_entity_logic {
        ($ty:ident) => {
            struct $ty;
            impl crate::entity::InternalEntity for $ty {
                fn header(&self) -> &EntityHeader {
                    unimplemented!()
                }
                fn header_mut(&mut self) -> &mut EntityHeader {
                    unimplemented!()
                }
                fn as_any(&self) -> &dyn std::any::Any {
                    self
                }
                fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                    self
                }
            }
            impl EntityLogic for $ty {}
        };
    }

    stub_entity_logic!(A);
    stub_entity_logic!(B);
    stub_entity_logic!(D);

    struct TestEntity {
        header: EntityHeader,
    }
    impl_internal_entity!(TestEntity);
    impl EntityLogic for TestEntity {}

    fn ctor(p: EntityConstructorParams) -> Box<dyn InternalEntity> {
        Box::new(TestEntity {
            header: EntityHeader::new(p.id, p.version, p.class_id, p.is_local, EntityKind::EntityLogic),
        })
    }

    fn registry_with_hierarchy() -> ClassRegistry {
        let mut reg = ClassRegistry::new();
        reg.register_entity_logic::<A>(1, ctor, ClassFlags::UPDATEABLE, vec![], 0, vec![])
            .unwrap();
        reg.register_entity_logic::<B>(2, ctor, ClassFlags::UPDATEABLE, vec![], 0, vec![1])
            .unwrap();
        reg.register_entity_logic::<D>(3, ctor, ClassFlags::UPDATEABLE, vec![], 0, vec![1, 2])
            .unwrap();
        reg.finish().unwrap();
        reg
    }

    #[test]
    fn base_id_fan_out_populates_ancestor_filters() {
        let reg = registry_with_hierarchy();
        let mut store = EntityStore::new(Mode::Server);
        let mut filters = FilterRegistry::new(&reg);

        store.add(&reg, 1, 0, 3, false).unwrap();
        store.construct(&reg, 1);
        filters.on_construct(&reg, 3, 1);

        assert!(filters.get_entities::<A>(&reg, &store).unwrap().contains(1));
        assert!(filters.get_entities::<B>(&reg, &store).unwrap().contains(1));
        assert!(filters.get_entities::<D>(&reg, &store).unwrap().contains(1));

        store.destroy(1);
        filters.on_destroy(&reg, 3, 1);
        assert!(!filters.get_entities::<A>(&reg, &store).unwrap().contains(1));
        assert!(!filters.get_entities::<B>(&reg, &store).unwrap().contains(1));
    }

    #[test]
    fn singleton_slot_is_replaced_after_destruction() {
        struct S {
            header: EntityHeader,
        }
        impl_internal_entity!(S);
        impl crate::entity::SingletonEntityLogic for S {}

        fn s_ctor(p: EntityConstructorParams) -> Box<dyn InternalEntity> {
            Box::new(S {
                header: EntityHeader::new(
                    p.id,
                    p.version,
                    p.class_id,
                    p.is_local,
                    EntityKind::SingletonEntityLogic,
                ),
            })
        }

        let mut reg = ClassRegistry::new();
        reg.register_singleton::<S>(1, s_ctor, ClassFlags::UPDATEABLE, vec![], vec![])
            .unwrap();
        reg.finish().unwrap();

        let mut store = EntityStore::new(Mode::Server);
        let mut filters = FilterRegistry::new(&reg);

        store.add(&reg, 1, 0, 1, false).unwrap();
        store.construct(&reg, 1);
        filters.on_construct(&reg, 1, 1);
        assert!(filters.get_singleton::<S>(&reg, &store).unwrap().is_some());

        store.destroy(1);
        filters.on_destroy(&reg, 1, 1);
        assert!(filters.get_singleton::<S>(&reg, &store).unwrap().is_none());
        assert!(!filters.has_singleton::<S>(&reg, &store).unwrap());
    }
}
