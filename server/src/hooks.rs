//! Server implementation of [`entityplex_shared::RoleHooks`] (spec §4.6).

use log::trace;

use entityplex_shared::{EntityId, EntityStore, FieldId, FieldValue, RoleHooks};

use crate::delta::{DeltaSink, FieldDelta};

/// Drives the authoritative simulation forward and buffers every changed
/// field into a [`DeltaSink`] for the (out-of-scope) transport to drain and
/// encode (spec §2, §4.6).
pub struct ServerHooks<S: DeltaSink> {
    sink: S,
}

impl<S: DeltaSink> ServerHooks<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: DeltaSink> RoleHooks for ServerHooks<S> {
    /// The server has no logic of its own to run here (spec §2 "role-
    /// agnostic except for a `Mode` flag"): per-entity gameplay logic is a
    /// concrete entity subclass's concern (spec §1, out of scope), invoked
    /// by iterating `AliveEntities` at the call site that owns the world.
    fn on_logic_tick(&mut self, _store: &mut EntityStore) {}

    fn on_entity_field_changed<T: FieldValue>(
        &mut self,
        entity_id: EntityId,
        field_id: FieldId,
        new_value: &T,
    ) {
        trace!("entity {entity_id} field {field_id} changed, buffering delta");
        self.sink
            .push(FieldDelta::new(entity_id, field_id, new_value.clone()));
    }

    fn on_alive_entity_added(&mut self, entity_id: EntityId) {
        trace!("entity {entity_id} added to AliveEntities");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::BufferedDeltaSink;

    #[test]
    fn field_changes_are_buffered_into_the_sink() {
        let mut hooks = ServerHooks::new(BufferedDeltaSink::new());
        hooks.on_entity_field_changed(7, 2, &42u32);
        hooks.on_entity_field_changed(7, 3, &43u32);

        let drained = hooks.sink_mut().drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(*drained[0].downcast::<u32>().unwrap(), 42);
    }
}
