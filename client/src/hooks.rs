//! Client implementation of [`entityplex_shared::RoleHooks`] (spec §4.6).

use log::trace;

use entityplex_shared::{EntityId, EntityStore, FieldId, FieldValue, RoleHooks};

/// Gameplay logic lives in concrete entity subclasses (out of scope here,
/// same as the server side); what this hooks implementation owns is purely
/// observational bookkeeping used by the rest of the client crate and by
/// callers diagnosing misprediction rates.
#[derive(Debug, Default)]
pub struct ClientHooks {
    mispredictions: u64,
}

impl ClientHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of `EntityFieldChanged` notifications observed since
    /// construction — a field changing during rollback replay means the
    /// predicted value diverged from what the server actually sent.
    pub fn mispredictions(&self) -> u64 {
        self.mispredictions
    }
}

impl RoleHooks for ClientHooks {
    fn on_logic_tick(&mut self, _store: &mut EntityStore) {}

    fn on_entity_field_changed<T: FieldValue>(
        &mut self,
        entity_id: EntityId,
        field_id: FieldId,
        _new_value: &T,
    ) {
        trace!("entity {entity_id} field {field_id} diverged from prediction");
        self.mispredictions += 1;
    }

    fn on_alive_entity_added(&mut self, entity_id: EntityId) {
        trace!("entity {entity_id} added to AliveEntities");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_changes_increment_the_misprediction_counter() {
        let mut hooks = ClientHooks::new();
        hooks.on_entity_field_changed(7, 2, &42u32);
        hooks.on_entity_field_changed(7, 3, &43u32);
        assert_eq!(hooks.mispredictions(), 2);
    }
}
