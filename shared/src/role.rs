//! Abstract operations the core requires from server/client specializations
//! (spec §4.6). `entityplex-server`'s `ServerEntityManager` and
//! `entityplex-client`'s `ClientEntityManager` each implement this once.

use crate::class_registry::FieldId;
use crate::entity::EntityId;
use crate::field::FieldValue;
use crate::store::EntityStore;

/// Whether an [`crate::manager::EntityManager`] is acting as the authority
/// (server) or a predicting observer (client) (spec §2 "role-agnostic except
/// for a `Mode` flag").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Server,
    Client,
}

pub trait RoleHooks {
    /// Called exactly once per fixed tick (spec §4.6).
    fn on_logic_tick(&mut self, store: &mut EntityStore);

    /// Called by the per-field write barrier whenever a tracked field's
    /// value actually changes. Server specializations use this to buffer an
    /// outbound delta; client specializations use it to reconcile with
    /// predicted state (spec §4.6).
    fn on_entity_field_changed<T: FieldValue>(
        &mut self,
        entity_id: EntityId,
        field_id: FieldId,
        new_value: &T,
    );

    /// Called when an entity is added to `AliveEntities`. Default no-op
    /// (spec §4.6).
    fn on_alive_entity_added(&mut self, _entity_id: EntityId) {}
}
