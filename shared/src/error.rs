use thiserror::Error;

use crate::class_registry::ClassId;
use crate::entity::EntityId;

/// Errors raised while registering entity classes with the [`crate::class_registry::ClassRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassRegistryError {
    /// A class id collided with one already registered.
    #[error("class id {class_id} is already registered")]
    DuplicateClassId { class_id: ClassId },

    /// A class is marked as both singleton and non-singleton somewhere in its
    /// inheritance chain; the two dense FilterId counters cannot both apply.
    #[error("class id {class_id} mixes singleton and non-singleton ancestry")]
    MixedSingletonAncestry { class_id: ClassId },

    /// `GetEntitiesInternal`/`AddEntity` referenced a class id that was never
    /// registered.
    #[error("class id {class_id} was never registered")]
    UnregisteredClass { class_id: ClassId },
}

/// Errors raised by [`crate::store::EntityStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityStoreError {
    /// An id passed to `add` fell outside `[1, MaxEntityCount]`.
    #[error("entity id {id} is out of the valid range [1, {max}]")]
    InvalidEntityId { id: u16, max: u16 },

    /// `add` referenced a class id with no registered constructor.
    #[error("class id {class_id} has no registered constructor")]
    UnregisteredClass { class_id: ClassId },

    /// The id slot was already occupied by a live entity.
    #[error("entity id {id} is already occupied")]
    SlotOccupied { id: EntityId },
}

/// Errors raised by typed filter/singleton queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// `GetEntities<T>`/`GetSingleton<T>` was called for a type that was never
    /// registered with the class registry.
    #[error("type `{type_name}` was never registered as an entity class")]
    UnregisteredType { type_name: &'static str },
}

/// Errors surfaced by the decoder/encoder collaborator (out of scope here; this
/// is the shape the core expects back from it, per spec §6/§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeserializeResult {
    /// The packet's header byte failed the demultiplexing check.
    #[error("packet header check failed")]
    HeaderCheckFailed,

    /// Any other decode failure.
    #[error("packet deserialization failed")]
    Error,
}

/// Top-level error type for the entity manager core. Lifecycle warnings (spec
/// §7 `LogicWarning`) are deliberately not a variant here: they are logged via
/// `log::warn!` and swallowed rather than propagated, per spec §7's stated
/// policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityManagerError {
    /// See [`ClassRegistryError`].
    #[error("class registry error: {0}")]
    ClassRegistry(#[from] ClassRegistryError),

    /// See [`EntityStoreError`].
    #[error("entity store error: {0}")]
    Store(#[from] EntityStoreError),

    /// See [`QueryError`].
    #[error("query error: {0}")]
    Query(#[from] QueryError),
}
