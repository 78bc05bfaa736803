//! # Entityplex Shared
//!
//! The core entity manager subsystem shared between `entityplex-server` and
//! `entityplex-client`: the typed entity registry and class metadata, the
//! entity lifecycle, the tick loop and time-scaling clock, the family of
//! queryable views (filters, singletons), the lag-compensation protocol, and
//! the hooks required by the serialization and prediction layers that the
//! two role specializations implement.
//!
//! Out of scope here (spec §1): the wire transport, the concrete delta
//! encoder/decoder, the input-processor plumbing, the RPC dispatch runtime,
//! the reflection-based class registration tooling, and any concrete entity
//! subclass's gameplay logic. Those are external collaborators whose
//! contracts this crate only describes through trait seams.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod class_registry;
pub mod constants;
pub mod entity;
pub mod error;
pub mod field;
pub mod filters;
pub mod lag_compensation;
pub mod local_singleton;
pub mod manager;
pub mod ordered_set;
pub mod role;
pub mod store;
pub mod tick_clock;
pub mod types;
pub mod value_types;
pub mod wrapping_number;

pub use class_registry::{
    ClassFlags, ClassId, ClassRegistry, EntityClassData, EntityConstructor,
    EntityConstructorParams, EntityFieldInfo, FieldId, FilterId, SyncFlags,
    CONTROLLER_BASE_FILTER_ID,
};
pub use constants::*;
pub use entity::{
    impl_internal_entity, ControllerLogic, EntityHeader, EntityId, EntityKind, EntityLogic,
    EntitySharedReference, InternalEntity, SingletonEntityLogic, Version,
};
pub use error::{
    ClassRegistryError, DeserializeResult, EntityManagerError, EntityStoreError, QueryError,
};
pub use field::{FieldValue, TrackedField};
pub use filters::FilterRegistry;
pub use lag_compensation::{HistoryBuffer, LagCompensationProtocol, NetPlayer};
pub use local_singleton::{impl_local_singleton_any, LocalSingleton, LocalSingletonRegistry};
pub use manager::{EntityManager, EntityManagerConfig, UpdateMode};
pub use ordered_set::OrderedEntitySet;
pub use role::{Mode, RoleHooks};
pub use store::EntityStore;
pub use tick_clock::{
    ClockSource, FakeClockSource, SystemClockSource, TickClock, TickUpdateOutcome,
};
pub use types::{HostType, Tick};
pub use value_types::{
    is_registered as is_field_type_registered, register_field_type,
    register_field_type_with_interpolator, with_processor, FloatAngle, ValueTypeProcessor,
};
pub use wrapping_number::{
    sequence_greater_than, sequence_less_than, try_wrapping_diff, wrapping_diff,
    WrappingNumberError,
};
