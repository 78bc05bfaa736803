//! The single affine resource a host owns (spec §2, §6): wires the class
//! registry, entity store, filters/singletons, tick clock, lag-compensation
//! protocol, and local singletons together behind one `&mut self` API.
//!
//! `entityplex-server`'s `ServerEntityManager` and `entityplex-client`'s
//! `ClientEntityManager` each wrap an `EntityManager<TheirHooks>` and add the
//! role-specific bits spec §2 calls out (id allocation, delta buffering,
//! the rollback-and-replay state machine) on top.

use crate::class_registry::{ClassId, ClassRegistry, FieldId};
use crate::constants::{SERVER_PLAYER_ID, VALID_MAX_HISTORY_SIZES};
use crate::entity::{EntityId, EntitySharedReference, Version};
use crate::error::{EntityManagerError, QueryError};
use crate::field::FieldValue;
use crate::filters::FilterRegistry;
use crate::lag_compensation::{LagCompensationProtocol, NetPlayer};
use crate::local_singleton::{LocalSingleton, LocalSingletonRegistry};
use crate::ordered_set::OrderedEntitySet;
use crate::role::{Mode, RoleHooks};
use crate::store::EntityStore;
use crate::tick_clock::{ClockSource, SystemClockSource, TickClock};

/// Whether the manager is replaying ticks to reconcile predicted state
/// against authority (spec §6 `UpdateMode`). The core never switches into
/// `PredictionRollback` on its own (Design Note "Rollback discipline"); a
/// client role specialization's rollback state machine drives it through
/// [`EntityManager::set_update_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Normal,
    PredictionRollback,
}

/// Construction-time configuration (spec §6 constants, ambient configuration
/// concerns), in the spirit of a `ServerConfig`/`ConnectionConfig` struct.
#[derive(Debug, Clone, Copy)]
pub struct EntityManagerConfig {
    pub frames_per_second: u32,
    /// Must be one of [`VALID_MAX_HISTORY_SIZES`].
    pub max_history_size: u16,
    /// Prefixes outbound packets for demultiplexing (spec §6 `HeaderByte`);
    /// the core never interprets it itself.
    pub header_byte: u8,
    /// `0` ([`SERVER_PLAYER_ID`]) on a server manager; the assigned id on a
    /// client manager.
    pub player_id: u8,
}

impl Default for EntityManagerConfig {
    fn default() -> Self {
        Self {
            frames_per_second: 60,
            max_history_size: 64,
            header_byte: 0,
            player_id: SERVER_PLAYER_ID,
        }
    }
}

/// The entity manager core (spec §1-§6). Generic over `H: RoleHooks` so the
/// server/client specializations each supply their own `OnLogicTick`/
/// `EntityFieldChanged`/`OnAliveEntityAdded`, and over `C: ClockSource` so
/// tests can drive it with [`crate::tick_clock::FakeClockSource`] instead of
/// real wall-clock time (spec §8 scenarios 5 & 6).
pub struct EntityManager<H: RoleHooks, C: ClockSource = SystemClockSource> {
    mode: Mode,
    config: EntityManagerConfig,
    update_mode: UpdateMode,
    registry: ClassRegistry,
    store: EntityStore,
    filters: FilterRegistry,
    clock: TickClock<C>,
    lag_compensation: LagCompensationProtocol,
    local_singletons: LocalSingletonRegistry,
    hooks: H,
}

impl<H: RoleHooks> EntityManager<H, SystemClockSource> {
    pub fn new(mode: Mode, registry: ClassRegistry, config: EntityManagerConfig, hooks: H) -> Self {
        Self::with_clock_source(mode, registry, config, hooks, SystemClockSource::new())
    }
}

impl<H: RoleHooks, C: ClockSource> EntityManager<H, C> {
    pub fn with_clock_source(
        mode: Mode,
        registry: ClassRegistry,
        config: EntityManagerConfig,
        hooks: H,
        clock_source: C,
    ) -> Self {
        debug_assert!(
            VALID_MAX_HISTORY_SIZES.contains(&config.max_history_size),
            "max_history_size {} is not one of {VALID_MAX_HISTORY_SIZES:?}",
            config.max_history_size
        );
        let filters = FilterRegistry::new(&registry);
        let store = EntityStore::new(mode);
        let clock = TickClock::new(config.frames_per_second, clock_source);
        Self {
            mode,
            update_mode: UpdateMode::Normal,
            registry,
            store,
            filters,
            clock,
            lag_compensation: LagCompensationProtocol::new(),
            local_singletons: LocalSingletonRegistry::new(),
            hooks,
            config,
        }
    }

    // ---- spec §6 public surface ----

    pub fn tick(&self) -> u16 {
        self.clock.tick()
    }

    pub fn lerp_factor(&self) -> f32 {
        self.clock.lerp_factor()
    }

    pub fn visual_delta_time(&self) -> f32 {
        self.clock.visual_delta_time()
    }

    pub fn frames_per_second(&self) -> u32 {
        self.clock.frames_per_second()
    }

    pub fn delta_time(&self) -> f64 {
        self.clock.delta_time()
    }

    pub fn delta_time_f(&self) -> f32 {
        self.clock.delta_time_f32()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_server(&self) -> bool {
        self.mode == Mode::Server
    }

    pub fn is_client(&self) -> bool {
        self.mode == Mode::Client
    }

    pub fn player_id(&self) -> u8 {
        self.config.player_id
    }

    pub fn header_byte(&self) -> u8 {
        self.config.header_byte
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn in_rollback_state(&self) -> bool {
        self.update_mode == UpdateMode::PredictionRollback
    }

    pub fn in_normal_state(&self) -> bool {
        self.update_mode == UpdateMode::Normal
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    /// Set by a client role specialization's rollback state machine; the
    /// core itself never transitions this on its own (Design Note "Rollback
    /// discipline").
    pub fn set_update_mode(&mut self, update_mode: UpdateMode) {
        self.update_mode = update_mode;
    }

    pub fn max_history_size(&self) -> u16 {
        self.config.max_history_size
    }

    pub fn entities_count(&self) -> usize {
        self.store.entities_count()
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.clock.speed_multiplier()
    }

    /// Set by the client to slew `MaxTicks` toward the server's tick rate
    /// (spec §4.4 rationale).
    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.clock.set_speed_multiplier(multiplier);
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Direct access to the underlying tick clock, chiefly so tests can
    /// advance a [`crate::tick_clock::FakeClockSource`] between `update`
    /// calls.
    pub fn clock_mut(&mut self) -> &mut TickClock<C> {
        &mut self.clock
    }

    pub fn is_entity_alive(&self, id: EntityId) -> bool {
        self.store.alive_entities().contains(id)
    }

    /// `GetEntityById<T>(ref)` (spec §6).
    pub fn get_entity_by_id<T: 'static>(&self, reference: EntitySharedReference) -> Option<&T> {
        self.store.get_by_id(reference)
    }

    /// `TryGetEntityById<T>` (spec §6) — identical to `get_entity_by_id`
    /// here; the distinction in the original surface is call-site
    /// ergonomics (panicking vs. non-panicking accessor), and this core
    /// never panics on a missing/stale reference either way.
    pub fn try_get_entity_by_id<T: 'static>(&self, reference: EntitySharedReference) -> Option<&T> {
        self.get_entity_by_id(reference)
    }

    pub fn get_entity_by_id_mut<T: 'static>(
        &mut self,
        reference: EntitySharedReference,
    ) -> Option<&mut T> {
        self.store.get_by_id_mut(reference)
    }

    /// `GetEntities<T>` (spec §6): materializes the filter on first call.
    pub fn get_entities<T: 'static>(&mut self) -> Result<&OrderedEntitySet, QueryError> {
        self.filters.get_entities::<T>(&self.registry, &self.store)
    }

    /// `GetControllers<T>` (spec §6) — controllers are plain non-singleton
    /// filters (spec §3 `ControllerLogic`), so this shares `GetEntities`'s
    /// implementation; the separate name exists to read naturally at call
    /// sites that only ever want controller types.
    pub fn get_controllers<T: 'static>(&mut self) -> Result<&OrderedEntitySet, QueryError> {
        self.filters.get_entities::<T>(&self.registry, &self.store)
    }

    pub fn get_singleton<T: 'static>(&self) -> Result<Option<&T>, QueryError> {
        self.filters.get_singleton::<T>(&self.registry, &self.store)
    }

    pub fn has_singleton<T: 'static>(&self) -> Result<bool, QueryError> {
        self.filters.has_singleton::<T>(&self.registry, &self.store)
    }

    pub fn try_get_singleton<T: 'static>(&self) -> Option<&T> {
        self.get_singleton::<T>().ok().flatten()
    }

    pub fn add_local_singleton<T: LocalSingleton>(&mut self, value: T) {
        self.local_singletons.add(value);
    }

    pub fn get_local_singleton<T: LocalSingleton>(&self) -> Option<&T> {
        self.local_singletons.get::<T>()
    }

    pub fn get_local_singleton_mut<T: LocalSingleton>(&mut self) -> Option<&mut T> {
        self.local_singletons.get_mut::<T>()
    }

    pub fn try_get_local_singleton<T: LocalSingleton>(&self) -> Option<&T> {
        self.get_local_singleton::<T>()
    }

    /// The rollback-mode gate only constrains a client (spec §4.5: "No-op
    /// ... when client is not in rollback mode"); a server manager has no
    /// rollback mode to be outside of, so it is always allowed through.
    fn lag_compensation_allowed(&self) -> bool {
        self.mode != Mode::Client || self.in_rollback_state()
    }

    pub fn enable_lag_compensation<P: NetPlayer>(&mut self, player: &P) {
        let allowed = self.lag_compensation_allowed();
        self.lag_compensation.enable(&mut self.store, allowed, player);
    }

    pub fn disable_lag_compensation(&mut self) {
        self.lag_compensation.disable(&mut self.store);
    }

    /// Runs `op` with world state rewound to `player`'s `SimulatedServerTick`
    /// (spec §4.5), restoring present-time state afterward.
    pub fn with_lag_compensation<P: NetPlayer, R>(
        &mut self,
        player: &P,
        op: impl FnOnce(&mut EntityStore) -> R,
    ) -> R {
        let allowed = self.lag_compensation_allowed();
        self.lag_compensation
            .with_rollback(&mut self.store, allowed, player, op)
    }

    /// `AddEntity(params)` followed immediately by `ConstructEntity` (spec
    /// §4.2). The role specialization is responsible for choosing `id` and
    /// `version` (the core never recycles ids itself, spec §4.2 "Policies").
    pub fn add_entity(
        &mut self,
        id: EntityId,
        version: Version,
        class_id: ClassId,
        is_local: bool,
    ) -> Result<(), EntityManagerError> {
        self.store.add(&self.registry, id, version, class_id, is_local)?;
        self.construct_entity(id);
        Ok(())
    }

    fn construct_entity(&mut self, id: EntityId) {
        let class_id = self
            .store
            .get(id)
            .expect("construct_entity called immediately after add")
            .header()
            .class_id();
        self.filters.on_construct(&self.registry, class_id, id);
        let became_alive = self.store.construct(&self.registry, id);
        if became_alive {
            self.hooks.on_alive_entity_added(id);
        }
    }

    /// `DestroyInternal` (spec §4.2): marks destroyed and removes from every
    /// view except `AllEntities`. Does not free the id slot; call
    /// [`EntityManager::remove_entity`] to finish the lifecycle.
    pub fn destroy_entity(&mut self, id: EntityId) {
        let Some(entity) = self.store.get(id) else {
            return;
        };
        let class_id = entity.header().class_id();
        self.store.destroy(id);
        self.filters.on_destroy(&self.registry, class_id, id);
    }

    /// `RemoveEntity` (spec §4.2).
    pub fn remove_entity(&mut self, id: EntityId) {
        self.store.remove(&self.registry, id);
    }

    /// The per-field write barrier's entry point into the role hooks (spec
    /// §4.6 `EntityFieldChanged`). Callers should only invoke this when
    /// [`crate::field::TrackedField::set`] reported an actual change.
    pub fn notify_field_changed<T: FieldValue>(
        &mut self,
        entity_id: EntityId,
        field_id: FieldId,
        new_value: &T,
    ) {
        self.hooks
            .on_entity_field_changed(entity_id, field_id, new_value);
    }

    /// Drives the fixed-step accumulator, firing `OnLogicTick` zero to
    /// [`crate::constants::MAX_TICKS_PER_UPDATE`] times (spec §4.4).
    pub fn update(&mut self) {
        let outcome = self.clock.update();
        self.local_singletons
            .on_visual_update(self.clock.visual_delta_time());
        for _ in 0..outcome.ticks_fired {
            self.local_singletons.on_logic_tick();
            self.hooks.on_logic_tick(&mut self.store);
        }
    }

    /// Fires `OnLogicTick` once without consulting the clock's accumulator,
    /// for a client rollback controller replaying a window of historical
    /// ticks (spec §9 Design Note "Rollback discipline"). Callers set
    /// [`UpdateMode::PredictionRollback`] via [`EntityManager::set_update_mode`]
    /// before replaying and restore [`UpdateMode::Normal`] afterward.
    pub fn replay_tick(&mut self) {
        self.hooks.on_logic_tick(&mut self.store);
    }

    /// Returns the manager to its pre-first-tick state (spec §3 "Manager"):
    /// clock stopped, tick 0, every entity destroyed and removed, filters
    /// cleared, local singletons dropped.
    pub fn reset(&mut self) {
        self.clock.reset();
        let ids: Vec<EntityId> = self.store.all_entities().iter().collect();
        for id in ids {
            self.destroy_entity(id);
            self.remove_entity(id);
        }
        self.filters.reset();
        self.local_singletons.clear();
        self.update_mode = UpdateMode::Normal;
        self.lag_compensation = LagCompensationProtocol::new();
    }
}
