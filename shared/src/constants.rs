/// Highest id assigned to a network-synced entity. Ids `1..=MAX_SYNCED_ENTITY_COUNT`
/// are handed out by the server specialization for replicated entities.
pub const MAX_SYNCED_ENTITY_COUNT: u16 = 8192;

/// Highest id an entity (synced or local) may ever hold. Ids in
/// `MAX_SYNCED_ENTITY_COUNT+1..=MAX_ENTITY_COUNT` are reserved for entities that
/// are never replicated over the network.
pub const MAX_ENTITY_COUNT: u16 = 16384;

/// Reserved player id denoting the server itself (never a connected client).
pub const SERVER_PLAYER_ID: u8 = 0;

/// `0` is never a valid entity id; it marks "no entity" in an
/// [`crate::entity::EntitySharedReference`].
pub const INVALID_ENTITY_ID: u16 = 0;

/// Upper bound on simultaneously connected players.
pub const MAX_PLAYERS: u16 = 254;

/// Upper bound on addressable sub-parts of a single entity (used by
/// lag-compensated hit volumes; not otherwise interpreted by the core).
pub const MAX_PARTS: u16 = 256;

/// Upper bound on how many past authoritative snapshots a client keeps for
/// reconciliation diffing.
pub const MAX_SAVED_STATE_DIFF: u8 = 30;

/// Hard cap on how many fixed logic ticks a single [`crate::tick_clock::TickClock::update`]
/// call may fire, bounding recovery work after a stall.
pub const MAX_TICKS_PER_UPDATE: u8 = 5;

/// Coefficient applied to the fixed tick length to derive
/// [`crate::tick_clock::TickClock`]'s slowdown window.
pub const TIME_SPEED_CHANGE_COEF: f32 = 0.1;

/// Valid values for a class's lag-compensation history depth
/// (`EntityClassData::LagCompensatedCount` sizing).
pub const VALID_MAX_HISTORY_SIZES: [u16; 4] = [16, 32, 64, 128];
