//! # Entityplex Client
//!
//! The client-role specialization of the entity manager core (spec §2 "Role
//! Specializations", §4.6 "Role Hooks"): owns the `PredictionRollback` state
//! machine, the speed-multiplier slew controller that converges
//! `SpeedMultiplier` toward the server's tick rate, and reconciliation of
//! predicted vs. authoritative field slots per
//! `EntityFieldInfo::IsPredicted` (spec §3, §9 Design Note "Rollback
//! discipline").

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod hooks;
mod id_allocator;
mod manager;
mod reconcile;
mod rollback;
mod speed_slew;

pub use hooks::ClientHooks;
pub use id_allocator::{LocalIdAllocationError, LocalIdAllocator};
pub use manager::{ClientEntityManager, ClientEntityManagerConfig};
pub use reconcile::Predictable;
pub use rollback::RollbackController;
pub use speed_slew::SpeedSlewController;
