//! # Entityplex Server
//!
//! The server-role specialization of the entity manager core (spec §2 "Role
//! Specializations", §4.6 "Role Hooks"): allocates synced entity ids, drives
//! `OnLogicTick` as the simulation's sole authority, and turns
//! `EntityFieldChanged` notifications into a buffered outbound delta per
//! tick. The concrete delta *encoding* is an out-of-scope collaborator (spec
//! §1/§6); [`delta::DeltaSink`] is the seam a transport crate plugs into.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod delta;
mod hooks;
mod id_allocator;
mod manager;

pub use delta::{DeltaSink, FieldDelta};
pub use hooks::ServerHooks;
pub use id_allocator::{IdAllocationError, SyncedIdAllocator};
pub use manager::{ServerEntityManager, ServerEntityManagerConfig};
