//! Synced entity id allocation (spec §3 "Synced entity ids occupy
//! `[1, MaxSyncedEntityCount]`", §4.2 "Policies": "ids are not recycled by
//! the core itself ... the role specialization allocates them").

use thiserror::Error;

use entityplex_shared::{EntityId, Version, MAX_SYNCED_ENTITY_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdAllocationError {
    #[error("no free synced entity id in [1, {max}]")]
    Exhausted { max: u16 },
}

/// Hands out ids in `[1, MAX_SYNCED_ENTITY_COUNT]`, bumping each id's
/// [`Version`] every time it is released and later reused (spec Invariant 8).
pub struct SyncedIdAllocator {
    free: Vec<EntityId>,
    next_fresh: EntityId,
    versions: Vec<Version>,
}

impl Default for SyncedIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncedIdAllocator {
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            next_fresh: 1,
            // Index 0 unused; sized so `versions[id]` indexes directly.
            versions: vec![0; MAX_SYNCED_ENTITY_COUNT as usize + 1],
        }
    }

    /// Allocates the next free id along with the [`Version`] it must be
    /// constructed with.
    pub fn allocate(&mut self) -> Result<(EntityId, Version), IdAllocationError> {
        if let Some(id) = self.free.pop() {
            return Ok((id, self.versions[id as usize]));
        }
        if self.next_fresh > MAX_SYNCED_ENTITY_COUNT {
            return Err(IdAllocationError::Exhausted {
                max: MAX_SYNCED_ENTITY_COUNT,
            });
        }
        let id = self.next_fresh;
        self.next_fresh += 1;
        Ok((id, self.versions[id as usize]))
    }

    /// Releases `id` back to the free list, bumping its version so any
    /// [`entityplex_shared::EntitySharedReference`] issued before release
    /// never resolves to the next occupant (spec Invariant 8).
    pub fn release(&mut self, id: EntityId) {
        self.versions[id as usize] = self.versions[id as usize].wrapping_add(1);
        self.free.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reused_id_carries_a_bumped_version() {
        let mut alloc = SyncedIdAllocator::new();
        let (id, version) = alloc.allocate().unwrap();
        assert_eq!(version, 0);
        alloc.release(id);

        let (reused_id, reused_version) = alloc.allocate().unwrap();
        assert_eq!(reused_id, id);
        assert_eq!(reused_version, 1);
    }

    #[test]
    fn fresh_ids_are_handed_out_in_order_before_recycling() {
        let mut alloc = SyncedIdAllocator::new();
        let (a, _) = alloc.allocate().unwrap();
        let (b, _) = alloc.allocate().unwrap();
        assert_eq!((a, b), (1, 2));
    }
}
