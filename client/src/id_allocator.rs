//! Local (non-synced) entity id allocation (spec §3 "local (non-synced) ids
//! occupy `[8193, 16384]`"). Mirrors `entityplex-server`'s
//! `SyncedIdAllocator`, over the disjoint local id range — a client
//! allocates these for purely local, never-replicated entities (camera
//! rigs, prediction scratch entities), never for the server-owned synced
//! range.

use thiserror::Error;

use entityplex_shared::{EntityId, Version, MAX_ENTITY_COUNT, MAX_SYNCED_ENTITY_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocalIdAllocationError {
    #[error("no free local entity id in [{min}, {max}]")]
    Exhausted { min: u16, max: u16 },
}

pub struct LocalIdAllocator {
    free: Vec<EntityId>,
    next_fresh: EntityId,
    versions: Vec<Version>,
}

impl Default for LocalIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdAllocator {
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            next_fresh: MAX_SYNCED_ENTITY_COUNT + 1,
            versions: vec![0; MAX_ENTITY_COUNT as usize + 1],
        }
    }

    pub fn allocate(&mut self) -> Result<(EntityId, Version), LocalIdAllocationError> {
        if let Some(id) = self.free.pop() {
            return Ok((id, self.versions[id as usize]));
        }
        if self.next_fresh > MAX_ENTITY_COUNT {
            return Err(LocalIdAllocationError::Exhausted {
                min: MAX_SYNCED_ENTITY_COUNT + 1,
                max: MAX_ENTITY_COUNT,
            });
        }
        let id = self.next_fresh;
        self.next_fresh += 1;
        Ok((id, self.versions[id as usize]))
    }

    pub fn release(&mut self, id: EntityId) {
        self.versions[id as usize] = self.versions[id as usize].wrapping_add(1);
        self.free.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_allocation_starts_just_above_the_synced_range() {
        let mut alloc = LocalIdAllocator::new();
        let (id, version) = alloc.allocate().unwrap();
        assert_eq!(id, MAX_SYNCED_ENTITY_COUNT + 1);
        assert_eq!(version, 0);
    }

    #[test]
    fn reused_id_carries_a_bumped_version() {
        let mut alloc = LocalIdAllocator::new();
        let (id, _) = alloc.allocate().unwrap();
        alloc.release(id);
        let (reused, version) = alloc.allocate().unwrap();
        assert_eq!(reused, id);
        assert_eq!(version, 1);
    }
}
