//! Process-local adapters for the allocation and priority stores.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::Utc;

use super::catalog::{PriorityCatalog, PriorityLedger, PriorityRoster};
use super::domain::{
    Allocation, AllocationId, AllocationReassignment, AllocationRecord, FacultyId, FacultyMember,
    PriorityEntry, SlotKey, YearId,
};
use super::repository::{AllocationStore, AllocationWriter, RepositoryError};

/// Allocation rows held in memory. Writers stage changes and apply them on commit.
#[derive(Debug)]
pub struct InMemoryAllocationStore {
    records: Mutex<BTreeMap<AllocationId, AllocationRecord>>,
    sequence: AtomicU64,
}

impl Default for InMemoryAllocationStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            sequence: AtomicU64::new(1),
        }
    }
}

impl InMemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(self.records()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.records()?.is_empty())
    }

    fn records(&self) -> Result<MutexGuard<'_, BTreeMap<AllocationId, AllocationRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("allocation store lock poisoned".to_string()))
    }

    fn next_id(&self) -> AllocationId {
        AllocationId(self.sequence.fetch_add(1, Ordering::Relaxed))
    }
}

impl AllocationStore for InMemoryAllocationStore {
    fn begin(&self, year_id: YearId) -> Result<Box<dyn AllocationWriter + '_>, RepositoryError> {
        let committed_slots = self
            .records()?
            .values()
            .filter(|record| record.allocation.year_id == year_id)
            .map(|record| record.allocation.slot())
            .collect();

        Ok(Box::new(MemoryWriter {
            store: self,
            year_id,
            cleared: false,
            committed_slots,
            staged: Vec::new(),
        }))
    }

    fn allocations_for_year(
        &self,
        year_id: YearId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Ok(self
            .records()?
            .values()
            .filter(|record| record.allocation.year_id == year_id)
            .cloned()
            .collect())
    }

    fn allocation(&self, id: AllocationId) -> Result<Option<AllocationRecord>, RepositoryError> {
        Ok(self.records()?.get(&id).cloned())
    }

    fn reassign(
        &self,
        id: AllocationId,
        reassignment: &AllocationReassignment,
    ) -> Result<Option<AllocationRecord>, RepositoryError> {
        let mut records = self.records()?;
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };

        record.allocation.faculty_id = reassignment.faculty_id;
        record.co_faculty_id = reassignment.co_faculty_id;
        record.venue = reassignment.venue.clone();
        Ok(Some(record.clone()))
    }
}

struct MemoryWriter<'a> {
    store: &'a InMemoryAllocationStore,
    year_id: YearId,
    cleared: bool,
    committed_slots: BTreeSet<SlotKey>,
    staged: Vec<AllocationRecord>,
}

impl AllocationWriter for MemoryWriter<'_> {
    fn clear_allocations(&mut self) -> Result<usize, RepositoryError> {
        let removed = self.committed_slots.len() + self.staged.len();
        self.cleared = true;
        self.committed_slots.clear();
        self.staged.clear();
        Ok(removed)
    }

    fn create_allocation(
        &mut self,
        allocation: &Allocation,
    ) -> Result<AllocationRecord, RepositoryError> {
        if allocation.year_id != self.year_id {
            return Err(RepositoryError::Unavailable(format!(
                "{} written through a writer for {}",
                allocation.year_id, self.year_id
            )));
        }

        let slot = allocation.slot();
        let taken = self.committed_slots.contains(&slot)
            || self.staged.iter().any(|record| record.allocation.slot() == slot);
        if taken {
            return Err(RepositoryError::Conflict);
        }

        let record = AllocationRecord::new(self.store.next_id(), *allocation, Utc::now());
        self.staged.push(record.clone());
        Ok(record)
    }

    fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let MemoryWriter {
            store,
            year_id,
            cleared,
            staged,
            ..
        } = *self;

        let mut records = store.records()?;
        if cleared {
            records.retain(|_, record| record.allocation.year_id != year_id);
        }
        for record in staged {
            records.insert(record.allocation_id, record);
        }
        Ok(())
    }
}

/// Priority roster behind a lock so submissions and runs can share it.
#[derive(Debug, Default)]
pub struct InMemoryPriorityLedger {
    roster: RwLock<PriorityRoster>,
}

impl InMemoryPriorityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roster(roster: PriorityRoster) -> Self {
        Self {
            roster: RwLock::new(roster),
        }
    }

    pub fn entry_count(&self, year_id: YearId) -> Result<usize, RepositoryError> {
        Ok(self.read()?.entry_count(year_id))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, PriorityRoster>, RepositoryError> {
        self.roster
            .read()
            .map_err(|_| RepositoryError::Unavailable("priority ledger lock poisoned".to_string()))
    }
}

impl PriorityCatalog for InMemoryPriorityLedger {
    fn faculty_with_priorities(
        &self,
        year_id: YearId,
    ) -> Result<Vec<FacultyMember>, RepositoryError> {
        Ok(self.read()?.members(year_id))
    }

    fn priorities_of(
        &self,
        faculty_id: FacultyId,
        year_id: YearId,
    ) -> Result<Vec<PriorityEntry>, RepositoryError> {
        Ok(self.read()?.entries(faculty_id, year_id))
    }
}

impl PriorityLedger for InMemoryPriorityLedger {
    fn replace_priorities(
        &self,
        member: FacultyMember,
        year_id: YearId,
        entries: Vec<PriorityEntry>,
    ) -> Result<(), RepositoryError> {
        let mut roster = self
            .roster
            .write()
            .map_err(|_| RepositoryError::Unavailable("priority ledger lock poisoned".to_string()))?;
        roster.replace(member, year_id, entries);
        Ok(())
    }
}
