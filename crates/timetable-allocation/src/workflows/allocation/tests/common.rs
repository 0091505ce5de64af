use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::allocation::catalog::{PriorityCatalog, PriorityRoster};
use crate::workflows::allocation::directory::DirectorySnapshot;
use crate::workflows::allocation::domain::{
    AcademicYear, Allocation, AllocationId, AllocationReassignment, AllocationRecord,
    BatchDetails, BatchId, FacultyId, FacultyMember, FacultyProfile, FacultyRole, PriorityEntry,
    PriorityLevel, SeniorityKey, SubjectDetails, SubjectId, SubjectType, YearId,
};
use crate::workflows::allocation::memory::InMemoryAllocationStore;
use crate::workflows::allocation::planner::FacultyPriorities;
use crate::workflows::allocation::repository::{
    AllocationStore, AllocationWriter, RepositoryError,
};
use crate::workflows::allocation::service::AllocationEngine;

pub(super) const YEAR: YearId = YearId(1);

pub(super) type MemoryEngine =
    AllocationEngine<PriorityRoster, InMemoryAllocationStore, DirectorySnapshot>;

pub(super) fn level(value: u8) -> PriorityLevel {
    PriorityLevel::new(value).expect("valid level")
}

pub(super) fn member(faculty: u32, joining_year: i32) -> FacultyMember {
    FacultyMember::new(FacultyId(faculty), SeniorityKey::from_joining_year(joining_year))
}

pub(super) fn entry(faculty: u32, subject: u32, batch: u32, rank: u8) -> PriorityEntry {
    PriorityEntry {
        faculty_id: FacultyId(faculty),
        subject_id: SubjectId(subject),
        batch_id: BatchId(batch),
        year_id: YEAR,
        level: level(rank),
    }
}

/// Ranked list for one faculty member; choices are `(subject, batch)` in rank order.
pub(super) fn ranked(faculty: u32, joining_year: i32, choices: &[(u32, u32)]) -> FacultyPriorities {
    let entries = choices
        .iter()
        .zip(1u8..)
        .map(|(&(subject, batch), rank)| entry(faculty, subject, batch, rank))
        .collect();
    FacultyPriorities::new(member(faculty, joining_year), entries)
}

pub(super) fn roster_of(faculty: &[FacultyPriorities]) -> PriorityRoster {
    let mut roster = PriorityRoster::new();
    for priorities in faculty {
        roster.replace(priorities.member, YEAR, priorities.entries.clone());
    }
    roster
}

pub(super) fn profile(faculty: u32, name: &str, joining_year: i32) -> FacultyProfile {
    FacultyProfile {
        faculty_id: FacultyId(faculty),
        name: name.to_string(),
        email: format!("{}@college.test", name.to_ascii_lowercase()),
        role: FacultyRole::Faculty,
        joining_year,
    }
}

pub(super) fn subject(id: u32, name: &str, code: &str) -> SubjectDetails {
    SubjectDetails {
        subject_id: SubjectId(id),
        name: name.to_string(),
        code: code.to_string(),
        subject_type: SubjectType::Core,
        abbreviation: code.chars().take(3).collect(),
    }
}

/// Faculty 1..=6, subjects 10..=16, batches 1 and 2, and [`YEAR`].
pub(super) fn directory() -> DirectorySnapshot {
    let faculty = [
        (1, "Anand", 2015),
        (2, "Bhavna", 2020),
        (3, "Chitra", 2012),
        (4, "Deepak", 2018),
        (5, "Esha", 2018),
        (6, "Farid", 2021),
    ];
    let subjects = [
        (10, "Data Structures", "CS201"),
        (11, "Operating Systems", "CS301"),
        (12, "Computer Networks", "CS302"),
        (13, "Databases", "CS303"),
        (14, "Compilers", "CS401"),
        (15, "Algorithms", "CS202"),
        (16, "Graphics", "CS402"),
    ];

    let mut snapshot = DirectorySnapshot::new().with_year(AcademicYear {
        year_id: YEAR,
        label: "2024-2025".to_string(),
    });
    for (id, name, joining_year) in faculty {
        snapshot.insert_faculty(profile(id, name, joining_year));
    }
    for (id, name, code) in subjects {
        snapshot.insert_subject(subject(id, name, code));
    }
    for (id, section, student_count) in [(1, "A", 60), (2, "B", 58)] {
        snapshot.insert_batch(BatchDetails {
            batch_id: BatchId(id),
            section: section.to_string(),
            student_count,
        });
    }
    snapshot
}

pub(super) fn engine_with(roster: PriorityRoster) -> (MemoryEngine, Arc<InMemoryAllocationStore>) {
    let store = Arc::new(InMemoryAllocationStore::new());
    let engine = AllocationEngine::new(Arc::new(roster), store.clone(), Arc::new(directory()));
    (engine, store)
}

/// Two faculty colliding on (10, 1): 1 joined 2015, 2 joined 2020.
pub(super) fn contested_roster() -> PriorityRoster {
    roster_of(&[
        ranked(1, 2015, &[(10, 1), (11, 1)]),
        ranked(2, 2020, &[(10, 1), (12, 1)]),
    ])
}

pub(super) fn slot_of(record: &AllocationRecord) -> (u32, u32) {
    (record.allocation.subject_id.0, record.allocation.batch_id.0)
}

/// Store whose writers fail on the n-th created allocation.
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryAllocationStore,
    fail_on: usize,
}

impl FlakyStore {
    pub(super) fn failing_on(fail_on: usize) -> Self {
        Self {
            inner: InMemoryAllocationStore::new(),
            fail_on,
        }
    }
}

impl AllocationStore for FlakyStore {
    fn begin(&self, year_id: YearId) -> Result<Box<dyn AllocationWriter + '_>, RepositoryError> {
        Ok(Box::new(FlakyWriter {
            inner: self.inner.begin(year_id)?,
            created: 0,
            fail_on: self.fail_on,
        }))
    }

    fn allocations_for_year(
        &self,
        year_id: YearId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        self.inner.allocations_for_year(year_id)
    }

    fn allocation(&self, id: AllocationId) -> Result<Option<AllocationRecord>, RepositoryError> {
        self.inner.allocation(id)
    }

    fn reassign(
        &self,
        id: AllocationId,
        reassignment: &AllocationReassignment,
    ) -> Result<Option<AllocationRecord>, RepositoryError> {
        self.inner.reassign(id, reassignment)
    }
}

struct FlakyWriter<'a> {
    inner: Box<dyn AllocationWriter + 'a>,
    created: usize,
    fail_on: usize,
}

impl AllocationWriter for FlakyWriter<'_> {
    fn clear_allocations(&mut self) -> Result<usize, RepositoryError> {
        self.inner.clear_allocations()
    }

    fn create_allocation(
        &mut self,
        allocation: &Allocation,
    ) -> Result<AllocationRecord, RepositoryError> {
        self.created += 1;
        if self.created == self.fail_on {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        self.inner.create_allocation(allocation)
    }

    fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.inner.commit()
    }
}

pub(super) struct UnavailableStore;

impl AllocationStore for UnavailableStore {
    fn begin(&self, _year_id: YearId) -> Result<Box<dyn AllocationWriter + '_>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn allocations_for_year(
        &self,
        _year_id: YearId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn allocation(&self, _id: AllocationId) -> Result<Option<AllocationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn reassign(
        &self,
        _id: AllocationId,
        _reassignment: &AllocationReassignment,
    ) -> Result<Option<AllocationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Catalog that hands back another faculty member's entries.
pub(super) struct CrossedCatalog;

impl PriorityCatalog for CrossedCatalog {
    fn faculty_with_priorities(
        &self,
        _year_id: YearId,
    ) -> Result<Vec<FacultyMember>, RepositoryError> {
        Ok(vec![member(1, 2015)])
    }

    fn priorities_of(
        &self,
        _faculty_id: FacultyId,
        _year_id: YearId,
    ) -> Result<Vec<PriorityEntry>, RepositoryError> {
        Ok(vec![entry(2, 10, 1, 1)])
    }
}

/// Catalog that lists one faculty member twice with different joining years.
pub(super) struct DuplicatedCatalog;

impl PriorityCatalog for DuplicatedCatalog {
    fn faculty_with_priorities(
        &self,
        _year_id: YearId,
    ) -> Result<Vec<FacultyMember>, RepositoryError> {
        Ok(vec![member(2, 2000), member(1, 2010), member(1, 2020)])
    }

    fn priorities_of(
        &self,
        faculty_id: FacultyId,
        _year_id: YearId,
    ) -> Result<Vec<PriorityEntry>, RepositoryError> {
        let entries = match faculty_id.0 {
            2 => vec![entry(2, 10, 1, 1)],
            _ => vec![entry(1, 10, 1, 1), entry(1, 11, 1, 2), entry(1, 12, 1, 3)],
        };
        Ok(entries)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
