use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::catalog::PriorityCatalog;
use super::domain::{
    AllocationDetail, AllocationId, AllocationReassignment, AllocationRecord, AllocationResult,
    BatchId, FacultyId, SubjectId, YearId,
};
use super::planner::{AllocationPlanner, FacultyPriorities};
use super::projection::{AllocationYearView, DetailResolver};
use super::repository::{AllocationDirectory, AllocationStore, RepositoryError};

/// Service running the two-pass allocation inside one store transaction per year.
pub struct AllocationEngine<C, S, D> {
    catalog: Arc<C>,
    store: Arc<S>,
    directory: Arc<D>,
    planner: AllocationPlanner,
    locks: YearLocks,
    run_timeout: Option<Duration>,
}

impl<C, S, D> AllocationEngine<C, S, D>
where
    C: PriorityCatalog + 'static,
    S: AllocationStore + 'static,
    D: AllocationDirectory + 'static,
{
    pub fn new(catalog: Arc<C>, store: Arc<S>, directory: Arc<D>) -> Self {
        Self {
            catalog,
            store,
            directory,
            planner: AllocationPlanner::new(),
            locks: YearLocks::default(),
            run_timeout: None,
        }
    }

    /// Deadline applied to runs started through [`Self::allocate_subjects`].
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Recompute and persist the allocations of a year, replacing any previous set.
    pub fn allocate_subjects(
        &self,
        year_id: YearId,
    ) -> Result<AllocationResult, AllocationServiceError> {
        let context = match self.run_timeout {
            Some(timeout) => RunContext::new().with_timeout(timeout),
            None => RunContext::new(),
        };
        self.allocate_subjects_with(year_id, &context)
    }

    pub fn allocate_subjects_with(
        &self,
        year_id: YearId,
        context: &RunContext,
    ) -> Result<AllocationResult, AllocationServiceError> {
        let outcome = self.locks.with_year(year_id, || {
            info!(year = year_id.0, "allocation run started");
            self.run(year_id, context)
        });

        match &outcome {
            Ok(result) => info!(
                year = year_id.0,
                allocations = result.total_allocations,
                unallocated = result.unallocated.len(),
                "allocation run committed"
            ),
            Err(AllocationServiceError::DataIntegrity(anomaly)) => warn!(
                year = year_id.0,
                %anomaly,
                "allocation run rejected, changes rolled back"
            ),
            Err(AllocationServiceError::Interrupted(reason)) => warn!(
                year = year_id.0,
                %reason,
                "allocation run interrupted, changes rolled back"
            ),
            Err(other) => error!(
                year = year_id.0,
                error = %other,
                "allocation run failed, changes rolled back"
            ),
        }

        outcome
    }

    fn run(
        &self,
        year_id: YearId,
        context: &RunContext,
    ) -> Result<AllocationResult, AllocationServiceError> {
        context.check()?;

        let mut writer = self.store.begin(year_id)?;
        let cleared = writer.clear_allocations()?;
        let roster = self.load_roster(year_id)?;
        context.check()?;

        if roster.is_empty() {
            writer.commit()?;
            info!(year = year_id.0, cleared, "no priorities submitted");
            return Ok(AllocationResult::empty());
        }

        let plan = self.planner.plan(year_id, roster);
        context.check()?;

        let mut records = Vec::with_capacity(plan.allocations.len());
        for allocation in &plan.allocations {
            records.push(writer.create_allocation(allocation)?);
        }

        let details = DetailResolver::new(self.directory.as_ref()).details(&records)?;
        context.check()?;

        writer.commit()?;

        Ok(AllocationResult {
            total_allocations: details.len(),
            allocations: details,
            unallocated: plan.unallocated,
        })
    }

    fn load_roster(
        &self,
        year_id: YearId,
    ) -> Result<Vec<FacultyPriorities>, AllocationServiceError> {
        let members = self.catalog.faculty_with_priorities(year_id)?;
        let mut roster = Vec::with_capacity(members.len());
        let mut seen = HashSet::with_capacity(members.len());

        for member in members {
            if !seen.insert(member.faculty_id) {
                return Err(IntegrityAnomaly::DuplicateMember {
                    faculty_id: member.faculty_id,
                    year_id,
                }
                .into());
            }
            let entries = self.catalog.priorities_of(member.faculty_id, year_id)?;
            let foreign = entries
                .iter()
                .find(|entry| entry.faculty_id != member.faculty_id || entry.year_id != year_id);
            if let Some(entry) = foreign {
                return Err(IntegrityAnomaly::ForeignEntry {
                    faculty_id: member.faculty_id,
                    year_id,
                    entry_faculty: entry.faculty_id,
                    entry_year: entry.year_id,
                }
                .into());
            }
            roster.push(FacultyPriorities::new(member, entries));
        }

        Ok(roster)
    }

    /// Persisted allocations of a year joined with display data, ordered by faculty.
    pub fn allocations_for_year(
        &self,
        year_id: YearId,
    ) -> Result<Vec<AllocationDetail>, AllocationServiceError> {
        let records = self.store.allocations_for_year(year_id)?;
        DetailResolver::new(self.directory.as_ref()).details(&records)
    }

    /// Persisted allocations grouped by batch and subject; empty when nothing is stored.
    pub fn allocations_by_batch(
        &self,
        year_id: YearId,
    ) -> Result<Vec<AllocationYearView>, AllocationServiceError> {
        let records = self.store.allocations_for_year(year_id)?;
        let view = DetailResolver::new(self.directory.as_ref()).year_view(year_id, &records)?;
        Ok(view.into_iter().collect())
    }

    pub fn allocation(
        &self,
        allocation_id: AllocationId,
    ) -> Result<AllocationRecord, AllocationServiceError> {
        self.store
            .allocation(allocation_id)?
            .ok_or(AllocationServiceError::NotFound(allocation_id))
    }

    /// Manually override the faculty of one allocation. The next run discards the edit.
    pub fn reassign(
        &self,
        allocation_id: AllocationId,
        reassignment: AllocationReassignment,
    ) -> Result<AllocationRecord, AllocationServiceError> {
        let current = self.allocation(allocation_id)?;

        let mut resolver = DetailResolver::new(self.directory.as_ref());
        resolver.faculty(reassignment.faculty_id)?;
        if let Some(co_faculty_id) = reassignment.co_faculty_id {
            resolver.faculty(co_faculty_id)?;
        }

        let updated = self
            .locks
            .with_year(current.allocation.year_id, || {
                self.store.reassign(allocation_id, &reassignment)
            })?
            .ok_or(AllocationServiceError::NotFound(allocation_id))?;

        info!(
            allocation = allocation_id.0,
            from = current.allocation.faculty_id.0,
            to = updated.allocation.faculty_id.0,
            "allocation reassigned"
        );
        Ok(updated)
    }
}

/// Deadline and cancellation observed at each stage of a run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    deadline: Option<Instant>,
    cancellation: Option<Arc<AtomicBool>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Setting the flag to `true` aborts the run at its next checkpoint.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn check(&self) -> Result<(), RunInterrupted> {
        if self
            .cancellation
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
        {
            return Err(RunInterrupted::Cancelled);
        }
        if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return Err(RunInterrupted::DeadlineExceeded);
        }
        Ok(())
    }
}

/// One mutex per year with work in flight. Entries are dropped once no caller holds them,
/// so the map stays as small as the number of years being written concurrently.
#[derive(Debug, Default)]
struct YearLocks {
    years: Mutex<HashMap<YearId, Arc<Mutex<()>>>>,
}

impl YearLocks {
    fn with_year<T>(&self, year_id: YearId, work: impl FnOnce() -> T) -> T {
        let lock = {
            let mut years = self.years.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(years.entry(year_id).or_default())
        };

        let outcome = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };

        let mut years = self.years.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only taken under the map lock, so two references means map + ours.
        if Arc::strong_count(&lock) == 2 {
            years.remove(&year_id);
        }
        outcome
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.years
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Error raised by the allocation engine.
#[derive(Debug, thiserror::Error)]
pub enum AllocationServiceError {
    #[error(transparent)]
    Persistence(#[from] RepositoryError),
    #[error(transparent)]
    DataIntegrity(#[from] IntegrityAnomaly),
    #[error(transparent)]
    Interrupted(#[from] RunInterrupted),
    #[error("{0} not found")]
    NotFound(AllocationId),
}

/// Referenced data that should exist but does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityAnomaly {
    #[error("{faculty_id} is missing from the faculty directory")]
    UnknownFaculty { faculty_id: FacultyId },
    #[error("{subject_id} is missing from the subject directory")]
    UnknownSubject { subject_id: SubjectId },
    #[error("{batch_id} is missing from the batch directory")]
    UnknownBatch { batch_id: BatchId },
    #[error("{year_id} is missing from the academic year directory")]
    UnknownYear { year_id: YearId },
    #[error("priorities of {faculty_id} for {year_id} contain an entry of {entry_faculty} for {entry_year}")]
    ForeignEntry {
        faculty_id: FacultyId,
        year_id: YearId,
        entry_faculty: FacultyId,
        entry_year: YearId,
    },
    #[error("{faculty_id} is listed more than once among the faculty with priorities for {year_id}")]
    DuplicateMember {
        faculty_id: FacultyId,
        year_id: YearId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RunInterrupted {
    #[error("allocation run exceeded its deadline")]
    DeadlineExceeded,
    #[error("allocation run was cancelled")]
    Cancelled,
}
