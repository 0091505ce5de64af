use super::domain::{
    AcademicYear, Allocation, AllocationId, AllocationReassignment, AllocationRecord, BatchDetails,
    BatchId, FacultyId, FacultyProfile, SubjectDetails, SubjectId, YearId,
};

/// Persistence for allocation rows.
///
/// Every write of a run goes through one [`AllocationWriter`] so that clearing the old set
/// and inserting the new one become visible together or not at all.
pub trait AllocationStore: Send + Sync {
    fn begin(&self, year_id: YearId) -> Result<Box<dyn AllocationWriter + '_>, RepositoryError>;

    fn allocations_for_year(&self, year_id: YearId)
        -> Result<Vec<AllocationRecord>, RepositoryError>;

    fn allocation(&self, id: AllocationId) -> Result<Option<AllocationRecord>, RepositoryError>;

    /// Applies a manual override; `None` when the allocation does not exist.
    fn reassign(
        &self,
        id: AllocationId,
        reassignment: &AllocationReassignment,
    ) -> Result<Option<AllocationRecord>, RepositoryError>;
}

/// Unit of work scoped to one year. Dropping it without `commit` discards its changes.
pub trait AllocationWriter {
    /// Removes every allocation of the year, returning how many were staged for removal.
    fn clear_allocations(&mut self) -> Result<usize, RepositoryError>;

    fn create_allocation(
        &mut self,
        allocation: &Allocation,
    ) -> Result<AllocationRecord, RepositoryError>;

    fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Lookup of display data owned by the user, subject, batch and year stores.
pub trait AllocationDirectory: Send + Sync {
    fn faculty(&self, id: FacultyId) -> Result<Option<FacultyProfile>, RepositoryError>;
    fn subject(&self, id: SubjectId) -> Result<Option<SubjectDetails>, RepositoryError>;
    fn batch(&self, id: BatchId) -> Result<Option<BatchDetails>, RepositoryError>;
    fn academic_year(&self, id: YearId) -> Result<Option<AcademicYear>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
