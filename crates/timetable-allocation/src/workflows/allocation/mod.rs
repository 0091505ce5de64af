//! Subject-priority allocation for one academic year.
//!
//! A run clears the stored allocations of the year, resolves first-choice collisions by
//! seniority, hands the displaced faculty their best remaining slot, and commits the new set
//! in one unit of work.

pub mod catalog;
pub mod claims;
pub mod directory;
pub mod domain;
pub mod memory;
pub mod planner;
pub mod projection;
pub mod repository;
pub mod router;
pub mod service;
pub mod submission;

#[cfg(test)]
mod tests;

pub use catalog::{PriorityCatalog, PriorityLedger, PriorityRoster};
pub use claims::SlotClaimSet;
pub use directory::DirectorySnapshot;
pub use domain::{
    AcademicYear, Allocation, AllocationDetail, AllocationId, AllocationReassignment,
    AllocationRecord, AllocationResult, BatchDetails, BatchId, FacultyId, FacultyMember,
    FacultyProfile, FacultyRole, PriorityEntry, PriorityLevel, PriorityLevelError, SeniorityKey,
    SeniorityOrder, SlotKey, SubjectDetails, SubjectId, SubjectType, YearId,
};
pub use memory::{InMemoryAllocationStore, InMemoryPriorityLedger};
pub use planner::{AllocationPlan, AllocationPlanner, FacultyPriorities, SlotContest};
pub use projection::{
    AllocatedBatchView, AllocatedFacultyView, AllocatedSubjectView, AllocationYearView,
    FacultyPriorityView, RankedSubjectView,
};
pub use repository::{AllocationDirectory, AllocationStore, AllocationWriter, RepositoryError};
pub use router::{allocation_router, priority_router};
pub use service::{
    AllocationEngine, AllocationServiceError, IntegrityAnomaly, RunContext, RunInterrupted,
};
pub use submission::{
    validate_priorities, PriorityIntake, PrioritySubmission, SubmissionError, SubmissionReceipt,
    SubmittedPriority,
};
