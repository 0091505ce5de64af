use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::catalog::PriorityLedger;
use super::domain::{
    BatchId, FacultyId, FacultyMember, PriorityEntry, PriorityLevel, SlotKey, SubjectId, YearId,
};
use super::projection::{DetailResolver, FacultyPriorityView};
use super::repository::{AllocationDirectory, RepositoryError};
use super::service::AllocationServiceError;

/// Ranked choices a faculty member submits for one year, replacing earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySubmission {
    pub faculty_id: FacultyId,
    pub year_id: YearId,
    pub priorities: Vec<SubmittedPriority>,
}

/// One row of a submission. The level stays a raw number until validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedPriority {
    pub subject_id: SubjectId,
    pub batch_id: BatchId,
    pub priority: u8,
}

/// Outcome of a submission or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub faculty_id: FacultyId,
    pub year_id: YearId,
    /// Zero for a withdrawal.
    pub accepted: usize,
    /// Entries on record before this submission.
    pub replaced: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("at least one priority is required")]
    Empty,
    #[error("{count} priorities submitted, at most 5 are allowed")]
    TooMany { count: usize },
    #[error("priority {level} is outside 1..=5")]
    LevelOutOfRange { level: u8 },
    #[error("priority {level} is used more than once")]
    DuplicateLevel { level: u8 },
    #[error("priority {level} is missing; levels must run from 1 without gaps")]
    MissingLevel { level: u8 },
    #[error("{slot} is ranked more than once")]
    DuplicateSlot { slot: SlotKey },
    #[error("{0} is not a known faculty member")]
    UnknownFaculty(FacultyId),
    #[error("{0} does not exist")]
    UnknownSubject(SubjectId),
    #[error("{0} does not exist")]
    UnknownBatch(BatchId),
    #[error("{0} does not exist")]
    UnknownYear(YearId),
    #[error("{faculty_id} has no priorities on record for {year_id}")]
    NotSubmitted { faculty_id: FacultyId, year_id: YearId },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Checks the shape of a ranked list and turns it into entries, ascending by level.
pub fn validate_priorities(
    faculty_id: FacultyId,
    year_id: YearId,
    priorities: &[SubmittedPriority],
) -> Result<Vec<PriorityEntry>, SubmissionError> {
    if priorities.is_empty() {
        return Err(SubmissionError::Empty);
    }
    if priorities.len() > usize::from(PriorityLevel::MAX) {
        return Err(SubmissionError::TooMany {
            count: priorities.len(),
        });
    }

    let mut levels = BTreeSet::new();
    let mut slots = BTreeSet::new();
    let mut entries = Vec::with_capacity(priorities.len());

    for submitted in priorities {
        let level = PriorityLevel::new(submitted.priority).map_err(|error| {
            SubmissionError::LevelOutOfRange { level: error.value }
        })?;
        if !levels.insert(level) {
            return Err(SubmissionError::DuplicateLevel { level: level.get() });
        }

        let slot = SlotKey::new(submitted.subject_id, submitted.batch_id);
        if !slots.insert(slot) {
            return Err(SubmissionError::DuplicateSlot { slot });
        }

        entries.push(PriorityEntry {
            faculty_id,
            subject_id: submitted.subject_id,
            batch_id: submitted.batch_id,
            year_id,
            level,
        });
    }

    let missing = (PriorityLevel::MIN..)
        .zip(levels.iter())
        .find(|(expected, level)| level.get() != *expected);
    if let Some((expected, _)) = missing {
        return Err(SubmissionError::MissingLevel { level: expected });
    }

    entries.sort_by_key(|entry| entry.level);
    Ok(entries)
}

/// Accepts priority submissions after checking them against the directory.
pub struct PriorityIntake<L, D> {
    ledger: Arc<L>,
    directory: Arc<D>,
}

impl<L, D> PriorityIntake<L, D>
where
    L: PriorityLedger + 'static,
    D: AllocationDirectory + 'static,
{
    pub fn new(ledger: Arc<L>, directory: Arc<D>) -> Self {
        Self { ledger, directory }
    }

    pub fn submit(
        &self,
        submission: PrioritySubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let PrioritySubmission {
            faculty_id,
            year_id,
            priorities,
        } = submission;

        let entries = validate_priorities(faculty_id, year_id, &priorities)?;

        if self.directory.academic_year(year_id)?.is_none() {
            return Err(SubmissionError::UnknownYear(year_id));
        }
        let profile = self
            .directory
            .faculty(faculty_id)?
            .ok_or(SubmissionError::UnknownFaculty(faculty_id))?;
        for entry in &entries {
            if self.directory.subject(entry.subject_id)?.is_none() {
                return Err(SubmissionError::UnknownSubject(entry.subject_id));
            }
            if self.directory.batch(entry.batch_id)?.is_none() {
                return Err(SubmissionError::UnknownBatch(entry.batch_id));
            }
        }

        let replaced = self.ledger.priorities_of(faculty_id, year_id)?.len();
        let accepted = entries.len();
        self.ledger
            .replace_priorities(profile.member(), year_id, entries)?;

        info!(
            faculty = faculty_id.0,
            year = year_id.0,
            accepted,
            replaced,
            "priorities submitted"
        );

        Ok(SubmissionReceipt {
            faculty_id,
            year_id,
            accepted,
            replaced,
        })
    }

    /// Removes every entry the faculty member holds for the year.
    pub fn withdraw(
        &self,
        faculty_id: FacultyId,
        year_id: YearId,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let member = self
            .ledger
            .faculty_with_priorities(year_id)?
            .into_iter()
            .find(|member| member.faculty_id == faculty_id)
            .ok_or(SubmissionError::NotSubmitted {
                faculty_id,
                year_id,
            })?;

        let replaced = self.ledger.priorities_of(faculty_id, year_id)?.len();
        self.ledger.replace_priorities(member, year_id, Vec::new())?;

        info!(
            faculty = faculty_id.0,
            year = year_id.0,
            replaced,
            "priorities withdrawn"
        );

        Ok(SubmissionReceipt {
            faculty_id,
            year_id,
            accepted: 0,
            replaced,
        })
    }

    pub fn priorities(
        &self,
        faculty_id: FacultyId,
        year_id: YearId,
    ) -> Result<Vec<PriorityEntry>, SubmissionError> {
        Ok(self.ledger.priorities_of(faculty_id, year_id)?)
    }

    /// Every submitted ranking of the year, most senior faculty first.
    pub fn priorities_for_year(
        &self,
        year_id: YearId,
    ) -> Result<Vec<FacultyPriorityView>, AllocationServiceError> {
        let mut members = self.ledger.faculty_with_priorities(year_id)?;
        members.sort_by_key(FacultyMember::order_key);
        let mut resolver = DetailResolver::new(self.directory.as_ref());

        let mut views = Vec::with_capacity(members.len());
        for member in members {
            let entries = self.ledger.priorities_of(member.faculty_id, year_id)?;
            views.push(resolver.faculty_priorities(member.faculty_id, year_id, &entries)?);
        }
        Ok(views)
    }
}
