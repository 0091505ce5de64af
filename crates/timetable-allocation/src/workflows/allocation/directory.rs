use std::collections::BTreeMap;

use super::domain::{
    AcademicYear, BatchDetails, BatchId, FacultyId, FacultyProfile, SubjectDetails, SubjectId,
    YearId,
};
use super::repository::{AllocationDirectory, RepositoryError};

/// In-memory copy of the display data an allocation run joins against.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    faculty: BTreeMap<FacultyId, FacultyProfile>,
    subjects: BTreeMap<SubjectId, SubjectDetails>,
    batches: BTreeMap<BatchId, BatchDetails>,
    years: BTreeMap<YearId, AcademicYear>,
}

impl DirectorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the profile, returning the previous one.
    pub fn insert_faculty(&mut self, profile: FacultyProfile) -> Option<FacultyProfile> {
        self.faculty.insert(profile.faculty_id, profile)
    }

    pub fn insert_subject(&mut self, subject: SubjectDetails) -> Option<SubjectDetails> {
        self.subjects.insert(subject.subject_id, subject)
    }

    pub fn insert_batch(&mut self, batch: BatchDetails) -> Option<BatchDetails> {
        self.batches.insert(batch.batch_id, batch)
    }

    pub fn insert_year(&mut self, year: AcademicYear) -> Option<AcademicYear> {
        self.years.insert(year.year_id, year)
    }

    pub fn with_faculty(mut self, profile: FacultyProfile) -> Self {
        self.insert_faculty(profile);
        self
    }

    pub fn with_subject(mut self, subject: SubjectDetails) -> Self {
        self.insert_subject(subject);
        self
    }

    pub fn with_batch(mut self, batch: BatchDetails) -> Self {
        self.insert_batch(batch);
        self
    }

    pub fn with_year(mut self, year: AcademicYear) -> Self {
        self.insert_year(year);
        self
    }

    pub fn faculty_profiles(&self) -> impl Iterator<Item = &FacultyProfile> {
        self.faculty.values()
    }

    pub fn faculty_profile(&self, id: FacultyId) -> Option<&FacultyProfile> {
        self.faculty.get(&id)
    }

    pub fn subject_details(&self, id: SubjectId) -> Option<&SubjectDetails> {
        self.subjects.get(&id)
    }

    pub fn batch_details(&self, id: BatchId) -> Option<&BatchDetails> {
        self.batches.get(&id)
    }

    pub fn year(&self, id: YearId) -> Option<&AcademicYear> {
        self.years.get(&id)
    }
}

impl AllocationDirectory for DirectorySnapshot {
    fn faculty(&self, id: FacultyId) -> Result<Option<FacultyProfile>, RepositoryError> {
        Ok(self.faculty.get(&id).cloned())
    }

    fn subject(&self, id: SubjectId) -> Result<Option<SubjectDetails>, RepositoryError> {
        Ok(self.subjects.get(&id).cloned())
    }

    fn batch(&self, id: BatchId) -> Result<Option<BatchDetails>, RepositoryError> {
        Ok(self.batches.get(&id).cloned())
    }

    fn academic_year(&self, id: YearId) -> Result<Option<AcademicYear>, RepositoryError> {
        Ok(self.years.get(&id).cloned())
    }
}
