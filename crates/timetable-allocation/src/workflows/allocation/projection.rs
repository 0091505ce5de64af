//! Read models built over persisted allocation rows.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{
    AcademicYear, AllocationDetail, AllocationRecord, BatchDetails, BatchId, FacultyId,
    FacultyProfile, FacultyRole, PriorityEntry, PriorityLevel, SubjectDetails, SubjectId,
    SubjectType, YearId,
};
use super::repository::{AllocationDirectory, RepositoryError};
use super::service::{AllocationServiceError, IntegrityAnomaly};

/// Allocations of one year grouped by batch and then subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationYearView {
    pub year_id: YearId,
    pub year: String,
    pub batches: BTreeMap<BatchId, AllocatedBatchView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatedBatchView {
    pub batch_id: BatchId,
    pub section: String,
    pub student_count: u32,
    pub subjects: BTreeMap<SubjectId, AllocatedSubjectView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatedSubjectView {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub subject_type: SubjectType,
    pub abbreviation: String,
    pub allocated_faculty: AllocatedFacultyView,
    pub co_faculty: Option<AllocatedFacultyView>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatedFacultyView {
    pub faculty_id: FacultyId,
    pub name: String,
    pub role: FacultyRole,
    pub email: String,
    pub joining_year: i32,
}

impl From<FacultyProfile> for AllocatedFacultyView {
    fn from(profile: FacultyProfile) -> Self {
        Self {
            faculty_id: profile.faculty_id,
            name: profile.name,
            role: profile.role,
            email: profile.email,
            joining_year: profile.joining_year,
        }
    }
}

/// Submitted ranking of one faculty member, as reviewed by the timetable coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacultyPriorityView {
    pub faculty: AllocatedFacultyView,
    pub year_id: YearId,
    pub academic_year: String,
    pub priorities: Vec<RankedSubjectView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedSubjectView {
    pub priority: PriorityLevel,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub subject_type: SubjectType,
    pub abbreviation: String,
    pub batch_id: BatchId,
    pub section: String,
    pub student_count: u32,
}

/// Joins allocation rows with directory data, looking each id up at most once.
pub(crate) struct DetailResolver<'a, D: ?Sized> {
    directory: &'a D,
    faculty: BTreeMap<FacultyId, FacultyProfile>,
    subjects: BTreeMap<SubjectId, SubjectDetails>,
    batches: BTreeMap<BatchId, BatchDetails>,
    years: BTreeMap<YearId, AcademicYear>,
}

impl<'a, D> DetailResolver<'a, D>
where
    D: AllocationDirectory + ?Sized,
{
    pub(crate) fn new(directory: &'a D) -> Self {
        Self {
            directory,
            faculty: BTreeMap::new(),
            subjects: BTreeMap::new(),
            batches: BTreeMap::new(),
            years: BTreeMap::new(),
        }
    }

    pub(crate) fn faculty(&mut self, id: FacultyId) -> Result<FacultyProfile, AllocationServiceError> {
        let directory = self.directory;
        cached(&mut self.faculty, id, |id| directory.faculty(id), |faculty_id| {
            IntegrityAnomaly::UnknownFaculty { faculty_id }
        })
    }

    fn subject(&mut self, id: SubjectId) -> Result<SubjectDetails, AllocationServiceError> {
        let directory = self.directory;
        cached(&mut self.subjects, id, |id| directory.subject(id), |subject_id| {
            IntegrityAnomaly::UnknownSubject { subject_id }
        })
    }

    fn batch(&mut self, id: BatchId) -> Result<BatchDetails, AllocationServiceError> {
        let directory = self.directory;
        cached(&mut self.batches, id, |id| directory.batch(id), |batch_id| {
            IntegrityAnomaly::UnknownBatch { batch_id }
        })
    }

    pub(crate) fn year(&mut self, id: YearId) -> Result<AcademicYear, AllocationServiceError> {
        let directory = self.directory;
        cached(&mut self.years, id, |id| directory.academic_year(id), |year_id| {
            IntegrityAnomaly::UnknownYear { year_id }
        })
    }

    pub(crate) fn detail(
        &mut self,
        record: &AllocationRecord,
    ) -> Result<AllocationDetail, AllocationServiceError> {
        let allocation = &record.allocation;
        let faculty = self.faculty(allocation.faculty_id)?;
        let subject = self.subject(allocation.subject_id)?;
        let batch = self.batch(allocation.batch_id)?;
        let year = self.year(allocation.year_id)?;

        Ok(AllocationDetail {
            allocation_id: record.allocation_id,
            faculty_id: faculty.faculty_id,
            faculty_name: faculty.name,
            faculty_email: faculty.email,
            subject_id: subject.subject_id,
            subject_name: subject.name,
            subject_code: subject.code,
            subject_type: subject.subject_type,
            abbreviation: subject.abbreviation,
            batch_id: batch.batch_id,
            batch_section: batch.section,
            batch_student_count: batch.student_count,
            year_id: year.year_id,
            academic_year: year.label,
            allocated_priority: allocation.allocated_level,
            created_at: record.created_at,
            co_faculty_id: record.co_faculty_id,
            venue: record.venue.clone(),
        })
    }

    /// Details ordered by faculty id, then allocation id.
    pub(crate) fn details(
        &mut self,
        records: &[AllocationRecord],
    ) -> Result<Vec<AllocationDetail>, AllocationServiceError> {
        let mut details = records
            .iter()
            .map(|record| self.detail(record))
            .collect::<Result<Vec<_>, _>>()?;
        details.sort_by_key(|detail| (detail.faculty_id, detail.allocation_id));
        Ok(details)
    }

    /// Groups the rows of one year; `None` when the year has no allocations.
    pub(crate) fn year_view(
        &mut self,
        year_id: YearId,
        records: &[AllocationRecord],
    ) -> Result<Option<AllocationYearView>, AllocationServiceError> {
        if records.is_empty() {
            return Ok(None);
        }

        let year = self.year(year_id)?;
        let mut batches: BTreeMap<BatchId, AllocatedBatchView> = BTreeMap::new();

        for record in records {
            let allocation = &record.allocation;
            let batch_view = match batches.entry(allocation.batch_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let batch = self.batch(allocation.batch_id)?;
                    entry.insert(AllocatedBatchView {
                        batch_id: batch.batch_id,
                        section: batch.section,
                        student_count: batch.student_count,
                        subjects: BTreeMap::new(),
                    })
                }
            };

            if batch_view.subjects.contains_key(&allocation.subject_id) {
                continue;
            }

            let subject = self.subject(allocation.subject_id)?;
            let faculty = self.faculty(allocation.faculty_id)?;
            let co_faculty = record
                .co_faculty_id
                .map(|id| self.faculty(id))
                .transpose()?
                .map(AllocatedFacultyView::from);

            batch_view.subjects.insert(
                subject.subject_id,
                AllocatedSubjectView {
                    subject_id: subject.subject_id,
                    subject_name: subject.name,
                    subject_code: subject.code,
                    subject_type: subject.subject_type,
                    abbreviation: subject.abbreviation,
                    allocated_faculty: faculty.into(),
                    co_faculty,
                    venue: record.venue.clone(),
                },
            );
        }

        Ok(Some(AllocationYearView {
            year_id: year.year_id,
            year: year.label,
            batches,
        }))
    }

    /// Joins one faculty member's entries, kept in level order.
    pub(crate) fn faculty_priorities(
        &mut self,
        faculty_id: FacultyId,
        year_id: YearId,
        entries: &[PriorityEntry],
    ) -> Result<FacultyPriorityView, AllocationServiceError> {
        let faculty = self.faculty(faculty_id)?;
        let year = self.year(year_id)?;

        let mut priorities = Vec::with_capacity(entries.len());
        for entry in entries {
            let subject = self.subject(entry.subject_id)?;
            let batch = self.batch(entry.batch_id)?;
            priorities.push(RankedSubjectView {
                priority: entry.level,
                subject_id: subject.subject_id,
                subject_name: subject.name,
                subject_code: subject.code,
                subject_type: subject.subject_type,
                abbreviation: subject.abbreviation,
                batch_id: batch.batch_id,
                section: batch.section,
                student_count: batch.student_count,
            });
        }
        priorities.sort_by_key(|view| view.priority);

        Ok(FacultyPriorityView {
            faculty: faculty.into(),
            year_id: year.year_id,
            academic_year: year.label,
            priorities,
        })
    }
}

fn cached<K, V>(
    cache: &mut BTreeMap<K, V>,
    key: K,
    load: impl FnOnce(K) -> Result<Option<V>, RepositoryError>,
    missing: impl FnOnce(K) -> IntegrityAnomaly,
) -> Result<V, AllocationServiceError>
where
    K: Ord + Copy,
    V: Clone,
{
    match cache.entry(key) {
        Entry::Occupied(entry) => Ok(entry.get().clone()),
        Entry::Vacant(entry) => {
            let value = load(key)?.ok_or_else(|| missing(key))?;
            Ok(entry.insert(value).clone())
        }
    }
}
