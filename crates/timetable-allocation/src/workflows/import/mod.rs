//! Loads submitted priorities and their display data from a flat CSV export.

mod parser;

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::workflows::allocation::{
    validate_priorities, AcademicYear, BatchDetails, BatchId, DirectorySnapshot, FacultyId,
    FacultyMember, FacultyProfile, FacultyRole, PriorityRoster, SubjectDetails, SubjectId,
    SubjectType, SubmissionError, SubmittedPriority, YearId,
};

use parser::PriorityRecord;

/// Priorities and directory data recovered from one export.
#[derive(Debug, Clone, Default)]
pub struct ImportedCatalog {
    pub roster: PriorityRoster,
    pub directory: DirectorySnapshot,
}

impl ImportedCatalog {
    pub fn years(&self) -> Vec<YearId> {
        self.roster.years().collect()
    }
}

#[derive(Debug)]
pub enum PriorityImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidValue {
        line: usize,
        column: &'static str,
        value: String,
    },
    ConflictingRecord {
        line: usize,
        entity: String,
    },
    Submission {
        faculty_id: FacultyId,
        year_id: YearId,
        source: SubmissionError,
    },
}

impl fmt::Display for PriorityImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityImportError::Io(err) => write!(f, "failed to read priority export: {}", err),
            PriorityImportError::Csv(err) => write!(f, "invalid priority CSV data: {}", err),
            PriorityImportError::InvalidValue {
                line,
                column,
                value,
            } => write!(f, "line {}: unrecognised {} '{}'", line, column, value),
            PriorityImportError::ConflictingRecord { line, entity } => write!(
                f,
                "line {}: {} disagrees with an earlier row",
                line, entity
            ),
            PriorityImportError::Submission {
                faculty_id,
                year_id,
                source,
            } => write!(
                f,
                "priorities of {} for {} are invalid: {}",
                faculty_id, year_id, source
            ),
        }
    }
}

impl std::error::Error for PriorityImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PriorityImportError::Io(err) => Some(err),
            PriorityImportError::Csv(err) => Some(err),
            PriorityImportError::Submission { source, .. } => Some(source),
            PriorityImportError::InvalidValue { .. }
            | PriorityImportError::ConflictingRecord { .. } => None,
        }
    }
}

impl From<std::io::Error> for PriorityImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for PriorityImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct PriorityCsvImporter;

impl PriorityCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ImportedCatalog, PriorityImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ImportedCatalog, PriorityImportError> {
        let mut directory = DirectorySnapshot::new();
        let mut submissions: BTreeMap<
            (YearId, FacultyId),
            (FacultyMember, Vec<SubmittedPriority>),
        > = BTreeMap::new();

        for (index, record) in parser::parse_records(reader)?.into_iter().enumerate() {
            // Header occupies line 1.
            let line = index + 2;
            let member = apply_directory_rows(&record, line, &mut directory)?;
            submissions
                .entry((YearId(record.year_id), member.faculty_id))
                .or_insert_with(|| (member, Vec::new()))
                .1
                .push(SubmittedPriority {
                    subject_id: SubjectId(record.subject_id),
                    batch_id: BatchId(record.batch_id),
                    priority: record.priority,
                });
        }

        let mut roster = PriorityRoster::new();
        for ((year_id, faculty_id), (member, priorities)) in submissions {
            let entries = validate_priorities(faculty_id, year_id, &priorities).map_err(
                |source| PriorityImportError::Submission {
                    faculty_id,
                    year_id,
                    source,
                },
            )?;
            debug!(
                faculty = faculty_id.0,
                year = year_id.0,
                entries = entries.len(),
                "imported priorities"
            );
            roster.replace(member, year_id, entries);
        }

        Ok(ImportedCatalog { roster, directory })
    }
}

fn apply_directory_rows(
    record: &PriorityRecord,
    line: usize,
    directory: &mut DirectorySnapshot,
) -> Result<FacultyMember, PriorityImportError> {
    let role = match record.role.as_deref() {
        Some(raw) => FacultyRole::parse(raw).ok_or_else(|| PriorityImportError::InvalidValue {
            line,
            column: "Role",
            value: raw.to_string(),
        })?,
        None => FacultyRole::Faculty,
    };
    let subject_type = match record.subject_type.as_deref() {
        Some(raw) => SubjectType::parse(raw).ok_or_else(|| PriorityImportError::InvalidValue {
            line,
            column: "Subject Type",
            value: raw.to_string(),
        })?,
        None => SubjectType::Core,
    };

    let faculty = FacultyProfile {
        faculty_id: FacultyId(record.faculty_id),
        name: record.faculty_name.clone(),
        email: record.email.clone(),
        role,
        joining_year: record.joining_year,
    };
    let member = faculty.member();
    if is_new(directory.faculty_profile(faculty.faculty_id), &faculty, line, faculty.faculty_id)? {
        directory.insert_faculty(faculty);
    }

    let subject = SubjectDetails {
        subject_id: SubjectId(record.subject_id),
        name: record.subject_name.clone(),
        code: record.subject_code.clone(),
        subject_type,
        abbreviation: record.abbreviation.clone(),
    };
    if is_new(directory.subject_details(subject.subject_id), &subject, line, subject.subject_id)? {
        directory.insert_subject(subject);
    }

    let batch = BatchDetails {
        batch_id: BatchId(record.batch_id),
        section: record.section.clone(),
        student_count: record.student_count,
    };
    if is_new(directory.batch_details(batch.batch_id), &batch, line, batch.batch_id)? {
        directory.insert_batch(batch);
    }

    let year = AcademicYear {
        year_id: YearId(record.year_id),
        label: record.academic_year.clone(),
    };
    if is_new(directory.year(year.year_id), &year, line, year.year_id)? {
        directory.insert_year(year);
    }

    Ok(member)
}

/// `true` when the id is unseen; an id seen with different data is a conflict.
fn is_new<T: PartialEq>(
    known: Option<&T>,
    incoming: &T,
    line: usize,
    entity: impl fmt::Display,
) -> Result<bool, PriorityImportError> {
    match known {
        None => Ok(true),
        Some(existing) if existing == incoming => Ok(false),
        Some(_) => Err(PriorityImportError::ConflictingRecord {
            line,
            entity: entity.to_string(),
        }),
    }
}
