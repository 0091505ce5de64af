use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a faculty member in the external user store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacultyId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub u32);

/// Academic year the priorities and allocations belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YearId(pub u32);

/// Store-assigned identifier of a persisted allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationId(pub u64);

impl fmt::Display for FacultyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "faculty {}", self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subject {}", self.0)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch {}", self.0)
    }
}

impl fmt::Display for YearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "year {}", self.0)
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "allocation {}", self.0)
    }
}

/// Self-ranked preference, 1 (most wanted) through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PriorityLevel(u8);

impl PriorityLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    pub const FIRST: PriorityLevel = PriorityLevel(Self::MIN);

    pub fn new(value: u8) -> Result<Self, PriorityLevelError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PriorityLevelError { value })
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn is_first(self) -> bool {
        self.0 == Self::MIN
    }
}

impl TryFrom<u8> for PriorityLevel {
    type Error = PriorityLevelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PriorityLevel> for u8 {
    fn from(level: PriorityLevel) -> Self {
        level.0
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("priority level {value} is outside 1..=5")]
pub struct PriorityLevelError {
    pub value: u8,
}

/// Joining year of a faculty member; a lower key is more senior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeniorityKey(pub i32);

impl SeniorityKey {
    pub const fn from_joining_year(year: i32) -> Self {
        Self(year)
    }

    pub const fn joining_year(self) -> i32 {
        self.0
    }
}

/// Faculty member who submitted priorities for a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyMember {
    pub faculty_id: FacultyId,
    pub seniority: SeniorityKey,
}

impl FacultyMember {
    pub const fn new(faculty_id: FacultyId, seniority: SeniorityKey) -> Self {
        Self {
            faculty_id,
            seniority,
        }
    }

    /// Arbitration key: senior first, lower id first between equals.
    pub const fn order_key(&self) -> SeniorityOrder {
        SeniorityOrder {
            seniority: self.seniority,
            faculty_id: self.faculty_id,
        }
    }
}

/// Total order used by both allocation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeniorityOrder {
    pub seniority: SeniorityKey,
    pub faculty_id: FacultyId,
}

/// Subject/batch pair for one year; the unit of contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub subject_id: SubjectId,
    pub batch_id: BatchId,
}

impl SlotKey {
    pub const fn new(subject_id: SubjectId, batch_id: BatchId) -> Self {
        Self {
            subject_id,
            batch_id,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.subject_id, self.batch_id)
    }
}

/// One ranked choice submitted by a faculty member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub faculty_id: FacultyId,
    pub subject_id: SubjectId,
    pub batch_id: BatchId,
    pub year_id: YearId,
    pub level: PriorityLevel,
}

impl PriorityEntry {
    pub const fn slot(&self) -> SlotKey {
        SlotKey::new(self.subject_id, self.batch_id)
    }
}

/// Output of an allocation run, before persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub faculty_id: FacultyId,
    pub subject_id: SubjectId,
    pub batch_id: BatchId,
    pub year_id: YearId,
    /// Rank of the faculty member's own list that was satisfied.
    pub allocated_level: PriorityLevel,
}

impl Allocation {
    pub(crate) fn from_entry(entry: &PriorityEntry) -> Self {
        Self {
            faculty_id: entry.faculty_id,
            subject_id: entry.subject_id,
            batch_id: entry.batch_id,
            year_id: entry.year_id,
            allocated_level: entry.level,
        }
    }

    pub const fn slot(&self) -> SlotKey {
        SlotKey::new(self.subject_id, self.batch_id)
    }
}

/// Allocation as stored, including the fields only manual edits touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub allocation_id: AllocationId,
    #[serde(flatten)]
    pub allocation: Allocation,
    pub created_at: DateTime<Utc>,
    pub co_faculty_id: Option<FacultyId>,
    pub venue: Option<String>,
}

impl AllocationRecord {
    pub fn new(allocation_id: AllocationId, allocation: Allocation, created_at: DateTime<Utc>) -> Self {
        Self {
            allocation_id,
            allocation,
            created_at,
            co_faculty_id: None,
            venue: None,
        }
    }
}

/// Manual override applied to a persisted allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationReassignment {
    pub faculty_id: FacultyId,
    #[serde(default)]
    pub co_faculty_id: Option<FacultyId>,
    #[serde(default)]
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacultyRole {
    Faculty,
    Admin,
    TimetableCoordinator,
}

impl FacultyRole {
    pub const fn label(self) -> &'static str {
        match self {
            FacultyRole::Faculty => "FACULTY",
            FacultyRole::Admin => "ADMIN",
            FacultyRole::TimetableCoordinator => "TIMETABLE_COORDINATOR",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "FACULTY" => Some(Self::Faculty),
            "ADMIN" => Some(Self::Admin),
            "TIMETABLE_COORDINATOR" => Some(Self::TimetableCoordinator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectType {
    Core,
    Elective,
    Lab,
}

impl SubjectType {
    pub const fn label(self) -> &'static str {
        match self {
            SubjectType::Core => "CORE",
            SubjectType::Elective => "ELECTIVE",
            SubjectType::Lab => "LAB",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CORE" => Some(Self::Core),
            "ELECTIVE" => Some(Self::Elective),
            "LAB" => Some(Self::Lab),
            _ => None,
        }
    }
}

/// Display data for a faculty member, owned by the user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyProfile {
    pub faculty_id: FacultyId,
    pub name: String,
    pub email: String,
    pub role: FacultyRole,
    pub joining_year: i32,
}

impl FacultyProfile {
    pub fn member(&self) -> FacultyMember {
        FacultyMember::new(
            self.faculty_id,
            SeniorityKey::from_joining_year(self.joining_year),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDetails {
    pub subject_id: SubjectId,
    pub name: String,
    pub code: String,
    pub subject_type: SubjectType,
    pub abbreviation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDetails {
    pub batch_id: BatchId,
    pub section: String,
    pub student_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    pub year_id: YearId,
    /// Human label such as `2024-2025`.
    pub label: String,
}

/// Persisted allocation joined with faculty, subject, batch and year display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDetail {
    pub allocation_id: AllocationId,
    pub faculty_id: FacultyId,
    pub faculty_name: String,
    pub faculty_email: String,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub subject_type: SubjectType,
    pub abbreviation: String,
    pub batch_id: BatchId,
    pub batch_section: String,
    pub batch_student_count: u32,
    pub year_id: YearId,
    pub academic_year: String,
    pub allocated_priority: PriorityLevel,
    pub created_at: DateTime<Utc>,
    pub co_faculty_id: Option<FacultyId>,
    pub venue: Option<String>,
}

/// Response of a full allocation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub total_allocations: usize,
    pub allocations: Vec<AllocationDetail>,
    /// Faculty who ranked subjects but found every choice taken.
    #[serde(default)]
    pub unallocated: Vec<FacultyId>,
}

impl AllocationResult {
    pub fn empty() -> Self {
        Self {
            total_allocations: 0,
            allocations: Vec::new(),
            unallocated: Vec::new(),
        }
    }
}
