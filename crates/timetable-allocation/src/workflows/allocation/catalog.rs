use std::collections::BTreeMap;

use super::domain::{FacultyId, FacultyMember, PriorityEntry, YearId};
use super::repository::RepositoryError;

/// Read access to submitted priorities.
///
/// Implementations return faculty most-senior first and entries by ascending level, and
/// answer with empty vectors when a year or faculty member has nothing on record.
pub trait PriorityCatalog: Send + Sync {
    fn faculty_with_priorities(&self, year_id: YearId)
        -> Result<Vec<FacultyMember>, RepositoryError>;

    fn priorities_of(
        &self,
        faculty_id: FacultyId,
        year_id: YearId,
    ) -> Result<Vec<PriorityEntry>, RepositoryError>;
}

/// Write side of the catalog used when faculty submit their ranked choices.
pub trait PriorityLedger: PriorityCatalog {
    /// Replaces every entry the faculty member holds for the year.
    fn replace_priorities(
        &self,
        member: FacultyMember,
        year_id: YearId,
        entries: Vec<PriorityEntry>,
    ) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone)]
struct RosterEntry {
    member: FacultyMember,
    entries: Vec<PriorityEntry>,
}

/// In-memory snapshot of submitted priorities keyed by year and faculty.
#[derive(Debug, Clone, Default)]
pub struct PriorityRoster {
    years: BTreeMap<YearId, BTreeMap<FacultyId, RosterEntry>>,
}

impl PriorityRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the entries sorted by level; an empty list withdraws the submission.
    pub fn replace(&mut self, member: FacultyMember, year_id: YearId, mut entries: Vec<PriorityEntry>) {
        let year = self.years.entry(year_id).or_default();
        if entries.is_empty() {
            year.remove(&member.faculty_id);
            return;
        }

        entries.sort_by_key(|entry| entry.level);
        year.insert(member.faculty_id, RosterEntry { member, entries });
    }

    pub fn years(&self) -> impl Iterator<Item = YearId> + '_ {
        self.years
            .iter()
            .filter(|(_, faculty)| !faculty.is_empty())
            .map(|(year_id, _)| *year_id)
    }

    pub fn entry_count(&self, year_id: YearId) -> usize {
        self.years
            .get(&year_id)
            .map(|faculty| faculty.values().map(|entry| entry.entries.len()).sum())
            .unwrap_or(0)
    }

    pub fn members(&self, year_id: YearId) -> Vec<FacultyMember> {
        let mut members: Vec<FacultyMember> = self
            .years
            .get(&year_id)
            .map(|faculty| faculty.values().map(|entry| entry.member).collect())
            .unwrap_or_default();
        members.sort_by_key(FacultyMember::order_key);
        members
    }

    pub fn entries(&self, faculty_id: FacultyId, year_id: YearId) -> Vec<PriorityEntry> {
        self.years
            .get(&year_id)
            .and_then(|faculty| faculty.get(&faculty_id))
            .map(|entry| entry.entries.clone())
            .unwrap_or_default()
    }
}

impl PriorityCatalog for PriorityRoster {
    fn faculty_with_priorities(
        &self,
        year_id: YearId,
    ) -> Result<Vec<FacultyMember>, RepositoryError> {
        Ok(self.members(year_id))
    }

    fn priorities_of(
        &self,
        faculty_id: FacultyId,
        year_id: YearId,
    ) -> Result<Vec<PriorityEntry>, RepositoryError> {
        Ok(self.entries(faculty_id, year_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::allocation::domain::{BatchId, PriorityLevel, SeniorityKey, SubjectId};

    fn entry(faculty: u32, subject: u32, level: u8) -> PriorityEntry {
        PriorityEntry {
            faculty_id: FacultyId(faculty),
            subject_id: SubjectId(subject),
            batch_id: BatchId(1),
            year_id: YearId(1),
            level: PriorityLevel::new(level).expect("valid level"),
        }
    }

    fn member(faculty: u32, joining_year: i32) -> FacultyMember {
        FacultyMember::new(FacultyId(faculty), SeniorityKey::from_joining_year(joining_year))
    }

    #[test]
    fn members_are_returned_most_senior_first() {
        let mut roster = PriorityRoster::new();
        roster.replace(member(1, 2021), YearId(1), vec![entry(1, 10, 1)]);
        roster.replace(member(2, 2012), YearId(1), vec![entry(2, 11, 1)]);
        roster.replace(member(3, 2016), YearId(1), vec![entry(3, 12, 1)]);

        let order: Vec<u32> = roster
            .faculty_with_priorities(YearId(1))
            .expect("catalog read")
            .iter()
            .map(|member| member.faculty_id.0)
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn entries_are_sorted_by_level_and_missing_data_is_empty() {
        let mut roster = PriorityRoster::new();
        roster.replace(
            member(1, 2020),
            YearId(1),
            vec![entry(1, 12, 3), entry(1, 10, 1), entry(1, 11, 2)],
        );

        let levels: Vec<u8> = roster
            .priorities_of(FacultyId(1), YearId(1))
            .expect("catalog read")
            .iter()
            .map(|entry| entry.level.get())
            .collect();
        assert_eq!(levels, vec![1, 2, 3]);
        assert!(roster
            .priorities_of(FacultyId(1), YearId(2))
            .expect("catalog read")
            .is_empty());
        assert!(roster
            .faculty_with_priorities(YearId(9))
            .expect("catalog read")
            .is_empty());
    }

    #[test]
    fn empty_replacement_withdraws_member() {
        let mut roster = PriorityRoster::new();
        roster.replace(member(1, 2020), YearId(1), vec![entry(1, 10, 1)]);
        roster.replace(member(1, 2020), YearId(1), Vec::new());

        assert_eq!(roster.entry_count(YearId(1)), 0);
        assert_eq!(roster.years().count(), 0);
    }
}
