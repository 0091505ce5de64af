use std::collections::HashSet;

use tracing::debug;

use super::super::claims::SlotClaimSet;
use super::super::domain::{Allocation, FacultyId};
use super::FacultyPriorities;

#[derive(Debug, Default)]
pub struct FallbackAwards {
    pub allocations: Vec<Allocation>,
    /// Faculty whose every ranked slot was already taken.
    pub unallocated: Vec<FacultyId>,
}

/// Walks the remaining faculty in seniority order and hands each the first free slot on
/// their list, so senior faculty get first refusal over whatever is left.
///
/// `settled` starts with the conflict-pass winners and gains every faculty member this pass
/// looks at.
pub struct FallbackAllocator;

impl FallbackAllocator {
    pub fn allocate(
        roster: &[FacultyPriorities],
        settled: &mut HashSet<FacultyId>,
        claims: &mut SlotClaimSet,
    ) -> FallbackAwards {
        let mut awards = FallbackAwards::default();

        for faculty in roster {
            let faculty_id = faculty.member.faculty_id;
            // Every faculty member is considered once, served or not.
            if !settled.insert(faculty_id) {
                continue;
            }

            let available = faculty
                .entries
                .iter()
                .find(|entry| !claims.is_claimed(entry.slot()));

            match available {
                Some(entry) => {
                    claims.claim(entry.slot());
                    debug!(
                        faculty = faculty_id.0,
                        subject = entry.subject_id.0,
                        batch = entry.batch_id.0,
                        level = entry.level.get(),
                        "fallback allocation"
                    );
                    awards.allocations.push(Allocation::from_entry(entry));
                }
                None => {
                    debug!(faculty = faculty_id.0, "no ranked slot left");
                    awards.unallocated.push(faculty_id);
                }
            }
        }

        awards
    }
}
