use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::super::claims::SlotClaimSet;
use super::super::domain::{Allocation, FacultyId, SlotKey};
use super::FacultyPriorities;

/// A first-choice slot wanted by more than one faculty member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotContest {
    pub slot: SlotKey,
    pub winner: FacultyId,
    /// Claimants that lost, most senior first; they continue to the fallback pass.
    pub displaced: Vec<FacultyId>,
}

/// Level-1 allocations granted by the conflict pass.
#[derive(Debug, Default)]
pub struct FirstChoiceAwards {
    pub allocations: Vec<Allocation>,
    pub contests: Vec<SlotContest>,
}

/// Settles every first-choice claim before any fallback happens.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Groups faculty by the slot they ranked first and awards each slot to the claimant
    /// with the lowest seniority order. Every awarded slot is claimed before returning.
    pub fn resolve(roster: &[FacultyPriorities], claims: &mut SlotClaimSet) -> FirstChoiceAwards {
        let mut claimants: BTreeMap<SlotKey, Vec<&FacultyPriorities>> = BTreeMap::new();
        for faculty in roster {
            if let Some(entry) = faculty.first_choice() {
                claimants.entry(entry.slot()).or_default().push(faculty);
            }
        }

        let mut awards = FirstChoiceAwards::default();
        for (slot, mut group) in claimants {
            group.sort_by_key(|faculty| faculty.member.order_key());
            let Some((winner, rest)) = group.split_first() else {
                continue;
            };
            let Some(entry) = winner.first_choice() else {
                continue;
            };

            claims.claim(slot);
            awards.allocations.push(Allocation::from_entry(entry));

            if !rest.is_empty() {
                let displaced: Vec<FacultyId> =
                    rest.iter().map(|faculty| faculty.member.faculty_id).collect();
                debug!(
                    subject = slot.subject_id.0,
                    batch = slot.batch_id.0,
                    winner = winner.member.faculty_id.0,
                    joining_year = winner.member.seniority.joining_year(),
                    displaced = displaced.len(),
                    "first-choice contest settled by seniority"
                );
                awards.contests.push(SlotContest {
                    slot,
                    winner: winner.member.faculty_id,
                    displaced,
                });
            }
        }

        awards
    }
}
