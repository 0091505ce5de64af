mod fallback;
mod resolver;

pub use fallback::{FallbackAllocator, FallbackAwards};
pub use resolver::{ConflictResolver, FirstChoiceAwards, SlotContest};

use std::collections::HashSet;

use serde::Serialize;

use super::claims::SlotClaimSet;
use super::domain::{Allocation, FacultyId, FacultyMember, PriorityEntry, YearId};

/// A faculty member together with their ranked list for one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacultyPriorities {
    pub member: FacultyMember,
    /// Ascending by level; entries sharing a level keep their submitted order.
    pub entries: Vec<PriorityEntry>,
}

impl FacultyPriorities {
    pub fn new(member: FacultyMember, mut entries: Vec<PriorityEntry>) -> Self {
        entries.sort_by_key(|entry| entry.level);
        Self { member, entries }
    }

    /// The entry competing in the conflict pass. Only one per faculty member takes part,
    /// even if the submission carried several level-1 rows.
    pub fn first_choice(&self) -> Option<&PriorityEntry> {
        self.entries.iter().find(|entry| entry.level.is_first())
    }
}

/// Deterministic outcome of both passes for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    pub year_id: YearId,
    /// Conflict-pass awards first (by slot), then fallback awards in seniority order.
    pub allocations: Vec<Allocation>,
    pub contests: Vec<SlotContest>,
    pub unallocated: Vec<FacultyId>,
}

impl AllocationPlan {
    pub fn allocation_for(&self, faculty_id: FacultyId) -> Option<&Allocation> {
        self.allocations
            .iter()
            .find(|allocation| allocation.faculty_id == faculty_id)
    }
}

/// Pure composition of the conflict and fallback passes over one shared claim set.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllocationPlanner;

impl AllocationPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, year_id: YearId, mut roster: Vec<FacultyPriorities>) -> AllocationPlan {
        roster.sort_by_key(|faculty| faculty.member.order_key());
        // Keep the most senior row of a faculty member listed more than once.
        let mut seen = HashSet::with_capacity(roster.len());
        roster.retain(|faculty| seen.insert(faculty.member.faculty_id));

        let mut claims = SlotClaimSet::new();

        let first_choices = ConflictResolver::resolve(&roster, &mut claims);
        let mut settled: HashSet<FacultyId> = first_choices
            .allocations
            .iter()
            .map(|allocation| allocation.faculty_id)
            .collect();

        let fallback = FallbackAllocator::allocate(&roster, &mut settled, &mut claims);

        let mut allocations = first_choices.allocations;
        allocations.extend(fallback.allocations);

        AllocationPlan {
            year_id,
            allocations,
            contests: first_choices.contests,
            unallocated: fallback.unallocated,
        }
    }
}
