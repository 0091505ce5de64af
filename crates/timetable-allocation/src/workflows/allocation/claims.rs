use std::collections::HashSet;

use super::domain::SlotKey;

/// Slots already handed out during the current run.
///
/// Owned by a single run and threaded by `&mut` through both allocation passes.
#[derive(Debug, Default)]
pub struct SlotClaimSet {
    claimed: HashSet<SlotKey>,
}

impl SlotClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, slot: SlotKey) -> bool {
        self.claimed.contains(&slot)
    }

    /// Callers check `is_claimed` first; claiming a slot twice is a logic error.
    pub fn claim(&mut self, slot: SlotKey) {
        let inserted = self.claimed.insert(slot);
        debug_assert!(inserted, "slot {slot} claimed twice in one run");
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
