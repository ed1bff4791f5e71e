//! Pure waitlist state machine and promotion walk (spec §3, §4.4).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "waitlist_status", rename_all = "snake_case")]
pub enum WaitlistStatus {
    Pending,
    Notified,
    Booked,
    Cancelled,
    Expired,
}

impl WaitlistStatus {
    /// PENDING or NOTIFIED: counts toward the "at most one active entry per
    /// (user, event)" invariant and occupies a priority slot.
    pub fn is_active(&self) -> bool {
        matches!(self, WaitlistStatus::Pending | WaitlistStatus::Notified)
    }

    pub fn can_cancel(&self) -> bool {
        !matches!(self, WaitlistStatus::Cancelled | WaitlistStatus::Booked)
    }
}

/// Minimal view of a PENDING entry needed to run the promotion walk —
/// callers supply these sorted or unsorted; `notify_next` sorts internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<Id> {
    pub id: Id,
    pub priority: i64,
    pub quantity: i32,
}

/// Result of a single `notify_next` walk: ids to promote to NOTIFIED, in the
/// order they were promoted, and the capacity left unconsumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyPlan<Id> {
    pub promoted: Vec<Id>,
    pub remaining: i32,
}

/// spec §4.4 `notify_next`: walk PENDING entries ordered by priority
/// ascending, consuming `available_qty`. An entry whose quantity exceeds
/// what's left is **skipped**, not promoted and not blocking later,
/// smaller entries — deliberate head-of-line avoidance (spec §9, Open
/// Question 2; scenario S5).
pub fn notify_next<Id: Copy>(mut candidates: Vec<Candidate<Id>>, available_qty: i32) -> NotifyPlan<Id> {
    candidates.sort_by_key(|c| c.priority);

    let mut remaining = available_qty;
    let mut promoted = Vec::new();
    for c in candidates {
        if c.quantity <= remaining {
            promoted.push(c.id);
            remaining -= c.quantity;
        }
    }
    NotifyPlan { promoted, remaining }
}

/// spec §4.4 join step 4: priority assigned at join time.
pub fn next_priority(active_priorities: &[i64]) -> i64 {
    active_priorities.iter().copied().max().unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_fifo_when_all_fit() {
        let candidates = vec![
            Candidate { id: "b", priority: 2, quantity: 1 },
            Candidate { id: "a", priority: 1, quantity: 1 },
        ];
        let plan = notify_next(candidates, 5);
        assert_eq!(plan.promoted, vec!["a", "b"]);
        assert_eq!(plan.remaining, 3);
    }

    /// Scenario S5: A (priority 1, qty 3) is skipped when only 1 unit
    /// releases; B (priority 2, qty 1) is promoted instead, out of strict
    /// FIFO order.
    #[test]
    fn head_of_line_avoidance_skips_oversized_entry() {
        let candidates = vec![
            Candidate { id: "A", priority: 1, quantity: 3 },
            Candidate { id: "B", priority: 2, quantity: 1 },
        ];
        let plan = notify_next(candidates, 1);
        assert_eq!(plan.promoted, vec!["B"]);
        assert_eq!(plan.remaining, 0);
    }

    /// Scenario S4: both quantity 1, single release of 1 promotes only A.
    #[test]
    fn single_release_promotes_single_matching_entry() {
        let candidates = vec![
            Candidate { id: "A", priority: 1, quantity: 1 },
            Candidate { id: "B", priority: 2, quantity: 1 },
        ];
        let plan = notify_next(candidates, 1);
        assert_eq!(plan.promoted, vec!["A"]);
        assert_eq!(plan.remaining, 0);
    }

    #[test]
    fn next_priority_is_max_plus_one_or_one_when_empty() {
        assert_eq!(next_priority(&[]), 1);
        assert_eq!(next_priority(&[1, 2, 5]), 6);
    }

    use proptest::prelude::*;

    proptest! {
        /// Invariant 5: FIFO promotion — among entries that are promoted,
        /// priority order is preserved.
        #[test]
        fn promoted_entries_preserve_priority_order(
            entries in proptest::collection::vec((1i64..100, 1i32..10), 1..20),
            available in 0i32..100,
        ) {
            let candidates: Vec<Candidate<i64>> = entries
                .iter()
                .enumerate()
                .map(|(idx, (priority, qty))| Candidate { id: idx as i64, priority: *priority, quantity: *qty })
                .collect();
            let by_id: std::collections::HashMap<i64, i64> =
                candidates.iter().map(|c| (c.id, c.priority)).collect();
            let plan = notify_next(candidates, available);
            let priorities: Vec<i64> = plan.promoted.iter().map(|id| by_id[id]).collect();
            let mut sorted = priorities.clone();
            sorted.sort();
            prop_assert_eq!(priorities, sorted);
            prop_assert!(plan.remaining >= 0);
        }
    }
}
