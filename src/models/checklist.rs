use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ChecklistKind, ChecklistStatus};

/// One entry of a checklist template: an expected kind and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedDocument {
    pub doc_kind: ChecklistKind,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub intake_id: Uuid,
    pub doc_kind: ChecklistKind,
    /// Template order, used for stable listing.
    pub position: u32,
    pub quantity_expected: u32,
    pub quantity_received: u32,
    pub status: ChecklistStatus,
}

impl ChecklistItem {
    pub fn is_complete(&self) -> bool {
        self.status == ChecklistStatus::Received
    }

    /// Whole-number percentage, 0..=100.
    pub fn progress_percentage(&self) -> u32 {
        if self.quantity_expected == 0 {
            return 100;
        }
        (self.quantity_received.min(self.quantity_expected) * 100) / self.quantity_expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(received: u32, expected: u32) -> ChecklistItem {
        ChecklistItem {
            id: Uuid::new_v4(),
            intake_id: Uuid::new_v4(),
            doc_kind: ChecklistKind::Receipt,
            position: 2,
            quantity_expected: expected,
            quantity_received: received,
            status: ChecklistStatus::derive(received, expected),
        }
    }

    #[test]
    fn progress_is_proportional() {
        assert_eq!(item(0, 5).progress_percentage(), 0);
        assert_eq!(item(2, 5).progress_percentage(), 40);
        assert_eq!(item(1, 2).progress_percentage(), 50);
        assert_eq!(item(1, 1).progress_percentage(), 100);
    }

    #[test]
    fn completeness_follows_status() {
        assert!(!item(1, 2).is_complete());
        assert!(item(2, 2).is_complete());
    }
}
