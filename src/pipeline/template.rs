//! Fixed checklist templates per client complexity.

use crate::models::{ChecklistKind, Complexity, ExpectedDocument};

const SIMPLE: &[ExpectedDocument] = &[
    ExpectedDocument { doc_kind: ChecklistKind::T4, quantity: 1 },
    ExpectedDocument { doc_kind: ChecklistKind::Id, quantity: 1 },
];

const AVERAGE: &[ExpectedDocument] = &[
    ExpectedDocument { doc_kind: ChecklistKind::T4, quantity: 1 },
    ExpectedDocument { doc_kind: ChecklistKind::Id, quantity: 1 },
    ExpectedDocument { doc_kind: ChecklistKind::Receipt, quantity: 2 },
];

const COMPLEX: &[ExpectedDocument] = &[
    ExpectedDocument { doc_kind: ChecklistKind::T4, quantity: 1 },
    ExpectedDocument { doc_kind: ChecklistKind::Id, quantity: 1 },
    ExpectedDocument { doc_kind: ChecklistKind::Receipt, quantity: 5 },
];

/// Expected documents for `complexity`, in checklist order.
pub fn resolve(complexity: Complexity) -> &'static [ExpectedDocument] {
    match complexity {
        Complexity::Simple => SIMPLE,
        Complexity::Average => AVERAGE,
        Complexity::Complex => COMPLEX,
    }
}

pub fn expected_document_count(complexity: Complexity) -> u32 {
    resolve(complexity).iter().map(|e| e.quantity).sum()
}

pub fn expected_receipt_count(complexity: Complexity) -> u32 {
    resolve(complexity)
        .iter()
        .filter(|e| e.doc_kind == ChecklistKind::Receipt)
        .map(|e| e.quantity)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(complexity: Complexity) -> Vec<(ChecklistKind, u32)> {
        resolve(complexity)
            .iter()
            .map(|e| (e.doc_kind, e.quantity))
            .collect()
    }

    #[test]
    fn simple_template() {
        assert_eq!(
            pairs(Complexity::Simple),
            vec![(ChecklistKind::T4, 1), (ChecklistKind::Id, 1)]
        );
    }

    #[test]
    fn average_template() {
        assert_eq!(
            pairs(Complexity::Average),
            vec![
                (ChecklistKind::T4, 1),
                (ChecklistKind::Id, 1),
                (ChecklistKind::Receipt, 2)
            ]
        );
    }

    #[test]
    fn complex_template() {
        assert_eq!(
            pairs(Complexity::Complex),
            vec![
                (ChecklistKind::T4, 1),
                (ChecklistKind::Id, 1),
                (ChecklistKind::Receipt, 5)
            ]
        );
    }

    #[test]
    fn kinds_are_unique_and_quantities_positive() {
        for complexity in [Complexity::Simple, Complexity::Average, Complexity::Complex] {
            let template = resolve(complexity);
            for (i, a) in template.iter().enumerate() {
                assert!(a.quantity >= 1);
                assert!(template[i + 1..].iter().all(|b| b.doc_kind != a.doc_kind));
            }
        }
    }

    #[test]
    fn derived_counts() {
        assert_eq!(expected_document_count(Complexity::Simple), 2);
        assert_eq!(expected_document_count(Complexity::Average), 4);
        assert_eq!(expected_document_count(Complexity::Complex), 7);
        assert_eq!(expected_receipt_count(Complexity::Simple), 0);
        assert_eq!(expected_receipt_count(Complexity::Average), 2);
        assert_eq!(expected_receipt_count(Complexity::Complex), 5);
    }
}
