//! Ambiguity, conflict and completeness checks over classified items.
//!
//! Flags carry positional indices into the slice as validated. Reordering the
//! items afterwards (prioritization does) leaves those indices pointing at the
//! pre-sort order.
use crate::models::{RequirementItem, ValidationFlag, ValidationReport};

const AMBIGUOUS_TERMS: [&str; 6] = [
    "fast",
    "easy",
    "user-friendly",
    "quickly",
    "optimize",
    "seamless",
];

const CONFLICT_TERMS: [(&str, &str); 3] = [("must", "should"), ("must", "could"), ("should", "wont")];

/// Items with fewer tokens than this are under-specified.
const MIN_TOKENS: usize = 5;

pub fn is_ambiguous(text: &str) -> bool {
    let lower = text.to_lowercase();
    AMBIGUOUS_TERMS.iter().any(|t| lower.contains(t))
}

/// Whether `a` and `b` carry the two sides of a conflicting term pair, in
/// either direction.
pub fn conflicts(a: &str, b: &str) -> bool {
    let (la, lb) = (a.to_lowercase(), b.to_lowercase());
    CONFLICT_TERMS.iter().any(|(t1, t2)| {
        (la.contains(t1) && lb.contains(t2)) || (la.contains(t2) && lb.contains(t1))
    })
}

pub fn is_underspecified(text: &str) -> bool {
    text.split_whitespace().count() < MIN_TOKENS
}

/// Run all checks. Conflicts compare every unordered pair.
pub fn validate(items: &[RequirementItem]) -> ValidationReport {
    let mut flags: Vec<ValidationFlag> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| is_ambiguous(&item.text))
        .map(|(index, item)| ValidationFlag::Ambiguity {
            index,
            text: item.text.clone(),
        })
        .collect();

    for i in 0..items.len() {
        for j in i + 1..items.len() {
            if conflicts(&items[i].text, &items[j].text) {
                flags.push(ValidationFlag::Conflict { pair: (i, j) });
            }
        }
    }

    let missing = items
        .iter()
        .enumerate()
        .filter(|(_, item)| is_underspecified(&item.text))
        .map(|(i, _)| i)
        .collect();

    ValidationReport { flags, missing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    #[test]
    fn test_empty_input() {
        let report = validate(&[]);
        assert!(report.flags.is_empty());
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_must_should_conflict() {
        let items = classify(&["The system must export reports", "The system should import data"]);
        let report = validate(&items);
        assert_eq!(report.flags, vec![ValidationFlag::Conflict { pair: (0, 1) }]);
    }

    #[test]
    fn test_conflict_checked_both_directions() {
        assert!(conflicts("it could happen", "it must happen"));
        assert!(conflicts("we wont ship", "we should ship"));
        assert!(!conflicts("it must happen", "it must also happen"));
        assert!(!conflicts("could one", "should two"));
    }

    #[test]
    fn test_ambiguity_flag() {
        let items = classify(&["The system should optimize login flow quickly"]);
        let report = validate(&items);
        assert_eq!(
            report.flags,
            vec![ValidationFlag::Ambiguity {
                index: 0,
                text: "The system should optimize login flow quickly".into(),
            }]
        );
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_short_item_missing() {
        let items = classify(&["Reset", "The admin must approve new accounts"]);
        let report = validate(&items);
        assert_eq!(report.missing, vec![0]);
    }

    #[test]
    fn test_flag_order_ambiguity_then_conflicts() {
        let items = classify(&[
            "The UI must be easy to learn for everyone",
            "Search should return results for partial names",
            "Exports could be scheduled by the administrator",
        ]);
        let report = validate(&items);
        assert_eq!(
            report.flags,
            vec![
                ValidationFlag::Ambiguity {
                    index: 0,
                    text: items[0].text.clone(),
                },
                ValidationFlag::Conflict { pair: (0, 1) },
                ValidationFlag::Conflict { pair: (0, 2) },
            ]
        );
    }
}
