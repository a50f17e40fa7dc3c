use tracing::debug;

use crate::models::{Moscow, RequirementItem};

/// First match wins: must/shall, then should, then could. Anything else is
/// won't-have.
pub fn assign_moscow(text: &str) -> Moscow {
    let lower = text.to_lowercase();
    if lower.contains("must") || lower.contains("shall") {
        Moscow::Must
    } else if lower.contains("should") {
        Moscow::Should
    } else if lower.contains("could") {
        Moscow::Could
    } else {
        Moscow::Wont
    }
}

/// Tag and score every item, then sort by descending score and ascending
/// category. The sort is stable. An existing tag is kept.
pub fn prioritize(items: &[RequirementItem]) -> Vec<RequirementItem> {
    let mut prioritized: Vec<RequirementItem> = items
        .iter()
        .map(|item| {
            let tag = item.moscow.unwrap_or_else(|| assign_moscow(&item.text));
            item.with_priority(tag, tag.weight())
        })
        .collect();

    prioritized.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| a.category.cmp(&b.category))
    });

    debug!("Prioritized {} items", prioritized.len());
    prioritized
}
