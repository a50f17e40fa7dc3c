use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Category, RequirementItem};

const NON_FUNCTIONAL_CUES: [&str; 7] = [
    "performance",
    "security",
    "scalability",
    "availability",
    "usability",
    "reliability",
    "compliance",
];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse whitespace runs to one space and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Literal keyword classification. No cue means functional.
pub fn categorize(text: &str) -> Category {
    let lower = text.to_lowercase();
    if NON_FUNCTIONAL_CUES.iter().any(|cue| lower.contains(cue)) {
        Category::NonFunctional
    } else {
        Category::Functional
    }
}

/// Normalize candidate lines into requirement items, dropping blank ones.
pub fn classify<S: AsRef<str>>(lines: &[S]) -> Vec<RequirementItem> {
    lines
        .iter()
        .map(|line| clean_text(line.as_ref()))
        .filter(|text| !text.is_empty())
        .map(|text| {
            let category = categorize(&text);
            RequirementItem::new(text, category)
        })
        .collect()
}
