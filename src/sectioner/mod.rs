//! Maps requirements onto a fixed project-management document outline.
//!
//! Detection tries the configured external classifiers in order, then the
//! keyword heuristic, which always yields a label.
pub mod external;

use indexmap::IndexMap;
use tracing::debug;

use crate::models::RequirementItem;

pub use external::{EnrichmentEndpoint, SectionClassifier, ZeroShotEndpoint};

/// Label for items matching no outline section.
pub const OTHER: &str = "OTHER";

pub const OUTLINE_SECTIONS: [&str; 19] = [
    "INTRODUCTION",
    "PROJECT MANAGEMENT APPROACH",
    "PROJECT SCOPE",
    "MILESTONE LIST",
    "SCHEDULE BASELINE AND WORK BREAKDOWN STRUCTURE",
    "CHANGE MANAGEMENT PLAN",
    "COMMUNICATIONS MANAGEMENT PLAN",
    "COST MANAGEMENT PLAN",
    "PROCUREMENT MANAGEMENT PLAN",
    "PROJECT SCOPE MANAGEMENT PLAN",
    "SCHEDULE MANAGEMENT PLAN",
    "QUALITY MANAGEMENT PLAN",
    "RISK MANAGEMENT PLAN",
    "RISK REGISTER",
    "STAFFING MANAGEMENT PLAN",
    "RESOURCE CALENDAR",
    "COST BASELINE",
    "QUALITY BASELINE",
    "SPONSOR ACCEPTANCE",
];

/// Keyword cues per section, in lookup order.
const SECTION_KEYWORDS: [(&str, &[&str]); 19] = [
    ("INTRODUCTION", &["introduction", "overview", "purpose", "background"]),
    (
        "PROJECT MANAGEMENT APPROACH",
        &["management approach", "project management", "governance"],
    ),
    ("PROJECT SCOPE", &["scope", "in-scope", "out of scope", "deliverables"]),
    ("MILESTONE LIST", &["milestone", "milestones", "timeline"]),
    (
        "SCHEDULE BASELINE AND WORK BREAKDOWN STRUCTURE",
        &["schedule baseline", "wbs", "work breakdown"],
    ),
    (
        "CHANGE MANAGEMENT PLAN",
        &["change management", "change control", "change request"],
    ),
    (
        "COMMUNICATIONS MANAGEMENT PLAN",
        &["communication", "stakeholder comms", "status report"],
    ),
    ("COST MANAGEMENT PLAN", &["cost", "budget", "funding", "estimate"]),
    ("PROCUREMENT MANAGEMENT PLAN", &["procurement", "vendor", "contract"]),
    (
        "PROJECT SCOPE MANAGEMENT PLAN",
        &["scope management", "requirements management"],
    ),
    (
        "SCHEDULE MANAGEMENT PLAN",
        &["schedule management", "planning", "gantt"],
    ),
    (
        "QUALITY MANAGEMENT PLAN",
        &["quality", "qa", "qc", "acceptance criteria"],
    ),
    (
        "RISK MANAGEMENT PLAN",
        &["risk management", "risk mitigation", "risk response"],
    ),
    ("RISK REGISTER", &["risk register", "risk id", "probability", "impact"]),
    (
        "STAFFING MANAGEMENT PLAN",
        &["staffing", "resource plan", "roles and responsibilities", "raci"],
    ),
    ("RESOURCE CALENDAR", &["resource calendar", "availability", "capacity"]),
    ("COST BASELINE", &["cost baseline", "baseline budget"]),
    ("QUALITY BASELINE", &["quality baseline", "baseline quality"]),
    (
        "SPONSOR ACCEPTANCE",
        &["sponsor acceptance", "approval", "sign-off", "signoff"],
    ),
];

/// Section name to occurrence count, in outline order with `OTHER` last.
pub type SectionSummary = IndexMap<String, usize>;

/// The canonical outline label for `label`, if it is one.
pub fn canonical_section(label: &str) -> Option<&'static str> {
    let upper = label.trim().to_uppercase();
    OUTLINE_SECTIONS.iter().copied().find(|s| *s == upper)
}

/// Offline detection: a full section name first, then keyword cues, then
/// [`OTHER`].
pub fn heuristic_section(text: &str) -> &'static str {
    let lower = text.to_lowercase();

    if let Some(section) = OUTLINE_SECTIONS
        .iter()
        .find(|s| lower.contains(&s.to_lowercase()))
    {
        return *section;
    }

    SECTION_KEYWORDS
        .iter()
        .find(|(_, keys)| keys.iter().any(|k| lower.contains(k)))
        .map_or(OTHER, |(section, _)| *section)
}

pub struct Sectioner {
    classifiers: Vec<Box<dyn SectionClassifier>>,
}

impl Sectioner {
    /// Sectioner with no external classifiers.
    #[must_use]
    pub fn heuristic() -> Self {
        Self {
            classifiers: Vec::new(),
        }
    }

    /// External classifiers are tried in the given order.
    #[must_use]
    pub fn with_classifiers(classifiers: Vec<Box<dyn SectionClassifier>>) -> Self {
        Self { classifiers }
    }

    /// Classifiers configured through the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_classifiers(external::classifiers_from_env())
    }

    /// Detect the section of one text.
    pub fn detect(&self, text: &str, allow_external: bool) -> String {
        if allow_external {
            for classifier in &self.classifiers {
                if let Some(label) = classifier.attempt(text) {
                    debug!("{} labelled item as {label}", classifier.name());
                    return label;
                }
            }
        }
        heuristic_section(text).to_string()
    }

    /// Copy of `items` with a section on each. Existing sections are kept.
    pub fn annotate(&self, items: &[RequirementItem], allow_external: bool) -> Vec<RequirementItem> {
        items
            .iter()
            .map(|item| match &item.section {
                Some(section) if !section.is_empty() => item.clone(),
                _ => item.with_section(self.detect(&item.text, allow_external)),
            })
            .collect()
    }
}

/// Count items per section. All outline labels and `OTHER` are present.
pub fn summarize(items: &[RequirementItem]) -> SectionSummary {
    let mut summary: SectionSummary = OUTLINE_SECTIONS
        .iter()
        .chain(std::iter::once(&OTHER))
        .map(|s| ((*s).to_string(), 0))
        .collect();

    for item in items {
        let section = item.section.as_deref().filter(|s| !s.is_empty()).unwrap_or(OTHER);
        *summary.entry(section.to_string()).or_insert(0) += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    struct Fixed(Option<&'static str>);

    impl SectionClassifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn attempt(&self, _text: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.len(), 20);
        assert!(summary.values().all(|v| *v == 0));
        assert_eq!(summary.get_index(0).map(|(k, _)| k.as_str()), Some("INTRODUCTION"));
        assert_eq!(summary.get_index(19).map(|(k, _)| k.as_str()), Some(OTHER));
    }

    #[test]
    fn test_full_name_beats_keyword() {
        // "cost" is a COST MANAGEMENT PLAN keyword, but the full name wins
        assert_eq!(heuristic_section("Track the cost baseline monthly"), "COST BASELINE");
        assert_eq!(
            heuristic_section("Follow the Risk Register template"),
            "RISK REGISTER"
        );
    }

    #[test]
    fn test_keyword_table_order() {
        assert_eq!(heuristic_section("Vendor contracts must be signed"), "PROCUREMENT MANAGEMENT PLAN");
        assert_eq!(heuristic_section("Budget must not exceed 1M"), "COST MANAGEMENT PLAN");
        // "availability" appears only under RESOURCE CALENDAR
        assert_eq!(heuristic_section("High availability required"), "RESOURCE CALENDAR");
        assert_eq!(heuristic_section("Users can log in"), OTHER);
    }

    #[test]
    fn test_canonical_section() {
        assert_eq!(canonical_section(" risk register "), Some("RISK REGISTER"));
        assert_eq!(canonical_section("Budget"), None);
    }

    #[test]
    fn test_external_label_used_when_allowed() {
        let sectioner = Sectioner::with_classifiers(vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some("MILESTONE LIST"))),
        ]);
        assert_eq!(sectioner.detect("Budget review", true), "MILESTONE LIST");
        assert_eq!(sectioner.detect("Budget review", false), "COST MANAGEMENT PLAN");
    }

    #[test]
    fn test_falls_through_to_heuristic() {
        let sectioner = Sectioner::with_classifiers(vec![Box::new(Fixed(None))]);
        assert_eq!(sectioner.detect("Project governance", true), "PROJECT MANAGEMENT APPROACH");
    }

    #[test]
    fn test_annotate_and_summarize() {
        let mut items = classify(&["Budget must be tracked weekly", "Users must log in", "Define the WBS"]);
        items[1].section = Some("INTRODUCTION".into());
        let annotated = Sectioner::heuristic().annotate(&items, true);

        assert_eq!(annotated[0].section.as_deref(), Some("COST MANAGEMENT PLAN"));
        assert_eq!(annotated[1].section.as_deref(), Some("INTRODUCTION"));
        assert_eq!(
            annotated[2].section.as_deref(),
            Some("SCHEDULE BASELINE AND WORK BREAKDOWN STRUCTURE")
        );

        let summary = summarize(&annotated);
        assert_eq!(summary["COST MANAGEMENT PLAN"], 1);
        assert_eq!(summary["INTRODUCTION"], 1);
        assert_eq!(summary[OTHER], 0);
        assert_eq!(summary.values().sum::<usize>(), 3);
    }
}
