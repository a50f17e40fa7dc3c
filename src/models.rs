//! Records flowing between pipeline stages.
//!
//! A [`RequirementItem`] grows field by field: the classifier sets `text` and
//! `category`, the prioritizer adds `moscow` and `priority_score`, and the
//! sectioner adds `section`. Every stage returns a fresh sequence.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized text of one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source: String,
    pub text: String,
}

/// A window of a document's text. `offset` is the emission ordinal within its
/// source, not a character offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    pub text: String,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Functional,
    NonFunctional,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Functional => "functional",
            Self::NonFunctional => "non-functional",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MoSCoW priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Moscow {
    Must,
    Should,
    Could,
    Wont,
}

impl Moscow {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Must => "must",
            Self::Should => "should",
            Self::Could => "could",
            Self::Wont => "wont",
        }
    }

    /// Fixed score weight of the tier.
    #[must_use]
    pub fn weight(self) -> u8 {
        match self {
            Self::Must => 4,
            Self::Should => 3,
            Self::Could => 2,
            Self::Wont => 1,
        }
    }
}

impl fmt::Display for Moscow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requirement statement. Identity is its position in the current sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementItem {
    pub text: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moscow: Option<Moscow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl RequirementItem {
    #[must_use]
    pub fn new(text: impl Into<String>, category: Category) -> Self {
        Self {
            text: text.into(),
            category,
            moscow: None,
            priority_score: None,
            section: None,
        }
    }

    /// Copy of this item carrying a priority.
    #[must_use]
    pub fn with_priority(&self, moscow: Moscow, score: u8) -> Self {
        Self {
            moscow: Some(moscow),
            priority_score: Some(score),
            ..self.clone()
        }
    }

    /// Copy of this item carrying an outline section.
    #[must_use]
    pub fn with_section(&self, section: impl Into<String>) -> Self {
        Self {
            section: Some(section.into()),
            ..self.clone()
        }
    }
}

/// A single validator finding. Indices refer to the sequence as validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValidationFlag {
    Ambiguity { index: usize, text: String },
    Conflict { pair: (usize, usize) },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub flags: Vec<ValidationFlag>,
    pub missing: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_matches_names() {
        assert!(Category::Functional < Category::NonFunctional);
        assert!(Category::Functional.as_str() < Category::NonFunctional.as_str());
    }

    #[test]
    fn test_item_serializes_only_present_fields() {
        let item = RequirementItem::new("The system must log in", Category::Functional);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["category"], "functional");
        assert!(json.get("moscow").is_none());

        let ranked = item.with_priority(Moscow::Must, 4).with_section("OTHER");
        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json["moscow"], "must");
        assert_eq!(json["priority_score"], 4);
        assert_eq!(json["section"], "OTHER");
        assert_eq!(ranked.text, item.text);
    }

    #[test]
    fn test_flag_wire_shape() {
        let flag = ValidationFlag::Conflict { pair: (0, 1) };
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json, serde_json::json!({"type": "conflict", "pair": [0, 1]}));

        let flag = ValidationFlag::Ambiguity {
            index: 2,
            text: "fast".into(),
        };
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["type"], "ambiguity");
        assert_eq!(json["index"], 2);
    }
}
