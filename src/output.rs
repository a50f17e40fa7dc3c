//! Run artifacts: a requirements document, a tabular export and user stories.
//!
//! Each writer creates missing parent directories.
use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use docx_rs::{Docx, Paragraph, Run, Style, StyleType};
use tracing::info;

use crate::models::RequirementItem;

pub const DOCX_FILE: &str = "requirements.docx";
pub const TABLE_FILE: &str = "requirements.csv";
pub const STORIES_FILE: &str = "user_stories.txt";

const TITLE: &str = "Software Requirements Specification";
const TABLE_HEADER: [&str; 5] = ["text", "category", "moscow", "priority_score", "section"];

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// One paragraph per item: bold `[tag] `, the text, then ` (category)`.
pub fn write_docx(items: &[RequirementItem], path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let heading = Style::new("Heading1", StyleType::Paragraph)
        .name("Heading 1")
        .size(32)
        .bold();
    let mut docx = Docx::new().add_style(heading).add_paragraph(
        Paragraph::new()
            .style("Heading1")
            .add_run(Run::new().add_text(TITLE)),
    );

    for item in items {
        let tag = item.moscow.map(|m| m.as_str()).unwrap_or_default();
        docx = docx.add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(format!("[{tag}] ")).bold())
                .add_run(Run::new().add_text(&item.text))
                .add_run(Run::new().add_text(format!(" ({})", item.category))),
        );
    }

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    docx.build()
        .pack(file)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {} requirements to {}", items.len(), path.display());
    Ok(())
}

/// Every field of every item as CSV, absent fields left blank.
pub fn write_table(items: &[RequirementItem], path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(TABLE_HEADER)?;
    for item in items {
        let score = item.priority_score.map(|s| s.to_string()).unwrap_or_default();
        writer.write_record([
            item.text.as_str(),
            item.category.as_str(),
            item.moscow.map(|m| m.as_str()).unwrap_or_default(),
            score.as_str(),
            item.section.as_deref().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    info!("Wrote {} rows to {}", items.len(), path.display());
    Ok(())
}

#[must_use]
pub fn generate_user_stories(items: &[RequirementItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| format!("As a user, I want {} so that value is delivered.", item.text))
        .collect()
}

/// Stories joined by newlines, without a trailing newline.
pub fn write_user_stories(stories: &[String], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, stories.join("\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {} user stories to {}", stories.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Moscow};

    fn items() -> Vec<RequirementItem> {
        vec![
            RequirementItem::new("The system must encrypt data, at rest", Category::NonFunctional)
                .with_priority(Moscow::Must, 4)
                .with_section("RISK MANAGEMENT"),
            RequirementItem::new("Users could export reports", Category::Functional)
                .with_priority(Moscow::Could, 2),
        ]
    }

    #[test]
    fn test_user_story_format() {
        let stories = generate_user_stories(&items());
        assert_eq!(
            stories[1],
            "As a user, I want Users could export reports so that value is delivered."
        );
        assert!(generate_user_stories(&[]).is_empty());
    }

    #[test]
    fn test_write_user_stories_no_trailing_newline() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested/out").join(STORIES_FILE);
        let stories = generate_user_stories(&items());
        write_user_stories(&stories, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(!written.ends_with('\n'));
    }

    #[test]
    fn test_write_table() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(TABLE_FILE);
        write_table(&items(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap(), TABLE_HEADER.as_slice());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "The system must encrypt data, at rest");
        assert_eq!(&rows[0][1], "non-functional");
        assert_eq!(&rows[0][2], "must");
        assert_eq!(&rows[0][3], "4");
        assert_eq!(&rows[0][4], "RISK MANAGEMENT");
        assert_eq!(&rows[1][4], "");
    }

    #[test]
    fn test_write_docx_reads_back() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("out").join(DOCX_FILE);
        write_docx(&items(), &path).unwrap();

        let text = crate::loader::docx::extract_text(&path);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                TITLE,
                "[must] The system must encrypt data, at rest (non-functional)",
                "[could] Users could export reports (functional)",
            ]
        );
    }
}
