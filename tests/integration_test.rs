/// End-to-end integration tests for the requirement pipeline.
///
/// Tests the complete flow:
///   Config → Loader → Chunker → Embedder → Retriever → Synthesizer
///   → Classifier → Validator → Prioritizer → Sectioner → Outputs
use std::fs;
use std::path::Path;
use std::sync::Arc;

use reqrag::config::Config;
use reqrag::embedder::cache::ModelCache;
use reqrag::models::{Category, Moscow, ValidationFlag};
use reqrag::pipeline::{IndexSummary, NO_TEXT_MESSAGE, Pipeline};
use reqrag::sectioner::{OTHER, OUTLINE_SECTIONS, Sectioner};
use reqrag::synthesizer::Synthesizer;
use tempfile::tempdir;

const CONFIG: &str = r#"
chunking:
  size: 0
  overlap: 0
embedding:
  model: hash
  batch_size: 4
  dimensions: 64
rag:
  k: 6
output:
  generate_docx: true
  generate_excel: true
  generate_user_stories: true
sectioning:
  allow_api: "0"
loader:
  extensions: [".txt", ".md"]
"#;

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    fs::write(&path, body).unwrap();
    path
}

fn pipeline(dir: &Path, body: &str) -> Pipeline {
    Pipeline::from_path(write_config(dir, body))
        .unwrap()
        .with_cache(Arc::new(ModelCache::new()))
        .with_synthesizer(Synthesizer::offline())
        .with_sectioner(Sectioner::heuristic())
}

/// Full run: docs → report → artifacts on disk
#[test]
fn test_full_run() {
    let temp_dir = tempdir().unwrap();
    let docs_dir = temp_dir.path().join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(
        docs_dir.join("login.txt"),
        "The system should optimize login flow quickly\nReset\nAudit logs must be retained for a year\n",
    )
    .unwrap();

    let out_dir = temp_dir.path().join("out");
    let report = pipeline(temp_dir.path(), CONFIG)
        .run(&docs_dir, &out_dir, "login requirements")
        .unwrap();

    assert!(report.message.is_none(), "unexpected early exit: {:?}", report.message);
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.num_chunks, 1);
    assert!(report.timings.is_some());

    // Candidates are the modal lines; "Reset" has no modal keyword
    assert_eq!(report.num_candidates, 2);

    // Prioritized: must before should
    let texts: Vec<&str> = report.prioritized.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Audit logs must be retained for a year",
            "The system should optimize login flow quickly"
        ]
    );

    let login = &report.prioritized[1];
    assert_eq!(login.moscow, Some(Moscow::Should));
    assert_eq!(login.priority_score, Some(3));
    assert_eq!(login.category, Category::Functional);
    assert!(login.section.is_some());

    // Ambiguity flag for the login line at its classified index
    assert!(report.validation.flags.iter().any(|f| matches!(
        f,
        ValidationFlag::Ambiguity { index: 0, text } if text.contains("quickly")
    )));

    // Summary covers every outline section plus OTHER
    let summary = report.sections_summary.as_ref().unwrap();
    assert_eq!(summary.len(), OUTLINE_SECTIONS.len() + 1);
    assert!(summary.contains_key(OTHER));
    assert_eq!(summary.values().sum::<usize>(), report.prioritized.len());

    // Artifacts
    assert!(out_dir.join("requirements.docx").exists());
    assert!(out_dir.join("requirements.csv").exists());
    let stories = fs::read_to_string(out_dir.join("user_stories.txt")).unwrap();
    assert_eq!(report.user_stories.join("\n"), stories);
    assert!(stories.starts_with("As a user, I want Audit logs must be retained"));
}

/// Under-specified lines land in `missing`
#[test]
fn test_short_requirement_is_missing() {
    let temp_dir = tempdir().unwrap();
    let docs_dir = temp_dir.path().join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    // No modal keyword anywhere, so every line is a candidate
    fs::write(docs_dir.join("notes.txt"), "Reset\nExport monthly usage reports for every tenant\n").unwrap();

    let report = pipeline(temp_dir.path(), CONFIG)
        .run(&docs_dir, temp_dir.path().join("out"), "q")
        .unwrap();

    assert_eq!(report.num_candidates, 2);
    assert_eq!(report.validation.missing, vec![0]);
    assert!(report.prioritized.iter().all(|r| r.moscow == Some(Moscow::Wont)));
}

/// Empty input directory → structured no-data result
#[test]
fn test_empty_directory() {
    let temp_dir = tempdir().unwrap();
    let docs_dir = temp_dir.path().join("docs");
    fs::create_dir_all(&docs_dir).unwrap();

    let report = pipeline(temp_dir.path(), CONFIG)
        .run(&docs_dir, temp_dir.path().join("out"), "q")
        .unwrap();

    assert!(report.files.is_empty());
    assert_eq!(report.num_chunks, 0);
    assert_eq!(report.message.as_deref(), Some(NO_TEXT_MESSAGE));
    assert!(report.prioritized.is_empty());
}

/// Disabled outputs are not written
#[test]
fn test_outputs_disabled() {
    let temp_dir = tempdir().unwrap();
    let docs_dir = temp_dir.path().join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(docs_dir.join("a.md"), "# Scope\n\nThe portal shall support single sign-on.\n").unwrap();

    let body = CONFIG
        .replace("generate_docx: true", "generate_docx: false")
        .replace("generate_excel: true", "generate_excel: false")
        .replace("generate_user_stories: true", "generate_user_stories: false");
    let out_dir = temp_dir.path().join("out");
    let report = pipeline(temp_dir.path(), &body)
        .run(&docs_dir, &out_dir, "q")
        .unwrap();

    assert_eq!(report.prioritized.len(), 1);
    assert_eq!(report.prioritized[0].moscow, Some(Moscow::Must));
    assert!(report.user_stories.is_empty());
    assert!(!out_dir.join("requirements.docx").exists());
    assert!(!out_dir.join("requirements.csv").exists());
    assert!(!out_dir.join("user_stories.txt").exists());
}

/// Chunking with overlap feeds more windows into the index
#[test]
fn test_build_index() {
    let temp_dir = tempdir().unwrap();
    let docs_dir = temp_dir.path().join("docs");
    fs::create_dir_all(docs_dir.join("sub")).unwrap();
    fs::write(docs_dir.join("a.txt"), "abcdefghij").unwrap();
    fs::write(docs_dir.join("sub/b.txt"), "klmnop").unwrap();
    fs::write(docs_dir.join("ignored.csv"), "x,y").unwrap();

    let body = CONFIG.replace("size: 0\n  overlap: 0", "size: 4\n  overlap: 1");
    let summary = pipeline(temp_dir.path(), &body).build_index(&docs_dir).unwrap();

    // "abcdefghij" → 3 windows, "klmnop" → 2 windows
    assert_eq!(
        summary,
        IndexSummary {
            files: 2,
            chunks: 5,
            dimensions: 64
        }
    );
}

/// Missing required config keys fail loudly
#[test]
fn test_config_missing_key() {
    let temp_dir = tempdir().unwrap();
    let path = write_config(
        temp_dir.path(),
        "chunking:\n  size: 10\n  overlap: 0\nembedding:\n  model: hash\n",
    );
    assert!(Config::load(&path).is_err());
    assert!(Pipeline::from_path(&path).is_err());
}
