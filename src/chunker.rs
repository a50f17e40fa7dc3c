use crate::models::{Chunk, Document};

/// Splits text into windows of `size` chars, each starting `overlap` chars
/// before the previous window's end.
///
/// `size == 0` returns the whole text as a single window. An `overlap` of
/// `size` or more is clamped to `size - 1` so window starts always advance.
pub fn split_into_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if size == 0 {
        return vec![text.to_string()];
    }

    let overlap = overlap.min(size - 1);
    let chars: Vec<char> = text.chars().collect();
    let length = chars.len();

    let mut windows = Vec::new();
    let mut start = 0;
    while start < length {
        let end = (start + size).min(length);
        windows.push(chars[start..end].iter().collect());
        if end == length {
            break;
        }
        start = end - overlap;
    }

    windows
}

/// Chunks a document, tagging each window with its source and ordinal.
pub fn chunk_document(doc: &Document, size: usize, overlap: usize) -> Vec<Chunk> {
    split_into_windows(&doc.text, size, overlap)
        .into_iter()
        .enumerate()
        .map(|(offset, text)| Chunk {
            source: doc.source.clone(),
            text,
            offset,
        })
        .collect()
}
