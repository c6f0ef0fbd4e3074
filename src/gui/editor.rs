//! Paged long-text editor: snapshot a document into fixed-width pages and
//! rejoin submitted pages into document text.

use serde::Serialize;

use crate::storage::DocumentKey;

/// Default page width, matching the host's book widget.
pub const DEFAULT_PAGE_CHARS: usize = 240;

/// Split `text` into pages of at most `width` characters (not bytes).
/// Empty text yields one empty page.
pub fn split_pages(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}

/// Rejoin pages with newline separators, trim trailing whitespace and end
/// with exactly one newline.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let joined = pages.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n");
    let mut out = joined.trim_end().to_string();
    out.push('\n');
    out
}

/// Snapshot handed to the host when the editor opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorView {
    pub title: String,
    pub document: DocumentKey,
    pub pages: Vec<String>,
}

impl EditorView {
    pub fn new(title: impl Into<String>, document: DocumentKey, text: &str, width: usize) -> Self {
        Self {
            title: title.into(),
            document,
            pages: split_pages(text, width),
        }
    }
}
