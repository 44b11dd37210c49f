use std::cell::OnceCell;

use serde::Serialize;

use crate::resolve::Location;

/// What a marker points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerKind {
    /// A file-name run (a file header in grouped output, or the path
    /// prefix of a match line).
    File,
    /// A matched-text run.
    Match,
}

/// A position-tagged fact recorded while search output streams in.
///
/// `offset` is the marker's byte position in the decoded output stream
/// (escape sequences excluded); markers are appended strictly in
/// increasing offset order. A `Match` marker also records the nearest
/// preceding file name and line number seen in the stream, which is how
/// it is later mapped back to a source location: the tool's output format
/// carries no explicit linkage, only ordering.
#[derive(Debug, Serialize)]
pub struct Marker {
    pub offset: usize,
    pub kind: MarkerKind,
    pub text: String,
    /// Nearest preceding file-name run, if any.
    pub file: Option<String>,
    /// Nearest preceding line-number run, still as text.
    pub line: Option<String>,
    /// Byte offset of the matched text from the start of its source
    /// line's text (0 for `File` markers).
    pub column: usize,
    #[serde(skip)]
    resolved: OnceCell<Location>,
}

impl Marker {
    pub(crate) fn new(
        offset: usize,
        kind: MarkerKind,
        text: String,
        file: Option<String>,
        line: Option<String>,
        column: usize,
    ) -> Self {
        Self {
            offset,
            kind,
            text,
            file,
            line,
            column,
            resolved: OnceCell::new(),
        }
    }

    /// The cached resolution, if one has been computed this session.
    pub fn resolved(&self) -> Option<&Location> {
        self.resolved.get()
    }

    /// Cache a resolution. The first value sticks for the marker's
    /// lifetime; later calls return the original.
    pub fn cache_resolved(&self, location: Location) -> &Location {
        self.resolved.get_or_init(|| location)
    }
}
