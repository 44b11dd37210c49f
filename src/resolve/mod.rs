//! Resolving a match marker to a concrete source location.
//!
//! A match marker carries a file path, a line-number string and an
//! intra-line byte offset recovered from the search tool's output. The
//! [`LocationResolver`] turns that into a [`Location`] against the actual
//! document: [`LocationResolver::resolve`] only consults documents that
//! are already open, [`LocationResolver::resolve_or_fail`] opens the
//! document from disk when needed and reports [`ResolveError::DocumentNotFound`]
//! if it is missing. A successful resolution is cached on the marker, so
//! repeated navigation to the same match never recounts lines.
//!
//! Documents are shared, reference-counted collaborators: the resolver
//! borrows handles for the duration of a call and never closes them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use memchr::memchr_iter;
use serde::Serialize;
use thiserror::Error;

use crate::index::Marker;

/// A resolved (document, line, column) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Path identifying the document, as reported by the search tool.
    pub path: PathBuf,
    /// 1-indexed line number.
    pub line: u32,
    /// Byte offset of the match from the start of the line's text.
    pub column: usize,
    /// Absolute byte offset of the match within the document.
    pub byte: usize,
}

/// Per-jump resolution failures. The session stays usable afterwards.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("document not found: {0}")]
    DocumentNotFound(PathBuf),
    #[error("marker carries no file association")]
    MissingFile,
    #[error("line number {0:?} is not a positive integer")]
    BadLineNumber(String),
    #[error("{path} has no line {line}")]
    LineOutOfRange { path: PathBuf, line: u32 },
}

/// In-memory representation of one source document.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Shared handle to an open document.
pub type DocumentHandle = Rc<Document>;

/// Access to the consumer's open-document table (editor buffers, or a
/// plain file cache for CLI use).
pub trait DocumentStore {
    /// The document for `path` if it is already open. Never opens.
    fn get(&self, path: &Path) -> Option<DocumentHandle>;

    /// The document for `path`, opening it if necessary.
    fn open(&self, path: &Path) -> Result<DocumentHandle, ResolveError>;
}

/// Filesystem-backed [`DocumentStore`] with a path-keyed cache. Relative
/// paths (as search tools print them) resolve against `root`.
#[derive(Debug)]
pub struct FsDocumentStore {
    root: PathBuf,
    cache: RefCell<HashMap<PathBuf, DocumentHandle>>,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl DocumentStore for FsDocumentStore {
    fn get(&self, path: &Path) -> Option<DocumentHandle> {
        self.cache.borrow().get(path).cloned()
    }

    fn open(&self, path: &Path) -> Result<DocumentHandle, ResolveError> {
        if let Some(doc) = self.get(path) {
            return Ok(doc);
        }
        let text = std::fs::read_to_string(self.full_path(path))
            .map_err(|_| ResolveError::DocumentNotFound(path.to_path_buf()))?;
        let doc = Rc::new(Document::new(path, text));
        self.cache
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&doc));
        Ok(doc)
    }
}

/// Turns markers into locations against a document store.
pub struct LocationResolver<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> LocationResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve against an already-open document. Returns `None` when the
    /// document is not open or the marker cannot be interpreted.
    pub fn resolve(&self, marker: &Marker) -> Option<Location> {
        if let Some(loc) = marker.resolved() {
            return Some(loc.clone());
        }
        let path = Path::new(marker.file.as_deref()?);
        let doc = self.store.get(path)?;
        let loc = locate(&doc, marker).ok()?;
        Some(marker.cache_resolved(loc).clone())
    }

    /// Resolve, opening the document from disk if it is not yet open.
    pub fn resolve_or_fail(&self, marker: &Marker) -> Result<Location, ResolveError> {
        if let Some(loc) = marker.resolved() {
            return Ok(loc.clone());
        }
        let file = marker.file.as_deref().ok_or(ResolveError::MissingFile)?;
        let path = Path::new(file);
        let doc = match self.store.get(path) {
            Some(doc) => doc,
            None => self.store.open(path)?,
        };
        let loc = locate(&doc, marker)?;
        Ok(marker.cache_resolved(loc).clone())
    }
}

/// Compute the location of `marker` inside `doc`: count newline
/// boundaries to the start of the 1-indexed line, then advance by the
/// marker's intra-line byte offset.
fn locate(doc: &Document, marker: &Marker) -> Result<Location, ResolveError> {
    let line_text = marker.line.as_deref().unwrap_or("");
    let line: u32 = line_text
        .trim()
        .parse()
        .map_err(|_| ResolveError::BadLineNumber(line_text.to_string()))?;
    if line == 0 {
        return Err(ResolveError::BadLineNumber(line_text.to_string()));
    }
    let start = line_start(doc.text(), line).ok_or_else(|| ResolveError::LineOutOfRange {
        path: doc.path().to_path_buf(),
        line,
    })?;
    Ok(Location {
        path: doc.path().to_path_buf(),
        line,
        column: marker.column,
        byte: start + marker.column,
    })
}

/// Byte offset where the 1-indexed `line` begins, or `None` past EOF.
fn line_start(text: &str, line: u32) -> Option<usize> {
    if line == 1 {
        return if text.is_empty() { None } else { Some(0) };
    }
    let mut current = 1;
    for pos in memchr_iter(b'\n', text.as_bytes()) {
        current += 1;
        if current == line {
            // A newline at the very end starts no further line.
            return if pos + 1 < text.len() {
                Some(pos + 1)
            } else {
                None
            };
        }
    }
    None
}
