//! One running search, end to end.
//!
//! A [`SearchSession`] owns the decoder state, the marker index, the
//! navigation cursor and (optionally) the search process itself. Chunks
//! of process output go through [`SearchSession::feed`]; when the stream
//! ends, [`SearchSession::finish`] flushes the decoder. Navigation moves
//! the cursor over the index, and [`SearchSession::jump_current`]
//! resolves the marker under the cursor to a source location.
//!
//! Everything here is synchronous, single-threaded work driven by
//! whatever delivers the chunks. Aborting kills the owned process
//! forcibly and seals the index; it stays readable but stops growing.
//! Dropping a session does the same cleanup.

use std::process::Child;

use thiserror::Error;

use crate::decode::{Segment, SegmentKind, SgrDecoder};
use crate::index::{Marker, NavError, ResultIndex};
use crate::process::ProcessError;
use crate::resolve::{DocumentStore, Location, LocationResolver, ResolveError};

/// Session-level failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Nav(#[from] NavError),
}

/// Counters reported at end of search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchStats {
    /// Match runs seen in the output stream.
    pub matches: usize,
    /// File-name runs seen in the output stream.
    pub files: usize,
    /// Decoded output bytes (escape sequences excluded).
    pub decoded_bytes: usize,
}

/// Decoder, index, cursor and process handle for one search.
#[derive(Debug)]
pub struct SearchSession {
    decoder: SgrDecoder,
    index: ResultIndex,
    offset: usize,
    cursor: usize,
    matches_seen: usize,
    aborted: bool,
    child: Option<Child>,
}

impl SearchSession {
    /// A session with no process attached (chunks fed by the caller).
    pub fn new() -> Self {
        Self {
            decoder: SgrDecoder::new(),
            index: ResultIndex::new(),
            offset: 0,
            cursor: 0,
            matches_seen: 0,
            aborted: false,
            child: None,
        }
    }

    /// A session owning a spawned search process.
    pub fn with_child(child: Child) -> Self {
        let mut session = Self::new();
        session.child = Some(child);
        session
    }

    /// Decode one chunk of process output and index the result. Returns
    /// the segments that became unambiguous, for rendering. Chunks
    /// arriving after an abort are ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Segment> {
        if self.aborted {
            return Vec::new();
        }
        let segments = self.decoder.decode(chunk);
        self.absorb(&segments);
        segments
    }

    /// Flush the decoder at end-of-stream and index any trailing run.
    pub fn finish(&mut self) -> Vec<Segment> {
        if self.aborted {
            return Vec::new();
        }
        let segments = self.decoder.finish();
        self.absorb(&segments);
        segments
    }

    fn absorb(&mut self, segments: &[Segment]) {
        self.matches_seen += segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Match)
            .count();
        self.offset = self.index.append(segments, self.offset);
    }

    pub fn index(&self) -> &ResultIndex {
        &self.index
    }

    pub fn stats(&self) -> SearchStats {
        SearchStats {
            matches: self.matches_seen,
            files: self.index.file_count(),
            decoded_bytes: self.offset,
        }
    }

    /// Total matches seen, for end-of-search reporting.
    pub fn total_matches(&self) -> usize {
        self.matches_seen
    }

    /// Current navigation position (a decoded-stream offset).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn next_match(&mut self, count: usize) -> Result<&Marker, NavError> {
        let marker = self.index.next_match(self.cursor, count)?;
        self.cursor = marker.offset;
        Ok(marker)
    }

    pub fn previous_match(&mut self, count: usize) -> Result<&Marker, NavError> {
        let marker = self.index.previous_match(self.cursor, count)?;
        self.cursor = marker.offset;
        Ok(marker)
    }

    pub fn next_file(&mut self, count: usize) -> Result<&Marker, NavError> {
        let marker = self.index.next_file(self.cursor, count)?;
        self.cursor = marker.offset;
        Ok(marker)
    }

    pub fn previous_file(&mut self, count: usize) -> Result<&Marker, NavError> {
        let marker = self.index.previous_file(self.cursor, count)?;
        self.cursor = marker.offset;
        Ok(marker)
    }

    /// Resolve a marker to a source location, opening the document from
    /// the store if needed.
    pub fn jump_to(
        &self,
        marker: &Marker,
        store: &dyn DocumentStore,
    ) -> Result<Location, SessionError> {
        Ok(LocationResolver::new(store).resolve_or_fail(marker)?)
    }

    /// Resolve the marker under the navigation cursor.
    pub fn jump_current(&self, store: &dyn DocumentStore) -> Result<Location, SessionError> {
        let marker = self
            .index
            .markers()
            .iter()
            .find(|m| m.offset == self.cursor)
            .ok_or(NavError::Exhausted(crate::index::Boundary::First))?;
        self.jump_to(marker, store)
    }

    /// Kill the owned process (if any) and seal the index. Further
    /// `feed` calls are ignored; navigation keeps working.
    pub fn abort(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.aborted = true;
        self.index.seal();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Hand out the owned child for pumping; the session keeps decoding
    /// and indexing, the pump owns the I/O.
    pub(crate) fn take_child(&mut self) -> Option<Child> {
        self.child.take()
    }

    pub(crate) fn put_child(&mut self, child: Child) {
        self.child = Some(child);
    }
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
