//! Ordered, append-only registry of search-result markers.
//!
//! As decoded segments arrive, [`ResultIndex::append`] records a marker
//! for every file-name and match run, associating each match with the
//! nearest preceding file name and line number in the stream. Navigation
//! walks the marker sequence by kind with a positive repeat count.
//!
//! Positions are byte offsets into the decoded output stream. Stepping
//! forward from a position that sits exactly on a marker moves past it
//! (one extra step), with one deliberate exception: the very start of the
//! index (position 0) still reaches a marker at offset 0 on the first
//! step, so `next_match(0, 1)` always lands on the first match.

mod marker;

pub use marker::{Marker, MarkerKind};

use memchr::{memchr, memrchr};
use thiserror::Error;

use crate::decode::{Segment, SegmentKind};

/// Which end of the index a navigation call ran off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    First,
    Last,
}

/// Recoverable navigation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("no more markers toward the {0:?} boundary")]
    Exhausted(Boundary),
    #[error("repeat count must be a positive integer")]
    InvalidCount,
}

/// Tracks where the current output line's source text begins, so match
/// markers can record an intra-line column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineAnchor {
    /// No line number seen since the last newline.
    None,
    /// A line-number run just ended; its `:` separator is still ahead.
    AwaitingSeparator,
    /// Line body started at this decoded-stream offset.
    Body(usize),
}

/// Append-only index of file and match markers for one search session.
#[derive(Debug)]
pub struct ResultIndex {
    markers: Vec<Marker>,
    last_file: Option<String>,
    last_line: Option<String>,
    anchor: LineAnchor,
    sealed: bool,
}

impl Default for ResultIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultIndex {
    pub fn new() -> Self {
        Self {
            markers: Vec::new(),
            last_file: None,
            last_line: None,
            anchor: LineAnchor::None,
            sealed: false,
        }
    }

    /// Record markers for a batch of segments starting at decoded-stream
    /// offset `at_offset`. Returns the offset after the batch.
    ///
    /// On a sealed index this is a no-op and returns `at_offset`.
    pub fn append(&mut self, segments: &[Segment], at_offset: usize) -> usize {
        if self.sealed {
            return at_offset;
        }
        let mut offset = at_offset;
        for seg in segments {
            match seg.kind {
                SegmentKind::FileName => {
                    self.last_file = Some(seg.text.clone());
                    self.markers.push(Marker::new(
                        offset,
                        MarkerKind::File,
                        seg.text.clone(),
                        Some(seg.text.clone()),
                        None,
                        0,
                    ));
                }
                SegmentKind::LineNumber => {
                    self.last_line = Some(seg.text.clone());
                    self.anchor = LineAnchor::AwaitingSeparator;
                }
                SegmentKind::Match => {
                    let column = match self.anchor {
                        LineAnchor::Body(start) => offset.saturating_sub(start),
                        _ => 0,
                    };
                    self.markers.push(Marker::new(
                        offset,
                        MarkerKind::Match,
                        seg.text.clone(),
                        self.last_file.clone(),
                        self.last_line.clone(),
                        column,
                    ));
                }
                SegmentKind::Plain => {
                    let bytes = seg.text.as_bytes();
                    if self.anchor == LineAnchor::AwaitingSeparator {
                        // The line body starts after the `:` that follows
                        // the line number; without one, after this text.
                        let start = match memchr(b':', bytes) {
                            Some(i) => offset + i + 1,
                            None => offset + bytes.len(),
                        };
                        self.anchor = LineAnchor::Body(start);
                    }
                    if let LineAnchor::Body(start) = self.anchor {
                        if let Some(i) = memrchr(b'\n', bytes) {
                            if offset + i >= start {
                                self.anchor = LineAnchor::None;
                            }
                        }
                    }
                }
            }
            offset += seg.text.len();
        }
        offset
    }

    /// Stop accepting markers; navigation stays available.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn match_count(&self) -> usize {
        self.count_of(MarkerKind::Match)
    }

    pub fn file_count(&self) -> usize {
        self.count_of(MarkerKind::File)
    }

    fn count_of(&self, kind: MarkerKind) -> usize {
        self.markers.iter().filter(|m| m.kind == kind).count()
    }

    pub fn next_match(&self, pos: usize, count: usize) -> Result<&Marker, NavError> {
        self.forward(MarkerKind::Match, pos, count)
    }

    pub fn previous_match(&self, pos: usize, count: usize) -> Result<&Marker, NavError> {
        self.backward(MarkerKind::Match, pos, count)
    }

    pub fn next_file(&self, pos: usize, count: usize) -> Result<&Marker, NavError> {
        self.forward(MarkerKind::File, pos, count)
    }

    pub fn previous_file(&self, pos: usize, count: usize) -> Result<&Marker, NavError> {
        self.backward(MarkerKind::File, pos, count)
    }

    fn forward(&self, kind: MarkerKind, pos: usize, count: usize) -> Result<&Marker, NavError> {
        if count == 0 {
            return Err(NavError::InvalidCount);
        }
        self.markers
            .iter()
            .filter(|m| m.kind == kind)
            // From the very start, a marker at offset 0 still counts.
            .filter(|m| m.offset > pos || (pos == 0 && m.offset == 0))
            .nth(count - 1)
            .ok_or(NavError::Exhausted(Boundary::Last))
    }

    fn backward(&self, kind: MarkerKind, pos: usize, count: usize) -> Result<&Marker, NavError> {
        if count == 0 {
            return Err(NavError::InvalidCount);
        }
        self.markers
            .iter()
            .rev()
            .filter(|m| m.kind == kind && m.offset < pos)
            .nth(count - 1)
            .ok_or(NavError::Exhausted(Boundary::First))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Segments for `foo.txt:12:  hello world` plus a second match line.
    fn sample_segments() -> Vec<Segment> {
        vec![
            Segment::new(SegmentKind::FileName, "foo.txt"),
            Segment::plain(":"),
            Segment::new(SegmentKind::LineNumber, "12"),
            Segment::plain(":  "),
            Segment::new(SegmentKind::Match, "hello"),
            Segment::plain(" world\n"),
            Segment::new(SegmentKind::FileName, "bar.txt"),
            Segment::plain(":"),
            Segment::new(SegmentKind::LineNumber, "3"),
            Segment::plain(":"),
            Segment::new(SegmentKind::Match, "hi"),
            Segment::plain("\n"),
        ]
    }

    fn sample_index() -> ResultIndex {
        let mut index = ResultIndex::new();
        index.append(&sample_segments(), 0);
        index
    }

    #[test]
    fn test_append_returns_advanced_offset() {
        let mut index = ResultIndex::new();
        let segs = sample_segments();
        let total: usize = segs.iter().map(|s| s.text.len()).sum();
        assert_eq!(index.append(&segs, 0), total);
    }

    #[test]
    fn test_marker_association() {
        let index = sample_index();
        assert_eq!(index.match_count(), 2);
        assert_eq!(index.file_count(), 2);

        let first = index.next_match(0, 1).unwrap();
        assert_eq!(first.text, "hello");
        assert_eq!(first.file.as_deref(), Some("foo.txt"));
        assert_eq!(first.line.as_deref(), Some("12"));

        let second = index.next_match(first.offset, 1).unwrap();
        assert_eq!(second.text, "hi");
        assert_eq!(second.file.as_deref(), Some("bar.txt"));
        assert_eq!(second.line.as_deref(), Some("3"));
    }

    #[test]
    fn test_match_column_is_intra_line() {
        let index = sample_index();
        // Line body is "  hello world"; "hello" starts at byte 2.
        let first = index.next_match(0, 1).unwrap();
        assert_eq!(first.column, 2);
        // Second line body is "hi" with no leading text.
        let second = index.next_match(first.offset, 1).unwrap();
        assert_eq!(second.column, 0);
    }

    #[test]
    fn test_two_matches_on_one_line() {
        let mut index = ResultIndex::new();
        index.append(
            &[
                Segment::new(SegmentKind::FileName, "a.rs"),
                Segment::plain(":"),
                Segment::new(SegmentKind::LineNumber, "1"),
                Segment::plain(":"),
                Segment::new(SegmentKind::Match, "ab"),
                Segment::plain("--"),
                Segment::new(SegmentKind::Match, "cd"),
                Segment::plain("\n"),
            ],
            0,
        );
        let first = index.next_match(0, 1).unwrap();
        let second = index.next_match(0, 2).unwrap();
        assert_eq!(first.column, 0);
        // "ab--" precedes the second match on the same line.
        assert_eq!(second.column, 4);
        assert_eq!(second.line.as_deref(), Some("1"));
    }

    #[test]
    fn test_first_step_from_start_lands_on_first_marker() {
        let mut index = ResultIndex::new();
        // A match marker sitting exactly at offset 0.
        index.append(&[Segment::new(SegmentKind::Match, "m")], 0);
        assert_eq!(index.next_match(0, 1).unwrap().offset, 0);
    }

    #[test]
    fn test_step_from_marker_moves_past_it() {
        let index = sample_index();
        let first = index.next_match(0, 1).unwrap();
        let second = index.next_match(first.offset, 1).unwrap();
        assert_ne!(first.offset, second.offset);
        assert_eq!(second.text, "hi");
    }

    #[test]
    fn test_repeat_counts() {
        let index = sample_index();
        assert_eq!(index.next_match(0, 2).unwrap().text, "hi");
        assert_eq!(index.next_file(0, 2).unwrap().text, "bar.txt");
        let last = index.next_match(0, 2).unwrap();
        assert_eq!(index.previous_match(last.offset, 1).unwrap().text, "hello");
    }

    #[test]
    fn test_navigation_exhausted() {
        let index = sample_index();
        assert_eq!(
            index.next_match(0, 3).unwrap_err(),
            NavError::Exhausted(Boundary::Last)
        );
        assert_eq!(
            index.previous_match(0, 1).unwrap_err(),
            NavError::Exhausted(Boundary::First)
        );
        assert_eq!(
            index.next_file(usize::MAX, 1).unwrap_err(),
            NavError::Exhausted(Boundary::Last)
        );
    }

    #[test]
    fn test_zero_count_rejected() {
        let index = sample_index();
        assert_eq!(index.next_match(0, 0).unwrap_err(), NavError::InvalidCount);
        assert_eq!(
            index.previous_file(10, 0).unwrap_err(),
            NavError::InvalidCount
        );
    }

    #[test]
    fn test_sealed_index_ignores_appends() {
        let mut index = sample_index();
        index.seal();
        let before = index.match_count();
        let offset = index.append(&[Segment::new(SegmentKind::Match, "late")], 999);
        assert_eq!(offset, 999);
        assert_eq!(index.match_count(), before);
        // Still readable.
        assert!(index.next_match(0, 1).is_ok());
    }

    #[test]
    fn test_match_without_preceding_file() {
        let mut index = ResultIndex::new();
        index.append(&[Segment::new(SegmentKind::Match, "orphan")], 0);
        let m = index.next_match(0, 1).unwrap();
        assert!(m.file.is_none());
        assert!(m.line.is_none());
        assert_eq!(m.column, 0);
    }
}
