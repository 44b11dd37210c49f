use serde::{Deserialize, Serialize};

/// Classification of a decoded run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Text outside any colorized run (separators, context, newlines).
    Plain,
    /// A run colorized with the file-name SGR code.
    FileName,
    /// A run colorized with the line-number SGR code.
    LineNumber,
    /// A run colorized with the match SGR code.
    Match,
}

/// A classified run of decoded text.
///
/// Segments are emitted in stream order and never overlap: concatenating
/// the `text` of every segment reproduces the input with all ANSI escape
/// sequences removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
}

impl Segment {
    pub fn new(kind: SegmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Plain, text)
    }
}

/// The SGR code currently holding a colorized run open.
///
/// The code table is fixed by the search tool's forced color arguments
/// (see [`crate::process::color_args`]); it is not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CodeTag {
    FileName,
    LineNumber,
    Match,
}

impl CodeTag {
    /// Map SGR parameter bytes to a known start code.
    pub(crate) fn from_params(params: &[u8]) -> Option<Self> {
        match params {
            b"1;32" => Some(CodeTag::FileName),
            b"1;33" => Some(CodeTag::LineNumber),
            b"30;43" => Some(CodeTag::Match),
            _ => None,
        }
    }

    pub(crate) fn kind(self) -> SegmentKind {
        match self {
            CodeTag::FileName => SegmentKind::FileName,
            CodeTag::LineNumber => SegmentKind::LineNumber,
            CodeTag::Match => SegmentKind::Match,
        }
    }
}
