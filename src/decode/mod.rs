//! Incremental SGR stream decoder.
//!
//! Search tools invoked with forced color arguments encode structure in
//! their output through SGR escape sequences: file names, line numbers and
//! matched text each get a distinct code. This module reconstructs that
//! structure from arbitrarily-chunked bytes.
//!
//! The decoder is a pure incremental lexer: feed it chunks with
//! [`SgrDecoder::decode`] as they arrive, then call [`SgrDecoder::finish`]
//! when the stream ends. All cross-chunk context lives in an explicit
//! [`ParseState`]; independent decoders never share state.

mod segment;

pub use segment::{Segment, SegmentKind};

use memchr::memchr;
use segment::CodeTag;

const ESC: u8 = 0x1b;

/// Longest byte span (ESC included) that may still turn into a recognized
/// escape sequence. Anything longer without a final byte is malformed.
const MAX_ESCAPE_LEN: usize = 10;

/// Decoder context carried between `decode` calls.
///
/// `pending` holds bytes that might be the prefix of an escape sequence
/// (or of a multi-byte character) split across chunks; it is always
/// shorter than [`MAX_ESCAPE_LEN`] + 1 bytes. `run` accumulates the text
/// of a colorized run that has been opened but not yet reset, and may
/// grow across many chunks.
#[derive(Debug, Default, Clone)]
pub struct ParseState {
    open: Option<CodeTag>,
    run: Vec<u8>,
    pending: Vec<u8>,
}

impl ParseState {
    /// True when no partial escape or open run is being carried.
    pub fn is_empty(&self) -> bool {
        self.open.is_none() && self.run.is_empty() && self.pending.is_empty()
    }
}

/// Incremental decoder for SGR-colorized search output.
#[derive(Debug, Default)]
pub struct SgrDecoder {
    state: ParseState,
}

/// Outcome of examining bytes starting at an ESC.
enum Escape {
    /// Complete CSI sequence: parameter bytes and final byte, total length.
    Csi {
        params_end: usize,
        final_byte: u8,
        len: usize,
    },
    /// ESC followed by a single Fe introducer we strip outright.
    Other { len: usize },
    /// Ran out of bytes; the sequence may complete in the next chunk.
    Incomplete,
    /// Cannot become a recognized sequence. `keep` bytes are replayed as
    /// plain text, `skip` bytes are discarded.
    Malformed { skip: usize, keep: usize },
}

/// Examine `rest` (which starts with ESC) and classify the escape.
fn scan_escape(rest: &[u8]) -> Escape {
    debug_assert_eq!(rest[0], ESC);
    if rest.len() < 2 {
        return Escape::Incomplete;
    }
    match rest[1] {
        b'[' => {
            let mut i = 2;
            while i < rest.len() {
                let b = rest[i];
                if b.is_ascii_digit() || b == b';' {
                    if i >= MAX_ESCAPE_LEN {
                        // Over-long parameter section: absorb as plain text.
                        return Escape::Malformed {
                            skip: 0,
                            keep: i + 1,
                        };
                    }
                    i += 1;
                } else if (0x40..=0x7e).contains(&b) {
                    return Escape::Csi {
                        params_end: i,
                        final_byte: b,
                        len: i + 1,
                    };
                } else {
                    // Invalid parameter byte: drop the escape intro, keep
                    // the bytes after it as plain text.
                    return Escape::Malformed { skip: 2, keep: 0 };
                }
            }
            Escape::Incomplete
        }
        // Other Fe escapes (ESC ], ESC ( , ...): two-byte strip.
        0x40..=0x5f | b'(' | b')' => Escape::Other { len: 2 },
        // Bare ESC in front of ordinary text: drop the ESC byte alone.
        _ => Escape::Malformed { skip: 1, keep: 0 },
    }
}

/// Number of trailing bytes that form the prefix of an unfinished UTF-8
/// character, or 0 if the buffer ends on a character boundary.
fn incomplete_utf8_suffix(buf: &[u8]) -> usize {
    let n = buf.len();
    for back in 1..=n.min(3) {
        let b = buf[n - back];
        if b < 0x80 {
            return 0;
        }
        if b < 0xc0 {
            continue; // continuation byte, keep looking for the lead
        }
        let need = if b >= 0xf0 {
            4
        } else if b >= 0xe0 {
            3
        } else {
            2
        };
        return if need > back { back } else { 0 };
    }
    0
}

impl SgrDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the cross-chunk parse context (diagnostics only).
    pub fn state(&self) -> &ParseState {
        &self.state
    }

    /// Decode one chunk of raw output, producing the segments that became
    /// unambiguous. Text inside a still-open colorized run is withheld
    /// until the closing reset arrives (or [`Self::finish`] is called).
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Segment> {
        let mut input = std::mem::take(&mut self.state.pending);
        input.extend_from_slice(chunk);

        let mut segments = Vec::new();
        let mut plain: Vec<u8> = Vec::new();
        let mut pos = 0;

        while pos < input.len() {
            let Some(off) = memchr(ESC, &input[pos..]) else {
                self.push_text(&input[pos..], &mut plain);
                break;
            };
            self.push_text(&input[pos..pos + off], &mut plain);
            pos += off;

            match scan_escape(&input[pos..]) {
                Escape::Incomplete => {
                    // Hold the partial escape for the next chunk.
                    self.state.pending = input[pos..].to_vec();
                    break;
                }
                Escape::Csi {
                    params_end,
                    final_byte,
                    len,
                } => {
                    if final_byte == b'm' {
                        let params = &input[pos + 2..pos + params_end];
                        self.apply_sgr(params, &mut plain, &mut segments);
                    }
                    // Non-SGR CSI sequences are stripped outright.
                    pos += len;
                }
                Escape::Other { len } => {
                    pos += len;
                }
                Escape::Malformed { skip, keep } => {
                    pos += skip;
                    self.push_text(&input[pos..pos + keep], &mut plain);
                    pos += keep;
                }
            }
        }

        // Text split mid-character rides over to the next chunk so lossy
        // conversion never mangles it. Only applies outside an open run;
        // run bytes are reunited before conversion anyway.
        if self.state.open.is_none() && self.state.pending.is_empty() {
            let hold = incomplete_utf8_suffix(&plain);
            if hold > 0 {
                self.state.pending = plain.split_off(plain.len() - hold);
            }
        }
        flush_plain(&mut plain, &mut segments);
        segments
    }

    /// Flush trailing state at end-of-stream.
    ///
    /// A run left open is classified and emitted anyway, best effort. A
    /// second `finish` (or one on a clean state) returns nothing.
    pub fn finish(&mut self) -> Vec<Segment> {
        let state = std::mem::take(&mut self.state);
        let mut segments = Vec::new();
        match state.open {
            Some(tag) => {
                let mut bytes = state.run;
                bytes.extend_from_slice(&state.pending);
                if !bytes.is_empty() {
                    segments.push(Segment::new(
                        tag.kind(),
                        String::from_utf8_lossy(&bytes).into_owned(),
                    ));
                }
            }
            None => {
                if !state.pending.is_empty() {
                    segments.push(Segment::plain(
                        String::from_utf8_lossy(&state.pending).into_owned(),
                    ));
                }
            }
        }
        segments
    }

    /// Route literal text either into the open run or the plain buffer.
    fn push_text(&mut self, text: &[u8], plain: &mut Vec<u8>) {
        if text.is_empty() {
            return;
        }
        if self.state.open.is_some() {
            self.state.run.extend_from_slice(text);
        } else {
            plain.extend_from_slice(text);
        }
    }

    /// Apply one SGR sequence's parameters at the current stream point.
    fn apply_sgr(&mut self, params: &[u8], plain: &mut Vec<u8>, segments: &mut Vec<Segment>) {
        let is_reset = params.is_empty() || params == b"0";
        match (self.state.open, is_reset) {
            (Some(tag), true) => {
                let run = std::mem::take(&mut self.state.run);
                if !run.is_empty() {
                    segments.push(Segment::new(
                        tag.kind(),
                        String::from_utf8_lossy(&run).into_owned(),
                    ));
                }
                self.state.open = None;
            }
            // Reset with nothing open is a no-op.
            (None, true) => {}
            (Some(_), false) => {
                // A second start code inside an open run never nests; the
                // escape is stripped and the run keeps accumulating.
            }
            (None, false) => {
                if let Some(tag) = CodeTag::from_params(params) {
                    flush_plain(plain, segments);
                    self.state.open = Some(tag);
                }
                // Unrecognized codes are dropped; their content stays
                // plain by omission.
            }
        }
    }
}

fn flush_plain(plain: &mut Vec<u8>, segments: &mut Vec<Segment>) {
    if !plain.is_empty() {
        let bytes = std::mem::take(plain);
        segments.push(Segment::plain(String::from_utf8_lossy(&bytes).into_owned()));
    }
}
