//! Chunking invariance: splitting an input stream at an arbitrary byte
//! boundary must decode to the same segment sequence as feeding it whole
//! (after merging adjacent same-kind segments).

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use agnav::decode::{Segment, SgrDecoder};

#[derive(Debug, Arbitrary)]
struct Input {
    split: usize,
    data: Vec<u8>,
}

fn merged(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for s in segments {
        match out.last_mut() {
            Some(last) if last.kind == s.kind => last.text.push_str(&s.text),
            _ => out.push(s),
        }
    }
    out
}

fuzz_target!(|input: Input| {
    let Input { split, data } = input;
    let split = if data.is_empty() { 0 } else { split % data.len() };

    let mut whole = SgrDecoder::new();
    let mut expect = whole.decode(&data);
    expect.extend(whole.finish());

    let mut pieces = SgrDecoder::new();
    let mut got = pieces.decode(&data[..split]);
    got.extend(pieces.decode(&data[split..]));
    got.extend(pieces.finish());

    assert_eq!(merged(got), merged(expect));
});
