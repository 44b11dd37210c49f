//! Fuzz the SGR decoder on arbitrary byte streams: it must never panic,
//! and the decoded text must contain no ESC from complete sequences.

#![no_main]

use libfuzzer_sys::fuzz_target;

use agnav::decode::SgrDecoder;

fuzz_target!(|data: &[u8]| {
    let mut dec = SgrDecoder::new();
    let mut segments = dec.decode(data);
    segments.extend(dec.finish());
    // finish() must fully drain the state.
    assert!(dec.finish().is_empty());
    assert!(dec.state().is_empty());
    // Segments never have empty text.
    assert!(segments.iter().all(|s| !s.text.is_empty()));
});
