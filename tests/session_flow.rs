//! End-to-end tests driving a search session from a real child process.
//!
//! A shell `printf` stands in for the search tool so the tests exercise
//! the spawn/pump/decode/index path without requiring ag on the machine.

#![cfg(unix)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use agnav::decode::{Segment, SegmentKind};
use agnav::process::{pump, ProcessError};
use agnav::resolve::FsDocumentStore;
use agnav::session::SearchSession;

/// A session whose "search tool" is a shell one-liner.
fn fake_tool(script: &str) -> SearchSession {
    let child = Command::new("sh")
        .arg("-c")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn sh");
    SearchSession::with_child(child)
}

/// Isolated fixture directory for this test run.
fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("agnav_test_fixtures")
        .join(format!("{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("failed to create fixture dir");
    dir
}

#[test]
fn test_pump_decodes_and_indexes() {
    let mut session = fake_tool(
        "printf '\\033[1;32mfoo.txt\\033[0m:\\033[1;33m2\\033[0m:  \\033[30;43mhello\\033[mworld\\n'",
    );

    let mut seen: Vec<Segment> = Vec::new();
    pump(&mut session, |segments| {
        seen.extend_from_slice(segments);
        Ok(())
    })
    .expect("pump failed");

    let kinds: Vec<SegmentKind> = seen.iter().map(|s| s.kind).collect();
    assert!(kinds.contains(&SegmentKind::FileName));
    assert!(kinds.contains(&SegmentKind::LineNumber));
    assert!(kinds.contains(&SegmentKind::Match));

    let text: String = seen.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(text, "foo.txt:2:  helloworld\n");

    assert_eq!(session.total_matches(), 1);
    let marker = session.next_match(1).expect("no match marker");
    assert_eq!(marker.text, "hello");
    assert_eq!(marker.file.as_deref(), Some("foo.txt"));
    assert_eq!(marker.line.as_deref(), Some("2"));
    assert_eq!(marker.column, 2);
}

#[test]
fn test_jump_resolves_against_filesystem() {
    let dir = fixture_dir("jump");
    fs::write(dir.join("foo.txt"), "first line\n  hello world\n").unwrap();

    let mut session = fake_tool(
        "printf '\\033[1;32mfoo.txt\\033[0m:\\033[1;33m2\\033[0m:  \\033[30;43mhello\\033[m world\\n'",
    );
    pump(&mut session, |_| Ok(())).unwrap();

    session.next_match(1).unwrap();
    let store = FsDocumentStore::new(&dir);
    let loc = session.jump_current(&store).expect("resolve failed");
    assert_eq!(loc.path, PathBuf::from("foo.txt"));
    assert_eq!(loc.line, 2);
    assert_eq!(loc.column, 2);
    // "first line\n" is 11 bytes; line 2 starts there, match 2 bytes in.
    assert_eq!(loc.byte, 13);
}

#[test]
fn test_exit_one_means_no_matches() {
    let mut session = fake_tool("exit 1");
    pump(&mut session, |_| Ok(())).expect("exit 1 must not be a failure");
    assert_eq!(session.total_matches(), 0);
    assert!(session.index().next_match(0, 1).is_err());
}

#[test]
fn test_abnormal_exit_reports_stderr() {
    let mut session = fake_tool("echo boom >&2; exit 2");
    let err = pump(&mut session, |_| Ok(())).expect_err("exit 2 must fail");
    match err {
        ProcessError::Failed { stderr, .. } => assert!(stderr.contains("boom")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn test_large_stderr_does_not_stall_pump() {
    // Write far more than a pipe buffer to stderr before exiting; the
    // pump must keep both pipes moving and still report the failure.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut session = fake_tool("yes e | head -c 262144 >&2; exit 2");
        let _ = tx.send(pump(&mut session, |_| Ok(())));
    });
    let result = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("pump stalled against a full stderr pipe");
    match result {
        Err(ProcessError::Failed { stderr, .. }) => {
            assert!(stderr.starts_with("e"));
            assert!(stderr.len() > 64 * 1024);
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn test_abort_kills_process_and_seals_index() {
    // A tool that would run forever if not killed.
    let mut session = fake_tool(
        "printf '\\033[30;43mfirst\\033[0m\\n'; sleep 60",
    );
    // Read only what is immediately available, then abort.
    session.abort();
    assert!(session.is_aborted());
    assert!(session.feed(b"\x1b[30;43mlate\x1b[0m").is_empty());
    assert!(session.index().is_sealed());
    // Dropping the session must not hang on the sleeping child.
}

#[test]
fn test_grouped_output_associates_matches_with_heading() {
    let mut session = fake_tool(concat!(
        "printf '\\033[1;32msrc/a.rs\\033[0m\\n",
        "\\033[1;33m1\\033[0m:\\033[30;43mfoo\\033[0m bar\\n",
        "\\033[1;33m9\\033[0m:x \\033[30;43mfoo\\033[0m\\n",
        "--\\n'",
    ));
    pump(&mut session, |_| Ok(())).unwrap();

    assert_eq!(session.index().file_count(), 1);
    assert_eq!(session.index().match_count(), 2);
    let first = session.next_match(1).unwrap();
    assert_eq!(first.file.as_deref(), Some("src/a.rs"));
    assert_eq!(first.line.as_deref(), Some("1"));
    let second = session.next_match(1).unwrap();
    assert_eq!(second.file.as_deref(), Some("src/a.rs"));
    assert_eq!(second.line.as_deref(), Some("9"));
    assert_eq!(second.column, 2);
}
