//! Boundary with the external search process.
//!
//! The decoder relies on the tool being launched with forced color
//! arguments matching the fixed SGR table (see [`color_args`]); this
//! module builds that invocation, spawns it, and pumps its stdout into a
//! [`SearchSession`] chunk by chunk. The tool's second output mode,
//! NUL-separated file listing, bypasses the decoder entirely and is a
//! split-on-NUL ([`list_files`]).
//!
//! Exit status 1 means "no matches" for ag and ripgrep alike and is not
//! a failure; anything past 1 surfaces as [`ProcessError::Failed`] with
//! the process's diagnostic output.

pub mod modes;

pub use modes::ModeMap;

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::decode::Segment;
use crate::session::SearchSession;

/// Read size for the output pump.
const CHUNK_SIZE: usize = 8 * 1024;

/// Color arguments forcing the fixed SGR classification table.
pub fn color_args() -> [&'static str; 7] {
    [
        "--color",
        "--color-path",
        "1;32",
        "--color-line-number",
        "1;33",
        "--color-match",
        "30;43",
    ]
}

/// Failures at the process boundary. Fatal to the session, never to the
/// host.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("search process failed ({status}): {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Builder for one search invocation.
#[derive(Debug, Clone)]
pub struct SearchCommand {
    tool: String,
    pattern: String,
    root: PathBuf,
    heading: bool,
    mode: Option<String>,
    modes: ModeMap,
    extra: Vec<String>,
}

impl SearchCommand {
    pub fn new(pattern: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            tool: "ag".to_string(),
            pattern: pattern.into(),
            root: root.into(),
            heading: false,
            mode: None,
            modes: ModeMap::builtin(),
            extra: Vec::new(),
        }
    }

    /// Tool binary to invoke (default `ag`).
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Group matches under file headings (`--group`).
    pub fn heading(mut self, heading: bool) -> Self {
        self.heading = heading;
        self
    }

    /// Mode identifier expanded through the mode map.
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Mode table to expand against (default built-in).
    pub fn mode_map(mut self, modes: ModeMap) -> Self {
        self.modes = modes;
        self
    }

    /// Extra arguments passed through verbatim, before the pattern.
    pub fn args(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        self.extra.extend(extra);
        self
    }

    /// The full argument vector, pattern and root last.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = color_args().iter().map(|s| s.to_string()).collect();
        args.push(if self.heading { "--group" } else { "--nogroup" }.to_string());
        if let Some(mode) = &self.mode {
            if let Some(opts) = self.modes.resolve(mode) {
                args.extend(opts.iter().cloned());
            }
        }
        args.extend(self.extra.iter().cloned());
        args.push("--".to_string());
        args.push(self.pattern.clone());
        args.push(self.root.to_string_lossy().into_owned());
        args
    }

    /// Launch the search and wrap it in a session that owns the child.
    pub fn spawn(&self) -> Result<SearchSession, ProcessError> {
        let child = Command::new(&self.tool)
            .args(self.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                tool: self.tool.clone(),
                source,
            })?;
        Ok(SearchSession::with_child(child))
    }
}

/// Drive the session's owned process to completion: read stdout in
/// chunks, feed each through the session, flush at end-of-stream, then
/// reap the child. `on_segments` sees every decoded batch as it lands.
///
/// A session without a child (or one already aborted) is a no-op.
pub fn pump(
    session: &mut SearchSession,
    mut on_segments: impl FnMut(&[Segment]) -> io::Result<()>,
) -> Result<(), ProcessError> {
    let Some(mut child) = session.take_child() else {
        return Ok(());
    };
    // Drain stderr on its own thread. Reading stdout to EOF first would
    // stall against a child blocked on a full stderr pipe.
    let stderr_reader = child.stderr.take().map(drain_stderr);
    let result = pump_child(&mut child, session, &mut on_segments);
    if result.is_err() {
        // Leave the child with the session so abort/drop can reap it;
        // the stderr thread ends when the child does.
        session.put_child(child);
        return result;
    }
    let stderr = match stderr_reader {
        Some(handle) => handle.join().unwrap_or_default(),
        None => String::new(),
    };
    reap(child, stderr)
}

fn drain_stderr(mut pipe: impl Read + Send + 'static) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut out = String::new();
        let _ = pipe.read_to_string(&mut out);
        out
    })
}

fn pump_child(
    child: &mut Child,
    session: &mut SearchSession,
    on_segments: &mut impl FnMut(&[Segment]) -> io::Result<()>,
) -> Result<(), ProcessError> {
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout not captured"))?;
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = stdout.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let segments = session.feed(&buf[..n]);
        on_segments(&segments)?;
    }
    let tail = session.finish();
    on_segments(&tail)?;
    Ok(())
}

/// Wait for the child, mapping abnormal exits to `Failed`.
fn reap(mut child: Child, stderr: String) -> Result<(), ProcessError> {
    let status = child.wait()?;
    match status.code() {
        // 1 is "no matches" for ag and ripgrep.
        Some(0) | Some(1) => Ok(()),
        _ => Err(ProcessError::Failed {
            status,
            stderr: stderr.trim().to_string(),
        }),
    }
}

/// Arguments for the tool's file-listing mode: names only,
/// NUL-separated, matched by file-name pattern.
fn list_args(pattern: &str, root: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-l"),
        OsString::from("-0"),
        OsString::from("-g"),
        OsString::from(pattern),
        root.as_os_str().to_os_string(),
    ]
}

/// Run the tool in file-listing mode: NUL-separated paths, no decoding.
pub fn list_files(tool: &str, pattern: &str, root: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    let output = Command::new(tool)
        .args(list_args(pattern, root))
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ProcessError::Spawn {
            tool: tool.to_string(),
            source,
        })?;
    match output.status.code() {
        Some(0) | Some(1) => Ok(parse_nul_list(&output.stdout)),
        _ => Err(ProcessError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
    }
}

/// Split NUL-separated output into paths, dropping empty entries.
pub fn parse_nul_list(bytes: &[u8]) -> Vec<PathBuf> {
    bytes
        .split(|&b| b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| PathBuf::from(String::from_utf8_lossy(part).into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_force_color_table() {
        let args = SearchCommand::new("needle", ".").to_args();
        for want in color_args() {
            assert!(args.contains(&want.to_string()), "missing {want}");
        }
        // Pattern comes after the option terminator.
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[sep + 1], "needle");
        assert_eq!(args[sep + 2], ".");
    }

    #[test]
    fn test_heading_flag() {
        let plain = SearchCommand::new("x", ".").to_args();
        assert!(plain.contains(&"--nogroup".to_string()));
        let grouped = SearchCommand::new("x", ".").heading(true).to_args();
        assert!(grouped.contains(&"--group".to_string()));
    }

    #[test]
    fn test_mode_expansion() {
        let args = SearchCommand::new("x", ".").mode("rust").to_args();
        assert!(args.contains(&"--rust".to_string()));
        // Unknown modes expand to nothing rather than failing.
        let args = SearchCommand::new("x", ".").mode("cobol").to_args();
        assert!(!args.iter().any(|a| a.contains("cobol")));
    }

    #[test]
    fn test_extra_args_precede_pattern() {
        let args = SearchCommand::new("x", ".")
            .args(["-i".to_string(), "-C".to_string(), "2".to_string()])
            .to_args();
        let i = args.iter().position(|a| a == "-i").unwrap();
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert!(i < sep);
    }

    #[test]
    fn test_list_args_select_listing_mode() {
        let args = list_args("ma.n", Path::new("src"));
        assert_eq!(args[0], "-l");
        assert_eq!(args[1], "-0");
        assert_eq!(args[2], "-g");
        assert_eq!(args[3], "ma.n");
        assert_eq!(args[4], "src");
    }

    #[test]
    fn test_parse_nul_list() {
        let out = b"src/main.rs\0src/lib.rs\0\0docs/readme.md\0";
        let files = parse_nul_list(out);
        assert_eq!(
            files,
            vec![
                PathBuf::from("src/main.rs"),
                PathBuf::from("src/lib.rs"),
                PathBuf::from("docs/readme.md"),
            ]
        );
        assert!(parse_nul_list(b"").is_empty());
    }

    #[test]
    fn test_spawn_failure_reports_tool() {
        let err = SearchCommand::new("x", ".")
            .tool("definitely-not-a-real-binary-4af1")
            .spawn()
            .unwrap_err();
        match err {
            ProcessError::Spawn { tool, .. } => {
                assert!(tool.contains("definitely-not-a-real-binary"));
            }
            other => panic!("expected Spawn error, got {other:?}"),
        }
    }
}
