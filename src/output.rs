//! Terminal rendering of decoded search output.
//!
//! Decoded segments are re-colorized locally instead of echoing the
//! tool's escape codes, so rendering stays consistent regardless of what
//! the tool was forced to emit.

use std::io::{self, Write};
use std::path::PathBuf;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::decode::{Segment, SegmentKind};
use crate::resolve::Location;
use crate::session::SearchStats;

/// Stdout stream honoring the color switch.
pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print a batch of decoded segments with per-kind styling.
pub fn print_segments(stdout: &mut StandardStream, segments: &[Segment]) -> io::Result<()> {
    for seg in segments {
        match seg.kind {
            SegmentKind::Plain => {
                write!(stdout, "{}", seg.text)?;
            }
            SegmentKind::FileName => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
                write!(stdout, "{}", seg.text)?;
                stdout.reset()?;
            }
            SegmentKind::LineNumber => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                write!(stdout, "{}", seg.text)?;
                stdout.reset()?;
            }
            SegmentKind::Match => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
                write!(stdout, "{}", seg.text)?;
                stdout.reset()?;
            }
        }
    }
    stdout.flush()
}

/// End-of-search summary line.
pub fn print_summary(stdout: &mut StandardStream, stats: &SearchStats) -> io::Result<()> {
    writeln!(
        stdout,
        "{} matches in {} files",
        stats.matches, stats.files
    )
}

/// A resolved location as `path:line:column`.
pub fn print_location(stdout: &mut StandardStream, loc: &Location) -> io::Result<()> {
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
    write!(stdout, "{}", loc.path.display())?;
    stdout.reset()?;
    write!(stdout, ":")?;
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(stdout, "{}", loc.line)?;
    stdout.reset()?;
    writeln!(stdout, ":{}", loc.column)
}

/// Print one path per line (file-listing mode).
pub fn print_file_list(stdout: &mut StandardStream, files: &[PathBuf]) -> io::Result<()> {
    for file in files {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        writeln!(stdout, "{}", file.display())?;
        stdout.reset()?;
    }
    Ok(())
}
