//! # agnav - navigable search-tool output
//!
//! agnav runs a line-oriented search tool (ag by default) with forced
//! color arguments, incrementally decodes the SGR escape sequences in
//! its output to recover which runs are file names, line numbers and
//! matches, and builds an ordered index of markers that supports
//! forward/backward navigation and jumping to exact source locations.
//!
//! ## Architecture
//!
//! - [`decode`] - Incremental SGR lexer (bytes in, classified segments out)
//! - [`index`] - Append-only marker index with positional navigation
//! - [`resolve`] - Marker-to-location resolution against open documents
//! - [`session`] - One running search: decoder + index + cursor + process
//! - [`process`] - Spawning the tool, pumping output, mode mapping
//! - [`output`] - Re-rendering decoded segments to the terminal
//!
//! ## Quick Start
//!
//! ```ignore
//! use agnav::process::{pump, SearchCommand};
//! use agnav::resolve::FsDocumentStore;
//!
//! let mut session = SearchCommand::new("needle", ".").spawn().unwrap();
//! pump(&mut session, |_segments| Ok(())).unwrap();
//!
//! let marker = session.next_match(1).unwrap();
//! println!("{} matches, first in {:?}", session.total_matches(), marker.file);
//!
//! let store = FsDocumentStore::new(".");
//! let loc = session.jump_current(&store).unwrap();
//! println!("{}:{}:{}", loc.path.display(), loc.line, loc.column);
//! ```
//!
//! The decoder never trusts chunk boundaries: escape sequences, colorized
//! runs and multi-byte characters may all be split across reads, and the
//! explicit parse state carries them over. Feeding the same bytes in any
//! chunking yields the same segments.

pub mod decode;
pub mod index;
pub mod output;
pub mod process;
pub mod resolve;
pub mod session;
