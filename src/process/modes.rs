//! Mode-to-option mapping for the search tool.
//!
//! A mode identifier (usually a file-type name) expands to extra tool
//! options at session start. The built-in table covers ag's common
//! file-type flags; a user config file overlays it entry by entry, so an
//! override replaces the whole option list for that mode.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Ordered mode table: identifier to option strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeMap {
    modes: BTreeMap<String, Vec<String>>,
}

impl ModeMap {
    /// The built-in table.
    pub fn builtin() -> Self {
        let mut modes = BTreeMap::new();
        let table: &[(&str, &[&str])] = &[
            ("all", &[]),
            ("c", &["--cc"]),
            ("cpp", &["--cpp"]),
            ("css", &["--css"]),
            ("elixir", &["--elixir"]),
            ("go", &["--go"]),
            ("haskell", &["--haskell"]),
            ("html", &["--html"]),
            ("java", &["--java"]),
            ("js", &["--js"]),
            ("markdown", &["--markdown"]),
            ("python", &["--python"]),
            ("ruby", &["--ruby"]),
            ("rust", &["--rust"]),
            ("shell", &["--shell"]),
            ("ts", &["--ts"]),
        ];
        for (mode, opts) in table {
            modes.insert(
                mode.to_string(),
                opts.iter().map(|s| s.to_string()).collect(),
            );
        }
        Self { modes }
    }

    /// Overlay `other` on top of this table, entry by entry.
    pub fn overlay(&mut self, other: ModeMap) {
        self.modes.extend(other.modes);
    }

    /// Option strings for a mode, if it is known.
    pub fn resolve(&self, mode: &str) -> Option<&[String]> {
        self.modes.get(mode).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.modes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Default location of the user override file.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("agnav").join("modes.json"))
    }

    /// Built-in table overlaid with the user config: the given file if
    /// any, otherwise the default location when it exists. Resolved once
    /// at session start.
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let mut map = Self::builtin();
        let path = match config {
            Some(p) => Some(p.to_path_buf()),
            None => Self::user_config_path().filter(|p| p.exists()),
        };
        if let Some(path) = path {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading mode config {}", path.display()))?;
            let user: ModeMap = serde_json::from_str(&raw)
                .with_context(|| format!("parsing mode config {}", path.display()))?;
            map.overlay(user);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let map = ModeMap::builtin();
        assert_eq!(map.resolve("rust").unwrap(), &["--rust".to_string()]);
        assert!(map.resolve("all").unwrap().is_empty());
        assert!(map.resolve("cobol").is_none());
    }

    #[test]
    fn test_overlay_replaces_whole_entry() {
        let mut map = ModeMap::builtin();
        let user: ModeMap =
            serde_json::from_str(r#"{"rust": ["-G", "\\.rs$"], "docs": ["--markdown"]}"#).unwrap();
        map.overlay(user);
        assert_eq!(
            map.resolve("rust").unwrap(),
            &["-G".to_string(), "\\.rs$".to_string()]
        );
        assert_eq!(map.resolve("docs").unwrap(), &["--markdown".to_string()]);
        // Untouched entries survive.
        assert_eq!(map.resolve("go").unwrap(), &["--go".to_string()]);
    }

    #[test]
    fn test_json_roundtrip() {
        let map = ModeMap::builtin();
        let json = serde_json::to_string(&map).unwrap();
        let back: ModeMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.resolve("python").unwrap(), &["--python".to_string()]);
    }
}
