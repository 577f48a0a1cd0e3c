//! Function-set configuration
//!
//! The working directory may carry `analyze_func_list.txt`, one function
//! name per line. A line whose first byte is `0` names an exit function
//! (the marker is stripped); every other non-empty line names an
//! interesting function. A missing or unreadable file is tolerated: both
//! sets stay empty, and an empty interesting set means "any callee with a
//! recognized return type".

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Name of the configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "analyze_func_list.txt";
/// Longest accepted line, in bytes. Longer lines are dropped.
pub const MAX_LINE_LEN: usize = 2048;

const EXIT_FUNC_MARKER: char = '0';

/// The configured interesting and exit function sets.
#[derive(Debug, Clone, Default)]
pub struct FunctionSets {
    interesting: HashSet<String>,
    exit: HashSet<String>,
}

impl FunctionSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from configuration text.
    pub fn parse(text: &str) -> Self {
        let mut sets = FunctionSets::new();
        for line in text.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            if line.len() > MAX_LINE_LEN {
                warn!(len = line.len(), "dropping over-long config line");
                continue;
            }
            if let Some(rest) = line.strip_prefix(EXIT_FUNC_MARKER) {
                if !rest.is_empty() {
                    sets.exit.insert(rest.to_string());
                }
            } else {
                sets.interesting.insert(line.to_string());
            }
        }
        sets
    }

    /// Load from `path`.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Ok(Self::parse(&text))
    }

    /// Add an interesting function (builder, mainly for embedding hosts).
    pub fn with_interesting(mut self, name: impl Into<String>) -> Self {
        self.interesting.insert(name.into());
        self
    }

    /// Add an exit function.
    pub fn with_exit(mut self, name: impl Into<String>) -> Self {
        self.exit.insert(name.into());
        self
    }

    /// Whether every tracked-type callee counts as interesting.
    pub fn track_all(&self) -> bool {
        self.interesting.is_empty()
    }

    pub fn is_interesting(&self, name: &str) -> bool {
        self.track_all() || self.interesting.contains(name)
    }

    pub fn is_exit(&self, name: &str) -> bool {
        self.exit.contains(name)
    }

    pub fn interesting_count(&self) -> usize {
        self.interesting.len()
    }

    pub fn exit_count(&self) -> usize {
        self.exit.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_parse_markers_and_blanks() {
        let sets = FunctionSets::parse("malloc\n\n0exit\nopen\n0abort\n");
        assert!(sets.is_interesting("malloc"));
        assert!(sets.is_interesting("open"));
        assert!(!sets.is_interesting("exit"));
        assert!(sets.is_exit("exit"));
        assert!(sets.is_exit("abort"));
        assert_eq!(sets.interesting_count(), 2);
        assert_eq!(sets.exit_count(), 2);
    }

    #[test]
    fn test_bare_marker_line_is_dropped() {
        let sets = FunctionSets::parse("0\nread\n");
        assert_eq!(sets.exit_count(), 0);
        assert!(sets.is_interesting("read"));
    }

    #[test]
    fn test_empty_set_tracks_all() {
        let sets = FunctionSets::parse("");
        assert!(sets.track_all());
        assert!(sets.is_interesting("anything"));
        assert!(!sets.is_exit("anything"));

        let sets = FunctionSets::parse("read\n");
        assert!(!sets.track_all());
        assert!(!sets.is_interesting("write"));
    }

    #[test]
    fn test_overlong_line_is_dropped() {
        let long = "f".repeat(MAX_LINE_LEN + 1);
        let sets = FunctionSets::parse(&format!("{long}\nok\n"));
        assert!(!sets.is_interesting(&long));
        assert!(sets.is_interesting("ok"));
    }

    #[test]
    fn test_crlf_lines() {
        let sets = FunctionSets::parse("read\r\n0exit\r\n");
        assert!(sets.is_interesting("read"));
        assert!(sets.is_exit("exit"));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(CONFIG_FILE);
        let err = FunctionSets::load(&missing).unwrap_err();
        assert!(err.contains("Failed to read"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "calloc").unwrap();
        writeln!(file, "0_exit").unwrap();
        drop(file);

        let sets = FunctionSets::load(&path).unwrap();
        assert!(sets.is_interesting("calloc"));
        assert!(sets.is_exit("_exit"));
    }
}
