use std::path::Path;

use serde::Deserialize;

/// Default C/C++ source extensions recognized by the scanner (`spec.md` §4.A).
const DEFAULT_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hpp"];

/// Default exclusion substrings applied against each entry's path (`spec.md` §4.A).
const DEFAULT_EXCLUDES: &[&str] = &["/build", "/.git", "/tools/"];

/// Configuration loaded from `architector.toml` at the base directory.
///
/// Absent or malformed config files fall back to defaults — matching the
/// teacher's `CodeGraphConfig::load` behavior for `code-graph.toml`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ArchConfig {
    /// Lowercase extensions (no leading dot) eligible for scanning.
    pub extensions: Vec<String>,
    /// Substrings that exclude an entry (and, for directories, its subtree) from the scan.
    pub excludes: Vec<String>,
}

impl Default for ArchConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ArchConfig {
    /// Load `architector.toml` from `base_dir`, or fall back to defaults.
    pub fn load(base_dir: &Path) -> Self {
        let config_path = base_dir.join("architector.toml");

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("failed to parse architector.toml: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!("failed to read architector.toml: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    pub fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn is_excluded(&self, path_str: &str) -> bool {
        self.excludes.iter().any(|pat| path_str.contains(pat.as_str()))
    }
}
