//! Preferences file parser.
//!
//! The file is line oriented:
//!
//! | Line | Action |
//! |------|--------|
//! | `key=value` | set a preference |
//! | `# ...` | comment, ignored |
//! | blank | ignored |
//!
//! Unknown keys and malformed lines are reported as [`ConfigError`]s but do
//! not stop the rest of the file from loading.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::warn;

/// File name looked up in the per-user config directory.
pub const PREFERENCES_FILE: &str = "preferences.ini";

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a preferences file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Runtime preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    pub debug_mode: bool,
    /// Fold constant calls at compile time.
    pub optimize: bool,
    /// Whether the console sender may call restricted functions.
    pub console_privileged: bool,
    /// Name reported by `player()` for the console.
    pub sender_name: String,
    /// Print preference warnings to stderr.
    pub show_warnings: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            debug_mode: false,
            optimize: true,
            console_privileged: true,
            sender_name: "~console".to_owned(),
            show_warnings: true,
        }
    }
}

impl Preferences {
    /// Parse a preferences string.  Returns the preferences (defaults for
    /// anything not set) and any errors on individual lines.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut prefs = Preferences::default();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let result = match line.split_once('=') {
                Some((key, value)) => prefs.set(key.trim(), value.trim()),
                None => Err(format!("expected key=value, found \"{line}\"")),
            };
            if let Err(message) = result {
                warn!(line = i + 1, "ignoring preference: {message}");
                errors.push(ConfigError { line: i + 1, message });
            }
        }

        (prefs, errors)
    }

    /// Read and parse a preferences file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Load `explicit` if given, else the default file if it exists, else
    /// the defaults.  A missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> std::io::Result<(Self, Vec<ConfigError>)> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }
        match default_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => Ok((Self::default(), Vec::new())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "debug-mode" => self.debug_mode = parse_bool(key, value)?,
            "optimize" => self.optimize = parse_bool(key, value)?,
            "console-privileged" => self.console_privileged = parse_bool(key, value)?,
            "show-warnings" => self.show_warnings = parse_bool(key, value)?,
            "sender-name" => {
                if value.is_empty() {
                    return Err("sender-name must not be empty".to_owned());
                }
                self.sender_name = value.to_owned();
            }
            _ => return Err(format!("unknown preference \"{key}\"")),
        }
        Ok(())
    }
}

/// `preferences.ini` in the per-user config directory.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "laytonsmith", "mscript").map(|d| d.config_dir().join(PREFERENCES_FILE))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("{key} expects true or false, found \"{value}\"")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
