// ── Settings persistence ──────────────────────────────────────────────────────
//
// Reads and writes `<config dir>/Scriptpad/settings.json`
// (`%APPDATA%\Scriptpad\settings.json` on Windows).
// No `unsafe` — pure safe Rust + serde_json.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    languages::{ScriptLanguage, DEFAULT_KOTLIN_COMMAND, DEFAULT_SWIFT_COMMAND},
};

// ── Format version ────────────────────────────────────────────────────────────

const SETTINGS_VERSION: u32 = 1;

/// Keyword repaint delay after the last keystroke.
pub(crate) const DEFAULT_HIGHLIGHT_DELAY_MS: u32 = 300;

/// How long the red underline stays on a line after jumping to an error.
pub(crate) const DEFAULT_ERROR_FLASH_MS: u32 = 4_000;

/// Environment variable overriding `kotlin_command`.
const ENV_KOTLINC: &str = "SCRIPTPAD_KOTLINC";
/// Environment variable overriding `swift_command`.
const ENV_SWIFT: &str = "SCRIPTPAD_SWIFT";

// ── On-disk type ──────────────────────────────────────────────────────────────

/// Root of the JSON settings file.
///
/// Every field falls back to its default when absent so that files written
/// by older builds keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) version: u32,
    /// Language selected when the window was last closed.
    pub(crate) language: ScriptLanguage,
    pub(crate) dark_mode: bool,
    /// Font face for both the editor and the output pane.
    pub(crate) font: String,
    /// Font size in points.
    pub(crate) font_size: u32,
    /// Program used to run Kotlin scripts (`<cmd> -script <file>`).
    pub(crate) kotlin_command: String,
    /// Program used to run Swift scripts (`<cmd> <file>`).
    pub(crate) swift_command: String,
    pub(crate) highlight_delay_ms: u32,
    pub(crate) error_flash_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            language: ScriptLanguage::Kotlin,
            dark_mode: false,
            font: "JetBrains Mono".to_owned(),
            font_size: 10,
            kotlin_command: DEFAULT_KOTLIN_COMMAND.to_owned(),
            swift_command: DEFAULT_SWIFT_COMMAND.to_owned(),
            highlight_delay_ms: DEFAULT_HIGHLIGHT_DELAY_MS,
            error_flash_ms: DEFAULT_ERROR_FLASH_MS,
        }
    }
}

impl Settings {
    /// Apply `SCRIPTPAD_KOTLINC` / `SCRIPTPAD_SWIFT` on top of the file values.
    fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(
            std::env::var(ENV_KOTLINC).ok(),
            std::env::var(ENV_SWIFT).ok(),
        );
        self
    }

    fn apply_overrides(&mut self, kotlin: Option<String>, swift: Option<String>) {
        if let Some(cmd) = kotlin.filter(|c| !c.trim().is_empty()) {
            self.kotlin_command = cmd;
        }
        if let Some(cmd) = swift.filter(|c| !c.trim().is_empty()) {
            self.swift_command = cmd;
        }
    }
}

// ── Path ──────────────────────────────────────────────────────────────────────

/// Return the path to the settings file.
///
/// Returns `None` if the platform has no per-user configuration directory.
pub(crate) fn settings_path() -> Option<PathBuf> {
    let mut p = dirs::config_dir()?;
    p.push("Scriptpad");
    p.push("settings.json");
    Some(p)
}

// ── Load ──────────────────────────────────────────────────────────────────────

/// Read the user's settings, falling back to defaults.
///
/// A missing file, a JSON parse failure, or an unrecognised version number
/// all yield `Settings::default()`; the app continues normally.
pub(crate) fn load() -> Settings {
    let settings = match settings_path() {
        Some(path) => load_from(&path).unwrap_or_else(|| {
            tracing::debug!(path = %path.display(), "using default settings");
            Settings::default()
        }),
        None => Settings::default(),
    };
    settings.with_env_overrides()
}

/// Parse the settings file at `path`.
pub(crate) fn load_from(path: &Path) -> Option<Settings> {
    let data = fs::read(path).ok()?;
    let settings: Settings = match serde_json::from_slice(&data) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
            return None;
        }
    };
    if settings.version != SETTINGS_VERSION {
        tracing::warn!(version = settings.version, "ignoring settings file with unknown version");
        return None;
    }
    Some(settings)
}

// ── Save ──────────────────────────────────────────────────────────────────────

/// Write the settings to the per-user configuration directory.
///
/// The caller (`window.rs`) logs and otherwise ignores any returned error.
pub(crate) fn save(settings: &Settings) -> Result<()> {
    let path = settings_path().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no configuration directory")
    })?;
    save_to(&path, settings)
}

/// Write `settings` to `path`, creating parent directories as needed.
pub(crate) fn save_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, settings)?;
    tracing::debug!(path = %path.display(), "settings saved");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            language: ScriptLanguage::Swift,
            dark_mode: true,
            font_size: 13,
            ..Settings::default()
        };
        save_to(&path, &settings).expect("save");
        let loaded = load_from(&path).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let json = r#"{"version":1,"language":"swift"}"#;
        let s: Settings = serde_json::from_str(json).expect("deserialize partial");
        assert_eq!(s.language, ScriptLanguage::Swift);
        assert!(!s.dark_mode);
        assert_eq!(s.highlight_delay_ms, DEFAULT_HIGHLIGHT_DELAY_MS);
        assert_eq!(s.error_flash_ms, DEFAULT_ERROR_FLASH_MS);
        assert_eq!(s.kotlin_command, DEFAULT_KOTLIN_COMMAND);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"version":99}"#).expect("write");
        assert!(load_from(&path).is_none());
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(load_from(&path).is_none());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_from(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn overrides_replace_commands() {
        let mut s = Settings::default();
        s.apply_overrides(Some("/opt/kotlin/bin/kotlinc".to_owned()), None);
        assert_eq!(s.kotlin_command, "/opt/kotlin/bin/kotlinc");
        assert_eq!(s.swift_command, DEFAULT_SWIFT_COMMAND);
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let mut s = Settings::default();
        s.apply_overrides(Some("  ".to_owned()), Some(String::new()));
        assert_eq!(s, Settings::default());
    }
}
