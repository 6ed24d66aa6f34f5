// ── Script languages ──────────────────────────────────────────────────────────
//
// Maps file paths and names to `ScriptLanguage`, provides the keyword lists
// for the highlighter and the command line for the external tool.
// No Win32 imports; pure Rust.

use std::{ffi::OsString, path::Path};

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

// ── Language enum ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ScriptLanguage {
    #[default]
    Kotlin,
    Swift,
}

impl ScriptLanguage {
    /// Every language, in language-selector order.
    pub(crate) const ALL: [ScriptLanguage; 2] = [ScriptLanguage::Kotlin, ScriptLanguage::Swift];

    /// Human-readable name for the language selector and the status bar.
    pub(crate) fn display_name(self) -> &'static str {
        match self {
            ScriptLanguage::Kotlin => "Kotlin",
            ScriptLanguage::Swift => "Swift",
        }
    }

    /// Extension (without dot) of the temporary script handed to the tool.
    pub(crate) fn script_extension(self) -> &'static str {
        match self {
            ScriptLanguage::Kotlin => "kts",
            ScriptLanguage::Swift => "swift",
        }
    }

    /// Words painted by the keyword highlighter.
    pub(crate) fn keywords(self) -> &'static [&'static str] {
        match self {
            ScriptLanguage::Kotlin => KOTLIN_KEYWORDS,
            ScriptLanguage::Swift => SWIFT_KEYWORDS,
        }
    }

    /// Position in `ALL`; doubles as the combo-box item index.
    pub(crate) fn index(self) -> usize {
        match self {
            ScriptLanguage::Kotlin => 0,
            ScriptLanguage::Swift => 1,
        }
    }

    /// Inverse of `index`.
    pub(crate) fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parse a language name, ignoring ASCII case.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.display_name().eq_ignore_ascii_case(name))
    }

    /// Detect the language from a file extension.
    pub(crate) fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("kts") | Some("kt") => Some(ScriptLanguage::Kotlin),
            Some("swift") => Some(ScriptLanguage::Swift),
            _ => None,
        }
    }

    /// Program and arguments that execute `script`.
    ///
    /// Kotlin scripts go through `kotlinc -script <file>`; Swift files are
    /// handed straight to the `swift` driver, which interprets them.
    pub(crate) fn command(self, settings: &Settings, script: &Path) -> ToolCommand {
        match self {
            ScriptLanguage::Kotlin => ToolCommand {
                program: settings.kotlin_command.clone(),
                args: vec![OsString::from("-script"), script.as_os_str().to_owned()],
            },
            ScriptLanguage::Swift => ToolCommand {
                program: settings.swift_command.clone(),
                args: vec![script.as_os_str().to_owned()],
            },
        }
    }
}

impl std::fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A resolved tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ToolCommand {
    pub(crate) program: String,
    pub(crate) args: Vec<OsString>,
}

// ── Default tool names ────────────────────────────────────────────────────────

/// `kotlinc` ships as a batch file on Windows; `CreateProcess` needs the
/// extension spelled out.
pub(crate) const DEFAULT_KOTLIN_COMMAND: &str = if cfg!(windows) { "kotlinc.bat" } else { "kotlinc" };

pub(crate) const DEFAULT_SWIFT_COMMAND: &str = "swift";

// ── Keyword tables ────────────────────────────────────────────────────────────

static KOTLIN_KEYWORDS: &[&str] = &[
    "fun", "val", "var", "if", "else", "for", "while", "when", "class", "return",
];

static SWIFT_KEYWORDS: &[&str] = &[
    "func", "let", "var", "if", "else", "for", "while", "switch", "case", "class", "struct",
    "return",
];

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn detect_kotlin() {
        assert_eq!(ScriptLanguage::from_path(Path::new("hello.kts")), Some(ScriptLanguage::Kotlin));
        assert_eq!(ScriptLanguage::from_path(Path::new("Main.kt")), Some(ScriptLanguage::Kotlin));
    }

    #[test]
    fn detect_swift() {
        assert_eq!(ScriptLanguage::from_path(Path::new("main.swift")), Some(ScriptLanguage::Swift));
    }

    // Extension matching is case-insensitive.
    #[test]
    fn extension_case_insensitive() {
        assert_eq!(ScriptLanguage::from_path(Path::new("A.KTS")), Some(ScriptLanguage::Kotlin));
        assert_eq!(ScriptLanguage::from_path(Path::new("b.Swift")), Some(ScriptLanguage::Swift));
    }

    #[test]
    fn unknown_extension_is_none() {
        assert_eq!(ScriptLanguage::from_path(Path::new("notes.txt")), None);
        assert_eq!(ScriptLanguage::from_path(Path::new("no_ext")), None);
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(ScriptLanguage::from_name("kotlin"), Some(ScriptLanguage::Kotlin));
        assert_eq!(ScriptLanguage::from_name("SWIFT"), Some(ScriptLanguage::Swift));
        assert_eq!(ScriptLanguage::from_name("java"), None);
    }

    #[test]
    fn index_roundtrips_through_selector_order() {
        for lang in ScriptLanguage::ALL {
            assert_eq!(ScriptLanguage::from_index(lang.index()), Some(lang));
        }
        assert_eq!(ScriptLanguage::from_index(2), None);
    }

    #[test]
    fn kotlin_command_uses_script_flag() {
        let settings = Settings::default();
        let cmd = ScriptLanguage::Kotlin.command(&settings, Path::new("/tmp/script1.kts"));
        assert_eq!(cmd.program, DEFAULT_KOTLIN_COMMAND);
        assert_eq!(cmd.args, vec![OsString::from("-script"), OsString::from("/tmp/script1.kts")]);
    }

    #[test]
    fn swift_command_passes_file_only() {
        let settings = Settings::default();
        let cmd = ScriptLanguage::Swift.command(&settings, Path::new("/tmp/script1.swift"));
        assert_eq!(cmd.program, "swift");
        assert_eq!(cmd.args, vec![OsString::from("/tmp/script1.swift")]);
    }

    #[test]
    fn keyword_lists_match_languages() {
        assert!(ScriptLanguage::Kotlin.keywords().contains(&"fun"));
        assert!(!ScriptLanguage::Kotlin.keywords().contains(&"func"));
        assert!(ScriptLanguage::Swift.keywords().contains(&"struct"));
        assert_eq!(ScriptLanguage::Swift.script_extension(), "swift");
    }
}
