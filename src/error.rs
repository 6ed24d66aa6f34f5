// ── Central error type ────────────────────────────────────────────────────────
//
// All fallible operations in Scriptpad return `error::Result<T>`.  No panics
// in production paths; errors surface as user-facing dialogs in the editor
// window (see `platform::win32::window::show_error_dialog`) and as a message
// on stderr in headless mode.

use std::path::PathBuf;

use thiserror::Error;

/// Every error that Scriptpad can produce.
#[derive(Debug, Error)]
pub enum AppError {
    /// A Win32 API call returned a failure code.
    #[error("{function} failed (error {code:#010x})")]
    Win32 {
        /// The name of the failing function, for display purposes.
        function: &'static str,
        /// The raw Win32 error code (`GetLastError()` value) or HRESULT.
        code: u32,
    },

    /// A standard I/O error (file open, read, write, …).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external compiler or interpreter could not be started.
    #[error("cannot start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// `Run` was requested while a script is still executing.
    #[error("Process already running!!!")]
    AlreadyRunning,

    /// The script language could not be determined.
    #[error("cannot tell the script language of {}; pass --lang kotlin|swift", .0.display())]
    UnknownLanguage(PathBuf),

    /// The settings file could not be encoded or decoded.
    #[error("settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// The editor window only exists on Windows.
    #[error("the editor window is only available on Windows; use `scriptpad run <FILE>`")]
    NoWindow,
}

// Convert a windows-crate error (HRESULT) directly into an AppError so that
// `?` can be used on `windows::core::Result<T>` throughout the platform module.
#[cfg(windows)]
impl From<windows::core::Error> for AppError {
    fn from(e: windows::core::Error) -> Self {
        // HRESULT.0 is i32; reinterpret bits as u32 for display purposes.
        // Win32 errors appear as 0x8007xxxx HRESULTs.
        Self::Win32 {
            function: "windows",
            code: e.code().0 as u32,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win32_error_shows_hex_code() {
        let e = AppError::Win32 { function: "CreateWindowExW", code: 0x57 };
        assert_eq!(e.to_string(), "CreateWindowExW failed (error 0x00000057)");
    }

    #[test]
    fn spawn_error_names_program() {
        let e = AppError::Spawn {
            program: "kotlinc".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(e.to_string(), "cannot start `kotlinc`: not found");
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn already_running_matches_dialog_text() {
        assert_eq!(AppError::AlreadyRunning.to_string(), "Process already running!!!");
    }
}
