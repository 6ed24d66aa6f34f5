// ── Common dialogs ─────────────────────────────────────────────────────────────
//
// Thin wrappers around the Win32 common-dialog APIs.  Each function returns
// `Some(path)` on user confirmation and `None` on cancel or error.
//
// This is inside `platform::win32` so `unsafe` is permitted per crate policy.

#![allow(unsafe_code)]

use std::path::PathBuf;

use windows::{
    core::{PCWSTR, PWSTR},
    Win32::{
        Foundation::HWND,
        UI::Controls::Dialogs::{
            GetOpenFileNameW, GetSaveFileNameW, OFN_FILEMUSTEXIST, OFN_HIDEREADONLY,
            OFN_OVERWRITEPROMPT, OFN_PATHMUSTEXIST, OPENFILENAMEW,
        },
    },
};

use crate::languages::ScriptLanguage;

// ── Buffer size ───────────────────────────────────────────────────────────────

/// Maximum path length in `WCHAR`s, including the null terminator.
/// `MAX_PATH` (260) is too short for modern Windows paths; use 32 768 which
/// is the documented maximum for `\\?\` extended paths.
const PATH_BUF_LEN: usize = 32_768;

/// Null-separated `Display\0pattern` pairs ending with a double null.
const FILTER: &str = "Scripts (*.kts;*.kt;*.swift)\0*.kts;*.kt;*.swift\0\
                      Kotlin Script (*.kts)\0*.kts\0\
                      Swift (*.swift)\0*.swift\0\
                      All Files (*.*)\0*.*\0\0";

// ── Open dialog ───────────────────────────────────────────────────────────────

/// Show the standard "Open File" dialog.
///
/// Returns the chosen path, or `None` if the user cancelled.
pub(crate) fn show_open_dialog(hwnd_owner: HWND) -> Option<PathBuf> {
    let mut buf = vec![0u16; PATH_BUF_LEN];
    let filter: Vec<u16> = FILTER.encode_utf16().collect();

    let mut ofn = OPENFILENAMEW {
        lStructSize: std::mem::size_of::<OPENFILENAMEW>() as u32,
        hwndOwner: hwnd_owner,
        lpstrFilter: PCWSTR(filter.as_ptr()),
        lpstrFile: PWSTR(buf.as_mut_ptr()),
        nMaxFile: PATH_BUF_LEN as u32,
        Flags: OFN_FILEMUSTEXIST | OFN_PATHMUSTEXIST | OFN_HIDEREADONLY,
        ..Default::default()
    };

    // SAFETY: `ofn` is fully initialised; `buf` and `filter` outlive this
    // call.  GetOpenFileNameW reads and writes only within the buffers we
    // provided.  The function is called on the UI thread (required for modal
    // dialogs).
    let ok = unsafe { GetOpenFileNameW(&mut ofn) };

    ok.as_bool().then(|| path_from_buf(&buf))
}

// ── Save dialog ───────────────────────────────────────────────────────────────

/// Show the standard "Save As" dialog.
///
/// `default_name` pre-populates the filename field.  A name typed without an
/// extension gets the extension of `language`.  Returns the chosen path, or
/// `None` if cancelled.
pub(crate) fn show_save_dialog(
    hwnd_owner: HWND,
    default_name: &str,
    language: ScriptLanguage,
) -> Option<PathBuf> {
    let mut buf: Vec<u16> = default_name
        .encode_utf16()
        .chain(std::iter::repeat(0).take(PATH_BUF_LEN))
        .take(PATH_BUF_LEN)
        .collect();
    let filter: Vec<u16> = FILTER.encode_utf16().collect();
    let def_ext: Vec<u16> = language
        .script_extension()
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();
    // Preselect the filter entry of the current language (1-based).
    let filter_index = match language {
        ScriptLanguage::Kotlin => 2,
        ScriptLanguage::Swift => 3,
    };

    let mut ofn = OPENFILENAMEW {
        lStructSize: std::mem::size_of::<OPENFILENAMEW>() as u32,
        hwndOwner: hwnd_owner,
        lpstrFilter: PCWSTR(filter.as_ptr()),
        nFilterIndex: filter_index,
        lpstrFile: PWSTR(buf.as_mut_ptr()),
        nMaxFile: PATH_BUF_LEN as u32,
        lpstrDefExt: PCWSTR(def_ext.as_ptr()),
        Flags: OFN_OVERWRITEPROMPT | OFN_PATHMUSTEXIST,
        ..Default::default()
    };

    // SAFETY: same invariants as show_open_dialog above; def_ext also
    // outlives the call.
    let ok = unsafe { GetSaveFileNameW(&mut ofn) };

    ok.as_bool().then(|| path_from_buf(&buf))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Convert a null-terminated UTF-16 buffer to a `PathBuf`.
fn path_from_buf(buf: &[u16]) -> PathBuf {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    PathBuf::from(String::from_utf16_lossy(&buf[..len]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_stops_at_first_nul() {
        let buf: Vec<u16> = "C:\\s\\a.kts\0junk".encode_utf16().collect();
        assert_eq!(path_from_buf(&buf), PathBuf::from("C:\\s\\a.kts"));
    }

    #[test]
    fn filter_is_double_nul_terminated() {
        assert!(FILTER.ends_with("\0\0"));
        // Four display/pattern pairs.
        assert_eq!(FILTER.trim_end_matches('\0').split('\0').count(), 8);
    }
}
