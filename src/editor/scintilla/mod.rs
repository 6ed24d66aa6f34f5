// ── Scintilla child-window hosting ────────────────────────────────────────────
//
// This is one of exactly two modules where `unsafe` is permitted.
// Every `unsafe` block MUST carry a `// SAFETY:` comment.
//
// ── DLL ownership model ───────────────────────────────────────────────────────
//
// `SciDll` owns the single `LoadLibraryW` call for `SciLexer.dll`.  It is
// stored in `WindowState` and lives longer than both `ScintillaView`s.
// `ScintillaView` holds only a child `HWND`; it does not own the DLL.
//
// Drop order inside `WindowState` (Rust drops fields in declaration order):
//   1. `app` (pure Rust, no HWNDs; stops a running script) — dropped first
//   2. `editor` / `output` — structs with stale HWNDs (Windows already
//      destroyed them with the parent); no-op drop
//   3. `sci_dll` — `FreeLibrary` called here, after all windows are gone ✓
//
// `SciLexer.dll` is loaded by filename; Windows resolves it from the
// application directory first on Win10/11.

#![allow(unsafe_code)]

pub mod messages;

use std::ops::Range;

use messages::{
    INDICATOR_CONTAINER, SCI_APPENDTEXT, SCI_CLEARALL, SCI_EMPTYUNDOBUFFER, SCI_GETLENGTH,
    SCI_GETCURRENTPOS, SCI_GETTEXT, SCI_GOTOPOS, SCI_GRABFOCUS, SCI_INDICATORCLEARRANGE, SCI_INDICATORFILLRANGE,
    SCI_INDICSETFORE, SCI_INDICSETSTYLE, SCI_INDICSETUNDER, SCI_SCROLLCARET, SCI_SETCARETFORE,
    SCI_SETCODEPAGE, SCI_SETINDICATORCURRENT, SCI_SETMARGINTYPEN, SCI_SETMARGINWIDTHN,
    SCI_SETMODEVENTMASK, SCI_SETREADONLY, SCI_SETSAVEPOINT, SCI_SETSEL, SCI_SETSELBACK,
    SCI_SETTEXT, SCI_SETWRAPMODE, SCI_STYLECLEARALL, SCI_STYLESETBACK, SCI_STYLESETBOLD,
    SCI_STYLESETFONT, SCI_STYLESETFORE, SCI_STYLESETSIZE, SCI_TEXTWIDTH, SC_CP_UTF8,
    SC_MARGIN_NUMBER, SC_MOD_DELETETEXT, SC_MOD_INSERTTEXT, SC_WRAP_WORD, STYLE_LINENUMBER,
};

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{HINSTANCE, HMODULE, HWND, LPARAM, WPARAM},
        System::LibraryLoader::{FreeLibrary, LoadLibraryW},
        UI::WindowsAndMessaging::{
            CreateWindowExW, SendMessageW, HMENU, WINDOW_EX_STYLE, WINDOW_STYLE, WS_CHILD,
            WS_CLIPSIBLINGS, WS_VISIBLE,
        },
    },
};

use crate::error::{AppError, Result};

// ── DLL identity ──────────────────────────────────────────────────────────────

const CLASS_NAME: PCWSTR = w!("Scintilla");

// ── SciDll ────────────────────────────────────────────────────────────────────

/// RAII handle to the loaded `SciLexer.dll`.
///
/// Loading the DLL causes it to register the `"Scintilla"` window class.
/// `FreeLibrary` is called on `Drop`, which should happen after all
/// `ScintillaView` child windows have been destroyed.
pub(crate) struct SciDll(HMODULE);

impl SciDll {
    /// Load `SciLexer.dll` from the application directory.
    pub(crate) fn load() -> Result<Self> {
        // SAFETY: the literal is a valid null-terminated UTF-16 string.
        // LoadLibraryW searches the application directory first on Win10/11.
        let dll = unsafe { LoadLibraryW(w!("SciLexer.dll")) }.map_err(AppError::from)?;
        tracing::debug!("SciLexer.dll loaded");
        Ok(Self(dll))
    }
}

impl Drop for SciDll {
    fn drop(&mut self) {
        // SAFETY: self.0 was returned by a successful LoadLibraryW and has not
        // been freed since.  Both ScintillaView HWNDs are already destroyed
        // (Windows destroys child windows before WM_DESTROY fires on the parent,
        // and WindowState field order ensures the views drop before sci_dll).
        unsafe {
            let _ = FreeLibrary(self.0);
        }
    }
}

// ── ScintillaView ─────────────────────────────────────────────────────────────

/// A hosted Scintilla child window: the script editor or the output pane.
///
/// Does **not** own the `SciLexer.dll` module handle — that is owned by
/// `SciDll` in `WindowState`.  The child `HWND` is destroyed automatically
/// by Windows when the parent is destroyed; no explicit cleanup is needed.
pub(crate) struct ScintillaView {
    hwnd: HWND,
}

impl ScintillaView {
    /// Create a visible Scintilla child window inside `hwnd_parent`.
    ///
    /// `_dll` proves that `SciLexer.dll` is loaded and the `"Scintilla"` class
    /// is registered.  `id` is the control id reported in `NMHDR::idFrom`.
    pub(crate) fn create(
        hwnd_parent: HWND,
        hinstance: HINSTANCE,
        id: usize,
        _dll: &SciDll,
    ) -> Result<Self> {
        // SAFETY: CLASS_NAME is the class registered by SciLexer.dll (_dll
        // proves the DLL is loaded).  hwnd_parent and hinstance are valid
        // Win32 handles from WM_CREATE.  For a child window the HMENU slot
        // carries the control id.
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(0),
                CLASS_NAME,
                PCWSTR::null(),
                WS_CHILD | WS_VISIBLE | WS_CLIPSIBLINGS | WINDOW_STYLE(0x0200_0000), // WS_CLIPCHILDREN
                0, 0, 0, 0,
                hwnd_parent,
                HMENU(id as *mut core::ffi::c_void),
                hinstance,
                None,
            )
        }
        .map_err(|e| {
            tracing::error!(error = %e, "cannot create Scintilla view");
            AppError::from(e)
        })?;

        let view = Self { hwnd };
        view.send(SCI_SETCODEPAGE, SC_CP_UTF8, 0);
        Ok(view)
    }

    /// The Scintilla child window handle.  Valid until the parent is destroyed.
    pub(crate) fn hwnd(&self) -> HWND {
        self.hwnd
    }

    fn send(&self, msg: u32, wparam: usize, lparam: isize) -> isize {
        // SAFETY: hwnd is a live Scintilla window owned by our parent; every
        // caller passes either plain integers or a pointer to memory that
        // outlives this synchronous call.
        unsafe { SendMessageW(self.hwnd, msg, WPARAM(wparam), LPARAM(lparam)).0 }
    }

    // ── Document operations ───────────────────────────────────────────────────

    /// Replace all document text (UTF-8).
    pub(crate) fn set_text(&self, text: &str) {
        let mut buf: Vec<u8> = Vec::with_capacity(text.len() + 1);
        buf.extend_from_slice(text.as_bytes());
        buf.push(0);
        // buf is null-terminated UTF-8 that outlives the call.
        self.send(SCI_SETTEXT, 0, buf.as_ptr() as isize);
    }

    /// Read the full document text.
    pub(crate) fn get_text(&self) -> String {
        let len = self.doc_len();
        let mut buf = vec![0u8; len + 1];
        // buf is len+1 bytes; SCI_GETTEXT with matching buffer size is safe.
        self.send(SCI_GETTEXT, len + 1, buf.as_mut_ptr() as isize);
        buf.truncate(len);
        match String::from_utf8(buf) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    /// Append UTF-8 text at the end of the document.
    pub(crate) fn append_text(&self, text: &str) {
        self.send(SCI_APPENDTEXT, text.len(), text.as_ptr() as isize);
    }

    /// Delete all text.
    pub(crate) fn clear_all(&self) {
        self.send(SCI_CLEARALL, 0, 0);
    }

    /// Total byte length of the document (excluding null terminator).
    pub(crate) fn doc_len(&self) -> usize {
        self.send(SCI_GETLENGTH, 0, 0) as usize
    }

    /// Mark the current state as the save point.
    pub(crate) fn set_save_point(&self) {
        self.send(SCI_SETSAVEPOINT, 0, 0);
    }

    /// Drop the undo history (after loading a file or starting a new one).
    pub(crate) fn empty_undo_buffer(&self) {
        self.send(SCI_EMPTYUNDOBUFFER, 0, 0);
    }

    pub(crate) fn set_read_only(&self, read_only: bool) {
        self.send(SCI_SETREADONLY, usize::from(read_only), 0);
    }

    /// Wrap long lines at word boundaries.
    pub(crate) fn set_word_wrap(&self) {
        self.send(SCI_SETWRAPMODE, SC_WRAP_WORD, 0);
    }

    /// Only report insertions and deletions through `SCN_MODIFIED`.
    pub(crate) fn notify_text_changes(&self) {
        self.send(SCI_SETMODEVENTMASK, (SC_MOD_INSERTTEXT | SC_MOD_DELETETEXT) as usize, 0);
    }

    // ── Caret / selection ─────────────────────────────────────────────────────

    /// Move the caret to a byte offset and scroll it into view.
    pub(crate) fn goto_pos(&self, pos: usize) {
        self.send(SCI_GOTOPOS, pos, 0);
    }

    /// Set the selection anchor and caret, then scroll the caret into view.
    pub(crate) fn set_sel(&self, anchor: usize, caret: usize) {
        self.send(SCI_SETSEL, anchor, caret as isize);
        self.send(SCI_SCROLLCARET, 0, 0);
    }

    pub(crate) fn current_pos(&self) -> usize {
        usize::try_from(self.send(SCI_GETCURRENTPOS, 0, 0)).unwrap_or(0)
    }

    pub(crate) fn grab_focus(&self) {
        self.send(SCI_GRABFOCUS, 0, 0);
    }

    // ── Styles ────────────────────────────────────────────────────────────────

    pub(crate) fn style_set_fore(&self, style: usize, colour: u32) {
        self.send(SCI_STYLESETFORE, style, colour as isize);
    }

    pub(crate) fn style_set_back(&self, style: usize, colour: u32) {
        self.send(SCI_STYLESETBACK, style, colour as isize);
    }

    pub(crate) fn style_set_bold(&self, style: usize, bold: bool) {
        self.send(SCI_STYLESETBOLD, style, isize::from(bold));
    }

    pub(crate) fn style_set_size(&self, style: usize, points: u32) {
        self.send(SCI_STYLESETSIZE, style, points as isize);
    }

    /// Set the font face of `style`.  Interior NULs truncate the name.
    pub(crate) fn style_set_font(&self, style: usize, face: &str) {
        let mut buf: Vec<u8> = face.bytes().take_while(|&b| b != 0).collect();
        buf.push(0);
        self.send(SCI_STYLESETFONT, style, buf.as_ptr() as isize);
    }

    /// Copy `STYLE_DEFAULT` into every other style.
    pub(crate) fn style_clear_all(&self) {
        self.send(SCI_STYLECLEARALL, 0, 0);
    }

    pub(crate) fn set_caret_fore(&self, colour: u32) {
        self.send(SCI_SETCARETFORE, colour as usize, 0);
    }

    pub(crate) fn set_sel_back(&self, colour: u32) {
        self.send(SCI_SETSELBACK, 1, colour as isize);
    }

    /// Show a line-number margin wide enough for `digits` digits.
    pub(crate) fn show_line_numbers(&self, digits: usize) {
        let sample: Vec<u8> = std::iter::once(b'_')
            .chain(std::iter::repeat(b'9').take(digits))
            .chain(std::iter::once(0))
            .collect();
        let width = self.send(SCI_TEXTWIDTH, STYLE_LINENUMBER, sample.as_ptr() as isize);
        self.send(SCI_SETMARGINTYPEN, 0, SC_MARGIN_NUMBER as isize);
        self.send(SCI_SETMARGINWIDTHN, 0, width);
    }

    // ── Indicators ────────────────────────────────────────────────────────────

    /// Configure container indicator `slot` (0-based above
    /// `INDICATOR_CONTAINER`).
    pub(crate) fn define_indicator(&self, slot: usize, style: usize, colour: u32, under: bool) {
        let indicator = INDICATOR_CONTAINER + slot;
        self.send(SCI_INDICSETSTYLE, indicator, style as isize);
        self.send(SCI_INDICSETFORE, indicator, colour as isize);
        self.send(SCI_INDICSETUNDER, indicator, isize::from(under));
    }

    /// Draw indicator `slot` over `range`.
    pub(crate) fn fill_indicator(&self, slot: usize, range: Range<usize>) {
        self.send(SCI_SETINDICATORCURRENT, INDICATOR_CONTAINER + slot, 0);
        self.send(SCI_INDICATORFILLRANGE, range.start, range.len() as isize);
    }

    /// Remove indicator `slot` from `range`.
    pub(crate) fn clear_indicator(&self, slot: usize, range: Range<usize>) {
        self.send(SCI_SETINDICATORCURRENT, INDICATOR_CONTAINER + slot, 0);
        self.send(SCI_INDICATORCLEARRANGE, range.start, range.len() as isize);
    }
}
