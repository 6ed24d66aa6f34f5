// ── Scintilla message constants ───────────────────────────────────────────────
//
// Source of truth: Scintilla.h (https://www.scintilla.org/ScintillaDoc.html)
// Only the subset Scriptpad uses is listed here.
// All SCI_* values are sent via SendMessageW(hwnd_sci, SCI_*, wparam, lparam).

use windows::Win32::UI::Controls::NMHDR;

// ── Code page ─────────────────────────────────────────────────────────────────

/// Set the code page.  Pass `SC_CP_UTF8` as WPARAM.
pub(crate) const SCI_SETCODEPAGE: u32 = 2037;
/// UTF-8 code page value for `SCI_SETCODEPAGE`.
pub(crate) const SC_CP_UTF8: usize = 65001;

// ── Document content ──────────────────────────────────────────────────────────

/// Replace all document text.  WPARAM=0; LPARAM=null-terminated UTF-8 string.
pub(crate) const SCI_SETTEXT: u32 = 2181;
/// Return byte count of the document (excluding null terminator).
pub(crate) const SCI_GETLENGTH: u32 = 2006;
/// Copy document bytes.  WPARAM=buffer len (incl. null); LPARAM=buffer ptr.
pub(crate) const SCI_GETTEXT: u32 = 2182;
/// Append bytes at the end.  WPARAM=length; LPARAM=pointer (no null needed).
pub(crate) const SCI_APPENDTEXT: u32 = 2282;
/// Delete all text (fails silently when read-only).
pub(crate) const SCI_CLEARALL: u32 = 2004;
/// Mark the current state as the save point.
pub(crate) const SCI_SETSAVEPOINT: u32 = 2014;
/// Forget all undo history.
pub(crate) const SCI_EMPTYUNDOBUFFER: u32 = 2175;
/// WPARAM = 1 to make the document read-only.
pub(crate) const SCI_SETREADONLY: u32 = 2171;

// ── Word wrap ─────────────────────────────────────────────────────────────────

/// Set word-wrap mode.
pub(crate) const SCI_SETWRAPMODE: u32 = 2268;
/// Wrap at word boundaries.
pub(crate) const SC_WRAP_WORD: usize = 1;

// ── Caret / selection ─────────────────────────────────────────────────────────

/// Move the caret to a byte position (also scrolls into view).
pub(crate) const SCI_GOTOPOS: u32 = 2025;
pub(crate) const SCI_GETCURRENTPOS: u32 = 2008;
/// Set anchor (WPARAM) and caret (LPARAM).
pub(crate) const SCI_SETSEL: u32 = 2160;
/// Scroll the caret into view.
pub(crate) const SCI_SCROLLCARET: u32 = 2169;
/// Give keyboard focus to the view.
pub(crate) const SCI_GRABFOCUS: u32 = 2400;

// ── Styles ────────────────────────────────────────────────────────────────────

pub(crate) const SCI_STYLECLEARALL: u32 = 2050;
pub(crate) const SCI_STYLESETFORE: u32 = 2051;
pub(crate) const SCI_STYLESETBACK: u32 = 2052;
pub(crate) const SCI_STYLESETBOLD: u32 = 2053;
pub(crate) const SCI_STYLESETSIZE: u32 = 2055;
pub(crate) const SCI_STYLESETFONT: u32 = 2056;
/// Caret colour.  WPARAM = COLORREF.
pub(crate) const SCI_SETCARETFORE: u32 = 2069;
/// Selection background.  WPARAM = use (1); LPARAM = COLORREF.
pub(crate) const SCI_SETSELBACK: u32 = 2068;

/// Style every other style is cloned from by `SCI_STYLECLEARALL`.
pub(crate) const STYLE_DEFAULT: usize = 32;
/// Line-number margin style.
pub(crate) const STYLE_LINENUMBER: usize = 33;

// ── Margins ───────────────────────────────────────────────────────────────────

pub(crate) const SCI_SETMARGINTYPEN: u32 = 2240;
pub(crate) const SCI_SETMARGINWIDTHN: u32 = 2242;
/// Pixel width of a string in a style.  WPARAM = style; LPARAM = text ptr.
pub(crate) const SCI_TEXTWIDTH: u32 = 2276;
pub(crate) const SC_MARGIN_NUMBER: usize = 1;

// ── Indicators ────────────────────────────────────────────────────────────────
//
// Keyword colouring, the error underline and the output links are all drawn
// with indicators, so they never fight with lexer styling.

pub(crate) const SCI_INDICSETSTYLE: u32 = 2080;
pub(crate) const SCI_INDICSETFORE: u32 = 2082;
pub(crate) const SCI_INDICSETUNDER: u32 = 2510;
pub(crate) const SCI_SETINDICATORCURRENT: u32 = 2500;
pub(crate) const SCI_INDICATORFILLRANGE: u32 = 2504;
pub(crate) const SCI_INDICATORCLEARRANGE: u32 = 2505;

/// Single straight underline.
pub(crate) const INDIC_PLAIN: usize = 0;
/// Thick underline below the text.
pub(crate) const INDIC_COMPOSITIONTHICK: usize = 14;
/// Recolours the text itself.
pub(crate) const INDIC_TEXTFORE: usize = 17;

/// First indicator number reserved for containers (0-7 belong to lexers).
pub(crate) const INDICATOR_CONTAINER: usize = 8;

// ── Notifications ─────────────────────────────────────────────────────────────

/// Restrict `SCN_MODIFIED` to the listed `SC_MOD_*` bits.
pub(crate) const SCI_SETMODEVENTMASK: u32 = 2359;
pub(crate) const SC_MOD_INSERTTEXT: i32 = 0x1;
pub(crate) const SC_MOD_DELETETEXT: i32 = 0x2;

/// Document text changed.
pub(crate) const SCN_MODIFIED: u32 = 2008;
/// Mouse button released over an indicator.
pub(crate) const SCN_INDICATORRELEASE: u32 = 2024;
/// Selection, content or scroll position changed; see `updated`.
pub(crate) const SCN_UPDATEUI: u32 = 2007;
pub(crate) const SC_UPDATE_SELECTION: i32 = 0x2;

/// Leading fields of Scintilla's `SCNotification`, as delivered in the LPARAM
/// of `WM_NOTIFY`.  Declared up to `updated`, the last field Scriptpad reads.
#[repr(C)]
pub(crate) struct SCNotification {
    pub(crate) nmhdr: NMHDR,
    pub(crate) position: isize,
    _ch: i32,
    _modifiers: i32,
    pub(crate) modification_type: i32,
    _text: *const u8,
    _length: isize,
    _lines_added: isize,
    _message: i32,
    _wparam: usize,
    _lparam: isize,
    _line: isize,
    _fold_level_now: i32,
    _fold_level_prev: i32,
    _margin: i32,
    _list_type: i32,
    _x: i32,
    _y: i32,
    _token: i32,
    _annotation_lines_added: isize,
    pub(crate) updated: i32,
}
