// ── Editor component abstraction ──────────────────────────────────────────────
//
// Exposes a safe Rust API over the underlying Scintilla editor control.
// Callers interact with `ScintillaView` (defined in `scintilla::`) through
// the public methods on this module; they never touch Win32 handles directly.

pub mod scintilla;

use std::ops::Range;

use scintilla::ScintillaView;

/// The indicators Scriptpad draws, each in its own container slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Indicator {
    /// Keyword text colour in the editor.
    Keyword,
    /// Transient underline of the line an error points at.
    ErrorLine,
    /// Clickable diagnostic lines in the output pane.
    Link,
}

impl Indicator {
    pub(crate) fn slot(self) -> usize {
        match self {
            Indicator::Keyword => 0,
            Indicator::ErrorLine => 1,
            Indicator::Link => 2,
        }
    }
}

/// Clear all keyword paint, then paint every span.
pub(crate) fn paint_keywords(view: &ScintillaView, spans: &[Range<usize>]) {
    let slot = Indicator::Keyword.slot();
    view.clear_indicator(slot, 0..view.doc_len());
    for span in spans {
        view.fill_indicator(slot, span.clone());
    }
}

/// Append `text` to a read-only pane and keep the end in view.
pub(crate) fn append_output(view: &ScintillaView, text: &str) {
    view.set_read_only(false);
    view.append_text(text);
    view.set_read_only(true);
    view.goto_pos(view.doc_len());
}

/// Empty a read-only pane.
pub(crate) fn clear_output(view: &ScintillaView) {
    view.set_read_only(false);
    view.clear_all();
    view.set_read_only(true);
}

/// Select `caret..caret`, bring the editor to the front and underline `line`.
pub(crate) fn jump_to(view: &ScintillaView, caret: usize, line: Range<usize>) {
    view.set_sel(caret, caret);
    view.grab_focus();
    if !line.is_empty() {
        view.fill_indicator(Indicator::ErrorLine.slot(), line);
    }
}
