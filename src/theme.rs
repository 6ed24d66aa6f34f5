// ── Dual light/dark colour theme ───────────────────────────────────────────────
//
// Applies a light or dark theme to a Scintilla view.
// Call `apply_theme(sci, settings)`; `settings.dark_mode` selects VS Code
// Dark+-inspired colours, otherwise a Notepad++-style light theme is used.
//
// Colour conventions:
//   • All palette entries are in 0xRRGGBB form.
//   • The `rgb!` macro converts to Scintilla's BGR COLORREF before passing to
//     the API.  Win32 `COLORREF` uses the same layout.

use crate::{
    app::ExitTone,
    editor::{
        scintilla::{
            messages::{INDIC_COMPOSITIONTHICK, INDIC_PLAIN, INDIC_TEXTFORE, STYLE_DEFAULT, STYLE_LINENUMBER},
            ScintillaView,
        },
        Indicator,
    },
    settings::Settings,
};

// ── Colour macro ──────────────────────────────────────────────────────────────

/// Convert 0xRRGGBB → Scintilla's BGR COLORREF.
macro_rules! rgb {
    ($r:expr, $g:expr, $b:expr) => {
        (($b as u32) << 16) | (($g as u32) << 8) | ($r as u32)
    };
}

// ── Colour palette ────────────────────────────────────────────────────────────

pub(crate) struct Palette {
    pub(crate) bg: u32,
    pub(crate) fg: u32,
    line_num_bg: u32,
    line_num_fg: u32,
    caret: u32,
    selection: u32,
    keyword: u32,
    error: u32,
    link: u32,
    /// Background of the toolbar strip and its labels.
    pub(crate) chrome: u32,
    exit_ok: u32,
    exit_fail: u32,
}

impl Palette {
    /// Text colour of the exit-code label.
    pub(crate) fn exit_colour(&self, tone: ExitTone) -> u32 {
        match tone {
            ExitTone::Neutral => self.fg,
            ExitTone::Success => self.exit_ok,
            ExitTone::Failure => self.exit_fail,
        }
    }
}

/// Notepad++-style light palette.
const LIGHT: Palette = Palette {
    bg: rgb!(0xFF, 0xFF, 0xFF),
    fg: rgb!(0x00, 0x00, 0x00),
    line_num_bg: rgb!(0xE4, 0xE4, 0xE4),
    line_num_fg: rgb!(0x80, 0x80, 0x80),
    caret: rgb!(0x00, 0x00, 0x00),
    selection: rgb!(0xC0, 0xD8, 0xF0),
    keyword: rgb!(0xFF, 0x80, 0x00),
    error: rgb!(0xE0, 0x00, 0x00),
    link: rgb!(0x00, 0x00, 0xFF),
    chrome: rgb!(0xF0, 0xF0, 0xF0),
    exit_ok: rgb!(0x00, 0x80, 0x00),
    exit_fail: rgb!(0xC0, 0x00, 0x00),
};

/// VS Code Dark+-inspired dark palette.
const DARK: Palette = Palette {
    bg: rgb!(0x1E, 0x1E, 0x1E),
    fg: rgb!(0xD4, 0xD4, 0xD4),
    line_num_bg: rgb!(0x25, 0x25, 0x26),
    line_num_fg: rgb!(0x85, 0x85, 0x85),
    caret: rgb!(0xAE, 0xAF, 0xAD),
    selection: rgb!(0x26, 0x4F, 0x78),
    keyword: rgb!(0xFF, 0x9E, 0x3D),
    error: rgb!(0xF4, 0x47, 0x47),
    link: rgb!(0x3C, 0x9D, 0xFF),
    chrome: rgb!(0x2D, 0x2D, 0x30),
    exit_ok: rgb!(0x6A, 0x99, 0x55),
    exit_fail: rgb!(0xF4, 0x47, 0x47),
};

pub(crate) fn palette(dark: bool) -> &'static Palette {
    if dark {
        &DARK
    } else {
        &LIGHT
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Apply the configured theme to `sci`.
///
/// Sequence:
/// 1. Set `STYLE_DEFAULT` font, size, and colours.
/// 2. Call `style_clear_all` to clone those into all 256 slots.
/// 3. Override `STYLE_LINENUMBER`, caret and selection.
/// 4. Define the keyword, error and link indicators.
pub(crate) fn apply_theme(sci: &ScintillaView, settings: &Settings) {
    let p = palette(settings.dark_mode);
    sci.style_set_fore(STYLE_DEFAULT, p.fg);
    sci.style_set_back(STYLE_DEFAULT, p.bg);
    sci.style_set_font(STYLE_DEFAULT, &settings.font);
    sci.style_set_size(STYLE_DEFAULT, settings.font_size);
    // Clone STYLE_DEFAULT into all 256 slots — must come BEFORE per-style overrides.
    sci.style_clear_all();
    sci.style_set_fore(STYLE_LINENUMBER, p.line_num_fg);
    sci.style_set_back(STYLE_LINENUMBER, p.line_num_bg);
    sci.style_set_bold(STYLE_LINENUMBER, false);
    sci.set_caret_fore(p.caret);
    sci.set_sel_back(p.selection);

    sci.define_indicator(Indicator::Keyword.slot(), INDIC_TEXTFORE, p.keyword, false);
    sci.define_indicator(Indicator::ErrorLine.slot(), INDIC_COMPOSITIONTHICK, p.error, true);
    sci.define_indicator(Indicator::Link.slot(), INDIC_PLAIN, p.link, true);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_is_bgr() {
        assert_eq!(rgb!(0x12, 0x34, 0x56), 0x0056_3412);
    }

    #[test]
    fn exit_colours_follow_tone() {
        let p = palette(false);
        assert_eq!(p.exit_colour(ExitTone::Neutral), p.fg);
        assert_eq!(p.exit_colour(ExitTone::Success), rgb!(0x00, 0x80, 0x00));
        assert_ne!(p.exit_colour(ExitTone::Failure), p.exit_colour(ExitTone::Success));
    }

    #[test]
    fn dark_palette_inverts_background() {
        assert_ne!(palette(true).bg, palette(false).bg);
        assert_eq!(palette(true).keyword & 0xFF, 0xFF, "keywords stay orange");
    }
}
