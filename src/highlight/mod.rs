// ── Keyword highlighter ───────────────────────────────────────────────────────
//
// Finds the keyword spans of the current language in the full editor text.
// The editor window repaints them after a short pause in typing (`Debounce`);
// painting itself lives next to the Scintilla wrapper.  No Win32 imports.

use std::{
    ops::Range,
    time::{Duration, Instant},
};

use regex::{Regex, RegexBuilder};

use crate::languages::ScriptLanguage;

// ── Matcher ───────────────────────────────────────────────────────────────────

/// Keyword matcher for one language.
#[derive(Debug, Clone)]
pub(crate) struct KeywordHighlighter {
    language: ScriptLanguage,
    pattern: Regex,
}

impl KeywordHighlighter {
    pub(crate) fn new(language: ScriptLanguage) -> Self {
        Self { language, pattern: build_pattern(language) }
    }

    pub(crate) fn language(&self) -> ScriptLanguage {
        self.language
    }

    /// Switch keyword lists.  Returns `true` when the language changed and
    /// the editor should be repainted right away.
    pub(crate) fn set_language(&mut self, language: ScriptLanguage) -> bool {
        if language == self.language {
            return false;
        }
        self.language = language;
        self.pattern = build_pattern(language);
        true
    }

    /// Byte ranges of every keyword in `text`, in order.
    pub(crate) fn spans(&self, text: &str) -> Vec<Range<usize>> {
        self.pattern.find_iter(text).map(|m| m.range()).collect()
    }
}

/// `\b(kw1|kw2|…)\b`, case-insensitive.
fn build_pattern(language: ScriptLanguage) -> Regex {
    let words: Vec<String> = language.keywords().iter().map(|w| regex::escape(w)).collect();
    RegexBuilder::new(&format!(r"\b({})\b", words.join("|")))
        .case_insensitive(true)
        .build()
        .expect("keyword lists are plain words")
}

// ── Debounce ──────────────────────────────────────────────────────────────────

/// Collapses a burst of edits into a single repaint `delay` after the last
/// one.
///
/// The editor window arms a Win32 timer with the same delay on every edit;
/// this type is the source of truth for whether the timer tick should
/// repaint.
#[derive(Debug, Clone)]
pub(crate) struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub(crate) fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub(crate) fn delay(&self) -> Duration {
        self.delay
    }

    /// Record an edit at `now`; pushes the deadline back.
    pub(crate) fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// `true` exactly once after the deadline passes.
    pub(crate) fn due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub(crate) fn cancel(&mut self) {
        self.deadline = None;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn words<'a>(text: &'a str, spans: &[Range<usize>]) -> Vec<&'a str> {
        spans.iter().map(|r| &text[r.clone()]).collect()
    }

    #[test]
    fn kotlin_keywords_are_found() {
        let h = KeywordHighlighter::new(ScriptLanguage::Kotlin);
        let text = "fun main() {\n    val x = 1\n    if (x > 0) return\n}\n";
        assert_eq!(words(text, &h.spans(text)), ["fun", "val", "if", "return"]);
    }

    #[test]
    fn whole_words_only() {
        let h = KeywordHighlighter::new(ScriptLanguage::Kotlin);
        let text = "funny valley variable classic fun";
        assert_eq!(words(text, &h.spans(text)), ["fun"]);
    }

    #[test]
    fn matching_ignores_case() {
        let h = KeywordHighlighter::new(ScriptLanguage::Swift);
        let text = "LET a = 1; Func b() {}";
        assert_eq!(words(text, &h.spans(text)), ["LET", "Func"]);
    }

    #[test]
    fn spans_are_byte_offsets_after_multibyte_text() {
        let h = KeywordHighlighter::new(ScriptLanguage::Swift);
        let text = "// h\u{e9}llo\nlet x = 1";
        let spans = h.spans(text);
        assert_eq!(spans, [text.find("let").expect("present")..text.find("let").expect("present") + 3]);
    }

    #[test]
    fn set_language_switches_lists() {
        let mut h = KeywordHighlighter::new(ScriptLanguage::Kotlin);
        let text = "func f() {} fun g() {}";
        assert_eq!(words(text, &h.spans(text)), ["fun"]);
        assert!(h.set_language(ScriptLanguage::Swift));
        assert_eq!(h.language(), ScriptLanguage::Swift);
        assert_eq!(words(text, &h.spans(text)), ["func"]);
        assert!(!h.set_language(ScriptLanguage::Swift));
    }

    #[test]
    fn empty_text_has_no_spans() {
        let h = KeywordHighlighter::new(ScriptLanguage::Kotlin);
        assert!(h.spans("").is_empty());
    }

    #[test]
    fn debounce_fires_once_after_last_touch() {
        let t0 = Instant::now();
        let mut d = Debounce::new(Duration::from_millis(300));
        d.touch(t0);
        d.touch(t0 + Duration::from_millis(200));
        assert!(!d.due(t0 + Duration::from_millis(400)));
        assert!(d.due(t0 + Duration::from_millis(500)));
        assert!(!d.due(t0 + Duration::from_millis(900)));
        assert!(!d.is_pending());
    }

    #[test]
    fn debounce_cancel() {
        let t0 = Instant::now();
        let mut d = Debounce::new(Duration::from_millis(10));
        d.touch(t0);
        assert!(d.is_pending());
        d.cancel();
        assert!(!d.due(t0 + Duration::from_secs(1)));
        assert_eq!(d.delay(), Duration::from_millis(10));
    }
}
