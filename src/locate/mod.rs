// ── Error locator ─────────────────────────────────────────────────────────────
//
// Turns compiler output such as
//
//     /tmp/script123.kts:4:9: error: unresolved reference: pritnln
//
// into a position in the editor buffer, and keeps track of the transient
// underline drawn at that position.  Pure Rust; all offsets are byte offsets
// into UTF-8 text, which is what Scintilla positions are in UTF-8 mode.

use std::{ops::Range, sync::LazyLock};

use regex::Regex;

/// `path:line:col: error|warning: message`, case-insensitive.
static DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?):(\d+):(\d+):\s*(error|warning):\s*(.*)$")
        .expect("diagnostic pattern is valid")
});

// ── Diagnostics ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// One `path:line:col: severity: message` line from the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Diagnostic {
    pub(crate) path: String,
    /// 1-based line as printed by the tool.
    pub(crate) line: usize,
    /// 1-based column as printed by the tool.
    pub(crate) column: usize,
    pub(crate) severity: Severity,
    pub(crate) message: String,
}

/// Parse a single output line.  A trailing `\r` is ignored.
pub(crate) fn parse_line(line: &str) -> Option<Diagnostic> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let caps = DIAGNOSTIC.captures(line)?;
    let severity = if caps[4].eq_ignore_ascii_case("error") {
        Severity::Error
    } else {
        Severity::Warning
    };
    Some(Diagnostic {
        path: caps[1].to_owned(),
        line: caps[2].parse().ok()?,
        column: caps[3].parse().ok()?,
        severity,
        message: caps[5].to_owned(),
    })
}

/// Find the line of `text` containing byte `pos` and parse it.
pub(crate) fn diagnostic_at(text: &str, pos: usize) -> Option<Diagnostic> {
    if !text.is_char_boundary(pos) {
        return None;
    }
    let start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let end = text[pos..].find('\n').map_or(text.len(), |i| pos + i);
    parse_line(&text[start..end])
}

// ── Line/column → offset ──────────────────────────────────────────────────────

/// Where a diagnostic lands in the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Location {
    /// Caret position for the reported column.
    pub(crate) caret: usize,
    /// First byte of the reported line.
    pub(crate) line_start: usize,
    /// End of the reported line, excluding the line terminator.
    pub(crate) line_end: usize,
}

impl Location {
    /// Range to underline.
    pub(crate) fn line_range(&self) -> Range<usize> {
        self.line_start..self.line_end
    }
}

/// Convert a 1-based (`line`, `column`) pair into byte offsets of `text`.
///
/// * `line` 0 is treated as line 1.
/// * A line past the end of the document resolves to the last position
///   (`len - 1`, or 0 for an empty document).
/// * The column counts characters, and is clamped to the end of its line.
pub(crate) fn locate(text: &str, line: usize, column: usize) -> Location {
    let target = line.max(1);
    let last = floor_char_boundary(text, text.len().saturating_sub(1));

    let line_start = if target == 1 {
        Some(0)
    } else {
        text.match_indices('\n').nth(target - 2).map(|(i, _)| i + 1)
    };
    // `line_start == len` happens for the empty line after a trailing newline.
    let Some(line_start) = line_start.filter(|&s| s < text.len() || target == 1) else {
        let start = text[..last].rfind('\n').map_or(0, |i| i + 1);
        return Location { caret: last, line_start: start, line_end: line_end(text, start) };
    };

    let line_end = line_end(text, line_start);
    let caret = text[line_start..line_end]
        .char_indices()
        .nth(column.saturating_sub(1))
        .map_or(line_end, |(i, _)| line_start + i);
    let caret = floor_char_boundary(text, caret.min(last));
    Location { caret, line_start, line_end }
}

/// End of the line beginning at `start`, before any `\r\n` / `\n`.
fn line_end(text: &str, start: usize) -> usize {
    let end = text[start..].find('\n').map_or(text.len(), |i| start + i);
    if end > start && text.as_bytes()[end - 1] == b'\r' {
        end - 1
    } else {
        end
    }
}

fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

// ── Output log ────────────────────────────────────────────────────────────────

/// A clickable diagnostic line in the output pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ErrorLink {
    /// Byte range of the line in the output text (terminator excluded).
    pub(crate) range: Range<usize>,
    pub(crate) diagnostic: Diagnostic,
}

/// Accumulates streamed output and recognises diagnostic lines as they
/// complete.
#[derive(Debug, Default)]
pub(crate) struct OutputLog {
    text: String,
    /// Start of the line that has not seen its `\n` yet.
    line_start: usize,
    links: Vec<ErrorLink>,
}

impl OutputLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Full output so far.
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn links(&self) -> &[ErrorLink] {
        &self.links
    }

    /// Append `chunk`; returns links for every line it completed.
    pub(crate) fn push(&mut self, chunk: &str) -> Vec<ErrorLink> {
        let scan_from = self.text.len();
        self.text.push_str(chunk);

        let mut found = Vec::new();
        let mut search = scan_from;
        while let Some(rel) = self.text[search..].find('\n') {
            let nl = search + rel;
            if let Some(link) = self.complete_line(nl) {
                found.push(link);
            }
            self.line_start = nl + 1;
            search = nl + 1;
        }
        found
    }

    /// Treat a trailing partial line as complete (end of stream).
    pub(crate) fn flush(&mut self) -> Option<ErrorLink> {
        if self.line_start >= self.text.len() {
            return None;
        }
        let end = self.text.len();
        let link = self.complete_line(end);
        self.line_start = end;
        link
    }

    /// The link whose line contains `pos` (end of line included).
    pub(crate) fn link_at(&self, pos: usize) -> Option<&ErrorLink> {
        self.links
            .iter()
            .find(|link| link.range.start <= pos && pos <= link.range.end)
    }

    pub(crate) fn clear(&mut self) {
        self.text.clear();
        self.line_start = 0;
        self.links.clear();
    }

    fn complete_line(&mut self, end: usize) -> Option<ErrorLink> {
        let start = self.line_start;
        let diagnostic = parse_line(&self.text[start..end])?;
        let end = if end > start && self.text.as_bytes()[end - 1] == b'\r' { end - 1 } else { end };
        let link = ErrorLink { range: start..end, diagnostic };
        self.links.push(link.clone());
        Some(link)
    }
}

// ── Transient underline ───────────────────────────────────────────────────────

/// Identifies one `ErrorFlash::show` call for its cleanup timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FlashToken(u64);

/// Tracks the single underlined range in the editor.
#[derive(Debug, Default)]
pub(crate) struct ErrorFlash {
    current: Option<(FlashToken, Range<usize>)>,
    generation: u64,
}

impl ErrorFlash {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Underline `range`.  Returns the token for the cleanup timer and the
    /// previously underlined range, which the caller must clear.
    pub(crate) fn show(&mut self, range: Range<usize>) -> (FlashToken, Option<Range<usize>>) {
        self.generation += 1;
        let token = FlashToken(self.generation);
        let previous = self.current.replace((token, range)).map(|(_, r)| r);
        (token, previous)
    }

    /// Timer fired for `token`.  Returns the range to clear, unless a newer
    /// `show` has superseded it.
    pub(crate) fn expire(&mut self, token: FlashToken) -> Option<Range<usize>> {
        if self.current.as_ref().is_some_and(|(t, _)| *t == token) {
            self.current.take().map(|(_, r)| r)
        } else {
            None
        }
    }

    /// Drop the underline now (user edited or clicked the editor).
    pub(crate) fn clear(&mut self) -> Option<Range<usize>> {
        self.current.take().map(|(_, r)| r)
    }

    pub(crate) fn active(&self) -> Option<&Range<usize>> {
        self.current.as_ref().map(|(_, r)| r)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_line ────────────────────────────────────────────────────────────

    #[test]
    fn parses_kotlin_error() {
        let d = parse_line("/tmp/script42.kts:3:5: error: unresolved reference: foo").expect("match");
        assert_eq!(d.path, "/tmp/script42.kts");
        assert_eq!((d.line, d.column), (3, 5));
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "unresolved reference: foo");
    }

    #[test]
    fn parses_swift_warning() {
        let d = parse_line("/tmp/script7.swift:10:1: warning: variable 'x' was never used")
            .expect("match");
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!((d.line, d.column), (10, 1));
    }

    #[test]
    fn severity_is_case_insensitive() {
        let d = parse_line("a.kts:1:1: ERROR: boom").expect("match");
        assert_eq!(d.severity, Severity::Error);
    }

    // Windows paths contain a drive-letter colon; the lazy path group must
    // still stop at the line number.
    #[test]
    fn windows_drive_letter_path() {
        let d = parse_line(r"C:\Temp\script1.kts:12:7: error: expecting ')'").expect("match");
        assert_eq!(d.path, r"C:\Temp\script1.kts");
        assert_eq!((d.line, d.column), (12, 7));
    }

    #[test]
    fn carriage_return_is_ignored() {
        let d = parse_line("a.swift:2:3: error: x\r").expect("match");
        assert_eq!(d.message, "x");
    }

    #[test]
    fn plain_output_is_not_a_diagnostic() {
        assert!(parse_line("Hello, world!").is_none());
        assert!(parse_line("a.kts:1: error: no column").is_none());
        assert!(parse_line("a.kts:1:2: note: just a note").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn overflowing_numbers_do_not_match() {
        assert!(parse_line("a.kts:99999999999999999999999:1: error: x").is_none());
    }

    #[test]
    fn diagnostic_at_finds_clicked_line() {
        let out = "compiling\nb.kts:2:4: error: bad\ndone\n";
        let pos = out.find("error").expect("present");
        let d = diagnostic_at(out, pos).expect("diagnostic");
        assert_eq!((d.line, d.column), (2, 4));
        assert!(diagnostic_at(out, 0).is_none());
        assert!(diagnostic_at(out, out.len() + 1).is_none());
    }

    // ── locate ────────────────────────────────────────────────────────────────

    const SRC: &str = "val a = 1\nprintln(a)\nfun f() {}\n";

    #[test]
    fn first_line_first_column() {
        let loc = locate(SRC, 1, 1);
        assert_eq!(loc, Location { caret: 0, line_start: 0, line_end: 9 });
    }

    #[test]
    fn middle_line_with_column() {
        let loc = locate(SRC, 2, 9);
        assert_eq!(loc.line_start, 10);
        assert_eq!(loc.line_end, 20);
        assert_eq!(&SRC[loc.caret..loc.caret + 1], "a");
        assert_eq!(&SRC[loc.line_range()], "println(a)");
    }

    #[test]
    fn line_zero_means_line_one() {
        assert_eq!(locate(SRC, 0, 1), locate(SRC, 1, 1));
    }

    #[test]
    fn column_past_line_end_stays_on_line() {
        let loc = locate(SRC, 1, 500);
        assert_eq!(loc.caret, 9);
        assert_eq!(loc.line_end, 9);
    }

    #[test]
    fn line_past_end_goes_to_last_position() {
        let loc = locate(SRC, 99, 3);
        assert_eq!(loc.caret, SRC.len() - 1);
    }

    #[test]
    fn empty_document() {
        let loc = locate("", 5, 5);
        assert_eq!(loc, Location { caret: 0, line_start: 0, line_end: 0 });
    }

    #[test]
    fn columns_count_characters_not_bytes() {
        let text = "val s = \"\u{e9}t\u{e9}\"; x\n";
        // column 16 is the `x` (each é is one column, two bytes).
        let loc = locate(text, 1, 16);
        assert_eq!(&text[loc.caret..loc.caret + 1], "x");
    }

    #[test]
    fn crlf_line_end_excludes_carriage_return() {
        let text = "a\r\nbb\r\n";
        let loc = locate(text, 2, 1);
        assert_eq!(loc.line_start, 3);
        assert_eq!(loc.line_end, 5);
        assert_eq!(&text[loc.line_range()], "bb");
    }

    #[test]
    fn last_line_without_newline() {
        let text = "one\ntwo";
        let loc = locate(text, 2, 2);
        assert_eq!(loc, Location { caret: 5, line_start: 4, line_end: 7 });
    }

    // ── OutputLog ─────────────────────────────────────────────────────────────

    #[test]
    fn links_found_across_chunk_boundaries() {
        let mut log = OutputLog::new();
        assert!(log.push("s.kts:4:").is_empty());
        let links = log.push("2: error: oops\nnext line\n");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].range, 0..22);
        assert_eq!((links[0].diagnostic.line, links[0].diagnostic.column), (4, 2));
        assert_eq!(log.text(), "s.kts:4:2: error: oops\nnext line\n");
    }

    #[test]
    fn link_ranges_point_into_full_text() {
        let mut log = OutputLog::new();
        log.push("building...\n");
        log.push("x.swift:1:1: error: a\r\nx.swift:2:1: warning: b\n");
        let links = log.links();
        assert_eq!(links.len(), 2);
        assert_eq!(&log.text()[links[0].range.clone()], "x.swift:1:1: error: a");
        assert_eq!(&log.text()[links[1].range.clone()], "x.swift:2:1: warning: b");
    }

    #[test]
    fn flush_completes_trailing_line() {
        let mut log = OutputLog::new();
        assert!(log.push("a.kts:3:1: error: no newline").is_empty());
        let link = log.flush().expect("link");
        assert_eq!(link.diagnostic.line, 3);
        assert!(log.flush().is_none());
    }

    #[test]
    fn link_at_includes_line_end() {
        let mut log = OutputLog::new();
        log.push("ok\na.kts:1:1: error: e\n");
        let link = log.links()[0].clone();
        assert_eq!(log.link_at(link.range.start), Some(&link));
        assert_eq!(log.link_at(link.range.end), Some(&link));
        assert!(log.link_at(0).is_none());
    }

    #[test]
    fn clear_resets_everything() {
        let mut log = OutputLog::new();
        log.push("a.kts:1:1: error: e\n");
        log.clear();
        assert_eq!(log.text(), "");
        assert!(log.links().is_empty());
        assert!(log.link_at(0).is_none());
    }

    // ── ErrorFlash ────────────────────────────────────────────────────────────

    #[test]
    fn flash_expires_with_its_token() {
        let mut flash = ErrorFlash::new();
        let (token, previous) = flash.show(3..9);
        assert_eq!(previous, None);
        assert_eq!(flash.active(), Some(&(3..9)));
        assert_eq!(flash.expire(token), Some(3..9));
        assert_eq!(flash.active(), None);
    }

    #[test]
    fn newer_flash_survives_older_timer() {
        let mut flash = ErrorFlash::new();
        let (old, _) = flash.show(0..4);
        let (new, previous) = flash.show(10..20);
        assert_eq!(previous, Some(0..4));
        assert_eq!(flash.expire(old), None);
        assert_eq!(flash.active(), Some(&(10..20)));
        assert_eq!(flash.expire(new), Some(10..20));
    }

    #[test]
    fn clear_drops_underline_and_stales_token() {
        let mut flash = ErrorFlash::new();
        let (token, _) = flash.show(1..2);
        assert_eq!(flash.clear(), Some(1..2));
        assert_eq!(flash.expire(token), None);
        assert_eq!(flash.clear(), None);
    }
}
