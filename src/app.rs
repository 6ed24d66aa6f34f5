// ── Application lifecycle & top-level state ────────────────────────────────────
//
// A single `App` is created on startup and owned by `WindowState` for the
// lifetime of the main window.  All mutations happen on the UI thread — there
// is no global mutable state.  Worker threads only talk to the UI through
// `runner::RunEvent`s.

use std::{ops::Range, path::PathBuf, time::Duration};

use crate::{
    error::{AppError, Result},
    highlight::{Debounce, KeywordHighlighter},
    languages::ScriptLanguage,
    locate::{ErrorFlash, ErrorLink, FlashToken, Location, OutputLog},
    runner::{EventSink, ProcessRunner, RunEvent, RunId, RunOutcome},
    settings::Settings,
};

// ── DocumentState ─────────────────────────────────────────────────────────────

/// State of the script being edited.
#[derive(Debug, Default)]
pub(crate) struct DocumentState {
    /// Absolute path to the file on disk, or `None` for an untitled buffer.
    pub(crate) path: Option<PathBuf>,
    /// `true` when the buffer contains changes not yet saved to disk.
    pub(crate) dirty: bool,
}

impl DocumentState {
    /// The bare filename component, or `"Untitled"` if no path is set.
    fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_owned())
    }
}

// ── Run status ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunStatus {
    Idle,
    Running,
    Stopped,
}

impl RunStatus {
    /// Text of the status label next to the Run / Stop buttons.
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RunStatus::Idle => "Idle",
            RunStatus::Running => "Running...",
            RunStatus::Stopped => "Stopped",
        }
    }
}

/// Colour class of the exit-code label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitTone {
    Neutral,
    Success,
    Failure,
}

/// What the output pane must do in response to a `RunEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutputUpdate {
    /// Event belonged to an older run; nothing to do.
    Ignore,
    /// Clear the pane (a run just started).
    Reset,
    /// Append `text`, then underline each of `links`.
    Append { text: String, links: Vec<ErrorLink> },
    /// Clear the pane, then append as for `Append`.
    Replace { text: String, links: Vec<ErrorLink> },
    /// Tell the user in a dialog; the pane and the log stay as they are.
    Notice { message: String },
    /// The run ended; underline any link completed by the final flush and
    /// refresh the status labels.
    Done { links: Vec<ErrorLink> },
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Top-level application state.
///
/// Passed by mutable reference through WndProc handlers so that all
/// application logic sees a single, explicit state root rather than a
/// collection of disconnected globals.
pub(crate) struct App {
    pub(crate) doc: DocumentState,
    pub(crate) settings: Settings,
    pub(crate) status: RunStatus,
    /// Outcome of the last finished run; `None` before the first one.
    pub(crate) last_outcome: Option<RunOutcome>,
    pub(crate) highlighter: KeywordHighlighter,
    pub(crate) debounce: Debounce,
    pub(crate) output: OutputLog,
    pub(crate) flash: ErrorFlash,
    /// Caret placed by the last jump to an error; moving away from it
    /// removes the underline.
    jump_caret: Option<usize>,
    pub(crate) runner: ProcessRunner,
}

impl App {
    /// Create a fresh `App` with an untitled, empty document.
    pub(crate) fn new(settings: Settings) -> Self {
        let delay = Duration::from_millis(u64::from(settings.highlight_delay_ms));
        Self {
            doc: DocumentState::default(),
            highlighter: KeywordHighlighter::new(settings.language),
            debounce: Debounce::new(delay),
            settings,
            status: RunStatus::Idle,
            last_outcome: None,
            output: OutputLog::new(),
            flash: ErrorFlash::new(),
            jump_caret: None,
            runner: ProcessRunner::new(),
        }
    }

    pub(crate) fn language(&self) -> ScriptLanguage {
        self.highlighter.language()
    }

    /// Switch the script language.  Returns `true` if the editor must be
    /// repainted.
    pub(crate) fn set_language(&mut self, language: ScriptLanguage) -> bool {
        self.settings.language = language;
        self.highlighter.set_language(language)
    }

    /// Compute the title string for the main window.
    ///
    /// | State | Title |
    /// |---|---|
    /// | No path, clean | `"Scriptpad"` |
    /// | Path set, clean | `"filename — Scriptpad"` |
    /// | Path set, dirty | `"*filename — Scriptpad"` |
    /// | No path, dirty | `"*Untitled — Scriptpad"` |
    pub(crate) fn window_title(&self) -> String {
        let name = self.doc.display_name();
        // Untitled + clean → bare app name (startup state)
        if self.doc.path.is_none() && !self.doc.dirty {
            return "Scriptpad".to_owned();
        }
        let dirty = if self.doc.dirty { "*" } else { "" };
        format!("{dirty}{name} \u{2014} Scriptpad") // — is U+2014 EM DASH
    }

    // ── Labels ────────────────────────────────────────────────────────────────

    pub(crate) fn status_text(&self) -> &'static str {
        self.status.as_str()
    }

    pub(crate) fn exit_text(&self) -> String {
        match (self.status, self.last_outcome) {
            (RunStatus::Running, _) => "Exit Code: -".to_owned(),
            (_, None) => "Exit Code: ".to_owned(),
            (_, Some(RunOutcome::Exited(code))) => format!("Exit: {code}"),
            (_, Some(RunOutcome::Stopped)) => "Exit: stopped".to_owned(),
            (_, Some(RunOutcome::Signalled)) => "Exit: killed".to_owned(),
        }
    }

    pub(crate) fn exit_tone(&self) -> ExitTone {
        match (self.status, self.last_outcome) {
            (RunStatus::Running, _) | (_, None) => ExitTone::Neutral,
            (_, Some(outcome)) if outcome.is_success() => ExitTone::Success,
            (_, Some(_)) => ExitTone::Failure,
        }
    }

    // ── Running ───────────────────────────────────────────────────────────────

    /// Start the current script.  `Err(AlreadyRunning)` while a run is live.
    pub(crate) fn run<S: EventSink>(&mut self, source: &str, sink: S) -> Result<RunId> {
        let language = self.language();
        let id = self.runner.start(language, source, &self.settings, sink)?;
        self.status = RunStatus::Running;
        self.last_outcome = None;
        Ok(id)
    }

    /// Report a run that could not start.
    ///
    /// A second `Run` while busy becomes a `Notice`: the running script's
    /// output (possibly mid-line) is left untouched.  Any other failure
    /// replaces the previous output with the error.
    pub(crate) fn start_failed(&mut self, err: &AppError) -> OutputUpdate {
        if matches!(err, AppError::AlreadyRunning) {
            return OutputUpdate::Notice { message: err.to_string() };
        }
        self.output.clear();
        self.last_outcome = None;
        let text = format!("Error: {err}\n");
        let links = self.output.push(&text);
        OutputUpdate::Replace { text, links }
    }

    /// Stop the current script.  Returns `true` if a process was killed.
    pub(crate) fn stop(&mut self) -> bool {
        let stopped = self.runner.stop();
        if stopped {
            self.status = RunStatus::Stopped;
        }
        stopped
    }

    /// Fold a runner event into the state and tell the caller what to draw.
    pub(crate) fn on_run_event(&mut self, event: RunEvent) -> OutputUpdate {
        if self.runner.current() != Some(event.id()) {
            return OutputUpdate::Ignore;
        }
        match event {
            RunEvent::Started { .. } => {
                self.output.clear();
                OutputUpdate::Reset
            }
            RunEvent::Output { text, .. } => {
                let links = self.output.push(&text);
                OutputUpdate::Append { text, links }
            }
            RunEvent::Finished { id, outcome } => {
                self.runner.finish(id);
                self.last_outcome = Some(outcome);
                self.status = match outcome {
                    RunOutcome::Stopped => RunStatus::Stopped,
                    _ => RunStatus::Idle,
                };
                OutputUpdate::Done { links: self.output.flush().into_iter().collect() }
            }
            RunEvent::Failed { id, message } => {
                self.runner.finish(id);
                self.status = RunStatus::Idle;
                let text = format!("Error: {message}\n");
                let links = self.output.push(&text);
                OutputUpdate::Append { text, links }
            }
        }
    }

    /// Resolve a click at byte `pos` of the output pane against `source`.
    pub(crate) fn error_target(&self, pos: usize, source: &str) -> Option<Location> {
        let link = self.output.link_at(pos)?;
        let d = &link.diagnostic;
        Some(crate::locate::locate(source, d.line, d.column))
    }

    /// Underline the line of `loc` after a jump.  Returns the cleanup token
    /// and the previous underline, which the caller must erase.
    pub(crate) fn show_error(&mut self, loc: &Location) -> (FlashToken, Option<Range<usize>>) {
        self.jump_caret = Some(loc.caret);
        self.flash.show(loc.line_range())
    }

    /// Drop the underline now (the user edited the script).
    pub(crate) fn clear_error(&mut self) -> Option<Range<usize>> {
        self.jump_caret = None;
        self.flash.clear()
    }

    /// The editor caret is now at `caret`.  Clicking (or moving) anywhere
    /// but the spot the jump selected removes the underline.
    pub(crate) fn caret_moved(&mut self, caret: usize) -> Option<Range<usize>> {
        match self.jump_caret {
            Some(jumped) if jumped == caret => None,
            Some(_) => self.clear_error(),
            None => None,
        }
    }

    // ── Files ─────────────────────────────────────────────────────────────────

    /// Update document state after a successful file open.
    ///
    /// Returns the UTF-8 text for the editor: a UTF-8 BOM is stripped and
    /// invalid sequences are replaced.  The language follows the extension
    /// when it is recognised.
    pub(crate) fn open_file(&mut self, path: PathBuf, bytes: &[u8]) -> String {
        let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let text = String::from_utf8_lossy(body).into_owned();
        if let Some(language) = ScriptLanguage::from_path(&path) {
            self.set_language(language);
        }
        self.doc.path = Some(path);
        self.doc.dirty = false;
        text
    }

    /// Write the script to `path` as UTF-8.
    ///
    /// On success, updates `doc.path` (for Save As) and clears `doc.dirty`.
    /// The caller is responsible for calling `ScintillaView::set_save_point()`
    /// to synchronise Scintilla's internal dirty model.
    pub(crate) fn save(&mut self, path: PathBuf, utf8_content: &[u8]) -> Result<()> {
        std::fs::write(&path, utf8_content)?;
        tracing::debug!(path = %path.display(), bytes = utf8_content.len(), "script saved");
        self.doc.path = Some(path);
        self.doc.dirty = false;
        Ok(())
    }

    /// Forget the current file and start an empty untitled script.
    pub(crate) fn new_document(&mut self) {
        self.doc = DocumentState::default();
        self.clear_error();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::sync::mpsc;

    fn app() -> App {
        App::new(Settings::default())
    }

    #[test]
    fn title_clean_untitled() {
        assert_eq!(app().window_title(), "Scriptpad");
    }

    #[test]
    fn title_clean_with_path() {
        let mut app = app();
        app.doc.path = Some(PathBuf::from("scripts").join("hello.kts"));
        assert_eq!(app.window_title(), "hello.kts \u{2014} Scriptpad");
    }

    #[test]
    fn title_dirty_with_path() {
        let mut app = app();
        app.doc.path = Some(PathBuf::from("scripts").join("hello.kts"));
        app.doc.dirty = true;
        assert_eq!(app.window_title(), "*hello.kts \u{2014} Scriptpad");
    }

    #[test]
    fn title_dirty_untitled() {
        let mut app = app();
        app.doc.dirty = true;
        assert_eq!(app.window_title(), "*Untitled \u{2014} Scriptpad");
    }

    #[test]
    fn labels_before_first_run() {
        let app = app();
        assert_eq!(app.status_text(), "Idle");
        assert_eq!(app.exit_text(), "Exit Code: ");
        assert_eq!(app.exit_tone(), ExitTone::Neutral);
    }

    #[test]
    fn labels_follow_outcome() {
        let mut app = app();
        app.status = RunStatus::Running;
        assert_eq!(app.status_text(), "Running...");
        assert_eq!(app.exit_text(), "Exit Code: -");

        app.status = RunStatus::Idle;
        app.last_outcome = Some(RunOutcome::Exited(0));
        assert_eq!(app.exit_text(), "Exit: 0");
        assert_eq!(app.exit_tone(), ExitTone::Success);

        app.last_outcome = Some(RunOutcome::Exited(1));
        assert_eq!(app.exit_text(), "Exit: 1");
        assert_eq!(app.exit_tone(), ExitTone::Failure);

        app.status = RunStatus::Stopped;
        app.last_outcome = Some(RunOutcome::Stopped);
        assert_eq!(app.status_text(), "Stopped");
        assert_eq!(app.exit_tone(), ExitTone::Failure);
    }

    #[test]
    fn start_failure_messages() {
        let mut app = app();
        let busy = app.start_failed(&AppError::AlreadyRunning);
        assert_eq!(busy, OutputUpdate::Notice { message: "Process already running!!!".to_owned() });

        let err = AppError::Spawn {
            program: "kotlinc".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        match app.start_failed(&err) {
            OutputUpdate::Replace { text, .. } => {
                assert_eq!(text, "Error: cannot start `kotlinc`: not found\n");
                assert_eq!(app.output.text(), text, "log restarts with the error");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(app.status, RunStatus::Idle);
    }

    #[test]
    fn caret_move_clears_error_underline() {
        let mut app = app();
        let source = "let a = 1\nlet b = c\n";
        let loc = crate::locate::locate(source, 2, 9);
        let (token, previous) = app.show_error(&loc);
        assert_eq!(previous, None);

        // Scintilla reports the jump's own selection first.
        assert_eq!(app.caret_moved(loc.caret), None);
        assert_eq!(app.flash.active(), Some(&loc.line_range()));

        // Then the user clicks elsewhere in the editor.
        assert_eq!(app.caret_moved(2), Some(10..19));
        assert_eq!(app.flash.active(), None);
        assert_eq!(app.caret_moved(loc.caret), None, "nothing left to clear");
        assert_eq!(app.flash.expire(token), None, "timer finds nothing to do");
    }

    #[test]
    fn edit_clears_error_underline() {
        let mut app = app();
        let loc = crate::locate::locate("x\ny\n", 2, 1);
        app.show_error(&loc);
        assert_eq!(app.clear_error(), Some(2..3));
        assert_eq!(app.caret_moved(0), None);
    }

    // A failure while waiting for the tool ends the run like `Finished`,
    // but without an outcome for the exit label.
    #[cfg(unix)]
    #[test]
    fn failed_event_reports_error_and_goes_idle() {
        let settings = Settings { swift_command: "cat".to_owned(), ..Settings::default() };
        let mut app = App::new(settings);
        app.set_language(ScriptLanguage::Swift);
        let (tx, _rx) = mpsc::channel();
        let id = app.run("print(1)\n", tx).expect("run");

        let update = app.on_run_event(RunEvent::Failed { id, message: "wait failed".to_owned() });
        assert_eq!(
            update,
            OutputUpdate::Append { text: "Error: wait failed\n".to_owned(), links: vec![] }
        );
        assert_eq!(app.status, RunStatus::Idle);
        assert_eq!(app.runner.current(), None);
        assert_eq!(app.exit_text(), "Exit Code: ");
        assert_eq!(app.output.text(), "Error: wait failed\n");

        // Anything the finished run still sends is dropped.
        let late = RunEvent::Output { id, text: "print(1)\n".to_owned() };
        assert_eq!(app.on_run_event(late), OutputUpdate::Ignore);
    }

    // The script is mid-way through printing a diagnostic when Run is
    // pressed again; the half line must still become a link.
    #[test]
    fn busy_notice_leaves_partial_line_intact() {
        let mut app = app();
        app.output.push("a.kts:3:");
        assert!(matches!(app.start_failed(&AppError::AlreadyRunning), OutputUpdate::Notice { .. }));
        let links = app.output.push("5: error: unresolved reference\n");
        assert_eq!(links.len(), 1);
        assert_eq!((links[0].diagnostic.line, links[0].diagnostic.column), (3, 5));
        assert_eq!(app.output.text(), "a.kts:3:5: error: unresolved reference\n");
    }

    #[test]
    fn open_strips_bom_and_picks_language() {
        let mut app = app();
        let text = app.open_file(PathBuf::from("demo.swift"), b"\xEF\xBB\xBFlet x = 1\n");
        assert_eq!(text, "let x = 1\n");
        assert_eq!(app.language(), ScriptLanguage::Swift);
        assert_eq!(app.settings.language, ScriptLanguage::Swift);
        assert!(!app.doc.dirty);
    }

    #[test]
    fn open_unknown_extension_keeps_language() {
        let mut app = app();
        app.open_file(PathBuf::from("notes.txt"), b"hi");
        assert_eq!(app.language(), ScriptLanguage::Kotlin);
    }

    #[test]
    fn save_writes_file_and_clears_dirty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.kts");
        let mut app = app();
        app.doc.dirty = true;
        app.save(path.clone(), b"println(1)\n").expect("save");
        assert_eq!(std::fs::read(&path).expect("read back"), b"println(1)\n");
        assert!(!app.doc.dirty);
        assert_eq!(app.doc.path, Some(path));
    }

    // Full cycle through a real process: the tool prints a diagnostic for
    // line 2 and the click on it resolves into the editor text.
    #[cfg(unix)]
    #[test]
    fn run_cycle_links_diagnostics_back_to_source() {
        let settings = Settings { swift_command: "cat".to_owned(), ..Settings::default() };
        let mut app = App::new(settings);
        app.set_language(ScriptLanguage::Swift);

        // `cat` echoes the script, so the "script" is the compiler output.
        let output = "compiling\nmain.swift:2:5: error: cannot find 'y' in scope\n";
        let source = "let x = 1\nlet y = x\n";
        let (tx, rx) = mpsc::channel();
        let id = app.run(output, tx).expect("run");
        assert_eq!(app.status, RunStatus::Running);
        assert!(matches!(app.run("", mpsc::channel::<RunEvent>().0), Err(crate::error::AppError::AlreadyRunning)));

        let mut links = Vec::new();
        loop {
            let ev = rx.recv_timeout(Duration::from_secs(20)).expect("event");
            let done = matches!(ev, RunEvent::Finished { .. });
            match app.on_run_event(ev) {
                OutputUpdate::Append { links: l, .. } | OutputUpdate::Done { links: l } => links.extend(l),
                _ => {}
            }
            if done {
                break;
            }
        }
        assert_eq!(app.status, RunStatus::Idle);
        assert_eq!(app.exit_text(), "Exit: 0");
        assert_eq!(links.len(), 1);
        assert_eq!(app.output.text(), output);

        // The run is acknowledged; a late event for it changes nothing.
        let late = RunEvent::Output { id, text: "late".to_owned() };
        assert_eq!(app.on_run_event(late), OutputUpdate::Ignore);
        assert_eq!(app.output.text(), output);

        let loc = app.error_target(links[0].range.start + 3, source).expect("target");
        assert_eq!(loc.line_start, 10);
        assert_eq!(&source[loc.caret..loc.caret + 1], "y");
        assert!(app.error_target(0, source).is_none());
    }
}
