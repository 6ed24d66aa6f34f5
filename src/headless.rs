// ── Terminal mode ─────────────────────────────────────────────────────────────
//
// `scriptpad run <FILE>` drives the same `App` state machine as the editor
// window, with stdout standing in for the output pane.  Useful on machines
// without the editor window and for checking tool setup.

use std::{io::Write, path::Path, sync::mpsc};

use crate::{
    app::{App, OutputUpdate},
    error::{AppError, Result},
    languages::ScriptLanguage,
    locate::{self, ErrorLink},
    runner::{RunEvent, RunOutcome},
    settings::Settings,
};

/// Exit status reported when the user interrupted the tool.
const STOPPED_EXIT: i32 = 130;

/// Run `file` to completion, streaming its output to `out`, then list every
/// diagnostic with the source line it points at.
///
/// Returns the tool's exit code.
pub(crate) fn run_script<W: Write>(
    file: &Path,
    lang: Option<ScriptLanguage>,
    settings: Settings,
    out: &mut W,
) -> Result<i32> {
    let bytes = std::fs::read(file)?;
    let mut app = App::new(settings);
    let source = app.open_file(file.to_path_buf(), &bytes);
    match lang {
        Some(lang) => {
            app.set_language(lang);
        }
        None if ScriptLanguage::from_path(file).is_none() => {
            return Err(AppError::UnknownLanguage(file.to_path_buf()));
        }
        None => {}
    }
    tracing::debug!(file = %file.display(), language = %app.language(), "running script");

    let (tx, rx) = mpsc::channel::<RunEvent>();
    app.run(&source, tx)?;

    let mut links: Vec<ErrorLink> = Vec::new();
    let mut outcome = None;
    // The runner owns the only other sender; the channel closes after the
    // final event.
    for event in rx {
        let finished = match &event {
            RunEvent::Finished { outcome: o, .. } => Some(Some(*o)),
            RunEvent::Failed { .. } => Some(None),
            _ => None,
        };
        match app.on_run_event(event) {
            OutputUpdate::Append { text, links: new } | OutputUpdate::Replace { text, links: new } => {
                out.write_all(text.as_bytes())?;
                out.flush()?;
                links.extend(new);
            }
            OutputUpdate::Done { links: new } => links.extend(new),
            OutputUpdate::Reset | OutputUpdate::Ignore | OutputUpdate::Notice { .. } => {}
        }
        if let Some(o) = finished {
            outcome = o;
            break;
        }
    }

    if !links.is_empty() {
        writeln!(out)?;
        for link in &links {
            write_diagnostic(out, &source, link)?;
        }
    }

    Ok(match outcome {
        Some(RunOutcome::Exited(code)) => code,
        Some(RunOutcome::Stopped) => STOPPED_EXIT,
        Some(RunOutcome::Signalled) | None => 1,
    })
}

/// `line:col: severity: message`, then the source line with a caret under
/// the reported column.
fn write_diagnostic<W: Write>(out: &mut W, source: &str, link: &ErrorLink) -> Result<()> {
    let d = &link.diagnostic;
    let loc = locate::locate(source, d.line, d.column);
    let line = &source[loc.line_range()];
    let indent = source[loc.line_start..loc.caret.max(loc.line_start)].chars().count();
    writeln!(out, "{}:{}: {}: {}", d.line, d.column, d.severity.as_str(), d.message)?;
    writeln!(out, "    | {line}")?;
    writeln!(out, "    | {:indent$}^", "")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_without_lang_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "x").expect("write");
        let mut out = Vec::new();
        let err = run_script(&path, None, Settings::default(), &mut out).unwrap_err();
        assert!(matches!(err, AppError::UnknownLanguage(p) if p == path));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut out = Vec::new();
        let err = run_script(&dir.path().join("nope.kts"), None, Settings::default(), &mut out).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn missing_tool_is_a_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.swift");
        std::fs::write(&path, "print(1)").expect("write");
        let settings = Settings { swift_command: "scriptpad-no-such-swift".to_owned(), ..Settings::default() };
        let mut out = Vec::new();
        let err = run_script(&path, None, settings, &mut out).unwrap_err();
        assert!(matches!(err, AppError::Spawn { .. }));
    }

    #[test]
    fn diagnostic_is_printed_with_caret() {
        let source = "let a = 1\nlet b = c\n";
        let link = ErrorLink {
            range: 0..10,
            diagnostic: locate::parse_line("x.swift:2:9: error: cannot find 'c' in scope").expect("parse"),
        };
        let mut out = Vec::new();
        write_diagnostic(&mut out, source, &link).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(
            text,
            "2:9: error: cannot find 'c' in scope\n    | let b = c\n    |         ^\n"
        );
    }

    // `cat` plays the Swift driver and echoes the script, which is written
    // to look like compiler output.
    #[cfg(unix)]
    #[test]
    fn runs_script_and_lists_diagnostics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("demo.txt");
        std::fs::write(&path, "demo.swift:1:3: warning: unused\n").expect("write");
        let settings = Settings { swift_command: "cat".to_owned(), ..Settings::default() };
        let mut out = Vec::new();
        let code = run_script(&path, Some(ScriptLanguage::Swift), settings, &mut out).expect("run");
        assert_eq!(code, 0);
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("demo.swift:1:3: warning: unused\n"), "{text}");
        assert!(text.contains("1:3: warning: unused\n    | demo.swift:1:3: warning: unused\n    |   ^\n"), "{text}");
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_is_forwarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fail.kts");
        std::fs::write(&path, "").expect("write");
        // `false -script <file>` ignores its arguments and exits 1.
        let settings = Settings { kotlin_command: "false".to_owned(), ..Settings::default() };
        let mut out = Vec::new();
        assert_eq!(run_script(&path, None, settings, &mut out).expect("run"), 1);
    }
}
