// ── Process runner ────────────────────────────────────────────────────────────
//
// Launches the external compiler/interpreter for the current script and
// streams its merged stdout/stderr back to the UI.
//
// Thread model (per run):
//   • caller (UI thread) — `start` spawns the child and returns immediately.
//   • `script-output`    — reads the shared pipe in small chunks and emits
//                          `RunEvent::Output`.
//   • `script-wait`      — polls the child for exit, joins the reader, and
//                          emits `RunEvent::Finished`.
//
// Events are delivered through an `EventSink`; the sink decides how to get
// them onto the UI thread (a channel in headless mode, a posted window
// message in the editor window).

mod decode;
mod tree;

use std::{
    io::{Read, Write},
    process::{Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{
    error::{AppError, Result},
    languages::{ScriptLanguage, ToolCommand},
    settings::Settings,
};

use decode::Utf8Stream;
use tree::ProcessTree;

// ── Tunables ──────────────────────────────────────────────────────────────────

/// Largest slice of output forwarded in one `Output` event.
const CHUNK_SIZE: usize = 256;

/// How often the waiter checks whether the child has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// After `stop`, how long the waiter lets the reader drain before reporting
/// `Finished` anyway.  Only matters when a descendant escaped the tree kill
/// (e.g. started before it could join the job) and still holds the pipe.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// `CREATE_NO_WINDOW`: keep console tools from flashing a console window
/// over the editor.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

// ── Events ────────────────────────────────────────────────────────────────────

/// Identifies one execution.  Ids increase monotonically per runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RunId(u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    /// The tool exited on its own with this code.
    Exited(i32),
    /// The user pressed Stop.
    Stopped,
    /// The process was terminated by a signal and has no exit code.
    Signalled,
}

impl RunOutcome {
    pub(crate) fn is_success(self) -> bool {
        self == RunOutcome::Exited(0)
    }
}

/// Progress notifications from a run, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RunEvent {
    Started { id: RunId, pid: u32 },
    Output { id: RunId, text: String },
    Finished { id: RunId, outcome: RunOutcome },
    Failed { id: RunId, message: String },
}

impl RunEvent {
    pub(crate) fn id(&self) -> RunId {
        match self {
            RunEvent::Started { id, .. }
            | RunEvent::Output { id, .. }
            | RunEvent::Finished { id, .. }
            | RunEvent::Failed { id, .. } => *id,
        }
    }
}

/// Destination for run events.  Called from the runner's worker threads.
pub(crate) trait EventSink: Send + Sync + 'static {
    fn send(&self, event: RunEvent);
}

impl EventSink for mpsc::Sender<RunEvent> {
    fn send(&self, event: RunEvent) {
        // The receiver going away just means nobody is listening any more.
        let _ = mpsc::Sender::send(self, event);
    }
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Book-keeping for the run that was started last.
struct ActiveRun {
    id: RunId,
    child: Arc<Mutex<ProcessTree>>,
    stopped: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
}

/// Owns at most one live child process.
#[derive(Default)]
pub(crate) struct ProcessRunner {
    next_id: u64,
    active: Option<ActiveRun>,
}

impl ProcessRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// `true` while the last started child has not been reaped yet.
    pub(crate) fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| !run.done.load(Ordering::Acquire))
    }

    /// Id of the run whose events the UI should still accept.
    pub(crate) fn current(&self) -> Option<RunId> {
        self.active.as_ref().map(|run| run.id)
    }

    /// Write `source` to a temp file and execute it with the tool for
    /// `language`.
    ///
    /// Returns immediately; progress arrives through `sink`.  The temp file
    /// is deleted once the run has finished.
    pub(crate) fn start<S: EventSink>(
        &mut self,
        language: ScriptLanguage,
        source: &str,
        settings: &Settings,
        sink: S,
    ) -> Result<RunId> {
        if self.is_running() {
            return Err(AppError::AlreadyRunning);
        }
        let script = write_script(language, source)?;
        let command = language.command(settings, &script);
        self.launch(command, Some(script), sink)
    }

    /// Spawn `command` with stdout and stderr merged into one pipe.
    ///
    /// `keep_alive` is dropped by the waiter thread after the child exits.
    fn launch<S: EventSink, K: Send + 'static>(
        &mut self,
        command: ToolCommand,
        keep_alive: Option<K>,
        sink: S,
    ) -> Result<RunId> {
        if self.is_running() {
            return Err(AppError::AlreadyRunning);
        }

        // One pipe, two write ends: the child's stdout and stderr interleave
        // exactly as the child writes them.
        let (reader, writer) = os_pipe::pipe()?;
        let writer_err = writer.try_clone()?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }
        tree::isolate(&mut cmd);

        let spawned = cmd.spawn();
        // `Command` still owns our copies of the write ends; the reader only
        // sees EOF once they are closed.
        drop(cmd);
        let child = spawned.map_err(|source| {
            tracing::warn!(program = %command.program, error = %source, "cannot start script tool");
            AppError::Spawn { program: command.program.clone(), source }
        })?;

        self.next_id += 1;
        let id = RunId(self.next_id);
        let pid = child.id();
        tracing::info!(run = %id, program = %command.program, pid, "script started");

        let sink = Arc::new(sink);
        let child = Arc::new(Mutex::new(ProcessTree::new(child)));
        let stopped = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));

        sink.send(RunEvent::Started { id, pid });

        let reader_thread = thread::Builder::new().name("script-output".into()).spawn({
            let sink = Arc::clone(&sink);
            move || pump_output(id, reader, &*sink)
        })?;

        thread::Builder::new().name("script-wait".into()).spawn({
            let child = Arc::clone(&child);
            let stopped = Arc::clone(&stopped);
            let done = Arc::clone(&done);
            move || {
                wait_for_exit(id, &child, &stopped, reader_thread, &*sink, &done);
                drop(keep_alive);
            }
        })?;

        self.active = Some(ActiveRun { id, child, stopped, done });
        Ok(id)
    }

    /// Kill the running child and everything it started, if any.  Returns
    /// `true` when a live process was stopped.
    pub(crate) fn stop(&mut self) -> bool {
        let Some(run) = self.active.as_ref() else {
            return false;
        };
        if run.done.load(Ordering::Acquire) {
            return false;
        }
        // Hold the lock across check + kill + flag so the waiter cannot
        // observe the exit before `stopped` is set.
        let mut child = run.child.lock();
        // Killing an already reaped child "succeeds"; that run ended on its
        // own and keeps its exit code.
        match child.try_wait() {
            Ok(None) => {}
            Ok(Some(status)) => {
                tracing::debug!(run = %run.id, %status, "stop: script already exited");
                return false;
            }
            Err(e) => {
                tracing::debug!(run = %run.id, error = %e, "stop: cannot query script");
                return false;
            }
        }
        match child.kill() {
            Ok(()) => {
                run.stopped.store(true, Ordering::Release);
                tracing::info!(run = %run.id, "script stopped");
                true
            }
            Err(e) => {
                tracing::warn!(run = %run.id, error = %e, "cannot stop script");
                false
            }
        }
    }

    /// Acknowledge the end of run `id`.  Later events for it are stale.
    pub(crate) fn finish(&mut self, id: RunId) -> bool {
        if self.current() == Some(id) {
            self.active = None;
            true
        } else {
            false
        }
    }
}

impl Drop for ProcessRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Worker threads ────────────────────────────────────────────────────────────

/// Write the script source to a fresh `script*.<ext>` temp file.
fn write_script(language: ScriptLanguage, source: &str) -> Result<tempfile::TempPath> {
    let suffix = format!(".{}", language.script_extension());
    let mut file = tempfile::Builder::new()
        .prefix("script")
        .suffix(&suffix)
        .tempfile()?;
    file.write_all(source.as_bytes())?;
    file.flush()?;
    // Close our handle; the path is removed when the `TempPath` drops.
    Ok(file.into_temp_path())
}

fn pump_output<S: EventSink>(id: RunId, mut reader: os_pipe::PipeReader, sink: &S) {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut utf8 = Utf8Stream::default();
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let text = utf8.decode(&buf[..n]);
                if !text.is_empty() {
                    sink.send(RunEvent::Output { id, text });
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(run = %id, error = %e, "output pipe closed");
                break;
            }
        }
    }
    let text = utf8.finish();
    if !text.is_empty() {
        sink.send(RunEvent::Output { id, text });
    }
}

fn wait_for_exit<S: EventSink>(
    id: RunId,
    child: &Mutex<ProcessTree>,
    stopped: &AtomicBool,
    reader: thread::JoinHandle<()>,
    sink: &S,
    done: &AtomicBool,
) {
    let status = loop {
        // Release the lock between polls so `stop` can get in.
        let polled = child.lock().try_wait();
        match polled {
            Ok(Some(status)) => break status,
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                tracing::warn!(run = %id, error = %e, "cannot wait for script");
                done.store(true, Ordering::Release);
                sink.send(RunEvent::Failed { id, message: e.to_string() });
                return;
            }
        }
    };

    let was_stopped = stopped.load(Ordering::Acquire);
    if was_stopped {
        let deadline = Instant::now() + STOP_GRACE;
        while !reader.is_finished() && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        if reader.is_finished() {
            let _ = reader.join();
        }
    } else {
        let _ = reader.join();
    }

    let outcome = if was_stopped {
        RunOutcome::Stopped
    } else {
        status.code().map_or(RunOutcome::Signalled, RunOutcome::Exited)
    };
    tracing::info!(run = %id, ?outcome, "script finished");
    done.store(true, Ordering::Release);
    sink.send(RunEvent::Finished { id, outcome });
}

// ── Tests ─────────────────────────────────────────────────────────────────────
