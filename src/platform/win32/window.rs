// ── Main window ───────────────────────────────────────────────────────────────
//
// Responsibilities in this file (unsafe confined here):
//   • Register the main window class, create the window, menus and controls.
//   • Run the Win32 message loop (with keyboard accelerators).
//   • Own `WindowState` through GWLP_USERDATA and route WM_* into it.
//   • Bridge runner worker threads onto the UI thread (`WindowNotifier`).
//   • Expose a safe error-dialog helper for use by main().
//
// Re-entrancy: Scintilla sends WM_NOTIFY synchronously while we are inside a
// handler (e.g. `set_text` fires SCN_MODIFIED).  `WindowState` lives in a
// `RefCell`; a nested message that finds it borrowed gets default handling,
// which is exactly what a programmatic edit wants.

#![allow(unsafe_code)]

use std::{
    cell::{Cell, RefCell},
    ffi::c_void,
    path::Path,
    sync::mpsc,
    time::Instant,
};

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{BOOL, COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, RECT, TRUE, WPARAM},
        Graphics::Gdi::{
            CreateSolidBrush, DeleteObject, FillRect, GetStockObject, InvalidateRect, SetBkColor,
            SetTextColor, UpdateWindow, DEFAULT_GUI_FONT, HBRUSH, HDC,
        },
        System::LibraryLoader::GetModuleHandleW,
        UI::{
            Controls::NMHDR,
            Input::KeyboardAndMouse::{EnableWindow, VK_F5},
            WindowsAndMessaging::{
                AppendMenuW, CheckMenuItem, CreateAcceleratorTableW, CreateMenu, CreateWindowExW,
                DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect, GetMenu,
                GetMessageW, GetWindowLongPtrW, KillTimer, LoadCursorW, LoadIconW, MessageBoxW,
                MoveWindow, PostMessageW, PostQuitMessage, RegisterClassExW, SendMessageW,
                SetMenu, SetTimer, SetWindowLongPtrW, SetWindowTextW, ShowWindow,
                TranslateAcceleratorW, TranslateMessage, ACCEL, BN_CLICKED, BS_PUSHBUTTON,
                CBN_SELCHANGE, CBS_DROPDOWNLIST, CB_ADDSTRING, CB_GETCURSEL, CB_SETCURSEL,
                CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, FCONTROL, FSHIFT, FVIRTKEY,
                GWLP_USERDATA, HACCEL, HMENU, IDCANCEL, IDC_ARROW, IDI_APPLICATION, IDYES,
                MB_ICONERROR, MB_ICONWARNING, MB_OK, MB_YESNOCANCEL, MESSAGEBOX_RESULT,
                MESSAGEBOX_STYLE, MF_CHECKED, MF_POPUP, MF_SEPARATOR, MF_STRING, MF_UNCHECKED,
                MSG, SW_SHOW, WINDOW_EX_STYLE, WINDOW_STYLE, WM_APP, WM_CLOSE, WM_COMMAND,
                WM_CTLCOLORSTATIC, WM_DESTROY, WM_DPICHANGED, WM_ERASEBKGND, WM_NCDESTROY,
                WM_NOTIFY, WM_SETFONT, WM_SIZE, WM_TIMER, WNDCLASSEXW, WS_CHILD,
                WS_CLIPCHILDREN, WS_OVERLAPPEDWINDOW, WS_TABSTOP, WS_VISIBLE, WS_VSCROLL,
            },
        },
    },
};

use super::{dialogs, dpi};
use crate::{
    app::{App, OutputUpdate, RunStatus},
    editor::{
        self,
        scintilla::{
            messages::{
                SCNotification, SCN_INDICATORRELEASE, SCN_MODIFIED, SCN_UPDATEUI, SC_MOD_DELETETEXT,
                SC_MOD_INSERTTEXT, SC_UPDATE_SELECTION,
            },
            SciDll, ScintillaView,
        },
        Indicator,
    },
    error::{AppError, Result},
    languages::ScriptLanguage,
    locate::FlashToken,
    runner::{EventSink, RunEvent},
    settings::{self, Settings},
    theme,
};

// ── Window identity ───────────────────────────────────────────────────────────

/// Atom name used to register (and later find) the main window class.
const CLASS_NAME: PCWSTR = w!("ScriptpadMainWindow");

/// Initial window size in physical pixels.
const DEFAULT_WIDTH: i32 = 1100;
const DEFAULT_HEIGHT: i32 = 700;

// ── Command and control IDs ───────────────────────────────────────────────────

const IDM_FILE_NEW: usize = 1001;
const IDM_FILE_OPEN: usize = 1002;
const IDM_FILE_SAVE: usize = 1003;
const IDM_FILE_SAVE_AS: usize = 1004;
const IDM_FILE_EXIT: usize = 1005;
const IDM_RUN_RUN: usize = 2001;
const IDM_RUN_STOP: usize = 2002;
const IDM_VIEW_DARK: usize = 3001;
const IDM_HELP_ABOUT: usize = 9001;

const IDC_LANGUAGE: usize = 100;
const IDC_RUN: usize = 101;
const IDC_STOP: usize = 102;
const IDC_STATUS: usize = 103;
const IDC_EXIT: usize = 104;
const IDC_EDITOR: usize = 110;
const IDC_OUTPUT: usize = 111;

// ── Timers and private messages ───────────────────────────────────────────────

/// Re-armed on every edit; repaints keywords when it finally fires.
const TIMER_HIGHLIGHT: usize = 1;
/// Removes the error underline.
const TIMER_FLASH: usize = 2;
/// Retries a run-event drain that arrived while the state was busy.
const TIMER_DRAIN: usize = 3;

/// Posted by `WindowNotifier` after queueing a `RunEvent`.
const WM_RUN_EVENT: u32 = WM_APP + 1;

// ── Public API ────────────────────────────────────────────────────────────────

/// Register the main window class, create the window, and drive the message
/// loop until the user closes the application.
pub(crate) fn run(settings: Settings) -> Result<()> {
    #[cfg(debug_assertions)]
    let t0 = Instant::now();

    dpi::init();

    // SAFETY: GetModuleHandleW(null) returns the .exe's own HMODULE, which is
    // valid for the process lifetime.
    let hmodule = unsafe { GetModuleHandleW(PCWSTR::null()) }?;
    let hinstance = HINSTANCE(hmodule.0);

    register_class(hinstance)?;
    let hwnd = create_window(hinstance)?;

    let sci_dll = match SciDll::load() {
        Ok(dll) => dll,
        Err(e) => {
            // SAFETY: hwnd was just created on this thread and has no state yet.
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(e);
        }
    };
    let children = match create_children(hwnd, hinstance, &sci_dll) {
        Ok(children) => children,
        Err(e) => {
            // SAFETY: as above.  Any Scintilla children die with the parent
            // before `sci_dll` is released at the end of this scope.
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(e);
        }
    };
    let state = WindowState::new(hwnd, settings, children, sci_dll);

    let shell = Box::new(Shell { state: RefCell::new(state), labels: Cell::default() });
    {
        let st = shell.state.borrow();
        st.repaint_labels(&shell.labels);
        st.refresh_all();
    }
    // SAFETY: ownership of the box moves into the window; it is reclaimed
    // exactly once in WM_NCDESTROY.
    unsafe {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, Box::into_raw(shell) as isize);
    }
    layout_children(hwnd);

    // SAFETY: hwnd is valid.  Return values (previous visibility, success
    // BOOL) are intentionally ignored.
    unsafe {
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = UpdateWindow(hwnd);
    }

    #[cfg(debug_assertions)]
    tracing::debug!(elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0, "window visible");

    message_loop(hwnd)
}

/// Show a modal error dialog with the given message.
///
/// Safe to call from any context; performs the UTF-16 conversion internally.
/// Used by `main()` when `run()` returns an error.
pub(crate) fn show_error_dialog(message: &str) {
    message_box(HWND::default(), message, "Scriptpad \u{2014} Fatal Error", MB_OK | MB_ICONERROR);
}

// ── Run-event bridge ──────────────────────────────────────────────────────────

/// `EventSink` handed to the runner: queues the event and wakes the UI
/// thread with `WM_RUN_EVENT`.
#[derive(Clone)]
struct WindowNotifier {
    tx: mpsc::Sender<RunEvent>,
    /// `HWND` is not `Send`; the raw value is.
    hwnd: isize,
}

impl EventSink for WindowNotifier {
    fn send(&self, event: RunEvent) {
        if self.tx.send(event).is_err() {
            return;
        }
        // SAFETY: PostMessageW may be called from any thread.  If the window
        // is already gone the call fails harmlessly.
        unsafe {
            let _ = PostMessageW(HWND(self.hwnd as *mut c_void), WM_RUN_EVENT, WPARAM(0), LPARAM(0));
        }
    }
}

// ── Window state ──────────────────────────────────────────────────────────────

/// Heap object stored in GWLP_USERDATA.
struct Shell {
    state: RefCell<WindowState>,
    /// Read by WM_CTLCOLORSTATIC / WM_ERASEBKGND, which can arrive while
    /// `state` is borrowed (e.g. behind a modal dialog).
    labels: Cell<LabelPaint>,
}

/// Colours for the toolbar strip.
#[derive(Clone, Copy, Default)]
struct LabelPaint {
    brush: HBRUSH,
    back: u32,
    text: u32,
    exit_text: u32,
    exit_label: HWND,
}

struct Controls {
    language: HWND,
    run: HWND,
    stop: HWND,
    status: HWND,
    exit: HWND,
}

/// Everything the WndProc needs.  Field order is drop order: see the
/// ownership notes in `editor::scintilla`.
struct WindowState {
    app: App,
    hwnd: HWND,
    controls: Controls,
    events: mpsc::Receiver<RunEvent>,
    notifier: WindowNotifier,
    /// Cleanup token of the underline currently shown in the editor.
    flash_token: Option<FlashToken>,
    editor: ScintillaView,
    output: ScintillaView,
    _sci_dll: SciDll,
}

impl WindowState {
    fn new(hwnd: HWND, settings: Settings, children: Children, sci_dll: SciDll) -> Self {
        let Children { controls, editor, output } = children;
        editor.show_line_numbers(4);
        editor.notify_text_changes();
        output.set_word_wrap();
        output.set_read_only(true);

        let app = App::new(settings);
        for language in ScriptLanguage::ALL {
            let name = to_wide(language.display_name());
            // SAFETY: the combo box is valid; name outlives the call.
            unsafe {
                SendMessageW(controls.language, CB_ADDSTRING, WPARAM(0), LPARAM(name.as_ptr() as isize));
            }
        }
        // SAFETY: as above; CB_SETCURSEL takes a plain index.
        unsafe {
            SendMessageW(controls.language, CB_SETCURSEL, WPARAM(app.language().index()), LPARAM(0));
        }

        let (tx, events) = mpsc::channel();
        let notifier = WindowNotifier { tx, hwnd: hwnd.0 as isize };
        Self {
            app,
            hwnd,
            controls,
            events,
            notifier,
            flash_token: None,
            editor,
            output,
            _sci_dll: sci_dll,
        }
    }

    /// Recompute the toolbar colours for the current theme and exit tone,
    /// replacing (and deleting) the previous background brush.
    fn repaint_labels(&self, labels: &Cell<LabelPaint>) {
        let p = theme::palette(self.app.settings.dark_mode);
        let old = labels.get().brush;
        // SAFETY: CreateSolidBrush has no preconditions.
        let brush = unsafe { CreateSolidBrush(COLORREF(p.chrome)) };
        labels.set(LabelPaint {
            brush,
            back: p.chrome,
            text: p.fg,
            exit_text: p.exit_colour(self.app.exit_tone()),
            exit_label: self.controls.exit,
        });
        if !old.is_invalid() {
            // SAFETY: old came from CreateSolidBrush above and is only handed
            // out from WM_CTLCOLORSTATIC, never selected into a DC by us.
            unsafe {
                let _ = DeleteObject(old);
            }
        }
    }

    // ── Refresh helpers ───────────────────────────────────────────────────────

    fn refresh_all(&self) {
        theme::apply_theme(&self.editor, &self.app.settings);
        theme::apply_theme(&self.output, &self.app.settings);
        self.refresh_title();
        self.refresh_run_controls();
        self.repaint_keywords();
        let check = if self.app.settings.dark_mode { MF_CHECKED } else { MF_UNCHECKED };
        // SAFETY: hwnd is valid; GetMenu returns the bar attached in
        // create_window.
        unsafe {
            CheckMenuItem(GetMenu(self.hwnd), IDM_VIEW_DARK as u32, check.0);
        }
    }

    fn refresh_title(&self) {
        set_text(self.hwnd, &self.app.window_title());
    }

    fn refresh_run_controls(&self) {
        set_text(self.controls.status, self.app.status_text());
        set_text(self.controls.exit, &self.app.exit_text());
        let running = self.app.status == RunStatus::Running;
        // SAFETY: both buttons are valid children; InvalidateRect forces the
        // exit label to repaint in its new colour.
        unsafe {
            let _ = EnableWindow(self.controls.run, BOOL::from(!running));
            let _ = EnableWindow(self.controls.stop, BOOL::from(running));
            let _ = InvalidateRect(self.controls.exit, None, TRUE);
        }
    }

    fn repaint_keywords(&self) {
        let text = self.editor.get_text();
        editor::paint_keywords(&self.editor, &self.app.highlighter.spans(&text));
    }

    fn clear_error_underline(&self) {
        self.editor.clear_indicator(Indicator::ErrorLine.slot(), 0..self.editor.doc_len());
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Handle a menu, accelerator or control command.  Returns `false` for
    /// commands that are not ours.
    fn on_command(&mut self, id: usize, code: u32, labels: &Cell<LabelPaint>) -> bool {
        match id {
            IDM_FILE_NEW => {
                if self.confirm_discard() {
                    self.load_document(None, "");
                }
            }
            IDM_FILE_OPEN => self.open(),
            IDM_FILE_SAVE => {
                self.save(false);
            }
            IDM_FILE_SAVE_AS => {
                self.save(true);
            }
            IDM_FILE_EXIT => {
                // SAFETY: hwnd is valid; WM_CLOSE goes through the normal
                // close path (discard prompt, settings save).
                unsafe {
                    let _ = PostMessageW(self.hwnd, WM_CLOSE, WPARAM(0), LPARAM(0));
                }
            }
            IDM_RUN_RUN => self.run_script(labels),
            IDM_RUN_STOP => self.stop_script(labels),
            IDC_RUN if code == BN_CLICKED => self.run_script(labels),
            IDC_STOP if code == BN_CLICKED => self.stop_script(labels),
            IDC_LANGUAGE if code == CBN_SELCHANGE => self.on_language_selected(),
            IDM_VIEW_DARK => {
                self.app.settings.dark_mode = !self.app.settings.dark_mode;
                self.repaint_labels(labels);
                self.refresh_all();
                // SAFETY: hwnd valid; repaint the toolbar strip.
                unsafe {
                    let _ = InvalidateRect(self.hwnd, None, TRUE);
                }
            }
            IDM_HELP_ABOUT => about_dialog(self.hwnd),
            _ => return false,
        }
        true
    }

    fn on_language_selected(&mut self) {
        // SAFETY: the combo box is valid; CB_GETCURSEL is a read-only query.
        let index = unsafe { SendMessageW(self.controls.language, CB_GETCURSEL, WPARAM(0), LPARAM(0)).0 };
        let Some(language) = usize::try_from(index).ok().and_then(ScriptLanguage::from_index) else {
            return;
        };
        if self.app.set_language(language) {
            tracing::debug!(%language, "language changed");
            self.repaint_keywords();
        }
    }

    fn run_script(&mut self, labels: &Cell<LabelPaint>) {
        let source = self.editor.get_text();
        if let Err(e) = self.app.run(&source, self.notifier.clone()) {
            let update = self.app.start_failed(&e);
            self.apply_update(update);
        }
        self.repaint_labels(labels);
        self.refresh_run_controls();
    }

    fn stop_script(&mut self, labels: &Cell<LabelPaint>) {
        if self.app.stop() {
            self.repaint_labels(labels);
            self.refresh_run_controls();
        }
    }

    // ── Run events ────────────────────────────────────────────────────────────

    fn drain_run_events(&mut self, labels: &Cell<LabelPaint>) {
        while let Ok(event) = self.events.try_recv() {
            let update = self.app.on_run_event(event);
            let done = matches!(update, OutputUpdate::Done { .. })
                || self.app.runner.current().is_none();
            self.apply_update(update);
            if done {
                self.repaint_labels(labels);
                self.refresh_run_controls();
            }
        }
    }

    fn apply_update(&self, update: OutputUpdate) {
        match update {
            OutputUpdate::Ignore => {}
            OutputUpdate::Reset => editor::clear_output(&self.output),
            OutputUpdate::Append { text, links } => {
                editor::append_output(&self.output, &text);
                for link in links {
                    self.output.fill_indicator(Indicator::Link.slot(), link.range);
                }
            }
            OutputUpdate::Replace { text, links } => {
                editor::clear_output(&self.output);
                self.apply_update(OutputUpdate::Append { text, links });
            }
            OutputUpdate::Notice { message } => {
                message_box(self.hwnd, &message, "Scriptpad", MB_OK | MB_ICONWARNING);
            }
            OutputUpdate::Done { links } => {
                for link in links {
                    self.output.fill_indicator(Indicator::Link.slot(), link.range);
                }
            }
        }
    }

    // ── Scintilla notifications ───────────────────────────────────────────────

    fn on_notify(&mut self, n: &SCNotification) {
        match (n.nmhdr.idFrom, n.nmhdr.code) {
            (IDC_EDITOR, SCN_MODIFIED)
                if n.modification_type & (SC_MOD_INSERTTEXT | SC_MOD_DELETETEXT) != 0 =>
            {
                self.on_editor_changed();
            }
            (IDC_EDITOR, SCN_UPDATEUI) if n.updated & SC_UPDATE_SELECTION != 0 => {
                if self.app.caret_moved(self.editor.current_pos()).is_some() {
                    self.flash_token = None;
                    self.clear_error_underline();
                }
            }
            (IDC_OUTPUT, SCN_INDICATORRELEASE) => {
                if let Ok(pos) = usize::try_from(n.position) {
                    self.jump_to_error(pos);
                }
            }
            _ => {}
        }
    }

    fn on_editor_changed(&mut self) {
        if !self.app.doc.dirty {
            self.app.doc.dirty = true;
            self.refresh_title();
        }
        if self.app.clear_error().is_some() {
            self.flash_token = None;
            self.clear_error_underline();
        }
        self.app.debounce.touch(Instant::now());
        let delay = self.app.debounce.delay().as_millis().try_into().unwrap_or(u32::MAX);
        // SAFETY: hwnd is valid; re-arming an existing timer id resets it.
        unsafe {
            SetTimer(self.hwnd, TIMER_HIGHLIGHT, delay, None);
        }
    }

    fn jump_to_error(&mut self, pos: usize) {
        let source = self.editor.get_text();
        let Some(loc) = self.app.error_target(pos, &source) else {
            return;
        };
        let (token, previous) = self.app.show_error(&loc);
        self.flash_token = Some(token);
        if previous.is_some() {
            self.clear_error_underline();
        }
        editor::jump_to(&self.editor, loc.caret, loc.line_range());
        // SAFETY: hwnd valid; the timer is killed when it fires.
        unsafe {
            SetTimer(self.hwnd, TIMER_FLASH, self.app.settings.error_flash_ms, None);
        }
    }

    fn on_timer(&mut self, id: usize, labels: &Cell<LabelPaint>) {
        match id {
            TIMER_HIGHLIGHT => {
                if self.app.debounce.due(Instant::now()) {
                    self.repaint_keywords();
                }
                if !self.app.debounce.is_pending() {
                    // SAFETY: hwnd valid; the timer id was set by us.
                    unsafe {
                        let _ = KillTimer(self.hwnd, TIMER_HIGHLIGHT);
                    }
                }
            }
            TIMER_FLASH => {
                // SAFETY: as above.
                unsafe {
                    let _ = KillTimer(self.hwnd, TIMER_FLASH);
                }
                if let Some(token) = self.flash_token.take() {
                    if self.app.flash.expire(token).is_some() {
                        self.clear_error_underline();
                    }
                }
            }
            TIMER_DRAIN => {
                // SAFETY: as above.
                unsafe {
                    let _ = KillTimer(self.hwnd, TIMER_DRAIN);
                }
                self.drain_run_events(labels);
            }
            _ => {}
        }
    }

    // ── Files ─────────────────────────────────────────────────────────────────

    /// Put `text` into the editor as a clean document.
    fn load_document(&mut self, path: Option<&Path>, text: &str) {
        if path.is_none() {
            self.app.new_document();
        }
        // Fires SCN_MODIFIED while we hold the state borrow; it is dropped.
        self.editor.set_text(text);
        self.editor.set_save_point();
        self.editor.empty_undo_buffer();
        self.app.debounce.cancel();
        // SAFETY: combo box valid; plain index.
        unsafe {
            SendMessageW(self.controls.language, CB_SETCURSEL, WPARAM(self.app.language().index()), LPARAM(0));
        }
        self.refresh_title();
        self.repaint_keywords();
    }

    fn open(&mut self) {
        if !self.confirm_discard() {
            return;
        }
        let Some(path) = dialogs::show_open_dialog(self.hwnd) else {
            return;
        };
        match std::fs::read(&path) {
            Ok(bytes) => {
                tracing::info!(path = %path.display(), bytes = bytes.len(), "script opened");
                let text = self.app.open_file(path.clone(), &bytes);
                self.load_document(Some(&path), &text);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot open script");
                let msg = format!("Cannot open {}:\n{e}", path.display());
                message_box(self.hwnd, &msg, "Scriptpad", MB_OK | MB_ICONERROR);
            }
        }
    }

    /// Save to the current path, or ask for one.  Returns `false` if the
    /// user cancelled or the write failed.
    fn save(&mut self, save_as: bool) -> bool {
        let path = match (&self.app.doc.path, save_as) {
            (Some(path), false) => path.clone(),
            _ => {
                let name = self
                    .app
                    .doc
                    .path
                    .as_deref()
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("script.{}", self.app.language().script_extension()));
                match dialogs::show_save_dialog(self.hwnd, &name, self.app.language()) {
                    Some(path) => path,
                    None => return false,
                }
            }
        };
        let text = self.editor.get_text();
        match self.app.save(path.clone(), text.as_bytes()) {
            Ok(()) => {
                self.editor.set_save_point();
                self.refresh_title();
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot save script");
                let msg = format!("Cannot save {}:\n{e}", path.display());
                message_box(self.hwnd, &msg, "Scriptpad", MB_OK | MB_ICONERROR);
                false
            }
        }
    }

    /// Offer to save unsaved changes.  Returns `true` if it is fine to drop
    /// the current buffer.
    fn confirm_discard(&mut self) -> bool {
        if !self.app.doc.dirty {
            return true;
        }
        let name = self
            .app
            .doc
            .path
            .as_deref()
            .and_then(Path::file_name)
            .map_or_else(|| "Untitled".to_owned(), |n| n.to_string_lossy().into_owned());
        let answer = message_box(
            self.hwnd,
            &format!("Save changes to {name}?"),
            "Scriptpad",
            MB_YESNOCANCEL | MB_ICONWARNING,
        );
        match answer {
            IDYES => self.save(false),
            IDCANCEL => false,
            _ => true,
        }
    }

    /// Stop the script and persist settings.  Called once from WM_CLOSE.
    fn shutdown(&mut self) {
        if self.app.stop() {
            tracing::info!("script stopped on exit");
        }
        if let Err(e) = settings::save(&self.app.settings) {
            tracing::warn!(error = %e, "cannot save settings");
        }
    }

    // ── Layout ────────────────────────────────────────────────────────────────

    fn layout(&self, width: i32, height: i32, dpi: u32) {
        let l = Layout::compute(width, height, dpi);
        let place = |hwnd: HWND, r: Rect| {
            // SAFETY: hwnd is one of our live child windows.
            unsafe {
                let _ = MoveWindow(hwnd, r.x, r.y, r.w, r.h, TRUE);
            }
        };
        place(self.controls.language, l.language);
        place(self.controls.run, l.run);
        place(self.controls.stop, l.stop);
        place(self.controls.status, l.status);
        place(self.controls.exit, l.exit);
        place(self.editor.hwnd(), l.editor);
        place(self.output.hwnd(), l.output);
    }
}

// ── Layout ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

/// Toolbar strip on top; editor left, output right below it.
#[derive(Debug)]
struct Layout {
    language: Rect,
    run: Rect,
    stop: Rect,
    status: Rect,
    exit: Rect,
    editor: Rect,
    output: Rect,
}

impl Layout {
    /// Sizes are defined at 96 DPI and scaled.
    fn compute(width: i32, height: i32, dpi: u32) -> Self {
        let s = |px| dpi::scale(px, dpi);
        let margin = s(6);
        let bar = s(26);
        let gap = s(6);

        let mut x = margin;
        let mut next = |w: i32, h: i32| {
            let r = Rect { x, y: margin, w, h };
            x += w + gap;
            r
        };
        // A drop-down list's height includes its open list.
        let language = next(s(110), s(200));
        let run = next(s(72), bar);
        let stop = next(s(72), bar);
        let status = next(s(110), bar);
        let exit = next(s(140), bar);

        let top = margin + bar + margin;
        let body_h = (height - top - margin).max(0);
        let body_w = (width - 2 * margin - gap).max(0);
        let editor_w = body_w * 3 / 5;
        let editor = Rect { x: margin, y: top, w: editor_w, h: body_h };
        let output = Rect { x: margin + editor_w + gap, y: top, w: body_w - editor_w, h: body_h };
        Self { language, run, stop, status, exit, editor, output }
    }
}

// ── Window class registration ─────────────────────────────────────────────────

fn register_class(hinstance: HINSTANCE) -> Result<()> {
    // SAFETY: LoadIconW with IDI_APPLICATION loads a built-in resource that
    // exists on all Windows versions.
    let icon = unsafe { LoadIconW(None, IDI_APPLICATION) }?;
    // SAFETY: LoadCursorW with IDC_ARROW loads a built-in resource.
    let cursor = unsafe { LoadCursorW(None, IDC_ARROW) }?;

    let wndclass = WNDCLASSEXW {
        // WNDCLASSEXW is ~80 bytes; the cast to u32 is always lossless.
        cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: Some(wnd_proc),
        cbClsExtra: 0,
        cbWndExtra: 0,
        hInstance: hinstance,
        hIcon: icon,
        hCursor: cursor,
        // Background is painted in WM_ERASEBKGND with the theme colour.
        hbrBackground: HBRUSH::default(),
        lpszMenuName: PCWSTR::null(),
        lpszClassName: CLASS_NAME,
        hIconSm: icon,
    };

    // SAFETY: wndclass is fully initialised with valid handles;
    // CLASS_NAME is a valid null-terminated UTF-16 string literal.
    let atom = unsafe { RegisterClassExW(&wndclass) };
    if atom == 0 {
        return Err(last_error("RegisterClassExW"));
    }
    Ok(())
}

// ── Window creation ───────────────────────────────────────────────────────────

fn create_window(hinstance: HINSTANCE) -> Result<HWND> {
    // SAFETY: CLASS_NAME was just registered; hinstance is the exe's module.
    // A null parent creates a top-level window; the menu is attached below.
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            CLASS_NAME,
            w!("Scriptpad"),
            WS_OVERLAPPEDWINDOW | WS_CLIPCHILDREN,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            DEFAULT_WIDTH,
            DEFAULT_HEIGHT,
            HWND::default(),
            HMENU::default(),
            hinstance,
            None,
        )
    }?;

    let menu = build_menu()?;
    // SAFETY: hwnd and menu are valid handles.
    unsafe { SetMenu(hwnd, menu) }?;
    Ok(hwnd)
}

/// Child windows created before `WindowState` takes ownership.
struct Children {
    controls: Controls,
    editor: ScintillaView,
    output: ScintillaView,
}

fn create_children(hwnd: HWND, hinstance: HINSTANCE, dll: &SciDll) -> Result<Children> {
    Ok(Children {
        controls: create_controls(hwnd, hinstance)?,
        editor: ScintillaView::create(hwnd, hinstance, IDC_EDITOR, dll)?,
        output: ScintillaView::create(hwnd, hinstance, IDC_OUTPUT, dll)?,
    })
}

fn create_controls(parent: HWND, hinstance: HINSTANCE) -> Result<Controls> {
    let child = |class: PCWSTR, text: PCWSTR, style: WINDOW_STYLE, id: usize| -> Result<HWND> {
        // SAFETY: class names are system classes; parent and hinstance are
        // valid; for a child window the HMENU slot carries the control id.
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(0),
                class,
                text,
                WS_CHILD | WS_VISIBLE | style,
                0, 0, 0, 0,
                parent,
                HMENU(id as *mut c_void),
                hinstance,
                None,
            )
        }?;
        // SAFETY: DEFAULT_GUI_FONT is a stock object that is never freed.
        unsafe {
            let font = GetStockObject(DEFAULT_GUI_FONT);
            SendMessageW(hwnd, WM_SETFONT, WPARAM(font.0 as usize), LPARAM(1));
        }
        Ok(hwnd)
    };

    // SS_CENTERIMAGE: vertically centre the label text.
    let label_style = WINDOW_STYLE(0x0200);
    Ok(Controls {
        language: child(
            w!("COMBOBOX"),
            PCWSTR::null(),
            WS_TABSTOP | WS_VSCROLL | WINDOW_STYLE(CBS_DROPDOWNLIST as u32),
            IDC_LANGUAGE,
        )?,
        run: child(w!("BUTTON"), w!("Run"), WS_TABSTOP | WINDOW_STYLE(BS_PUSHBUTTON as u32), IDC_RUN)?,
        stop: child(w!("BUTTON"), w!("Stop"), WS_TABSTOP | WINDOW_STYLE(BS_PUSHBUTTON as u32), IDC_STOP)?,
        status: child(w!("STATIC"), w!("Idle"), label_style, IDC_STATUS)?,
        exit: child(w!("STATIC"), w!("Exit Code: "), label_style, IDC_EXIT)?,
    })
}

// ── Menu construction ─────────────────────────────────────────────────────────

fn build_menu() -> Result<HMENU> {
    // SAFETY: CreateMenu has no preconditions; it always succeeds unless the
    // system is critically low on resources, in which case ? propagates the error.
    unsafe {
        let bar = CreateMenu()?;

        // ── File ──────────────────────────────────────────────────────────────
        let file = CreateMenu()?;
        AppendMenuW(file, MF_STRING, IDM_FILE_NEW, w!("&New\tCtrl+N"))?;
        AppendMenuW(file, MF_STRING, IDM_FILE_OPEN, w!("&Open…\tCtrl+O"))?;
        AppendMenuW(file, MF_STRING, IDM_FILE_SAVE, w!("&Save\tCtrl+S"))?;
        AppendMenuW(file, MF_STRING, IDM_FILE_SAVE_AS, w!("Save &As…\tCtrl+Shift+S"))?;
        AppendMenuW(file, MF_SEPARATOR, 0, PCWSTR::null())?;
        AppendMenuW(file, MF_STRING, IDM_FILE_EXIT, w!("E&xit\tAlt+F4"))?;

        // ── Run ───────────────────────────────────────────────────────────────
        let run = CreateMenu()?;
        AppendMenuW(run, MF_STRING, IDM_RUN_RUN, w!("&Run\tF5"))?;
        AppendMenuW(run, MF_STRING, IDM_RUN_STOP, w!("&Stop\tShift+F5"))?;

        // ── View ──────────────────────────────────────────────────────────────
        let view = CreateMenu()?;
        AppendMenuW(view, MF_STRING, IDM_VIEW_DARK, w!("&Dark Mode"))?;

        // ── Help ──────────────────────────────────────────────────────────────
        let help = CreateMenu()?;
        AppendMenuW(help, MF_STRING, IDM_HELP_ABOUT, w!("&About Scriptpad…"))?;

        // Attach drop-downs to the menu bar.
        // The uIDNewItem parameter for MF_POPUP is the child HMENU cast to usize.
        AppendMenuW(bar, MF_POPUP, file.0 as usize, w!("&File"))?;
        AppendMenuW(bar, MF_POPUP, run.0 as usize, w!("&Run"))?;
        AppendMenuW(bar, MF_POPUP, view.0 as usize, w!("&View"))?;
        AppendMenuW(bar, MF_POPUP, help.0 as usize, w!("&Help"))?;

        Ok(bar)
    }
}

fn build_accelerators() -> Result<HACCEL> {
    let ctrl = FVIRTKEY | FCONTROL;
    let table = [
        ACCEL { fVirt: ctrl, key: u16::from(b'N'), cmd: IDM_FILE_NEW as u16 },
        ACCEL { fVirt: ctrl, key: u16::from(b'O'), cmd: IDM_FILE_OPEN as u16 },
        ACCEL { fVirt: ctrl, key: u16::from(b'S'), cmd: IDM_FILE_SAVE as u16 },
        ACCEL { fVirt: ctrl | FSHIFT, key: u16::from(b'S'), cmd: IDM_FILE_SAVE_AS as u16 },
        ACCEL { fVirt: FVIRTKEY, key: VK_F5.0, cmd: IDM_RUN_RUN as u16 },
        ACCEL { fVirt: FVIRTKEY | FSHIFT, key: VK_F5.0, cmd: IDM_RUN_STOP as u16 },
    ];
    // SAFETY: table is a valid slice of ACCEL entries.
    Ok(unsafe { CreateAcceleratorTableW(&table) }?)
}

// ── Message loop ──────────────────────────────────────────────────────────────

fn message_loop(hwnd: HWND) -> Result<()> {
    let accel = build_accelerators()?;
    let mut msg = MSG::default();

    loop {
        // SAFETY: &mut msg is a valid MSG pointer; HWND::default() retrieves
        // messages for all windows on this thread; 0,0 filter accepts all.
        let ret = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };

        match ret.0 {
            // GetMessageW returns -1 on error.
            -1 => return Err(last_error("GetMessageW")),
            // Returns 0 when WM_QUIT is retrieved — exit the loop cleanly.
            0 => break,
            // SAFETY: msg was populated by a successful GetMessageW call.
            // Accelerator keys become WM_COMMAND for the main window and are
            // not dispatched further.
            _ => unsafe {
                if TranslateAcceleratorW(hwnd, accel, &msg) == 0 {
                    let _ = TranslateMessage(&msg);
                    let _ = DispatchMessageW(&msg);
                }
            },
        }
    }

    Ok(())
}

// ── Window procedure ──────────────────────────────────────────────────────────

/// The `Shell` stored in GWLP_USERDATA, if it has been attached yet.
///
/// # Safety
/// Must be called on the window's own thread, between attachment in `run`
/// and reclamation in WM_NCDESTROY.
unsafe fn shell<'a>(hwnd: HWND) -> Option<&'a Shell> {
    let ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const Shell;
    ptr.as_ref()
}

// SAFETY: wnd_proc is registered as lpfnWndProc in WNDCLASSEXW.
// Windows guarantees that hwnd, msg, wparam, and lparam are valid for the
// lifetime of this call; we must not store hwnd beyond the message handler.
unsafe extern "system" fn wnd_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let Some(shell) = shell(hwnd) else {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    };

    // Painting messages only need the colours.
    match msg {
        WM_CTLCOLORSTATIC => {
            let paint = shell.labels.get();
            let hdc = HDC(wparam.0 as *mut c_void);
            let text = if HWND(lparam.0 as *mut c_void) == paint.exit_label {
                paint.exit_text
            } else {
                paint.text
            };
            SetTextColor(hdc, COLORREF(text));
            SetBkColor(hdc, COLORREF(paint.back));
            return LRESULT(paint.brush.0 as isize);
        }
        WM_ERASEBKGND => {
            let paint = shell.labels.get();
            let mut rc = RECT::default();
            if GetClientRect(hwnd, &mut rc).is_ok() {
                FillRect(HDC(wparam.0 as *mut c_void), &rc, paint.brush);
            }
            return LRESULT(1);
        }
        WM_NCDESTROY => {
            // Reclaim the box; children are gone, so the DLL may be freed.
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
            let shell = Box::from_raw(shell as *const Shell as *mut Shell);
            let _ = DeleteObject(shell.labels.get().brush);
            drop(shell);
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }
        _ => {}
    }

    let Ok(mut st) = shell.state.try_borrow_mut() else {
        // Nested inside one of our own handlers (e.g. behind a modal dialog).
        // Run events stay queued; the drain timer keeps firing until the
        // state is free again.
        if msg == WM_RUN_EVENT {
            SetTimer(hwnd, TIMER_DRAIN, 50, None);
            return LRESULT(0);
        }
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    };

    match msg {
        // ── Lifecycle ─────────────────────────────────────────────────────────
        WM_CLOSE => {
            if st.confirm_discard() {
                st.shutdown();
                drop(st);
                // SAFETY: hwnd is the window being closed; DestroyWindow
                // triggers WM_DESTROY, which posts WM_QUIT.
                let _ = DestroyWindow(hwnd);
            }
            LRESULT(0)
        }

        WM_DESTROY => {
            // SAFETY: PostQuitMessage with exit code 0 is always safe to call
            // from WM_DESTROY. It posts WM_QUIT to the thread's message queue.
            PostQuitMessage(0);
            LRESULT(0)
        }

        // ── Layout ────────────────────────────────────────────────────────────
        WM_SIZE => {
            // lparam low word = new client width, high word = new client height.
            let width = (lparam.0 & 0xFFFF) as i32;
            let height = ((lparam.0 >> 16) & 0xFFFF) as i32;
            st.layout(width, height, dpi::get_for_window(hwnd));
            LRESULT(0)
        }

        WM_DPICHANGED => {
            // lparam points at the suggested new window rectangle; the
            // resulting WM_SIZE re-lays out the children at the new DPI.
            let r = &*(lparam.0 as *const RECT);
            drop(st);
            let _ = MoveWindow(hwnd, r.left, r.top, r.right - r.left, r.bottom - r.top, TRUE);
            LRESULT(0)
        }

        // ── Commands ──────────────────────────────────────────────────────────
        WM_COMMAND => {
            // Low word: command or control id; high word: notification code.
            let id = wparam.0 & 0xFFFF;
            let code = ((wparam.0 >> 16) & 0xFFFF) as u32;
            if st.on_command(id, code, &shell.labels) {
                LRESULT(0)
            } else {
                drop(st);
                DefWindowProcW(hwnd, msg, wparam, lparam)
            }
        }

        WM_NOTIFY => {
            // SAFETY: both Scintilla children send SCNotification in WM_NOTIFY;
            // the header check below ignores everything else.
            let hdr = &*(lparam.0 as *const NMHDR);
            if hdr.idFrom == IDC_EDITOR || hdr.idFrom == IDC_OUTPUT {
                st.on_notify(&*(lparam.0 as *const SCNotification));
            }
            LRESULT(0)
        }

        WM_TIMER => {
            st.on_timer(wparam.0, &shell.labels);
            LRESULT(0)
        }

        WM_RUN_EVENT => {
            st.drain_run_events(&shell.labels);
            LRESULT(0)
        }

        _ => {
            drop(st);
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
    }
}

/// Lay out children for the current client size.
fn layout_children(hwnd: HWND) {
    let mut rc = RECT::default();
    // SAFETY: hwnd is valid; rc is a valid out-pointer.  The shell was
    // attached just before this call.
    unsafe {
        if GetClientRect(hwnd, &mut rc).is_err() {
            return;
        }
        if let Some(shell) = shell(hwnd) {
            shell.state.borrow().layout(rc.right, rc.bottom, dpi::get_for_window(hwnd));
        }
    }
}

// ── Helper dialogs ────────────────────────────────────────────────────────────

/// Display the "About Scriptpad" information dialog.
fn about_dialog(hwnd: HWND) {
    let body = concat!(
        "Scriptpad 0.1.0\n\n",
        "Write Kotlin or Swift scripts and run them with kotlinc or swift.\n",
        "Click an error in the output to jump to it.\n\n",
        "Licensed under MIT OR Apache-2.0.",
    );
    message_box(hwnd, body, "About Scriptpad", MB_OK);
}

fn message_box(hwnd: HWND, text: &str, caption: &str, style: MESSAGEBOX_STYLE) -> MESSAGEBOX_RESULT {
    let text = to_wide(text);
    let caption = to_wide(caption);
    // SAFETY: both buffers are valid null-terminated UTF-16 strings that
    // remain allocated for the duration of the MessageBoxW call.
    unsafe { MessageBoxW(hwnd, PCWSTR(text.as_ptr()), PCWSTR(caption.as_ptr()), style) }
}

fn set_text(hwnd: HWND, text: &str) {
    let wide = to_wide(text);
    // SAFETY: hwnd is one of our windows; wide is null-terminated.
    unsafe {
        let _ = SetWindowTextW(hwnd, PCWSTR(wide.as_ptr()));
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

// ── Error helpers ─────────────────────────────────────────────────────────────

/// Capture the current Win32 last-error code and wrap it in an `AppError`.
///
/// Call immediately after a Win32 function that signals failure — `GetLastError`
/// reads thread-local state that can be overwritten by any subsequent API call.
fn last_error(function: &'static str) -> AppError {
    let e = windows::core::Error::from_win32();
    AppError::Win32 { function, code: e.code().0 as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_at_96_dpi() {
        let l = Layout::compute(1000, 600, 96);
        assert_eq!(l.language, Rect { x: 6, y: 6, w: 110, h: 200 });
        assert_eq!(l.run.x, 6 + 110 + 6);
        assert_eq!(l.editor.y, 6 + 26 + 6);
        assert_eq!(l.editor.h, 600 - 38 - 6);
        // Editor and output share the width with one gap between them.
        assert_eq!(l.editor.w + l.output.w, 1000 - 12 - 6);
        assert_eq!(l.output.x, l.editor.x + l.editor.w + 6);
    }

    #[test]
    fn layout_scales_with_dpi() {
        let l = Layout::compute(2000, 1200, 192);
        assert_eq!(l.run.w, 144);
        assert_eq!(l.editor.y, 76);
    }

    #[test]
    fn tiny_window_never_goes_negative() {
        let l = Layout::compute(5, 5, 96);
        assert!(l.editor.w >= 0 && l.editor.h >= 0);
        assert!(l.output.w >= 0);
    }

    #[test]
    fn wide_strings_are_nul_terminated() {
        assert_eq!(to_wide("ab"), [u16::from(b'a'), u16::from(b'b'), 0]);
    }
}
