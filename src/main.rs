// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except:
//   • `platform::win32`   – Win32 / WinAPI FFI
//   • `editor::scintilla` – Scintilla child-window hosting
// Each unsafe block in those modules MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

// Release builds run as a GUI application (no console window).
// Debug builds keep the console so that tracing output is visible.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Window-only parts of the UI state are unreachable on other targets.
#![cfg_attr(not(windows), allow(dead_code))]

mod app;
mod cli;
mod error;
mod headless;
mod highlight;
mod languages;
mod locate;
mod runner;
mod settings;

#[cfg(windows)]
mod editor;
#[cfg(windows)]
mod platform;
#[cfg(windows)]
mod theme;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    let settings = settings::load();

    match cli.command {
        Some(Command::Run { file, lang }) => {
            let mut stdout = std::io::stdout().lock();
            match headless::run_script(&file, lang.map(Into::into), settings, &mut stdout) {
                Ok(code) => std::process::exit(code),
                Err(e) => {
                    eprintln!("scriptpad: {e}");
                    std::process::exit(2);
                }
            }
        }
        None => open_window(settings),
    }
}

/// `--log-level` wins over `RUST_LOG`; the default is `info`.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(windows)]
fn open_window(settings: settings::Settings) {
    if let Err(e) = platform::win32::window::run(settings) {
        // Startup failed before or during the message loop.
        // Show a modal error dialog — the only safe output path in a GUI app.
        tracing::error!(error = %e, "editor window failed");
        platform::win32::window::show_error_dialog(&e.to_string());
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
fn open_window(_settings: settings::Settings) {
    eprintln!("scriptpad: {}", error::AppError::NoWindow);
    std::process::exit(2);
}
