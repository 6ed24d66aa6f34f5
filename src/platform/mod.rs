// ── Platform abstraction layer ────────────────────────────────────────────────
//
// The editor window is the only OS-specific surface; the runner, locator and
// highlighter are portable.  No `unsafe` lives here; all Win32 FFI is
// confined to the `win32` sub-module and never leaks outward.

pub mod win32;
