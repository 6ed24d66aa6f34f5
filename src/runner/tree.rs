// ── Process tree ──────────────────────────────────────────────────────────────
//
// The script tools are launchers: `kotlinc.bat` runs under `cmd`, which starts
// `java`; `swift` forks the frontend.  Stop has to reach all of them, not just
// the direct child, or the script keeps running (and holding the output pipe)
// after the UI says "Stopped".
//
//   • unix    — the child leads a fresh process group; kill signals the group.
//   • windows — the child is assigned to a kill-on-close Job object; kill
//               terminates the job.

use std::process::{Child, Command, ExitStatus};

use crate::error::Result;

/// Arrange for the child about to be spawned to be reachable as a tree.
pub(super) fn isolate(cmd: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = cmd;
}

/// A spawned child together with the handle on everything it starts.
pub(super) struct ProcessTree {
    child: Child,
    #[cfg(windows)]
    job: Option<crate::platform::win32::job::Job>,
}

impl ProcessTree {
    pub(super) fn new(child: Child) -> Self {
        #[cfg(windows)]
        let job = match crate::platform::win32::job::Job::adopt(&child) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::debug!(error = %e, "no job object; stop reaches the direct child only");
                None
            }
        };
        Self {
            child,
            #[cfg(windows)]
            job,
        }
    }

    pub(super) fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Kill the child and its descendants.
    pub(super) fn kill(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            use nix::{
                errno::Errno,
                sys::signal::{killpg, Signal},
                unistd::Pid,
            };
            let pgid = i32::try_from(self.child.id()).map_err(std::io::Error::other)?;
            match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                // ESRCH: every member has exited already.
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => return Err(std::io::Error::from(e).into()),
            }
        }
        #[cfg(windows)]
        {
            if let Some(job) = &self.job {
                job.terminate()?;
            }
        }
        // Also covers a child that could not be put in a job.
        self.child.kill()?;
        Ok(())
    }
}
