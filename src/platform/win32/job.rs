// ── Job objects ───────────────────────────────────────────────────────────────
//
// A script run owns one anonymous Job object.  Every process the tool starts
// after assignment joins the job, so `terminate` ends the whole tree, and
// closing the last handle (KILL_ON_JOB_CLOSE) takes down any stragglers.

#![allow(unsafe_code)]

use std::{ffi::c_void, os::windows::io::AsRawHandle, process::Child};

use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{CloseHandle, HANDLE},
        System::JobObjects::{
            AssignProcessToJobObject, CreateJobObjectW, JobObjectExtendedLimitInformation,
            SetInformationJobObject, TerminateJobObject, JOBOBJECT_EXTENDED_LIMIT_INFORMATION,
            JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
        },
    },
};

use crate::error::Result;

/// Exit code reported for processes ended by `Job::terminate`.
const TERMINATED: u32 = 1;

pub(crate) struct Job(HANDLE);

// SAFETY: a job handle names a kernel object; any thread may use or close it.
unsafe impl Send for Job {}
// SAFETY: as above; `Job` exposes no interior mutability of its own.
unsafe impl Sync for Job {}

impl Job {
    /// Create a kill-on-close job and put `child` in it.
    pub(crate) fn adopt(child: &Child) -> Result<Self> {
        // SAFETY: default security attributes, anonymous job.
        let handle = unsafe { CreateJobObjectW(None, PCWSTR::null()) }?;
        // From here on `Drop` closes the handle on every error path.
        let job = Self(handle);

        let mut limits = JOBOBJECT_EXTENDED_LIMIT_INFORMATION::default();
        limits.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;
        // SAFETY: `limits` is a live JOBOBJECT_EXTENDED_LIMIT_INFORMATION and
        // the length passed is its exact size (~144 bytes, fits u32).
        unsafe {
            SetInformationJobObject(
                job.0,
                JobObjectExtendedLimitInformation,
                &limits as *const JOBOBJECT_EXTENDED_LIMIT_INFORMATION as *const c_void,
                std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
            )
        }?;

        // SAFETY: the process handle is owned by `child`, which outlives the
        // call; std opens it with full access, including PROCESS_SET_QUOTA
        // and PROCESS_TERMINATE.
        unsafe { AssignProcessToJobObject(job.0, HANDLE(child.as_raw_handle())) }?;
        Ok(job)
    }

    /// End every process in the job.
    pub(crate) fn terminate(&self) -> Result<()> {
        // SAFETY: self.0 is a valid job handle until `Drop`.
        unsafe { TerminateJobObject(self.0, TERMINATED) }?;
        Ok(())
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        // SAFETY: self.0 came from CreateJobObjectW and is closed only here.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}
