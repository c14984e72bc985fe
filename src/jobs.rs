use crate::error::ShellError;
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::fmt;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitResult {
    Exited(i32),
    Signaled(i32),
}

impl Default for ExitResult {
    fn default() -> Self {
        ExitResult::Exited(0)
    }
}

impl fmt::Display for ExitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitResult::Exited(code) => write!(f, "exit value {}", code),
            ExitResult::Signaled(signal) => write!(f, "terminated by signal {}", signal),
        }
    }
}

impl ExitResult {
    /// Decodes a wait status. Returns `None` for statuses that do not mean the
    /// child is gone (still running, stopped, continued).
    pub fn from_wait_status(status: WaitStatus) -> Option<(Pid, ExitResult)> {
        match status {
            WaitStatus::Exited(pid, code) => Some((pid, ExitResult::Exited(code))),
            WaitStatus::Signaled(pid, signal, _) => {
                Some((pid, ExitResult::Signaled(signal as i32)))
            }
            _ => None,
        }
    }
}

/// A child process started by the shell.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub pid: Pid,
    pub foreground: bool,
    pub cmdline: String,
}

/// Children the shell has spawned and not yet reaped, keyed by pid.
#[derive(Debug, Default)]
pub struct JobList {
    jobs: HashMap<Pid, ProcessRecord>,
}

impl JobList {
    /// Creates a new, empty job list.
    pub fn new() -> Self {
        JobList {
            jobs: HashMap::new(),
        }
    }

    /// Adds a new job to the job list.
    pub fn add(&mut self, pid: Pid, foreground: bool, cmdline: String) {
        self.jobs.insert(
            pid,
            ProcessRecord {
                pid,
                foreground,
                cmdline,
            },
        );
    }

    /// Deletes the job with the given pid from the job list.
    pub fn remove(&mut self, pid: Pid) -> Option<ProcessRecord> {
        self.jobs.remove(&pid)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Pids of every background job still tracked.
    pub fn background_pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self
            .jobs
            .values()
            .filter(|job| !job.foreground)
            .map(|job| job.pid)
            .collect();
        pids.sort_by_key(|pid| pid.as_raw());
        pids
    }

    /// Sends SIGTERM to every background job still tracked.
    pub fn terminate_background(&mut self) {
        for pid in self.background_pids() {
            debug!("terminating background pid {}", pid);
            if let Err(err) = kill(pid, Signal::SIGTERM) {
                // Already gone but not reaped yet.
                debug!("kill {} failed: {}", pid, err);
            }
            self.jobs.remove(&pid);
        }
    }
}

/// Blocks until the given child terminates and returns how it ended.
pub fn wait_foreground(pid: Pid, jobs: &mut JobList) -> Result<ExitResult, ShellError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some((_, result)) = ExitResult::from_wait_status(status) {
                    jobs.remove(pid);
                    debug!("foreground pid {} finished: {}", pid, result);
                    return Ok(result);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(source) => {
                jobs.remove(pid);
                return Err(ShellError::Wait {
                    pid: pid.as_raw(),
                    source,
                });
            }
        }
    }
}

/// Reaps every child that has already terminated, without blocking.
///
/// Results come back in the order the kernel reports them.
pub fn reap_background(jobs: &mut JobList) -> Vec<(Pid, ExitResult)> {
    let mut done = Vec::new();
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if let Some((pid, result)) = ExitResult::from_wait_status(status) {
                    if let Some(job) = jobs.remove(pid) {
                        debug!("reaped pid {} ({}): {}", pid, job.cmdline, result);
                    }
                    done.push((pid, result));
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(err) => {
                warn!("waitpid failed during sweep: {}", err);
                break;
            }
        }
    }
    done
}

/// Prints the completion line for a reaped background job.
pub fn report_done(pid: Pid, result: ExitResult) {
    println!("background pid {} is done: {}", pid, result);
}
