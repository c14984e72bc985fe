use crate::error::ShellError;
use crate::parser::Command;
use log::debug;
use nix::fcntl::{open, OFlag};
use nix::libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2, execvp, fork, ForkResult, Pid};
use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::io::RawFd;

const NULL_DEVICE: &str = "/dev/null";

/// Forks a child running `cmd` and returns its pid.
///
/// `foreground` is the effective placement after foreground-only mode has been
/// applied; it decides the child's SIGINT disposition and whether stdin falls
/// back to the null device.
pub fn launch(cmd: &Command, foreground: bool) -> Result<Pid, ShellError> {
    // Everything that allocates happens before the fork.
    let argv = cmd
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;
    io::stdout().flush()?;

    match unsafe { fork() }.map_err(ShellError::Spawn)? {
        ForkResult::Parent { child } => {
            debug!(
                "spawned pid {} for {:?} ({})",
                child,
                cmd.argv,
                if foreground { "foreground" } else { "background" }
            );
            Ok(child)
        }
        ForkResult::Child => {
            let err = match setup_child(cmd, foreground) {
                Ok(()) => exec(cmd, &argv),
                Err(err) => err,
            };
            eprintln!("{}", err);
            unsafe { nix::libc::_exit(1) }
        }
    }
}

/// Signal dispositions and redirections, applied in the child only.
fn setup_child(cmd: &Command, foreground: bool) -> Result<(), ShellError> {
    unsafe { signal(Signal::SIGTSTP, SigHandler::SigIgn) }.map_err(ShellError::Signal)?;
    if foreground {
        unsafe { signal(Signal::SIGINT, SigHandler::SigDfl) }.map_err(ShellError::Signal)?;
    }

    match &cmd.input {
        Some(path) => redirect(path, OFlag::O_RDONLY, Mode::empty(), STDIN_FILENO)
            .map_err(|source| ShellError::RedirectInput {
                path: path.clone(),
                source,
            })?,
        None if !foreground => {
            redirect(NULL_DEVICE, OFlag::O_RDONLY, Mode::empty(), STDIN_FILENO).map_err(
                |source| ShellError::RedirectInput {
                    path: NULL_DEVICE.to_string(),
                    source,
                },
            )?
        }
        None => {}
    }

    if let Some(path) = &cmd.output {
        let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC;
        redirect(path, flags, Mode::from_bits_truncate(0o666), STDOUT_FILENO).map_err(
            |source| ShellError::RedirectOutput {
                path: path.clone(),
                source,
            },
        )?;
    }
    Ok(())
}

/// Opens `path` and moves the descriptor onto `target`.
fn redirect(path: &str, flags: OFlag, mode: Mode, target: RawFd) -> nix::Result<()> {
    let fd = open(path, flags, mode)?;
    if fd != target {
        dup2(fd, target)?;
        close(fd)?;
    }
    Ok(())
}

/// Replaces the child's image, searching `PATH`. Only returns on failure.
fn exec(cmd: &Command, argv: &[CString]) -> ShellError {
    match execvp(&argv[0], argv) {
        Ok(never) => match never {},
        Err(source) => ShellError::Exec {
            program: cmd.name().to_string(),
            source,
        },
    }
}
