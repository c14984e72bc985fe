use nix::errno::Errno;
use rustyline::error::ReadlineError;
use std::ffi::NulError;
use std::io;
use thiserror::Error;

/// Reasons a token sequence cannot be turned into a command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing left to run: blank line, comment, or only operators.
    #[error("empty command line")]
    Empty,
    /// A redirection operator was the last token on the line.
    #[error("expected a file name after `{0}`")]
    MissingOperand(&'static str),
}

/// Errors surfaced by the shell. None of them ends the main loop.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Invalid path provided")]
    InvalidPath(#[source] io::Error),

    #[error("cannot open {path} for input: {source}")]
    RedirectInput {
        path: String,
        #[source]
        source: Errno,
    },

    #[error("cannot open {path} for output: {source}")]
    RedirectOutput {
        path: String,
        #[source]
        source: Errno,
    },

    #[error("failed to fork: {0}")]
    Spawn(#[source] Errno),

    #[error("{program}: command failed to execute: {source}")]
    Exec {
        program: String,
        #[source]
        source: Errno,
    },

    #[error("failed to wait for pid {pid}: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: Errno,
    },

    #[error("failed to set signal disposition: {0}")]
    Signal(#[source] Errno),

    #[error("argument contains a nul byte")]
    Nul(#[from] NulError),

    #[error(transparent)]
    Readline(#[from] ReadlineError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
