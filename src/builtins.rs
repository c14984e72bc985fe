use crate::error::ShellError;
use crate::jobs::ExitResult;
use crate::parser::Command;
use log::debug;
use std::env;
use std::path::PathBuf;

/// What the main loop should do after a built-in ran.
#[derive(Debug, PartialEq, Eq)]
pub enum Builtin {
    /// Not a built-in; run it as an external program.
    NotBuiltin,
    /// Handled; keep reading commands.
    Handled,
    /// `exit` was requested.
    Exit,
}

/// Checks if the command is a built-in command and, if so, executes it.
/// Supported built-ins are "exit", "cd" and "status". Redirections and a
/// trailing `&` are parsed but have no effect on them.
pub fn handle_builtin(cmd: &Command, last_status: ExitResult) -> Builtin {
    match cmd.name() {
        "exit" => Builtin::Exit,
        "cd" => {
            if let Err(err) = change_dir(cmd.argv.get(1).map(String::as_str)) {
                println!("{}", err);
            }
            Builtin::Handled
        }
        "status" => {
            println!("{}", last_status);
            Builtin::Handled
        }
        _ => Builtin::NotBuiltin,
    }
}

/// Changes to `target`, or to the home directory when no target is given.
pub fn change_dir(target: Option<&str>) -> Result<(), ShellError> {
    let path = match target {
        Some(dir) => PathBuf::from(dir),
        None => home_dir().unwrap_or_default(),
    };
    env::set_current_dir(&path).map_err(|source| {
        debug!("cd {}: {}", path.display(), source);
        ShellError::InvalidPath(source)
    })
}

/// `$HOME`, falling back to the account database when it is unset.
fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(dirs_next::home_dir)
}
