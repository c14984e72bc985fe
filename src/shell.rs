use crate::builtins::{handle_builtin, Builtin};
use crate::error::{ParseError, ShellError};
use crate::exec::launch;
use crate::input::LineReader;
use crate::jobs::{reap_background, report_done, wait_foreground, ExitResult, JobList};
use crate::parser::{parse_command_line, Command};
use crate::signals::{Mode, ModeController};
use log::{debug, warn};
use nix::unistd::Pid;
use once_cell::sync::Lazy;

/// The shell's own pid, rendered once for `$$` expansion.
pub static SELF_PID: Lazy<String> = Lazy::new(|| Pid::this().to_string());

/// Whether the main loop keeps going after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// State that lives for the whole session.
#[derive(Debug)]
pub struct ShellState {
    /// Result of the most recent wait, foreground or sweep.
    pub last_status: ExitResult,
    pub mode: Mode,
    pub self_pid: String,
    pub jobs: JobList,
}

impl ShellState {
    pub fn new(self_pid: impl Into<String>) -> Self {
        ShellState {
            last_status: ExitResult::default(),
            mode: Mode::default(),
            self_pid: self_pid.into(),
            jobs: JobList::new(),
        }
    }
}

impl Default for ShellState {
    fn default() -> Self {
        ShellState::new(SELF_PID.as_str())
    }
}

/// Evaluates one input line: parse, dispatch, wait, then sweep finished
/// background jobs.
pub fn eval_line(state: &mut ShellState, line: &str) -> Flow {
    let cmd = match parse_command_line(line, &state.self_pid) {
        Ok(cmd) => cmd,
        Err(ParseError::Empty) => return Flow::Continue,
        Err(err) => {
            eprintln!("smallsh: {}", err);
            return Flow::Continue;
        }
    };
    debug!("parsed {:?}", cmd);

    match handle_builtin(&cmd, state.last_status) {
        Builtin::Exit => return Flow::Exit,
        Builtin::Handled => {}
        Builtin::NotBuiltin => {
            if let Err(err) = run_external(state, &cmd) {
                eprintln!("smallsh: {}", err);
            }
        }
    }

    for (pid, result) in reap_background(&mut state.jobs) {
        report_done(pid, result);
        state.last_status = result;
    }
    Flow::Continue
}

/// Launches an external command and either waits for it or announces it as a
/// background job, depending on the request and the current mode.
fn run_external(state: &mut ShellState, cmd: &Command) -> Result<(), ShellError> {
    let foreground = !cmd.background || state.mode.is_foreground_only();
    let pid = launch(cmd, foreground)?;
    state.jobs.add(pid, foreground, cmd.argv.join(" "));

    if foreground {
        state.last_status = wait_foreground(pid, &mut state.jobs)?;
    } else {
        println!("background pid is {}", pid);
    }
    Ok(())
}

/// Runs the main shell loop until `exit` or end of input.
pub fn run_shell(
    input: &mut dyn LineReader,
    state: &mut ShellState,
    mode: &mut ModeController,
) {
    loop {
        let line = match input.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                eprintln!("Error reading input: {}", err);
                break;
            }
        };
        mode.poll(&mut state.mode);
        debug!("Received command: {}", line.trim());

        let flow = eval_line(state, &line);
        mode.poll(&mut state.mode);
        if flow == Flow::Exit {
            break;
        }
    }

    if !state.jobs.is_empty() {
        warn!("{} background job(s) still running at exit", state.jobs.len());
        state.jobs.terminate_background();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    #[test]
    fn test_blank_and_comment_lines_are_noops() {
        let mut state = ShellState::new("10");
        assert_eq!(eval_line(&mut state, "\n"), Flow::Continue);
        assert_eq!(eval_line(&mut state, "   \n"), Flow::Continue);
        assert_eq!(eval_line(&mut state, "# exit\n"), Flow::Continue);
        assert_eq!(state.last_status, ExitResult::Exited(0));
        assert!(state.jobs.is_empty());
    }

    #[test]
    fn test_exit_stops_the_loop() {
        let mut state = ShellState::new("10");
        assert_eq!(eval_line(&mut state, "exit\n"), Flow::Exit);
    }

    #[test]
    fn test_self_pid_matches_process() {
        assert_eq!(*SELF_PID, std::process::id().to_string());
        assert_eq!(ShellState::default().self_pid, *SELF_PID);
    }

    #[test]
    #[serial]
    fn test_foreground_status_is_recorded() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("seven.sh");
        fs::write(&script, "exit 7\n").unwrap();

        let mut state = ShellState::new("10");
        eval_line(&mut state, &format!("sh {}\n", script.display()));
        assert_eq!(state.last_status, ExitResult::Exited(7));

        eval_line(&mut state, "true\n");
        assert_eq!(state.last_status, ExitResult::Exited(0));
    }

    #[test]
    #[serial]
    fn test_failed_cd_keeps_status() {
        let mut state = ShellState::new("10");
        eval_line(&mut state, "false\n");
        eval_line(&mut state, "cd /nonexistent/smallsh\n");
        assert_eq!(state.last_status, ExitResult::Exited(1));
    }

    #[test]
    #[serial]
    fn test_background_job_is_tracked_then_reaped() {
        let mut state = ShellState::new("10");
        eval_line(&mut state, "sleep 0.2 &\n");
        assert_eq!(state.jobs.background_pids().len(), 1);
        assert_eq!(state.last_status, ExitResult::Exited(0));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !state.jobs.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
            eval_line(&mut state, "status\n");
        }
        assert!(state.jobs.is_empty());
    }

    #[test]
    #[serial]
    fn test_sweep_records_last_reaped_status() {
        fn drain(state: &mut ShellState) {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !state.jobs.is_empty() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(50));
                eval_line(state, "status\n");
            }
            assert!(state.jobs.is_empty());
        }

        let mut state = ShellState::new("10");
        eval_line(&mut state, "false &\n");
        drain(&mut state);
        assert_eq!(state.last_status, ExitResult::Exited(1));

        eval_line(&mut state, "sh -c exit &\n");
        drain(&mut state);
        assert_eq!(state.last_status, ExitResult::Exited(0));
    }

    #[test]
    #[serial]
    fn test_foreground_only_mode_waits_for_background_request() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("done.txt");

        let mut state = ShellState::new("10");
        state.mode = Mode::ForegroundOnly;
        eval_line(&mut state, &format!("echo finished > {} &\n", out.display()));

        assert!(state.jobs.is_empty());
        assert_eq!(fs::read_to_string(&out).unwrap(), "finished\n");
        assert_eq!(state.last_status, ExitResult::Exited(0));
    }

    #[test]
    #[serial]
    fn test_pid_marker_reaches_the_child() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("pid$$.txt");

        let mut state = ShellState::new("4321");
        eval_line(&mut state, &format!("echo $$ > {}\n", out.display()));

        let expanded = dir.path().join("pid4321.txt");
        assert_eq!(fs::read_to_string(expanded).unwrap(), "4321\n");
    }
}
