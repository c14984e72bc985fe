mod builtins;
mod error;
mod exec;
mod input;
mod jobs;
mod parser;
mod shell;
mod signals;

use env_logger::Env;
use log::LevelFilter;
use std::env;
use std::process;

fn main() {
    // Parse command-line arguments.
    let args: Vec<String> = env::args().collect();
    let mut emit_prompt = true;
    let mut verbose = false;
    for arg in &args[1..] {
        match arg.as_str() {
            "-h" => usage(),
            "-v" => verbose = true,
            "-p" => emit_prompt = false,
            _ => {}
        }
    }

    init_logging(verbose);

    // Ctrl-C is ignored by the shell; Ctrl-Z toggles foreground-only mode.
    if let Err(err) = signals::ignore_interrupts() {
        fatal(&err);
    }
    let mut mode = match signals::ModeController::install() {
        Ok(mode) => mode,
        Err(err) => fatal(&err),
    };

    let mut input = input::line_reader(emit_prompt);
    let mut state = shell::ShellState::default();
    shell::run_shell(input.as_mut(), &mut state, &mut mode);
}

fn usage() -> ! {
    println!("Usage: smallsh [-hvp]");
    println!("   -h   Print this help message");
    println!("   -v   Verbose mode: debug logging to stderr");
    println!("   -p   Do not print a command prompt");
    println!("The SMALLSH_LOG environment variable overrides the log filter.");
    process::exit(1);
}

fn fatal(err: &dyn std::fmt::Display) -> ! {
    eprintln!("smallsh: {}", err);
    process::exit(1);
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder = env_logger::Builder::from_env(
        Env::new().filter_or("SMALLSH_LOG", default_level.as_str()),
    );
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}
