use crate::error::ShellError;
use log::debug;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, BufRead, Write};

/// Global prompt string.
pub static PROMPT: &str = ": ";

/// Source of command lines. `Ok(None)` means end of input.
pub trait LineReader {
    fn read_line(&mut self) -> Result<Option<String>, ShellError>;
}

/// Line editing for interactive terminals. History lives in memory only.
pub struct EditorReader {
    editor: DefaultEditor,
}

impl EditorReader {
    pub fn new() -> Result<Self, ShellError> {
        Ok(EditorReader {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self) -> Result<Option<String>, ShellError> {
        match self.editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            // Ctrl-C at the prompt just discards the line.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Plain buffered reader, used for pipes, files and `-p`.
pub struct PlainReader<R> {
    reader: R,
    emit_prompt: bool,
}

impl<R: BufRead> PlainReader<R> {
    pub fn new(reader: R, emit_prompt: bool) -> Self {
        PlainReader {
            reader,
            emit_prompt,
        }
    }
}

impl<R: BufRead> LineReader for PlainReader<R> {
    fn read_line(&mut self) -> Result<Option<String>, ShellError> {
        if self.emit_prompt {
            print!("{}", PROMPT);
            io::stdout().flush()?;
        }
        let mut line = String::new();
        loop {
            match self.reader.read_line(&mut line) {
                Ok(0) => return Ok(None), // End-of-file (Ctrl-D)
                Ok(_) => return Ok(Some(line)),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Picks the editor for an interactive terminal and the plain reader
/// otherwise.
pub fn line_reader(emit_prompt: bool) -> Box<dyn LineReader> {
    let interactive = emit_prompt && nix::unistd::isatty(nix::libc::STDIN_FILENO).unwrap_or(false);
    if interactive {
        match EditorReader::new() {
            Ok(editor) => return Box::new(editor),
            Err(err) => debug!("line editor unavailable, using plain input: {}", err),
        }
    }
    Box::new(PlainReader::new(io::stdin().lock(), emit_prompt))
}
