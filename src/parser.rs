use crate::error::ParseError;

/// Marker replaced by the shell's own process id.
pub const PID_MARKER: &str = "$$";

/// Represents a parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command and its arguments. Never empty.
    pub argv: Vec<String>,
    /// Input redirection file, if any.
    pub input: Option<String>,
    /// Output redirection file, if any.
    pub output: Option<String>,
    /// Trailing `&` was present.
    pub background: bool,
}

impl Command {
    /// Name of the program or built-in.
    pub fn name(&self) -> &str {
        &self.argv[0]
    }
}

/// Splits the input line on whitespace and expands `$$` in every token.
///
/// Blank lines and lines whose first non-space character is `#` yield no
/// tokens, which callers treat as "ignore this line".
pub fn tokenize(line: &str, self_pid: &str) -> Vec<String> {
    if line.trim_start().starts_with('#') {
        return Vec::new();
    }
    line.split_whitespace()
        .map(|token| token.replace(PID_MARKER, self_pid))
        .collect()
}

/// Builds a `Command` from a token sequence.
///
/// `<` and `>` consume the following token as a path; neither the operator nor
/// its operand ends up in `argv`. When an operator repeats, the first path
/// wins. A trailing `&` (after redirections are removed) marks the command
/// as a background request.
pub fn parse(tokens: Vec<String>) -> Result<Command, ParseError> {
    let mut argv = Vec::with_capacity(tokens.len());
    let mut input = None;
    let mut output = None;
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        match token.as_str() {
            "<" => {
                let path = iter.next().ok_or(ParseError::MissingOperand("<"))?;
                input.get_or_insert(path);
            }
            ">" => {
                let path = iter.next().ok_or(ParseError::MissingOperand(">"))?;
                output.get_or_insert(path);
            }
            _ => argv.push(token),
        }
    }

    let background = argv.last().map_or(false, |last| last == "&");
    if background {
        argv.pop();
    }
    if argv.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(Command {
        argv,
        input,
        output,
        background,
    })
}

/// Tokenizes and parses one input line.
pub fn parse_command_line(line: &str, self_pid: &str) -> Result<Command, ParseError> {
    parse(tokenize(line, self_pid))
}
