use super::command::Command;
use crate::error::InputError;
use serde_json::Value;
use std::io::BufRead;

/// Reads commands from a JSON-lines source, one command per line.
///
/// Blank lines are skipped. A line that fails to parse yields an error for
/// that line only; reading continues with the next one. When the line names
/// a known `op` but its fields do not fit, the error is
/// [`InputError::MalformedCommand`] so the caller can still answer it.
pub struct CommandReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Returns an iterator that lazily reads and parses commands.
    pub fn commands(self) -> impl Iterator<Item = Result<Command, InputError>> {
        self.source
            .lines()
            .enumerate()
            .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .map(|(index, line)| parse(index + 1, &line?))
    }
}

fn parse(line: usize, text: &str) -> Result<Command, InputError> {
    let value: Value =
        serde_json::from_str(text).map_err(|source| InputError::Json { line, source })?;
    let op = value.get("op").and_then(Value::as_str).and_then(Command::op);

    serde_json::from_value::<Command>(value).map_err(|source| match op {
        Some(op) => InputError::MalformedCommand { line, op, source },
        None => InputError::Json { line, source },
    })
}
