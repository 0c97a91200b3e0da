//! Parser for the emulator prompt.
//!
//! ```text
//! command  := "press" | "release" | "status" | "help" | "exit" | "quit"
//!           | "hold" duration
//! duration := digits ("ms" | "s")?
//! ```
//!
//! Keywords match case-insensitively. A bare number is read as milliseconds.

use core::fmt;
use std::time::Duration;

use winnow::ascii::{Caseless, digit1, space0, space1};
use winnow::combinator::{alt, eof, opt, preceded, terminated};
use winnow::prelude::*;

/// Operator commands accepted at the prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Press,
    Release,
    Hold(Duration),
    Status,
    Help,
    Exit,
}

/// Help rows shown by `help`.
pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("press", "Drive the BOOT button low"),
    ("release", "Let the BOOT button go"),
    ("hold <duration>", "Press, wait, then release (e.g. `hold 2500ms`, `hold 3s`)"),
    ("status", "Show the button state and verdict"),
    ("help", "Show this list"),
    ("exit", "Leave without acknowledging the verdict"),
];

/// Reasons a prompt line was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    UnknownCommand { offset: usize },
    InvalidDuration { offset: usize },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::UnknownCommand { offset } => {
                write!(f, "unrecognized command at column {}", offset + 1)
            }
            CommandError::InvalidDuration { offset } => write!(
                f,
                "expected a duration such as `2500ms` or `3s` at column {}",
                offset + 1
            ),
        }
    }
}

/// Parses one prompt line.
pub fn parse(line: &str) -> Result<ConsoleCommand, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }

    terminated(command, (space0, eof))
        .parse(line)
        .map_err(|err| {
            let offset = err.offset();
            let keyword = line.split_whitespace().next().unwrap_or_default();
            if keyword.eq_ignore_ascii_case("hold") {
                CommandError::InvalidDuration { offset }
            } else {
                CommandError::UnknownCommand { offset }
            }
        })
}

fn command(input: &mut &str) -> ModalResult<ConsoleCommand> {
    alt((
        preceded((Caseless("hold"), space1), duration).map(ConsoleCommand::Hold),
        Caseless("press").value(ConsoleCommand::Press),
        Caseless("release").value(ConsoleCommand::Release),
        Caseless("status").value(ConsoleCommand::Status),
        Caseless("help").value(ConsoleCommand::Help),
        alt((Caseless("exit"), Caseless("quit"))).value(ConsoleCommand::Exit),
    ))
    .parse_next(input)
}

fn duration(input: &mut &str) -> ModalResult<Duration> {
    (
        digit1.try_map(str::parse::<u64>),
        opt(alt((
            Caseless("ms").value(1_u64),
            Caseless("s").value(1_000_u64),
        ))),
    )
        .map(|(value, scale)| Duration::from_millis(value.saturating_mul(scale.unwrap_or(1))))
        .parse_next(input)
}
