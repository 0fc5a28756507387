//! The terminal input loop.
//!
//! A trimmed line is the exit sentinel, blank, or a message for the server.
//! There are no slash commands; every other line reaches the chat endpoint
//! verbatim.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::chat::session::Session;
use crate::client::ChatClient;
use crate::error::{Error, Result};
use crate::render::Renderer;

/// The line that ends the program.
pub const EXIT_COMMAND: &str = "exit";

/// Prompt shown before each line of input.
pub const PROMPT: &str = "> ";

/// Printed when the loop ends.
pub const FAREWELL: &str = "Goodbye!";

/// What to do with one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Leave the loop.
    Exit,
    /// Nothing to send; prompt again.
    Skip,
    /// Send the trimmed message.
    Send(String),
}

/// Classifies a raw input line.
///
/// # Examples
///
/// ```
/// # use infrachat::chat::{InputAction, classify};
/// assert_eq!(classify("  exit \n"), InputAction::Exit);
/// assert_eq!(classify("   "), InputAction::Skip);
/// assert_eq!(classify(" hi "), InputAction::Send("hi".to_string()));
/// ```
pub fn classify(line: &str) -> InputAction {
    match line.trim() {
        "" => InputAction::Skip,
        EXIT_COMMAND => InputAction::Exit,
        message => InputAction::Send(message.to_string()),
    }
}

/// One attempt to read a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line of input, untrimmed.
    Line(String),
    /// The user pressed Ctrl+C at the prompt.
    Interrupted,
    /// Input is closed.
    Eof,
}

/// A source of terminal lines.
pub trait LineSource {
    /// Shows `prompt` and reads one line.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Records a sent message for line-editing history.
    fn add_history(&mut self, line: &str) {
        let _ = line;
    }
}

impl LineSource for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(Error::input(
                format!("could not read terminal input: {err}"),
                None,
            )),
        }
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.add_history_entry(line);
    }
}

/// Counters for one run of the input loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Messages sent to the server.
    pub turns: u64,
    /// Turns that ended in an error.
    pub failed_turns: u64,
    /// Terminal read errors.
    pub input_errors: u64,
}

/// Runs the prompt/send loop until `exit` or end of input.
///
/// Every failure is reported through `renderer` and the loop carries on;
/// only the exit sentinel or a closed input stops it.
pub async fn run<L: LineSource + ?Sized>(
    lines: &mut L,
    client: &ChatClient,
    session: &mut Session,
    renderer: &mut dyn Renderer,
) -> LoopSummary {
    let mut summary = LoopSummary::default();
    loop {
        let line = match lines.read_line(PROMPT) {
            Ok(ReadOutcome::Line(line)) => line,
            Ok(ReadOutcome::Interrupted) => {
                renderer.print_info("");
                continue;
            }
            Ok(ReadOutcome::Eof) => {
                renderer.print_info(FAREWELL);
                break;
            }
            Err(err) => {
                summary.input_errors += 1;
                renderer.print_error(&err.to_string());
                continue;
            }
        };

        let message = match classify(&line) {
            InputAction::Exit => {
                renderer.print_info(FAREWELL);
                break;
            }
            InputAction::Skip => continue,
            InputAction::Send(message) => message,
        };

        lines.add_history(&message);
        summary.turns += 1;
        match session.send_streaming(client, &message, renderer).await {
            Ok(turn) => {
                tracing::debug!(
                    lines = turn.lines,
                    chunks = turn.chunks,
                    dropped = turn.dropped(),
                    ignored = turn.ignored_chunks,
                    "turn complete"
                );
            }
            Err(err) => {
                summary.failed_turns += 1;
                tracing::debug!(error = %err, "turn failed");
                renderer.print_error(&err.to_string());
            }
        }
    }
    summary
}
