//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction so the input loop
//! and the stream dispatch never write to the terminal directly.

use std::io::{self, Stdout, Write};

/// ANSI escape code for bold text (used for the response label).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for green text (used for the response label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for dim text (used for informational lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Label printed before each streamed reply.
pub const RESPONSE_LABEL: &str = "AI: ";

/// Trait for rendering chat output.
///
/// A turn renders as `start_response`, zero or more `print_text`, then
/// `finish_response`.  `start_response` is only called once the server has
/// accepted the request, so a failed turn shows no label.
pub trait Renderer: Send {
    /// Called when the server has accepted the request.
    fn start_response(&mut self);

    /// Print a chunk of response text.
    ///
    /// This is called incrementally as chunks arrive.
    fn print_text(&mut self, text: &str);

    /// Called when the response stream has ended, cleanly or not.
    fn finish_response(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    /// Returns true if ANSI styling is enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self) {
        if self.use_color {
            print!("{ANSI_BOLD}{ANSI_GREEN}{RESPONSE_LABEL}{ANSI_RESET}");
        } else {
            print!("{RESPONSE_LABEL}");
        }
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn finish_response(&mut self) {
        println!();
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color && !info.is_empty() {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
        self.flush();
    }
}
