//! Interactive chat built on top of the streaming client.
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: conversation state and per-turn stream dispatch
//! - [`input`]: input classification and the prompt loop

mod config;
mod input;
mod session;

pub use config::{ChatArgs, ChatConfig, URL_ENV_VAR};
pub use input::{
    EXIT_COMMAND, FAREWELL, InputAction, LineSource, LoopSummary, PROMPT, ReadOutcome, classify,
    run,
};
pub use session::{Session, TurnSummary};
