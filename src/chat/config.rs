//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! [`ChatConfig`].  The endpoint URL resolves as flag, then environment, then
//! the compiled-in default.

use std::env;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::chat::session::Session;
use crate::client::{ChatClient, DEFAULT_CHAT_URL};
use crate::error::Result;
use crate::sse::FramingPolicy;

/// Environment variable that overrides the default endpoint URL.
pub const URL_ENV_VAR: &str = "INFRACHAT_URL";

/// Command-line arguments for the infrachat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Chat endpoint URL.
    #[arrrg(
        optional,
        "Chat endpoint (default: $INFRACHAT_URL or http://localhost:9090/chat)",
        "URL"
    )]
    pub url: Option<String>,

    /// Thread to resume.
    #[arrrg(optional, "Resume an existing conversation thread", "ID")]
    pub thread: Option<String>,

    /// Use strict framing.
    #[arrrg(flag, "Only accept stream lines that start with 'data: '")]
    pub strict_framing: bool,

    /// Connect timeout in seconds.
    #[arrrg(optional, "Seconds to wait for a connection (default: no limit)", "SECS")]
    pub connect_timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments and the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The chat endpoint.
    pub url: String,

    /// Thread id the first request should carry, if any.
    pub thread_id: Option<String>,

    /// How response lines are cut into fragments.
    pub framing: FramingPolicy,

    /// Bound on connection establishment.  `None` waits forever.
    pub connect_timeout: Option<Duration>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - URL: http://localhost:9090/chat
    /// - Thread: none
    /// - Framing: permissive
    /// - Connect timeout: none
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            url: DEFAULT_CHAT_URL.to_string(),
            thread_id: None,
            framing: FramingPolicy::Permissive,
            connect_timeout: None,
            use_color: true,
        }
    }

    /// Resolves arguments against an explicit environment value.
    ///
    /// An empty environment value counts as unset.
    pub fn resolve(args: ChatArgs, env_url: Option<String>) -> Self {
        let url = args
            .url
            .or(env_url.filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string());
        let framing = if args.strict_framing {
            FramingPolicy::Strict
        } else {
            FramingPolicy::Permissive
        };

        ChatConfig {
            url,
            thread_id: args.thread.filter(|id| !id.is_empty()),
            framing,
            connect_timeout: args.connect_timeout.map(Duration::from_secs),
            use_color: !args.no_color,
        }
    }

    /// Sets the endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the thread to resume.
    pub fn with_thread_id(mut self, thread_id: Option<String>) -> Self {
        self.thread_id = thread_id;
        self
    }

    /// Sets the framing policy.
    pub fn with_framing(mut self, framing: FramingPolicy) -> Self {
        self.framing = framing;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Option<Duration>) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Builds the HTTP client this configuration describes.
    pub fn client(&self) -> Result<ChatClient> {
        ChatClient::with_options(&self.url, self.framing, self.connect_timeout)
    }

    /// Builds the initial session state.
    pub fn session(&self) -> Session {
        Session::with_thread_id(self.thread_id.clone())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        Self::resolve(args, env::var(URL_ENV_VAR).ok())
    }
}
