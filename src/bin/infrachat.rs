//! Interactive terminal client for the infrastructure chat server.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the default endpoint (http://localhost:9090/chat)
//! infrachat
//!
//! # Point at another server
//! INFRACHAT_URL=http://infra-ai:9090/chat infrachat
//! infrachat --url http://infra-ai:9090/chat
//!
//! # Pick up an earlier conversation
//! infrachat --thread thread_abc123
//!
//! # Diagnostics (dropped fragments, ignored chunk types) on stderr
//! RUST_LOG=infrachat=debug infrachat
//! ```
//!
//! Type `exit` to quit.

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use infrachat::PlainTextRenderer;
use infrachat::chat::{ChatArgs, ChatConfig, run};

/// Main entry point for the infrachat application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("infrachat [OPTIONS]");
    let config = ChatConfig::from(args);

    let client = config.client()?;
    let mut session = config.session();
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    tracing::debug!(
        endpoint = %client.endpoint(),
        framing = ?client.framing(),
        thread = session.thread_id().unwrap_or(""),
        "starting chat"
    );

    println!("Chat with your Infrastructure AI. Type 'exit' to quit.");
    println!("-----------------------------------------------------");

    let summary = run(&mut rl, &client, &mut session, &mut renderer).await;

    tracing::debug!(
        turns = summary.turns,
        failed_turns = summary.failed_turns,
        input_errors = summary.input_errors,
        thread = session.thread_id().unwrap_or(""),
        "chat finished"
    );
    Ok(())
}
