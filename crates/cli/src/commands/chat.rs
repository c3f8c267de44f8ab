//! `toolpilot chat`: Interactive or single-message chat mode.

use std::io::Write;
use toolpilot_agent::{AgentLoop, CancellationToken};
use toolpilot_core::error::Error;
use toolpilot_core::message::Conversation;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::GlobalArgs;

const QUIT_WORDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

pub async fn run(
    globals: &GlobalArgs,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(globals)?;

    // Fail early with setup instructions when no API key is configured
    let client = toolpilot_providers::build_from_config(&config).map_err(|e| {
        eprintln!();
        eprintln!("  ERROR: {e}");
        eprintln!();
        eprintln!("  Set TOOLPILOT_API_KEY (or ANTHROPIC_API_KEY / OPENAI_API_KEY),");
        eprintln!("  or add api_key to {}", globals.config_path().display());
        eprintln!();
        e
    })?;

    let registry = super::build_registry(&config)?;
    let tool_names = registry.names().join(", ");
    let agent = AgentLoop::from_config(client, registry, &config);
    let mut conv = Conversation::new();

    if let Some(msg) = message {
        // Single message mode
        let outcome = exchange(&agent, &mut conv, &msg).await?;
        println!("{}", outcome.reply);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  toolpilot — interactive mode");
    println!();
    println!("  Provider:   {}", config.provider);
    println!("  Model:      {}", config.model);
    println!("  Workspace:  {}", config.workspace_root().display());
    println!("  Tools:      {tool_names}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or press Ctrl+D to quit. Ctrl+C interrupts a reply.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_quit(input) {
            break;
        }

        eprint!("  ...");
        match exchange(&agent, &mut conv, input).await {
            Ok(outcome) => {
                eprint!("\r     \r");
                println!();
                for line in outcome.reply.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                match e {
                    Error::Cancelled => eprintln!("  [Interrupted]"),
                    other => eprintln!("  [Error] {other}"),
                }
                println!();
            }
        }
    }

    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Run one exchange, cancelling it if the operator presses Ctrl+C.
async fn exchange(
    agent: &AgentLoop,
    conv: &mut Conversation,
    input: &str,
) -> toolpilot_core::Result<toolpilot_agent::ExchangeOutcome> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let outcome = agent.run_exchange(conv, input, &cancel).await;
    watcher.abort();

    if let Ok(outcome) = &outcome {
        tracing::debug!(
            model_calls = outcome.model_calls,
            tool_calls = outcome.tool_calls,
            retries = outcome.retries,
            "Exchange finished"
        );
    }
    outcome
}

fn is_quit(input: &str) -> bool {
    QUIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}
