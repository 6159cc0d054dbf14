//! Terminal front end: type a message, watch the reply stream in.
//!
//! Commands: `/history`, `/clear`, `/quit`.

use std::collections::HashSet;
use std::io::Write;

use chat_client::{ChatClient, ChatState, ClientConfig, ToolActivityStatus};
use shared_types::Role;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "chat_client=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let config = ClientConfig::from_env()?;
    tracing::info!(server = %config.base_url, "Connecting to chat server");
    let client = ChatClient::new(config)?;

    match client.load_history().await {
        Ok(0) => {}
        Ok(count) => {
            println!("Restored {count} messages.");
            print_transcript(&client.snapshot());
        }
        Err(e) => tracing::warn!(error = %e, "Could not load history"),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => print_transcript(&client.snapshot()),
            "/clear" => match client.clear_history().await {
                Ok(()) => println!("History cleared."),
                Err(e) => eprintln!("[error] {e}"),
            },
            "" => {}
            text => render_turn(&client, text).await?,
        }
        prompt()?;
    }
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

fn print_transcript(state: &ChatState) {
    for message in &state.messages {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        println!("[{}] {who}: {}", message.timestamp.format("%H:%M:%S"), message.content);
        if !message.tools_used.is_empty() {
            println!("    tools: {}", message.tools_used.join(", "));
        }
    }
}

/// Print whatever the assistant message gained since the last call.
fn print_progress(
    state: &ChatState,
    printed: &mut usize,
    announced: &mut HashSet<String>,
) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    for tool in &state.active_tools {
        if tool.status == ToolActivityStatus::Active && announced.insert(tool.name.clone()) {
            write!(stdout, "\n  [using {}]\n", tool.name)?;
        }
    }
    if let Some(last) = state.messages.last() {
        if let Some(delta) = last.content.get(*printed..) {
            write!(stdout, "{delta}")?;
            *printed = last.content.len();
        }
    }
    stdout.flush()
}

async fn render_turn(client: &ChatClient, text: &str) -> std::io::Result<()> {
    let mut updates = client.subscribe();
    updates.mark_unchanged();
    let mut printed = 0;
    let mut announced = HashSet::new();

    let send = client.send(text);
    tokio::pin!(send);
    loop {
        tokio::select! {
            _ = &mut send => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                print_progress(&state, &mut printed, &mut announced)?;
            }
        }
    }

    let state = client.snapshot();
    print_progress(&state, &mut printed, &mut announced)?;
    println!();
    if let Some(error) = &state.error {
        eprintln!("[error] {error}");
    }
    Ok(())
}
