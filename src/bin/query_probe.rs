use alexbot::config::Config;
use alexbot::query::{ClaudeCli, NO_RESPONSE, QueryBackend, QueryEvent, QueryRequest};
use anyhow::Result;
use futures::StreamExt;

const DEFAULT_PROMPT: &str = "Reply with a one sentence greeting.";

/// Prints every event the backend emits for `prompt` and returns the first
/// result payload
async fn dump_events(cli: &ClaudeCli, prompt: &str, max_turns: u32) -> Result<Option<String>> {
    let mut stream = cli.query(QueryRequest::new(prompt, max_turns)).await?;
    let mut count = 0;
    let mut answer = None;

    while let Some(event) = stream.next().await {
        count += 1;
        match event {
            Ok(QueryEvent::Result {
                subtype,
                result,
                is_error,
                num_turns,
            }) => {
                println!(
                    "{:>3}. result subtype={:?} is_error={} turns={:?}",
                    count, subtype, is_error, num_turns
                );
                println!("     {}", result.as_deref().unwrap_or("<no payload>"));
                if answer.is_none() {
                    answer = Some(result);
                }
            }
            Ok(other) => println!("{:>3}. {:?}", count, other),
            Err(e) => {
                println!("❌ Stream failed after {} events: {:#}", count, e);
                return Err(e);
            }
        }
    }

    println!("✅ Stream finished with {} events", count);
    Ok(answer.flatten())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;

    let prompt = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let prompt = if prompt.trim().is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        prompt
    };

    println!("🚀 Query probe");
    println!("{}", "=".repeat(50));
    println!("Program: {}", config.claude_path.display());
    println!("Max turns: {}", config.chat_max_turns);
    println!("Prompt: {}", prompt);
    println!("{}", "─".repeat(50));

    let cli = ClaudeCli::new(config.claude_path.clone(), config.anthropic_api_key.clone());
    let answer = dump_events(&cli, &prompt, config.chat_max_turns).await?;

    println!("{}", "─".repeat(50));
    println!(
        "📋 Resolved answer:\n{}",
        answer.as_deref().unwrap_or(NO_RESPONSE)
    );

    Ok(())
}
