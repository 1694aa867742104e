//! Streaming chat example
//!
//! Sends one prompt through the dispatcher and prints the streamed answer.
//!
//! Configuration via environment variables:
//! - CHAT_API_KEY (required)
//! - CHAT_PROVIDER: openai (default), claude or azure-openai
//! - CHAT_BASE_URL: defaults to https://api.openai.com
//! - CHAT_MODEL: defaults to gpt-4o-mini
//! - RUST_LOG: tracing filter, e.g. `ai_chat_bridge=debug`
//!
//! Usage:
//!   CHAT_API_KEY=sk-... cargo run --example stream_chat -- "Explain SSE briefly"

use ai_chat_bridge::telemetry::init_tracing;
use ai_chat_bridge::{
    ChatMessage, ChatOutcome, Dispatcher, FnHooks, ProviderType, RequestOptions, UnifiedRequest,
};
use futures::StreamExt;
use std::io::Write;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let api_key = std::env::var("CHAT_API_KEY").map_err(|_| "CHAT_API_KEY is not set")?;
    let provider = ProviderType::from(
        std::env::var("CHAT_PROVIDER")
            .unwrap_or_else(|_| "openai".to_string())
            .as_str(),
    );
    let base_url =
        std::env::var("CHAT_BASE_URL").unwrap_or_else(|_| "https://api.openai.com".to_string());
    let model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Say hello in three languages.".to_string());

    let request = UnifiedRequest::new(provider, base_url, api_key, model)
        .with_prompt("You are a concise assistant.")
        .with_options(RequestOptions {
            temperature: Some(0.7),
            max_tokens: Some(512),
            ..Default::default()
        })
        .with_messages(vec![ChatMessage::user(question)]);

    let dispatcher = Dispatcher::builder().build()?;

    // Ctrl-C cancels the in-flight call and ends the stream.
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let started = Instant::now();
    let hooks = FnHooks::new(
        || eprintln!("[sending request]"),
        move || eprintln!("[response headers after {:?}]", started.elapsed()),
    );

    match dispatcher.unified_chat_request(&request, cancel, &hooks).await? {
        ChatOutcome::Stream(mut stream) => {
            let mut stdout = std::io::stdout();
            while let Some(increment) = stream.next().await {
                let increment = increment?;
                if let Some(text) = increment.content {
                    print!("{}", text);
                    stdout.flush()?;
                }
                if let Some(reason) = increment.finish_reason {
                    println!("\n\n[finish: {}]", reason.as_str());
                }
                if let Some(usage) = increment.usage {
                    println!("[usage: {:?}]", usage);
                }
            }
        }
        ChatOutcome::Complete(response) => println!("{}", response.content),
    }

    Ok(())
}
