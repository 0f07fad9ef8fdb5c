//! `wikirag`: ask questions against the Wikipedia chunk store.

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use wikirag_chat::{ChatOrchestrator, RetrievalContext};
use wikirag_core::config::Config;

#[derive(Parser)]
#[command(name = "wikirag", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one question.
    Ask {
        question: String,

        /// Generation model; defaults to `llm.default_model`.
        #[arg(short, long)]
        model: Option<String>,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Probe every external service.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Config::load()
        .and_then(|c| c.settings())
        .map_err(|e| {
            eprintln!("Error loading config: {e}");
            e
        })?;
    let ctx = RetrievalContext::connect(&settings)?;

    match cli.command {
        Command::Ask { question, model, json } => {
            let model = model.unwrap_or_else(|| settings.llm.default_model.clone());
            let chat = ChatOrchestrator::new(&ctx, &settings);
            let cancel = ctrl_c_token();
            let response = chat.handle_with_cancel(&question, &model, &cancel).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.answer);
                if !response.suggested_prompts.is_empty() {
                    println!("\n💡 Możesz też zapytać:");
                    for prompt in &response.suggested_prompts {
                        println!("  - {prompt}");
                    }
                }
            }
        }
        Command::Health => {
            let mut healthy = true;
            for check in ctx.health_report().await {
                match &check.status {
                    Ok(()) => println!("✅ {:<10} ok", check.service),
                    Err(e) => {
                        healthy = false;
                        println!("❌ {:<10} {e}", check.service);
                    }
                }
            }
            if !healthy {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

/// Token cancelled on the first Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted");
            child.cancel();
        }
    });
    token
}
