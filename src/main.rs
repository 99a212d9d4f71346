use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use semsearch::{SearchStack, SemsearchConfig};
use tracing_subscriber::EnvFilter;

/// Command-line front end for the semsearch stack.
#[derive(Parser, Debug)]
#[command(name = "semsearch", version, about = "Semantic document search")]
struct Cli {
    /// YAML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "SEMSEARCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Emit JSON log lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed the sample documents and insert them into the store.
    Seed,
    /// Rank stored documents against a query and print them as JSON.
    Search {
        query: String,
        /// Override `search.top_k`.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Load the model and print its status.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = match &cli.config {
        Some(path) => SemsearchConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SemsearchConfig::default(),
    };
    config.apply_env();

    match cli.command {
        Commands::Seed => {
            let stack = SearchStack::build(&config)?;
            let count = semsearch::seed_sample_documents(stack.service()).await?;
            stack.store().flush()?;
            println!("{}", serde_json::json!({ "indexed": count }));
        }
        Commands::Search { query, top_k } => {
            if let Some(k) = top_k {
                config.search.top_k = k;
            }
            let stack = SearchStack::build(&config)?;
            let results = stack.service().search(&query).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "results": results }))?
            );
        }
        Commands::Status => {
            let stack = SearchStack::build(&config)?;
            if let Err(err) = stack.lifecycle().ensure_ready().await {
                tracing::warn!(error = %err, "model not ready");
            }
            println!("{}", serde_json::to_string_pretty(&stack.lifecycle().status())?);
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
