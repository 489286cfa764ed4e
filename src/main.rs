use std::path::PathBuf;

use bookrag::Result;
use bookrag::commands::{
    delete_collection, ingest_collection, list_collections, search_collection, show_status,
};
use bookrag::config::{run_interactive_config, show_config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bookrag")]
#[command(about = "A retrieval backend for textbook question answering")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and chunking settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a book directory into a searchable collection
    Ingest {
        /// Directory containing the book's source files
        dir: PathBuf,
        /// Name for the collection
        #[arg(long, default_value = "default")]
        collection: String,
    },
    /// Search a collection for relevant passages
    Search {
        /// The search query
        query: String,
        /// Collection to search
        #[arg(long, default_value = "default")]
        collection: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Restrict results to one chapter label
        #[arg(long)]
        chapter: Option<String>,
    },
    /// List all ingested collections
    List,
    /// Delete a collection and its embeddings
    Delete {
        /// Collection name to delete
        collection: String,
    },
    /// Show connectivity and collection status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { dir, collection } => {
            ingest_collection(&dir, &collection).await?;
        }
        Commands::Search {
            query,
            collection,
            limit,
            chapter,
        } => {
            search_collection(&query, &collection, limit, chapter.as_deref()).await?;
        }
        Commands::List => {
            list_collections().await?;
        }
        Commands::Delete { collection } => {
            delete_collection(&collection).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
