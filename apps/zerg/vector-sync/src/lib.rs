//! Vector Sync Service
//!
//! Copies Google Workspace users into a MongoDB Atlas collection with embeddings
//! and answers "who is similar to this text" queries against it.
//!
//! ## Flow
//!
//! ```text
//! Google Admin Directory (users.list, paginated)
//!   ↓ DirectoryUser → Record
//! VectorSyncService
//!   ├─ IndexProvisioner   (createSearchIndexes once)
//!   ├─ BatchUpsertPipeline (OpenAI embeddings, keyed upserts)
//!   └─ SimilaritySearcher  ($vectorSearch)
//!   ↓
//! MongoDB Atlas
//! ```
//!
//! Without a subcommand the binary shows the interactive menu. Logs go to
//! stderr; results and prompts go to stdout.

pub mod commands;
pub mod config;
pub mod menu;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use core_config::{Environment, FromEnv};
use domain_directory::GoogleDirectoryClient;
use domain_vector::{
    EmbeddingClient, MongoDocumentStore, OpenAIProvider, VectorContext, VectorSyncService,
};
use eyre::{Result, WrapErr};
use tokio::io::BufReader;
use tokio::time::Instant;
use tracing::info;

use config::Config;
use menu::{MenuChoice, Prompt};

#[derive(Parser, Debug)]
#[command(name = "zerg-vector-sync")]
#[command(about = "Sync directory users into MongoDB vector search and query them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List every directory user and upsert them with embeddings
    Sync {
        /// Stop starting new batches after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Print the users most similar to QUERY
    Search {
        /// Free text, e.g. a name
        query: String,
    },
}

/// Run the CLI
///
/// 1. Sets up structured logging (env-aware: JSON for prod, pretty for dev)
/// 2. Connects to MongoDB with retry logic
/// 3. Builds the embedding client and vector store once for the whole run
/// 4. Runs the chosen flow, then closes the MongoDB connection
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let config = Config::from_env().wrap_err("Failed to load configuration")?;

    let client = database::mongodb::connect_with_retry(&config.mongo, None)
        .await
        .wrap_err("Failed to connect to MongoDB")?;
    println!("Connected to MongoDB.");

    let db = client.database(config.mongo.database());
    let store = MongoDocumentStore::new(&db, &config.store.collection);
    let provider =
        OpenAIProvider::new(config.openai.clone()).wrap_err("Failed to set up OpenAI client")?;
    let embeddings = EmbeddingClient::new(Arc::new(provider), config.store.model)
        .with_dimensions(config.store.dimensions);
    let context = VectorContext::new(Arc::new(store), embeddings);

    let service = VectorSyncService::new(&context, config.store.clone(), config.sync.clone());

    let result = dispatch(cli.command, service).await;

    drop(context);
    client.shutdown().await;
    info!("MongoDB connection closed");
    println!("MongoDB connection closed.");

    result
}

async fn dispatch(command: Option<Commands>, service: VectorSyncService) -> Result<()> {
    let mut stdout = std::io::stdout();

    match command {
        Some(Commands::Sync { timeout_secs }) => {
            let service = match timeout_secs {
                Some(secs) => service.with_deadline(Instant::now() + Duration::from_secs(secs)),
                None => service,
            };
            run_sync(&service, &mut stdout).await
        }
        Some(Commands::Search { query }) => {
            commands::search_users(&service, &query, &mut stdout).await?;
            Ok(())
        }
        None => {
            let mut prompt = Prompt::new(BufReader::new(tokio::io::stdin()));
            match prompt.choose(&mut stdout).await? {
                MenuChoice::Sync => run_sync(&service, &mut stdout).await,
                MenuChoice::Search => {
                    let query = prompt
                        .ask(&mut stdout, "Enter the text to search users by: ")
                        .await?;
                    commands::search_users(&service, &query, &mut stdout).await?;
                    Ok(())
                }
                MenuChoice::Exit => {
                    println!("Exiting...");
                    Ok(())
                }
                MenuChoice::Invalid(choice) => {
                    println!("Invalid option '{}'. Try again.", choice);
                    Ok(())
                }
            }
        }
    }
}

async fn run_sync(service: &VectorSyncService, stdout: &mut std::io::Stdout) -> Result<()> {
    let source = GoogleDirectoryClient::from_env()
        .wrap_err("Failed to load directory configuration")?;
    commands::sync_users(service, &source, stdout).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["zerg-vector-sync"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_search_takes_query() {
        let cli = Cli::try_parse_from(["zerg-vector-sync", "search", "Radiante"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Search {
                query: "Radiante".to_string()
            })
        );
    }

    #[test]
    fn test_sync_accepts_timeout() {
        let cli =
            Cli::try_parse_from(["zerg-vector-sync", "sync", "--timeout-secs", "600"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Sync {
                timeout_secs: Some(600)
            })
        );
    }

    #[test]
    fn test_search_requires_query() {
        assert!(Cli::try_parse_from(["zerg-vector-sync", "search"]).is_err());
    }
}
