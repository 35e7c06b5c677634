use mongodb::{Client, bson::doc, options::ClientOptions};
use std::time::Duration;
use tracing::info;

use super::MongoConfig;
use crate::common::{RetryConfig, retry_with_backoff};

/// Error type for MongoDB connection setup
#[derive(Debug, thiserror::Error)]
pub enum MongoError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

/// Connect using a [`MongoConfig`] and verify the deployment answers a ping
///
/// `ping` needs no privileges, unlike listing databases, so it works for
/// least-privilege Atlas users.
pub async fn connect(config: &MongoConfig) -> Result<Client, MongoError> {
    info!(uri = %config.redacted_uri(), "Connecting to MongoDB");

    let mut options = ClientOptions::parse(&config.uri).await?;
    options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
    options.server_selection_timeout =
        Some(Duration::from_secs(config.server_selection_timeout_secs));
    if let Some(ref app_name) = config.app_name {
        options.app_name = Some(app_name.clone());
    }

    let client = Client::with_options(options)?;
    ping(&client, &config.database).await?;

    info!(database = %config.database, "Connected to MongoDB");
    Ok(client)
}

/// Connect with exponential backoff, for transient failures during startup
pub async fn connect_with_retry(
    config: &MongoConfig,
    retry_config: Option<RetryConfig>,
) -> Result<Client, MongoError> {
    retry_with_backoff(|| connect(config), retry_config.unwrap_or_default()).await
}

/// Round-trip a `ping` command against `database`
pub async fn ping(client: &Client, database: &str) -> Result<(), MongoError> {
    client
        .database(database)
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| MongoError::ConnectionFailed(e.to_string()))?;
    Ok(())
}
