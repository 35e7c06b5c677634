use core_config::{ConfigError, FromEnv, env_or_default, env_parse, env_required};

/// MongoDB connection settings
///
/// Environment variables:
/// - `MONGO_URI` (required) - connection string, Atlas `mongodb+srv://` URIs included
/// - `MONGO_DB_NAME` (default: `vector_db`)
/// - `MONGO_APP_NAME` (default: `zerg-vector-sync`)
/// - `MONGO_CONNECT_TIMEOUT_SECS` (default: 10)
/// - `MONGO_SERVER_SELECTION_TIMEOUT_SECS` (default: 30)
#[derive(Clone, Debug)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub app_name: Option<String>,
    pub connect_timeout_secs: u64,
    pub server_selection_timeout_secs: u64,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            app_name: None,
            connect_timeout_secs: 10,
            server_selection_timeout_secs: 30,
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Connection string with any `user:password@` section masked, for logging
    pub fn redacted_uri(&self) -> String {
        match (self.uri.find("://"), self.uri.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***@{}", &self.uri[..scheme_end], &self.uri[at + 1..])
            }
            _ => self.uri.clone(),
        }
    }
}

impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            uri: env_required("MONGO_URI")?,
            database: env_or_default("MONGO_DB_NAME", "vector_db"),
            app_name: Some(env_or_default("MONGO_APP_NAME", "zerg-vector-sync")),
            connect_timeout_secs: env_parse("MONGO_CONNECT_TIMEOUT_SECS", 10)?,
            server_selection_timeout_secs: env_parse("MONGO_SERVER_SELECTION_TIMEOUT_SECS", 30)?,
        })
    }
}
