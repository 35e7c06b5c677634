//! Google Workspace Admin Directory source
//!
//! Lists users with OAuth2 and a pre-authorized refresh token. The token needs the
//! `https://www.googleapis.com/auth/admin.directory.user.readonly` scope.
//!
//! Environment variables:
//! - `GOOGLE_CLIENT_ID` - OAuth2 client ID
//! - `GOOGLE_CLIENT_SECRET` - OAuth2 client secret
//! - `GOOGLE_REFRESH_TOKEN` - Pre-authorized refresh token
//! - `GOOGLE_CUSTOMER` (default: `my_customer`)
//! - `GOOGLE_DIRECTORY_PAGE_SIZE` (default: 500, at most 500)
//! - `DIRECTORY_CUSTOM_SCHEMA` / `DIRECTORY_CUSTOM_FIELD` - optional, set both or neither

use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse, env_required};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::error::{DirectoryError, DirectoryResult};
use crate::models::{CustomField, GoogleUserList, UserPage};
use crate::source::DirectorySource;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE_URL: &str = "https://admin.googleapis.com";
const MAX_PAGE_SIZE: u32 = 500;
/// Refresh this long before the access token actually expires
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GoogleDirectoryConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub customer: String,
    pub page_size: u32,
    pub custom_field: Option<CustomField>,
    pub token_url: String,
    pub api_base_url: String,
}

impl GoogleDirectoryConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            customer: "my_customer".to_string(),
            page_size: MAX_PAGE_SIZE,
            custom_field: None,
            token_url: TOKEN_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }

    pub fn with_custom_field(
        mut self,
        schema: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.custom_field = Some(CustomField {
            schema: schema.into(),
            field: field.into(),
        });
        self
    }

    /// Point both endpoints at another host, e.g. a local mock server
    pub fn with_endpoints(
        mut self,
        token_url: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Self {
        self.token_url = token_url.into();
        self.api_base_url = api_base_url.into();
        self
    }
}

impl FromEnv for GoogleDirectoryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let page_size = env_parse("GOOGLE_DIRECTORY_PAGE_SIZE", MAX_PAGE_SIZE)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                key: "GOOGLE_DIRECTORY_PAGE_SIZE".to_string(),
                details: format!("must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }

        let custom_field = match (
            env_optional("DIRECTORY_CUSTOM_SCHEMA"),
            env_optional("DIRECTORY_CUSTOM_FIELD"),
        ) {
            (Some(schema), Some(field)) => Some(CustomField { schema, field }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "DIRECTORY_CUSTOM_SCHEMA".to_string(),
                    details: "must be set together with DIRECTORY_CUSTOM_FIELD".to_string(),
                });
            }
        };

        Ok(Self {
            client_id: env_required("GOOGLE_CLIENT_ID")?,
            client_secret: env_required("GOOGLE_CLIENT_SECRET")?,
            refresh_token: env_required("GOOGLE_REFRESH_TOKEN")?,
            customer: env_or_default("GOOGLE_CUSTOMER", "my_customer"),
            page_size,
            custom_field,
            token_url: env_or_default("GOOGLE_TOKEN_URL", TOKEN_URL),
            api_base_url: env_or_default("GOOGLE_DIRECTORY_BASE_URL", API_BASE_URL),
        })
    }
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Token response from Google OAuth2
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Admin Directory `users.list` client
pub struct GoogleDirectoryClient {
    client: Client,
    config: GoogleDirectoryConfig,
    token_cache: RwLock<Option<CachedToken>>,
}

impl GoogleDirectoryClient {
    pub fn new(config: GoogleDirectoryConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            token_cache: RwLock::new(None),
        }
    }

    pub fn from_env() -> DirectoryResult<Self> {
        Ok(Self::new(GoogleDirectoryConfig::from_env()?))
    }

    /// Get a valid access token, refreshing if necessary
    async fn access_token(&self) -> DirectoryResult<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if Instant::now() < cached.refresh_at {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let token = self.refresh_access_token().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);

        let mut cache = self.token_cache.write().await;
        *cache = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn refresh_access_token(&self) -> DirectoryResult<TokenResponse> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", self.config.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| DirectoryError::Auth(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Auth(format!(
                "Token refresh failed ({}): {}",
                status, body
            )));
        }

        debug!("Directory access token refreshed");
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| DirectoryError::Auth(format!("Failed to parse token response: {}", e)))
    }

    fn users_url(&self) -> String {
        format!(
            "{}/admin/directory/v1/users",
            self.config.api_base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl DirectorySource for GoogleDirectoryClient {
    #[instrument(skip(self), fields(customer = %self.config.customer))]
    async fn list_users(&self, page_token: Option<String>) -> DirectoryResult<UserPage> {
        let access_token = self.access_token().await?;
        let page_size = self.config.page_size.to_string();

        let mut query = vec![
            ("customer", self.config.customer.as_str()),
            ("maxResults", page_size.as_str()),
            ("orderBy", "email"),
            ("projection", "full"),
        ];
        if let Some(token) = page_token.as_deref() {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(self.users_url())
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Request(format!(
                "users.list returned {}: {}",
                status, body
            )));
        }

        let list: GoogleUserList = response.json().await?;
        let custom_field = self.config.custom_field.as_ref();

        Ok(UserPage {
            users: list
                .users
                .into_iter()
                .map(|user| user.into_directory_user(custom_field))
                .collect(),
            next_page_token: list.next_page_token,
        })
    }
}
