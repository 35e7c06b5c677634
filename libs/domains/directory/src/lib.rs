//! Directory Domain Library
//!
//! Lists users from an organization directory (Google Workspace) and maps them
//! to flat records for the vector sync.
//!
//! ```rust,no_run
//! use domain_directory::{GoogleDirectoryClient, fetch_all_users};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = GoogleDirectoryClient::from_env()?;
//! let users = fetch_all_users(&source).await?;
//! println!("{} users", users.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod google;
pub mod lookup;
pub mod models;
pub mod source;

pub use error::{DirectoryError, DirectoryResult};
pub use google::{GoogleDirectoryClient, GoogleDirectoryConfig};
pub use lookup::lookup_path;
pub use models::{CustomField, DirectoryUser, UserPage, UserStatus};
pub use source::{DirectorySource, fetch_all_users};
