use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::DirectoryResult;
use crate::models::{DirectoryUser, UserPage};

/// A paginated user directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// One page of users; `None` requests the first page
    async fn list_users(&self, page_token: Option<String>) -> DirectoryResult<UserPage>;
}

/// Every user across all pages, in listing order.
///
/// Stops when a page has no next-page token or comes back empty.
pub async fn fetch_all_users(source: &dyn DirectorySource) -> DirectoryResult<Vec<DirectoryUser>> {
    let mut users = Vec::new();
    let mut page_token = None;
    let mut pages = 0usize;

    loop {
        let page = source.list_users(page_token.take()).await?;
        pages += 1;
        debug!(page = pages, users = page.users.len(), "Directory page fetched");

        let page_was_empty = page.users.is_empty();
        users.extend(page.users);

        match page.next_page_token {
            Some(token) if !page_was_empty && !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    info!(users = users.len(), pages, "Directory listing complete");
    Ok(users)
}
