//! The sync and search flows, with their console output

use std::io::Write;

use domain_directory::{DirectorySource, DirectoryUser, fetch_all_users};
use domain_vector::{Record, SearchHit, UpsertSummary, VectorSyncService};
use eyre::{Result, WrapErr};
use tracing::info;

pub fn users_to_records(users: Vec<DirectoryUser>) -> Vec<Record> {
    users
        .into_iter()
        .map(|user| Record::from(user.into_fields()))
        .collect()
}

/// List the whole directory and sync it into the vector store
pub async fn sync_users<W: Write>(
    service: &VectorSyncService,
    source: &dyn DirectorySource,
    out: &mut W,
) -> Result<UpsertSummary> {
    writeln!(out, "Listing directory users...")?;
    let users = fetch_all_users(source)
        .await
        .wrap_err("Failed to list directory users")?;
    info!(users = users.len(), "Directory users fetched");

    let summary = service
        .sync(users_to_records(users))
        .await
        .wrap_err("Sync failed")?;

    write_summary(out, &summary)?;
    Ok(summary)
}

/// Search and print the hits; blank text cancels without touching the store
pub async fn search_users<W: Write>(
    service: &VectorSyncService,
    query: &str,
    out: &mut W,
) -> Result<Vec<SearchHit>> {
    if query.trim().is_empty() {
        writeln!(out, "Search cancelled, no text entered.")?;
        return Ok(vec![]);
    }

    writeln!(out, "Searching users similar to '{}'...", query.trim())?;
    let hits = service
        .search(query.trim())
        .await
        .wrap_err("Search failed")?;

    write_hits(out, &hits)?;
    Ok(hits)
}

pub fn write_summary<W: Write>(out: &mut W, summary: &UpsertSummary) -> std::io::Result<()> {
    writeln!(
        out,
        "Sync finished: {} inserted, {} updated, {} skipped, {} failed batches",
        summary.upserted, summary.updated, summary.skipped, summary.failed_batches
    )?;
    if summary.stopped_early {
        writeln!(out, "Stopped at the deadline; run again to finish.")?;
    }
    Ok(())
}

pub fn write_hits<W: Write>(out: &mut W, hits: &[SearchHit]) -> std::io::Result<()> {
    if hits.is_empty() {
        return writeln!(out, "No similar users found.");
    }

    for (rank, hit) in hits.iter().enumerate() {
        let label = hit.label.as_deref().unwrap_or("<no name>");
        match hit.fields.get("email").and_then(|email| email.as_str()) {
            Some(email) => writeln!(
                out,
                "{}. {} <{}> (score {:.4})",
                rank + 1,
                label,
                email,
                hit.score
            )?,
            None => writeln!(out, "{}. {} (score {:.4})", rank + 1, label, hit.score)?,
        }
    }
    Ok(())
}
