//! Read-only snippet commands.
//!
//! Handles listing, showing and the revision history of snippets.

use anyhow::Context;
use snipvault_core::{SnippetId, Vault};

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let head: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// List all snippets.
pub async fn list(vault: &Vault, json: bool) -> anyhow::Result<()> {
    let listing = vault
        .snippets()
        .list_report()
        .await
        .context("Failed to list snippets")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing.snippets)?);
        return Ok(());
    }

    if listing.snippets.is_empty() {
        println!("No snippets found.");
    } else {
        println!("{:<38} {:<8} {:<30} {:<20}", "ID", "ACCESS", "TITLE", "UPDATED");
        println!("{}", "-".repeat(98));
        for snippet in &listing.snippets {
            let access = if snippet.is_public { "public" } else { "private" };
            println!(
                "{:<38} {:<8} {:<30} {:<20}",
                snippet.id,
                access,
                truncate(&snippet.title, 30),
                snippet.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    if !listing.skipped.is_empty() {
        eprintln!();
        eprintln!("Skipped {} unreadable snippet(s):", listing.skipped.len());
        for id in &listing.skipped {
            eprintln!("  {id}");
        }
    }
    Ok(())
}

/// Show one snippet with its files.
pub async fn show(vault: &Vault, id: &str, json: bool) -> anyhow::Result<()> {
    let id = SnippetId::from_string(id);
    let Some(snippet) = vault.snippets().get(&id).await? else {
        anyhow::bail!("Snippet not found: {id}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snippet)?);
        return Ok(());
    }

    println!("Snippet: {}", snippet.id);
    println!("Title: {}", snippet.title);
    if !snippet.description.is_empty() {
        println!("Description: {}", snippet.description);
    }
    if !snippet.tags.is_empty() {
        println!("Tags: {}", snippet.tags.join(", "));
    }
    println!("Public: {}", snippet.is_public);
    println!("Created: {}", snippet.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", snippet.updated_at.format("%Y-%m-%d %H:%M:%S"));

    for file in &snippet.files {
        println!();
        println!("== {} ({}) ==", file.filename, file.language);
        println!("{}", file.code.trim_end_matches('\n'));
    }
    Ok(())
}

/// Show the revision history of a snippet, newest first.
pub async fn history(vault: &Vault, id: &str, limit: usize) -> anyhow::Result<()> {
    let id = SnippetId::from_string(id);
    let revisions = vault.history().list_revisions(&id, limit).await?;

    if revisions.is_empty() {
        println!("No revisions found for {id}.");
        return Ok(());
    }

    for revision in revisions {
        let short: String = revision.sha.chars().take(7).collect();
        let message = revision.message.lines().next().unwrap_or_default();
        let stats = match revision.stats {
            Some(stats) => format!("+{:<4} -{:<4}", stats.additions, stats.deletions),
            None => format!("{:<11}", "?"),
        };
        println!(
            "{} {} {:<7} {} {} ({})",
            short,
            revision.author.date.format("%Y-%m-%d %H:%M"),
            format!("{:?}", revision.kind).to_lowercase(),
            stats,
            message,
            revision.author.name
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
        assert_eq!(truncate("ünïcödé tïtlé", 8), "ünïcö...");
    }
}
