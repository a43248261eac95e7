//! Search document export for the offline full-text indexer.

use anyhow::Context;
use snipvault_core::{render_public, Vault};
use std::path::Path;
use tracing::info;

/// Write one HTML document per public snippet into `out`.
pub async fn index(vault: &Vault, out: &Path) -> anyhow::Result<()> {
    let snippets = vault.snippets().list().await?;
    let documents = render_public(&snippets);

    tokio::fs::create_dir_all(out)
        .await
        .with_context(|| format!("Failed to create {}", out.display()))?;

    for document in &documents {
        let path = out.join(document.file_name());
        tokio::fs::write(&path, &document.html)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    info!(
        documents = documents.len(),
        skipped_private = snippets.len() - documents.len(),
        "Wrote search documents"
    );
    println!("Wrote {} document(s) to {}", documents.len(), out.display());
    Ok(())
}
