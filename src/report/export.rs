use std::path::Path;

use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::AppResult;
use crate::metrics::StatsSnapshot;

/// Write the final snapshot as pretty JSON.
///
/// # Errors
///
/// Returns an error when the snapshot cannot be serialized or the file
/// cannot be written.
pub async fn export_json(path: &Path, snapshot: &StatsSnapshot) -> AppResult<()> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&json).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
