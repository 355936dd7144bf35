use super::commands::SnapshotAction;
use atlas_crypto::CircuitParams;
use atlas_daemon::atlas::{OpenedSnapshot, ShadowAtlas};
use atlas_daemon::config::AtlasConfig;
use atlas_daemon::storage::{AtlasStorage, StorageConfig};
use atlas_types::{AtlasError, AtlasResult};
use std::path::Path;
use std::sync::Arc;

pub async fn handle_snapshot(config: &AtlasConfig, action: SnapshotAction) -> AtlasResult<()> {
    match action {
        SnapshotAction::Export { output } => export(config, &output).await,
        SnapshotAction::Inspect { file, content_id } => inspect(&file, content_id.as_deref()),
    }
}

async fn export(config: &AtlasConfig, output: &Path) -> AtlasResult<()> {
    let storage = Arc::new(AtlasStorage::open(StorageConfig::at(config.db_path()))?);
    let params = CircuitParams::new(config.atlas.district_depth, config.atlas.global_depth)?;
    let atlas = ShadowAtlas::open(storage, params, config.root_history)?;

    let encoded = atlas.export_snapshot().await?;
    std::fs::write(output, &encoded.bytes)
        .map_err(|e| AtlasError::Internal(format!("Failed to write {:?}: {}", output, e)))?;

    println!("Atlas version: {}", encoded.atlas_version);
    println!("Content id:    {}", encoded.content_id);
    println!("Size:          {} bytes", encoded.bytes.len());
    println!("Written to {}", output.display());
    Ok(())
}

pub(super) fn read_snapshot(file: &Path, content_id: Option<&str>) -> AtlasResult<OpenedSnapshot> {
    let bytes = std::fs::read(file)
        .map_err(|e| AtlasError::NotFound(format!("Failed to read {:?}: {}", file, e)))?;
    OpenedSnapshot::open(&bytes, content_id)
}

fn inspect(file: &Path, content_id: Option<&str>) -> AtlasResult<()> {
    let snapshot = read_snapshot(file, content_id)?;
    let head = snapshot.head();
    let params = snapshot.params();

    println!("[+] Every district root and the global root recompute");
    println!("Content id:     {}", snapshot.content_id());
    println!("Atlas version:  {}", head.version);
    println!("Global root:    {}", head.global_root);
    println!("Published at:   {}", head.published_at.to_rfc3339());
    println!("Depths:         {}/{}", params.district_depth, params.global_depth);
    println!("Jurisdictions:  {}", snapshot.jurisdiction_count());
    Ok(())
}
