use crate::models::ResultSet;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Durable sink for the accumulated result set. `write` replaces the whole
/// working snapshot; `promote` makes the final output from it.
pub trait CheckpointStore {
    fn write(&mut self, results: &ResultSet) -> Result<()>;
    fn promote(&mut self, results: &ResultSet) -> Result<()>;
}

/// `items.json` checkpoints to `items.checkpoint.json`.
pub fn checkpoint_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}.checkpoint.json", stem))
}

/// Reads a working checkpoint. Missing, unreadable or corrupt files give
/// `Ok(None)`; the caller starts from an empty set.
pub fn load_if_valid(path: &Path) -> Result<Option<ResultSet>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open checkpoint file: {:?}", path))?;
    let reader = BufReader::new(file);

    match serde_json::from_reader::<_, ResultSet>(reader) {
        Ok(results) => {
            info!(records = results.len(), path = ?path, "Loaded checkpoint");
            Ok(Some(results))
        }
        Err(e) => {
            warn!(error = %e, "Checkpoint file is corrupt or unreadable");
            Ok(None)
        }
    }
}

pub fn clear(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove checkpoint file: {:?}", path))?;
        info!("Checkpoint cleared");
    }
    Ok(())
}

/// File-backed store: each write goes to a temp file renamed over the working
/// checkpoint, so a reader never sees a half-written snapshot.
pub struct CheckpointManager {
    working_path: PathBuf,
    output_path: PathBuf,
}

impl CheckpointManager {
    pub fn new(output_path: &Path) -> Self {
        Self {
            working_path: checkpoint_path(output_path),
            output_path: output_path.to_path_buf(),
        }
    }

    pub fn working_path(&self) -> &Path {
        &self.working_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn load(&self) -> Result<Option<ResultSet>> {
        load_if_valid(&self.working_path)
    }

    pub fn clear(&self) -> Result<()> {
        clear(&self.working_path)
    }
}

impl CheckpointStore for CheckpointManager {
    fn write(&mut self, results: &ResultSet) -> Result<()> {
        if let Some(parent) = self.working_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        let tmp_path = self.working_path.with_extension("json.tmp");
        let file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create temp checkpoint file: {:?}", tmp_path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, results)
            .context("Failed to serialize checkpoint")?;
        writer.flush().context("Failed to flush checkpoint")?;
        writer
            .get_ref()
            .sync_all()
            .context("Failed to sync checkpoint to disk")?;

        fs::rename(&tmp_path, &self.working_path).with_context(|| {
            format!("Failed to rename temp checkpoint: {:?}", self.working_path)
        })?;

        debug!(records = results.len(), "Checkpoint saved");
        Ok(())
    }

    fn promote(&mut self, results: &ResultSet) -> Result<()> {
        self.write(results)?;
        fs::rename(&self.working_path, &self.output_path).with_context(|| {
            format!(
                "Failed to promote checkpoint {:?} to {:?}",
                self.working_path, self.output_path
            )
        })?;
        info!(records = results.len(), path = ?self.output_path, "Results promoted");
        Ok(())
    }
}
