//! Policy Checkpointing
//!
//! Persists serializable training artifacts as pretty JSON files under a
//! directory, keeping a bounded number of them. Save order is recorded in a
//! small ledger file so that "oldest" and "latest" follow save time rather
//! than file names.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, TraderError};

const EXTENSION: &str = "json";
/// One checkpoint name per line, oldest first
const ORDER_FILE: &str = "checkpoints.order";

/// Saves and loads checkpoints as `<dir>/<name>.json`
#[derive(Debug, Clone)]
pub struct Checkpointer {
    checkpoint_dir: PathBuf,
    max_checkpoints: usize,
}

impl Checkpointer {
    /// Create a checkpointer, creating the directory if needed
    pub fn new<P: AsRef<Path>>(checkpoint_dir: P, max_checkpoints: usize) -> Result<Self> {
        let checkpoint_dir = checkpoint_dir.as_ref().to_path_buf();
        fs::create_dir_all(&checkpoint_dir).map_err(|e| {
            TraderError::Checkpoint(format!(
                "cannot create checkpoint directory {}: {}",
                checkpoint_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            checkpoint_dir,
            max_checkpoints: max_checkpoints.max(1),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    /// File path for `name`; names are plain file stems
    pub fn checkpoint_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.checkpoint_dir.join(format!("{}.{}", name, EXTENSION)))
    }

    /// Write `value` under `name`, then prune the oldest checkpoints.
    ///
    /// The checkpoint just written always counts as the newest and is never
    /// pruned, even when a checkpoint of the same name existed before.
    pub fn save<T: Serialize>(&self, value: &T, name: &str) -> Result<PathBuf> {
        let path = self.checkpoint_path(name)?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        info!(path = %path.display(), "saved checkpoint");

        let mut order = self.list_checkpoints();
        order.retain(|n| n != name);
        order.push(name.to_string());

        let excess = order.len().saturating_sub(self.max_checkpoints);
        let mut kept = Vec::with_capacity(order.len());
        for (i, old) in order.into_iter().enumerate() {
            if i >= excess {
                kept.push(old);
                continue;
            }
            let old_path = self.checkpoint_dir.join(format!("{}.{}", old, EXTENSION));
            match fs::remove_file(&old_path) {
                Ok(()) => info!(checkpoint = %old, "removed old checkpoint"),
                Err(e) => {
                    warn!(path = %old_path.display(), error = %e, "failed to remove old checkpoint");
                    kept.push(old);
                }
            }
        }

        self.write_order(&kept)?;
        Ok(path)
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.checkpoint_path(name)?;
        if !path.exists() {
            return Err(TraderError::Checkpoint(format!(
                "checkpoint not found: {}",
                path.display()
            )));
        }

        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Checkpoint names from oldest to newest.
    ///
    /// Files saved by this checkpointer follow save order. Files that were
    /// put in the directory some other way come first, by modification time.
    pub fn list_checkpoints(&self) -> Vec<String> {
        let on_disk = self.files_on_disk();
        let recorded = self.read_order();

        let mut untracked: Vec<&(String, SystemTime)> = on_disk
            .iter()
            .filter(|(name, _)| !recorded.contains(name))
            .collect();
        untracked.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut names: Vec<String> = untracked.into_iter().map(|(n, _)| n.clone()).collect();
        names.extend(
            recorded
                .into_iter()
                .filter(|name| on_disk.iter().any(|(n, _)| n == name)),
        );
        names
    }

    pub fn latest_checkpoint(&self) -> Option<String> {
        self.list_checkpoints().pop()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.checkpoint_path(name).map(|p| p.exists()).unwrap_or(false)
    }

    fn files_on_disk(&self) -> Vec<(String, SystemTime)> {
        fs::read_dir(&self.checkpoint_dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    return None;
                }
                let name = path.file_stem()?.to_str()?.to_string();
                if validate_name(&name).is_err() {
                    return None;
                }
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                Some((name, modified))
            })
            .collect()
    }

    fn read_order(&self) -> Vec<String> {
        let mut seen = Vec::new();
        let Ok(contents) = fs::read_to_string(self.checkpoint_dir.join(ORDER_FILE)) else {
            return seen;
        };
        for line in contents.lines().map(str::trim) {
            if !line.is_empty() && !seen.iter().any(|n| n == line) {
                seen.push(line.to_string());
            }
        }
        seen
    }

    fn write_order(&self, names: &[String]) -> Result<()> {
        let mut contents = names.join("\n");
        contents.push('\n');
        fs::write(self.checkpoint_dir.join(ORDER_FILE), contents)?;
        Ok(())
    }
}

/// Accept plain file stems only: ASCII letters, digits, `-`, `_` and `.`,
/// not starting with a dot.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(TraderError::Checkpoint(format!(
            "invalid checkpoint name '{}'",
            name
        )))
    }
}

/// Checkpoint name with a UTC timestamp suffix
pub fn timestamped_name(prefix: &str) -> String {
    let now = chrono::Utc::now();
    format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Checkpoint name with a zero-padded iteration number
pub fn iteration_name(prefix: &str, iteration: usize) -> String {
    format!("{}_it{:06}", prefix, iteration)
}
