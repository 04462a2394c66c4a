use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// FoldConfig – parameters of the stratified fold assignment
// ---------------------------------------------------------------------------

/// Parameters of the stratified fold assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldConfig {
    /// Number of folds, at least 2.
    pub n_splits: usize,
    /// Seed for the per-bin shuffle.
    pub random_state: u64,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            random_state: 48,
        }
    }
}

impl FoldConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_splits < 2 {
            return Err(Error::invalid(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SplitConfig – how the assigned table is consumed downstream
// ---------------------------------------------------------------------------

/// Selection of the validation fold and the payload layout on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fold held out for validation; no split is reported when unset.
    pub fold_index: Option<i64>,
    pub batch_size: usize,
    /// Directory (relative to the data root) holding per-event payloads.
    pub events_dir: PathBuf,
}

impl SplitConfig {
    /// The fold to validate on: `requested` if given, else `fold_index`.
    pub fn validation_fold(&self, requested: Option<i64>) -> Option<i64> {
        requested.or(self.fold_index)
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            fold_index: None,
            batch_size: 32,
            events_dir: PathBuf::from("train_events"),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig – the on-disk JSON document
// ---------------------------------------------------------------------------

/// Everything `make-folds` reads from its `--config` file.
///
/// ```json
/// { "folds": { "n_splits": 5, "random_state": 48 },
///   "split": { "fold_index": 0, "batch_size": 32 } }
/// ```
///
/// Missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub folds: FoldConfig,
    pub split: SplitConfig,
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(text)?;
        config.folds.validate()?;
        Ok(config)
    }
}
