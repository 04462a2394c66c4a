use std::path::{Path, PathBuf};

use log::info;

use super::model::{EventRecord, EventTable};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Train / validation selection by fold
// ---------------------------------------------------------------------------

/// Rows of an assigned table split around one held-out fold.
#[derive(Debug, Clone, Default)]
pub struct FoldSplit {
    /// Rows with `fold != k`.
    pub train: Vec<EventRecord>,
    /// Rows with `fold == k`.
    pub valid: Vec<EventRecord>,
}

impl FoldSplit {
    /// Optimiser steps per epoch over the training rows.
    pub fn train_steps(&self, batch_size: usize) -> f64 {
        self.train.len() as f64 / batch_size.max(1) as f64
    }
}

/// Split an assigned table into training and validation rows.
///
/// Fails when a row is still unassigned or when `fold_index` selects nothing.
pub fn split_by_fold(table: &EventTable, fold_index: i64) -> Result<FoldSplit> {
    if let Some(pos) = table.records.iter().position(|r| !r.is_assigned()) {
        return Err(Error::invalid(format!(
            "row {pos} has no fold; run fold assignment first"
        )));
    }

    let (valid, train): (Vec<EventRecord>, Vec<EventRecord>) = table
        .records
        .iter()
        .cloned()
        .partition(|r| r.fold == fold_index);

    if valid.is_empty() {
        return Err(Error::invalid(format!("fold {fold_index} holds no rows")));
    }

    info!("{} train and {} valid samples", train.len(), valid.len());
    Ok(FoldSplit { train, valid })
}

// ---------------------------------------------------------------------------
// Per-event payload location
// ---------------------------------------------------------------------------

/// `root/events_dir/batch_{batch_id}/event_{event_id}.pt`
pub fn event_path(root: &Path, events_dir: &Path, batch_id: i64, event_id: i64) -> PathBuf {
    root.join(events_dir)
        .join(format!("batch_{batch_id}"))
        .join(format!("event_{event_id}.pt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned(event_id: i64, fold: i64) -> EventRecord {
        let mut rec = EventRecord::new(1, event_id, 0, 10);
        rec.n_pulses = Some(10);
        rec.bins = Some(0);
        rec.fold = fold;
        rec
    }

    #[test]
    fn partitions_on_fold_equality() {
        let table = EventTable::new((0..10).map(|i| assigned(i, i % 5)).collect());
        let split = split_by_fold(&table, 2).unwrap();

        assert_eq!(split.valid.len(), 2);
        assert_eq!(split.train.len(), 8);
        assert!(split.valid.iter().all(|r| r.fold == 2));
        assert!(split.train.iter().all(|r| r.fold != 2));
        assert_eq!(split.train_steps(4), 2.0);
    }

    #[test]
    fn unassigned_rows_are_rejected() {
        let mut table = EventTable::new((0..4).map(|i| assigned(i, i % 2)).collect());
        table.records.push(EventRecord::new(1, 99, 0, 3));
        assert!(matches!(split_by_fold(&table, 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn empty_fold_is_rejected() {
        let table = EventTable::new((0..4).map(|i| assigned(i, i % 2)).collect());
        assert!(split_by_fold(&table, 3).is_err());
    }

    #[test]
    fn payload_path_layout() {
        let path = event_path(Path::new("/data"), Path::new("train_events"), 7, 1234);
        assert_eq!(path, PathBuf::from("/data/train_events/batch_7/event_1234.pt"));
    }
}
