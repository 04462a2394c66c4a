//! Stratified cross-validation folds over the event table.
//!
//! Events are bucketed into deciles of `log10(n_pulses)` and every decile is
//! spread evenly over the folds, so each fold sees the same mix of small and
//! large events.

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::FoldConfig;
use crate::data::model::EventTable;
use crate::error::{Error, Result};

/// Number of quantile buckets used for stratification.
pub const N_BINS: usize = 10;

/// What a fold assignment produced, for logging and later comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldSummary {
    /// Rows per fold, indexed by fold.
    pub fold_sizes: Vec<usize>,
    /// Rows per stratification bin, indexed by bin.
    pub bin_sizes: Vec<usize>,
    /// Bucket edges in `log10(n_pulses)` space, `bin_sizes.len() + 1` long.
    pub bin_edges: Vec<f64>,
}

/// Populate `n_pulses`, `bins` and `fold` on every row.
///
/// Zero-pulse events are counted as one pulse before the logarithm.  On error
/// the table is left untouched.
pub fn assign_folds(table: &mut EventTable, config: &FoldConfig) -> Result<FoldSummary> {
    config.validate()?;
    if table.is_empty() {
        return Err(Error::invalid("cannot assign folds to an empty table"));
    }

    let mut n_pulses = Vec::with_capacity(table.len());
    for (row, rec) in table.records.iter().enumerate() {
        let n = rec.pulse_count().ok_or_else(|| {
            Error::invalid(format!(
                "row {row}: pulse range {}..{} overflows",
                rec.first_pulse_index, rec.last_pulse_index
            ))
        })?;
        if n < 0 {
            return Err(Error::invalid(format!(
                "row {row}: last_pulse_index {} precedes first_pulse_index {}",
                rec.last_pulse_index, rec.first_pulse_index
            )));
        }
        n_pulses.push(n);
    }

    let log_pulses: Vec<f64> = n_pulses.iter().map(|&n| (n.max(1) as f64).log10()).collect();
    let (bins, bin_edges) = quantile_bins(&log_pulses, N_BINS)?;
    debug!("stratification edges (log10 n_pulses): {bin_edges:?}");

    let folds = stratified_folds(&bins, config.n_splits, config.random_state)?;

    for (((rec, n), bin), fold) in table
        .records
        .iter_mut()
        .zip(&n_pulses)
        .zip(&bins)
        .zip(&folds)
    {
        rec.n_pulses = Some(*n);
        rec.bins = Some(*bin);
        rec.fold = *fold;
    }

    let mut fold_sizes = vec![0usize; config.n_splits];
    for &f in &folds {
        fold_sizes[f as usize] += 1;
    }
    let mut bin_sizes = vec![0usize; N_BINS];
    for &b in &bins {
        bin_sizes[b as usize] += 1;
    }
    info!(
        "assigned {} events to {} folds (seed {}): {fold_sizes:?}",
        table.len(),
        config.n_splits,
        config.random_state
    );

    Ok(FoldSummary {
        fold_sizes,
        bin_sizes,
        bin_edges,
    })
}

// ---------------------------------------------------------------------------
// Quantile bucketing
// ---------------------------------------------------------------------------

/// Linearly interpolated quantile of already sorted data.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Bucket `values` into `n_bins` equal-population intervals.
///
/// Intervals are right-closed with the minimum included in the first one.
/// Fails when tied values make two edges coincide, since fewer than `n_bins`
/// buckets would remain.  Returns the per-value labels and the edges.
pub fn quantile_bins(values: &[f64], n_bins: usize) -> Result<(Vec<i64>, Vec<f64>)> {
    if values.is_empty() {
        return Err(Error::invalid("cannot bucket an empty set of values"));
    }
    if n_bins == 0 {
        return Err(Error::invalid("need at least one bucket"));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let edges: Vec<f64> = (0..=n_bins)
        .map(|i| quantile_sorted(&sorted, i as f64 / n_bins as f64))
        .collect();
    let tied: Vec<f64> = edges
        .windows(2)
        .filter(|w| w[0] == w[1])
        .map(|w| w[0])
        .collect();
    if !tied.is_empty() {
        return Err(Error::invalid(format!(
            "quantile edges are not unique, tied at {tied:?}; {n_bins} buckets cannot be formed"
        )));
    }

    let last_bin = n_bins - 1;
    let labels = values
        .iter()
        .map(|v| edges[1..].partition_point(|e| e < v).min(last_bin) as i64)
        .collect();
    Ok((labels, edges))
}

// ---------------------------------------------------------------------------
// Stratified k-fold
// ---------------------------------------------------------------------------

/// Assign each row a fold in `0..n_splits` so that every label is spread
/// as evenly as possible over the folds.
///
/// Per-fold quotas are dealt round-robin over the label-sorted rows, then
/// the fold labels inside each class are shuffled with a [`ChaCha8Rng`]
/// seeded from `seed`.  The result depends only on the row order, the
/// labels, `n_splits` and `seed`.
pub fn stratified_folds(labels: &[i64], n_splits: usize, seed: u64) -> Result<Vec<i64>> {
    if n_splits < 2 {
        return Err(Error::invalid(format!(
            "n_splits must be at least 2, got {n_splits}"
        )));
    }
    if labels.is_empty() {
        return Err(Error::invalid("cannot split an empty label set"));
    }

    let mut classes: Vec<i64> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let class_of = |label: i64| classes.partition_point(|&c| c < label);

    let mut counts = vec![0usize; classes.len()];
    for &label in labels {
        counts[class_of(label)] += 1;
    }
    if let Some((k, &n)) = counts.iter().enumerate().find(|(_, &n)| n < n_splits) {
        return Err(Error::invalid(format!(
            "label {} has {n} member(s), fewer than n_splits={n_splits}",
            classes[k]
        )));
    }

    // allocation[k][f]: rows of class k held out in fold f.
    let mut allocation = vec![vec![0usize; n_splits]; classes.len()];
    let mut position = 0usize;
    for (k, &n) in counts.iter().enumerate() {
        for j in position..position + n {
            allocation[k][j % n_splits] += 1;
        }
        position += n;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut per_class: Vec<std::vec::IntoIter<i64>> = allocation
        .iter()
        .map(|quota| {
            let mut folds: Vec<i64> = quota
                .iter()
                .enumerate()
                .flat_map(|(f, &q)| std::iter::repeat(f as i64).take(q))
                .collect();
            folds.shuffle(&mut rng);
            folds.into_iter()
        })
        .collect();

    labels
        .iter()
        .map(|&label| {
            per_class[class_of(label)]
                .next()
                .ok_or_else(|| Error::invalid("fold quota exhausted"))
        })
        .collect()
}
