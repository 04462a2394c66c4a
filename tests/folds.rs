use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use neutrino_direction::data::{loader, split, writer};
use neutrino_direction::folds::{assign_folds, N_BINS};
use neutrino_direction::{Direction, Error, EventRecord, EventTable, FoldConfig};

/// Events with a heavy-tailed pulse-count distribution.
fn synthetic_table(n: usize, seed: u64) -> EventTable {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut cursor = 0i64;
    let records = (0..n)
        .map(|i| {
            let z: f64 = rng.gen_range(-2.5..2.5);
            let pulses = (4.0 + 0.9 * z).exp().round() as i64;
            let rec = EventRecord::new(1 + (i / 1000) as i64, i as i64, cursor, cursor + pulses)
                .with_direction(Direction::new(rng.gen_range(0.0..6.28), rng.gen_range(0.0..3.14)));
            cursor += pulses;
            rec
        })
        .collect();
    EventTable::new(records)
}

fn count(table: &EventTable, pred: impl Fn(&EventRecord) -> bool) -> usize {
    table.records.iter().filter(|r| pred(r)).count()
}

#[test]
fn every_row_gets_a_fold() {
    let mut table = synthetic_table(5_000, 1);
    let config = FoldConfig::default();
    assign_folds(&mut table, &config).unwrap();

    for rec in &table.records {
        assert!((0..config.n_splits as i64).contains(&rec.fold), "fold {}", rec.fold);
        assert_eq!(rec.n_pulses, Some(rec.last_pulse_index - rec.first_pulse_index));
        assert!((0..N_BINS as i64).contains(&rec.bins.unwrap()));
    }
}

#[test]
fn folds_are_balanced() {
    let mut table = synthetic_table(5_000, 2);
    let summary = assign_folds(&mut table, &FoldConfig::default()).unwrap();

    assert_eq!(summary.fold_sizes.iter().sum::<usize>(), 5_000);
    for (f, &size) in summary.fold_sizes.iter().enumerate() {
        let relative = (size as f64 - 1_000.0).abs() / 1_000.0;
        assert!(relative <= 0.01, "fold {f} has {size} rows");
        assert_eq!(size, count(&table, |r| r.fold == f as i64));
    }
}

#[test]
fn every_fold_sees_every_decile() {
    let mut table = synthetic_table(5_000, 3);
    let config = FoldConfig::default();
    assign_folds(&mut table, &config).unwrap();

    let bins: BTreeSet<i64> = table.records.iter().filter_map(|r| r.bins).collect();
    assert_eq!(bins.len(), N_BINS);

    let n = table.len() as f64;
    for bin in bins {
        let overall = count(&table, |r| r.bins == Some(bin)) as f64 / n;
        for fold in 0..config.n_splits as i64 {
            let in_fold = count(&table, |r| r.fold == fold) as f64;
            let both = count(&table, |r| r.fold == fold && r.bins == Some(bin)) as f64;
            assert!(
                (both / in_fold - overall).abs() < 0.005,
                "bin {bin} fold {fold}: {} vs {overall}",
                both / in_fold
            );
        }
    }
}

#[test]
fn same_seed_same_folds() {
    let config = FoldConfig {
        n_splits: 4,
        random_state: 7,
    };
    let mut a = synthetic_table(2_000, 4);
    let mut b = a.clone();
    assign_folds(&mut a, &config).unwrap();
    assign_folds(&mut b, &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn invalid_configurations() {
    let mut empty = EventTable::default();
    assert!(matches!(
        assign_folds(&mut empty, &FoldConfig::default()),
        Err(Error::InvalidInput(_))
    ));

    let mut table = synthetic_table(100, 5);
    let one_split = FoldConfig {
        n_splits: 1,
        random_state: 48,
    };
    assert!(matches!(assign_folds(&mut table, &one_split), Err(Error::InvalidInput(_))));

    // Ten rows spread over ten deciles leaves one row per bin, too few for 5 folds.
    let mut tiny = synthetic_table(10, 6);
    let before = tiny.clone();
    assert!(matches!(
        assign_folds(&mut tiny, &FoldConfig::default()),
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(tiny, before);
}

#[test]
fn parquet_round_trip_and_split() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("train_meta.parquet");
    let output = dir.path().join("folds.parquet");

    writer::write_file(&synthetic_table(1_000, 8), &input).unwrap();
    let mut table = loader::load_file(&input).unwrap();
    assert!(table.has_directions());
    assert!(!table.is_assigned());

    assign_folds(&mut table, &FoldConfig::default()).unwrap();
    writer::write_file(&table, &output).unwrap();

    let reloaded = loader::load_file(&output).unwrap();
    assert_eq!(reloaded, table);
    assert!(reloaded.is_assigned());

    let fold_split = split::split_by_fold(&reloaded, 3).unwrap();
    assert_eq!(fold_split.train.len() + fold_split.valid.len(), 1_000);
    assert_eq!(fold_split.valid.len(), 200);
}

#[test]
fn csv_round_trip_keeps_folds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folds.csv");

    let mut table = synthetic_table(500, 9);
    assign_folds(&mut table, &FoldConfig::default()).unwrap();
    writer::write_file(&table, &path).unwrap();

    let reloaded = loader::load_file(&path).unwrap();
    let folds: Vec<i64> = reloaded.records.iter().map(|r| r.fold).collect();
    let expected: Vec<i64> = table.records.iter().map(|r| r.fold).collect();
    assert_eq!(folds, expected);
}

#[test]
fn parquet_round_trip_with_a_missing_direction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folds.parquet");

    let mut table = synthetic_table(1_000, 10);
    table.records[42].direction = None;
    assign_folds(&mut table, &FoldConfig::default()).unwrap();
    writer::write_file(&table, &path).unwrap();

    let reloaded = loader::load_file(&path).unwrap();
    assert_eq!(count(&reloaded, |r| r.direction.is_some()), 999);
    assert_eq!(reloaded, table);
}

#[test]
fn mostly_single_pulse_events_cannot_be_stratified() {
    // 600 of 1000 events hold one pulse, so six decile edges coincide.
    let records = (0..1000i64)
        .map(|i| {
            let pulses = if i < 600 { 1 } else { i - 590 };
            EventRecord::new(1, i, 1_000 * i, 1_000 * i + pulses)
        })
        .collect();
    let mut table = EventTable::new(records);
    let before = table.clone();

    let err = assign_folds(&mut table, &FoldConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(err.to_string().contains("not unique"), "{err}");
    assert_eq!(table, before);
}
