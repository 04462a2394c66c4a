/// Data layer: event table types, loading, writing, and fold splits.
///
/// Architecture:
/// ```text
///  .parquet / .csv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  schema check → EventTable
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ EventTable  │  Vec<EventRecord>  ──► folds::assign_folds
///   └────────────┘
///        │
///        ├──► writer   persist with n_pulses / bins / fold
///        ▼
///   ┌──────────┐
///   │  split    │  fold == k → valid, fold != k → train
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod split;
pub mod writer;
