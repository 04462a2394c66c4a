//! Cross-validation folds and the angular-distance objective for neutrino
//! arrival-direction reconstruction.
//!
//! * [`folds::assign_folds`] adds `n_pulses`, `bins` and a stratified `fold`
//!   label to every row of the event metadata table.
//! * [`metric::angular_distance_score`] and [`metric::angular_distance_loss`]
//!   measure the mean angle between true and predicted directions.
//! * [`data`] reads and writes the metadata table and splits it by fold.

pub mod autodiff;
pub mod config;
pub mod data;
pub mod error;
pub mod folds;
pub mod metric;

pub use config::{FoldConfig, PipelineConfig, SplitConfig};
pub use data::model::{Direction, EventRecord, EventTable};
pub use error::{Error, Result};
