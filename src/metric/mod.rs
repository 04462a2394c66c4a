//! Angular distance between true and predicted arrival directions.
//!
//! Two entry points share one derivation (unit-vector dot product, clamped,
//! then `acos`):
//!
//! * [`angular_distance_score`] – eager, over `ndarray` views, rejects NaN and
//!   infinity up front.  Used for validation scores.
//! * [`angular_distance_loss`] – recorded on an [`autodiff::Tape`](crate::autodiff::Tape)
//!   so gradients reach the predictions.  Used as the training loss; no
//!   finiteness check.

pub mod loss;
pub mod score;

pub use loss::{angular_distance_loss, angular_distance_loss_with_grad, record_directions, LossWithGrad};
pub use score::{angular_distance, angular_distance_score, score_directions};
