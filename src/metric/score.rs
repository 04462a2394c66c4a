use ndarray::{ArrayView1, Zip};

use crate::data::model::Direction;
use crate::error::{Error, Result};

/// Cosine of the angle between two directions.
///
/// This is the dot product of the unit vectors
/// `(sin z·cos a, sin z·sin a, cos z)` without building them, clamped to
/// `[-1, 1]` since rounding can push it just outside.
#[inline]
pub fn cos_separation(az_true: f64, zen_true: f64, az_pred: f64, zen_pred: f64) -> f64 {
    let (sa1, ca1) = az_true.sin_cos();
    let (sz1, cz1) = zen_true.sin_cos();
    let (sa2, ca2) = az_pred.sin_cos();
    let (sz2, cz2) = zen_pred.sin_cos();

    let dot = sz1 * sz2 * (ca1 * ca2 + sa1 * sa2) + cz1 * cz2;
    dot.clamp(-1.0, 1.0)
}

/// Angle in radians between two directions, in `[0, π]`.  No validation.
#[inline]
pub fn angular_distance(truth: Direction, pred: Direction) -> f64 {
    cos_separation(truth.azimuth, truth.zenith, pred.azimuth, pred.zenith)
        .acos()
        .abs()
}

/// Mean angular distance in radians between true and predicted directions.
///
/// Every entry of all four arrays must be finite; the first NaN or infinity
/// found is reported as [`Error::NonFiniteInput`] before anything is
/// computed.  Arrays must share one non-zero length.
pub fn angular_distance_score<'a>(
    azimuth_true: ArrayView1<'a, f64>,
    zenith_true: ArrayView1<'a, f64>,
    azimuth_pred: ArrayView1<'a, f64>,
    zenith_pred: ArrayView1<'a, f64>,
) -> Result<f64> {
    let n = azimuth_true.len();
    if n == 0 {
        return Err(Error::invalid("angular distance of zero directions"));
    }
    let args = [
        ("azimuth_true", &azimuth_true),
        ("zenith_true", &zenith_true),
        ("azimuth_pred", &azimuth_pred),
        ("zenith_pred", &zenith_pred),
    ];
    for (name, arr) in args {
        if arr.len() != n {
            return Err(Error::invalid(format!(
                "`{name}` has {} values, expected {n}",
                arr.len()
            )));
        }
    }
    for (argument, arr) in args {
        if let Some(index) = arr.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFiniteInput { argument, index });
        }
    }

    let total = Zip::from(&azimuth_true)
        .and(&zenith_true)
        .and(&azimuth_pred)
        .and(&zenith_pred)
        .fold(0.0, |acc, &at, &zt, &ap, &zp| {
            acc + cos_separation(at, zt, ap, zp).acos().abs()
        });
    Ok(total / n as f64)
}

/// [`angular_distance_score`] over paired [`Direction`] slices.
pub fn score_directions(truth: &[Direction], pred: &[Direction]) -> Result<f64> {
    let column = |dirs: &[Direction], f: fn(&Direction) -> f64| dirs.iter().map(f).collect::<Vec<_>>();
    let az_t = column(truth, |d| d.azimuth);
    let zen_t = column(truth, |d| d.zenith);
    let az_p = column(pred, |d| d.azimuth);
    let zen_p = column(pred, |d| d.zenith);
    angular_distance_score(
        ArrayView1::from(&az_t),
        ArrayView1::from(&zen_t),
        ArrayView1::from(&az_p),
        ArrayView1::from(&zen_p),
    )
}
