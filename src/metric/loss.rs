use ndarray::{Array2, ArrayView2};

use crate::autodiff::{Tape, Var};
use crate::error::{Error, Result};

/// One (azimuth, zenith) row recorded on a [`Tape`].
pub type DirectionVars = [Var; 2];

/// Record an `[N, 2]` array of (azimuth, zenith) rows on the tape.
///
/// With `track` set the entries are differentiable inputs, otherwise
/// constants.
pub fn record_directions(tape: &mut Tape, rows: ArrayView2<'_, f64>, track: bool) -> Result<Vec<DirectionVars>> {
    if rows.ncols() != 2 {
        return Err(Error::invalid(format!(
            "direction rows must have 2 columns (azimuth, zenith), got {}",
            rows.ncols()
        )));
    }
    Ok(rows
        .rows()
        .into_iter()
        .map(|row| {
            if track {
                [tape.var(row[0]), tape.var(row[1])]
            } else {
                [tape.constant(row[0]), tape.constant(row[1])]
            }
        })
        .collect())
}

/// Mean angular distance between `predicted` and `truth`, recorded on `tape`
/// so the result can be back-propagated to the predictions.
///
/// Inputs are not checked for NaN or infinity; non-finite values flow
/// through to the output and its gradient.
pub fn angular_distance_loss(
    tape: &mut Tape,
    predicted: &[DirectionVars],
    truth: &[DirectionVars],
) -> Result<Var> {
    if predicted.len() != truth.len() {
        return Err(Error::invalid(format!(
            "{} predicted directions but {} true ones",
            predicted.len(),
            truth.len()
        )));
    }
    if predicted.is_empty() {
        return Err(Error::invalid("angular distance of zero directions"));
    }

    let mut distances = Vec::with_capacity(predicted.len());
    for (&[az_pred, zen_pred], &[az_true, zen_true]) in predicted.iter().zip(truth) {
        let sa1 = tape.sin(az_true);
        let ca1 = tape.cos(az_true);
        let sz1 = tape.sin(zen_true);
        let cz1 = tape.cos(zen_true);

        let sa2 = tape.sin(az_pred);
        let ca2 = tape.cos(az_pred);
        let sz2 = tape.sin(zen_pred);
        let cz2 = tape.cos(zen_pred);

        // sz1·sz2·(ca1·ca2 + sa1·sa2) + cz1·cz2
        let cc = tape.mul(ca1, ca2);
        let ss = tape.mul(sa1, sa2);
        let azimuthal = tape.add(cc, ss);
        let sz = tape.mul(sz1, sz2);
        let horizontal = tape.mul(sz, azimuthal);
        let vertical = tape.mul(cz1, cz2);
        let dot = tape.add(horizontal, vertical);

        let dot = tape.clamp(dot, -1.0, 1.0);
        let angle = tape.acos(dot);
        distances.push(tape.abs(angle));
    }

    Ok(tape.mean(&distances))
}

/// Loss value together with ∂loss/∂predicted.
#[derive(Debug, Clone)]
pub struct LossWithGrad {
    pub value: f64,
    /// Same `[N, 2]` shape as the predictions.
    pub grad: Array2<f64>,
}

/// Evaluate [`angular_distance_loss`] on plain arrays and back-propagate.
///
/// Both arrays are `[N, 2]` with azimuth in column 0 and zenith in column 1.
pub fn angular_distance_loss_with_grad(
    predicted: ArrayView2<'_, f64>,
    truth: ArrayView2<'_, f64>,
) -> Result<LossWithGrad> {
    if predicted.dim() != truth.dim() {
        return Err(Error::invalid(format!(
            "predicted shape {:?} differs from truth shape {:?}",
            predicted.dim(),
            truth.dim()
        )));
    }

    let mut tape = Tape::with_capacity(predicted.nrows() * 24 + 4);
    let pred_vars = record_directions(&mut tape, predicted, true)?;
    let truth_vars = record_directions(&mut tape, truth, false)?;
    let loss = angular_distance_loss(&mut tape, &pred_vars, &truth_vars)?;
    tape.backward(loss);

    let mut grad = Array2::zeros(predicted.dim());
    for (i, [az, zen]) in pred_vars.iter().enumerate() {
        grad[[i, 0]] = tape.adjoint(*az);
        grad[[i, 1]] = tape.adjoint(*zen);
    }

    Ok(LossWithGrad {
        value: tape.value(loss),
        grad,
    })
}
