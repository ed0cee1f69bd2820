//! Conversion of reconstructed attenuation to Hounsfield units against a
//! water reference.

use super::ReconstructionError;
use crate::domain::MaterialTable;
use crate::numerics::DenseMatrix;
use crate::physics::detect_uniform;

/// Lowest value on the clinical CT scale.
pub const HOUNSFIELD_FLOOR: f64 = -1024.0;
const DEGENERATE_WATER_EPSILON: f64 = 1.0e-12;

/// Rescales a reconstruction to Hounsfield units: `(mu/mu_water - 1) * 1000`,
/// clamped below at [`HOUNSFIELD_FLOOR`].
///
/// The water reference attenuation is obtained by pushing a full-width water
/// scan through the same calibration logarithm as the measured data, so the
/// reference and the reconstruction share the polychromatic spectrum.
pub fn to_hounsfield(
    spectrum: &[f64],
    materials: &MaterialTable,
    reconstruction: &DenseMatrix,
    pixel_scale: f64,
) -> Result<DenseMatrix, ReconstructionError> {
    let water_attenuation =
        water_reference_attenuation(spectrum, materials, reconstruction.nrows(), pixel_scale)?;

    let mut hounsfield = DenseMatrix::zeros(reconstruction.nrows(), reconstruction.ncols());
    for row in 0..reconstruction.nrows() {
        for col in 0..reconstruction.ncols() {
            let value = (reconstruction[(row, col)] / water_attenuation - 1.0) * 1000.0;
            hounsfield[(row, col)] = value.max(HOUNSFIELD_FLOOR);
        }
    }
    Ok(hounsfield)
}

/// Monochromatic-equivalent water attenuation per unit length over the
/// scanned width.
pub fn water_reference_attenuation(
    spectrum: &[f64],
    materials: &MaterialTable,
    size: usize,
    pixel_scale: f64,
) -> Result<f64, ReconstructionError> {
    let width = size as f64 * pixel_scale;
    let water_signal = detect_uniform(spectrum, materials.coeff("Water")?, width)?;
    let air_signal = detect_uniform(spectrum, materials.coeff("Air")?, width)?;

    let attenuation = -(water_signal / air_signal).ln() / width;
    if !attenuation.is_finite() || attenuation.abs() <= DEGENERATE_WATER_EPSILON {
        return Err(ReconstructionError::DegenerateWaterReference { attenuation });
    }
    Ok(attenuation)
}
