//! Detector-signal calibration: linearization against an air reference and
//! optional beam-hardening correction via a fitted per-material polynomial.
//!
//! A polychromatic beam hardens with depth: low-energy photons are absorbed
//! disproportionately near the surface, so measured attenuation grows
//! sub-linearly with true depth. The correction simulates attenuation of the
//! target material over a depth ladder, fits a polynomial mapping simulated
//! attenuation back to true depth, and evaluates that fit over the measured
//! sinogram.

use crate::domain::{MaterialTable, MaterialTableError};
use crate::numerics::{polyfit, DenseMatrix, PolyFitError, Polynomial};
use crate::physics::{detect_uniform, TransportError};

/// Depth ladder spacing as a fraction of the pixel scale.
const DEPTH_LADDER_STEP: f64 = 0.1;
/// Ladder rungs per sinogram sample; covers twice the phantom radius.
const DEPTH_LADDER_RUNGS_PER_SAMPLE: usize = 5;
const DEGENERATE_LINEAR_TERM_EPSILON: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    #[error(transparent)]
    Material(#[from] MaterialTableError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Fit(#[from] PolyFitError),
    #[error("beam-hardening fit for '{material}' has near-zero linear term {linear_term}")]
    DegenerateFit { material: String, linear_term: f64 },
}

/// Beam-hardening correction request: fit degree and the material whose
/// depth-attenuation curve anchors the fit.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BeamHardening {
    pub order: usize,
    pub target_material: String,
}

impl BeamHardening {
    pub fn new(order: usize, target_material: impl Into<String>) -> Self {
        Self {
            order,
            target_material: target_material.into(),
        }
    }
}

/// A fitted mapping from simulated attenuation to true depth for one
/// material.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationFit {
    material: String,
    polynomial: Polynomial,
}

impl CalibrationFit {
    pub fn material(&self) -> &str {
        &self.material
    }

    pub fn polynomial(&self) -> &Polynomial {
        &self.polynomial
    }

    /// Corrected attenuation for one measured value: equivalent depth from
    /// the fit, normalized by the linear term so the thin-object limit
    /// converges to the material's monochromatic-equivalent coefficient.
    pub fn correct(&self, attenuation: f64) -> f64 {
        self.polynomial.evaluate(attenuation) / self.polynomial.linear_term()
    }
}

/// Converts a raw detector sinogram `[angles, samples]` into linearized
/// attenuation of the same shape, optionally corrected for beam hardening.
///
/// The air reference is a single scalar scan of width `2 * samples * scale`,
/// matching the scan geometry; it is valid for every sample because the
/// calibration path is scan-independent. Sinogram entries that are
/// non-positive or exceed the air reference make the logarithm undefined and
/// propagate as NaN; this mirrors the source model and is deliberately not
/// guarded.
pub fn calibrate(
    spectrum: &[f64],
    materials: &MaterialTable,
    sinogram: &DenseMatrix,
    pixel_scale: f64,
    correction: Option<&BeamHardening>,
) -> Result<DenseMatrix, CalibrationError> {
    let samples = sinogram.ncols();
    let air_reference = air_reference(spectrum, materials, samples, pixel_scale)?;

    let mut attenuation = DenseMatrix::zeros(sinogram.nrows(), samples);
    for angle in 0..sinogram.nrows() {
        for sample in 0..samples {
            attenuation[(angle, sample)] = -(sinogram[(angle, sample)] / air_reference).ln();
        }
    }

    let Some(request) = correction else {
        return Ok(attenuation);
    };

    let fit = fit_beam_hardening(spectrum, materials, samples, pixel_scale, request)?;
    for angle in 0..attenuation.nrows() {
        for sample in 0..samples {
            attenuation[(angle, sample)] = fit.correct(attenuation[(angle, sample)]);
        }
    }
    Ok(attenuation)
}

/// Unattenuated-path reference signal used by both calibration and the
/// Hounsfield conversion.
pub fn air_reference(
    spectrum: &[f64],
    materials: &MaterialTable,
    samples: usize,
    pixel_scale: f64,
) -> Result<f64, CalibrationError> {
    let air = materials.coeff("Air")?;
    let width = 2.0 * samples as f64 * pixel_scale;
    Ok(detect_uniform(spectrum, air, width)?)
}

/// Builds the synthetic (simulated attenuation, true depth) curve for the
/// target material and fits the inverse polynomial.
pub fn fit_beam_hardening(
    spectrum: &[f64],
    materials: &MaterialTable,
    samples: usize,
    pixel_scale: f64,
    request: &BeamHardening,
) -> Result<CalibrationFit, CalibrationError> {
    let coeff = materials.coeff(&request.target_material)?;
    let reference = air_reference(spectrum, materials, samples, pixel_scale)?;

    let rungs = DEPTH_LADDER_RUNGS_PER_SAMPLE * samples;
    let mut depths = Vec::with_capacity(rungs + 1);
    let mut attenuations = Vec::with_capacity(rungs + 1);
    for rung in 0..=rungs {
        let depth = DEPTH_LADDER_STEP * rung as f64 * pixel_scale;
        let signal = detect_uniform(spectrum, coeff, depth)?;
        depths.push(depth);
        attenuations.push(-(signal / reference).ln());
    }

    let polynomial = polyfit(&attenuations, &depths, request.order)?;
    if polynomial.linear_term().abs() <= DEGENERATE_LINEAR_TERM_EPSILON {
        return Err(CalibrationError::DegenerateFit {
            material: request.target_material.clone(),
            linear_term: polynomial.linear_term(),
        });
    }

    Ok(CalibrationFit {
        material: request.target_material.clone(),
        polynomial,
    })
}

#[cfg(test)]
mod tests {
    use super::{air_reference, calibrate, fit_beam_hardening, BeamHardening, CalibrationError};
    use crate::domain::{MaterialTable, MaterialTableError};
    use crate::numerics::DenseMatrix;

    fn polychromatic_table() -> MaterialTable {
        MaterialTable::from_entries(vec![
            ("Air".to_string(), vec![0.0, 0.0, 0.0]),
            ("Water".to_string(), vec![0.6, 0.25, 0.18]),
        ])
        .expect("table should build")
    }

    fn spectrum() -> Vec<f64> {
        vec![2.0e5, 4.0e5, 1.0e5]
    }

    #[test]
    fn uncorrected_calibration_is_the_plain_logarithm() {
        let table = polychromatic_table();
        let spectrum = spectrum();
        let mut sinogram = DenseMatrix::zeros(2, 3);
        for angle in 0..2 {
            for sample in 0..3 {
                sinogram[(angle, sample)] = 1.0e5 * (1.0 + (angle * 3 + sample) as f64);
            }
        }

        let attenuation =
            calibrate(&spectrum, &table, &sinogram, 0.1, None).expect("calibration");
        let reference = air_reference(&spectrum, &table, 3, 0.1).expect("reference");

        assert_eq!(attenuation.nrows(), 2);
        assert_eq!(attenuation.ncols(), 3);
        for angle in 0..2 {
            for sample in 0..3 {
                let expected = -(sinogram[(angle, sample)] / reference).ln();
                assert_eq!(attenuation[(angle, sample)], expected);
            }
        }
    }

    #[test]
    fn calibration_round_trips_through_the_exponential() {
        let table = polychromatic_table();
        let spectrum = spectrum();
        let mut sinogram = DenseMatrix::zeros(1, 4);
        for sample in 0..4 {
            sinogram[(0, sample)] = 5.0e4 / (1.0 + sample as f64);
        }

        let attenuation =
            calibrate(&spectrum, &table, &sinogram, 0.2, None).expect("calibration");
        let reference = air_reference(&spectrum, &table, 4, 0.2).expect("reference");
        for sample in 0..4 {
            let recovered = (-attenuation[(0, sample)]).exp() * reference;
            assert!((recovered - sinogram[(0, sample)]).abs() < 1.0e-6);
        }
    }

    #[test]
    fn air_reference_uses_twice_the_scanned_width() {
        let table = polychromatic_table();
        let spectrum = spectrum();
        // Air attenuates nothing in this table, so the reference is the full
        // source flux regardless of width.
        let reference = air_reference(&spectrum, &table, 64, 0.1).expect("reference");
        assert!((reference - 7.0e5).abs() < 1.0e-6);
    }

    #[test]
    fn beam_hardening_fit_linearizes_a_polychromatic_ramp() {
        let table = polychromatic_table();
        let spectrum = spectrum();
        let samples = 16;
        let scale = 0.5;
        let request = BeamHardening::new(3, "Water");
        let fit =
            fit_beam_hardening(&spectrum, &table, samples, scale, &request).expect("fit");

        // Corrected attenuation divided by depth should be nearly constant,
        // which plain -ln(y/y0) is not for a hardened beam.
        let reference = air_reference(&spectrum, &table, samples, scale).expect("reference");
        let mut ratios = Vec::new();
        for depth in [0.5, 2.0, 3.5] {
            let signal =
                crate::physics::detect_uniform(&spectrum, table.coeff("Water").unwrap(), depth)
                    .expect("signal");
            let measured = -(signal / reference).ln();
            ratios.push(fit.correct(measured) / depth);
        }
        let spread = ratios
            .iter()
            .fold(f64::NEG_INFINITY, |max, &r| max.max(r))
            - ratios.iter().fold(f64::INFINITY, |min, &r| min.min(r));
        assert!(
            spread < 0.05 * ratios[0].abs(),
            "corrected attenuation per depth should be nearly constant, ratios {ratios:?}"
        );
    }

    #[test]
    fn corrected_calibration_preserves_shape() {
        let table = polychromatic_table();
        let spectrum = spectrum();
        let mut sinogram = DenseMatrix::zeros(3, 8);
        for angle in 0..3 {
            for sample in 0..8 {
                sinogram[(angle, sample)] = 6.0e5 / (1.0 + (sample + 1) as f64);
            }
        }

        let request = BeamHardening::new(2, "Water");
        let corrected =
            calibrate(&spectrum, &table, &sinogram, 0.1, Some(&request)).expect("calibration");
        assert_eq!(corrected.nrows(), 3);
        assert_eq!(corrected.ncols(), 8);
    }

    #[test]
    fn unknown_target_material_fails_calibration() {
        let table = polychromatic_table();
        let spectrum = spectrum();
        let sinogram = DenseMatrix::zeros(1, 2);
        let request = BeamHardening::new(2, "Unobtanium");
        let error = calibrate(&spectrum, &table, &sinogram, 0.1, Some(&request))
            .expect_err("unknown material");
        assert_eq!(
            error,
            CalibrationError::Material(MaterialTableError::UnknownMaterial {
                name: "Unobtanium".to_string()
            })
        );
    }
}
