//! End-to-end reconstruction: scan, calibrate, ramp filter, back-project,
//! then rescale to Hounsfield units, strictly in that order. Also hosts the
//! iterative per-material variant that reconstructs once per candidate
//! material and fuses the results pixel by pixel.

pub mod backproject;
pub mod hounsfield;
pub mod scan;

pub use backproject::{
    BackProjector, CancelToken, PartialBackProjection, ProgressiveBackProjection,
    SummationBackProjector,
};
pub use hounsfield::{to_hounsfield, water_reference_attenuation, HOUNSFIELD_FLOOR};
pub use scan::{ParallelBeamScanner, Scanner};

use crate::calibrate::{calibrate, BeamHardening, CalibrationError};
use crate::domain::{MaterialTable, MaterialTableError, PhotonSpectrum};
use crate::filter::{ramp_filter, FilterError};
use crate::numerics::DenseMatrix;
use crate::physics::{detect_uniform, TransportError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Correction degree used by the per-material iterative mode when the caller
/// does not request one.
const DEFAULT_CORRECTION_ORDER: usize = 3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconstructionError {
    #[error("reconstruction needs at least one projection angle")]
    NoAngles,
    #[error("iterative reconstruction needs at least one candidate material")]
    NoCandidates,
    #[error("water reference attenuation {attenuation} cannot anchor the Hounsfield scale")]
    DegenerateWaterReference { attenuation: f64 },
    #[error(transparent)]
    Material(#[from] MaterialTableError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Acquisition and reconstruction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// Pixel width in cm; also the detector sampling interval.
    pub pixel_scale: f64,
    /// Number of projection angles over a half rotation.
    pub angle_count: usize,
    /// Tube current-time product in mAs.
    pub dose: f64,
    /// Raised-cosine apodization exponent for the ramp filter.
    pub alpha: f64,
    /// Beam-hardening correction; `None` leaves calibration linear.
    pub correction: Option<BeamHardening>,
}

impl ReconstructionConfig {
    pub fn new(pixel_scale: f64, angle_count: usize) -> Self {
        Self {
            pixel_scale,
            angle_count,
            dose: 10_000.0,
            alpha: 0.001,
            correction: None,
        }
    }
}

/// Output of a single-pass reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    /// Reconstructed linear attenuation, `size x size`.
    pub attenuation: DenseMatrix,
    /// The same image rescaled to Hounsfield units.
    pub hounsfield: DenseMatrix,
}

/// Output of the iterative per-material reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedReconstruction {
    /// Fused attenuation image; unclaimed pixels stay zero.
    pub image: DenseMatrix,
    /// Row-major segmentation map: `0` is unclaimed, `k` means candidate
    /// `k - 1` was the last material whose tolerance the pixel satisfied.
    pub labels: Vec<usize>,
}

impl FusedReconstruction {
    pub fn label(&self, row: usize, col: usize) -> usize {
        self.labels[row * self.image.ncols() + col]
    }
}

/// Runs the full pipeline once. The source intensity is converted to
/// absolute photons through the beam cross-section `pi * scale^2 / 4` and
/// the dose before scanning.
pub fn reconstruct<S: Scanner, B: BackProjector>(
    scanner: &S,
    back_projector: &B,
    spectrum: &PhotonSpectrum,
    materials: &MaterialTable,
    phantom: &DenseMatrix,
    config: &ReconstructionConfig,
) -> Result<Reconstruction, ReconstructionError> {
    let source = absolute_source(spectrum, config);

    let sinogram = scanner.scan(
        source.photons(),
        materials,
        phantom,
        config.pixel_scale,
        config.angle_count,
    )?;
    let attenuation = calibrate(
        source.photons(),
        materials,
        &sinogram,
        config.pixel_scale,
        config.correction.as_ref(),
    )?;
    let filtered = ramp_filter(&attenuation, config.pixel_scale, config.alpha)?;
    let image = back_projector.back_project(&filtered)?;
    let hounsfield = to_hounsfield(source.photons(), materials, &image, config.pixel_scale)?;

    Ok(Reconstruction {
        attenuation: image,
        hounsfield,
    })
}

/// Iterative per-material reconstruction: one calibration (targeting the
/// candidate) and back-projection per candidate material, fused pixel-wise.
///
/// A pixel is claimed by a candidate when the candidate's reconstruction at
/// that pixel falls within the material's tolerance of its expected
/// monochromatic-equivalent attenuation. Candidates are visited in the given
/// order and each satisfying pass overwrites earlier claims, so the last
/// matching candidate wins.
pub fn reconstruct_per_material<S: Scanner, B: BackProjector>(
    scanner: &S,
    back_projector: &B,
    spectrum: &PhotonSpectrum,
    materials: &MaterialTable,
    phantom: &DenseMatrix,
    config: &ReconstructionConfig,
    candidates: &[String],
) -> Result<FusedReconstruction, ReconstructionError> {
    if candidates.is_empty() {
        return Err(ReconstructionError::NoCandidates);
    }

    let source = absolute_source(spectrum, config);
    let sinogram = scanner.scan(
        source.photons(),
        materials,
        phantom,
        config.pixel_scale,
        config.angle_count,
    )?;

    let order = config
        .correction
        .as_ref()
        .map(|correction| correction.order)
        .unwrap_or(DEFAULT_CORRECTION_ORDER);

    let size = phantom.nrows();
    let mut fused = DenseMatrix::zeros(size, size);
    let mut labels = vec![0usize; size * size];

    for (candidate_index, candidate) in candidates.iter().enumerate() {
        let correction = BeamHardening::new(order, candidate.clone());
        let attenuation = calibrate(
            source.photons(),
            materials,
            &sinogram,
            config.pixel_scale,
            Some(&correction),
        )?;
        let filtered = ramp_filter(&attenuation, config.pixel_scale, config.alpha)?;
        let image = back_projector.back_project(&filtered)?;

        let expected = expected_attenuation(source.photons(), materials, candidate, config)?;
        let tolerance = FusionTolerance::for_material(candidate);
        for row in 0..size {
            for col in 0..size {
                let value = image[(row, col)];
                if tolerance.accepts(expected, value) {
                    fused[(row, col)] = value;
                    labels[row * size + col] = candidate_index + 1;
                }
            }
        }
    }

    Ok(FusedReconstruction {
        image: fused,
        labels,
    })
}

fn absolute_source(spectrum: &PhotonSpectrum, config: &ReconstructionConfig) -> PhotonSpectrum {
    let cross_section = PI * config.pixel_scale * config.pixel_scale / 4.0;
    spectrum.scaled(config.dose * cross_section)
}

/// Monochromatic-equivalent attenuation of a thin path of the material,
/// obtained through the same logarithm as calibration over one pixel width.
fn expected_attenuation(
    spectrum: &[f64],
    materials: &MaterialTable,
    material: &str,
    config: &ReconstructionConfig,
) -> Result<f64, ReconstructionError> {
    let depth = config.pixel_scale;
    let material_signal = detect_uniform(spectrum, materials.coeff(material)?, depth)?;
    let air_signal = detect_uniform(spectrum, materials.coeff("Air")?, depth)?;
    Ok(-(material_signal / air_signal).ln() / depth)
}

/// Acceptance window for one candidate material during fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FusionTolerance {
    Absolute(f64),
    Relative(f64),
}

impl FusionTolerance {
    fn for_material(name: &str) -> Self {
        match name {
            "Titanium" => Self::Absolute(10.0),
            "Water" => Self::Relative(0.75),
            // Bone and any other material share the default window.
            _ => Self::Relative(0.5),
        }
    }

    fn accepts(self, expected: f64, actual: f64) -> bool {
        match self {
            Self::Absolute(limit) => (actual - expected).abs() < limit,
            Self::Relative(limit) => (actual - expected).abs() < limit * expected.abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FusionTolerance, ReconstructionConfig};
    use crate::calibrate::BeamHardening;

    #[test]
    fn config_defaults_match_the_acquisition_model() {
        let config = ReconstructionConfig::new(0.1, 256);
        assert_eq!(config.dose, 10_000.0);
        assert_eq!(config.alpha, 0.001);
        assert_eq!(config.correction, None);
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut config = ReconstructionConfig::new(0.2, 64);
        config.correction = Some(BeamHardening::new(3, "Water"));
        let encoded = serde_json::to_string(&config).expect("encode");
        let decoded: ReconstructionConfig = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, config);
    }

    #[test]
    fn titanium_uses_an_absolute_window() {
        let tolerance = FusionTolerance::for_material("Titanium");
        assert!(tolerance.accepts(100.0, 109.0));
        assert!(!tolerance.accepts(100.0, 111.0));
    }

    #[test]
    fn water_and_bone_use_relative_windows() {
        let water = FusionTolerance::for_material("Water");
        assert!(water.accepts(0.2, 0.30));
        assert!(!water.accepts(0.2, 0.40));

        let bone = FusionTolerance::for_material("Bone");
        assert!(bone.accepts(0.5, 0.70));
        assert!(!bone.accepts(0.5, 0.80));

        assert_eq!(
            FusionTolerance::for_material("Adipose"),
            FusionTolerance::Relative(0.5)
        );
    }
}
