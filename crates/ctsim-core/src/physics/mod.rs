//! Polychromatic photon transport: Beer-Lambert attenuation through stacked
//! material layers and aggregation into detector signal.

use crate::numerics::DenseMatrix;

/// Detector floor in photons. Anything below this would make the downstream
/// logarithm in calibration undefined.
pub const MIN_DETECTABLE_PHOTONS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("coefficient vector has {actual} energy bins, spectrum has {expected}")]
    EnergyAxisMismatch { expected: usize, actual: usize },
    #[error("depth vector has {actual} samples, residual field has {expected}")]
    SampleAxisMismatch { expected: usize, actual: usize },
    #[error("depth map has {actual} material rows, {expected} coefficient rows supplied")]
    MaterialAxisMismatch { expected: usize, actual: usize },
    #[error("depth map rows must share one sample count, row {row} has {actual} after {expected}")]
    RaggedDepthRows {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("depth map must contain at least one material row")]
    EmptyDepthMap,
}

/// Per-material path lengths, shape `[materials, samples]`.
///
/// The constructors replace the shape-sniffing reinterpretation of 1-D input
/// the original model performed: the caller states once whether a vector is a
/// sample row for a single material or one layer thickness per material.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    depths: DenseMatrix,
}

impl DepthMap {
    /// One material traversed at every sample; `depths[s]` is the thickness
    /// seen by sample `s`.
    pub fn single_material(depths: &[f64]) -> Self {
        let mut matrix = DenseMatrix::zeros(1, depths.len());
        for (sample, &depth) in depths.iter().enumerate() {
            matrix[(0, sample)] = depth;
        }
        Self { depths: matrix }
    }

    /// A stack of material layers measured by a single sample; `layers[m]` is
    /// the thickness of material `m` on that one path.
    pub fn uniform_layers(layers: &[f64]) -> Self {
        let mut matrix = DenseMatrix::zeros(layers.len(), 1);
        for (material, &depth) in layers.iter().enumerate() {
            matrix[(material, 0)] = depth;
        }
        Self { depths: matrix }
    }

    /// A single material on a single path.
    pub fn scalar(depth: f64) -> Self {
        Self::uniform_layers(&[depth])
    }

    /// Full `[materials, samples]` map from per-material rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, TransportError> {
        let Some(first) = rows.first() else {
            return Err(TransportError::EmptyDepthMap);
        };
        let samples = first.len();
        let mut matrix = DenseMatrix::zeros(rows.len(), samples);
        for (material, row) in rows.iter().enumerate() {
            if row.len() != samples {
                return Err(TransportError::RaggedDepthRows {
                    row: material,
                    expected: samples,
                    actual: row.len(),
                });
            }
            for (sample, &depth) in row.iter().enumerate() {
                matrix[(material, sample)] = depth;
            }
        }
        Ok(Self { depths: matrix })
    }

    pub fn materials(&self) -> usize {
        self.depths.nrows()
    }

    pub fn samples(&self) -> usize {
        self.depths.ncols()
    }

    pub fn depth(&self, material: usize, sample: usize) -> f64 {
        self.depths[(material, sample)]
    }

    fn row(&self, material: usize) -> Vec<f64> {
        (0..self.samples())
            .map(|sample| self.depths[(material, sample)])
            .collect()
    }
}

/// Beer-Lambert attenuation of a residual photon field.
///
/// `residual` has shape `[energy bins, samples]`; `coeff` holds one linear
/// attenuation coefficient per energy bin and `depth` one path length per
/// sample. Each entry decays as `exp(-coeff[e] * depth[s])`.
pub fn attenuate(
    residual: &DenseMatrix,
    coeff: &[f64],
    depth: &[f64],
) -> Result<DenseMatrix, TransportError> {
    let energy_bins = residual.nrows();
    let samples = residual.ncols();
    if coeff.len() != energy_bins {
        return Err(TransportError::EnergyAxisMismatch {
            expected: energy_bins,
            actual: coeff.len(),
        });
    }
    if depth.len() != samples {
        return Err(TransportError::SampleAxisMismatch {
            expected: samples,
            actual: depth.len(),
        });
    }

    let mut attenuated = DenseMatrix::zeros(energy_bins, samples);
    for energy in 0..energy_bins {
        for sample in 0..samples {
            attenuated[(energy, sample)] =
                residual[(energy, sample)] * (-coeff[energy] * depth[sample]).exp();
        }
    }
    Ok(attenuated)
}

/// One detection pass through a stack of materials.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection<'a> {
    pub spectrum: &'a [f64],
    pub coefficients: &'a [&'a [f64]],
    pub depths: &'a DepthMap,
    /// Tube current-time product in mAs. Reserved for the detector noise
    /// model, which is out of scope; detection itself is deterministic.
    pub dose: f64,
}

impl<'a> Detection<'a> {
    pub fn new(spectrum: &'a [f64], coefficients: &'a [&'a [f64]], depths: &'a DepthMap) -> Self {
        Self {
            spectrum,
            coefficients,
            depths,
            dose: 10_000.0,
        }
    }
}

/// Simulates the detector signal for each sample: broadcasts the source
/// spectrum across all samples, attenuates through every material layer, sums
/// the residual over energies and clamps at [`MIN_DETECTABLE_PHOTONS`].
///
/// Attenuation composition commutes, so material order does not matter, but
/// every layer is applied before the energy summation.
pub fn detect(input: Detection<'_>) -> Result<Vec<f64>, TransportError> {
    let energy_bins = input.spectrum.len();
    let materials = input.depths.materials();
    let samples = input.depths.samples();

    if input.coefficients.len() != materials {
        return Err(TransportError::MaterialAxisMismatch {
            expected: input.coefficients.len(),
            actual: materials,
        });
    }
    for coeff in input.coefficients {
        if coeff.len() != energy_bins {
            return Err(TransportError::EnergyAxisMismatch {
                expected: energy_bins,
                actual: coeff.len(),
            });
        }
    }

    let mut residual = DenseMatrix::zeros(energy_bins, samples);
    for energy in 0..energy_bins {
        for sample in 0..samples {
            residual[(energy, sample)] = input.spectrum[energy];
        }
    }

    for (material, coeff) in input.coefficients.iter().enumerate() {
        let depth_row = input.depths.row(material);
        residual = attenuate(&residual, coeff, &depth_row)?;
    }

    let mut signal = vec![0.0; samples];
    for (sample, value) in signal.iter_mut().enumerate() {
        let mut sum = 0.0;
        for energy in 0..energy_bins {
            sum += residual[(energy, sample)];
        }
        *value = sum.max(MIN_DETECTABLE_PHOTONS);
    }
    Ok(signal)
}

/// Detector signal for a single uniform path of one material, as used by the
/// calibration reference scans.
pub fn detect_uniform(
    spectrum: &[f64],
    coeff: &[f64],
    depth: f64,
) -> Result<f64, TransportError> {
    let depths = DepthMap::scalar(depth);
    let signal = detect(Detection::new(spectrum, &[coeff], &depths))?;
    Ok(signal[0])
}
