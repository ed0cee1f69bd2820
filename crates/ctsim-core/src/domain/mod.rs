//! Immutable lookup values shared across the pipeline: source spectra and
//! material attenuation-coefficient tables.
//!
//! Both are constructed once per run and passed explicitly into every
//! operation; nothing in the crate reads them as ambient state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaterialTableError {
    #[error("material table must contain at least one material")]
    Empty,
    #[error("unknown material '{name}'")]
    UnknownMaterial { name: String },
    #[error(
        "material '{material}' has {actual} attenuation coefficients, expected {expected} energy bins"
    )]
    CoefficientLengthMismatch {
        material: String,
        expected: usize,
        actual: usize,
    },
    #[error("material label {label} is outside the table of {materials} materials")]
    LabelOutOfRange { label: usize, materials: usize },
}

/// Source photon counts per energy bin. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotonSpectrum {
    photons: Vec<f64>,
}

impl PhotonSpectrum {
    pub fn new(photons: Vec<f64>) -> Self {
        Self { photons }
    }

    pub fn energy_bins(&self) -> usize {
        self.photons.len()
    }

    pub fn photons(&self) -> &[f64] {
        &self.photons
    }

    /// Returns a copy with every bin multiplied by `factor`, used when
    /// converting per-(mAs, cm^2) source intensity to absolute photons.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            photons: self.photons.iter().map(|count| count * factor).collect(),
        }
    }
}

/// Per-material linear attenuation coefficients on a shared energy grid.
///
/// The declaration order of materials defines the voxel labels used by the
/// phantom generator: label `i` in a phantom image refers to the `i`-th
/// material of the table it was generated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTable {
    names: Vec<String>,
    coefficients: Vec<Vec<f64>>,
    energy_bins: usize,
}

impl MaterialTable {
    pub fn from_entries(
        entries: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, MaterialTableError> {
        let Some(energy_bins) = entries.first().map(|(_, coeff)| coeff.len()) else {
            return Err(MaterialTableError::Empty);
        };

        let mut names = Vec::with_capacity(entries.len());
        let mut coefficients = Vec::with_capacity(entries.len());
        for (name, coeff) in entries {
            if coeff.len() != energy_bins {
                return Err(MaterialTableError::CoefficientLengthMismatch {
                    material: name,
                    expected: energy_bins,
                    actual: coeff.len(),
                });
            }
            names.push(name);
            coefficients.push(coeff);
        }

        Ok(Self {
            names,
            coefficients,
            energy_bins,
        })
    }

    pub fn energy_bins(&self) -> usize {
        self.energy_bins
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn coeff(&self, name: &str) -> Result<&[f64], MaterialTableError> {
        self.index_of(name)
            .map(|index| self.coefficients[index].as_slice())
    }

    pub fn index_of(&self, name: &str) -> Result<usize, MaterialTableError> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .ok_or_else(|| MaterialTableError::UnknownMaterial {
                name: name.to_string(),
            })
    }

    /// Coefficients for a phantom voxel label.
    pub fn coeff_for_label(&self, label: usize) -> Result<&[f64], MaterialTableError> {
        self.coefficients
            .get(label)
            .map(Vec::as_slice)
            .ok_or(MaterialTableError::LabelOutOfRange {
                label,
                materials: self.names.len(),
            })
    }
}
