//! Built-in demonstration dataset: a coarse 12-bin energy grid with linear
//! attenuation coefficients for common CT materials and a matching tube
//! spectrum, so the binary runs end-to-end without external data files.

use ctsim_core::{MaterialTable, MaterialTableError, PhotonSpectrum};

/// Energy grid midpoints in MeV, 0.02 through 0.13.
pub const ENERGY_BINS_MEV: [f64; 12] = [
    0.02, 0.03, 0.04, 0.05, 0.06, 0.07, 0.08, 0.09, 0.10, 0.11, 0.12, 0.13,
];

/// Linear attenuation coefficients in 1/cm per energy bin.
const AIR: [f64; 12] = [
    7.8e-4, 4.4e-4, 3.1e-4, 2.6e-4, 2.3e-4, 2.2e-4, 2.1e-4, 2.0e-4, 1.9e-4, 1.9e-4, 1.8e-4,
    1.8e-4,
];
const ADIPOSE: [f64; 12] = [
    0.61, 0.31, 0.24, 0.21, 0.19, 0.18, 0.17, 0.16, 0.155, 0.15, 0.145, 0.14,
];
const SOFT_TISSUE: [f64; 12] = [
    0.84, 0.40, 0.28, 0.24, 0.215, 0.20, 0.19, 0.18, 0.175, 0.17, 0.165, 0.16,
];
const WATER: [f64; 12] = [
    0.81, 0.38, 0.27, 0.23, 0.21, 0.195, 0.185, 0.175, 0.17, 0.165, 0.16, 0.155,
];
const BONE: [f64; 12] = [
    4.0, 1.6, 0.85, 0.57, 0.45, 0.38, 0.33, 0.30, 0.28, 0.26, 0.25, 0.24,
];
const TITANIUM: [f64; 12] = [
    31.0, 10.0, 4.6, 2.6, 1.7, 1.3, 1.0, 0.85, 0.75, 0.68, 0.62, 0.58,
];

/// Tube output in photons per mAs per cm^2 per bin.
const TUBE_SPECTRUM: [f64; 12] = [
    0.5e5, 1.8e5, 3.2e5, 4.0e5, 4.4e5, 4.2e5, 3.6e5, 2.8e5, 2.0e5, 1.2e5, 0.6e5, 0.2e5,
];

pub fn material_table() -> Result<MaterialTable, MaterialTableError> {
    MaterialTable::from_entries(vec![
        ("Air".to_string(), AIR.to_vec()),
        ("Adipose".to_string(), ADIPOSE.to_vec()),
        ("Soft Tissue".to_string(), SOFT_TISSUE.to_vec()),
        ("Water".to_string(), WATER.to_vec()),
        ("Bone".to_string(), BONE.to_vec()),
        ("Titanium".to_string(), TITANIUM.to_vec()),
    ])
}

pub fn tube_spectrum() -> PhotonSpectrum {
    PhotonSpectrum::new(TUBE_SPECTRUM.to_vec())
}
