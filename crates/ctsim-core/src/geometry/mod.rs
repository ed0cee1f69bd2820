//! Ellipse-rasterized test phantoms.
//!
//! A phantom is a square image of voxel labels, each label an index into the
//! [`MaterialTable`](crate::domain::MaterialTable) it was generated against.
//! Anatomy is built by stacking additive ellipse fills and thresholding the
//! running sum into material labels, which lets ring structures (cortical
//! bone around marrow, metal shells) be carved with negative amplitudes.

use crate::domain::{MaterialTable, MaterialTableError};
use crate::numerics::DenseMatrix;
use serde::{Deserialize, Serialize};

/// One additive ellipse: `value` is added to every pixel inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub value: f64,
    pub semi_axis_x: f64,
    pub semi_axis_y: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub rotation_degrees: f64,
}

impl Ellipse {
    pub fn new(
        value: f64,
        semi_axis_x: f64,
        semi_axis_y: f64,
        center_x: f64,
        center_y: f64,
        rotation_degrees: f64,
    ) -> Self {
        Self {
            value,
            semi_axis_x,
            semi_axis_y,
            center_x,
            center_y,
            rotation_degrees,
        }
    }
}

/// The phantom catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhantomKind {
    /// Simple soft-tissue disc for calibration studies.
    CalibrationDisc,
    /// Single-pixel attenuator for resolution studies.
    PointAttenuator,
    /// Hip cross-section with a single large implant head.
    HipImplant,
    /// Hip cross-section with bilateral implant heads.
    BilateralHipImplant,
    /// Implant sphere with three satellite spheres.
    SphereWithSatellites,
    /// Hollow implant disc plus a separate sphere.
    DiscAndSphere,
    /// Pelvic fixation pins.
    PelvicFixationPins,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhantomError {
    #[error(transparent)]
    Material(#[from] MaterialTableError),
    #[error("phantom size must be at least 2 pixels, got {size}")]
    TooSmall { size: usize },
}

/// Adds each ellipse into an `n x n` field over the square `[-1, 1]^2`.
pub fn rasterize_ellipses(ellipses: &[Ellipse], size: usize) -> DenseMatrix {
    let mut field = DenseMatrix::zeros(size, size);
    let step = 2.0 / (size as f64 - 1.0);

    for ellipse in ellipses {
        let a_squared = ellipse.semi_axis_x * ellipse.semi_axis_x;
        let b_squared = ellipse.semi_axis_y * ellipse.semi_axis_y;
        let phi = ellipse.rotation_degrees.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();

        for row in 0..size {
            // Row 0 is the top of the image, y = +1.
            let y = 1.0 - row as f64 * step - ellipse.center_y;
            for col in 0..size {
                let x = -1.0 + col as f64 * step - ellipse.center_x;
                let rotated_x = x * cos_phi + y * sin_phi;
                let rotated_y = y * cos_phi - x * sin_phi;
                let radius = rotated_x * rotated_x / a_squared + rotated_y * rotated_y / b_squared;
                if radius <= 1.0 {
                    field[(row, col)] += ellipse.value;
                }
            }
        }
    }
    field
}

/// Generates a labeled phantom of the given kind and size.
///
/// The table must contain `Air`, `Adipose`, `Soft Tissue` and `Bone`; the
/// anatomical kinds additionally place an implant of material `metal`
/// (pass `"Soft Tissue"` for no implant).
pub fn phantom(
    materials: &MaterialTable,
    size: usize,
    kind: PhantomKind,
    metal: &str,
) -> Result<DenseMatrix, PhantomError> {
    if size < 2 {
        return Err(PhantomError::TooSmall { size });
    }

    let air = materials.index_of("Air")? as f64;
    let adipose = materials.index_of("Adipose")? as f64;
    let tissue = materials.index_of("Soft Tissue")? as f64;
    let bone = materials.index_of("Bone")? as f64;
    let implant = materials.index_of(metal)? as f64;

    let mut labels = match kind {
        PhantomKind::CalibrationDisc => {
            let field = rasterize_ellipses(
                &[Ellipse::new(1.0, 0.75, 0.75, 0.0, 0.0, 0.0)],
                size,
            );
            threshold(field, 1.0, tissue)
        }
        PhantomKind::PointAttenuator => {
            let mut labels = DenseMatrix::zeros(size, size);
            labels[(size / 2, size / 2)] = tissue;
            labels
        }
        _ => hip_cross_section(size, kind, adipose, tissue, bone, implant),
    };

    for row in 0..size {
        for col in 0..size {
            if labels[(row, col)] == 0.0 {
                labels[(row, col)] = air;
            }
        }
    }
    Ok(labels)
}

/// Pixels at or above `cutoff` become `label`, everything else zero.
fn threshold(field: DenseMatrix, cutoff: f64, label: f64) -> DenseMatrix {
    let mut labels = DenseMatrix::zeros(field.nrows(), field.ncols());
    for row in 0..field.nrows() {
        for col in 0..field.ncols() {
            if field[(row, col)] >= cutoff {
                labels[(row, col)] = label;
            }
        }
    }
    labels
}

/// Generic human hip cross-section: tissue outline, adipose layer, inner
/// soft tissue, cortical bone rings, then the requested implant geometry.
fn hip_cross_section(
    size: usize,
    kind: PhantomKind,
    adipose: f64,
    tissue: f64,
    bone: f64,
    implant: f64,
) -> DenseMatrix {
    let outline = [
        Ellipse::new(1.0, 0.57, 0.52, -0.35, 0.1, 0.0),
        Ellipse::new(1.0, 0.57, 0.52, 0.35, 0.1, 0.0),
        Ellipse::new(1.0, 0.52, 0.45, 0.0, -0.08, 0.0),
    ];
    let mut labels = threshold(rasterize_ellipses(&outline, size), 1.0, tissue);

    let adipose_layer = [
        Ellipse::new(1.0, 0.55, 0.5, -0.35, 0.1, 0.0),
        Ellipse::new(1.0, 0.55, 0.5, 0.35, 0.1, 0.0),
        Ellipse::new(1.0, 0.5, 0.43, 0.0, -0.08, 0.0),
    ];
    relabel_above(&mut labels, &rasterize_ellipses(&adipose_layer, size), tissue, adipose);

    let inner_tissue = [
        Ellipse::new(1.0, 0.37, 0.35, -0.42, 0.03, 0.0),
        Ellipse::new(1.0, 0.37, 0.35, 0.42, 0.03, 0.0),
        Ellipse::new(1.0, 0.24, 0.16, -0.3, 0.28, 20.0),
        Ellipse::new(1.0, 0.24, 0.16, 0.3, 0.28, -20.0),
        Ellipse::new(1.0, 0.4, 0.2, 0.0, -0.15, 0.0),
    ];
    relabel_above(&mut labels, &rasterize_ellipses(&inner_tissue, size), adipose, tissue);

    let bone_rings = [
        Ellipse::new(1.0, 0.16, 0.12, -0.54, -0.01, 0.0),
        Ellipse::new(-1.0, 0.11, 0.10, -0.53, -0.01, 0.0),
        Ellipse::new(1.0, 0.16, 0.12, 0.54, -0.01, 0.0),
        Ellipse::new(-1.0, 0.11, 0.10, 0.53, -0.01, 0.0),
        Ellipse::new(1.0, 0.1, 0.09, -0.25, 0.25, 140.0),
        Ellipse::new(-1.0, 0.07, 0.06, -0.25, 0.25, 140.0),
        Ellipse::new(1.0, 0.18, 0.05, -0.05, -0.15, 100.0),
        Ellipse::new(-1.0, 0.14, 0.03, -0.05, -0.15, 100.0),
        Ellipse::new(1.0, 0.1, 0.09, 0.25, 0.25, -140.0),
        Ellipse::new(-1.0, 0.07, 0.06, 0.25, 0.25, -140.0),
        Ellipse::new(1.0, 0.18, 0.05, 0.05, -0.15, -100.0),
        Ellipse::new(-1.0, 0.14, 0.03, 0.05, -0.15, -100.0),
    ];
    relabel_above(&mut labels, &rasterize_ellipses(&bone_rings, size), tissue, bone);

    // The implant is only visible when denser than soft tissue.
    if implant > tissue {
        let implant_shapes: Vec<Ellipse> = match kind {
            PhantomKind::HipImplant => vec![Ellipse::new(100.0, 0.1, 0.1, -0.48, -0.01, 0.0)],
            PhantomKind::BilateralHipImplant => vec![
                Ellipse::new(100.0, 0.1, 0.1, -0.48, -0.01, 0.0),
                Ellipse::new(100.0, 0.08, 0.06, 0.48, 0.0, 0.0),
            ],
            PhantomKind::SphereWithSatellites => vec![
                Ellipse::new(100.0, 0.05, 0.05, -0.43, -0.03, 0.0),
                Ellipse::new(100.0, 0.02, 0.02, -0.53, 0.04, 0.0),
                Ellipse::new(100.0, 0.02, 0.02, -0.53, -0.10, 0.0),
                Ellipse::new(100.0, 0.02, 0.02, -0.31, -0.03, 0.0),
            ],
            PhantomKind::DiscAndSphere => vec![
                Ellipse::new(100.0, 0.08, 0.08, -0.58, 0.01, 0.0),
                Ellipse::new(-100.0, 0.05, 0.05, -0.58, 0.01, 0.0),
                Ellipse::new(100.0, 0.05, 0.05, -0.25, -0.1, 0.0),
            ],
            PhantomKind::PelvicFixationPins => vec![
                Ellipse::new(100.0, 0.02, 0.025, -0.08, -0.03, 0.0),
                Ellipse::new(100.0, 0.025, 0.025, -0.03, -0.25, 0.0),
                Ellipse::new(100.0, 0.025, 0.025, -0.3, 0.25, 0.0),
                Ellipse::new(100.0, 0.025, 0.025, -0.2, 0.25, 0.0),
            ],
            PhantomKind::CalibrationDisc | PhantomKind::PointAttenuator => Vec::new(),
        };
        relabel_above(&mut labels, &rasterize_ellipses(&implant_shapes, size), bone, implant);
    }

    labels
}

/// Replaces labels wherever `labels + field` exceeds `cutoff`.
fn relabel_above(labels: &mut DenseMatrix, field: &DenseMatrix, cutoff: f64, label: f64) {
    for row in 0..labels.nrows() {
        for col in 0..labels.ncols() {
            if labels[(row, col)] + field[(row, col)] > cutoff {
                labels[(row, col)] = label;
            }
        }
    }
}
