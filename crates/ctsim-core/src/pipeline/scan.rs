//! Parallel-beam acquisition: rasterized phantom in, raw detector sinogram
//! out.

use super::ReconstructionError;
use crate::domain::MaterialTable;
use crate::numerics::DenseMatrix;
use crate::physics::{detect, Detection, DepthMap};

/// Produces a raw detector sinogram `[angles, samples]` from a labeled
/// phantom. The pipeline only consumes this contract; the default
/// implementation is [`ParallelBeamScanner`].
pub trait Scanner {
    fn scan(
        &self,
        spectrum: &[f64],
        materials: &MaterialTable,
        phantom: &DenseMatrix,
        pixel_scale: f64,
        angle_count: usize,
    ) -> Result<DenseMatrix, ReconstructionError>;
}

/// Parallel-beam scanner: for each angle it walks one ray per detector
/// sample through the phantom, accumulates the per-material path length into
/// a [`DepthMap`] and runs photon transport on the stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParallelBeamScanner;

impl Scanner for ParallelBeamScanner {
    fn scan(
        &self,
        spectrum: &[f64],
        materials: &MaterialTable,
        phantom: &DenseMatrix,
        pixel_scale: f64,
        angle_count: usize,
    ) -> Result<DenseMatrix, ReconstructionError> {
        if angle_count == 0 {
            return Err(ReconstructionError::NoAngles);
        }

        let size = phantom.nrows();
        let material_count = materials.names().len();
        let coefficients: Vec<&[f64]> = (0..material_count)
            .map(|label| materials.coeff_for_label(label))
            .collect::<Result<_, _>>()?;

        let mut sinogram = DenseMatrix::zeros(angle_count, size);
        for angle_index in 0..angle_count {
            let theta = angle_index as f64 * std::f64::consts::PI / angle_count as f64;
            let depths = path_lengths(phantom, material_count, theta, pixel_scale)?;
            let signal = detect(Detection::new(spectrum, &coefficients, &depths))?;
            for (sample, &value) in signal.iter().enumerate() {
                sinogram[(angle_index, sample)] = value;
            }
        }
        Ok(sinogram)
    }
}

/// Per-material path lengths seen by each detector sample at one angle.
///
/// Rays are traced in index space: detector coordinate `u` and ray
/// coordinate `v` rotate into the image as `x = u cos - v sin`,
/// `y = u sin + v cos` about the center, with nearest-neighbor label lookup
/// so voxel labels stay discrete. Each ray step contributes one pixel scale
/// of depth to the material it lands on.
fn path_lengths(
    phantom: &DenseMatrix,
    material_count: usize,
    theta: f64,
    pixel_scale: f64,
) -> Result<DepthMap, ReconstructionError> {
    let size = phantom.nrows();
    let center = (size as f64 - 1.0) / 2.0;
    let (sin_theta, cos_theta) = theta.sin_cos();

    let mut rows = vec![vec![0.0; size]; material_count];
    for sample in 0..size {
        let u = sample as f64 - center;
        for step in 0..size {
            let v = step as f64 - center;
            let x = u * cos_theta - v * sin_theta + center;
            let y = u * sin_theta + v * cos_theta + center;
            let col = x.round();
            let row = y.round();
            if col < 0.0 || row < 0.0 || col >= size as f64 || row >= size as f64 {
                continue;
            }

            let label = phantom[(row as usize, col as usize)] as usize;
            if label >= material_count {
                return Err(ReconstructionError::Material(
                    crate::domain::MaterialTableError::LabelOutOfRange {
                        label,
                        materials: material_count,
                    },
                ));
            }
            rows[label][sample] += pixel_scale;
        }
    }
    Ok(DepthMap::from_rows(&rows)?)
}

#[cfg(test)]
mod tests {
    use super::{ParallelBeamScanner, Scanner};
    use crate::domain::MaterialTable;
    use crate::numerics::DenseMatrix;
    use crate::physics::MIN_DETECTABLE_PHOTONS;

    fn table() -> MaterialTable {
        MaterialTable::from_entries(vec![
            ("Air".to_string(), vec![0.0, 0.0]),
            ("Water".to_string(), vec![0.3, 0.2]),
        ])
        .expect("table should build")
    }

    fn water_disc(size: usize) -> DenseMatrix {
        let mut labels = DenseMatrix::zeros(size, size);
        let center = (size as f64 - 1.0) / 2.0;
        let radius = size as f64 / 4.0;
        for row in 0..size {
            for col in 0..size {
                let dx = col as f64 - center;
                let dy = row as f64 - center;
                if (dx * dx + dy * dy).sqrt() <= radius {
                    labels[(row, col)] = 1.0;
                }
            }
        }
        labels
    }

    #[test]
    fn sinogram_shape_is_angles_by_samples() {
        let sinogram = ParallelBeamScanner
            .scan(&[1.0e5, 5.0e4], &table(), &water_disc(16), 0.1, 12)
            .expect("scan");
        assert_eq!(sinogram.nrows(), 12);
        assert_eq!(sinogram.ncols(), 16);
    }

    #[test]
    fn central_rays_attenuate_more_than_edge_rays() {
        let sinogram = ParallelBeamScanner
            .scan(&[1.0e5, 5.0e4], &table(), &water_disc(32), 0.1, 8)
            .expect("scan");
        for angle in 0..8 {
            assert!(
                sinogram[(angle, 16)] < sinogram[(angle, 0)],
                "angle {angle}"
            );
            assert!(sinogram[(angle, 0)] >= MIN_DETECTABLE_PHOTONS);
        }
    }

    #[test]
    fn zero_angles_are_rejected() {
        let result = ParallelBeamScanner.scan(&[1.0e5], &table(), &water_disc(8), 0.1, 0);
        assert!(result.is_err());
    }
}
