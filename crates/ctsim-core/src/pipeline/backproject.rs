//! Back-projection: angular summation of filtered projections, either in one
//! pass or as a restartable per-angle sequence with cooperative cancellation.

use super::ReconstructionError;
use crate::numerics::DenseMatrix;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Accumulates a `[angles, samples]` sinogram into a square `samples x
/// samples` image. The pipeline only consumes this contract; the default
/// implementation is [`SummationBackProjector`].
pub trait BackProjector {
    fn back_project(&self, sinogram: &DenseMatrix) -> Result<DenseMatrix, ReconstructionError>;
}

/// Unfiltered angular summation with linear interpolation along the detector
/// axis, scaled by `pi / (2 * angles)` to approximate the continuous
/// back-projection integral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummationBackProjector;

impl BackProjector for SummationBackProjector {
    fn back_project(&self, sinogram: &DenseMatrix) -> Result<DenseMatrix, ReconstructionError> {
        let angles = sinogram.nrows();
        if angles == 0 {
            return Err(ReconstructionError::NoAngles);
        }

        let size = sinogram.ncols();
        let mut image = DenseMatrix::zeros(size, size);
        for angle_index in 0..angles {
            smear_angle(&mut image, sinogram, angle_index);
        }

        let scale = PI / (2.0 * angles as f64);
        for row in 0..size {
            for col in 0..size {
                image[(row, col)] *= scale;
            }
        }
        Ok(image)
    }
}

/// Adds one projection into the accumulator: each pixel reads the filtered
/// projection at its detector coordinate for that angle.
fn smear_angle(image: &mut DenseMatrix, sinogram: &DenseMatrix, angle_index: usize) {
    let angles = sinogram.nrows();
    let size = sinogram.ncols();
    let center = (size as f64 - 1.0) / 2.0;
    let theta = angle_index as f64 * PI / angles as f64;
    let (sin_theta, cos_theta) = theta.sin_cos();

    for row in 0..size {
        let v = row as f64 - center;
        for col in 0..size {
            let u = col as f64 - center;
            let detector = u * cos_theta + v * sin_theta + center;
            if detector < 0.0 || detector > (size - 1) as f64 {
                continue;
            }

            let lower = detector.floor() as usize;
            let upper = (lower + 1).min(size - 1);
            let fraction = detector - lower as f64;
            let value = sinogram[(angle_index, lower)] * (1.0 - fraction)
                + sinogram[(angle_index, upper)] * fraction;
            image[(row, col)] += value;
        }
    }
}

/// Cooperative cancellation handle checked between angles of a
/// [`ProgressiveBackProjection`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Snapshot of the accumulator after a number of angles have been applied,
/// scaled so the final snapshot equals the full back-projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialBackProjection {
    pub angles_applied: usize,
    pub image: DenseMatrix,
}

/// Finite, non-restartable sequence of partial back-projections, one element
/// per processed angle. Cancellation is checked before each angle; once the
/// token fires or all angles are consumed the sequence ends.
pub struct ProgressiveBackProjection {
    sinogram: DenseMatrix,
    accumulator: DenseMatrix,
    next_angle: usize,
    cancel: CancelToken,
}

impl ProgressiveBackProjection {
    pub fn new(sinogram: DenseMatrix, cancel: CancelToken) -> Result<Self, ReconstructionError> {
        if sinogram.nrows() == 0 {
            return Err(ReconstructionError::NoAngles);
        }
        let size = sinogram.ncols();
        Ok(Self {
            sinogram,
            accumulator: DenseMatrix::zeros(size, size),
            next_angle: 0,
            cancel,
        })
    }

    pub fn total_angles(&self) -> usize {
        self.sinogram.nrows()
    }
}

impl Iterator for ProgressiveBackProjection {
    type Item = PartialBackProjection;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_angle >= self.sinogram.nrows() || self.cancel.is_cancelled() {
            return None;
        }

        smear_angle(&mut self.accumulator, &self.sinogram, self.next_angle);
        self.next_angle += 1;

        let scale = PI / (2.0 * self.sinogram.nrows() as f64);
        let size = self.accumulator.nrows();
        let mut image = DenseMatrix::zeros(size, size);
        for row in 0..size {
            for col in 0..size {
                image[(row, col)] = self.accumulator[(row, col)] * scale;
            }
        }
        Some(PartialBackProjection {
            angles_applied: self.next_angle,
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BackProjector, CancelToken, ProgressiveBackProjection, SummationBackProjector,
    };
    use crate::numerics::DenseMatrix;

    fn impulse_sinogram(angles: usize, samples: usize) -> DenseMatrix {
        let mut sinogram = DenseMatrix::zeros(angles, samples);
        for angle in 0..angles {
            sinogram[(angle, samples / 2)] = 1.0;
        }
        sinogram
    }

    #[test]
    fn back_projection_is_square_and_centered_for_an_impulse() {
        let image = SummationBackProjector
            .back_project(&impulse_sinogram(16, 17))
            .expect("back-projection");
        assert_eq!(image.nrows(), 17);
        assert_eq!(image.ncols(), 17);

        let center = image[(8, 8)];
        for (row, col) in [(0, 0), (0, 16), (16, 0), (16, 16)] {
            assert!(center > image[(row, col)]);
        }
    }

    #[test]
    fn empty_sinogram_is_rejected() {
        let sinogram = DenseMatrix::zeros(0, 8);
        assert!(SummationBackProjector.back_project(&sinogram).is_err());
    }

    #[test]
    fn progressive_sweep_ends_at_the_full_back_projection() {
        let sinogram = impulse_sinogram(6, 9);
        let full = SummationBackProjector
            .back_project(&sinogram)
            .expect("back-projection");

        let sweep = ProgressiveBackProjection::new(sinogram, CancelToken::new())
            .expect("sweep should build");
        assert_eq!(sweep.total_angles(), 6);
        let partials: Vec<_> = sweep.collect();
        assert_eq!(partials.len(), 6);
        assert_eq!(partials[5].angles_applied, 6);

        let last = &partials[5].image;
        for row in 0..9 {
            for col in 0..9 {
                assert!((last[(row, col)] - full[(row, col)]).abs() < 1.0e-12);
            }
        }
    }

    #[test]
    fn cancellation_stops_the_sweep_between_angles() {
        let cancel = CancelToken::new();
        let mut sweep =
            ProgressiveBackProjection::new(impulse_sinogram(6, 9), cancel.clone())
                .expect("sweep should build");

        assert!(sweep.next().is_some());
        cancel.cancel();
        assert!(sweep.next().is_none());
    }
}
