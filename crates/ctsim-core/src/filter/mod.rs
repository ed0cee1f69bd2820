//! Frequency-domain Ram-Lak filtering of sinograms.
//!
//! Filtered back-projection needs each projection convolved with a ramp
//! kernel before the angular summation: samples of the 2-D Fourier plane
//! taken along projection slices are `1/|frequency|` dense, and the ramp
//! restores a uniform weighting. A raised-cosine apodization of exponent
//! `alpha` tapers the high-frequency gain to limit noise amplification.

use crate::numerics::{next_power_of_two_at_least, DenseMatrix};
use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("ramp kernel length must be even, got {length}")]
    OddKernelLength { length: usize },
    #[error("ramp kernel length must be at least 2, got {length}")]
    KernelTooShort { length: usize },
    #[error("pixel scale must be finite and > 0, got {scale}")]
    InvalidPixelScale { scale: f64 },
    #[error("sinogram must have at least one sample per angle")]
    EmptySinogram,
}

/// Symmetric frequency-domain Ram-Lak kernel of even length `length`, laid
/// out in FFT order (DC at index 0, mirrored about the midpoint).
///
/// With sampling frequency `w0 = 2*pi/pixel_scale` and bin width
/// `dw = w0/length`, bin `i` of the first half sits at `w = i*dw` and takes
/// the value `(w/2pi) * cos(w/w0 * pi/2)^alpha`. The zero-frequency bin is
/// the removable singularity of the continuous kernel and is set to
/// `dw/(8*pi)`.
pub fn ram_lak_kernel(
    pixel_scale: f64,
    length: usize,
    alpha: f64,
) -> Result<Vec<f64>, FilterError> {
    if !(pixel_scale.is_finite() && pixel_scale > 0.0) {
        return Err(FilterError::InvalidPixelScale { scale: pixel_scale });
    }
    if length < 2 {
        return Err(FilterError::KernelTooShort { length });
    }
    if length % 2 != 0 {
        return Err(FilterError::OddKernelLength { length });
    }

    let sampling_frequency = 2.0 * PI / pixel_scale;
    let bin_width = sampling_frequency / length as f64;
    let half = length / 2;

    let mut kernel = vec![0.0; length];
    for (bin, value) in kernel.iter_mut().take(half).enumerate() {
        let frequency = bin as f64 * bin_width;
        let apodization = ((frequency / sampling_frequency) * (PI / 2.0)).cos();
        *value = (frequency / (2.0 * PI)) * apodization.powf(alpha);
    }
    kernel[0] = bin_width / (8.0 * PI);

    for bin in 0..half {
        kernel[half + bin] = kernel[half - 1 - bin];
    }
    Ok(kernel)
}

/// Applies the Ram-Lak kernel to every angle of a `[angles, samples]`
/// sinogram and returns a filtered sinogram of identical shape.
///
/// Each row is zero-padded to the smallest power of two at least twice the
/// sample count, which keeps the circular convolution of the FFT from
/// wrapping into the measured window.
pub fn ramp_filter(
    sinogram: &DenseMatrix,
    pixel_scale: f64,
    alpha: f64,
) -> Result<DenseMatrix, FilterError> {
    let angles = sinogram.nrows();
    let samples = sinogram.ncols();
    if samples == 0 {
        return Err(FilterError::EmptySinogram);
    }

    let padded = next_power_of_two_at_least(2 * samples);
    let kernel = ram_lak_kernel(pixel_scale, padded, alpha)?;

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(padded);
    let inverse = planner.plan_fft_inverse(padded);

    let mut filtered = DenseMatrix::zeros(angles, samples);
    let mut buffer = vec![Complex64::new(0.0, 0.0); padded];
    for angle in 0..angles {
        for (sample, slot) in buffer.iter_mut().enumerate() {
            let value = if sample < samples {
                sinogram[(angle, sample)]
            } else {
                0.0
            };
            *slot = Complex64::new(value, 0.0);
        }

        forward.process(&mut buffer);
        for (slot, &gain) in buffer.iter_mut().zip(&kernel) {
            *slot *= gain;
        }
        inverse.process(&mut buffer);

        // rustfft leaves the inverse transform unnormalized.
        let normalization = 1.0 / padded as f64;
        for sample in 0..samples {
            filtered[(angle, sample)] = buffer[sample].re * normalization;
        }
    }
    Ok(filtered)
}
