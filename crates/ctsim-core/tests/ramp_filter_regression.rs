use ctsim_core::filter::{ram_lak_kernel, ramp_filter};
use ctsim_core::DenseMatrix;
use std::f64::consts::PI;

#[test]
fn kernel_is_symmetric_for_a_range_of_lengths_and_alphas() {
    for length in [2, 4, 64, 256, 1024] {
        for alpha in [0.0, 0.001, 0.5, 2.0] {
            let kernel = ram_lak_kernel(0.1, length, alpha).expect("kernel should build");
            for bin in 0..length {
                assert_eq!(
                    kernel[bin],
                    kernel[length - 1 - bin],
                    "length {length} alpha {alpha} bin {bin}"
                );
            }
        }
    }
}

#[test]
fn zero_bin_is_exactly_the_singularity_replacement() {
    for (scale, length) in [(0.1, 256), (0.25, 64), (1.0, 512)] {
        let kernel = ram_lak_kernel(scale, length, 0.001).expect("kernel should build");
        let bin_width = (2.0 * PI / scale) / length as f64;
        assert_eq!(kernel[0], bin_width / (8.0 * PI), "scale {scale}");
    }
}

#[test]
fn filtering_preserves_shape_for_arbitrary_dimensions() {
    for (angles, samples) in [(1, 1), (3, 5), (7, 128), (90, 31)] {
        let mut sinogram = DenseMatrix::zeros(angles, samples);
        for angle in 0..angles {
            for sample in 0..samples {
                sinogram[(angle, sample)] = ((angle + 1) * (sample + 2)) as f64 * 0.01;
            }
        }
        let filtered = ramp_filter(&sinogram, 0.1, 0.001).expect("filter should run");
        assert_eq!(filtered.nrows(), angles, "angles {angles}");
        assert_eq!(filtered.ncols(), samples, "samples {samples}");
    }
}

#[test]
fn mirrored_angles_of_a_uniform_sinogram_filter_identically() {
    // ones((128, 128)) at scale 0.1, alpha 0.001: row i of the output must
    // equal row 127 - i.
    let mut sinogram = DenseMatrix::zeros(128, 128);
    for angle in 0..128 {
        for sample in 0..128 {
            sinogram[(angle, sample)] = 1.0;
        }
    }

    let filtered = ramp_filter(&sinogram, 0.1, 0.001).expect("filter should run");
    for angle in 0..128 {
        for sample in 0..128 {
            assert_eq!(
                filtered[(angle, sample)],
                filtered[(127 - angle, sample)],
                "angle {angle} sample {sample}"
            );
        }
    }
}

#[test]
fn filtered_impulse_has_a_ram_lak_profile() {
    // A centered impulse filters to a positive peak with negative side
    // lobes, the spatial signature of the ramp kernel.
    let mut sinogram = DenseMatrix::zeros(1, 64);
    sinogram[(0, 32)] = 1.0;

    let filtered = ramp_filter(&sinogram, 0.1, 0.001).expect("filter should run");
    assert!(filtered[(0, 32)] > 0.0);
    assert!(filtered[(0, 31)] < filtered[(0, 32)]);
    assert!(filtered[(0, 33)] < filtered[(0, 32)]);
}

#[test]
fn padding_keeps_circular_wraparound_out_of_the_window() {
    // An impulse at the last sample must not leak a large response into the
    // first samples through circular convolution.
    let mut sinogram = DenseMatrix::zeros(1, 64);
    sinogram[(0, 63)] = 1.0;

    let filtered = ramp_filter(&sinogram, 0.1, 0.001).expect("filter should run");
    let peak = filtered[(0, 63)].abs();
    assert!(filtered[(0, 0)].abs() < 0.05 * peak);
}
