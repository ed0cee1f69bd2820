//! Simulation of X-ray computed-tomography acquisition and filtered
//! back-projection reconstruction.
//!
//! The crate models polychromatic photon attenuation through layered
//! materials ([`physics`]), converts noisy detector signal into calibrated
//! linear-attenuation sinograms with optional beam-hardening correction
//! ([`calibrate`]), applies the Ram-Lak ramp filter required before
//! back-projection ([`filter`]), and composes the whole chain into a
//! reconstruction pipeline ([`pipeline`]). Test phantoms are rasterized by
//! [`geometry`].

pub mod calibrate;
pub mod domain;
pub mod filter;
pub mod geometry;
pub mod numerics;
pub mod physics;
pub mod pipeline;

pub use domain::{MaterialTable, MaterialTableError, PhotonSpectrum};
pub use numerics::DenseMatrix;
