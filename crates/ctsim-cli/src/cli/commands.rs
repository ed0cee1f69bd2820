use crate::data;
use anyhow::{Context, Result};
use ctsim_core::calibrate::BeamHardening;
use ctsim_core::filter::ram_lak_kernel;
use ctsim_core::geometry::{phantom as generate_phantom, PhantomKind};
use ctsim_core::pipeline::{
    reconstruct_per_material, ParallelBeamScanner, ReconstructionConfig,
    SummationBackProjector,
};
use ctsim_core::DenseMatrix;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct ReconstructArgs {
    /// Phantom to scan
    #[arg(long, value_enum, default_value = "calibration-disc")]
    phantom: PhantomChoice,

    /// Phantom width in pixels
    #[arg(long, default_value_t = 128)]
    size: usize,

    /// Number of projection angles over a half rotation
    #[arg(long, default_value_t = 128)]
    angles: usize,

    /// Pixel width in cm
    #[arg(long, default_value_t = 0.1)]
    scale: f64,

    /// Raised-cosine apodization exponent
    #[arg(long, default_value_t = 0.001)]
    alpha: f64,

    /// Tube current-time product in mAs
    #[arg(long, default_value_t = 10_000.0)]
    dose: f64,

    /// Implant material for the anatomical phantoms
    #[arg(long, default_value = "Titanium")]
    metal: String,

    /// Apply beam-hardening correction
    #[arg(long)]
    correct: bool,

    /// Beam-hardening polynomial degree
    #[arg(long, default_value_t = 3)]
    order: usize,

    /// Material targeted by the beam-hardening fit
    #[arg(long, default_value = "Water")]
    target: String,

    /// Candidate materials for iterative per-material reconstruction;
    /// repeat the flag to fuse several
    #[arg(long = "candidate")]
    candidates: Vec<String>,

    /// Output JSON path
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct PhantomArgs {
    /// Phantom to generate
    #[arg(long, value_enum, default_value = "hip-implant")]
    phantom: PhantomChoice,

    /// Phantom width in pixels
    #[arg(long, default_value_t = 128)]
    size: usize,

    /// Implant material for the anatomical phantoms
    #[arg(long, default_value = "Titanium")]
    metal: String,

    /// Output JSON path
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct KernelArgs {
    /// Pixel width in cm
    #[arg(long, default_value_t = 0.1)]
    scale: f64,

    /// Kernel length (even)
    #[arg(long, default_value_t = 256)]
    length: usize,

    /// Raised-cosine apodization exponent
    #[arg(long, default_value_t = 0.001)]
    alpha: f64,

    /// Output JSON path
    #[arg(long)]
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum PhantomChoice {
    CalibrationDisc,
    PointAttenuator,
    HipImplant,
    BilateralHipImplant,
    SphereWithSatellites,
    DiscAndSphere,
    PelvicFixationPins,
}

impl From<PhantomChoice> for PhantomKind {
    fn from(choice: PhantomChoice) -> Self {
        match choice {
            PhantomChoice::CalibrationDisc => PhantomKind::CalibrationDisc,
            PhantomChoice::PointAttenuator => PhantomKind::PointAttenuator,
            PhantomChoice::HipImplant => PhantomKind::HipImplant,
            PhantomChoice::BilateralHipImplant => PhantomKind::BilateralHipImplant,
            PhantomChoice::SphereWithSatellites => PhantomKind::SphereWithSatellites,
            PhantomChoice::DiscAndSphere => PhantomKind::DiscAndSphere,
            PhantomChoice::PelvicFixationPins => PhantomKind::PelvicFixationPins,
        }
    }
}

#[derive(Serialize)]
struct ReconstructionReport {
    size: usize,
    angles: usize,
    pixel_scale: f64,
    attenuation: Vec<Vec<f64>>,
    hounsfield: Option<Vec<Vec<f64>>>,
    labels: Option<Vec<usize>>,
}

#[derive(Serialize)]
struct PhantomReport {
    size: usize,
    materials: Vec<String>,
    labels: Vec<Vec<f64>>,
}

#[derive(Serialize)]
struct KernelReport {
    pixel_scale: f64,
    alpha: f64,
    kernel: Vec<f64>,
}

pub(super) fn reconstruct(args: ReconstructArgs) -> Result<()> {
    let table = data::material_table().context("building the material table")?;
    let spectrum = data::tube_spectrum();
    let labels = generate_phantom(&table, args.size, args.phantom.into(), &args.metal)
        .context("generating the phantom")?;

    let mut config = ReconstructionConfig::new(args.scale, args.angles);
    config.dose = args.dose;
    config.alpha = args.alpha;
    if args.correct {
        config.correction = Some(BeamHardening::new(args.order, args.target.clone()));
    }

    info!(
        size = args.size,
        angles = args.angles,
        correct = args.correct,
        "starting reconstruction"
    );

    let report = if args.candidates.is_empty() {
        let result = reconstruct_single(&spectrum, &table, &labels, &config)?;
        ReconstructionReport {
            size: args.size,
            angles: args.angles,
            pixel_scale: args.scale,
            attenuation: matrix_rows(&result.0),
            hounsfield: Some(matrix_rows(&result.1)),
            labels: None,
        }
    } else {
        info!(candidates = ?args.candidates, "iterative per-material mode");
        let fused = reconstruct_per_material(
            &ParallelBeamScanner,
            &SummationBackProjector,
            &spectrum,
            &table,
            &labels,
            &config,
            &args.candidates,
        )
        .context("running the iterative reconstruction")?;
        ReconstructionReport {
            size: args.size,
            angles: args.angles,
            pixel_scale: args.scale,
            attenuation: matrix_rows(&fused.image),
            hounsfield: None,
            labels: Some(fused.labels),
        }
    };

    write_json(&args.output, &report)?;
    info!(output = %args.output.display(), "reconstruction written");
    Ok(())
}

fn reconstruct_single(
    spectrum: &ctsim_core::PhotonSpectrum,
    table: &ctsim_core::MaterialTable,
    labels: &DenseMatrix,
    config: &ReconstructionConfig,
) -> Result<(DenseMatrix, DenseMatrix)> {
    let result = ctsim_core::pipeline::reconstruct(
        &ParallelBeamScanner,
        &SummationBackProjector,
        spectrum,
        table,
        labels,
        config,
    )
    .context("running the reconstruction")?;
    Ok((result.attenuation, result.hounsfield))
}

pub(super) fn phantom(args: PhantomArgs) -> Result<()> {
    let table = data::material_table().context("building the material table")?;
    let labels = generate_phantom(&table, args.size, args.phantom.into(), &args.metal)
        .context("generating the phantom")?;

    let report = PhantomReport {
        size: args.size,
        materials: table.names().to_vec(),
        labels: matrix_rows(&labels),
    };
    write_json(&args.output, &report)?;
    info!(output = %args.output.display(), "phantom written");
    Ok(())
}

pub(super) fn kernel(args: KernelArgs) -> Result<()> {
    let kernel = ram_lak_kernel(args.scale, args.length, args.alpha)
        .context("building the ramp kernel")?;
    let report = KernelReport {
        pixel_scale: args.scale,
        alpha: args.alpha,
        kernel,
    };
    write_json(&args.output, &report)?;
    info!(output = %args.output.display(), "kernel written");
    Ok(())
}

fn matrix_rows(matrix: &DenseMatrix) -> Vec<Vec<f64>> {
    (0..matrix.nrows())
        .map(|row| (0..matrix.ncols()).map(|col| matrix[(row, col)]).collect())
        .collect()
}

fn write_json<T: Serialize>(path: &PathBuf, value: &T) -> Result<()> {
    let encoded = serde_json::to_string_pretty(value).context("encoding the report")?;
    fs::write(path, encoded).with_context(|| format!("writing '{}'", path.display()))?;
    Ok(())
}
