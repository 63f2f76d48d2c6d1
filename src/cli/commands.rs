// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `fetch`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, PathBuf, enums)
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::data::archive::ArchiveLayout;
use crate::infra::artifacts::load_json;
use crate::ml::backend::DeviceKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the CNN, evaluate it and write the submission
    Train(TrainArgs),

    /// Download the dataset archive if missing and summarise it
    Fetch(FetchArgs),
}

/// Where the dataset archive lives and how its arrays are named.
/// Shared by both subcommands.
#[derive(Args, Debug, Clone)]
pub struct ArchiveArgs {
    /// Path of the .npz archive
    #[arg(long, default_value = "data/cifar10.npz")]
    pub archive: PathBuf,

    /// Where to download the archive from when it is missing
    #[arg(long)]
    pub archive_url: Option<String>,

    /// Array name of the training images inside the archive
    #[arg(long, default_value = "x_train")]
    pub train_images: String,

    /// Array name of the training labels inside the archive
    #[arg(long, default_value = "y_train")]
    pub train_labels: String,

    /// Array name of the test images inside the archive
    #[arg(long, default_value = "x_test")]
    pub test_images: String,
}

impl ArchiveArgs {
    pub fn layout(&self) -> ArchiveLayout {
        ArchiveLayout {
            train_images: self.train_images.clone(),
            train_labels: self.train_labels.clone(),
            test_images:  self.test_images.clone(),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceArg {
    Cpu,
    Gpu,
}

impl From<DeviceArg> for DeviceKind {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Cpu => DeviceKind::Cpu,
            DeviceArg::Gpu => DeviceKind::Gpu,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// Directory for run_config.json, metrics.csv, loss_trace.json
    /// and classification_report.txt
    #[arg(long, default_value = "runs")]
    pub output_dir: PathBuf,

    /// Directory for submission.json and main.py
    #[arg(long, default_value = "submission")]
    pub submission_dir: PathBuf,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Number of images processed together in one forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Seeds the split, the weights, the shuffle and the augmentation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of the training images held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub val_fraction: f64,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,

    /// Prefetch threads for the training loader.
    /// Anything above 0 may reorder batches between runs.
    #[arg(long, default_value_t = 0)]
    pub workers: usize,

    /// Probability of a horizontal flip per training image
    #[arg(long, default_value_t = 0.5)]
    pub flip_prob: f64,

    /// Zero padding (pixels) around the random crop
    #[arg(long, default_value_t = 4)]
    pub crop_padding: usize,

    /// Dropout before the output layer, training only
    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Competition named in submission.json
    #[arg(long, default_value = "cifar10")]
    pub competition: String,

    /// Execution environment named in submission.json
    #[arg(long, default_value = "python3")]
    pub environment: String,

    /// Environment variable main.py reads its output path from
    #[arg(long, default_value = "OUTPUT_PATH")]
    pub output_env_var: String,

    /// Load the whole configuration from a JSON file instead of the flags
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl TrainArgs {
    /// The effective config: the JSON file if one was given,
    /// otherwise the flags.
    pub fn resolve(self) -> Result<TrainConfig> {
        match &self.config {
            Some(path) => {
                tracing::info!("Loading configuration from '{}'", path.display());
                load_json(path)
            }
            None => Ok(self.into()),
        }
    }
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            layout:         a.archive.layout(),
            archive:        a.archive.archive,
            archive_url:    a.archive.archive_url,
            output_dir:     a.output_dir,
            submission_dir: a.submission_dir,
            epochs:         a.epochs,
            batch_size:     a.batch_size,
            lr:             a.lr,
            seed:           a.seed,
            val_fraction:   a.val_fraction,
            device:         a.device.into(),
            workers:        a.workers,
            flip_prob:      a.flip_prob,
            crop_padding:   a.crop_padding,
            dropout:        a.dropout,
            competition:    a.competition,
            environment:    a.environment,
            output_env_var: a.output_env_var,
        }
    }
}

/// All arguments for the `fetch` command
#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub archive: ArchiveArgs,
}
