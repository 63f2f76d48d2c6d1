// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Fetch archive if absent     (Layer 6 - infra)
//   Step 2: Load the .npz arrays        (Layer 4 - data)
//   Step 3: Split train/validation      (Layer 4 - data)
//   Step 4: Save config, open metrics   (Layer 6 - infra)
//   Step 5: Build datasets              (Layer 4 - data)
//   Step 6: Run training loop           (Layer 5 - ml)
//   Step 7: Validation report           (Layer 3 - domain)
//   Step 8: Predict the test set        (Layer 5 - ml)
//   Step 9: Write the submission        (Layer 6 - infra)
//
// Steps 5-9 are generic over the Burn backend; the device in
// the config picks which one is instantiated.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::{bail, ensure, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};

use crate::data::{
    archive::{ArchiveLayout, NpzLoader},
    dataset::CifarDataset,
    splitter::split_train_val,
    transform::{Augment, Normalize},
};
use crate::domain::{
    confusion::ConfusionMatrix,
    image::{ImageRecord, Label, CLASS_NAMES},
    traits::PredictionSink,
};
use crate::infra::{
    artifacts::ArtifactStore,
    fetch::ensure_archive,
    metrics::MetricsLogger,
    submission::SubmissionWriter,
};
use crate::ml::{backend::DeviceKind, inferencer::Inferencer, trainer::run_training};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run.
// Serialisable so it can be saved next to the metrics and reloaded
// with --config. Missing fields fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub archive:        PathBuf,
    pub archive_url:    Option<String>,
    pub layout:         ArchiveLayout,
    pub output_dir:     PathBuf,
    pub submission_dir: PathBuf,
    pub epochs:         usize,
    pub batch_size:     usize,
    pub lr:             f64,
    pub seed:           u64,
    pub val_fraction:   f64,
    pub device:         DeviceKind,
    pub workers:        usize,
    pub flip_prob:      f64,
    pub crop_padding:   usize,
    pub dropout:        f64,
    pub competition:    String,
    pub environment:    String,
    pub output_env_var: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            archive:        PathBuf::from("data/cifar10.npz"),
            archive_url:    None,
            layout:         ArchiveLayout::default(),
            output_dir:     PathBuf::from("runs"),
            submission_dir: PathBuf::from("submission"),
            epochs:         10,
            batch_size:     32,
            lr:             1e-3,
            seed:           42,
            val_fraction:   0.2,
            device:         DeviceKind::Cpu,
            workers:        0,
            flip_prob:      0.5,
            crop_padding:   4,
            dropout:        0.0,
            competition:    "cifar10".to_string(),
            environment:    "python3".to_string(),
            output_env_var: "OUTPUT_PATH".to_string(),
        }
    }
}

impl TrainConfig {
    /// Reject settings that would fail later, deep inside the run.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.epochs > 0, "--epochs must be at least 1");
        ensure!(self.batch_size > 0, "--batch-size must be at least 1");
        ensure!(self.lr > 0.0, "--lr must be positive, got {}", self.lr);
        ensure!(
            self.val_fraction > 0.0 && self.val_fraction < 1.0,
            "--val-fraction must be in (0, 1), got {}",
            self.val_fraction
        );
        ensure!(
            (0.0..=1.0).contains(&self.flip_prob),
            "--flip-prob must be in [0, 1], got {}",
            self.flip_prob
        );
        ensure!(
            (0.0..1.0).contains(&self.dropout),
            "--dropout must be in [0, 1), got {}",
            self.dropout
        );
        ensure!(
            self.device.is_available(),
            "Device '{}' is not available in this build (enable the `wgpu` feature)",
            self.device
        );
        Ok(())
    }
}

/// What a finished run reports back to the CLI.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub epochs:         usize,
    pub final_train:    f64,
    pub final_valid:    f64,
    pub val_accuracy:   f64,
    pub predictions:    usize,
    pub output_dir:     PathBuf,
    pub submission_dir: PathBuf,
}

/// Labelled images kept apart from any transform so they can be
/// wrapped in more than one dataset.
struct Partition {
    records: Vec<ImageRecord>,
    labels:  Vec<Label>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<RunSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Make sure the archive is on disk ──────────────────────────
        if ensure_archive(&cfg.archive, cfg.archive_url.as_deref())? {
            tracing::info!("Downloaded archive to '{}'", cfg.archive.display());
        }

        // ── Step 2: Load the three arrays ─────────────────────────────────────
        let archive = NpzLoader::new(&cfg.archive, cfg.layout.clone()).load()?;

        // ── Step 3: Train / validation split ──────────────────────────────────
        let pairs: Vec<(ImageRecord, Label)> = archive
            .train_images
            .into_iter()
            .zip(archive.train_labels)
            .collect();
        let (train_pairs, val_pairs) = split_train_val(pairs, 1.0 - cfg.val_fraction, cfg.seed);
        let train = unzip(train_pairs);
        let valid = unzip(val_pairs);
        tracing::info!(
            "Split: {} train, {} validation",
            train.records.len(),
            valid.records.len()
        );
        ensure!(!train.records.is_empty(), "Training partition is empty");
        ensure!(
            !valid.records.is_empty(),
            "Validation partition is empty; raise --val-fraction or supply more images"
        );

        // ── Step 4: Persist the effective config ──────────────────────────────
        let store   = ArtifactStore::new(&cfg.output_dir)?;
        store.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.output_dir)?;

        // ── Steps 5-9 on the configured device ────────────────────────────────
        let test = archive.test_images;
        match cfg.device {
            DeviceKind::Cpu => {
                let device = burn::backend::ndarray::NdArrayDevice::Cpu;
                tracing::info!("Using NdArray device: {:?}", device);
                run_pipeline::<burn::backend::Autodiff<burn::backend::NdArray>>(
                    cfg, &device, train, valid, test, &store, &metrics,
                )
            }
            #[cfg(feature = "wgpu")]
            DeviceKind::Gpu => {
                let device = burn::backend::wgpu::WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                run_pipeline::<burn::backend::Autodiff<burn::backend::Wgpu>>(
                    cfg, &device, train, valid, test, &store, &metrics,
                )
            }
            #[cfg(not(feature = "wgpu"))]
            DeviceKind::Gpu => bail!("This build has no GPU backend; rebuild with `--features wgpu`"),
        }
    }
}

fn unzip(pairs: Vec<(ImageRecord, Label)>) -> Partition {
    let (records, labels) = pairs.into_iter().unzip();
    Partition { records, labels }
}

fn run_pipeline<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    device:  &B::Device,
    train:   Partition,
    valid:   Partition,
    test:    Vec<ImageRecord>,
    store:   &ArtifactStore,
    metrics: &MetricsLogger,
) -> Result<RunSummary> {
    // ── Step 5: Build Burn datasets ───────────────────────────────────────────
    // Augmentation only on the training partition
    let augment = Augment::new(cfg.flip_prob, cfg.crop_padding, cfg.seed)?;
    let train_dataset = CifarDataset::labelled(train.records, train.labels, augment)?;
    let val_dataset   = CifarDataset::labelled(valid.records.clone(), valid.labels.clone(), Normalize)?;

    // ── Step 6: Run training loop (Layer 5) ───────────────────────────────────
    let (model, trace) = run_training::<B, _, _>(cfg, device, train_dataset, val_dataset, metrics)?;
    store.save_loss_trace(&trace)?;

    let (Some(&final_train), Some(&final_valid)) = (trace.train.last(), trace.valid.last()) else {
        bail!("Training finished without recording any losses");
    };

    // ── Step 7: Validation report ─────────────────────────────────────────────
    let inferencer = Inferencer::new(model.valid(), device.clone(), cfg.batch_size);
    let truth: Vec<usize> = valid.labels.iter().map(|l| l.index()).collect();
    let val_predictions = inferencer.predict(CifarDataset::unlabelled(valid.records, Normalize))?;
    let confusion = ConfusionMatrix::from_pairs(&truth, &val_predictions)?;
    store.save_report(&confusion.render_report(&CLASS_NAMES))?;
    tracing::info!("Validation accuracy: {:.2}%", confusion.accuracy() * 100.0);

    // ── Step 8: Predict the test set ──────────────────────────────────────────
    let predictions = inferencer.predict(CifarDataset::unlabelled(test, Normalize))?;
    tracing::info!("Predicted {} test images", predictions.len());

    // ── Step 9: Submission files ──────────────────────────────────────────────
    let writer = SubmissionWriter::new(
        &cfg.submission_dir,
        &cfg.competition,
        &cfg.environment,
        &cfg.output_env_var,
    );
    writer.publish(&predictions)?;

    Ok(RunSummary {
        epochs:         trace.train.len(),
        final_train,
        final_valid,
        val_accuracy:   confusion.accuracy(),
        predictions:    predictions.len(),
        output_dir:     store.dir().to_path_buf(),
        submission_dir: writer.dir().to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::archive::fixtures::write_synthetic;
    use crate::ml::trainer::BACKEND_SEED_LOCK;

    #[test]
    fn test_defaults_are_valid() {
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn test_bad_val_fraction_is_rejected() {
        let cfg = TrainConfig { val_fraction: 1.0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_flip_probability_is_rejected() {
        for flip_prob in [f64::NAN, -0.5, 1.01] {
            let cfg = TrainConfig { flip_prob, ..TrainConfig::default() };
            assert!(cfg.validate().is_err(), "accepted flip_prob = {flip_prob}");
        }
    }

    #[test]
    fn test_partial_json_config_uses_defaults() {
        let cfg: TrainConfig = serde_json::from_str(r#"{"epochs": 3, "device": "cpu"}"#).unwrap();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.output_env_var, "OUTPUT_PATH");
    }

    #[test]
    fn test_missing_archive_without_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { archive: dir.path().join("absent.npz"), ..TrainConfig::default() };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_full_pipeline_writes_artifacts() {
        let _guard = BACKEND_SEED_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("cifar.npz");
        write_synthetic(&archive, 50, 20);

        let cfg = TrainConfig {
            archive,
            output_dir: dir.path().join("run"),
            submission_dir: dir.path().join("submission"),
            epochs: 1,
            batch_size: 10,
            ..TrainConfig::default()
        };
        let summary = TrainUseCase::new(cfg).execute().unwrap();

        assert_eq!(summary.epochs, 1);
        assert_eq!(summary.predictions, 20);
        assert!(summary.final_train.is_finite());

        let run = dir.path().join("run");
        for name in ["run_config.json", "metrics.csv", "loss_trace.json", "classification_report.txt"] {
            assert!(run.join(name).exists(), "missing {name}");
        }
        let submission = dir.path().join("submission");
        assert!(submission.join("submission.json").exists());
        let script = std::fs::read_to_string(submission.join("main.py")).unwrap();
        assert!(script.contains("OUTPUT_PATH"));
    }
}
