// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   Training ──▶ Validating ──▶ Training ──▶ … ──▶ Done
//
// Key Burn insight:
//   - Training uses B (an AutodiffBackend) for gradients
//   - model.valid() returns the model on B::InnerBackend, so the
//     validation pass cannot record a graph or step the optimiser
//   - Validation batcher must also use B::InnerBackend
//
// Losses are weighted by batch size so a short final batch does
// not skew the epoch average.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, ensure, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use serde::Serialize;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{CifarBatch, CifarBatcher},
    dataset::CifarDataset,
};
use crate::domain::{mode::ExecutionMode, traits::ImageTransform};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::evaluator::{count_correct, cross_entropy};
use crate::ml::model::{Cnn, CnnConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Training,
    Validating,
    Done,
}

/// Per-epoch loss sequences, one entry per completed epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LossTrace {
    pub train: Vec<f64>,
    pub valid: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct TrainSummary {
    pub loss:    f64,
    pub batches: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ValidSummary {
    pub loss:     f64,
    pub correct:  usize,
    pub items:    usize,
    pub accuracy: f64,
}

pub struct Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Cnn<B>, B>,
{
    model: Cnn<B>,
    optim: O,
    lr:    f64,
    phase: Phase,
    trace: LossTrace,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Cnn<B>, B>,
{
    pub fn new(model: Cnn<B>, optim: O, lr: f64) -> Self {
        Self { model, optim, lr, phase: Phase::Training, trace: LossTrace::default() }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// One pass over the training loader, one Adam step per batch.
    pub fn train_epoch(&mut self, loader: &dyn DataLoader<CifarBatch<B>>) -> Result<TrainSummary> {
        self.phase = Phase::Training;

        let mut model    = self.model.clone();
        let mut loss_sum = 0.0f64;
        let mut items    = 0usize;
        let mut batches  = 0usize;

        for batch in loader.iter() {
            let size = batch.len();
            let Some(targets) = batch.targets else {
                bail!("Training batch {} carries no labels", batches + 1);
            };

            let logits = model.forward(batch.images, ExecutionMode::Train);
            let loss   = cross_entropy(logits, targets);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val * size as f64;
            items    += size;
            batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = self.optim.step(self.lr, model, grads);
        }

        ensure!(batches > 0, "Training partition produced no batches");
        self.model = model;

        let loss = loss_sum / items as f64;
        self.trace.train.push(loss);
        tracing::debug!("Training pass: {} batches, loss={:.4}", batches, loss);
        Ok(TrainSummary { loss, batches })
    }

    /// Loss and accuracy over the validation loader. Borrows the model
    /// immutably and runs it on the inner backend in eval mode.
    pub fn validate(
        &mut self,
        loader: &dyn DataLoader<CifarBatch<B::InnerBackend>>,
    ) -> Result<ValidSummary> {
        self.phase = Phase::Validating;

        let model = self.model.valid();

        let mut loss_sum = 0.0f64;
        let mut items    = 0usize;
        let mut correct  = 0usize;

        for batch in loader.iter() {
            let size = batch.len();
            let Some(targets) = batch.targets else {
                bail!("Validation batch carries no labels");
            };

            let logits = model.forward(batch.images, ExecutionMode::Eval);
            let loss: f64 = cross_entropy(logits.clone(), targets.clone())
                .into_scalar()
                .elem::<f64>();

            loss_sum += loss * size as f64;
            items    += size;
            correct  += count_correct(logits, targets);
        }

        ensure!(items > 0, "Validation partition produced no batches");

        let loss = loss_sum / items as f64;
        self.trace.valid.push(loss);
        Ok(ValidSummary { loss, correct, items, accuracy: correct as f64 / items as f64 })
    }

    /// Runs `epochs` train/validate cycles, handing each epoch's metrics
    /// to `on_epoch`.
    pub fn fit(
        &mut self,
        epochs:       usize,
        train_loader: &dyn DataLoader<CifarBatch<B>>,
        valid_loader: &dyn DataLoader<CifarBatch<B::InnerBackend>>,
        mut on_epoch: impl FnMut(&EpochMetrics) -> Result<()>,
    ) -> Result<()> {
        for epoch in 1..=epochs {
            let train = self.train_epoch(train_loader)?;
            let valid = self.validate(valid_loader)?;

            let metrics = EpochMetrics {
                epoch,
                train_loss:    train.loss,
                val_loss:      valid.loss,
                val_accuracy:  valid.accuracy,
                train_batches: train.batches,
            };

            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
                epoch, epochs, train.loss, valid.loss, valid.accuracy * 100.0,
            );

            tracing::debug!(
                "Epoch {}: {}/{} validation images correct",
                epoch, valid.correct, valid.items,
            );

            on_epoch(&metrics)?;
        }

        self.phase = Phase::Done;
        tracing::debug!("Trainer phase: {:?}", self.phase());
        Ok(())
    }

    pub fn finish(self) -> (Cnn<B>, LossTrace) {
        (self.model, self.trace)
    }
}

/// Build model, optimiser and loaders from `cfg`, then run the full loop.
/// Each epoch's metrics are appended to `metrics`.
pub fn run_training<B, T, V>(
    cfg:           &TrainConfig,
    device:        &B::Device,
    train_dataset: CifarDataset<T>,
    val_dataset:   CifarDataset<V>,
    metrics:       &MetricsLogger,
) -> Result<(Cnn<B>, LossTrace)>
where
    B: AutodiffBackend,
    T: ImageTransform + 'static,
    V: ImageTransform + 'static,
{
    use burn::data::dataset::Dataset;

    ensure!(train_dataset.len() > 0, "Training partition is empty");
    ensure!(val_dataset.len() > 0, "Validation partition is empty");
    ensure!(train_dataset.is_labelled(), "Training partition has no labels");
    ensure!(val_dataset.is_labelled(), "Validation partition has no labels");
    ensure!(cfg.batch_size > 0, "Batch size must be at least 1");

    // Dropout masks come from the backend RNG
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model: Cnn<B> = CnnConfig::new()
        .with_dropout(cfg.dropout)
        .init(device, cfg.seed);

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let mut train_builder = DataLoaderBuilder::new(CifarBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed);
    if cfg.workers > 0 {
        train_builder = train_builder.num_workers(cfg.workers);
    }
    let train_loader = train_builder.build(train_dataset);

    // ── Validation data loader (InnerBackend, fixed order) ────────────────────
    let val_loader = DataLoaderBuilder::new(CifarBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .build(val_dataset);

    tracing::info!(
        "Training for {} epochs: batch_size={}, lr={}, workers={}",
        cfg.epochs, cfg.batch_size, cfg.lr, cfg.workers,
    );
    tracing::info!("Per-epoch metrics → '{}'", metrics.csv_path().display());

    let mut trainer = Trainer::new(model, optim, cfg.lr);
    trainer.fit(cfg.epochs, train_loader.as_ref(), val_loader.as_ref(), |m| metrics.log(m))?;

    tracing::info!("Training complete!");
    Ok(trainer.finish())
}

/// `B::seed` sets process-wide state; tests that reseed take this first.
#[cfg(test)]
pub(crate) static BACKEND_SEED_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
