// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains the CNN and writes the submission
//   2. `fetch` — downloads the archive if needed and summarises it
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, FetchArgs, TrainArgs};

use crate::domain::image::CLASS_NAMES;

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "cifar_cnn",
    version,
    about = "Train a small CNN on CIFAR-10 and write a competition submission."
)]
pub struct Cli {
    /// The subcommand to run (train or fetch)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Fetch(args) => run_fetch(args),
        }
    }
}

/// Handles the `train` subcommand.
/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = args.resolve()?;
    tracing::info!("Starting training from archive '{}'", config.archive.display());

    let summary = TrainUseCase::new(config).execute()?;

    println!(
        "Training complete after {} epochs: train_loss={:.4}, val_loss={:.4}, val_acc={:.1}%",
        summary.epochs,
        summary.final_train,
        summary.final_valid,
        summary.val_accuracy * 100.0,
    );
    println!("Run artifacts in '{}'", summary.output_dir.display());
    println!(
        "Submission with {} predictions in '{}'",
        summary.predictions,
        summary.submission_dir.display()
    );
    Ok(())
}

/// Handles the `fetch` subcommand.
fn run_fetch(args: FetchArgs) -> Result<()> {
    use crate::application::fetch_use_case::FetchUseCase;

    let layout = args.archive.layout();
    let path = args.archive.archive.clone();
    let summary = FetchUseCase::new(args.archive.archive, args.archive.archive_url, layout).execute()?;

    let state = if summary.downloaded { "downloaded" } else { "already present" };
    println!("Archive '{}' {}", path.display(), state);
    println!("  training images: {}", summary.train_images);
    println!("  test images:     {}", summary.test_images);
    for (name, count) in CLASS_NAMES.iter().zip(summary.class_counts) {
        println!("  {name:<10} {count}");
    }
    Ok(())
}
