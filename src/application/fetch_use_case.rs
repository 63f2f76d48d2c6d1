// ============================================================
// Layer 2 — Fetch Use Case
// ============================================================
// Downloads the archive if it is missing, then opens it to
// check the three arrays parse and reports their sizes.

use std::path::PathBuf;

use anyhow::Result;

use crate::data::archive::{ArchiveLayout, NpzLoader};
use crate::domain::image::NUM_CLASSES;
use crate::infra::fetch::ensure_archive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub downloaded:   bool,
    pub train_images: usize,
    pub test_images:  usize,
    /// Training images per class, indexed by label
    pub class_counts: [usize; NUM_CLASSES],
}

pub struct FetchUseCase {
    archive:     PathBuf,
    archive_url: Option<String>,
    layout:      ArchiveLayout,
}

impl FetchUseCase {
    pub fn new(archive: PathBuf, archive_url: Option<String>, layout: ArchiveLayout) -> Self {
        Self { archive, archive_url, layout }
    }

    pub fn execute(&self) -> Result<ArchiveSummary> {
        let downloaded = ensure_archive(&self.archive, self.archive_url.as_deref())?;
        let archive = NpzLoader::new(&self.archive, self.layout.clone()).load()?;

        let mut class_counts = [0usize; NUM_CLASSES];
        for label in &archive.train_labels {
            class_counts[label.index()] += 1;
        }

        Ok(ArchiveSummary {
            downloaded,
            train_images: archive.train_images.len(),
            test_images:  archive.test_images.len(),
            class_counts,
        })
    }
}
