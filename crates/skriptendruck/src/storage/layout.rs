use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::order::{ColorMode, OrderStatus};
use crate::storage::FileStorage;

const PRINT_READY: &str = "print-ready";
const PRINTED: &str = "printed";
const ORIGINALS: &str = "originals";
const MANUAL_REVIEW: &str = "manual-review";
const WORK: &str = ".work";

/// Directory of each terminal status, relative to the base directory.
pub fn relative_destination(status: OrderStatus, color_mode: Option<ColorMode>) -> &'static str {
    match status {
        OrderStatus::Processed => match color_mode.unwrap_or(ColorMode::Bw) {
            ColorMode::Bw => "print-ready/bw",
            ColorMode::Color => "print-ready/color",
        },
        OrderStatus::ErrorInvalidFilename => "errors/invalid-filename",
        OrderStatus::ErrorUserNotFound => "errors/user-not-found",
        OrderStatus::ErrorBlocked => "errors/blocked",
        OrderStatus::ErrorTooFewPages => "errors/too-few-pages",
        OrderStatus::ErrorTooManyPages => "errors/too-many-pages",
        OrderStatus::ErrorPasswordProtected => "errors/password-protected",
        OrderStatus::ManualReview => MANUAL_REVIEW,
        // A non-terminal order should never be routed; treat it as a failure.
        OrderStatus::ErrorOther | OrderStatus::Discovered => "errors/other",
    }
}

/// The folder tree under the base directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    base: PathBuf,
}

impl OutputLayout {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn destination(&self, status: OrderStatus, color_mode: Option<ColorMode>) -> PathBuf {
        self.base.join(relative_destination(status, color_mode))
    }

    pub fn print_ready(&self, color_mode: ColorMode) -> PathBuf {
        self.destination(OrderStatus::Processed, Some(color_mode))
    }

    /// Where staff move deliverables after printing.
    pub fn printed(&self, color_mode: ColorMode) -> PathBuf {
        self.print_ready(color_mode).join(PRINTED)
    }

    pub fn originals(&self) -> PathBuf {
        self.base.join(ORIGINALS)
    }

    /// Scratch space for cover sheets and merges, on the same filesystem as
    /// the destinations so the final move is a rename.
    pub fn work(&self) -> PathBuf {
        self.base.join(WORK)
    }

    pub fn all_directories(&self) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.base.join(PRINT_READY),
            self.printed(ColorMode::Bw),
            self.printed(ColorMode::Color),
            self.originals(),
            self.work(),
        ];
        dirs.extend(
            OrderStatus::ALL
                .into_iter()
                .filter(|status| status.is_error() || *status == OrderStatus::ManualReview)
                .map(|status| self.destination(status, None)),
        );
        dirs.sort();
        dirs.dedup();
        dirs
    }

    /// Creates the whole tree. Safe to call repeatedly.
    pub fn ensure(&self, storage: &FileStorage) -> Result<(), StorageError> {
        for dir in self.all_directories() {
            storage.ensure_directory(&dir)?;
        }
        Ok(())
    }
}
