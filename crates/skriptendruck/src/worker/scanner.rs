use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::WorkerError;
use crate::logging::file_label;
use crate::order::Order;

/// Lists the PDF orders waiting in the input directory.
pub struct DirectoryScanner {
    input_directory: PathBuf,
}

impl DirectoryScanner {
    pub fn new<P: AsRef<Path>>(input_directory: P) -> Self {
        Self {
            input_directory: input_directory.as_ref().to_path_buf(),
        }
    }

    pub fn input_directory(&self) -> &Path {
        &self.input_directory
    }

    /// Returns one order per top-level PDF, sorted by file name and numbered
    /// from 1 in that order.
    pub fn scan(&self) -> Result<Vec<Order>, WorkerError> {
        let mut paths = Vec::new();

        for entry in WalkDir::new(&self.input_directory)
            .min_depth(1)
            .max_depth(1) // Only the top level, subdirectories are not orders
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(WorkerError::ScanFailed {
                        path: self.input_directory.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if is_pdf(entry.path()) {
                debug!("Found order: {}", file_label(entry.path()));
                paths.push(entry.into_path());
            }
        }

        let mut orders = Vec::with_capacity(paths.len());
        for path in paths {
            let order_id = orders.len() as u32 + 1;
            match Order::from_path(order_id, &path) {
                Ok(order) => orders.push(order),
                // Removed or unreadable between listing and stat.
                Err(e) => warn!("Skipping {}: {}", file_label(&path), e),
            }
        }

        info!(
            "Scanned {} orders in {}",
            orders.len(),
            self.input_directory.display()
        );
        Ok(orders)
    }
}

fn is_pdf(path: &Path) -> bool {
    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    by_extension
        && mime_guess::from_path(path)
            .iter()
            .any(|mime| mime == mime_guess::mime::APPLICATION_PDF)
}
