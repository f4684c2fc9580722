//! Test harness for isolated batch runs.
//!
//! Every harness owns a temporary base directory with an `incoming/` input
//! directory, a fallback registry and a blocklist, plus a `Config` pointing
//! at them. Cover sheet thumbnails are disabled so runs do not depend on
//! external tools.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_fs::prelude::*;
use assert_fs::TempDir;

use skriptendruck::identity::DirectoryLookup;
use skriptendruck::pipeline::{BatchReport, BatchRunner, PipelineConfig};
use skriptendruck::{Config, Order};

use super::builders::PdfBuilder;

pub const REGISTRY: &str = "\
# username  first  last  faculty
ab12345 Anna Berger Informatik
cd67890; Carl Dietz
";

pub const BLOCKLIST: &str = "\
# unpaid invoices
xx99999
";

pub struct TestHarness {
    temp_dir: TempDir,
    pub base: PathBuf,
    pub incoming: PathBuf,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let incoming = temp_dir.child("base/incoming");
        incoming.create_dir_all().expect("Failed to create input dir");

        let registry = temp_dir.child("registry.txt");
        registry.write_str(REGISTRY).expect("Failed to write registry");
        let blocklist = temp_dir.child("blocklist.txt");
        blocklist.write_str(BLOCKLIST).expect("Failed to write blocklist");

        let base = temp_dir.path().join("base");
        let mut config = Config::with_base_directory(&base);
        config.identity.fallback_registry = Some(registry.path().to_path_buf());
        config.identity.blocklist = Some(blocklist.path().to_path_buf());
        config.coversheet.thumbnails = false;
        config.processing.worker_count = 3;

        Self {
            incoming: incoming.path().to_path_buf(),
            base,
            config,
            temp_dir,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_pdf(&self, filename: &str, pages: u32) -> PathBuf {
        self.write_input(filename, &PdfBuilder::new().pages(pages).build())
    }

    pub fn write_encrypted_pdf(&self, filename: &str, pages: u32) -> PathBuf {
        let bytes = PdfBuilder::new().pages(pages).password("secret").build();
        self.write_input(filename, &bytes)
    }

    pub fn write_pdf_with_text(&self, filename: &str, pages: u32, text: &str) -> PathBuf {
        self.write_input(filename, &PdfBuilder::new().pages(pages).text(text).build())
    }

    pub fn write_input(&self, filename: &str, content: &[u8]) -> PathBuf {
        let path = self.incoming.join(filename);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    pub fn runner(&self, parallel: bool) -> BatchRunner {
        BatchRunner::from_config(&self.config)
            .expect("Failed to build batch runner")
            .parallel(parallel)
    }

    pub fn run(&self, parallel: bool) -> BatchReport {
        self.runner(parallel).run().expect("Batch failed")
    }

    pub fn run_with_directory(
        &self,
        parallel: bool,
        directory: Arc<dyn DirectoryLookup>,
    ) -> BatchReport {
        let pipeline_config = PipelineConfig::build(&self.config)
            .expect("Failed to build pipeline config")
            .with_directory(directory);
        BatchRunner::new(
            pipeline_config,
            parallel,
            self.config.processing.worker_count,
        )
        .run()
        .expect("Batch failed")
    }

    /// Path below the base directory.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.base.join(relative)
    }

    /// Sorted file names directly inside `relative`.
    pub fn files_in(&self, relative: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path(relative))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_file())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn page_count(&self, path: &Path) -> usize {
        lopdf::Document::load(path)
            .expect("Failed to load output PDF")
            .get_pages()
            .len()
    }
}

/// Finds the finished order for `filename` in a report.
pub fn order_named<'a>(report: &'a BatchReport, filename: &str) -> &'a Order {
    report
        .orders
        .iter()
        .find(|order| order.filename == filename)
        .unwrap_or_else(|| panic!("no order for {}", filename))
}
