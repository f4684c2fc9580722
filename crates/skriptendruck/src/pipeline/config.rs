use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::config::{AmbiguousMatchPolicy, Config};
use crate::error::{ConfigError, StorageError};
use crate::identity::{
    Blocklist, DirectoryLookup, DisabledDirectory, FallbackRegistry, IdentityResolver,
};
use crate::pricing::PricingEngine;
use crate::processor::{select_thumbnailer, CoversheetRenderer, ThumbnailRenderer};
use crate::storage::{DestinationRouter, OutputLayout};

/// Everything an order needs, loaded once per batch and shared by all
/// workers.
pub struct PipelineConfig {
    pub input_directory: PathBuf,
    pub min_pages: u32,
    pub max_pages: u32,
    pub ambiguous_match: AmbiguousMatchPolicy,
    pub insert_blank_page: bool,
    pub invalid_filename_notice: bool,
    pub pricing: PricingEngine,
    pub identity: IdentityResolver,
    pub coversheet: CoversheetRenderer,
    pub router: DestinationRouter,
}

impl PipelineConfig {
    /// Loads the price table, blocklist and registry and picks the thumbnail
    /// implementation. Any unreadable or malformed resource is fatal.
    pub fn build(config: &Config) -> Result<Self, ConfigError> {
        let pricing = PricingEngine::from_config(&config.pricing)?;

        let blocklist = match &config.identity.blocklist {
            Some(path) => Blocklist::load(path)?,
            None => Blocklist::default(),
        };
        let registry = match &config.identity.fallback_registry {
            Some(path) => FallbackRegistry::load(path)?,
            None => FallbackRegistry::default(),
        };
        info!(
            "Identity sources: {} blocked, {} registry entries",
            blocklist.len(),
            registry.len()
        );
        let identity = IdentityResolver::new(blocklist, Arc::new(DisabledDirectory), registry);

        let layout = OutputLayout::new(&config.base_directory);
        let thumbnails = select_thumbnailer(&config.coversheet, Some(layout.work()));

        Ok(Self {
            input_directory: config.input_directory(),
            min_pages: config.pages.min,
            max_pages: config.pages.max,
            ambiguous_match: config.identity.ambiguous_match,
            insert_blank_page: config.coversheet.insert_blank_page,
            invalid_filename_notice: config.coversheet.invalid_filename_notice,
            pricing,
            identity,
            coversheet: CoversheetRenderer::from_config(&config.coversheet, thumbnails),
            router: DestinationRouter::new(layout),
        })
    }

    /// Replaces the directory service consulted between blocklist and
    /// registry.
    pub fn with_directory(mut self, directory: Arc<dyn DirectoryLookup>) -> Self {
        let (blocklist, registry) = self.identity.into_sources();
        self.identity = IdentityResolver::new(blocklist, directory, registry);
        self
    }

    pub fn with_thumbnails(mut self, thumbnails: Arc<dyn ThumbnailRenderer>) -> Self {
        self.coversheet = self.coversheet.with_thumbnails(thumbnails);
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        self.router.layout()
    }

    /// Creates the output tree.
    pub fn prepare(&self) -> Result<(), StorageError> {
        self.layout().ensure(self.router.storage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::with_base_directory(temp_dir.path());
        config.coversheet.thumbnails = false;

        let pipeline_config = PipelineConfig::build(&config).unwrap();

        assert_eq!(pipeline_config.input_directory, temp_dir.path().join("incoming"));
        assert_eq!(pipeline_config.min_pages, 1);
        assert_eq!(
            pipeline_config.ambiguous_match,
            AmbiguousMatchPolicy::ManualReview
        );
        assert!(!pipeline_config.pricing.table().ring_sizes().is_empty());
    }

    #[test]
    fn test_build_fails_on_missing_blocklist() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::with_base_directory(temp_dir.path());
        config.identity.blocklist = Some(temp_dir.path().join("missing.txt"));

        assert!(matches!(
            PipelineConfig::build(&config),
            Err(ConfigError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_build_fails_on_malformed_price_table() {
        let temp_dir = TempDir::new().unwrap();
        let table = temp_dir.path().join("prices.json");
        std::fs::write(&table, r#"{"ring_sizes": []}"#).unwrap();
        let mut config = Config::with_base_directory(temp_dir.path());
        config.pricing.price_table = Some(table);

        assert!(matches!(
            PipelineConfig::build(&config),
            Err(ConfigError::PriceTable { .. })
        ));
    }

    #[test]
    fn test_prepare_creates_tree() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::with_base_directory(temp_dir.path());
        config.coversheet.thumbnails = false;

        let pipeline_config = PipelineConfig::build(&config).unwrap();
        pipeline_config.prepare().unwrap();

        assert!(temp_dir.path().join("print-ready/color/printed").is_dir());
        assert!(temp_dir.path().join(".work").is_dir());
    }
}
