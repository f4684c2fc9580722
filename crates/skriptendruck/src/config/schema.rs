use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Root of the output tree (`print-ready/`, `errors/`, `originals/`, ...).
    pub base_directory: PathBuf,
    /// Where new orders are picked up. Defaults to `<base_directory>/incoming`.
    #[serde(default)]
    pub input_directory: Option<PathBuf>,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub pages: PagesConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub coversheet: CoversheetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Minimal config rooted at `base_directory`, everything else defaulted.
    pub fn with_base_directory(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            version: "1.0".to_string(),
            base_directory: base_directory.into(),
            input_directory: None,
            processing: ProcessingConfig::default(),
            pages: PagesConfig::default(),
            pricing: PricingConfig::default(),
            identity: IdentityConfig::default(),
            coversheet: CoversheetConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn input_directory(&self) -> PathBuf {
        self.input_directory
            .clone()
            .unwrap_or_else(|| self.base_directory.join("incoming"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// JSON-lines file receiving one record per finished order.
    #[serde(default)]
    pub results_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            worker_count: default_worker_count(),
            results_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    #[serde(default = "default_min_pages")]
    pub min: u32,
    #[serde(default = "default_max_pages")]
    pub max: u32,
}

fn default_min_pages() -> u32 {
    1
}

fn default_max_pages() -> u32 {
    1000
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            min: default_min_pages(),
            max: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// JSON ring-size table. The built-in table is used when unset.
    #[serde(default)]
    pub price_table: Option<PathBuf>,
    #[serde(default = "default_bw_page_cents")]
    pub bw_page_cents: u64,
    #[serde(default = "default_color_page_cents")]
    pub color_page_cents: u64,
    #[serde(default = "default_folder_cents")]
    pub folder_cents: u64,
    #[serde(default = "default_deposit_cents")]
    pub deposit_cents: u64,
}

fn default_bw_page_cents() -> u64 {
    4
}

fn default_color_page_cents() -> u64 {
    10
}

fn default_folder_cents() -> u64 {
    50
}

fn default_deposit_cents() -> u64 {
    100
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_table: None,
            bw_page_cents: default_bw_page_cents(),
            color_page_cents: default_color_page_cents(),
            folder_cents: default_folder_cents(),
            deposit_cents: default_deposit_cents(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousMatchPolicy {
    #[default]
    ManualReview,
    FirstMatch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub blocklist: Option<PathBuf>,
    #[serde(default)]
    pub fallback_registry: Option<PathBuf>,
    #[serde(default)]
    pub ambiguous_match: AmbiguousMatchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoversheetConfig {
    #[serde(default)]
    pub insert_blank_page: bool,
    #[serde(default = "default_true")]
    pub thumbnails: bool,
    #[serde(default = "default_thumbnail_command")]
    pub thumbnail_command: String,
    #[serde(default = "default_thumbnail_dpi")]
    pub thumbnail_dpi: u32,
    /// Seconds a preview may take before the renderer is killed.
    #[serde(default = "default_thumbnail_timeout_secs")]
    pub thumbnail_timeout_secs: u64,
    #[serde(default = "default_header")]
    pub header: String,
    #[serde(default = "default_footer")]
    pub footer: String,
    #[serde(default = "default_true")]
    pub invalid_filename_notice: bool,
}

fn default_thumbnail_command() -> String {
    "pdftoppm".to_string()
}

fn default_thumbnail_dpi() -> u32 {
    50
}

fn default_thumbnail_timeout_secs() -> u64 {
    30
}

fn default_header() -> String {
    "Skriptendruck print service".to_string()
}

fn default_footer() -> String {
    "Please bring this sheet when collecting your order.".to_string()
}

impl Default for CoversheetConfig {
    fn default() -> Self {
        Self {
            insert_blank_page: false,
            thumbnails: true,
            thumbnail_command: default_thumbnail_command(),
            thumbnail_dpi: default_thumbnail_dpi(),
            thumbnail_timeout_secs: default_thumbnail_timeout_secs(),
            header: default_header(),
            footer: default_footer(),
            invalid_filename_notice: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file. Always records DEBUG regardless of `level`.
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            format: LogFormat::default(),
        }
    }
}
