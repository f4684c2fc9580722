pub mod config;
pub mod error;
pub mod filename;
pub mod identity;
pub mod logging;
pub mod order;
pub mod pipeline;
pub mod pricing;
pub mod processor;
pub mod storage;
pub mod worker;

pub use config::{load_config, Config};
pub use error::{
    ConfigError, MergeError, ParseError, ReadError, RenderError, Result, SkriptendruckError,
    StorageError, WorkerError,
};
pub use filename::{parse_filename, ParsedFilename};
pub use identity::{DirectoryLookup, DirectoryOutcome, IdentityResolver, Resolution};
pub use order::{BindingType, ColorMode, Identity, Order, OrderStatus};
pub use pipeline::{BatchReport, BatchRunner, BatchSummary, Pipeline, PipelineConfig};
pub use pricing::{PriceCalculation, PricingEngine};
