use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::CoversheetConfig;
use crate::error::RenderError;

/// Longest edge of an embedded preview, in pixels.
const MAX_THUMBNAIL_EDGE: u32 = 600;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Decoded RGB preview of a document page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// Row-major 8-bit RGB samples, `width * height * 3` bytes.
    pub rgb: Vec<u8>,
}

pub trait ThumbnailRenderer: Send + Sync {
    /// Renders the first page of `pdf`. `Ok(None)` means previews are off.
    fn render_first_page(&self, pdf: &Path) -> Result<Option<Thumbnail>, RenderError>;
}

pub struct NoThumbnails;

impl ThumbnailRenderer for NoThumbnails {
    fn render_first_page(&self, _pdf: &Path) -> Result<Option<Thumbnail>, RenderError> {
        Ok(None)
    }
}

/// Renders previews with poppler's `pdftoppm`.
pub struct PdftoppmThumbnailer {
    command: String,
    dpi: u32,
    timeout: Duration,
    scratch_directory: Option<PathBuf>,
}

impl PdftoppmThumbnailer {
    pub fn new(command: impl Into<String>, dpi: u32, scratch_directory: Option<PathBuf>) -> Self {
        Self {
            command: command.into(),
            dpi,
            timeout: DEFAULT_TIMEOUT,
            scratch_directory,
        }
    }

    /// Upper bound for one render; the child is killed after it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True when `command -v` can be spawned. The exit code is ignored since
    /// older poppler releases exit non-zero for `-v`.
    pub fn probe(command: &str) -> bool {
        Command::new(command)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    fn scratch(&self) -> Result<tempfile::TempDir, RenderError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("thumbnail-");
        let dir = match &self.scratch_directory {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        dir.map_err(|e| RenderError::Thumbnail(format!("Failed to create scratch directory: {}", e)))
    }

    /// Waits for `child` until the timeout, then kills and reaps it.
    fn wait(&self, child: &mut Child) -> Result<ExitStatus, RenderError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() < deadline => std::thread::sleep(POLL_INTERVAL),
                Ok(None) => {
                    warn!(
                        "{} exceeded {}s, killing it",
                        self.command,
                        self.timeout.as_secs_f32()
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RenderError::Thumbnail(format!(
                        "{} timed out after {:?}",
                        self.command, self.timeout
                    )));
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RenderError::Thumbnail(format!(
                        "Failed to wait for {}: {}",
                        self.command, e
                    )));
                }
            }
        }
    }
}

impl ThumbnailRenderer for PdftoppmThumbnailer {
    fn render_first_page(&self, pdf: &Path) -> Result<Option<Thumbnail>, RenderError> {
        let _span = tracing::info_span!("processor.thumbnail").entered();

        // Removed on drop, whichever way this function returns.
        let scratch = self.scratch()?;
        let output_prefix = scratch.path().join(format!("page-{}", uuid::Uuid::new_v4()));

        let stderr_path = scratch.path().join("stderr.log");
        let stderr = File::create(&stderr_path)
            .map_err(|e| RenderError::Thumbnail(format!("Failed to create log file: {}", e)))?;

        let mut child = Command::new(&self.command)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .args(["-f", "1", "-l", "1", "-singlefile"])
            .arg(pdf)
            .arg(&output_prefix)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .map_err(|e| RenderError::Thumbnail(format!("Failed to run {}: {}", self.command, e)))?;

        let status = self.wait(&mut child)?;
        if !status.success() {
            let message = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(RenderError::Thumbnail(format!(
                "{} failed: {}",
                self.command,
                message.trim()
            )));
        }

        let image_path = output_prefix.with_extension("png");
        let image = image::open(&image_path)
            .map_err(|e| RenderError::Thumbnail(format!("Failed to load rendered page: {}", e)))?;

        let image = image.thumbnail(MAX_THUMBNAIL_EDGE, MAX_THUMBNAIL_EDGE);
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        debug!("Rendered {}x{} thumbnail", width, height);

        Ok(Some(Thumbnail {
            width,
            height,
            rgb: rgb.into_raw(),
        }))
    }
}

/// Picks the preview implementation once, at startup.
pub fn select_thumbnailer(
    config: &CoversheetConfig,
    scratch_directory: Option<PathBuf>,
) -> Arc<dyn ThumbnailRenderer> {
    if !config.thumbnails {
        info!("Cover sheet thumbnails disabled");
        return Arc::new(NoThumbnails);
    }

    if PdftoppmThumbnailer::probe(&config.thumbnail_command) {
        info!("Cover sheet thumbnails via {}", config.thumbnail_command);
        Arc::new(
            PdftoppmThumbnailer::new(
                config.thumbnail_command.clone(),
                config.thumbnail_dpi,
                scratch_directory,
            )
            .with_timeout(Duration::from_secs(config.thumbnail_timeout_secs)),
        )
    } else {
        warn!(
            "{} not available, cover sheets will have no thumbnail",
            config.thumbnail_command
        );
        Arc::new(NoThumbnails)
    }
}
