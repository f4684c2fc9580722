use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::filename::ParsedFilename;
use crate::pricing::PriceCalculation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Bw,
    Color,
}

impl ColorMode {
    /// Accepts the English and the legacy German filename tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "bw" | "sw" => Some(Self::Bw),
            "color" | "colour" | "farbig" | "farbe" => Some(Self::Color),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Bw => "bw",
            Self::Color => "color",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Bw => "Black & white",
            Self::Color => "Color",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingType {
    None,
    Folder,
    Ring,
}

impl BindingType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "none" | "ob" => Some(Self::None),
            "folder" | "sh" => Some(Self::Folder),
            "ring" | "mb" => Some(Self::Ring),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Folder => "folder",
            Self::Ring => "ring",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Discovered,
    Processed,
    ErrorInvalidFilename,
    ErrorUserNotFound,
    ErrorBlocked,
    ErrorTooFewPages,
    ErrorTooManyPages,
    ErrorPasswordProtected,
    ErrorOther,
    ManualReview,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 10] = [
        OrderStatus::Discovered,
        OrderStatus::Processed,
        OrderStatus::ErrorInvalidFilename,
        OrderStatus::ErrorUserNotFound,
        OrderStatus::ErrorBlocked,
        OrderStatus::ErrorTooFewPages,
        OrderStatus::ErrorTooManyPages,
        OrderStatus::ErrorPasswordProtected,
        OrderStatus::ErrorOther,
        OrderStatus::ManualReview,
    ];

    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::ErrorInvalidFilename
                | Self::ErrorUserNotFound
                | Self::ErrorBlocked
                | Self::ErrorTooFewPages
                | Self::ErrorTooManyPages
                | Self::ErrorPasswordProtected
                | Self::ErrorOther
        )
    }

    pub fn is_terminal(self) -> bool {
        self != Self::Discovered
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Processed => "processed",
            Self::ErrorInvalidFilename => "error_invalid_filename",
            Self::ErrorUserNotFound => "error_user_not_found",
            Self::ErrorBlocked => "error_blocked",
            Self::ErrorTooFewPages => "error_too_few_pages",
            Self::ErrorTooManyPages => "error_too_many_pages",
            Self::ErrorPasswordProtected => "error_password_protected",
            Self::ErrorOther => "error_other",
            Self::ManualReview => "manual_review",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved person. Never mutated once attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub full_name: String,
    pub faculty: Option<String>,
    pub blocked: bool,
}

impl Identity {
    pub fn new(username: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            full_name: full_name.into(),
            faculty: None,
            blocked: false,
        }
    }

    pub fn with_faculty(mut self, faculty: impl Into<String>) -> Self {
        self.faculty = Some(faculty.into());
        self
    }
}

/// One print request, derived from one discovered source file.
///
/// Stages mutate the order in place until it reaches a terminal status;
/// after that the orchestrator only reads it.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub order_id: u32,
    pub filename: String,
    pub filepath: PathBuf,
    pub file_size_bytes: u64,
    pub created_at: DateTime<Local>,

    pub parsed_username: Option<String>,
    pub parsed_name: Option<String>,
    pub color_mode: Option<ColorMode>,
    pub binding_type: Option<BindingType>,
    pub binding_size_mm: Option<u32>,
    pub sequence_number: Option<u32>,

    pub page_count: Option<u32>,
    pub user: Option<Identity>,
    pub price_calculation: Option<PriceCalculation>,
    pub status: OrderStatus,
    pub error_message: Option<String>,

    /// Where the order ended up: the deliverable (cover sheet + document), or
    /// the source itself when no deliverable was produced.
    pub output_path: Option<PathBuf>,
    /// Location of the source file (or its copy) in the originals archive.
    pub archive_path: Option<PathBuf>,
    /// Non-fatal notes collected along the way.
    pub warnings: Vec<String>,
}

impl Order {
    pub fn new(
        order_id: u32,
        filepath: PathBuf,
        file_size_bytes: u64,
        created_at: DateTime<Local>,
    ) -> Self {
        let filename = filepath
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            order_id,
            filename,
            filepath,
            file_size_bytes,
            created_at,
            parsed_username: None,
            parsed_name: None,
            color_mode: None,
            binding_type: None,
            binding_size_mm: None,
            sequence_number: None,
            page_count: None,
            user: None,
            price_calculation: None,
            status: OrderStatus::Discovered,
            error_message: None,
            output_path: None,
            archive_path: None,
            warnings: Vec::new(),
        }
    }

    /// Builds an order from a file on disk, reading size and timestamp.
    pub fn from_path(order_id: u32, path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let timestamp = metadata.created().or_else(|_| metadata.modified())?;
        Ok(Self::new(
            order_id,
            path.to_path_buf(),
            metadata.len(),
            DateTime::<Local>::from(timestamp),
        ))
    }

    pub fn apply_parsed(&mut self, parsed: &ParsedFilename) {
        self.parsed_username = Some(parsed.username.clone());
        self.color_mode = Some(parsed.color_mode);
        self.binding_type = Some(parsed.binding_type);
        self.binding_size_mm = parsed.binding_size_mm;
        self.sequence_number = Some(parsed.sequence_number);
    }

    pub fn attach_user(&mut self, identity: Identity) {
        self.parsed_name = Some(identity.full_name.clone());
        self.user = Some(identity);
    }

    /// Moves the order into an error status. The message must be non-empty.
    pub fn fail(&mut self, status: OrderStatus, message: impl Into<String>) {
        debug_assert!(status.is_error(), "{status} is not an error status");
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("Order failed with status {}", status);
        }
        self.status = status;
        self.error_message = Some(message);
    }

    pub fn send_to_review(&mut self, reason: impl Into<String>) {
        self.status = OrderStatus::ManualReview;
        self.error_message = Some(reason.into());
    }

    pub fn mark_processed(&mut self) {
        self.status = OrderStatus::Processed;
        self.error_message = None;
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    /// Per-order unique file name used in every destination directory.
    pub fn destination_filename(&self) -> String {
        format!("{:04}_{}", self.order_id, self.filename)
    }

    /// Name printed on the cover sheet, most specific first.
    pub fn display_name(&self) -> &str {
        if let Some(user) = &self.user {
            return &user.full_name;
        }
        self.parsed_name
            .as_deref()
            .or(self.parsed_username.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}
