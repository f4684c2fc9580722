use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::ReadError;
use crate::logging::file_label;

const ENCRYPT_KEY: &[u8] = b"/Encrypt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inspection {
    /// `None` when the document is encrypted.
    pub page_count: Option<u32>,
    pub encrypted: bool,
}

impl Inspection {
    fn encrypted() -> Self {
        Self {
            page_count: None,
            encrypted: true,
        }
    }
}

pub fn inspect(path: &Path) -> Result<Inspection, ReadError> {
    let _span = tracing::info_span!("processor.inspect").entered();

    let bytes = std::fs::read(path).map_err(|e| ReadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    inspect_bytes(path, &bytes)
}

/// Inspects an in-memory PDF; `path` is only used for error reporting.
pub fn inspect_bytes(path: &Path, bytes: &[u8]) -> Result<Inspection, ReadError> {
    match Document::load_mem(bytes) {
        Ok(doc) => {
            // lopdf decrypts documents with an empty user password on load and
            // only remembers that it did so in `was_encrypted`.
            if doc.is_encrypted() || doc.was_encrypted() {
                warn!(
                    "PDF is password protected: {}",
                    file_label(path)
                );
                return Ok(Inspection::encrypted());
            }

            let page_count = u32::try_from(doc.get_pages().len()).map_err(|_| {
                ReadError::Malformed {
                    path: path.to_path_buf(),
                    reason: "page count out of range".to_string(),
                }
            })?;
            debug!(
                "PDF has {} pages: {}",
                page_count,
                file_label(path)
            );

            Ok(Inspection {
                page_count: Some(page_count),
                encrypted: false,
            })
        }
        Err(_) if trailer_declares_encryption(bytes) => {
            warn!(
                "Encrypted PDF could not be opened: {}",
                file_label(path)
            );
            Ok(Inspection::encrypted())
        }
        Err(e) => Err(ReadError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Whether the last trailer (or cross-reference stream) dictionary carries
/// an `/Encrypt` entry. Page content and strings are never looked at.
fn trailer_declares_encryption(bytes: &[u8]) -> bool {
    let dictionary_start = match rfind(bytes, b"trailer") {
        Some(pos) => find(&bytes[pos..], b"<<").map(|offset| pos + offset),
        None => xref_stream_dictionary(bytes),
    };

    dictionary_start
        .and_then(|start| dictionary_at(&bytes[start..]))
        .is_some_and(|dictionary| find(dictionary, ENCRYPT_KEY).is_some())
}

/// Start of the dictionary of the last `/Type /XRef` object.
fn xref_stream_dictionary(bytes: &[u8]) -> Option<usize> {
    let marker = rfind(bytes, b"/XRef")?;
    let object = rfind(&bytes[..marker], b" obj")?;
    find(&bytes[object..marker], b"<<").map(|offset| object + offset)
}

/// The balanced `<< ... >>` dictionary at the start of `bytes`.
fn dictionary_at(bytes: &[u8]) -> Option<&[u8]> {
    let mut depth = 0usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match &bytes[i..i + 2] {
            b"<<" => {
                depth += 1;
                i += 2;
            }
            b">>" => {
                depth = depth.checked_sub(1)?;
                i += 2;
                if depth == 0 {
                    return Some(&bytes[..i]);
                }
            }
            _ => i += 1,
        }
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
