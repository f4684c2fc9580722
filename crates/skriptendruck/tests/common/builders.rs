//! Builders for PDF fixtures and directory stubs.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lopdf::{
    dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream,
    StringFormat,
};

use skriptendruck::identity::{DirectoryLookup, DirectoryOutcome};
use skriptendruck::Identity;

/// Builder for small but valid PDF documents.
pub struct PdfBuilder {
    pages: u32,
    user_password: Option<String>,
    text: String,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            pages: 1,
            user_password: None,
            text: "Lecture notes page".to_string(),
        }
    }

    pub fn pages(mut self, pages: u32) -> Self {
        self.pages = pages;
        self
    }

    /// Encrypts the document so it only opens with `user_password`.
    pub fn password(mut self, user_password: &str) -> Self {
        self.user_password = Some(user_password.to_string());
        self
    }

    /// Text printed on every page, followed by the page number.
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for number in 1..=self.pages {
            let content = format!("BT /F1 18 Tf 72 720 Td ({} {}) Tj ET", self.text, number);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(user_password) = &self.user_password {
            doc.trailer.set(
                "ID",
                Object::Array(vec![
                    Object::String(b"fixture-id-00001".to_vec(), StringFormat::Literal),
                    Object::String(b"fixture-id-00001".to_vec(), StringFormat::Literal),
                ]),
            );
            let version = EncryptionVersion::V2 {
                document: &doc,
                owner_password: "owner",
                user_password: user_password.as_str(),
                key_length: 128,
                permissions: Permissions::all(),
            };
            let state = EncryptionState::try_from(version).expect("Failed to set up encryption");
            doc.encrypt(&state).expect("Failed to encrypt fixture PDF");
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("Failed to serialize fixture PDF");
        bytes
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory stub that answers every lookup the same way and counts calls.
pub struct CountingDirectory {
    outcome: DirectoryOutcome,
    calls: AtomicUsize,
}

impl CountingDirectory {
    pub fn new(outcome: DirectoryOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    /// A directory that knows everybody under the given full name.
    pub fn resolving(full_name: &str) -> Arc<Self> {
        Self::new(DirectoryOutcome::Found(Identity::new("placeholder", full_name)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DirectoryLookup for CountingDirectory {
    fn lookup(&self, username: &str) -> DirectoryOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            DirectoryOutcome::Found(identity) => DirectoryOutcome::Found(Identity {
                username: username.to_string(),
                ..identity.clone()
            }),
            other => other.clone(),
        }
    }

    fn name(&self) -> &str {
        "counting"
    }
}
