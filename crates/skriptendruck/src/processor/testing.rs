//! PDF fixtures for unit tests.

use std::path::{Path, PathBuf};

use lopdf::{
    dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream,
    StringFormat,
};

/// Builds a PDF with `pages` numbered text pages.
pub fn pdf_bytes(pages: u32) -> Vec<u8> {
    save(document(pages, "Page"))
}

/// Builds a PDF whose page text is `text` followed by the page number.
pub fn pdf_bytes_with_text(pages: u32, text: &str) -> Vec<u8> {
    save(document(pages, text))
}

/// Builds an RC4-128 encrypted PDF opened by `user_password`.
pub fn encrypted_pdf_bytes(pages: u32, user_password: &str) -> Vec<u8> {
    let mut doc = document(pages, "Page");
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(b"skriptendruck-01".to_vec(), StringFormat::Literal),
            Object::String(b"skriptendruck-01".to_vec(), StringFormat::Literal),
        ]),
    );
    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password,
        key_length: 128,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version).unwrap();
    doc.encrypt(&state).unwrap();
    save(doc)
}

fn document(pages: u32, text: &str) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for number in 1..=pages {
        let content = format!("BT /F1 24 Tf 72 700 Td ({} {}) Tj ET", text, number);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    // MediaBox and Resources live on the tree root and are inherited.
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => resources_id,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn write_pdf(dir: &Path, name: &str, pages: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pdf_bytes(pages)).unwrap();
    path
}

pub fn page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}
