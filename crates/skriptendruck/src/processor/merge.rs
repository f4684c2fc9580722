use std::io::Write;
use std::path::Path;

use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::MergeError;
use crate::logging::file_label;
use crate::processor::coversheet::{A4_HEIGHT, A4_WIDTH};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `Parent` chains in broken files.
const MAX_TREE_DEPTH: usize = 64;

/// Writes `coversheet` pages, an optional blank A4 page, then all `document`
/// pages into `output`.
///
/// The result is assembled in a temporary file next to `output` and renamed
/// into place only on success. The inputs are never modified.
pub fn merge(
    coversheet: &Path,
    document: &Path,
    output: &Path,
    insert_blank_page: bool,
) -> Result<(), MergeError> {
    let _span = tracing::info_span!("processor.merge").entered();

    let mut merged = Document::with_version("1.5");
    let mut page_ids = append_pages(&mut merged, coversheet)?;

    if insert_blank_page {
        let blank_id = merged.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => a4_media_box(),
            "Resources" => dictionary! {},
        });
        page_ids.push(blank_id);
    }

    page_ids.extend(append_pages(&mut merged, document)?);

    let pages_id = merged.new_object_id();
    for page_id in &page_ids {
        let page = merged
            .get_dictionary_mut(*page_id)
            .map_err(|e| MergeError::Assemble(format!("page {:?} missing: {}", page_id, e)))?;
        page.set("Parent", pages_id);
    }

    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    merged.prune_objects();

    write_atomically(&mut merged, output)?;

    debug!(
        "Merged {} pages into {}",
        page_ids.len(),
        file_label(output)
    );
    Ok(())
}

fn a4_media_box() -> Vec<Object> {
    vec![
        0.into(),
        0.into(),
        Object::Real(A4_WIDTH),
        Object::Real(A4_HEIGHT),
    ]
}

/// Loads `path`, renumbers its objects past `merged.max_id` and moves them
/// over. Returns the page ids in page order.
fn append_pages(merged: &mut Document, path: &Path) -> Result<Vec<ObjectId>, MergeError> {
    let mut doc = Document::load(path).map_err(|e| MergeError::ReadInput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if doc.is_encrypted() {
        return Err(MergeError::ReadInput {
            path: path.to_path_buf(),
            reason: "document is encrypted".to_string(),
        });
    }

    flatten_inherited_attributes(&mut doc);

    doc.renumber_objects_with(merged.max_id + 1);
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    if page_ids.is_empty() {
        return Err(MergeError::ReadInput {
            path: path.to_path_buf(),
            reason: "document has no pages".to_string(),
        });
    }

    merged.max_id = merged.max_id.max(doc.max_id);
    merged.objects.extend(doc.objects);

    Ok(page_ids)
}

/// Copies inherited attributes onto each page so they survive re-parenting.
fn flatten_inherited_attributes(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let mut inherited: Vec<(&[u8], Object)> = Vec::new();

        for key in INHERITABLE {
            let present = doc
                .get_dictionary(page_id)
                .map(|page| page.has(key))
                .unwrap_or(true);
            if present {
                continue;
            }
            if let Some(value) = find_inherited(doc, page_id, key) {
                inherited.push((key, value));
            } else if key == b"MediaBox" {
                inherited.push((key, Object::Array(a4_media_box())));
            }
        }

        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            for (key, value) in inherited {
                page.set(key.to_vec(), value);
            }
        }
    }
}

fn find_inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc
        .get_dictionary(page_id)
        .ok()?
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(current).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }

    None
}

fn write_atomically(doc: &mut Document, output: &Path) -> Result<(), MergeError> {
    let directory = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(".merge-")
        .suffix(".pdf")
        .tempfile_in(directory)
        .map_err(|e| MergeError::Write {
            path: output.to_path_buf(),
            source: e,
        })?;

    doc.save_to(&mut temp)
        .map_err(|e| MergeError::Assemble(e.to_string()))?;
    temp.flush().map_err(|e| MergeError::Write {
        path: output.to_path_buf(),
        source: e,
    })?;

    // Dropping `temp` on any earlier error removes the partial file.
    temp.persist(output).map_err(|e| MergeError::Write {
        path: output.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
