//! PDF merge and rotate.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use crate::error::{IonixError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: &[&[u8]] = &[b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

/// Guards against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

fn is_node(object: &Object, kind: &[u8]) -> bool {
    match object {
        Object::Dictionary(dict) => {
            matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name.as_slice() == kind)
        }
        _ => false,
    }
}

/// Look up `key` on a page, walking up through its parents.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut dict: &Dictionary = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Copy inherited attributes onto each page so pages survive being moved
/// under a new page-tree root.
fn flatten_inherited(doc: &mut Document) -> Result<Vec<ObjectId>> {
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for &page_id in &pages {
        let missing: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter(|key| {
                doc.get_dictionary(page_id)
                    .map(|d| !d.has(key))
                    .unwrap_or(false)
            })
            .filter_map(|key| inherited(doc, page_id, key).map(|v| (*key, v)))
            .collect();

        let page = doc.get_dictionary_mut(page_id)?;
        for (key, value) in missing {
            page.set(key.to_vec(), value);
        }
    }
    Ok(pages)
}

pub fn ensure_unencrypted(doc: &Document) -> Result<()> {
    if doc.trailer.has(b"Encrypt") {
        return Err(IonixError::validation(
            "PDF is password-protected and cannot be processed",
        ));
    }
    Ok(())
}

/// Concatenate the pages of `docs` in order into a new document.
pub fn merge(docs: Vec<Document>) -> Result<Document> {
    if docs.is_empty() {
        return Err(IonixError::validation("No PDF files to merge"));
    }

    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut next_id = 1;

    for mut doc in docs {
        ensure_unencrypted(&doc)?;
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        page_ids.extend(flatten_inherited(&mut doc)?);
        objects.extend(
            doc.objects
                .into_iter()
                .filter(|(_, o)| !is_node(o, b"Catalog") && !is_node(o, b"Pages")),
        );
    }

    let mut merged = Document::with_version("1.5");
    merged.objects = objects;
    merged.max_id = next_id;

    let pages_id = merged.new_object_id();
    for &page_id in &page_ids {
        merged.get_dictionary_mut(page_id)?.set("Parent", pages_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_ids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    merged.prune_objects();

    tracing::debug!(pages = page_ids.len(), "merged pdf");
    Ok(merged)
}

/// Turn every page 90 degrees clockwise.
pub fn rotate(doc: &mut Document) -> Result<()> {
    ensure_unencrypted(doc)?;
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in pages {
        let current = inherited(doc, page_id, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        let rotated = (current + 90).rem_euclid(360);
        doc.get_dictionary_mut(page_id)?.set("Rotate", rotated);
    }
    Ok(())
}

// ============================================================================
// File helpers
// ============================================================================

pub fn load(path: &Path) -> Result<Document> {
    let doc = Document::load(path)?;
    ensure_unencrypted(&doc)?;
    Ok(doc)
}

fn save(doc: &mut Document, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    doc.compress();
    let mut file = std::fs::File::create(output)?;
    doc.save_to(&mut file)?;
    Ok(())
}

/// Merge `inputs` into `output`, returning the page count written.
pub fn merge_files<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Result<usize> {
    let docs = inputs
        .iter()
        .map(|p| load(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let mut merged = merge(docs)?;
    let count = merged.get_pages().len();
    save(&mut merged, output)?;
    Ok(count)
}

pub fn rotate_file(input: &Path, output: &Path) -> Result<usize> {
    let mut doc = load(input)?;
    rotate(&mut doc)?;
    let count = doc.get_pages().len();
    save(&mut doc, output)?;
    Ok(count)
}
