//! Concatenating report parts into one PDF

use std::collections::BTreeMap;
use std::path::PathBuf;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};
use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Options for merging PDFs
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

impl MergeOptions {
    pub fn new(input_paths: Vec<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_paths,
            output_path: output_path.into(),
        }
    }
}

/// Merge several PDF files into one, pages in input order
///
/// Returns the number of pages written.
///
/// # Example
///
/// ```no_run
/// use pdf_reports::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions::new(
///     vec![PathBuf::from("portada.pdf"), PathBuf::from("contenido_uas.pdf")],
///     "informe_acme.pdf",
/// );
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<usize> {
    if options.input_paths.is_empty() {
        return Err(Error::General("No input files provided".to_string()));
    }

    for path in &options.input_paths {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let mut documents: Vec<Document> = Vec::new();
    for path in &options.input_paths {
        let doc = Document::load(path)?;
        if doc.get_pages().is_empty() {
            return Err(Error::EmptyPdf(path.clone()));
        }
        debug!("Loaded {} ({} pages)", path.display(), doc.get_pages().len());
        documents.push(doc);
    }

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &pages {
            flatten_inherited_attributes(&mut doc, page_id)?;
        }
        page_ids.extend(pages);

        // Old page tree nodes and catalogs are replaced below
        objects.extend(
            doc.objects
                .into_iter()
                .filter(|(_, object)| !is_tree_node(object)),
        );
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    pages.set("Kids", Object::Array(kids));

    let catalog_id = merged.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.objects.insert(pages_id, Object::Dictionary(pages));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = merged.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    merged.compress();
    merged.save(&options.output_path)?;

    info!(
        "Merged {} files into {} ({} pages)",
        options.input_paths.len(),
        options.output_path.display(),
        page_ids.len()
    );
    Ok(page_ids.len())
}

fn is_tree_node(object: &Object) -> bool {
    let Object::Dictionary(dict) = object else {
        return false;
    };
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Pages") | Ok(b"Catalog")
    )
}

/// Copy attributes the page inherits from its page tree ancestors onto the page
fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        for key in INHERITABLE {
            if page.has(key) {
                continue;
            }
            if let Some(value) = find_in_ancestors(doc, page, key) {
                inherited.push((key, value));
            }
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }
    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

fn find_in_ancestors(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent_ref = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded walk guards against cyclic Parent links
    for _ in 0..64 {
        let parent = doc.get_dictionary(parent_ref?).ok()?;
        if let Ok(value) = parent.get(key) {
            return Some(value.clone());
        }
        parent_ref = parent.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}
