//! Splitting a multi-page PDF into independent single-page PDFs with lopdf.
//!
//! Pages are copied object-by-object (the page dictionary plus everything it
//! references), never re-rendered.

use std::collections::{BTreeMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, trace, warn};

use super::{PageDocument, Result};
use crate::error::{PageCopyError, PdfError};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A leaf of the page tree.
#[derive(Debug, Clone)]
struct PageSlot {
    object_id: ObjectId,
    /// Inheritable attributes collected from ancestor `Pages` nodes.
    inherited: Dictionary,
}

/// A parsed multi-page PDF, consumed by [`PageSplitter`].
pub struct SourceDocument {
    document: Document,
    slots: Vec<PageSlot>,
    layout: TargetLayout,
}

impl SourceDocument {
    /// Parse a PDF, trying the empty password on encrypted files.
    pub fn load(data: &[u8]) -> Result<Self> {
        Self::load_with(data, true)
    }

    /// Parse a PDF.
    ///
    /// Fails with [`PdfError::MalformedDocument`] when the bytes are not a PDF or the
    /// page tree root is unreadable.
    pub fn load_with(data: &[u8], decrypt_empty_password: bool) -> Result<Self> {
        let mut document =
            Document::load_mem(data).map_err(|e| PdfError::MalformedDocument(e.to_string()))?;

        if document.is_encrypted() {
            if !decrypt_empty_password || document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let slots = page_slots(&document)?;
        if slots.is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF {} with {} pages", document.version, slots.len());
        let layout = TargetLayout::for_source(&document);
        Ok(Self {
            document,
            slots,
            layout,
        })
    }

    pub fn page_count(&self) -> usize {
        self.slots.len()
    }

    /// PDF version from the file header.
    pub fn version(&self) -> &str {
        &self.document.version
    }
}

/// Copies each page of a [`SourceDocument`] into its own PDF.
#[derive(Debug, Clone)]
pub struct PageSplitter {
    workers: usize,
}

impl PageSplitter {
    /// Create a splitter that copies pages on the calling thread.
    pub fn new() -> Self {
        Self { workers: 1 }
    }

    /// Set the number of threads used to copy pages.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Split `source` into single-page documents.
    ///
    /// The output has exactly one entry per page, in page order. A page that cannot
    /// be isolated yields an error in its slot without affecting the others.
    pub fn split(
        &self,
        source: &SourceDocument,
    ) -> Vec<std::result::Result<PageDocument, PageCopyError>> {
        let objects = &source.document.objects;
        let layout = &source.layout;
        let slots: Vec<(usize, &PageSlot)> = source.slots.iter().enumerate().collect();

        let results: Vec<std::result::Result<PageDocument, PageCopyError>> = if self.workers == 1 || slots.len() < 2 {
            slots
                .iter()
                .map(|(index, slot)| copy_page(objects, layout, slot, *index))
                .collect()
        } else {
            let chunk_size = slots.len().div_ceil(self.workers);
            std::thread::scope(|scope| {
                let handles: Vec<_> = slots
                    .chunks(chunk_size)
                    .map(|chunk| {
                        scope.spawn(move || {
                            chunk
                                .iter()
                                .map(|(index, slot)| copy_page(objects, layout, slot, *index))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .flat_map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                    })
                    .collect()
            })
        };

        for result in &results {
            if let Err(e) = result {
                warn!("{}", e);
            }
        }

        results
    }

    /// Copy a single page out of `source`.
    ///
    /// Produces the same document as the matching slot of [`PageSplitter::split`],
    /// without materializing the other pages.
    pub fn page(
        &self,
        source: &SourceDocument,
        page_index: usize,
    ) -> std::result::Result<PageDocument, PageCopyError> {
        let slot = source.slots.get(page_index).ok_or_else(|| {
            PageCopyError::new(
                page_index,
                format!("source has only {} pages", source.page_count()),
            )
        })?;

        copy_page(&source.document.objects, &source.layout, slot, page_index)
            .inspect_err(|e| warn!("{}", e))
    }
}

impl Default for PageSplitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Object ids and version shared by every page copied from one source.
#[derive(Debug, Clone)]
struct TargetLayout {
    version: String,
    pages_id: ObjectId,
    catalog_id: ObjectId,
}

impl TargetLayout {
    fn for_source(doc: &Document) -> Self {
        let highest = doc
            .objects
            .keys()
            .map(|id| id.0)
            .max()
            .unwrap_or(0)
            .max(doc.max_id);

        Self {
            version: doc.version.clone(),
            pages_id: (highest + 1, 0),
            catalog_id: (highest + 2, 0),
        }
    }
}

/// Walk `/Root /Pages` and collect the leaves in order.
fn page_slots(doc: &Document) -> Result<Vec<PageSlot>> {
    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| PdfError::MalformedDocument(format!("missing document catalog: {}", e)))?;
    let pages_id = doc
        .get_dictionary(root_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| PdfError::MalformedDocument(format!("missing page tree: {}", e)))?;

    let mut slots = Vec::new();
    let mut visited = HashSet::new();
    collect_slots(doc, pages_id, &Dictionary::new(), &mut visited, &mut slots);
    Ok(slots)
}

fn collect_slots(
    doc: &Document,
    node_id: ObjectId,
    inherited: &Dictionary,
    visited: &mut HashSet<ObjectId>,
    slots: &mut Vec<PageSlot>,
) {
    if !visited.insert(node_id) {
        warn!("Page tree revisits object {} {} R, skipping", node_id.0, node_id.1);
        return;
    }

    // Unreadable kids still take a slot so the failure surfaces for that page.
    let node = match doc.get_dictionary(node_id) {
        Ok(node) if is_pages_node(node) => node,
        _ => {
            slots.push(PageSlot {
                object_id: node_id,
                inherited: inherited.clone(),
            });
            return;
        }
    };

    let mut inherited = inherited.clone();
    for key in INHERITABLE {
        if let Ok(value) = node.get(key) {
            inherited.set(key.to_vec(), value.clone());
        }
    }

    let kids = match node.get(b"Kids").and_then(Object::as_array) {
        Ok(kids) => kids,
        Err(e) => {
            warn!("Pages node {} {} R has no kids: {}", node_id.0, node_id.1, e);
            return;
        }
    };

    for kid in kids {
        match kid.as_reference() {
            Ok(kid_id) => collect_slots(doc, kid_id, &inherited, visited, slots),
            Err(_) => warn!("Ignoring direct object in Kids of {} {} R", node_id.0, node_id.1),
        }
    }
}

fn is_pages_node(dict: &Dictionary) -> bool {
    match dict.get(b"Type").and_then(Object::as_name) {
        Ok(name) => name == b"Pages",
        Err(_) => dict.has(b"Kids"),
    }
}

fn is_page(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Type").and_then(Object::as_name), Ok(name) if name == b"Page")
}

/// Copy one page and its object graph into a fresh single-page document.
fn copy_page(
    objects: &BTreeMap<ObjectId, Object>,
    layout: &TargetLayout,
    slot: &PageSlot,
    page_index: usize,
) -> std::result::Result<PageDocument, PageCopyError> {
    let (id, generation) = slot.object_id;
    let mut page = objects
        .get(&slot.object_id)
        .ok_or_else(|| PageCopyError::new(page_index, format!("page object {} {} R is missing", id, generation)))?
        .as_dict()
        .map_err(|_| PageCopyError::new(page_index, format!("page object {} {} R is not a dictionary", id, generation)))?
        .clone();

    page.remove(b"Parent");
    for (key, value) in slot.inherited.iter() {
        if !page.has(key) {
            page.set(key.clone(), value.clone());
        }
    }

    if let Some((id, generation)) = missing_contents(&page, objects) {
        return Err(PageCopyError::new(
            page_index,
            format!("content stream {} {} R is missing", id, generation),
        ));
    }

    let mut target = Document::with_version(layout.version.clone());

    let mut pending = Vec::new();
    collect_references(&page, &mut pending);
    let mut copied = HashSet::from([slot.object_id]);

    while let Some(ref_id) = pending.pop() {
        if !copied.insert(ref_id) {
            continue;
        }
        // A reference to a missing object is the null object.
        let Some(mut object) = objects.get(&ref_id).cloned() else {
            debug!(
                "Page {}: {} {} R is missing, copied as null",
                page_index + 1,
                ref_id.0,
                ref_id.1
            );
            target.objects.insert(ref_id, Object::Null);
            continue;
        };

        // Other pages reached through links keep their content but leave the tree.
        if let Object::Dictionary(dict) = &mut object {
            if is_page(dict) {
                dict.remove(b"Parent");
            }
        }

        match &object {
            Object::Dictionary(dict) => collect_references(dict, &mut pending),
            Object::Stream(stream) => collect_references(&stream.dict, &mut pending),
            Object::Array(items) => items.iter().for_each(|item| collect_object_references(item, &mut pending)),
            Object::Reference(inner) => pending.push(*inner),
            _ => {}
        }
        target.objects.insert(ref_id, object);
    }

    trace!("Page {} pulls {} objects", page_index + 1, copied.len());

    page.set("Parent", layout.pages_id);
    target.objects.insert(slot.object_id, Object::Dictionary(page));
    target.objects.insert(
        layout.pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(slot.object_id)],
            "Count" => 1i64,
        }),
    );
    target.objects.insert(
        layout.catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => layout.pages_id,
        }),
    );
    target.trailer.set("Root", layout.catalog_id);
    target.max_id = layout.catalog_id.0;

    let mut bytes = Vec::new();
    target
        .save_to(&mut bytes)
        .map_err(|e| PageCopyError::new(page_index, format!("failed to serialize page: {}", e)))?;

    debug!("Copied page {} ({} bytes)", page_index + 1, bytes.len());
    Ok(PageDocument { bytes, page_index })
}

/// First `/Contents` reference of `page` that points nowhere.
fn missing_contents(
    page: &Dictionary,
    objects: &BTreeMap<ObjectId, Object>,
) -> Option<ObjectId> {
    let refs: Vec<ObjectId> = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![*id],
        Ok(Object::Array(items)) => items.iter().filter_map(|item| item.as_reference().ok()).collect(),
        _ => Vec::new(),
    };
    refs.into_iter().find(|id| !objects.contains_key(id))
}

fn collect_references(dict: &Dictionary, out: &mut Vec<ObjectId>) {
    let skip_parent = is_page(dict) || is_pages_node(dict);
    for (key, value) in dict.iter() {
        if skip_parent && key.as_slice() == b"Parent" {
            continue;
        }
        collect_object_references(value, out);
    }
}

fn collect_object_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_object_references(item, out)),
        Object::Dictionary(dict) => collect_references(dict, out),
        Object::Stream(stream) => collect_references(&stream.dict, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;

    /// Build a PDF whose pages each show one line of text. `None` makes the page's
    /// content stream point at an object that does not exist.
    fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id: ObjectId = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for text in pages {
            let contents: Object = match text {
                Some(text) => {
                    let content = format!("BT /F1 10 Tf 50 700 Td ({}) Tj ET", text);
                    doc.add_object(Stream::new(Dictionary::new(), content.into_bytes())).into()
                }
                None => Object::Reference((9_999, 0)),
            };
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => contents,
            });
            kids.push(Object::from(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages.len() as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = SourceDocument::load(b"not a pdf at all").err().unwrap();
        assert!(matches!(err, PdfError::MalformedDocument(_)));
    }

    #[test]
    fn test_split_preserves_page_count_and_order() {
        let data = build_pdf(&[Some("one"), Some("two"), Some("three")]);
        let source = SourceDocument::load(&data).unwrap();
        assert_eq!(source.page_count(), 3);

        let pages = PageSplitter::new().split(&source);
        assert_eq!(pages.len(), 3);

        for (index, page) in pages.iter().enumerate() {
            let page = page.as_ref().unwrap();
            assert_eq!(page.page_index, index);

            let copy = Document::load_mem(&page.bytes).unwrap();
            assert_eq!(copy.get_pages().len(), 1);
        }
    }

    #[test]
    fn test_split_pushes_inherited_attributes_down() {
        let data = build_pdf(&[Some("only")]);
        let source = SourceDocument::load(&data).unwrap();
        let page = PageSplitter::new().split(&source).remove(0).unwrap();

        let copy = Document::load_mem(&page.bytes).unwrap();
        let page_id = *copy.get_pages().get(&1).unwrap();
        let dict = copy.get_dictionary(page_id).unwrap();
        assert!(dict.has(b"MediaBox"));
        assert!(dict.has(b"Resources"));
    }

    #[test]
    fn test_corrupt_page_fails_alone() {
        let data = build_pdf(&[Some("one"), None, Some("three")]);
        let source = SourceDocument::load(&data).unwrap();

        let pages = PageSplitter::new().with_workers(2).split(&source);
        assert_eq!(pages.len(), 3);
        assert!(pages[0].is_ok());
        assert_eq!(pages[1].as_ref().unwrap_err().page_index, 1);
        assert_eq!(pages[2].as_ref().unwrap().page_index, 2);
    }

    #[test]
    fn test_parallel_split_matches_sequential() {
        let data = build_pdf(&[Some("a"), Some("b"), Some("c"), Some("d"), Some("e")]);
        let source = SourceDocument::load(&data).unwrap();

        let sequential = PageSplitter::new().split(&source);
        let parallel = PageSplitter::new().with_workers(3).split(&source);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_dangling_annotation_does_not_fail_the_page() {
        let mut doc = Document::load_mem(&build_pdf(&[Some("one"), Some("two")])).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Annots", vec![Object::Reference((777, 0))]);
        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();

        let source = SourceDocument::load(&data).unwrap();
        let pages = PageSplitter::new().split(&source);
        assert_eq!(pages.len(), 2);

        let copy = Document::load_mem(&pages[0].as_ref().unwrap().bytes).unwrap();
        assert_eq!(copy.get_pages().len(), 1);
        assert!(pages[1].is_ok());
    }

    #[test]
    fn test_missing_content_stream_in_array_fails_the_page() {
        let mut doc = Document::load_mem(&build_pdf(&[Some("one")])).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let dict = doc.get_dictionary_mut(page_id).unwrap();
        let first = dict.get(b"Contents").unwrap().clone();
        dict.set("Contents", vec![first, Object::Reference((888, 0))]);
        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();

        let source = SourceDocument::load(&data).unwrap();
        let err = PageSplitter::new().page(&source, 0).unwrap_err();
        assert!(err.to_string().contains("888 0 R"));
    }

    #[test]
    fn test_single_page_copy_matches_split() {
        let data = build_pdf(&[Some("a"), None, Some("c")]);
        let source = SourceDocument::load(&data).unwrap();
        let splitter = PageSplitter::new();

        let split = splitter.split(&source);
        for (index, expected) in split.iter().enumerate() {
            assert_eq!(&splitter.page(&source, index), expected);
        }

        let err = splitter.page(&source, 3).unwrap_err();
        assert_eq!(err.page_index, 3);
    }
}
