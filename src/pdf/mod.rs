mod field;
mod overlay;

use lopdf::{Document, ObjectId};
use pdf_writer::Content;

use crate::error::Error;
use crate::fonts::FontSet;
use crate::model::{InvoiceRow, display_value, lookup};
use crate::registry::FieldRegistry;

/// A parsed template. Parsed once per batch; every row works on its own clone,
/// so nothing one row stamps can reach another.
#[derive(Clone, Debug)]
pub struct Template {
    document: Document,
    page_count: usize,
}

impl Template {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let document =
            Document::load_mem(bytes).map_err(|e| Error::Template(format!("not a readable PDF: {e}")))?;
        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(Error::Template("document has no pages".into()));
        }
        if page_count > 1 {
            log::warn!("Template has {page_count} pages; only the first one is filled in");
        }
        Ok(Self {
            document,
            page_count,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Fresh, independent copy of the template document.
    fn instantiate(&self) -> Document {
        self.document.clone()
    }
}

fn first_page(doc: &Document) -> Result<ObjectId, Error> {
    doc.get_pages()
        .into_iter()
        .next()
        .map(|(_, id)| id)
        .ok_or_else(|| Error::Template("document has no pages".into()))
}

/// Stamp every registered field of `row` onto page 1 of a fresh template copy
/// and serialize the result.
pub fn compose(
    template: &Template,
    row: &InvoiceRow,
    registry: &FieldRegistry,
    fonts: &FontSet,
) -> Result<Vec<u8>, Error> {
    let mut doc = template.instantiate();
    let page_id = first_page(&doc)?;

    let mut resources = overlay::effective_resources(&doc, page_id)?;
    let page_fonts = fonts.install(&mut doc, &mut resources)?;
    overlay::set_resources(&mut doc, page_id, resources)?;

    let mut content = Content::new();
    for (name, layout) in registry.iter() {
        let value = display_value(lookup(row, name));
        field::render_field(&mut content, &value, layout, &page_fonts, registry.style());
    }
    let raw = content.finish();
    overlay::append_content(&mut doc, page_id, raw.as_slice())?;

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
