use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::Error;

/// /Resources and friends may be inherited through the page tree.
const MAX_TREE_DEPTH: usize = 32;

/// Resources in effect for `page_id`, as an owned dictionary. Walks up the
/// /Parent chain when the page does not carry its own.
pub(super) fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, Error> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(node_id)?;
        match node.get(b"Resources") {
            Ok(Object::Dictionary(d)) => return Ok(d.clone()),
            Ok(Object::Reference(id)) => return Ok(doc.get_dictionary(*id)?.clone()),
            _ => {}
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => node_id = parent,
            Err(_) => break,
        }
    }
    Ok(Dictionary::new())
}

/// Give the page its own copy of `resources`. Shared or inherited resource
/// dictionaries stay untouched, so other pages are unaffected.
pub(super) fn set_resources(
    doc: &mut Document,
    page_id: ObjectId,
    resources: Dictionary,
) -> Result<(), Error> {
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Draw `overlay` on top of the page's existing content.
///
/// The existing streams are bracketed by `q`/`Q` so whatever graphics state
/// the template leaves behind (CTM, colours, clipping) does not apply to the
/// overlay.
pub(super) fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: &[u8],
) -> Result<(), Error> {
    let existing: Vec<Object> = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(arr) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Stream(_)) => {
            return Err(Error::Template("page /Contents is an inline stream".into()));
        }
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        let open = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        contents.push(Object::Reference(open));
        contents.extend(existing);
        let close = doc.add_object(Stream::new(dictionary! {}, b"Q\n".to_vec()));
        contents.push(Object::Reference(close));
    }

    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(overlay, 6);
    let mut stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, compressed);
    stream.allows_compression = false;
    let overlay_id = doc.add_object(stream);
    contents.push(Object::Reference(overlay_id));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}
