use std::collections::HashSet;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::Error;

/// Field trees deeper than this are treated as malformed.
const MAX_FIELD_DEPTH: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Capability {
    pub has_native_fields: bool,
    pub field_count: usize,
}

/// A named leaf of the `/AcroForm /Fields` tree.
#[derive(Clone, Debug)]
pub(crate) struct TerminalField {
    pub(crate) name: String,
    pub(crate) id: ObjectId,
}

/// Report whether the template exposes an interactive form. Unreadable input
/// is logged and reported as having no fields; flattened forms are the normal
/// case, so the caller moves on to the overlay either way.
pub fn detect(bytes: &[u8]) -> Capability {
    let t0 = std::time::Instant::now();
    let fields = load(bytes).and_then(|doc| terminal_fields(&doc));
    let capability = match fields {
        Ok(fields) => Capability {
            has_native_fields: !fields.is_empty(),
            field_count: fields.len(),
        },
        Err(e) => {
            log::warn!("{e}, treating template as flattened");
            Capability::default()
        }
    };
    log::debug!(
        "detect: {} fields in {:.1}ms",
        capability.field_count,
        t0.elapsed().as_secs_f64() * 1000.0
    );
    capability
}

/// Fully qualified names of every terminal form field, in tree order.
pub fn list_form_fields(path: &Path) -> Result<Vec<String>, Error> {
    if !path.is_file() {
        return Err(Error::TemplateNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let doc = load(&bytes)?;
    Ok(terminal_fields(&doc)?.into_iter().map(|f| f.name).collect())
}

fn load(bytes: &[u8]) -> Result<Document, Error> {
    Document::load_mem(bytes).map_err(|e| Error::CapabilityDetection(e.to_string()))
}

pub(crate) fn terminal_fields(doc: &Document) -> Result<Vec<TerminalField>, Error> {
    let catalog = doc
        .catalog()
        .map_err(|e| Error::CapabilityDetection(format!("no catalog: {e}")))?;
    let Some(acroform) = catalog.get(b"AcroForm").ok().and_then(|o| resolve_dict(doc, o)) else {
        return Ok(Vec::new());
    };
    let Some(fields) = acroform.get(b"Fields").ok().and_then(|o| resolve_array(doc, o)) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    let mut visited = HashSet::new();
    for field in fields {
        visit(doc, field, None, 0, &mut visited, &mut out);
    }
    Ok(out)
}

fn visit(
    doc: &Document,
    node: &Object,
    parent_name: Option<&str>,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<TerminalField>,
) {
    if depth > MAX_FIELD_DEPTH {
        log::warn!("AcroForm field tree deeper than {MAX_FIELD_DEPTH}, truncated");
        return;
    }
    // Fields are addressed by object id when filled; inline dictionaries are
    // not valid field nodes.
    let Object::Reference(id) = node else {
        return;
    };
    if !visited.insert(*id) {
        return;
    }
    let Ok(dict) = doc.get_dictionary(*id) else {
        return;
    };

    let partial = dict.get(b"T").ok().and_then(|t| resolve_text(doc, t));
    let name = match (parent_name, partial.as_deref()) {
        (Some(parent), Some(part)) => Some(format!("{parent}.{part}")),
        (None, Some(part)) => Some(part.to_string()),
        (parent, None) => parent.map(str::to_string),
    };

    let kids = dict
        .get(b"Kids")
        .ok()
        .and_then(|k| resolve_array(doc, k))
        .map(Vec::as_slice)
        .unwrap_or_default();
    let named_kids: Vec<&Object> = kids.iter().filter(|k| has_partial_name(doc, k)).collect();

    if named_kids.is_empty() {
        if partial.is_some()
            && let Some(name) = name
        {
            out.push(TerminalField { name, id: *id });
        }
        return;
    }
    for kid in named_kids {
        visit(doc, kid, name.as_deref(), depth + 1, visited, out);
    }
}

fn has_partial_name(doc: &Document, node: &Object) -> bool {
    resolve_dict(doc, node).is_some_and(|d| d.has(b"T"))
}

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    // Reference chains longer than a few hops only occur in broken files.
    for _ in 0..8 {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

pub(crate) fn resolve_array<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Vec<Object>> {
    match resolve(doc, obj) {
        Object::Array(a) => Some(a),
        _ => None,
    }
}

fn resolve_text(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj) {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// PDF text strings are UTF-16BE when they carry a byte order mark, otherwise
/// PDFDocEncoding (treated as Latin-1).
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Inverse of [`decode_text_string`]: Latin-1 when possible, UTF-16BE with a
/// byte order mark otherwise.
pub(crate) fn encode_text_string(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (c as u32) < 0x100) {
        return text.chars().map(|c| c as u8).collect();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_reported_as_flattened() {
        let capability = detect(b"%PDF-1.7\nthis is not a pdf");
        assert_eq!(capability, Capability::default());
    }

    #[test]
    fn missing_template_is_not_found() {
        let err = list_form_fields(Path::new("/definitely/not/here.pdf")).expect_err("missing");
        assert!(matches!(err, Error::TemplateNotFound(_)));
    }

    #[test]
    fn text_strings_round_trip() {
        assert_eq!(encode_text_string("Windhoek"), b"Windhoek".to_vec());
        assert_eq!(decode_text_string(&encode_text_string("Ōshakati")), "Ōshakati");
        assert_eq!(decode_text_string(b"Caf\xe9"), "Café");
    }
}
