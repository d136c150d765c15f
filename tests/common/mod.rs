#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pln_form_pdf::ApplicationRecord;

/// A4 in points, as the printed PLN2 template.
pub const A4: (i64, i64) = (595, 842);

/// Interactive field in a fixture template.
pub enum Field<'a> {
    Text(&'a str),
    Check(&'a str),
}

fn page_tree(doc: &mut Document, width: i64, height: i64) -> (ObjectId, ObjectId) {
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"BT /F1 10 Tf 50 800 Td (PLN2) Tj ET".to_vec(),
    ));
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        }),
    );
    (pages_id, page_id)
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture");
    out
}

/// One-page template without an interactive form, like a scanned and
/// flattened PLN2.
pub fn flat_template() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let (pages_id, _) = page_tree(&mut doc, A4.0, A4.1);
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    save(doc)
}

/// One-page template whose AcroForm holds `fields`, each merged with its
/// widget. Checkboxes get `/Yes` and `/Off` appearances.
pub fn acroform_template(fields: &[Field]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let (pages_id, page_id) = page_tree(&mut doc, A4.0, A4.1);

    let mut field_ids = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let top = 800 - 20 * i as i64;
        let mut dict: Dictionary = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "P" => page_id,
            "Rect" => vec![100.into(), (top - 15).into(), 300.into(), top.into()],
        };
        match field {
            Field::Text(name) => {
                dict.set("FT", "Tx");
                dict.set("T", Object::string_literal(*name));
            }
            Field::Check(name) => {
                let on = doc.add_object(Stream::new(dictionary! {}, b"0 g".to_vec()));
                let off = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
                dict.set("FT", "Btn");
                dict.set("T", Object::string_literal(*name));
                dict.set("AS", Object::Name(b"Off".to_vec()));
                dict.set(
                    "AP",
                    dictionary! { "N" => dictionary! { "Yes" => on, "Off" => off } },
                );
            }
        }
        field_ids.push(doc.add_object(dict));
    }

    if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
        page.set(
            "Annots",
            field_ids.iter().map(|&id| id.into()).collect::<Vec<Object>>(),
        );
    }
    let acroform_id = doc.add_object(dictionary! {
        "Fields" => field_ids.iter().map(|&id| id.into()).collect::<Vec<Object>>(),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    doc.trailer.set("Root", catalog_id);
    save(doc)
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

pub fn record(json: &str) -> ApplicationRecord {
    ApplicationRecord::from_json(json).expect("fixture record parses")
}

/// A text show operation with the text matrix and font size in effect.
#[derive(Clone, Debug, PartialEq)]
pub struct Shown {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

fn operand_f32(obj: &Object) -> Option<f32> {
    if let Ok(v) = obj.as_float() {
        return Some(v);
    }
    obj.as_i64().ok().map(|v| v as f32)
}

/// Every `Tj` on every page, in content order.
pub fn shown(bytes: &[u8]) -> Vec<Shown> {
    let doc = Document::load_mem(bytes).expect("output parses");
    let mut out = Vec::new();
    for page_id in doc.get_pages().values() {
        let raw = doc.get_page_content(*page_id).expect("page content");
        let content = Content::decode(&raw).expect("content decodes");
        let (mut x, mut y, mut size) = (0.0, 0.0, 0.0);
        for op in &content.operations {
            match op.operator.as_str() {
                "Tf" => size = op.operands.get(1).and_then(operand_f32).unwrap_or(0.0),
                "Tm" => {
                    x = op.operands.get(4).and_then(operand_f32).unwrap_or(0.0);
                    y = op.operands.get(5).and_then(operand_f32).unwrap_or(0.0);
                }
                "Tj" => {
                    if let Some(Ok(text)) = op.operands.first().map(Object::as_str) {
                        out.push(Shown {
                            text: String::from_utf8_lossy(text).into_owned(),
                            x,
                            y,
                            size,
                        });
                    }
                }
                _ => {}
            }
        }
    }
    out
}

/// First run showing exactly `text`.
pub fn find<'a>(runs: &'a [Shown], text: &str) -> Option<&'a Shown> {
    runs.iter().find(|r| r.text == text)
}

/// Value of the named terminal field: the text of a text field or the state
/// name of a checkbox.
pub fn field_value(bytes: &[u8], name: &str) -> Option<String> {
    let doc = Document::load_mem(bytes).expect("output parses");
    let root = doc.trailer.get(b"Root").ok()?.as_reference().ok()?;
    let acroform = doc.get_dictionary(root).ok()?.get(b"AcroForm").ok()?;
    let acroform = match acroform {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(d) => d,
        _ => return None,
    };
    for field in acroform.get(b"Fields").ok()?.as_array().ok()? {
        let dict = doc.get_dictionary(field.as_reference().ok()?).ok()?;
        if dict.get(b"T").ok()?.as_str().ok()? == name.as_bytes() {
            return match dict.get(b"V").ok()? {
                Object::String(v, _) => Some(String::from_utf8_lossy(v).into_owned()),
                Object::Name(v) => Some(String::from_utf8_lossy(v).into_owned()),
                _ => None,
            };
        }
    }
    None
}

/// Whether the AcroForm asks viewers to regenerate appearances.
pub fn needs_appearances(bytes: &[u8]) -> bool {
    let Ok(doc) = Document::load_mem(bytes) else {
        return false;
    };
    doc.catalog()
        .ok()
        .and_then(|c| c.get(b"AcroForm").ok())
        .and_then(|a| a.as_reference().ok())
        .and_then(|id| doc.get_dictionary(id).ok())
        .and_then(|a| a.get(b"NeedAppearances").ok())
        .and_then(|v| v.as_bool().ok())
        .unwrap_or(false)
}
