//! From-scratch rendition of the PLN2 form, used when no template can be
//! filled or overlaid.

mod form;
mod grid;
mod layout;

use std::collections::{HashMap, HashSet};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, TextStr};

use crate::error::Error;
use crate::fonts::{FontEntry, FontRole, FontSet};
use crate::model::ApplicationRecord;

use layout::{FormLayout, Op, PAGE_HEIGHT, PAGE_WIDTH, render_ops};

/// Lay out the whole form for `record` and write it as a new A4 document.
pub(crate) fn synthesize(record: &ApplicationRecord, fonts: &FontSet) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();

    // Phase 1: layout
    let mut layout = FormLayout::new(fonts);
    form::header(&mut layout);
    form::transactions(&mut layout, record);
    form::section_a(&mut layout, record);
    form::section_b(&mut layout, record);
    if record.has_representative {
        form::section_c(&mut layout, record);
    }
    if record.has_vehicle_particulars() {
        form::section_d(&mut layout, record);
    }
    form::section_e(&mut layout, record);
    form::section_f(&mut layout);
    log::debug!("Layout: {} pages at y={:.0}", layout.page_count(), layout.y);
    let pages = layout.into_pages();
    if pages.iter().all(Vec::is_empty) {
        return Err(Error::Synthesize("layout produced no content".into()));
    }
    let t_layout = t0.elapsed();

    // Phase 2: fonts, subset to the glyphs each role actually shows
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };
    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    let used = used_chars(&pages);
    let mut entries: HashMap<FontRole, FontEntry> = HashMap::new();
    for (i, role) in [FontRole::Regular, FontRole::Bold].into_iter().enumerate() {
        let Some(chars) = used.get(&role) else {
            continue;
        };
        let entry = fonts.register(&mut pdf, role, format!("F{}", i + 1), &mut alloc, chars);
        entries.insert(role, entry);
    }
    let t_fonts = t0.elapsed();

    // Phase 3: page content and assembly
    let n = pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, ops) in pages.iter().enumerate() {
        let mut content = Content::new();
        render_ops(&mut content, ops, fonts, &entries);
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);
    pdf.document_info(info_id)
        .title(TextStr("Application for personalised licence number"))
        .subject(TextStr(form::FORM_CODE))
        .producer(TextStr(concat!("pln-form-pdf ", env!("CARGO_PKG_VERSION"))));

    let mut font_pairs: Vec<(&str, Ref)> = entries
        .values()
        .map(|e| (e.pdf_name.as_str(), e.font_ref))
        .collect();
    font_pairs.sort_by_key(|(name, _)| *name);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        let mut fonts = resources.fonts();
        for (name, font_ref) in &font_pairs {
            fonts.pair(Name(name.as_bytes()), *font_ref);
        }
    }

    let bytes = pdf.finish();
    let t_assembly = t0.elapsed();

    log::info!(
        "Synthesize phases: layout={:.1}ms, font_embed={:.1}ms, assembly={:.1}ms ({} pages, {} bytes)",
        t_layout.as_secs_f64() * 1000.0,
        (t_fonts - t_layout).as_secs_f64() * 1000.0,
        (t_assembly - t_fonts).as_secs_f64() * 1000.0,
        n,
        bytes.len(),
    );

    Ok(bytes)
}

/// Characters drawn in each role, across all pages.
fn used_chars(pages: &[Vec<Op>]) -> HashMap<FontRole, HashSet<char>> {
    let mut used: HashMap<FontRole, HashSet<char>> = HashMap::new();
    for op in pages.iter().flatten() {
        if let Op::Text { role, text, .. } = op {
            let set = used.entry(*role).or_default();
            set.insert(' ');
            set.extend(text.chars());
        }
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IdType, PlateChoice, PlateFormat};

    /// Every string shown with `Tj`, one per line, across all pages.
    fn shown_text(bytes: &[u8]) -> String {
        let doc = lopdf::Document::load_mem(bytes).expect("synthesized output parses");
        let mut out = String::new();
        for id in doc.get_pages().values() {
            let raw = doc.get_page_content(*id).expect("page content");
            let content = lopdf::content::Content::decode(&raw).expect("content decodes");
            for op in content.operations.iter().filter(|op| op.operator == "Tj") {
                if let Some(Ok(text)) = op.operands.first().map(lopdf::Object::as_str) {
                    out.push_str(&String::from_utf8_lossy(text));
                    out.push('\n');
                }
            }
        }
        out
    }

    fn owner() -> ApplicationRecord {
        ApplicationRecord {
            id_type: Some(IdType::NamibiaIdDoc),
            id_number: Some("85010112345".into()),
            surname: Some("Nangolo".into()),
            initials: Some("TK".into()),
            plate_format: Some(PlateFormat::LongGerman),
            quantity: Some(2),
            plate_choices: vec![PlateChoice {
                text: "NAM 1".into(),
                meaning: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn every_required_section_is_drawn() {
        let bytes = synthesize(&owner(), &FontSet::standard()).unwrap();
        let all = shown_text(&bytes);
        for heading in ["A. PARTICULARS OF OWNER", "B. PERSONALISED NUMBER PLATE", "E. DECLARATION", "F. FOR OFFICE USE"] {
            assert!(all.contains(heading), "missing {heading}");
        }
        assert!(!all.contains("C. APPLICANT"), "representative section without a representative");
        assert!(!all.contains("D. PARTICULARS OF VEHICLE"));
    }

    #[test]
    fn optional_sections_follow_the_record() {
        let mut record = owner();
        record.has_representative = true;
        record.representative_surname = Some("Shikongo".into());
        record.chassis_number = Some("WVWZZZ1JZXW000001".into());
        let bytes = synthesize(&record, &FontSet::standard()).unwrap();
        let all = shown_text(&bytes);
        assert!(all.contains("C. APPLICANT"));
        assert!(all.contains("D. PARTICULARS OF VEHICLE"));
    }

    #[test]
    fn pages_are_a4_with_both_fonts() {
        let bytes = synthesize(&owner(), &FontSet::standard()).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert!(!pages.is_empty());
        for id in pages.values() {
            let page = doc.get_dictionary(*id).unwrap();
            let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
            let width = media[2].as_float().unwrap();
            assert!((width - PAGE_WIDTH).abs() < 0.01);
            let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
            let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
            assert!(fonts.has(b"F1"));
            assert!(fonts.has(b"F2"));
        }
    }

    #[test]
    fn used_chars_are_split_by_role() {
        let pages = vec![vec![
            Op::Text {
                role: FontRole::Bold,
                size: 10.0,
                x: 0.0,
                top: 0.0,
                text: "AB".into(),
            },
            Op::Rect {
                x: 0.0,
                top: 0.0,
                width: 1.0,
                height: 1.0,
            },
        ]];
        let used = used_chars(&pages);
        assert_eq!(used[&FontRole::Bold], HashSet::from(['A', 'B', ' ']));
        assert!(!used.contains_key(&FontRole::Regular));
    }
}
