use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pdf_writer::{Content, Name, Str};

use crate::error::Error;
use crate::fonts::to_winansi_bytes;
use crate::positions::FieldPosition;
use crate::template::{resolve, resolve_dict};

const CHECKBOX_SIZE: f32 = 12.0;
const BACKGROUND_OPACITY: f32 = 0.85;
const MIN_BACKGROUND_WIDTH: f32 = 40.0;

/// A single line of text ready to draw. The only constructor collapses line
/// breaks and whitespace runs, so a run is always one text-show operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextRun(String);

impl TextRun {
    /// `None` when nothing visible is left after normalisation.
    pub fn new(raw: &str) -> Option<Self> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        (!collapsed.is_empty()).then_some(TextRun(collapsed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawReport {
    pub drawn: usize,
    pub skipped: usize,
}

impl DrawReport {
    fn record(&mut self, drawn: bool) -> bool {
        if drawn {
            self.drawn += 1;
        } else {
            self.skipped += 1;
        }
        drawn
    }
}

/// Resource names the overlay draws with on one page.
#[derive(Clone, Debug)]
struct PageFonts {
    regular: String,
    bold: String,
    /// Absent when falling back to a font the page already had.
    opacity_state: Option<String>,
}

struct PageCanvas {
    id: ObjectId,
    origin: (f32, f32),
    width: f32,
    height: f32,
    content: Option<Content>,
    fonts: Option<PageFonts>,
}

/// The pages of one loaded template, drawn on in top-left page coordinates.
/// Pages are only touched (rotation reset, fonts registered, content
/// appended) once something is drawn on them.
pub struct DocumentCanvas {
    doc: Document,
    pages: Vec<PageCanvas>,
    report: DrawReport,
}

impl DocumentCanvas {
    pub fn load(bytes: &[u8]) -> Result<Self, Error> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| Error::OverlayRender(format!("template unreadable: {e}")))?;
        let mut pages = Vec::new();
        for (_, id) in doc.get_pages() {
            let [x0, y0, x1, y1] = media_box(&doc, id).ok_or_else(|| {
                Error::OverlayRender(format!("page {} {} has no usable MediaBox", id.0, id.1))
            })?;
            pages.push(PageCanvas {
                id,
                origin: (x0.min(x1), y0.min(y1)),
                width: (x1 - x0).abs(),
                height: (y1 - y0).abs(),
                content: None,
                fonts: None,
            });
        }
        if pages.is_empty() {
            return Err(Error::OverlayRender("template has no pages".into()));
        }
        Ok(Self {
            doc,
            pages,
            report: DrawReport::default(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_size(&self, page: usize) -> Option<(f32, f32)> {
        self.pages.get(page).map(|p| (p.width, p.height))
    }

    pub fn report(&self) -> DrawReport {
        self.report
    }

    /// Draw `run` with its baseline at `pos`. Returns whether it was drawn;
    /// positions off the page are logged and skipped.
    pub fn draw_text(
        &mut self,
        run: &TextRun,
        pos: FieldPosition,
        size_override: Option<f32>,
    ) -> Result<bool, Error> {
        let size = size_override.unwrap_or(pos.font_size);
        let Some((x, y)) = self.locate(pos, "Text")? else {
            return Ok(self.report.record(false));
        };
        let page = &mut self.pages[pos.page];
        let (ox, oy) = page.origin;
        let Some(fonts) = page.fonts.clone() else {
            return Err(Error::OverlayRender("page fonts not prepared".into()));
        };
        let width = (run.char_count() as f32 * size * 0.5).max(MIN_BACKGROUND_WIDTH);
        let content = page.content.get_or_insert_with(Content::new);

        content.save_state();
        if let Some(gs) = &fonts.opacity_state {
            content.set_parameters(Name(gs.as_bytes()));
        }
        content.set_fill_gray(1.0);
        content
            .rect(ox + x - 1.0, oy + y - size - 1.0, width + 2.0, size + 2.0)
            .fill_nonzero();
        content.restore_state();

        content.set_fill_gray(0.0);
        content.begin_text();
        content.set_font(Name(fonts.regular.as_bytes()), size);
        content.set_text_matrix([1.0, 0.0, 0.0, 1.0, ox + x, oy + y]);
        content.show(Str(&to_winansi_bytes(run.as_str())));
        content.end_text();

        log::debug!(
            "Drew {:?} at ({}, {}) -> ({x}, {y}), size {size}",
            truncate(run.as_str(), 30),
            pos.x,
            pos.y
        );
        Ok(self.report.record(true))
    }

    /// Bold "X" with its baseline at `pos`, no background.
    pub fn draw_checkbox(&mut self, pos: FieldPosition) -> Result<bool, Error> {
        let Some((x, y)) = self.locate(pos, "Checkbox")? else {
            return Ok(self.report.record(false));
        };
        let page = &mut self.pages[pos.page];
        let (ox, oy) = page.origin;
        let Some(fonts) = page.fonts.clone() else {
            return Err(Error::OverlayRender("page fonts not prepared".into()));
        };
        let content = page.content.get_or_insert_with(Content::new);
        content.set_fill_gray(0.0);
        content.begin_text();
        content.set_font(Name(fonts.bold.as_bytes()), CHECKBOX_SIZE);
        content.set_text_matrix([1.0, 0.0, 0.0, 1.0, ox + x, oy + y]);
        content.show(Str(b"X"));
        content.end_text();
        Ok(self.report.record(true))
    }

    /// Canvas coordinates of `pos`, or `None` when it falls off its page.
    /// Prepares the page on first use.
    fn locate(&mut self, pos: FieldPosition, what: &str) -> Result<Option<(f32, f32)>, Error> {
        let Some(page) = self.pages.get(pos.page) else {
            log::warn!(
                "{what} targets page {} but template has {} pages, skipped",
                pos.page,
                self.pages.len()
            );
            return Ok(None);
        };
        let (width, height) = (page.width, page.height);
        let canvas_y = height - pos.y;
        if !(0.0..=width).contains(&pos.x) || !(0.0..=height).contains(&canvas_y) {
            log::warn!(
                "{what} coordinates out of bounds: ({}, {}) -> ({}, {canvas_y}), page size {width}x{height}",
                pos.x,
                pos.y,
                pos.x
            );
            return Ok(None);
        }
        self.prepare_page(pos.page)?;
        Ok(Some((pos.x, canvas_y)))
    }

    fn prepare_page(&mut self, index: usize) -> Result<(), Error> {
        if self.pages[index].fonts.is_some() {
            return Ok(());
        }
        let id = self.pages[index].id;
        if let Ok(page) = self.doc.get_object_mut(id).and_then(Object::as_dict_mut) {
            page.set("Rotate", 0);
        }
        let fonts = match register_overlay_fonts(&mut self.doc, id) {
            Ok(fonts) => fonts,
            Err(e) => {
                log::warn!("Could not register overlay fonts on page {index}: {e}");
                let name = first_page_font(&self.doc, id).ok_or_else(|| {
                    Error::OverlayRender(format!("page {index} has no usable font"))
                })?;
                log::warn!("Falling back to the page's own font /{name}");
                PageFonts {
                    regular: name.clone(),
                    bold: name,
                    opacity_state: None,
                }
            }
        };
        self.pages[index].fonts = Some(fonts);
        Ok(())
    }

    /// Append every page's overlay to its content and serialise the document.
    pub fn finish(mut self) -> Result<Vec<u8>, Error> {
        for page in std::mem::take(&mut self.pages) {
            let Some(content) = page.content else {
                continue;
            };
            append_overlay(&mut self.doc, page.id, content)?;
        }
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| Error::OverlayRender(format!("save: {e}")))?;
        Ok(out)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Inheritable page attribute lookup through `/Parent`.
fn inherited<'a>(doc: &'a Document, page: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page).ok()?;
    for _ in 0..32 {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        node = node.get(b"Parent").ok().and_then(|p| resolve_dict(doc, p))?;
    }
    None
}

fn media_box(doc: &Document, page: ObjectId) -> Option<[f32; 4]> {
    let Object::Array(values) = inherited(doc, page, b"MediaBox")? else {
        return None;
    };
    let nums: Vec<f32> = values
        .iter()
        .filter_map(|v| number(resolve(doc, v)))
        .collect();
    match nums.as_slice() {
        &[x0, y0, x1, y1] if x1 != x0 && y1 != y0 => Some([x0, y0, x1, y1]),
        _ => None,
    }
}

fn unused_name(existing: &Dictionary, base: &str) -> String {
    let mut n = 1;
    loop {
        let candidate = format!("{base}{n}");
        if !existing.has(candidate.as_bytes()) {
            return candidate;
        }
        n += 1;
    }
}

fn standard_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Resolved copy of a resource sub-dictionary, empty when absent.
fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Result<Dictionary, Error> {
    match resources.get(key) {
        Err(_) => Ok(Dictionary::new()),
        Ok(obj) => resolve_dict(doc, obj).cloned().ok_or_else(|| {
            Error::OverlayRender(format!(
                "/{} is not a dictionary",
                String::from_utf8_lossy(key)
            ))
        }),
    }
}

/// Give the page a direct `/Resources` holding Helvetica, Helvetica-Bold and
/// a translucent graphics state next to whatever it already declared.
fn register_overlay_fonts(doc: &mut Document, page: ObjectId) -> Result<PageFonts, Error> {
    let mut resources = match inherited(doc, page, b"Resources") {
        None => Dictionary::new(),
        Some(Object::Dictionary(d)) => d.clone(),
        Some(_) => return Err(Error::OverlayRender("/Resources is not a dictionary".into())),
    };
    let mut fonts = sub_dictionary(doc, &resources, b"Font")?;
    let mut states = sub_dictionary(doc, &resources, b"ExtGState")?;

    let regular = unused_name(&fonts, "PlnF");
    fonts.set(regular.as_str(), doc.add_object(standard_font("Helvetica")));
    let bold = unused_name(&fonts, "PlnF");
    fonts.set(bold.as_str(), doc.add_object(standard_font("Helvetica-Bold")));

    let opacity_state = unused_name(&states, "PlnGS");
    let gs = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(BACKGROUND_OPACITY),
        "CA" => Object::Real(BACKGROUND_OPACITY),
    });
    states.set(opacity_state.as_str(), gs);

    resources.set("Font", fonts);
    resources.set("ExtGState", states);
    doc.get_object_mut(page)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::OverlayRender(format!("page not writable: {e}")))?
        .set("Resources", resources);

    Ok(PageFonts {
        regular,
        bold,
        opacity_state: Some(opacity_state),
    })
}

fn first_page_font(doc: &Document, page: ObjectId) -> Option<String> {
    let resources = match inherited(doc, page, b"Resources")? {
        Object::Dictionary(d) => d,
        _ => return None,
    };
    let fonts = resolve_dict(doc, resources.get(b"Font").ok()?)?;
    fonts
        .iter()
        .next()
        .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
}

fn compressed_stream(raw: &[u8]) -> Stream {
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw, 6);
    Stream::new(dictionary! { "Filter" => "FlateDecode" }, compressed)
}

/// Wrap the existing page content in `q`/`Q` so its graphics state cannot
/// leak into the overlay, then append the overlay stream.
fn append_overlay(doc: &mut Document, page: ObjectId, content: Content) -> Result<(), Error> {
    let existing: Vec<Object> = {
        let dict = doc
            .get_dictionary(page)
            .map_err(|e| Error::OverlayRender(format!("page lost: {e}")))?;
        match dict.get(b"Contents") {
            Err(_) => Vec::new(),
            Ok(Object::Array(items)) => items.clone(),
            Ok(obj @ Object::Reference(_)) => match resolve(doc, obj) {
                Object::Array(items) => items.clone(),
                _ => vec![obj.clone()],
            },
            Ok(_) => {
                return Err(Error::OverlayRender("page /Contents is malformed".into()));
            }
        }
    };

    // Leading newline: readers join content streams without a separator.
    let mut raw = b"\nQ\n".to_vec();
    raw.extend_from_slice(content.finish().as_slice());
    let prefix = doc.add_object(compressed_stream(b"q\n"));
    let overlay = doc.add_object(compressed_stream(&raw));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(prefix));
    contents.extend(existing);
    contents.push(Object::Reference(overlay));

    doc.get_object_mut(page)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::OverlayRender(format!("page not writable: {e}")))?
        .set("Contents", contents);
    Ok(())
}
