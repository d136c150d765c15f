use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::config::FONTS_ENV;

/// Ascender of Helvetica in 1000-units, used for baseline placement of the
/// standard fonts.
const HELVETICA_ASCENDER: f32 = 718.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum FontRole {
    Regular,
    Bold,
}

impl FontRole {
    pub(crate) fn is_bold(self) -> bool {
        self == FontRole::Bold
    }

    fn standard_name(self) -> &'static [u8] {
        match self {
            FontRole::Regular => b"Helvetica",
            FontRole::Bold => b"Helvetica-Bold",
        }
    }
}

/// A font registered in the output document.
pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    /// Present for embedded CID fonts, whose text is written as glyph ids.
    char_to_gid: Option<HashMap<char, u16>>,
}

impl FontEntry {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

/// (lowercase family name, bold) -> (file path, face index within TTC)
type FontLookup = HashMap<(String, bool), (PathBuf, u32)>;

/// Index of the fonts installed on this machine, built once and then only
/// read. Owned by whoever embeds fonts; there is no process-wide copy.
#[derive(Debug, Default)]
pub struct FontLibrary {
    index: FontLookup,
}

impl FontLibrary {
    /// Scan `extra_dirs`, then `$PLN_FORM_FONTS`, then the platform font
    /// directories.
    pub fn scan(extra_dirs: &[PathBuf]) -> Self {
        let mut dirs = extra_dirs.to_vec();
        dirs.extend(font_directories());
        Self {
            index: scan_font_dirs(dirs),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Falls back to the regular face when no bold one is installed.
    fn find(&self, family: &str, bold: bool) -> Option<&(PathBuf, u32)> {
        let key = family.to_lowercase();
        self.index
            .get(&(key.clone(), bold))
            .or_else(|| bold.then(|| self.index.get(&(key, false))).flatten())
    }
}

fn font_family_name(face: &Face) -> Option<String> {
    // ID 1 (Family) separates "Arial Narrow" from "Arial"; ID 16 would merge them.
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    if let Ok(val) = std::env::var(FONTS_ENV) {
        let sep = if cfg!(windows) { ';' } else { ':' };
        dirs.extend(
            val.split(sep)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        );
    }

    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Library/Fonts".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend(["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push("C:\\Windows\\Fonts".into());
        }
    }

    dirs
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf" | "ttc")
    )
}

fn is_font_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ttc"))
}

/// Walk `dirs` recursively. Earlier directories win on duplicate families.
fn scan_font_dirs(dirs: Vec<PathBuf>) -> FontLookup {
    let t0 = std::time::Instant::now();
    let mut index = FontLookup::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut files_parsed = 0u32;

    let mut stack: Vec<PathBuf> = dirs.into_iter().rev().collect();
    while let Some(dir) = stack.pop() {
        if !visited.insert(dir.clone()) {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                subdirs.push(path);
                continue;
            }
            if !is_font_file(&path) {
                continue;
            }
            let Ok(file) = std::fs::File::open(&path) else {
                continue;
            };
            let Ok(data) = (unsafe { Mmap::map(&file) }) else {
                continue;
            };
            files_parsed += 1;
            let face_count = if is_font_collection(&path) {
                ttf_parser::fonts_in_collection(&data).unwrap_or(1)
            } else {
                1
            };
            for face_index in 0..face_count {
                let Ok(face) = Face::parse(&data, face_index) else {
                    continue;
                };
                if let Some(family) = font_family_name(&face) {
                    index
                        .entry((family.to_lowercase(), face.is_bold()))
                        .or_insert((path.clone(), face_index));
                }
            }
        }
        stack.extend(subdirs.into_iter().rev());
    }

    log::info!(
        "Font scan: {:.1}ms, {} files parsed → {} entries",
        t0.elapsed().as_secs_f64() * 1000.0,
        files_parsed,
        index.len(),
    );
    index
}

/// Raw bytes of one installed face.
struct FaceData {
    family: String,
    data: Vec<u8>,
    face_index: u32,
}

impl FaceData {
    fn load(library: &FontLibrary, family: &str, bold: bool) -> Option<Self> {
        let (path, face_index) = library.find(family, bold)?;
        let data = std::fs::read(path)
            .map_err(|e| log::warn!("Cannot read font {}: {e}", path.display()))
            .ok()?;
        // Reject files that no longer parse before committing to them.
        Face::parse(&data, *face_index).ok()?;
        Some(Self {
            family: family.to_string(),
            data,
            face_index: *face_index,
        })
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.face_index).ok()
    }
}

/// The regular and bold faces one synthesis run draws with. Either may be
/// missing, in which case the matching standard Helvetica is used.
#[derive(Default)]
pub(crate) struct FontSet {
    regular: Option<FaceData>,
    bold: Option<FaceData>,
}

impl FontSet {
    /// Standard Helvetica pair; needs no font files.
    pub(crate) fn standard() -> Self {
        Self::default()
    }

    pub(crate) fn resolve(library: Option<&FontLibrary>, family: Option<&str>) -> Self {
        let (Some(library), Some(family)) = (library, family) else {
            return Self::standard();
        };
        let regular = FaceData::load(library, family, false);
        if regular.is_none() {
            log::warn!("Font not found: {family}, using Helvetica");
        }
        let bold = FaceData::load(library, family, true);
        Self { regular, bold }
    }

    fn face_data(&self, role: FontRole) -> Option<&FaceData> {
        match role {
            FontRole::Regular => self.regular.as_ref(),
            FontRole::Bold => self.bold.as_ref(),
        }
    }

    /// Width of `text` in points.
    pub(crate) fn text_width(&self, role: FontRole, text: &str, size: f32) -> f32 {
        let per_1000: f32 = match self.face_data(role).and_then(FaceData::face) {
            Some(face) => {
                let units = face.units_per_em() as f32;
                text.chars()
                    .map(|ch| {
                        face.glyph_index(ch)
                            .and_then(|gid| face.glyph_hor_advance(gid))
                            .map(|adv| adv as f32 / units * 1000.0)
                            .unwrap_or(0.0)
                    })
                    .sum()
            }
            None => text
                .chars()
                .map(|ch| standard_char_width(role.is_bold(), ch))
                .sum(),
        };
        per_1000 * size / 1000.0
    }

    /// Distance from the top of a line box to its baseline, in points.
    pub(crate) fn ascent(&self, role: FontRole, size: f32) -> f32 {
        let ratio = self
            .face_data(role)
            .and_then(FaceData::face)
            .map(|face| face.ascender() as f32 / face.units_per_em() as f32)
            .unwrap_or(HELVETICA_ASCENDER / 1000.0);
        ratio * size
    }

    /// Write the font for `role` into `pdf`, subset to `used_chars` when
    /// embedding. Falls back to the standard font if embedding fails.
    pub(crate) fn register(
        &self,
        pdf: &mut Pdf,
        role: FontRole,
        pdf_name: String,
        alloc: &mut impl FnMut() -> Ref,
        used_chars: &HashSet<char>,
    ) -> FontEntry {
        let t0 = std::time::Instant::now();
        let font_ref = alloc();
        let char_to_gid = self.face_data(role).and_then(|face| {
            let map = embed_truetype(pdf, font_ref, face, used_chars, alloc);
            if map.is_none() {
                log::warn!("Embedding {} failed, using Helvetica", face.family);
            }
            map
        });
        if char_to_gid.is_none() {
            pdf.type1_font(font_ref)
                .base_font(Name(role.standard_name()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }
        log::debug!(
            "register_font: {role:?} → {:.1}ms",
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        FontEntry {
            pdf_name,
            font_ref,
            char_to_gid,
        }
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for PDF Str
/// encoding. Characters outside the code page become `?`.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match char_to_winansi(c) {
            0 => b'?',
            b => b,
        })
        .collect()
}

/// Encode UTF-8 text as big-endian 2-byte glyph IDs for CIDFont content streams.
fn encode_as_gids(text: &str, char_to_gid: &HashMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.extend_from_slice(&gid.to_be_bytes());
    }
    out
}

/// Approximate Helvetica / Helvetica-Bold advance widths in 1000-units.
fn standard_char_width(bold: bool, ch: char) -> f32 {
    let regular = match char_to_winansi(ch) {
        0 => 556.0,
        32 => 278.0,                           // space
        33..=47 => 333.0,                      // punctuation
        48..=57 => 556.0,                      // digits
        58..=64 => 333.0,                      // more punctuation
        73 | 74 => 278.0,                      // I J (narrow uppercase)
        77 => 833.0,                           // M (wide)
        87 => 944.0,                           // W
        65..=90 => 667.0,                      // uppercase A-Z (average)
        91..=96 => 333.0,                      // brackets etc.
        102 | 105 | 106 | 108 | 116 => 278.0,  // narrow lowercase: f i j l t
        109 | 119 => 833.0,                    // m w (wide)
        97..=122 => 556.0,                     // lowercase a-z (average)
        _ => 556.0,
    };
    match (bold, ch) {
        (false, _) => regular,
        (true, 'A'..='Z') => regular + 55.0,
        (true, 'a'..='z') => regular + 40.0,
        (true, _) => regular,
    }
}

/// Embed a TrueType/OpenType face as a CIDFont (Type0 composite) with
/// Identity-H encoding, subset to `used_chars`. Returns the char → new glyph
/// id map text must be encoded with.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    font: &FaceData,
    used_chars: &HashSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<HashMap<char, u16>> {
    let face = font.face()?;
    let units = face.units_per_em() as f32;
    let scale = |v: f32| v / units * 1000.0;

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = HashMap::new();
    let mut gid_widths: Vec<(u16, f32)> = Vec::new();
    let mut chars: Vec<char> = used_chars.iter().copied().collect();
    chars.sort_unstable();
    for ch in chars {
        let Some(gid) = face.glyph_index(ch) else {
            continue;
        };
        let new_gid = remapper.remap(gid.0);
        char_to_gid.insert(ch, new_gid);
        let advance = face.glyph_hor_advance(gid).unwrap_or(0) as f32;
        gid_widths.push((new_gid, scale(advance)));
    }
    gid_widths.sort_by_key(|&(gid, _)| gid);
    gid_widths.dedup_by_key(|&mut (gid, _)| gid);

    let subset = subsetter::subset(&font.data, font.face_index, &remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {}: {e}, embedding full font", font.family);
        font.data.clone()
    });

    let descriptor_ref = alloc();
    let data_ref = alloc();
    let cid_font_ref = alloc();
    let tounicode_ref = alloc();

    let data_len = i32::try_from(subset.len()).ok()?;
    pdf.stream(data_ref, &subset)
        .pair(Name(b"Length1"), data_len);

    let ps_name = font.family.replace(' ', "");
    let bb = face.global_bounding_box();
    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(
            scale(bb.x_min as f32),
            scale(bb.y_min as f32),
            scale(bb.x_max as f32),
            scale(bb.y_max as f32),
        ))
        .italic_angle(0.0)
        .ascent(scale(face.ascender() as f32))
        .descent(scale(face.descender() as f32))
        .cap_height(face.capital_height().map_or(700.0, |h| scale(h as f32)))
        .stem_v(80.0)
        .font_file2(data_ref);

    let system_info = pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(system_info);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    for (&ch, &new_gid) in &char_to_gid {
        cmap.pair(new_gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Some(char_to_gid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winansi_replaces_unmappable_chars() {
        assert_eq!(to_winansi_bytes("Café €5"), b"Caf\xe9 \x805".to_vec());
        assert_eq!(to_winansi_bytes("Ω"), b"?".to_vec());
    }

    #[test]
    fn standard_widths_scale_with_size() {
        let fonts = FontSet::standard();
        let w10 = fonts.text_width(FontRole::Regular, "ABC", 10.0);
        let w20 = fonts.text_width(FontRole::Regular, "ABC", 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-3);
        assert!(fonts.text_width(FontRole::Bold, "ABC", 10.0) > w10);
        assert!((fonts.ascent(FontRole::Regular, 10.0) - 7.18).abs() < 1e-3);
    }

    #[test]
    fn unknown_family_falls_back_to_standard() {
        let dir = tempfile::tempdir().expect("tempdir");
        let library = FontLibrary::scan(&[dir.path().to_path_buf()]);
        let fonts = FontSet::resolve(Some(&library), Some("No Such Family 123"));
        assert!(fonts.regular.is_none());
        assert!(fonts.bold.is_none());
    }
}
