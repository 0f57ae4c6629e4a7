use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use ttf_parser::Face;

use crate::error::Error;

/// The two faces every field is drawn with. Built once per batch and passed by
/// reference into every composition.
#[derive(Clone, Debug)]
pub struct FontSet {
    pub regular: FontFace,
    pub bold: FontFace,
}

/// Metrics plus whatever is needed to emit the font objects into a document.
#[derive(Clone, Debug)]
pub struct FontFace {
    base_font: String,
    /// Advance widths in 1000-units for WinAnsi bytes 32..=255.
    widths_1000: Vec<f32>,
    program: Option<FontProgram>,
}

#[derive(Clone, Debug)]
struct FontProgram {
    /// zlib-compressed TrueType data, ready for /FontFile2.
    compressed: Vec<u8>,
    length1: i64,
    bbox: [f32; 4],
    ascent: f32,
    descent: f32,
    cap_height: f32,
    italic_angle: f32,
    flags: i64,
}

/// Resource names of the set inside one page, plus the faces they refer to.
pub(crate) struct PageFonts<'a> {
    pub(crate) regular: (String, &'a FontFace),
    pub(crate) bold: (String, &'a FontFace),
}

impl<'a> PageFonts<'a> {
    pub(crate) fn pick(&self, emphasis: bool) -> (&str, &'a FontFace) {
        let (name, face) = if emphasis { &self.bold } else { &self.regular };
        (name.as_str(), *face)
    }
}

impl Default for FontSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl FontSet {
    /// Helvetica / Helvetica-Bold from the standard 14; nothing is embedded.
    pub fn standard() -> Self {
        Self {
            regular: FontFace::standard("Helvetica", &HELVETICA_ASCII),
            bold: FontFace::standard("Helvetica-Bold", &HELVETICA_BOLD_ASCII),
        }
    }

    /// Embed TrueType/OpenType faces. Without a bold face the regular one is
    /// used for emphasised fields too.
    pub fn from_truetype(regular: &[u8], bold: Option<&[u8]>) -> Result<Self, Error> {
        let regular = FontFace::truetype(regular)?;
        let bold = match bold {
            Some(data) => FontFace::truetype(data)?,
            None => regular.clone(),
        };
        Ok(Self { regular, bold })
    }

    pub fn load(regular: &Path, bold: Option<&Path>) -> Result<Self, Error> {
        let read = |path: &Path| {
            std::fs::read(path).map_err(|e| {
                Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
            })
        };
        let regular_data = read(regular)?;
        let bold_data = bold.map(read).transpose()?;
        Self::from_truetype(&regular_data, bold_data.as_deref())
    }

    /// Add both faces to `doc` and register them in `resources`' /Font
    /// dictionary under names the template does not already use.
    pub(crate) fn install<'a>(
        &'a self,
        doc: &mut Document,
        resources: &mut Dictionary,
    ) -> Result<PageFonts<'a>, Error> {
        let mut fonts = match resources.get(b"Font") {
            Ok(Object::Dictionary(d)) => d.clone(),
            Ok(Object::Reference(id)) => doc.get_dictionary(*id)?.clone(),
            _ => Dictionary::new(),
        };

        let regular_id = self.regular.write(doc)?;
        let regular_name = free_name(&fonts, "StampR");
        fonts.set(regular_name.as_bytes().to_vec(), Object::Reference(regular_id));

        let bold_id = self.bold.write(doc)?;
        let bold_name = free_name(&fonts, "StampB");
        fonts.set(bold_name.as_bytes().to_vec(), Object::Reference(bold_id));

        resources.set("Font", Object::Dictionary(fonts));

        log::debug!(
            "Installed fonts {} as /{} and {} as /{}",
            self.regular.base_font,
            regular_name,
            self.bold.base_font,
            bold_name,
        );

        Ok(PageFonts {
            regular: (regular_name, &self.regular),
            bold: (bold_name, &self.bold),
        })
    }
}

fn free_name(fonts: &Dictionary, stem: &str) -> String {
    let mut name = stem.to_string();
    let mut n = 1;
    while fonts.has(name.as_bytes()) {
        n += 1;
        name = format!("{stem}{n}");
    }
    name
}

impl FontFace {
    fn standard(base_font: &str, ascii_widths: &[u16; 95]) -> Self {
        let widths_1000 = (32u8..=255u8)
            .map(|b| match b {
                32..=126 => ascii_widths[(b - 32) as usize] as f32,
                // Latin-1 and the 0x80 block are approximated by a digit
                _ => 556.0,
            })
            .collect();
        Self {
            base_font: base_font.to_string(),
            widths_1000,
            program: None,
        }
    }

    fn truetype(data: &[u8]) -> Result<Self, Error> {
        let face = Face::parse(data, 0).map_err(|e| Error::Font(e.to_string()))?;

        let units = face.units_per_em() as f32;
        let scale = |v: f32| v / units * 1000.0;

        let widths_1000 = (32u8..=255u8)
            .map(|byte| {
                face.glyph_index(winansi_to_char(byte))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| scale(adv as f32))
                    .unwrap_or(0.0)
            })
            .collect();

        let bb = face.global_bounding_box();
        let flags = if face.is_italic() { 32 | 64 } else { 32 }; // Nonsymbolic (+ Italic)
        let program = FontProgram {
            compressed: miniz_oxide::deflate::compress_to_vec_zlib(data, 6),
            length1: data.len() as i64,
            bbox: [
                scale(bb.x_min as f32),
                scale(bb.y_min as f32),
                scale(bb.x_max as f32),
                scale(bb.y_max as f32),
            ],
            ascent: scale(face.ascender() as f32),
            descent: scale(face.descender() as f32),
            cap_height: face
                .capital_height()
                .map(|h| scale(h as f32))
                .unwrap_or(700.0),
            italic_angle: face.italic_angle(),
            flags,
        };

        Ok(Self {
            base_font: postscript_name(&face),
            widths_1000,
            program: Some(program),
        })
    }

    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    pub fn is_embedded(&self) -> bool {
        self.program.is_some()
    }

    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            self.widths_1000[(byte - 32) as usize]
        } else {
            0.0
        }
    }

    pub(crate) fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }

    fn write(&self, doc: &mut Document) -> Result<ObjectId, Error> {
        let base_font = Object::Name(self.base_font.as_bytes().to_vec());
        let Some(program) = &self.program else {
            return Ok(doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base_font,
                "Encoding" => "WinAnsiEncoding",
            }));
        };

        let mut file = Stream::new(
            dictionary! {
                "Length1" => program.length1,
                "Filter" => "FlateDecode",
            },
            program.compressed.clone(),
        );
        // Already deflated; keep lopdf from touching it again on save
        file.allows_compression = false;
        let file_id = doc.add_object(file);

        let [x0, y0, x1, y1] = program.bbox;
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font.clone(),
            "Flags" => program.flags,
            "FontBBox" => vec![x0.into(), y0.into(), x1.into(), y1.into()],
            "ItalicAngle" => program.italic_angle,
            "Ascent" => program.ascent,
            "Descent" => program.descent,
            "CapHeight" => program.cap_height,
            "StemV" => 80,
            "FontFile2" => file_id,
        });

        let widths: Vec<Object> = self
            .widths_1000
            .iter()
            .map(|&w| Object::Real(w))
            .collect();
        Ok(doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => base_font,
            "FirstChar" => 32,
            "LastChar" => 255,
            "Widths" => widths,
            "Encoding" => "WinAnsiEncoding",
            "FontDescriptor" => descriptor_id,
        }))
    }
}

fn postscript_name(face: &Face) -> String {
    let pick = |id: u16| {
        face.names()
            .into_iter()
            .find(|n| n.name_id == id && n.is_unicode())
            .and_then(|n| n.to_string())
    };
    pick(ttf_parser::name_id::POST_SCRIPT_NAME)
        .or_else(|| pick(ttf_parser::name_id::FAMILY))
        .map(|s| s.chars().filter(|c| c.is_ascii_graphic() && *c != '/').collect::<String>())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "EmbeddedFont".to_string())
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their Unicode codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
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

/// Convert text to WinAnsi bytes for a PDF string, dropping what the encoding
/// cannot express. Returns the bytes and the number of dropped chars.
pub(crate) fn to_winansi_bytes(s: &str) -> (Vec<u8>, usize) {
    let mut dropped = 0;
    let bytes = s
        .chars()
        .filter_map(|c| match char_to_winansi(c) {
            0 => {
                dropped += 1;
                None
            }
            b => Some(b),
        })
        .collect();
    (bytes, dropped)
}

/// Helvetica AFM widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // sp ! " # $ % & ' ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // 0-9
    278, 278, 584, 584, 584, 556, 1015,                                             // : ; < = > ? @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // N-Z
    278, 278, 278, 469, 556, 333,                                                   // [ \ ] ^ _ `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // n-z
    334, 260, 334, 584,                                                             // { | } ~
];

/// Helvetica-Bold AFM widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];
