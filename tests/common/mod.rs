#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

pub struct TemplateOptions {
    pub pages: u32,
    /// Put /Resources on the /Pages node instead of each page.
    pub inherit_resources: bool,
    /// Name the template's own font uses in /Resources /Font.
    pub font_name: &'static str,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            pages: 1,
            inherit_resources: false,
            font_name: "F1",
        }
    }
}

/// Build a small Letter-sized PDF. Page N shows "Template Page N".
pub fn template_pdf(opts: TemplateOptions) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { opts.font_name => font_id },
    });

    let mut page_ids: Vec<Object> = Vec::new();
    for i in 1..=opts.pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![opts.font_name.into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Template Page {i}").into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id =
            doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        };
        if !opts.inherit_resources {
            page.set("Resources", resources_id);
        }
        page_ids.push(doc.add_object(page).into());
    }

    let mut pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids,
        "Count" => opts.pages as i64,
    };
    if opts.inherit_resources {
        pages.set("Resources", resources_id);
    }
    doc.objects.insert(pages_id, pages.into());

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn simple_template() -> Vec<u8> {
    template_pdf(TemplateOptions::default())
}

pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

pub fn operations(doc: &Document, page_id: ObjectId) -> Vec<Operation> {
    let raw = doc.get_page_content(page_id).unwrap();
    Content::decode(&raw).unwrap().operations
}

pub fn num(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r as f32,
        other => panic!("not a number: {other:?}"),
    }
}

/// Text drawn on the page: (font resource name, x, y, text).
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnText {
    pub font: String,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

pub fn drawn_text(doc: &Document, page_id: ObjectId) -> Vec<DrawnText> {
    let mut out = Vec::new();
    let mut font = String::new();
    let (mut x, mut y) = (0.0, 0.0);
    for op in operations(doc, page_id) {
        match op.operator.as_str() {
            "BT" => {
                x = 0.0;
                y = 0.0;
            }
            "Tf" => {
                if let Object::Name(name) = &op.operands[0] {
                    font = String::from_utf8_lossy(name).into_owned();
                }
            }
            "Td" => {
                x += num(&op.operands[0]);
                y += num(&op.operands[1]);
            }
            "Tj" => {
                if let Object::String(bytes, _) = &op.operands[0] {
                    out.push(DrawnText {
                        font: font.clone(),
                        x,
                        y,
                        text: bytes.iter().map(|&b| b as char).collect(),
                    });
                }
            }
            _ => {}
        }
    }
    out
}

/// Text stamped by the overlay only (fonts installed under `Stamp*`).
pub fn stamped_text(doc: &Document, page_id: ObjectId) -> Vec<DrawnText> {
    drawn_text(doc, page_id)
        .into_iter()
        .filter(|t| t.font.starts_with("Stamp"))
        .collect()
}

/// Every `re` operand quadruple on the page.
pub fn rects(doc: &Document, page_id: ObjectId) -> Vec<[f32; 4]> {
    operations(doc, page_id)
        .into_iter()
        .filter(|op| op.operator == "re")
        .map(|op| {
            [
                num(&op.operands[0]),
                num(&op.operands[1]),
                num(&op.operands[2]),
                num(&op.operands[3]),
            ]
        })
        .collect()
}

pub fn font_resource_names(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = match page.get(b"Resources").unwrap() {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        Object::Dictionary(d) => d,
        other => panic!("unexpected resources {other:?}"),
    };
    let fonts = match resources.get(b"Font").unwrap() {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        Object::Dictionary(d) => d,
        other => panic!("unexpected font dict {other:?}"),
    };
    let mut names: Vec<String> = fonts
        .iter()
        .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
        .collect();
    names.sort();
    names
}

/// (name, bytes) of every archive entry in central directory order.
pub fn unzip(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut file = zip.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data)
        })
        .collect()
}

/// Minimal XLSX: one sheet, all strings shared. `None` leaves the cell out.
pub fn xlsx(rows: &[Vec<Option<&str>>]) -> Vec<u8> {
    let mut shared: Vec<String> = Vec::new();
    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, cell) in row.iter().enumerate() {
            let Some(text) = cell else { continue };
            let col = (b'A' + c as u8) as char;
            if let Ok(n) = text.parse::<f64>() {
                sheet_rows.push_str(&format!("<c r=\"{col}{}\"><v>{n}</v></c>", r + 1));
            } else {
                shared.push(text.to_string());
                sheet_rows.push_str(&format!(
                    "<c r=\"{col}{}\" t=\"s\"><v>{}</v></c>",
                    r + 1,
                    shared.len() - 1
                ));
            }
        }
        sheet_rows.push_str("</row>");
    }
    xlsx_from_xml(&shared, &sheet_rows)
}

/// XLSX around hand-written `<row>` elements; `t="s"` cells index `shared`.
pub fn xlsx_from_xml(shared: &[String], sheet_rows: &str) -> Vec<u8> {
    let sst: String = shared
        .iter()
        .map(|s| format!("<si><t>{s}</t></si>"))
        .collect();
    let parts = [
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Invoices" sheetId="1" r:id="rId1"/></sheets></workbook>"#
                .to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/data.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/sharedStrings.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{sst}</sst>"#
            ),
        ),
        (
            "xl/worksheets/data.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
            ),
        ),
    ];

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, xml) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Font dictionary installed under `name` in the page's /Resources /Font.
pub fn font_dict<'a>(doc: &'a Document, page_id: ObjectId, name: &str) -> &'a lopdf::Dictionary {
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = match page.get(b"Resources").unwrap() {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        Object::Dictionary(d) => d,
        other => panic!("unexpected resources {other:?}"),
    };
    let fonts = match resources.get(b"Font").unwrap() {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        Object::Dictionary(d) => d,
        other => panic!("unexpected font dict {other:?}"),
    };
    let id = fonts.get(name.as_bytes()).unwrap().as_reference().unwrap();
    doc.get_dictionary(id).unwrap()
}

pub fn name_of(obj: &Object) -> String {
    String::from_utf8_lossy(obj.as_name().unwrap()).into_owned()
}

pub const FIXTURE_FONT: &str = "tests/fixtures/Montserrat-Regular.ttf";
