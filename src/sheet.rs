//! Default row importer: the first worksheet of an XLSX workbook, or a JSON
//! array of flat objects. Mirrors what a spreadsheet-to-JSON conversion gives:
//! the first non-empty row is the header, later rows become one `InvoiceRow`
//! each, blank rows are skipped and empty cells are simply absent.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::Error;
use crate::model::{CellValue, InvoiceRow};

const SML_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

type Zip<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

pub fn read_rows(path: &Path) -> Result<Vec<InvoiceRow>, Error> {
    let data = std::fs::read(path).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
    })?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx" | "xlsm") => read_xlsx(&data),
        Some("json") => read_json(&data),
        _ => Err(Error::InvalidSheet(format!(
            "{}: expected an .xlsx or .json file",
            path.display()
        ))),
    }
}

pub fn read_json(data: &[u8]) -> Result<Vec<InvoiceRow>, Error> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    let serde_json::Value::Array(items) = value else {
        return Err(Error::InvalidSheet("JSON rows must be an array of objects".into()));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let serde_json::Value::Object(map) = item else {
                return Err(Error::InvalidSheet(format!("JSON row {} is not an object", i + 1)));
            };
            Ok(map
                .into_iter()
                .filter_map(|(key, value)| json_cell(value).map(|cell| (key, cell)))
                .collect::<InvoiceRow>())
        })
        .collect()
}

fn json_cell(value: serde_json::Value) -> Option<CellValue> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::String(s) => Some(CellValue::Text(s)),
        Value::Number(n) => n.as_f64().map(CellValue::Number),
        Value::Bool(b) => Some(CellValue::Bool(b)),
        other => Some(CellValue::Text(other.to_string())),
    }
}

pub fn read_xlsx(data: &[u8]) -> Result<Vec<InvoiceRow>, Error> {
    let mut zip = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|_| Error::InvalidSheet("file is not a ZIP archive".into()))?;

    let shared = match read_zip_text(&mut zip, "xl/sharedStrings.xml") {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let sheet_path = first_sheet_path(&mut zip)?;
    let xml = read_zip_text(&mut zip, &sheet_path).ok_or_else(|| {
        Error::InvalidSheet(format!("missing {sheet_path} (is this an XLSX file?)"))
    })?;
    let grid = parse_sheet(&xml, &shared)?;

    let mut grid = grid.into_iter();
    let Some(header) = grid.next() else {
        return Ok(Vec::new());
    };
    let header: HashMap<usize, String> = header
        .into_iter()
        .map(|(col, cell)| (col, cell.to_string()))
        .filter(|(_, name)| !name.is_empty())
        .collect();

    let rows: Vec<InvoiceRow> = grid
        .map(|cells| {
            cells
                .into_iter()
                .filter_map(|(col, cell)| header.get(&col).map(|name| (name.clone(), cell)))
                .collect::<InvoiceRow>()
        })
        .filter(|row| !row.is_empty())
        .collect();
    log::debug!("Read {} rows from {sheet_path}", rows.len());
    Ok(rows)
}

fn read_zip_text(zip: &mut Zip, name: &str) -> Option<String> {
    let mut content = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut content).ok()?;
    Some(content)
}

fn sml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(SML_NS))
}

fn sml_children<'a>(
    node: roxmltree::Node<'a, 'a>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> + 'a {
    node.children()
        .filter(move |n| n.tag_name().name() == name && n.tag_name().namespace() == Some(SML_NS))
}

/// Concatenated text of every `<t>` below `node` (plain and rich-text runs).
fn collect_text(node: roxmltree::Node) -> String {
    node.descendants()
        .filter(|n| n.tag_name().name() == "t" && n.tag_name().namespace() == Some(SML_NS))
        .filter_map(|n| n.text())
        .collect()
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, Error> {
    let doc = roxmltree::Document::parse(xml)?;
    Ok(sml_children(doc.root_element(), "si").map(collect_text).collect())
}

/// Resolve the first `<sheet>` of the workbook to its part name.
fn first_sheet_path(zip: &mut Zip) -> Result<String, Error> {
    let fallback = "xl/worksheets/sheet1.xml".to_string();
    let Some(workbook) = read_zip_text(zip, "xl/workbook.xml") else {
        return Err(Error::InvalidSheet(
            "missing xl/workbook.xml (is this an XLSX file?)".into(),
        ));
    };
    let doc = roxmltree::Document::parse(&workbook)?;
    let Some(rid) = sml(doc.root_element(), "sheets")
        .and_then(|s| sml(s, "sheet"))
        .and_then(|s| s.attribute((REL_NS, "id")))
    else {
        return Err(Error::InvalidSheet("workbook has no sheets".into()));
    };

    let Some(rels) = read_zip_text(zip, "xl/_rels/workbook.xml.rels") else {
        return Ok(fallback);
    };
    let rels = roxmltree::Document::parse(&rels)?;
    let target = rels
        .root_element()
        .children()
        .filter(|n| n.tag_name().name() == "Relationship" && n.tag_name().namespace() == Some(PKG_REL_NS))
        .find(|n| n.attribute("Id") == Some(rid))
        .and_then(|n| n.attribute("Target"));
    Ok(match target {
        Some(t) if t.starts_with('/') => t.trim_start_matches('/').to_string(),
        Some(t) => format!("xl/{t}"),
        None => fallback,
    })
}

/// Columns past `XFD` do not exist in a workbook.
const MAX_COLUMNS: usize = 16_384;

/// `"BC12"` -> 54 (0-based column index).
fn column_index(cell_ref: &str) -> Result<Option<usize>, Error> {
    let letters = cell_ref.bytes().take_while(|b| b.is_ascii_alphabetic());
    let mut n = 0usize;
    for b in letters {
        let digit = (b.to_ascii_uppercase() - b'A' + 1) as usize;
        n = n
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .filter(|&n| n <= MAX_COLUMNS)
            .ok_or_else(|| Error::InvalidSheet(format!("cell reference {cell_ref:?} is out of range")))?;
    }
    Ok(n.checked_sub(1))
}

/// Non-empty rows in sheet order; each row is (column, value) pairs.
fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<(usize, CellValue)>>, Error> {
    let doc = roxmltree::Document::parse(xml)?;
    let Some(data) = sml(doc.root_element(), "sheetData") else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for row in sml_children(data, "row") {
        let mut cells = Vec::new();
        let mut next_col = 0usize;
        for c in sml_children(row, "c") {
            let col = match c.attribute("r") {
                Some(r) => column_index(r)?.unwrap_or(next_col),
                None => next_col,
            };
            next_col = col + 1;
            if let Some(value) = cell_value(c, shared)? {
                cells.push((col, value));
            }
        }
        if !cells.is_empty() {
            rows.push(cells);
        }
    }
    Ok(rows)
}

fn cell_value(c: roxmltree::Node, shared: &[String]) -> Result<Option<CellValue>, Error> {
    let v = sml(c, "v").and_then(|n| n.text());
    let value = match c.attribute("t") {
        Some("s") => {
            let Some(v) = v else { return Ok(None) };
            let idx: usize = v
                .trim()
                .parse()
                .map_err(|_| Error::InvalidSheet(format!("bad shared string index {v:?}")))?;
            let s = shared.get(idx).ok_or_else(|| {
                Error::InvalidSheet(format!("shared string {idx} out of range"))
            })?;
            CellValue::Text(s.clone())
        }
        Some("inlineStr") => match sml(c, "is") {
            Some(is) => CellValue::Text(collect_text(is)),
            None => return Ok(None),
        },
        Some("b") => match v {
            Some(v) => CellValue::Bool(v.trim() == "1"),
            None => return Ok(None),
        },
        Some("str" | "e") => match v {
            Some(v) => CellValue::Text(v.to_string()),
            None => return Ok(None),
        },
        _ => match v {
            Some(v) => match v.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(v.to_string()),
            },
            None => return Ok(None),
        },
    };
    if matches!(&value, CellValue::Text(s) if s.is_empty()) {
        return Ok(None);
    }
    Ok(Some(value))
}
