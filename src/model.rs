use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

pub const DEFAULT_FONT_SIZE: f32 = 10.0;

/// One spreadsheet cell as handed over by the importer.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            // Integral amounts print as "1200", not "1200.0"
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// One invoice: column name -> value. Columns the registry does not know are
/// carried along and ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InvoiceRow {
    cells: HashMap<String, CellValue>,
}

impl InvoiceRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(field.into(), value.into());
    }

    /// Builder-style `insert`.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.cells.get(field)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for InvoiceRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = InvoiceRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Tolerant field access: a missing column is `None`, never an error.
pub fn lookup<'a>(row: &'a InvoiceRow, field: &str) -> Option<&'a CellValue> {
    row.get(field)
}

/// Text a field renders as. Absent values render blank.
pub fn display_value(value: Option<&CellValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Where and how one field is stamped on the page, in PDF points with a
/// bottom-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct FieldLayout {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default, alias = "bold")]
    pub emphasis: bool,
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

impl FieldLayout {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            font_size: DEFAULT_FONT_SIZE,
            emphasis: false,
        }
    }

    pub const fn font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub const fn bold(mut self) -> Self {
        self.emphasis = true;
        self
    }
}

/// Page-wide drawing parameters shared by every field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    /// Colour of the opaque backing box; should match the template paper.
    pub background: [f32; 3],
    pub text_color: [f32; 3],
    /// Inset of the first baseline from the box's bottom-left corner.
    pub padding: f32,
    pub line_height_factor: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            background: [1.0, 1.0, 1.0],
            text_color: [0.0, 0.0, 0.0],
            padding: 1.0,
            line_height_factor: 1.2,
        }
    }
}
