use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;
use crate::model::{FieldLayout, OverlayStyle};

pub const DEFAULT_IDENTIFIER_FIELD: &str = "Buyer_Name";

/// Field name -> layout, iterated in registration order. Built once per run
/// and shared read-only by every row.
#[derive(Clone, Debug)]
pub struct FieldRegistry {
    fields: Vec<(String, FieldLayout)>,
    index: HashMap<String, usize>,
    identifier_field: String,
    style: OverlayStyle,
}

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default = "default_identifier")]
    identifier_field: String,
    background: Option<[f32; 3]>,
    text_color: Option<[f32; 3]>,
    padding: Option<f32>,
    fields: Vec<FieldEntry>,
}

#[derive(Deserialize)]
struct FieldEntry {
    name: String,
    #[serde(flatten)]
    layout: FieldLayout,
}

fn default_identifier() -> String {
    DEFAULT_IDENTIFIER_FIELD.to_string()
}

fn check_color(what: &str, rgb: [f32; 3]) -> Result<(), Error> {
    if rgb.iter().all(|c| (0.0..=1.0).contains(c)) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{what} components must be within 0..=1, got {rgb:?}"
        )))
    }
}

impl FieldRegistry {
    pub fn new(
        fields: Vec<(String, FieldLayout)>,
        identifier_field: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::with_style(fields, identifier_field, OverlayStyle::default())
    }

    pub fn with_style(
        fields: Vec<(String, FieldLayout)>,
        identifier_field: impl Into<String>,
        style: OverlayStyle,
    ) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        for (name, layout) in &fields {
            if name.is_empty() {
                return Err(Error::Config("field name must not be empty".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::Config(format!("field `{name}` is registered twice")));
            }
            if !(layout.width > 0.0 && layout.height > 0.0) {
                return Err(Error::Config(format!(
                    "field `{name}` needs a positive box, got {}x{}",
                    layout.width, layout.height
                )));
            }
            if !(layout.font_size > 0.0) {
                return Err(Error::Config(format!(
                    "field `{name}` needs a positive font size, got {}",
                    layout.font_size
                )));
            }
        }
        check_color("background", style.background)?;
        check_color("text_color", style.text_color)?;
        if !(style.padding >= 0.0) || !(style.line_height_factor > 0.0) {
            return Err(Error::Config(format!(
                "padding must be >= 0 and line height factor > 0, got {} / {}",
                style.padding, style.line_height_factor
            )));
        }

        let registry = Self::from_parts(fields, identifier_field.into(), style);
        registry.layout_of(&registry.identifier_field)?;
        Ok(registry)
    }

    /// The built-in single-page tax invoice layout (A4, points).
    pub fn standard() -> Self {
        let fields = [
            ("Invoice_No", FieldLayout::new(400.0, 760.0, 150.0, 12.0).bold()),
            ("Invoice_Date", FieldLayout::new(400.0, 742.0, 150.0, 12.0)),
            ("Buyer_Name", FieldLayout::new(35.0, 680.0, 200.0, 10.0)),
            ("Buyer_Address", FieldLayout::new(35.0, 650.0, 220.0, 24.0).font_size(9.0)),
            ("Buyer_GSTIN", FieldLayout::new(35.0, 620.0, 200.0, 10.0)),
            ("Place_Of_Supply", FieldLayout::new(35.0, 604.0, 200.0, 10.0)),
            ("Description", FieldLayout::new(35.0, 520.0, 220.0, 24.0)),
            ("HSN_SAC", FieldLayout::new(260.0, 520.0, 60.0, 12.0)),
            ("Quantity", FieldLayout::new(325.0, 520.0, 50.0, 12.0)),
            ("Rate", FieldLayout::new(380.0, 520.0, 70.0, 12.0)),
            ("Amount", FieldLayout::new(455.0, 520.0, 100.0, 12.0)),
            ("Taxable_Value", FieldLayout::new(455.0, 400.0, 100.0, 12.0)),
            ("CGST", FieldLayout::new(455.0, 382.0, 100.0, 12.0)),
            ("SGST", FieldLayout::new(455.0, 364.0, 100.0, 12.0)),
            ("IGST", FieldLayout::new(455.0, 346.0, 100.0, 12.0)),
            ("Total", FieldLayout::new(455.0, 322.0, 100.0, 14.0).font_size(11.0).bold()),
            ("Amount_In_Words", FieldLayout::new(35.0, 290.0, 400.0, 24.0)),
        ];
        let fields = fields
            .into_iter()
            .map(|(name, layout)| (name.to_string(), layout))
            .collect();
        Self::from_parts(
            fields,
            DEFAULT_IDENTIFIER_FIELD.to_string(),
            OverlayStyle::default(),
        )
    }

    fn from_parts(
        fields: Vec<(String, FieldLayout)>,
        identifier_field: String,
        style: OverlayStyle,
    ) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Self {
            fields,
            index,
            identifier_field,
            style,
        }
    }

    pub fn from_json(data: &[u8]) -> Result<Self, Error> {
        let file: RegistryFile = serde_json::from_slice(data)
            .map_err(|e| Error::Config(format!("layout file: {e}")))?;
        let defaults = OverlayStyle::default();
        let style = OverlayStyle {
            background: file.background.unwrap_or(defaults.background),
            text_color: file.text_color.unwrap_or(defaults.text_color),
            padding: file.padding.unwrap_or(defaults.padding),
            ..defaults
        };
        let fields = file
            .fields
            .into_iter()
            .map(|entry| (entry.name, entry.layout))
            .collect();
        Self::with_style(fields, file.identifier_field, style)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
        })?;
        Self::from_json(&data)
    }

    pub fn layout_of(&self, field: &str) -> Result<&FieldLayout, Error> {
        self.index
            .get(field)
            .map(|&i| &self.fields[i].1)
            .ok_or_else(|| Error::UnknownField(field.to_string()))
    }

    /// Fields in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldLayout)> {
        self.fields.iter().map(|(name, layout)| (name.as_str(), layout))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column whose value names each generated file.
    pub fn identifier_field(&self) -> &str {
        &self.identifier_field
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }
}
