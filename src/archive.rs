use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::Error;

/// Suggested file name for the bundle handed to the caller.
pub const ARCHIVE_FILE_NAME: &str = "Invoices.zip";

/// Ordered (name, bytes) entries. Names are unique: pushing a name that is
/// already present stores it as `stem_2.ext`, `stem_3.ext`, ...
#[derive(Debug, Default)]
pub struct Archive {
    entries: Vec<(String, Vec<u8>)>,
    names: HashSet<String>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry and return the name it was stored under.
    pub fn push(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> &str {
        let mut name = name.into();
        if self.names.contains(&name) {
            let (stem, ext) = match name.rfind('.') {
                Some(dot) if dot > 0 => (name[..dot].to_string(), name[dot..].to_string()),
                _ => (name.clone(), String::new()),
            };
            let mut n = 2;
            loop {
                let candidate = format!("{stem}_{n}{ext}");
                if !self.names.contains(&candidate) {
                    log::debug!("Archive entry {name:?} already present, storing as {candidate:?}");
                    name = candidate;
                    break;
                }
                n += 1;
            }
        }
        self.names.insert(name.clone());
        self.entries.push((name, bytes));
        &self.entries[self.entries.len() - 1].0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn pack(&self) -> Result<Vec<u8>, Error> {
        pack(self.entries.iter().map(|(name, bytes)| (name.as_str(), bytes.as_slice())))
    }
}

/// Write entries into a Deflate-compressed ZIP, central directory in insertion
/// order. No entries yields a valid empty archive.
pub fn pack<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Result<Vec<u8>, Error> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut count = 0usize;
    for (name, bytes) in entries {
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
        count += 1;
    }
    let bytes = zip.finish()?.into_inner();
    log::debug!("Packed {count} entries into {} bytes", bytes.len());
    Ok(bytes)
}
