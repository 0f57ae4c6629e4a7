use std::time::Instant;

use crate::archive::{ARCHIVE_FILE_NAME, Archive};
use crate::error::Error;
use crate::fonts::FontSet;
use crate::model::{InvoiceRow, lookup};
use crate::pdf::{Template, compose};
use crate::registry::FieldRegistry;

/// Name segment used when a row has no usable identifier.
pub const FALLBACK_IDENTIFIER: &str = "User";

/// Everything one batch run needs. Nothing is read from ambient state.
#[derive(Clone, Copy)]
pub struct BatchRequest<'a> {
    pub rows: &'a [InvoiceRow],
    pub template: &'a [u8],
    pub registry: &'a FieldRegistry,
    pub fonts: &'a FontSet,
}

/// Lifecycle of one run. `run` reports every state after `Idle`; `Idle` is
/// what a caller holds before the first event and is the `Default`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BatchState {
    #[default]
    Idle,
    Loading,
    /// `index` is 0-based; `total` is the number of rows.
    Composing { index: usize, total: usize },
    Packaging,
    Done { entries: usize },
    Failed,
}

impl BatchState {
    /// True while a run is in flight; UIs use it to disable re-triggering.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            BatchState::Loading | BatchState::Composing { .. } | BatchState::Packaging
        )
    }
}

/// Receives every state transition of a run.
pub trait Progress {
    fn update(&mut self, state: &BatchState);
}

impl<F: FnMut(&BatchState)> Progress for F {
    fn update(&mut self, state: &BatchState) {
        self(state)
    }
}

pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _state: &BatchState) {}
}

#[derive(Debug)]
pub struct BatchOutput {
    /// Suggested name for the archive itself.
    pub file_name: &'static str,
    /// Entry names in row order.
    pub entries: Vec<String>,
    pub bytes: Vec<u8>,
}

/// `Invoice_{index+1}_{identifier}.pdf`, falling back to `User` when the
/// identifier is absent or blank.
pub fn entry_name(index: usize, row: &InvoiceRow, identifier_field: &str) -> String {
    let identifier = lookup(row, identifier_field)
        .map(|v| sanitize_filename::sanitize(v.to_string().trim()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_IDENTIFIER.to_string());
    format!("Invoice_{}_{}.pdf", index + 1, identifier)
}

/// Turn every row into a filled PDF and bundle them into one ZIP.
///
/// Zero rows is a no-op: `Ok(None)`, no state changes, the template is not
/// even parsed. Any failure aborts the run and no archive is produced.
pub fn run(
    request: &BatchRequest,
    progress: &mut impl Progress,
) -> Result<Option<BatchOutput>, Error> {
    if request.rows.is_empty() {
        log::warn!("No invoice rows; nothing to generate");
        return Ok(None);
    }

    let result = run_inner(request, progress);
    if let Err(e) = &result {
        log::error!("Batch failed: {e}");
        progress.update(&BatchState::Failed);
    }
    result.map(Some)
}

fn run_inner(request: &BatchRequest, progress: &mut impl Progress) -> Result<BatchOutput, Error> {
    let t0 = Instant::now();
    let total = request.rows.len();

    progress.update(&BatchState::Loading);
    let template = Template::from_bytes(request.template)?;
    let t_load = t0.elapsed();

    let documents = compose_rows(request, &template, progress)?;
    let t_compose = t0.elapsed();

    progress.update(&BatchState::Packaging);
    let identifier_field = request.registry.identifier_field();
    let mut archive = Archive::new();
    let mut entries = Vec::with_capacity(total);
    for (index, (row, pdf)) in request.rows.iter().zip(documents).enumerate() {
        let name = entry_name(index, row, identifier_field);
        entries.push(archive.push(name, pdf).to_string());
    }
    let bytes = archive.pack()?;
    let t_total = t0.elapsed();

    log::info!(
        "Batch timing: load={:.1}ms, compose={:.1}ms, package={:.1}ms, total={:.1}ms ({} invoices, archive {} bytes)",
        t_load.as_secs_f64() * 1000.0,
        (t_compose - t_load).as_secs_f64() * 1000.0,
        (t_total - t_compose).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        total,
        bytes.len(),
    );

    progress.update(&BatchState::Done {
        entries: entries.len(),
    });
    Ok(BatchOutput {
        file_name: ARCHIVE_FILE_NAME,
        entries,
        bytes,
    })
}

fn compose_row(request: &BatchRequest, template: &Template, index: usize) -> Result<Vec<u8>, Error> {
    let row = &request.rows[index];
    let t0 = Instant::now();
    let pdf = compose(template, row, request.registry, request.fonts).map_err(|e| Error::Row {
        row: index + 1,
        source: Box::new(e),
    })?;
    log::debug!(
        "Composed invoice {} in {:.1}ms ({} bytes)",
        index + 1,
        t0.elapsed().as_secs_f64() * 1000.0,
        pdf.len(),
    );
    Ok(pdf)
}

#[cfg(not(feature = "parallel"))]
fn compose_rows(
    request: &BatchRequest,
    template: &Template,
    progress: &mut impl Progress,
) -> Result<Vec<Vec<u8>>, Error> {
    let total = request.rows.len();
    let mut documents = Vec::with_capacity(total);
    for index in 0..total {
        progress.update(&BatchState::Composing { index, total });
        documents.push(compose_row(request, template, index)?);
    }
    Ok(documents)
}

/// Rows fan out over the rayon pool; `collect` keeps input order, so naming
/// and archive order match the sequential path. Progress is reported once the
/// documents are back, in row order.
#[cfg(feature = "parallel")]
fn compose_rows(
    request: &BatchRequest,
    template: &Template,
    progress: &mut impl Progress,
) -> Result<Vec<Vec<u8>>, Error> {
    use rayon::prelude::*;

    let total = request.rows.len();
    let documents = (0..total)
        .into_par_iter()
        .map(|index| compose_row(request, template, index))
        .collect::<Result<Vec<_>, _>>()?;
    for index in 0..total {
        progress.update(&BatchState::Composing { index, total });
    }
    Ok(documents)
}
