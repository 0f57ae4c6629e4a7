mod archive;
mod batch;
mod error;
mod fonts;
mod model;
mod pdf;
mod registry;
pub mod sheet;

pub use archive::{ARCHIVE_FILE_NAME, Archive, pack};
pub use batch::{
    BatchOutput, BatchRequest, BatchState, FALLBACK_IDENTIFIER, NoProgress, Progress, entry_name,
    run,
};
pub use error::Error;
pub use fonts::{FontFace, FontSet};
pub use model::{
    CellValue, DEFAULT_FONT_SIZE, FieldLayout, InvoiceRow, OverlayStyle, display_value, lookup,
};
pub use pdf::{Template, compose};
pub use registry::{DEFAULT_IDENTIFIER_FIELD, FieldRegistry};

use std::path::Path;
use std::time::Instant;

/// Read rows and template from disk, run the batch and write the archive to
/// `output`. Returns the entry names, or `None` when there were no rows (in
/// which case nothing is written).
///
/// The archive is written next to `output` first and renamed into place, so a
/// failed run never leaves a partial ZIP behind.
pub fn generate_invoices(
    rows_path: &Path,
    template_path: &Path,
    registry: &FieldRegistry,
    fonts: &FontSet,
    output: &Path,
) -> Result<Option<Vec<String>>, Error> {
    let t0 = Instant::now();

    let rows = sheet::read_rows(rows_path)?;
    let t_import = t0.elapsed();

    let template = std::fs::read(template_path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", e, template_path.display()),
        ))
    })?;

    let request = BatchRequest {
        rows: &rows,
        template: &template,
        registry,
        fonts,
    };
    let mut progress = |state: &BatchState| log::debug!("Batch state: {state:?}");
    let Some(out) = run(&request, &mut progress)? else {
        return Ok(None);
    };
    let t_batch = t0.elapsed();

    let partial = output.with_extension("zip.part");
    if let Err(e) =
        std::fs::write(&partial, &out.bytes).and_then(|_| std::fs::rename(&partial, output))
    {
        let _ = std::fs::remove_file(&partial);
        return Err(Error::Io(e));
    }
    let t_total = t0.elapsed();

    log::info!(
        "Timing: import={:.1}ms, batch={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_import.as_secs_f64() * 1000.0,
        (t_batch - t_import).as_secs_f64() * 1000.0,
        (t_total - t_batch).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        out.bytes.len(),
    );

    Ok(Some(out.entries))
}
