mod acroform;
mod config;
mod error;
mod fill;
mod fonts;
mod model;
mod overlay;
mod pdf;
mod positions;
mod template;

pub use acroform::fill as fill_native;
pub use config::{
    FONTS_ENV, FillerConfig, Locator, POSITIONS_ENV, POSITIONS_FILE, default_position_locators,
};
pub use error::Error;
pub use fill::{FillResult, FillStrategy, FormFiller, fill_document};
pub use fonts::FontLibrary;
pub use model::{
    Address, ApplicationRecord, DeclarationRole, IdType, PhoneNumber, PlateChoice, PlateFormat,
};
pub use overlay::{DocumentCanvas, DrawReport, TextRun, overlay};
pub use positions::{DEFAULT_FONT_SIZE, FieldKey, FieldPosition, PositionRegistry};
pub use template::{Capability, detect, list_form_fields};

use std::path::Path;
use std::time::Instant;

/// Read a JSON application record and a template, fill, and write the result
/// to `output`.
pub fn fill_to_file(
    filler: &FormFiller,
    record: &Path,
    template: &Path,
    output: &Path,
) -> Result<FillStrategy, Error> {
    let t0 = Instant::now();

    let record = ApplicationRecord::from_path(record)?;
    let t_parse = t0.elapsed();

    let result = filler.fill(&record, template)?;
    let t_fill = t0.elapsed();

    std::fs::write(output, &result.bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, fill={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_fill - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_fill).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        result.bytes.len(),
    );

    Ok(result.strategy)
}

/// Write the replica form for a JSON application record to `output`.
pub fn synthesize_to_file(filler: &FormFiller, record: &Path, output: &Path) -> Result<(), Error> {
    let t0 = Instant::now();

    let record = ApplicationRecord::from_path(record)?;
    let t_parse = t0.elapsed();

    let bytes = filler.synthesize(&record)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_render - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}
