//! Strategy selection: native AcroForm fill when the template has fields,
//! otherwise a coordinate overlay, and a synthesized replica when the overlay
//! cannot be drawn.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{FillerConfig, first_existing};
use crate::error::Error;
use crate::fonts::{FontLibrary, FontSet};
use crate::model::ApplicationRecord;
use crate::positions::PositionRegistry;
use crate::{acroform, overlay, pdf, template};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillStrategy {
    Native,
    Overlay,
    Synthesized,
}

impl fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FillStrategy::Native => "native",
            FillStrategy::Overlay => "overlay",
            FillStrategy::Synthesized => "synthesized",
        })
    }
}

#[derive(Debug)]
pub struct FillResult {
    pub bytes: Vec<u8>,
    pub strategy: FillStrategy,
}

enum FillState {
    Start,
    DetectingCapability,
    NativeFill,
    OverlayFill,
    SynthesizeFromScratch,
    Done(FillResult),
    Failed(Error),
}

impl FillState {
    fn name(&self) -> &'static str {
        match self {
            FillState::Start => "Start",
            FillState::DetectingCapability => "DetectingCapability",
            FillState::NativeFill => "NativeFill",
            FillState::OverlayFill => "OverlayFill",
            FillState::SynthesizeFromScratch => "SynthesizeFromScratch",
            FillState::Done(_) => "Done",
            FillState::Failed(_) => "Failed",
        }
    }
}

/// Everything one invocation reads besides the record and the template:
/// a snapshot of the position map and the fonts the synthesizer draws with.
struct ResourceBundle {
    registry: PositionRegistry,
    fonts: FontSet,
}

impl ResourceBundle {
    fn load(config: &FillerConfig, library: Option<&FontLibrary>) -> Self {
        let registry = match PositionRegistry::locate(&config.position_locators) {
            Ok(registry) => registry,
            Err(e) => {
                log::warn!("Ignoring field position map: {e}");
                PositionRegistry::defaults()
            }
        };
        let fonts = FontSet::resolve(library, config.font_family.as_deref());
        Self { registry, fonts }
    }
}

/// Fills PLN2 applications. Holds only read-only state, so one filler can
/// serve concurrent callers.
pub struct FormFiller {
    config: FillerConfig,
    fonts: Option<FontLibrary>,
}

impl FormFiller {
    /// Scans the font directories up front when a font family is configured.
    pub fn new(config: FillerConfig) -> Self {
        let fonts = config.font_family.as_ref().map(|family| {
            let t0 = Instant::now();
            let library = FontLibrary::scan(&config.font_dirs);
            log::info!(
                "Font scan for {family}: {:.1}ms{}",
                t0.elapsed().as_secs_f64() * 1000.0,
                if library.is_empty() { " (no fonts found)" } else { "" }
            );
            library
        });
        Self { config, fonts }
    }

    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    /// Fill `template_path` (or the first configured template candidate) with
    /// `record`.
    pub fn fill(&self, record: &ApplicationRecord, template_path: &Path) -> Result<FillResult, Error> {
        let t0 = Instant::now();
        let path = self.resolve_template(template_path)?;
        let template = std::fs::read(&path)?;
        let bundle = ResourceBundle::load(&self.config, self.fonts.as_ref());
        log::info!("Filling {} ({} bytes)", path.display(), template.len());

        let mut state = FillState::Start;
        loop {
            let from = state.name();
            let next = match state {
                FillState::Start => FillState::DetectingCapability,
                FillState::DetectingCapability => {
                    let capability = template::detect(&template);
                    if capability.has_native_fields {
                        log::info!("Template has {} form fields", capability.field_count);
                        FillState::NativeFill
                    } else {
                        FillState::OverlayFill
                    }
                }
                FillState::NativeFill => match acroform::fill(&template, record) {
                    Ok(bytes) => FillState::Done(FillResult {
                        bytes,
                        strategy: FillStrategy::Native,
                    }),
                    Err(e) => FillState::Failed(e),
                },
                FillState::OverlayFill => match overlay::overlay(&template, record, &bundle.registry) {
                    Ok((bytes, _)) => FillState::Done(FillResult {
                        bytes,
                        strategy: FillStrategy::Overlay,
                    }),
                    Err(e) => {
                        log::warn!("Overlay failed, synthesizing the form instead: {e}");
                        FillState::SynthesizeFromScratch
                    }
                },
                FillState::SynthesizeFromScratch => match pdf::synthesize(record, &bundle.fonts) {
                    Ok(bytes) => FillState::Done(FillResult {
                        bytes,
                        strategy: FillStrategy::Synthesized,
                    }),
                    Err(e) => FillState::Failed(e),
                },
                FillState::Done(result) => {
                    log::info!(
                        "Filled with {} strategy in {:.1}ms ({} bytes)",
                        result.strategy,
                        t0.elapsed().as_secs_f64() * 1000.0,
                        result.bytes.len()
                    );
                    return Ok(result);
                }
                FillState::Failed(e) => {
                    log::error!("Fill failed: {e}");
                    return Err(e);
                }
            };
            log::debug!("Fill state: {from} -> {}", next.name());
            state = next;
        }
    }

    /// Build the replica form without consulting any template.
    pub fn synthesize(&self, record: &ApplicationRecord) -> Result<Vec<u8>, Error> {
        let fonts = FontSet::resolve(self.fonts.as_ref(), self.config.font_family.as_deref());
        pdf::synthesize(record, &fonts)
    }

    fn resolve_template(&self, template_path: &Path) -> Result<PathBuf, Error> {
        if template_path.is_file() {
            return Ok(template_path.to_path_buf());
        }
        match first_existing(&self.config.template_locators) {
            (Some(path), _) => {
                log::info!(
                    "Template {} not found, using {}",
                    template_path.display(),
                    path.display()
                );
                Ok(path)
            }
            (None, _) => Err(Error::TemplateNotFound(template_path.to_path_buf())),
        }
    }
}

/// Fill with the default configuration.
pub fn fill_document(record: &ApplicationRecord, template_path: &Path) -> Result<FillResult, Error> {
    FormFiller::new(FillerConfig::default()).fill(record, template_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Locator;

    #[test]
    fn filler_can_be_shared_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<FormFiller>();
    }

    #[test]
    fn missing_template_is_fatal() {
        let filler = FormFiller::new(FillerConfig::default().with_position_locators(Vec::new()));
        let err = filler
            .fill(&ApplicationRecord::default(), Path::new("/nonexistent/PLN2.pdf"))
            .unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(p) if p.ends_with("PLN2.pdf")));
    }

    #[test]
    fn template_locators_are_tried_after_the_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("PLN2.pdf");
        std::fs::write(&fallback, b"%PDF-1.4").unwrap();
        let config = FillerConfig::default()
            .with_position_locators(Vec::new())
            .with_template_locator(Locator::Path(dir.path().join("missing.pdf")))
            .with_template_locator(Locator::Path(fallback.clone()));
        let filler = FormFiller::new(config);
        let path = filler.resolve_template(Path::new("/nonexistent/PLN2.pdf")).unwrap();
        assert_eq!(path, fallback);
    }

    #[test]
    fn unreadable_template_falls_through_to_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("PLN2.pdf");
        std::fs::write(&template, b"not a pdf").unwrap();
        let filler = FormFiller::new(FillerConfig::default().with_position_locators(Vec::new()));
        let result = filler.fill(&ApplicationRecord::default(), &template).unwrap();
        assert_eq!(result.strategy, FillStrategy::Synthesized);
        assert!(result.bytes.starts_with(b"%PDF"));
    }
}
