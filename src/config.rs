use std::path::{Path, PathBuf};

/// Environment variable naming a position map that takes precedence over every
/// other candidate.
pub const POSITIONS_ENV: &str = "PLN_FIELD_POSITIONS";
/// Extra font directories (`:`-separated, `;` on Windows) searched before the
/// platform defaults.
pub const FONTS_ENV: &str = "PLN_FORM_FONTS";

pub const POSITIONS_FILE: &str = "field-positions.json";

/// One place a resource may live. Deployments differ (installed binary, repo
/// checkout, monorepo root), so resources are looked up through an ordered list
/// of these and the first existing file wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Locator {
    Path(PathBuf),
    /// Path taken from an environment variable, skipped when unset.
    Env(String),
    /// Relative to the current working directory.
    WorkingDir(PathBuf),
    /// Relative to the directory holding the running executable.
    ExeDir(PathBuf),
}

impl Locator {
    pub fn resolve(&self) -> Option<PathBuf> {
        match self {
            Locator::Path(p) => Some(p.clone()),
            Locator::Env(var) => std::env::var_os(var)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            Locator::WorkingDir(rel) => std::env::current_dir().ok().map(|d| d.join(rel)),
            Locator::ExeDir(rel) => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|d| d.join(rel))),
        }
    }
}

/// First candidate that exists on disk, together with every path tried (for
/// the "not found" log line).
pub fn first_existing(locators: &[Locator]) -> (Option<PathBuf>, Vec<PathBuf>) {
    let mut tried = Vec::new();
    for locator in locators {
        let Some(path) = locator.resolve() else {
            continue;
        };
        if path.is_file() {
            return (Some(path), tried);
        }
        tried.push(path);
    }
    (None, tried)
}

pub fn default_position_locators() -> Vec<Locator> {
    let forms = Path::new("data").join("forms").join(POSITIONS_FILE);
    vec![
        Locator::Env(POSITIONS_ENV.to_string()),
        Locator::ExeDir(forms.clone()),
        Locator::WorkingDir(forms.clone()),
        Locator::WorkingDir(Path::new("backend").join(&forms)),
    ]
}

/// Construction-time settings of a [`crate::FormFiller`].
#[derive(Clone, Debug)]
pub struct FillerConfig {
    /// Where to look for the position map, in order.
    pub position_locators: Vec<Locator>,
    /// Tried after the template path given to `fill`.
    pub template_locators: Vec<Locator>,
    /// TrueType family embedded by the synthesizer. `None` keeps the standard
    /// Helvetica pair, which needs no font files.
    pub font_family: Option<String>,
    /// Searched before the platform font directories.
    pub font_dirs: Vec<PathBuf>,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            position_locators: default_position_locators(),
            template_locators: Vec::new(),
            font_family: None,
            font_dirs: Vec::new(),
        }
    }
}

impl FillerConfig {
    /// Put an explicit position map ahead of the default search list.
    pub fn with_positions_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.position_locators.insert(0, Locator::Path(path.into()));
        self
    }

    /// Only consult the given locators for the position map.
    pub fn with_position_locators(mut self, locators: Vec<Locator>) -> Self {
        self.position_locators = locators;
        self
    }

    pub fn with_template_locator(mut self, locator: Locator) -> Self {
        self.template_locators.push(locator);
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn with_font_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_existing_skips_missing_and_reports_tried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let present = dir.path().join("b.json");
        std::fs::write(&present, "{}").expect("write");
        let missing = dir.path().join("a.json");

        let (found, tried) = first_existing(&[
            Locator::Env("PLN_FORM_PDF_TEST_UNSET_VAR".into()),
            Locator::Path(missing.clone()),
            Locator::Path(present.clone()),
        ]);
        assert_eq!(found, Some(present));
        assert_eq!(tried, vec![missing]);
    }

    #[test]
    fn directories_do_not_count_as_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (found, tried) = first_existing(&[Locator::Path(dir.path().to_path_buf())]);
        assert!(found.is_none());
        assert_eq!(tried.len(), 1);
    }

    #[test]
    fn explicit_positions_file_goes_first() {
        let config = FillerConfig::default().with_positions_file("/tmp/p.json");
        assert_eq!(
            config.position_locators[0],
            Locator::Path(PathBuf::from("/tmp/p.json"))
        );
        assert_eq!(
            config.position_locators[1],
            Locator::Env(POSITIONS_ENV.to_string())
        );
    }
}
