use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// No template file exists at any of the candidate locations.
    TemplateNotFound(PathBuf),
    /// The template could not be inspected for an interactive form.
    CapabilityDetection(String),
    NativeFill(String),
    /// The overlay strategy could not produce a document at all.
    OverlayRender(String),
    /// The replica document could not be written. Terminal.
    Synthesize(String),
    Config(String),
    InvalidRecord(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TemplateNotFound(path) => {
                write!(f, "template not found: {}", path.display())
            }
            Error::CapabilityDetection(message) => {
                write!(f, "could not inspect template form: {}", message)
            }
            Error::NativeFill(message) => write!(f, "native form fill failed: {}", message),
            Error::OverlayRender(message) => write!(f, "overlay render failed: {}", message),
            Error::Synthesize(message) => write!(f, "document synthesis failed: {}", message),
            Error::Config(message) => write!(f, "invalid configuration: {}", message),
            Error::InvalidRecord(message) => write!(f, "invalid application record: {}", message),
            Error::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}
