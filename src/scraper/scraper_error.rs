use std::error::Error;
use std::fmt;

/// Run-level failures. Per-property enrichment failures never surface here;
/// they are captured into the record's `error` field instead.
#[derive(Debug)]
pub enum ScraperError {
    Browser(String),
    Navigation(String),
    HtmlParse(String),
    InvalidUrl(String),
}

impl ScraperError {
    /// Coarse category for the JSON error envelope's `error_type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ScraperError::Browser(_) => "BrowserError",
            ScraperError::Navigation(_) => "NavigationError",
            ScraperError::HtmlParse(_) => "HtmlParseError",
            ScraperError::InvalidUrl(_) => "InvalidUrlError",
        }
    }
}

impl fmt::Display for ScraperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScraperError::Browser(msg) => write!(f, "Browser error: {msg}"),
            ScraperError::Navigation(msg) => write!(f, "Navigation error: {msg}"),
            ScraperError::HtmlParse(msg) => write!(f, "HTML parse error: {msg}"),
            ScraperError::InvalidUrl(msg) => write!(f, "Invalid URL: {msg}"),
        }
    }
}

impl Error for ScraperError {}
