use thiserror::Error;

/// Everything that can abort a scrape run.
///
/// The variants map one-to-one onto pipeline stages. Nothing is retried;
/// the first error reaches the trigger unchanged.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("could not find API key on {0}")]
    KeyNotFound(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("write error: {0}")]
    Write(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        ScrapeError::Http(e.to_string())
    }
}

impl From<rusqlite::Error> for ScrapeError {
    fn from(e: rusqlite::Error) -> Self {
        ScrapeError::Write(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
