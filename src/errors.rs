//!
//! src/errors.rs
//!
//! Defines enums and methods of error conversion
//! for errors the scraper uses
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid track url: {0}")]
    Validation(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status: {0}")]
    Status(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self { ScrapeError::Http(e.to_string()) }
}
