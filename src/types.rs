//!
//! src/types.rs
//!
//! Track record and validated track-page URL key
//!

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ScrapeError;

pub const TRACK_HOST: &str = "open.spotify.com";

/// Canonical key for a track record. Wraps the exact trimmed input line;
/// two spellings of the same page are distinct keys. Deserialization is
/// the trusted path for rows read back from the persisted table: they
/// passed validation when first ingested and are not re-checked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackUrl(String);

impl TrackUrl {
    /// Validate a raw identifier against the track page contract:
    /// `https://open.spotify.com/track/<alphanumeric id>`
    pub fn parse(raw: &str) -> Result<Self, ScrapeError> {
        let raw = raw.trim();
        let url = Url::parse(raw)
            .map_err(|e| ScrapeError::Validation(format!("{raw}: {e}")))?;

        if url.scheme() != "https" {
            return Err(ScrapeError::Validation(format!("{raw}: scheme must be https")));
        }
        match url.host_str() {
            Some(h) if h.eq_ignore_ascii_case(TRACK_HOST) => {}
            _ => return Err(ScrapeError::Validation(
                format!("{raw}: host must be {TRACK_HOST}")
            )),
        }

        let mut segments = url.path_segments()
            .ok_or_else(|| ScrapeError::Validation(format!("{raw}: missing path")))?;
        match (segments.next(), segments.next(), segments.next()) {
            (Some("track"), Some(id), None)
                if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) => {}
            _ => return Err(ScrapeError::Validation(
                format!("{raw}: path must be /track/<id>")
            )),
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attribute set produced by one successful page fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackAttrs {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover: String
}

/// One row of the persisted table. Identity is the url alone; the
/// store enforces that by keying on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    url: TrackUrl,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover: String
}

impl Track {
    /// Fresh record from the input list, attributes still empty.
    pub fn new(url: TrackUrl) -> Self {
        Self::with_attrs(url, TrackAttrs::default())
    }

    pub fn with_attrs(url: TrackUrl, attrs: TrackAttrs) -> Self {
        Self {
            url,
            title: attrs.title,
            artist: attrs.artist,
            album: attrs.album,
            cover: attrs.cover
        }
    }

    pub fn url(&self) -> &TrackUrl {
        &self.url
    }

    /// Artist and title are the minimum a row is useful with.
    pub fn is_complete(&self) -> bool {
        !self.artist.is_empty() && !self.title.is_empty()
    }

    /// Full replace from a successful fetch, never a per-field merge.
    pub fn apply(&mut self, attrs: TrackAttrs) {
        self.title = attrs.title;
        self.artist = attrs.artist;
        self.album = attrs.album;
        self.cover = attrs.cover;
    }
}
