//!
//! src/store.rs
//!
//! Deduplicated track table keyed by url, with merge-on-load,
//! non-destructive ingest and completeness filtering
//!

use std::collections::BTreeMap;

use crate::errors::ScrapeError;
use crate::types::{Track, TrackUrl};

/// Marker for Spotify local-file entries exported by playlists.
/// They have no public track page.
const LOCAL_SEGMENT: &str = "/local/";

/// Trim a raw input line, dropping blanks and local-file entries.
pub fn usable_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.contains(LOCAL_SEGMENT) {
        None
    } else {
        Some(line)
    }
}

/// True when the url list has nothing usable in it. Invalid lines
/// still count as usable; they surface as validation errors instead.
pub fn list_is_empty(input: &str) -> bool {
    input.lines().filter_map(usable_line).next().is_none()
}

#[derive(Debug, Default)]
pub struct TrackStore {
    tracks: BTreeMap<TrackUrl, Track>
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge previously persisted rows. Keys are trusted. The first
    /// insert of a key wins; later duplicates never overwrite it.
    pub fn load(&mut self, rows: impl IntoIterator<Item = Track>) {
        for track in rows {
            self.tracks.entry(track.url().clone()).or_insert(track);
        }
    }

    /// Validate raw input lines and add new keys with empty attributes.
    /// Existing records are left untouched. Returns the validation
    /// failures; they never stop ingestion.
    pub fn ingest<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) ->
        Vec<ScrapeError> {

        let mut errors = Vec::new();
        for line in lines.into_iter().filter_map(usable_line) {
            match TrackUrl::parse(line) {
                Ok(url) => {
                    self.tracks.entry(url.clone()).or_insert_with(|| Track::new(url));
                }
                Err(e) => errors.push(e)
            }
        }
        errors
    }

    /// Drop every row still missing artist or title.
    pub fn prune_incomplete(&mut self) {
        self.tracks.retain(|_, track| track.is_complete());
    }

    pub fn get(&self, url: &TrackUrl) -> Option<&Track> {
        self.tracks.get(url)
    }

    pub fn get_mut(&mut self, url: &TrackUrl) -> Option<&mut Track> {
        self.tracks.get_mut(url)
    }

    /// Key snapshot in iteration order, for the fetch loop to walk
    /// while records get mutated.
    pub fn urls(&self) -> Vec<TrackUrl> {
        self.tracks.keys().cloned().collect()
    }

    /// Records in key order, stable for the life of the store.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
