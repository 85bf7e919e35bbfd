//!
//! src/persistent.rs
//!
//! Defines module for persisting the track table as a CSV file;
//! saves rewrite the whole table atomically
//!

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ScrapeError;
use crate::types::{Track, TrackAttrs, TrackUrl};

/// Column order matches the historical table layout.
const COLUMNS: [&str; 5] = ["title", "artist", "album", "cover", "url"];

/// Deserializing the url column is the trusted path: rows in the
/// table passed validation when they were first ingested.
#[derive(Debug, Serialize, Deserialize)]
struct TrackRow {
    title: String,
    artist: String,
    album: String,
    cover: String,
    url: TrackUrl
}

impl From<&Track> for TrackRow {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            cover: track.cover.clone(),
            url: track.url().clone()
        }
    }
}

/// Read the persisted table. A missing file is an empty table; any
/// other failure, including a partial row, is fatal.
pub fn load_tracks(path: &Path) -> Result<Vec<Track>, ScrapeError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no prior table");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into())
    };

    let mut reader = csv::Reader::from_reader(file);
    let mut tracks = Vec::new();
    for row in reader.deserialize::<TrackRow>() {
        let row = row?;
        tracks.push(Track::with_attrs(
            row.url,
            TrackAttrs {
                title: row.title,
                artist: row.artist,
                album: row.album,
                cover: row.cover
            }
        ));
    }

    debug!(path = %path.display(), rows = tracks.len(), "table loaded");
    Ok(tracks)
}

/// Rewrite the whole table: header plus every row goes to a tempfile
/// next to the destination, which is then persisted over it.
pub fn save_tracks<'a>(
    path: &Path,
    tracks: impl IntoIterator<Item = &'a Track>
) -> Result<(), ScrapeError> {

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new(".")
    };
    let temp = tempfile::NamedTempFile::new_in(dir)?;

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file());
        writer.write_record(COLUMNS)?;
        for track in tracks {
            writer.serialize(TrackRow::from(track))?;
        }
        writer.flush()?;
    }

    temp.persist(path).map_err(|e| ScrapeError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(raw: &str, title: &str, artist: &str, album: &str, cover: &str) -> Track {
        Track::with_attrs(TrackUrl::parse(raw).unwrap(), TrackAttrs {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            cover: cover.into()
        })
    }

    #[test]
    fn missing_file_is_an_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let tracks = load_tracks(&dir.path().join("absent.csv")).unwrap();
        assert!(tracks.is_empty());
    }

    #[test]
    fn round_trip_preserves_keys_and_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");

        // Commas and quotes must survive the trip.
        let saved = vec![
            track(
                "https://open.spotify.com/track/AAA111",
                "Hello, \"World\"",
                "Artist, The",
                "Album",
                "https://i.scdn.co/image/abc"
            ),
            track(
                "https://open.spotify.com/track/BBB222",
                "Title",
                "Artist",
                "",
                ""
            ),
        ];
        save_tracks(&path, &saved).unwrap();

        let loaded = load_tracks(&path).unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn save_replaces_prior_content_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");

        save_tracks(&path, &[
            track("https://open.spotify.com/track/AAA111", "T", "A", "", ""),
            track("https://open.spotify.com/track/BBB222", "T", "A", "", ""),
        ]).unwrap();
        save_tracks(&path, &[
            track("https://open.spotify.com/track/CCC333", "T", "A", "", ""),
        ]).unwrap();

        let loaded = load_tracks(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].url().as_str(), "https://open.spotify.com/track/CCC333");
    }

    #[test]
    fn empty_table_still_gets_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");

        save_tracks(&path, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "title,artist,album,cover,url\n");
        assert!(load_tracks(&path).unwrap().is_empty());
    }

    #[test]
    fn partial_row_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        std::fs::write(
            &path,
            "title,artist,album,cover,url\nonly,two\n"
        ).unwrap();

        assert!(matches!(load_tracks(&path), Err(ScrapeError::Csv(_))));
    }
}
