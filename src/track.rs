use crate::field::{Field, FieldMap, FieldValue};
use serde::{Deserialize, Serialize};

/// Default length of the playback excerpt in milliseconds.
pub const DEFAULT_EXCERPT_MS: u64 = 30_000;

/// A playlist entry: an external video id plus its dynamic field map and a
/// user-selected playback excerpt.
///
/// After creation the field map always contains a `title` entry, seeded
/// from the source listing or a synthesized placeholder on import. Batch
/// enrichment may later replace the map wholesale, so code displaying a
/// track falls back to the id when the title is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// External video identifier
    pub id: String,
    /// Thumbnail image URL from the listing (or reconstructed on import)
    pub thumbnail_url: String,
    /// Dynamic per-track metadata
    pub fields: FieldMap,
    /// Excerpt start, milliseconds from the beginning of the video
    pub start_time_ms: u64,
    /// Excerpt end, milliseconds; always greater than `start_time_ms`
    pub end_time_ms: u64,
}

impl Track {
    /// Create a track with the title field seeded and the default excerpt
    /// of `[0, 30000)` milliseconds.
    pub fn new(id: impl Into<String>, title: &str, thumbnail_url: impl Into<String>) -> Self {
        let mut fields = FieldMap::new();
        fields.insert(Field::new("Title", title, false));
        Self {
            id: id.into(),
            thumbnail_url: thumbnail_url.into(),
            fields,
            start_time_ms: 0,
            end_time_ms: DEFAULT_EXCERPT_MS,
        }
    }

    /// The track's display title: the `title` field's value, falling back
    /// to the video id when the field is absent.
    pub fn display_title(&self) -> String {
        match self.fields.get("title").map(|f| &f.value) {
            Some(FieldValue::Text(text)) if !text.is_empty() => text.clone(),
            Some(value @ FieldValue::Year(_)) => value.to_string(),
            _ => self.id.clone(),
        }
    }

    /// Set the playback excerpt. Returns `false` (leaving the track
    /// untouched) when the range is empty or reversed.
    pub fn set_excerpt(&mut self, start_ms: u64, end_ms: u64) -> bool {
        if end_ms <= start_ms {
            return false;
        }
        self.start_time_ms = start_ms;
        self.end_time_ms = end_ms;
        true
    }

    /// Length of the excerpt in milliseconds.
    pub fn excerpt_duration_ms(&self) -> u64 {
        self.end_time_ms - self.start_time_ms
    }
}

/// An ordered collection of tracks in source/listing order.
///
/// The sequence is user-mutable by deletion only; tracks are never
/// reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub title: String,
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(title: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            title: title.into(),
            tracks,
        }
    }

    /// Remove the track with the given id. Returns `true` if one was
    /// removed.
    pub fn remove_track(&mut self, id: &str) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|t| t.id != id);
        self.tracks.len() != before
    }

    pub fn get_track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn get_track_mut(&mut self, id: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }
}
