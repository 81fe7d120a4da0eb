//! Quiz interchange documents.
//!
//! Export writes a playlist as the quiz-engine JSON shape with separate
//! `point_fields` (mandatory) and `bonus_fields` arrays. Import is the
//! lenient inverse: a structurally broken document fails, a broken song
//! is skipped with a reason.

use crate::field::{Field, FieldMap};
use crate::track::{Playlist, Track, DEFAULT_EXCERPT_MS};
use crate::{QuizlistError, Result};
use http_types::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One field as it appears in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentField {
    pub key: String,
    pub points: u32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSong {
    pub url: String,
    pub starts_at_ms: u64,
    pub guess_duration_ms: u64,
    pub point_fields: Vec<DocumentField>,
    pub bonus_fields: Vec<DocumentField>,
}

/// The full interchange document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub songs: Vec<DocumentSong>,
}

/// A song the importer refused, with its 1-based position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSong {
    pub position: usize,
    pub reason: String,
}

/// Outcome of an import. Songs that could not be converted are reported
/// here instead of failing the whole document.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub playlist: Playlist,
    pub skipped: Vec<SkippedSong>,
}

/// Extract a video id from a `watch?v=` or `youtu.be/` URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let id = match parsed.host_str()? {
        "www.youtube.com" | "youtube.com" => parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?,
        "youtu.be" => parsed.path().trim_start_matches('/').to_string(),
        _ => return None,
    };
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Canonical watch URL for a video id.
pub fn video_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

fn thumbnail_url(id: &str) -> String {
    format!("https://img.youtube.com/vi/{id}/mqdefault.jpg")
}

/// Render a playlist as an interchange document.
///
/// Mandatory fields become `point_fields`, bonus fields `bonus_fields`,
/// both in the track's field order. Points are fixed at 1 for now.
pub fn export(playlist: &Playlist) -> Document {
    let songs = playlist
        .tracks
        .iter()
        .map(|track| {
            let mut point_fields = Vec::new();
            let mut bonus_fields = Vec::new();
            for field in track.fields.iter() {
                let entry = DocumentField {
                    key: field.key.clone(),
                    points: 1,
                    value: field.value.to_string(),
                };
                if field.mandatory {
                    point_fields.push(entry);
                } else {
                    bonus_fields.push(entry);
                }
            }
            DocumentSong {
                url: video_url(&track.id),
                starts_at_ms: track.start_time_ms,
                guess_duration_ms: track.excerpt_duration_ms(),
                point_fields,
                bonus_fields,
            }
        })
        .collect();

    Document {
        name: playlist.title.clone(),
        songs,
    }
}

/// Serialize a playlist to pretty-printed document JSON.
pub fn export_json(playlist: &Playlist) -> Result<String> {
    serde_json::to_string_pretty(&export(playlist))
        .map_err(|e| QuizlistError::Parse(e.to_string()))
}

fn document_value(field: &Value) -> Option<String> {
    match field.get("value")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn collect_fields(fields: &mut FieldMap, entries: Option<&Vec<Value>>, bonus: bool) {
    let Some(entries) = entries else { return };
    for entry in entries {
        let Some(key) = entry.get("key").and_then(Value::as_str) else {
            continue;
        };
        let Some(value) = document_value(entry) else {
            continue;
        };
        fields.insert(Field::from_key(key, &value, bonus));
    }
}

fn song_to_track(song: &Value, position: usize) -> std::result::Result<Track, String> {
    let url = song
        .get("url")
        .and_then(Value::as_str)
        .ok_or("Missing or invalid URL")?;
    let id = extract_video_id(url).ok_or("Invalid YouTube URL format")?;

    let mut fields = FieldMap::new();
    collect_fields(
        &mut fields,
        song.get("point_fields").and_then(Value::as_array),
        false,
    );
    collect_fields(
        &mut fields,
        song.get("bonus_fields").and_then(Value::as_array),
        true,
    );
    if !fields.contains_key("title") {
        fields.insert(Field::new("Title", &format!("Imported Song {position}"), false));
    }

    let starts_at_ms = song
        .get("starts_at_ms")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let guess_duration_ms = song
        .get("guess_duration_ms")
        .and_then(Value::as_u64)
        .filter(|d| *d > 0)
        .unwrap_or(DEFAULT_EXCERPT_MS);

    Ok(Track {
        thumbnail_url: thumbnail_url(&id),
        id,
        fields,
        start_time_ms: starts_at_ms,
        end_time_ms: starts_at_ms + guess_duration_ms,
    })
}

/// Parse document JSON back into a playlist.
///
/// The document must carry a `name` string and a `songs` array or the
/// whole import fails with [`QuizlistError::InvalidDocument`]. Individual
/// songs degrade softly: a song without a usable URL is skipped and
/// reported. Field labels are rebuilt from keys, so a label that was not
/// simple title case does not survive a round trip.
pub fn import_json(content: &str) -> Result<ImportReport> {
    let document: Value = content
        .parse()
        .map_err(|e| QuizlistError::InvalidDocument(format!("not valid JSON: {e}")))?;

    let name = document
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            QuizlistError::InvalidDocument(
                "expected structure: { name: string, songs: array }".to_string(),
            )
        })?;
    let songs = document
        .get("songs")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            QuizlistError::InvalidDocument(
                "expected structure: { name: string, songs: array }".to_string(),
            )
        })?;

    let mut tracks = Vec::new();
    let mut skipped = Vec::new();
    for (i, song) in songs.iter().enumerate() {
        let position = i + 1;
        match song_to_track(song, position) {
            Ok(track) => tracks.push(track),
            Err(reason) => {
                log::warn!("skipping song {position}: {reason}");
                skipped.push(SkippedSong {
                    position,
                    reason: reason.to_string(),
                });
            }
        }
    }

    Ok(ImportReport {
        playlist: Playlist::new(name, tracks),
        skipped,
    })
}
