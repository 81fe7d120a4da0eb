//! Token-authenticated, cursor-paginated listing fetches.
//!
//! [`ListingClient`] drains every page of a YouTube Data API listing into
//! one ordered collection. Playlist listings and playlist-item listings
//! differ only in query shape; the pagination loop is shared.

use crate::persistence::StateStorage;
use crate::session::{AuthSession, AuthToken};
use crate::track::{Playlist, Track};
use crate::{QuizlistError, Result};
use http_client::{HttpClient, Request};
use http_types::{Method, Url};
use serde::Deserialize;
use serde_json::Value;

/// Default YouTube Data API v3 base URL.
pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

const PAGE_SIZE: u32 = 50;

/// One query against a listing endpoint: a path plus its fixed parameters.
///
/// The page cursor is appended by the pagination loop, never stored here.
#[derive(Debug, Clone)]
pub struct ListingQuery {
    path: String,
    params: Vec<(String, String)>,
}

impl ListingQuery {
    /// The user's own playlists.
    pub fn playlists() -> Self {
        Self {
            path: "/playlists".to_string(),
            params: vec![
                ("part".to_string(), "snippet".to_string()),
                ("mine".to_string(), "true".to_string()),
                ("maxResults".to_string(), PAGE_SIZE.to_string()),
            ],
        }
    }

    /// The items of one playlist.
    pub fn playlist_items(playlist_id: &str) -> Self {
        Self {
            path: "/playlistItems".to_string(),
            params: vec![
                ("part".to_string(), "snippet".to_string()),
                ("playlistId".to_string(), playlist_id.to_string()),
                ("maxResults".to_string(), PAGE_SIZE.to_string()),
            ],
        }
    }

    fn url(&self, base_url: &str, page_token: Option<&str>) -> String {
        let mut query: Vec<String> = self
            .params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect();
        if let Some(token) = page_token {
            query.push(format!("pageToken={}", urlencoding::encode(token)));
        }
        format!("{}{}?{}", base_url, self.path, query.join("&"))
    }
}

/// A playlist as it appears in the user's collection listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    id: String,
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: String,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemResource {
    snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemSnippet {
    title: String,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
    #[serde(rename = "resourceId")]
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    fn best_url(self) -> Option<String> {
        self.medium.or(self.default).map(|t| t.url)
    }
}

/// Client for the cursor-paginated listing endpoints.
pub struct ListingClient {
    client: Box<dyn HttpClient>,
    base_url: String,
}

impl ListingClient {
    /// Create a client against the default YouTube Data API base URL.
    pub fn new(client: Box<dyn HttpClient>) -> Self {
        Self::with_base_url(client, YOUTUBE_API_BASE.to_string())
    }

    /// Create a client with a custom base URL, used by tests.
    pub fn with_base_url(client: Box<dyn HttpClient>, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Drain every page of a listing into one ordered item collection.
    ///
    /// Items are appended in page order with no reordering or dedup. A page
    /// with no recognizable `items` array contributes nothing but does not
    /// stop pagination while a `nextPageToken` is present. Any transport or
    /// non-success response aborts the whole operation; no partial result
    /// is returned. Fails with [`QuizlistError::Unauthorized`] before any
    /// network call when the session has no valid token.
    pub async fn fetch_all<S: StateStorage>(
        &self,
        session: &mut AuthSession<S>,
        query: &ListingQuery,
    ) -> Result<Vec<Value>> {
        let token = session
            .current_token()
            .await
            .ok_or(QuizlistError::Unauthorized)?;

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let url = query.url(&self.base_url, page_token.as_deref());
            let page = self.get_json(&url, &token).await?;

            match page.get("items").and_then(Value::as_array) {
                Some(page_items) => items.extend(page_items.iter().cloned()),
                None => log::debug!("listing page carried no items array"),
            }

            page_token = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }

        log::debug!("listing drained, {} items", items.len());
        Ok(items)
    }

    /// Fetch the user's playlist collection.
    pub async fn fetch_playlists<S: StateStorage>(
        &self,
        session: &mut AuthSession<S>,
    ) -> Result<Vec<PlaylistSummary>> {
        let raw = self.fetch_all(session, &ListingQuery::playlists()).await?;
        Ok(raw
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<PlaylistResource>(item) {
                Ok(resource) => Some(PlaylistSummary {
                    id: resource.id,
                    title: resource.snippet.title,
                    thumbnail_url: resource
                        .snippet
                        .thumbnails
                        .and_then(Thumbnails::best_url)
                        .unwrap_or_default(),
                }),
                Err(e) => {
                    log::warn!("skipping unrecognizable playlist entry: {e}");
                    None
                }
            })
            .collect())
    }

    /// Fetch the tracks of one playlist, seeding each track's title field
    /// from the listing snippet.
    pub async fn fetch_playlist_tracks<S: StateStorage>(
        &self,
        session: &mut AuthSession<S>,
        playlist_id: &str,
    ) -> Result<Vec<Track>> {
        let raw = self
            .fetch_all(session, &ListingQuery::playlist_items(playlist_id))
            .await?;
        Ok(raw
            .into_iter()
            .filter_map(
                |item| match serde_json::from_value::<PlaylistItemResource>(item) {
                    Ok(resource) => {
                        let video_id = resource.snippet.resource_id.video_id?;
                        let thumbnail = resource
                            .snippet
                            .thumbnails
                            .and_then(Thumbnails::best_url)
                            .unwrap_or_default();
                        Some(Track::new(video_id, &resource.snippet.title, thumbnail))
                    }
                    Err(e) => {
                        log::warn!("skipping unrecognizable playlist item: {e}");
                        None
                    }
                },
            )
            .collect())
    }

    /// Fetch a playlist's tracks and assemble the model.
    pub async fn fetch_playlist<S: StateStorage>(
        &self,
        session: &mut AuthSession<S>,
        summary: &PlaylistSummary,
    ) -> Result<Playlist> {
        let tracks = self.fetch_playlist_tracks(session, &summary.id).await?;
        Ok(Playlist::new(summary.title.clone(), tracks))
    }

    async fn get_json(&self, url: &str, token: &AuthToken) -> Result<Value> {
        let url = Url::parse(url).map_err(|e| QuizlistError::FetchFailed {
            status: None,
            message: format!("invalid listing URL: {e}"),
        })?;
        let mut request = Request::new(Method::Get, url);
        let bearer = format!("Bearer {}", token.access_token);
        request.insert_header("Authorization", bearer.as_str());
        request.insert_header("Accept", "application/json");

        let mut response =
            self.client
                .send(request)
                .await
                .map_err(|e| QuizlistError::FetchFailed {
                    status: None,
                    message: e.to_string(),
                })?;

        let status = response.status();
        let body = response
            .body_string()
            .await
            .map_err(|e| QuizlistError::FetchFailed {
                status: Some(u16::from(status)),
                message: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(QuizlistError::FetchFailed {
                status: Some(u16::from(status)),
                message: format!("listing endpoint returned {status}: {body}"),
            });
        }

        serde_json::from_str(&body).map_err(|e| QuizlistError::FetchFailed {
            status: Some(u16::from(status)),
            message: format!("unparseable listing page: {e}"),
        })
    }
}
