//! End-to-end pipeline: fetch a playlist from canned listing pages, batch
//! enrich it against a canned chat endpoint, export the quiz document and
//! import it back.

use async_trait::async_trait;
use http_client::{HttpClient, Request, Response};
use http_types::StatusCode;
use quizlist::batch::{BatchProcessor, BatchState};
use quizlist::client::ListingClient;
use quizlist::enrich::EnrichmentClient;
use quizlist::field::FieldValue;
use quizlist::persistence::MemoryStorage;
use quizlist::serializer;
use quizlist::session::AuthSession;
use quizlist::AiConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays a fixed queue of JSON bodies, recording request URLs.
#[derive(Debug, Clone, Default)]
struct ScriptedClient {
    bodies: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClient {
    fn new(bodies: &[String]) -> Self {
        Self {
            bodies: Arc::new(Mutex::new(bodies.iter().cloned().collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn send(&self, req: Request) -> Result<Response, http_types::Error> {
        self.requests.lock().unwrap().push(req.url().to_string());
        let body = self.bodies.lock().unwrap().pop_front().ok_or_else(|| {
            http_types::Error::from_str(StatusCode::InternalServerError, "script exhausted")
        })?;
        let mut response = Response::new(StatusCode::Ok);
        response.set_body(body);
        Ok(response)
    }
}

async fn authorized_session() -> AuthSession<MemoryStorage> {
    let mut session = AuthSession::restore(MemoryStorage::new()).await;
    let mut params = HashMap::new();
    params.insert("access_token".to_string(), "tok".to_string());
    params.insert("expires_in".to_string(), "3600".to_string());
    session
        .consume_authorization_fragment(&params)
        .await
        .unwrap();
    session
}

fn listing_pages() -> Vec<String> {
    vec![
        serde_json::json!({
            "items": [{
                "snippet": {
                    "title": "Take On Me",
                    "resourceId": {"videoId": "vid1"},
                    "thumbnails": {"medium": {"url": "https://i.ytimg.com/vi/vid1/mqdefault.jpg"}}
                }
            }],
            "nextPageToken": "p2"
        })
        .to_string(),
        serde_json::json!({
            "items": [{
                "snippet": {
                    "title": "Blue Monday",
                    "resourceId": {"videoId": "vid2"}
                }
            }]
        })
        .to_string(),
    ]
}

fn completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_fetch_enrich_export_import_pipeline() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Fetch: two listing pages joined by a cursor.
    let listing = ScriptedClient::new(&listing_pages());
    let client = ListingClient::with_base_url(
        Box::new(listing.clone()),
        "https://api.test/v3".to_string(),
    );
    let mut session = authorized_session().await;
    let mut tracks = client
        .fetch_playlist_tracks(&mut session, "PL1")
        .await
        .unwrap();
    assert_eq!(tracks.len(), 2);
    assert!(listing.requests.lock().unwrap()[1].contains("pageToken=p2"));

    // Enrich: one completion per track, applied wholesale.
    let chat = ScriptedClient::new(&[
        completion("Title: Take On Me\nArtist: a-ha\nRelease Year: 1985"),
        completion("Title: Blue Monday\nArtist: New Order\nRelease Year: 1983"),
    ]);
    let enricher = EnrichmentClient::new(
        Box::new(chat),
        AiConfig::new("sk-test", "https://ai.test/v1", "gpt-4o-mini"),
    );
    let processor = BatchProcessor::new(enricher).with_pacing(Duration::from_millis(0));
    let summary = processor.run(&mut tracks).await.unwrap();

    assert_eq!(summary.success_titles, vec!["Take On Me", "Blue Monday"]);
    assert!(summary.failures.is_empty());
    assert_eq!(processor.state().await, BatchState::Completed);

    // Export, then import the document back.
    let playlist = quizlist::Playlist::new("Eighties Night", tracks);
    let json = serializer::export_json(&playlist).unwrap();
    let report = serializer::import_json(&json).unwrap();

    assert!(report.skipped.is_empty());
    assert_eq!(report.playlist.title, "Eighties Night");
    assert_eq!(report.playlist.tracks.len(), 2);

    let first = &report.playlist.tracks[0];
    assert_eq!(first.id, "vid1");
    assert_eq!(first.display_title(), "Take On Me");
    let year = first.fields.get("releaseYear").unwrap();
    assert_eq!(year.value, FieldValue::Year(1985));
    assert!(year.mandatory);

    let second = &report.playlist.tracks[1];
    assert_eq!(
        second.fields.get("artist").unwrap().value,
        FieldValue::Text("New Order".to_string())
    );
    // Default excerpt survives the round trip.
    assert_eq!(second.start_time_ms, 0);
    assert_eq!(second.end_time_ms, 30_000);
}
