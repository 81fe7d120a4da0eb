//! Metadata enrichment through an OpenAI-compatible chat endpoint.
//!
//! The model is asked for plain `Key: Value` lines rather than JSON; the
//! line parser tolerates whatever else the model says around them. Every
//! accepted proposal field is mandatory, the model never proposes bonus
//! fields.

use crate::config::AiConfig;
use crate::field::{Field, FieldMap};
use crate::track::Track;
use crate::{QuizlistError, Result};
use async_trait::async_trait;
use http_client::{HttpClient, Request};
use http_types::{Method, Url};
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that provides structured information about music videos. Always respond with key-value pairs in the format \"Key: Value\" on separate lines. Be concise and only provide factual information.";

const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 8000;

/// A proposed set of replacement fields for one track.
///
/// `truncated` is set when the model stopped at its token limit; the
/// partial content is still parsed and usable.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub fields: FieldMap,
    pub truncated: bool,
}

/// Seam for metadata lookups, mock-friendly for batch tests.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, track: &Track) -> Result<Enrichment>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Build the user prompt for one track from its current fields.
pub fn build_prompt(track: &Track) -> String {
    let context: Vec<String> = track
        .fields
        .iter()
        .map(|field| format!("{}: {}", field.label, field.value))
        .collect();

    format!(
        "Based on the following information about a music video, please provide additional details that might be useful (such as genre, release year if not provided, album name, movie or video game it was used in, etc.).\n\
        Replace data received in input by data collected on the internet for this song. Try to match the original formatting as much as possible.\n\
        Do not put \"Notes\" in the output fields, the target is to find information about the original song so do not hesitate to overwrite existing fields if you have better information.:\n\
        \n\
        {}\n\
        \n\
        Please respond ONLY with key-value pairs in this exact format:\n\
        Key: [value]\n\
        \n\
        Keep each field on a separate line. Be concise.",
        context.join("\n")
    )
}

/// Parse `Key: Value` lines from model output into a field map.
///
/// Lines without a `:` are ignored, as are lines whose key or value side
/// trims to empty. The value keeps any further `:` characters verbatim.
/// Later lines with the same normalized key replace earlier ones.
pub fn parse_field_lines(content: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    for line in content.lines() {
        let Some((raw_label, raw_value)) = line.split_once(':') else {
            continue;
        };
        let label = raw_label.trim();
        let value = raw_value.trim();
        if label.is_empty() || value.is_empty() {
            continue;
        }
        fields.insert(Field::new(label, value, false));
    }
    fields
}

/// [`Enricher`] over an OpenAI-compatible `/chat/completions` endpoint.
pub struct EnrichmentClient {
    client: Box<dyn HttpClient>,
    config: AiConfig,
}

impl EnrichmentClient {
    pub fn new(client: Box<dyn HttpClient>, config: AiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    async fn request_completion(&self, prompt: &str) -> Result<ChatResponse> {
        let url_str = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let url = Url::parse(&url_str)
            .map_err(|e| QuizlistError::Http(format!("invalid enrichment URL {url_str}: {e}")))?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let mut request = Request::new(Method::Post, url);
        request.insert_header("Content-Type", "application/json");
        let bearer = format!("Bearer {}", self.config.api_key);
        request.insert_header("Authorization", bearer.as_str());
        request.set_body(serde_json::to_string(&body).map_err(|e| {
            QuizlistError::Http(format!("failed to encode enrichment request: {e}"))
        })?);

        let mut response = self
            .client
            .send(request)
            .await
            .map_err(|e| QuizlistError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .body_string()
            .await
            .map_err(|e| QuizlistError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(QuizlistError::EnrichmentRequestFailed {
                status: u16::from(status),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|_| QuizlistError::EnrichmentMalformed)
    }
}

#[async_trait]
impl Enricher for EnrichmentClient {
    async fn enrich(&self, track: &Track) -> Result<Enrichment> {
        let prompt = build_prompt(track);
        log::debug!("requesting enrichment for {}", track.display_title());

        let response = self.request_completion(&prompt).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(QuizlistError::EnrichmentMalformed)?;
        let content = choice
            .message
            .and_then(|m| m.content)
            .ok_or(QuizlistError::EnrichmentMalformed)?;

        let truncated = choice.finish_reason.as_deref() == Some("length");
        if truncated {
            log::warn!(
                "enrichment for {} was cut off at the token limit",
                track.display_title()
            );
        }

        Ok(Enrichment {
            fields: parse_field_lines(&content),
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldType, FieldValue};
    use async_trait::async_trait;
    use http_client::Response;
    use http_types::StatusCode;
    use std::sync::{Arc, Mutex};

    /// Single canned response plus a shared record of the last request.
    #[derive(Debug, Clone)]
    struct CannedClient {
        status: StatusCode,
        body: String,
        last_request: Arc<Mutex<Option<(String, String)>>>,
    }

    impl CannedClient {
        fn new(status: StatusCode, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                last_request: Arc::new(Mutex::new(None)),
            }
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn send(
            &self,
            mut req: Request,
        ) -> std::result::Result<Response, http_types::Error> {
            let url = req.url().to_string();
            let body = req.body_string().await?;
            *self.last_request.lock().unwrap() = Some((url, body));
            let mut response = Response::new(self.status);
            response.set_body(self.body.clone());
            Ok(response)
        }
    }

    fn completion_body(content: &str, finish_reason: &str) -> String {
        serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": content},
                "finish_reason": finish_reason
            }]
        })
        .to_string()
    }

    fn test_config() -> AiConfig {
        AiConfig::new("sk-test", "https://ai.test/v1", "gpt-4o-mini")
    }

    fn sample_track() -> Track {
        let mut track = Track::new("djV11Xbc914", "Take On Me", "");
        track.fields.insert(Field::new("Artist", "a-ha", false));
        track
    }

    #[test]
    fn test_prompt_embeds_existing_fields_as_label_value_lines() {
        let prompt = build_prompt(&sample_track());
        assert!(prompt.contains("Title: Take On Me\nArtist: a-ha"));
        assert!(prompt.contains("Key: [value]"));
    }

    #[test]
    fn test_parse_keeps_colons_inside_values() {
        let fields = parse_field_lines("Album: Hunting High: and Low\nnot a field line");
        assert_eq!(fields.len(), 1);
        let album = fields.get("album").unwrap();
        assert_eq!(album.value, FieldValue::Text("Hunting High: and Low".to_string()));
        assert!(album.mandatory);
    }

    #[test]
    fn test_parse_drops_empty_sides_and_coerces_year() {
        let fields = parse_field_lines("Release Year: 1985\n: orphan value\nGenre:\n");
        assert_eq!(fields.len(), 1);
        let year = fields.get("releaseYear").unwrap();
        assert_eq!(year.field_type, FieldType::Year);
        assert_eq!(year.value, FieldValue::Year(1985));
    }

    #[test]
    fn test_parse_of_chatter_is_empty_not_an_error() {
        assert!(parse_field_lines("I could not find anything about this song.").is_empty());
    }

    #[tokio::test]
    async fn test_enrich_posts_chat_request_and_parses_fields() {
        let client = CannedClient::new(
            StatusCode::Ok,
            &completion_body("Genre: Synth-pop\nRelease Year: 1985", "stop"),
        );
        let enricher = EnrichmentClient::new(Box::new(client), test_config());

        let enrichment = enricher.enrich(&sample_track()).await.unwrap();
        assert!(!enrichment.truncated);
        assert_eq!(enrichment.fields.len(), 2);
        assert_eq!(
            enrichment.fields.get("genre").unwrap().value,
            FieldValue::Text("Synth-pop".to_string())
        );
    }

    #[tokio::test]
    async fn test_enrich_marks_truncated_content_but_still_parses() {
        let client = CannedClient::new(
            StatusCode::Ok,
            &completion_body("Genre: Synth-pop", "length"),
        );
        let enricher = EnrichmentClient::new(Box::new(client), test_config());

        let enrichment = enricher.enrich(&sample_track()).await.unwrap();
        assert!(enrichment.truncated);
        assert_eq!(enrichment.fields.len(), 1);
    }

    #[tokio::test]
    async fn test_enrich_surfaces_endpoint_failure_with_body() {
        let client = CannedClient::new(StatusCode::TooManyRequests, r#"{"error": "rate limited"}"#);
        let enricher = EnrichmentClient::new(Box::new(client), test_config());

        match enricher.enrich(&sample_track()).await {
            Err(QuizlistError::EnrichmentRequestFailed { status: 429, body }) => {
                assert!(body.contains("rate limited"));
            }
            other => panic!("expected EnrichmentRequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_enrich_rejects_response_without_content() {
        let client = CannedClient::new(
            StatusCode::Ok,
            r#"{"choices": [{"finish_reason": "stop"}]}"#,
        );
        let enricher = EnrichmentClient::new(Box::new(client), test_config());

        assert!(matches!(
            enricher.enrich(&sample_track()).await,
            Err(QuizlistError::EnrichmentMalformed)
        ));
    }

    #[tokio::test]
    async fn test_request_carries_model_and_bearer_auth() {
        let client = CannedClient::new(StatusCode::Ok, &completion_body("Genre: Pop", "stop"));
        let handle = client.clone();
        let enricher = EnrichmentClient::new(Box::new(client), test_config());

        enricher.enrich(&sample_track()).await.unwrap();
        let (url, body) = handle.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(url, "https://ai.test/v1/chat/completions");
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["model"], "gpt-4o-mini");
        assert_eq!(parsed["temperature"], 0.3);
        assert_eq!(parsed["max_tokens"], 8000);
        assert_eq!(parsed["messages"][0]["role"], "system");
    }
}
