use super::RemoteFallback;
use crate::config::RemoteConfig;
use crate::errors::RemoteError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Gemini `generateContent` client sending the media inline.
pub struct GeminiFallback {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Inline { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

impl GeminiFallback {
    /// Build a client from config. Fails when no API key is configured.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| RemoteError::Unavailable("no API key configured".to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl RemoteFallback for GeminiFallback {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn ask(
        &self,
        payload: Vec<u8>,
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, RemoteError> {
        info!("uploading {} bytes to {} for duration analysis", payload.len(), self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type,
                            data: STANDARD.encode(&payload),
                        },
                    },
                    Part::Text { text: instruction },
                ],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RemoteError::Unavailable(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Unparseable(format!("invalid response body: {}", e)))?;

        let text: String = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");
        debug!("remote reply: {:?}", text);

        if text.trim().is_empty() {
            return Err(RemoteError::Unparseable(String::new()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> RemoteConfig {
        RemoteConfig {
            endpoint: format!("{}/v1beta/", server.uri()),
            model: "test-model".to_string(),
            api_key: Some("secret".to_string()),
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            GeminiFallback::new(&RemoteConfig::default()),
            Err(RemoteError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_sends_inline_payload_and_reads_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .and(query_param("key", "secret"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [
                    { "inline_data": { "mime_type": "video/mp4", "data": "AQID" } },
                    { "text": "how long?" }
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "12.5" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fallback = GeminiFallback::new(&config(&server)).unwrap();
        let reply = fallback
            .ask(vec![1, 2, 3], "video/mp4", "how long?")
            .await
            .unwrap();
        assert_eq!(reply, "12.5");
    }

    #[tokio::test]
    async fn test_http_failure_is_unavailable_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let fallback = GeminiFallback::new(&config(&server)).unwrap();
        let result = fallback.ask(vec![0], "video/mp4", "how long?").await;
        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_candidates_are_unparseable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let fallback = GeminiFallback::new(&config(&server)).unwrap();
        let result = fallback.ask(vec![0], "video/mp4", "how long?").await;
        assert!(matches!(result, Err(RemoteError::Unparseable(_))));
    }
}
