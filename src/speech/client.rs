//! HTTP client for the local AivisSpeech engine
//!
//! Synthesis is a two-step exchange: `audio_query` returns a query object,
//! the caller adjusts `speedScale` on it and posts it back to `synthesis`,
//! which answers with WAV bytes.

use crate::speech::voice::{Speaker, StyleId};
use crate::{Result, YomiageError};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Fixed address of the local engine
pub const TTS_BASE_URL: &str = "http://127.0.0.1:10101";

/// Operations of the engine used by the read-aloud workflow
#[async_trait]
pub trait SpeechApi: Send + Sync {
    /// `GET /speakers`
    async fn speakers(&self) -> Result<Vec<Speaker>>;

    /// `POST /initialize_speaker`
    async fn initialize_speaker(&self, style_id: StyleId) -> Result<()>;

    /// `POST /audio_query`
    async fn audio_query(&self, text: &str, style_id: StyleId) -> Result<Value>;

    /// `POST /synthesis`
    async fn synthesis(&self, style_id: StyleId, query: &Value) -> Result<Vec<u8>>;
}

/// Run the query-then-synthesize exchange for one piece of text.
pub async fn synthesize(
    api: &dyn SpeechApi,
    text: &str,
    style_id: StyleId,
    speed: f64,
) -> Result<Vec<u8>> {
    let mut query = api.audio_query(text, style_id).await?;

    let fields = query.as_object_mut().ok_or_else(|| {
        YomiageError::ServiceUnavailable("audio_query did not return an object".into())
    })?;
    fields.insert("speedScale".to_string(), json!(speed));

    api.synthesis(style_id, &query).await
}

/// reqwest-backed [`SpeechApi`]
#[derive(Clone, Debug)]
pub struct HttpSpeechClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSpeechClient {
    /// Create a client for the engine at [`TTS_BASE_URL`]
    pub fn new() -> Result<Self> {
        Self::with_base_url(TTS_BASE_URL)
    }

    /// Create a client for an engine at another address
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| YomiageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn unavailable(context: &str, e: reqwest::Error) -> YomiageError {
    YomiageError::ServiceUnavailable(format!("{}: {}", context, e))
}

fn check_status(context: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(YomiageError::ServiceUnavailable(format!(
            "{} returned HTTP {}",
            context, status
        )))
    }
}

#[async_trait]
impl SpeechApi for HttpSpeechClient {
    async fn speakers(&self) -> Result<Vec<Speaker>> {
        let response = self
            .client
            .get(self.url("/speakers"))
            .send()
            .await
            .map_err(|e| unavailable("speakers", e))?;

        let speakers: Vec<Speaker> = check_status("speakers", response)?
            .json()
            .await
            .map_err(|e| unavailable("speakers", e))?;

        debug!("Engine lists {} speakers", speakers.len());
        Ok(speakers)
    }

    async fn initialize_speaker(&self, style_id: StyleId) -> Result<()> {
        let response = self
            .client
            .post(self.url("/initialize_speaker"))
            .query(&[
                ("speaker", style_id.to_string()),
                ("skip_reinit", "false".to_string()),
            ])
            .send()
            .await
            .map_err(|e| unavailable("initialize_speaker", e))?;

        check_status("initialize_speaker", response)?;
        Ok(())
    }

    async fn audio_query(&self, text: &str, style_id: StyleId) -> Result<Value> {
        let response = self
            .client
            .post(self.url("/audio_query"))
            .query(&[("text", text.to_string()), ("speaker", style_id.to_string())])
            .send()
            .await
            .map_err(|e| unavailable("audio_query", e))?;

        check_status("audio_query", response)?
            .json()
            .await
            .map_err(|e| unavailable("audio_query", e))
    }

    async fn synthesis(&self, style_id: StyleId, query: &Value) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.url("/synthesis"))
            .query(&[("speaker", style_id.to_string())])
            .json(query)
            .send()
            .await
            .map_err(|e| unavailable("synthesis", e))?;

        let bytes = check_status("synthesis", response)?
            .bytes()
            .await
            .map_err(|e| unavailable("synthesis", e))?;

        debug!("Synthesized {} bytes with style {}", bytes.len(), style_id);
        Ok(bytes.to_vec())
    }
}
