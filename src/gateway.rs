//! Model Gateway: preference-ordered model selection plus the two
//! generation operations (text, text+image) against a Gemini-style
//! REST endpoint.
//!
//! Transport lives behind the [`GenerativeBackend`] trait so the
//! fallback contract is testable without the network. Every call is a
//! single blocking request from the caller's perspective: no streaming,
//! no retry, the full reply returned as one unit.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64_ENGINE;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::errors::ModelError;
use crate::logging::log_event;
use crate::prompts::SYSTEM_INSTRUCTION;

pub const DEFAULT_MODEL_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Ordered model identifiers tried at initialization; the first one the
/// endpoint accepts is retained for the session's lifetime.
pub const MODEL_PREFERENCES: &[&str] = &["gemini-1.5-pro", "gemini-1.5-flash", "gemini-pro"];

/// An uploaded image forwarded to the vision operation.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One part of a generation request.
#[derive(Debug, Clone)]
pub enum RequestPart {
    Text(String),
    InlineImage(ImageAttachment),
}

/// Transport seam between model selection and the remote endpoint.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Cheap availability check for one model identifier.
    ///
    /// Must distinguish a rejected credential
    /// ([`ModelError::CredentialRejected`], fatal) from an unusable
    /// identifier ([`ModelError::Unavailable`], fallback permitted).
    async fn probe(&self, model: &str) -> Result<(), ModelError>;

    /// Single generation call; any remote failure surfaces as
    /// [`ModelError::Generation`] carrying the remote detail.
    async fn generate(
        &self,
        model: &str,
        system_instruction: &str,
        parts: &[RequestPart],
    ) -> Result<String, ModelError>;
}

/// Live Gemini REST transport.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_MODEL_BASE)
    }

    pub fn with_base_url(
        client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn probe(&self, model: &str) -> Result<(), ModelError> {
        let url = format!(
            "{}/models/{}?key={}",
            self.base_url.trim_end_matches('/'),
            model,
            self.api_key
        );
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ModelError::Unavailable(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(ModelError::CredentialRejected)
        } else {
            Err(ModelError::Unavailable(format!("{model}: HTTP {status}")))
        }
    }

    async fn generate(
        &self,
        model: &str,
        system_instruction: &str,
        parts: &[RequestPart],
    ) -> Result<String, ModelError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            model,
            self.api_key
        );
        let payload = json!({
            "system_instruction": { "parts": [{ "text": system_instruction }] },
            "contents": [{ "role": "user", "parts": render_parts(parts) }],
            "generationConfig": { "temperature": 0.2 },
        });
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| ModelError::Generation(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ModelError::Generation(format!("HTTP {status}: {detail}")));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|err| ModelError::Generation(err.to_string()))?;
        extract_reply(&body)
            .ok_or_else(|| ModelError::Generation("model returned no candidates".into()))
    }
}

fn render_parts(parts: &[RequestPart]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| match part {
            RequestPart::Text(text) => json!({ "text": text }),
            RequestPart::InlineImage(image) => json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": B64_ENGINE.encode(&image.data),
                }
            }),
        })
        .collect()
}

fn extract_reply(body: &Value) -> Option<String> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// A configured model handle: the selected identifier, the backend, and
/// the fixed system instruction. Immutable once constructed; rebuilt
/// only if the API key changes.
#[derive(Clone)]
pub struct ModelGateway {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    system_instruction: String,
}

impl fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelGateway")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ModelGateway {
    /// Initialize against the live endpoint, walking
    /// [`MODEL_PREFERENCES`] until an identifier is accepted.
    pub async fn initialize(client: Client, api_key: &str) -> Result<Self, ModelError> {
        let backend = Arc::new(GeminiBackend::new(client, api_key));
        Self::select(backend, MODEL_PREFERENCES, SYSTEM_INSTRUCTION).await
    }

    /// Retain the first identifier in `preferences` the backend accepts.
    ///
    /// A credential rejection aborts the walk immediately; a bad key
    /// must not masquerade as model unavailability.
    pub async fn select(
        backend: Arc<dyn GenerativeBackend>,
        preferences: &[&str],
        system_instruction: &str,
    ) -> Result<Self, ModelError> {
        let mut last_err: Option<ModelError> = None;
        for candidate in preferences {
            match backend.probe(candidate).await {
                Ok(()) => {
                    log_event(
                        log::Level::Info,
                        "AI-0200",
                        "ai.runtime",
                        "model selected",
                        Some(json!({ "model": candidate })),
                    );
                    return Ok(Self {
                        backend: Arc::clone(&backend),
                        model: (*candidate).to_string(),
                        system_instruction: system_instruction.to_string(),
                    });
                }
                Err(ModelError::CredentialRejected) => {
                    log_event(
                        log::Level::Error,
                        "AI-0202",
                        "ai.runtime",
                        "credential rejected during model selection",
                        None,
                    );
                    return Err(ModelError::CredentialRejected);
                }
                Err(err) => {
                    log_event(
                        log::Level::Warn,
                        "AI-0201",
                        "ai.runtime",
                        "model probe failed, trying next identifier",
                        Some(json!({ "model": candidate, "error": err.to_string() })),
                    );
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ModelError::Unavailable("empty preference list".into())))
    }

    /// Identifier the handle is bound to.
    pub fn model_id(&self) -> &str {
        &self.model
    }

    pub async fn generate_text(&self, prompt: &str) -> Result<String, ModelError> {
        self.backend
            .generate(
                &self.model,
                &self.system_instruction,
                &[RequestPart::Text(prompt.to_string())],
            )
            .await
    }

    pub async fn generate_vision_text(
        &self,
        prompt: &str,
        image: ImageAttachment,
    ) -> Result<String, ModelError> {
        let parts = [
            RequestPart::Text(prompt.to_string()),
            RequestPart::InlineImage(image),
        ];
        self.backend
            .generate(&self.model, &self.system_instruction, &parts)
            .await
    }
}
