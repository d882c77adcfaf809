//! Text Lookup Client for the Sefaria-style library endpoint.
//!
//! Given a free-form citation ("Berakhot 2a", "Genesis 1:1") the client
//! fetches the passage and returns the source language, the translation,
//! and the canonical reference. No citation grammar is validated locally
//! and nothing is cached: the remote service is authoritative and every
//! lookup re-fetches.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::errors::LookupError;
use crate::logging::log_event;

pub const DEFAULT_LIBRARY_BASE: &str = "https://www.sefaria.org";

/// One retrieved passage. Replaced wholesale on each successful lookup,
/// never merged with a previous document.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDocument {
    pub reference: String,
    pub primary_text: String,
    pub translation_text: String,
}

#[derive(Clone)]
pub struct LibraryClient {
    client: Client,
    base_url: String,
}

impl LibraryClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_LIBRARY_BASE)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch a passage by citation. Returns [`LookupError`] on any
    /// not-found, network, or parse failure; never partial data.
    pub async fn fetch_source(&self, citation: &str) -> Result<SourceDocument, LookupError> {
        let encoded = citation.trim().replace(' ', "%20");
        let url = format!(
            "{}/api/texts/{}?context=0&pad=0&vhe=1&ven=1",
            self.base_url.trim_end_matches('/'),
            encoded
        );
        let body: Value = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let document = parse_source_document(&body, citation)?;
        log_event(
            log::Level::Info,
            "LIB-0200",
            "library",
            "source retrieved",
            Some(serde_json::json!({ "ref": document.reference })),
        );
        Ok(document)
    }
}

/// Turn a library payload into a [`SourceDocument`].
///
/// The upstream may deliver `he` and `text` as a single string or as an
/// ordered list of passage fragments; lists are flattened into one
/// space-joined string. An `error` key signals not-found regardless of
/// any other fields present.
fn parse_source_document(body: &Value, requested: &str) -> Result<SourceDocument, LookupError> {
    if body.get("error").is_some() {
        return Err(LookupError::NotFound(requested.to_string()));
    }
    let primary = body
        .get("he")
        .and_then(flatten_text_field)
        .ok_or_else(|| LookupError::Parse("missing `he` field".into()))?;
    let translation = body
        .get("text")
        .and_then(flatten_text_field)
        .ok_or_else(|| LookupError::Parse("missing `text` field".into()))?;
    let reference = body
        .get("ref")
        .and_then(Value::as_str)
        .unwrap_or(requested)
        .to_string();
    Ok(SourceDocument {
        reference,
        primary_text: strip_markup(&primary),
        translation_text: strip_markup(&translation),
    })
}

fn flatten_text_field(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten_text_field).collect();
            Some(parts.join(" "))
        }
        _ => None,
    }
}

/// Drop inline markup tags and collapse runs of whitespace. The library
/// decorates passages with span/sup/big tags that would otherwise leak
/// into prompts.
fn strip_markup(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
