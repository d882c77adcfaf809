//! Central error catalogue for the study-assistant core.
//!
//! Failures from the read-only lookup services and from the generative
//! model are kept as separate types because callers treat them
//! differently: lookup failures never touch the session, model failures
//! may trigger fallback at initialization but never mid-session. The
//! mode dispatcher folds both into [`StudyError`], which is what a UI
//! renders inline.

use thiserror::Error;

/// Failure from the library or calendar lookup clients.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("source not found: {0}")]
    NotFound(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("malformed upstream response: {0}")]
    Parse(String),
}

impl LookupError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "LKP-1001",
            Self::Network(_) => "LKP-1002",
            Self::Parse(_) => "LKP-1003",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "The remote library has no entry for the requested reference.",
            Self::Network(_) => "The lookup request could not reach the remote service.",
            Self::Parse(_) => "The remote service answered with a payload we could not read.",
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else if err.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            Self::NotFound(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Failure from the generative-model gateway.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The endpoint rejected the API key. Fatal: trying further model
    /// identifiers would only mask a configuration problem.
    #[error("the model service rejected the API credential")]
    CredentialRejected,
    /// The model identifier could not be used; the next identifier in
    /// the preference list may be tried.
    #[error("model unavailable: {0}")]
    Unavailable(String),
    /// A per-call generation failure carrying the remote error detail.
    #[error("generation failed: {0}")]
    Generation(String),
}

impl ModelError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CredentialRejected => "AI-1001",
            Self::Unavailable(_) => "AI-1002",
            Self::Generation(_) => "AI-1003",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::CredentialRejected => "The configured API key was refused by the model service.",
            Self::Unavailable(_) => "No generative model could be initialised from the preference list.",
            Self::Generation(_) => "The model call failed; the session remains usable.",
        }
    }
}

/// Unified error surfaced by the mode dispatcher.
#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("no API key is configured")]
    MissingApiKey,
    #[error("no source text is loaded; retrieve a citation first")]
    NoSourceLoaded,
}

impl StudyError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Lookup(err) => err.code(),
            Self::Model(err) => err.code(),
            Self::MissingApiKey => "CFG-1001",
            Self::NoSourceLoaded => "STD-1001",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::Lookup(err) => err.explain(),
            Self::Model(err) => err.explain(),
            Self::MissingApiKey => {
                "Model-dependent modes are disabled until an API key is supplied."
            }
            Self::NoSourceLoaded => {
                "Analysis needs a retrieved source document in the session."
            }
        }
    }

    /// Inline message a UI shows at the triggering action. Never used to
    /// terminate the session.
    pub fn user_message(&self) -> String {
        match self {
            Self::Lookup(LookupError::NotFound(reference)) => {
                format!("Source '{reference}' was not found in the digital library.")
            }
            Self::Lookup(err) => format!("Lookup failed: {err}"),
            Self::Model(ModelError::CredentialRejected) => {
                "The model service rejected your API key. Check the credential and try again."
                    .to_string()
            }
            Self::Model(err) => format!("The model call failed: {err}"),
            Self::MissingApiKey => {
                "Enter an API key to enable analysis, transcription, and chat.".to_string()
            }
            Self::NoSourceLoaded => {
                "Retrieve a source text before requesting an analysis.".to_string()
            }
        }
    }
}
