//! Mode dispatcher: routes a user-selected study mode to the matching
//! orchestration logic.
//!
//! A [`ResearchTerminal`] is the explicit per-session object the serving
//! layer creates at session start and discards at session end. Modes
//! share only the model gateway and the session state; every failure is
//! converted to a [`StudyError`] for inline display and never
//! terminates the session.

use serde::Serialize;
use serde_json::json;

use crate::calendar::{CalendarClient, TimesSnapshot};
use crate::errors::StudyError;
use crate::gateway::{ImageAttachment, ModelGateway};
use crate::library::{LibraryClient, SourceDocument};
use crate::logging::log_event;
use crate::prompts::{
    liturgy_prompt, AnalysisDirective, AnalysisPrompt, Nusach, Prayer, TRANSCRIPTION_DIRECTIVE,
};
use crate::session::{ChatOrchestrator, SessionState};
use crate::settings;

/// The four mutually exclusive study modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StudyMode {
    CitationAnalysis,
    ImageTranscription,
    LiturgicalGeneration,
    OpenChat,
}

/// One user action submitted at a UI submission point.
#[derive(Debug)]
pub enum StudyRequest {
    /// Retrieve a citation and load it as the session's source document.
    Lookup { citation: String },
    /// Analyze the loaded source document with a chosen directive.
    Analyze { directive: AnalysisDirective },
    /// Transcribe, translate, and explain an uploaded page image.
    Transcribe { image: ImageAttachment },
    /// Generate a prayer text for a tradition variant. Stateless.
    GenerateLiturgy { nusach: Nusach, prayer: Prayer },
    /// Free-form chat through the session orchestrator.
    Chat { prompt: String },
    /// Refresh the times/parsha dashboard for a postal code.
    Dashboard { postal_code: String },
}

/// Reply rendered by the serving layer.
#[derive(Debug, Serialize)]
pub enum StudyReply {
    Source(SourceDocument),
    Analysis(String),
    Transcription(String),
    Liturgy(String),
    ChatReply(String),
    Times(TimesSnapshot),
}

/// Per-session aggregate of the orchestration components.
///
/// `chat` is `None` when no API key was available; the lookup clients
/// stay usable either way.
pub struct ResearchTerminal {
    chat: Option<ChatOrchestrator>,
    library: LibraryClient,
    calendar: CalendarClient,
    session: SessionState,
}

impl ResearchTerminal {
    /// Build a terminal for one interactive session against the live
    /// endpoints. Model initialization walks the preference list; a
    /// missing key merely disables the model-dependent modes.
    pub async fn start(api_key: Option<String>) -> Result<Self, StudyError> {
        let client = settings::http_client(settings::DEFAULT_TIMEOUT)
            .map_err(|err| crate::errors::LookupError::Network(err.to_string()))?;
        let chat = match settings::resolve_api_key(api_key) {
            Some(key) => {
                let gateway = ModelGateway::initialize(client.clone(), &key).await?;
                Some(ChatOrchestrator::new(gateway))
            }
            None => {
                log_event(
                    log::Level::Info,
                    "CFG-0001",
                    "terminal",
                    "no API key configured; model modes disabled",
                    None,
                );
                None
            }
        };
        Ok(Self::from_parts(
            chat,
            LibraryClient::new(client.clone()),
            CalendarClient::new(client),
        ))
    }

    /// Assemble a terminal from preconstructed components. Serving
    /// layers use this to inject alternate endpoints or transports.
    pub fn from_parts(
        chat: Option<ChatOrchestrator>,
        library: LibraryClient,
        calendar: CalendarClient,
    ) -> Self {
        Self {
            chat,
            library,
            calendar,
            session: SessionState::new(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Explicit user-triggered session reset.
    pub fn reset_session(&mut self) {
        self.session.reset();
    }

    /// Which model identifier the session is bound to, if any.
    pub fn model_id(&self) -> Option<&str> {
        self.chat.as_ref().map(|chat| chat.gateway().model_id())
    }

    /// Route one request to its mode's orchestration logic.
    pub async fn dispatch(&mut self, request: StudyRequest) -> Result<StudyReply, StudyError> {
        match request {
            StudyRequest::Lookup { citation } => {
                self.session.set_mode(StudyMode::CitationAnalysis);
                let document = self.library.fetch_source(&citation).await?;
                self.session.set_source(document.clone());
                Ok(StudyReply::Source(document))
            }
            StudyRequest::Analyze { directive } => {
                self.session.set_mode(StudyMode::CitationAnalysis);
                let chat = self.require_model()?.clone();
                let document = self.session.source().ok_or(StudyError::NoSourceLoaded)?;
                let prompt = AnalysisPrompt {
                    document,
                    directive,
                }
                .render();
                let analysis = chat.gateway().generate_text(&prompt).await?;
                Ok(StudyReply::Analysis(analysis))
            }
            StudyRequest::Transcribe { image } => {
                self.session.set_mode(StudyMode::ImageTranscription);
                let chat = self.require_model()?;
                // No history persists across images.
                let text = chat
                    .gateway()
                    .generate_vision_text(TRANSCRIPTION_DIRECTIVE, image)
                    .await?;
                Ok(StudyReply::Transcription(text))
            }
            StudyRequest::GenerateLiturgy { nusach, prayer } => {
                self.session.set_mode(StudyMode::LiturgicalGeneration);
                let chat = self.require_model()?;
                let text = chat
                    .gateway()
                    .generate_text(&liturgy_prompt(nusach, prayer))
                    .await?;
                Ok(StudyReply::Liturgy(text))
            }
            StudyRequest::Chat { prompt } => {
                self.session.set_mode(StudyMode::OpenChat);
                let chat = self.require_model()?.clone();
                let reply = chat.ask(&mut self.session, &prompt).await?;
                Ok(StudyReply::ChatReply(reply))
            }
            StudyRequest::Dashboard { postal_code } => {
                let snapshot = self.calendar.fetch_times(&postal_code).await?;
                log_event(
                    log::Level::Info,
                    "TRM-0200",
                    "terminal",
                    "dashboard refreshed",
                    Some(json!({ "zip": postal_code })),
                );
                Ok(StudyReply::Times(snapshot))
            }
        }
    }

    fn require_model(&self) -> Result<&ChatOrchestrator, StudyError> {
        self.chat.as_ref().ok_or(StudyError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ModelError;
    use crate::gateway::{GenerativeBackend, RequestPart};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct CannedBackend;

    #[async_trait]
    impl GenerativeBackend for CannedBackend {
        async fn probe(&self, _model: &str) -> Result<(), ModelError> {
            Ok(())
        }

        async fn generate(
            &self,
            _model: &str,
            _system_instruction: &str,
            parts: &[RequestPart],
        ) -> Result<String, ModelError> {
            let has_image = parts
                .iter()
                .any(|part| matches!(part, RequestPart::InlineImage(_)));
            Ok(if has_image {
                "transcription".to_string()
            } else {
                "generated".to_string()
            })
        }
    }

    fn offline_terminal(chat: Option<ChatOrchestrator>) -> ResearchTerminal {
        let client = reqwest::Client::new();
        ResearchTerminal::from_parts(
            chat,
            LibraryClient::new(client.clone()),
            CalendarClient::new(client),
        )
    }

    async fn model_terminal() -> ResearchTerminal {
        let gateway = ModelGateway::select(Arc::new(CannedBackend), &["stub-model"], "sys")
            .await
            .unwrap();
        offline_terminal(Some(ChatOrchestrator::new(gateway)))
    }

    #[tokio::test]
    async fn model_modes_fail_without_key_and_session_survives() {
        let mut terminal = offline_terminal(None);
        let err = terminal
            .dispatch(StudyRequest::Chat {
                prompt: "hello".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::MissingApiKey));
        assert!(terminal.session().turns().is_empty());

        let err = terminal
            .dispatch(StudyRequest::GenerateLiturgy {
                nusach: Nusach::Ari,
                prayer: Prayer::Ashrei,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::MissingApiKey));
        assert!(terminal.model_id().is_none());
    }

    #[tokio::test]
    async fn analyze_without_loaded_source_is_rejected() {
        let mut terminal = model_terminal().await;
        let err = terminal
            .dispatch(StudyRequest::Analyze {
                directive: AnalysisDirective::Summarize,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::NoSourceLoaded));
    }

    #[tokio::test]
    async fn chat_mode_records_history_through_the_orchestrator() {
        let mut terminal = model_terminal().await;
        let reply = terminal
            .dispatch(StudyRequest::Chat {
                prompt: "shalom".into(),
            })
            .await
            .unwrap();
        assert!(matches!(reply, StudyReply::ChatReply(_)));
        assert_eq!(terminal.session().turns().len(), 2);
        assert_eq!(terminal.session().mode(), StudyMode::OpenChat);
    }

    #[tokio::test]
    async fn transcription_sends_the_image_and_keeps_history_empty() {
        let mut terminal = model_terminal().await;
        let reply = terminal
            .dispatch(StudyRequest::Transcribe {
                image: ImageAttachment {
                    mime_type: "image/jpeg".into(),
                    data: vec![0xFF, 0xD8],
                },
            })
            .await
            .unwrap();
        match reply {
            StudyReply::Transcription(text) => assert_eq!(text, "transcription"),
            other => panic!("unexpected reply: {other:?}"),
        }
        assert!(terminal.session().turns().is_empty());
    }

    #[tokio::test]
    async fn liturgy_generation_is_stateless() {
        let mut terminal = model_terminal().await;
        for _ in 0..2 {
            let reply = terminal
                .dispatch(StudyRequest::GenerateLiturgy {
                    nusach: Nusach::Sephardi,
                    prayer: Prayer::Amidah,
                })
                .await
                .unwrap();
            assert!(matches!(reply, StudyReply::Liturgy(_)));
        }
        assert!(terminal.session().turns().is_empty());
        assert_eq!(
            terminal.session().mode(),
            StudyMode::LiturgicalGeneration
        );
    }
}
