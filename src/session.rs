//! Session state and the chat orchestrator.
//!
//! A session owns one ordered, append-only conversation history plus
//! the currently selected mode and the currently loaded source
//! document. The orchestrator replays the full history on every model
//! call: a new user turn is recorded before the call is issued, the
//! assistant turn only after a successful reply, so a failed call never
//! leaves an orphaned assistant turn.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::ModelError;
use crate::gateway::ModelGateway;
use crate::library::SourceDocument;
use crate::logging::log_event;
use crate::modes::StudyMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// Explicit history retention.
///
/// The original application resent an ever-growing transcript on every
/// call; that behavior is preserved as [`Unbounded`](Self::Unbounded)
/// (the default) but callers can opt into a cap. A capped session drops
/// the oldest complete user/assistant pairs once the turn count exceeds
/// the cap, never a half pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPolicy {
    Unbounded,
    Capped(usize),
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self::Unbounded
    }
}

/// State for one interactive session. Lifetime is the session itself:
/// created by the serving layer at session start, discarded at session
/// end, reset only by explicit user action. Nothing is persisted and
/// nothing is shared across sessions.
#[derive(Debug, Clone)]
pub struct SessionState {
    turns: Vec<ConversationTurn>,
    mode: StudyMode,
    source: Option<SourceDocument>,
    policy: HistoryPolicy,
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_policy(HistoryPolicy::default())
    }

    pub fn with_policy(policy: HistoryPolicy) -> Self {
        Self {
            turns: Vec::new(),
            mode: StudyMode::OpenChat,
            source: None,
            policy,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: StudyMode) {
        self.mode = mode;
    }

    pub fn source(&self) -> Option<&SourceDocument> {
        self.source.as_ref()
    }

    /// Replace the loaded document wholesale; documents are never
    /// merged.
    pub fn set_source(&mut self, document: SourceDocument) {
        self.source = Some(document);
    }

    /// Explicit user-triggered reset: clears history and the loaded
    /// document, keeps the selected mode.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.source = None;
    }

    pub(crate) fn push_user(&mut self, content: &str) {
        self.push(Role::User, content);
    }

    pub(crate) fn push_assistant(&mut self, content: &str) {
        self.push(Role::Assistant, content);
    }

    fn push(&mut self, role: Role, content: &str) {
        self.turns.push(ConversationTurn {
            role,
            content: content.to_string(),
        });
        if let HistoryPolicy::Capped(cap) = self.policy {
            while self.turns.len() > cap {
                // A failed call can leave a dangling user turn ahead of
                // the next pair; drop it alone so an assistant turn is
                // never stranded without its user turn.
                let take = if self.turns.len() >= 2
                    && self.turns[0].role == Role::User
                    && self.turns[1].role == Role::Assistant
                {
                    2
                } else {
                    1
                };
                self.turns.drain(..take);
            }
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Issues chat calls against the gateway while keeping the session's
/// history invariants.
#[derive(Clone)]
pub struct ChatOrchestrator {
    gateway: ModelGateway,
}

impl ChatOrchestrator {
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Submit a prompt in the context of all prior turns.
    ///
    /// The prompt is appended as a user turn before the call; on success
    /// the reply is appended as the assistant turn, on failure nothing
    /// further is appended and the error is returned for inline display.
    /// Re-submitting after a failure sends the dangling user turn as
    /// prior context along with the new prompt.
    pub async fn ask(
        &self,
        session: &mut SessionState,
        prompt: &str,
    ) -> Result<String, ModelError> {
        let transcript = build_transcript(session.turns(), prompt);
        session.push_user(prompt);
        match self.gateway.generate_text(&transcript).await {
            Ok(reply) => {
                session.push_assistant(&reply);
                Ok(reply)
            }
            Err(err) => {
                log_event(
                    log::Level::Warn,
                    "CHT-0201",
                    "chat",
                    "model call failed; user turn retained",
                    Some(json!({ "error": err.to_string() })),
                );
                Err(err)
            }
        }
    }
}

/// Flatten prior turns plus the new prompt into one transcript, oldest
/// first, in the `ROLE: content` form the model endpoint receives as a
/// single user part.
fn build_transcript(turns: &[ConversationTurn], prompt: &str) -> String {
    let mut sections: Vec<String> = turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label().to_uppercase(), turn.content.trim()))
        .collect();
    sections.push(format!("USER: {}", prompt.trim()));
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GenerativeBackend, RequestPart};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts calls and fails on the scripted call number (1-based).
    struct FlakyBackend {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl GenerativeBackend for FlakyBackend {
        async fn probe(&self, _model: &str) -> Result<(), ModelError> {
            Ok(())
        }

        async fn generate(
            &self,
            _model: &str,
            _system_instruction: &str,
            parts: &[RequestPart],
        ) -> Result<String, ModelError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(call) {
                return Err(ModelError::Generation("quota exceeded".into()));
            }
            let transcript = match &parts[0] {
                RequestPart::Text(text) => text.clone(),
                _ => String::new(),
            };
            Ok(format!("reply {call} to [{transcript}]"))
        }
    }

    async fn orchestrator(fail_on: Option<usize>) -> ChatOrchestrator {
        let backend = Arc::new(FlakyBackend {
            calls: AtomicUsize::new(0),
            fail_on,
        });
        let gateway = ModelGateway::select(backend, &["stub-model"], "sys")
            .await
            .unwrap();
        ChatOrchestrator::new(gateway)
    }

    #[tokio::test]
    async fn n_successful_asks_leave_2n_alternating_turns() {
        let chat = orchestrator(None).await;
        let mut session = SessionState::new();
        for prompt in ["first", "second", "third"] {
            chat.ask(&mut session, prompt).await.unwrap();
        }
        let turns = session.turns();
        assert_eq!(turns.len(), 6);
        for (index, turn) in turns.iter().enumerate() {
            let expected = if index % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected);
        }
        assert_eq!(turns[0].content, "first");
        assert_eq!(turns[4].content, "third");
    }

    #[tokio::test]
    async fn failed_call_leaves_dangling_user_turn_only() {
        let chat = orchestrator(Some(2)).await;
        let mut session = SessionState::new();
        chat.ask(&mut session, "first").await.unwrap();
        let err = chat.ask(&mut session, "second").await.unwrap_err();
        assert!(matches!(err, ModelError::Generation(_)));
        // 2(k-1)+1 turns for a failure at call k=2.
        assert_eq!(session.turns().len(), 3);
        assert_eq!(session.turns()[2].role, Role::User);
        assert_eq!(session.turns()[2].content, "second");
    }

    #[tokio::test]
    async fn transcript_replays_prior_turns_in_order() {
        let chat = orchestrator(None).await;
        let mut session = SessionState::new();
        chat.ask(&mut session, "alef").await.unwrap();
        let reply = chat.ask(&mut session, "bet").await.unwrap();
        // The second call's transcript must contain the first exchange
        // ahead of the new prompt.
        let user_pos = reply.find("USER: alef").unwrap();
        let assistant_pos = reply.find("ASSISTANT: reply 1").unwrap();
        let new_pos = reply.find("USER: bet").unwrap();
        assert!(user_pos < assistant_pos && assistant_pos < new_pos);
    }

    #[tokio::test]
    async fn capped_policy_drops_oldest_complete_pairs() {
        let chat = orchestrator(None).await;
        let mut session = SessionState::with_policy(HistoryPolicy::Capped(4));
        for prompt in ["one", "two", "three", "four"] {
            chat.ask(&mut session, prompt).await.unwrap();
        }
        let turns = session.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "three");
    }

    #[tokio::test]
    async fn capped_trimming_never_strands_an_assistant_turn() {
        // A failure mid-session leaves a dangling user turn; later
        // trimming must drop it as a unit instead of splitting the
        // pair behind it.
        let chat = orchestrator(Some(2)).await;
        let mut session = SessionState::with_policy(HistoryPolicy::Capped(4));
        chat.ask(&mut session, "one").await.unwrap();
        chat.ask(&mut session, "two").await.unwrap_err();
        chat.ask(&mut session, "three").await.unwrap();
        chat.ask(&mut session, "four").await.unwrap();
        let turns = session.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "three");
        for (index, turn) in turns.iter().enumerate() {
            let expected = if index % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected, "turn {index} breaks alternation");
        }
    }

    #[test]
    fn reset_clears_history_and_source_but_keeps_mode() {
        let mut session = SessionState::new();
        session.set_mode(StudyMode::CitationAnalysis);
        session.push_user("hello");
        session.set_source(SourceDocument {
            reference: "Genesis 1:1".into(),
            primary_text: "בראשית".into(),
            translation_text: "In the beginning".into(),
        });
        session.reset();
        assert!(session.turns().is_empty());
        assert!(session.source().is_none());
        assert_eq!(session.mode(), StudyMode::CitationAnalysis);
    }
}
