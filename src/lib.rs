//! Core library for the Chavruta study assistant.
//!
//! Each module is intentionally kept lightweight so that the boundaries
//! between responsibilities remain obvious when exploring the codebase:
//! - [`library`] fetches source texts from the digital library endpoint.
//! - [`calendar`] assembles the daily times and weekly-reading snapshot.
//! - [`gateway`] selects and calls the generative model endpoint.
//! - [`session`] owns the per-session conversation history and the chat
//!   orchestrator.
//! - [`prompts`] holds the structured prompt templates for each mode.
//! - [`modes`] routes user actions to the matching orchestration logic.
//! - [`errors`] keeps the central error catalogue with human friendly
//!   metadata.
//! - [`logging`] emits coded diagnostics through the `log` facade.
//! - [`settings`] resolves the API credential and builds HTTP clients.

pub mod calendar;
pub mod errors;
pub mod gateway;
pub mod library;
pub mod logging;
pub mod modes;
pub mod prompts;
pub mod session;
pub mod settings;

pub use calendar::{CalendarClient, TimesSnapshot};
pub use errors::{LookupError, ModelError, StudyError};
pub use gateway::{ImageAttachment, ModelGateway};
pub use library::{LibraryClient, SourceDocument};
pub use modes::{ResearchTerminal, StudyMode, StudyReply, StudyRequest};
pub use prompts::{AnalysisDirective, Nusach, Prayer};
pub use session::{ChatOrchestrator, ConversationTurn, HistoryPolicy, Role, SessionState};
