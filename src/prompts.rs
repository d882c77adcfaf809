//! Prompt templates for each study mode.
//!
//! Directives and the embedded document content stay separate fields
//! until render time; no mode builds prompts by ad hoc interpolation at
//! its call site.

use serde::{Deserialize, Serialize};

use crate::library::SourceDocument;

/// Fixed persona set once per model handle.
pub const SYSTEM_INSTRUCTION: &str = "\
You are the 'Ohr HaTorah' research engine.
1. Role: analyze Torah texts like a legal scholar.
2. Method: when a user provides a text, analyze the Pshat, Remez, Drash, and Sod where applicable.
3. Tone: professional, academic, and reverent.
4. Format: use structured tables and bullet points.";

/// Fixed directive for the image-transcription mode.
pub const TRANSCRIPTION_DIRECTIVE: &str = "Transcribe this Hebrew/Aramaic text exactly. \
Then provide a translation and a summary of the topic under discussion.";

/// Analysis task chosen by the user in citation-analysis mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisDirective {
    Summarize,
    HalachicConclusion,
    Comparison,
    ModernApplication,
    FreeChat,
}

impl AnalysisDirective {
    pub const ALL: [AnalysisDirective; 5] = [
        Self::Summarize,
        Self::HalachicConclusion,
        Self::Comparison,
        Self::ModernApplication,
        Self::FreeChat,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Summarize => "Summarize & Key Points",
            Self::HalachicConclusion => "Halachic Conclusion (Maskana)",
            Self::Comparison => "Comparison (Rashi vs. Tosafot Logic)",
            Self::ModernApplication => "Modern Application",
            Self::FreeChat => "Free Chat",
        }
    }
}

/// Liturgical-tradition variant for the siddur generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nusach {
    Sephardi,
    Ashkenaz,
    Ari,
}

impl Nusach {
    pub const ALL: [Nusach; 3] = [Self::Sephardi, Self::Ashkenaz, Self::Ari];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sephardi => "Sephardi",
            Self::Ashkenaz => "Ashkenaz",
            Self::Ari => "Ari",
        }
    }
}

/// Prayer offered by the siddur generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prayer {
    Ashrei,
    Amidah,
    Aleinu,
}

impl Prayer {
    pub const ALL: [Prayer; 3] = [Self::Ashrei, Self::Amidah, Self::Aleinu];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ashrei => "Ashrei",
            Self::Amidah => "Amidah",
            Self::Aleinu => "Aleinu",
        }
    }
}

/// Structured prompt for citation-analysis mode: the loaded document and
/// the chosen directive, combined only in [`render`](Self::render).
#[derive(Debug)]
pub struct AnalysisPrompt<'a> {
    pub document: &'a SourceDocument,
    pub directive: AnalysisDirective,
}

impl AnalysisPrompt<'_> {
    pub fn render(&self) -> String {
        format!(
            "Analyze this text: {reference}\n\
             Text Content: {primary}\n{translation}\n\n\
             Task: Perform a '{directive}'.\n\
             If Halacha, cite the Shulchan Aruch rulings related to this passage.\n\
             If Gemara, explain the shakla v'tarya (flow of the argument).",
            reference = self.document.reference,
            primary = self.document.primary_text,
            translation = self.document.translation_text,
            directive = self.directive.label(),
        )
    }
}

/// Prompt for the stateless liturgical generator.
pub fn liturgy_prompt(nusach: Nusach, prayer: Prayer) -> String {
    format!("Write '{}' in Nusach '{}'.", prayer.label(), nusach.label())
}
