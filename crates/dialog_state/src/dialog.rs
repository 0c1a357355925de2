//! Core dialog record types and read-only accessors.
//!
//! The orchestrator owns one `Dialog` per conversation and passes it here by
//! reference. The record keeps two derived sub-sequences (`human_turns`,
//! `bot_turns`) alongside `turns`: they are materialized rather than computed
//! on demand because the window policy slices each list independently.
//! This layer never mutates the orchestrator's record — every transforming
//! operation works on a deep copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DialogStateError, Result};

// ============================================================================
// Speaker
// ============================================================================

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Human,
    Bot,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Human => "human",
            Speaker::Bot => "bot",
        }
    }
}

// ============================================================================
// Utterance text
// ============================================================================

/// A turn's display text.
///
/// Normally a plain string, but the segmented rewrite mode replaces it with
/// the list of segmented sentences, so everything reading `text` downstream
/// must accept both shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UtteranceText {
    Plain(String),
    Segments(Vec<String>),
}

impl UtteranceText {
    /// The plain string form, if this text has not been segmented.
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            UtteranceText::Plain(text) => Some(text),
            UtteranceText::Segments(_) => None,
        }
    }

    /// Whether any part of the text contains the given marker token.
    pub fn contains(&self, marker: &str) -> bool {
        match self {
            UtteranceText::Plain(text) => text.contains(marker),
            UtteranceText::Segments(segments) => segments.iter().any(|s| s.contains(marker)),
        }
    }
}

impl Default for UtteranceText {
    fn default() -> Self {
        UtteranceText::Plain(String::new())
    }
}

impl From<&str> for UtteranceText {
    fn from(text: &str) -> Self {
        UtteranceText::Plain(text.to_string())
    }
}

impl From<String> for UtteranceText {
    fn from(text: String) -> Self {
        UtteranceText::Plain(text)
    }
}

impl From<&UtteranceText> for Value {
    fn from(text: &UtteranceText) -> Self {
        match text {
            UtteranceText::Plain(text) => Value::String(text.clone()),
            UtteranceText::Segments(segments) => Value::Array(
                segments
                    .iter()
                    .map(|s| Value::String(s.clone()))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// Hypothesis
// ============================================================================

/// A candidate bot response — the canonical unit exchanged with skills and
/// selectors. `text` and `confidence` are always present; every other field
/// is additive and only carried when the producing consumer sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_name: Option<String>,
    pub text: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_attributes: Option<serde_json::Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_attributes: Option<serde_json::Map<String, Value>>,
    /// Open-ended named fields some consumers attach (serialized inline).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Hypothesis {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            skill_name: None,
            text: text.into(),
            confidence,
            human_attributes: None,
            bot_attributes: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_skill_name(mut self, skill_name: impl Into<String>) -> Self {
        self.skill_name = Some(skill_name.into());
        self
    }
}

// ============================================================================
// Turn
// ============================================================================

/// One utterance by either speaker, with attached annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: UtteranceText,
    /// Annotator name -> annotator-specific structured output.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Value>,
    /// Candidate responses collected for this turn. Populated on the most
    /// recent turn only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hypotheses: Vec<Hypothesis>,
    /// The skill that produced this bot turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_skill: Option<String>,
    /// The confidence the producing skill attached to this bot turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Turn {
    pub fn human(text: impl Into<UtteranceText>) -> Self {
        Self::new(Speaker::Human, text)
    }

    pub fn bot(text: impl Into<UtteranceText>) -> Self {
        Self::new(Speaker::Bot, text)
    }

    fn new(speaker: Speaker, text: impl Into<UtteranceText>) -> Self {
        Self {
            speaker,
            text: text.into(),
            annotations: BTreeMap::new(),
            hypotheses: Vec::new(),
            active_skill: None,
            confidence: None,
        }
    }

    pub fn with_annotation(mut self, annotator: impl Into<String>, output: Value) -> Self {
        self.annotations.insert(annotator.into(), output);
        self
    }

    pub fn with_hypotheses(mut self, hypotheses: Vec<Hypothesis>) -> Self {
        self.hypotheses = hypotheses;
        self
    }

    pub fn with_active_skill(mut self, skill: impl Into<String>, confidence: f64) -> Self {
        self.active_skill = Some(skill.into());
        self.confidence = Some(confidence);
        self
    }

    /// The named annotator's output on this turn.
    pub fn annotation(&self, annotator: &str) -> Result<&Value> {
        self.annotations.get(annotator).ok_or_else(|| {
            DialogStateError::missing_annotation(
                annotator,
                format!("absent on {} turn", self.speaker.label()),
            )
        })
    }
}

// ============================================================================
// Dialog
// ============================================================================

/// The shared conversation record: all turns in order, plus the per-speaker
/// sub-sequences.
///
/// `human_turns` and `bot_turns` partition `turns` by speaker and preserve
/// the original relative order. A freshly built or re-partitioned dialog
/// keeps the three lists consistent; a windowed copy intentionally may not
/// (see `window::select_window`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    pub turns: Vec<Turn>,
    pub human_turns: Vec<Turn>,
    pub bot_turns: Vec<Turn>,
}

impl Dialog {
    /// Build a dialog from its turn sequence, deriving the speaker partitions.
    pub fn new(turns: Vec<Turn>) -> Self {
        let human_turns = turns
            .iter()
            .filter(|t| t.speaker == Speaker::Human)
            .cloned()
            .collect();
        let bot_turns = turns
            .iter()
            .filter(|t| t.speaker == Speaker::Bot)
            .cloned()
            .collect();
        Self {
            turns,
            human_turns,
            bot_turns,
        }
    }

    pub fn last_turn(&self) -> Result<&Turn> {
        self.turns
            .last()
            .ok_or_else(|| DialogStateError::out_of_range("dialog has no turns"))
    }

    pub fn last_human_turn(&self) -> Result<&Turn> {
        self.human_turns
            .last()
            .ok_or_else(|| DialogStateError::out_of_range("dialog has no human turns"))
    }

    pub fn last_bot_turn(&self) -> Result<&Turn> {
        self.bot_turns
            .last()
            .ok_or_else(|| DialogStateError::out_of_range("dialog has no bot turns"))
    }

    pub fn last_utterance_text(&self) -> Result<&UtteranceText> {
        Ok(&self.last_turn()?.text)
    }

    pub fn last_human_text(&self) -> Result<&UtteranceText> {
        Ok(&self.last_human_turn()?.text)
    }

    pub fn last_bot_text(&self) -> Result<&UtteranceText> {
        Ok(&self.last_bot_turn()?.text)
    }

    /// Hypotheses collected on the most recent turn.
    pub fn last_hypotheses(&self) -> Result<&[Hypothesis]> {
        Ok(&self.last_turn()?.hypotheses)
    }

    /// Texts of the hypotheses collected on the most recent turn.
    pub fn last_hypothesis_texts(&self) -> Result<Vec<String>> {
        Ok(self
            .last_hypotheses()?
            .iter()
            .map(|h| h.text.clone())
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
