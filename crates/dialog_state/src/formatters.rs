//! Request formatters: pure functions mapping a dialog record to the exact
//! payload shape each downstream consumer expects.
//!
//! Every formatter returns a one-element outer list. The downstream transport
//! always takes a batch-shaped request, even for a single dialog, so the
//! singleton wrapping happens here rather than at the HTTP edge. The payload
//! field names (`sentences`, `sentences_batch`, `dialogs`, `last_utterances`,
//! `utterances_histories`, `annotation_histories`) are part of the wire
//! contract with specific services and must not be renamed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotations;
use crate::dialog::{Dialog, Turn};
use crate::error::Result;
use crate::rewrite::{rewrite_with_annotations, RewriteMode};
use crate::window::{select_window, WindowPolicy};

/// Extended look-back for consumers that read annotated history.
pub const EXTENDED_LAST_N_TURNS: usize = 10;

// ============================================================================
// Payload shapes
// ============================================================================

/// `{sentences: [..]}` — single utterances and hypothesis listings. Entries
/// are JSON values because some consumers take a segment list where others
/// take a plain string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentencesPayload {
    pub sentences: Vec<Value>,
}

/// `{sentences_batch: [[..], ..]}` — one sentence list per classified item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentencesBatchPayload {
    pub sentences_batch: Vec<Vec<Value>>,
}

/// `{dialogs: [..]}` — whole-dialog payloads for multi-turn consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogsPayload {
    pub dialogs: Vec<Dialog>,
}

/// `{last_utterances: [..]}` — the named-entity consumer contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastUtterancesPayload {
    pub last_utterances: Vec<Value>,
}

/// `{utterances_histories: [..], annotation_histories: [..]}` — parallel
/// per-turn segment text and full annotation maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoriesPayload {
    pub utterances_histories: Vec<Vec<Value>>,
    pub annotation_histories: Vec<Vec<BTreeMap<String, Value>>>,
}

// ============================================================================
// Single-utterance formatters
// ============================================================================

/// `{sentences: [last turn's text]}`.
pub fn last_utt_dialog(dialog: &Dialog) -> Result<Vec<SentencesPayload>> {
    let text = dialog.last_utterance_text()?;
    Ok(sentences(vec![text.into()]))
}

/// `{sentences: [last human turn's text]}`.
pub fn last_human_utt_dialog(dialog: &Dialog) -> Result<Vec<SentencesPayload>> {
    let text = dialog.last_human_text()?;
    Ok(sentences(vec![text.into()]))
}

/// `{sentences: [last bot turn's text]}`.
pub fn last_bot_utt_dialog(dialog: &Dialog) -> Result<Vec<SentencesPayload>> {
    let text = dialog.last_bot_text()?;
    Ok(sentences(vec![text.into()]))
}

// ============================================================================
// Annotation-extraction formatters
// ============================================================================

/// `{sentences: [spelling-preprocessed last human utterance]}`.
pub fn preproc_last_human_utt_dialog(dialog: &Dialog) -> Result<Vec<SentencesPayload>> {
    let text = annotations::spelling_preprocessed(dialog.last_human_turn()?)?;
    Ok(sentences(vec![Value::String(text)]))
}

/// `{sentences: [spelling-preprocessed last bot utterance]}`.
pub fn preproc_last_bot_utt_dialog(dialog: &Dialog) -> Result<Vec<SentencesPayload>> {
    let text = annotations::spelling_preprocessed(dialog.last_bot_turn()?)?;
    Ok(sentences(vec![Value::String(text)]))
}

/// `{sentences: [segments of the last human utterance]}` — the segment list
/// itself is the single sentence entry.
pub fn last_utt_segments_dialog(dialog: &Dialog) -> Result<Vec<SentencesPayload>> {
    let segments = annotations::segments(dialog.last_human_turn()?)?;
    Ok(sentences(vec![string_list(segments)]))
}

/// `{last_utterances: [segments of the last human utterance]}`.
pub fn ner_last_utt_dialog(dialog: &Dialog) -> Result<Vec<LastUtterancesPayload>> {
    let segments = annotations::segments(dialog.last_human_turn()?)?;
    Ok(vec![LastUtterancesPayload {
        last_utterances: vec![string_list(segments)],
    }])
}

// ============================================================================
// Windowed-history formatters
// ============================================================================

/// `{dialogs: [the whole record]}` — no windowing, no rewriting.
pub fn full_dialog(dialog: &Dialog) -> Result<Vec<DialogsPayload>> {
    Ok(dialogs(dialog.clone()))
}

/// Windowed copy with punctuation-restored text, as `{dialogs: [..]}`.
pub fn punct_history_dialog(dialog: &Dialog) -> Result<Vec<DialogsPayload>> {
    rewritten_history(dialog, RewriteMode::Punctuated)
}

/// Windowed copy with segmented text, as `{dialogs: [..]}`.
pub fn segments_history_dialog(dialog: &Dialog) -> Result<Vec<DialogsPayload>> {
    rewritten_history(dialog, RewriteMode::Segmented)
}

/// Windowed copy with sentence-rewritten text, as `{dialogs: [..]}`.
pub fn sent_rewrite_history_dialog(dialog: &Dialog) -> Result<Vec<DialogsPayload>> {
    rewritten_history(dialog, RewriteMode::Rewritten)
}

fn rewritten_history(dialog: &Dialog, mode: RewriteMode) -> Result<Vec<DialogsPayload>> {
    let mut window = select_window(dialog, &WindowPolicy::default());
    rewrite_with_annotations(&mut window, mode)?;
    Ok(dialogs(window))
}

// ============================================================================
// History-with-annotations formatters
// ============================================================================

/// Per-turn segment text and annotation maps over the extended window,
/// including the most recent turn.
pub fn history_with_annotations_dialog(dialog: &Dialog) -> Result<Vec<HistoriesPayload>> {
    annotated_histories(dialog, false)
}

/// Same as [`history_with_annotations_dialog`] but excluding the most recent
/// turn — used by consumers scoring a response against the prior context.
pub fn history_with_annotations_response_dialog(
    dialog: &Dialog,
) -> Result<Vec<HistoriesPayload>> {
    annotated_histories(dialog, true)
}

fn annotated_histories(dialog: &Dialog, exclude_last: bool) -> Result<Vec<HistoriesPayload>> {
    let window = select_window(dialog, &WindowPolicy::last_n_turns(EXTENDED_LAST_N_TURNS));
    let turns: &[Turn] = if exclude_last && !window.turns.is_empty() {
        &window.turns[..window.turns.len() - 1]
    } else {
        &window.turns
    };

    let mut utterances_history = Vec::with_capacity(turns.len());
    let mut annotation_history = Vec::with_capacity(turns.len());
    for turn in turns {
        utterances_history.push(string_list(annotations::segments(turn)?));
        annotation_history.push(turn.annotations.clone());
    }

    Ok(vec![HistoriesPayload {
        utterances_histories: vec![utterances_history],
        annotation_histories: vec![annotation_history],
    }])
}

// ============================================================================
// Hypothesis formatters
// ============================================================================

/// `{sentences: [hypothesis texts]}`.
pub fn hypotheses_list(dialog: &Dialog) -> Result<Vec<SentencesPayload>> {
    let texts = dialog.last_hypothesis_texts()?;
    Ok(vec![SentencesPayload {
        sentences: texts.into_iter().map(Value::String).collect(),
    }])
}

/// `{sentences_batch: [[text], ..]}` — one singleton sentence list per
/// hypothesis, for consumers that classify each candidate independently.
pub fn hypotheses_batch(dialog: &Dialog) -> Result<Vec<SentencesBatchPayload>> {
    let texts = dialog.last_hypothesis_texts()?;
    Ok(vec![SentencesBatchPayload {
        sentences_batch: texts
            .into_iter()
            .map(|text| vec![Value::String(text)])
            .collect(),
    }])
}

// ============================================================================
// Helpers
// ============================================================================

fn sentences(entries: Vec<Value>) -> Vec<SentencesPayload> {
    vec![SentencesPayload { sentences: entries }]
}

fn dialogs(dialog: Dialog) -> Vec<DialogsPayload> {
    vec![DialogsPayload {
        dialogs: vec![dialog],
    }]
}

fn string_list(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}
