//! Canonical annotator names and typed extraction over the per-turn
//! annotation maps.
//!
//! Annotation payloads stay open-ended JSON on the record; the helpers here
//! pull out the handful of fields this layer actually reads. A helper fails
//! with `MissingAnnotation` both when the annotator never ran and when its
//! output does not carry the expected field — either way the upstream
//! pipeline broke its ordering contract.

use serde_json::Value;

use crate::dialog::Turn;
use crate::error::{DialogStateError, Result};

/// Sentence segmentation annotator: `{punctuated_sentence, segments}`.
pub const SENTENCE_SEGMENTATION: &str = "sentence_segmentation";
/// Spelling preprocessing annotator: a corrected plain string.
pub const SPELLING_PREPROCESSING: &str = "spelling_preprocessing";
/// Intent catcher annotator: `{<intent>: {detected}}` per intent.
pub const INTENT_CATCHER: &str = "intent_catcher";
/// Speech recognition annotator: `{confidence_level}`.
pub const ASR: &str = "asr";
/// Sentence rewriting annotator: `{rewritten_sentences: [..]}` history.
pub const SENTENCE_REWRITE: &str = "sentence_rewrite";

const PUNCTUATED_SENTENCE: &str = "punctuated_sentence";
const SEGMENTS: &str = "segments";
const REWRITTEN_SENTENCES: &str = "rewritten_sentences";
const CONFIDENCE_LEVEL: &str = "confidence_level";
const DETECTED: &str = "detected";

/// The punctuation-restored sentence from the segmentation annotator.
pub fn punctuated_sentence(turn: &Turn) -> Result<String> {
    let output = turn.annotation(SENTENCE_SEGMENTATION)?;
    output
        .get(PUNCTUATED_SENTENCE)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| field_error(SENTENCE_SEGMENTATION, PUNCTUATED_SENTENCE))
}

/// The segmented sentences from the segmentation annotator.
pub fn segments(turn: &Turn) -> Result<Vec<String>> {
    let output = turn.annotation(SENTENCE_SEGMENTATION)?;
    let segments = output
        .get(SEGMENTS)
        .and_then(Value::as_array)
        .ok_or_else(|| field_error(SENTENCE_SEGMENTATION, SEGMENTS))?;
    segments
        .iter()
        .map(|s| {
            s.as_str()
                .map(str::to_string)
                .ok_or_else(|| field_error(SENTENCE_SEGMENTATION, SEGMENTS))
        })
        .collect()
}

/// The spelling-corrected form of the turn's text.
pub fn spelling_preprocessed(turn: &Turn) -> Result<String> {
    let output = turn.annotation(SPELLING_PREPROCESSING)?;
    output
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| field_error(SPELLING_PREPROCESSING, "string output"))
}

/// The most recent entry of the sentence-rewrite history.
pub fn last_rewritten_sentence(turn: &Turn) -> Result<String> {
    let output = turn.annotation(SENTENCE_REWRITE)?;
    output
        .get(REWRITTEN_SENTENCES)
        .and_then(Value::as_array)
        .and_then(|history| history.last())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| field_error(SENTENCE_REWRITE, REWRITTEN_SENTENCES))
}

/// The transcription confidence level reported by speech recognition.
pub fn asr_confidence_level(turn: &Turn) -> Result<String> {
    let output = turn.annotation(ASR)?;
    output
        .get(CONFIDENCE_LEVEL)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| field_error(ASR, CONFIDENCE_LEVEL))
}

/// Whether the intent catcher flagged the named intent on this turn.
///
/// Absence of the annotator, the intent, or the flag all read as "not
/// detected" — this is a flag probe, not a pipeline-ordering check.
pub fn intent_detected(turn: &Turn, intent: &str) -> bool {
    turn.annotations
        .get(INTENT_CATCHER)
        .and_then(|output| output.get(intent))
        .and_then(|entry| entry.get(DETECTED))
        .map(truthy)
        .unwrap_or(false)
}

// Intent catchers report `detected` as a bool or as 0/1.
fn truthy(value: &Value) -> bool {
    value.as_bool().unwrap_or(false) || value.as_i64().unwrap_or(0) != 0
}

fn field_error(annotator: &str, field: &str) -> DialogStateError {
    DialogStateError::missing_annotation(annotator, format!("output lacks `{field}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn annotated_turn() -> Turn {
        Turn::human("lets chat how are you")
            .with_annotation(
                SENTENCE_SEGMENTATION,
                json!({
                    "punctuated_sentence": "Let's chat. How are you?",
                    "segments": ["Let's chat.", "How are you?"]
                }),
            )
            .with_annotation(SPELLING_PREPROCESSING, json!("let us chat how are you"))
            .with_annotation(
                SENTENCE_REWRITE,
                json!({"rewritten_sentences": ["let's chat", "let's chat. how are you?"]}),
            )
            .with_annotation(ASR, json!({"confidence_level": "high"}))
            .with_annotation(INTENT_CATCHER, json!({"repeat": {"detected": 0}}))
    }

    #[test]
    fn test_segmentation_fields() {
        let turn = annotated_turn();
        assert_eq!(
            punctuated_sentence(&turn).unwrap(),
            "Let's chat. How are you?"
        );
        assert_eq!(
            segments(&turn).unwrap(),
            vec!["Let's chat.".to_string(), "How are you?".to_string()]
        );
    }

    #[test]
    fn test_spelling_and_rewrite() {
        let turn = annotated_turn();
        assert_eq!(
            spelling_preprocessed(&turn).unwrap(),
            "let us chat how are you"
        );
        assert_eq!(
            last_rewritten_sentence(&turn).unwrap(),
            "let's chat. how are you?"
        );
    }

    #[test]
    fn test_asr_confidence_level() {
        let turn = annotated_turn();
        assert_eq!(asr_confidence_level(&turn).unwrap(), "high");
    }

    #[test]
    fn test_intent_detected_is_a_soft_probe() {
        let turn = annotated_turn();
        assert!(!intent_detected(&turn, "repeat"));
        assert!(!intent_detected(&turn, "topic_switching"));

        let flagged = Turn::human("what")
            .with_annotation(INTENT_CATCHER, json!({"repeat": {"detected": 1}}));
        assert!(intent_detected(&flagged, "repeat"));

        let flagged_bool = Turn::human("what")
            .with_annotation(INTENT_CATCHER, json!({"repeat": {"detected": true}}));
        assert!(intent_detected(&flagged_bool, "repeat"));
    }

    #[test]
    fn test_missing_annotator_errors() {
        let bare = Turn::human("hi");
        assert!(matches!(
            punctuated_sentence(&bare),
            Err(DialogStateError::MissingAnnotation { .. })
        ));
        assert!(matches!(
            spelling_preprocessed(&bare),
            Err(DialogStateError::MissingAnnotation { .. })
        ));
    }

    #[test]
    fn test_malformed_annotation_output_errors() {
        let wrong_shape = Turn::human("hi")
            .with_annotation(SENTENCE_SEGMENTATION, json!({"segments": "not a list"}));
        assert!(matches!(
            segments(&wrong_shape),
            Err(DialogStateError::MissingAnnotation { .. })
        ));
        assert!(matches!(
            punctuated_sentence(&wrong_shape),
            Err(DialogStateError::MissingAnnotation { .. })
        ));
    }
}
