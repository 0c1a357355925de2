//! Annotation rewriting: swap turn display text for an annotation-derived
//! variant before a dialog copy goes over the wire.
//!
//! Operates in place on a dialog the caller already copied (the windowed-
//! history formatters copy via `select_window` first). The windowed copy's
//! `turns` and sub-lists hold independent clones, so each list is rewritten
//! on its own.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::annotations;
use crate::dialog::{Dialog, UtteranceText};
use crate::error::Result;

/// Which annotation variant replaces the turn text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    /// Punctuation-restored sentence (turns and human turns).
    Punctuated,
    /// Segmented sentences, as a sequence (turns, human and bot turns).
    Segmented,
    /// Most recent entry of the sentence-rewrite history (turns and human
    /// turns).
    Rewritten,
    /// Unrecognized mode string; rewriting becomes a pass-through.
    #[serde(other)]
    Unknown,
}

impl RewriteMode {
    pub fn label(&self) -> &'static str {
        match self {
            RewriteMode::Punctuated => "punctuated",
            RewriteMode::Segmented => "segmented",
            RewriteMode::Rewritten => "rewritten",
            RewriteMode::Unknown => "unknown",
        }
    }
}

/// Replace turn text throughout the dialog with the mode's annotation
/// variant. `Unknown` leaves the dialog untouched.
pub fn rewrite_with_annotations(dialog: &mut Dialog, mode: RewriteMode) -> Result<()> {
    match mode {
        RewriteMode::Punctuated => {
            for turn in dialog.turns.iter_mut().chain(dialog.human_turns.iter_mut()) {
                let text = annotations::punctuated_sentence(turn)?;
                turn.text = UtteranceText::Plain(text);
            }
        }
        RewriteMode::Segmented => {
            for turn in dialog
                .turns
                .iter_mut()
                .chain(dialog.human_turns.iter_mut())
                .chain(dialog.bot_turns.iter_mut())
            {
                let segments = annotations::segments(turn)?;
                turn.text = UtteranceText::Segments(segments);
            }
        }
        RewriteMode::Rewritten => {
            for turn in dialog.turns.iter_mut().chain(dialog.human_turns.iter_mut()) {
                let text = annotations::last_rewritten_sentence(turn)?;
                turn.text = UtteranceText::Plain(text);
            }
        }
        RewriteMode::Unknown => {
            warn!("unknown rewrite mode, leaving dialog text untouched");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{SENTENCE_REWRITE, SENTENCE_SEGMENTATION};
    use crate::dialog::{Dialog, Turn};
    use serde_json::json;

    fn annotated(turn: Turn, raw: &str) -> Turn {
        let punctuated = format!("{raw}.");
        turn.with_annotation(
            SENTENCE_SEGMENTATION,
            json!({"punctuated_sentence": punctuated, "segments": [punctuated]}),
        )
        .with_annotation(
            SENTENCE_REWRITE,
            json!({"rewritten_sentences": [raw, format!("{raw} indeed")]}),
        )
    }

    fn sample_dialog() -> Dialog {
        Dialog::new(vec![
            annotated(Turn::human("hi"), "hi"),
            annotated(Turn::bot("hello"), "hello"),
            annotated(Turn::human("tell me more"), "tell me more"),
        ])
    }

    #[test]
    fn test_punctuated_rewrites_turns_and_human_turns() {
        let mut dialog = sample_dialog();
        rewrite_with_annotations(&mut dialog, RewriteMode::Punctuated).unwrap();
        assert_eq!(dialog.turns[0].text.as_plain(), Some("hi."));
        assert_eq!(dialog.turns[1].text.as_plain(), Some("hello."));
        assert_eq!(dialog.human_turns[1].text.as_plain(), Some("tell me more."));
        // bot sub-list is not part of the punctuated rewrite
        assert_eq!(dialog.bot_turns[0].text.as_plain(), Some("hello"));
    }

    #[test]
    fn test_segmented_rewrites_every_list_to_sequences() {
        let mut dialog = sample_dialog();
        rewrite_with_annotations(&mut dialog, RewriteMode::Segmented).unwrap();
        for turn in dialog
            .turns
            .iter()
            .chain(dialog.human_turns.iter())
            .chain(dialog.bot_turns.iter())
        {
            assert!(matches!(turn.text, UtteranceText::Segments(_)));
        }
        assert_eq!(
            dialog.turns[0].text,
            UtteranceText::Segments(vec!["hi.".to_string()])
        );
    }

    #[test]
    fn test_rewritten_takes_most_recent_history_entry() {
        let mut dialog = sample_dialog();
        rewrite_with_annotations(&mut dialog, RewriteMode::Rewritten).unwrap();
        assert_eq!(dialog.turns[2].text.as_plain(), Some("tell me more indeed"));
    }

    #[test]
    fn test_unknown_mode_is_a_no_op() {
        let mut dialog = sample_dialog();
        let before = dialog.clone();
        rewrite_with_annotations(&mut dialog, RewriteMode::Unknown).unwrap();
        assert_eq!(dialog, before);
    }

    #[test]
    fn test_unknown_mode_deserializes_from_any_string() {
        let mode: RewriteMode = serde_json::from_value(json!("punct_sent_v2")).unwrap();
        assert_eq!(mode, RewriteMode::Unknown);
        let mode: RewriteMode = serde_json::from_value(json!("segmented")).unwrap();
        assert_eq!(mode, RewriteMode::Segmented);
    }

    #[test]
    fn test_missing_annotation_propagates() {
        let mut dialog = Dialog::new(vec![Turn::human("hi")]);
        let err = rewrite_with_annotations(&mut dialog, RewriteMode::Punctuated).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DialogStateError::MissingAnnotation { .. }
        ));
    }
}
