//! Removal of spurious clarification exchanges before windowing.
//!
//! When speech recognition mishears the user, the misheard-ASR fallback skill
//! answers with a "please repeat" style turn, and the user says the same
//! thing again. Those bot turns carry no conversational content and would
//! poison any consumer reading recent history, so they are dropped from the
//! copy handed downstream.

use tracing::debug;

use crate::annotations;
use crate::dialog::{Dialog, Speaker, Turn};

/// Fallback skill that answers when the transcription was not understood.
pub const MISHEARD_SKILL: &str = "misheard_asr";
/// Marker token embedded in repeat-request bot responses.
pub const REPEAT_MARKER: &str = "#+#repeat";

const REPEAT_INTENT: &str = "repeat";
const VERY_LOW_CONFIDENCE: &str = "very_low";

/// A copy of the dialog with anomalous bot turns removed.
///
/// A bot turn is dropped when it is anomalous (produced by the misheard
/// fallback skill at full confidence, or carrying the repeat marker), it sits
/// strictly inside the dialog, and the most recent kept turn before it is a
/// human turn flagged as a repeat request or a very-low-confidence
/// transcription. Checking the kept turn rather than the raw predecessor
/// means a run of anomalous bot turns after one flagged human turn is dropped
/// whole in a single pass. Human turns are always kept. The speaker sub-lists
/// are re-partitioned from the pruned `turns`, so the result is internally
/// consistent, and re-running the pruner is a no-op.
pub fn remove_anomalous_turns(dialog: &Dialog) -> Dialog {
    let total = dialog.turns.len();
    let mut kept: Vec<Turn> = Vec::with_capacity(total);

    for (index, turn) in dialog.turns.iter().enumerate() {
        if turn.speaker == Speaker::Human {
            kept.push(turn.clone());
            continue;
        }
        let interior = index > 0 && index + 1 < total;
        let after_flagged_human = kept.last().map(preceding_human_flagged).unwrap_or(false);
        if interior && is_anomalous(turn) && after_flagged_human {
            debug!(index, "dropping anomalous bot turn");
            continue;
        }
        kept.push(turn.clone());
    }

    Dialog::new(kept)
}

fn is_anomalous(turn: &Turn) -> bool {
    let misheard_fallback = turn.active_skill.as_deref() == Some(MISHEARD_SKILL)
        && turn.confidence.map(|c| c >= 1.0).unwrap_or(false);
    misheard_fallback || turn.text.contains(REPEAT_MARKER)
}

fn preceding_human_flagged(turn: &Turn) -> bool {
    if turn.speaker != Speaker::Human {
        return false;
    }
    annotations::intent_detected(turn, REPEAT_INTENT) || has_very_low_asr_confidence(turn)
}

fn has_very_low_asr_confidence(turn: &Turn) -> bool {
    annotations::asr_confidence_level(turn)
        .map(|level| level == VERY_LOW_CONFIDENCE)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{ASR, INTENT_CATCHER};
    use serde_json::json;

    fn low_confidence_human(text: &str) -> Turn {
        Turn::human(text).with_annotation(ASR, json!({"confidence_level": "very_low"}))
    }

    fn misheard_bot(text: &str) -> Turn {
        Turn::bot(text).with_active_skill(MISHEARD_SKILL, 1.0)
    }

    #[test]
    fn test_misheard_exchange_is_pruned() {
        let dialog = Dialog::new(vec![
            low_confidence_human("hi"),
            misheard_bot("#+#repeat sorry?"),
            Turn::human("hi"),
        ]);
        let pruned = remove_anomalous_turns(&dialog);
        assert_eq!(pruned.turns.len(), 2);
        assert!(pruned.turns.iter().all(|t| t.speaker == Speaker::Human));
        assert_eq!(pruned.human_turns.len(), 2);
        assert!(pruned.bot_turns.is_empty());
    }

    #[test]
    fn test_repeat_intent_also_triggers_pruning() {
        let flagged = Turn::human("what did you say")
            .with_annotation(INTENT_CATCHER, json!({"repeat": {"detected": 1}}));
        let dialog = Dialog::new(vec![
            Turn::human("tell me a story"),
            Turn::bot("once upon a time"),
            flagged,
            Turn::bot("sorry? #+#repeat"),
            Turn::human("a story please"),
        ]);
        let pruned = remove_anomalous_turns(&dialog);
        assert_eq!(pruned.turns.len(), 4);
        assert_eq!(pruned.bot_turns.len(), 1);
        assert_eq!(pruned.bot_turns[0].text.as_plain(), Some("once upon a time"));
    }

    #[test]
    fn test_unflagged_human_keeps_bot_turn() {
        let dialog = Dialog::new(vec![
            Turn::human("hi"),
            misheard_bot("#+#repeat sorry?"),
            Turn::human("hi"),
        ]);
        let pruned = remove_anomalous_turns(&dialog);
        assert_eq!(pruned, dialog);
    }

    #[test]
    fn test_first_and_last_turns_are_never_pruned() {
        // Anomalous bot turn at the end of the dialog stays: the exchange is
        // still open and the orchestrator may need it for the next request.
        let dialog = Dialog::new(vec![
            low_confidence_human("hi"),
            misheard_bot("#+#repeat sorry?"),
        ]);
        let pruned = remove_anomalous_turns(&dialog);
        assert_eq!(pruned, dialog);
    }

    #[test]
    fn test_consecutive_anomalous_bot_turns_pruned_in_one_pass() {
        // A badly misheard exchange can stack several fallback answers before
        // the user gets through; the whole run goes at once.
        let dialog = Dialog::new(vec![
            low_confidence_human("hi"),
            misheard_bot("#+#repeat sorry?"),
            misheard_bot("#+#repeat say that again?"),
            Turn::human("hi"),
        ]);
        let once = remove_anomalous_turns(&dialog);
        assert_eq!(once.turns.len(), 2);
        assert!(once.turns.iter().all(|t| t.speaker == Speaker::Human));
        assert!(once.bot_turns.is_empty());
        assert_eq!(remove_anomalous_turns(&once), once);
    }

    #[test]
    fn test_pruning_is_idempotent() {
        let dialog = Dialog::new(vec![
            low_confidence_human("hi"),
            misheard_bot("#+#repeat sorry?"),
            Turn::human("hi"),
            Turn::bot("hello!"),
            low_confidence_human("how are you"),
            misheard_bot("could you repeat that? #+#repeat"),
            Turn::human("how are you"),
        ]);
        let once = remove_anomalous_turns(&dialog);
        let twice = remove_anomalous_turns(&once);
        assert_eq!(once, twice);
        assert_eq!(once.bot_turns.len(), 1);
    }

    #[test]
    fn test_normal_dialog_is_untouched() {
        let dialog = Dialog::new(vec![
            Turn::human("hi"),
            Turn::bot("hello").with_active_skill("chitchat", 0.8),
            Turn::human("how are you"),
        ]);
        assert_eq!(remove_anomalous_turns(&dialog), dialog);
    }
}
