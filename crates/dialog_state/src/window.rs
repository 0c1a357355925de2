//! Turn-windowing policy: bound the history sent to a downstream consumer.
//!
//! Each of the dialog's three lists is sliced independently from the full
//! original sequence, not re-derived from the truncated `turns`. A human or
//! bot turn can therefore sit inside its sub-list window while falling
//! outside the `turns` window, and vice versa. Downstream consumers were
//! built against that behavior, so it is kept as-is; callers that need a
//! consistent view can re-partition with `Dialog::new(window.turns)`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dialog::{Dialog, Turn};

/// Default bot-turn look-back for annotators and skills.
pub const LAST_N_TURNS: usize = 5;

/// Look-back counts for one windowed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPolicy {
    pub bot_last_turns: usize,
    pub human_last_turns: usize,
    pub total_last_turns: usize,
}

impl WindowPolicy {
    /// Policy derived from a bot-turn count: one extra human turn (the human
    /// speaks first and last), and one combined turn for each of those.
    pub fn last_n_turns(bot_last_turns: usize) -> Self {
        Self {
            bot_last_turns,
            human_last_turns: bot_last_turns + 1,
            total_last_turns: 2 * bot_last_turns + 1,
        }
    }

    pub fn with_human_last_turns(mut self, human_last_turns: usize) -> Self {
        self.human_last_turns = human_last_turns;
        self
    }

    pub fn with_total_last_turns(mut self, total_last_turns: usize) -> Self {
        self.total_last_turns = total_last_turns;
        self
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::last_n_turns(LAST_N_TURNS)
    }
}

/// A copy of the dialog truncated to the policy's look-back counts.
pub fn select_window(dialog: &Dialog, policy: &WindowPolicy) -> Dialog {
    debug!(
        turns = dialog.turns.len(),
        total_last_turns = policy.total_last_turns,
        "selecting dialog window"
    );
    Dialog {
        turns: suffix(&dialog.turns, policy.total_last_turns),
        human_turns: suffix(&dialog.human_turns, policy.human_last_turns),
        bot_turns: suffix(&dialog.bot_turns, policy.bot_last_turns),
    }
}

fn suffix(turns: &[Turn], count: usize) -> Vec<Turn> {
    let start = turns.len().saturating_sub(count);
    turns[start..].to_vec()
}
