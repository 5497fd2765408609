//! Per-exchange conversation state.

use crate::model::Turn;

/// The ordered transcript the loop sends to the model.
///
/// Built from persisted history; the loop only ever appends. The turns it
/// appended are kept separate from the history so they can be handed back
/// for persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    turns: Vec<Turn>,
    history_len: usize,
}

impl ConversationState {
    pub fn new(history: Vec<Turn>) -> Self {
        let history_len = history.len();
        Self {
            turns: history,
            history_len,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Every turn, history first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns appended since construction.
    pub fn appended(&self) -> &[Turn] {
        &self.turns[self.history_len..]
    }

    pub fn into_appended(mut self) -> Vec<Turn> {
        self.turns.split_off(self.history_len)
    }
}
