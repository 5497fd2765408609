//! Persistence boundary for conversation turns.

use crate::{Error, Result};
use crate::model::Turn;
use std::sync::Arc;
use storage::{NewRecord, SessionKey, TranscriptStore};

/// Loads and appends per-session transcripts.
///
/// Implementations must preserve insertion order. Appends for different
/// sessions are independent.
pub trait Transcripts: Send + Sync {
    fn load_history(&self, session: &SessionKey) -> Result<Vec<Turn>>;

    fn append_turns(&self, session: &SessionKey, turns: &[Turn]) -> Result<()>;
}

impl Transcripts for TranscriptStore {
    fn load_history(&self, session: &SessionKey) -> Result<Vec<Turn>> {
        self.load(session)?
            .iter()
            .map(|record| record.decode::<Turn>().map_err(Error::from))
            .collect()
    }

    fn append_turns(&self, session: &SessionKey, turns: &[Turn]) -> Result<()> {
        let records = turns
            .iter()
            .map(|turn| NewRecord::encode(turn.kind(), turn))
            .collect::<storage::Result<Vec<_>>>()?;
        self.append(session, &records)?;
        Ok(())
    }
}

impl<T: Transcripts + ?Sized> Transcripts for Arc<T> {
    fn load_history(&self, session: &SessionKey) -> Result<Vec<Turn>> {
        (**self).load_history(session)
    }

    fn append_turns(&self, session: &SessionKey, turns: &[Turn]) -> Result<()> {
        (**self).append_turns(session, turns)
    }
}
