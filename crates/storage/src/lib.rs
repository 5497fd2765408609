//! SQLite-backed transcript storage for Touchline sessions.
//!
//! Every exchange between a user and the assistant appends its turns to a
//! per-session log. The log is append-only; the only destructive operation
//! is clearing a whole session.
//!
//! # Core Concepts
//!
//! - [`TranscriptStore`] wraps a SQLite database and appends or loads records.
//! - [`SessionKey`] names one conversation. Keys never share rows, so
//!   concurrent exchanges for different sessions are independent.
//! - [`Record`] is one stored entry: a kind tag plus a JSON payload. The
//!   store does not interpret payloads; the runtime decides what a turn looks
//!   like.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use storage::{NewRecord, SessionKey, TranscriptStore};
//!
//! let store = TranscriptStore::open("transcripts.db")?;
//! let session = SessionKey::from("alice");
//!
//! store.append(&session, &[NewRecord::new("user", json!({ "text": "Who to captain?" }))])?;
//!
//! for record in store.load(&session)? {
//!     println!("{} {}: {}", record.seq, record.kind, record.data);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod record;
mod store;

pub use error::{Error, Result};
pub use record::{NewRecord, Record, SessionKey};
pub use store::{SessionSummary, TranscriptStore};
