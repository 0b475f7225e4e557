//! Durable journal and replay model
//!
//! The journal is the engine's durable sink: every state-changing record is
//! framed, checksummed and fsynced before the engine commits the change in
//! memory. Recovery is a straight replay: the reader walks the journal
//! files validating integrity, and the model folds the records back into
//! the views the engine loads from. Any record the journal accepted is
//! valid to replay, and any in-memory state corresponds to a prefix of the
//! journal.

pub mod journal;
pub mod model;
pub mod queue;
pub mod reader;

pub use journal::{FlushPolicy, FsyncPolicy, JournalConfig, JournalEntry, JournalWriter};
pub use model::JournalModel;
pub use queue::JournalQueue;
pub use reader::JournalReader;
