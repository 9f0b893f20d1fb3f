//! Note storage.
//!
//! The note engine forgets what it generates; the service keeps notes here
//! until the depositor withdraws and deletes them.

use aion_privacy::PrivateNote;
use anyhow::Result;

pub mod db;
pub mod memory;

pub use db::RocksNoteStore;
pub use memory::MemoryNoteStore;

/// Key/value store for private notes, keyed by `aion_note_<8 hex>`
pub trait NoteStore: Send + Sync {
    fn put(&self, key: &str, note: &PrivateNote) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<PrivateNote>>;

    /// All notes, oldest first
    fn get_all(&self) -> Result<Vec<(String, PrivateNote)>>;

    /// Returns whether a note was removed
    fn remove(&self, key: &str) -> Result<bool>;
}

fn sort_oldest_first(notes: &mut [(String, PrivateNote)]) {
    notes.sort_by(|(ka, a), (kb, b)| a.created_at.cmp(&b.created_at).then_with(|| ka.cmp(kb)));
}
