use aion_privacy::PrivateNote;
use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;

use super::{NoteStore, sort_oldest_first};

const CF_NOTES: &str = "notes";

/// A thread-safe RocksDB note store. Values are note JSON.
#[derive(Clone)]
pub struct RocksNoteStore {
    db: Arc<DB>,
}

impl RocksNoteStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![ColumnFamilyDescriptor::new(CF_NOTES, Options::default())];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn notes_cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_NOTES)
            .context("Column family 'notes' missing")
    }
}

impl NoteStore for RocksNoteStore {
    fn put(&self, key: &str, note: &PrivateNote) -> Result<()> {
        let cf = self.notes_cf()?;
        let json = note.to_json()?;
        self.db.put_cf(cf, key.as_bytes(), json.as_bytes())?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<PrivateNote>> {
        let cf = self.notes_cf()?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => {
                let raw = std::str::from_utf8(&bytes)
                    .with_context(|| format!("note {key} is not UTF-8"))?;
                Ok(Some(PrivateNote::from_json(raw)?))
            }
            None => Ok(None),
        }
    }

    fn get_all(&self) -> Result<Vec<(String, PrivateNote)>> {
        let cf = self.notes_cf()?;
        let mut notes = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let key = String::from_utf8(key.to_vec()).context("note key is not UTF-8")?;
            let raw = std::str::from_utf8(&value)
                .with_context(|| format!("note {key} is not UTF-8"))?;
            let note = PrivateNote::from_json(raw)
                .with_context(|| format!("note {key} is corrupt"))?;
            notes.push((key, note));
        }
        sort_oldest_first(&mut notes);
        Ok(notes)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let cf = self.notes_cf()?;
        if self.db.get_pinned_cf(cf, key.as_bytes())?.is_none() {
            return Ok(false);
        }
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_privacy::{DenominationTier, NoteEngine, PoseidonHasher};
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, RocksNoteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = RocksNoteStore::open(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_put_get_all_remove() {
        let (_temp_dir, store) = create_test_store();
        let engine = NoteEngine::new(PoseidonHasher::default());
        let note = engine.generate_note(DenominationTier::Tier2).unwrap();
        let key = note.key();

        store.put(&key, &note).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(note.clone()));
        assert_eq!(store.get_all().unwrap(), vec![(key.clone(), note)]);

        assert!(store.remove(&key).unwrap());
        assert!(!store.remove(&key).unwrap());
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_notes_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let engine = NoteEngine::new(PoseidonHasher::default());
        let note = engine.generate_note(DenominationTier::Tier1).unwrap();

        {
            let store = RocksNoteStore::open(temp_dir.path()).unwrap();
            store.put(&note.key(), &note).unwrap();
        }

        let store = RocksNoteStore::open(temp_dir.path()).unwrap();
        let stored = store.get(&note.key()).unwrap().unwrap();
        engine.verify_note(&stored).unwrap();
    }
}
