use aion_privacy::PrivateNote;
use anyhow::Result;
use dashmap::DashMap;

use super::{NoteStore, sort_oldest_first};

/// Notes held in a concurrent map; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: DashMap<String, PrivateNote>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoteStore for MemoryNoteStore {
    fn put(&self, key: &str, note: &PrivateNote) -> Result<()> {
        self.notes.insert(key.to_string(), note.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<PrivateNote>> {
        Ok(self.notes.get(key).map(|entry| entry.value().clone()))
    }

    fn get_all(&self) -> Result<Vec<(String, PrivateNote)>> {
        let mut notes: Vec<_> = self
            .notes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        sort_oldest_first(&mut notes);
        Ok(notes)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.notes.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_privacy::{DenominationTier, NoteEngine, PoseidonHasher};

    #[test]
    fn test_put_get_remove() {
        let engine = NoteEngine::new(PoseidonHasher::default());
        let store = MemoryNoteStore::new();

        let mut first = engine.generate_note(DenominationTier::Tier0).unwrap();
        first.created_at = 1;
        let mut second = engine.generate_note(DenominationTier::Tier3).unwrap();
        second.created_at = 2;

        store.put(&second.key(), &second).unwrap();
        store.put(&first.key(), &first).unwrap();

        assert_eq!(store.get(&first.key()).unwrap(), Some(first.clone()));
        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1, first);

        assert!(store.remove(&first.key()).unwrap());
        assert!(!store.remove(&first.key()).unwrap());
        assert!(store.get(&first.key()).unwrap().is_none());
        assert_eq!(store.get_all().unwrap().len(), 1);
    }
}
