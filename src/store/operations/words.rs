use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// A vocabulary word as imported from a source file. Immutable during
/// normal operation; replaced wholesale on re-import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub word: String,
    pub definition: String,
    pub section: Option<String>,
    pub source_file: String,
}

impl Store {
    pub fn upsert_word(&self, word: &Word) -> Result<(), StoreError> {
        let key = keys::word_key(&word.word);
        self.words.insert(key.as_bytes(), Self::serialize(word)?)?;
        Ok(())
    }

    /// Insert words, keeping any existing entry (imports are additive).
    pub fn import_words(&self, words: &[Word]) -> Result<usize, StoreError> {
        let mut count = 0;
        for w in words {
            let key = keys::word_key(&w.word);
            if self.words.get(key.as_bytes())?.is_none() {
                self.words.insert(key.as_bytes(), Self::serialize(w)?)?;
            }
            count += 1;
        }
        Ok(count)
    }

    pub fn get_word(&self, word: &str) -> Result<Option<Word>, StoreError> {
        let key = keys::word_key(word);
        match self.words.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn count_words(&self) -> Result<u64, StoreError> {
        Ok(self.words.len() as u64)
    }

    /// Random sample used to flavor generation prompts.
    pub fn get_enrichment_words(&self, limit: usize) -> Result<Vec<Word>, StoreError> {
        let mut words = Vec::new();
        for item in self.words.iter() {
            let (_, v) = item?;
            words.push(Self::deserialize::<Word>(&v)?);
        }
        let mut rng = rand::thread_rng();
        words.shuffle(&mut rng);
        words.truncate(limit);
        Ok(words)
    }

    pub fn delete_words_by_source(&self, source_file: &str) -> Result<usize, StoreError> {
        let mut removed = 0;
        let mut doomed = Vec::new();
        for item in self.words.iter() {
            let (k, v) = item?;
            let word: Word = Self::deserialize(&v)?;
            if word.source_file == source_file {
                doomed.push(k);
            }
        }
        for k in doomed {
            self.words.remove(k)?;
            removed += 1;
        }
        Ok(removed)
    }
}
