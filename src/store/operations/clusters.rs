use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::constants::MIN_CLUSTER_SIZE;
use crate::store::keys;
use crate::store::operations::words::Word;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub word: String,
    pub meaning: String,
    pub distinction: String,
}

/// A curated group of near-synonyms. Entry order is the source-file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub title: String,
    pub preamble: String,
    pub commentary: String,
    pub source_file: String,
    pub entries: Vec<ClusterEntry>,
}

impl Cluster {
    /// Clusters below the minimum size cannot produce a 4-choice question.
    pub fn is_eligible(&self) -> bool {
        self.entries.len() >= MIN_CLUSTER_SIZE
    }

    pub fn entry_for_word(&self, word: &str) -> Option<&ClusterEntry> {
        let needle = word.trim().to_lowercase();
        self.entries
            .iter()
            .find(|e| e.word.trim().to_lowercase() == needle)
    }
}

impl Store {
    /// Upsert clusters by title. Every cluster member is also ensured to
    /// exist in the words tree, using the cluster meaning as definition.
    pub fn import_clusters(&self, clusters: &[Cluster]) -> Result<usize, StoreError> {
        let mut count = 0;
        for c in clusters {
            let key = keys::cluster_key(&c.title);
            self.clusters.insert(key.as_bytes(), Self::serialize(c)?)?;
            for e in &c.entries {
                let wkey = keys::word_key(&e.word);
                if self.words.get(wkey.as_bytes())?.is_none() {
                    let word = Word {
                        word: e.word.clone(),
                        definition: e.meaning.clone(),
                        section: Some(c.title.clone()),
                        source_file: c.source_file.clone(),
                    };
                    self.words.insert(wkey.as_bytes(), Self::serialize(&word)?)?;
                }
            }
            count += 1;
        }
        Ok(count)
    }

    pub fn get_cluster_by_title(&self, title: &str) -> Result<Option<Cluster>, StoreError> {
        let key = keys::cluster_key(title);
        match self.clusters.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get_all_clusters(&self) -> Result<Vec<Cluster>, StoreError> {
        let mut clusters = Vec::new();
        for item in self.clusters.iter() {
            let (_, v) = item?;
            clusters.push(Self::deserialize::<Cluster>(&v)?);
        }
        clusters.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(clusters)
    }

    pub fn count_clusters(&self) -> Result<u64, StoreError> {
        Ok(self.clusters.len() as u64)
    }

    pub fn get_eligible_clusters(&self) -> Result<Vec<Cluster>, StoreError> {
        Ok(self
            .get_all_clusters()?
            .into_iter()
            .filter(Cluster::is_eligible)
            .collect())
    }

    pub fn get_random_eligible_cluster(&self) -> Result<Option<Cluster>, StoreError> {
        let mut eligible = self.get_eligible_clusters()?;
        let mut rng = rand::thread_rng();
        eligible.shuffle(&mut rng);
        Ok(eligible.into_iter().next())
    }

    pub fn delete_clusters_by_source(&self, source_file: &str) -> Result<usize, StoreError> {
        let mut doomed = Vec::new();
        for item in self.clusters.iter() {
            let (k, v) = item?;
            let cluster: Cluster = Self::deserialize(&v)?;
            if cluster.source_file == source_file {
                doomed.push(k);
            }
        }
        let removed = doomed.len();
        for k in doomed {
            self.clusters.remove(k)?;
        }
        Ok(removed)
    }
}
