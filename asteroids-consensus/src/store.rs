use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use fxhash::FxHashMap;

use asteroids_core::models::Raf;
use asteroids_core::utils::{get_dynamic_reader, read_raf_file};

use crate::annotation_set::DomainAssignment;
use crate::hit::HitRecord;
use crate::source::EvidenceSource;

///
/// Read/write access to the evidence database the consensus engine runs
/// against. Chains are addressed by their 5-character `code+chain` id.
///
/// Implementations must tolerate concurrent reads, since independent chains
/// may be processed in parallel.
///
pub trait EvidenceStore: Send + Sync {
    /// Alignment record of a chain.
    fn raf_for_chain(&self, chain_id: &str) -> Result<Option<Raf>>;

    /// Identifier stem for the chain's domains, if one was curated.
    fn chain_sid(&self, chain_id: &str) -> Result<Option<String>>;

    /// Every hit recorded against the chain, in no particular order.
    fn hits_for_chain(&self, chain_id: &str) -> Result<Vec<HitRecord>>;

    /// A single hit by source and record id.
    fn hit(&self, source: EvidenceSource, record_id: u64) -> Result<Option<HitRecord>>;

    /// Persist the finalized domain layout of a chain, replacing any earlier one.
    fn save_domains(&self, chain_id: &str, domains: &[DomainAssignment]) -> Result<()>;
}

///
/// An [EvidenceStore] held entirely in memory, for fixtures and small runs.
///
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rafs: FxHashMap<String, Raf>,
    chain_sids: FxHashMap<String, String>,
    hits: FxHashMap<String, Vec<HitRecord>>,
    saved: Mutex<FxHashMap<String, Vec<DomainAssignment>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    ///
    /// Load a store from an alignment record file and a JSON file mapping
    /// chain ids to lists of hits. Either file may be gzip-compressed.
    ///
    pub fn from_files(raf_path: &Path, hits_path: &Path) -> Result<Self> {
        let rafs = read_raf_file(raf_path)?;
        let reader = get_dynamic_reader(hits_path)?;
        let hits: FxHashMap<String, Vec<HitRecord>> = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse hits from {}", hits_path.display()))?;

        Ok(InMemoryStore {
            rafs,
            hits,
            ..InMemoryStore::default()
        })
    }

    pub fn with_raf(mut self, chain_id: &str, raf: Raf) -> Self {
        self.rafs.insert(chain_id.to_string(), raf);
        self
    }

    pub fn with_chain_sid(mut self, chain_id: &str, sid: &str) -> Self {
        self.chain_sids.insert(chain_id.to_string(), sid.to_string());
        self
    }

    pub fn with_hits(mut self, chain_id: &str, hits: Vec<HitRecord>) -> Self {
        self.hits.entry(chain_id.to_string()).or_default().extend(hits);
        self
    }

    /// Chain ids with an alignment record, sorted.
    pub fn chain_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rafs.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The layout last saved for a chain.
    pub fn saved(&self, chain_id: &str) -> Option<Vec<DomainAssignment>> {
        self.saved.lock().ok()?.get(chain_id).cloned()
    }
}

impl EvidenceStore for InMemoryStore {
    fn raf_for_chain(&self, chain_id: &str) -> Result<Option<Raf>> {
        Ok(self.rafs.get(chain_id).cloned())
    }

    fn chain_sid(&self, chain_id: &str) -> Result<Option<String>> {
        Ok(self.chain_sids.get(chain_id).cloned())
    }

    fn hits_for_chain(&self, chain_id: &str) -> Result<Vec<HitRecord>> {
        Ok(self.hits.get(chain_id).cloned().unwrap_or_default())
    }

    fn hit(&self, source: EvidenceSource, record_id: u64) -> Result<Option<HitRecord>> {
        Ok(self
            .hits
            .values()
            .flatten()
            .find(|hit| hit.source == source && hit.record_id == record_id)
            .cloned())
    }

    fn save_domains(&self, chain_id: &str, domains: &[DomainAssignment]) -> Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| anyhow!("Domain store lock poisoned"))?;
        saved.insert(chain_id.to_string(), domains.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::hit::LEGACY_IDENTITY_VERSION;
    use asteroids_core::models::Region;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use std::path::PathBuf;

    fn hit(source: EvidenceSource, record_id: u64, start: usize, length: usize) -> HitRecord {
        HitRecord {
            source,
            record_id,
            query_start: start,
            query_length: length,
            subject: None,
            identities: 0,
            aligned_length: 0,
            log10_e: -3.0,
            classification_code: String::new(),
            protein_ancestor_id: None,
            species_ancestor_id: None,
            provenance: format!("hit{}", record_id),
        }
    }

    #[fixture]
    fn store() -> InMemoryStore {
        InMemoryStore::new()
            .with_chain_sid("1abcA", "1abca")
            .with_hits(
                "1abcA",
                vec![hit(EvidenceSource::Blast, 1, 0, 40), hit(EvidenceSource::Pfam, 2, 30, 20)],
            )
            .with_hits("2defB", vec![hit(EvidenceSource::Blast, 3, 5, 10)])
    }

    #[rstest]
    fn test_hits_for_chain(store: InMemoryStore) {
        assert_eq!(store.hits_for_chain("1abcA").unwrap().len(), 2);
        assert_eq!(store.hits_for_chain("9zzzZ").unwrap().len(), 0);
        assert_eq!(store.chain_sid("1abcA").unwrap(), Some("1abca".to_string()));
        assert_eq!(store.raf_for_chain("1abcA").unwrap(), None);
    }

    #[rstest]
    fn test_hit_lookup_is_keyed_by_source(store: InMemoryStore) {
        assert_eq!(store.hit(EvidenceSource::Blast, 3).unwrap().map(|h| h.query_start), Some(5));
        assert_eq!(store.hit(EvidenceSource::Pfam, 3).unwrap(), None);
    }

    #[rstest]
    fn test_load_deferred_annotation(store: InMemoryStore) {
        let mut annotation = Annotation::deferred(EvidenceSource::Pfam, 2);
        assert!(!annotation.is_loaded());
        annotation.load(&store, LEGACY_IDENTITY_VERSION).unwrap();
        assert!(annotation.is_loaded());
        assert_eq!(annotation.regions(), &[Region::new(30, 20)]);
        assert_eq!(annotation.provenance, "hit2");

        let mut missing = Annotation::deferred(EvidenceSource::Fam, 2);
        assert!(missing.load(&store, LEGACY_IDENTITY_VERSION).is_err());
    }

    #[rstest]
    fn test_save_domains_replaces(store: InMemoryStore) {
        let first = DomainAssignment {
            sid: Some("e1abcA1".to_string()),
            header: "A:1-40".to_string(),
            regions: vec![Region::new(0, 40)],
            source: EvidenceSource::Blast,
            record_id: Some(1),
        };
        store.save_domains("1abcA", &[first.clone(), first.clone()]).unwrap();
        store.save_domains("1abcA", &[first.clone()]).unwrap();
        assert_eq!(store.saved("1abcA"), Some(vec![first]));
        assert_eq!(store.saved("2defB"), None);
    }

    #[rstest]
    fn test_from_files() {
        let store = InMemoryStore::from_files(
            PathBuf::from("../tests/data/raf/chains.raf").as_path(),
            PathBuf::from("../tests/data/consensus/hits.json").as_path(),
        )
        .unwrap();
        assert_eq!(store.chain_ids(), vec!["1abcA", "2defB", "3xyz_"]);
        assert_eq!(store.hits_for_chain("1abcA").unwrap().len(), 3);
        assert_eq!(store.hits_for_chain("3xyz_").unwrap().len(), 0);
    }
}
