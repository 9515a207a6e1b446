use log::{info, warn};
use rayon::prelude::*;

use crate::annotation::Annotation;
use crate::annotation_set::{AnnotationSet, DomainAssignment};
use crate::config::ConsensusConfig;
use crate::errors::{ConsensusError, ConsensusResult};
use crate::store::EvidenceStore;

/// Result of one chain of a batch run.
#[derive(Debug)]
pub struct ChainOutcome {
    pub chain_id: String,
    pub result: ConsensusResult<Vec<DomainAssignment>>,
}

impl ChainOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

///
/// Run the consensus procedure for one chain against `store` and save the
/// resulting layout back to it.
///
/// # Arguments
/// - store: evidence source and sink
/// - chain_id: 5-character `code+chain` id
/// - config: pass parameters
///
pub fn run_chain<S: EvidenceStore + ?Sized>(
    store: &S,
    chain_id: &str,
    config: &ConsensusConfig,
) -> ConsensusResult<Vec<DomainAssignment>> {
    let raf = store
        .raf_for_chain(chain_id)?
        .ok_or_else(|| ConsensusError::MissingRecord(chain_id.to_string()))?;

    let mut set = AnnotationSet::new(chain_id, raf, config.source);
    if let Some(chain_sid) = store.chain_sid(chain_id)? {
        set = set.with_chain_sid(&chain_sid);
    }

    let candidates: Vec<Annotation> = store
        .hits_for_chain(chain_id)?
        .iter()
        .map(|hit| hit.to_annotation(config.data_version))
        .collect();
    set.run(candidates, config)?;

    let assignments = set.assignments();
    store.save_domains(chain_id, &assignments)?;
    Ok(assignments)
}

///
/// Run many independent chains in parallel.
///
/// Each chain gets its own outcome in input order; a failing chain is logged
/// and never affects the others.
///
pub fn run_chains<S: EvidenceStore + ?Sized>(
    store: &S,
    chain_ids: &[String],
    config: &ConsensusConfig,
) -> Vec<ChainOutcome> {
    let outcomes: Vec<ChainOutcome> = chain_ids
        .par_iter()
        .map(|chain_id| {
            let result = run_chain(store, chain_id, config);
            if let Err(e) = &result {
                warn!("{}: {}", chain_id, e);
            }
            ChainOutcome {
                chain_id: chain_id.clone(),
                result,
            }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!("Processed {} chains ({} failed)", outcomes.len(), failed);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::HitRecord;
    use crate::source::EvidenceSource;
    use crate::store::InMemoryStore;
    use asteroids_core::models::Raf;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn chain(code_chain: &str, n: usize) -> Raf {
        let mut line = format!("{:<28}{:<5}{:<5}", code_chain, "1", n);
        for i in 0..n {
            line.push_str(&format!("{:<5}aa", i + 1));
        }
        line.parse().unwrap()
    }

    fn hit(record_id: u64, start: usize, length: usize, log10_e: f64) -> HitRecord {
        HitRecord {
            source: EvidenceSource::Blast,
            record_id,
            query_start: start,
            query_length: length,
            subject: None,
            identities: 0,
            aligned_length: 0,
            log10_e,
            classification_code: String::new(),
            protein_ancestor_id: None,
            species_ancestor_id: None,
            provenance: String::new(),
        }
    }

    #[fixture]
    fn store() -> InMemoryStore {
        InMemoryStore::new()
            .with_raf("1abcA", chain("1abcA", 100))
            .with_hits("1abcA", vec![hit(1, 0, 60, -10.0), hit(2, 50, 50, -5.0)])
            .with_raf("2def_", chain("2def_", 80))
            .with_chain_sid("2def_", "2defz")
            .with_hits("2def_", vec![hit(3, 0, 80, -20.0)])
    }

    #[rstest]
    fn test_run_chain_saves_layout(store: InMemoryStore) {
        let config = ConsensusConfig {
            max_overlap: 5,
            ..ConsensusConfig::default()
        };
        let assignments = run_chain(&store, "1abcA", &config).unwrap();
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].record_id, Some(1));
        assert_eq!(store.saved("1abcA"), Some(assignments));
    }

    #[rstest]
    fn test_run_chain_uses_curated_chain_sid(store: InMemoryStore) {
        let assignments = run_chain(&store, "2def_", &ConsensusConfig::default()).unwrap();
        assert_eq!(assignments[0].sid.as_deref(), Some("e2defz_"));
        assert_eq!(assignments[0].header, "-");
    }

    #[rstest]
    fn test_run_chains_isolates_failures(store: InMemoryStore) {
        let ids = vec!["1abcA".to_string(), "9zzzZ".to_string(), "2def_".to_string()];
        let outcomes = run_chains(&store, &ids, &ConsensusConfig::default());

        let ok: Vec<bool> = outcomes.iter().map(ChainOutcome::is_ok).collect();
        assert_eq!(ok, vec![true, false, true]);
        assert_eq!(outcomes[1].chain_id, "9zzzZ");
        assert!(matches!(outcomes[1].result, Err(ConsensusError::MissingRecord(_))));
    }
}
