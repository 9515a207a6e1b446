use std::path::{Path, PathBuf};

use asteroids::consensus::{
    AnnotationSet, ConsensusConfig, DomainAssignment, EvidenceSource, EvidenceStore, InMemoryStore,
    run_chains,
};
use asteroids::core::models::Region;
use asteroids::coverage::Coverage;

use pretty_assertions::assert_eq;
use rstest::*;

#[fixture]
fn path_to_rafs() -> PathBuf {
    PathBuf::from("../tests/data/raf/chains.raf")
}

#[fixture]
fn path_to_hits() -> PathBuf {
    PathBuf::from("../tests/data/consensus/hits.json")
}

#[fixture]
fn path_to_config() -> PathBuf {
    PathBuf::from("../tests/data/consensus/consensus.toml")
}

#[fixture]
fn store(path_to_rafs: PathBuf, path_to_hits: PathBuf) -> InMemoryStore {
    InMemoryStore::from_files(&path_to_rafs, &path_to_hits).unwrap()
}

fn summary(assignments: &[DomainAssignment]) -> Vec<(String, String, Option<u64>)> {
    assignments
        .iter()
        .map(|d| (d.sid.clone().unwrap_or_default(), d.header.clone(), d.record_id))
        .collect()
}

#[rstest]
fn test_all_fixture_chains(store: InMemoryStore) {
    let outcomes = run_chains(&store, &store.chain_ids(), &ConsensusConfig::default());
    assert!(outcomes.iter().all(|o| o.is_ok()));

    // the Pfam model sorts last and loses to both BLAST hits
    assert_eq!(
        summary(&store.saved("1abcA").unwrap()),
        vec![
            ("e1abca1".to_string(), "A:1-60".to_string(), Some(1)),
            ("e1abca2".to_string(), "A:61-100".to_string(), Some(2)),
        ]
    );

    // both domains grow up to the unresolved residues 21-22
    assert_eq!(
        summary(&store.saved("2defB").unwrap()),
        vec![
            ("e2defb1".to_string(), "B:1-20".to_string(), Some(11)),
            ("e2defb2".to_string(), "B:23-48".to_string(), Some(12)),
        ]
    );

    let whole = store.saved("3xyz_").unwrap();
    assert_eq!(
        summary(&whole),
        vec![("e3xyz__".to_string(), "-".to_string(), None)]
    );
    assert_eq!(whole[0].source, EvidenceSource::Unknown);
}

#[rstest]
fn test_tight_overlap_leaves_filler(store: InMemoryStore, path_to_config: PathBuf) {
    let config = ConsensusConfig::try_from(path_to_config.as_path()).unwrap();
    let outcomes = run_chains(&store, &["1abcA".to_string()], &config);
    let assignments = outcomes[0].result.as_ref().unwrap();

    assert_eq!(
        summary(assignments),
        vec![
            ("e1abca1".to_string(), "A:1-60".to_string(), Some(1)),
            ("e1abca2".to_string(), "A:61-100".to_string(), None),
        ]
    );
    assert_eq!(assignments[1].regions, vec![Region::new(60, 40)]);
}

#[rstest]
fn test_legacy_identity_from_config(store: InMemoryStore, path_to_config: PathBuf) {
    let config = ConsensusConfig::try_from(path_to_config.as_path()).unwrap();
    let raf = store.raf_for_chain("1abcA").unwrap().unwrap();
    let candidates = store
        .hits_for_chain("1abcA")
        .unwrap()
        .iter()
        .map(|hit| hit.to_annotation(config.data_version))
        .collect();

    let mut set = AnnotationSet::new("1abcA", raf, config.source);
    set.run(candidates, &config).unwrap();

    // 532 / 600 = 88.67 -> 88.7 -> 89 under the legacy rounding
    assert_eq!(set.annotations()[0].identity, Some(89.0));
    assert!(set.report().contains("rejected pfam 3"));
}

#[rstest]
fn test_assignments_serialize(store: InMemoryStore) {
    let outcomes = run_chains(&store, &["1abcA".to_string()], &ConsensusConfig::default());
    let assignments = outcomes[0].result.as_ref().unwrap();

    let json = serde_json::to_value(&assignments[0]).unwrap();
    assert_eq!(json["sid"], "e1abca1");
    assert_eq!(json["source"], "blast");
    assert_eq!(json["regions"][0]["start"], 0);
    assert_eq!(json["regions"][0]["length"], 60);

    let back: DomainAssignment = serde_json::from_value(json).unwrap();
    assert_eq!(&back, &assignments[0]);
}

#[rstest]
fn test_coverage_of_final_layout(store: InMemoryStore) {
    run_chains(&store, &["2defB".to_string()], &ConsensusConfig::default());
    let raf = store.raf_for_chain("2defB").unwrap().unwrap();
    let seq_len = raf.sequence(ConsensusConfig::default().source).len();

    let coverage = Coverage::from_runs(
        seq_len,
        store
            .saved("2defB")
            .unwrap()
            .iter()
            .flat_map(|d| d.regions.iter())
            .filter_map(|r| r.start.map(|start| (start, r.length))),
    );

    // leading B, interior M M, two trailing E
    assert_eq!(seq_len, 51);
    assert_eq!(coverage.n_uncovered(1), 5);
    assert_eq!(coverage.find_longest_uncovered(), Some((21, 2)));
}

#[rstest]
fn test_missing_files() {
    assert!(
        InMemoryStore::from_files(Path::new("missing.raf"), Path::new("missing.json")).is_err()
    );
}
