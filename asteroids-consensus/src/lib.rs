//! Greedy consensus of protein domain evidence.
//!
//! Given an alignment record for a chain and a pile of scored evidence (BLAST
//! alignments, family and superfamily profile hits, Pfam models, exact
//! sequence matches), this crate produces a non-overlapping domain layout:
//!
//! 1. candidates are ranked by [`Annotation::compare_to`];
//! 2. each is offered to an [`AnnotationSet`], which accepts it unless it
//!    overlaps already-accepted evidence too much, trimming any overlap;
//! 3. post-processing passes close small gaps, grow boundaries to the nearest
//!    unresolved residue, divide short linkers and fill unclaimed stretches;
//! 4. every domain gets an identifier.
//!
//! ## Quick Start
//!
//! ```rust
//! use asteroids_consensus::{Annotation, AnnotationSet, ConsensusConfig, EvidenceSource};
//! use asteroids_core::models::{Raf, Region, SequenceSource};
//!
//! let mut line = format!("{:<28}{:<5}{:<5}", "1abcA", "1", "100");
//! for i in 1..=100 {
//!     line.push_str(&format!("{:<5}aa", i));
//! }
//! let raf: Raf = line.parse().unwrap();
//!
//! let mut first = Annotation::with_regions(EvidenceSource::Blast, vec![Region::new(0, 60)]);
//! first.log10_e = -10.0;
//! let mut second = Annotation::with_regions(EvidenceSource::Blast, vec![Region::new(50, 50)]);
//! second.log10_e = -5.0;
//!
//! let config = ConsensusConfig { max_overlap: 5, ..ConsensusConfig::default() };
//! let mut set = AnnotationSet::new("1abcA", raf, SequenceSource::Seqres);
//! set.run(vec![second, first], &config).unwrap();
//!
//! let headers: Vec<String> = set.assignments().into_iter().map(|d| d.header).collect();
//! assert_eq!(headers, vec!["A:1-60", "A:61-100"]);
//! ```

pub mod annotation;
pub mod annotation_set;
pub mod batch;
pub mod config;
pub mod errors;
pub mod hit;
pub mod source;
pub mod store;

// re-exports
pub use self::annotation::{Annotation, SortMode};
pub use self::annotation_set::{AnnotationSet, ConsensusState, DomainAssignment, RegionHandle};
pub use self::batch::{ChainOutcome, run_chain, run_chains};
pub use self::config::{ConsensusConfig, ConsensusConfigError, PassSelection};
pub use self::errors::{ConsensusError, ConsensusResult};
pub use self::hit::{HitRecord, SubjectMatch};
pub use self::source::EvidenceSource;
pub use self::store::{EvidenceStore, InMemoryStore};
