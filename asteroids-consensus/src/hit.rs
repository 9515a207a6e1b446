use serde::{Deserialize, Serialize};

use asteroids_core::models::Region;

use crate::annotation::Annotation;
use crate::source::EvidenceSource;

/// First data release whose percent identities are rounded once.
pub const LEGACY_IDENTITY_VERSION: u32 = 12;

///
/// The part of a hit's subject (the classified domain sequence or the
/// profile model) that the chain aligned to.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubjectMatch {
    /// 0-based first matched subject position.
    pub start: usize,
    /// Number of matched subject positions.
    pub length: usize,
    /// Total length of the subject.
    pub subject_length: usize,
}

impl SubjectMatch {
    /// Subject residues before the match.
    pub fn unused_before(&self) -> usize {
        self.start
    }

    /// Subject residues after the match.
    pub fn unused_after(&self) -> usize {
        self.subject_length.saturating_sub(self.start + self.length)
    }
}

///
/// A scored evidence record as produced by the upstream search tools.
///
/// Query coordinates are 0-based whole-chain sequence indices.
///
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HitRecord {
    pub source: EvidenceSource,
    pub record_id: u64,
    pub query_start: usize,
    pub query_length: usize,
    #[serde(default)]
    pub subject: Option<SubjectMatch>,
    #[serde(default)]
    pub identities: usize,
    #[serde(default)]
    pub aligned_length: usize,
    pub log10_e: f64,
    #[serde(default)]
    pub classification_code: String,
    #[serde(default)]
    pub protein_ancestor_id: Option<u64>,
    #[serde(default)]
    pub species_ancestor_id: Option<u64>,
    #[serde(default)]
    pub provenance: String,
}

impl HitRecord {
    ///
    /// Percent identity over the aligned length.
    ///
    /// Rounded to one decimal place. Data released before
    /// [LEGACY_IDENTITY_VERSION] was rounded a second time, to an integer, and
    /// that is reproduced here so historical numbers stay comparable.
    ///
    pub fn percent_identity(&self, data_version: u32) -> Option<f64> {
        if self.aligned_length == 0 {
            return None;
        }
        let tenths = (1000.0 * self.identities as f64 / self.aligned_length as f64).round();
        let identity = tenths / 10.0;
        if data_version < LEGACY_IDENTITY_VERSION {
            Some(identity.round())
        } else {
            Some(identity)
        }
    }

    pub fn region(&self) -> Region {
        Region::new(self.query_start, self.query_length)
    }

    /// Build the candidate annotation this hit supports.
    pub fn to_annotation(&self, data_version: u32) -> Annotation {
        let mut annotation = Annotation::deferred(self.source, self.record_id);
        annotation.fill_from_hit(self, data_version);
        annotation
    }
}
