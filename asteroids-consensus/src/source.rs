use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

///
/// Kind of evidence an annotation was derived from.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
    /// Filler for residues no evidence claimed.
    #[default]
    Unknown,
    /// Local alignment to a classified domain sequence.
    Blast,
    /// Profile model hit to a family model.
    Pfam,
    /// Family-level profile hit against the classification.
    Fam,
    /// Superfamily-level profile hit against the classification.
    Sf,
    /// Exact sequence match to a previously curated chain.
    #[serde(rename = "scopseqmatch")]
    ScopSeqMatch,
}

///
/// Per-source behavior, kept as data so the consensus ordering can be
/// inspected and tested on its own.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTraits {
    pub label: &'static str,
    /// Compared first; higher classes sort after lower ones.
    pub sort_class: u8,
    /// Compared after E-value and length; lower ranks win ties.
    pub tie_rank: u8,
    /// Whether linker residues between two hits of this kind may be divided.
    pub splits_linkers: bool,
}

const SOURCE_TRAITS: [(EvidenceSource, SourceTraits); 6] = [
    (
        EvidenceSource::Unknown,
        SourceTraits { label: "unknown", sort_class: 0, tie_rank: 1, splits_linkers: false },
    ),
    (
        EvidenceSource::Blast,
        SourceTraits { label: "blast", sort_class: 0, tie_rank: 0, splits_linkers: true },
    ),
    (
        EvidenceSource::Pfam,
        SourceTraits { label: "pfam", sort_class: 1, tie_rank: 1, splits_linkers: false },
    ),
    (
        EvidenceSource::Fam,
        SourceTraits { label: "fam", sort_class: 0, tie_rank: 1, splits_linkers: false },
    ),
    (
        EvidenceSource::Sf,
        SourceTraits { label: "sf", sort_class: 0, tie_rank: 1, splits_linkers: false },
    ),
    (
        EvidenceSource::ScopSeqMatch,
        SourceTraits { label: "scopseqmatch", sort_class: 0, tie_rank: 1, splits_linkers: false },
    ),
];

impl EvidenceSource {
    pub const ALL: [EvidenceSource; 6] = [
        EvidenceSource::Unknown,
        EvidenceSource::Blast,
        EvidenceSource::Pfam,
        EvidenceSource::Fam,
        EvidenceSource::Sf,
        EvidenceSource::ScopSeqMatch,
    ];

    pub fn traits(&self) -> &'static SourceTraits {
        &SOURCE_TRAITS[*self as usize].1
    }

    pub fn label(&self) -> &'static str {
        self.traits().label
    }
}

impl FromStr for EvidenceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        EvidenceSource::ALL
            .into_iter()
            .find(|source| source.label() == lowered)
            .ok_or_else(|| format!("'{}' is not a valid EvidenceSource", s))
    }
}

impl Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_table_is_indexed_by_discriminant() {
        for (i, (source, _)) in SOURCE_TRAITS.iter().enumerate() {
            assert_eq!(*source as usize, i);
        }
    }

    #[rstest]
    fn test_only_pfam_sorts_late() {
        let late: Vec<EvidenceSource> = EvidenceSource::ALL
            .into_iter()
            .filter(|s| s.traits().sort_class > 0)
            .collect();
        assert_eq!(late, vec![EvidenceSource::Pfam]);
    }

    #[rstest]
    fn test_blast_wins_ties_and_splits_linkers() {
        let blast = EvidenceSource::Blast.traits();
        for source in EvidenceSource::ALL {
            if source != EvidenceSource::Blast {
                assert!(blast.tie_rank < source.traits().tie_rank);
                assert!(!source.traits().splits_linkers);
            }
        }
        assert!(blast.splits_linkers);
    }

    #[rstest]
    #[case("blast", EvidenceSource::Blast)]
    #[case("PFAM", EvidenceSource::Pfam)]
    #[case("ScopSeqMatch", EvidenceSource::ScopSeqMatch)]
    fn test_from_str(#[case] text: &str, #[case] expected: EvidenceSource) {
        assert_eq!(text.parse::<EvidenceSource>(), Ok(expected));
        assert_eq!(expected.to_string().parse::<EvidenceSource>(), Ok(expected));
    }

    #[rstest]
    fn test_from_str_invalid() {
        assert!("hmmer".parse::<EvidenceSource>().is_err());
    }
}
