use std::fmt::{self, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::RafError;
use crate::models::raf::{ABSENT, Raf, RafSlot, ResidueToken};

///
/// Which gapless sequence of an alignment record whole-chain indices refer to.
///
/// - `Atom` (1): residues with resolved coordinates.
/// - `Seqres` (2): every residue of the nominal sequence.
/// - `Legacy` (3): nominal residues bounded by the first and last observed one.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SequenceSource {
    Atom,
    #[default]
    Seqres,
    Legacy,
}

impl SequenceSource {
    pub fn code(&self) -> u8 {
        match self {
            SequenceSource::Atom => 1,
            SequenceSource::Seqres => 2,
            SequenceSource::Legacy => 3,
        }
    }

    fn includes(&self, slot: &RafSlot) -> bool {
        match self {
            SequenceSource::Atom => slot.is_observed(),
            SequenceSource::Seqres => slot.seqres != ABSENT,
            SequenceSource::Legacy => slot.seqres != ABSENT && slot.residue != ResidueToken::Before,
        }
    }

    fn residue_char(&self, slot: &RafSlot) -> u8 {
        match self {
            SequenceSource::Atom => slot.atom,
            _ => slot.seqres,
        }
    }
}

impl TryFrom<u8> for SequenceSource {
    type Error = RafError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(SequenceSource::Atom),
            2 => Ok(SequenceSource::Seqres),
            3 => Ok(SequenceSource::Legacy),
            _ => Err(RafError::UnknownSource(code.to_string())),
        }
    }
}

impl FromStr for SequenceSource {
    type Err = RafError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "atom" | "1" => Ok(SequenceSource::Atom),
            "seqres" | "2" => Ok(SequenceSource::Seqres),
            "legacy" | "3" => Ok(SequenceSource::Legacy),
            _ => Err(RafError::UnknownSource(s.to_string())),
        }
    }
}

impl Display for SequenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequenceSource::Atom => "atom",
            SequenceSource::Seqres => "seqres",
            SequenceSource::Legacy => "legacy",
        };
        write!(f, "{}", name)
    }
}

/// Scan direction along an alignment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the N-terminus.
    Backward,
    /// Towards the C-terminus.
    Forward,
}

///
/// Translation between whole-chain sequence indices and record indices for
/// one alignment record and one [SequenceSource].
///
/// Every lookup is a linear scan of the record. A `None` result means the
/// position has no counterpart in the other space, which is common: many
/// nominal residues have no observed coordinates.
///
#[derive(Debug, Clone, Copy)]
pub struct CoordinateSpace<'a> {
    raf: &'a Raf,
    source: SequenceSource,
}

impl<'a> CoordinateSpace<'a> {
    pub fn new(raf: &'a Raf, source: SequenceSource) -> Self {
        CoordinateSpace { raf, source }
    }

    pub fn raf(&self) -> &'a Raf {
        self.raf
    }

    pub fn source(&self) -> SequenceSource {
        self.source
    }

    ///
    /// Record indices belonging to the active sequence, in order.
    ///
    /// Legacy mode stays inactive until the first slot that is not `B`. Every
    /// mode but `Seqres` stops at the first `E`; `Seqres` keeps the trailing
    /// unresolved residues since they are part of the nominal sequence.
    ///
    fn active_indices(&self) -> impl Iterator<Item = usize> + 'a {
        let source = self.source;
        let mut started = source != SequenceSource::Legacy;
        self.raf
            .slots()
            .iter()
            .enumerate()
            .take_while(move |(_, slot)| {
                source == SequenceSource::Seqres || slot.residue != ResidueToken::After
            })
            .filter(move |(_, slot)| {
                if slot.residue != ResidueToken::Before {
                    started = true;
                }
                started && source.includes(slot)
            })
            .map(|(i, _)| i)
    }

    /// Length of the gapless sequence.
    pub fn seq_len(&self) -> usize {
        self.active_indices().count()
    }

    /// The gapless one-letter sequence.
    pub fn sequence(&self) -> String {
        self.active_indices()
            .filter_map(|i| self.raf.slot(i))
            .map(|slot| self.source.residue_char(slot) as char)
            .collect()
    }

    /// Record index of whole-chain sequence index `seq_index`.
    pub fn to_record_index(&self, seq_index: usize) -> Option<usize> {
        self.active_indices().nth(seq_index)
    }

    /// Whole-chain sequence index of record index `record_index`.
    pub fn to_seq_index(&self, record_index: usize) -> Option<usize> {
        self.active_indices()
            .take_while(|&i| i <= record_index)
            .position(|i| i == record_index)
    }

    pub fn residue_id_at(&self, record_index: usize) -> Option<&'a ResidueToken> {
        self.raf.slot(record_index).map(|slot| &slot.residue)
    }

    ///
    /// Nearest observed residue at or beyond `record_index` in `direction`.
    ///
    /// Returns `None` when the chain terminus sentinel (`E` going forward, `B`
    /// going backward) or the record boundary is reached first.
    ///
    pub fn nearest_observed(&self, record_index: usize, direction: Direction) -> Option<usize> {
        let slots = self.raf.slots();
        if record_index >= slots.len() {
            return None;
        }
        let terminus = match direction {
            Direction::Forward => ResidueToken::After,
            Direction::Backward => ResidueToken::Before,
        };
        let mut scan: Box<dyn Iterator<Item = usize>> = match direction {
            Direction::Forward => Box::new(record_index..slots.len()),
            Direction::Backward => Box::new((0..=record_index).rev()),
        };
        scan.find_map(|i| {
            let residue = &slots[i].residue;
            if residue.is_observed() {
                Some(Some(i))
            } else if *residue == terminus {
                Some(None)
            } else {
                None
            }
        })
        .flatten()
    }

    ///
    /// Last observed residue reached by walking from the observed residue at
    /// `record_index` in `direction` until a gap sentinel or the record end.
    ///
    pub fn extend_to_gap(&self, record_index: usize, direction: Direction) -> usize {
        let slots = self.raf.slots();
        let mut last = record_index;
        match direction {
            Direction::Forward => {
                for i in record_index + 1..slots.len() {
                    if !slots[i].is_observed() {
                        break;
                    }
                    last = i;
                }
            }
            Direction::Backward => {
                for i in (0..record_index.min(slots.len())).rev() {
                    if !slots[i].is_observed() {
                        break;
                    }
                    last = i;
                }
            }
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{gapped_raf, raf_line};
    use pretty_assertions::assert_eq;
    use rand::Rng;
    use rstest::*;

    #[fixture]
    fn raf() -> Raf {
        gapped_raf()
    }

    #[rstest]
    #[case(SequenceSource::Atom, "klexd")]
    #[case(SequenceSource::Seqres, "mklvegg")]
    #[case(SequenceSource::Legacy, "klveg")]
    fn test_sequence(raf: Raf, #[case] source: SequenceSource, #[case] expected: &str) {
        let space = CoordinateSpace::new(&raf, source);
        assert_eq!(space.sequence(), expected);
        assert_eq!(space.seq_len(), expected.len());
    }

    #[rstest]
    fn test_to_record_index_seqres(raf: Raf) {
        let space = CoordinateSpace::new(&raf, SequenceSource::Seqres);
        assert_eq!(space.to_record_index(0), Some(0));
        assert_eq!(space.to_record_index(3), Some(3));
        // slot 5 has no SEQRES residue and is skipped
        assert_eq!(space.to_record_index(5), Some(6));
        assert_eq!(space.to_record_index(6), Some(7));
        assert_eq!(space.to_record_index(7), None);
    }

    #[rstest]
    fn test_to_seq_index_atom(raf: Raf) {
        let space = CoordinateSpace::new(&raf, SequenceSource::Atom);
        assert_eq!(space.to_seq_index(0), None);
        assert_eq!(space.to_seq_index(1), Some(0));
        assert_eq!(space.to_seq_index(3), None);
        assert_eq!(space.to_seq_index(4), Some(2));
        assert_eq!(space.to_seq_index(6), Some(4));
        assert_eq!(space.to_seq_index(7), None);
    }

    #[rstest]
    fn test_round_trip_all_sources(raf: Raf) {
        for source in [SequenceSource::Atom, SequenceSource::Seqres, SequenceSource::Legacy] {
            let space = CoordinateSpace::new(&raf, source);
            for i in 0..space.seq_len() {
                let record_index = space.to_record_index(i).unwrap();
                assert_eq!(space.to_seq_index(record_index), Some(i), "{source} {i}");
            }
        }
    }

    #[rstest]
    fn test_round_trip_random_records() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let mut slots: Vec<(String, char, char)> = Vec::new();
            let leading = rng.random_range(0..3);
            for _ in 0..leading {
                slots.push(("B".to_string(), '.', 'a'));
            }
            for n in 0..rng.random_range(1..40) {
                if rng.random_bool(0.2) {
                    slots.push(("M".to_string(), '.', 'g'));
                } else {
                    slots.push((n.to_string(), 'a', 'a'));
                }
            }
            for _ in 0..rng.random_range(0..3) {
                slots.push(("E".to_string(), '.', 'c'));
            }
            let borrowed: Vec<(&str, char, char)> =
                slots.iter().map(|(id, a, s)| (id.as_str(), *a, *s)).collect();
            let raf: Raf = raf_line("9zzzA", "0", "1", &borrowed).parse().unwrap();

            for source in [SequenceSource::Atom, SequenceSource::Seqres, SequenceSource::Legacy] {
                let space = CoordinateSpace::new(&raf, source);
                for i in 0..space.seq_len() + 2 {
                    if let Some(record_index) = space.to_record_index(i) {
                        assert_eq!(space.to_seq_index(record_index), Some(i));
                    }
                }
            }
        }
    }

    #[rstest]
    #[case(0, Direction::Forward, Some(1))]
    #[case(3, Direction::Forward, Some(4))]
    #[case(3, Direction::Backward, Some(2))]
    #[case(0, Direction::Backward, None)]
    #[case(7, Direction::Forward, None)]
    #[case(7, Direction::Backward, Some(6))]
    #[case(20, Direction::Forward, None)]
    fn test_nearest_observed(
        raf: Raf,
        #[case] start: usize,
        #[case] direction: Direction,
        #[case] expected: Option<usize>,
    ) {
        let space = CoordinateSpace::new(&raf, SequenceSource::Seqres);
        assert_eq!(space.nearest_observed(start, direction), expected);
    }

    #[rstest]
    #[case(1, Direction::Forward, 2)]
    #[case(2, Direction::Backward, 1)]
    #[case(4, Direction::Forward, 6)]
    #[case(6, Direction::Backward, 4)]
    fn test_extend_to_gap(
        raf: Raf,
        #[case] start: usize,
        #[case] direction: Direction,
        #[case] expected: usize,
    ) {
        let space = CoordinateSpace::new(&raf, SequenceSource::Seqres);
        assert_eq!(space.extend_to_gap(start, direction), expected);
    }

    #[rstest]
    fn test_extend_to_gap_record_boundary() {
        let raf: Raf = raf_line(
            "1xyzA",
            "1",
            "3",
            &[("1", 'a', 'a'), ("2", 'c', 'c'), ("3", 'd', 'd')],
        )
        .parse()
        .unwrap();
        let space = CoordinateSpace::new(&raf, SequenceSource::Atom);
        assert_eq!(space.extend_to_gap(1, Direction::Forward), 2);
        assert_eq!(space.extend_to_gap(1, Direction::Backward), 0);
    }

    #[rstest]
    #[case("atom", SequenceSource::Atom)]
    #[case("SEQRES", SequenceSource::Seqres)]
    #[case("3", SequenceSource::Legacy)]
    fn test_source_from_str(#[case] text: &str, #[case] expected: SequenceSource) {
        assert_eq!(text.parse::<SequenceSource>(), Ok(expected));
        assert_eq!(SequenceSource::try_from(expected.code()), Ok(expected));
    }

    #[rstest]
    fn test_source_from_str_invalid() {
        assert!("pdb".parse::<SequenceSource>().is_err());
        assert!(SequenceSource::try_from(4).is_err());
    }
}
