use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::RafError;
use crate::models::coordinates::{CoordinateSpace, SequenceSource};

/// Width of one body slot: 5 bytes of residue id, one ATOM char, one SEQRES char.
pub const SLOT_WIDTH: usize = 7;

/// Byte offset at which the slot body begins.
pub const HEADER_WIDTH: usize = 38;

/// Character used in either sequence column when the residue is absent from it.
pub const ABSENT: u8 = b'.';

///
/// The residue-id column of one alignment record slot.
///
/// `Before`, `Missing` and `After` mark nominal residues with no resolved
/// coordinates at the N-terminus, in the interior, and at the C-terminus.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResidueToken {
    Before,
    Missing,
    After,
    Id(String),
}

impl ResidueToken {
    pub fn parse(field: &str) -> ResidueToken {
        match field.trim() {
            "B" => ResidueToken::Before,
            "M" => ResidueToken::Missing,
            "E" => ResidueToken::After,
            id => ResidueToken::Id(id.to_string()),
        }
    }

    /// True for residues that carry atomic coordinates.
    pub fn is_observed(&self) -> bool {
        matches!(self, ResidueToken::Id(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResidueToken::Before => "B",
            ResidueToken::Missing => "M",
            ResidueToken::After => "E",
            ResidueToken::Id(id) => id,
        }
    }

    ///
    /// Numeric part of a residue id, ignoring any insertion code.
    ///
    /// `"27A"` gives `Some(27)`, `"-3"` gives `Some(-3)`, sentinels give `None`.
    ///
    pub fn number(&self) -> Option<i32> {
        match self {
            ResidueToken::Id(id) => {
                let digits = id.trim_end_matches(|c: char| c.is_ascii_alphabetic());
                digits.parse().ok()
            }
            _ => None,
        }
    }
}

impl Display for ResidueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One position of an alignment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RafSlot {
    pub residue: ResidueToken,
    /// Observed (ATOM) one-letter code, `.` when unresolved.
    pub atom: u8,
    /// Nominal (SEQRES) one-letter code, `.` when absent from SEQRES.
    pub seqres: u8,
}

impl RafSlot {
    pub fn is_observed(&self) -> bool {
        self.residue.is_observed()
    }
}

///
/// Raf struct, a parsed alignment record for one chain.
///
/// The literal form is a single line: the 4-character structure code, the
/// chain character (`_` or blank for chains without a letter), the first and
/// last residue ids at offsets 28 and 33, and from offset 38 a body of
/// fixed-width slots.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raf {
    code: String,
    chain: Option<char>,
    first_residue: String,
    last_residue: String,
    slots: Vec<RafSlot>,
}

impl FromStr for Raf {
    type Err = RafError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.is_ascii() {
            return Err(RafError::NonAscii(line.chars().take(5).collect()));
        }
        if line.len() < HEADER_WIDTH {
            return Err(RafError::TruncatedHeader(line.len()));
        }

        // ascii was checked above, so byte offsets are char boundaries
        let body = &line[HEADER_WIDTH..];
        if body.len() % SLOT_WIDTH != 0 {
            return Err(RafError::RaggedBody(body.len()));
        }

        let chain = match line.as_bytes()[4] {
            b'_' | b' ' => None,
            c => Some(c as char),
        };

        let slots = (0..body.len() / SLOT_WIDTH)
            .map(|i| {
                let slot = &body[i * SLOT_WIDTH..(i + 1) * SLOT_WIDTH];
                RafSlot {
                    residue: ResidueToken::parse(&slot[..5]),
                    atom: slot.as_bytes()[5],
                    seqres: slot.as_bytes()[6],
                }
            })
            .collect();

        Ok(Raf {
            code: line[0..4].to_string(),
            chain,
            first_residue: line[28..33].trim().to_string(),
            last_residue: line[33..38].trim().to_string(),
            slots,
        })
    }
}

impl Raf {
    /// Structure code, e.g. `1abc`.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Chain letter, `None` for chains without one.
    pub fn chain(&self) -> Option<char> {
        self.chain
    }

    /// Declared first residue id.
    pub fn first_residue(&self) -> &str {
        &self.first_residue
    }

    /// Declared last residue id.
    pub fn last_residue(&self) -> &str {
        &self.last_residue
    }

    pub fn slots(&self) -> &[RafSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&RafSlot> {
        self.slots.get(index)
    }

    /// Number of slots (record indices) in the body.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    ///
    /// Locate a residue id by exact match.
    ///
    /// # Arguments
    /// - residue_id: id as written in the record, including any insertion code
    /// - first: return the first match when true, otherwise the last
    ///
    pub fn find_residue(&self, residue_id: &str, first: bool) -> Option<usize> {
        let mut matches = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.residue.as_str() == residue_id)
            .map(|(i, _)| i);
        if first {
            matches.next()
        } else {
            matches.last()
        }
    }

    /// Number of slots with resolved coordinates.
    pub fn observed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_observed()).count()
    }

    /// Gapless one-letter sequence for `source`.
    pub fn sequence(&self, source: SequenceSource) -> String {
        CoordinateSpace::new(self, source).sequence()
    }
}
