use std::cmp::{max, min};
use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::RegionError;
use crate::models::coordinates::{CoordinateSpace, Direction};
use crate::models::raf::ResidueToken;

///
/// Region struct, a half-open interval `[start, start + length)` of
/// whole-chain sequence indices.
///
/// An empty region (`length == 0`) may have no start; a non-empty region
/// always has one.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    pub start: Option<usize>,
    pub length: usize,
}

impl Region {
    pub fn new(start: usize, length: usize) -> Self {
        Region {
            start: Some(start),
            length,
        }
    }

    /// Region covering `start..=end`.
    pub fn from_bounds(start: usize, end: usize) -> Self {
        Region::new(start, end + 1 - start)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0 || self.start.is_none()
    }

    ///
    /// Last index covered by the region (inclusive).
    ///
    pub fn end(&self) -> Option<usize> {
        match self.start {
            Some(start) if self.length > 0 => Some(start + self.length - 1),
            _ => None,
        }
    }

    /// Exclusive end, `start + length`.
    pub fn stop(&self) -> Option<usize> {
        self.start.map(|start| start + self.length)
    }

    pub fn contains(&self, seq_index: usize) -> bool {
        match (self.start, self.end()) {
            (Some(start), Some(end)) => start <= seq_index && seq_index <= end,
            _ => false,
        }
    }

    /// Number of residues shared with `other`.
    pub fn overlap(&self, other: &Region) -> usize {
        match (self.start, self.end(), other.start, other.end()) {
            (Some(s1), Some(e1), Some(s2), Some(e2)) => {
                let lo = max(s1, s2);
                let hi = min(e1, e2);
                if hi >= lo { hi - lo + 1 } else { 0 }
            }
            _ => 0,
        }
    }

    /// Residues in either region but not in both.
    pub fn unmatched(&self, other: &Region) -> usize {
        self.length + other.length - 2 * self.overlap(other)
    }

    ///
    /// Worst endpoint disagreement between two regions.
    ///
    /// Capped at the longer length, so disjoint regions never score better
    /// than a region compared with nothing.
    ///
    pub fn max_unmatched(&self, other: &Region) -> usize {
        let longest = max(self.length, other.length);
        match (self.start, self.end(), other.start, other.end()) {
            (Some(s1), Some(e1), Some(s2), Some(e2)) => {
                min(longest, max(e1.abs_diff(e2), s1.abs_diff(s2)))
            }
            _ => longest,
        }
    }

    ///
    /// Extend one boundary to the nearest gap or chain terminus.
    ///
    /// The boundary is translated to record space, walked with
    /// [CoordinateSpace::extend_to_gap] and translated back. If any step has
    /// no counterpart the region is left unchanged.
    ///
    /// Returns true when the region changed.
    ///
    pub fn extend_to_near_end(&mut self, space: &CoordinateSpace, direction: Direction) -> bool {
        let (Some(start), Some(end)) = (self.start, self.end()) else {
            return false;
        };
        let boundary = match direction {
            Direction::Forward => end,
            Direction::Backward => start,
        };
        let Some(record_index) = space.to_record_index(boundary) else {
            return false;
        };
        if !space.raf().slot(record_index).is_some_and(|s| s.is_observed()) {
            return false;
        }
        let extended = space.extend_to_gap(record_index, direction);
        let Some(new_boundary) = space.to_seq_index(extended) else {
            return false;
        };
        let (new_start, new_end) = match direction {
            Direction::Forward => (start, new_boundary),
            Direction::Backward => (new_boundary, end),
        };
        if new_end < new_start {
            return false;
        }

        *self = Region::from_bounds(new_start, new_end);
        new_start != start || new_end != end
    }

    ///
    /// Record indices of the first and last observed residue inside the region.
    ///
    pub fn observed_bounds(&self, space: &CoordinateSpace) -> Option<(usize, usize)> {
        let first = space.to_record_index(self.start?)?;
        let last = space.to_record_index(self.end()?)?;
        let first = space.nearest_observed(first, Direction::Forward)?;
        let last = space.nearest_observed(last, Direction::Backward)?;
        if first > last {
            return None;
        }
        Some((first, last))
    }

    /// True when the observed part of the region is the record's declared full chain.
    pub fn is_whole_chain(&self, space: &CoordinateSpace) -> bool {
        let Some((first, last)) = self.observed_bounds(space) else {
            return false;
        };
        let raf = space.raf();
        space.residue_id_at(first).map(ResidueToken::as_str) == Some(raf.first_residue())
            && space.residue_id_at(last).map(ResidueToken::as_str) == Some(raf.last_residue())
    }

    ///
    /// Render the region as record residue ids, e.g. `A:12-87`.
    ///
    /// Both ends are snapped inward to observed residues. The whole chain is
    /// written `A:` (or `-` for a chain without a letter). Returns `None` if
    /// the region contains no observed residue.
    ///
    pub fn header(&self, space: &CoordinateSpace) -> Option<String> {
        let (first, last) = self.observed_bounds(space)?;
        let raf = space.raf();
        let first_id = space.residue_id_at(first)?.as_str();
        let last_id = space.residue_id_at(last)?.as_str();
        let whole_chain = first_id == raf.first_residue() && last_id == raf.last_residue();

        let header = match (raf.chain(), whole_chain) {
            (Some(chain), true) => format!("{}:", chain),
            (None, true) => "-".to_string(),
            (Some(chain), false) => format!("{}:{}-{}", chain, first_id, last_id),
            (None, false) => format!("{}-{}", first_id, last_id),
        };
        Some(header)
    }

    ///
    /// Parse a single record-relative header token (`A:12-87`, `12-87`, `A:`
    /// or `-`) into a region of whole-chain sequence indices.
    ///
    /// The start id is located at its first exact match in the record and the
    /// end id at its last. When an id has no usable match and
    /// `snap_to_observed` is set, its number is read as a 1-based sequence
    /// position and snapped inward to the nearest observed residue.
    ///
    pub fn parse(
        text: &str,
        space: &CoordinateSpace,
        snap_to_observed: bool,
    ) -> Result<Region, RegionError> {
        let raf = space.raf();
        let text = text.trim();

        let (chain, range) = match text.split_once(':') {
            Some((chain, range)) => {
                let mut chars = chain.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => (Some(c), range),
                    _ => return Err(RegionError::RegionParseError(text.to_string())),
                }
            }
            None => (None, text),
        };
        if let Some(found) = chain {
            let expected = raf.chain().unwrap_or('_');
            if found != expected {
                return Err(RegionError::ChainMismatch { expected, found });
            }
        }

        let (first_id, last_id) = if range.is_empty() || range == "-" {
            (raf.first_residue(), raf.last_residue())
        } else {
            // a leading '-' belongs to a negative start id
            let split = range
                .char_indices()
                .skip(1)
                .find(|(_, c)| *c == '-')
                .map(|(i, _)| i)
                .ok_or_else(|| RegionError::RegionParseError(text.to_string()))?;
            let (first, last) = (&range[..split], &range[split + 1..]);
            if first.is_empty() || last.is_empty() {
                return Err(RegionError::RegionParseError(text.to_string()));
            }
            (first, last)
        };

        let start = Self::locate(first_id, space, Direction::Forward, snap_to_observed)?;
        let end = Self::locate(last_id, space, Direction::Backward, snap_to_observed)?;
        if end < start {
            return Err(RegionError::EmptyRegion(text.to_string()));
        }
        Ok(Region::from_bounds(start, end))
    }

    fn locate(
        residue_id: &str,
        space: &CoordinateSpace,
        direction: Direction,
        snap_to_observed: bool,
    ) -> Result<usize, RegionError> {
        let exact = space
            .raf()
            .find_residue(residue_id, direction == Direction::Forward)
            .and_then(|i| space.to_seq_index(i));
        if let Some(seq_index) = exact {
            return Ok(seq_index);
        }

        let not_found = || RegionError::ResidueNotFound(residue_id.to_string());
        if !snap_to_observed {
            return Err(not_found());
        }
        let number = ResidueToken::parse(residue_id).number().ok_or_else(not_found)?;
        // ids below 1 have no numbered position to snap from
        let seq_index = number
            .checked_sub(1)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(not_found)?;
        space
            .to_record_index(seq_index)
            .and_then(|i| space.nearest_observed(i, direction))
            .and_then(|i| space.to_seq_index(i))
            .ok_or_else(not_found)
    }

    ///
    /// Classic 1-based `start-end` numbering.
    ///
    pub fn to_seq_string(&self) -> String {
        match (self.start, self.end()) {
            (Some(start), Some(end)) => format!("{}-{}", start + 1, end + 1),
            _ => String::new(),
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_seq_string())
    }
}
