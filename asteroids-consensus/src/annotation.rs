use std::cmp::Ordering;

use asteroids_core::models::{CoordinateSpace, Region};
use asteroids_coverage::Coverage;

use crate::errors::{ConsensusError, ConsensusResult};
use crate::hit::{HitRecord, SubjectMatch};
use crate::source::EvidenceSource;
use crate::store::EvidenceStore;

/// How [Annotation::compare_to] orders annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Ascending start of the first region.
    ByPosition,
    /// Consensus priority: best evidence first.
    #[default]
    ByQuality,
}

///
/// A candidate (or accepted) domain assignment: disjoint regions of one
/// chain plus the evidence behind them.
///
/// Regions are kept sorted by start. Total length and extent are always
/// derived from them.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    regions: Vec<Region>,
    pub source: EvidenceSource,
    pub record_id: Option<u64>,
    /// log10 of the E-value, `NaN` when the evidence has none.
    pub log10_e: f64,
    pub classification_code: String,
    pub protein_ancestor_id: Option<u64>,
    pub species_ancestor_id: Option<u64>,
    pub provenance: String,
    pub identity: Option<f64>,
    pub subject: Option<SubjectMatch>,
    /// Domain identifier, set when the owning set is finalized.
    pub sid: Option<String>,
    pub sort_mode: SortMode,
    loaded: bool,
}

impl Default for Annotation {
    fn default() -> Self {
        Annotation {
            regions: Vec::new(),
            source: EvidenceSource::Unknown,
            record_id: None,
            log10_e: f64::NAN,
            classification_code: String::new(),
            protein_ancestor_id: None,
            species_ancestor_id: None,
            provenance: String::new(),
            identity: None,
            subject: None,
            sid: None,
            sort_mode: SortMode::ByQuality,
            loaded: true,
        }
    }
}

impl Annotation {
    pub fn new() -> Self {
        Annotation::default()
    }

    ///
    /// A placeholder for the evidence record `record_id` of `source`; fill it
    /// with [Annotation::load].
    ///
    pub fn deferred(source: EvidenceSource, record_id: u64) -> Self {
        Annotation {
            source,
            record_id: Some(record_id),
            loaded: false,
            ..Annotation::default()
        }
    }

    /// A fully formed annotation for hand-computed evidence.
    pub fn with_regions(source: EvidenceSource, regions: Vec<Region>) -> Self {
        let mut annotation = Annotation {
            source,
            ..Annotation::default()
        };
        annotation.set_regions(regions);
        annotation
    }

    /// Filler for a stretch of chain no evidence claimed.
    pub fn unmatched(region: Region) -> Self {
        let mut annotation = Annotation::with_regions(EvidenceSource::Unknown, vec![region]);
        annotation.provenance = "unmatched".to_string();
        annotation
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Copy positions, scores and cross-references from `hit`.
    pub fn fill_from_hit(&mut self, hit: &HitRecord, data_version: u32) {
        self.source = hit.source;
        self.record_id = Some(hit.record_id);
        self.set_regions(vec![hit.region()]);
        self.log10_e = hit.log10_e;
        self.classification_code = hit.classification_code.clone();
        self.protein_ancestor_id = hit.protein_ancestor_id;
        self.species_ancestor_id = hit.species_ancestor_id;
        self.provenance = hit.provenance.clone();
        self.identity = hit.percent_identity(data_version);
        self.subject = hit.subject;
        self.loaded = true;
    }

    ///
    /// Resolve a deferred annotation through `store`. Already loaded
    /// annotations are left untouched.
    ///
    pub fn load<S: EvidenceStore + ?Sized>(
        &mut self,
        store: &S,
        data_version: u32,
    ) -> ConsensusResult<()> {
        if self.loaded {
            return Ok(());
        }
        let record_id = self.record_id.ok_or_else(|| {
            anyhow::anyhow!("Deferred {} annotation has no record id", self.source)
        })?;
        let hit = store.hit(self.source, record_id)?.ok_or_else(|| {
            anyhow::anyhow!("No {} record with id {}", self.source, record_id)
        })?;
        self.fill_from_hit(&hit, data_version);
        Ok(())
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub(crate) fn regions_mut(&mut self) -> &mut [Region] {
        &mut self.regions
    }

    /// Replace the regions, dropping empty ones and sorting by start.
    pub fn set_regions(&mut self, mut regions: Vec<Region>) {
        regions.retain(|r| !r.is_empty());
        regions.sort_by_key(|r| r.start);
        self.regions = regions;
    }

    pub fn add_region(&mut self, region: Region) {
        if region.is_empty() {
            return;
        }
        let at = self.regions.partition_point(|r| r.start <= region.start);
        self.regions.insert(at, region);
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn total_length(&self) -> usize {
        self.regions.iter().map(|r| r.length).sum()
    }

    pub fn first_start(&self) -> Option<usize> {
        self.regions.first().and_then(|r| r.start)
    }

    /// Single region from the first start to the last end.
    pub fn extent(&self) -> Option<Region> {
        let start = self.first_start()?;
        let end = self.regions.iter().filter_map(Region::end).max()?;
        Some(Region::from_bounds(start, end))
    }

    /// Residues shared with any of `regions`, summed over all region pairs.
    pub fn overlap_with(&self, regions: &[Region]) -> usize {
        self.regions
            .iter()
            .map(|a| regions.iter().map(|b| a.overlap(b)).sum::<usize>())
            .sum()
    }

    pub fn total_overlap(&self, other: &Annotation) -> usize {
        self.overlap_with(&other.regions)
    }

    pub fn total_unmatched(&self, other: &Annotation) -> usize {
        self.total_length() + other.total_length() - 2 * self.total_overlap(other)
    }

    ///
    /// Worst [Region::max_unmatched] over corresponding region pairs.
    ///
    /// Both annotations must have the same number of regions.
    ///
    pub fn max_unmatched(&self, other: &Annotation) -> ConsensusResult<usize> {
        if self.regions.len() != other.regions.len() {
            return Err(ConsensusError::RegionCountMismatch(
                self.regions.len(),
                other.regions.len(),
            ));
        }
        Ok(self
            .regions
            .iter()
            .zip(other.regions.iter())
            .map(|(a, b)| a.max_unmatched(b))
            .max()
            .unwrap_or(0))
    }

    ///
    /// Match distance used to rank overlapping annotations: the pairwise
    /// [Annotation::max_unmatched] when region counts agree, otherwise the
    /// same metric over the two extents.
    ///
    pub fn match_distance(&self, other: &Annotation) -> usize {
        match self.max_unmatched(other) {
            Ok(distance) => distance,
            Err(_) => {
                let a = self.extent().unwrap_or_default();
                let b = other.extent().unwrap_or_default();
                a.max_unmatched(&b)
            }
        }
    }

    ///
    /// Remove every residue covered by `other` from this annotation.
    ///
    /// Works on a coverage vector spanning this annotation's own extent:
    /// own regions are set, `other` regions are clamped to the extent and
    /// cleared, and the regions are re-derived from the covered runs. Regions
    /// that touch end to end come back merged.
    ///
    pub fn remove_overlap(&mut self, other: &[Region]) {
        let Some(extent) = self.extent() else {
            return;
        };
        let (Some(lo), Some(hi)) = (extent.start, extent.end()) else {
            return;
        };

        let mut coverage = Coverage::new(extent.length);
        for region in &self.regions {
            if let Some(start) = region.start {
                coverage.set(start - lo, region.length);
            }
        }
        for region in other {
            let (Some(start), Some(end)) = (region.start, region.end()) else {
                continue;
            };
            if end < lo || start > hi {
                continue;
            }
            let start = start.max(lo);
            let end = end.min(hi);
            coverage.clear(start - lo, end - start + 1);
        }

        self.regions = coverage
            .covered_runs()
            .map(|(start, len)| Region::new(start + lo, len))
            .collect();
    }

    /// Compare using this annotation's own [SortMode].
    pub fn compare_to(&self, other: &Annotation) -> Ordering {
        self.compare_with(other, self.sort_mode)
    }

    pub fn compare_with(&self, other: &Annotation, mode: SortMode) -> Ordering {
        match mode {
            SortMode::ByPosition => {
                let position = match (self.first_start(), other.first_start()) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                position.then_with(|| self.compare_quality(other))
            }
            SortMode::ByQuality => self.compare_quality(other),
        }
    }

    ///
    /// Consensus priority. Pfam sorts after everything else; then lower E,
    /// longer total length, BLAST before other sources, and finally
    /// provenance text and classification code.
    ///
    fn compare_quality(&self, other: &Annotation) -> Ordering {
        let (mine, theirs) = (self.source.traits(), other.source.traits());
        mine.sort_class
            .cmp(&theirs.sort_class)
            .then_with(|| compare_log10_e(self.log10_e, other.log10_e))
            .then_with(|| other.total_length().cmp(&self.total_length()))
            .then_with(|| mine.tie_rank.cmp(&theirs.tie_rank))
            .then_with(|| self.provenance.cmp(&other.provenance))
            .then_with(|| self.classification_code.cmp(&other.classification_code))
    }

    ///
    /// Comma-joined record-relative header of all regions with observed
    /// residues, e.g. `A:3-87,A:120-160`.
    ///
    pub fn header(&self, space: &CoordinateSpace) -> Option<String> {
        let parts: Vec<String> = self.regions.iter().filter_map(|r| r.header(space)).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(","))
        }
    }

    /// [Annotation::header], falling back to classic 1-based numbering.
    pub fn display_header(&self, space: &CoordinateSpace) -> String {
        self.header(space).unwrap_or_else(|| {
            self.regions
                .iter()
                .map(Region::to_seq_string)
                .collect::<Vec<_>>()
                .join(",")
        })
    }

    ///
    /// Parse a comma-joined header into an annotation of `source`.
    ///
    pub fn parse_header(
        text: &str,
        space: &CoordinateSpace,
        source: EvidenceSource,
        snap_to_observed: bool,
    ) -> ConsensusResult<Annotation> {
        let regions = text
            .split(',')
            .map(|token| Region::parse(token, space, snap_to_observed))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Annotation::with_regions(source, regions))
    }

    pub fn is_whole_chain(&self, space: &CoordinateSpace) -> bool {
        matches!(self.regions.as_slice(), [only] if only.is_whole_chain(space))
    }

    /// One line describing the evidence.
    pub fn description(&self) -> String {
        let evalue = if self.log10_e.is_nan() {
            String::new()
        } else {
            format!(", log10 E {:.1}", self.log10_e)
        };
        match self.source {
            EvidenceSource::Unknown => "unassigned region".to_string(),
            EvidenceSource::Blast => {
                let identity = self
                    .identity
                    .map(|id| format!(", {}% identity", id))
                    .unwrap_or_default();
                format!("BLAST hit to {}{}{}", self.provenance, evalue, identity)
            }
            EvidenceSource::Pfam => format!("Pfam model {}{}", self.provenance, evalue),
            EvidenceSource::Fam => format!("family profile {}{}", self.provenance, evalue),
            EvidenceSource::Sf => format!("superfamily profile {}{}", self.provenance, evalue),
            EvidenceSource::ScopSeqMatch => format!("sequence match to {}", self.provenance),
        }
    }
}

/// Ascending, with missing E-values last.
fn compare_log10_e(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
    }
}
