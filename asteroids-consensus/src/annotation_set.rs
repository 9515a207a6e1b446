use log::{debug, info};
use serde::{Deserialize, Serialize};

use asteroids_core::models::{CoordinateSpace, Direction, Raf, Region, SequenceSource};
use asteroids_coverage::Coverage;

use crate::annotation::{Annotation, SortMode};
use crate::config::ConsensusConfig;
use crate::errors::{ConsensusError, ConsensusResult};
use crate::source::EvidenceSource;

/// Domain identifier suffixes, in assignment order.
pub const SID_ALPHABET: &str = "123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0";

/// Suffix of the single domain spanning a whole chain.
pub const WHOLE_CHAIN_SUFFIX: char = '_';

///
/// Lifecycle of an [AnnotationSet]. Transitions only move forward.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusState {
    Empty,
    Accumulating,
    PostProcessed,
    Finalized,
}

///
/// Stable address of one region inside an [AnnotationSet]: the index of the
/// owning accepted annotation and of the region within it.
///
/// Passes that walk "all regions" collect handles and edit through them, so
/// every change lands in the owning annotation.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionHandle {
    pub annotation: usize,
    pub region: usize,
}

/// One finalized domain, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DomainAssignment {
    pub sid: Option<String>,
    pub header: String,
    pub regions: Vec<Region>,
    pub source: EvidenceSource,
    pub record_id: Option<u64>,
}

///
/// The consensus engine for one chain.
///
/// Candidates are offered in priority order through [AnnotationSet::annotate]
/// and accepted greedily; post-processing passes then tidy the accepted layout
/// and [AnnotationSet::assign_sids] finalizes it.
///
#[derive(Debug, Clone)]
pub struct AnnotationSet {
    chain_id: String,
    chain_sid: String,
    raf: Raf,
    source: SequenceSource,
    seq_len: usize,
    accepted: Vec<Annotation>,
    state: ConsensusState,
    report: String,
}

impl AnnotationSet {
    ///
    /// Create an empty set for a chain.
    ///
    /// The identifier stem defaults to the structure code followed by the
    /// lowercased chain letter (`_` for chains without one).
    ///
    pub fn new(chain_id: &str, raf: Raf, source: SequenceSource) -> Self {
        let chain_sid = format!(
            "{}{}",
            raf.code(),
            raf.chain().map_or('_', |c| c.to_ascii_lowercase())
        );
        let seq_len = CoordinateSpace::new(&raf, source).seq_len();
        AnnotationSet {
            chain_id: chain_id.to_string(),
            chain_sid,
            raf,
            source,
            seq_len,
            accepted: Vec::new(),
            state: ConsensusState::Empty,
            report: String::new(),
        }
    }

    pub fn with_chain_sid(mut self, chain_sid: &str) -> Self {
        self.chain_sid = chain_sid.to_string();
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn chain_sid(&self) -> &str {
        &self.chain_sid
    }

    pub fn raf(&self) -> &Raf {
        &self.raf
    }

    pub fn space(&self) -> CoordinateSpace<'_> {
        CoordinateSpace::new(&self.raf, self.source)
    }

    /// Length of the whole-chain sequence.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn state(&self) -> ConsensusState {
        self.state
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.accepted
    }

    /// One line per accept, reject and pass edit, in order.
    pub fn report(&self) -> &str {
        &self.report
    }

    /// Every accepted region, ordered by start.
    pub fn region_handles(&self) -> Vec<RegionHandle> {
        let mut handles: Vec<RegionHandle> = self
            .accepted
            .iter()
            .enumerate()
            .flat_map(|(a, annotation)| {
                (0..annotation.regions().len()).map(move |r| RegionHandle {
                    annotation: a,
                    region: r,
                })
            })
            .collect();
        handles.sort_by_key(|h| (region_at(&self.accepted, *h).and_then(|r| r.start), *h));
        handles
    }

    pub fn region(&self, handle: RegionHandle) -> Option<&Region> {
        region_at(&self.accepted, handle)
    }

    fn all_regions(&self) -> Vec<Region> {
        self.accepted
            .iter()
            .flat_map(|a| a.regions().iter().copied())
            .collect()
    }

    fn ensure(&self, operation: &'static str, allowed: &[ConsensusState]) -> ConsensusResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ConsensusError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn begin_pass(&mut self, operation: &'static str) -> ConsensusResult<()> {
        self.ensure(
            operation,
            &[
                ConsensusState::Empty,
                ConsensusState::Accumulating,
                ConsensusState::PostProcessed,
            ],
        )?;
        self.state = ConsensusState::PostProcessed;
        Ok(())
    }

    ///
    /// Offer a candidate to the set.
    ///
    /// The candidate is rejected when it overlaps the accepted regions by more
    /// than `min(max_overlap, length / 2)` residues. Otherwise a copy, with any
    /// overlapping residues removed, joins the set and is returned.
    ///
    pub fn annotate(
        &mut self,
        candidate: &Annotation,
        max_overlap: usize,
    ) -> ConsensusResult<Option<&Annotation>> {
        self.ensure("annotate", &[ConsensusState::Empty, ConsensusState::Accumulating])?;
        if !candidate.is_loaded() {
            return Err(ConsensusError::UnloadedCandidate(describe(candidate)));
        }
        self.state = ConsensusState::Accumulating;

        if candidate.is_empty() {
            return Ok(None);
        }

        let accepted = self.all_regions();
        let overlap = candidate.overlap_with(&accepted);
        let threshold = max_overlap.min(candidate.total_length() / 2);
        if overlap > threshold {
            let line = format!(
                "rejected {} (overlap {} > {})",
                describe(candidate),
                overlap,
                threshold
            );
            debug!("{}: {}", self.chain_id, line);
            note(&mut self.report, line);
            return Ok(None);
        }

        let mut copy = candidate.clone();
        if overlap > 0 {
            copy.remove_overlap(&accepted);
        }
        let line = format!("accepted {} as {}", describe(candidate), layout(copy.regions()));
        debug!("{}: {}", self.chain_id, line);
        note(&mut self.report, line);

        self.accepted.push(copy);
        Ok(self.accepted.last())
    }

    ///
    /// Merge regions of the same annotation separated by fewer than
    /// `min_gap_length` residues.
    ///
    /// Each annotation is handled on its own and all-or-nothing: if its merged
    /// layout would overlap another annotation more than before, it keeps its
    /// original layout. Returns the number of annotations changed.
    ///
    pub fn fill_gaps(&mut self, min_gap_length: usize) -> ConsensusResult<usize> {
        self.begin_pass("fill gaps")?;

        let mut changed = 0;
        for i in 0..self.accepted.len() {
            let original = self.accepted[i].regions().to_vec();
            let merged = merge_close(&original, min_gap_length);
            if merged.len() == original.len() {
                continue;
            }

            let others: Vec<Region> = self
                .accepted
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .flat_map(|(_, a)| a.regions().iter().copied())
                .collect();
            let before = self.accepted[i].overlap_with(&others);
            let after: usize = merged
                .iter()
                .map(|m| others.iter().map(|o| m.overlap(o)).sum::<usize>())
                .sum();
            if after > before {
                debug!("{}: gap fill of annotation {} blocked by a neighbor", self.chain_id, i);
                continue;
            }

            let line = format!(
                "filled gaps of {}: {} -> {}",
                describe(&self.accepted[i]),
                layout(&original),
                layout(&merged)
            );
            debug!("{}: {}", self.chain_id, line);
            note(&mut self.report, line);
            self.accepted[i].set_regions(merged);
            changed += 1;
        }
        Ok(changed)
    }

    ///
    /// Grow the first region backward and the last region forward to the
    /// nearest gap or chain terminus, when that adds at most `max_extension`
    /// residues. Returns the number of regions changed.
    ///
    pub fn expand_to_near_ends(&mut self, max_extension: usize) -> ConsensusResult<usize> {
        self.begin_pass("expand to chain ends")?;

        let handles = self.region_handles();
        let (Some(&first), Some(&last)) = (handles.first(), handles.last()) else {
            return Ok(0);
        };
        let space = CoordinateSpace::new(&self.raf, self.source);
        let mut changed = 0;
        for (handle, direction) in [(first, Direction::Backward), (last, Direction::Forward)] {
            let Some(region) = region_at_mut(&mut self.accepted, handle) else {
                continue;
            };
            let before = *region;
            if try_extend(region, &space, direction, max_extension, None) {
                note(&mut self.report, format!("extended {} to {}", before, region));
                changed += 1;
            }
        }
        Ok(changed)
    }

    ///
    /// Grow each pair of neighboring regions toward one another, up to the
    /// nearest gap in observed residues, when that adds at most
    /// `max_extension` residues and does not reach the neighbor. Returns the
    /// number of regions changed.
    ///
    pub fn extend_regions_in_atom_res(&mut self, max_extension: usize) -> ConsensusResult<usize> {
        self.begin_pass("extend regions")?;

        let handles = self.region_handles();
        let space = CoordinateSpace::new(&self.raf, self.source);
        let mut changed = 0;
        for pair in handles.windows(2) {
            let (left, right) = (pair[0], pair[1]);

            let limit = region_at(&self.accepted, right).and_then(|r| r.start);
            if let Some(region) = region_at_mut(&mut self.accepted, left) {
                let before = *region;
                if try_extend(region, &space, Direction::Forward, max_extension, limit) {
                    note(&mut self.report, format!("extended {} to {}", before, region));
                    changed += 1;
                }
            }

            let limit = region_at(&self.accepted, left).and_then(|r| r.end());
            if let Some(region) = region_at_mut(&mut self.accepted, right) {
                let before = *region;
                if try_extend(region, &space, Direction::Backward, max_extension, limit) {
                    note(&mut self.report, format!("extended {} to {}", before, region));
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// [AnnotationSet::expand_to_near_ends] followed by
    /// [AnnotationSet::extend_regions_in_atom_res].
    pub fn extend_regions(&mut self, max_extension: usize) -> ConsensusResult<usize> {
        let ends = self.expand_to_near_ends(max_extension)?;
        let inner = self.extend_regions_in_atom_res(max_extension)?;
        Ok(ends + inner)
    }

    ///
    /// Divide short linkers between neighboring regions of two hits whose
    /// source allows it.
    ///
    /// A linker is an unassigned stretch of 1 to `max_linker_size` residues,
    /// all observed. Each side takes a share proportional to the unused
    /// subject residues on its side of its own hit (half each when neither
    /// has any); the left share is rounded and the right side takes the rest.
    /// Returns the number of linkers divided.
    ///
    pub fn add_linker_regions(&mut self, max_linker_size: usize) -> ConsensusResult<usize> {
        self.begin_pass("add linker regions")?;

        let handles = self.region_handles();
        let space = CoordinateSpace::new(&self.raf, self.source);
        let mut changed = 0;
        for pair in handles.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            let (Some(gap_start), Some(gap_stop)) = (
                region_at(&self.accepted, left).and_then(Region::stop),
                region_at(&self.accepted, right).and_then(|r| r.start),
            ) else {
                continue;
            };
            if gap_stop <= gap_start || gap_stop - gap_start > max_linker_size {
                continue;
            }

            let owner_left = &self.accepted[left.annotation];
            let owner_right = &self.accepted[right.annotation];
            if !owner_left.source.traits().splits_linkers
                || !owner_right.source.traits().splits_linkers
            {
                continue;
            }
            if !linker_is_resolved(&space, gap_start, gap_stop) {
                continue;
            }

            let gap = gap_stop - gap_start;
            let left_unused = owner_left.subject.map_or(0, |s| s.unused_after());
            let right_unused = owner_right.subject.map_or(0, |s| s.unused_before());
            let left_share = linker_share(gap, left_unused, right_unused);
            let right_share = gap - left_share;

            if let Some(region) = region_at_mut(&mut self.accepted, left) {
                region.length += left_share;
            }
            if let Some(region) = region_at_mut(&mut self.accepted, right) {
                region.start = Some(gap_stop - right_share);
                region.length += right_share;
            }
            note(
                &mut self.report,
                format!(
                    "split linker {}-{} as {}+{}",
                    gap_start + 1,
                    gap_stop,
                    left_share,
                    right_share
                ),
            );
            changed += 1;
        }
        Ok(changed)
    }

    ///
    /// Add an unassigned annotation for every stretch of at least `min_length`
    /// residues no accepted region covers, and return those stretches.
    ///
    pub fn add_unmatched(&mut self, min_length: usize) -> ConsensusResult<Vec<Region>> {
        self.begin_pass("add unmatched regions")?;

        let coverage = Coverage::from_runs(
            self.seq_len,
            self.all_regions()
                .iter()
                .filter_map(|r| r.start.map(|start| (start, r.length))),
        );
        let unmatched: Vec<Region> = coverage
            .uncovered_runs()
            .filter(|&(_, len)| len >= min_length)
            .map(|(start, len)| Region::new(start, len))
            .collect();

        for region in &unmatched {
            note(&mut self.report, format!("unmatched {}", region));
            self.accepted.push(Annotation::unmatched(*region));
        }
        Ok(unmatched)
    }

    ///
    /// Finalize the set by giving every accepted annotation a domain id.
    ///
    /// A single annotation spanning the whole chain gets the `_` suffix;
    /// otherwise annotations are ordered by position and take suffixes from
    /// [SID_ALPHABET]. Nothing is changed when this fails.
    ///
    pub fn assign_sids(&mut self, prefix: &str) -> ConsensusResult<()> {
        self.ensure(
            "assign identifiers",
            &[
                ConsensusState::Empty,
                ConsensusState::Accumulating,
                ConsensusState::PostProcessed,
            ],
        )?;
        if self.accepted.is_empty() {
            return Err(ConsensusError::EmptyAnnotationSet(self.chain_id.clone()));
        }

        let stem = format!("{}{}", prefix, self.chain_sid);
        let space = CoordinateSpace::new(&self.raf, self.source);
        if self.accepted.len() == 1 && self.accepted[0].is_whole_chain(&space) {
            self.accepted[0].sid = Some(format!("{}{}", stem, WHOLE_CHAIN_SUFFIX));
        } else {
            if self.accepted.len() > SID_ALPHABET.len() {
                return Err(ConsensusError::SidAlphabetExhausted {
                    chain: self.chain_id.clone(),
                    count: self.accepted.len(),
                });
            }
            self.accepted
                .sort_by(|a, b| a.compare_with(b, SortMode::ByPosition));
            for (annotation, suffix) in self.accepted.iter_mut().zip(SID_ALPHABET.chars()) {
                annotation.sort_mode = SortMode::ByPosition;
                annotation.sid = Some(format!("{}{}", stem, suffix));
            }
        }

        for annotation in &self.accepted {
            let line = format!(
                "{} {}",
                annotation.sid.as_deref().unwrap_or_default(),
                annotation.display_header(&space)
            );
            debug!("{}: {}", self.chain_id, line);
            note(&mut self.report, line);
        }
        self.state = ConsensusState::Finalized;
        Ok(())
    }

    ///
    /// Accepted annotations overlapping `candidate`, closest match first.
    ///
    pub fn get_all_matches(&self, candidate: &Annotation) -> Vec<&Annotation> {
        let mut matches: Vec<&Annotation> = self
            .accepted
            .iter()
            .filter(|a| a.total_overlap(candidate) > 0)
            .collect();
        matches.sort_by_key(|a| candidate.match_distance(a));
        matches
    }

    pub fn get_best_match(&self, candidate: &Annotation) -> Option<&Annotation> {
        self.get_all_matches(candidate).into_iter().next()
    }

    ///
    /// Run the whole consensus procedure over `candidates`: priority sort,
    /// greedy acceptance, the configured post-processing passes, and
    /// identifier assignment.
    ///
    pub fn run(
        &mut self,
        mut candidates: Vec<Annotation>,
        config: &ConsensusConfig,
    ) -> ConsensusResult<()> {
        candidates.sort_by(|a, b| a.compare_with(b, SortMode::ByQuality));

        let mut accepted = 0;
        for candidate in &candidates {
            if self.annotate(candidate, config.max_overlap)?.is_some() {
                accepted += 1;
            }
        }
        debug!(
            "{}: accepted {} of {} candidates",
            self.chain_id,
            accepted,
            candidates.len()
        );

        let passes = config.passes;
        if passes.fill_gaps {
            self.fill_gaps(config.min_gap_length)?;
        }
        if passes.extend_regions {
            self.extend_regions(config.max_extension)?;
        }
        if passes.add_linkers {
            self.add_linker_regions(config.max_linker_size)?;
        }
        if passes.fill_gaps {
            self.fill_gaps(config.min_gap_length)?;
        }
        if passes.add_unmatched {
            self.add_unmatched(config.min_unmatched_length)?;
        }

        self.assign_sids(&config.sid_prefix)?;
        info!("{}: {} domains", self.chain_id, self.accepted.len());
        Ok(())
    }

    /// The accepted layout as serializable records.
    pub fn assignments(&self) -> Vec<DomainAssignment> {
        let space = self.space();
        self.accepted
            .iter()
            .map(|annotation| DomainAssignment {
                sid: annotation.sid.clone(),
                header: annotation.display_header(&space),
                regions: annotation.regions().to_vec(),
                source: annotation.source,
                record_id: annotation.record_id,
            })
            .collect()
    }
}

fn region_at(accepted: &[Annotation], handle: RegionHandle) -> Option<&Region> {
    accepted.get(handle.annotation)?.regions().get(handle.region)
}

fn region_at_mut(accepted: &mut [Annotation], handle: RegionHandle) -> Option<&mut Region> {
    accepted.get_mut(handle.annotation)?.regions_mut().get_mut(handle.region)
}

fn note(report: &mut String, line: String) {
    report.push_str(&line);
    report.push('\n');
}

fn describe(annotation: &Annotation) -> String {
    match annotation.record_id {
        Some(id) => format!("{} {}", annotation.source, id),
        None => annotation.source.to_string(),
    }
}

fn layout(regions: &[Region]) -> String {
    regions
        .iter()
        .map(Region::to_seq_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Merge consecutive regions separated by fewer than `min_gap` residues.
fn merge_close(regions: &[Region], min_gap: usize) -> Vec<Region> {
    let mut merged: Vec<Region> = Vec::with_capacity(regions.len());
    for region in regions {
        let Some(start) = region.start else {
            continue;
        };
        match merged.last_mut() {
            Some(previous)
                if previous
                    .stop()
                    .is_some_and(|stop| start.saturating_sub(stop) < min_gap) =>
            {
                let end = region.end().unwrap_or(start);
                if let (Some(first), Some(last)) = (previous.start, previous.end()) {
                    *previous = Region::from_bounds(first, last.max(end));
                }
            }
            _ => merged.push(*region),
        }
    }
    merged
}

///
/// Extend `region` one step toward `direction` and keep the result only if
/// it grew by at most `max_extension` and stays clear of `limit` (the
/// neighbor's first index going forward, its last index going backward).
///
fn try_extend(
    region: &mut Region,
    space: &CoordinateSpace,
    direction: Direction,
    max_extension: usize,
    limit: Option<usize>,
) -> bool {
    let mut trial = *region;
    if !trial.extend_to_near_end(space, direction) {
        return false;
    }
    if trial.length.saturating_sub(region.length) > max_extension {
        return false;
    }
    let clear = match (direction, limit) {
        (_, None) => true,
        (Direction::Forward, Some(next_start)) => {
            trial.end().is_some_and(|end| end < next_start)
        }
        (Direction::Backward, Some(previous_end)) => {
            trial.start.is_some_and(|start| start > previous_end)
        }
    };
    if !clear {
        return false;
    }
    *region = trial;
    true
}

///
/// True when every record slot between the residue ending the left region
/// (`gap_start - 1`) and the one starting the right region (`gap_stop`) is
/// resolved. Works on record slots, so residues absent from the active
/// sequence still count.
///
fn linker_is_resolved(space: &CoordinateSpace, gap_start: usize, gap_stop: usize) -> bool {
    let (Some(left_end), Some(right_start)) = (
        gap_start.checked_sub(1).and_then(|i| space.to_record_index(i)),
        space.to_record_index(gap_stop),
    ) else {
        return false;
    };
    (left_end + 1..right_start).all(|i| space.raf().slot(i).is_some_and(|slot| slot.is_observed()))
}

/// Residues of a `gap` given to its left side.
fn linker_share(gap: usize, left_unused: usize, right_unused: usize) -> usize {
    let total = left_unused + right_unused;
    let share = if total == 0 {
        gap as f64 / 2.0
    } else {
        gap as f64 * left_unused as f64 / total as f64
    };
    (share.round() as usize).min(gap)
}
