use bitvec::prelude::*;

///
/// Residue coverage over a fixed-length chain.
///
/// Backed by a bit vector whose length is fixed at construction; every
/// position starts uncovered. Run queries walk the vector left to right with
/// next-set / next-clear scans, so their cost is proportional to the number of
/// runs rather than the number of positions.
///
/// # Examples
///
/// ```
/// use asteroids_coverage::Coverage;
///
/// let mut coverage = Coverage::new(10);
/// coverage.set(2, 2);
/// coverage.set(7, 1);
///
/// assert_eq!(coverage.n_covered(1), 3);
/// assert_eq!(coverage.longest_uncovered(), 3);
/// assert_eq!(coverage.find_longest_uncovered(), Some((4, 3)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coverage {
    bits: BitVec,
}

impl Coverage {
    pub fn new(len: usize) -> Self {
        Coverage {
            bits: bitvec![0; len],
        }
    }

    /// Coverage of length `len` with every `(start, length)` run set.
    pub fn from_runs<I>(len: usize, runs: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut coverage = Coverage::new(len);
        for (start, length) in runs {
            coverage.set(start, length);
        }
        coverage
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Clamp `[start, start + length)` to the vector.
    fn span(&self, start: usize, length: usize) -> std::ops::Range<usize> {
        let end = start.saturating_add(length).min(self.len());
        start.min(end)..end
    }

    /// Mark `[start, start + length)` covered. Positions past the end are ignored.
    pub fn set(&mut self, start: usize, length: usize) {
        let span = self.span(start, length);
        self.bits[span].fill(true);
    }

    /// Mark `[start, start + length)` uncovered.
    pub fn clear(&mut self, start: usize, length: usize) {
        let span = self.span(start, length);
        self.bits[span].fill(false);
    }

    /// Invert every position of `[start, start + length)`.
    pub fn flip(&mut self, start: usize, length: usize) {
        for i in self.span(start, length) {
            let covered = self.bits[i];
            self.bits.set(i, !covered);
        }
    }

    pub fn is_covered(&self, index: usize) -> bool {
        self.bits.get(index).is_some_and(|bit| *bit)
    }

    /// Maximal runs of covered positions as `(start, length)`, left to right.
    pub fn covered_runs(&self) -> Runs<'_> {
        Runs {
            bits: &self.bits,
            pos: 0,
            covered: true,
        }
    }

    /// Maximal runs of uncovered positions as `(start, length)`, left to right.
    pub fn uncovered_runs(&self) -> Runs<'_> {
        Runs {
            bits: &self.bits,
            pos: 0,
            covered: false,
        }
    }

    ///
    /// Total covered positions lying in covered runs of at least `n`.
    ///
    /// For `n <= 1` this is simply the number of covered positions.
    ///
    pub fn n_covered(&self, n: usize) -> usize {
        if n <= 1 {
            return self.bits.count_ones();
        }
        self.covered_runs()
            .filter(|&(_, len)| len >= n)
            .map(|(_, len)| len)
            .sum()
    }

    /// Total uncovered positions lying in uncovered runs of at least `n`.
    pub fn n_uncovered(&self, n: usize) -> usize {
        if n <= 1 {
            return self.bits.count_zeros();
        }
        self.uncovered_runs()
            .filter(|&(_, len)| len >= n)
            .map(|(_, len)| len)
            .sum()
    }

    pub fn longest_covered(&self) -> usize {
        longest(self.covered_runs()).map_or(0, |(_, len)| len)
    }

    pub fn longest_uncovered(&self) -> usize {
        longest(self.uncovered_runs()).map_or(0, |(_, len)| len)
    }

    ///
    /// Longest uncovered run as `(start, length)`.
    ///
    /// Ties go to the leftmost run. Returns `None` when everything is covered.
    ///
    pub fn find_longest_uncovered(&self) -> Option<(usize, usize)> {
        longest(self.uncovered_runs())
    }

    /// Longest covered run as `(start, length)`, leftmost on ties.
    pub fn find_longest_covered(&self) -> Option<(usize, usize)> {
        longest(self.covered_runs())
    }

    /// Cover every uncovered run shorter than `n`.
    pub fn cover_short(&mut self, n: usize) {
        let short: Vec<(usize, usize)> = self
            .uncovered_runs()
            .filter(|&(_, len)| len < n)
            .collect();
        for (start, len) in short {
            self.set(start, len);
        }
    }
}

/// A later run must be strictly longer to replace the current best.
fn longest(runs: Runs<'_>) -> Option<(usize, usize)> {
    runs.fold(None, |best, run| match best {
        Some((_, best_len)) if run.1 <= best_len => best,
        _ => Some(run),
    })
}

/// Iterator over maximal runs of one bit value.
pub struct Runs<'a> {
    bits: &'a BitSlice,
    pos: usize,
    covered: bool,
}

impl Iterator for Runs<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.bits.get(self.pos..)?;
        let offset = if self.covered {
            rest.first_one()
        } else {
            rest.first_zero()
        }?;
        let start = self.pos + offset;

        let tail = &self.bits[start..];
        let len = if self.covered {
            tail.first_zero()
        } else {
            tail.first_one()
        }
        .unwrap_or(tail.len());

        self.pos = start + len;
        Some((start, len))
    }
}
