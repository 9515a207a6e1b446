//! Run-length aware coverage over a fixed-length bit vector.
//!
//! [`Coverage`] records which residues of a chain are claimed by some
//! interval and answers run queries over the result: how many residues sit in
//! covered (or uncovered) runs of at least a given length, which run is the
//! longest, and so on. The consensus engine uses it to find unassigned
//! stretches of a chain; it is equally useful for coverage statistics.

/// Fixed-length coverage bit vector.
///
/// See [`Coverage`] for details.
pub mod coverage;

// re-exports
pub use self::coverage::{Coverage, Runs};
