//! Consensus protein domain boundaries.
//!
//! Umbrella crate re-exporting the workspace members behind cargo features:
//!
//! - `core`: alignment records, coordinate translation and regions
//! - `coverage`: run-length aware coverage bit vectors
//! - `consensus`: the consensus engine, its configuration and evidence stores

#[cfg(feature = "core")]
#[doc(inline)]
pub use asteroids_core as core;

#[cfg(feature = "coverage")]
#[doc(inline)]
pub use asteroids_coverage as coverage;

#[cfg(feature = "consensus")]
#[doc(inline)]
pub use asteroids_consensus as consensus;
