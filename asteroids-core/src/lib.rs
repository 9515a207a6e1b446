//! Core models for reconciling protein domain boundaries along a chain.
//!
//! This crate provides the coordinate layer the rest of the workspace builds on:
//!
//! - [`Raf`](models::Raf): a parsed alignment record mapping every nominal
//!   residue of a chain to its observed (ATOM) and nominal (SEQRES) identity,
//!   with `B`/`M`/`E` sentinels for unresolved residues.
//! - [`CoordinateSpace`](models::CoordinateSpace): translation between
//!   whole-chain sequence indices and record indices for a chosen
//!   [`SequenceSource`](models::SequenceSource).
//! - [`Region`](models::Region): a half-open interval of sequence indices with
//!   overlap metrics, boundary extension and header (de)serialization.
//!
//! ## Quick Start
//!
//! ```rust
//! use asteroids_core::models::{CoordinateSpace, Raf, Region, SequenceSource};
//!
//! let line = format!(
//!     "{:<28}{:<5}{:<5}{}",
//!     "1abcA", "1", "3", "1    mm2    kkM    .aE    .g"
//! );
//! let raf: Raf = line.parse().unwrap();
//! let space = CoordinateSpace::new(&raf, SequenceSource::Seqres);
//!
//! assert_eq!(space.sequence(), "mkag");
//! assert_eq!(Region::new(0, 4).header(&space).as_deref(), Some("A:1-2"));
//! ```

pub mod errors;
pub mod models;
pub mod utils;
