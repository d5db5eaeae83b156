// crates/zfold-core/src/lib.rs

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Core value types for the zfold statistical-mechanical RNA folding engine.
//!
//! This crate holds everything the DP engine and the CLI share:
//! - [`FoldParams`]: the seven-parameter loop/stacking/coax energy model,
//! - [`Topology`]: concatenated strands, cutpoints, and the cyclic
//!   intervening-cutpoint predicate,
//! - [`DpMatrix`]: a dense cyclic N×N table with value, derivative, and
//!   contribution-ledger channels,
//! - the base-pair-type registry, dot-bracket rendering, and fold-report
//!   serialization (JSON/CBOR).

pub mod io;
pub mod pairs;
pub mod params;
pub mod report;
pub mod secstruct;
pub mod tables;
pub mod topology;

// ---- Re-exports for workspace compatibility ----
pub use pairs::{BasePairRegistry, BasePairType, PairRule};
pub use params::FoldParams;
pub use report::FoldReport;
pub use tables::{Branch, Contribution, DpMatrix, TableId};
pub use topology::Topology;
