// crates/zfold-engine/src/lib.rs

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Statistical-mechanical partition function for RNA secondary structure.
//!
//! The engine fills five interdependent cyclic N×N tables in a fixed
//! dependency order (`Z_cut`, `Z_BP`, `Z_coax`, `C_eff`, `Z_linear`), closes
//! the cycle independently from every origin, and cross-checks that all N
//! estimates of the partition function agree. Structures are recovered by
//! descending a contribution ledger that is recomputed cell-by-cell on
//! demand.
//!
//! ## Entry points
//! - [`fold`]: build, run, cross-check, trace the MFE structure in one shot,
//!   and return a [`zfold_core::FoldReport`].
//! - [`Partition`]: the underlying state machine, for callers that want the
//!   tables, per-origin estimates, Boltzmann sampling, or exhaustive
//!   enumeration.

pub mod finalize;
pub mod partition;
pub mod recursions;
pub mod traceback;

pub use partition::{fold, Partition};
pub use traceback::TracebackMode;

// Re-export the core vocabulary so engine users need a single import.
pub use zfold_core::{FoldParams, FoldReport, Topology};
