//! The seven-parameter statistical-mechanical model for RNA folding.
//!
//! Defaults are the reference values the model was characterized with; all
//! quantities are effective molarities (M) or dimensionless penalties.

use serde::{Deserialize, Serialize};

/// Parameter bundle consumed by the partition-function engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoldParams {
    /// Effective molarity for starting each loop (M).
    pub c_init: f64,
    /// Effective-molarity penalty per linkage in a loop (dimensionless).
    pub l: f64,
    /// Dissociation constant for forming a base pair (M).
    pub kd_bp: f64,
    /// Effective-molarity penalty per base pair in a loop (dimensionless).
    pub l_bp: f64,
    /// Effective molarity for forming a stacked pair (M).
    pub c_eff_stacked_pair: f64,
    /// Bonus for contiguous coaxial helices; 0 turns coax off (dimensionless).
    pub k_coax: f64,
    /// Effective-molarity bonus per coaxial stack in a loop (dimensionless).
    pub l_coax: f64,
    /// Standard-state concentration, 1 M; drops out up to overall scale.
    pub c_std: f64,
    /// Minimum number of unpaired residues in an apical loop.
    pub min_loop_length: usize,
    /// Permit three-way junctions with a coaxial stack and a helix meeting
    /// with no spacer nucleotides.
    pub allow_strained_3wj: bool,
}

impl Default for FoldParams {
    fn default() -> Self {
        Self {
            c_init: 1.0,
            l: 0.5,
            kd_bp: 0.0002,
            l_bp: 0.2,
            c_eff_stacked_pair: 1e4,
            k_coax: 100.0,
            // Initial guess: c_eff_stacked_pair / (c_init * l * k_coax).
            l_coax: 200.0,
            c_std: 1.0,
            min_loop_length: 1,
            allow_strained_3wj: false,
        }
    }
}

impl FoldParams {
    /// Same model with coaxial stacking disabled.
    #[must_use]
    pub fn without_coax(mut self) -> Self {
        self.k_coax = 0.0;
        self
    }
}
