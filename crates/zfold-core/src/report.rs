//! Serializable summary of one engine run.

use serde::{Deserialize, Serialize};

/// Everything `fold` returns, in a shape fit for JSON/CBOR persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoldReport {
    /// Concatenated input sequence.
    pub sequence: String,
    /// Whether the molecule was circularized.
    pub circular: bool,
    /// Number of residues.
    pub n: usize,
    /// Total partition function (origin 0 estimate).
    pub z: f64,
    /// Derivative of Z w.r.t. Kd_BP; 0 when derivatives were disabled.
    pub dz: f64,
    /// Base-pair probability matrix, row-major N×N.
    pub bpp: Vec<f64>,
    /// Minimum-free-energy structure as (i, j) pairs.
    pub mfe_pairs: Vec<(usize, usize)>,
    /// Boltzmann probability of the MFE structure.
    pub mfe_probability: f64,
    /// MFE structure in dot-bracket notation, `+` at chain breaks.
    pub mfe_dot_bracket: String,
}

impl FoldReport {
    /// Base-pair probability for `(i, j)`.
    #[inline]
    #[must_use]
    pub fn bpp(&self, i: usize, j: usize) -> f64 {
        self.bpp[(i % self.n) * self.n + (j % self.n)]
    }
}
