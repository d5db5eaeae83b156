// crates/zfold-core/src/topology.rs

//! Strand layout on a cyclic coordinate system.
//!
//! One or more strands are concatenated into a single sequence of length N
//! indexed modulo N. A *cutpoint* at `i` means the covalent bond between
//! residue `i` and `(i+1) % N` is absent: a chain break between strands, or
//! the open end of a non-circular molecule (position N−1 is forced to be a
//! cutpoint in that case).

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Immutable sequence + cutpoint information shared by all DP tables.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Topology {
    sequence: String,
    bases: Vec<char>,
    is_cutpoint: Vec<bool>,
    /// Row-major N×N: true iff a cutpoint lies on the forward bonds i..j−1.
    any_intervening_cutpoint: Vec<bool>,
    n: usize,
    circular: bool,
}

impl Topology {
    /// Build the topology for `strands`, concatenated in order.
    ///
    /// Chain breaks are marked between consecutive strands; unless `circular`,
    /// the bond closing the cycle (position N−1) is also broken.
    ///
    /// # Errors
    /// Rejects an empty strand list and empty strands.
    pub fn from_strands<S: AsRef<str>>(strands: &[S], circular: bool) -> Result<Self> {
        if strands.is_empty() {
            bail!("at least one strand is required");
        }
        let mut sequence = String::new();
        let mut is_cutpoint = Vec::new();
        for (k, s) in strands.iter().enumerate() {
            let s = s.as_ref();
            if s.is_empty() {
                bail!("strand {} is empty", k);
            }
            sequence.push_str(s);
            let len = s.chars().count();
            is_cutpoint.extend(std::iter::repeat(false).take(len - 1));
            // Chain break after every strand but the last.
            is_cutpoint.push(k + 1 < strands.len());
        }
        let n = is_cutpoint.len();
        if !circular {
            is_cutpoint[n - 1] = true;
        }

        let any_intervening_cutpoint = intervening_cutpoints(&is_cutpoint);
        let bases = sequence.chars().collect();
        Ok(Self {
            sequence,
            bases,
            is_cutpoint,
            any_intervening_cutpoint,
            n,
            circular,
        })
    }

    /// Convenience constructor for a single strand.
    ///
    /// # Errors
    /// Rejects an empty sequence.
    pub fn single(sequence: &str, circular: bool) -> Result<Self> {
        Self::from_strands(&[sequence], circular)
    }

    /// Total number of residues.
    #[inline]
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Concatenated sequence.
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Whether the molecule was circularized.
    #[inline]
    #[must_use]
    pub const fn circular(&self) -> bool {
        self.circular
    }

    /// Residue at position `i` (index taken modulo N).
    #[inline]
    #[must_use]
    pub fn base(&self, i: usize) -> char {
        self.bases[i % self.n]
    }

    /// Is the bond between `i` and `i+1` absent? Index taken modulo N.
    #[inline]
    #[must_use]
    pub fn is_cutpoint(&self, i: usize) -> bool {
        self.is_cutpoint[i % self.n]
    }

    /// Does any cutpoint lie strictly between `i` and `j` along the forward
    /// (cyclic) direction? `cut_between(i, i)` is always false.
    #[inline]
    #[must_use]
    pub fn cut_between(&self, i: usize, j: usize) -> bool {
        self.any_intervening_cutpoint[(i % self.n) * self.n + (j % self.n)]
    }
}

/// Dense predicate: walking forward from `i`, has a cutpoint been crossed
/// before reaching `j`?
fn intervening_cutpoints(is_cutpoint: &[bool]) -> Vec<bool> {
    let n = is_cutpoint.len();
    let mut table = vec![false; n * n];
    for i in 0..n {
        let mut found = false;
        for offset in 0..n {
            let j = (i + offset) % n;
            table[i * n + j] = found;
            if is_cutpoint[j] {
                found = true;
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_single_strand_marks_terminal_cutpoint() {
        let t = Topology::single("CGCG", false).unwrap();
        assert_eq!(t.n(), 4);
        assert!(!t.is_cutpoint(0));
        assert!(!t.is_cutpoint(2));
        assert!(t.is_cutpoint(3));
        // Index arithmetic is cyclic.
        assert!(t.is_cutpoint(7));
    }

    #[test]
    fn circular_single_strand_has_no_cutpoints() {
        let t = Topology::single("CGCG", true).unwrap();
        assert!((0..4).all(|i| !t.is_cutpoint(i)));
        assert!((0..4).all(|i| (0..4).all(|j| !t.cut_between(i, j))));
    }

    #[test]
    fn strand_breaks_land_between_strands() {
        let t = Topology::from_strands(&["CG", "CG"], false).unwrap();
        assert_eq!(t.sequence(), "CGCG");
        assert!(t.is_cutpoint(1));
        assert!(t.is_cutpoint(3));
        assert!(!t.is_cutpoint(0));
        assert!(!t.is_cutpoint(2));
    }

    #[test]
    fn intervening_cutpoint_is_strict_and_cyclic() {
        let t = Topology::single("CGCG", false).unwrap();
        // Forward arc 0 -> 3 crosses bonds 0,1,2 only: no cut.
        assert!(!t.cut_between(0, 3));
        // Forward arc 3 -> 0 crosses bond 3: cut.
        assert!(t.cut_between(3, 0));
        // Diagonal is always false.
        assert!((0..4).all(|i| !t.cut_between(i, i)));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(Topology::from_strands::<&str>(&[], false).is_err());
        assert!(Topology::from_strands(&["CG", ""], false).is_err());
    }
}
