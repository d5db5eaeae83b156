// crates/zfold-core/src/tables.rs

//! Dense cyclic DP matrices with value, derivative, and contribution channels.
//!
//! Every table the engine fills is an N×N [`DpMatrix`]:
//! - `q`: partition-function values,
//! - `dq`: analytic derivatives w.r.t. the base-pair dissociation constant,
//! - `contrib`: per-cell contribution lists, populated only when a cell is
//!   recomputed with capture enabled (the ledger is too large to keep during
//!   the forward pass).
//!
//! All row/column indices are reduced modulo N, so callers may pass "virtual"
//! coordinates such as `i + offset` that run past the end of the cycle.

use serde::{Deserialize, Serialize};

/// Identifies the table a traceback branch descends into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableId {
    /// Z_BP: structures pairing i with j.
    BasePair,
    /// Z_coax: structures coaxially stacking (i,k) on (k+1,j).
    Coax,
    /// C_eff: effective molarity of the loop opened at i, closed at j.
    EffMolarity,
    /// C_eff excluding a lone coaxial stack abutting the closing pair.
    EffMolarityNoCoax,
    /// C_eff excluding a lone base pair abutting the closing stack.
    EffMolarityNoPair,
    /// Z_linear: structures on i..j with connectivity throughout.
    Linear,
    /// Z_cut: two independent segments separated by a cutpoint.
    Exterior,
}

/// A sub-problem referenced by a contribution: table + cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Branch {
    /// Table the branch re-expands during traceback.
    pub table: TableId,
    /// Opening index (may be virtual; reduced modulo N on use).
    pub i: usize,
    /// Closing index (may be virtual; reduced modulo N on use).
    pub j: usize,
}

impl Branch {
    /// Construct a branch into `table` at `(i, j)`.
    #[inline]
    #[must_use]
    pub const fn new(table: TableId, i: usize, j: usize) -> Self {
        Self { table, i, j }
    }
}

/// One additive term of a cell: its weight and the sub-problems it depends
/// on. An empty branch list marks a traceback leaf.
#[derive(Clone, Debug, PartialEq)]
pub struct Contribution {
    /// Boltzmann weight of this term.
    pub weight: f64,
    /// Sub-problems whose contribution lists are re-expanded recursively.
    pub branches: Vec<Branch>,
}

/// Dense N×N table addressed on the cyclic coordinate system.
#[derive(Clone, Debug)]
pub struct DpMatrix {
    n: usize,
    q: Vec<f64>,
    dq: Vec<f64>,
    contrib: Vec<Vec<Contribution>>,
}

impl DpMatrix {
    /// All-zero table of side `n`.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            n,
            q: vec![0.0; n * n],
            dq: vec![0.0; n * n],
            contrib: vec![Vec::new(); n * n],
        }
    }

    /// All-zero table with `value` on the diagonal.
    #[must_use]
    pub fn with_diagonal(n: usize, value: f64) -> Self {
        let mut m = Self::new(n);
        for i in 0..n {
            m.q[i * n + i] = value;
        }
        m
    }

    /// Side length N.
    #[inline]
    #[must_use]
    pub const fn n(&self) -> usize {
        self.n
    }

    #[inline]
    fn idx(&self, i: usize, j: usize) -> usize {
        (i % self.n) * self.n + (j % self.n)
    }

    /// Value at `(i, j)`, indices modulo N.
    #[inline]
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.q[self.idx(i, j)]
    }

    /// Derivative at `(i, j)`, indices modulo N.
    #[inline]
    #[must_use]
    pub fn get_deriv(&self, i: usize, j: usize) -> f64 {
        self.dq[self.idx(i, j)]
    }

    /// Value and derivative together (the common read in product-rule terms).
    #[inline]
    #[must_use]
    pub fn get_both(&self, i: usize, j: usize) -> (f64, f64) {
        let k = self.idx(i, j);
        (self.q[k], self.dq[k])
    }

    /// Overwrite value and derivative of a cell. The forward pass writes each
    /// cell exactly once.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, q: f64, dq: f64) {
        let k = self.idx(i, j);
        self.q[k] = q;
        self.dq[k] = dq;
    }

    /// Replace the contribution list of a cell (capture pass only).
    #[inline]
    pub fn set_contribs(&mut self, i: usize, j: usize, contribs: Vec<Contribution>) {
        let k = self.idx(i, j);
        self.contrib[k] = contribs;
    }

    /// Contribution list of a cell (empty unless captured).
    #[inline]
    #[must_use]
    pub fn contribs(&self, i: usize, j: usize) -> &[Contribution] {
        &self.contrib[self.idx(i, j)]
    }
}
