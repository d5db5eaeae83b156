// crates/zfold-engine/src/partition.rs

//! The partition-function state machine and its driver loop.
//!
//! [`Partition`] owns the five core DP tables, the two singlet-exclusion
//! variants of `C_eff`, and one `Z_BP` sub-table per registered base-pair
//! type. `run` fills them bottom-up over subfragment lengths; every cell at
//! offset `d` reads only cells at offsets `< d`, so each cell is written
//! exactly once and is final from then on. Traceback later recomputes
//! individual cells with contribution capture enabled, which never touches
//! the stored values.

use anyhow::Result;
use zfold_core::secstruct;
use zfold_core::{BasePairRegistry, DpMatrix, FoldParams, FoldReport, Topology};

/// DP state for one sequence/topology under one parameter bundle.
#[derive(Clone, Debug)]
pub struct Partition {
    pub(crate) topo: Topology,
    pub(crate) params: FoldParams,
    pub(crate) calc_deriv: bool,
    pub(crate) registry: BasePairRegistry,

    // Five core tables.
    pub(crate) z_bp: DpMatrix,
    pub(crate) z_coax: DpMatrix,
    pub(crate) c_eff: DpMatrix,
    pub(crate) z_linear: DpMatrix,
    pub(crate) z_cut: DpMatrix,

    // C_eff variants that exclude strained three-way junctions.
    pub(crate) c_eff_no_coax: DpMatrix,
    pub(crate) c_eff_no_pair: DpMatrix,

    // One Z_BP sub-table per base-pair type, parallel to `registry.types`.
    pub(crate) bp_tables: Vec<DpMatrix>,

    // Finalization products.
    pub(crate) z_final: Vec<f64>,
    pub(crate) dz_final: Vec<f64>,
    pub(crate) bpp: Vec<f64>,
}

impl Partition {
    /// Allocate all tables for `topo` under `params`.
    ///
    /// Diagonal initialization: `Z_linear[i][i] = 1`, `C_eff[i][i] = C_init`
    /// (and its two singlet-exclusion copies); everything else starts at zero.
    #[must_use]
    pub fn new(topo: Topology, params: FoldParams, calc_deriv: bool) -> Self {
        let n = topo.n();
        let registry = BasePairRegistry::rna(params.kd_bp);
        let bp_tables = vec![DpMatrix::new(n); registry.len()];
        Self {
            topo,
            params,
            calc_deriv,
            registry,
            z_bp: DpMatrix::new(n),
            z_coax: DpMatrix::new(n),
            c_eff: DpMatrix::with_diagonal(n, params.c_init),
            z_linear: DpMatrix::with_diagonal(n, 1.0),
            z_cut: DpMatrix::new(n),
            c_eff_no_coax: DpMatrix::with_diagonal(n, params.c_init),
            c_eff_no_pair: DpMatrix::with_diagonal(n, params.c_init),
            bp_tables,
            z_final: Vec::new(),
            dz_final: Vec::new(),
            bpp: Vec::new(),
        }
    }

    /// Fill all DP tables and the finalization products.
    ///
    /// Iteration order is load-bearing: offsets grow outward from the
    /// diagonal, and within a cell the operators run in the order
    /// `Z_cut, Z_BP, Z_coax, C_eff, Z_linear` because each consumes the
    /// earlier ones at the same `(i, j)`.
    pub fn run(&mut self) {
        let n = self.topo.n();
        for offset in 1..n {
            for i in 0..n {
                let j = (i + offset) % n;
                self.update_z_cut(i, j, false);
                self.update_z_bp(i, j, false);
                self.update_z_coax(i, j, false);
                self.update_c_eff(i, j, false);
                self.update_z_linear(i, j, false);
            }
        }
        self.compute_finals();
    }

    /// Strand topology this partition was built over.
    #[inline]
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topo
    }

    /// Parameter bundle in effect.
    #[inline]
    #[must_use]
    pub const fn params(&self) -> &FoldParams {
        &self.params
    }

    /// Number of residues.
    #[inline]
    #[must_use]
    pub fn n(&self) -> usize {
        self.topo.n()
    }

    /// Total partition function (origin-0 estimate).
    #[inline]
    #[must_use]
    pub fn z(&self) -> f64 {
        self.z_final[0]
    }

    /// Derivative of Z w.r.t. Kd_BP (origin-0 estimate).
    #[inline]
    #[must_use]
    pub fn dz(&self) -> f64 {
        self.dz_final[0]
    }

    /// Partition-function estimate closed at `origin`.
    #[inline]
    #[must_use]
    pub fn z_final(&self, origin: usize) -> f64 {
        self.z_final[origin % self.topo.n()]
    }

    /// Derivative estimate closed at `origin`.
    #[inline]
    #[must_use]
    pub fn dz_final(&self, origin: usize) -> f64 {
        self.dz_final[origin % self.topo.n()]
    }

    /// Probability that residues `i` and `j` pair.
    #[inline]
    #[must_use]
    pub fn bpp(&self, i: usize, j: usize) -> f64 {
        let n = self.topo.n();
        self.bpp[(i % n) * n + (j % n)]
    }

    /// Row-major N×N base-pair probability matrix.
    #[inline]
    #[must_use]
    pub fn bpp_matrix(&self) -> &[f64] {
        &self.bpp
    }

    /// Aggregate `Z_BP` value at `(i, j)`.
    #[inline]
    #[must_use]
    pub fn z_bp(&self, i: usize, j: usize) -> f64 {
        self.z_bp.get(i, j)
    }

    /// `Z_coax` value at `(i, j)`.
    #[inline]
    #[must_use]
    pub fn z_coax(&self, i: usize, j: usize) -> f64 {
        self.z_coax.get(i, j)
    }

    /// Per-base-pair-type `Z_BP` sub-table value at `(i, j)`.
    #[inline]
    #[must_use]
    pub fn z_bp_for_type(&self, t: usize, i: usize, j: usize) -> f64 {
        self.bp_tables[t].get(i, j)
    }

    /// Registered base-pair types.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &BasePairRegistry {
        &self.registry
    }
}

/// Run the whole pipeline for `strands`: build the topology, fill the
/// tables, cross-check, trace the MFE structure, and package a report.
///
/// `dz` in the report is zero unless `calc_deriv` is set.
///
/// # Errors
/// Propagates topology validation failures, cross-check violations, and
/// traceback cardinality violations.
pub fn fold<S: AsRef<str>>(
    strands: &[S],
    params: FoldParams,
    circular: bool,
    calc_deriv: bool,
) -> Result<FoldReport> {
    let topo = Topology::from_strands(strands, circular)?;
    let mut part = Partition::new(topo, params, calc_deriv);
    part.run();
    part.cross_checks()?;
    let (mfe_pairs, mfe_probability) = part.mfe()?;

    Ok(FoldReport {
        sequence: part.topology().sequence().to_string(),
        circular,
        n: part.n(),
        z: part.z(),
        dz: if calc_deriv { part.dz() } else { 0.0 },
        bpp: part.bpp_matrix().to_vec(),
        mfe_dot_bracket: secstruct::dot_bracket_with_breaks(&mfe_pairs, part.topology()),
        mfe_pairs,
        mfe_probability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_z_bp_is_the_sum_of_type_subtables() {
        let topo = Topology::from_strands(&["CG", "CG"], false).unwrap();
        let mut p = Partition::new(topo, FoldParams::default(), false);
        p.run();
        let n = p.n();
        for i in 0..n {
            for j in 0..n {
                let sum: f64 = (0..p.registry().len())
                    .map(|t| p.z_bp_for_type(t, i, j))
                    .sum();
                let agg = p.z_bp(i, j);
                let tol = 1e-9 * agg.abs().max(1.0);
                assert!((agg - sum).abs() < tol, "mismatch at ({i},{j})");
            }
        }
    }

    #[test]
    fn single_residue_runs() {
        let topo = Topology::single("A", false).unwrap();
        let mut p = Partition::new(topo, FoldParams::default(), true);
        p.run();
        assert!((p.z() - 1.0).abs() < 1e-12);
        p.cross_checks().unwrap();
    }
}
