// crates/zfold-engine/src/finalize.rs

//! Closing the cycle: per-origin partition functions, the base-pair
//! probability matrix, and the self-consistency checks.
//!
//! The total partition function can be computed N ways, once per choice of
//! the residue at which the cycle is closed. All N estimates must agree;
//! that agreement is the engine's strongest correctness check and is
//! enforced by [`Partition::cross_checks`].

use crate::partition::Partition;
use crate::recursions::{CellAcc, CeffSel};
use anyhow::{ensure, Result};
use zfold_core::{Branch, TableId};

/// Relative tolerance for the origin-invariance and BPP cross-checks.
const CROSS_CHECK_RTOL: f64 = 1.0e-5;

impl Partition {
    /// Partition function closed at `origin`, with optional contribution
    /// capture for traceback. Reads only finalized tables.
    pub(crate) fn z_final_cell(&self, origin: usize, capture: bool) -> CellAcc {
        let n = self.topo.n();
        let i = origin % n;
        let p = self.params;
        let mut acc = CellAcc::new(capture);

        if self.topo.is_cutpoint(i + n - 1) {
            // The cycle is already broken right before the origin: the whole
            // system is the linear fragment i .. i-1.
            let (z, dz) = self.z_linear.get_both(i, i + n - 1);
            acc.add(z, dz, &[Branch::new(TableId::Linear, i, i + n - 1)]);
            return acc;
        }

        // Otherwise ligate across i-1 -> i. The lone-coax closure is removed
        // from C_eff here since the stacked-pair family below covers it.
        let (c, dc) = self.c_eff_no_coax.get_both(i, i + n - 1);
        let f = p.l / p.c_std;
        acc.add(
            c * f,
            dc * f,
            &[Branch::new(TableId::EffMolarityNoCoax, i, i + n - 1)],
        );

        // Split segments on either side of a cutpoint, combined independently.
        for c_idx in i..i + n - 1 {
            if !self.topo.is_cutpoint(c_idx) {
                continue;
            }
            let (z1, dz1) = self.z_linear.get_both(i, c_idx);
            let (z2, dz2) = self.z_linear.get_both(c_idx + 1, i + n - 1);
            acc.add(
                z1 * z2,
                dz1 * z2 + z1 * dz2,
                &[
                    Branch::new(TableId::Linear, i, c_idx),
                    Branch::new(TableId::Linear, c_idx + 1, i + n - 1),
                ],
            );
        }

        // A stacked pair closing across the junction.
        for j in i + 1..i + n - 1 {
            if self.topo.is_cutpoint(j) {
                continue;
            }
            let (z1, dz1) = self.z_bp.get_both(i, j);
            let (z2, dz2) = self.z_bp.get_both(j + 1, i + n - 1);
            let f = p.c_eff_stacked_pair;
            acc.add(
                z1 * z2 * f,
                (dz1 * z2 + z1 * dz2) * f,
                &[
                    Branch::new(TableId::BasePair, i, j),
                    Branch::new(TableId::BasePair, j + 1, i + n - 1),
                ],
            );
        }

        // A coaxial stack forming across the junction.
        if n >= 2 {
            let coax_sel = if p.allow_strained_3wj {
                CeffSel::Plain
            } else {
                CeffSel::NoPair
            };
            for j in i + 1..i + n - 2 {
                // The two stacked pairs connected by a loop.
                let f = p.l * p.l * p.l_coax * p.k_coax;
                for k in j + 2..i + n - 1 {
                    if self.topo.is_cutpoint(j) || self.topo.is_cutpoint(k - 1) {
                        continue;
                    }
                    let (z1, dz1) = self.z_bp.get_both(i, j);
                    let (c, dc) = self.ceff(coax_sel).get_both(j + 1, k - 1);
                    let (z2, dz2) = self.z_bp.get_both(k, i + n - 1);
                    acc.add(
                        z1 * c * z2 * f,
                        (dz1 * c * z2 + z1 * dc * z2 + z1 * c * dz2) * f,
                        &[
                            Branch::new(TableId::BasePair, i, j),
                            Branch::new(coax_sel.table_id(), j + 1, k - 1),
                            Branch::new(TableId::BasePair, k, i + n - 1),
                        ],
                    );
                }
                // The two stacked pairs in split segments.
                for k in j + 1..i + n - 1 {
                    let (z1, dz1) = self.z_bp.get_both(i, j);
                    let (zc, dzc) = self.z_cut.get_both(j, k);
                    let (z2, dz2) = self.z_bp.get_both(k, i + n - 1);
                    acc.add(
                        z1 * zc * z2 * p.k_coax,
                        (dz1 * zc * z2 + z1 * dzc * z2 + z1 * zc * dz2) * p.k_coax,
                        &[
                            Branch::new(TableId::BasePair, i, j),
                            Branch::new(TableId::Exterior, j, k),
                            Branch::new(TableId::BasePair, k, i + n - 1),
                        ],
                    );
                }
            }
        }

        acc
    }

    /// Fill `z_final`/`dz_final` for every origin and the BPP matrix.
    pub(crate) fn compute_finals(&mut self) {
        let n = self.topo.n();
        self.z_final = Vec::with_capacity(n);
        self.dz_final = Vec::with_capacity(n);
        for i in 0..n {
            let acc = self.z_final_cell(i, false);
            self.z_final.push(acc.q);
            self.dz_final.push(acc.dq);
        }

        // bpp(i,j) pairs the fragment inside (i,j) with the fragment outside.
        let z0 = self.z_final[0];
        let kd = self.params.kd_bp;
        self.bpp = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                self.bpp[i * n + j] = self.z_bp.get(i, j) * self.z_bp.get(j, i) * kd / z0;
            }
        }
    }

    /// Enforce the engine's self-consistency properties.
    ///
    /// # Errors
    /// - some origin's `Z_final` (or, with derivatives on, `dZ_final`)
    ///   deviates from origin 0 by ≥ 1e-5 relative,
    /// - the BPP total by summation disagrees with the total implied by
    ///   `dZ/dKd_BP` by ≥ 1e-5 relative (derivatives on only).
    pub fn cross_checks(&self) -> Result<()> {
        let n = self.topo.n();
        let z0 = self.z_final[0];
        ensure!(z0 > 0.0, "partition function must be positive, got {z0}");
        for i in 0..n {
            let rel = ((self.z_final[i] - z0) / z0).abs();
            ensure!(
                rel < CROSS_CHECK_RTOL,
                "Z_final[{i}] = {} disagrees with Z_final[0] = {} (rel {rel:e})",
                self.z_final[i],
                z0
            );
        }

        if self.calc_deriv {
            let dz0 = self.dz_final[0];
            if dz0 != 0.0 {
                for i in 0..n {
                    let rel = ((self.dz_final[i] - dz0) / dz0).abs();
                    ensure!(
                        rel < CROSS_CHECK_RTOL,
                        "dZ_final[{i}] = {} disagrees with dZ_final[0] = {} (rel {rel:e})",
                        self.dz_final[i],
                        dz0
                    );
                }
            }

            // Total pairing probability two ways: summing the matrix, and
            // -dlogZ/dlogKd via the analytic derivative.
            let bpp_tot: f64 = self.bpp.iter().sum::<f64>() / 2.0;
            let bpp_tot_from_deriv = -dz0 * self.params.kd_bp / z0;
            if bpp_tot > 0.0 {
                let rel = ((bpp_tot - bpp_tot_from_deriv) / bpp_tot).abs();
                ensure!(
                    rel < CROSS_CHECK_RTOL,
                    "BPP total {bpp_tot} disagrees with derivative-based total {bpp_tot_from_deriv} (rel {rel:e})"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::partition::Partition;
    use zfold_core::{FoldParams, Topology};

    #[test]
    fn bpp_matrix_is_symmetric() {
        let topo = Topology::single("CGCG", false).unwrap();
        let mut p = Partition::new(topo, FoldParams::default(), false);
        p.run();
        for i in 0..4 {
            for j in 0..4 {
                assert!((p.bpp(i, j) - p.bpp(j, i)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn cross_checks_pass_with_derivatives() {
        let topo = Topology::from_strands(&["CG", "CG"], false).unwrap();
        let mut p = Partition::new(topo, FoldParams::default(), true);
        p.run();
        p.cross_checks().unwrap();
    }
}
