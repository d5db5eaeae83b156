// crates/zfold-engine/src/traceback.rs

//! Structure recovery by descending the contribution ledger.
//!
//! The ledger is not kept during the forward pass (it would dwarf the
//! tables); instead each visited cell is recomputed with capture enabled to
//! reveal its additive terms. A term's branches are expanded recursively and
//! combined as a Cartesian product: probabilities multiply, base-pair lists
//! concatenate. Descending into `Z_BP` at `(i, j)` is what records the pair.
//!
//! Three selection policies share the descent:
//! - **enumerative**: keep every term (exhaustive structure listing),
//! - **mfe**: keep the single heaviest term (first wins on ties, so the
//!   result is deterministic),
//! - **stochastic**: keep one term drawn with probability proportional to
//!   its weight.

use crate::partition::Partition;
use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng as _, SeedableRng};
use zfold_core::{Branch, Contribution, TableId};

/// Selection policy for one traceback descent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracebackMode {
    /// Expand every contribution.
    Enumerative,
    /// Follow the single largest contribution.
    Mfe,
    /// Sample one contribution proportionally to its weight.
    Stochastic,
}

/// A recovered structure: its probability and its base pairs, in discovery
/// order.
pub type TracedStructure = (f64, Vec<(usize, usize)>);

fn pick_weighted(contribs: &[Contribution], total: f64, rng: &mut StdRng) -> Contribution {
    let r = rng.random::<f64>() * total;
    let mut cum = 0.0;
    for c in contribs {
        cum += c.weight;
        if r < cum {
            return c.clone();
        }
    }
    contribs[contribs.len() - 1].clone()
}

fn pick_heaviest(contribs: &[Contribution]) -> Contribution {
    let mut best = &contribs[0];
    for c in &contribs[1..] {
        if c.weight > best.weight {
            best = c;
        }
    }
    best.clone()
}

impl Partition {
    /// Recompute the cell a branch points at with capture enabled and hand
    /// back its contribution list.
    fn contribs_for(&mut self, br: Branch) -> Vec<Contribution> {
        let (i, j) = (br.i, br.j);
        match br.table {
            TableId::BasePair => {
                self.update_z_bp(i, j, true);
                self.z_bp.contribs(i, j).to_vec()
            }
            TableId::Coax => {
                self.update_z_coax(i, j, true);
                self.z_coax.contribs(i, j).to_vec()
            }
            TableId::EffMolarity => {
                self.update_c_eff(i, j, true);
                self.c_eff.contribs(i, j).to_vec()
            }
            TableId::EffMolarityNoCoax => {
                self.update_c_eff(i, j, true);
                self.c_eff_no_coax.contribs(i, j).to_vec()
            }
            TableId::EffMolarityNoPair => {
                self.update_c_eff(i, j, true);
                self.c_eff_no_pair.contribs(i, j).to_vec()
            }
            TableId::Linear => {
                self.update_z_linear(i, j, true);
                self.z_linear.contribs(i, j).to_vec()
            }
            TableId::Exterior => {
                self.update_z_cut(i, j, true);
                self.z_cut.contribs(i, j).to_vec()
            }
        }
    }

    /// Expand a contribution list into `(probability, base pairs)` paths.
    fn backtrack(
        &mut self,
        contribs: &[Contribution],
        mode: TracebackMode,
        rng: &mut StdRng,
    ) -> Vec<TracedStructure> {
        if contribs.is_empty() {
            return Vec::new();
        }
        let total: f64 = contribs.iter().map(|c| c.weight).sum();
        let chosen = match mode {
            TracebackMode::Enumerative => contribs.to_vec(),
            TracebackMode::Mfe => vec![pick_heaviest(contribs)],
            TracebackMode::Stochastic => vec![pick_weighted(contribs, total, rng)],
        };

        let n = self.topo.n();
        let mut out = Vec::new();
        for contrib in chosen {
            if contrib.weight == 0.0 {
                continue;
            }
            let p = contrib.weight / total;
            let mut paths: Vec<TracedStructure> = vec![(p, Vec::new())];
            for br in &contrib.branches {
                if br.table == TableId::BasePair {
                    for path in &mut paths {
                        path.1.push((br.i % n, br.j % n));
                    }
                }
                let sub_contribs = self.contribs_for(*br);
                let sub = self.backtrack(&sub_contribs, mode, rng);
                if sub.is_empty() {
                    // Leaf branch (diagonal or empty cell): nothing to fan out.
                    continue;
                }
                let mut next = Vec::with_capacity(paths.len() * sub.len());
                for (p1, bps1) in &paths {
                    for (p2, bps2) in &sub {
                        let mut bps = bps1.clone();
                        bps.extend_from_slice(bps2);
                        next.push((p1 * p2, bps));
                    }
                }
                paths = next;
            }
            out.extend(paths);
        }
        out
    }

    /// Contribution list of `Z_final[0]`, captured on demand.
    fn root_contribs(&mut self) -> Vec<Contribution> {
        self.z_final_cell(0, true).into_contribs()
    }

    /// Minimum-free-energy structure: the single maximum-weight path.
    ///
    /// Returns the base-pair list and the structure's Boltzmann probability.
    ///
    /// # Errors
    /// Errors if the descent does not produce exactly one structure.
    pub fn mfe(&mut self) -> Result<(Vec<(usize, usize)>, f64)> {
        let root = self.root_contribs();
        // The MFE descent draws nothing from the RNG; the seed is arbitrary.
        let mut rng = StdRng::seed_from_u64(0);
        let mut structures = self.backtrack(&root, TracebackMode::Mfe, &mut rng);
        ensure!(
            structures.len() == 1,
            "MFE traceback must produce exactly one structure, got {}",
            structures.len()
        );
        let (p, bps) = structures.remove(0);
        Ok((bps, p))
    }

    /// One Boltzmann-weighted sample from the structure ensemble.
    ///
    /// Deterministic for a given RNG state.
    ///
    /// # Errors
    /// Errors if the descent does not produce exactly one structure.
    pub fn boltzmann_sample(&mut self, rng: &mut StdRng) -> Result<(Vec<(usize, usize)>, f64)> {
        let root = self.root_contribs();
        let mut structures = self.backtrack(&root, TracebackMode::Stochastic, rng);
        ensure!(
            structures.len() == 1,
            "stochastic traceback must produce exactly one structure, got {}",
            structures.len()
        );
        let (p, bps) = structures.remove(0);
        Ok((bps, p))
    }

    /// Exhaustively enumerate the ensemble as `(probability, pairs)` entries.
    ///
    /// Probabilities sum to 1 over the returned list.
    pub fn enumerate(&mut self) -> Vec<TracedStructure> {
        let root = self.root_contribs();
        let mut rng = StdRng::seed_from_u64(0);
        self.backtrack(&root, TracebackMode::Enumerative, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zfold_core::{FoldParams, Topology};

    fn run_partition(strands: &[&str], circular: bool) -> Partition {
        let topo = Topology::from_strands(strands, circular).unwrap();
        let mut p = Partition::new(topo, FoldParams::default(), false);
        p.run();
        p
    }

    #[test]
    fn enumeration_probabilities_sum_to_one() {
        let mut p = run_partition(&["CGCG"], false);
        let structures = p.enumerate();
        let total: f64 = structures.iter().map(|(pr, _)| pr).sum();
        assert!((total - 1.0).abs() < 1e-9, "total = {total}");
    }

    #[test]
    fn mfe_is_the_heaviest_enumerated_structure() {
        let mut p = run_partition(&["CGCG"], false);
        let structures = p.enumerate();
        let best = structures
            .iter()
            .cloned()
            .fold((f64::MIN, Vec::new()), |a, b| if b.0 > a.0 { b } else { a });
        let (bps, prob) = p.mfe().unwrap();
        assert!((prob - best.0).abs() < 1e-12);
        assert_eq!(bps, best.1);
    }

    #[test]
    fn sampling_is_deterministic_under_a_fixed_seed() {
        let mut p = run_partition(&["CG", "CG"], false);
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = p.boltzmann_sample(&mut rng_a).unwrap();
        let b = p.boltzmann_sample(&mut rng_b).unwrap();
        assert_eq!(a.0, b.0);
        assert!((a.1 - b.1).abs() < 1e-12);
    }

    #[test]
    fn samples_come_from_the_enumerated_ensemble() {
        let mut p = run_partition(&["CGCG"], false);
        let mut enumerated = p.enumerate();
        for (_, bps) in &mut enumerated {
            bps.sort_unstable();
        }
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..8 {
            let (mut bps, prob) = p.boltzmann_sample(&mut rng).unwrap();
            bps.sort_unstable();
            assert!(prob > 0.0);
            assert!(
                enumerated.iter().any(|(_, e)| *e == bps),
                "sampled structure {bps:?} not in ensemble"
            );
        }
    }
}
