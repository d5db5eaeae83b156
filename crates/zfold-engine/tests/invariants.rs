//! Engine invariants over randomized inputs.
//!
//! These treat origin invariance as authoritative: the partition function is
//! computed N independent ways, and any recursion defect that breaks a
//! cutpoint gate, a singlet-exclusion table, or a derivative product rule
//! shows up as a disagreement between origins.

#![deny(rust_2018_idioms)]

use proptest::prelude::*;
use zfold_engine::{FoldParams, Partition, Topology};

/// Random sequence over the RNA alphabet plus the lowercase wildcard letter.
fn arb_sequence(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!['A', 'C', 'G', 'U', 'x']), 1..=max_len)
        .prop_map(|v| v.into_iter().collect())
}

/// Split `seq` into one or two strands at `split` (0 keeps it whole).
fn strands_of(seq: &str, split: usize) -> Vec<String> {
    if split == 0 || split >= seq.len() {
        vec![seq.to_string()]
    } else {
        vec![seq[..split].to_string(), seq[split..].to_string()]
    }
}

fn run(strands: &[String], circular: bool, params: FoldParams) -> Partition {
    let topo = Topology::from_strands(strands, circular).unwrap();
    let mut p = Partition::new(topo, params, true);
    p.run();
    p
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48, // good CI/runtime balance
        .. ProptestConfig::default()
    })]

    // Property: all N origin estimates of Z (and dZ) agree, and the BPP
    // matrix is symmetric with entries in [0, 1].
    #[test]
    fn origin_invariance_and_bpp_shape(
        seq in arb_sequence(8),
        split in 0usize..8,
        circular in any::<bool>(),
    ) {
        let strands = strands_of(&seq, split);
        let p = run(&strands, circular, FoldParams::default());
        prop_assert!(p.cross_checks().is_ok(), "cross-checks failed for {strands:?} circular={circular}");

        let n = p.n();
        for i in 0..n {
            for j in 0..n {
                let b = p.bpp(i, j);
                prop_assert!((b - p.bpp(j, i)).abs() < 1e-9);
                prop_assert!((-1e-9..=1.0 + 1e-6).contains(&b), "bpp({i},{j}) = {b}");
            }
        }
    }

    // Property: enumerative traceback covers the ensemble exactly once.
    #[test]
    fn enumeration_normalizes(
        seq in arb_sequence(6),
        split in 0usize..6,
    ) {
        let strands = strands_of(&seq, split);
        let mut p = run(&strands, false, FoldParams::default());
        let structures = p.enumerate();
        prop_assert!(!structures.is_empty());
        let total: f64 = structures.iter().map(|(pr, _)| pr).sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "probabilities sum to {total}");
    }

    // Property: K_coax = 0 forces Z_coax to vanish identically.
    #[test]
    fn coax_off_zeroes_the_coax_table(
        seq in arb_sequence(8),
        split in 0usize..8,
        circular in any::<bool>(),
    ) {
        let strands = strands_of(&seq, split);
        let p = run(&strands, circular, FoldParams::default().without_coax());
        prop_assert!(p.cross_checks().is_ok());
        let n = p.n();
        for i in 0..n {
            for j in 0..n {
                prop_assert!(p.z_coax(i, j) == 0.0);
            }
        }
    }

    // Property: MFE traceback returns exactly one structure whose pairs are
    // mutually compatible (each residue in at most one pair).
    #[test]
    fn mfe_structure_is_well_formed(
        seq in arb_sequence(8),
        split in 0usize..8,
    ) {
        let strands = strands_of(&seq, split);
        let mut p = run(&strands, false, FoldParams::default());
        let (pairs, prob) = p.mfe().unwrap();
        prop_assert!(prob > 0.0 && prob <= 1.0 + 1e-9);
        let mut seen = std::collections::HashSet::new();
        for &(a, b) in &pairs {
            prop_assert!(a != b);
            prop_assert!(seen.insert(a), "residue {a} paired twice");
            prop_assert!(seen.insert(b), "residue {b} paired twice");
        }
    }
}
