//! Dot-bracket rendering of secondary structures.
//!
//! The model is pseudoknot-free, so a single bracket level suffices. For
//! multi-strand systems the conventional `+` separator is inserted at each
//! chain break (the closing bond of a circular molecule is not a break).

use crate::topology::Topology;

/// Render `pairs` over `n` residues as a dot-bracket string.
///
/// Pair endpoints may be given in either order; indices are taken modulo `n`.
#[must_use]
pub fn dot_bracket(pairs: &[(usize, usize)], n: usize) -> String {
    let mut out = vec!['.'; n];
    for &(a, b) in pairs {
        let (a, b) = (a % n, b % n);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        out[lo] = '(';
        out[hi] = ')';
    }
    out.into_iter().collect()
}

/// Render `pairs` with a `+` after every chain break of `topo`.
///
/// The terminal cutpoint of a linear molecule closes the cycle, so it does
/// not produce a trailing separator.
#[must_use]
pub fn dot_bracket_with_breaks(pairs: &[(usize, usize)], topo: &Topology) -> String {
    let n = topo.n();
    let flat = dot_bracket(pairs, n);
    let mut out = String::with_capacity(n + 4);
    for (i, c) in flat.chars().enumerate() {
        out.push(c);
        if i + 1 < n && topo.is_cutpoint(i) {
            out.push('+');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_pairs() {
        assert_eq!(dot_bracket(&[(0, 3)], 4), "(..)");
        assert_eq!(dot_bracket(&[(0, 3), (1, 2)], 4), "(())");
        assert_eq!(dot_bracket(&[], 4), "....");
    }

    #[test]
    fn endpoint_order_does_not_matter() {
        assert_eq!(dot_bracket(&[(3, 0)], 4), "(..)");
    }

    #[test]
    fn strand_breaks_get_separators() {
        let topo = Topology::from_strands(&["CG", "CG"], false).unwrap();
        assert_eq!(dot_bracket_with_breaks(&[(0, 3), (1, 2)], &topo), "((+))");
        // Terminal cutpoint adds no trailing '+'.
        let single = Topology::single("CGCG", false).unwrap();
        assert_eq!(dot_bracket_with_breaks(&[(0, 3)], &single), "(..)");
    }
}
