// crates/zfold-core/src/pairs.rs

//! Base-pair-type registry.
//!
//! Each registered type carries its own dissociation constant and, inside the
//! engine, its own Z_BP sub-table. The stock registry holds the four
//! canonical RNA pairings plus a generic wildcard that matches only when both
//! sides are the *same lowercase* character: a deliberate escape hatch for
//! synthetic alphabets that must be preserved exactly to reproduce pair
//! probabilities.

use serde::{Deserialize, Serialize};

/// Nucleotide-identity gate for one base-pair type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairRule {
    /// Exact match: opening residue `five_prime`, closing residue `three_prime`.
    Canonical {
        /// Residue required at the opening position.
        five_prime: char,
        /// Residue required at the closing position.
        three_prime: char,
    },
    /// Generic wildcard: both residues equal and lowercase.
    LowercaseSelf,
}

impl PairRule {
    /// Does this rule admit a pair between residues `a` (opening) and `b`
    /// (closing)?
    #[inline]
    #[must_use]
    pub fn matches(&self, a: char, b: char) -> bool {
        match *self {
            Self::Canonical {
                five_prime,
                three_prime,
            } => a == five_prime && b == three_prime,
            Self::LowercaseSelf => a.is_lowercase() && b.is_lowercase() && a == b,
        }
    }
}

/// One admissible pairing with its dissociation constant (M).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasePairType {
    /// Identity gate.
    pub rule: PairRule,
    /// Dissociation constant for this pair type.
    pub kd: f64,
}

impl BasePairType {
    /// Canonical pairing `five_prime`–`three_prime` at dissociation constant `kd`.
    #[must_use]
    pub const fn canonical(five_prime: char, three_prime: char, kd: f64) -> Self {
        Self {
            rule: PairRule::Canonical {
                five_prime,
                three_prime,
            },
            kd,
        }
    }
}

/// Ordered set of base-pair types; the engine allocates one sub-table per entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasePairRegistry {
    /// Registered types, in evaluation order.
    pub types: Vec<BasePairType>,
}

impl BasePairRegistry {
    /// Stock RNA registry: CG, GC, AU, UA, and the lowercase-self wildcard,
    /// all at `kd_bp`.
    #[must_use]
    pub fn rna(kd_bp: f64) -> Self {
        Self {
            types: vec![
                BasePairType::canonical('C', 'G', kd_bp),
                BasePairType::canonical('G', 'C', kd_bp),
                BasePairType::canonical('A', 'U', kd_bp),
                BasePairType::canonical('U', 'A', kd_bp),
                BasePairType {
                    rule: PairRule::LowercaseSelf,
                    kd: kd_bp,
                },
            ],
        }
    }

    /// Number of registered types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when no types are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_rules_are_directional() {
        let cg = BasePairType::canonical('C', 'G', 1e-4);
        assert!(cg.rule.matches('C', 'G'));
        assert!(!cg.rule.matches('G', 'C'));
        assert!(!cg.rule.matches('C', 'C'));
    }

    #[test]
    fn wildcard_requires_equal_lowercase() {
        let w = PairRule::LowercaseSelf;
        assert!(w.matches('x', 'x'));
        assert!(!w.matches('x', 'y'));
        assert!(!w.matches('X', 'X'));
        assert!(!w.matches('x', 'X'));
    }

    #[test]
    fn stock_registry_has_five_types() {
        let reg = BasePairRegistry::rna(2e-4);
        assert_eq!(reg.len(), 5);
        assert!(reg.types.iter().any(|t| t.rule == PairRule::LowercaseSelf));
    }
}
