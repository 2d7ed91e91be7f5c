//! Monotonicity of operator arguments and relation projection.

use serde::{Deserialize, Serialize};

use super::relation::NaturalLogicRelation;

/// How an operator argument reacts to changing its denotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Monotonicity {
    /// Enlarging the argument preserves truth.
    Monotone,
    /// Shrinking the argument preserves truth.
    Antitone,
    /// Neither direction is guaranteed.
    Nonmonotone,
    /// The argument does not exist (unary operators).
    Invalid,
}

/// The additivity refinement of a monotonicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonotonicityType {
    /// Plain monotonicity only.
    None,
    /// Additive (or anti-additive).
    Additive,
    /// Multiplicative (or anti-multiplicative).
    Multiplicative,
    /// Both additive and multiplicative.
    Both,
}

impl MonotonicityType {
    /// Whether the type includes additivity.
    #[must_use]
    pub const fn is_additive(self) -> bool {
        matches!(self, Self::Additive | Self::Both)
    }

    /// Whether the type includes multiplicativity.
    #[must_use]
    pub const fn is_multiplicative(self) -> bool {
        matches!(self, Self::Multiplicative | Self::Both)
    }
}

/// Project a lexical relation through one argument position.
///
/// Entailments survive monotone contexts and flip in antitone ones; the
/// exclusion relations survive only as far as the additivity type allows.
/// Nonmonotone contexts keep nothing but equivalence.
#[must_use]
pub fn project(
    relation: NaturalLogicRelation,
    monotonicity: Monotonicity,
    kind: MonotonicityType,
) -> NaturalLogicRelation {
    use NaturalLogicRelation::{
        Alternation, Cover, Equivalent, ForwardEntailment, Independence, Negation,
        ReverseEntailment,
    };

    let additive = kind.is_additive();
    let multiplicative = kind.is_multiplicative();
    match (monotonicity, relation) {
        (_, Equivalent) => Equivalent,
        (_, Independence) | (Monotonicity::Nonmonotone | Monotonicity::Invalid, _) => Independence,
        (Monotonicity::Monotone, ForwardEntailment) => ForwardEntailment,
        (Monotonicity::Monotone, ReverseEntailment) => ReverseEntailment,
        (Monotonicity::Monotone, Negation) => match (additive, multiplicative) {
            (true, true) => Negation,
            (true, false) => Cover,
            (false, true) => Alternation,
            (false, false) => Independence,
        },
        (Monotonicity::Monotone, Alternation) => {
            if multiplicative {
                Alternation
            } else {
                Independence
            }
        }
        (Monotonicity::Monotone, Cover) => {
            if additive {
                Cover
            } else {
                Independence
            }
        }
        (Monotonicity::Antitone, ForwardEntailment) => ReverseEntailment,
        (Monotonicity::Antitone, ReverseEntailment) => ForwardEntailment,
        (Monotonicity::Antitone, Negation) => match (additive, multiplicative) {
            (true, true) => Negation,
            (true, false) => Alternation,
            (false, true) => Cover,
            (false, false) => Independence,
        },
        (Monotonicity::Antitone, Alternation) => {
            if multiplicative {
                Cover
            } else {
                Independence
            }
        }
        (Monotonicity::Antitone, Cover) => {
            if additive {
                Alternation
            } else {
                Independence
            }
        }
    }
}
