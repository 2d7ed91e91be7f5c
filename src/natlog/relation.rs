//! The seven natural-logic relations and the truth-projection automaton.

use serde::{Deserialize, Serialize};

/// Truth value of a hypothesis after projecting a premise through a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TruthValue {
    /// The hypothesis is true.
    True,
    /// The hypothesis is false.
    False,
    /// The relation gives no guarantee either way.
    Unknown,
}

impl TruthValue {
    /// Whether this is [`TruthValue::True`].
    #[must_use]
    pub fn is_true(self) -> bool {
        self == Self::True
    }

    /// Whether this is [`TruthValue::False`].
    #[must_use]
    pub fn is_false(self) -> bool {
        self == Self::False
    }
}

impl From<bool> for TruthValue {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

/// A set-theoretic relation between two denotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NaturalLogicRelation {
    /// `x ≡ y`
    Equivalent,
    /// `x ⊏ y`
    ForwardEntailment,
    /// `x ⊐ y`
    ReverseEntailment,
    /// `x ^ y`: exhaustive and exclusive.
    Negation,
    /// `x | y`: exclusive but not exhaustive.
    Alternation,
    /// `x ‿ y`: exhaustive but not exclusive.
    Cover,
    /// `x # y`: no relation.
    Independence,
}

use NaturalLogicRelation::{
    Alternation as Alt, Cover as Cov, Equivalent as Eqv, ForwardEntailment as Fe,
    Independence as Ind, Negation as Neg, ReverseEntailment as Re,
};

/// Rows are the first relation, columns the second, both in [`NaturalLogicRelation::ALL`] order.
const JOIN_TABLE: [[NaturalLogicRelation; 7]; 7] = [
    //          =     <     >     ^     |     v     #
    /* = */ [Eqv, Fe, Re, Neg, Alt, Cov, Ind],
    /* < */ [Fe, Fe, Ind, Cov, Cov, Ind, Ind],
    /* > */ [Re, Ind, Re, Cov, Ind, Cov, Ind],
    /* ^ */ [Neg, Cov, Alt, Eqv, Re, Fe, Ind],
    /* | */ [Alt, Ind, Alt, Fe, Ind, Fe, Ind],
    /* v */ [Cov, Cov, Ind, Re, Re, Ind, Ind],
    /* # */ [Ind, Ind, Ind, Ind, Ind, Ind, Ind],
];

/// Relations produced by inserting a dependent under each arc label.
const INSERTION_TABLE: &[(&str, NaturalLogicRelation)] = &[
    ("acomp", Re),
    ("advcl", Re),
    ("acl", Re),
    ("acl:relcl", Re),
    ("advmod", Re),
    ("amod", Re),
    ("appos", Eqv),
    ("aux", Eqv),
    ("auxpass", Eqv),
    ("aux:pass", Eqv),
    ("case", Ind),
    ("cc", Re),
    ("ccomp", Ind),
    ("compound", Ind),
    ("conj:and", Re),
    ("conj:and\\/or", Fe),
    ("conj:but", Re),
    ("conj:nor", Fe),
    ("conj:or", Fe),
    ("cop", Eqv),
    ("csubj", Ind),
    ("csubjpass", Ind),
    ("csubj:pass", Ind),
    ("dep", Ind),
    ("det", Eqv),
    ("discourse", Eqv),
    ("dobj", Ind),
    ("expl", Eqv),
    ("goeswith", Eqv),
    ("infmod", Re),
    ("iobj", Ind),
    ("mark", Re),
    ("mwe", Ind),
    ("neg", Neg),
    ("nmod", Re),
    ("nmod:poss", Re),
    ("nn", Ind),
    ("npadvmod", Re),
    ("nsubj", Ind),
    ("nsubjpass", Ind),
    ("nsubj:pass", Ind),
    ("num", Ind),
    ("number", Ind),
    ("nummod", Ind),
    ("obj", Ind),
    ("obl", Re),
    ("op", Ind),
    ("parataxis", Ind),
    ("partmod", Re),
    ("pcomp", Ind),
    ("pobj", Ind),
    ("poss", Re),
    ("possessive", Ind),
    ("preconj", Ind),
    ("predet", Ind),
    ("prep", Re),
    ("prt", Ind),
    ("punct", Eqv),
    ("quantmod", Fe),
    ("rcmod", Re),
    ("root", Ind),
    ("tmod", Re),
    ("vmod", Re),
    ("xcomp", Ind),
];

/// Label families that default to reverse entailment when the exact label is
/// not in [`INSERTION_TABLE`]. Ordered longest first.
const INSERTION_FAMILIES: &[(&str, NaturalLogicRelation)] = &[
    ("advcl:", Re),
    ("prep_", Re),
    ("prep:", Re),
    ("nmod:", Re),
    ("conj:", Re),
    ("acl:", Re),
    ("obl:", Re),
];

impl NaturalLogicRelation {
    /// Every relation, in the canonical order used by the join table.
    pub const ALL: [Self; 7] = [Eqv, Fe, Re, Neg, Alt, Cov, Ind];

    /// Position of this relation in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Equivalent => 0,
            Self::ForwardEntailment => 1,
            Self::ReverseEntailment => 2,
            Self::Negation => 3,
            Self::Alternation => 4,
            Self::Cover => 5,
            Self::Independence => 6,
        }
    }

    /// The relation at a position of [`Self::ALL`].
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Conventional one-symbol name.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equivalent => "=",
            Self::ForwardEntailment => "<",
            Self::ReverseEntailment => ">",
            Self::Negation => "^",
            Self::Alternation => "|",
            Self::Cover => "v",
            Self::Independence => "#",
        }
    }

    /// A true premise yields a true hypothesis.
    #[must_use]
    pub const fn maintains_truth(self) -> bool {
        matches!(self, Self::Equivalent | Self::ForwardEntailment)
    }

    /// A true premise yields a false hypothesis.
    #[must_use]
    pub const fn negates_truth(self) -> bool {
        matches!(self, Self::Negation | Self::Alternation)
    }

    /// A false premise yields a false hypothesis.
    #[must_use]
    pub const fn maintains_falsehood(self) -> bool {
        matches!(self, Self::Equivalent | Self::ReverseEntailment)
    }

    /// A false premise yields a true hypothesis.
    #[must_use]
    pub const fn negates_falsehood(self) -> bool {
        matches!(self, Self::Negation | Self::Cover)
    }

    /// Compose two relations: if `x self y` and `y other z`, then `x result z`.
    #[must_use]
    pub const fn join(self, other: Self) -> Self {
        JOIN_TABLE[self.index()][other.index()]
    }

    /// The truth of a hypothesis standing in this relation to a premise with
    /// the given truth.
    #[must_use]
    pub const fn apply_to_truth_value(self, premise_truth: bool) -> TruthValue {
        if premise_truth {
            if self.maintains_truth() {
                TruthValue::True
            } else if self.negates_truth() {
                TruthValue::False
            } else {
                TruthValue::Unknown
            }
        } else if self.maintains_falsehood() {
            TruthValue::False
        } else if self.negates_falsehood() {
            TruthValue::True
        } else {
            TruthValue::Unknown
        }
    }

    /// The relation produced by undoing an insertion that produced `self`.
    #[must_use]
    pub const fn insertion_to_deletion(self) -> Self {
        match self {
            Self::Equivalent => Self::Equivalent,
            Self::ForwardEntailment => Self::ReverseEntailment,
            Self::ReverseEntailment => Self::ForwardEntailment,
            Self::Negation => Self::Negation,
            Self::Alternation => Self::Cover,
            Self::Cover => Self::Alternation,
            Self::Independence => Self::Independence,
        }
    }

    /// The relation produced by undoing a deletion that produced `self`.
    #[must_use]
    pub const fn deletion_to_insertion(self) -> Self {
        self.insertion_to_deletion()
    }

    /// The relation between a sentence and the same sentence with a dependent
    /// inserted under an arc labeled `label`.
    ///
    /// `is_subject` says whether the arc lies on the subject side of the
    /// clause; outside the subject, an `advmod`, `neg` or `dep` arc to "not"
    /// is a negation. Unknown labels fall back to their label family, then
    /// to independence.
    #[must_use]
    pub fn for_dependency_insertion(label: &str, is_subject: bool, dependent: Option<&str>) -> Self {
        let label = label.to_lowercase();
        if !is_subject
            && matches!(label.as_str(), "advmod" | "neg" | "dep")
            && dependent.is_some_and(|word| word.eq_ignore_ascii_case("not"))
        {
            return Self::Negation;
        }
        if let Some((_, relation)) = INSERTION_TABLE.iter().find(|(arc, _)| *arc == label) {
            return *relation;
        }
        INSERTION_FAMILIES
            .iter()
            .find(|(prefix, _)| label.starts_with(prefix))
            .map_or(Self::Independence, |(_, relation)| *relation)
    }

    /// The relation between a sentence and the same sentence with the
    /// dependent under an arc labeled `label` deleted.
    #[must_use]
    pub fn for_dependency_deletion(label: &str, is_subject: bool, dependent: Option<&str>) -> Self {
        Self::for_dependency_insertion(label, is_subject, dependent).insertion_to_deletion()
    }
}

impl std::fmt::Display for NaturalLogicRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
