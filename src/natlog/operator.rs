//! The catalog of natural-logic operators (quantifiers and negations).

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::monotonicity::{Monotonicity, MonotonicityType};
use super::relation::NaturalLogicRelation;
use crate::graph::Span;

/// Gloss used for any cardinal-number token.
pub const NUMBER_GLOSS: &str = "--num--";

/// Surface form of the operator assigned to proper-noun subjects.
pub const IMPLICIT_NAMED_ENTITY: &str = "__implicit_named_entity__";

/// A quantifier or negation with its argument monotonicities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operator {
    /// Lowercase lemma gloss, with `--num--` standing for any number.
    pub surface_form: &'static str,
    /// Monotonicity of the first (subject) argument.
    pub subject_monotonicity: Monotonicity,
    /// Additivity of the first argument.
    pub subject_type: MonotonicityType,
    /// Monotonicity of the second (object) argument; `Invalid` for unary operators.
    pub object_monotonicity: Monotonicity,
    /// Additivity of the second argument.
    pub object_type: MonotonicityType,
    /// The relation between a sentence and the same sentence with this
    /// operator's words deleted.
    pub deletion_relation: NaturalLogicRelation,
}

impl Operator {
    /// Whether the operator takes a single argument.
    #[must_use]
    pub fn is_unary(&self) -> bool {
        self.object_monotonicity == Monotonicity::Invalid
    }

    /// Look up a binary operator by its exact gloss, falling back to a unary
    /// one when no binary operator has that gloss.
    #[must_use]
    pub fn from_gloss(gloss: &str) -> Option<&'static Self> {
        BY_GLOSS
            .get(gloss)
            .and_then(|entries| entries.iter().find(|op| !op.is_unary()).or(entries.first()))
            .copied()
    }

    /// Look up an operator by gloss, preferring the unary reading when it exists.
    #[must_use]
    pub fn unary_from_gloss(gloss: &str) -> Option<&'static Self> {
        BY_GLOSS
            .get(gloss)
            .and_then(|entries| entries.iter().find(|op| op.is_unary()).or(entries.first()))
            .copied()
    }

    /// The operator given to proper-noun subjects.
    #[must_use]
    pub fn implicit_named_entity() -> &'static Self {
        *IMPLICIT
    }

    /// The full catalog, in priority order.
    #[must_use]
    pub fn catalog() -> &'static [Self] {
        CATALOG
    }

    /// Whether `lemma` can end a quantifier phrase.
    #[must_use]
    pub fn is_quantifier_head(lemma: &str) -> bool {
        HEAD_WORDS.contains(lemma.to_lowercase().as_str())
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.surface_form)
    }
}

/// A detected occurrence of an operator and the spans it governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    /// The operator.
    pub instance: &'static Operator,
    /// Token holding the annotation: the rightmost token of the quantifier,
    /// or the subject itself for implicit operators.
    pub head: usize,
    /// Tokens making up the quantifier phrase.
    pub quantifier: Span,
    /// Tokens of the first argument.
    pub subject: Span,
    /// Tokens of the second argument; empty for unary operators.
    pub object: Span,
}

impl OperatorSpec {
    /// Number of tokens in the quantifier phrase.
    #[must_use]
    pub fn quantifier_len(&self) -> usize {
        self.quantifier.len()
    }

    /// Union of two detections of the same operator at the same head.
    #[must_use]
    pub fn merge(self, other: &Self) -> Self {
        Self {
            instance: self.instance,
            head: self.head,
            quantifier: self.quantifier.include(other.quantifier),
            subject: self.subject.include(other.subject),
            object: if other.object.is_empty() {
                self.object
            } else if self.object.is_empty() {
                other.object
            } else {
                self.object.include(other.object)
            },
        }
    }
}

use Monotonicity::{Antitone as Anti, Invalid, Monotone as Mono, Nonmonotone as NonMono};
use MonotonicityType::{Additive as Add, Multiplicative as Mult};
use NaturalLogicRelation::{
    Equivalent as Eqv, ForwardEntailment as Fe, Independence as Ind, Negation as Neg,
};

const fn op(
    surface_form: &'static str,
    subject: (Monotonicity, MonotonicityType),
    object: (Monotonicity, MonotonicityType),
    deletion_relation: NaturalLogicRelation,
) -> Operator {
    Operator {
        surface_form,
        subject_monotonicity: subject.0,
        subject_type: subject.1,
        object_monotonicity: object.0,
        object_type: object.1,
        deletion_relation,
    }
}

const UNIVERSAL: ((Monotonicity, MonotonicityType), (Monotonicity, MonotonicityType)) =
    ((Anti, Add), (Mono, Mult));
const NEGATIVE: ((Monotonicity, MonotonicityType), (Monotonicity, MonotonicityType)) =
    ((Anti, Add), (Anti, Add));
const UNARY_NEGATIVE: ((Monotonicity, MonotonicityType), (Monotonicity, MonotonicityType)) =
    ((Anti, Add), (Invalid, MonotonicityType::None));
const EXISTENTIAL: ((Monotonicity, MonotonicityType), (Monotonicity, MonotonicityType)) =
    ((Mono, Add), (Mono, Add));
const NOT_ALL: ((Monotonicity, MonotonicityType), (Monotonicity, MonotonicityType)) =
    ((Mono, Add), (Anti, Mult));
const MOST: ((Monotonicity, MonotonicityType), (Monotonicity, MonotonicityType)) =
    ((NonMono, MonotonicityType::None), (Mono, Mult));

const IMPLICIT_NAMED_ENTITY_OPERATOR: Operator =
    op(IMPLICIT_NAMED_ENTITY, (Mono, Add), (Mono, Mult), Ind);

static IMPLICIT_NAMED_ENTITY_FALLBACK: Operator = IMPLICIT_NAMED_ENTITY_OPERATOR;

static CATALOG: &[Operator] = &[
    // Universal
    op("all", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("every", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("any", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("each", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("the lot of", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("all of", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("each of", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("for all", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("for every", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("for each", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("everyone", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("--num--", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("--num-- --num--", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("--num-- --num-- --num--", UNIVERSAL.0, UNIVERSAL.1, Ind),
    op("few", UNIVERSAL.0, UNIVERSAL.1, Ind),
    IMPLICIT_NAMED_ENTITY_OPERATOR,
    // Negative
    op("no", NEGATIVE.0, NEGATIVE.1, Neg),
    op("neither", NEGATIVE.0, NEGATIVE.1, Neg),
    op("no one", NEGATIVE.0, NEGATIVE.1, Neg),
    op("nobody", NEGATIVE.0, NEGATIVE.1, Neg),
    op("not", NEGATIVE.0, NEGATIVE.1, Neg),
    op("but", NEGATIVE.0, NEGATIVE.1, Neg),
    op("except", NEGATIVE.0, NEGATIVE.1, Neg),
    // Unary negative
    op("no", UNARY_NEGATIVE.0, UNARY_NEGATIVE.1, Neg),
    op("not", UNARY_NEGATIVE.0, UNARY_NEGATIVE.1, Neg),
    op("no one", UNARY_NEGATIVE.0, UNARY_NEGATIVE.1, Neg),
    op("n't", UNARY_NEGATIVE.0, UNARY_NEGATIVE.1, Neg),
    op("but", UNARY_NEGATIVE.0, UNARY_NEGATIVE.1, Neg),
    op("except", UNARY_NEGATIVE.0, UNARY_NEGATIVE.1, Neg),
    // Existential
    op("some", EXISTENTIAL.0, EXISTENTIAL.1, Fe),
    op("several", EXISTENTIAL.0, EXISTENTIAL.1, Fe),
    op("either", EXISTENTIAL.0, EXISTENTIAL.1, Fe),
    op("a", EXISTENTIAL.0, EXISTENTIAL.1, Eqv),
    op("the", EXISTENTIAL.0, EXISTENTIAL.1, Eqv),
    op("less than --num--", EXISTENTIAL.0, EXISTENTIAL.1, Ind),
    op("some of", EXISTENTIAL.0, EXISTENTIAL.1, Fe),
    op("one of", EXISTENTIAL.0, EXISTENTIAL.1, Fe),
    op("at least --num--", EXISTENTIAL.0, EXISTENTIAL.1, Fe),
    op("a few", EXISTENTIAL.0, EXISTENTIAL.1, Fe),
    op("at least a few", EXISTENTIAL.0, EXISTENTIAL.1, Fe),
    op("there be", EXISTENTIAL.0, EXISTENTIAL.1, Ind),
    op("there be a few", EXISTENTIAL.0, EXISTENTIAL.1, Ind),
    op("there exist", EXISTENTIAL.0, EXISTENTIAL.1, Ind),
    op("--num-- of", EXISTENTIAL.0, EXISTENTIAL.1, Ind),
    // Not all
    op("not all", NOT_ALL.0, NOT_ALL.1, Ind),
    op("not every", NOT_ALL.0, NOT_ALL.1, Ind),
    // Most
    op("most", MOST.0, MOST.1, Ind),
    op("more", MOST.0, MOST.1, Ind),
    op("many", MOST.0, MOST.1, Ind),
    op("enough", MOST.0, MOST.1, Ind),
    op("more than", MOST.0, MOST.1, Ind),
    op("lots of", MOST.0, MOST.1, Ind),
    op("plenty of", MOST.0, MOST.1, Ind),
    op("heap of", MOST.0, MOST.1, Ind),
    op("a load of", MOST.0, MOST.1, Ind),
    op("load of", MOST.0, MOST.1, Ind),
    op("ton of", MOST.0, MOST.1, Ind),
    op("both", MOST.0, MOST.1, Ind),
    // At most
    op("at most --num--", NEGATIVE.0, NEGATIVE.1, Ind),
];

static BY_GLOSS: LazyLock<HashMap<&'static str, Vec<&'static Operator>>> = LazyLock::new(|| {
    let mut table: HashMap<&'static str, Vec<&'static Operator>> = HashMap::new();
    for operator in CATALOG {
        table.entry(operator.surface_form).or_default().push(operator);
    }
    table
});

static IMPLICIT: LazyLock<&'static Operator> = LazyLock::new(|| {
    BY_GLOSS
        .get(IMPLICIT_NAMED_ENTITY)
        .and_then(|entries| entries.first().copied())
        .unwrap_or(&IMPLICIT_NAMED_ENTITY_FALLBACK)
});

static HEAD_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    CATALOG
        .iter()
        .filter_map(|op| op.surface_form.split_whitespace().last())
        .filter(|word| !word.starts_with('_') && *word != NUMBER_GLOSS)
        .collect()
});
