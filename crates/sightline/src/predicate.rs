//! # Semantic Predicates
//!
//! Predicate transitions gate an automaton path on a condition the
//! recognizer evaluates at parse time. The lookahead engine never evaluates
//! them; it only decides whether to look through them (transparent mode) or
//! to stop and report that a predicate blocks further analysis (opaque
//! mode). Evaluation happens in the recognizer, through the [`Recognizer`]
//! trait, when an actual prediction is made.
//!
//! Predicates form a closed set of variants rather than an open trait
//! hierarchy: the engine only ever needs "is this transition a predicate",
//! and the recognizer dispatches on the concrete kind.

use crate::atn::RuleId;
use std::fmt;

/// Recognizer-side hooks consumed during predicate evaluation.
///
/// Implementations must be `Send + Sync` so predicates can be evaluated
/// from any thread running a parse.
pub trait Recognizer: Send + Sync {
    /// The operator precedence level the recognizer is currently parsing at.
    fn precedence(&self) -> i32;

    /// Evaluate the recognizer-defined predicate `pred_index` of `rule`.
    ///
    /// The default accepts, matching recognizers that define no predicates.
    fn predicate(&self, rule: RuleId, pred_index: u32) -> bool {
        let _ = (rule, pred_index);
        true
    }
}

/// A precedence guard: true iff the current precedence is at least
/// `precedence`. Used by precedence-climbing grammars to prune operator
/// alternatives that bind too loosely for the current context.
///
/// Precedence predicates are ordered by their threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrecedencePredicate {
    pub precedence: i32,
}

impl PrecedencePredicate {
    #[must_use]
    pub const fn new(precedence: i32) -> Self {
        Self { precedence }
    }
}

impl fmt::Display for PrecedencePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}>=prec}}?", self.precedence)
    }
}

/// An evaluable condition attached to a predicate transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SemanticPredicate {
    /// The resolved, always-true predicate. Produced by
    /// [`evaluate_precedence`](Self::evaluate_precedence) when a precedence
    /// guard holds.
    AlwaysTrue,
    /// A precedence guard.
    Precedence(PrecedencePredicate),
    /// A recognizer-defined check, identified by owning rule and index.
    Rule { rule: RuleId, pred_index: u32 },
}

impl SemanticPredicate {
    /// Convenience constructor for a precedence guard.
    #[must_use]
    pub const fn precedence(level: i32) -> Self {
        Self::Precedence(PrecedencePredicate::new(level))
    }

    /// Evaluate against the recognizer's current state.
    pub fn evaluate(&self, recognizer: &dyn Recognizer) -> bool {
        match self {
            Self::AlwaysTrue => true,
            Self::Precedence(pred) => recognizer.precedence() >= pred.precedence,
            Self::Rule { rule, pred_index } => recognizer.predicate(*rule, *pred_index),
        }
    }

    /// Resolve precedence guards ahead of prediction.
    ///
    /// A precedence guard that holds resolves to [`AlwaysTrue`]; one that
    /// does not hold fails to `None`. Other predicate kinds cannot be
    /// resolved early and pass through unchanged.
    ///
    /// [`AlwaysTrue`]: Self::AlwaysTrue
    pub fn evaluate_precedence(&self, recognizer: &dyn Recognizer) -> Option<Self> {
        match self {
            Self::Precedence(pred) => {
                (recognizer.precedence() >= pred.precedence).then_some(Self::AlwaysTrue)
            }
            _ => Some(self.clone()),
        }
    }
}

impl fmt::Display for SemanticPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlwaysTrue => write!(f, "true"),
            Self::Precedence(pred) => write!(f, "{pred}"),
            Self::Rule { rule, pred_index } => write!(f, "{{{rule}:{pred_index}}}?"),
        }
    }
}
