//! # Automaton Graph
//!
//! The transition network the lookahead engine walks: states connected by
//! non-consuming (epsilon, rule-call, predicate) and consuming (atom, set,
//! wildcard) transitions, grouped into rules. Each rule has one
//! distinguished stop state representing normal return from the rule.
//!
//! An [`Atn`] is immutable once built. Use [`AtnBuilder`] to construct and
//! validate one; a successful build also wires the return edges (an epsilon
//! edge from every called rule's stop state to each call site's follow
//! state), which is what lets context-free queries see all call sites.
//!
//! ## Preconditions
//!
//! Query methods take numeric state ids. Ids produced by the builder always
//! resolve; a fabricated out-of-range id is a programming error and panics.

pub mod builder;

pub use builder::*;

use crate::context::CallFrame;
use crate::interval::IntervalSet;
use crate::lookahead::LookaheadEngine;
use crate::predicate::SemanticPredicate;
use crate::token::{self, TokenType};
use smallvec::SmallVec;
use std::sync::OnceLock;

/// Index of a state in [`Atn::states`].
pub type StateId = usize;

/// Index of a rule in the automaton's rule table.
pub type RuleId = usize;

/// What role a state plays in its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// Ordinary state.
    Basic,
    /// A state whose outgoing transitions are the alternatives of a
    /// decision.
    Decision,
    /// The rule's single return state.
    RuleStop,
}

/// An outgoing edge of a state.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Consumes nothing.
    Epsilon { target: StateId },
    /// Invocation of `rule`: control enters `target` (the rule's entry
    /// state) and resumes at `follow` after the rule returns.
    RuleCall {
        target: StateId,
        rule: RuleId,
        follow: StateId,
    },
    /// Gated on a condition the recognizer evaluates at prediction time.
    Predicate {
        target: StateId,
        predicate: SemanticPredicate,
    },
    /// Consumes any single token.
    Wildcard { target: StateId },
    /// Consumes one specific token.
    Atom { target: StateId, token: TokenType },
    /// Consumes any token in `set`, or any token outside it when `negated`.
    Set {
        target: StateId,
        set: IntervalSet,
        negated: bool,
    },
}

impl Transition {
    /// The state this transition leads to.
    #[must_use]
    pub const fn target(&self) -> StateId {
        match self {
            Self::Epsilon { target }
            | Self::RuleCall { target, .. }
            | Self::Predicate { target, .. }
            | Self::Wildcard { target }
            | Self::Atom { target, .. }
            | Self::Set { target, .. } => *target,
        }
    }
}

/// A state of the automaton.
#[derive(Debug)]
pub struct AtnState {
    id: StateId,
    rule: RuleId,
    kind: StateKind,
    transitions: SmallVec<[Transition; 2]>,
    // Context-free lookahead of this state within its rule, filled on
    // first query.
    next_within_rule: OnceLock<IntervalSet>,
}

impl AtnState {
    #[must_use]
    pub const fn id(&self) -> StateId {
        self.id
    }

    /// The rule this state belongs to.
    #[must_use]
    pub const fn rule(&self) -> RuleId {
        self.rule
    }

    #[must_use]
    pub const fn kind(&self) -> StateKind {
        self.kind
    }

    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Whether this is its rule's return state.
    #[must_use]
    pub fn is_rule_stop(&self) -> bool {
        self.kind == StateKind::RuleStop
    }
}

#[derive(Debug)]
pub(crate) struct RuleInfo {
    pub(crate) name: String,
    pub(crate) stop_state: StateId,
}

/// An immutable, validated transition network.
#[derive(Debug)]
pub struct Atn {
    states: Vec<AtnState>,
    rules: Vec<RuleInfo>,
    max_token_type: TokenType,
}

impl Atn {
    /// Look up a state by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not resolve in this automaton.
    #[must_use]
    pub fn state(&self, id: StateId) -> &AtnState {
        &self.states[id]
    }

    /// All states, indexed by [`StateId`].
    #[must_use]
    pub fn states(&self) -> &[AtnState] {
        &self.states
    }

    /// Number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Name of a rule.
    ///
    /// # Panics
    ///
    /// Panics if `rule` does not resolve in this automaton.
    #[must_use]
    pub fn rule_name(&self, rule: RuleId) -> &str {
        &self.rules[rule].name
    }

    /// The stop state of a rule.
    ///
    /// # Panics
    ///
    /// Panics if `rule` does not resolve in this automaton.
    #[must_use]
    pub fn rule_stop_state(&self, rule: RuleId) -> StateId {
        self.rules[rule].stop_state
    }

    /// Largest token type a transition label may carry.
    #[must_use]
    pub const fn max_token_type(&self) -> TokenType {
        self.max_token_type
    }

    /// The full legal user-token-type range, `[MIN_USER, max_token_type]`.
    /// Wildcard transitions contribute this set; negated sets complement
    /// against it.
    #[must_use]
    pub fn user_token_universe(&self) -> IntervalSet {
        if self.max_token_type < token::MIN_USER {
            IntervalSet::new()
        } else {
            IntervalSet::range(token::MIN_USER, self.max_token_type)
        }
    }

    /// Context-free lookahead of `state` within its rule, cached per state.
    ///
    /// Contains [`EPSILON`](token::EPSILON) when the end of the rule is
    /// reachable without consuming a token. The first query computes the
    /// set; later queries return the cached value, so repeated calls are
    /// cheap and safe to issue concurrently.
    ///
    /// # Panics
    ///
    /// Panics if `state` does not resolve in this automaton.
    pub fn next_tokens(&self, state: StateId) -> &IntervalSet {
        self.state(state)
            .next_within_rule
            .get_or_init(|| LookaheadEngine::new(self).lookahead(state, None, None))
    }

    /// Context-sensitive lookahead of `state` under `frame`. Uncached.
    ///
    /// # Panics
    ///
    /// Panics if `state` does not resolve in this automaton.
    #[must_use]
    pub fn next_tokens_in_context(&self, state: StateId, frame: Option<&CallFrame>) -> IntervalSet {
        LookaheadEngine::new(self).lookahead(state, None, frame)
    }

    /// The tokens a recognizer positioned at `state` under `frame` should
    /// report as expected after a mismatch.
    ///
    /// Starts from [`next_tokens`](Self::next_tokens) and, while the rule
    /// end is reachable, substitutes the lookahead at each invoking call
    /// site's follow state, walking up the frame chain. EPSILON surviving
    /// at the stack root becomes [`EOF`](token::EOF).
    ///
    /// # Panics
    ///
    /// Panics if `state` does not resolve, or if a frame's invoking state
    /// does not begin with a rule-call transition.
    #[must_use]
    pub fn expected_tokens(&self, state: StateId, frame: Option<&CallFrame>) -> IntervalSet {
        let mut following = self.next_tokens(state).clone();
        if !following.contains(token::EPSILON) {
            return following;
        }

        let mut expected = IntervalSet::new();
        expected.add_set(&following);
        expected.remove(token::EPSILON);

        let mut frame = frame;
        while let Some(f) = frame
            && let Some(invoking) = f.invoking_state()
            && following.contains(token::EPSILON)
        {
            let follow = self.rule_call_follow(invoking);
            following = self.next_tokens(follow).clone();
            expected.add_set(&following);
            expected.remove(token::EPSILON);
            frame = f.parent();
        }

        if following.contains(token::EPSILON) {
            expected.add(token::EOF);
        }
        expected
    }

    /// Follow state of the rule-call transition at `state`.
    ///
    /// Invoking states recorded in call frames always begin with their
    /// rule-call transition; anything else violates the caller contract.
    pub(crate) fn rule_call_follow(&self, state: StateId) -> StateId {
        match self.state(state).transitions().first() {
            Some(Transition::RuleCall { follow, .. }) => *follow,
            _ => panic!("state {state} does not begin with a rule-call transition"),
        }
    }
}
