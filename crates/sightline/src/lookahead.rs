//! # Lookahead Engine
//!
//! Computes the terminal symbols reachable from an automaton state without
//! crossing an input-consuming transition: the epsilon closure of the
//! state, made context-sensitive by an optional call-stack context.
//!
//! Two guards bound the walk:
//!
//! - a visited set over `(state, context)` configurations, which breaks
//!   cycles of non-consuming transitions;
//! - an in-progress rule vector, which stops rule-call transitions from
//!   re-entering a rule already open on the current exploration path, the
//!   case left recursion would otherwise recurse into forever. Reaching a
//!   rule's stop state lifts the mark for the rest of that branch, since
//!   at that point the walk is returning from the rule, not entering it.
//!
//! Both guards are scoped to a single query and restored on every exit
//! path, so sibling branches always observe the state they started from.
//!
//! The algorithm is total: it performs no I/O, allocates only its guards,
//! and terminates on any well-formed automaton, cyclic or not. Dangling
//! state ids are a caller contract violation and panic.

use crate::atn::{Atn, RuleId, StateId, Transition};
use crate::context::{CallFrame, StackContext};
use crate::interval::IntervalSet;
use crate::token::{self, TokenType};
use hashbrown::HashSet;
use std::cell::RefCell;
use std::sync::Arc;

/// Marker recorded when an unevaluated predicate blocks analysis in
/// opaque mode. Never a legal token type.
const HIT_PRED: TokenType = token::INVALID;

/// A visited `(state, alternative, context)` configuration. Guard keys are
/// structural: re-reaching the same state under an identically-shaped
/// context terminates that path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Config {
    state: StateId,
    /// Decision alternative the configuration was reached under. Lookahead
    /// walks tag every configuration with alternative 0; the field exists
    /// for parity with prediction configurations, which share this key
    /// shape.
    alt: u32,
    context: Option<Arc<StackContext>>,
}

impl Config {
    fn new(state: StateId, context: Option<Arc<StackContext>>) -> Self {
        Self {
            state,
            alt: 0,
            context,
        }
    }
}

/// Rules currently open on the exploration path, indexed by rule id.
///
/// Interior mutability lets [`MarkGuard`] restore the previous value on
/// drop while recursive calls keep borrowing the set.
struct InProgress {
    marks: RefCell<Vec<bool>>,
}

impl InProgress {
    fn new() -> Self {
        Self {
            marks: RefCell::new(Vec::new()),
        }
    }

    fn contains(&self, rule: RuleId) -> bool {
        self.marks.borrow().get(rule).copied().unwrap_or(false)
    }

    fn set(&self, rule: RuleId, value: bool) {
        let mut marks = self.marks.borrow_mut();
        if marks.len() <= rule {
            marks.resize(rule + 1, false);
        }
        marks[rule] = value;
    }

    /// Mark `rule` open; the guard restores the previous mark on drop.
    fn mark(&self, rule: RuleId) -> MarkGuard<'_> {
        let previous = self.contains(rule);
        self.set(rule, true);
        MarkGuard {
            owner: self,
            rule,
            previous,
        }
    }

    /// Lift the mark on `rule`; the guard restores the previous mark on
    /// drop.
    fn lift(&self, rule: RuleId) -> MarkGuard<'_> {
        let previous = self.contains(rule);
        self.set(rule, false);
        MarkGuard {
            owner: self,
            rule,
            previous,
        }
    }
}

struct MarkGuard<'a> {
    owner: &'a InProgress,
    rule: RuleId,
    previous: bool,
}

impl Drop for MarkGuard<'_> {
    fn drop(&mut self) {
        self.owner.set(self.rule, self.previous);
    }
}

/// Context-sensitive lookahead queries over an [`Atn`].
///
/// The engine is a pure function of the automaton and its query arguments;
/// each query owns its guards, so one engine can serve concurrent queries.
pub struct LookaheadEngine<'a> {
    atn: &'a Atn,
}

impl<'a> LookaheadEngine<'a> {
    #[must_use]
    pub const fn new(atn: &'a Atn) -> Self {
        Self { atn }
    }

    /// Per-alternative lookahead of a decision state: one slot per
    /// outgoing transition of `state`.
    ///
    /// Predicates are opaque here: an alternative whose every derivation
    /// passes through a predicate has no usable lookahead until the
    /// predicate is evaluated, and its slot is reported `None`. Slots with
    /// no reachable tokens at all are also `None`.
    ///
    /// # Panics
    ///
    /// Panics if `state` does not resolve in the automaton.
    #[must_use]
    pub fn decision_lookahead(&self, state: StateId) -> Vec<Option<IntervalSet>> {
        self.atn
            .state(state)
            .transitions()
            .iter()
            .map(|transition| {
                let mut look = IntervalSet::new();
                let mut visited = HashSet::with_hasher(ahash::RandomState::new());
                let in_progress = InProgress::new();
                self.closure(
                    transition.target(),
                    None,
                    Some(StackContext::empty()),
                    &mut look,
                    &mut visited,
                    &in_progress,
                    false,
                    false,
                );
                if look.is_empty() || look.contains(HIT_PRED) {
                    None
                } else {
                    Some(look)
                }
            })
            .collect()
    }

    /// Tokens reachable from `state`, stopping at `stop_state` if given,
    /// under the call stack `frame`.
    ///
    /// With no frame the query is context-free: reaching the end of a rule
    /// contributes [`EPSILON`](token::EPSILON) and exploration continues
    /// into every call site wired into the automaton. With a frame, rule
    /// returns pop the converted context instead, and running off the
    /// bottom of the stack contributes [`EOF`](token::EOF). Predicates are
    /// transparent.
    ///
    /// # Panics
    ///
    /// Panics if a state id does not resolve in the automaton.
    #[must_use]
    pub fn lookahead(
        &self,
        state: StateId,
        stop_state: Option<StateId>,
        frame: Option<&CallFrame>,
    ) -> IntervalSet {
        let context = frame.map(|f| StackContext::from_frame(self.atn, f));
        self.lookahead_with_context(state, stop_state, context)
    }

    /// [`lookahead`](Self::lookahead) with an already-built context,
    /// e.g. one carrying merged return alternatives.
    #[must_use]
    pub fn lookahead_with_context(
        &self,
        state: StateId,
        stop_state: Option<StateId>,
        context: Option<Arc<StackContext>>,
    ) -> IntervalSet {
        let mut look = IntervalSet::new();
        let mut visited = HashSet::with_hasher(ahash::RandomState::new());
        let in_progress = InProgress::new();
        self.closure(
            state,
            stop_state,
            context,
            &mut look,
            &mut visited,
            &in_progress,
            true,
            true,
        );
        look
    }

    #[allow(clippy::too_many_arguments)]
    fn closure(
        &self,
        state: StateId,
        stop_state: Option<StateId>,
        context: Option<Arc<StackContext>>,
        look: &mut IntervalSet,
        visited: &mut HashSet<Config, ahash::RandomState>,
        in_progress: &InProgress,
        see_thru_preds: bool,
        add_eof: bool,
    ) {
        if !visited.insert(Config::new(state, context.clone())) {
            return;
        }

        let s = self.atn.state(state);

        if Some(state) == stop_state {
            match &context {
                None => {
                    look.add(token::EPSILON);
                    return;
                }
                Some(ctx) if ctx.is_empty() && add_eof => {
                    look.add(token::EOF);
                    return;
                }
                // Stop state reached mid-stack: the enclosing rules still
                // contribute, keep exploring.
                _ => {}
            }
        }

        if s.is_rule_stop() {
            match &context {
                None => {
                    look.add(token::EPSILON);
                    return;
                }
                Some(ctx) if ctx.is_empty() && add_eof => {
                    look.add(token::EOF);
                    return;
                }
                Some(ctx) if !ctx.is_empty() => {
                    // Returning from this rule: re-entering it is legal for
                    // the rest of this branch.
                    let _restore = in_progress.lift(s.rule());
                    for i in 0..ctx.len() {
                        self.closure(
                            ctx.return_state(i),
                            stop_state,
                            ctx.parent(i).cloned(),
                            look,
                            visited,
                            in_progress,
                            see_thru_preds,
                            add_eof,
                        );
                    }
                    return;
                }
                // EMPTY without EOF insertion: fall through and explore
                // the call sites wired into the stop state.
                _ => {}
            }
        }

        for transition in s.transitions() {
            match transition {
                Transition::RuleCall {
                    target,
                    rule,
                    follow,
                } => {
                    if in_progress.contains(*rule) {
                        continue;
                    }
                    let new_context = StackContext::push(context.clone(), *follow);
                    let _mark = in_progress.mark(*rule);
                    self.closure(
                        *target,
                        stop_state,
                        Some(new_context),
                        look,
                        visited,
                        in_progress,
                        see_thru_preds,
                        add_eof,
                    );
                }
                Transition::Predicate { target, .. } => {
                    if see_thru_preds {
                        self.closure(
                            *target,
                            stop_state,
                            context.clone(),
                            look,
                            visited,
                            in_progress,
                            see_thru_preds,
                            add_eof,
                        );
                    } else {
                        look.add(HIT_PRED);
                    }
                }
                Transition::Epsilon { target } => {
                    self.closure(
                        *target,
                        stop_state,
                        context.clone(),
                        look,
                        visited,
                        in_progress,
                        see_thru_preds,
                        add_eof,
                    );
                }
                Transition::Wildcard { .. } => {
                    look.add_set(&self.atn.user_token_universe());
                }
                Transition::Atom { token, .. } => {
                    look.add(*token);
                }
                Transition::Set { set, negated, .. } => {
                    if *negated {
                        look.add_set(&set.complement(&self.atn.user_token_universe()));
                    } else {
                        look.add_set(set);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_guard_restores_on_drop() {
        let in_progress = InProgress::new();
        {
            let _mark = in_progress.mark(3);
            assert!(in_progress.contains(3));
            {
                let _lifted = in_progress.lift(3);
                assert!(!in_progress.contains(3));
            }
            assert!(in_progress.contains(3));
        }
        assert!(!in_progress.contains(3));
    }

    #[test]
    fn test_config_equality_is_structural() {
        let tail = StackContext::push(Some(StackContext::empty()), 4);
        let a = Config::new(1, Some(StackContext::push(Some(Arc::clone(&tail)), 9)));
        let b = Config::new(1, Some(StackContext::push(Some(tail), 9)));
        assert_eq!(a, b);
        assert_ne!(a, Config::new(2, None));
    }
}
