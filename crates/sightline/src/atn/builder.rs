use super::{Atn, AtnState, RuleId, RuleInfo, StateId, StateKind, Transition};
use crate::interval::IntervalSet;
use crate::predicate::SemanticPredicate;
use crate::token::TokenType;
use smallvec::SmallVec;
use std::sync::OnceLock;

/// Builder for constructing a validated [`Atn`].
///
/// States and rules are created up front and referenced by the returned
/// ids; edges may reference states created later. All validation happens
/// in [`build`](Self::build).
///
/// ```rust
/// use sightline::AtnBuilder;
///
/// const ID: i32 = 1;
///
/// let mut b = AtnBuilder::new(1);
/// let rule = b.add_rule("item");
/// let start = b.add_state(rule);
/// let end = b.add_state(rule);
/// let stop = b.add_stop_state(rule);
/// b.atom(start, ID, end);
/// b.epsilon(end, stop);
/// let atn = b.build().expect("valid automaton");
/// assert!(atn.next_tokens(start).contains(ID));
/// ```
pub struct AtnBuilder {
    rules: Vec<String>,
    stop_states: Vec<Vec<StateId>>,
    states: Vec<PendingState>,
    max_token_type: TokenType,
}

struct PendingState {
    rule: RuleId,
    kind: StateKind,
    transitions: SmallVec<[Transition; 2]>,
}

impl AtnBuilder {
    /// Start an automaton whose legal token types are
    /// `[MIN_USER, max_token_type]`.
    #[must_use]
    pub const fn new(max_token_type: TokenType) -> Self {
        Self {
            rules: Vec::new(),
            stop_states: Vec::new(),
            states: Vec::new(),
            max_token_type,
        }
    }

    /// Declare a rule. States added for it reference the returned id.
    pub fn add_rule(&mut self, name: impl Into<String>) -> RuleId {
        self.rules.push(name.into());
        self.stop_states.push(Vec::new());
        self.rules.len() - 1
    }

    /// Add an ordinary state to `rule`.
    pub fn add_state(&mut self, rule: RuleId) -> StateId {
        self.push_state(rule, StateKind::Basic)
    }

    /// Add a decision state to `rule`.
    pub fn add_decision_state(&mut self, rule: RuleId) -> StateId {
        self.push_state(rule, StateKind::Decision)
    }

    /// Add the stop state of `rule`. Each rule needs exactly one.
    pub fn add_stop_state(&mut self, rule: RuleId) -> StateId {
        let id = self.push_state(rule, StateKind::RuleStop);
        if let Some(stops) = self.stop_states.get_mut(rule) {
            stops.push(id);
        }
        id
    }

    fn push_state(&mut self, rule: RuleId, kind: StateKind) -> StateId {
        self.states.push(PendingState {
            rule,
            kind,
            transitions: SmallVec::new(),
        });
        self.states.len() - 1
    }

    /// Epsilon edge `from -> to`.
    pub fn epsilon(&mut self, from: StateId, to: StateId) {
        self.push_transition(from, Transition::Epsilon { target: to });
    }

    /// Edge consuming `token`.
    pub fn atom(&mut self, from: StateId, token: TokenType, to: StateId) {
        self.push_transition(from, Transition::Atom { target: to, token });
    }

    /// Edge consuming any token in `set`.
    pub fn set(&mut self, from: StateId, set: IntervalSet, to: StateId) {
        self.push_transition(
            from,
            Transition::Set {
                target: to,
                set,
                negated: false,
            },
        );
    }

    /// Edge consuming any token *not* in `set`.
    pub fn not_set(&mut self, from: StateId, set: IntervalSet, to: StateId) {
        self.push_transition(
            from,
            Transition::Set {
                target: to,
                set,
                negated: true,
            },
        );
    }

    /// Edge consuming any single token.
    pub fn wildcard(&mut self, from: StateId, to: StateId) {
        self.push_transition(from, Transition::Wildcard { target: to });
    }

    /// Edge gated on `predicate`.
    pub fn predicate(&mut self, from: StateId, predicate: SemanticPredicate, to: StateId) {
        self.push_transition(
            from,
            Transition::Predicate {
                target: to,
                predicate,
            },
        );
    }

    /// Invocation of `rule`: control enters `entry` and resumes at `follow`
    /// once the rule returns.
    pub fn rule_call(&mut self, from: StateId, rule: RuleId, entry: StateId, follow: StateId) {
        self.push_transition(
            from,
            Transition::RuleCall {
                target: entry,
                rule,
                follow,
            },
        );
    }

    fn push_transition(&mut self, from: StateId, transition: Transition) {
        self.states[from].transitions.push(transition);
    }

    /// Validate and finish the automaton.
    ///
    /// Wires the return edges: for every rule-call transition, an epsilon
    /// edge from the called rule's stop state to the call's follow state.
    ///
    /// # Errors
    ///
    /// Returns an error when a transition references an unknown state or
    /// rule, a rule is missing its stop state (or has several), or a set
    /// transition carries an empty label.
    pub fn build(mut self) -> Result<Atn, AtnError> {
        let state_count = self.states.len();
        for (rule, stops) in self.stop_states.iter().enumerate() {
            match stops.len() {
                0 => return Err(AtnError::MissingStopState { rule }),
                1 => {}
                _ => return Err(AtnError::DuplicateStopState { rule }),
            }
        }

        let mut return_edges: Vec<(StateId, StateId)> = Vec::new();
        for (from, state) in self.states.iter().enumerate() {
            for transition in &state.transitions {
                if transition.target() >= state_count {
                    return Err(AtnError::DanglingTarget {
                        from,
                        target: transition.target(),
                    });
                }
                match transition {
                    Transition::RuleCall { rule, follow, .. } => {
                        if *rule >= self.rules.len() {
                            return Err(AtnError::UnknownRule { from, rule: *rule });
                        }
                        if *follow >= state_count {
                            return Err(AtnError::DanglingFollow {
                                from,
                                follow: *follow,
                            });
                        }
                        return_edges.push((self.stop_states[*rule][0], *follow));
                    }
                    Transition::Set { set, .. } => {
                        if set.is_empty() {
                            return Err(AtnError::EmptyLabel { from });
                        }
                    }
                    _ => {}
                }
            }
        }

        for (stop, follow) in return_edges {
            self.states[stop]
                .transitions
                .push(Transition::Epsilon { target: follow });
        }

        let rules = self
            .rules
            .into_iter()
            .zip(&self.stop_states)
            .map(|(name, stops)| RuleInfo {
                name,
                stop_state: stops[0],
            })
            .collect();

        let states = self
            .states
            .into_iter()
            .enumerate()
            .map(|(id, pending)| AtnState {
                id,
                rule: pending.rule,
                kind: pending.kind,
                transitions: pending.transitions,
                next_within_rule: OnceLock::new(),
            })
            .collect();

        Ok(Atn {
            states,
            rules,
            max_token_type: self.max_token_type,
        })
    }
}

/// Automaton construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AtnError {
    #[error("transition from state {from} targets unknown state {target}")]
    DanglingTarget { from: StateId, target: StateId },

    #[error("rule-call from state {from} resumes at unknown state {follow}")]
    DanglingFollow { from: StateId, follow: StateId },

    #[error("transition from state {from} names unknown rule {rule}")]
    UnknownRule { from: StateId, rule: RuleId },

    #[error("rule {rule} has no stop state")]
    MissingStopState { rule: RuleId },

    #[error("rule {rule} has more than one stop state")]
    DuplicateStopState { rule: RuleId },

    #[error("set transition from state {from} has an empty label")]
    EmptyLabel { from: StateId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token;

    #[test]
    fn test_build_simple_rule() {
        let mut b = AtnBuilder::new(2);
        let rule = b.add_rule("item");
        let start = b.add_state(rule);
        let stop = b.add_stop_state(rule);
        b.atom(start, 1, stop);

        let atn = b.build().expect("should build");
        assert_eq!(atn.rule_count(), 1);
        assert_eq!(atn.rule_name(rule), "item");
        assert_eq!(atn.rule_stop_state(rule), stop);
        assert!(atn.state(stop).is_rule_stop());
    }

    #[test]
    fn test_missing_stop_state() {
        let mut b = AtnBuilder::new(2);
        let rule = b.add_rule("item");
        let _ = b.add_state(rule);

        assert_eq!(b.build().unwrap_err(), AtnError::MissingStopState { rule: 0 });
    }

    #[test]
    fn test_duplicate_stop_state() {
        let mut b = AtnBuilder::new(2);
        let rule = b.add_rule("item");
        b.add_stop_state(rule);
        b.add_stop_state(rule);

        assert_eq!(
            b.build().unwrap_err(),
            AtnError::DuplicateStopState { rule: 0 }
        );
    }

    #[test]
    fn test_dangling_target() {
        let mut b = AtnBuilder::new(2);
        let rule = b.add_rule("item");
        let start = b.add_state(rule);
        b.add_stop_state(rule);
        b.epsilon(start, 99);

        assert_eq!(
            b.build().unwrap_err(),
            AtnError::DanglingTarget { from: start, target: 99 }
        );
    }

    #[test]
    fn test_empty_label_rejected() {
        let mut b = AtnBuilder::new(2);
        let rule = b.add_rule("item");
        let start = b.add_state(rule);
        let stop = b.add_stop_state(rule);
        b.set(start, IntervalSet::new(), stop);

        assert_eq!(b.build().unwrap_err(), AtnError::EmptyLabel { from: start });
    }

    #[test]
    fn test_return_edges_wired() {
        let mut b = AtnBuilder::new(2);
        let outer = b.add_rule("outer");
        let inner = b.add_rule("inner");

        let call_site = b.add_state(outer);
        let after_call = b.add_state(outer);
        let outer_stop = b.add_stop_state(outer);
        let inner_start = b.add_state(inner);
        let inner_stop = b.add_stop_state(inner);

        b.rule_call(call_site, inner, inner_start, after_call);
        b.epsilon(after_call, outer_stop);
        b.atom(inner_start, 1, inner_stop);

        let atn = b.build().expect("should build");
        let stop_transitions = atn.state(inner_stop).transitions();
        assert_eq!(stop_transitions.len(), 1);
        assert!(matches!(
            stop_transitions[0],
            Transition::Epsilon { target } if target == after_call
        ));
    }

    #[test]
    fn test_user_token_universe() {
        let mut b = AtnBuilder::new(5);
        let rule = b.add_rule("r");
        b.add_stop_state(rule);
        let atn = b.build().expect("should build");
        assert_eq!(atn.user_token_universe(), IntervalSet::range(token::MIN_USER, 5));

        let mut empty = AtnBuilder::new(0);
        let rule = empty.add_rule("r");
        empty.add_stop_state(rule);
        let atn = empty.build().expect("should build");
        assert!(atn.user_token_universe().is_empty());
    }
}
