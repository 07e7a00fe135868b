//! # Sightline
//!
//! Context-sensitive lookahead computation over augmented transition
//! networks.
//!
//! ## Overview
//!
//! Given a position in a transition network and an optional call-return
//! stack, sightline computes which terminal symbols can legally appear
//! next. Table-driven recognizers use this to choose among alternatives,
//! report expected tokens after a mismatch, and decide when a semantic
//! predicate must be evaluated before prediction can proceed. It provides:
//!
//! - **Automaton graph**: states, rules, and epsilon / rule-call /
//!   predicate / wildcard / set transitions, built and validated through
//!   [`AtnBuilder`]
//! - **Call-stack contexts**: an immutable, shareable stack representation
//!   that simulates rule returns without a real call stack
//! - **Lookahead engine**: the guarded epsilon-closure that terminates on
//!   cyclic and left-recursive automata
//! - **Semantic predicates**: precedence guards and recognizer-defined
//!   checks, with the evaluation hooks recognizers implement
//!
//! ## Quick Start
//!
//! ```rust
//! use sightline::{AtnBuilder, LookaheadEngine, token};
//!
//! const NUMBER: i32 = 1;
//! const PLUS: i32 = 2;
//!
//! // expr: NUMBER (PLUS NUMBER)? ;
//! let mut builder = AtnBuilder::new(2);
//! let expr = builder.add_rule("expr");
//! let start = builder.add_state(expr);
//! let after_number = builder.add_decision_state(expr);
//! let after_plus = builder.add_state(expr);
//! let end = builder.add_state(expr);
//! let stop = builder.add_stop_state(expr);
//! builder.atom(start, NUMBER, after_number);
//! builder.atom(after_number, PLUS, after_plus);
//! builder.epsilon(after_number, end);
//! builder.atom(after_plus, NUMBER, end);
//! builder.epsilon(end, stop);
//! let atn = builder.build().expect("valid automaton");
//!
//! // What can appear once NUMBER has been matched?
//! let engine = LookaheadEngine::new(&atn);
//! let look = engine.lookahead(after_number, None, None);
//! assert!(look.contains(PLUS));
//! assert!(look.contains(token::EPSILON)); // the rule can also end here
//! ```
//!
//! ## Modules
//!
//! - [`atn`] - The automaton graph and its builder
//! - [`context`] - Live call frames and shareable stack contexts
//! - [`lookahead`] - The closure engine
//! - [`predicate`] - Semantic predicates and recognizer hooks
//! - [`interval`] - Integer-range sets, the result and label type
//! - [`token`] - Reserved token-type sentinels

pub mod atn;
pub mod context;
pub mod interval;
pub mod lookahead;
pub mod predicate;
pub mod token;

// Re-export commonly used types
pub use atn::{Atn, AtnBuilder, AtnError, AtnState, RuleId, StateId, StateKind, Transition};
pub use context::{CallFrame, StackContext};
pub use interval::{Interval, IntervalSet};
pub use lookahead::LookaheadEngine;
pub use predicate::{PrecedencePredicate, Recognizer, SemanticPredicate};
