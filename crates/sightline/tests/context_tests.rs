//! Tests for call-frame to stack-context conversion.

use sightline::{Atn, AtnBuilder, CallFrame, StackContext, StateId};
use std::sync::Arc;

const Z: i32 = 1;

/// a calls b, b calls c. Returns the automaton plus the two invoking
/// states and their follow states.
fn nested_calls() -> (Atn, [StateId; 2], [StateId; 2]) {
    let mut b = AtnBuilder::new(1);
    let rule_a = b.add_rule("a");
    let rule_b = b.add_rule("b");
    let rule_c = b.add_rule("c");

    let a_call = b.add_state(rule_a);
    let a_f = b.add_state(rule_a);
    let a_stop = b.add_stop_state(rule_a);
    let b_start = b.add_state(rule_b);
    let b_call = b.add_state(rule_b);
    let b_f = b.add_state(rule_b);
    let b_stop = b.add_stop_state(rule_b);
    let c_start = b.add_state(rule_c);
    let c_stop = b.add_stop_state(rule_c);

    b.rule_call(a_call, rule_b, b_start, a_f);
    b.epsilon(a_f, a_stop);
    b.epsilon(b_start, b_call);
    b.rule_call(b_call, rule_c, c_start, b_f);
    b.epsilon(b_f, b_stop);
    b.atom(c_start, Z, c_stop);

    (b.build().expect("should build"), [a_call, b_call], [a_f, b_f])
}

#[test]
fn test_round_trip_depth_two() {
    let (atn, [a_call, b_call], [a_f, b_f]) = nested_calls();

    let frame = CallFrame::root().enter_rule(a_call).enter_rule(b_call);
    assert_eq!(frame.depth(), 2);

    let ctx = StackContext::from_frame(&atn, &frame);

    // Innermost return site first, then the outer one, then EMPTY: the
    // same chain the frame walk produces, translated to follow states.
    assert_eq!(ctx.len(), 1);
    assert_eq!(ctx.return_state(0), b_f);
    let outer = ctx.parent(0).expect("outer frame");
    assert_eq!(outer.return_state(0), a_f);
    let bottom = outer.parent(0).expect("stack bottom");
    assert!(bottom.is_empty());
    assert!(Arc::ptr_eq(bottom, &StackContext::empty()));
}

#[test]
fn test_root_conversion_is_the_empty_singleton() {
    let (atn, _, _) = nested_calls();
    let first = StackContext::from_frame(&atn, &CallFrame::root());
    let second = StackContext::from_frame(&atn, &CallFrame::root());
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &StackContext::empty()));
}

#[test]
fn test_conversion_equality_depends_on_shared_tails() {
    let (atn, [a_call, b_call], _) = nested_calls();

    // Depth one: both conversions hang off the shared EMPTY singleton and
    // compare equal.
    let shallow_a = StackContext::from_frame(&atn, &CallFrame::root().enter_rule(a_call));
    let shallow_b = StackContext::from_frame(&atn, &CallFrame::root().enter_rule(a_call));
    assert_eq!(shallow_a, shallow_b);

    // Depth two: the intermediate nodes are built separately, so parent
    // identity differs even though the shapes match.
    let deep_frame = CallFrame::root().enter_rule(a_call).enter_rule(b_call);
    let deep_a = StackContext::from_frame(&atn, &deep_frame);
    let deep_b = StackContext::from_frame(&atn, &deep_frame);
    assert_ne!(deep_a, deep_b);

    // Sharing the tail restores equality.
    let tail = StackContext::from_frame(&atn, &CallFrame::root().enter_rule(a_call));
    let shared_a = StackContext::push(Some(Arc::clone(&tail)), 42);
    let shared_b = StackContext::push(Some(tail), 42);
    assert_eq!(shared_a, shared_b);
}

#[test]
fn test_frame_exit_rewinds_conversion() {
    let (atn, [a_call, b_call], [a_f, _]) = nested_calls();

    let frame = CallFrame::root().enter_rule(a_call).enter_rule(b_call);
    let popped = frame.exit_rule().expect("outer frame remains");
    let ctx = StackContext::from_frame(&atn, &popped);
    assert_eq!(ctx.len(), 1);
    assert_eq!(ctx.return_state(0), a_f);
    assert!(ctx.parent(0).expect("stack bottom").is_empty());
}
