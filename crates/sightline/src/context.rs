//! # Call-Stack Contexts
//!
//! Two views of the rule-invocation stack:
//!
//! - [`CallFrame`] is the live record a recognizer maintains while parsing:
//!   one exclusively-owned frame per active rule invocation, linked to its
//!   invoking frame.
//! - [`StackContext`] is the prediction-time analogue: immutable,
//!   `Arc`-shared nodes that many logical stacks can reference at once.
//!   Because different call stacks often share a common suffix, and
//!   call-site merge points fold several possible return sites into one
//!   node, a context node carries a *list* of return alternatives, each
//!   with its own parent link.
//!
//! The empty stack is a process-wide singleton, [`StackContext::empty`],
//! distinguished by `Arc` identity. It is the only node with zero
//! alternatives; every public constructor produces at least one, so
//! `is_empty` identifies the singleton by construction.
//!
//! Context nodes are never mutated after construction, so sharing them
//! across concurrently running lookahead queries needs no locking.

use crate::atn::{Atn, StateId};
use rustc_hash::FxHasher;
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

/// One active rule invocation in a live parse.
///
/// `invoking_state` is the automaton state that was active in the parent
/// rule when this rule was called; the bottom-of-stack frame has none.
/// Following [`parent`](Self::parent) links always terminates at such a
/// frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    parent: Option<Box<CallFrame>>,
    invoking_state: Option<StateId>,
}

impl CallFrame {
    /// The bottom-of-stack frame: no invoker.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            parent: None,
            invoking_state: None,
        }
    }

    /// Enter a rule: this frame becomes the parent, `invoking_state` is
    /// the state whose rule-call transition is being taken.
    #[must_use]
    pub fn enter_rule(self, invoking_state: StateId) -> Self {
        Self {
            parent: Some(Box::new(self)),
            invoking_state: Some(invoking_state),
        }
    }

    /// Exit the current rule, returning the invoking frame. `None` at the
    /// bottom of the stack.
    #[must_use]
    pub fn exit_rule(self) -> Option<Self> {
        self.parent.map(|parent| *parent)
    }

    #[must_use]
    pub fn invoking_state(&self) -> Option<StateId> {
        self.invoking_state
    }

    #[must_use]
    pub fn parent(&self) -> Option<&CallFrame> {
        self.parent.as_deref()
    }

    /// Current call depth: the number of frames above the bottom.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self;
        while let Some(parent) = frame.parent() {
            depth += 1;
            frame = parent;
        }
        depth
    }
}

impl Default for CallFrame {
    fn default() -> Self {
        Self::root()
    }
}

/// One return alternative of a context node: the state to resume at, and
/// the rest of the stack below it. A missing parent marks a chain built up
/// during a query that started without any outer context; it is distinct
/// from the EMPTY singleton, which marks a *known* stack bottom.
#[derive(Debug, Clone)]
struct ReturnLink {
    return_state: StateId,
    parent: Option<Arc<StackContext>>,
}

static EMPTY: LazyLock<Arc<StackContext>> = LazyLock::new(|| {
    let alternatives = SmallVec::new();
    let hash = StackContext::compute_hash(&alternatives);
    Arc::new(StackContext { alternatives, hash })
});

/// Immutable, shareable representation of a (possibly merged) rule
/// invocation stack. See the [module docs](self) for the sharing model.
#[derive(Debug)]
pub struct StackContext {
    alternatives: SmallVec<[ReturnLink; 1]>,
    // Structural hash, fixed at construction; nodes are immutable.
    hash: u64,
}

impl StackContext {
    /// The empty-stack singleton. Every call returns the same allocation;
    /// compare with `Arc::ptr_eq` to test identity.
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Arc::clone(&EMPTY)
    }

    /// Push a return site onto `parent`, producing a single-alternative
    /// node. `None` as the parent continues a no-outer-context chain.
    #[must_use]
    pub fn push(parent: Option<Arc<Self>>, return_state: StateId) -> Arc<Self> {
        Self::from_links(SmallVec::from_elem(
            ReturnLink {
                return_state,
                parent,
            },
            1,
        ))
    }

    /// Fold several `(return_state, parent)` pairs into one merge-point
    /// node.
    ///
    /// # Panics
    ///
    /// Panics if `links` is empty; an empty stack is [`empty`](Self::empty),
    /// never constructed.
    #[must_use]
    pub fn merged(links: impl IntoIterator<Item = (StateId, Arc<Self>)>) -> Arc<Self> {
        let alternatives: SmallVec<[ReturnLink; 1]> = links
            .into_iter()
            .map(|(return_state, parent)| ReturnLink {
                return_state,
                parent: Some(parent),
            })
            .collect();
        assert!(
            !alternatives.is_empty(),
            "a merged context needs at least one return alternative"
        );
        Self::from_links(alternatives)
    }

    fn from_links(alternatives: SmallVec<[ReturnLink; 1]>) -> Arc<Self> {
        let hash = Self::compute_hash(&alternatives);
        Arc::new(Self { alternatives, hash })
    }

    /// Mirror a live frame chain as a context chain, translating each
    /// invoking state to the follow state of its rule-call transition. The
    /// bottom-of-stack frame maps to the EMPTY singleton.
    ///
    /// # Panics
    ///
    /// Panics if an invoking state recorded in the chain does not begin
    /// with a rule-call transition in `atn`.
    #[must_use]
    pub fn from_frame(atn: &Atn, frame: &CallFrame) -> Arc<Self> {
        let Some(invoking) = frame.invoking_state() else {
            return Self::empty();
        };
        let parent = match frame.parent() {
            Some(p) => Self::from_frame(atn, p),
            None => Self::empty(),
        };
        Self::push(Some(parent), atn.rule_call_follow(invoking))
    }

    /// Whether this is the empty stack. True exactly for the EMPTY
    /// singleton.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Number of return alternatives folded into this node.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    /// Return state of alternative `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn return_state(&self, index: usize) -> StateId {
        self.alternatives[index].return_state
    }

    /// Parent context of alternative `index`. `None` for a chain built
    /// without outer context.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn parent(&self, index: usize) -> Option<&Arc<Self>> {
        self.alternatives[index].parent.as_ref()
    }

    fn compute_hash(alternatives: &[ReturnLink]) -> u64 {
        let mut hasher = FxHasher::default();
        alternatives.len().hash(&mut hasher);
        for link in alternatives {
            link.return_state.hash(&mut hasher);
            match &link.parent {
                Some(parent) => parent.hash.hash(&mut hasher),
                None => u64::MAX.hash(&mut hasher),
            }
        }
        hasher.finish()
    }
}

/// Structural equality over (alternative count, per-alternative return
/// state, parent *identity*). Two chains built separately from the same
/// frames compare equal only where their tails are shared.
impl PartialEq for StackContext {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.hash == other.hash
            && self.alternatives.len() == other.alternatives.len()
            && self
                .alternatives
                .iter()
                .zip(&other.alternatives)
                .all(|(a, b)| {
                    a.return_state == b.return_state
                        && match (&a.parent, &b.parent) {
                            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
                            (None, None) => true,
                            _ => false,
                        }
                })
    }
}

impl Eq for StackContext {}

impl Hash for StackContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_a_singleton() {
        let a = StackContext::empty();
        let b = StackContext::empty();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_empty());
        assert_eq!(a.len(), 0);
    }

    #[test]
    fn test_push_is_not_empty() {
        let ctx = StackContext::push(Some(StackContext::empty()), 7);
        assert!(!ctx.is_empty());
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.return_state(0), 7);
        assert!(ctx.parent(0).expect("has parent").is_empty());
    }

    #[test]
    fn test_shared_tail() {
        let tail = StackContext::push(Some(StackContext::empty()), 5);
        let a = StackContext::push(Some(Arc::clone(&tail)), 7);
        let b = StackContext::push(Some(Arc::clone(&tail)), 9);
        assert!(Arc::ptr_eq(
            a.parent(0).expect("has parent"),
            b.parent(0).expect("has parent")
        ));
    }

    #[test]
    fn test_equality_requires_shared_parent() {
        let tail = StackContext::push(Some(StackContext::empty()), 5);
        let a = StackContext::push(Some(Arc::clone(&tail)), 7);
        let b = StackContext::push(Some(Arc::clone(&tail)), 7);
        assert_eq!(a, b);

        // Same shape, separately built tail: distinct identity, not equal.
        let other_tail = StackContext::push(Some(StackContext::empty()), 5);
        let c = StackContext::push(Some(other_tail), 7);
        assert_ne!(a, c);
    }

    #[test]
    fn test_no_outer_context_chain_distinct_from_empty_parent() {
        let rootless = StackContext::push(None, 7);
        let grounded = StackContext::push(Some(StackContext::empty()), 7);
        assert_ne!(rootless, grounded);
        assert!(rootless.parent(0).is_none());
    }

    #[test]
    fn test_merged_alternatives() {
        let ctx = StackContext::merged([
            (3, StackContext::empty()),
            (9, StackContext::empty()),
        ]);
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.return_state(0), 3);
        assert_eq!(ctx.return_state(1), 9);
    }

    #[test]
    #[should_panic(expected = "at least one return alternative")]
    fn test_merged_rejects_empty() {
        let _ = StackContext::merged(std::iter::empty());
    }

    #[test]
    fn test_call_frame_lifecycle() {
        let frame = CallFrame::root();
        assert_eq!(frame.depth(), 0);
        assert!(frame.invoking_state().is_none());

        let frame = frame.enter_rule(4).enter_rule(9);
        assert_eq!(frame.depth(), 2);
        assert_eq!(frame.invoking_state(), Some(9));
        assert_eq!(frame.parent().and_then(CallFrame::invoking_state), Some(4));

        let frame = frame.exit_rule().expect("one frame left");
        assert_eq!(frame.invoking_state(), Some(4));
        assert!(frame.exit_rule().expect("root left").exit_rule().is_none());
    }
}
