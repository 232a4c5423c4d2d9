/*!

The AND-contradiction search (spec.md §4.5). Determines whether the `AND`-subtree rooted at a
given node contains a literal equal to the negation of either of two targets. Recurses only
through uninverted `AND` nodes — an inverted `AND` is an `OR` and stops the search, since an `OR`
doesn't structurally guarantee its disjuncts are all simultaneously asserted.

*/

use crate::core::context::FIND_AND_NODE_CONTRADICTION_LIMIT;
use crate::core::{DagStore, NodeKind, TaggedRef};

fn is_negation(a: TaggedRef, b: TaggedRef) -> bool {
  a.id() == b.id() && a.is_inverted() != b.is_inverted()
}

/// Searches the `AND`-subtree rooted at `node` for a literal equal to `¬target0` or `¬target1`,
/// descending at most [`FIND_AND_NODE_CONTRADICTION_LIMIT`] levels. Returns `false` (a safe
/// under-approximation) when the limit is reached before a contradiction is found.
pub fn find_contradiction(store: &DagStore, node: TaggedRef, target0: TaggedRef, target1: TaggedRef) -> bool {
  search(store, node, target0, target1, 0)
}

fn search(store: &DagStore, node: TaggedRef, target0: TaggedRef, target1: TaggedRef, depth: u32) -> bool {
  if depth >= FIND_AND_NODE_CONTRADICTION_LIMIT {
    return false;
  }
  if is_negation(node, target0) || is_negation(node, target1) {
    return true;
  }
  if node.is_inverted() || !matches!(store.kind(node.id()), NodeKind::And) {
    return false;
  }
  let children = store.children(node.id());
  let (c0, c1) = (children[0], children[1]);
  search(store, c0, target0, target1, depth + 1) || search(store, c1, target0, target1, depth + 1)
}
