/*!

The "always-unequal" conservative oracle (spec.md §4.7). Used to prune `READ`/`WRITE` chains and
to break `cond`-equality rules. Conservative: a `false` result never licenses an equality rewrite,
it only means "not provably unequal by these syntactic tests".

*/

use bvrw_abs::SpecialConst;

use crate::core::{DagStore, NodeKind, TaggedRef};

/// `true` only when `e0` and `e1` provably take different values under every assignment, by one
/// of the syntactic tests in spec.md §4.7.
pub fn is_always_unequal(store: &DagStore, e0: TaggedRef, e1: TaggedRef) -> bool {
  let e0 = store.chase_simplified(e0);
  let e1 = store.chase_simplified(e1);

  // e0 == ~e1
  if e0.id() == e1.id() && e0.is_inverted() != e1.is_inverted() {
    return true;
  }

  // Both distinct bit-vector constants.
  if let (Some(c0), Some(c1)) = (store.as_const(e0), store.as_const(e1)) {
    return c0 != c1;
  }

  // One side is `x + c` with `c` a non-zero constant, the other side is `x` itself, under
  // either inversion convention.
  is_offset_by_nonzero_const(store, e0, e1) || is_offset_by_nonzero_const(store, e1, e0)
}

fn is_offset_by_nonzero_const(store: &DagStore, maybe_add: TaggedRef, other: TaggedRef) -> bool {
  if maybe_add.is_inverted() {
    return false;
  }
  if !matches!(store.kind(maybe_add.id()), NodeKind::Add) {
    return false;
  }
  let children = store.children(maybe_add.id());
  let (a, b) = (children[0], children[1]);
  for (x, c) in [(a, b), (b, a)] {
    if let Some(c_val) = store.as_const(c) {
      if c_val.classify_special() != SpecialConst::Zero && x.id() == other.id() && x.is_inverted() == other.is_inverted() {
        return true;
      }
    }
  }
  false
}
