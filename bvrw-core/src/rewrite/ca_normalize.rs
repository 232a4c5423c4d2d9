/*!

The commutative-associative normalizer (spec.md §4.4). Exposes shared leaves between two trees of
the same CA operator (`ADD` or `MUL`) by rewriting them as `common ⊕ residue_left` and
`common ⊕ residue_right`, so a downstream rule can cancel the shared part.

Every `TaggedRef` operand in this module follows the ownership convention used throughout
`bvrw-core`'s rewrite entries (spec.md §3.3): a function consumes the ownership of the tagged
refs passed to it and returns a freshly-owned tagged ref; anything not incorporated into the
result is released before returning.

*/

use std::collections::HashMap;

use crate::core::{DagStore, NodeKind, SolverContext, TaggedRef};

/// Flattens `node` into its CA leaves: descends while a child is an uninverted node of the same
/// kind, stopping (and recording as a leaf) at an inverted node or a differently-kinded one.
/// Does not consume ownership of `node` — callers retain their reference to the tree while only
/// borrowing its shape.
fn flatten(store: &DagStore, node: TaggedRef, same_kind: impl Fn(&NodeKind) -> bool + Copy) -> Vec<TaggedRef> {
  if node.is_inverted() || !same_kind(store.kind(node.id())) {
    return vec![node];
  }
  let children = store.children(node.id());
  let (c0, c1) = (children[0], children[1]);
  let mut leaves = flatten(store, c0, same_kind);
  leaves.extend(flatten(store, c1, same_kind));
  leaves
}

/// The result of a successful normalization: `left = common ⊕ residue_left`,
/// `right = common ⊕ residue_right`, both freshly owned.
pub struct Normalized {
  pub left: TaggedRef,
  pub right: TaggedRef,
}

/// Which CA operator is being normalized, so [`ca_normalize`] can credit the right statistic
/// (spec.md §4.4, SPEC_FULL §2: `adds_normalized` vs `muls_normalized`).
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum CaKind {
  Add,
  Mul,
}

/// Attempts to CA-normalize `e0` and `e1`, both assumed uninverted nodes of the operator
/// identified by `same_kind`/`combine` (the call site checks this before calling in). Returns
/// `None` (having released nothing — the caller's ownership of `e0`/`e1` is untouched) when fewer
/// than 2 leaves are shared, per spec.md §4.4 step 4's threshold.
pub fn ca_normalize(
  ctx: &mut SolverContext,
  kind: CaKind,
  e0: TaggedRef,
  e1: TaggedRef,
  same_kind: impl Fn(&NodeKind) -> bool + Copy,
  combine: impl Fn(&mut SolverContext, TaggedRef, TaggedRef) -> TaggedRef,
) -> Option<Normalized> {
  let left_leaves = flatten(&ctx.store, e0, same_kind);
  let right_leaves = flatten(&ctx.store, e1, same_kind);

  let mut remaining: HashMap<TaggedRef, u32> = HashMap::new();
  for leaf in &left_leaves {
    *remaining.entry(*leaf).or_insert(0) += 1;
  }

  let mut common = Vec::new();
  let mut residue_right = Vec::new();
  for leaf in right_leaves {
    if let Some(count) = remaining.get_mut(&leaf) {
      if *count > 0 {
        *count -= 1;
        common.push(leaf);
        continue;
      }
    }
    residue_right.push(leaf);
  }

  if common.len() < 2 {
    return None;
  }

  let mut residue_left = Vec::new();
  for leaf in left_leaves {
    let count = remaining.get_mut(&leaf).expect("leaf counted above");
    if *count > 0 {
      *count -= 1;
      residue_left.push(leaf);
    }
  }

  // Every leaf in every list is an existing reference reachable from e0/e1; acquire one count
  // per occurrence before consuming e0/e1 themselves, so the fold below can freely consume.
  for leaf in common.iter().chain(residue_left.iter()).chain(residue_right.iter()) {
    ctx.store.acquire(*leaf);
  }
  ctx.store.release(e0);
  ctx.store.release(e1);

  let common_node = fold(ctx, common, &combine);
  let left = fold_onto(ctx, common_node, residue_left, &combine);
  let common_node2 = ctx.store.acquire(common_node);
  let right = fold_onto(ctx, common_node2, residue_right, &combine);

  match kind {
    CaKind::Add => ctx.stats.adds_normalized += 1,
    CaKind::Mul => ctx.stats.muls_normalized += 1,
  }

  Some(Normalized { left, right })
}

fn fold(ctx: &mut SolverContext, mut leaves: Vec<TaggedRef>, combine: &impl Fn(&mut SolverContext, TaggedRef, TaggedRef) -> TaggedRef) -> TaggedRef {
  let mut acc = leaves.remove(0);
  for leaf in leaves {
    acc = combine(ctx, acc, leaf);
  }
  acc
}

fn fold_onto(
  ctx: &mut SolverContext,
  base: TaggedRef,
  residue: Vec<TaggedRef>,
  combine: &impl Fn(&mut SolverContext, TaggedRef, TaggedRef) -> TaggedRef,
) -> TaggedRef {
  if residue.is_empty() {
    return base;
  }
  let residue_node = fold(ctx, residue, combine);
  combine(ctx, base, residue_node)
}
