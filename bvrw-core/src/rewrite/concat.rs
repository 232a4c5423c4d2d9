/*!

Concat-specific rules (spec.md §4.11), tried after the generic binary rewriter (`binary.rs`) has
already folded two plain constants and applied the identities common to every binary operator.
Two shapes, in priority order: folding a constant low child of a nested concat against a constant
right operand so the two constants become adjacent (letting the next pass fold them), and, at
`rewrite_level > 2`, flattening a right-skewed concat chain into a left-associative one.

Per SPEC_FULL §5.2 (spec.md §9's open question about the reassociation recursion counter): the
counter here is strictly "current depth" — incremented immediately before a recursive call and
decremented immediately after it returns, via [`crate::core::SolverContext::with_recursion`],
uniformly at every call site in this module.

*/

use crate::core::{NodeKind, SolverContext, TaggedRef};

pub fn rewrite_concat_specific(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Result<TaggedRef, (TaggedRef, TaggedRef)> {
  if let Some(r) = const_low_reassociate(ctx, e0, e1) {
    return Ok(r);
  }
  if ctx.rewrite_level() > 2 {
    if let Some(r) = flatten_left_associative(ctx, e0, e1) {
      return Ok(r);
    }
  }
  Err((e0, e1))
}

/// `e1` constant, `e0 = CONCAT(hi, lo)` with `lo` also constant (spec.md §4.11 first bullet):
/// recurse on `concat(lo, e1)` first — two constants, folds immediately in the generic binary
/// rewriter — then `concat(hi, folded)`.
fn const_low_reassociate(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Option<TaggedRef> {
  ctx.store.as_const(e1)?;
  if !matches!(ctx.store.kind(e0.id()), NodeKind::Concat) {
    return None;
  }
  if !ctx.has_rec_budget() {
    return None;
  }
  let children = ctx.store.children(e0.id());
  let (hi, lo) = (children[0], children[1]);
  // e0's own inversion tag applies to both children when reading through it (spec.md §3.1).
  let hi = if e0.is_inverted() { hi.invert() } else { hi };
  let lo = if e0.is_inverted() { lo.invert() } else { lo };
  ctx.store.as_const(lo)?;

  let hi = ctx.store.acquire(hi);
  let lo = ctx.store.acquire(lo);
  ctx.store.release(e0);
  let folded_low = ctx.with_recursion(|ctx| super::concat(ctx, lo, e1));
  Some(ctx.with_recursion(|ctx| super::concat(ctx, hi, folded_low)))
}

/// `e1` is itself a `CONCAT`: flattens `e1`'s tree into its leaves (tag-aware, iteratively —
/// mirrors the source's explicit stack rather than unbounded recursion) and rebuilds
/// `e0 ++ leaf_0 ++ leaf_1 ++ ...` left-associatively.
fn flatten_left_associative(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Option<TaggedRef> {
  if !matches!(ctx.store.kind(e1.id()), NodeKind::Concat) {
    return None;
  }
  if !ctx.has_rec_budget() {
    return None;
  }

  let mut leaves: Vec<TaggedRef> = Vec::new();
  let mut stack = vec![e1];
  while let Some(cur) = stack.pop() {
    if matches!(ctx.store.kind(cur.id()), NodeKind::Concat) {
      let children = ctx.store.children(cur.id());
      let (hi, lo) = (children[0], children[1]);
      let hi = if cur.is_inverted() { hi.invert() } else { hi };
      let lo = if cur.is_inverted() { lo.invert() } else { lo };
      // Push `lo` first so `hi` pops next: preorder, high-to-low leaf order.
      stack.push(lo);
      stack.push(hi);
    } else {
      leaves.push(ctx.store.acquire(cur));
    }
  }
  ctx.store.release(e1);

  ctx.with_recursion(|ctx| {
    let mut iter = leaves.into_iter();
    let first_leaf = iter.next().expect("a CONCAT node has at least two leaves");
    let mut result = super::concat(ctx, e0, first_leaf);
    for leaf in iter {
      result = super::concat(ctx, result, leaf);
    }
    Some(result)
  })
}

#[cfg(test)]
mod tests {
  use bvrw_abs::BvConst;

  use super::*;
  use crate::core::SolverContext;

  #[test]
  fn const_low_of_nested_concat_folds() {
    let mut ctx = SolverContext::new(3);
    let x = ctx.store.build_bv_var(4);
    let c1 = ctx.store.build_const(BvConst::from_bits("01").unwrap());
    let c2 = ctx.store.build_const(BvConst::from_bits("10").unwrap());
    let nested = super::super::concat(&mut ctx, x, c1); // width 6: {x, 01}
    let r = super::super::concat(&mut ctx, nested, c2); // {x, 01, 10} -> {x, 0110}
    match ctx.store.kind(r.id()) {
      NodeKind::Concat => {
        let children = ctx.store.children(r.id());
        let low = ctx.store.as_const(children[1]).unwrap();
        assert_eq!(low.to_bits(), "0110");
      }
      other => panic!("expected a fused Concat node, got {other:?}"),
    }
    ctx.store.release(r);
  }

  #[test]
  fn right_skewed_chain_flattens_left_associative() {
    let mut ctx = SolverContext::new(3);
    let a = ctx.store.build_bv_var(2);
    let b = ctx.store.build_bv_var(2);
    let c = ctx.store.build_bv_var(2);
    let bc = super::super::concat(&mut ctx, b, c); // right-skewed: b ++ c
    let r = super::super::concat(&mut ctx, a, bc); // a ++ (b ++ c)
    // Left-associative means the outer node's low child is no longer itself a CONCAT.
    let children = ctx.store.children(r.id());
    assert!(!matches!(ctx.store.kind(children[1].id()), NodeKind::Concat));
    ctx.store.release(r);
  }
}
