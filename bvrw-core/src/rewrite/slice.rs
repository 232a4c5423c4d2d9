/*!

The slice rewriter (spec.md §4.8), applied in the priority order the spec lists: identity, const
fold, slice-of-slice fusion (the store never constructs a literal `SLICE`-of-`SLICE`, invariant 3),
then slice-through-concat.

*/

use crate::core::{NodeKind, SolverContext, TaggedRef};

pub fn rewrite_slice(ctx: &mut SolverContext, e: TaggedRef, upper: u32, lower: u32) -> TaggedRef {
  let width = ctx.store.width(e.id());

  // 1. Identity slice: the whole operand.
  if lower == 0 && upper == width - 1 {
    return e;
  }

  // 2. Slice of constant: fold in the constant kernel.
  if let Some(c) = ctx.store.as_const(e) {
    ctx.store.release(e);
    return ctx.store.build_const(c.slice(upper, lower));
  }

  // 3. Slice of slice: fuse bounds against the child rather than nesting (invariant 3).
  if let NodeKind::Slice { upper: child_upper, lower: child_lower } = ctx.store.kind(e.id()) {
    let (child_upper, child_lower) = (*child_upper, *child_lower);
    let child = ctx.store.children(e.id())[0];
    let was_inverted = e.is_inverted();
    let child = ctx.store.acquire(child);
    ctx.store.release(e);
    let new_lower = child_lower + lower;
    let new_upper = child_lower + upper;
    debug_assert!(new_upper <= child_upper);
    let result = if ctx.has_rec_budget() {
      ctx.with_recursion(|ctx| rewrite_slice(ctx, child, new_upper, new_lower))
    } else {
      ctx.store.build_slice(child, new_upper, new_lower)
    };
    return if was_inverted { result.invert() } else { result };
  }

  // 4. Slice through concat.
  if let NodeKind::Concat = ctx.store.kind(e.id()) {
    if let Some(result) = slice_through_concat(ctx, e, upper, lower) {
      return result;
    }
  }

  ctx.store.build_slice(e, upper, lower)
}

fn slice_through_concat(ctx: &mut SolverContext, e: TaggedRef, upper: u32, lower: u32) -> Option<TaggedRef> {
  let children = ctx.store.children(e.id());
  let (hi, lo) = (children[0], children[1]);
  let lo_width = ctx.store.width(lo.id());
  let hi_width = ctx.store.width(hi.id());
  let was_inverted = e.is_inverted();

  // Exactly the low half.
  if lower == 0 && upper == lo_width - 1 {
    let lo = ctx.store.acquire(lo);
    ctx.store.release(e);
    return Some(if was_inverted { lo.invert() } else { lo });
  }

  // Exactly the high half (only checked directly at rewrite_level < 3; at level 3 the general
  // "entirely within high" branch below subsumes it).
  if ctx.rewrite_level() < 3 && lower == lo_width && upper == lo_width + hi_width - 1 {
    let hi = ctx.store.acquire(hi);
    ctx.store.release(e);
    return Some(if was_inverted { hi.invert() } else { hi });
  }

  if ctx.rewrite_level() < 3 {
    return None;
  }
  if !ctx.has_rec_budget() {
    return None;
  }

  if upper < lo_width {
    // Entirely within the low child.
    let lo = ctx.store.acquire(lo);
    ctx.store.release(e);
    let result = ctx.with_recursion(|ctx| rewrite_slice(ctx, lo, upper, lower));
    return Some(if was_inverted { result.invert() } else { result });
  }
  if lower >= lo_width {
    // Entirely within the high child, shifted down by the low width.
    let hi = ctx.store.acquire(hi);
    ctx.store.release(e);
    let result = ctx.with_recursion(|ctx| rewrite_slice(ctx, hi, upper - lo_width, lower - lo_width));
    return Some(if was_inverted { result.invert() } else { result });
  }

  // Straddles both children: split and concat the two sub-slices.
  let hi = ctx.store.acquire(hi);
  let lo = ctx.store.acquire(lo);
  ctx.store.release(e);
  let hi_part = ctx.with_recursion(|ctx| rewrite_slice(ctx, hi, upper - lo_width, 0));
  let lo_part = ctx.with_recursion(|ctx| rewrite_slice(ctx, lo, lo_width - 1, lower));
  let result = super::concat(ctx, hi_part, lo_part);
  Some(if was_inverted { result.invert() } else { result })
}

#[cfg(test)]
mod tests {
  use bvrw_abs::BvConst;

  use super::*;
  use crate::core::SolverContext;

  #[test]
  fn identity_slice_returns_operand() {
    let mut ctx = SolverContext::new(3);
    let x = ctx.store.build_bv_var(8);
    let r = super::super::slice(&mut ctx, ctx.store.acquire(x), 7, 0);
    assert_eq!(r.id(), x.id());
    ctx.store.release(x);
    ctx.store.release(r);
  }

  #[test]
  fn slice_of_const_folds() {
    let mut ctx = SolverContext::new(3);
    let c = ctx.store.build_const(BvConst::from_bits("1011").unwrap());
    let r = super::super::slice(&mut ctx, c, 2, 0);
    assert_eq!(ctx.store.as_const(r).unwrap().to_bits(), "011");
    ctx.store.release(r);
  }

  #[test]
  fn slice_of_slice_fuses() {
    let mut ctx = SolverContext::new(3);
    let x = ctx.store.build_bv_var(8);
    let outer = super::super::slice(&mut ctx, x, 7, 2); // width 6, bits [7..2]
    let inner = super::super::slice(&mut ctx, outer, 3, 1); // within the slice: [5..3] of x
    match ctx.store.kind(inner.id()) {
      NodeKind::Slice { upper, lower } => {
        assert_eq!(*upper, 5);
        assert_eq!(*lower, 3);
      }
      other => panic!("expected a fused Slice node, got {other:?}"),
    }
    ctx.store.release(inner);
  }

  #[test]
  fn slice_through_concat_low_half() {
    let mut ctx = SolverContext::new(3);
    let hi = ctx.store.build_bv_var(4);
    let lo = ctx.store.build_bv_var(4);
    let cat = super::super::concat(&mut ctx, hi, lo);
    let r = super::super::slice(&mut ctx, cat, 3, 0);
    assert_eq!(r.id(), lo.id());
    ctx.store.release(lo);
    ctx.store.release(r);
  }
}
