/*!

The equality rewriter (spec.md §4.9): dispatches to bit-vector equality (`BEQ`, via the generic
binary rewriter plus the extra rules below) or array equality (`AEQ`, which has no constant form
and so skips the generic rewriter entirely).

*/

use bvrw_abs::BvConst;

use crate::rewrite::always_unequal::is_always_unequal;
use crate::rewrite::binary::{rewrite_binary, BinKind};
use crate::rewrite::ca_normalize::{ca_normalize, CaKind};
use crate::core::{NodeKind, SolverContext, TaggedRef};

fn same(a: TaggedRef, b: TaggedRef) -> bool {
  a.id() == b.id() && a.is_inverted() == b.is_inverted()
}

pub fn rewrite_eq(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  if ctx.store.is_array(e0.id()) {
    return rewrite_aeq(ctx, e0, e1);
  }

  let width = ctx.store.width(e0.id());
  debug_assert_eq!(width, ctx.store.width(e1.id()));

  if let Some(r) = rewrite_binary(ctx, BinKind::Beq, e0, e1, width) {
    return r;
  }

  if ctx.rewrite_level() > 2 {
    if let Some(r) = rewrite_beq_level3(ctx, e0, e1, width) {
      return r;
    }
  }

  ctx.store.build_commutative(NodeKind::Beq, 1, e0, e1)
}

/// spec.md §4.9's `rewrite_level > 2` rule set, tried in listed order. `e0`/`e1` are passed by
/// value and returned untouched on a miss (the caller falls through to the primitive builder).
fn rewrite_beq_level3(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef, width: u32) -> Option<TaggedRef> {
  // a + b == a -> b == 0 (four symmetric placements of which side is the bare leaf and which
  // ADD operand it cancels against).
  if let Some(r) = add_cancel(ctx, e0, e1, width) {
    return Some(r);
  }
  if let Some(r) = add_cancel(ctx, e1, e0, width) {
    return Some(r);
  }

  // (c ? a : t) == d, is_always_unequal(a, d) -> (NOT c) AND (t == d); four symmetric cases
  // (condition on either side, matching either arm).
  if let Some(r) = cond_arm_unequal(ctx, e0, e1) {
    return Some(r);
  }
  if let Some(r) = cond_arm_unequal(ctx, e1, e0) {
    return Some(r);
  }

  // a + b == a + c -> b == c, all four pairings.
  if let Some(r) = add_add_cancel(ctx, e0, e1) {
    return Some(r);
  }

  // (a & b) == (not a & not b) / (a & b) == (a & not b) / (a & b) == (not a & b)
  if let Some(r) = and_and_eq(ctx, e0, e1) {
    return Some(r);
  }

  // cond == leaf, leaf equal to one of cond's own arms.
  if let Some(r) = cond_eq_arm(ctx, e0, e1) {
    return Some(r);
  }
  if let Some(r) = cond_eq_arm(ctx, e1, e0) {
    return Some(r);
  }

  // CA-normalization for two ADDs or two MULs, retrying the comparison on the normalized pair.
  if let Some(r) = ca_normalize_then_eq(ctx, e0, e1) {
    return Some(r);
  }

  // Distributivity probe: c * x vs a + b.
  if let Some(r) = distributivity_probe(ctx, e0, e1) {
    return Some(r);
  }
  if let Some(r) = distributivity_probe(ctx, e1, e0) {
    return Some(r);
  }

  // Push equality through concats.
  push_through_concat(ctx, e0, e1, width)
}

/// `leaf == add_side` where `add_side` is `ADD(a, b)` and `leaf` equals `a` or `b`: `leaf == add ->
/// (the other operand) == 0`.
fn add_cancel(ctx: &mut SolverContext, leaf: TaggedRef, add_side: TaggedRef, width: u32) -> Option<TaggedRef> {
  if add_side.is_inverted() || !matches!(ctx.store.kind(add_side.id()), NodeKind::Add) {
    return None;
  }
  let children = ctx.store.children(add_side.id());
  let (a, b) = (children[0], children[1]);
  let residue = if same(leaf, a) {
    b
  } else if same(leaf, b) {
    a
  } else {
    return None;
  };
  let residue = ctx.store.acquire(residue);
  ctx.store.release(leaf);
  ctx.store.release(add_side);
  let zero = ctx.store.build_const(BvConst::zero(width));
  Some(super::eq(ctx, residue, zero))
}

fn cond_arm_unequal(ctx: &mut SolverContext, cond_side: TaggedRef, d: TaggedRef) -> Option<TaggedRef> {
  if !matches!(ctx.store.kind(cond_side.id()), NodeKind::Bcond) {
    return None;
  }
  let children = ctx.store.children(cond_side.id());
  let (c, then_arm, else_arm) = (children[0], children[1], children[2]);
  // Apply cond_side's own inversion tag to each arm before comparing.
  let then_val = if cond_side.is_inverted() { then_arm.invert() } else { then_arm };
  let else_val = if cond_side.is_inverted() { else_arm.invert() } else { else_arm };

  let (matched_arm_is_then, other_arm) = if is_always_unequal(&ctx.store, then_val, d) {
    (true, else_val)
  } else if is_always_unequal(&ctx.store, else_val, d) {
    (false, then_val)
  } else {
    return None;
  };

  let c = ctx.store.acquire(c);
  let other_arm = ctx.store.acquire(other_arm);
  let d = ctx.store.acquire(d);
  ctx.store.release(cond_side);

  // (c ? a : t) == d, a always-unequal to d: NOT c AND (t == d); dually when it's the else arm.
  let cond_term = if matched_arm_is_then { c.invert() } else { c };
  let eq_term = super::eq(ctx, other_arm, d);
  Some(super::and(ctx, cond_term, eq_term))
}

/// `a + b == a + c -> b == c`, tried across all four pairings of which `ADD` child matches.
fn add_add_cancel(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Option<TaggedRef> {
  if e0.is_inverted() || e1.is_inverted() {
    return None;
  }
  if !matches!(ctx.store.kind(e0.id()), NodeKind::Add) || !matches!(ctx.store.kind(e1.id()), NodeKind::Add) {
    return None;
  }
  let c0 = ctx.store.children(e0.id());
  let (a0, b0) = (c0[0], c0[1]);
  let c1 = ctx.store.children(e1.id());
  let (a1, b1) = (c1[0], c1[1]);

  let pairing = [(a0, b0, a1, b1), (a0, b0, b1, a1), (b0, a0, a1, b1), (b0, a0, b1, a1)]
      .into_iter()
      .find_map(|(shared0, rest0, shared1, rest1)| if same(shared0, shared1) { Some((rest0, rest1)) } else { None });

  let (rest0, rest1) = pairing?;
  let rest0 = ctx.store.acquire(rest0);
  let rest1 = ctx.store.acquire(rest1);
  ctx.store.release(e0);
  ctx.store.release(e1);
  Some(super::eq(ctx, rest0, rest1))
}

/// `(a & b) == (not a & not b) -> a == not b` (same tag on both grandchildren) or `a == b`
/// (differing tag); dually `(a & b) == (a & not b) -> a == 0` / `(a & b) == (not a & b) -> b == 0`.
fn and_and_eq(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Option<TaggedRef> {
  if e0.is_inverted() || e1.is_inverted() {
    return None;
  }
  if !matches!(ctx.store.kind(e0.id()), NodeKind::And) || !matches!(ctx.store.kind(e1.id()), NodeKind::And) {
    return None;
  }
  let c0 = ctx.store.children(e0.id());
  let (a, b) = (c0[0], c0[1]);
  let c1 = ctx.store.children(e1.id());
  let (c, d) = (c1[0], c1[1]);

  // (a & b) == (~a & ~b): c,d negate a,b pairwise.
  if (a.id() == c.id() && a.is_inverted() != c.is_inverted() && b.id() == d.id() && b.is_inverted() != d.is_inverted())
      || (a.id() == d.id() && a.is_inverted() != d.is_inverted() && b.id() == c.id() && b.is_inverted() != c.is_inverted())
  {
    let a = ctx.store.acquire(a);
    let b = ctx.store.acquire(b);
    ctx.store.release(e0);
    ctx.store.release(e1);
    return Some(super::eq(ctx, a, b.invert()));
  }

  // (a & b) == (a & ~b) -> a == 0 ; (a & b) == (~a & b) -> b == 0 (also with c/d swapped).
  for (x, y) in [(c, d), (d, c)] {
    if same(a, x) && b.id() == y.id() && b.is_inverted() != y.is_inverted() {
      let a = ctx.store.acquire(a);
      ctx.store.release(e0);
      ctx.store.release(e1);
      let zero = ctx.store.build_const(BvConst::zero(ctx.store.width(a.id())));
      return Some(super::eq(ctx, a, zero));
    }
    if same(b, y) && a.id() == x.id() && a.is_inverted() != x.is_inverted() {
      let b = ctx.store.acquire(b);
      ctx.store.release(e0);
      ctx.store.release(e1);
      let zero = ctx.store.build_const(BvConst::zero(ctx.store.width(b.id())));
      return Some(super::eq(ctx, b, zero));
    }
  }
  None
}

/// `cond_side == leaf` where `cond_side` is a `BCOND` and `leaf` equals one of its two arms:
/// reduces to an `OR`/`AND` of the condition (in the matching tag) with the other arm's equality.
/// Specifically: `(c?x:y) == x -> c OR (y==x)`; `(c?x:y) == y -> (NOT c) OR (x==y)`, modulo
/// `cond_side`'s own inversion tag (four sign/arm combinations).
fn cond_eq_arm(ctx: &mut SolverContext, cond_side: TaggedRef, leaf: TaggedRef) -> Option<TaggedRef> {
  if !matches!(ctx.store.kind(cond_side.id()), NodeKind::Bcond) {
    return None;
  }
  let children = ctx.store.children(cond_side.id());
  let (c, then_arm, else_arm) = (children[0], children[1], children[2]);
  let then_val = if cond_side.is_inverted() { then_arm.invert() } else { then_arm };
  let else_val = if cond_side.is_inverted() { else_arm.invert() } else { else_arm };

  let (cond_sign_matches_then, other_arm) = if same(then_val, leaf) {
    (true, else_val)
  } else if same(else_val, leaf) {
    (false, then_val)
  } else {
    return None;
  };

  let c = ctx.store.acquire(c);
  let other_arm = ctx.store.acquire(other_arm);
  ctx.store.release(cond_side);
  // `leaf` was handed to us owned by the caller; it is consumed below by the `eq` call.

  let cond_term = if cond_sign_matches_then { c } else { c.invert() };
  let eq_term = super::eq(ctx, other_arm, leaf);
  Some(super::and(ctx, cond_term, eq_term))
}

/// CA-normalize two `ADD` (or two `MUL`) operands and retry the comparison on the normalized
/// pair; the shared common part cancels, leaving `residue_left == residue_right`.
fn ca_normalize_then_eq(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Option<TaggedRef> {
  if e0.is_inverted() || e1.is_inverted() {
    return None;
  }
  let k0 = ctx.store.kind(e0.id()).clone();
  let k1 = ctx.store.kind(e1.id()).clone();
  let (ca_kind, same_kind, combine): (CaKind, fn(&NodeKind) -> bool, fn(&mut SolverContext, TaggedRef, TaggedRef) -> TaggedRef) =
      if matches!(k0, NodeKind::Add) && matches!(k1, NodeKind::Add) {
        (CaKind::Add, |k| matches!(k, NodeKind::Add), super::add)
      } else if matches!(k0, NodeKind::Mul) && matches!(k1, NodeKind::Mul) {
        (CaKind::Mul, |k| matches!(k, NodeKind::Mul), super::mul)
      } else {
        return None;
      };

  let normalized = ca_normalize(ctx, ca_kind, e0, e1, same_kind, combine)?;
  Some(super::eq(ctx, normalized.left, normalized.right))
}

/// `c * x == a + b`, where `a + b` can be refactored as `c * (p + q)` with `a = c*p`, `b = c*q`:
/// if the refactored tree matches `c * x` structurally, the equality holds unconditionally.
fn distributivity_probe(ctx: &mut SolverContext, mul_side: TaggedRef, add_side: TaggedRef) -> Option<TaggedRef> {
  if mul_side.is_inverted() || add_side.is_inverted() {
    return None;
  }
  if !matches!(ctx.store.kind(mul_side.id()), NodeKind::Mul) || !matches!(ctx.store.kind(add_side.id()), NodeKind::Add) {
    return None;
  }
  let mc = ctx.store.children(mul_side.id());
  let (c_op, x_op) = (mc[0], mc[1]);
  let c_const = ctx.store.as_const(c_op)?;

  let ac = ctx.store.children(add_side.id());
  let (a, b) = (ac[0], ac[1]);
  let a_mul = as_mul_with_factor(ctx, a, &c_const)?;
  let b_mul = as_mul_with_factor(ctx, b, &c_const)?;

  let a_mul = ctx.store.acquire(a_mul);
  let b_mul = ctx.store.acquire(b_mul);
  let x_op = ctx.store.acquire(x_op);
  ctx.store.release(mul_side);
  ctx.store.release(add_side);
  let rebuilt_x = super::add(ctx, a_mul, b_mul);
  Some(super::eq(ctx, rebuilt_x, x_op))
}

/// If `node` is (after chasing tags) `MUL(c, p)` or `MUL(p, c)` for the given constant `c`,
/// returns `p`.
fn as_mul_with_factor(ctx: &SolverContext, node: TaggedRef, c: &BvConst) -> Option<TaggedRef> {
  if node.is_inverted() || !matches!(ctx.store.kind(node.id()), NodeKind::Mul) {
    return None;
  }
  let children = ctx.store.children(node.id());
  let (p, q) = (children[0], children[1]);
  if ctx.store.as_const(p).as_ref() == Some(c) {
    Some(q)
  } else if ctx.store.as_const(q).as_ref() == Some(c) {
    Some(p)
  } else {
    None
  }
}

/// Splits `e0 == e1` through a top-level `CONCAT` on either side, at the width of that concat's
/// high child (spec.md §4.9's last bullet).
fn push_through_concat(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef, _width: u32) -> Option<TaggedRef> {
  let (concat_side, other) = if !e0.is_inverted() && matches!(ctx.store.kind(e0.id()), NodeKind::Concat) {
    (e0, e1)
  } else if !e1.is_inverted() && matches!(ctx.store.kind(e1.id()), NodeKind::Concat) {
    (e1, e0)
  } else {
    return None;
  };
  if !ctx.has_rec_budget() {
    return None;
  }

  let children = ctx.store.children(concat_side.id());
  let (hi, lo) = (children[0], children[1]);
  let hi_width = ctx.store.width(hi.id());
  let lo_width = ctx.store.width(lo.id());
  let total_width = hi_width + lo_width;

  let hi = ctx.store.acquire(hi);
  let lo = ctx.store.acquire(lo);
  ctx.store.release(concat_side);
  let other = ctx.store.acquire(other);

  let other_hi = ctx.with_recursion(|ctx| super::slice(ctx, ctx.store.acquire(other), total_width - 1, lo_width));
  let other_lo = ctx.with_recursion(|ctx| super::slice(ctx, other, lo_width - 1, 0));

  let hi_eq = super::eq(ctx, hi, other_hi);
  let lo_eq = super::eq(ctx, lo, other_lo);
  Some(super::and(ctx, hi_eq, lo_eq))
}

/// Array equality (`AEQ`, spec.md §4.9 last paragraph): same-term identity (requires identical
/// tag — arrays are never inverted, invariant 6), and `write(a,i,x) == write(a,i,y) -> x == y`.
fn rewrite_aeq(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  debug_assert!(!e0.is_inverted() && !e1.is_inverted(), "arrays are never inverted (invariant 6)");

  if e0.id() == e1.id() {
    ctx.store.release(e0);
    ctx.store.release(e1);
    return ctx.store.build_const(BvConst::one(1));
  }

  if ctx.rewrite_level() > 2 {
    if let Some(r) = write_write_downgrade(ctx, e0, e1) {
      return r;
    }
  }

  ctx.store.build_commutative(NodeKind::Aeq, 1, e0, e1)
}

/// `write(a,i,x) == write(a,i,y) -> x == y`.
fn write_write_downgrade(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Option<TaggedRef> {
  if !ctx.store.is_write(e0.id()) || !ctx.store.is_write(e1.id()) {
    return None;
  }
  let c0 = ctx.store.children(e0.id());
  let (a0, i0, x0) = (c0[0], c0[1], c0[2]);
  let c1 = ctx.store.children(e1.id());
  let (a1, i1, x1) = (c1[0], c1[1], c1[2]);
  if a0.id() != a1.id() || !same(i0, i1) {
    return None;
  }
  let x0 = ctx.store.acquire(x0);
  let x1 = ctx.store.acquire(x1);
  ctx.store.release(e0);
  ctx.store.release(e1);
  Some(super::eq(ctx, x0, x1))
}
