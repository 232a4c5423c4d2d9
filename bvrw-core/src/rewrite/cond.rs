/*!

`COND` rules (spec.md §4.14): `cond(c, x, y)` ("if `c` then `x` else `y`"), covering both `BCOND`
(bit-vector arms) and `ACOND` (array arms) — most of this module's rules apply to both; a few
(the width-1 mux-as-formula rewrite, the `ite`-plus-one zero-extend identity, and shared-operand
factoring) are bit-vector-only, since arrays have neither a width-1 form nor arithmetic operators.

Called directly from `mod.rs`'s `cond` entry, which has already chased `simplified` and asserted
`c`'s width and the arms' shared array-or-bv class.

*/

use bvrw_abs::{BvConst, SpecialConst};

use crate::core::{NodeKind, SolverContext, TaggedRef};
use crate::rewrite::binary::{self, BinKind};

fn same(a: TaggedRef, b: TaggedRef) -> bool {
  a.id() == b.id() && a.is_inverted() == b.is_inverted()
}

fn is_const_one(ctx: &SolverContext, node: TaggedRef) -> bool {
  ctx.store.as_const(node).map(|c| matches!(c.classify_special(), SpecialConst::One | SpecialConst::OneOnes)).unwrap_or(false)
}

/// If `node`'s real kind is `BCOND`/`ACOND`, returns its `(condition, then-arm, else-arm)`, with
/// `node`'s own inversion tag applied to the two arms (not to the condition, which keeps whatever
/// tag it already carries independent of `node`'s own).
fn cond_children(ctx: &SolverContext, node: TaggedRef) -> Option<(TaggedRef, TaggedRef, TaggedRef)> {
  if !matches!(ctx.store.kind(node.id()), NodeKind::Bcond | NodeKind::Acond) {
    return None;
  }
  let children = ctx.store.children(node.id());
  let (cond, then_arm, else_arm) = (children[0], children[1], children[2]);
  let (then_arm, else_arm) = if node.is_inverted() {
    (then_arm.invert(), else_arm.invert())
  } else {
    (then_arm, else_arm)
  };
  Some((cond, then_arm, else_arm))
}

pub fn rewrite_cond(ctx: &mut SolverContext, c: TaggedRef, x: TaggedRef, y: TaggedRef) -> TaggedRef {
  // ~c ? x : y -> c ? y : x (spec.md §4.14 first bullet): keeps the condition operand uninverted
  // everywhere downstream, halving the number of shapes the rules below must recognize.
  let (c, x, y) = if c.is_inverted() { (c.invert(), y, x) } else { (c, x, y) };

  let is_array = ctx.store.is_array(x.id());
  debug_assert_eq!(is_array, ctx.store.is_array(y.id()));

  if same(x, y) {
    ctx.store.release(c);
    ctx.store.release(y);
    return x;
  }

  if let Some(cval) = ctx.store.as_const(c) {
    let take_then = cval.classify_special() != SpecialConst::Zero;
    ctx.store.release(c);
    return if take_then {
      ctx.store.release(y);
      x
    } else {
      ctx.store.release(x);
      y
    };
  }

  let (c, x, y) = match nested_cond_collapse(ctx, c, x, y) {
    Ok(r) => return r,
    Err(t) => t,
  };

  if is_array {
    let index_width = ctx.store.index_width(x.id());
    let elem_width = ctx.store.width(x.id());
    return ctx.store.build_acond(index_width, elem_width, c, x, y);
  }

  let width = ctx.store.width(x.id());
  if width == 1 {
    return if ctx.has_rec_budget() {
      ctx.with_recursion(|ctx| mux_as_formula(ctx, c, x, y))
    } else {
      ctx.store.build_bcond(width, c, x, y)
    };
  }

  let (c, x, y) = match ite_plus_one(ctx, c, x, y) {
    Ok(r) => return r,
    Err(t) => t,
  };

  if ctx.rewrite_level() > 2 {
    let (c, x, y) = match factor_shared_operand(ctx, c, x, y) {
      Ok(r) => return r,
      Err(t) => t,
    };
    return ctx.store.build_bcond(width, c, x, y);
  }

  ctx.store.build_bcond(width, c, x, y)
}

/// Collapses `cond(c, x, y)` when `x` or `y` is itself a `BCOND`/`ACOND` (spec.md §4.14, the
/// "nested condition" bullets). Applies to both `BCOND` and `ACOND` arms. Two shapes per side:
/// the nested condition is syntactically identical to `c` (the outer choice already decided which
/// of the nested arms applies), or one of the nested arms is syntactically identical to the
/// *other* outer arm (the nested cond's own condition can be folded into a single conjunction with
/// `c`, a "subsumption" reduction).
fn nested_cond_collapse(
  ctx: &mut SolverContext,
  c: TaggedRef,
  x: TaggedRef,
  y: TaggedRef,
) -> Result<TaggedRef, (TaggedRef, TaggedRef, TaggedRef)> {
  if !ctx.has_rec_budget() {
    return Err((c, x, y));
  }

  if let Some((inner_c, then_x, else_x)) = cond_children(ctx, x) {
    if same(inner_c, c) {
      let then_x = ctx.store.acquire(then_x);
      let c2 = ctx.store.acquire(c);
      ctx.store.release(x);
      let r = ctx.with_recursion(|ctx| rewrite_cond(ctx, c2, then_x, y));
      ctx.store.release(c);
      return Ok(r);
    }
    if same(then_x, y) {
      let inner_c = ctx.store.acquire(inner_c);
      let else_x = ctx.store.acquire(else_x);
      let c2 = ctx.store.acquire(c);
      ctx.store.release(x);
      let new_cond = ctx.with_recursion(|ctx| super::and(ctx, c2, inner_c.invert()));
      let r = ctx.with_recursion(|ctx| rewrite_cond(ctx, new_cond, else_x, y));
      ctx.store.release(c);
      return Ok(r);
    }
    if same(else_x, y) {
      let inner_c = ctx.store.acquire(inner_c);
      let then_x = ctx.store.acquire(then_x);
      let c2 = ctx.store.acquire(c);
      ctx.store.release(x);
      let new_cond = ctx.with_recursion(|ctx| super::and(ctx, c2, inner_c));
      let r = ctx.with_recursion(|ctx| rewrite_cond(ctx, new_cond, then_x, y));
      ctx.store.release(c);
      return Ok(r);
    }
  }

  if let Some((inner_c, then_y, else_y)) = cond_children(ctx, y) {
    if same(inner_c, c) {
      let else_y = ctx.store.acquire(else_y);
      let c2 = ctx.store.acquire(c);
      ctx.store.release(y);
      let r = ctx.with_recursion(|ctx| rewrite_cond(ctx, c2, x, else_y));
      ctx.store.release(c);
      return Ok(r);
    }
    if same(then_y, x) {
      let inner_c = ctx.store.acquire(inner_c);
      let else_y = ctx.store.acquire(else_y);
      let c2 = ctx.store.acquire(c);
      ctx.store.release(y);
      let new_cond = ctx.with_recursion(|ctx| super::and(ctx, c2.invert(), inner_c.invert()));
      let r = ctx.with_recursion(|ctx| rewrite_cond(ctx, new_cond, else_y, x));
      ctx.store.release(c);
      return Ok(r);
    }
    if same(else_y, x) {
      let inner_c = ctx.store.acquire(inner_c);
      let then_y = ctx.store.acquire(then_y);
      let c2 = ctx.store.acquire(c);
      ctx.store.release(y);
      let new_cond = ctx.with_recursion(|ctx| super::and(ctx, c2.invert(), inner_c));
      let r = ctx.with_recursion(|ctx| rewrite_cond(ctx, new_cond, then_y, x));
      ctx.store.release(c);
      return Ok(r);
    }
  }

  Err((c, x, y))
}

/// `c ? x : x` is already handled by the `same(x, y)` check above; this rewrites the width-1
/// `BCOND` as a boolean formula over `AND` (spec.md §4.14, §4.6): `(NOT c OR x) AND (c OR y)`,
/// with `OR(a, b)` synthesized as `NOT(AND(NOT a, NOT b))` the same way [`super::build_xor1`]
/// synthesizes XOR, since this NAND-only DAG has no direct `OR` node kind.
fn mux_as_formula(ctx: &mut SolverContext, c: TaggedRef, x: TaggedRef, y: TaggedRef) -> TaggedRef {
  let c2 = ctx.store.acquire(c);
  let tmp1 = super::and(ctx, c, x.invert()).invert();
  let tmp2 = super::and(ctx, c2.invert(), y.invert()).invert();
  super::and(ctx, tmp1, tmp2)
}

/// `c ? (x + 1) : x -> x + zext(c)`, and its else-side mirror `c ? x : (x + 1) -> x + zext(NOT c)`
/// (spec.md §4.14, SPEC_FULL §5.4: both mirrors implemented). `zext(bit, n)` has no dedicated node
/// kind; it is built as `concat(ZERO[n], bit)`. Only reached once the width-1 case has already
/// been handled by the caller, so `width - 1 >= 1` always holds here.
fn ite_plus_one(ctx: &mut SolverContext, c: TaggedRef, x: TaggedRef, y: TaggedRef) -> Result<TaggedRef, (TaggedRef, TaggedRef, TaggedRef)> {
  if !ctx.has_rec_budget() {
    return Err((c, x, y));
  }

  if !x.is_inverted() && matches!(ctx.store.kind(x.id()), NodeKind::Add) {
    let children = ctx.store.children(x.id());
    let (a, b) = (children[0], children[1]);
    if (same(a, y) && is_const_one(ctx, b)) || (same(b, y) && is_const_one(ctx, a)) {
      let width = ctx.store.width(x.id());
      ctx.store.release(x);
      let zero = ctx.store.build_const(BvConst::zero(width - 1));
      let ext = ctx.with_recursion(|ctx| super::concat(ctx, zero, c));
      return Ok(ctx.with_recursion(|ctx| super::add(ctx, y, ext)));
    }
  }

  if !y.is_inverted() && matches!(ctx.store.kind(y.id()), NodeKind::Add) {
    let children = ctx.store.children(y.id());
    let (a, b) = (children[0], children[1]);
    if (same(a, x) && is_const_one(ctx, b)) || (same(b, x) && is_const_one(ctx, a)) {
      let width = ctx.store.width(y.id());
      ctx.store.release(y);
      let zero = ctx.store.build_const(BvConst::zero(width - 1));
      let ext = ctx.with_recursion(|ctx| super::concat(ctx, zero, c.invert()));
      return Ok(ctx.with_recursion(|ctx| super::add(ctx, x, ext)));
    }
  }

  Err((c, x, y))
}

/// `c ? (a OP b) : (a OP d) -> a OP (c ? b : d)` and its three other operand pairings (spec.md
/// §4.14's last bullet), for `OP` in `{ADD, AND, MUL, UDIV, UREM}`. `UDIV`/`UREM` aren't
/// commutative, so only the two non-swapped pairings are tried for them; the other three try all
/// four. Only reached at `rewrite_level > 2`.
fn factor_shared_operand(ctx: &mut SolverContext, c: TaggedRef, x: TaggedRef, y: TaggedRef) -> Result<TaggedRef, (TaggedRef, TaggedRef, TaggedRef)> {
  if x.is_inverted() || y.is_inverted() || !ctx.has_rec_budget() {
    return Err((c, x, y));
  }
  let kind = match (ctx.store.kind(x.id()), ctx.store.kind(y.id())) {
    (NodeKind::Add, NodeKind::Add) => BinKind::Add,
    (NodeKind::And, NodeKind::And) => BinKind::And,
    (NodeKind::Mul, NodeKind::Mul) => BinKind::Mul,
    (NodeKind::Udiv, NodeKind::Udiv) => BinKind::Udiv,
    (NodeKind::Urem, NodeKind::Urem) => BinKind::Urem,
    _ => return Err((c, x, y)),
  };

  let xc = ctx.store.children(x.id());
  let (xa, xb) = (xc[0], xc[1]);
  let yc = ctx.store.children(y.id());
  let (ya, yb) = (yc[0], yc[1]);

  if same(xa, ya) {
    return Ok(fold_shared(ctx, kind, c, x, y, xa, xb, yb, true));
  }
  if same(xb, yb) {
    return Ok(fold_shared(ctx, kind, c, x, y, xb, xa, ya, false));
  }
  if kind.is_commutative() {
    if same(xa, yb) {
      return Ok(fold_shared(ctx, kind, c, x, y, xa, xb, ya, true));
    }
    if same(xb, ya) {
      return Ok(fold_shared(ctx, kind, c, x, y, xb, xa, yb, false));
    }
  }
  Err((c, x, y))
}

/// Shared plumbing for [`factor_shared_operand`]'s four pairings: `shared` is the operand common
/// to both `x` and `y`; `x_other`/`y_other` are the remaining operands to merge under `cond`.
/// `shared_is_left` picks whether the rebuilt op is `shared OP merged` or `merged OP shared`.
#[allow(clippy::too_many_arguments)]
fn fold_shared(
  ctx: &mut SolverContext,
  kind: BinKind,
  c: TaggedRef,
  x: TaggedRef,
  y: TaggedRef,
  shared: TaggedRef,
  x_other: TaggedRef,
  y_other: TaggedRef,
  shared_is_left: bool,
) -> TaggedRef {
  let shared = ctx.store.acquire(shared);
  let x_other = ctx.store.acquire(x_other);
  let y_other = ctx.store.acquire(y_other);
  let c = ctx.store.acquire(c);
  ctx.store.release(x);
  ctx.store.release(y);
  let merged = ctx.with_recursion(|ctx| rewrite_cond(ctx, c, x_other, y_other));
  if shared_is_left {
    binary::apply_bin(ctx, kind, shared, merged)
  } else {
    binary::apply_bin(ctx, kind, merged, shared)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::SolverContext;

  #[test]
  fn same_arm_collapses_without_reading_condition() {
    let mut ctx = SolverContext::new(3);
    let c = ctx.store.build_bv_var(1);
    let x = ctx.store.build_bv_var(8);
    let x2 = ctx.store.acquire(x);
    let r = super::super::cond(&mut ctx, c, x, x2);
    assert!(same(r, x));
    ctx.store.release(r);
  }

  #[test]
  fn const_condition_selects_arm() {
    let mut ctx = SolverContext::new(3);
    let one = ctx.store.build_const(BvConst::one(1));
    let x = ctx.store.build_bv_var(8);
    let y = ctx.store.build_bv_var(8);
    let r = super::super::cond(&mut ctx, one, x, y);
    assert_eq!(r.id(), x.id());
    ctx.store.release(r);
    ctx.store.release(y);
  }

  #[test]
  fn width1_mux_builds_and_formula() {
    let mut ctx = SolverContext::new(3);
    let c = ctx.store.build_bv_var(1);
    let x = ctx.store.build_bv_var(1);
    let y = ctx.store.build_bv_var(1);
    let r = super::super::cond(&mut ctx, c, x, y);
    // The width-1 mux rule always yields an AND node, never a primitive BCOND.
    assert!(matches!(ctx.store.kind(r.id()), NodeKind::And));
    ctx.store.release(r);
  }

  #[test]
  fn inverted_condition_swaps_arms() {
    let mut ctx = SolverContext::new(3);
    let c = ctx.store.build_bv_var(1);
    let x = ctx.store.build_bv_var(8);
    let y = ctx.store.build_bv_var(8);
    let r = super::super::cond(&mut ctx, c.invert(), x, y);
    match ctx.store.kind(r.id()) {
      NodeKind::Bcond => {
        let children = ctx.store.children(r.id());
        assert!(same(children[1], y) || same(children[2], x));
      }
      other => panic!("expected a primitive BCOND fallback, got {other:?}"),
    }
    ctx.store.release(r);
  }
}
