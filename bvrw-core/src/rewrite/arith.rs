/*!

Operator-specific rules for `ADD`, `MUL`, `ULT`, `UDIV`, `UREM` (spec.md §4.10), tried after the
generic binary rewriter (`binary.rs`) has already handled constant folding and the CA-operator
identities common to every commutative-associative kind.

*/

use bvrw_abs::BvConst;

use crate::rewrite::binary::{rewrite_binary, BinKind};
use crate::rewrite::ca_normalize::{ca_normalize, CaKind};
use crate::core::{NodeKind, SolverContext, TaggedRef};

fn same(a: TaggedRef, b: TaggedRef) -> bool {
  a.id() == b.id() && a.is_inverted() == b.is_inverted()
}

/// CA-normalizes `(e0, e1)` exactly once when `rewrite_level > 2` and both are uninverted `ADD`
/// (or both `MUL`) nodes, then retries the generic binary rewriter on the normalized pair — this
/// is how a reassociated sum like `a+b` vs `b+a` (or a partially-shared one) gets caught by the
/// same-term/identity rules even though it wasn't literally hash-consed to the same node.
/// Returns `Ok` if the normalize-then-refold pipeline produced a result, `Err` with the (possibly
/// normalized) pair otherwise so the caller's remaining rules can still run on it.
fn maybe_ca_normalize(ctx: &mut SolverContext, kind: BinKind, e0: TaggedRef, e1: TaggedRef, width: u32) -> Result<TaggedRef, (TaggedRef, TaggedRef)> {
  if ctx.rewrite_level() <= 2 || e0.is_inverted() || e1.is_inverted() {
    return Err((e0, e1));
  }
  let k0 = ctx.store.kind(e0.id()).clone();
  let k1 = ctx.store.kind(e1.id()).clone();
  let (ca_kind, combine): (CaKind, fn(&mut SolverContext, TaggedRef, TaggedRef) -> TaggedRef) =
    if matches!(k0, NodeKind::Add) && matches!(k1, NodeKind::Add) {
      (CaKind::Add, super::add)
    } else if matches!(k0, NodeKind::Mul) && matches!(k1, NodeKind::Mul) {
      (CaKind::Mul, super::mul)
    } else {
      return Err((e0, e1));
    };
  let same_kind: fn(&NodeKind) -> bool = if ca_kind == CaKind::Add { |k| matches!(k, NodeKind::Add) } else { |k| matches!(k, NodeKind::Mul) };

  match ca_normalize(ctx, ca_kind, e0, e1, same_kind, combine) {
    Some(normalized) => match rewrite_binary(ctx, kind, normalized.left, normalized.right, width) {
      Some(r) => Ok(r),
      None => Err((normalized.left, normalized.right)),
    },
    None => Err((e0, e1)),
  }
}

/// `e1` is `ADD(¬e0, one)` (two's-complement negation of `e0`), or vice versa: `e0 + e1 -> 0`.
fn two_complement_cancel(ctx: &mut SolverContext, x: TaggedRef, maybe_neg_x: TaggedRef, width: u32) -> Option<TaggedRef> {
  if maybe_neg_x.is_inverted() || !matches!(ctx.store.kind(maybe_neg_x.id()), NodeKind::Add) {
    return None;
  }
  let children = ctx.store.children(maybe_neg_x.id());
  let (p, q) = (children[0], children[1]);
  for (inv_candidate, one_candidate) in [(p, q), (q, p)] {
    if inv_candidate.id() == x.id() && inv_candidate.is_inverted() != x.is_inverted() {
      if let Some(c) = ctx.store.as_const(one_candidate) {
        if c == BvConst::one(width) {
          ctx.store.release(x);
          ctx.store.release(maybe_neg_x);
          return Some(ctx.store.build_const(BvConst::zero(width)));
        }
      }
    }
  }
  None
}

/// Re-associates `c + ADD(x, c2)` (either nesting side, either constant position) so the two
/// constants become adjacent, letting the generic binary rewriter's constant-folding pick them up
/// on the next pass.
fn const_reassociate(ctx: &mut SolverContext, kind: BinKind, e0: TaggedRef, e1: TaggedRef) -> Option<(TaggedRef, TaggedRef)> {
  let node_kind = kind.node_kind();
  if ctx.store.as_const(e0).is_none() {
    return None;
  }
  if e1.is_inverted() || std::mem::discriminant(ctx.store.kind(e1.id())) != std::mem::discriminant(&node_kind) {
    return None;
  }
  let children = ctx.store.children(e1.id());
  let (a, b) = (children[0], children[1]);
  let (const_child, other_child) = if ctx.store.as_const(a).is_some() {
    (a, b)
  } else if ctx.store.as_const(b).is_some() {
    (b, a)
  } else {
    return None;
  };
  let const_child = ctx.store.acquire(const_child);
  let other_child = ctx.store.acquire(other_child);
  ctx.store.release(e1);
  // `e0` (the outer constant) is consumed directly below; only `e1`'s shell is released here,
  // since its two children were already given independent owned copies above.
  let combine: fn(&mut SolverContext, TaggedRef, TaggedRef) -> TaggedRef = if kind == BinKind::Add { super::add } else { super::mul };
  let folded = combine(ctx, e0, const_child);
  Some((folded, other_child))
}

pub fn rewrite_add_specific(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef, width: u32) -> Result<TaggedRef, (TaggedRef, TaggedRef)> {
  if width == 1 {
    return Ok(super::build_xor1(ctx, e0, e1));
  }
  if let Some(r) = two_complement_cancel(ctx, e0, e1, width) {
    return Ok(r);
  }
  if let Some(r) = two_complement_cancel(ctx, e1, e0, width) {
    return Ok(r);
  }
  if let Some((a, b)) = const_reassociate(ctx, BinKind::Add, e0, e1) {
    if let Some(r) = rewrite_binary(ctx, BinKind::Add, a, b, width) {
      return Ok(r);
    }
    return Err((a, b));
  }
  maybe_ca_normalize(ctx, BinKind::Add, e0, e1, width)
}

pub fn rewrite_mul_specific(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef, width: u32) -> Result<TaggedRef, (TaggedRef, TaggedRef)> {
  if width == 1 {
    return Ok(super::and(ctx, e0, e1));
  }
  if let Some((a, b)) = const_reassociate(ctx, BinKind::Mul, e0, e1) {
    if let Some(r) = rewrite_binary(ctx, BinKind::Mul, a, b, width) {
      return Ok(r);
    }
    return Err((a, b));
  }
  // c * (a + b) -> c*a + c*b, when one child of the ADD is constant.
  if let Some(r) = distribute_mul(ctx, e0, e1) {
    return Ok(r);
  }
  if let Some(r) = distribute_mul(ctx, e1, e0) {
    return Ok(r);
  }
  maybe_ca_normalize(ctx, BinKind::Mul, e0, e1, width)
}

/// `c * ADD(a, b) -> c*a + c*b`, only when `a` or `b` is itself constant (otherwise this would
/// expand without bound for no folding benefit).
fn distribute_mul(ctx: &mut SolverContext, c_side: TaggedRef, add_side: TaggedRef) -> Option<TaggedRef> {
  let c = ctx.store.as_const(c_side)?;
  if add_side.is_inverted() || !matches!(ctx.store.kind(add_side.id()), NodeKind::Add) {
    return None;
  }
  let children = ctx.store.children(add_side.id());
  let (a, b) = (children[0], children[1]);
  if ctx.store.as_const(a).is_none() && ctx.store.as_const(b).is_none() {
    return None;
  }
  let _ = c;
  let c1 = ctx.store.acquire(c_side);
  let c2 = ctx.store.acquire(c_side);
  let a = ctx.store.acquire(a);
  let b = ctx.store.acquire(b);
  ctx.store.release(c_side);
  ctx.store.release(add_side);
  let ca = super::mul(ctx, c1, a);
  let cb = super::mul(ctx, c2, b);
  Some(super::add(ctx, ca, cb))
}

pub fn rewrite_ult_specific(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef, width: u32) -> Result<TaggedRef, (TaggedRef, TaggedRef)> {
  if width == 1 {
    return Ok(super::and(ctx, e0.invert(), e1));
  }
  if e0.is_inverted() && e1.is_inverted() {
    let a = crate::core::TaggedRef::positive(e0.id());
    let b = crate::core::TaggedRef::positive(e1.id());
    let a = ctx.store.acquire(a);
    let b = ctx.store.acquire(b);
    ctx.store.release(e0);
    ctx.store.release(e1);
    return Ok(super::ult(ctx, b, a));
  }
  if let Some(r) = ult_concat_concat(ctx, e0, e1) {
    return Ok(r);
  }
  maybe_ca_normalize(ctx, BinKind::Ult, e0, e1, width)
}

/// `CONCAT(h,l0) < CONCAT(h,l1) -> l0 < l1` (shared high part); `CONCAT(h0,l) < CONCAT(h1,l) ->
/// h0 < h1` (shared low part).
fn ult_concat_concat(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Option<TaggedRef> {
  if e0.is_inverted() || e1.is_inverted() {
    return None;
  }
  if !matches!(ctx.store.kind(e0.id()), NodeKind::Concat) || !matches!(ctx.store.kind(e1.id()), NodeKind::Concat) {
    return None;
  }
  let c0 = ctx.store.children(e0.id());
  let (h0, l0) = (c0[0], c0[1]);
  let c1 = ctx.store.children(e1.id());
  let (h1, l1) = (c1[0], c1[1]);
  if same(h0, h1) {
    let l0 = ctx.store.acquire(l0);
    let l1 = ctx.store.acquire(l1);
    ctx.store.release(e0);
    ctx.store.release(e1);
    return Some(super::ult(ctx, l0, l1));
  }
  if same(l0, l1) {
    let h0 = ctx.store.acquire(h0);
    let h1 = ctx.store.acquire(h1);
    ctx.store.release(e0);
    ctx.store.release(e1);
    return Some(super::ult(ctx, h0, h1));
  }
  None
}

pub fn rewrite_udiv_specific(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef, width: u32) -> Result<TaggedRef, (TaggedRef, TaggedRef)> {
  if width == 1 {
    // not (not a and b)
    return Ok(super::and(ctx, e0.invert(), e1).invert());
  }
  maybe_ca_normalize(ctx, BinKind::Udiv, e0, e1, width)
}

pub fn rewrite_urem_specific(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef, width: u32) -> Result<TaggedRef, (TaggedRef, TaggedRef)> {
  if width == 1 {
    // a and not b
    return Ok(super::and(ctx, e0, e1.invert()));
  }
  maybe_ca_normalize(ctx, BinKind::Urem, e0, e1, width)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::SolverContext;

  #[test]
  fn width1_add_is_xor() {
    let mut ctx = SolverContext::new(3);
    let one = ctx.store.build_const(BvConst::one(1));
    let zero = ctx.store.build_const(BvConst::zero(1));
    let r = super::super::add(&mut ctx, one, zero);
    assert_eq!(ctx.store.as_const(r).unwrap().to_bits(), "1");
    ctx.store.release(r);
  }

  #[test]
  fn two_complement_cancels_to_zero() {
    let mut ctx = SolverContext::new(3);
    let x = ctx.store.build_bv_var(4);
    let one = ctx.store.build_const(BvConst::one(4));
    let neg_x = super::super::add(&mut ctx, ctx.store.acquire(x).invert(), one);
    let r = super::super::add(&mut ctx, x, neg_x);
    assert_eq!(ctx.store.as_const(r).unwrap().to_bits(), "0000");
    ctx.store.release(r);
  }

  #[test]
  fn ult_shared_high_reduces() {
    let mut ctx = SolverContext::new(3);
    let h = ctx.store.build_bv_var(4);
    let l0 = ctx.store.build_bv_var(4);
    let l1 = ctx.store.build_bv_var(4);
    let lhs = super::super::concat(&mut ctx, ctx.store.acquire(h), l0);
    let rhs = super::super::concat(&mut ctx, h, l1);
    let r = super::super::ult(&mut ctx, lhs, rhs);
    match ctx.store.kind(r.id()) {
      NodeKind::Ult => {}
      other => panic!("expected a reduced ULT node, got {other:?}"),
    }
    ctx.store.release(r);
  }
}
