/*!

The `AND`-specific two-level peephole (spec.md §4.3), applied after the generic binary rewriter
(`binary.rs`) has already tried constant-folding and the identities common to every CA operator.
Everything here is additional structure specific to conjunction: idempotency/contradiction over
one level of nested `AND`s, the bounded contradiction search (`contradiction.rs`), the `ULT`
mirror rules, and constant re-association.

The "re-entry" convention (spec.md §4.3, §9): reducing one operand to a sub-operand re-evaluates
the whole rule set against the new pair rather than returning immediately. Implemented as a
bounded loop — each reduction strictly shrinks one operand's node count, so termination is
guaranteed well within the loop's generous iteration cap.

*/

use crate::core::{NodeKind, SolverContext, TaggedRef};
use crate::rewrite::contradiction::find_contradiction;

/// A generous bound on re-entry iterations; each iteration strictly reduces one operand, so in
/// practice this is never approached — it exists only to guarantee the loop is not literally
/// unbounded if a future rule addition breaks that invariant.
const REENTRY_BOUND: u32 = 256;

fn is_negation(a: TaggedRef, b: TaggedRef) -> bool {
  a.id() == b.id() && a.is_inverted() != b.is_inverted()
}

fn same(a: TaggedRef, b: TaggedRef) -> bool {
  a.id() == b.id() && a.is_inverted() == b.is_inverted()
}

/// Tries every AND-specific rule against `(e0, e1)`. On a match, consumes both operands and
/// returns a freshly owned result. On no match, releases neither — ownership of both operands is
/// returned to the caller (via the `Err` side) so it can fall through to the fallback builder.
pub fn rewrite_and_specific(ctx: &mut SolverContext, mut e0: TaggedRef, mut e1: TaggedRef) -> Result<TaggedRef, (TaggedRef, TaggedRef)> {
  let width = ctx.store.width(e0.id());

  for _ in 0..REENTRY_BOUND {
    // x & x -> x (the caller's e1 is now redundant).
    if same(e0, e1) {
      ctx.store.release(e1);
      return Ok(e0);
    }
    // x & ~x -> 0
    if is_negation(e0, e1) {
      ctx.store.release(e0);
      ctx.store.release(e1);
      return Ok(ctx.store.build_const(bvrw_abs::BvConst::zero(width)));
    }

    // Two-level peephole: e0 = AND(a,b) uninverted, e1 is a literal.
    if let Some(result) = one_sided_two_level(ctx, e0, e1, width) {
      return Ok(result);
    }
    if let Some(result) = one_sided_two_level(ctx, e1, e0, width) {
      return Ok(result);
    }

    // Resolution / XNOR-to-equality for two inverted ANDs (the "OR of ANDs" shape): handled by
    // the equality rewriter recognizing the XOR template directly on `(e0, e1)`, so nothing
    // further is attempted here for that case — it legitimately falls through to the generic
    // AND node.

    // Constant re-association: (a & b) & x, with `a` constant and `x` constant -> fold `a`/`x`
    // together so the outer AND sees two constants.
    if let Some((lhs, rhs)) = try_const_reassociate(ctx, e0, e1) {
      e0 = lhs;
      e1 = rhs;
      continue;
    }

    // (a < b) & (b < a) -> false ; ~(a < b) & ~(b < a) -> a == b
    if let Some(result) = ult_mirror(ctx, e0, e1) {
      return Ok(result);
    }

    // AND-contradiction search across both operand subtrees.
    if find_contradiction(&ctx.store, e0, e0, e1) || find_contradiction(&ctx.store, e1, e0, e1) {
      ctx.stats.and_contradictions += 1;
      ctx.store.release(e0);
      ctx.store.release(e1);
      return Ok(ctx.store.build_const(bvrw_abs::BvConst::zero(width)));
    }

    break;
  }

  Err((e0, e1))
}

/// `lit_side = AND(a,b)` (uninverted), `literal` is the other operand. If `literal` equals `a` or
/// `b`, the AND absorbs (idempotency). If `literal` equals `~a` or `~b`, the pair contradicts.
fn one_sided_two_level(ctx: &mut SolverContext, lit_side: TaggedRef, literal: TaggedRef, width: u32) -> Option<TaggedRef> {
  if lit_side.is_inverted() || !matches!(ctx.store.kind(lit_side.id()), NodeKind::And) {
    return None;
  }
  let children = ctx.store.children(lit_side.id());
  let (a, b) = (children[0], children[1]);

  if same(literal, a) || same(literal, b) {
    ctx.stats.and_idem_exprs += 1;
    ctx.store.release(literal);
    return Some(lit_side);
  }
  if is_negation(literal, a) || is_negation(literal, b) {
    ctx.store.release(lit_side);
    ctx.store.release(literal);
    return Some(ctx.store.build_const(bvrw_abs::BvConst::zero(width)));
  }
  None
}

/// `(a & b) & x` with both `a` (or `b`) and `x` constant: re-associates to `(a & x) & b` so a
/// later pass folds the two constants.
fn try_const_reassociate(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Option<(TaggedRef, TaggedRef)> {
  let x_const = ctx.store.as_const(e1)?;
  if e0.is_inverted() || !matches!(ctx.store.kind(e0.id()), NodeKind::And) {
    return None;
  }
  let children = ctx.store.children(e0.id());
  let (a, b) = (children[0], children[1]);
  let a_const = ctx.store.as_const(a);
  if a_const.is_none() {
    return None;
  }
  let _ = x_const;
  ctx.stats.and_const_exprs += 1;
  // Rebuild as (a & x) & b.
  let a_owned = ctx.store.acquire(a);
  let b_owned = ctx.store.acquire(b);
  ctx.store.release(e0);
  let folded = ctx.store.build_commutative(NodeKind::And, ctx.store.width(a_owned.id()), a_owned, e1);
  Some((folded, b_owned))
}

fn ult_mirror(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> Option<TaggedRef> {
  if !matches!(ctx.store.kind(e0.id()), NodeKind::Ult) || !matches!(ctx.store.kind(e1.id()), NodeKind::Ult) {
    return None;
  }
  let c0 = ctx.store.children(e0.id());
  let (a, b) = (c0[0], c0[1]);
  let c1 = ctx.store.children(e1.id());
  let (c, d) = (c1[0], c1[1]);
  // Looking for ult(a,b) and ult(d,c)==ult(b,a) i.e. same pair swapped.
  if !(same(a, d) && same(b, c)) {
    return None;
  }
  if !e0.is_inverted() && !e1.is_inverted() {
    // (a<b) & (b<a) -> false
    ctx.store.release(e0);
    ctx.store.release(e1);
    return Some(ctx.store.build_const(bvrw_abs::BvConst::zero(1)));
  }
  if e0.is_inverted() && e1.is_inverted() {
    // ~(a<b) & ~(b<a) -> a == b
    let a_owned = ctx.store.acquire(a);
    let b_owned = ctx.store.acquire(b);
    ctx.store.release(e0);
    ctx.store.release(e1);
    return Some(ctx.store.build_commutative(NodeKind::Beq, 1, a_owned, b_owned));
  }
  None
}
