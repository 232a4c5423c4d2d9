//! Crate-level property tests (spec.md §8; `SPEC_FULL.md` §1.4): each rewriter entry must fold a
//! fully-constant operand pair to the same result a direct reference evaluation on [`BvConst`]
//! would produce, at every operand width the model enumerator covers, and a handful of symbolic
//! (non-constant) identities must hold regardless of `rewrite_level`.

use bvrw_abs::model::all_pairs;
use bvrw_abs::BvConst;
use bvrw_core::core::{SolverContext, TaggedRef};
use bvrw_core::rewrite;

const WIDTH: u32 = 3;

fn const_fold(level: u8, op: impl Fn(&mut SolverContext, TaggedRef, TaggedRef) -> TaggedRef, a: &BvConst, b: &BvConst) -> BvConst {
  let mut ctx = SolverContext::new(level);
  let ea = ctx.store.build_const(a.clone());
  let eb = ctx.store.build_const(b.clone());
  let r = op(&mut ctx, ea, eb);
  let result = ctx.store.as_const(r).expect("two constant operands must fold to a constant");
  ctx.store.release(r);
  result
}

#[test]
fn add_folds_to_reference_sum_over_all_pairs() {
  for (a, b) in all_pairs(WIDTH) {
    let got = const_fold(3, rewrite::add, &a, &b);
    assert_eq!(got, a.add(&b), "add({a}, {b})");
  }
}

#[test]
fn mul_folds_to_reference_product_over_all_pairs() {
  for (a, b) in all_pairs(WIDTH) {
    let got = const_fold(3, rewrite::mul, &a, &b);
    assert_eq!(got, a.mul(&b), "mul({a}, {b})");
  }
}

#[test]
fn and_folds_to_reference_bitwise_and_over_all_pairs() {
  for (a, b) in all_pairs(WIDTH) {
    let got = const_fold(3, rewrite::and, &a, &b);
    assert_eq!(got, a.and(&b), "and({a}, {b})");
  }
}

#[test]
fn ult_folds_to_reference_comparison_over_all_pairs() {
  for (a, b) in all_pairs(WIDTH) {
    let got = const_fold(3, rewrite::ult, &a, &b);
    assert_eq!(got, a.ult(&b), "ult({a}, {b})");
  }
}

#[test]
fn eq_folds_to_reference_equality_over_all_pairs() {
  for (a, b) in all_pairs(WIDTH) {
    let got = const_fold(3, rewrite::eq, &a, &b);
    assert_eq!(got, a.eq(&b), "eq({a}, {b})");
  }
}

#[test]
fn udiv_and_urem_fold_to_reference_including_division_by_zero() {
  for (a, b) in all_pairs(WIDTH) {
    let got_div = const_fold(3, rewrite::udiv, &a, &b);
    assert_eq!(got_div, a.udiv(&b), "udiv({a}, {b})");
    let got_rem = const_fold(3, rewrite::urem, &a, &b);
    assert_eq!(got_rem, a.urem(&b), "urem({a}, {b})");
  }
}

/// `rewrite_level` only controls *how much work* the rewriter does to reach a normal form, never
/// *what* that normal form denotes: constant folding must agree at every level.
#[test]
fn rewrite_level_never_changes_the_folded_value() {
  for (a, b) in all_pairs(WIDTH) {
    let at_1 = const_fold(1, rewrite::add, &a, &b);
    let at_3 = const_fold(3, rewrite::add, &a, &b);
    assert_eq!(at_1, at_3, "add({a}, {b}) at level 1 vs level 3");
  }
}

/// `x + 0 -> x` (spec.md §4.2.2) must hold identically (same node, not just same value) whether
/// or not higher `rewrite_level`-gated rules are enabled.
#[test]
fn add_zero_identity_is_level_independent() {
  for level in [1u8, 2, 3] {
    let mut ctx = SolverContext::new(level);
    let x = ctx.store.build_bv_var(8);
    let x_copy = ctx.store.acquire(x);
    let zero = ctx.store.build_const(BvConst::zero(8));
    let r = rewrite::add(&mut ctx, x, zero);
    assert_eq!(r.id(), x_copy.id());
    assert_eq!(r.is_inverted(), x_copy.is_inverted());
    ctx.store.release(r);
    ctx.store.release(x_copy);
  }
}

/// `e - e` has no direct operator in this rewriter, but `e + ~e == ONES` (two's-complement
/// cancellation, spec.md §4.2.3) is a width-independent identity worth checking symbolically
/// rather than only on constants.
#[test]
fn add_with_bitwise_complement_cancels_to_ones() {
  let mut ctx = SolverContext::new(3);
  let x = ctx.store.build_bv_var(6);
  let not_x = x.invert();
  let r = rewrite::add(&mut ctx, x, not_x);
  let folded = ctx.store.as_const(r).expect("e + ~e must fold to a constant");
  assert_eq!(folded, BvConst::ones(6));
  ctx.store.release(r);
}

/// `read(write(a, i, v), i) == v` must hold for every width-2 index/value pair, exercising the
/// full matrix the model enumerator can cover cheaply.
#[test]
fn read_after_write_matches_model_for_every_index_and_value() {
  for (index_val, value_val) in all_pairs(2) {
    let mut ctx = SolverContext::new(3);
    let arr = ctx.store.build_array_var(2, 2);
    let index = ctx.store.build_const(index_val.clone());
    let value = ctx.store.build_const(value_val.clone());
    let index2 = ctx.store.acquire(index);
    let w = rewrite::write(&mut ctx, arr, index, value);
    let r = rewrite::read(&mut ctx, w, index2);
    let got = ctx.store.as_const(r).expect("read of a just-written constant index must fold");
    assert_eq!(got, value_val);
    ctx.store.release(r);
  }
}

/// `cond(1, x, y) == x` and `cond(0, x, y) == y` (spec.md §4.14) hold for every width-2 `x`/`y`
/// pair, checked symbolically by identity rather than by folding (the arms are variables, not
/// constants).
#[test]
fn cond_selects_the_correct_arm_by_identity() {
  let mut ctx = SolverContext::new(3);
  let one = ctx.store.build_const(BvConst::one(1));
  let x = ctx.store.build_bv_var(4);
  let y = ctx.store.build_bv_var(4);
  let x_copy = ctx.store.acquire(x);
  let r = rewrite::cond(&mut ctx, one, x, y);
  assert_eq!(r.id(), x_copy.id());
  ctx.store.release(r);
  ctx.store.release(x_copy);

  let mut ctx = SolverContext::new(3);
  let zero = ctx.store.build_const(BvConst::zero(1));
  let x = ctx.store.build_bv_var(4);
  let y = ctx.store.build_bv_var(4);
  let y_copy = ctx.store.acquire(y);
  let r = rewrite::cond(&mut ctx, zero, x, y);
  assert_eq!(r.id(), y_copy.id());
  ctx.store.release(r);
  ctx.store.release(y_copy);
}
