//! Random-tree stress test (grounded on `mod2-lib/src/core/gc/tests.rs`'s `build_random_tree`,
//! which builds a random DAG shape with `rand` and exercises allocation/GC over it). Here the
//! random tree is built over all-constant leaves at a small fixed width, so every rewrite must
//! fold the whole tree down to a single constant whose value matches a direct reference
//! evaluation of the same expression on [`BvConst`] — a property random shapes are well-suited to
//! probing, since the hand-written `all_pairs` tests in `semantic_equivalence.rs` only ever
//! combine two constants at a time.

use rand::Rng;

use bvrw_abs::BvConst;
use bvrw_core::core::{SolverContext, TaggedRef};
use bvrw_core::rewrite;

const WIDTH: u32 = 4;
const MAX_DEPTH: u32 = 4;
const TRIALS: u32 = 200;

enum Expr {
  Const(BvConst),
  And(Box<Expr>, Box<Expr>),
  Add(Box<Expr>, Box<Expr>),
  Mul(Box<Expr>, Box<Expr>),
}

fn random_expr(rng: &mut impl Rng, depth: u32) -> Expr {
  if depth == 0 || rng.random_bool(0.4) {
    let value: u32 = rng.random_range(0..(1u32 << WIDTH));
    return Expr::Const(BvConst::from_value(WIDTH, value.into()));
  }
  let lhs = Box::new(random_expr(rng, depth - 1));
  let rhs = Box::new(random_expr(rng, depth - 1));
  match rng.random_range(0..3) {
    0 => Expr::And(lhs, rhs),
    1 => Expr::Add(lhs, rhs),
    _ => Expr::Mul(lhs, rhs),
  }
}

fn eval_reference(expr: &Expr) -> BvConst {
  match expr {
    Expr::Const(c) => c.clone(),
    Expr::And(l, r) => eval_reference(l).and(&eval_reference(r)),
    Expr::Add(l, r) => eval_reference(l).add(&eval_reference(r)),
    Expr::Mul(l, r) => eval_reference(l).mul(&eval_reference(r)),
  }
}

fn build_dag(ctx: &mut SolverContext, expr: &Expr) -> TaggedRef {
  match expr {
    Expr::Const(c) => ctx.store.build_const(c.clone()),
    Expr::And(l, r) => {
      let (a, b) = (build_dag(ctx, l), build_dag(ctx, r));
      rewrite::and(ctx, a, b)
    }
    Expr::Add(l, r) => {
      let (a, b) = (build_dag(ctx, l), build_dag(ctx, r));
      rewrite::add(ctx, a, b)
    }
    Expr::Mul(l, r) => {
      let (a, b) = (build_dag(ctx, l), build_dag(ctx, r));
      rewrite::mul(ctx, a, b)
    }
  }
}

/// A random all-constant tree of `AND`/`ADD`/`MUL` nodes, at any `rewrite_level` and any shape up
/// to [`MAX_DEPTH`], must fold to exactly the value a direct evaluation on [`BvConst`] computes —
/// never a different value, and never a non-constant leftover.
#[test]
fn random_constant_trees_fold_to_reference_value() {
  let mut rng = rand::rng();
  for _ in 0..TRIALS {
    let depth = rng.random_range(0..=MAX_DEPTH);
    let level = rng.random_range(1..=3u8);
    let expr = random_expr(&mut rng, depth);
    let expected = eval_reference(&expr);

    let mut ctx = SolverContext::new(level);
    let root = build_dag(&mut ctx, &expr);
    let got = ctx.store.as_const(root).expect("an all-constant tree must fold to a constant");
    assert_eq!(got, expected, "rewrite_level={level}, depth={depth}");
    ctx.store.release(root);
  }
}
