/*!

The rewrite dispatcher (spec.md §2's "rewrite dispatcher" component, §6.1's operator entry
points). One public function per operator: [`slice`], [`and`], [`eq`], [`add`], [`mul`], [`ult`],
[`sll`], [`srl`], [`udiv`], [`urem`], [`concat`], [`read`], [`write`], [`cond`]. Each entry:

1. chases the `simplified` forwarding pointer on every operand (invariant 5),
2. asserts its documented preconditions in debug builds (spec.md §7),
3. tries the generic binary rewriter ([`binary::rewrite_binary`]) where applicable, then any
   operator-specific rules, in the priority order spec.md §4 lists them,
4. falls back to [`fallback_binary`]/the store's other `build_*` primitives when nothing fires.

Module-to-spec-section mapping lives in `SPEC_FULL.md` §4.

*/

pub mod always_unequal;
pub mod and_rewrite;
pub mod arith;
pub mod binary;
pub mod ca_normalize;
pub mod concat;
pub mod contradiction;
pub mod cond;
pub mod eq;
pub mod read_write;
pub mod slice;
pub mod xor_pattern;

use crate::core::{NodeKind, SolverContext, TaggedRef};
use binary::BinKind;

/// Builds the primitive (non-rewriting) node for a binary operator kind (spec.md §4.15): the
/// path every entry falls back to when every rule above it was skipped or didn't match.
pub(crate) fn fallback_binary(ctx: &mut SolverContext, kind: BinKind, e0: TaggedRef, e1: TaggedRef, width: u32) -> TaggedRef {
  let result_width = kind.result_width(width, ctx.store.width(e1.id()));
  if kind.is_commutative() {
    ctx.store.build_commutative(kind.node_kind(), result_width, e0, e1)
  } else {
    ctx.store.build_binary(kind.node_kind(), result_width, e0, e1)
  }
}

/// Runs the generic binary rewriter, then `extra` (an operator-specific rule set) if the generic
/// rewriter didn't match, then the primitive fallback. `extra` must follow the same ownership
/// convention as `rewrite_binary`: consume both operands on `Ok`, return both untouched on `Err`.
fn dispatch_binary(
  ctx: &mut SolverContext,
  kind: BinKind,
  e0: TaggedRef,
  e1: TaggedRef,
  extra: impl FnOnce(&mut SolverContext, TaggedRef, TaggedRef, u32) -> Result<TaggedRef, (TaggedRef, TaggedRef)>,
) -> TaggedRef {
  let e0 = ctx.store.chase_simplified(e0);
  let e1 = ctx.store.chase_simplified(e1);
  debug_assert!(ctx.rewrite_level() > 0, "rewrite_level 0 is disallowed at public entries");
  // Concat takes independently-widthed operands, and a shift's amount operand has width
  // log2(value_width) (spec.md §3.2 invariant 7) — only the remaining kinds require equal widths.
  if kind.requires_equal_widths() {
    debug_assert_eq!(ctx.store.width(e0.id()), ctx.store.width(e1.id()), "operand widths must match");
  }
  let width = ctx.store.width(e0.id());

  if let Some(r) = binary::rewrite_binary(ctx, kind, e0, e1, width) {
    return r;
  }
  match extra(ctx, e0, e1, width) {
    Ok(r) => r,
    Err((e0, e1)) => fallback_binary(ctx, kind, e0, e1, width),
  }
}

/// `slice(e, upper, lower)`: `0 <= lower <= upper < e.width` (spec.md §6.1). See `slice.rs` for
/// the rule set (spec.md §4.8).
pub fn slice(ctx: &mut SolverContext, e: TaggedRef, upper: u32, lower: u32) -> TaggedRef {
  let e = ctx.store.chase_simplified(e);
  debug_assert!(ctx.rewrite_level() > 0, "rewrite_level 0 is disallowed at public entries");
  debug_assert!(lower <= upper && upper < ctx.store.width(e.id()), "slice bounds out of range");
  self::slice::rewrite_slice(ctx, e, upper, lower)
}

/// `and(e0, e1)`: bitwise AND, same width (spec.md §4.3).
pub fn and(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  dispatch_binary(ctx, BinKind::And, e0, e1, |ctx, e0, e1, _width| and_rewrite::rewrite_and_specific(ctx, e0, e1))
}

/// `eq(e0, e1)`: equality of two bit-vectors (`BEQ`) or two arrays (`AEQ`); result is always
/// width 1 (spec.md §4.9, §6.1).
pub fn eq(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  let e0 = ctx.store.chase_simplified(e0);
  let e1 = ctx.store.chase_simplified(e1);
  debug_assert!(ctx.rewrite_level() > 0, "rewrite_level 0 is disallowed at public entries");
  eq::rewrite_eq(ctx, e0, e1)
}

/// `add(e0, e1)`: two's-complement wraparound addition (spec.md §4.10).
pub fn add(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  dispatch_binary(ctx, BinKind::Add, e0, e1, |ctx, e0, e1, width| arith::rewrite_add_specific(ctx, e0, e1, width))
}

/// `mul(e0, e1)`: wraparound multiplication (spec.md §4.10).
pub fn mul(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  dispatch_binary(ctx, BinKind::Mul, e0, e1, |ctx, e0, e1, width| arith::rewrite_mul_specific(ctx, e0, e1, width))
}

/// `ult(e0, e1)`: unsigned less-than, result width 1 (spec.md §4.10).
pub fn ult(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  dispatch_binary(ctx, BinKind::Ult, e0, e1, |ctx, e0, e1, width| arith::rewrite_ult_specific(ctx, e0, e1, width))
}

/// `sll(e0, e1)`: logical shift left; `e1`'s width must be `log2(e0.width)` (spec.md §3.2).
pub fn sll(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  debug_assert!(ctx.rewrite_level() > 0, "btor_rewrite_sll_exp asserts rewrite_level > 0");
  dispatch_binary(ctx, BinKind::Sll, e0, e1, |_ctx, e0, e1, _width| Err((e0, e1)))
}

/// `srl(e0, e1)`: logical shift right. spec.md §9 flags that the original's `srl` entry omits the
/// `rewrite_level > 0` assertion that `sll` has; SPEC_FULL §5 harmonizes them (both assert it),
/// since every public entry already requires `rewrite_level > 0` per spec.md §4.1.
pub fn srl(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  debug_assert!(ctx.rewrite_level() > 0, "harmonized with sll per SPEC_FULL §5.3");
  dispatch_binary(ctx, BinKind::Srl, e0, e1, |_ctx, e0, e1, _width| Err((e0, e1)))
}

/// `udiv(e0, e1)`: unsigned division, division by zero yields all-ones (spec.md §4.10, §6.3).
pub fn udiv(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  dispatch_binary(ctx, BinKind::Udiv, e0, e1, |ctx, e0, e1, width| arith::rewrite_udiv_specific(ctx, e0, e1, width))
}

/// `urem(e0, e1)`: unsigned remainder, remainder by zero yields the dividend (spec.md §4.10, §6.3).
pub fn urem(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  dispatch_binary(ctx, BinKind::Urem, e0, e1, |ctx, e0, e1, width| arith::rewrite_urem_specific(ctx, e0, e1, width))
}

/// `concat(e0, e1)`: `e0` becomes the high bits, `e1` the low bits (spec.md §4.11).
pub fn concat(ctx: &mut SolverContext, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
  dispatch_binary(ctx, BinKind::Concat, e0, e1, |ctx, e0, e1, _width| self::concat::rewrite_concat_specific(ctx, e0, e1))
}

/// `read(array, index) -> node`: `index.width == array.index_width` (spec.md §4.12, §6.1).
pub fn read(ctx: &mut SolverContext, array: TaggedRef, index: TaggedRef) -> TaggedRef {
  let array = ctx.store.chase_simplified(array);
  let index = ctx.store.chase_simplified(index);
  debug_assert!(ctx.rewrite_level() > 0, "rewrite_level 0 is disallowed at public entries");
  debug_assert_eq!(ctx.store.index_width(array.id()), ctx.store.width(index.id()), "index width mismatch");
  read_write::rewrite_read(ctx, array, index)
}

/// `write(array, index, value) -> array`: value width equals the array's element width
/// (spec.md §4.13, §6.1).
pub fn write(ctx: &mut SolverContext, array: TaggedRef, index: TaggedRef, value: TaggedRef) -> TaggedRef {
  let array = ctx.store.chase_simplified(array);
  let index = ctx.store.chase_simplified(index);
  let value = ctx.store.chase_simplified(value);
  debug_assert!(ctx.rewrite_level() > 0, "rewrite_level 0 is disallowed at public entries");
  debug_assert_eq!(ctx.store.index_width(array.id()), ctx.store.width(index.id()), "index width mismatch");
  debug_assert_eq!(ctx.store.width(array.id()), ctx.store.width(value.id()), "element width mismatch");
  read_write::rewrite_write(ctx, array, index, value)
}

/// `cond(c, x, y) -> node`: `c.width == 1`, `x`/`y` same width and same array-or-bv class
/// (spec.md §4.14, §6.1).
pub fn cond(ctx: &mut SolverContext, c: TaggedRef, x: TaggedRef, y: TaggedRef) -> TaggedRef {
  let c = ctx.store.chase_simplified(c);
  let x = ctx.store.chase_simplified(x);
  let y = ctx.store.chase_simplified(y);
  debug_assert!(ctx.rewrite_level() > 0, "rewrite_level 0 is disallowed at public entries");
  debug_assert_eq!(ctx.store.width(c.id()), 1, "condition must be width 1");
  debug_assert_eq!(ctx.store.is_array(x.id()), ctx.store.is_array(y.id()), "arms must share array-or-bv class");
  self::cond::rewrite_cond(ctx, c, x, y)
}

/// Builds `NOT`-as-width-1-`AND` width-1 XOR shape directly (spec.md §4.6): the only way to
/// express a boolean connective in this NAND-only DAG. Used by width-1 degenerate forms in
/// `arith.rs` and by `binary.rs`'s `0 == XOR(a,b)` rule's callees.
pub(crate) fn build_xor1(ctx: &mut SolverContext, a: TaggedRef, b: TaggedRef) -> TaggedRef {
  debug_assert_eq!(ctx.store.width(a.id()), 1);
  // `a`/`b` are each used twice below (once inverted, once plain); acquire a second copy of
  // each up front so both uses own their operand rather than aliasing a single refcount unit.
  let a2 = ctx.store.acquire(a);
  let b2 = ctx.store.acquire(b);
  let left = and(ctx, a.invert(), b.invert()).invert();
  let right = and(ctx, a2, b2).invert();
  and(ctx, left, right)
}

/// True when `kind` is one of the commutative node kinds (spec.md §3.2 invariant 2); re-exported
/// here for rule modules that need to test a freshly-built operand's kind without importing
/// `NodeKind` directly.
pub(crate) fn is_commutative_kind(kind: &NodeKind) -> bool {
  kind.is_commutative()
}
