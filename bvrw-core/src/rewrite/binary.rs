/*!

The generic binary rewriter (spec.md §4.2): the single helper invoked by most binary operator
entries (`and`, `eq`, `add`, `mul`, `ult`, `sll`, `srl`, `udiv`, `urem`, `concat`). Dispatches on
`(kind, class(e0), class(e1))` where class is const/non-const, applying the constant-folding and
special-constant rule matrix before any operator-specific rule runs.

Array equality (`AEQ`) is handled entirely in `eq.rs`: arrays have no constant form, so nothing
here applies to it.

Ownership convention (spec.md §3.3, followed throughout `bvrw-core`): [`rewrite_binary`] consumes
`e0`/`e1`. On a match it returns `Some` of a freshly owned result, having released whatever it
didn't incorporate. On `None` it has released *nothing* — both operands are handed back to the
caller via the untouched `e0`/`e1` it was given, so the caller's fallback path can still use them.

*/

use bvrw_abs::{BvConst, SpecialConst};

use crate::core::{NodeKind, SolverContext, TaggedRef};
use crate::rewrite::xor_pattern::recognize_xor;

/// Binary operator kinds eligible for the generic rewriter. Array equality is excluded (no
/// constant operands exist for arrays); it is handled directly in `eq.rs`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BinKind {
  And,
  Beq,
  Add,
  Mul,
  Ult,
  Udiv,
  Urem,
  Sll,
  Srl,
  Concat,
}

impl BinKind {
  pub fn of(kind: &NodeKind) -> Option<Self> {
    Some(match kind {
      NodeKind::And => BinKind::And,
      NodeKind::Beq => BinKind::Beq,
      NodeKind::Add => BinKind::Add,
      NodeKind::Mul => BinKind::Mul,
      NodeKind::Ult => BinKind::Ult,
      NodeKind::Udiv => BinKind::Udiv,
      NodeKind::Urem => BinKind::Urem,
      NodeKind::Sll => BinKind::Sll,
      NodeKind::Srl => BinKind::Srl,
      NodeKind::Concat => BinKind::Concat,
      _ => return None,
    })
  }

  pub fn node_kind(self) -> NodeKind {
    match self {
      BinKind::And => NodeKind::And,
      BinKind::Beq => NodeKind::Beq,
      BinKind::Add => NodeKind::Add,
      BinKind::Mul => NodeKind::Mul,
      BinKind::Ult => NodeKind::Ult,
      BinKind::Udiv => NodeKind::Udiv,
      BinKind::Urem => NodeKind::Urem,
      BinKind::Sll => NodeKind::Sll,
      BinKind::Srl => NodeKind::Srl,
      BinKind::Concat => NodeKind::Concat,
    }
  }

  pub fn is_commutative(self) -> bool {
    matches!(self, BinKind::And | BinKind::Beq | BinKind::Add | BinKind::Mul)
  }

  /// `true` for kinds whose two operands share a single width (spec.md §3.2 invariant 7).
  /// `Concat`'s operands have independent widths, and a shift's amount operand has width
  /// `log2(value_width)`, not the value's own width.
  pub fn requires_equal_widths(self) -> bool {
    !matches!(self, BinKind::Concat | BinKind::Sll | BinKind::Srl)
  }

  fn eval_const(self, a: &BvConst, b: &BvConst) -> BvConst {
    match self {
      BinKind::And => a.and(b),
      BinKind::Beq => a.eq(b),
      BinKind::Add => a.add(b),
      BinKind::Mul => a.mul(b),
      BinKind::Ult => a.ult(b),
      BinKind::Udiv => a.udiv(b),
      BinKind::Urem => a.urem(b),
      BinKind::Sll => a.sll(b),
      BinKind::Srl => a.srl(b),
      BinKind::Concat => a.concat(b),
    }
  }

  /// The result width given the two operand widths (spec.md §3.2 invariant 7).
  pub fn result_width(self, lhs_width: u32, rhs_width: u32) -> u32 {
    match self {
      BinKind::Beq | BinKind::Ult => 1,
      BinKind::Concat => lhs_width + rhs_width,
      _ => lhs_width,
    }
  }
}

fn same(a: TaggedRef, b: TaggedRef) -> bool {
  a.id() == b.id() && a.is_inverted() == b.is_inverted()
}

fn negated(a: TaggedRef, b: TaggedRef) -> bool {
  a.id() == b.id() && a.is_inverted() != b.is_inverted()
}

/// Attempts the generic binary rules of spec.md §4.2 on `(e0, e1)`. `width` is the width of the
/// two (equal-width) value operands, used to build `ZERO`/`ONES` constants at the right size.
pub fn rewrite_binary(ctx: &mut SolverContext, kind: BinKind, e0: TaggedRef, e1: TaggedRef, width: u32) -> Option<TaggedRef> {
  // §4.2.1 constant (+) constant.
  if let (Some(c0), Some(c1)) = (ctx.store.as_const(e0), ctx.store.as_const(e1)) {
    ctx.store.release(e0);
    ctx.store.release(e1);
    let result = kind.eval_const(&c0, &c1);
    return Some(ctx.store.build_const(result));
  }

  // §4.2.2 constant (+) non-constant, either position.
  if let Some(c0) = ctx.store.as_const(e0) {
    if let Some(r) = const_nonconst(ctx, kind, &c0, e0, e1, width, true) {
      return Some(r);
    }
  }
  if let Some(c1) = ctx.store.as_const(e1) {
    if let Some(r) = const_nonconst(ctx, kind, &c1, e1, e0, width, false) {
      return Some(r);
    }
  }

  // §4.2.3 same-term identities.
  if let Some(r) = same_term(ctx, kind, e0, e1, width) {
    return Some(r);
  }

  // §4.2.4 conditional-lifting.
  if let Some(r) = cond_lift(ctx, kind, e0, e1, width) {
    return Some(r);
  }

  None
}

/// `c_ref` is the constant operand (value `c`), `other` the non-constant one. `const_is_left`
/// tells the rule which positional form (`c OP other` vs `other OP c`) is being tested, which
/// matters for non-commutative operators.
fn const_nonconst(
  ctx: &mut SolverContext,
  kind: BinKind,
  c: &BvConst,
  c_ref: TaggedRef,
  other: TaggedRef,
  width: u32,
  const_is_left: bool,
) -> Option<TaggedRef> {
  use SpecialConst::*;
  let special = c.classify_special();

  match kind {
    BinKind::Beq => {
      match special {
        // width 1, value 0: 0 == e -> NOT e
        Zero if width == 1 => {
          ctx.store.release(c_ref);
          Some(other.invert())
        }
        // width 1, value 1 (simultaneously ONE and ONES): ONES == e -> e
        OneOnes => {
          ctx.store.release(c_ref);
          Some(other)
        }
        Zero => {
          if let Some((a, b)) = recognize_xor_at(ctx, other) {
            // 0 == XOR(a,b) -> a == b
            ctx.store.release(c_ref);
            ctx.store.release(other);
            let a = ctx.store.acquire(a);
            let b = ctx.store.acquire(b);
            return Some(super::eq(ctx, a, b));
          }
          if let Some((a, b)) = recognize_or_at(ctx, other) {
            // 0 == (a | b) -> a == 0 AND b == 0
            ctx.store.release(c_ref);
            ctx.store.release(other);
            let a = ctx.store.acquire(a);
            let b = ctx.store.acquire(b);
            let aw = ctx.store.width(a.id());
            let bw = ctx.store.width(b.id());
            let za = ctx.store.build_const(BvConst::zero(aw));
            let zb = ctx.store.build_const(BvConst::zero(bw));
            let ea = super::eq(ctx, a, za);
            let eb = super::eq(ctx, b, zb);
            return Some(super::and(ctx, ea, eb));
          }
          None
        }
        None => and_segment_decompose(ctx, c, c_ref, other),
        _ => None,
      }
    }
    BinKind::Add => match special {
      Zero => {
        // 0 + e -> e (ADD is commutative; both positions collapse the same way).
        ctx.store.release(c_ref);
        Some(other)
      }
      _ => None,
    },
    BinKind::Mul => match special {
      Zero => {
        ctx.store.release(other);
        Some(c_ref)
      }
      One | OneOnes => {
        ctx.store.release(c_ref);
        Some(other)
      }
      _ => None,
    },
    BinKind::And => match special {
      Zero => {
        ctx.store.release(other);
        Some(c_ref)
      }
      Ones | OneOnes => {
        ctx.store.release(c_ref);
        Some(other)
      }
      _ => None,
    },
    BinKind::Sll if const_is_left && special == Zero => {
      // 0 << e -> 0
      ctx.store.release(other);
      Some(c_ref)
    }
    BinKind::Srl if const_is_left && special == Zero => {
      // 0 >> e -> 0
      ctx.store.release(other);
      Some(c_ref)
    }
    BinKind::Urem if const_is_left && special == Zero => {
      // 0 % e -> 0
      ctx.store.release(other);
      Some(c_ref)
    }
    BinKind::Urem if !const_is_left && special == One => {
      // e % 1 -> 0
      ctx.store.release(other);
      ctx.store.release(c_ref);
      Some(ctx.store.build_const(BvConst::zero(width)))
    }
    BinKind::Udiv if const_is_left && special == Zero => {
      // 0 / e -> if e == 0 then ONES else 0
      let e_clone = ctx.store.acquire(other);
      let zero_w = ctx.store.width(other.id());
      let zero = ctx.store.build_const(BvConst::zero(zero_w));
      let is_zero = super::eq(ctx, e_clone, zero);
      let ones = ctx.store.build_const(BvConst::ones(width));
      let zero2 = ctx.store.build_const(BvConst::zero(width));
      ctx.store.release(other);
      ctx.store.release(c_ref);
      Some(super::cond(ctx, is_zero, ones, zero2))
    }
    BinKind::Udiv if !const_is_left && special == One => {
      // e / 1 -> e
      ctx.store.release(c_ref);
      Some(other)
    }
    BinKind::Ult if const_is_left && special == Zero => {
      // 0 < e -> NOT (e == 0)
      ctx.store.release(c_ref);
      let zero_w = ctx.store.width(other.id());
      let zero = ctx.store.build_const(BvConst::zero(zero_w));
      let is_zero = super::eq(ctx, other, zero);
      Some(is_zero.invert())
    }
    BinKind::Ult if const_is_left && matches!(special, Ones | OneOnes) => {
      // ONES < e -> false
      ctx.store.release(c_ref);
      ctx.store.release(other);
      Some(ctx.store.build_const(BvConst::zero(1)))
    }
    BinKind::Ult if !const_is_left && matches!(special, One | OneOnes) => {
      // e < 1 -> e == 0
      ctx.store.release(c_ref);
      let zero_w = ctx.store.width(other.id());
      let zero = ctx.store.build_const(BvConst::zero(zero_w));
      Some(super::eq(ctx, other, zero))
    }
    _ => None,
  }
}

fn recognize_xor_at(ctx: &SolverContext, node: TaggedRef) -> Option<(TaggedRef, TaggedRef)> {
  if node.is_inverted() || !matches!(ctx.store.kind(node.id()), NodeKind::And) {
    return None;
  }
  let children = ctx.store.children(node.id());
  recognize_xor(&ctx.store, children[0], children[1])
}

/// `a | b` appears as an inverted `AND(¬a, ¬b)`: `node` is inverted, its real node is
/// `AND(¬a, ¬b)`.
fn recognize_or_at(ctx: &SolverContext, node: TaggedRef) -> Option<(TaggedRef, TaggedRef)> {
  if !node.is_inverted() || !matches!(ctx.store.kind(node.id()), NodeKind::And) {
    return None;
  }
  let children = ctx.store.children(node.id());
  if children[0].is_inverted() && children[1].is_inverted() {
    Some((children[0].invert(), children[1].invert()))
  } else {
    None
  }
}

/// `c == (a & b)` with `c` a non-special constant (spec.md §4.2.2): split `c`'s bits into maximal
/// runs of identical bits, slice `a`/`b` on the matching ranges, and equate each run either to
/// all-ones (the run is all 1s) or to a `0`-reduction of `a & b` on that range (the run is all 0s).
/// Combine the per-run equalities with a left-associative `AND`. Only fires while recursion
/// budget allows, since each run recurses into `eq`/`slice`/`and`.
fn and_segment_decompose(ctx: &mut SolverContext, c: &BvConst, c_ref: TaggedRef, other: TaggedRef) -> Option<TaggedRef> {
  if !ctx.has_rec_budget() {
    return None;
  }
  if !matches!(ctx.store.kind(other.id()), NodeKind::And) || other.is_inverted() {
    return None;
  }
  let children = ctx.store.children(other.id());
  let (a, b) = (children[0], children[1]);
  let bits = c.to_bits(); // MSB-first
  let width = c.width();

  // Identify maximal runs of identical bits over [0, width).
  let mut runs: Vec<(u32, u32, char)> = Vec::new(); // (lower, upper, bit)
  let mut i = 0u32;
  while i < width {
    // bits[0] is the MSB, i.e. bit index (width-1); convert position -> bit index.
    let ch = bits.as_bytes()[(width - 1 - i) as usize] as char;
    let mut j = i;
    while j + 1 < width && bits.as_bytes()[(width - 1 - (j + 1)) as usize] as char == ch {
      j += 1;
    }
    runs.push((i, j, ch));
    i = j + 1;
  }

  ctx.store.release(c_ref);
  let a = ctx.store.acquire(a);
  let b = ctx.store.acquire(b);
  ctx.store.release(other);

  let mut pieces = Vec::with_capacity(runs.len());
  for (lower, upper, ch) in runs {
    let a_owned = ctx.store.acquire(a);
    let b_owned = ctx.store.acquire(b);
    let a_slice = ctx.with_recursion(|ctx| super::slice(ctx, a_owned, upper, lower));
    let b_slice = ctx.with_recursion(|ctx| super::slice(ctx, b_owned, upper, lower));
    let run_width = upper - lower + 1;
    let piece = if ch == '1' {
      let ones = ctx.store.build_const(BvConst::ones(run_width));
      let conj = super::and(ctx, a_slice, b_slice);
      super::eq(ctx, conj, ones)
    } else {
      let zero = ctx.store.build_const(BvConst::zero(run_width));
      let conj = super::and(ctx, a_slice, b_slice);
      super::eq(ctx, conj, zero)
    };
    pieces.push(piece);
  }
  ctx.store.release(a);
  ctx.store.release(b);

  let mut acc = pieces.remove(0);
  for piece in pieces {
    acc = super::and(ctx, acc, piece);
  }
  Some(acc)
}

/// §4.2.3: `real(e0) == real(e1)`.
fn same_term(ctx: &mut SolverContext, kind: BinKind, e0: TaggedRef, e1: TaggedRef, width: u32) -> Option<TaggedRef> {
  if e0.id() != e1.id() {
    return None;
  }
  match kind {
    BinKind::Beq if same(e0, e1) => {
      ctx.store.release(e0);
      ctx.store.release(e1);
      Some(ctx.store.build_const(BvConst::one(1)))
    }
    BinKind::Beq if negated(e0, e1) => {
      ctx.store.release(e0);
      ctx.store.release(e1);
      Some(ctx.store.build_const(BvConst::zero(1)))
    }
    BinKind::Add if same(e0, e1) && width >= 2 => {
      // e + e -> e * 2
      ctx.store.release(e1);
      let two = ctx.store.build_const(BvConst::from_value(width, 2u32.into()));
      Some(super::mul(ctx, e0, two))
    }
    BinKind::Add if negated(e0, e1) => {
      // e + ~e -> ONES (i.e. -1)
      ctx.store.release(e0);
      ctx.store.release(e1);
      Some(ctx.store.build_const(BvConst::ones(width)))
    }
    BinKind::Ult if same(e0, e1) => {
      ctx.store.release(e0);
      ctx.store.release(e1);
      Some(ctx.store.build_const(BvConst::zero(1)))
    }
    BinKind::Udiv if same(e0, e1) => {
      // e / e -> if e == 0 then ONES else 1
      let e_clone = ctx.store.acquire(e0);
      let zero = ctx.store.build_const(BvConst::zero(width));
      let is_zero = super::eq(ctx, e_clone, zero);
      ctx.store.release(e0);
      ctx.store.release(e1);
      let ones = ctx.store.build_const(BvConst::ones(width));
      let one = ctx.store.build_const(BvConst::one(width));
      Some(super::cond(ctx, is_zero, ones, one))
    }
    BinKind::Urem if same(e0, e1) => {
      ctx.store.release(e0);
      ctx.store.release(e1);
      Some(ctx.store.build_const(BvConst::zero(width)))
    }
    _ => None,
  }
}

/// §4.2.4: both operands are `BCOND`/`ACOND`, tagged identically, sharing a condition, and either
/// both then-branches or both else-branches match: lift the operator through the `cond`.
fn cond_lift(ctx: &mut SolverContext, kind: BinKind, e0: TaggedRef, e1: TaggedRef, _width: u32) -> Option<TaggedRef> {
  if !matches!(kind, BinKind::Ult | BinKind::Beq | BinKind::Add | BinKind::Udiv) {
    return None;
  }
  if e0.is_inverted() != e1.is_inverted() {
    return None;
  }
  let k0 = ctx.store.kind(e0.id()).clone();
  let k1 = ctx.store.kind(e1.id()).clone();
  if !matches!(k0, NodeKind::Bcond) || !matches!(k1, NodeKind::Bcond) {
    return None;
  }
  let c0 = ctx.store.children(e0.id());
  let (cond0, then0, else0) = (c0[0], c0[1], c0[2]);
  let c1 = ctx.store.children(e1.id());
  let (cond1, then1, else1) = (c1[0], c1[1], c1[2]);
  if !same(cond0, cond1) {
    return None;
  }

  let (shared_then, x, y) = if same(then0, then1) {
    (Some(then0), else0, else1)
  } else if same(else0, else1) {
    (Some(else0), then0, then1)
  } else {
    return None;
  };
  let shared_then = shared_then?;

  let cond = ctx.store.acquire(cond0);
  let x = ctx.store.acquire(x);
  let y = ctx.store.acquire(y);
  let shared_a = ctx.store.acquire(shared_then);
  let shared_b = ctx.store.acquire(shared_then);
  ctx.store.release(e0);
  ctx.store.release(e1);

  let op_of_shared = apply_bin(ctx, kind, shared_a, shared_b);
  let op_of_diff = apply_bin(ctx, kind, x, y);
  Some(super::cond(ctx, cond, op_of_shared, op_of_diff))
}

/// Dispatches back to the named public entry for `kind`, used by rules that must re-rewrite a
/// derived pair (conditional-lifting, width-1 degenerate forms).
pub fn apply_bin(ctx: &mut SolverContext, kind: BinKind, a: TaggedRef, b: TaggedRef) -> TaggedRef {
  match kind {
    BinKind::And => super::and(ctx, a, b),
    BinKind::Beq => super::eq(ctx, a, b),
    BinKind::Add => super::add(ctx, a, b),
    BinKind::Mul => super::mul(ctx, a, b),
    BinKind::Ult => super::ult(ctx, a, b),
    BinKind::Udiv => super::udiv(ctx, a, b),
    BinKind::Urem => super::urem(ctx, a, b),
    BinKind::Sll => super::sll(ctx, a, b),
    BinKind::Srl => super::srl(ctx, a, b),
    BinKind::Concat => super::concat(ctx, a, b),
  }
}
