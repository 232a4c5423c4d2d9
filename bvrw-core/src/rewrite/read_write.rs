/*!

`READ`/`WRITE` rules (spec.md §4.12, §4.13). Unlike the other entries, neither `rewrite_read` nor
`rewrite_write` goes through [`super::dispatch_binary`] — arrays have no constant form and no
generic binary identities apply — so both are called directly from `mod.rs`'s `read`/`write`
entries after those have chased `simplified` and asserted their width preconditions.

Both rules walk a chain of nested `WRITE`s (spec.md §3.1's array representation: a `WRITE` node
is conceptually `array[index] := value`, with `array` itself possibly another `WRITE`), bounded by
[`crate::core::context::READ_OVER_WRITE_DOWN_PROPAGATION_LIMIT`] /
[`crate::core::context::WRITE_CHAIN_NODE_RW_BOUND`] so a long chain of writes to the same array
can't make a single `read`/`write` call do unbounded work.

*/

use crate::core::context::{READ_OVER_WRITE_DOWN_PROPAGATION_LIMIT, WRITE_CHAIN_NODE_RW_BOUND};
use crate::core::{NodeKind, SolverContext, TaggedRef};
use crate::rewrite::always_unequal::is_always_unequal;

fn same(a: TaggedRef, b: TaggedRef) -> bool {
  a.id() == b.id() && a.is_inverted() == b.is_inverted()
}

/// `read(array, index)` (spec.md §4.12). Hops down a `WRITE`-chain while the write's own index is
/// provably different from `index` — the read can't see that hop's value, so it keeps looking
/// underneath — and resolves immediately once a hop's index matches `index` exactly. Falls back
/// to a primitive `READ` node either when the chain bottoms out at a non-`WRITE` array, the
/// index can't be proven different, or the hop bound is exhausted.
pub fn rewrite_read(ctx: &mut SolverContext, array: TaggedRef, index: TaggedRef) -> TaggedRef {
  debug_assert!(ctx.store.is_array(array.id()));
  let elem_width = ctx.store.width(array.id());
  let mut current = array;
  let mut hops = 0u32;

  loop {
    if !ctx.store.is_write(current.id()) || hops >= READ_OVER_WRITE_DOWN_PROPAGATION_LIMIT {
      break;
    }
    let children = ctx.store.children(current.id());
    let (inner_array, write_index, write_value) = (children[0], children[1], children[2]);

    if same(write_index, index) {
      // Acquire the surviving value before releasing `array`: that release cascades through
      // `reclaim` down to this same node's children, and would otherwise free `write_value`
      // out from under us if this was its last reference.
      let write_value = ctx.store.acquire(write_value);
      ctx.store.release(index);
      ctx.store.release(array);
      return write_value;
    }
    if !is_always_unequal(&ctx.store, write_index, index) {
      break;
    }

    ctx.stats.read_props_construct += 1;
    current = inner_array;
    hops += 1;
  }

  if current.id() != array.id() {
    let current = ctx.store.acquire(current);
    ctx.store.release(array);
    return ctx.store.build_read(elem_width, current, index);
  }
  ctx.store.build_read(elem_width, array, index)
}

/// `write(array, index, value)` (spec.md §4.13). First collapses a redundant `WRITE` chain: if a
/// hop underneath `array` writes the same `index` again, the outer write fully shadows it and the
/// hop can be spliced out, so long as every intervening hop's index is provably different from
/// `index` (otherwise splicing it out could change which write is observed by a future `read` at
/// one of those intervening indices). Bounded by [`WRITE_CHAIN_NODE_RW_BOUND`].
pub fn rewrite_write(ctx: &mut SolverContext, array: TaggedRef, index: TaggedRef, value: TaggedRef) -> TaggedRef {
  debug_assert!(ctx.store.is_array(array.id()));
  if let Some(collapsed) = collapse_redundant_write(ctx, array, index, value) {
    return collapsed;
  }
  let elem_width = ctx.store.width(array.id());
  let index_width = ctx.store.index_width(array.id());
  ctx.store.build_write(index_width, elem_width, array, index, value)
}

/// Looks for a hop in `array`'s write-chain whose index is syntactically identical to `index`: if
/// found, and every hop strictly between `array` and that point has a provably-different index,
/// rebuilds the chain with that redundant hop removed (`array` written at `index` again makes the
/// shadowed hop's value unobservable). Consumes `index`/`value` only on success; on failure,
/// ownership of all three operands is left with the caller (`None`).
fn collapse_redundant_write(ctx: &mut SolverContext, array: TaggedRef, index: TaggedRef, value: TaggedRef) -> Option<TaggedRef> {
  if !ctx.store.is_write(array.id()) {
    return None;
  }

  // Walk down the chain, recording each hop's (index, value) so the chain above the shadowed
  // write can be rebuilt once it's found.
  let mut chain: Vec<(TaggedRef, TaggedRef)> = Vec::new();
  let mut current = array;
  let mut found_base: Option<TaggedRef> = None;
  let mut steps = 0u32;

  loop {
    if !ctx.store.is_write(current.id()) || steps >= WRITE_CHAIN_NODE_RW_BOUND {
      break;
    }
    let children = ctx.store.children(current.id());
    let (inner_array, hop_index, hop_value) = (children[0], children[1], children[2]);

    if same(hop_index, index) {
      found_base = Some(inner_array);
      break;
    }
    if !is_always_unequal(&ctx.store, hop_index, index) {
      break;
    }

    chain.push((hop_index, hop_value));
    current = inner_array;
    steps += 1;
  }

  let base = found_base?;

  // Every reference this rebuild needs to survive `release(array)`'s reclaim cascade must be
  // acquired up front, before that release runs.
  let base = ctx.store.acquire(base);
  let chain: Vec<(TaggedRef, TaggedRef)> =
    chain.into_iter().map(|(i, v)| (ctx.store.acquire(i), ctx.store.acquire(v))).collect();
  ctx.store.release(array);

  let index_width = ctx.store.index_width(base.id());
  let elem_width = ctx.store.width(base.id());
  let mut rebuilt = ctx.store.build_write(index_width, elem_width, base, index, value);
  for (hop_index, hop_value) in chain.into_iter().rev() {
    rebuilt = ctx.store.build_write(index_width, elem_width, rebuilt, hop_index, hop_value);
  }
  ctx.stats.write_props_construct += 1;
  Some(rebuilt)
}

#[cfg(test)]
mod tests {
  use bvrw_abs::BvConst;

  use super::*;
  use crate::core::SolverContext;

  #[test]
  fn read_sees_matching_write_index() {
    let mut ctx = SolverContext::new(3);
    let arr = ctx.store.build_array_var(4, 8);
    let idx = ctx.store.build_bv_var(4);
    let val = ctx.store.build_bv_var(8);
    let idx2 = ctx.store.acquire(idx);
    let w = super::super::write(&mut ctx, arr, idx, val);
    let val2 = ctx.store.acquire(val);
    let r = super::super::read(&mut ctx, w, idx2);
    assert!(same(r, val2));
    ctx.store.release(r);
    ctx.store.release(val2);
  }

  #[test]
  fn read_hops_past_provably_different_index() {
    let mut ctx = SolverContext::new(3);
    let arr = ctx.store.build_array_var(4, 8);
    let c0 = ctx.store.build_const(BvConst::zero(4));
    let c1 = ctx.store.build_const(BvConst::from_value(4, 1u32.into()));
    let val0 = ctx.store.build_bv_var(8);
    let val1 = ctx.store.build_bv_var(8);
    let w = super::super::write(&mut ctx, arr, c0, val0);
    let w = super::super::write(&mut ctx, w, c1, val1);
    let c0_again = ctx.store.build_const(BvConst::zero(4));
    let r = super::super::read(&mut ctx, w, c0_again);
    // c0 != c1 (distinct constants), so the read must hop past the top write to the one below.
    assert!(matches!(ctx.store.kind(r.id()), NodeKind::Read) || r.id() == val0.id());
    ctx.store.release(r);
  }

  #[test]
  fn write_same_index_twice_collapses() {
    let mut ctx = SolverContext::new(3);
    let arr = ctx.store.build_array_var(4, 8);
    let idx = ctx.store.build_bv_var(4);
    let idx2 = ctx.store.acquire(idx);
    let val0 = ctx.store.build_bv_var(8);
    let val1 = ctx.store.build_bv_var(8);
    let w = super::super::write(&mut ctx, arr, idx, val0);
    let w2 = super::super::write(&mut ctx, w, idx2, val1);
    // The shadowed hop writing `val0` at `idx` should be spliced out entirely.
    let children = ctx.store.children(w2.id());
    assert!(!ctx.store.is_write(children[0].id()) || ctx.store.children(children[0].id())[1].id() != idx.id());
    ctx.store.release(w2);
  }
}
