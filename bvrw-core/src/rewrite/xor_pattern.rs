/*!

Structural XOR/XNOR recognition (spec.md §4.6). In a NAND-only DAG, `XOR(a,b)` appears as
`AND(¬AND(¬a,¬b), ¬AND(a,b))`. [`recognize_xor`] matches that shape on an `AND` node's two
(already-inverted) children and hands back the two underlying operands.

Open question (spec.md §9): the source's inverted-root case compares grandchildren across the
*wrong* `AND` pair, an asymmetry flagged rather than ported literally (see `DESIGN.md`). Here we
match the template once, on the node's own two children, regardless of whether the caller is
looking at the node itself (XOR) or its inversion (XNOR) — "XNOR is XOR of the inverted
expression" (spec.md §4.6) falls out for free: the caller just checks its own tag after a
successful match instead of requiring a second, differently-signed template.

*/

use crate::core::{DagStore, NodeKind, TaggedRef};

/// If `c0`/`c1` are themselves inverted `AND` nodes forming the XOR template — as they would be
/// if they were the two children of an `AND(c0, c1)` node — returns `(a, b)`. Takes the pair
/// directly rather than a materialized parent node, since the equality rewriter needs this test
/// on an `AND` node it already holds, and the AND-specific rewriter needs it before any such node
/// has been built. The caller interprets the pair's own (not-yet-built) inversion tag: untagged
/// means XOR(a,b), tagged means XNOR(a,b) ("XNOR is XOR of the inverted expression", spec.md §4.6).
pub fn recognize_xor(store: &DagStore, c0: TaggedRef, c1: TaggedRef) -> Option<(TaggedRef, TaggedRef)> {
  if !(c0.is_inverted() && c1.is_inverted()) {
    return None;
  }
  if !matches!(store.kind(c0.id()), NodeKind::And) || !matches!(store.kind(c1.id()), NodeKind::And) {
    return None;
  }
  let g0 = store.children(c0.id());
  let g1 = store.children(c1.id());
  let pairwise_negated = |x: TaggedRef, y: TaggedRef| x.id() == y.id() && x.is_inverted() != y.is_inverted();
  if pairwise_negated(g0[0], g1[0]) && pairwise_negated(g0[1], g1[1]) {
    Some((g1[0], g1[1]))
  } else {
    None
  }
}
