/*!

A small-width model enumerator used by `bvrw-core`'s property tests (spec.md §8: "a model
enumerator for small widths (e.g. 1-4 bits) suffices" to check that a rewrite preserves the
function a node computes). Exhaustively walking every assignment is only tractable for a handful
of bits, which is all the testable properties need: each rule is checked on its own small operand
widths, not on the rewriter as a whole.

*/

use crate::bvconst::BvConst;

/// Yields every one of the `2^width` constants of the given width, in ascending order.
///
/// Intended for `width` in the 1-4 range; `all_assignments(20)` would enumerate a million values,
/// which is not what this is for.
pub fn all_assignments(width: u32) -> impl Iterator<Item = BvConst> {
  debug_assert!(width >= 1 && width <= 20, "model enumeration is for small widths only");
  let count = 1u64 << width;
  (0..count).map(move |n| BvConst::from_value(width, n.into()))
}

/// Yields every pair of constants of the given width, for checking binary operators against a
/// reference semantics over all inputs.
pub fn all_pairs(width: u32) -> impl Iterator<Item = (BvConst, BvConst)> {
  debug_assert!(width >= 1 && width <= 12, "pairwise model enumeration needs a smaller width");
  all_assignments(width).flat_map(move |a| all_assignments(width).map(move |b| (a.clone(), b.clone())))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn enumerates_all_values_of_width() {
    let vals: Vec<_> = all_assignments(3).map(|c| c.to_bits()).collect();
    assert_eq!(vals.len(), 8);
    assert_eq!(vals[0], "000");
    assert_eq!(vals[7], "111");
  }

  #[test]
  fn enumerates_all_pairs() {
    assert_eq!(all_pairs(2).count(), 16);
  }
}
