/*!

`SolverContext` bundles everything the rewriter entries share: the DAG store, the rewrite level,
the recursion-depth counter, and the statistics record (spec.md §5 "Shared resources", §9 DESIGN
NOTES "encapsulate on the solver context"). Modeled directly on `mod2-lib/src/core/rewriting_context/context.rs`'s
`RewritingContext`: a constructor taking its one required configuration parameter, a bundle of
named `u64` counters, and `#[inline(always)]` accessors for the hot-path fields.

*/

use crate::core::store::DagStore;

/// Maximum nesting of rewriter calls from within rewriter rules (spec.md §4.1).
pub const REC_RW_BOUND: u32 = 4096;

/// Maximum recursive descent into nested `AND` subtrees while searching for a contradiction
/// (spec.md §4.1, §4.5).
pub const FIND_AND_NODE_CONTRADICTION_LIMIT: u32 = 8;

/// Maximum length of a write-chain scanned when simplifying a new `WRITE` (spec.md §4.1, §4.13).
pub const WRITE_CHAIN_NODE_RW_BOUND: u32 = 20;

/// Maximum write-chain hops traversed when simplifying a `READ` (spec.md §4.1, §4.12).
pub const READ_OVER_WRITE_DOWN_PROPAGATION_LIMIT: u32 = 1024;

/// Named counters mirroring the original's per-solver statistics (SPEC_FULL §2), kept at the same
/// granularity as the source rather than collapsed into a single generic map, matching the
/// teacher's preference for a concrete bundle of named `u64` fields over a dynamic map
/// (`RewritingContext`'s `membership_count`/`equation_count`/...).
#[derive(Default, Debug, Clone)]
pub struct RewriteStats {
  pub rec_rw_calls_high_water: u32,
  pub rewrite_cache_hits: u64,
  pub rewrite_cache_misses: u64,
  pub adds_normalized: u64,
  pub muls_normalized: u64,
  pub read_props_construct: u64,
  pub write_props_construct: u64,
  pub and_idem_exprs: u64,
  pub and_const_exprs: u64,
  pub and_contradictions: u64,
}

/// The handle every rewriter entry takes (spec.md §6.1): the DAG store, the tunable rewrite
/// level, the shared recursion counter, and statistics.
pub struct SolverContext {
  pub store: DagStore,
  rewrite_level: u8,
  rec_rw_calls: u32,
  pub stats: RewriteStats,
}

impl SolverContext {
  /// `rewrite_level` must be in `{0, 1, 2, 3}`; `0` disables rewriting at the public entries
  /// (spec.md §4.1) but the context itself accepts it (the entries assert `> 0`, not the
  /// constructor — mirrors the teacher's `RewritingContext::new` taking an optional root rather
  /// than validating it).
  pub fn new(rewrite_level: u8) -> Self {
    debug_assert!(rewrite_level <= 3, "rewrite_level must be 0..=3");
    SolverContext { store: DagStore::new(), rewrite_level, rec_rw_calls: 0, stats: RewriteStats::default() }
  }

  #[inline(always)]
  pub fn rewrite_level(&self) -> u8 {
    self.rewrite_level
  }

  #[inline(always)]
  pub fn rec_rw_calls(&self) -> u32 {
    self.rec_rw_calls
  }

  /// Tests whether one more nested rewriter call is within budget (spec.md §4.1).
  #[inline(always)]
  pub fn has_rec_budget(&self) -> bool {
    self.rec_rw_calls < REC_RW_BOUND
  }

  /// Runs `f` with the recursion counter incremented for its duration, tracking the high-water
  /// mark. Callers must still check [`Self::has_rec_budget`] *before* calling this, since the
  /// fallback when budget is exhausted is to skip the rule entirely, not to recurse anyway.
  pub fn with_recursion<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
    self.rec_rw_calls += 1;
    if self.rec_rw_calls > self.stats.rec_rw_calls_high_water {
      self.stats.rec_rw_calls_high_water = self.rec_rw_calls;
    }
    let result = f(self);
    self.rec_rw_calls -= 1;
    result
  }
}
