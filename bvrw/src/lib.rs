/*!

Facade crate (`SPEC_FULL.md` §0, analogous to the teacher's `mod2` crate): a single entry point
re-exporting [`bvrw_core`]'s public surface, plus the bit-vector constant kernel and logging facade
from [`bvrw_abs`] that callers need to build operands and initialize tracing.

Contains no parser, no CLI, and no SAT backend — those are out of scope per spec.md §1. A caller
depending only on `bvrw` gets everything needed to build a [`SolverContext`], construct variables
and constants, and drive every rewriter entry point, without needing to name `bvrw-core` or
`bvrw-abs` directly in its own `Cargo.toml`.

*/

pub use bvrw_abs::log;
pub use bvrw_abs::{BvConst, RewriteError, SpecialConst};

pub use bvrw_core::core::context::{
  RewriteStats, FIND_AND_NODE_CONTRADICTION_LIMIT, READ_OVER_WRITE_DOWN_PROPAGATION_LIMIT, REC_RW_BOUND, WRITE_CHAIN_NODE_RW_BOUND,
};
pub use bvrw_core::core::{DagStore, Node, NodeId, NodeKind, SolverContext, TaggedRef};
pub use bvrw_core::rewrite::{add, and, concat, cond, eq, mul, read, slice, sll, srl, udiv, urem, ult, write};
