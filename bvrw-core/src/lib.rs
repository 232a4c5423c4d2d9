/*!

The bit-vector/array rewriting engine: a hash-consed DAG store (see [`core`]) plus a bounded,
mutually-recursive peephole optimizer over it (see [`rewrite`]).

This crate implements spec.md §1's rewriter in full: one entry point per operator
(`rewrite::slice`/`and`/`eq`/`add`/`mul`/`ult`/`sll`/`srl`/`udiv`/`urem`/`concat`/`read`/`write`/`cond`),
a shared [`core::SolverContext`] carrying the DAG store, the tunable rewrite level, the
recursion-depth budget, and a running [`core::context::RewriteStats`] record. Callers build nodes
by calling an operator entry, never a `build_*` primitive directly — every entry performs whatever
folding and normalization the current rewrite level allows before falling back to the primitive
shape (spec.md §4.15).

Out of scope, per spec.md §1 (carried unchanged by `SPEC_FULL.md` §6): parsing, a CLI, a SAT
backend, and persistence of the DAG beyond this in-memory store. See `bvrw` for the facade crate
callers are expected to depend on.

*/

pub mod core;
pub mod rewrite;

pub use crate::core::context::{
  RewriteStats, FIND_AND_NODE_CONTRADICTION_LIMIT, READ_OVER_WRITE_DOWN_PROPAGATION_LIMIT, REC_RW_BOUND, WRITE_CHAIN_NODE_RW_BOUND,
};
pub use crate::core::{DagStore, Node, NodeId, NodeKind, SolverContext, TaggedRef};
