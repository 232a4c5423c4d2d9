/*!

Types and utilities that abstract over the implementing backing type, in the style of `mod2-abs`.

# Background and Motivation

The bit-vector constant kernel is a good example. Constants are fixed-width unsigned magnitudes;
nothing here commits callers to a particular big-integer backend. We currently build
[`bvconst::BvConst`] on `num-bigint`'s `BigUint`. If we ever wanted a fixed-width SIMD
representation instead, only this module would need to change.

Similarly, `log` gives the rest of the workspace a small, stable macro surface
(`trace!`/`debug!`/`info!`/`warn!`/`error!`) over whatever tracing backend is configured, the same
way `mod2_abs::log` hides its backend behind `debug!`/`info!`.

*/

pub mod bvconst;
pub mod error;
pub mod log;
pub mod model;

pub use bvconst::{BvConst, SpecialConst};
pub use error::RewriteError;

// For child/operand lists that are almost always 0-3 elements: every node in the DAG has at
// most 3 tagged children (spec.md §3.1), so inline storage avoids a heap allocation per node.
pub use smallvec::{smallvec, SmallVec};
