/*!

The node representation (spec.md §3.1). A closed `enum`-tagged struct dispatched with `match`,
not the teacher's vtable-based `DagNode` trait + per-theory transmute (`mod2-lib/src/core/dag_node_core.rs`):
spec.md §9's DESIGN NOTES calls for exactly this encoding ("dispatch on it with a tagged-union
match, not by virtual methods"), since the rewriter's algebra is closed over a fixed set of
operator kinds. See `DESIGN.md` for the redesign rationale.

*/

use std::fmt::{self, Debug, Formatter};

use bvrw_abs::{BvConst, SmallVec};

/// A slot index into [`crate::core::store::DagStore`]'s node slab.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(pub u32);

impl Debug for NodeId {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// A node reference combined with the single-bit "inverted" flag of spec.md §3.1. Never
/// tags an array node (invariant 6); the bit composes with itself by XOR ([`TaggedRef::cond_invert`]).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct TaggedRef {
  id: NodeId,
  inverted: bool,
}

impl TaggedRef {
  #[inline(always)]
  pub fn new(id: NodeId, inverted: bool) -> Self {
    TaggedRef { id, inverted }
  }

  #[inline(always)]
  pub fn positive(id: NodeId) -> Self {
    TaggedRef { id, inverted: false }
  }

  /// "real-address": the referenced node, tag stripped.
  #[inline(always)]
  pub fn id(self) -> NodeId {
    self.id
  }

  #[inline(always)]
  pub fn is_inverted(self) -> bool {
    self.inverted
  }

  /// Flips the inversion bit, keeping the same underlying node.
  #[inline(always)]
  pub fn invert(self) -> Self {
    TaggedRef { id: self.id, inverted: !self.inverted }
  }

  /// Combines `self`'s sign with `other`'s: the tag composes by XOR.
  #[inline(always)]
  pub fn cond_invert(self, other: Self) -> Self {
    TaggedRef { id: other.id, inverted: self.inverted ^ other.inverted }
  }
}

impl Debug for TaggedRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    if self.inverted {
      write!(f, "!{:?}", self.id)
    } else {
      write!(f, "{:?}", self.id)
    }
  }
}

/// The closed set of operator kinds (spec.md §3.1's `kind` attribute), carrying whatever
/// kind-specific data doesn't belong in [`Node`]'s common fields.
#[derive(Clone, Debug)]
pub enum NodeKind {
  BvConst(BvConst),
  BvVar,
  ArrayVar,
  /// `lower <= upper < child.width` (invariant: never slices a `SLICE`, see invariant 3).
  Slice { upper: u32, lower: u32 },
  And,
  /// Bit-vector equality.
  Beq,
  /// Array equality.
  Aeq,
  Add,
  Mul,
  Ult,
  Sll,
  Srl,
  Udiv,
  Urem,
  Concat,
  Read,
  Write,
  /// Bit-vector if-then-else.
  Bcond,
  /// Array if-then-else.
  Acond,
}

impl NodeKind {
  pub fn is_array_kind(&self) -> bool {
    matches!(self, NodeKind::ArrayVar | NodeKind::Write | NodeKind::Acond)
  }

  pub fn is_commutative(&self) -> bool {
    matches!(self, NodeKind::And | NodeKind::Beq | NodeKind::Aeq | NodeKind::Add | NodeKind::Mul)
  }

  pub fn name(&self) -> &'static str {
    match self {
      NodeKind::BvConst(_) => "BV_CONST",
      NodeKind::BvVar => "BV_VAR",
      NodeKind::ArrayVar => "ARRAY_VAR",
      NodeKind::Slice { .. } => "SLICE",
      NodeKind::And => "AND",
      NodeKind::Beq => "BEQ",
      NodeKind::Aeq => "AEQ",
      NodeKind::Add => "ADD",
      NodeKind::Mul => "MUL",
      NodeKind::Ult => "ULT",
      NodeKind::Sll => "SLL",
      NodeKind::Srl => "SRL",
      NodeKind::Udiv => "UDIV",
      NodeKind::Urem => "UREM",
      NodeKind::Concat => "CONCAT",
      NodeKind::Read => "READ",
      NodeKind::Write => "WRITE",
      NodeKind::Bcond => "BCOND",
      NodeKind::Acond => "ACOND",
    }
  }
}

/// A node's common attributes (spec.md §3.1), shared across all operator kinds.
#[derive(Clone, Debug)]
pub struct Node {
  pub kind: NodeKind,
  /// Bit-width for bit-vector nodes; element width for array nodes.
  pub width: u32,
  /// Index width, meaningful only for array-typed nodes (`ArrayVar`/`Write`/`Acond`) and `Read`'s
  /// index operand; zero otherwise.
  pub index_width: u32,
  /// Up to 3 tagged child references (invariant: ordered by id for commutative kinds).
  pub children: SmallVec<[TaggedRef; 3]>,
  /// Unique, monotonically increasing identity; the total order used to canonicalize
  /// commutative operand positions (invariant 2).
  pub id: u32,
  /// Forwarding pointer: when set, this node has been superseded (invariant 5).
  pub simplified: Option<NodeId>,
}

impl Node {
  pub fn is_const(&self) -> bool {
    matches!(self.kind, NodeKind::BvConst(_))
  }

  pub fn as_const(&self) -> Option<&BvConst> {
    match &self.kind {
      NodeKind::BvConst(c) => Some(c),
      _ => None,
    }
  }
}
