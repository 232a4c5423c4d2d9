/*!

The DAG store: node allocation, hash-consing, reference counting, forwarding-pointer chasing, and
the primitive (non-rewriting) `build_*` constructors (spec.md §2's "DAG store" external
collaborator and §6.2's required operations).

Structurally this follows `mod2-lib/src/core/gc/node_allocator.rs`'s slab-with-free-list shape:
a `Vec<Option<Slot>>` plus a `Vec<u32>` of reusable indices. Where the teacher drives reclamation
with a mark-and-sweep pass over GC roots, `DagStore` uses per-node reference counts (spec.md §3.3),
per spec.md §9's redesign note preferring explicit refcounting over interior-mutability/GC tricks
in a single-threaded setting. Hash-consing is the same shape as `mod2-lib/src/core/hash_cons_set.rs`'s
`HashConsSet`: a map from a structural key to the canonical slot.

*/

use std::collections::HashMap;

use bvrw_abs::{log::trace, BvConst};

use crate::core::node::{Node, NodeId, NodeKind, TaggedRef};

/// Distinguishes operator kinds for hash-consing and rewrite-cache keys without carrying their
/// per-instance data (mirrors [`NodeKind`] but is `Copy`).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum OpTag {
  And,
  Beq,
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
  Bcond,
  Acond,
}

impl OpTag {
  pub fn of(kind: &NodeKind) -> Option<OpTag> {
    Some(match kind {
      NodeKind::And => OpTag::And,
      NodeKind::Beq => OpTag::Beq,
      NodeKind::Aeq => OpTag::Aeq,
      NodeKind::Add => OpTag::Add,
      NodeKind::Mul => OpTag::Mul,
      NodeKind::Ult => OpTag::Ult,
      NodeKind::Sll => OpTag::Sll,
      NodeKind::Srl => OpTag::Srl,
      NodeKind::Udiv => OpTag::Udiv,
      NodeKind::Urem => OpTag::Urem,
      NodeKind::Concat => OpTag::Concat,
      NodeKind::Read => OpTag::Read,
      NodeKind::Write => OpTag::Write,
      NodeKind::Bcond => OpTag::Bcond,
      NodeKind::Acond => OpTag::Acond,
      NodeKind::BvConst(_) | NodeKind::BvVar | NodeKind::ArrayVar | NodeKind::Slice { .. } => return None,
    })
  }
}

/// The structural-equality key used by hash-consing: two nodes with equal keys are the same
/// node (invariant 1). Variables are deliberately excluded (each `build_bv_var`/`build_array_var`
/// call introduces a fresh, distinct symbol, the way a solver's symbol table would).
#[derive(Clone, Eq, PartialEq, Hash)]
enum NodeKey {
  BvConst { width: u32, bits: String },
  Slice { upper: u32, lower: u32, child: TaggedRef },
  Op { tag: OpTag, width: u32, children: [TaggedRef; 3], arity: u8 },
}

fn key_of(node: &Node) -> Option<NodeKey> {
  match &node.kind {
    NodeKind::BvConst(c) => Some(NodeKey::BvConst { width: node.width, bits: c.to_bits() }),
    NodeKind::Slice { upper, lower } => {
      Some(NodeKey::Slice { upper: *upper, lower: *lower, child: node.children[0] })
    }
    NodeKind::BvVar | NodeKind::ArrayVar => None,
    other => {
      let tag = OpTag::of(other)?;
      let mut children = [TaggedRef::positive(NodeId(0)); 3];
      for (i, c) in node.children.iter().enumerate() {
        children[i] = *c;
      }
      Some(NodeKey::Op { tag, width: node.width, children, arity: node.children.len() as u8 })
    }
  }
}

struct Slot {
  node: Node,
  refcount: u32,
}

/// Key for the per-top-level-call rewrite cache (SPEC_FULL §2): avoids re-deriving the same
/// binary-rewrite result for a repeated `(kind, e0, e1)` request. Purely an optimization;
/// clearing it can never change a result, only how often it is recomputed.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct RewriteCacheKey {
  pub tag: OpTag,
  pub e0: TaggedRef,
  pub e1: TaggedRef,
}

pub struct DagStore {
  slots: Vec<Option<Slot>>,
  free_list: Vec<u32>,
  hash_cons: HashMap<NodeKey, NodeId>,
  next_var_id: u32,
  next_node_id: u32,
  pub rewrite_cache: HashMap<RewriteCacheKey, TaggedRef>,
}

impl DagStore {
  pub fn new() -> Self {
    DagStore {
      slots: Vec::new(),
      free_list: Vec::new(),
      hash_cons: HashMap::new(),
      next_var_id: 0,
      next_node_id: 0,
      rewrite_cache: HashMap::new(),
    }
  }

  // region Slab primitives

  fn alloc_slot(&mut self, mut node: Node) -> NodeId {
    node.id = self.next_node_id;
    self.next_node_id += 1;
    let slot = Slot { node, refcount: 0 };
    if let Some(idx) = self.free_list.pop() {
      self.slots[idx as usize] = Some(slot);
      NodeId(idx)
    } else {
      self.slots.push(Some(slot));
      NodeId((self.slots.len() - 1) as u32)
    }
  }

  #[inline(always)]
  fn slot(&self, id: NodeId) -> &Slot {
    self.slots[id.0 as usize].as_ref().expect("dangling NodeId")
  }

  #[inline(always)]
  fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
    self.slots[id.0 as usize].as_mut().expect("dangling NodeId")
  }

  pub fn node(&self, id: NodeId) -> &Node {
    &self.slot(id).node
  }

  // endregion

  // region Forwarding pointers (spec.md §6.2)

  /// Follows `simplified` until reaching a node with none set. Idempotent. The inversion tag
  /// travels with the reference across every hop.
  pub fn chase_simplified(&self, tagged: TaggedRef) -> TaggedRef {
    let mut current = tagged;
    loop {
      match self.slot(current.id()).node.simplified {
        Some(target) => current = TaggedRef::new(target, current.is_inverted()),
        None => return current,
      }
    }
  }

  /// Forwards `from` to `to` (both real addresses); observable identity becomes `to`'s
  /// (invariant 5). Does not itself touch reference counts; callers manage acquire/release
  /// around the forward the same way they would around any other substitution.
  pub fn set_simplified(&mut self, from: NodeId, to: NodeId) {
    self.slot_mut(from).node.simplified = Some(to);
  }

  // endregion

  // region Reference counting (spec.md §3.3)

  pub fn acquire(&mut self, tagged: TaggedRef) -> TaggedRef {
    self.slot_mut(tagged.id()).refcount += 1;
    tagged
  }

  pub fn release(&mut self, tagged: TaggedRef) {
    let id = tagged.id();
    let refcount = {
      let slot = self.slot_mut(id);
      slot.refcount = slot.refcount.saturating_sub(1);
      slot.refcount
    };
    if refcount == 0 {
      self.reclaim(id);
    }
  }

  fn reclaim(&mut self, id: NodeId) {
    let node = self.slots[id.0 as usize].take().expect("double free").node;
    if let Some(key) = key_of(&node) {
      // Only remove the hash-cons entry if it still points at this slot: a forwarded-away
      // node's entry (if any) belongs to whatever superseded it.
      if self.hash_cons.get(&key) == Some(&id) {
        self.hash_cons.remove(&key);
      }
    }
    trace!(node_id = node.id, kind = node.kind.name(), "reclaiming node");
    for child in node.children.iter().copied() {
      self.release(child);
    }
    self.free_list.push(id.0);
  }

  // endregion

  // region Accessors required by the rewriter (spec.md §6.2)

  pub fn kind(&self, id: NodeId) -> &NodeKind {
    &self.slot(id).node.kind
  }

  pub fn width(&self, id: NodeId) -> u32 {
    self.slot(id).node.width
  }

  pub fn index_width(&self, id: NodeId) -> u32 {
    self.slot(id).node.index_width
  }

  pub fn children(&self, id: NodeId) -> &[TaggedRef] {
    &self.slot(id).node.children
  }

  pub fn id_ord(&self, id: NodeId) -> u32 {
    self.slot(id).node.id
  }

  pub fn is_bv_const(&self, id: NodeId) -> bool {
    self.slot(id).node.is_const()
  }

  pub fn is_array(&self, id: NodeId) -> bool {
    self.slot(id).node.kind.is_array_kind()
  }

  pub fn is_write(&self, id: NodeId) -> bool {
    matches!(self.slot(id).node.kind, NodeKind::Write)
  }

  pub fn as_const(&self, tagged: TaggedRef) -> Option<BvConst> {
    let node = &self.slot(tagged.id()).node;
    node.as_const().map(|c| if tagged.is_inverted() { c.invert() } else { c.clone() })
  }

  // endregion

  // region Hash-consing build primitives ("build_<kind>", spec.md §6.2)

  fn intern(&mut self, node: Node) -> NodeId {
    if let Some(key) = key_of(&node) {
      if let Some(&existing) = self.hash_cons.get(&key) {
        // The passed-in node's children were handed to us as owned references (the caller
        // transfers ownership into whatever node `build_bare` produces). Since a hash-cons hit
        // means this particular `Node` value is discarded in favor of the canonical one, its
        // children must be released here or their refcounts leak.
        for child in node.children.iter().copied() {
          self.release(child);
        }
        return existing;
      }
      let id = self.alloc_slot(node);
      self.hash_cons.insert(key, id);
      id
    } else {
      self.alloc_slot(node)
    }
  }

  fn build_bare(&mut self, kind: NodeKind, width: u32, index_width: u32, children: bvrw_abs::SmallVec<[TaggedRef; 3]>) -> TaggedRef {
    let node = Node { kind, width, index_width, children, id: 0, simplified: None };
    let id = self.intern(node);
    self.acquire(TaggedRef::positive(id))
  }

  pub fn build_const(&mut self, bits: BvConst) -> TaggedRef {
    let width = bits.width();
    self.build_bare(NodeKind::BvConst(bits), width, 0, bvrw_abs::smallvec![])
  }

  pub fn build_bv_var(&mut self, width: u32) -> TaggedRef {
    let id = self.next_var_id;
    self.next_var_id += 1;
    let node = Node { kind: NodeKind::BvVar, width, index_width: 0, children: bvrw_abs::smallvec![], id: 0, simplified: None };
    let slot_id = self.alloc_slot(node);
    // Distinguish variables by id even though they are never hash-consed.
    let _ = id;
    self.acquire(TaggedRef::positive(slot_id))
  }

  pub fn build_array_var(&mut self, index_width: u32, elem_width: u32) -> TaggedRef {
    let node = Node { kind: NodeKind::ArrayVar, width: elem_width, index_width, children: bvrw_abs::smallvec![], id: 0, simplified: None };
    let slot_id = self.alloc_slot(node);
    self.acquire(TaggedRef::positive(slot_id))
  }

  pub fn build_slice(&mut self, child: TaggedRef, upper: u32, lower: u32) -> TaggedRef {
    let width = upper - lower + 1;
    self.build_bare(NodeKind::Slice { upper, lower }, width, 0, bvrw_abs::smallvec![child])
  }

  /// Builds a commutative binary node with operands ordered by id (invariant 2).
  pub fn build_commutative(&mut self, kind: NodeKind, width: u32, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
    let (a, b) = self.canonical_order(e0, e1);
    self.build_bare(kind, width, 0, bvrw_abs::smallvec![a, b])
  }

  pub fn build_binary(&mut self, kind: NodeKind, width: u32, e0: TaggedRef, e1: TaggedRef) -> TaggedRef {
    self.build_bare(kind, width, 0, bvrw_abs::smallvec![e0, e1])
  }

  pub fn build_read(&mut self, elem_width: u32, array: TaggedRef, index: TaggedRef) -> TaggedRef {
    self.build_bare(NodeKind::Read, elem_width, 0, bvrw_abs::smallvec![array, index])
  }

  pub fn build_write(&mut self, index_width: u32, elem_width: u32, array: TaggedRef, index: TaggedRef, value: TaggedRef) -> TaggedRef {
    self.build_bare(NodeKind::Write, elem_width, index_width, bvrw_abs::smallvec![array, index, value])
  }

  pub fn build_bcond(&mut self, width: u32, c: TaggedRef, x: TaggedRef, y: TaggedRef) -> TaggedRef {
    self.build_bare(NodeKind::Bcond, width, 0, bvrw_abs::smallvec![c, x, y])
  }

  pub fn build_acond(&mut self, index_width: u32, elem_width: u32, c: TaggedRef, x: TaggedRef, y: TaggedRef) -> TaggedRef {
    self.build_bare(NodeKind::Acond, elem_width, index_width, bvrw_abs::smallvec![c, x, y])
  }

  /// Orders two real addresses by id (invariant 2), preserving each's own inversion tag.
  pub fn canonical_order(&self, e0: TaggedRef, e1: TaggedRef) -> (TaggedRef, TaggedRef) {
    if self.id_ord(e0.id()) <= self.id_ord(e1.id()) {
      (e0, e1)
    } else {
      (e1, e0)
    }
  }

  // endregion
}

impl Default for DagStore {
  fn default() -> Self {
    Self::new()
  }
}
