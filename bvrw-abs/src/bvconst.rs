/*!

The bit-vector constant kernel (spec.md §6.3): pure functions on fixed-width unsigned magnitudes.
`spec.md` describes the original as operating on a "string-of-bits representation"; we keep the
string form only at the edges ([`BvConst::from_bits`]/[`BvConst::to_bits`]) and use `num-bigint`'s
`BigUint` internally; `mod2-abs`'s `numeric` module makes the identical choice (re-exporting
`num_bigint::BigUint` as the crate's arbitrary-precision type) for the same reason: hand-rolled
bit-string arithmetic is exactly the kind of thing the ecosystem already does well.

Per the DESIGN NOTES in spec.md §9, inversion is represented as an immutable view rather than an
in-place mutation: [`BvConst::invert`] returns a new value. This sidesteps the aliasing case the
original source special-cased (`same_children_mem` in `rewrite_binary_exp`) for two operands that
point at the same underlying constant.

*/

use std::fmt::{self, Display, Formatter};
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::error::RewriteError;

/// The classification of a constant used throughout the binary rewriter's dispatch matrix
/// (spec.md §4.2.2).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum SpecialConst {
  /// All bits zero.
  Zero,
  /// Unsigned value 1 (width > 1).
  One,
  /// Width 1, value 1: simultaneously "one" and "all ones".
  OneOnes,
  /// All bits one (width > 1).
  Ones,
  /// Anything else.
  None,
}

/// A fixed-width unsigned bit-vector constant. `value` is always reduced modulo `2^width`.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct BvConst {
  width: u32,
  value: BigUint,
}

impl BvConst {
  /// Builds a mask with `width` one-bits: `2^width - 1`.
  fn mask(width: u32) -> BigUint {
    (BigUint::one() << width as usize) - BigUint::one()
  }

  /// Constructs a constant of the given width from an unsigned value, reducing it modulo
  /// `2^width` (used internally by the arithmetic operators, which must wrap).
  pub fn from_value(width: u32, value: BigUint) -> Self {
    debug_assert!(width > 0, "zero-width constant");
    let value = if width == 0 { BigUint::zero() } else { value & Self::mask(width) };
    BvConst { width, value }
  }

  pub fn zero(width: u32) -> Self {
    BvConst::from_value(width, BigUint::zero())
  }

  pub fn one(width: u32) -> Self {
    BvConst::from_value(width, BigUint::one())
  }

  pub fn ones(width: u32) -> Self {
    BvConst::from_value(width, Self::mask(width))
  }

  /// Parses a fixed-width MSB-first string of `'0'`/`'1'` characters (the wire/debug
  /// representation named in spec.md's GLOSSARY).
  pub fn from_bits(bits: &str) -> Result<Self, RewriteError> {
    let width = bits.len() as u32;
    if width == 0 {
      return Err(RewriteError::ZeroWidth);
    }
    let mut value = BigUint::zero();
    for c in bits.chars() {
      value <<= 1u32;
      match c {
        '0' => {}
        '1' => value += BigUint::one(),
        other => return Err(RewriteError::InvalidBitChar(other)),
      }
    }
    Ok(BvConst { width, value })
  }

  /// Renders the constant as a fixed-width MSB-first string of `'0'`/`'1'` characters.
  pub fn to_bits(&self) -> String {
    let mut out = String::with_capacity(self.width as usize);
    for i in (0..self.width).rev() {
      out.push(if self.value.bit(i as u64) { '1' } else { '0' });
    }
    out
  }

  #[inline(always)]
  pub fn width(&self) -> u32 {
    self.width
  }

  #[inline(always)]
  pub fn value(&self) -> &BigUint {
    &self.value
  }

  pub fn to_usize(&self) -> Option<usize> {
    // Shift amounts and slice indices never need more than a usize's worth of range.
    use num_traits::ToPrimitive;
    self.value.to_usize()
  }

  /// Bitwise NOT, returned as a fresh value (never mutates `self`).
  pub fn invert(&self) -> Self {
    BvConst { width: self.width, value: Self::mask(self.width) - &self.value }
  }

  pub fn classify_special(&self) -> SpecialConst {
    if self.width == 1 {
      return if self.value.is_zero() { SpecialConst::Zero } else { SpecialConst::OneOnes };
    }
    if self.value.is_zero() {
      SpecialConst::Zero
    } else if self.value == Self::mask(self.width) {
      SpecialConst::Ones
    } else if self.value.is_one() {
      SpecialConst::One
    } else {
      SpecialConst::None
    }
  }

  // region Binary operators. All assume operand widths already validated by the caller
  // (spec.md §3.2 invariant 7); this module performs no width checking of its own.

  pub fn and(&self, other: &Self) -> Self {
    debug_assert_eq!(self.width, other.width);
    BvConst::from_value(self.width, &self.value & &other.value)
  }

  /// Bit-vector equality, returned as a width-1 constant.
  pub fn eq(&self, other: &Self) -> Self {
    debug_assert_eq!(self.width, other.width);
    BvConst::from_value(1, if self.value == other.value { BigUint::one() } else { BigUint::zero() })
  }

  pub fn add(&self, other: &Self) -> Self {
    debug_assert_eq!(self.width, other.width);
    BvConst::from_value(self.width, &self.value + &other.value)
  }

  pub fn mul(&self, other: &Self) -> Self {
    debug_assert_eq!(self.width, other.width);
    BvConst::from_value(self.width, &self.value * &other.value)
  }

  /// Unsigned less-than, returned as a width-1 constant.
  pub fn ult(&self, other: &Self) -> Self {
    debug_assert_eq!(self.width, other.width);
    BvConst::from_value(1, if self.value < other.value { BigUint::one() } else { BigUint::zero() })
  }

  /// SMT-LIB convention: division by zero yields all-ones.
  pub fn udiv(&self, other: &Self) -> Self {
    debug_assert_eq!(self.width, other.width);
    if other.value.is_zero() {
      return Self::ones(self.width);
    }
    BvConst::from_value(self.width, &self.value / &other.value)
  }

  /// SMT-LIB convention: remainder by zero yields the dividend.
  pub fn urem(&self, other: &Self) -> Self {
    debug_assert_eq!(self.width, other.width);
    if other.value.is_zero() {
      return self.clone();
    }
    BvConst::from_value(self.width, &self.value % &other.value)
  }

  /// Logical shift left by `shift`'s value; bits shifted past the width are lost, vacated
  /// low bits are zero-filled. A shift amount at or beyond the width yields zero.
  pub fn sll(&self, shift: &Self) -> Self {
    match shift.to_usize() {
      Some(n) if n < self.width as usize => BvConst::from_value(self.width, &self.value << n),
      _ => Self::zero(self.width),
    }
  }

  /// Logical shift right (zero-filled); a shift amount at or beyond the width yields zero.
  pub fn srl(&self, shift: &Self) -> Self {
    match shift.to_usize() {
      Some(n) if n < self.width as usize => BvConst::from_value(self.width, &self.value >> n),
      _ => Self::zero(self.width),
    }
  }

  /// Concatenation: `self` becomes the high bits, `other` the low bits.
  pub fn concat(&self, other: &Self) -> Self {
    let width = self.width + other.width;
    let value = (&self.value << other.width as usize) | &other.value;
    BvConst::from_value(width, value)
  }

  /// Inclusive bit-range extraction, `lower <= upper < self.width`.
  pub fn slice(&self, upper: u32, lower: u32) -> Self {
    debug_assert!(lower <= upper && upper < self.width);
    let width = upper - lower + 1;
    BvConst::from_value(width, &self.value >> lower as usize)
  }

  // endregion
}

impl Display for BvConst {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}'{}", self.width, self.to_bits())
  }
}

impl fmt::Debug for BvConst {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "BvConst({})", self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_bits() {
    let c = BvConst::from_bits("1011").unwrap();
    assert_eq!(c.width(), 4);
    assert_eq!(c.to_bits(), "1011");
  }

  #[test]
  fn invert_is_not_in_place() {
    let c = BvConst::from_bits("1010").unwrap();
    let inv = c.invert();
    assert_eq!(c.to_bits(), "1010");
    assert_eq!(inv.to_bits(), "0101");
  }

  #[test]
  fn classify_width_one() {
    assert_eq!(BvConst::zero(1).classify_special(), SpecialConst::Zero);
    assert_eq!(BvConst::one(1).classify_special(), SpecialConst::OneOnes);
  }

  #[test]
  fn classify_wider() {
    assert_eq!(BvConst::zero(4).classify_special(), SpecialConst::Zero);
    assert_eq!(BvConst::one(4).classify_special(), SpecialConst::One);
    assert_eq!(BvConst::ones(4).classify_special(), SpecialConst::Ones);
    assert_eq!(BvConst::from_bits("0110").unwrap().classify_special(), SpecialConst::None);
  }

  #[test]
  fn udiv_by_zero_is_ones() {
    let a = BvConst::from_bits("0110").unwrap();
    let z = BvConst::zero(4);
    assert_eq!(a.udiv(&z).to_bits(), "1111");
    assert_eq!(a.urem(&z).to_bits(), "0110");
  }

  #[test]
  fn add_wraps_mod_width() {
    let a = BvConst::from_bits("1111").unwrap();
    let one = BvConst::one(4);
    assert_eq!(a.add(&one).to_bits(), "0000");
  }

  #[test]
  fn concat_and_slice_are_inverse() {
    let hi = BvConst::from_bits("101").unwrap();
    let lo = BvConst::from_bits("01").unwrap();
    let cat = hi.concat(&lo);
    assert_eq!(cat.to_bits(), "10101");
    assert_eq!(cat.slice(4, 2).to_bits(), hi.to_bits());
    assert_eq!(cat.slice(1, 0).to_bits(), lo.to_bits());
  }
}
