/*!

The rewriter's internal rules are total over their documented precondition domain (spec.md §7):
a caller that violates a width/arity precondition has a bug, and that is asserted via
`debug_assert!` at the call site rather than threaded through `Result`. `RewriteError` exists for
the handful of genuinely fallible, caller-facing constructions: parsing a bit-string of the wrong
declared width, or asking for a zero-width node.

A plain enum rather than a boxed `dyn Error`/`anyhow::Error`, matching the teacher's preference for
small closed error types over a catch-all (see `mod2-lib`'s `KindError`, `SortIndex::new`'s `Result<Self, ()>`).

*/

use std::fmt::{self, Display, Formatter};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RewriteError {
  /// A bit-string literal's length did not match its declared width.
  WidthMismatch { expected: u32, found: u32 },
  /// A node was asked to have zero width; every bit-vector/array element width must be >= 1.
  ZeroWidth,
  /// A bit-string contained a character other than '0' or '1'.
  InvalidBitChar(char),
}

impl Display for RewriteError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      RewriteError::WidthMismatch { expected, found } => {
        write!(f, "expected a bit-string of width {expected}, found width {found}")
      }
      RewriteError::ZeroWidth => write!(f, "widths must be at least 1"),
      RewriteError::InvalidBitChar(c) => write!(f, "invalid bit character '{c}', expected '0' or '1'"),
    }
  }
}

impl std::error::Error for RewriteError {}
