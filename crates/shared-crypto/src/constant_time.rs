//! Constant-time byte comparison.

use subtle::ConstantTimeEq;

/// Compare two byte slices without short-circuiting on the first mismatch.
///
/// Slices of different length compare unequal; the length check itself
/// leaks only the lengths, which are public for fixed-size digests.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
