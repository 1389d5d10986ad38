//! Constant-time byte comparison.
//!
//! Used wherever a caller holds two tag values as plain byte slices
//! rather than an in-progress `hmac::Mac`, so a timing-safe compare
//! can't be delegated to the MAC crate's own `verify_*` methods.

use subtle::ConstantTimeEq;

/// Constant-time comparison of byte slices.
///
/// Returns `true` if the slices are equal. Execution time depends only
/// on slice length, not content.
#[must_use]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_slices_match() {
        assert!(ct_eq(&[1, 2, 3], &[1, 2, 3]));
    }

    #[test]
    fn differing_slices_do_not_match() {
        assert!(!ct_eq(&[1, 2, 3], &[1, 2, 4]));
    }

    #[test]
    fn differing_lengths_do_not_match() {
        assert!(!ct_eq(&[1, 2, 3], &[1, 2]));
    }
}
