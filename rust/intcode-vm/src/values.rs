//! Machine word representation.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// A memory cell, operand, input or output value.
///
/// Values are exact: arithmetic never wraps, so programs that multiply
/// past the 64-bit range still produce the right answer.
pub type Word = BigInt;

/// A resolved, non-negative memory address.
pub type Address = u64;

/// Convert a word to an address. Negative words and words beyond `u64`
/// are not addresses.
pub fn to_address(word: &Word) -> Option<Address> {
    word.to_u64()
}

/// Shorthand for building words in tests and callers.
pub fn word(n: i64) -> Word {
    BigInt::from(n)
}

/// The value written by non-blocking input when the queue is empty.
pub fn no_input_sentinel() -> Word {
    BigInt::from(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_address_accepts_non_negative() {
        assert_eq!(to_address(&word(0)), Some(0));
        assert_eq!(to_address(&word(1234)), Some(1234));
    }

    #[test]
    fn test_to_address_rejects_negative_and_huge() {
        assert_eq!(to_address(&word(-1)), None);
        let huge: Word = "100000000000000000000000".parse().unwrap();
        assert_eq!(to_address(&huge), None);
    }
}
