use std::fmt::UpperHex;

use num_conv::CastSigned;
use num_traits::{WrappingAdd, WrappingSub, Zero};

use crate::{bits::Bits, flags::Width};

/// Integer types an instruction can operate on: the 8-bit and 16-bit views of
/// a register.
pub trait NumericOps:
    WrappingAdd
    + WrappingSub
    + Copy
    + CastSigned<Signed: Zero + PartialOrd>
    + Zero
    + PartialEq
    + PartialOrd
    + UpperHex
    + Into<u16>
    + CalcFlags
{
    const WIDTH: Width;

    /// Keeps only the bits that fit in `Self`.
    fn from_word(value: u16) -> Self;
}

impl NumericOps for u8 {
    const WIDTH: Width = Width::Byte;

    fn from_word(value: u16) -> Self {
        value.get_low()
    }
}

impl NumericOps for u16 {
    const WIDTH: Width = Width::Word;

    fn from_word(value: u16) -> Self {
        value
    }
}

pub fn calc_sign_bit<T>(value: T) -> bool
where
    T: NumericOps,
{
    value.cast_signed() < <T as CastSigned>::Signed::zero()
}

pub trait CalcFlags {
    fn calc_overflow_add(a: Self, b: Self, result: Self) -> bool;
    fn calc_overflow_sub(a: Self, b: Self, result: Self) -> bool;
    fn calc_parity(result: Self) -> bool;
}

impl CalcFlags for u8 {
    fn calc_overflow_add(a: Self, b: Self, result: Self) -> bool {
        (a ^ result) & (b ^ result) & 0x80 != 0
    }
    fn calc_overflow_sub(a: Self, b: Self, result: Self) -> bool {
        (a ^ b) & (a ^ result) & 0x80 != 0
    }
    fn calc_parity(result: Self) -> bool {
        result.count_ones() % 2 == 0
    }
}

impl CalcFlags for u16 {
    fn calc_overflow_add(a: Self, b: Self, result: Self) -> bool {
        (a ^ result) & (b ^ result) & 0x8000 != 0
    }
    fn calc_overflow_sub(a: Self, b: Self, result: Self) -> bool {
        (a ^ b) & (a ^ result) & 0x8000 != 0
    }
    // parity only ever looks at the low byte, even for word results
    fn calc_parity(result: Self) -> bool {
        result.get_low().count_ones() % 2 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calc_overflow_add_test() {
        assert!(!u8::calc_overflow_add(0x64, 0x14, 0x78));
        assert!(u8::calc_overflow_add(0x64, 0x32, 0x96));
        assert!(!u8::calc_overflow_add(0xCE, 0xE2, 0xB0));
        assert!(u8::calc_overflow_add(0x9C, 0xB0, 0x4C));
        assert!(u8::calc_overflow_add(0x7F, 0x01, 0x80));
        assert!(!u8::calc_overflow_add(0xFF, 0x01, 0x00));
    }

    #[test]
    fn calc_overflow_add_u16_test() {
        assert!(u16::calc_overflow_add(0x4E20, 0x4E20, 0x9C40));
        assert!(u16::calc_overflow_add(0x8AD0, 0x8AD0, 0x15A0));
        assert!(!u16::calc_overflow_add(0x2710, 0x4E20, 0x7530));
        assert!(!u16::calc_overflow_add(0xB1E0, 0xD8F0, 0x8AD0));
        assert!(u16::calc_overflow_add(0x7FFF, 0x0001, 0x8000));
    }

    #[test]
    fn calc_overflow_sub_test() {
        assert!(u8::calc_overflow_sub(0x80, 0x01, 0x7F));
        assert!(u8::calc_overflow_sub(0x7F, 0xFF, 0x80));
        assert!(!u8::calc_overflow_sub(0x05, 0x03, 0x02));
        assert!(!u8::calc_overflow_sub(0x00, 0x01, 0xFF));
        assert!(u16::calc_overflow_sub(0x8000, 0x0001, 0x7FFF));
        assert!(!u16::calc_overflow_sub(0x0005, 0x000A, 0xFFFB));
    }

    #[test]
    fn calc_parity_test() {
        assert!(u8::calc_parity(0x00));
        assert!(!u8::calc_parity(0x01));
        assert!(!u8::calc_parity(0x02));
        assert!(u8::calc_parity(0x03));
        assert!(!u8::calc_parity(0x07));
        assert!(u8::calc_parity(0x0F));
    }

    #[test]
    fn calc_parity_u16_test() {
        assert!(u16::calc_parity(0xFF00));
        assert!(!u16::calc_parity(0xEE01));
        assert!(u16::calc_parity(0x0003));
        assert!(u16::calc_parity(0xBB05));
        assert!(!u16::calc_parity(0x0C08));
        assert!(u16::calc_parity(0x0C09));
    }

    #[test]
    fn calc_sign_bit_test() {
        assert!(calc_sign_bit(0xFFFFu16));
        assert!(calc_sign_bit(0x8000u16));
        assert!(!calc_sign_bit(0x0080u16));
        assert!(calc_sign_bit(0x80u8));
        assert!(!calc_sign_bit(0x7Fu8));
    }

    #[test]
    fn from_word_truncates_test() {
        assert_eq!(u8::from_word(0x1234), 0x34);
        assert_eq!(u16::from_word(0x1234), 0x1234);
    }
}
