use std::fmt;

use bitflags::bitflags;
use num_traits::Zero;

use crate::traits::{NumericOps, calc_sign_bit};

bitflags! {
    /// The 8086 flags word. Bit positions follow the hardware layout so
    /// `bits()` is the packed FLAGS value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u16 {
        const CARRY = 1 << 0;
        const PARITY = 1 << 2;
        const AUX_CARRY = 1 << 4;
        const ZERO = 1 << 6;
        const SIGN = 1 << 7;
        const TRAP = 1 << 8;
        const INTERRUPT = 1 << 9;
        const DIRECTION = 1 << 10;
        const OVERFLOW = 1 << 11;
    }
}

/// A single named flag bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    CF,
    PF,
    AF,
    ZF,
    SF,
    TF,
    IF,
    DF,
    OF,
}

impl Flag {
    /// Canonical serialization order.
    pub const ALL: [Flag; 9] = [
        Flag::CF,
        Flag::PF,
        Flag::AF,
        Flag::ZF,
        Flag::SF,
        Flag::TF,
        Flag::IF,
        Flag::DF,
        Flag::OF,
    ];

    /// Order in which flags appear in a letter string such as `"CZS"` and in
    /// the register dump. TF has no letter.
    pub const LETTER_ORDER: [Flag; 8] = [
        Flag::CF,
        Flag::PF,
        Flag::AF,
        Flag::ZF,
        Flag::SF,
        Flag::OF,
        Flag::DF,
        Flag::IF,
    ];

    pub fn mask(self) -> Flags {
        match self {
            Flag::CF => Flags::CARRY,
            Flag::PF => Flags::PARITY,
            Flag::AF => Flags::AUX_CARRY,
            Flag::ZF => Flags::ZERO,
            Flag::SF => Flags::SIGN,
            Flag::TF => Flags::TRAP,
            Flag::IF => Flags::INTERRUPT,
            Flag::DF => Flags::DIRECTION,
            Flag::OF => Flags::OVERFLOW,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Flag::CF => "CF",
            Flag::PF => "PF",
            Flag::AF => "AF",
            Flag::ZF => "ZF",
            Flag::SF => "SF",
            Flag::TF => "TF",
            Flag::IF => "IF",
            Flag::DF => "DF",
            Flag::OF => "OF",
        }
    }

    pub fn letter(self) -> Option<char> {
        match self {
            Flag::CF => Some('C'),
            Flag::PF => Some('P'),
            Flag::AF => Some('A'),
            Flag::ZF => Some('Z'),
            Flag::SF => Some('S'),
            Flag::TF => None,
            Flag::IF => Some('I'),
            Flag::DF => Some('D'),
            Flag::OF => Some('O'),
        }
    }

    pub fn from_letter(letter: char) -> Option<Flag> {
        Flag::LETTER_ORDER
            .into_iter()
            .find(|flag| flag.letter() == Some(letter))
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Flags {
    pub fn get(&self, flag: Flag) -> bool {
        self.contains(flag.mask())
    }

    pub fn put(&mut self, flag: Flag, value: bool) {
        self.set(flag.mask(), value);
    }

    /// Set flags as letters in `CPAZSODI` order, e.g. `"PZ"`.
    pub fn letters(&self) -> String {
        Flag::LETTER_ORDER
            .into_iter()
            .filter(|flag| self.get(*flag))
            .filter_map(Flag::letter)
            .collect()
    }

    /// `FLAGS: CF=0 PF=1 ...` as used by the register dump.
    pub fn dump(&self) -> String {
        let fields: Vec<String> = Flag::LETTER_ORDER
            .into_iter()
            .map(|flag| format!("{}={}", flag.name(), u8::from(self.get(flag))))
            .collect();
        format!("FLAGS: {}", fields.join(" "))
    }
}

/// Operand size of an arithmetic instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

/// The flags an add/sub/cmp computes. Everything else is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagBits {
    pub zero: bool,
    pub sign: bool,
    pub parity: bool,
    pub carry: bool,
    pub overflow: bool,
}

impl FlagBits {
    pub fn apply(&self, flags: &mut Flags) {
        flags.set(Flags::ZERO, self.zero);
        flags.set(Flags::SIGN, self.sign);
        flags.set(Flags::PARITY, self.parity);
        flags.set(Flags::CARRY, self.carry);
        flags.set(Flags::OVERFLOW, self.overflow);
    }
}

/// Computes ZF/SF/PF/CF/OF for an add or sub at the given width.
///
/// `old` and `operand` are the left and right inputs, `result` the value the
/// instruction produced. All three are truncated to `width` before the sign,
/// zero, and overflow checks. The subtraction borrow compares `old` and
/// `operand` as passed in.
pub fn evaluate(result: u16, old: u16, operand: u16, width: Width, is_sub: bool) -> FlagBits {
    match width {
        Width::Byte => evaluate_as::<u8>(result, old, operand, is_sub),
        Width::Word => evaluate_as::<u16>(result, old, operand, is_sub),
    }
}

fn evaluate_as<T>(result: u16, old: u16, operand: u16, is_sub: bool) -> FlagBits
where
    T: NumericOps,
{
    let r = T::from_word(result);
    let a = T::from_word(old);
    let b = T::from_word(operand);

    let (carry, overflow) = if is_sub {
        (old < operand, T::calc_overflow_sub(a, b, r))
    } else {
        (r < a, T::calc_overflow_add(a, b, r))
    };

    FlagBits {
        zero: r == T::zero(),
        sign: calc_sign_bit(r),
        parity: T::calc_parity(r),
        carry,
        overflow,
    }
}
