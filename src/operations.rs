use num_traits::{WrappingAdd, WrappingSub};
use tracing::debug;

use crate::{
    error::{Result, SimError},
    flags::{self, FlagBits, Width},
    registers::{RegisterAccess, RegisterFile, RegisterName},
    traits::NumericOps,
};

/// Signature shared by every instruction body.
pub type Handler = fn(&mut RegisterFile, &[&str]) -> Result<String>;

/// Range of immediates `cmp` treats as byte-sized when the left side is not
/// a register.
const BYTE_IMMEDIATE_RANGE: std::ops::RangeInclusive<i64> = -128..=255;

pub fn clean_operand(text: &str) -> &str {
    text.strip_suffix(',').unwrap_or(text)
}

/// A resolved instruction argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Immediate(i64),
    Register(RegisterName),
}

impl Operand {
    pub fn parse(text: &str) -> Result<Operand> {
        let text = clean_operand(text);
        let unknown = || SimError::UnknownOperand(text.to_string());

        let first = text.chars().next().ok_or_else(unknown)?;
        if first.is_ascii_digit() || first == '-' {
            return parse_immediate(text).map(Operand::Immediate).ok_or_else(unknown);
        }

        RegisterName::parse(text)
            .map(Operand::Register)
            .ok_or_else(unknown)
    }

    /// Immediates keep their sign, registers read zero-extended.
    pub fn value(&self, regs: &RegisterFile) -> i64 {
        match *self {
            Operand::Immediate(value) => value,
            Operand::Register(name) => regs.value(name).into(),
        }
    }
}

/// Decimal, or `0x`/`0b` prefixed, with an optional leading minus.
fn parse_immediate(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (radix, digits) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        (2, bin)
    } else {
        (10, digits)
    };
    // from_str_radix takes its own sign; only the one stripped above counts
    if digits.starts_with(['-', '+']) {
        return None;
    }

    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    if negative { magnitude.checked_neg() } else { Some(magnitude) }
}

fn parse_destination(text: &str) -> Result<RegisterName> {
    let text = clean_operand(text);
    RegisterName::parse(text).ok_or_else(|| SimError::UnknownDestination(text.to_string()))
}

fn expect_two<'a>(mnemonic: &str, args: &[&'a str]) -> Result<(&'a str, &'a str)> {
    match args {
        [dest, src] => Ok((*dest, *src)),
        _ => Err(SimError::Arity {
            mnemonic: mnemonic.to_string(),
            expected: 2,
            found: args.len(),
        }),
    }
}

pub fn mov(regs: &mut RegisterFile, args: &[&str]) -> Result<String> {
    let (dest, src) = expect_two("mov", args)?;
    let dest = parse_destination(dest)?;
    let value = Operand::parse(src)?.value(regs);

    match dest {
        RegisterName::Byte(reg) => regs.byte_accessor(reg).set(value as u8),
        RegisterName::Word(reg) => regs.word_accessor(reg).set(value as u16),
    }
    debug!("mov {}, {} -> {:#x}", dest, clean_operand(src), regs.value(dest));
    Ok(format!("{} = {:#x}", dest, regs.value(dest)))
}

pub fn add(regs: &mut RegisterFile, args: &[&str]) -> Result<String> {
    arithmetic("add", regs, args, false)
}

pub fn sub(regs: &mut RegisterFile, args: &[&str]) -> Result<String> {
    arithmetic("sub", regs, args, true)
}

/// Flags as for `sub`, but the destination is never written.
pub fn cmp(regs: &mut RegisterFile, args: &[&str]) -> Result<String> {
    let (left, right) = expect_two("cmp", args)?;
    let left = Operand::parse(left)?;
    let right = Operand::parse(right)?;
    let left_value = left.value(regs);
    let right_value = right.value(regs);

    // Bare immediates on the left pick a width from their magnitude.
    let width = match left {
        Operand::Register(RegisterName::Byte(_)) => Width::Byte,
        Operand::Register(RegisterName::Word(_)) => Width::Word,
        Operand::Immediate(value) if BYTE_IMMEDIATE_RANGE.contains(&value) => Width::Byte,
        Operand::Immediate(_) => Width::Word,
    };

    let (result, bits) = match width {
        Width::Byte => compare::<u8>(left_value, right_value),
        Width::Word => compare::<u16>(left_value, right_value),
    };
    bits.apply(regs.flags_mut());

    debug!("cmp {left_value} - {right_value} = {:#x} ({width:?})", result);
    Ok(format!("cmp -> {:#x}", result))
}

fn arithmetic(mnemonic: &str, regs: &mut RegisterFile, args: &[&str], is_sub: bool) -> Result<String> {
    let (dest, src) = expect_two(mnemonic, args)?;
    let dest = parse_destination(dest)?;
    let src = Operand::parse(src)?.value(regs);

    let outcome = match dest {
        RegisterName::Byte(reg) => apply(regs.byte_accessor(reg), src, is_sub),
        RegisterName::Word(reg) => apply(regs.word_accessor(reg), src, is_sub),
    };
    outcome.flags.apply(regs.flags_mut());

    debug!(
        "{} {} -> {:#x} (was {:#x})",
        mnemonic, dest, outcome.result, outcome.old
    );
    Ok(format!("{} = {:#x}", dest, outcome.result))
}

struct Outcome {
    old: u16,
    result: u16,
    flags: FlagBits,
}

fn apply<A>(mut dest: A, src: i64, is_sub: bool) -> Outcome
where
    A: RegisterAccess,
{
    let old = dest.get();
    let operand = A::Value::from_word(src as u16);
    let result = if is_sub {
        old.wrapping_sub(&operand)
    } else {
        old.wrapping_add(&operand)
    };
    dest.set(result);

    let flags = flags::evaluate(result.into(), old.into(), operand.into(), A::Value::WIDTH, is_sub);
    Outcome {
        old: old.into(),
        result: result.into(),
        flags,
    }
}

fn compare<T>(left: i64, right: i64) -> (u16, FlagBits)
where
    T: NumericOps,
{
    let a = T::from_word(left as u16);
    let b = T::from_word(right as u16);
    let result: u16 = a.wrapping_sub(&b).into();
    let flags = flags::evaluate(result, left as u16, right as u16, T::WIDTH, true);
    (result, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flags::{Flag, Flags},
        registers::{Reg8, Reg16},
    };

    fn run(regs: &mut RegisterFile, handler: Handler, args: &[&str]) {
        handler(regs, args).unwrap();
    }

    #[test]
    fn operand_classification() {
        assert_eq!(Operand::parse("10,").unwrap(), Operand::Immediate(10));
        assert_eq!(Operand::parse("-4093").unwrap(), Operand::Immediate(-4093));
        assert_eq!(Operand::parse("0x1F").unwrap(), Operand::Immediate(0x1F));
        assert_eq!(Operand::parse("0b101").unwrap(), Operand::Immediate(5));
        assert_eq!(
            Operand::parse("al").unwrap(),
            Operand::Register(RegisterName::Byte(Reg8::Al))
        );
        assert_eq!(
            Operand::parse("bp,").unwrap(),
            Operand::Register(RegisterName::Word(Reg16::Bp))
        );
        assert!(matches!(Operand::parse("zz"), Err(SimError::UnknownOperand(_))));
        assert!(matches!(Operand::parse("1zz"), Err(SimError::UnknownOperand(_))));
        assert!(matches!(Operand::parse(","), Err(SimError::UnknownOperand(_))));
        assert!(matches!(Operand::parse("--5"), Err(SimError::UnknownOperand(_))));
        assert!(matches!(Operand::parse("-+5"), Err(SimError::UnknownOperand(_))));
        assert!(matches!(Operand::parse("-0x-8"), Err(SimError::UnknownOperand(_))));
        assert!(matches!(Operand::parse("0x+8"), Err(SimError::UnknownOperand(_))));
        assert!(matches!(
            Operand::parse("--9223372036854775808"),
            Err(SimError::UnknownOperand(_))
        ));
        assert_eq!(
            Operand::parse("-9223372036854775807").unwrap(),
            Operand::Immediate(-i64::MAX)
        );
    }

    #[test]
    fn only_one_trailing_comma_is_stripped() {
        assert_eq!(clean_operand("ax,"), "ax");
        assert_eq!(clean_operand("ax,,"), "ax,");
        assert_eq!(clean_operand("ax"), "ax");
    }

    #[test]
    fn mov_truncates_to_destination() {
        let mut regs = RegisterFile::new();
        run(&mut regs, mov, &["ax,", "0x1234"]);
        run(&mut regs, mov, &["bl,", "ax"]);
        assert_eq!(regs.byte(Reg8::Bl), 0x34);
        run(&mut regs, mov, &["cx,", "-1"]);
        assert_eq!(regs.word(Reg16::Cx), 0xFFFF);
        assert_eq!(regs.flags(), Flags::empty());
    }

    #[test]
    fn add_byte_carry() {
        let mut regs = RegisterFile::new();
        run(&mut regs, mov, &["al,", "255"]);
        run(&mut regs, add, &["al,", "1"]);
        assert_eq!(regs.byte(Reg8::Al), 0x00);
        assert_eq!(regs.word(Reg16::Ax), 0x0000);
        assert!(regs.flag(Flag::ZF));
        assert!(regs.flag(Flag::CF));
        assert!(!regs.flag(Flag::SF));
        assert!(!regs.flag(Flag::OF));
    }

    #[test]
    fn add_byte_overflow() {
        let mut regs = RegisterFile::new();
        run(&mut regs, mov, &["al,", "127"]);
        run(&mut regs, add, &["al,", "1"]);
        assert_eq!(regs.byte(Reg8::Al), 0x80);
        assert!(regs.flag(Flag::SF));
        assert!(regs.flag(Flag::OF));
        assert!(!regs.flag(Flag::CF));
    }

    #[test]
    fn byte_add_does_not_touch_high_byte() {
        let mut regs = RegisterFile::new();
        run(&mut regs, mov, &["ax,", "0x12FF"]);
        run(&mut regs, add, &["al,", "1"]);
        assert_eq!(regs.word(Reg16::Ax), 0x1200);
    }

    #[test]
    fn sub_word_borrow() {
        let mut regs = RegisterFile::new();
        run(&mut regs, mov, &["ax,", "5"]);
        run(&mut regs, sub, &["ax,", "10"]);
        assert_eq!(regs.word(Reg16::Ax), 0xFFFB);
        assert!(regs.flag(Flag::CF));
        assert!(regs.flag(Flag::SF));
        assert!(!regs.flag(Flag::ZF));
    }

    #[test]
    fn sub_register_source() {
        let mut regs = RegisterFile::new();
        run(&mut regs, mov, &["bx,", "0xE102"]);
        run(&mut regs, mov, &["cx,", "0x0F01"]);
        run(&mut regs, sub, &["bx,", "cx"]);
        assert_eq!(regs.word(Reg16::Bx), 0xD201);
        assert!(!regs.flag(Flag::CF));
        assert!(regs.flag(Flag::SF));
    }

    #[test]
    fn cmp_sets_flags_only() {
        let mut regs = RegisterFile::new();
        run(&mut regs, mov, &["ax,", "10"]);
        regs.take_changes();
        run(&mut regs, cmp, &["ax,", "10"]);
        assert_eq!(regs.word(Reg16::Ax), 10);
        assert!(regs.flag(Flag::ZF));
        assert!(!regs.flag(Flag::CF));
        assert!(regs.take_changes().is_empty());
    }

    #[test]
    fn cmp_width_follows_left_operand() {
        let mut regs = RegisterFile::new();
        // 0x80 is negative at byte width
        run(&mut regs, cmp, &["128,", "0"]);
        assert!(regs.flag(Flag::SF));
        // out of byte range, so word width: 0x0100 - 0 has a clear sign bit
        run(&mut regs, cmp, &["256,", "0"]);
        assert!(!regs.flag(Flag::SF));
        assert!(!regs.flag(Flag::ZF));

        run(&mut regs, mov, &["bx,", "0x0080"]);
        run(&mut regs, cmp, &["bx,", "0"]);
        assert!(!regs.flag(Flag::SF));
        run(&mut regs, cmp, &["bl,", "0"]);
        assert!(regs.flag(Flag::SF));
    }

    #[test]
    fn arity_is_checked() {
        let mut regs = RegisterFile::new();
        for handler in [mov as Handler, add, sub, cmp] {
            assert!(matches!(
                handler(&mut regs, &["ax,"]),
                Err(SimError::Arity { found: 1, .. })
            ));
            assert!(matches!(
                handler(&mut regs, &["ax,", "1,", "2"]),
                Err(SimError::Arity { found: 3, .. })
            ));
        }
    }

    #[test]
    fn unknown_destination() {
        let mut regs = RegisterFile::new();
        assert!(matches!(
            mov(&mut regs, &["zz,", "1"]),
            Err(SimError::UnknownDestination(name)) if name == "zz"
        ));
        assert!(matches!(
            add(&mut regs, &["5,", "1"]),
            Err(SimError::UnknownDestination(_))
        ));
    }
}
