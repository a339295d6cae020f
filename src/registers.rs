use std::fmt;

use crate::{
    bits::{Bits, Half},
    changes::{ChangeSet, ChangeTracker, Subject},
    error::{Result, SimError},
    flags::{Flag, Flags},
    traits::NumericOps,
};

/// General-purpose 16-bit registers, in dump order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg16 {
    Ax,
    Bx,
    Cx,
    Dx,
    Si,
    Di,
    Bp,
    Sp,
}

impl Reg16 {
    pub const ALL: [Reg16; 8] = [
        Reg16::Ax,
        Reg16::Bx,
        Reg16::Cx,
        Reg16::Dx,
        Reg16::Si,
        Reg16::Di,
        Reg16::Bp,
        Reg16::Sp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Reg16::Ax => "ax",
            Reg16::Bx => "bx",
            Reg16::Cx => "cx",
            Reg16::Dx => "dx",
            Reg16::Si => "si",
            Reg16::Di => "di",
            Reg16::Bp => "bp",
            Reg16::Sp => "sp",
        }
    }

    pub fn from_name(name: &str) -> Option<Reg16> {
        Reg16::ALL.into_iter().find(|reg| reg.name() == name)
    }
}

/// Byte views onto `ax`..`dx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg8 {
    Al,
    Ah,
    Bl,
    Bh,
    Cl,
    Ch,
    Dl,
    Dh,
}

impl Reg8 {
    pub const ALL: [Reg8; 8] = [
        Reg8::Al,
        Reg8::Ah,
        Reg8::Bl,
        Reg8::Bh,
        Reg8::Cl,
        Reg8::Ch,
        Reg8::Dl,
        Reg8::Dh,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Reg8::Al => "al",
            Reg8::Ah => "ah",
            Reg8::Bl => "bl",
            Reg8::Bh => "bh",
            Reg8::Cl => "cl",
            Reg8::Ch => "ch",
            Reg8::Dl => "dl",
            Reg8::Dh => "dh",
        }
    }

    pub fn from_name(name: &str) -> Option<Reg8> {
        Reg8::ALL.into_iter().find(|reg| reg.name() == name)
    }

    /// The word register this byte lives in.
    pub fn parent(self) -> Reg16 {
        match self {
            Reg8::Al | Reg8::Ah => Reg16::Ax,
            Reg8::Bl | Reg8::Bh => Reg16::Bx,
            Reg8::Cl | Reg8::Ch => Reg16::Cx,
            Reg8::Dl | Reg8::Dh => Reg16::Dx,
        }
    }

    pub fn half(self) -> Half {
        match self {
            Reg8::Al | Reg8::Bl | Reg8::Cl | Reg8::Dl => Half::Low,
            Reg8::Ah | Reg8::Bh | Reg8::Ch | Reg8::Dh => Half::High,
        }
    }
}

/// Either kind of register mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterName {
    Word(Reg16),
    Byte(Reg8),
}

impl RegisterName {
    /// Byte names win over word names, matching operand resolution.
    pub fn parse(name: &str) -> Option<RegisterName> {
        Reg8::from_name(name)
            .map(RegisterName::Byte)
            .or_else(|| Reg16::from_name(name).map(RegisterName::Word))
    }

    pub fn name(self) -> &'static str {
        match self {
            RegisterName::Word(reg) => reg.name(),
            RegisterName::Byte(reg) => reg.name(),
        }
    }
}

impl From<Reg16> for RegisterName {
    fn from(reg: Reg16) -> Self {
        RegisterName::Word(reg)
    }
}

impl From<Reg8> for RegisterName {
    fn from(reg: Reg8) -> Self {
        RegisterName::Byte(reg)
    }
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct RegisterFile {
    ax: u16,
    bx: u16,
    cx: u16,
    dx: u16,
    si: u16,
    di: u16,
    bp: u16,
    sp: u16,

    flags: Flags,
    tracker: ChangeTracker,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile {
            ax: 0,
            bx: 0,
            cx: 0,
            dx: 0,
            si: 0,
            di: 0,
            bp: 0,
            sp: 0,
            flags: Flags::empty(),
            tracker: ChangeTracker::new(),
        }
    }

    pub fn reset(&mut self) {
        *self = RegisterFile::new();
    }

    pub fn is8(name: &str) -> bool {
        Reg8::from_name(name).is_some()
    }

    pub fn is16(name: &str) -> bool {
        Reg16::from_name(name).is_some()
    }

    pub fn resolve16(&mut self, name: &str) -> Result<WordAccessor<'_>> {
        let reg = Reg16::from_name(name).ok_or_else(|| SimError::UnknownRegister(name.into()))?;
        Ok(self.word_accessor(reg))
    }

    pub fn resolve8(&mut self, name: &str) -> Result<ByteAccessor<'_>> {
        let reg = Reg8::from_name(name).ok_or_else(|| SimError::UnknownRegister(name.into()))?;
        Ok(self.byte_accessor(reg))
    }

    pub fn word_accessor(&mut self, reg: Reg16) -> WordAccessor<'_> {
        WordAccessor { file: self, reg }
    }

    pub fn byte_accessor(&mut self, reg: Reg8) -> ByteAccessor<'_> {
        ByteAccessor { file: self, reg }
    }

    pub fn word(&self, reg: Reg16) -> u16 {
        match reg {
            Reg16::Ax => self.ax,
            Reg16::Bx => self.bx,
            Reg16::Cx => self.cx,
            Reg16::Dx => self.dx,
            Reg16::Si => self.si,
            Reg16::Di => self.di,
            Reg16::Bp => self.bp,
            Reg16::Sp => self.sp,
        }
    }

    pub fn byte(&self, reg: Reg8) -> u8 {
        self.word(reg.parent()).get_half(reg.half())
    }

    /// Current value of any register, byte registers zero-extended.
    pub fn value(&self, name: RegisterName) -> u16 {
        match name {
            RegisterName::Word(reg) => self.word(reg),
            RegisterName::Byte(reg) => self.byte(reg).into(),
        }
    }

    fn word_slot(&mut self, reg: Reg16) -> &mut u16 {
        match reg {
            Reg16::Ax => &mut self.ax,
            Reg16::Bx => &mut self.bx,
            Reg16::Cx => &mut self.cx,
            Reg16::Dx => &mut self.dx,
            Reg16::Si => &mut self.si,
            Reg16::Di => &mut self.di,
            Reg16::Bp => &mut self.bp,
            Reg16::Sp => &mut self.sp,
        }
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Direct flag access. Changes made here are only seen by the tracker
    /// through [`RegisterFile::check_flag_changes`].
    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.get(flag)
    }

    pub fn capture_flags(&mut self) {
        self.tracker.capture_flags(self.flags);
    }

    pub fn check_flag_changes(&mut self) {
        self.tracker.check_flag_changes(self.flags);
    }

    pub fn take_changes(&mut self) -> ChangeSet {
        self.tracker.take_changes()
    }

    pub fn dump(&self) -> String {
        let regs: Vec<String> = Reg16::ALL
            .into_iter()
            .map(|reg| format!("{}={:04X}", reg.name().to_uppercase(), self.word(reg)))
            .collect();
        format!("{} | {}", regs.join(" "), self.flags.dump())
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

/// Common surface of [`WordAccessor`] and [`ByteAccessor`] so instruction
/// bodies can be written once for both widths.
pub trait RegisterAccess {
    type Value: NumericOps;

    fn name(&self) -> RegisterName;
    fn get(&self) -> Self::Value;
    fn set(&mut self, value: Self::Value);
}

/// Read/write handle on a 16-bit register. Every write goes through
/// [`WordAccessor::set`], which records the change.
pub struct WordAccessor<'a> {
    file: &'a mut RegisterFile,
    reg: Reg16,
}

impl WordAccessor<'_> {
    pub fn reg(&self) -> Reg16 {
        self.reg
    }

    pub fn get(&self) -> u16 {
        self.file.word(self.reg)
    }

    pub fn set(&mut self, value: u16) {
        let slot = self.file.word_slot(self.reg);
        let old = *slot;
        *slot = value;
        self.file
            .tracker
            .record(Subject::Register(self.reg.into()), old, value);
    }
}

/// Read/write handle on the low or high byte of `ax`..`dx`.
pub struct ByteAccessor<'a> {
    file: &'a mut RegisterFile,
    reg: Reg8,
}

impl ByteAccessor<'_> {
    pub fn reg(&self) -> Reg8 {
        self.reg
    }

    pub fn get(&self) -> u8 {
        self.file.byte(self.reg)
    }

    pub fn set(&mut self, value: u8) {
        let half = self.reg.half();
        let slot = self.file.word_slot(self.reg.parent());
        let old = slot.get_half(half);
        slot.set_half(half, value);
        self.file
            .tracker
            .record(Subject::Register(self.reg.into()), old.into(), value.into());
    }
}

impl RegisterAccess for WordAccessor<'_> {
    type Value = u16;

    fn name(&self) -> RegisterName {
        self.reg.into()
    }
    fn get(&self) -> u16 {
        WordAccessor::get(self)
    }
    fn set(&mut self, value: u16) {
        WordAccessor::set(self, value)
    }
}

impl RegisterAccess for ByteAccessor<'_> {
    type Value = u8;

    fn name(&self) -> RegisterName {
        self.reg.into()
    }
    fn get(&self) -> u8 {
        ByteAccessor::get(self)
    }
    fn set(&mut self, value: u8) {
        ByteAccessor::set(self, value)
    }
}
