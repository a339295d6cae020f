//! Checking execution against the expectations embedded in a trace.
//!
//! Two annotation forms are understood. An instruction line may end with
//! `; bx:0x0->0xf003 flags:->S`, listing the registers and flags the line is
//! expected to change. A trace may end with a block starting at a line
//! beginning with `Final`, which lists `name: 0xVALUE` pairs and a
//! `flags: LETTERS` line describing the whole machine after the last
//! instruction.

use std::fmt;

use crate::{
    error::{Result, SimError},
    flags::Flag,
    registers::{Reg16, RegisterFile, RegisterName},
};

/// A single disagreement between the trace and the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Register {
        name: String,
        expected: u16,
        actual: u16,
    },
    Flag {
        flag: Flag,
        expected: bool,
    },
    Flags {
        expected: String,
        actual: String,
    },
    UnknownRegister(String),
    UnknownFlag(char),
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Register {
                name,
                expected,
                actual,
            } => write!(f, "{name} expected {expected:#x}, got {actual:#x}"),
            Mismatch::Flag { flag, expected } => {
                if *expected {
                    write!(f, "flag {flag} expected to be set but is clear")
                } else {
                    write!(f, "flag {flag} expected to be clear but is set")
                }
            }
            Mismatch::Flags { expected, actual } => {
                write!(f, "flags expected `{expected}`, got `{actual}`")
            }
            Mismatch::UnknownRegister(name) => write!(f, "unknown register in expectation: {name}"),
            Mismatch::UnknownFlag(letter) => write!(f, "unknown flag in expectation: {letter}"),
        }
    }
}

/// What one instruction line says should be true after it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedState {
    /// Register name and expected new value, in annotation order.
    pub registers: Vec<(String, u16)>,
    pub flags_set: Vec<char>,
    pub flags_cleared: Vec<char>,
}

impl ExpectedState {
    /// Parses the text after the `;` of an instruction line.
    ///
    /// Tokens without a `:` carry no expectation and are ignored.
    pub fn parse(annotation: &str) -> Result<ExpectedState> {
        let mut expected = ExpectedState::default();

        for token in annotation.split_whitespace() {
            let Some((name, change)) = token.split_once(':') else {
                continue;
            };
            let (old, new) = change.split_once("->").ok_or_else(|| malformed(token, "missing `->`"))?;

            if name == "flags" {
                for letter in old.chars().filter(|c| !new.contains(*c)) {
                    push_unique(&mut expected.flags_cleared, letter);
                }
                for letter in new.chars().filter(|c| !old.contains(*c)) {
                    push_unique(&mut expected.flags_set, letter);
                }
            } else {
                let value = parse_hex(new).ok_or_else(|| malformed(token, "new value is not hex"))?;
                match expected.registers.iter_mut().find(|(n, _)| n == name) {
                    Some(entry) => entry.1 = value,
                    None => expected.registers.push((name.to_string(), value)),
                }
            }
        }

        Ok(expected)
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty() && self.flags_set.is_empty() && self.flags_cleared.is_empty()
    }

    /// Compares every expectation against `regs`. All mismatches are returned,
    /// not just the first.
    pub fn compare(&self, regs: &RegisterFile) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        for (name, expected) in &self.registers {
            let Some(reg) = RegisterName::parse(name) else {
                mismatches.push(Mismatch::UnknownRegister(name.clone()));
                continue;
            };
            let actual = regs.value(reg);
            if actual != *expected {
                mismatches.push(Mismatch::Register {
                    name: name.clone(),
                    expected: *expected,
                    actual,
                });
            }
        }

        let wanted = self
            .flags_set
            .iter()
            .map(|l| (*l, true))
            .chain(self.flags_cleared.iter().map(|l| (*l, false)));
        for (letter, expected) in wanted {
            let Some(flag) = Flag::from_letter(letter) else {
                mismatches.push(Mismatch::UnknownFlag(letter));
                continue;
            };
            if regs.flag(flag) != expected {
                mismatches.push(Mismatch::Flag { flag, expected });
            }
        }

        mismatches
    }
}

/// The machine state asserted by a trailing `Final` block.
#[derive(Debug, Default)]
pub struct FinalState {
    pub registers: Vec<(String, u16)>,
    /// Exact letter string, compared as-is. Empty when the block has no
    /// `flags:` line, which asserts that no flags are set.
    pub flags: String,
    /// Lines that looked like a register value but did not parse.
    pub malformed: Vec<SimError>,
}

impl FinalState {
    pub fn parse<'a, I>(lines: I) -> FinalState
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = FinalState::default();

        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with("Final") {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            if key == "flags" {
                state.flags = value.to_string();
                continue;
            }

            let Some(start) = value.find("0x") else {
                continue;
            };
            let hex = value[start..].split_whitespace().next().unwrap_or_default();
            match parse_hex(hex) {
                Some(parsed) => match state.registers.iter_mut().find(|(n, _)| n == key) {
                    Some(entry) => entry.1 = parsed,
                    None => state.registers.push((key.to_string(), parsed)),
                },
                None => state.malformed.push(malformed(line, "register value is not hex")),
            }
        }

        state
    }

    pub fn compare(&self, regs: &RegisterFile) -> FinalReport {
        let registers = self
            .registers
            .iter()
            .map(|(name, expected)| FinalEntry {
                name: name.clone(),
                expected: *expected,
                actual: Reg16::from_name(name).map(|reg| regs.word(reg)),
            })
            .collect();

        FinalReport {
            registers,
            expected_flags: self.flags.clone(),
            actual_flags: regs.flags().letters(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalEntry {
    pub name: String,
    pub expected: u16,
    /// `None` when `name` is not a 16-bit register.
    pub actual: Option<u16>,
}

impl FinalEntry {
    pub fn matches(&self) -> bool {
        self.actual == Some(self.expected)
    }
}

/// Outcome of checking a [`FinalState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReport {
    pub registers: Vec<FinalEntry>,
    pub expected_flags: String,
    pub actual_flags: String,
}

impl FinalReport {
    pub fn flags_match(&self) -> bool {
        self.expected_flags == self.actual_flags
    }

    pub fn mismatches(&self) -> Vec<Mismatch> {
        let mut mismatches: Vec<Mismatch> = self
            .registers
            .iter()
            .filter(|entry| !entry.matches())
            .map(|entry| match entry.actual {
                Some(actual) => Mismatch::Register {
                    name: entry.name.clone(),
                    expected: entry.expected,
                    actual,
                },
                None => Mismatch::UnknownRegister(entry.name.clone()),
            })
            .collect();

        if !self.flags_match() {
            mismatches.push(Mismatch::Flags {
                expected: self.expected_flags.clone(),
                actual: self.actual_flags.clone(),
            });
        }
        mismatches
    }

    pub fn is_match(&self) -> bool {
        self.registers.iter().all(FinalEntry::matches) && self.flags_match()
    }
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.registers {
            match entry.actual {
                Some(actual) => write!(f, "      {}: {:#06x} ({})", entry.name, actual, actual)?,
                None => write!(f, "      {}: <unknown register>", entry.name)?,
            }
            if !entry.matches() {
                write!(f, " <-- MISMATCH (expected {:#x})", entry.expected)?;
            }
            writeln!(f)?;
        }

        write!(f, "   flags: {}", self.actual_flags)?;
        if !self.flags_match() {
            write!(f, " <-- MISMATCH (expected {})", self.expected_flags)?;
        }

        if self.is_match() {
            write!(f, "\nAll final state values match!")?;
        }
        Ok(())
    }
}

fn malformed(token: &str, reason: &'static str) -> SimError {
    SimError::MalformedExpectation {
        token: token.to_string(),
        reason,
    }
}

/// Hex with or without a `0x` prefix.
fn parse_hex(text: &str) -> Option<u16> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u16::from_str_radix(digits, 16).ok()
}

fn push_unique(letters: &mut Vec<char>, letter: char) {
    if !letters.contains(&letter) {
        letters.push(letter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;

    fn regs_with(ax: u16, flags: Flags) -> RegisterFile {
        let mut regs = RegisterFile::new();
        regs.word_accessor(Reg16::Ax).set(ax);
        *regs.flags_mut() = flags;
        regs
    }

    #[test]
    fn parse_registers_and_flags() {
        let expected = ExpectedState::parse(" bx:0x0->0xf003 flags:PZ->SZ").unwrap();
        assert_eq!(expected.registers, vec![("bx".to_string(), 0xF003)]);
        assert_eq!(expected.flags_set, vec!['S']);
        assert_eq!(expected.flags_cleared, vec!['P']);
    }

    #[test]
    fn flags_in_both_or_neither_are_ignored() {
        let expected = ExpectedState::parse("flags:CZ->CZ").unwrap();
        assert!(expected.is_empty());
        let expected = ExpectedState::parse("flags:->").unwrap();
        assert!(expected.is_empty());
    }

    #[test]
    fn tokens_without_colon_are_skipped() {
        let expected = ExpectedState::parse("note ax:0x1->0x2").unwrap();
        assert_eq!(expected.registers, vec![("ax".to_string(), 2)]);
    }

    #[test]
    fn malformed_tokens() {
        assert!(matches!(
            ExpectedState::parse("ax:0x1"),
            Err(SimError::MalformedExpectation { .. })
        ));
        assert!(matches!(
            ExpectedState::parse("ax:0x1->0xzz"),
            Err(SimError::MalformedExpectation { token, .. }) if token == "ax:0x1->0xzz"
        ));
    }

    #[test]
    fn single_register_mismatch() {
        let regs = regs_with(0x0001, Flags::empty());
        let expected = ExpectedState::parse("ax:0x0000->0x0002").unwrap();
        assert_eq!(
            expected.compare(&regs),
            vec![Mismatch::Register {
                name: "ax".to_string(),
                expected: 2,
                actual: 1,
            }]
        );
    }

    #[test]
    fn every_mismatch_is_reported() {
        let regs = regs_with(0x1234, Flags::CARRY);
        let expected = ExpectedState::parse("ax:0x0->0x1 al:0x0->0x34 zz:0x0->0x1 flags:C->ZX").unwrap();
        let mismatches = expected.compare(&regs);
        assert_eq!(
            mismatches,
            vec![
                Mismatch::Register {
                    name: "ax".to_string(),
                    expected: 1,
                    actual: 0x1234,
                },
                Mismatch::UnknownRegister("zz".to_string()),
                Mismatch::Flag {
                    flag: Flag::ZF,
                    expected: true,
                },
                Mismatch::UnknownFlag('X'),
                Mismatch::Flag {
                    flag: Flag::CF,
                    expected: false,
                },
            ]
        );
    }

    #[test]
    fn byte_registers_compare_unwidened() {
        let regs = regs_with(0xAB12, Flags::empty());
        let expected = ExpectedState::parse("ah:0x0->0xab").unwrap();
        assert!(expected.compare(&regs).is_empty());
    }

    #[test]
    fn final_state_parse() {
        let lines = [
            "Final registers:",
            "      bx: 0xe102 (57602)",
            "      cx: 0x0f01 (3841)",
            "      ip: nothing here",
            "   flags: PZ",
            "",
        ];
        let state = FinalState::parse(lines);
        assert_eq!(
            state.registers,
            vec![("bx".to_string(), 0xE102), ("cx".to_string(), 0x0F01)]
        );
        assert_eq!(state.flags, "PZ");
        assert!(state.malformed.is_empty());
    }

    #[test]
    fn final_state_bad_hex_is_collected() {
        let state = FinalState::parse(["      bx: 0xq1"]);
        assert!(state.registers.is_empty());
        assert_eq!(state.malformed.len(), 1);
    }

    #[test]
    fn final_report_matches() {
        let regs = regs_with(0x0001, Flags::PARITY | Flags::ZERO);
        let state = FinalState::parse(["      ax: 0x0001 (1)", "   flags: PZ"]);
        let report = state.compare(&regs);
        assert!(report.is_match());
        assert!(report.mismatches().is_empty());
        assert_eq!(
            report.to_string(),
            "      ax: 0x0001 (1)\n   flags: PZ\nAll final state values match!"
        );
    }

    #[test]
    fn final_report_mismatches() {
        let regs = regs_with(0x0001, Flags::ZERO | Flags::PARITY);
        let state = FinalState::parse(["ax: 0x0002", "al: 0x01", "flags: ZP"]);
        let report = state.compare(&regs);
        assert!(!report.is_match());
        assert_eq!(
            report.mismatches(),
            vec![
                Mismatch::Register {
                    name: "ax".to_string(),
                    expected: 2,
                    actual: 1,
                },
                Mismatch::UnknownRegister("al".to_string()),
                Mismatch::Flags {
                    expected: "ZP".to_string(),
                    actual: "PZ".to_string(),
                },
            ]
        );
        let rendered = report.to_string();
        assert!(rendered.contains("ax: 0x0001 (1) <-- MISMATCH (expected 0x2)"));
        assert!(rendered.contains("flags: PZ <-- MISMATCH (expected ZP)"));
        assert!(!rendered.contains("All final state values match!"));
    }

    #[test]
    fn final_report_without_flags_line() {
        let state = FinalState::parse(["ax: 0x0000"]);
        assert_eq!(state.flags, "");

        let report = state.compare(&regs_with(0, Flags::empty()));
        assert!(report.is_match());

        let report = state.compare(&regs_with(0, Flags::CARRY | Flags::PARITY | Flags::ZERO));
        assert!(!report.is_match());
        assert_eq!(
            report.mismatches(),
            vec![Mismatch::Flags {
                expected: String::new(),
                actual: "CPZ".to_string(),
            }]
        );
        assert!(report.to_string().ends_with("flags: CPZ <-- MISMATCH (expected )"));
    }
}
