use std::fmt;

use crate::{
    flags::{Flag, Flags},
    registers::RegisterName,
};

/// What a [`ChangeRecord`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Register(RegisterName),
    Flag(Flag),
}

/// One observed mutation. Flag values are stored as 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRecord {
    pub subject: Subject,
    pub old: u16,
    pub new: u16,
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subject {
            Subject::Register(name) => write!(f, "{}:{:#x}->{:#x}", name, self.old, self.new),
            Subject::Flag(flag) => write!(f, "{}:{}->{}", flag, self.old, self.new),
        }
    }
}

/// Mutations since the last checkpoint, in the order they happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    records: Vec<ChangeRecord>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn register_changes(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.subject, Subject::Register(_)))
    }

    pub fn flag_changes(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.subject, Subject::Flag(_)))
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for record in self.register_changes().chain(self.flag_changes()) {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{record}")?;
            first = false;
        }
        Ok(())
    }
}

/// Accumulates [`ChangeRecord`]s between checkpoints.
///
/// Register writes are recorded as they happen. Flags are written directly,
/// so their changes are found by diffing against a baseline captured before
/// the instruction ran.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    pending: Vec<ChangeRecord>,
    baseline: Flags,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, subject: Subject, old: u16, new: u16) {
        if old != new {
            self.pending.push(ChangeRecord { subject, old, new });
        }
    }

    pub fn capture_flags(&mut self, flags: Flags) {
        self.baseline = flags;
    }

    pub fn check_flag_changes(&mut self, flags: Flags) {
        for flag in Flag::ALL {
            let old = self.baseline.get(flag);
            let new = flags.get(flag);
            self.record(Subject::Flag(flag), old.into(), new.into());
        }
        self.baseline = flags;
    }

    /// Hands back everything recorded so far and starts over empty.
    pub fn take_changes(&mut self) -> ChangeSet {
        ChangeSet {
            records: std::mem::take(&mut self.pending),
        }
    }
}
