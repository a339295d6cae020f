use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{Result, SimError},
    operations::{self, Handler},
    registers::RegisterFile,
};

/// Maps a mnemonic to the function that executes it.
pub struct InstructionDispatcher {
    handlers: HashMap<&'static str, Handler>,
}

impl Default for InstructionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionDispatcher {
    pub fn new() -> InstructionDispatcher {
        let handlers: [(&'static str, Handler); 4] = [
            ("mov", operations::mov),
            ("add", operations::add),
            ("sub", operations::sub),
            ("cmp", operations::cmp),
        ];
        InstructionDispatcher {
            handlers: handlers.into_iter().collect(),
        }
    }

    /// Runs one instruction, e.g. `add ax, 1`. Anything after a `;` must
    /// already have been removed.
    pub fn execute(&self, regs: &mut RegisterFile, line: &str) -> Result<String> {
        let mut tokens = line.split_whitespace();
        let mnemonic = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();

        let handler = self
            .handlers
            .get(mnemonic)
            .ok_or_else(|| SimError::UnknownCommand(mnemonic.to_string()))?;

        debug!("executing {} with {} arguments", mnemonic, args.len());
        handler(regs, &args)
    }
}
