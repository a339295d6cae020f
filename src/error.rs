use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("{mnemonic} requires {expected} arguments, got {found}")]
    Arity {
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("unknown operand: {0}")]
    UnknownOperand(String),

    #[error("unknown destination register: {0}")]
    UnknownDestination(String),

    #[error("unknown register: {0}")]
    UnknownRegister(String),

    #[error("malformed expectation `{token}`: {reason}")]
    MalformedExpectation { token: String, reason: &'static str },

    /// The only error that ends a run.
    #[error("cannot open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
