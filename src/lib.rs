pub mod bits;
pub mod changes;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod flags;
pub mod operations;
pub mod registers;
pub mod simulator;
pub mod traits;
pub mod verify;
