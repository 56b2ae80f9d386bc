use std::path::PathBuf;

use thiserror::Error;

/// Failures that can occur while turning a byte stream (or its textual form)
/// into a list of [`crate::instruction::Instruction`]s.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    #[error("instruction is missing an operand byte")]
    TruncatedInstruction,

    #[error("variadic instruction has no terminating null byte")]
    MissingTerminator,
}

/// Failures that can occur while dispatching an already-decoded instruction.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("stack is empty")]
    StackUnderflow,

    #[error("accessing reserved memory address 0")]
    ReservedAccess,

    #[error("memory[{0}] does not hold a marker")]
    BadMarker(usize),

    #[error("memory[{0}] does not hold a file handle")]
    BadFileHandle(usize),

    #[error("invalid file mode {0}, expected 0..=15")]
    BadFileMode(u8),

    #[error("cannot import module: '{0}' is not a file")]
    ImportNotFound(PathBuf),

    #[error("module import failed: {0}")]
    ImportFailed(Box<Error>),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level error for anything the VM or decoder can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
