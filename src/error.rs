//! Error types for the gosym crate.
//!
//! One crate-level error enum covers every decoder; the ELF container
//! reader keeps its own self-contained error type, surfaced here
//! transparently.

use thiserror::Error;

use crate::elf::types::ElfError;

/// Main error type for gosym operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested section is absent from the image
    #[error("section not found: {0}")]
    SectionNotFound(String),

    /// Ordinary symbol lookup failed
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// Magic bytes mismatch
    #[error("invalid magic")]
    InvalidMagic,

    /// Unknown symbol-table magic, or a toolchain version we do not support
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    /// Varint overflow or truncation
    #[error("malformed varint")]
    MalformedVarint,

    /// A fixed-width read ran past the end of its buffer
    #[error("truncated read at {offset:#x}, needed {needed} bytes")]
    Truncated { offset: u64, needed: usize },

    /// Virtual-memory read spans past the owning segment
    #[error("virtual address {addr:#x} out of range")]
    OutOfRange { addr: u64 },

    /// File read or seek failed
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// ELF container errors
    #[error(transparent)]
    Elf(#[from] ElfError),

    /// Structural violation
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type alias for gosym operations
pub type Result<T> = std::result::Result<T, Error>;
