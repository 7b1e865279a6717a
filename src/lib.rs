//! Read Go build metadata out of ELF binaries.
//!
//! A Go binary carries two self-describing blobs: the PCLN table
//! (`gopclntab`), mapping program counters to function names, source
//! files, source lines, and stack-frame sizes, and the build-info blob
//! (`buildinfo`), carrying the toolchain version and the module
//! dependency graph. This crate locates both inside an ELF image and
//! decodes them without touching the binary.
//!
//! The PCLN decoder understands the four on-disk layout revisions
//! (Go 1.2, 1.16, 1.18, and 1.20) and can read the table through a
//! shared memory mapping, an owned copy, a live mapping in the current
//! address space, or a seekable file handle.

/// Build-info decoding: toolchain version and module graph.
pub mod buildinfo;

/// Native ELF container reader.
pub mod elf;

/// Byte-order tag and converting reads.
pub mod endian;

/// Error types and error handling.
pub mod error;

/// Logging and tracing infrastructure.
pub mod logging;

/// PCLN symbol-table decoder.
pub mod pcln;

/// Reader façade over an opened ELF file.
pub mod reader;

/// Variable-length integer decoding.
pub mod varint;

/// Go toolchain version parsing and ordering.
pub mod version;

pub use buildinfo::{BuildInfo, Module, ModuleInfo};
pub use endian::Endian;
pub use error::{Error, Result};
pub use pcln::{PclnVersion, Symbol, SymbolEntry, SymbolTable};
pub use reader::{AccessMethod, GoReader, InterfaceTable};
pub use version::GoVersion;
