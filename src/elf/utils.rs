//! Utility functions for ELF parsing

use crate::elf::types::{ElfError, Result};
use crate::endian::Endian;

/// Trait for reading values with endianness support
pub trait EndianRead {
    fn read_u16(&self, offset: usize, endian: Endian) -> Result<u16>;
    fn read_u32(&self, offset: usize, endian: Endian) -> Result<u32>;
    fn read_u64(&self, offset: usize, endian: Endian) -> Result<u64>;
}

impl EndianRead for [u8] {
    fn read_u16(&self, offset: usize, endian: Endian) -> Result<u16> {
        endian
            .read_u16(self, offset)
            .ok_or(ElfError::Truncated { offset, needed: 2 })
    }

    fn read_u32(&self, offset: usize, endian: Endian) -> Result<u32> {
        endian
            .read_u32(self, offset)
            .ok_or(ElfError::Truncated { offset, needed: 4 })
    }

    fn read_u64(&self, offset: usize, endian: Endian) -> Result<u64> {
        endian
            .read_u64(self, offset)
            .ok_or(ElfError::Truncated { offset, needed: 8 })
    }
}

/// Read a null-terminated string from data
pub fn read_cstring(data: &[u8], offset: usize) -> Result<&str> {
    if offset >= data.len() {
        return Err(ElfError::InvalidOffset { offset });
    }

    let slice = &data[offset..];
    let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());

    std::str::from_utf8(&slice[..end]).map_err(|_| ElfError::InvalidString)
}
