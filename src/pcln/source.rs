//! Byte sources backing a decoded symbol table.
//!
//! A PCLN table can be read through whatever access the caller has to
//! the binary: the reader's own memory mapping, a private copy, a live
//! mapping in this process, or nothing but a seekable file descriptor.
//! All of them answer one question: the bytes at a given target
//! virtual address.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use memmap2::Mmap;

use crate::endian::Endian;
use crate::error::{Error, Result};

/// Backing storage for a symbol table.
pub enum TableData {
    /// Shared view into a memory-mapped image; `offset`/`len` bound the
    /// section inside the map.
    Mapped {
        map: Arc<Mmap>,
        offset: usize,
        len: usize,
    },
    /// Owned copy of the section bytes.
    Owned(Vec<u8>),
    /// Section already mapped somewhere in this address space.
    ///
    /// `addr` must point at `len` readable bytes for as long as the
    /// table is alive; the reader façade derives it from the caller's
    /// load base.
    Attached { addr: usize, len: usize },
    /// Seekable handle on the containing file; `offset` is the
    /// section's position in the file. The seek cursor is shared
    /// state, so this backend must not be used concurrently.
    File {
        file: RefCell<File>,
        offset: u64,
        len: u64,
    },
}

impl TableData {
    fn len(&self) -> u64 {
        match self {
            TableData::Mapped { len, .. } => *len as u64,
            TableData::Owned(bytes) => bytes.len() as u64,
            TableData::Attached { len, .. } => *len as u64,
            TableData::File { len, .. } => *len,
        }
    }

    /// Resident bytes, for every backend except the file handle.
    fn resident(&self) -> Option<&[u8]> {
        match self {
            TableData::Mapped { map, offset, len } => {
                map.get(*offset..offset.checked_add(*len)?)
            }
            TableData::Owned(bytes) => Some(bytes),
            TableData::Attached { addr, len } => {
                // Safety: the constructor's contract requires `addr` to
                // stay mapped and readable for `len` bytes while the
                // table exists.
                Some(unsafe { std::slice::from_raw_parts(*addr as *const u8, *len) })
            }
            TableData::File { .. } => None,
        }
    }
}

/// A [`TableData`] bound to the section's virtual address.
///
/// Reads are keyed on target virtual addresses, never on
/// section-relative offsets.
pub struct TableSource {
    data: TableData,
    address: u64,
}

impl TableSource {
    pub fn new(data: TableData, address: u64) -> Self {
        Self { data, address }
    }

    /// Virtual address of the section's first byte.
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Section size in bytes.
    pub fn len(&self) -> u64 {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    fn offset_of(&self, addr: u64) -> Result<u64> {
        addr.checked_sub(self.address)
            .ok_or(Error::OutOfRange { addr })
    }

    /// Read up to `buf.len()` bytes at `addr`, clamped at the section
    /// end. Returns the number of bytes read; zero once `addr` is at or
    /// past the end.
    pub fn read_at(&self, addr: u64, buf: &mut [u8]) -> Result<usize> {
        let offset = self.offset_of(addr)?;
        if offset >= self.len() {
            return Ok(0);
        }

        let available = self.len() - offset;
        let count = buf.len().min(available as usize);

        match &self.data {
            TableData::File { file, offset: file_offset, .. } => {
                let mut file = file.borrow_mut();
                file.seek(SeekFrom::Start(file_offset + offset))?;
                file.read_exact(&mut buf[..count])?;
            }
            data => {
                let bytes = data.resident().ok_or(Error::OutOfRange { addr })?;
                let start = offset as usize;
                buf[..count].copy_from_slice(&bytes[start..start + count]);
            }
        }

        Ok(count)
    }

    /// Read exactly `buf.len()` bytes at `addr`.
    pub fn read_exact(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        if self.read_at(addr, buf)? < buf.len() {
            return Err(Error::OutOfRange { addr });
        }
        Ok(())
    }

    /// Read a converted `u32` at `addr`.
    pub fn read_u32(&self, addr: u64, endian: Endian) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_exact(addr, &mut bytes)?;
        Ok(endian.u32(bytes))
    }

    /// Read a converted `u64` at `addr`.
    pub fn read_u64(&self, addr: u64, endian: Endian) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.read_exact(addr, &mut bytes)?;
        Ok(endian.u64(bytes))
    }

    /// Read a pointer-width value at `addr`; `width` must be 4 or 8.
    pub fn read_word(&self, addr: u64, width: u32, endian: Endian) -> Result<u64> {
        match width {
            4 => self.read_u32(addr, endian).map(u64::from),
            8 => self.read_u64(addr, endian),
            _ => {
                debug_assert!(false, "word width must be 4 or 8, got {}", width);
                Err(Error::Parse(format!("invalid word width {}", width)))
            }
        }
    }

    /// Read a NUL-terminated string starting at `addr`.
    ///
    /// Resident backends scan the mapped bytes; the file backend seeks
    /// once and then reads a byte at a time until the NUL.
    pub fn read_cstring(&self, addr: u64) -> Result<String> {
        let offset = self.offset_of(addr)?;
        if offset >= self.len() {
            return Err(Error::OutOfRange { addr });
        }

        if let Some(bytes) = self.data.resident() {
            let tail = &bytes[offset as usize..];
            let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
            return Ok(String::from_utf8_lossy(&tail[..end]).into_owned());
        }

        let TableData::File { file, offset: file_offset, len } = &self.data else {
            unreachable!("non-resident backend is always the file handle");
        };

        let mut file = file.borrow_mut();
        file.seek(SeekFrom::Start(file_offset + offset))?;

        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        let mut remaining = len - offset;
        while remaining > 0 {
            file.read_exact(&mut byte)?;
            if byte[0] == 0 {
                break;
            }
            out.push(byte[0]);
            remaining -= 1;
        }

        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}
