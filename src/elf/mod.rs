//! Native ELF container reader
//!
//! A zero-copy parser covering exactly what Go metadata extraction
//! needs: the header, section and segment tables, the ordinary symbol
//! table, and bounds-checked reads of file-backed virtual memory.

pub mod headers;
pub mod sections;
pub mod segments;
pub mod symbols;
pub mod types;
pub mod utils;

use headers::parse_header;
use sections::SectionTable;
use segments::SegmentTable;
use symbols::Symtab;
pub use types::*;

use crate::endian::Endian;
use crate::error::{self, Error};

/// A parsed view over an ELF image held in memory.
#[derive(Clone, Copy)]
pub struct ElfImage<'data> {
    data: &'data [u8],
    header: ElfHeader,
}

impl<'data> ElfImage<'data> {
    /// Parse an ELF image from raw data
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let header = parse_header(data)?;

        Ok(Self { data, header })
    }

    /// Get ELF header
    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// Get raw data
    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    /// Byte order of the image
    pub fn endian(&self) -> Endian {
        self.header.ident.data
    }

    /// Pointer width of the image in bytes
    pub fn ptr_size(&self) -> usize {
        self.header.ident.class.ptr_size()
    }

    /// Whether the image is position-independent (`ET_DYN`)
    pub fn is_pie(&self) -> bool {
        self.header.is_pie()
    }

    /// Get sections
    pub fn sections(&self) -> Result<SectionTable<'data>> {
        SectionTable::parse(self.data, &self.header)
    }

    /// Get segments
    pub fn segments(&self) -> Result<SegmentTable<'data>> {
        SegmentTable::parse(self.data, &self.header)
    }

    /// Get the ordinary symbol table, if the image carries one.
    ///
    /// Looks for `.symtab` by name first, then for any `SHT_SYMTAB`
    /// section; the string table comes from the section's `sh_link`.
    pub fn symtab(&self) -> Result<Option<Symtab>> {
        let sections = self.sections()?;

        let symtab_section = match sections
            .by_name(".symtab")
            .or_else(|| sections.by_type(SHT_SYMTAB))
        {
            Some(s) => s,
            None => return Ok(None),
        };

        let strtab_section = match sections.by_index(symtab_section.header.sh_link as usize) {
            Some(s) => s,
            None => return Ok(None),
        };

        let table = Symtab::parse(
            symtab_section.data,
            strtab_section.data,
            self.header.ident.class,
            self.header.ident.data,
        )?;

        Ok(Some(table))
    }

    /// Lowest virtual address among LOAD segments
    pub fn min_load_vaddr(&self) -> Result<Option<u64>> {
        Ok(self.segments()?.min_load_vaddr())
    }

    /// Read `len` bytes of file-backed virtual memory at `addr`.
    ///
    /// The read must fall entirely inside one LOAD segment's file
    /// image; spanning past it fails with [`Error::OutOfRange`].
    pub fn read_virtual_memory(&self, addr: u64, len: u64) -> error::Result<&'data [u8]> {
        let segments = self.segments()?;

        let segment = segments
            .load_segment_containing(addr)
            .ok_or(Error::OutOfRange { addr })?;

        if segment.p_vaddr + segment.p_filesz - addr < len {
            return Err(Error::OutOfRange { addr });
        }

        let data = segments.segment_data(segment);
        let start = (addr - segment.p_vaddr) as usize;
        data.get(start..start + len as usize)
            .ok_or(Error::OutOfRange { addr })
    }
}
