//! Program header table management

use crate::elf::types::*;
use crate::elf::utils::EndianRead;
use crate::endian::Endian;

/// Segment table for program header management
pub struct SegmentTable<'a> {
    headers: Vec<ProgramHeader>,
    data: &'a [u8],
}

impl<'a> SegmentTable<'a> {
    /// Parse segment table from ELF data
    pub fn parse(data: &'a [u8], header: &ElfHeader) -> Result<Self> {
        let ph_offset = header.e_phoff as usize;
        let ph_entsize = header.e_phentsize as usize;
        let ph_num = header.e_phnum as usize;

        if ph_num == 0 || ph_offset == 0 {
            // No segments
            return Ok(Self {
                headers: Vec::new(),
                data,
            });
        }

        let total_size = ph_num * ph_entsize;
        if ph_offset + total_size > data.len() {
            return Err(ElfError::Truncated {
                offset: ph_offset,
                needed: total_size,
            });
        }

        let mut headers = Vec::with_capacity(ph_num);
        for i in 0..ph_num {
            let offset = ph_offset + i * ph_entsize;
            headers.push(parse_program_header(
                data,
                offset,
                header.ident.class,
                header.ident.data,
            )?);
        }

        // Sort by virtual address for efficient lookups
        headers.sort_by_key(|h| h.p_vaddr);

        Ok(Self { headers, data })
    }

    /// Get all LOAD segment headers
    pub fn load_segments(&self) -> impl Iterator<Item = &ProgramHeader> {
        self.headers.iter().filter(|ph| ph.p_type == PT_LOAD)
    }

    /// Lowest virtual address among LOAD segments, if any
    pub fn min_load_vaddr(&self) -> Option<u64> {
        self.load_segments().map(|ph| ph.p_vaddr).min()
    }

    /// Find the LOAD segment whose file-backed bytes cover `addr`
    pub fn load_segment_containing(&self, addr: u64) -> Option<&ProgramHeader> {
        self.load_segments()
            .find(|ph| addr >= ph.p_vaddr && addr < ph.p_vaddr + ph.p_filesz)
    }

    /// File-backed bytes of a segment
    pub fn segment_data(&self, header: &ProgramHeader) -> &'a [u8] {
        let offset = header.p_offset as usize;
        let size = header.p_filesz as usize;
        if offset + size <= self.data.len() {
            &self.data[offset..offset + size]
        } else {
            &[]
        }
    }

    /// Count segments
    pub fn count(&self) -> usize {
        self.headers.len()
    }
}

/// Parse a single program header
fn parse_program_header(
    data: &[u8],
    offset: usize,
    class: ElfClass,
    endian: Endian,
) -> Result<ProgramHeader> {
    match class {
        ElfClass::Elf32 => {
            if offset + 32 > data.len() {
                return Err(ElfError::Truncated { offset, needed: 32 });
            }
            Ok(ProgramHeader {
                p_type: data.read_u32(offset, endian)?,
                p_offset: data.read_u32(offset + 4, endian)? as u64,
                p_vaddr: data.read_u32(offset + 8, endian)? as u64,
                p_paddr: data.read_u32(offset + 12, endian)? as u64,
                p_filesz: data.read_u32(offset + 16, endian)? as u64,
                p_memsz: data.read_u32(offset + 20, endian)? as u64,
                p_flags: data.read_u32(offset + 24, endian)?,
                p_align: data.read_u32(offset + 28, endian)? as u64,
            })
        }
        ElfClass::Elf64 => {
            if offset + 56 > data.len() {
                return Err(ElfError::Truncated { offset, needed: 56 });
            }
            Ok(ProgramHeader {
                p_type: data.read_u32(offset, endian)?,
                p_flags: data.read_u32(offset + 4, endian)?,
                p_offset: data.read_u64(offset + 8, endian)?,
                p_vaddr: data.read_u64(offset + 16, endian)?,
                p_paddr: data.read_u64(offset + 24, endian)?,
                p_filesz: data.read_u64(offset + 32, endian)?,
                p_memsz: data.read_u64(offset + 40, endian)?,
                p_align: data.read_u64(offset + 48, endian)?,
            })
        }
    }
}
