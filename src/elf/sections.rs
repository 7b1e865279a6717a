//! Section table management

use std::collections::HashMap;

use crate::elf::types::*;
use crate::elf::utils::{read_cstring, EndianRead};
use crate::endian::Endian;

/// Section table for efficient section lookup
pub struct SectionTable<'a> {
    headers: Vec<SectionHeader>,
    strings: &'a [u8],
    data: &'a [u8],
    by_name: HashMap<String, usize>,
}

impl<'a> SectionTable<'a> {
    /// Parse section table from ELF data
    pub fn parse(data: &'a [u8], header: &ElfHeader) -> Result<Self> {
        let sh_offset = header.e_shoff as usize;
        let sh_entsize = header.e_shentsize as usize;
        let sh_num = header.e_shnum as usize;

        if sh_num == 0 || sh_offset == 0 {
            // No sections
            return Ok(Self {
                headers: Vec::new(),
                strings: &[],
                data,
                by_name: HashMap::new(),
            });
        }

        let total_size = sh_num * sh_entsize;
        if sh_offset + total_size > data.len() {
            return Err(ElfError::Truncated {
                offset: sh_offset,
                needed: total_size,
            });
        }

        let mut headers = Vec::with_capacity(sh_num);
        for i in 0..sh_num {
            let offset = sh_offset + i * sh_entsize;
            headers.push(parse_section_header(
                data,
                offset,
                header.ident.class,
                header.ident.data,
            )?);
        }

        // String table for section names
        let shstrndx = header.e_shstrndx as usize;
        let strings = if shstrndx < headers.len() {
            let str_header = &headers[shstrndx];
            let str_offset = str_header.sh_offset as usize;
            let str_size = str_header.sh_size as usize;
            if str_offset + str_size <= data.len() {
                &data[str_offset..str_offset + str_size]
            } else {
                &[]
            }
        } else {
            &[]
        };

        let mut by_name = HashMap::new();
        for (i, sh) in headers.iter().enumerate() {
            if let Ok(name) = read_cstring(strings, sh.sh_name as usize) {
                by_name.insert(name.to_string(), i);
            }
        }

        Ok(Self {
            headers,
            strings,
            data,
            by_name,
        })
    }

    /// Get section by exact name
    pub fn by_name(&self, name: &str) -> Option<Section<'a>> {
        self.by_name.get(name).and_then(|&idx| self.by_index(idx))
    }

    /// Get the first section whose name contains `needle`, case-insensitively.
    ///
    /// Go emits the PCLN and build-info sections under names that vary by
    /// linker (`.gopclntab`, `.data.rel.ro.gopclntab`, `__gopclntab`), so
    /// callers match on a substring instead of an exact name.
    pub fn by_name_contains(&self, needle: &str) -> Option<Section<'a>> {
        let needle = needle.to_ascii_lowercase();
        (0..self.headers.len()).find_map(|i| {
            let section = self.by_index(i)?;
            section
                .name
                .to_ascii_lowercase()
                .contains(&needle)
                .then_some(section)
        })
    }

    /// Get the first section of the given `sh_type`.
    pub fn by_type(&self, sh_type: u32) -> Option<Section<'a>> {
        (0..self.headers.len())
            .find(|&i| self.headers[i].sh_type == sh_type)
            .and_then(|i| self.by_index(i))
    }

    /// Get section by index
    pub fn by_index(&self, index: usize) -> Option<Section<'a>> {
        self.headers.get(index).map(|header| {
            let name = read_cstring(self.strings, header.sh_name as usize).unwrap_or("");
            let offset = header.sh_offset as usize;
            let size = header.sh_size as usize;
            let data = if offset + size <= self.data.len() {
                &self.data[offset..offset + size]
            } else {
                &[]
            };
            Section {
                header: *header,
                name,
                data,
            }
        })
    }

    /// Count sections
    pub fn count(&self) -> usize {
        self.headers.len()
    }
}

/// Parse a single section header
fn parse_section_header(
    data: &[u8],
    offset: usize,
    class: ElfClass,
    endian: Endian,
) -> Result<SectionHeader> {
    match class {
        ElfClass::Elf32 => {
            if offset + 40 > data.len() {
                return Err(ElfError::Truncated { offset, needed: 40 });
            }
            Ok(SectionHeader {
                sh_name: data.read_u32(offset, endian)?,
                sh_type: data.read_u32(offset + 4, endian)?,
                sh_flags: data.read_u32(offset + 8, endian)? as u64,
                sh_addr: data.read_u32(offset + 12, endian)? as u64,
                sh_offset: data.read_u32(offset + 16, endian)? as u64,
                sh_size: data.read_u32(offset + 20, endian)? as u64,
                sh_link: data.read_u32(offset + 24, endian)?,
                sh_info: data.read_u32(offset + 28, endian)?,
                sh_addralign: data.read_u32(offset + 32, endian)? as u64,
                sh_entsize: data.read_u32(offset + 36, endian)? as u64,
            })
        }
        ElfClass::Elf64 => {
            if offset + 64 > data.len() {
                return Err(ElfError::Truncated { offset, needed: 64 });
            }
            Ok(SectionHeader {
                sh_name: data.read_u32(offset, endian)?,
                sh_type: data.read_u32(offset + 4, endian)?,
                sh_flags: data.read_u64(offset + 8, endian)?,
                sh_addr: data.read_u64(offset + 16, endian)?,
                sh_offset: data.read_u64(offset + 24, endian)?,
                sh_size: data.read_u64(offset + 32, endian)?,
                sh_link: data.read_u32(offset + 40, endian)?,
                sh_info: data.read_u32(offset + 44, endian)?,
                sh_addralign: data.read_u64(offset + 48, endian)?,
                sh_entsize: data.read_u64(offset + 56, endian)?,
            })
        }
    }
}
