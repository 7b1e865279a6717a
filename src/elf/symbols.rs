//! Ordinary symbol table parsing

use std::collections::HashMap;

use crate::elf::types::*;
use crate::elf::utils::{read_cstring, EndianRead};
use crate::endian::Endian;

/// Ordinary `.symtab` contents with a name index.
///
/// Go strips most of this from release binaries; it is consulted only
/// for the handful of runtime symbols (`runtime.buildVersion`,
/// `runtime.types`) that predate the build-info blob. Names are folded
/// into the index at parse time, so nothing borrows the string table.
pub struct Symtab {
    symbols: Vec<ElfSymbol>,
    by_name: HashMap<String, usize>,
}

impl Symtab {
    /// Parse symbol table from section data
    pub fn parse(
        symbol_data: &[u8],
        string_data: &[u8],
        class: ElfClass,
        endian: Endian,
    ) -> Result<Self> {
        let entry_size = match class {
            ElfClass::Elf32 => 16,
            ElfClass::Elf64 => 24,
        };

        let mut symbols = Vec::new();
        let mut by_name = HashMap::new();

        let mut offset = 0;
        while offset + entry_size <= symbol_data.len() {
            let symbol = parse_symbol(&symbol_data[offset..], class, endian)?;

            if symbol.st_name != 0 {
                if let Ok(name) = read_cstring(string_data, symbol.st_name as usize) {
                    by_name.insert(name.to_string(), symbols.len());
                }
            }

            symbols.push(symbol);
            offset += entry_size;
        }

        Ok(Self { symbols, by_name })
    }

    /// Get symbol by name
    pub fn by_name(&self, name: &str) -> Option<&ElfSymbol> {
        self.by_name
            .get(name)
            .and_then(|&idx| self.symbols.get(idx))
    }

    /// Get a symbol's value by name
    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.by_name(name).map(|s| s.st_value)
    }

    /// Count total symbols
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

/// Parse a single symbol entry
fn parse_symbol(data: &[u8], class: ElfClass, endian: Endian) -> Result<ElfSymbol> {
    match class {
        ElfClass::Elf32 => {
            if data.len() < 16 {
                return Err(ElfError::Truncated {
                    offset: 0,
                    needed: 16,
                });
            }
            Ok(ElfSymbol {
                st_name: data.read_u32(0, endian)?,
                st_value: data.read_u32(4, endian)? as u64,
                st_size: data.read_u32(8, endian)? as u64,
                st_info: data[12],
                st_other: data[13],
                st_shndx: data.read_u16(14, endian)?,
            })
        }
        ElfClass::Elf64 => {
            if data.len() < 24 {
                return Err(ElfError::Truncated {
                    offset: 0,
                    needed: 24,
                });
            }
            Ok(ElfSymbol {
                st_name: data.read_u32(0, endian)?,
                st_info: data[4],
                st_other: data[5],
                st_shndx: data.read_u16(6, endian)?,
                st_value: data.read_u64(8, endian)?,
                st_size: data.read_u64(16, endian)?,
            })
        }
    }
}
