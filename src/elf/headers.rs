//! ELF header parsing

use crate::elf::types::*;
use crate::elf::utils::EndianRead;
use crate::endian::Endian;

/// Parse ELF identification bytes
pub fn parse_ident(data: &[u8]) -> Result<ElfIdent> {
    if data.len() < 16 {
        return Err(ElfError::Truncated {
            offset: 0,
            needed: 16,
        });
    }

    if &data[0..4] != ELF_MAGIC {
        return Err(ElfError::InvalidMagic);
    }

    let class = ElfClass::from_u8(data[4])?;
    let endian = match data[5] {
        1 => Endian::Little,
        2 => Endian::Big,
        other => return Err(ElfError::UnsupportedData(other)),
    };

    Ok(ElfIdent {
        class,
        data: endian,
        version: data[6],
        osabi: data[7],
        abiversion: data[8],
    })
}

/// Parse ELF header
pub fn parse_header(data: &[u8]) -> Result<ElfHeader> {
    let ident = parse_ident(data)?;

    let header_size = match ident.class {
        ElfClass::Elf32 => 52,
        ElfClass::Elf64 => 64,
    };

    if data.len() < header_size {
        return Err(ElfError::Truncated {
            offset: 0,
            needed: header_size,
        });
    }

    let endian = ident.data;

    let e_type = data.read_u16(16, endian)?;
    let e_machine = data.read_u16(18, endian)?;
    let e_version = data.read_u32(20, endian)?;

    let (
        e_entry,
        e_phoff,
        e_shoff,
        e_flags,
        e_ehsize,
        e_phentsize,
        e_phnum,
        e_shentsize,
        e_shnum,
        e_shstrndx,
    ) = match ident.class {
        ElfClass::Elf32 => (
            data.read_u32(24, endian)? as u64,
            data.read_u32(28, endian)? as u64,
            data.read_u32(32, endian)? as u64,
            data.read_u32(36, endian)?,
            data.read_u16(40, endian)?,
            data.read_u16(42, endian)?,
            data.read_u16(44, endian)?,
            data.read_u16(46, endian)?,
            data.read_u16(48, endian)?,
            data.read_u16(50, endian)?,
        ),
        ElfClass::Elf64 => (
            data.read_u64(24, endian)?,
            data.read_u64(32, endian)?,
            data.read_u64(40, endian)?,
            data.read_u32(48, endian)?,
            data.read_u16(52, endian)?,
            data.read_u16(54, endian)?,
            data.read_u16(56, endian)?,
            data.read_u16(58, endian)?,
            data.read_u16(60, endian)?,
            data.read_u16(62, endian)?,
        ),
    };

    if e_ehsize as usize != header_size {
        return Err(ElfError::MalformedHeader(format!(
            "Invalid e_ehsize: expected {}, got {}",
            header_size, e_ehsize
        )));
    }

    let expected_phentsize = match ident.class {
        ElfClass::Elf32 => 32,
        ElfClass::Elf64 => 56,
    };
    if e_phnum > 0 && e_phentsize as usize != expected_phentsize {
        return Err(ElfError::MalformedHeader(format!(
            "Invalid e_phentsize: expected {}, got {}",
            expected_phentsize, e_phentsize
        )));
    }

    let expected_shentsize = match ident.class {
        ElfClass::Elf32 => 40,
        ElfClass::Elf64 => 64,
    };
    if e_shnum > 0 && e_shentsize as usize != expected_shentsize {
        return Err(ElfError::MalformedHeader(format!(
            "Invalid e_shentsize: expected {}, got {}",
            expected_shentsize, e_shentsize
        )));
    }

    Ok(ElfHeader {
        ident,
        e_type,
        e_machine,
        e_version,
        e_entry,
        e_phoff,
        e_shoff,
        e_flags,
        e_ehsize,
        e_phentsize,
        e_phnum,
        e_shentsize,
        e_shnum,
        e_shstrndx,
    })
}
