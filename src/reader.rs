//! Reader façade over an opened ELF file.
//!
//! Locates the Go metadata sections inside the image, picks the right
//! decoder revision, and hands out symbol tables under the caller's
//! chosen access strategy.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::buildinfo::BuildInfo;
use crate::elf::{ElfImage, Section};
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::pcln::{PclnVersion, SymbolTable, TableData, TableSource};
use crate::version::GoVersion;

const SYMBOL_SECTION: &str = "gopclntab";
const BUILD_INFO_SECTION: &str = "buildinfo";
const INTERFACE_SECTION: &str = "itablink";

const VERSION_SYMBOL: &str = "runtime.buildVersion";
const TYPES_SYMBOL: &str = "runtime.types";

/// Everything before go1.7 predates the metadata shapes decoded here.
const MIN_SUPPORTED: GoVersion = GoVersion { major: 1, minor: 7 };

const PAGE_SIZE: u64 = 0x1000;

/// How a symbol table reads the PCLN section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMethod {
    /// Share the reader's memory mapping of the file.
    FileMapping,
    /// Copy the section into an owned buffer once.
    AnonymousMemory,
    /// Read the image already mapped in this address space at the
    /// caller's load base. The caller must guarantee that mapping
    /// stays valid for the table's lifetime.
    Attached,
}

/// An opened Go binary.
pub struct GoReader {
    path: PathBuf,
    map: Arc<Mmap>,
}

impl GoReader {
    /// Open and memory-map an ELF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|err| {
            warn!(path = %path.display(), error = %err, "open failed");
            err
        })?;

        if file.metadata()?.len() == 0 {
            return Err(Error::Parse(format!("empty file: {}", path.display())));
        }

        // Safety: read-only map of a regular file; the file must not be
        // truncated while the reader is alive.
        let map = unsafe { Mmap::map(&file)? };

        Ok(Self {
            path: path.to_path_buf(),
            map: Arc::new(map),
        })
    }

    /// Path the reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn image(&self) -> Result<ElfImage<'_>> {
        Ok(ElfImage::parse(&self.map)?)
    }

    /// Toolchain version of the binary.
    ///
    /// Prefers the build-info blob; older binaries fall back to the
    /// `runtime.buildVersion` string resolved through the ordinary
    /// symbol table.
    pub fn version(&self) -> Result<GoVersion> {
        match self.build_info().and_then(|info| info.version()) {
            Ok(version) => return Ok(version),
            Err(err) => debug!(error = %err, "build info unavailable, trying symtab"),
        }

        let image = self.image()?;

        let symtab = image
            .symtab()?
            .ok_or_else(|| Error::SectionNotFound(".symtab".into()))?;
        debug!(symbols = symtab.count(), "scanning ordinary symbol table");
        let descriptor_addr = symtab
            .value_of(VERSION_SYMBOL)
            .ok_or_else(|| Error::SymbolNotFound(VERSION_SYMBOL.into()))?;

        // runtime.buildVersion is a Go string header: (data, len).
        let ptr_size = image.ptr_size();
        let endian = image.endian();

        let descriptor = image.read_virtual_memory(descriptor_addr, 2 * ptr_size as u64)?;
        let data_addr = endian
            .read_word(descriptor, 0, ptr_size)
            .ok_or(Error::Truncated {
                offset: 0,
                needed: ptr_size,
            })?;
        let len = endian
            .read_word(descriptor, ptr_size, ptr_size)
            .ok_or(Error::Truncated {
                offset: ptr_size as u64,
                needed: ptr_size,
            })?;

        let bytes = image.read_virtual_memory(data_addr, len)?;
        GoVersion::parse(&String::from_utf8_lossy(bytes))
    }

    /// Locate and wrap the build-info section.
    pub fn build_info(&self) -> Result<BuildInfo<'_>> {
        let image = self.image()?;

        let section = image
            .sections()?
            .by_name_contains(BUILD_INFO_SECTION)
            .ok_or_else(|| {
                warn!("build info section not found");
                Error::SectionNotFound(BUILD_INFO_SECTION.into())
            })?;

        BuildInfo::new(image, section.data).map_err(|err| {
            warn!(section = section.name(), error = %err, "invalid build info");
            err
        })
    }

    /// Decode the PCLN symbol table under the chosen access strategy.
    ///
    /// `base` is the load address of the image for position-independent
    /// binaries; it is ignored for fixed-address executables. With
    /// [`AccessMethod::Attached`] the section is read straight out of
    /// this process at `base`-relative addresses, and the caller must
    /// guarantee the image is mapped there for the table's lifetime.
    pub fn symbols(&self, method: AccessMethod, base: u64) -> Result<SymbolTable> {
        let image = self.image()?;
        let (section, version, endian) = self.locate_symbol_section(&image)?;

        let data = match method {
            AccessMethod::FileMapping => TableData::Mapped {
                map: Arc::clone(&self.map),
                offset: section.file_offset() as usize,
                len: section.size() as usize,
            },
            AccessMethod::AnonymousMemory => TableData::Owned(section.data.to_vec()),
            AccessMethod::Attached => {
                let live = if image.is_pie() {
                    base.wrapping_add(section.addr())
                        .wrapping_sub(self.min_load_vaddr(&image)?)
                } else {
                    section.addr()
                };
                TableData::Attached {
                    addr: live as usize,
                    len: section.size() as usize,
                }
            }
        };

        // Under the attached strategy entry PCs are already absolute.
        let base = match method {
            AccessMethod::Attached => 0,
            _ => self.effective_base(&image, base)?,
        };

        SymbolTable::new(version, endian, TableSource::new(data, section.addr()), base)
    }

    /// Decode the PCLN symbol table through a freshly opened file
    /// handle, without mapping the section.
    ///
    /// The handle's seek cursor is shared state, so the resulting table
    /// must stay on one thread.
    pub fn symbols_seek(&self, base: u64) -> Result<SymbolTable> {
        let image = self.image()?;
        let (section, version, endian) = self.locate_symbol_section(&image)?;
        let effective_base = self.effective_base(&image, base)?;

        let file = File::open(&self.path).map_err(|err| {
            warn!(path = %self.path.display(), error = %err, "reopen failed");
            err
        })?;

        let data = TableData::File {
            file: std::cell::RefCell::new(file),
            offset: section.file_offset(),
            len: section.size(),
        };

        SymbolTable::new(
            version,
            endian,
            TableSource::new(data, section.addr()),
            effective_base,
        )
    }

    /// Locate the interface table (`itablink`) of the binary.
    ///
    /// `base` is interpreted as for [`GoReader::symbols`].
    pub fn interfaces(&self, base: u64) -> Result<InterfaceTable<'_>> {
        let version = self.version()?;
        if version < MIN_SUPPORTED {
            warn!(%version, "interface tables unsupported before go1.7");
            return Err(Error::UnsupportedVersion(format!(
                "{} is below the supported {}",
                version, MIN_SUPPORTED
            )));
        }

        let image = self.image()?;

        let section = image
            .sections()?
            .by_name_contains(INTERFACE_SECTION)
            .ok_or_else(|| {
                warn!("interface section not found");
                Error::SectionNotFound(INTERFACE_SECTION.into())
            })?;

        let symtab = image
            .symtab()?
            .ok_or_else(|| Error::SectionNotFound(".symtab".into()))?;
        let types = symtab.value_of(TYPES_SYMBOL).ok_or_else(|| {
            warn!(symbols = symtab.count(), "runtime.types not found");
            Error::SymbolNotFound(TYPES_SYMBOL.into())
        })?;

        let effective_base = self.effective_base(&image, base)?;

        Ok(InterfaceTable {
            data: section.data,
            endian: image.endian(),
            ptr_size: image.ptr_size(),
            types,
            base: effective_base,
        })
    }

    fn locate_symbol_section<'d>(
        &self,
        image: &ElfImage<'d>,
    ) -> Result<(Section<'d>, PclnVersion, Endian)> {
        let section = image
            .sections()?
            .by_name_contains(SYMBOL_SECTION)
            .ok_or_else(|| {
                warn!("symbol section not found");
                Error::SectionNotFound(SYMBOL_SECTION.into())
            })?;

        let (version, endian) = PclnVersion::sniff(section.data)?;
        debug!(
            section = section.name(),
            ?version,
            ?endian,
            "located symbol section"
        );

        Ok((section, version, endian))
    }

    fn min_load_vaddr(&self, image: &ElfImage<'_>) -> Result<u64> {
        let min = image
            .min_load_vaddr()?
            .ok_or_else(|| Error::Parse("no loadable segments".into()))?;
        Ok(min & !(PAGE_SIZE - 1))
    }

    /// Relocation offset for stored entry PCs: the distance between the
    /// runtime load base and the link-time minimum LOAD address, or
    /// zero for fixed-address executables.
    fn effective_base(&self, image: &ElfImage<'_>, base: u64) -> Result<u64> {
        if !image.is_pie() {
            return Ok(0);
        }
        Ok(base.wrapping_sub(self.min_load_vaddr(image)?))
    }
}

/// Addresses of the interface tables linked into the binary.
///
/// Each entry points at one `itab`; decoding the pointees needs the
/// type graph and is out of scope here.
pub struct InterfaceTable<'data> {
    data: &'data [u8],
    endian: Endian,
    ptr_size: usize,
    types: u64,
    base: u64,
}

impl InterfaceTable<'_> {
    /// Number of interface-table entries.
    pub fn len(&self) -> usize {
        self.data.len() / self.ptr_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Relocated address of entry `index`.
    pub fn address(&self, index: usize) -> Result<u64> {
        let offset = index * self.ptr_size;
        let stored = self
            .endian
            .read_word(self.data, offset, self.ptr_size)
            .ok_or(Error::Truncated {
                offset: offset as u64,
                needed: self.ptr_size,
            })?;
        Ok(stored.wrapping_add(self.base))
    }

    /// Relocated address of `runtime.types`, the base for type offsets
    /// inside each itab.
    pub fn types_address(&self) -> u64 {
        self.types.wrapping_add(self.base)
    }
}
