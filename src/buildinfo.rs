//! Build-info decoding: toolchain version and module graph.
//!
//! Since Go 1.12 every binary embeds a `buildinfo` section describing
//! the toolchain that produced it and the module graph it was built
//! from. Go 1.18 switched the payload from virtual-memory string
//! pointers to inline varint-prefixed strings ("pointer-free"); both
//! encodings are handled here.

use serde::{Deserialize, Serialize};

use crate::elf::ElfImage;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::varint;
use crate::version::GoVersion;

/// Magic prefix of the build-info section.
pub const BUILD_INFO_MAGIC: &[u8; 14] = b"\xff Go buildinf:";

/// Offset of the two string pointers in the classic encoding.
const POINTER_OFFSET: usize = 16;
/// Offset of the inline strings in the pointer-free encoding.
const POINTER_FREE_OFFSET: usize = 32;

/// Flag byte: bit 0 selects big-endian, bit 1 the pointer-free encoding.
const FLAG_OFFSET: usize = 15;
const FLAG_BIG_ENDIAN: u8 = 0x1;
const FLAG_POINTER_FREE: u8 = 0x2;

/// The module-info payload is framed by 16-byte sentinels on each side.
const MODULE_INFO_FRAME: usize = 16;

/// One module in the build graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub path: String,
    pub version: String,
    pub sum: String,
    /// Target of a `replace` directive applied to this module.
    pub replace: Option<Box<Module>>,
}

/// The decoded module graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Import path of the main package.
    pub path: String,
    /// The main module, absent if the binary was built outside one.
    pub main: Option<Module>,
    /// Dependency modules in recording order.
    pub deps: Vec<Module>,
}

/// Decoder over a located build-info section.
pub struct BuildInfo<'data> {
    image: ElfImage<'data>,
    section: &'data [u8],
    ptr_size: usize,
    endian: Endian,
    pointer_free: bool,
}

impl<'data> BuildInfo<'data> {
    /// Wrap a build-info section.
    ///
    /// Validates the magic and the embedded pointer width; the image is
    /// kept for resolving the classic encoding's string pointers.
    pub fn new(image: ElfImage<'data>, section: &'data [u8]) -> Result<Self> {
        if section.len() < POINTER_OFFSET || !section.starts_with(BUILD_INFO_MAGIC) {
            return Err(Error::InvalidMagic);
        }

        let ptr_size = section[BUILD_INFO_MAGIC.len()] as usize;
        let flags = section[FLAG_OFFSET];
        let pointer_free = flags & FLAG_POINTER_FREE != 0;

        if !pointer_free && !matches!(ptr_size, 4 | 8) {
            return Err(Error::Parse(format!(
                "invalid build info pointer size {}",
                ptr_size
            )));
        }

        Ok(Self {
            image,
            section,
            ptr_size,
            endian: if flags & FLAG_BIG_ENDIAN != 0 {
                Endian::Big
            } else {
                Endian::Little
            },
            pointer_free,
        })
    }

    /// Raw toolchain version string, e.g. `go1.21.3`.
    pub fn version_string(&self) -> Result<String> {
        let bytes = if !self.pointer_free {
            self.read_indirect_bytes(POINTER_OFFSET)?
        } else {
            self.read_inline_bytes(POINTER_FREE_OFFSET)?.0
        };

        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Parsed toolchain version.
    pub fn version(&self) -> Result<GoVersion> {
        GoVersion::parse(&self.version_string()?)
    }

    /// Decode the module graph.
    pub fn module_info(&self) -> Result<ModuleInfo> {
        let raw = if !self.pointer_free {
            self.read_indirect_bytes(POINTER_OFFSET + self.ptr_size)?
        } else {
            let (_, after_version) = self.read_inline_bytes(POINTER_FREE_OFFSET)?;
            self.read_inline_bytes(after_version)?.0
        };

        if raw.len() < 2 * MODULE_INFO_FRAME {
            return Err(Error::Parse("module info too short".into()));
        }

        // The framing sentinels are not text; strip them before any
        // string interpretation.
        let payload =
            String::from_utf8_lossy(&raw[MODULE_INFO_FRAME..raw.len() - MODULE_INFO_FRAME])
                .into_owned();

        let mut info = ModuleInfo::default();
        for line in payload.split('\n') {
            let mut tokens = line.split('\t');
            match tokens.next() {
                Some("path") => {
                    // Exactly one operand.
                    if let (Some(path), None) = (tokens.next(), tokens.next()) {
                        info.path = path.to_string();
                    }
                }
                Some("mod") => {
                    if let Some(module) = module_record(tokens) {
                        info.main = Some(module);
                    }
                }
                Some("dep") => {
                    if let Some(module) = module_record(tokens) {
                        info.deps.push(module);
                    }
                }
                Some("=>") => {
                    // A replace directive binds to the dep recorded
                    // just before it; stray ones are dropped.
                    if let (Some(module), Some(dep)) =
                        (module_record(tokens), info.deps.last_mut())
                    {
                        dep.replace = Some(Box::new(module));
                    }
                }
                _ => {}
            }
        }

        Ok(info)
    }

    /// Resolve a classic-form string: a pointer in the section leads to
    /// a `(data, len)` descriptor in target memory, which leads to the
    /// bytes.
    fn read_indirect_bytes(&self, offset: usize) -> Result<&'data [u8]> {
        let descriptor_addr = self.read_section_word(offset)?;

        let descriptor = self
            .image
            .read_virtual_memory(descriptor_addr, 2 * self.ptr_size as u64)?;
        let data_addr = self.word_at(descriptor, 0)?;
        let len = self.word_at(descriptor, self.ptr_size)?;

        self.image.read_virtual_memory(data_addr, len)
    }

    /// Read a varint-length-prefixed string at `offset` in the section;
    /// returns the bytes and the offset just past them.
    fn read_inline_bytes(&self, offset: usize) -> Result<(&'data [u8], usize)> {
        let tail = self.section.get(offset..).ok_or(Error::Truncated {
            offset: offset as u64,
            needed: 1,
        })?;
        let (len, prefix) = varint::read_uvarint(tail)?;

        let start = offset + prefix;
        let end = start
            .checked_add(len as usize)
            .filter(|&end| end <= self.section.len())
            .ok_or(Error::Truncated {
                offset: start as u64,
                needed: len as usize,
            })?;

        Ok((&self.section[start..end], end))
    }

    fn read_section_word(&self, offset: usize) -> Result<u64> {
        self.endian
            .read_word(self.section, offset, self.ptr_size)
            .ok_or(Error::Truncated {
                offset: offset as u64,
                needed: self.ptr_size,
            })
    }

    fn word_at(&self, data: &[u8], offset: usize) -> Result<u64> {
        self.endian
            .read_word(data, offset, self.ptr_size)
            .ok_or(Error::Truncated {
                offset: offset as u64,
                needed: self.ptr_size,
            })
    }
}

/// Parse the `path <TAB> version <TAB> sum` tail of a module record.
///
/// Records with the wrong operand count are skipped, not fatal.
fn module_record<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<Module> {
    let path = tokens.next()?;
    let version = tokens.next()?;
    let sum = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }

    Some(Module {
        path: path.to_string(),
        version: version.to_string(),
        sum: sum.to_string(),
        replace: None,
    })
}
