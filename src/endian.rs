//! Byte-order handling for values read out of a foreign image.
//!
//! Every multi-byte quantity in an ELF image or a PCLN table is stored
//! in the target's byte order, which need not match the host. The
//! [`Endian`] tag carries that order and converts on every read.

/// Byte order of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn is_little(self) -> bool {
        matches!(self, Endian::Little)
    }

    /// Convert two raw bytes in target order.
    pub fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        }
    }

    /// Convert four raw bytes in target order.
    pub fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        }
    }

    /// Convert eight raw bytes in target order.
    pub fn u64(self, bytes: [u8; 8]) -> u64 {
        match self {
            Endian::Little => u64::from_le_bytes(bytes),
            Endian::Big => u64::from_be_bytes(bytes),
        }
    }

    /// Read a converted `u16` at `offset`, or `None` past the end.
    pub fn read_u16(self, data: &[u8], offset: usize) -> Option<u16> {
        let bytes = data.get(offset..offset.checked_add(2)?)?;
        Some(self.u16(bytes.try_into().ok()?))
    }

    /// Read a converted `u32` at `offset`, or `None` past the end.
    pub fn read_u32(self, data: &[u8], offset: usize) -> Option<u32> {
        let bytes = data.get(offset..offset.checked_add(4)?)?;
        Some(self.u32(bytes.try_into().ok()?))
    }

    /// Read a converted `u64` at `offset`, or `None` past the end.
    pub fn read_u64(self, data: &[u8], offset: usize) -> Option<u64> {
        let bytes = data.get(offset..offset.checked_add(8)?)?;
        Some(self.u64(bytes.try_into().ok()?))
    }

    /// Read a pointer-width value at `offset`.
    ///
    /// `width` must be 4 or 8; anything else is a programmer error.
    pub fn read_word(self, data: &[u8], offset: usize, width: usize) -> Option<u64> {
        match width {
            4 => self.read_u32(data, offset).map(u64::from),
            8 => self.read_u64(data, offset),
            _ => {
                debug_assert!(false, "word width must be 4 or 8, got {}", width);
                None
            }
        }
    }
}
