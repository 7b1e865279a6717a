//! Per-function metadata view and the PC-program evaluator.

use crate::error::{Error, Result};
use crate::pcln::source::TableSource;
use crate::pcln::table::SymbolTable;
use crate::pcln::PclnVersion;
use crate::varint::{self, MAX_VARINT_LEN};

/// Functions that sit at the top of a goroutine stack.
const STACK_TOP_FUNCTIONS: [&str; 8] = [
    "runtime.mstart",
    "runtime.rt0_go",
    "runtime.mcall",
    "runtime.morestack",
    "runtime.lessstack",
    "runtime.asmcgocall",
    "runtime.externalthreadhandler",
    "runtime.goexit",
];

/// Zero-copy accessor for one function's metadata record.
///
/// Borrows the table; nothing is decoded until asked for.
pub struct Symbol<'table> {
    table: &'table SymbolTable,
    record: u64,
}

impl<'table> Symbol<'table> {
    pub(crate) fn new(table: &'table SymbolTable, record: u64) -> Self {
        Self { table, record }
    }

    fn entry_width(&self) -> u64 {
        self.table.version().entry_size(self.table.ptr_size())
    }

    /// Relocated entry PC of the function.
    pub fn entry_pc(&self) -> Result<u64> {
        let stored = self.table.source().read_word(
            self.record,
            self.entry_width() as u32,
            self.table.endian(),
        )?;
        Ok(self.table.base().wrapping_add(stored))
    }

    /// The `n`-th 32-bit field of the record; fields follow the
    /// entry-width PC at offset 0 and `n` counts from 1.
    pub fn field(&self, n: u32) -> Result<u32> {
        debug_assert!(n >= 1, "record fields are numbered from 1");
        let addr = self.record + self.entry_width() + u64::from(n - 1) * 4;
        self.table.source().read_u32(addr, self.table.endian())
    }

    /// Function name.
    pub fn name(&self) -> Result<String> {
        let name_offset = self.field(1)?;
        self.table
            .source()
            .read_cstring(self.table.func_name_table() + u64::from(name_offset))
    }

    /// Stack-frame size at `pc`, in bytes.
    ///
    /// Zero when the function has no frame program, the program has no
    /// value at `pc`, or the value is not a multiple of the pointer
    /// width.
    pub fn frame_size(&self, pc: u64) -> Result<u64> {
        let sp = self.field(4)?;
        if sp == 0 {
            return Ok(0);
        }

        let value = self.pc_value(sp, self.entry_pc()?, pc)?;
        if value == -1 {
            return Ok(0);
        }
        if value as u64 & u64::from(self.table.ptr_size() - 1) != 0 {
            return Ok(0);
        }

        Ok(value as u64)
    }

    /// Source line covering `pc`, or -1 when the line program has no
    /// value there.
    pub fn source_line(&self, pc: u64) -> Result<i64> {
        self.pc_value(self.field(6)?, self.entry_pc()?, pc)
    }

    /// Source file name covering `pc`, or the empty string when the
    /// file program has no value there.
    pub fn source_file(&self, pc: u64) -> Result<String> {
        let n = self.pc_value(self.field(5)?, self.entry_pc()?, pc)?;

        if n < 0 || n as u64 > self.table.file_num() {
            return Ok(String::new());
        }

        if self.table.version() == PclnVersion::V12 {
            if n == 0 {
                return Ok(String::new());
            }
            let offset = self
                .table
                .source()
                .read_u32(self.table.file_table() + 4 * n as u64, self.table.endian())?;
            return self
                .table
                .source()
                .read_cstring(self.table.func_data() + u64::from(offset));
        }

        // V1.16+: the file number indexes this function's compilation
        // unit's slice of the cu table.
        let cu_index = u64::from(self.field(8)?) + n as u64;
        let offset = self
            .table
            .source()
            .read_u32(self.table.cu_table() + 4 * cu_index, self.table.endian())?;
        if offset == 0 {
            return Ok(String::new());
        }

        self.table
            .source()
            .read_cstring(self.table.file_table() + u64::from(offset))
    }

    /// Whether this function terminates a stack walk.
    pub fn is_stack_top(&self) -> Result<bool> {
        let name = self.name()?;
        Ok(STACK_TOP_FUNCTIONS.iter().any(|&top| top == name))
    }

    /// Evaluate the PC program at `offset` in the pc table for `target`,
    /// with the PC sequence starting at `entry`.
    ///
    /// Returns the program value covering `target`, or -1 when the
    /// program ends first or its encoding is malformed; only genuine
    /// I/O failures surface as errors.
    fn pc_value(&self, offset: u32, entry: u64, target: u64) -> Result<i64> {
        let mut program = ProgramReader::new(
            self.table.source(),
            self.table.pc_table() + u64::from(offset),
        );

        let mut value: i64 = -1;
        let mut pc = entry;

        loop {
            let Some(delta) = program.next_varint()? else {
                return Ok(-1);
            };
            // The first zero delta after the initial pair ends the program.
            if delta == 0 && pc != entry {
                return Ok(-1);
            }
            value = value.wrapping_add(delta);

            let Some(advance) = program.next_uvarint()? else {
                return Ok(-1);
            };
            pc = pc.wrapping_add(advance.wrapping_mul(u64::from(self.table.quantum())));

            if target < pc {
                return Ok(value);
            }
        }
    }
}

/// Buffer size for the windowed program reader.
const PROGRAM_WINDOW: usize = 64;

/// Streaming varint reader over a byte source.
///
/// Keeps a small window of program bytes and tops it up whenever fewer
/// than two maximum-length varints remain unconsumed, copying the tail
/// forward and refilling the rest, so the file backend advances without
/// re-reading from the program start.
struct ProgramReader<'source> {
    source: &'source TableSource,
    next: u64,
    buf: [u8; PROGRAM_WINDOW],
    len: usize,
    pos: usize,
}

impl<'source> ProgramReader<'source> {
    fn new(source: &'source TableSource, addr: u64) -> Self {
        Self {
            source,
            next: addr,
            buf: [0u8; PROGRAM_WINDOW],
            len: 0,
            pos: 0,
        }
    }

    fn top_up(&mut self) -> Result<()> {
        if self.len - self.pos >= 2 * MAX_VARINT_LEN {
            return Ok(());
        }

        self.buf.copy_within(self.pos..self.len, 0);
        self.len -= self.pos;
        self.pos = 0;

        let filled = self.source.read_at(self.next, &mut self.buf[self.len..])?;
        self.next += filled as u64;
        self.len += filled;

        Ok(())
    }

    /// Decode the next signed varint; `None` when the window is
    /// exhausted or the encoding is malformed.
    fn next_varint(&mut self) -> Result<Option<i64>> {
        self.top_up()?;
        match varint::read_varint(&self.buf[self.pos..self.len]) {
            Ok((value, used)) => {
                self.pos += used;
                Ok(Some(value))
            }
            Err(Error::MalformedVarint) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Decode the next unsigned varint; `None` when the window is
    /// exhausted or the encoding is malformed.
    fn next_uvarint(&mut self) -> Result<Option<u64>> {
        self.top_up()?;
        match varint::read_uvarint(&self.buf[self.pos..self.len]) {
            Ok((value, used)) => {
                self.pos += used;
                Ok(Some(value))
            }
            Err(Error::MalformedVarint) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
