//! Common test utilities: synthetic PCLN tables and ELF images.
//!
//! Every fixture is hand-assembled from bytes so the tests pin the
//! on-disk layouts rather than echoing the decoder's own arithmetic.

#![allow(dead_code)]

use gosym::pcln::{MAGIC_V116, MAGIC_V118, MAGIC_V12, MAGIC_V120};
use gosym::{Endian, PclnVersion};

pub fn encode_uvarint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn encode_varint(value: i64, out: &mut Vec<u8>) {
    encode_uvarint(((value << 1) ^ (value >> 63)) as u64, out);
}

/// Append `(value, covered_bytes)` runs as a PC program, terminator
/// included, returning the program's offset within `region`.
pub fn encode_program(runs: &[(i64, u64)], quantum: u8, region: &mut Vec<u8>) -> u32 {
    let offset = region.len() as u32;

    let mut previous = -1i64;
    for &(value, length) in runs {
        assert_eq!(length % u64::from(quantum), 0, "run must cover whole instructions");
        encode_varint(value - previous, region);
        encode_uvarint(length / u64::from(quantum), region);
        previous = value;
    }
    region.push(0);

    offset
}

fn put_u32(out: &mut Vec<u8>, endian: Endian, value: u32) {
    match endian {
        Endian::Little => out.extend_from_slice(&value.to_le_bytes()),
        Endian::Big => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn put_word(out: &mut Vec<u8>, endian: Endian, width: u8, value: u64) {
    match (endian, width) {
        (Endian::Little, 4) => out.extend_from_slice(&(value as u32).to_le_bytes()),
        (Endian::Big, 4) => out.extend_from_slice(&(value as u32).to_be_bytes()),
        (Endian::Little, 8) => out.extend_from_slice(&value.to_le_bytes()),
        (Endian::Big, 8) => out.extend_from_slice(&value.to_be_bytes()),
        _ => panic!("unsupported word width {}", width),
    }
}

/// One function in a synthetic table.
#[derive(Clone)]
pub struct FuncSpec {
    pub name: String,
    /// Stored entry value (pre-relocation; text-relative for V1.18+).
    pub entry: u64,
    /// Bytes of code the function covers.
    pub size: u64,
    /// Index into [`TableSpec::files`].
    pub file_index: usize,
    /// `(line, covered_bytes)` runs.
    pub lines: Vec<(i64, u64)>,
    /// `(frame_size, covered_bytes)` runs; empty means no frame program.
    pub frames: Vec<(i64, u64)>,
}

impl FuncSpec {
    pub fn new(name: &str, entry: u64, size: u64) -> Self {
        Self {
            name: name.to_string(),
            entry,
            size,
            file_index: 0,
            lines: vec![(1, size)],
            frames: Vec::new(),
        }
    }

    pub fn with_file(mut self, index: usize) -> Self {
        self.file_index = index;
        self
    }

    pub fn with_lines(mut self, lines: &[(i64, u64)]) -> Self {
        self.lines = lines.to_vec();
        self
    }

    pub fn with_frames(mut self, frames: &[(i64, u64)]) -> Self {
        self.frames = frames.to_vec();
        self
    }
}

/// A whole synthetic PCLN table.
pub struct TableSpec {
    pub version: PclnVersion,
    pub endian: Endian,
    pub ptr_size: u8,
    pub quantum: u8,
    /// Header `textStart`, V1.18+ only.
    pub text_start: u64,
    pub funcs: Vec<FuncSpec>,
    /// Sentinel entry value terminating the last function's range.
    pub end: u64,
    pub files: Vec<String>,
}

impl TableSpec {
    pub fn new(version: PclnVersion, funcs: Vec<FuncSpec>, end: u64) -> Self {
        Self {
            version,
            endian: Endian::Little,
            ptr_size: 8,
            quantum: 1,
            text_start: 0,
            funcs,
            end,
            files: vec!["main.go".to_string(), "util.go".to_string()],
        }
    }

    pub fn magic(&self) -> u32 {
        match self.version {
            PclnVersion::V12 => MAGIC_V12,
            PclnVersion::V116 => MAGIC_V116,
            PclnVersion::V118 => MAGIC_V118,
            PclnVersion::V120 => MAGIC_V120,
        }
    }

    /// Serialize the table to section bytes.
    pub fn build(&self) -> Vec<u8> {
        match self.version {
            PclnVersion::V12 => self.build_v12(),
            PclnVersion::V116 => self.build_v116(),
            PclnVersion::V118 | PclnVersion::V120 => self.build_v118(),
        }
    }

    fn header_prefix(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u32(&mut out, self.endian, self.magic());
        out.extend_from_slice(&[0, 0]);
        out.push(self.quantum);
        out.push(self.ptr_size);
        out
    }

    /// Function name region plus each function's offset into it.
    fn name_region(&self) -> (Vec<u8>, Vec<u32>) {
        let mut region = Vec::new();
        let mut offsets = Vec::new();
        for func in &self.funcs {
            offsets.push(region.len() as u32);
            region.extend_from_slice(func.name.as_bytes());
            region.push(0);
        }
        (region, offsets)
    }

    /// PC programs for every function: `(region, [(pcsp, pcfile, pcln)])`.
    ///
    /// Offset zero is reserved so that a zero field always means "no
    /// program".
    fn pc_region(&self, file_value: impl Fn(usize) -> i64) -> (Vec<u8>, Vec<(u32, u32, u32)>) {
        let mut region = vec![0u8];
        let mut offsets = Vec::new();
        for func in &self.funcs {
            let pcsp = if func.frames.is_empty() {
                0
            } else {
                encode_program(&func.frames, self.quantum, &mut region)
            };
            let pcfile = encode_program(
                &[(file_value(func.file_index), func.size)],
                self.quantum,
                &mut region,
            );
            let pcln = encode_program(&func.lines, self.quantum, &mut region);
            offsets.push((pcsp, pcfile, pcln));
        }
        (region, offsets)
    }

    /// Emit one metadata record: stored entry + eight u32 fields.
    fn put_aux(
        &self,
        out: &mut Vec<u8>,
        entry_width: u8,
        entry: u64,
        name_off: u32,
        programs: (u32, u32, u32),
        cu_offset: u32,
    ) {
        let (pcsp, pcfile, pcln) = programs;
        put_word(out, self.endian, entry_width, entry);
        put_u32(out, self.endian, name_off); // nameoff
        put_u32(out, self.endian, 0); // args
        put_u32(out, self.endian, 0); // deferreturn
        put_u32(out, self.endian, pcsp);
        put_u32(out, self.endian, pcfile);
        put_u32(out, self.endian, pcln);
        put_u32(out, self.endian, 0); // npcdata
        put_u32(out, self.endian, cu_offset);
    }

    fn build_v12(&self) -> Vec<u8> {
        let p = self.ptr_size as u64;
        let n = self.funcs.len() as u64;

        let (names, name_offs) = self.name_region();
        // V12 file numbers are 1-based table slots.
        let (pcs, pc_offs) = self.pc_region(|index| index as i64 + 1);

        let func_table_off = 8 + p;
        let func_table_size = n * 2 * p + p + 4; // records, sentinel entry, file-table offset
        let name_base = func_table_off + func_table_size;
        let pc_base = name_base + names.len() as u64;
        let aux_size = p + 32;
        let aux_base = pc_base + pcs.len() as u64;
        let file_base = aux_base + n * aux_size;

        let mut out = self.header_prefix();
        put_word(&mut out, self.endian, self.ptr_size, n);
        for (i, func) in self.funcs.iter().enumerate() {
            put_word(&mut out, self.endian, self.ptr_size, func.entry);
            put_word(&mut out, self.endian, self.ptr_size, aux_base + i as u64 * aux_size);
        }
        put_word(&mut out, self.endian, self.ptr_size, self.end);
        put_u32(&mut out, self.endian, file_base as u32);

        out.extend_from_slice(&names);
        out.extend_from_slice(&pcs);

        for (i, func) in self.funcs.iter().enumerate() {
            let (pcsp, pcfile, pcln) = pc_offs[i];
            let abs = |off: u32| if off == 0 { 0 } else { pc_base as u32 + off };
            self.put_aux(
                &mut out,
                self.ptr_size,
                func.entry,
                name_base as u32 + name_offs[i],
                (abs(pcsp), abs(pcfile), abs(pcln)),
                0,
            );
        }

        // File table: count, then 1-based slots of section-relative
        // string offsets, then the strings themselves.
        let strings_base = file_base + 4 * (self.files.len() as u64 + 1);
        put_u32(&mut out, self.endian, self.files.len() as u32);
        let mut string_off = strings_base as u32;
        for file in &self.files {
            put_u32(&mut out, self.endian, string_off);
            string_off += file.len() as u32 + 1;
        }
        for file in &self.files {
            out.extend_from_slice(file.as_bytes());
            out.push(0);
        }

        out
    }

    /// File-table region shared by the V1.16+ layouts: a leading NUL so
    /// every real string sits at a non-zero offset, plus the cu table
    /// mapping file numbers to those offsets.
    fn cu_and_file_regions(&self) -> (Vec<u8>, Vec<u8>) {
        let mut file_region = vec![0u8];
        let mut cu_region = Vec::new();
        for file in &self.files {
            put_u32(&mut cu_region, self.endian, file_region.len() as u32);
            file_region.extend_from_slice(file.as_bytes());
            file_region.push(0);
        }
        (cu_region, file_region)
    }

    fn build_v116(&self) -> Vec<u8> {
        let p = self.ptr_size as u64;
        let n = self.funcs.len() as u64;

        let (names, name_offs) = self.name_region();
        let (cus, files) = self.cu_and_file_regions();
        let (pcs, pc_offs) = self.pc_region(|index| index as i64);

        let header_size = 8 + 8 * p;
        let name_base = header_size;
        let cu_base = name_base + names.len() as u64;
        let file_base = cu_base + cus.len() as u64;
        let pc_base = file_base + files.len() as u64;
        let func_data = pc_base + pcs.len() as u64;

        let func_table_size = (n + 1) * 2 * p;
        let aux_size = p + 32;

        let mut out = self.header_prefix();
        put_word(&mut out, self.endian, self.ptr_size, n);
        put_word(&mut out, self.endian, self.ptr_size, self.files.len() as u64);
        for offset in [name_base, cu_base, file_base, pc_base, func_data] {
            put_word(&mut out, self.endian, self.ptr_size, offset);
        }
        put_word(&mut out, self.endian, self.ptr_size, func_data);

        out.extend_from_slice(&names);
        out.extend_from_slice(&cus);
        out.extend_from_slice(&files);
        out.extend_from_slice(&pcs);

        for (i, func) in self.funcs.iter().enumerate() {
            put_word(&mut out, self.endian, self.ptr_size, func.entry);
            put_word(
                &mut out,
                self.endian,
                self.ptr_size,
                func_table_size + i as u64 * aux_size,
            );
        }
        put_word(&mut out, self.endian, self.ptr_size, self.end);
        put_word(&mut out, self.endian, self.ptr_size, 0);

        for (i, func) in self.funcs.iter().enumerate() {
            self.put_aux(
                &mut out,
                self.ptr_size,
                func.entry,
                name_offs[i],
                pc_offs[i],
                0,
            );
        }

        out
    }

    fn build_v118(&self) -> Vec<u8> {
        let p = self.ptr_size as u64;
        let n = self.funcs.len() as u64;

        let (names, name_offs) = self.name_region();
        let (cus, files) = self.cu_and_file_regions();
        let (pcs, pc_offs) = self.pc_region(|index| index as i64);

        let header_size = 8 + 8 * p;
        let name_base = header_size;
        let cu_base = name_base + names.len() as u64;
        let file_base = cu_base + cus.len() as u64;
        let pc_base = file_base + files.len() as u64;
        let func_data = pc_base + pcs.len() as u64;

        // 32-bit records regardless of pointer width.
        let func_table_size = (n + 1) * 8;
        let aux_size = 4 + 32;

        let mut out = self.header_prefix();
        put_word(&mut out, self.endian, self.ptr_size, n);
        put_word(&mut out, self.endian, self.ptr_size, self.files.len() as u64);
        put_word(&mut out, self.endian, self.ptr_size, self.text_start);
        for offset in [name_base, cu_base, file_base, pc_base, func_data] {
            put_word(&mut out, self.endian, self.ptr_size, offset);
        }
        put_word(&mut out, self.endian, self.ptr_size, func_data);

        out.extend_from_slice(&names);
        out.extend_from_slice(&cus);
        out.extend_from_slice(&files);
        out.extend_from_slice(&pcs);

        for (i, func) in self.funcs.iter().enumerate() {
            put_u32(&mut out, self.endian, func.entry as u32);
            put_u32(
                &mut out,
                self.endian,
                (func_table_size + i as u64 * aux_size) as u32,
            );
        }
        put_u32(&mut out, self.endian, self.end as u32);
        put_u32(&mut out, self.endian, 0);

        for (i, func) in self.funcs.iter().enumerate() {
            self.put_aux(&mut out, 4, func.entry, name_offs[i], pc_offs[i], 0);
        }

        out
    }
}

/// A section in a synthetic 64-bit little-endian ELF image.
pub struct SectionSpec {
    pub name: String,
    pub sh_type: u32,
    pub addr: u64,
    pub data: Vec<u8>,
    pub link: u32,
}

impl SectionSpec {
    pub fn progbits(name: &str, addr: u64, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            sh_type: 1, // SHT_PROGBITS
            addr,
            data,
            link: 0,
        }
    }
}

/// Assemble a 64-bit little-endian ELF image.
///
/// `loads` lists indices into `sections` that also get a PT_LOAD
/// segment covering the section's bytes at its virtual address.
pub fn build_elf(e_type: u16, sections: &[SectionSpec], loads: &[usize]) -> Vec<u8> {
    let ehsize = 64usize;
    let phentsize = 56usize;
    let shentsize = 64usize;

    let phoff = ehsize;
    let data_start = phoff + loads.len() * phentsize;

    // Lay out section data, 8-byte aligned.
    let mut offsets = Vec::new();
    let mut cursor = data_start;
    for section in sections {
        cursor = (cursor + 7) & !7;
        offsets.push(cursor);
        cursor += section.data.len();
    }

    // Section name strings: NULL name, the sections, .shstrtab itself.
    let mut shstrtab = vec![0u8];
    let mut name_offs = Vec::new();
    for section in sections {
        name_offs.push(shstrtab.len() as u32);
        shstrtab.extend_from_slice(section.name.as_bytes());
        shstrtab.push(0);
    }
    let shstrtab_name_off = shstrtab.len() as u32;
    shstrtab.extend_from_slice(b".shstrtab\0");

    cursor = (cursor + 7) & !7;
    let shstrtab_off = cursor;
    cursor += shstrtab.len();

    cursor = (cursor + 7) & !7;
    let shoff = cursor;
    let shnum = sections.len() + 2;

    let mut out = vec![0u8; shoff + shnum * shentsize];

    // ELF header
    out[0..4].copy_from_slice(b"\x7fELF");
    out[4] = 2; // ELFCLASS64
    out[5] = 1; // ELFDATA2LSB
    out[6] = 1; // EV_CURRENT
    out[16..18].copy_from_slice(&e_type.to_le_bytes());
    out[18..20].copy_from_slice(&62u16.to_le_bytes()); // EM_X86_64
    out[20..24].copy_from_slice(&1u32.to_le_bytes());
    out[32..40].copy_from_slice(&(phoff as u64).to_le_bytes());
    out[40..48].copy_from_slice(&(shoff as u64).to_le_bytes());
    out[52..54].copy_from_slice(&(ehsize as u16).to_le_bytes());
    out[54..56].copy_from_slice(&(phentsize as u16).to_le_bytes());
    out[56..58].copy_from_slice(&(loads.len() as u16).to_le_bytes());
    out[58..60].copy_from_slice(&(shentsize as u16).to_le_bytes());
    out[60..62].copy_from_slice(&(shnum as u16).to_le_bytes());
    out[62..64].copy_from_slice(&((shnum - 1) as u16).to_le_bytes());

    // Program headers
    for (slot, &index) in loads.iter().enumerate() {
        let base = phoff + slot * phentsize;
        let section = &sections[index];
        out[base..base + 4].copy_from_slice(&1u32.to_le_bytes()); // PT_LOAD
        out[base + 4..base + 8].copy_from_slice(&5u32.to_le_bytes()); // PF_R | PF_X
        out[base + 8..base + 16].copy_from_slice(&(offsets[index] as u64).to_le_bytes());
        out[base + 16..base + 24].copy_from_slice(&section.addr.to_le_bytes());
        out[base + 24..base + 32].copy_from_slice(&section.addr.to_le_bytes());
        out[base + 32..base + 40].copy_from_slice(&(section.data.len() as u64).to_le_bytes());
        out[base + 40..base + 48].copy_from_slice(&(section.data.len() as u64).to_le_bytes());
        out[base + 48..base + 56].copy_from_slice(&0x1000u64.to_le_bytes());
    }

    // Section data
    for (section, &offset) in sections.iter().zip(&offsets) {
        out[offset..offset + section.data.len()].copy_from_slice(&section.data);
    }
    out[shstrtab_off..shstrtab_off + shstrtab.len()].copy_from_slice(&shstrtab);

    // Section headers; index 0 stays the NULL section.
    for (i, section) in sections.iter().enumerate() {
        let base = shoff + (i + 1) * shentsize;
        out[base..base + 4].copy_from_slice(&name_offs[i].to_le_bytes());
        out[base + 4..base + 8].copy_from_slice(&section.sh_type.to_le_bytes());
        out[base + 16..base + 24].copy_from_slice(&section.addr.to_le_bytes());
        out[base + 24..base + 32].copy_from_slice(&(offsets[i] as u64).to_le_bytes());
        out[base + 32..base + 40].copy_from_slice(&(section.data.len() as u64).to_le_bytes());
        out[base + 40..base + 44].copy_from_slice(&section.link.to_le_bytes());
    }
    let base = shoff + (shnum - 1) * shentsize;
    out[base..base + 4].copy_from_slice(&shstrtab_name_off.to_le_bytes());
    out[base + 4..base + 8].copy_from_slice(&3u32.to_le_bytes()); // SHT_STRTAB
    out[base + 24..base + 32].copy_from_slice(&(shstrtab_off as u64).to_le_bytes());
    out[base + 32..base + 40].copy_from_slice(&(shstrtab.len() as u64).to_le_bytes());

    out
}

/// A 64-bit `.symtab` + `.strtab` pair from `(name, value)` entries.
pub fn build_symtab(symbols: &[(&str, u64)]) -> (Vec<u8>, Vec<u8>) {
    let mut symtab = vec![0u8; 24]; // NULL symbol
    let mut strtab = vec![0u8];

    for &(name, value) in symbols {
        let name_off = strtab.len() as u32;
        strtab.extend_from_slice(name.as_bytes());
        strtab.push(0);

        let mut entry = [0u8; 24];
        entry[0..4].copy_from_slice(&name_off.to_le_bytes());
        entry[6..8].copy_from_slice(&1u16.to_le_bytes()); // st_shndx: defined
        entry[8..16].copy_from_slice(&value.to_le_bytes());
        symtab.extend_from_slice(&entry);
    }

    (symtab, strtab)
}

/// Pointer-free build-info section bytes.
pub fn build_info_pointer_free(version: &str, module_info: &[u8]) -> Vec<u8> {
    let mut section = vec![0u8; 32];
    section[..14].copy_from_slice(b"\xff Go buildinf:");
    section[14] = 8;
    section[15] = 0x2;

    let mut tail = Vec::new();
    encode_uvarint(version.len() as u64, &mut tail);
    tail.extend_from_slice(version.as_bytes());
    encode_uvarint(module_info.len() as u64, &mut tail);
    tail.extend_from_slice(module_info);

    section.extend_from_slice(&tail);
    section
}

/// Frame a module-info payload with the 16-byte sentinels the runtime
/// writes around it.
pub fn frame_module_info(payload: &str) -> Vec<u8> {
    let mut raw = vec![0xccu8; 16];
    raw.extend_from_slice(payload.as_bytes());
    raw.extend_from_slice(&[0xccu8; 16]);
    raw
}
