#![no_main]
use libfuzzer_sys::fuzz_target;

use gosym::pcln::{PclnVersion, SymbolTable, TableData, TableSource};

fuzz_target!(|data: &[u8]| {
    let Ok((version, endian)) = PclnVersion::sniff(data) else {
        return;
    };

    let source = TableSource::new(TableData::Owned(data.to_vec()), 0x1000);
    let Ok(table) = SymbolTable::new(version, endian, source, 0) else {
        return;
    };

    // Walk whatever the fuzzer built; decoding must never panic.
    for entry in table.iter().take(64) {
        let Ok(entry) = entry else { break };
        let symbol = entry.symbol();
        let pc = entry.entry_pc();
        let _ = symbol.name();
        let _ = symbol.source_file(pc);
        let _ = symbol.source_line(pc);
        let _ = symbol.frame_size(pc);
        let _ = symbol.is_stack_top();
    }
    let _ = table.find_address(0x1234);
});
