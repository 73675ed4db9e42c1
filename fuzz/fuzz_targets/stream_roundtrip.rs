#![no_main]
use libfuzzer_sys::fuzz_target;

use std::io::{Read, Write};

fuzz_target!(|data: &[u8]| {
    // Compress arbitrary input through the writer, split into frames at a
    // data-derived boundary, then require an exact round trip.
    let split = if data.is_empty() { 0 } else { data[0] as usize % data.len() };

    let mut writer = zstdio::ZstdWriter::with_level(Vec::new(), 1).unwrap();
    writer.write_all(&data[..split]).unwrap();
    writer.flush_frame().unwrap();
    writer.write_all(&data[split..]).unwrap();
    let compressed = writer.finish().unwrap();

    let mut reader = zstdio::ZstdReader::new(&compressed[..]).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
});
