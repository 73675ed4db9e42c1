#![no_main]
use libfuzzer_sys::fuzz_target;

use std::io::Read;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes through every decode surface. Err results are
    // expected; what we verify is no panics and no runaway allocation.

    let _ = zstdio::functions::decompress_with_capacity(data, 64);

    let _ = zstdio::frame_infos(data);

    // The streaming reader treats truncation as a short EOF, so both Ok and
    // Err are acceptable outcomes here.
    if let Ok(mut reader) = zstdio::ZstdReader::new(data) {
        let mut out = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    out.extend_from_slice(&chunk[..n]);
                    if out.len() > 1 << 24 {
                        break;
                    }
                }
            }
        }
    }
});
