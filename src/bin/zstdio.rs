//! Minimal compress / decompress command over the stream adapters.
//!
//! ```text
//! zstdio c <input> <output> [-l LEVEL]   compress <input> into one frame
//! zstdio d <input> <output>              decompress a concatenated stream
//! zstdio l <input>                       list frames and their metadata
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

use anyhow::{anyhow, bail, Context, Result};

use zstdio::{FrameScanner, ZstdReader, ZstdWriter};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = args.first().ok_or_else(|| anyhow!(usage()))?.as_str();

    match mode {
        "c" => {
            let (input, output) = io_paths(&args)?;
            let level = parse_level(&args)?;
            let reader = open_input(&input)?;
            let sink = BufWriter::new(
                File::create(&output).with_context(|| format!("creating {output}"))?,
            );
            let mut writer = ZstdWriter::with_level(sink, level)?;
            copy(reader, &mut writer)?;
            writer.finish()?.flush()?;
        }
        "d" => {
            let (input, output) = io_paths(&args)?;
            let mut reader = ZstdReader::new(open_input(&input)?)?;
            let mut sink = BufWriter::new(
                File::create(&output).with_context(|| format!("creating {output}"))?,
            );
            copy(&mut reader, &mut sink)?;
            sink.flush()?;
        }
        "l" => {
            let input = args.get(1).ok_or_else(|| anyhow!(usage()))?.clone();
            println!("{:>10}  {:>12}  {:>12}  type", "offset", "csize", "dsize");
            for info in FrameScanner::new(open_input(&input)?) {
                let info = info.with_context(|| format!("scanning {input}"))?;
                println!(
                    "{:>10}  {:>12}  {:>12}  {}",
                    info.offset,
                    info.compressed_size,
                    info.content_size
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "?".into()),
                    info.frame_type,
                );
            }
        }
        _ => bail!(usage()),
    }
    Ok(())
}

fn usage() -> String {
    "usage: zstdio c|d <input> <output> [-l LEVEL] | zstdio l <input>".into()
}

fn io_paths(args: &[String]) -> Result<(String, String)> {
    match (args.get(1), args.get(2)) {
        (Some(i), Some(o)) => Ok((i.clone(), o.clone())),
        _ => bail!(usage()),
    }
}

fn parse_level(args: &[String]) -> Result<i32> {
    match args.iter().position(|a| a == "-l") {
        Some(idx) => args
            .get(idx + 1)
            .ok_or_else(|| anyhow!("-l requires a value"))?
            .parse()
            .context("compression level must be an integer"),
        None => Ok(3),
    }
}

fn open_input(path: &str) -> Result<BufReader<File>> {
    Ok(BufReader::new(
        File::open(path).with_context(|| format!("opening {path}"))?,
    ))
}

fn copy(mut from: impl Read, to: &mut impl Write) -> Result<u64> {
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = from.read(&mut buf)?;
        if n == 0 {
            return Ok(total);
        }
        to.write_all(&buf[..n])?;
        total += n as u64;
    }
}
