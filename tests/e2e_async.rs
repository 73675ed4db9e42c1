//! E2E Test Suite 03: Async Adapters and the Frame Iterator
//!
//! Validates the tokio-backed surfaces:
//! - Async writer/reader round trip and flush taxonomy parity
//! - Frame iterator: per-frame payloads and metadata, skippable members,
//!   empty-member swallowing
//! - max_frame_size enforcement (ResourceLimit)
//! - Cooperative cancellation: zero progress when cancelled on entry,
//!   reusable afterwards

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use zstdio::{
    functions, AsyncZstdReader, AsyncZstdWriter, CancelToken, FrameStream, FrameType,
    ZstdError,
};

fn skippable_frame(nibble: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&(0x184D_2A50u32 | nibble).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: async round trip
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_async_roundtrip() {
    let mut payload = vec![0u8; 1_000_000];
    StdRng::seed_from_u64(99).fill_bytes(&mut payload);

    let mut writer = AsyncZstdWriter::with_level(Vec::new(), 3).unwrap();
    for chunk in payload.chunks(50_001) {
        writer.write_all(chunk).await.unwrap();
    }
    let compressed = writer.finish().await.unwrap();

    let mut reader = AsyncZstdReader::new(&compressed[..]).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).await.unwrap();
    assert_eq!(out, payload);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: flush taxonomy parity with the sync writer
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_async_flush_frame_counts() {
    let mut writer = AsyncZstdWriter::with_level(Vec::new(), 1).unwrap();
    writer.write_all(&[b'x'; 2048]).await.unwrap();
    writer.flush_frame().await.unwrap();
    // Idempotent: a second frame flush with no writes adds nothing.
    let len_after_first = writer.get_ref().len();
    writer.flush_frame().await.unwrap();
    assert_eq!(writer.get_ref().len(), len_after_first);
    writer.write_all(&[b'y'; 2048]).await.unwrap();
    let compressed = writer.finish().await.unwrap();

    assert_eq!(zstdio::frame_infos(&compressed).unwrap().len(), 2);
    let mut expected = vec![b'x'; 2048];
    expected.extend_from_slice(&[b'y'; 2048]);
    assert_eq!(functions::decompress(&compressed).unwrap(), expected);
}

#[tokio::test]
async fn test_async_basic_flush_keeps_frame_open() {
    let mut writer = AsyncZstdWriter::with_level(Vec::new(), 3).unwrap();
    writer.write_all(&b"before|".repeat(100)).await.unwrap();
    writer.flush().await.unwrap();
    let seen = functions_decompress_prefix(writer.get_ref());
    assert_eq!(seen, b"before|".repeat(100));
    writer.write_all(&b"after".repeat(100)).await.unwrap();
    let compressed = writer.finish().await.unwrap();
    assert_eq!(zstdio::frame_infos(&compressed).unwrap().len(), 1);
}

/// Decode a flushed-but-unterminated prefix through the sync reader.
fn functions_decompress_prefix(prefix: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut reader = zstdio::ZstdReader::new(prefix).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: frame iterator
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_frame_stream_yields_each_member() {
    let payloads: [&[u8]; 3] = [&[b'A'; 4096], &[b'B'; 100_000], b"small"];
    let mut blob = Vec::new();
    for p in payloads {
        blob.extend_from_slice(&functions::compress(p, 3).unwrap());
    }

    let mut frames = FrameStream::new(&blob[..]).unwrap();
    let mut yielded = Vec::new();
    while let Some(frame) = frames.next_frame().await.unwrap() {
        yielded.push(frame);
    }

    assert_eq!(yielded.len(), 3);
    for (frame, payload) in yielded.iter().zip(payloads) {
        assert_eq!(frame.data, payload);
        assert_eq!(frame.info.frame_type, FrameType::Frame);
        assert_eq!(frame.info.content_size, Some(payload.len() as u64));
    }
    // Offset chain covers the whole blob.
    assert_eq!(yielded[0].info.offset, 0);
    for pair in yielded.windows(2) {
        assert_eq!(
            pair[1].info.offset,
            pair[0].info.offset + pair[0].info.compressed_size
        );
    }
    let last = yielded.last().unwrap();
    assert_eq!(last.info.offset + last.info.compressed_size, blob.len() as u64);
}

#[tokio::test]
async fn test_frame_stream_skippable_members() {
    // A skippable member with payload is yielded (empty data, tagged); an
    // empty one (exactly 8 bytes) is swallowed.
    let mut blob = skippable_frame(0, b"");
    blob.extend_from_slice(&skippable_frame(2, &[0xEE; 24]));
    blob.extend_from_slice(&functions::compress(b"payload after skippables", 3).unwrap());

    let mut frames = FrameStream::new(&blob[..]).unwrap();
    let first = frames.next_frame().await.unwrap().unwrap();
    assert_eq!(first.info.frame_type, FrameType::Skippable);
    assert!(first.data.is_empty());
    assert_eq!(first.info.content_size, Some(24));
    // The swallowed empty skippable still counts in the offset arithmetic.
    assert_eq!(first.info.offset, 8);

    let second = frames.next_frame().await.unwrap().unwrap();
    assert_eq!(second.info.frame_type, FrameType::Frame);
    assert_eq!(second.data, b"payload after skippables");

    assert!(frames.next_frame().await.unwrap().is_none());
}

#[tokio::test]
async fn test_frame_stream_resource_limit() {
    let big = vec![0xABu8; 1_000_000];
    let blob = functions::compress(&big, 3).unwrap();

    let mut frames = FrameStream::new(&blob[..])
        .unwrap()
        .with_max_frame_size(64 * 1024);
    match frames.next_frame().await {
        Err(ZstdError::ResourceLimit { limit, .. }) => assert_eq!(limit, 64 * 1024),
        other => panic!("expected ResourceLimit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_frame_stream_within_limit_succeeds() {
    let payload = vec![0xCDu8; 30_000];
    let blob = functions::compress(&payload, 3).unwrap();

    let mut frames = FrameStream::new(&blob[..])
        .unwrap()
        .with_max_frame_size(30_000);
    let frame = frames.next_frame().await.unwrap().unwrap();
    assert_eq!(frame.data, payload);
    assert!(frames.next_frame().await.unwrap().is_none());
}

/// A truncated trailing member is end-of-stream, not an error.
#[tokio::test]
async fn test_frame_stream_truncated_tail() {
    let mut blob = functions::compress(&b"whole".repeat(200), 3).unwrap();
    let second = functions::compress(&b"partial".repeat(200), 3).unwrap();
    blob.extend_from_slice(&second[..second.len() - 7]);

    let mut frames = FrameStream::new(&blob[..]).unwrap();
    let first = frames.next_frame().await.unwrap().unwrap();
    assert_eq!(first.data, b"whole".repeat(200));
    assert!(frames.next_frame().await.unwrap().is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: cancellation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancelled_writer_makes_zero_progress() {
    let token = CancelToken::new();
    token.cancel();

    let mut writer = AsyncZstdWriter::with_level(Vec::new(), 3)
        .unwrap()
        .with_cancel(token);
    assert!(matches!(
        writer.write_all(b"never sent").await,
        Err(ZstdError::Cancelled)
    ));
    assert!(writer.get_ref().is_empty());

    // Clearing the token makes the writer usable again.
    writer.set_cancel(None);
    writer.write_all(b"sent after all").await.unwrap();
    let compressed = writer.finish().await.unwrap();
    assert_eq!(functions::decompress(&compressed).unwrap(), b"sent after all");
}

#[tokio::test]
async fn test_cancelled_reader_makes_zero_progress() {
    let compressed = functions::compress(b"cancel read", 3).unwrap();
    let token = CancelToken::new();
    token.cancel();

    let mut reader = AsyncZstdReader::new(&compressed[..])
        .unwrap()
        .with_cancel(token.clone());
    let mut buf = [0u8; 32];
    assert!(matches!(
        reader.read(&mut buf).await,
        Err(ZstdError::Cancelled)
    ));

    reader.set_cancel(None);
    reader.reset().unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).await.unwrap();
    assert_eq!(out, b"cancel read");
}

#[tokio::test]
async fn test_cancelled_frame_stream() {
    let blob = functions::compress(b"frame", 3).unwrap();
    let token = CancelToken::new();
    token.cancel();

    let mut frames = FrameStream::new(&blob[..]).unwrap().with_cancel(token);
    assert!(matches!(
        frames.next_frame().await,
        Err(ZstdError::Cancelled)
    ));
    frames.set_cancel(None);
    let frame = frames.next_frame().await.unwrap().unwrap();
    assert_eq!(frame.data, b"frame");
}
