//! Tests for byte-stream synchronization and resync behavior

mod common;

use common::*;

#[test]
fn yields_frame_from_clean_stream() {
    let mut sync = FrameSynchronizer::new();
    sync.push(&FrameFields::reference().to_bytes());
    let frame = sync.next_frame().expect("frame should be found");
    assert_eq!(frame, FrameFields::reference().to_frame());
    assert!(sync.next_frame().is_none());

    let stats = sync.stats();
    assert_eq!(stats.frames_yielded, 1);
    assert_eq!(stats.bytes_discarded, 0);
    assert_eq!(stats.checksum_failures, 0);
}

#[test]
fn discards_noise_prefix_and_locks_on() {
    // K bytes of noise, none of which can form an anchor, then one frame.
    let noise = [0x13u8, 0x80, 0xFF, 0x00, 0x21, 0x99, 0x42];
    let mut stream = noise.to_vec();
    stream.extend_from_slice(&FrameFields::reference().to_bytes());

    let mut sync = FrameSynchronizer::new();
    sync.push(&stream);
    let frame = sync.next_frame().expect("frame should be found");
    assert_eq!(frame, FrameFields::reference().to_frame());
    assert!(sync.next_frame().is_none());
    assert_eq!(sync.stats().bytes_discarded, noise.len() as u64);
}

#[test]
fn handles_single_byte_feeding() {
    // The transport may deliver one byte at a time; starvation in the
    // middle of a frame is not an error.
    let mut stream = vec![0x07u8, 0x31];
    stream.extend_from_slice(&FrameFields::reference().to_bytes());

    let mut sync = FrameSynchronizer::new();
    let mut frames = Vec::new();
    for byte in stream {
        sync.push(&[byte]);
        while let Some(frame) = sync.next_frame() {
            frames.push(frame);
        }
    }
    assert_eq!(frames, vec![FrameFields::reference().to_frame()]);
}

#[test]
fn yields_consecutive_frames() {
    let mut second = FrameFields::reference();
    second.pulse_count = 2;

    let mut stream = FrameFields::reference().to_bytes().to_vec();
    stream.extend_from_slice(&second.to_bytes());

    let mut sync = FrameSynchronizer::new();
    sync.push(&stream);
    assert_eq!(sync.next_frame().unwrap().pulse_count.get(), 1);
    assert_eq!(sync.next_frame().unwrap().pulse_count.get(), 2);
    assert!(sync.next_frame().is_none());
    assert_eq!(sync.stats().frames_yielded, 2);
}

#[test]
fn false_anchor_relocks_on_following_frame() {
    // Two bytes that look like an anchor, followed by garbage that fails
    // the checksum, followed by a real frame. The scanner must resume from
    // the byte after the false anchor and still find the real frame.
    let mut stream = vec![0x00u8, SYNC_MARKER];
    stream.extend_from_slice(&[0x11; 21]);
    stream.push(0xFF); // 21 * 0x11 = 0x31, so this checksum is wrong
    stream.extend_from_slice(&FrameFields::reference().to_bytes());

    let mut sync = FrameSynchronizer::new();
    sync.push(&stream);
    let frame = sync.next_frame().expect("real frame should be found");
    assert_eq!(frame, FrameFields::reference().to_frame());
    assert!(sync.next_frame().is_none());
    assert_eq!(sync.stats().checksum_failures, 1);
    assert_eq!(sync.stats().frames_yielded, 1);
}

#[test]
fn overlapping_real_frame_survives_false_anchor() {
    // A stray status/sync pair directly before a real frame: the candidate
    // window covers the head of the real frame, fails the checksum, and
    // scanning from the byte after the false anchor must still yield the
    // real frame untouched.
    let mut stream = vec![0x20u8, SYNC_MARKER];
    stream.extend_from_slice(&FrameFields::reference().to_bytes());

    let mut sync = FrameSynchronizer::new();
    sync.push(&stream);
    let frame = sync.next_frame().expect("real frame should be found");
    assert_eq!(frame, FrameFields::reference().to_frame());
    assert_eq!(sync.stats().checksum_failures, 1);
}

#[test]
fn starves_without_error_on_partial_frame() {
    let bytes = FrameFields::reference().to_bytes();
    let mut sync = FrameSynchronizer::new();
    sync.push(&bytes[..23]);
    assert!(sync.next_frame().is_none());
    assert_eq!(sync.buffered(), 23);
    sync.push(&bytes[23..]);
    assert!(sync.next_frame().is_some());
}

#[tokio::test]
async fn frame_reader_pulls_from_async_source() {
    let mut stream = vec![0xABu8, 0xCD];
    stream.extend_from_slice(&FrameFields::reference().to_bytes());

    let mut reader = FrameReader::new(stream.as_slice());
    let frame = reader
        .next_frame()
        .await
        .expect("read failed")
        .expect("frame expected");
    assert_eq!(frame, FrameFields::reference().to_frame());

    // Source exhausted: partial data (none here) is dropped, not an error.
    assert!(reader.next_frame().await.expect("read failed").is_none());
    assert_eq!(reader.stats().frames_yielded, 1);
}

#[tokio::test]
async fn frame_reader_reports_eof_with_partial_frame_buffered() {
    let bytes = FrameFields::reference().to_bytes();
    let mut reader = FrameReader::new(&bytes[..20]);
    assert!(reader.next_frame().await.expect("read failed").is_none());
}
