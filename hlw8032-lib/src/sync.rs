//! Locating frames inside a noisy byte stream.
//!
//! The chip transmits continuously with no flow control, so the receiver
//! can join mid-frame, lose bytes, or pick up line noise. The synchronizer
//! scans for the fixed sync marker at frame offset 1 (the byte before it is
//! the status register), checksum-validates the candidate, and re-locks one
//! byte past a false anchor. Dropped noise is never an error, only a
//! per-synchronizer statistic.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::constants::{FRAME_SIZE, SYNC_MARKER, SYNC_OFFSET};
use crate::error::MeterError;
use crate::frame::RawFrame;

const READ_CHUNK: usize = 64;

/// Counters for what the synchronizer did with the bytes it was fed.
/// Owned per instance; there is no process-wide state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    /// Bytes dropped while hunting for an anchor, including false anchors
    pub bytes_discarded: u64,
    /// Candidate frames rejected by the checksum
    pub checksum_failures: u64,
    /// Valid frames handed to the caller
    pub frames_yielded: u64,
}

/// Incremental frame scanner: feed it byte chunks of any size with
/// [`push`](FrameSynchronizer::push), pull validated frames out with
/// [`next_frame`](FrameSynchronizer::next_frame).
#[derive(Debug, Default)]
pub struct FrameSynchronizer {
    buf: BytesMut,
    stats: SyncStats,
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4 * FRAME_SIZE),
            stats: SyncStats::default(),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Extract the next checksum-valid frame, or `None` if the buffered
    /// bytes cannot complete one yet (transport starvation: wait and push
    /// more).
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        loop {
            if self.buf.len() <= SYNC_OFFSET {
                return None;
            }
            if self.buf[SYNC_OFFSET] != SYNC_MARKER {
                self.buf.advance(1);
                self.stats.bytes_discarded += 1;
                continue;
            }
            if self.buf.len() < FRAME_SIZE {
                return None;
            }

            let mut raw = [0u8; FRAME_SIZE];
            raw.copy_from_slice(&self.buf[..FRAME_SIZE]);
            let frame: RawFrame = zerocopy::transmute!(raw);

            if frame.checksum_valid() {
                self.buf.advance(FRAME_SIZE);
                self.stats.frames_yielded += 1;
                trace!(
                    status = frame.status,
                    flags = frame.update_flags,
                    "frame accepted"
                );
                return Some(frame);
            }

            // False anchor. Resume scanning from the byte after the sync
            // marker, not after the whole candidate: a real frame may start
            // inside the window we just rejected.
            debug!(
                expected = frame.checksum,
                calculated = frame.computed_checksum(),
                "dropping candidate frame with bad checksum"
            );
            self.stats.checksum_failures += 1;
            self.buf.advance(SYNC_OFFSET + 1);
            self.stats.bytes_discarded += (SYNC_OFFSET + 1) as u64;
        }
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Bytes currently buffered (at most one partial frame plus unscanned
    /// input).
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Pulls frames out of an async byte source, suspending while the source
/// has nothing to deliver. On teardown or EOF any partial frame in the
/// buffer is discarded without side effects.
pub struct FrameReader<R> {
    source: R,
    sync: FrameSynchronizer,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            sync: FrameSynchronizer::new(),
        }
    }

    /// Wait for and return the next valid frame. `Ok(None)` means the byte
    /// source reached end of stream.
    pub async fn next_frame(&mut self) -> Result<Option<RawFrame>, MeterError> {
        loop {
            if let Some(frame) = self.sync.next_frame() {
                return Ok(Some(frame));
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = self.source.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.sync.push(&chunk[..n]);
        }
    }

    pub fn stats(&self) -> SyncStats {
        self.sync.stats()
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}
