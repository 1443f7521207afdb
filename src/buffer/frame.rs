//! # Record framing inside an append buffer.
//!
//! Every record occupies exactly `payload.len() + OVERHEAD` bytes:
//! ```text
//! begin                                                    end
//!   │ len: u32 BE (4) │ payload (len bytes) │ status (1) │
//!   └────────────────────────────────────────────────────┘
//! ```
//! The status byte is written **last**; a reader that finds [`STATUS_COMMITTED`]
//! knows the preceding payload is complete. After a drain every frame inside the
//! harvested range is committed, so [`Frames`] only reports an error on corrupted
//! or foreign input.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::FrameError;

/// Size of the big-endian length prefix.
pub const LEN_PREFIX: usize = 4;

/// Per-record bytes on top of the payload (length prefix + status byte).
pub const OVERHEAD: usize = LEN_PREFIX + 1;

/// Status byte of a fully written record.
pub const STATUS_COMMITTED: u8 = 0x01;

/// Writes one frame for `payload` into `storage[begin .. begin + payload.len() + OVERHEAD)`.
///
/// The caller owns that range exclusively (it was reserved by a bump allocation).
pub(crate) fn write(storage: &[AtomicU8], begin: usize, payload: &[u8]) {
    let len = payload.len() as u32;
    let body = begin + LEN_PREFIX;

    for (slot, b) in storage[begin..body].iter().zip(len.to_be_bytes()) {
        slot.store(b, Ordering::Relaxed);
    }
    for (slot, &b) in storage[body..body + payload.len()].iter().zip(payload) {
        slot.store(b, Ordering::Relaxed);
    }
    storage[body + payload.len()].store(STATUS_COMMITTED, Ordering::Release);
}

/// Iterator over the payloads of a harvested byte range.
///
/// Yields each payload in append order. Stops after the first error.
///
/// ## Example
/// ```rust
/// use quiesce::{AppendBuffer, frame::Frames};
///
/// let buf = AppendBuffer::new(64);
/// assert!(buf.append(b"alpha"));
/// assert!(buf.append(b"beta"));
///
/// buf.disable();
/// buf.gate().spin_until_drained();
/// let bytes = buf.snapshot().expect("quiesced");
///
/// let payloads: Vec<&[u8]> = Frames::new(&bytes).collect::<Result<_, _>>().unwrap();
/// assert_eq!(payloads, vec![&b"alpha"[..], &b"beta"[..]]);
/// ```
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Frames<'a> {
    /// Starts decoding at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            failed: false,
        }
    }

    /// Byte offset of the next frame to decode.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn decode(&mut self) -> Result<&'a [u8], FrameError> {
        let rest = &self.bytes[self.offset..];
        let Some((prefix, after)) = rest.split_first_chunk::<LEN_PREFIX>() else {
            return Err(FrameError::Truncated {
                offset: self.offset,
            });
        };
        let len = u32::from_be_bytes(*prefix) as usize;
        if after.len() < len + 1 {
            return Err(FrameError::Truncated {
                offset: self.offset,
            });
        }

        let status = after[len];
        if status != STATUS_COMMITTED {
            return Err(FrameError::Uncommitted {
                offset: self.offset,
                status,
            });
        }

        self.offset += len + OVERHEAD;
        Ok(&after[..len])
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<&'a [u8], FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        let item = self.decode();
        self.failed = item.is_err();
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(n: usize) -> Vec<AtomicU8> {
        (0..n).map(|_| AtomicU8::new(0)).collect()
    }

    fn load(storage: &[AtomicU8]) -> Vec<u8> {
        storage.iter().map(|b| b.load(Ordering::Acquire)).collect()
    }

    #[test]
    fn test_write_layout() {
        let s = storage(8);
        write(&s, 0, b"abc");
        assert_eq!(load(&s), vec![0, 0, 0, 3, b'a', b'b', b'c', STATUS_COMMITTED]);
    }

    #[test]
    fn test_empty_payload_is_a_valid_frame() {
        let s = storage(OVERHEAD);
        write(&s, 0, b"");
        let bytes = load(&s);
        let frames: Vec<_> = Frames::new(&bytes).collect();
        assert_eq!(frames, vec![Ok(&b""[..])]);
    }

    #[test]
    fn test_truncated_tail_is_reported() {
        let s = storage(16);
        write(&s, 0, b"hello");
        let bytes = load(&s);

        let mut it = Frames::new(&bytes[..12]);
        assert_eq!(it.next(), Some(Ok(&b"hello"[..])));
        assert_eq!(it.next(), Some(Err(FrameError::Truncated { offset: 10 })));
        assert_eq!(it.next(), None, "iteration stops after an error");
    }

    #[test]
    fn test_uncommitted_frame_is_reported() {
        let bytes = [0, 0, 0, 2, b'o', b'k', 0x00];
        let mut it = Frames::new(&bytes);
        assert_eq!(
            it.next(),
            Some(Err(FrameError::Uncommitted {
                offset: 0,
                status: 0
            }))
        );
    }
}
