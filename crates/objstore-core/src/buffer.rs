//! Append/release cursor over a growable byte sequence.

use crate::Result;
use crate::error::BufferError;

/// A growable byte buffer with a read cursor.
///
/// Writers `append` raw bytes at the end; readers `release` bytes from the
/// front in the order they were appended. Reading past the end is a hard
/// [`BufferError`]. This is the foundation of the binary serialization
/// backend: the wire format is positional and untagged, so the buffer
/// itself carries no structure.
#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
    pos: usize,
}

impl ByteBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a read-ready buffer over existing bytes.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// Append raw bytes at the end of the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Release the next `out.len()` bytes into `out`, advancing the cursor.
    pub fn release(&mut self, out: &mut [u8]) -> Result<()> {
        let available = self.remaining();
        if out.len() > available {
            return Err(BufferError {
                requested: out.len(),
                available,
            }
            .into());
        }
        out.copy_from_slice(&self.data[self.pos..self.pos + out.len()]);
        self.pos += out.len();
        Ok(())
    }

    /// Release a fixed-size array, advancing the cursor.
    pub fn release_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        self.release(&mut out)?;
        Ok(out)
    }

    /// Release `len` bytes into a fresh vector, advancing the cursor.
    pub fn release_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.release(&mut out)?;
        Ok(out)
    }

    /// Total bytes appended.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes not yet released.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Forget all contents and reset the cursor.
    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    /// View the full appended contents, released or not.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_release_in_order() {
        let mut buf = ByteBuffer::new();
        buf.append(&[1, 2, 3]);
        buf.append(&[4, 5]);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.remaining(), 5);

        let mut out = [0u8; 3];
        buf.release(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(buf.remaining(), 2);

        let tail: [u8; 2] = buf.release_array().unwrap();
        assert_eq!(tail, [4, 5]);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn underrun_is_an_error() {
        let mut buf = ByteBuffer::from_vec(vec![9]);
        let mut out = [0u8; 4];
        let err = buf.release(&mut out).unwrap_err();
        assert!(err.is_underrun());
        // the failed read must not advance the cursor
        assert_eq!(buf.remaining(), 1);
        assert_eq!(buf.release_array::<1>().unwrap(), [9]);
    }

    #[test]
    fn clear_resets_cursor() {
        let mut buf = ByteBuffer::from_vec(vec![1, 2]);
        buf.release_array::<1>().unwrap();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.remaining(), 0);
        buf.append(&[7]);
        assert_eq!(buf.release_array::<1>().unwrap(), [7]);
    }

    #[test]
    fn release_vec_round_trip() {
        let mut buf = ByteBuffer::new();
        buf.append(b"hello");
        assert_eq!(buf.release_vec(5).unwrap(), b"hello");
        assert!(buf.release_vec(1).is_err());
    }
}
