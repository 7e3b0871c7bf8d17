//! Fixed-capacity string buffers
//!
//! Text crossing into native code is copied into a zero-initialised buffer of
//! a declared capacity; the host reads it or overwrites it in place. Text is
//! mapped one byte per character so every byte value survives the trip.

use crate::error::MarshalError;
use serde::{Deserialize, Serialize};
use std::ffi::c_char;

/// Single-byte text encodings understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encoding {
    /// ISO-8859-1: byte N is code point U+00NN
    #[default]
    Latin1,
}

impl Encoding {
    /// Encode text, failing on characters outside the single-byte range
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, MarshalError> {
        match self {
            Encoding::Latin1 => text
                .chars()
                .map(|ch| u8::try_from(u32::from(ch)).map_err(|_| MarshalError::Unencodable { ch }))
                .collect(),
        }
    }

    /// Decode bytes; total, every byte maps to a character
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

/// How an output buffer is read back after the native call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeMode {
    /// Stop at the first NUL byte (terminator-bounded text)
    Trimmed,
    /// Decode the full capacity (binary payload; length reported elsewhere)
    Raw,
}

/// A zero-initialised byte buffer of fixed capacity
///
/// The heap storage never moves once allocated, so its address stays valid
/// for the whole native call even if the owning struct is moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringBuffer {
    bytes: Vec<u8>,
}

impl StringBuffer {
    /// Allocate an empty (all-zero) buffer
    pub fn zeroed(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
        }
    }

    /// Allocate a buffer of `capacity` bytes pre-filled with `text`
    ///
    /// A payload exactly `capacity` bytes long is accepted and carries no
    /// terminator; anything longer is a [`MarshalError::CapacityViolation`].
    ///
    /// ```
    /// # use rpr_marshal::ffi::buffer::{StringBuffer, Encoding, DecodeMode};
    /// let buf = StringBuffer::encode("hello", Encoding::Latin1, 10).unwrap();
    /// assert_eq!(buf.decode(Encoding::Latin1, DecodeMode::Trimmed), "hello");
    /// assert_eq!(buf.decode(Encoding::Latin1, DecodeMode::Raw), "hello\0\0\0\0\0");
    /// ```
    pub fn encode(text: &str, encoding: Encoding, capacity: usize) -> Result<Self, MarshalError> {
        let payload = encoding.encode(text)?;
        if payload.len() > capacity {
            return Err(MarshalError::CapacityViolation {
                len: payload.len(),
                capacity,
            });
        }

        let mut buffer = Self::zeroed(capacity);
        buffer.bytes[..payload.len()].copy_from_slice(&payload);
        Ok(buffer)
    }

    /// Decode the buffer contents
    pub fn decode(&self, encoding: Encoding, mode: DecodeMode) -> String {
        encoding.decode(self.contents(mode))
    }

    /// Bytes selected by `mode`
    pub fn contents(&self, mode: DecodeMode) -> &[u8] {
        match mode {
            DecodeMode::Raw => &self.bytes,
            DecodeMode::Trimmed => {
                let end = self
                    .bytes
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(self.bytes.len());
                &self.bytes[..end]
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Pointer handed to native code as `char*`
    pub fn as_mut_ptr(&mut self) -> *mut c_char {
        self.bytes.as_mut_ptr() as *mut c_char
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_pads_with_zeros() {
        let buf = StringBuffer::encode("abc", Encoding::Latin1, 6).unwrap();
        assert_eq!(buf.as_bytes(), b"abc\0\0\0");
        assert_eq!(buf.capacity(), 6);
    }

    #[test]
    fn test_exact_fit_has_no_terminator() {
        let buf = StringBuffer::encode("abcd", Encoding::Latin1, 4).unwrap();
        assert_eq!(buf.decode(Encoding::Latin1, DecodeMode::Trimmed), "abcd");
    }

    #[test]
    fn test_capacity_violation() {
        let result = StringBuffer::encode("abcdef", Encoding::Latin1, 3);
        assert_eq!(
            result,
            Err(MarshalError::CapacityViolation {
                len: 6,
                capacity: 3
            })
        );
    }

    #[test]
    fn test_trimmed_stops_at_first_nul() {
        let buf = StringBuffer::encode("ab\0cd", Encoding::Latin1, 8).unwrap();
        assert_eq!(buf.decode(Encoding::Latin1, DecodeMode::Trimmed), "ab");
        assert_eq!(buf.decode(Encoding::Latin1, DecodeMode::Raw), "ab\0cd\0\0\0");
    }

    #[test]
    fn test_latin1_high_bytes_round_trip() {
        let text: String = (0x01u8..=0xFF).map(char::from).collect();
        let buf = StringBuffer::encode(&text, Encoding::Latin1, 255).unwrap();
        assert_eq!(buf.decode(Encoding::Latin1, DecodeMode::Raw), text);
        assert_eq!(buf.as_bytes()[0xFE], 0xFF);
    }

    #[test]
    fn test_unencodable_character() {
        let result = StringBuffer::encode("snow ☃", Encoding::Latin1, 16);
        assert_eq!(result, Err(MarshalError::Unencodable { ch: '☃' }));
    }

    #[test]
    fn test_zero_capacity() {
        let buf = StringBuffer::encode("", Encoding::Latin1, 0).unwrap();
        assert_eq!(buf.decode(Encoding::Latin1, DecodeMode::Trimmed), "");
        assert_eq!(buf.decode(Encoding::Latin1, DecodeMode::Raw), "");
    }
}
