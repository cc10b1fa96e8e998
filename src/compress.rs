// ABOUTME: Generic compression container applied to window captures before framing
// ABOUTME: Wraps a zlib stream with a big-endian uncompressed-size prefix

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

/// Size of the uncompressed-length prefix.
const SIZE_PREFIX_LEN: usize = 4;

/// Errors produced while unpacking a compressed capture blob.
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("compressed blob too short: {0} bytes, need at least {SIZE_PREFIX_LEN}")]
    Truncated(usize),

    #[error("inflate failed: {0}")]
    Inflate(#[from] std::io::Error),

    #[error("inflated size {actual} does not match the declared size {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Compress a capture blob into the wire container: a 4-byte big-endian
/// uncompressed-size prefix followed by a zlib stream.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SIZE_PREFIX_LEN + data.len() / 2 + 16);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());

    let mut encoder = ZlibEncoder::new(out, Compression::default());
    encoder
        .write_all(data)
        .expect("writing to a Vec cannot fail");
    encoder.finish().expect("writing to a Vec cannot fail")
}

/// Inverse of [`compress`]: validate the size prefix, inflate, and check the
/// result length against the declaration.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CompressError> {
    if data.len() < SIZE_PREFIX_LEN {
        return Err(CompressError::Truncated(data.len()));
    }

    let expected = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let mut out = Vec::with_capacity(expected);
    ZlibDecoder::new(&data[SIZE_PREFIX_LEN..]).read_to_end(&mut out)?;

    if out.len() != expected {
        return Err(CompressError::LengthMismatch {
            expected,
            actual: out.len(),
        });
    }
    Ok(out)
}
