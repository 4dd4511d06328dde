//! zlib (deflate) compression for object storage. Always writes at a
//! fixed level; decompression accepts any valid zlib stream.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use webgit_core::{Error, Result};

/// Compresses `data` with zlib at the default level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::Io(e.to_string()))?;
    encoder.finish().map_err(|e| Error::Io(e.to_string()))
}

/// Decompresses any valid zlib stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|_| Error::corrupt("zlib stream did not decompress"))?;
    Ok(out)
}
