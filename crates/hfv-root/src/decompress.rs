//! Decoding of ROOT compression blocks.
//!
//! Each block carries a 9-byte header:
//! ```text
//! bytes 0-1:  algorithm ("ZL" zlib, "L4" lz4, "ZS" zstd, "XZ" lzma)
//! byte  2:    method
//! bytes 3-5:  compressed size   (little-endian u24)
//! bytes 6-8:  uncompressed size (little-endian u24)
//! ```
//! Large objects are split into several consecutive blocks.

use std::io::Read;

use crate::error::{Result, RootError};

const BLOCK_HEADER_LEN: usize = 9;
const LZ4_CHECKSUM_LEN: usize = 8;

/// Decompress a chain of ROOT blocks into exactly `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut offset = 0;

    while out.len() < expected_len && offset + BLOCK_HEADER_LEN <= src.len() {
        let tag = &src[offset..offset + 2];
        let c_size = read_le24(&src[offset + 3..offset + 6]);
        let u_size = read_le24(&src[offset + 6..offset + 9]);
        offset += BLOCK_HEADER_LEN;

        let end = offset + c_size;
        if end > src.len() {
            return Err(RootError::Decompression(format!(
                "block claims {c_size} compressed bytes, {} left",
                src.len() - offset
            )));
        }
        let block = &src[offset..end];

        let before = out.len();
        match tag {
            b"ZL" => inflate(flate2::read::ZlibDecoder::new(block), &mut out, "zlib")?,
            b"L4" => {
                if block.len() < LZ4_CHECKSUM_LEN {
                    return Err(RootError::Decompression("lz4 block shorter than checksum".into()));
                }
                let data = lz4_flex::decompress(&block[LZ4_CHECKSUM_LEN..], u_size)
                    .map_err(|e| RootError::Decompression(format!("lz4: {e}")))?;
                out.extend_from_slice(&data);
            }
            b"ZS" => {
                let dec = ruzstd::decoding::StreamingDecoder::new(block)
                    .map_err(|e| RootError::Decompression(format!("zstd: {e}")))?;
                inflate(dec, &mut out, "zstd")?;
            }
            b"XZ" => {
                let mut input = std::io::BufReader::new(block);
                lzma_rs::xz_decompress(&mut input, &mut out)
                    .map_err(|e| RootError::Decompression(format!("xz: {e}")))?;
            }
            other => {
                return Err(RootError::Decompression(format!(
                    "unknown compression tag {:?}",
                    String::from_utf8_lossy(other)
                )));
            }
        }

        if out.len() - before != u_size {
            return Err(RootError::Decompression(format!(
                "block inflated to {} bytes, header says {u_size}",
                out.len() - before
            )));
        }
        offset = end;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "decompressed {} bytes, key expects {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}

fn inflate(mut reader: impl Read, out: &mut Vec<u8>, algo: &str) -> Result<()> {
    reader
        .read_to_end(out)
        .map(|_| ())
        .map_err(|e| RootError::Decompression(format!("{algo}: {e}")))
}

fn read_le24(b: &[u8]) -> usize {
    b[0] as usize | ((b[1] as usize) << 8) | ((b[2] as usize) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_block(tag: &[u8; 2], method: u8, compressed: &[u8], u_len: usize) -> Vec<u8> {
        let mut block = tag.to_vec();
        block.push(method);
        for v in [compressed.len(), u_len] {
            block.extend_from_slice(&[(v & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, ((v >> 16) & 0xFF) as u8]);
        }
        block.extend_from_slice(compressed);
        block
    }

    #[test]
    fn le24() {
        assert_eq!(read_le24(&[0x10, 0x00, 0x00]), 16);
        assert_eq!(read_le24(&[0x00, 0x01, 0x00]), 256);
        assert_eq!(read_le24(&[0xff, 0xff, 0xff]), 0xFF_FFFF);
    }

    #[test]
    fn zlib_blocks_are_concatenated() {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let parts: [&[u8]; 2] = [b"hist_pt_cent_0_10 contents ", b"and the second block AAAAAAA"];
        let mut src = Vec::new();
        for p in parts {
            let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
            enc.write_all(p).unwrap();
            src.extend(root_block(b"ZL", 8, &enc.finish().unwrap(), p.len()));
        }
        let total = parts.iter().map(|p| p.len()).sum();
        let out = decompress(&src, total).unwrap();
        assert_eq!(out, [parts[0], parts[1]].concat());
    }

    #[test]
    fn zstd_block() {
        let original = b"THnSparse chunk payload BBBBBBBBBBBBBBBBBB";
        let compressed = ruzstd::encoding::compress_to_vec(
            &original[..],
            ruzstd::encoding::CompressionLevel::Fastest,
        );
        let src = root_block(b"ZS", 4, &compressed, original.len());
        assert_eq!(decompress(&src, original.len()).unwrap(), &original[..]);
    }

    #[test]
    fn xz_block() {
        let original = b"StepTHn values CCCCCCCCCCCCCCCC";
        let mut compressed = Vec::new();
        lzma_rs::xz_compress(&mut std::io::BufReader::new(&original[..]), &mut compressed).unwrap();
        let src = root_block(b"XZ", 5, &compressed, original.len());
        assert_eq!(decompress(&src, original.len()).unwrap(), &original[..]);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let src = root_block(b"QQ", 1, &[0u8; 4], 4);
        assert!(matches!(decompress(&src, 4), Err(RootError::Decompression(_))));
    }

    #[test]
    fn length_mismatch_is_an_error() {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"abcdef").unwrap();
        let src = root_block(b"ZL", 8, &enc.finish().unwrap(), 6);
        assert!(decompress(&src, 10).is_err());
    }
}
