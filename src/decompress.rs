//! Decompression collaborator.
//!
//! Every format the envelopes declare goes through one entry point,
//! [`decompress`]. Deflate/zlib/gzip are backed by flate2; LZW has no
//! ecosystem decoder matching the legacy bit layout the old envelopes used,
//! so a compact variable-width decoder lives here.

use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

use crate::error::{Result, UnpasteError};

/// Compression formats an envelope can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    /// Raw deflate stream, no wrapper.
    Deflate,
    /// Deflate with the two-byte zlib wrapper and Adler checksum.
    Zlib,
    Gzip,
    /// Legacy variable-width LZW (MSB-first, 9..12 bit codes).
    Lzw,
}

impl Compression {
    pub fn from_name(name: &str) -> Option<Compression> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Some(Compression::None),
            "deflate" | "rawdeflate" | "raw-deflate" => Some(Compression::Deflate),
            "zlib" => Some(Compression::Zlib),
            "gzip" | "gz" => Some(Compression::Gzip),
            "lzw" => Some(Compression::Lzw),
            _ => None,
        }
    }
}

/// Decompress `data` according to `format`. `Compression::None` returns the
/// input unchanged.
pub fn decompress(data: Vec<u8>, format: Compression) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        Compression::None => return Ok(data),
        Compression::Deflate => {
            DeflateDecoder::new(data.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| UnpasteError::Decompress(format!("deflate: {}", e)))?;
        }
        Compression::Zlib => {
            ZlibDecoder::new(data.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| UnpasteError::Decompress(format!("zlib: {}", e)))?;
        }
        Compression::Gzip => {
            GzDecoder::new(data.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| UnpasteError::Decompress(format!("gzip: {}", e)))?;
        }
        Compression::Lzw => out = lzw_decode(&data)?,
    }
    Ok(out)
}

const LZW_CLEAR: u16 = 256;
const LZW_MAX_WIDTH: u32 = 12;

/// MSB-first bit reader over a byte slice.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit: u32,
}

impl<'a> BitReader<'a> {
    fn read(&mut self, width: u32) -> Option<u16> {
        let mut value = 0u16;
        for _ in 0..width {
            if self.pos >= self.data.len() {
                return None;
            }
            let bit = (self.data[self.pos] >> (7 - self.bit)) & 1;
            value = (value << 1) | u16::from(bit);
            self.bit += 1;
            if self.bit == 8 {
                self.bit = 0;
                self.pos += 1;
            }
        }
        Some(value)
    }
}

fn lzw_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = BitReader { data, pos: 0, bit: 0 };
    let mut dict: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
    dict.push(Vec::new()); // clear-code slot, never dereferenced

    let mut width = 9u32;
    let mut out = Vec::new();
    let mut previous: Option<Vec<u8>> = None;

    while let Some(code) = reader.read(width) {
        if code == LZW_CLEAR {
            dict.truncate(257);
            width = 9;
            previous = None;
            continue;
        }
        let entry = match dict.get(code as usize) {
            Some(e) => e.clone(),
            None => {
                // The one legal forward reference: previous + its first byte
                let prev = previous.as_ref().ok_or_else(|| {
                    UnpasteError::Decompress(format!("LZW code {} before any output", code))
                })?;
                if code as usize != dict.len() {
                    return Err(UnpasteError::Decompress(format!(
                        "LZW code {} outside dictionary of {}",
                        code,
                        dict.len()
                    )));
                }
                let mut e = prev.clone();
                e.push(prev[0]);
                e
            }
        };
        out.extend_from_slice(&entry);
        if let Some(prev) = previous {
            if dict.len() < (1 << LZW_MAX_WIDTH) {
                let mut next = prev;
                next.push(entry[0]);
                dict.push(next);
            }
            // The decoder's dictionary runs one insertion behind the
            // encoder's, so the width grows one code early.
            if dict.len() + 1 == (1 << width) && width < LZW_MAX_WIDTH {
                width += 1;
            }
        }
        previous = Some(entry);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression as Level;
    use std::io::Write;

    fn roundtrip(format: Compression, encode: impl Fn(&[u8]) -> Vec<u8>) {
        let payload = b"the same phrase repeats, the same phrase repeats, again".to_vec();
        let packed = encode(&payload);
        assert_eq!(decompress(packed, format).unwrap(), payload);
    }

    #[test]
    fn deflate_zlib_gzip_round_trip() {
        roundtrip(Compression::Deflate, |d| {
            let mut e = DeflateEncoder::new(Vec::new(), Level::default());
            e.write_all(d).unwrap();
            e.finish().unwrap()
        });
        roundtrip(Compression::Zlib, |d| {
            let mut e = ZlibEncoder::new(Vec::new(), Level::default());
            e.write_all(d).unwrap();
            e.finish().unwrap()
        });
        roundtrip(Compression::Gzip, |d| {
            let mut e = GzEncoder::new(Vec::new(), Level::default());
            e.write_all(d).unwrap();
            e.finish().unwrap()
        });
    }

    #[test]
    fn none_is_identity() {
        let data = vec![1u8, 2, 3];
        assert_eq!(decompress(data.clone(), Compression::None).unwrap(), data);
    }

    #[test]
    fn garbage_zlib_is_an_error() {
        assert!(decompress(vec![0xffu8; 8], Compression::Zlib).is_err());
    }

    /// Minimal LZW encoder mirroring the decoder's layout, for fixtures.
    fn lzw_encode(data: &[u8]) -> Vec<u8> {
        use std::collections::HashMap;
        let mut dict: HashMap<Vec<u8>, u16> = (0..=255u8).map(|b| (vec![b], u16::from(b))).collect();
        let mut next_code = 257u16;
        let mut width = 9u32;
        let mut out: Vec<u8> = Vec::new();
        let mut acc = 0u32;
        let mut nbits = 0u32;
        let mut emit = |code: u16, width: u32, out: &mut Vec<u8>| {
            acc = (acc << width) | u32::from(code);
            nbits += width;
            while nbits >= 8 {
                out.push((acc >> (nbits - 8)) as u8);
                nbits -= 8;
            }
        };

        let mut current: Vec<u8> = Vec::new();
        for &b in data {
            let mut candidate = current.clone();
            candidate.push(b);
            if dict.contains_key(&candidate) {
                current = candidate;
            } else {
                emit(dict[&current], width, &mut out);
                if u32::from(next_code) < (1 << LZW_MAX_WIDTH) {
                    dict.insert(candidate, next_code);
                    next_code += 1;
                }
                if u32::from(next_code) == (1 << width) && width < LZW_MAX_WIDTH {
                    width += 1;
                }
                current = vec![b];
            }
        }
        if !current.is_empty() {
            emit(dict[&current], width, &mut out);
        }
        // Flush remaining bits, zero-padded
        if nbits > 0 {
            out.push((acc << (8 - nbits)) as u8);
        }
        out
    }

    #[test]
    fn lzw_round_trip() {
        let payload = b"abababababababab banana banana banana".to_vec();
        let packed = lzw_encode(&payload);
        assert_eq!(decompress(packed, Compression::Lzw).unwrap(), payload);
    }

    #[test]
    fn lzw_round_trip_across_width_growth() {
        // Pseudo-random payload large enough to push the dictionary past the
        // 9- and 10-bit boundaries.
        let mut state = 0x2545_f491u32;
        let payload: Vec<u8> = (0..6000)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect();
        let packed = lzw_encode(&payload);
        assert_eq!(decompress(packed, Compression::Lzw).unwrap(), payload);
    }

    #[test]
    fn compression_names_parse() {
        assert_eq!(Compression::from_name("GZIP"), Some(Compression::Gzip));
        assert_eq!(Compression::from_name("rawdeflate"), Some(Compression::Deflate));
        assert_eq!(Compression::from_name("brotli"), None);
    }
}
