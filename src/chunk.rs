//! PNG chunk record and codec
//!
//! A chunk on disk is `length(4, BE) + type(4) + data + CRC(4, BE)`, where the
//! CRC covers type and data. [`Chunk`] keeps the length and CRC derived from
//! its payload, so the only way to change the content is [`Chunk::set_data`].

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

/// Largest chunk length allowed by the PNG specification (2^31 - 1)
pub const MAX_CHUNK_LENGTH: u32 = 0x7FFF_FFFF;

/// Four-letter chunk type tag
///
/// Case of each letter carries a property bit (ancillary, private, reserved,
/// safe-to-copy). Only IDAT and IEND get special treatment in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType([u8; 4]);

impl ChunkType {
    /// Header chunk
    pub const IHDR: ChunkType = ChunkType(*b"IHDR");
    /// Image data chunk
    pub const IDAT: ChunkType = ChunkType(*b"IDAT");
    /// Terminal chunk
    pub const IEND: ChunkType = ChunkType(*b"IEND");

    /// Create a chunk type from its raw bytes
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Raw tag bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn is_idat(&self) -> bool {
        *self == Self::IDAT
    }

    pub fn is_iend(&self) -> bool {
        *self == Self::IEND
    }

    /// Critical chunks have an uppercase first letter
    pub fn is_critical(&self) -> bool {
        self.0[0] & 0x20 == 0
    }

    /// Public chunks have an uppercase second letter
    pub fn is_public(&self) -> bool {
        self.0[1] & 0x20 == 0
    }

    /// The third letter must be uppercase in conforming chunk types
    pub fn is_reserved_valid(&self) -> bool {
        self.0[2] & 0x20 == 0
    }

    /// Safe-to-copy chunks have a lowercase fourth letter
    pub fn is_safe_to_copy(&self) -> bool {
        self.0[3] & 0x20 != 0
    }
}

impl From<[u8; 4]> for ChunkType {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            if byte.is_ascii_graphic() {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{:02x}", byte)?;
            }
        }
        Ok(())
    }
}

/// A single PNG chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    chunk_type: ChunkType,
    data: Vec<u8>,
    /// CRC as last derived or as stored in the source file
    crc: u32,
    /// Byte offset of the chunk in the file it was read from
    offset: u64,
}

impl Chunk {
    /// Create a chunk with the given type and payload
    pub fn new(chunk_type: ChunkType, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let crc = calculate_crc(&chunk_type, &data);
        Self {
            chunk_type,
            data,
            crc,
            offset: 0,
        }
    }

    /// Read a chunk from the current position of `reader`
    ///
    /// Returns `Ok(None)` when the reader is exhausted before the first byte
    /// of the length field. The stored CRC is kept as read and not verified;
    /// use [`Chunk::check_data`] for that.
    pub fn decode<R: Read + Seek>(reader: &mut R) -> Result<Option<Chunk>> {
        let offset = reader.stream_position()?;

        let mut len_buf = [0u8; 4];
        match read_up_to(reader, &mut len_buf)? {
            0 => return Ok(None),
            4 => {}
            n => {
                return Err(malformed(
                    offset,
                    format!("length field truncated after {} bytes", n),
                ))
            }
        }
        let length = BigEndian::read_u32(&len_buf);
        if length > MAX_CHUNK_LENGTH {
            return Err(malformed(
                offset,
                format!("chunk length too large: {}", length),
            ));
        }

        let mut type_buf = [0u8; 4];
        reader
            .read_exact(&mut type_buf)
            .map_err(|e| truncated(e, offset, "chunk type"))?;

        // Grow with the input instead of trusting the declared length up front
        let mut data = Vec::new();
        reader.by_ref().take(length as u64).read_to_end(&mut data)?;
        if data.len() != length as usize {
            return Err(malformed(
                offset,
                format!(
                    "payload truncated: {} of {} bytes",
                    data.len(),
                    length
                ),
            ));
        }

        let crc = reader
            .read_u32::<BigEndian>()
            .map_err(|e| truncated(e, offset, "CRC field"))?;

        Ok(Some(Chunk {
            chunk_type: ChunkType(type_buf),
            data,
            crc,
            offset,
        }))
    }

    /// Read a chunk starting at `offset`, restoring the reader position afterward
    pub fn decode_at<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<Option<Chunk>> {
        let saved = reader.stream_position()?;
        reader.seek(SeekFrom::Start(offset))?;
        let chunk = Self::decode(reader)?;
        reader.seek(SeekFrom::Start(saved))?;
        Ok(chunk)
    }

    /// Serialize length, type, payload and CRC
    ///
    /// Length and CRC are always derived from the current payload. A payload
    /// longer than [`MAX_CHUNK_LENGTH`] encodes to nothing.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 12);
        // Writing into a Vec only fails on an oversized payload
        let _ = self.write_to(&mut out);
        out
    }

    /// Write the encoded chunk to `writer`
    ///
    /// Fails before writing anything when the payload exceeds
    /// [`MAX_CHUNK_LENGTH`].
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let length = length_field(self.data.len()).ok_or_else(|| {
            malformed(
                self.offset,
                format!("payload of {} bytes exceeds the chunk length limit", self.data.len()),
            )
        })?;
        writer.write_u32::<BigEndian>(length)?;
        writer.write_all(self.chunk_type.as_bytes())?;
        writer.write_all(&self.data)?;
        writer.write_u32::<BigEndian>(self.compute_crc())?;
        Ok(())
    }

    /// Replace the payload, updating length and CRC with it
    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        self.data = data.into();
        self.crc = self.compute_crc();
    }

    pub fn chunk_type(&self) -> ChunkType {
        self.chunk_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored CRC
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Offset in the source file (0 for chunks built in memory)
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_idat(&self) -> bool {
        self.chunk_type.is_idat()
    }

    pub fn is_iend(&self) -> bool {
        self.chunk_type.is_iend()
    }

    /// CRC-32 over type and current payload
    pub fn compute_crc(&self) -> u32 {
        calculate_crc(&self.chunk_type, &self.data)
    }

    /// Check whether the stored CRC matches the payload
    pub fn check_data(&self) -> bool {
        self.crc == self.compute_crc()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chunk of length {}, CRC: {:#010x}",
            self.chunk_type,
            self.len(),
            self.crc
        )
    }
}

/// Calculate CRC32 for a PNG chunk
pub fn calculate_crc(chunk_type: &ChunkType, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type.as_bytes());
    hasher.update(data);
    hasher.finalize()
}

fn malformed(offset: u64, reason: String) -> Error {
    Error::MalformedChunk { offset, reason }
}

/// Length field for a payload of `len` bytes, if it fits the PNG limit
fn length_field(len: usize) -> Option<u32> {
    u32::try_from(len).ok().filter(|&n| n <= MAX_CHUNK_LENGTH)
}

/// Map an early end of input inside a chunk to `MalformedChunk`
fn truncated(err: io::Error, offset: u64, field: &str) -> Error {
    if err.kind() == ErrorKind::UnexpectedEof {
        malformed(offset, format!("{} truncated", field))
    } else {
        err.into()
    }
}

/// Read until `buf` is full or the reader is exhausted, returning the count
///
/// Used for the length field, where zero bytes means a clean end of input.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
