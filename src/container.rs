//! PNG container: signature plus an ordered list of chunks
//!
//! Image data lives in the IDAT chunks as one zlib stream split across
//! chunk boundaries. [`PngContainer::decompress`] joins and inflates it,
//! [`PngContainer::recompress_and_replace`] deflates a buffer and splits it
//! back into IDAT chunks, keeping every other chunk in its original order.

use crate::{
    chunk::{Chunk, ChunkType, MAX_CHUNK_LENGTH},
    error::{Error, Result},
    glitch::GlitchScope,
};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, warn};

/// PNG signature
pub const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\r\n\x1a\n";

/// A parsed PNG file
///
/// `Clone` produces a fully independent copy; chunk payloads are owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngContainer {
    signature: [u8; 8],
    chunks: Vec<Chunk>,
}

impl PngContainer {
    /// Create an empty container with the standard signature
    pub fn new() -> Self {
        Self {
            signature: PNG_SIGNATURE,
            chunks: Vec::new(),
        }
    }

    /// Create a container from already built chunks
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self {
            signature: PNG_SIGNATURE,
            chunks,
        }
    }

    /// Load and parse a PNG file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let container = Self::from_reader(&mut reader)?;
        debug!(
            path = %path.display(),
            chunks = container.chunks.len(),
            "loaded PNG"
        );
        Ok(container)
    }

    /// Parse a PNG from an in-memory buffer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(&mut Cursor::new(bytes))
    }

    /// Parse a PNG from the current position of `reader`
    ///
    /// Chunks are read until the input ends or a chunk with an empty payload
    /// is found. That chunk is kept (normally IEND); anything after it is
    /// ignored.
    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut signature = [0u8; 8];
        reader.read_exact(&mut signature).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::NotAPng,
            _ => Error::Io(e),
        })?;
        if signature != PNG_SIGNATURE {
            return Err(Error::NotAPng);
        }

        let mut chunks = Vec::new();
        while let Some(chunk) = Chunk::decode(reader)? {
            let last = chunk.is_empty();
            if last && !chunk.is_iend() {
                warn!(
                    chunk_type = %chunk.chunk_type(),
                    offset = chunk.offset(),
                    "empty chunk ends parsing before IEND"
                );
            }
            chunks.push(chunk);
            if last {
                break;
            }
        }

        Ok(Self { signature, chunks })
    }

    pub fn signature(&self) -> &[u8; 8] {
        &self.signature
    }

    /// All chunks in file order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// IDAT chunks in file order
    pub fn idat_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|chunk| chunk.is_idat())
    }

    /// Payloads of the IDAT chunks in file order
    pub fn idat_payloads(&self) -> impl Iterator<Item = &[u8]> {
        self.idat_chunks().map(Chunk::data)
    }

    /// Every chunk except IDAT and IEND, order preserved
    pub fn other_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|chunk| !is_image_stream(chunk))
    }

    /// Payload length of the first IDAT chunk
    pub fn first_idat_len(&self) -> Option<usize> {
        self.idat_chunks().next().map(Chunk::len)
    }

    /// Chunks whose stored CRC does not match their payload
    pub fn corrupt_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|chunk| !chunk.check_data())
    }

    /// Inflate the concatenated IDAT payloads
    ///
    /// The result still has the per-scanline filter bytes applied.
    pub fn decompress(&self) -> Result<Vec<u8>> {
        let compressed_len: usize = self.idat_payloads().map(<[u8]>::len).sum();
        let mut compressed = Vec::with_capacity(compressed_len);
        let mut idat_count = 0;
        for payload in self.idat_payloads() {
            compressed.extend_from_slice(payload);
            idat_count += 1;
        }
        if idat_count == 0 {
            return Err(Error::NoImageData);
        }

        let mut raw = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut raw)
            .map_err(Error::Decompression)?;

        debug!(
            idat_chunks = idat_count,
            compressed = compressed_len,
            decompressed = raw.len(),
            "inflated image data"
        );
        Ok(raw)
    }

    /// Deflate `buffer` and replace the image stream with it
    ///
    /// The compressed stream is split into IDAT chunks of `chunk_size` bytes
    /// (the last one may be shorter). The new chunk list is every
    /// non-IDAT/IEND chunk in its original order, then the new IDAT chunks,
    /// then a fresh IEND. `chunk_size` must lie in `1..=MAX_CHUNK_LENGTH`.
    pub fn recompress_and_replace(&mut self, buffer: &[u8], chunk_size: usize) -> Result<()> {
        if chunk_size == 0 {
            return Err(Error::InvalidOptions("IDAT chunk size must be non-zero".into()));
        }
        if chunk_size > MAX_CHUNK_LENGTH as usize {
            return Err(Error::InvalidOptions(format!(
                "IDAT chunk size {} exceeds the chunk length limit",
                chunk_size
            )));
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(buffer)?;
        let compressed = encoder.finish()?;

        let mut chunks: Vec<Chunk> = std::mem::take(&mut self.chunks)
            .into_iter()
            .filter(|chunk| !is_image_stream(chunk))
            .collect();
        let kept = chunks.len();
        chunks.extend(
            compressed
                .chunks(chunk_size)
                .map(|piece| Chunk::new(ChunkType::IDAT, piece)),
        );
        let idat_count = chunks.len() - kept;
        chunks.push(Chunk::new(ChunkType::IEND, Vec::new()));
        self.chunks = chunks;

        debug!(
            raw = buffer.len(),
            compressed = compressed.len(),
            chunk_size,
            idat_chunks = idat_count,
            "replaced image data"
        );
        Ok(())
    }

    /// Replace the image stream, keeping the granularity of the first IDAT chunk
    pub fn replace_image_data(&mut self, buffer: &[u8]) -> Result<()> {
        let chunk_size = self.first_idat_len().ok_or(Error::NoImageData)?;
        self.recompress_and_replace(buffer, chunk_size)
    }

    /// Start a glitch session on this container
    ///
    /// The image data is inflated into a working buffer owned by the returned
    /// scope. The container only changes when the scope is ended with
    /// [`GlitchScope::end_glitching`].
    pub fn begin_glitching(&mut self) -> Result<GlitchScope<'_>> {
        GlitchScope::begin(self)
    }

    /// Write signature and chunks to `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.signature)?;
        for chunk in &self.chunks {
            chunk.write_to(writer)?;
        }
        Ok(())
    }

    /// Serialize the whole file into memory
    pub fn to_bytes(&self) -> Vec<u8> {
        let size = 8 + self.chunks.iter().map(|c| c.len() + 12).sum::<usize>();
        let mut out = Vec::with_capacity(size);
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut out);
        out
    }

    /// Write the file to `path`, replacing any existing file
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        debug!(path = %path.display(), chunks = self.chunks.len(), "wrote PNG");
        Ok(())
    }
}

impl Default for PngContainer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_image_stream(chunk: &Chunk) -> bool {
    chunk.is_idat() || chunk.is_iend()
}
