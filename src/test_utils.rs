//! Test utilities for building PNG fixtures in memory.
//!
//! Fixtures are 8-bit RGB, non-interlaced images with filter type 0 on every
//! scanline. They need no files on disk, which keeps the tests hermetic.
//!
//! # Usage
//!
//! ```no_run
//! use png_glitch::test_utils::*;
//! use png_glitch::PngContainer;
//!
//! # fn example() -> png_glitch::Result<()> {
//! // 16x16 black image in a single IDAT chunk
//! let bytes = solid_png(16, 16, [0, 0, 0]);
//! let png = PngContainer::from_bytes(&bytes)?;
//!
//! // Gradient split into 64-byte IDAT chunks
//! let bytes = PngBuilder::new(32, 32).idat_size(64).build();
//! # Ok(())
//! # }
//! ```

use std::{fs, io::Write, path::Path, path::PathBuf};

use flate2::{write::ZlibEncoder, Compression};

use crate::{Chunk, ChunkType, Result, PNG_SIGNATURE};

/// IDAT payload size used when none is given
pub const DEFAULT_IDAT_SIZE: usize = 8192;

type PixelFn = Box<dyn Fn(u32, u32) -> [u8; 3]>;

/// Builder for small RGB PNG files
pub struct PngBuilder {
    width: u32,
    height: u32,
    idat_size: usize,
    pixel: PixelFn,
    before_idat: Vec<Chunk>,
    after_idat: Vec<Chunk>,
}

impl PngBuilder {
    /// Start a `width` x `height` image filled with a diagonal gradient
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            idat_size: DEFAULT_IDAT_SIZE,
            pixel: Box::new(|x, y| [(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8]),
            before_idat: Vec::new(),
            after_idat: Vec::new(),
        }
    }

    /// Set the colour of every pixel from its coordinates
    pub fn pixels(mut self, pixel: impl Fn(u32, u32) -> [u8; 3] + 'static) -> Self {
        self.pixel = Box::new(pixel);
        self
    }

    /// Split the compressed stream into IDAT chunks of this size
    pub fn idat_size(mut self, size: usize) -> Self {
        self.idat_size = size.max(1);
        self
    }

    /// Insert a chunk between IHDR and the first IDAT
    pub fn chunk_before_idat(mut self, chunk: Chunk) -> Self {
        self.before_idat.push(chunk);
        self
    }

    /// Insert a chunk between the last IDAT and IEND
    pub fn chunk_after_idat(mut self, chunk: Chunk) -> Self {
        self.after_idat.push(chunk);
        self
    }

    /// Uncompressed scanlines, each prefixed with filter type 0
    pub fn raw_scanlines(&self) -> Vec<u8> {
        let row_len = 1 + self.width as usize * 3;
        let mut raw = Vec::with_capacity(row_len * self.height as usize);
        for y in 0..self.height {
            raw.push(0);
            for x in 0..self.width {
                raw.extend_from_slice(&(self.pixel)(x, y));
            }
        }
        raw
    }

    /// Encode the complete file
    pub fn build(&self) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        // Writing into a Vec cannot fail
        let _ = encoder.write_all(&self.raw_scanlines());
        let compressed = encoder.finish().unwrap_or_default();

        let mut out = PNG_SIGNATURE.to_vec();
        out.extend(Chunk::new(ChunkType::IHDR, ihdr_data(self.width, self.height)).encode());
        for chunk in &self.before_idat {
            out.extend(chunk.encode());
        }
        for piece in compressed.chunks(self.idat_size) {
            out.extend(Chunk::new(ChunkType::IDAT, piece).encode());
        }
        for chunk in &self.after_idat {
            out.extend(chunk.encode());
        }
        out.extend(Chunk::new(ChunkType::IEND, Vec::new()).encode());
        out
    }
}

/// IHDR payload for an 8-bit RGB, non-interlaced image
pub fn ihdr_data(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[
        0x08, // Bit depth: 8
        0x02, // Color type: RGB
        0x00, // Compression: deflate
        0x00, // Filter: adaptive
        0x00, // Interlace: none
    ]);
    data
}

/// Single-colour RGB image in one IDAT chunk
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    PngBuilder::new(width, height).pixels(move |_, _| rgb).build()
}

/// Gradient RGB image in one IDAT chunk
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    PngBuilder::new(width, height).build()
}

/// Write fixture bytes into `dir` and return the file path
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}
