//! Error types for png-glitch

use std::io;

/// Result type for png-glitch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, glitching or writing a PNG
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input does not start with the PNG signature
    #[error("Not a PNG file")]
    NotAPng,

    /// A chunk could not be read in full
    #[error("Malformed chunk at offset {offset}: {reason}")]
    MalformedChunk { offset: u64, reason: String },

    /// The concatenated IDAT payloads do not inflate
    #[error("Decompression failed: {0}")]
    Decompression(#[source] io::Error),

    /// The container has no IDAT chunk
    #[error("No IDAT chunk found")]
    NoImageData,

    /// An explicit position or length falls outside the working buffer
    #[error("{len} bytes at offset {pos} out of bounds for buffer of {buffer_len} bytes")]
    OutOfBounds {
        pos: usize,
        len: usize,
        buffer_len: usize,
    },

    /// The two blocks of a switch overlap
    #[error("Blocks overlap: {pos_one}+{len_one} runs past {pos_two}")]
    OverlappingBlocks {
        pos_one: usize,
        len_one: usize,
        pos_two: usize,
    },

    /// Glitch parameters are unusable
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl Error {
    pub(crate) fn out_of_bounds(pos: usize, len: usize, buffer_len: usize) -> Self {
        Self::OutOfBounds {
            pos,
            len,
            buffer_len,
        }
    }
}
