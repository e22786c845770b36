//! Deliberate corruption of PNG image data.
//!
//! This crate inflates the pixel stream of a PNG, damages byte ranges inside
//! it with randomized operations, and deflates the result back into a file
//! whose chunk structure and checksums are still valid. Decoders accept the
//! output; the decoded pixels show the glitches.
//!
//! # Design
//!
//! - **Chunk codec**: [`Chunk`] keeps length and CRC derived from its payload
//! - **Container**: [`PngContainer`] owns the signature and ordered chunks,
//!   and converts between IDAT chunks and inflated data
//! - **Glitch engine**: primitives on a [`WorkingBuffer`] plus a weighted
//!   random driver, with all randomness injected
//!
//! # Quick Start
//!
//! ```no_run
//! use png_glitch::{GlitchSession, PngContainer};
//!
//! # fn main() -> png_glitch::Result<()> {
//! let png = PngContainer::load("image.png")?;
//! let mut session = GlitchSession::new(png)?;
//!
//! // Three copies, 100 bytes each, glitches of ~20 +/- 5 bytes
//! for (i, copy) in session.glitch_file(100, 20.0, 5.0, 3)?.enumerate() {
//!     copy?.write(format!("image.{}.png", i))?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Manual Glitching
//!
//! Primitives are only reachable inside a [`GlitchScope`], which holds the
//! inflated data until it is recompressed:
//!
//! ```no_run
//! use png_glitch::PngContainer;
//!
//! # fn main() -> png_glitch::Result<()> {
//! let mut png = PngContainer::load("image.png")?;
//! let mut rng = rand::thread_rng();
//!
//! let mut scope = png.begin_glitching()?;
//! scope.fill_zeros(&mut rng, 64, None)?;
//! scope.move_block(&mut rng, 32, Some(0), None)?;
//! scope.switch(&mut rng, 40, None, None, None)?;
//! scope.end_glitching()?;
//!
//! png.write("image.corrupt.png")?;
//! # Ok(())
//! # }
//! ```

mod chunk;
mod container;
mod error;
pub mod glitch;
mod options;

pub use chunk::{calculate_crc, Chunk, ChunkType, MAX_CHUNK_LENGTH};
pub use container::{PngContainer, PNG_SIGNATURE};
pub use error::{Error, Result};
pub use glitch::{
    AppliedGlitch, FixedSize, GaussianSize, GlitchOp, GlitchScope, GlitchSession,
    GlitchedCopies, OperationPool, SizeSampler, WorkingBuffer,
};
pub use options::GlitchOptions;

// Test utilities - only compiled for tests or when explicitly enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
