//! Working buffer and the byte-level glitch primitives
//!
//! Every primitive leaves the buffer length unchanged. Omitted positions are
//! drawn uniformly from the offsets that keep the affected range in bounds;
//! explicit positions are validated and rejected with
//! [`Error::OutOfBounds`] when they do not fit.

use crate::error::{Error, Result};
use rand::Rng;

/// Inflated image data being glitched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingBuffer {
    data: Vec<u8>,
}

impl WorkingBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Overwrite bytes starting at `pos` with `data`
    ///
    /// Bytes that would land past the end are dropped, so the buffer never grows.
    pub fn replace(&mut self, pos: usize, data: &[u8]) -> Result<()> {
        let len = self.data.len();
        if pos > len {
            return Err(Error::out_of_bounds(pos, data.len(), len));
        }
        let end = pos.saturating_add(data.len()).min(len);
        self.data[pos..end].copy_from_slice(&data[..end - pos]);
        Ok(())
    }

    /// Overwrite `length` bytes with uniformly random values
    pub fn fill_noise<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        length: usize,
        pos: Option<usize>,
    ) -> Result<()> {
        let pos = self.resolve_start(rng, length, pos)?;
        let noise = random_bytes(rng, length);
        self.replace(pos, &noise)
    }

    /// Overwrite `length` bytes with zeros
    pub fn fill_zeros<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        length: usize,
        pos: Option<usize>,
    ) -> Result<()> {
        let pos = self.resolve_start(rng, length, pos)?;
        self.replace(pos, &vec![0u8; length])
    }

    /// Cut `length` bytes at `from` and reinsert them at `to`
    ///
    /// `to` indexes the buffer after the block has been removed, so
    /// `move_block(5, Some(0), Some(50))` on 100 bytes puts the block at 50..55.
    pub fn move_block<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        length: usize,
        from: Option<usize>,
        to: Option<usize>,
    ) -> Result<()> {
        let from = self.resolve_start(rng, length, from)?;
        let to = self.resolve_start(rng, length, to)?;

        let original_len = self.data.len();
        let block = self.remove(from, length);
        self.insert(to, &block);
        debug_assert_eq!(self.data.len(), original_len);
        Ok(())
    }

    /// Exchange two non-overlapping blocks
    ///
    /// Without `len_two`, `len_one` is split at random into two non-empty
    /// parts. Without positions, `pos_one` is chosen so both blocks fit one
    /// after the other and `pos_two` is chosen after the end of block one.
    /// The region `pos_one..pos_two + len_two` ends up as block two, the
    /// bytes between the blocks, then block one; nothing outside it changes.
    ///
    /// An omitted `pos_one` is drawn without regard to an explicit `pos_two`,
    /// so such a call fails with [`Error::OverlappingBlocks`] whenever the
    /// drawn block lands on block two. The buffer is unchanged on failure.
    pub fn switch<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        len_one: usize,
        pos_one: Option<usize>,
        len_two: Option<usize>,
        pos_two: Option<usize>,
    ) -> Result<()> {
        let len = self.data.len();
        let (mut len_one, mut len_two) = match len_two {
            Some(len_two) => (len_one, len_two),
            None if len_one == 0 => return Ok(()),
            None => {
                let second = rng.gen_range(1..=len_one);
                (len_one - second, second)
            }
        };
        let total = len_one.saturating_add(len_two);

        let mut pos_one = match pos_one {
            Some(pos) => pos,
            None => {
                let max = len
                    .checked_sub(total)
                    .ok_or_else(|| Error::out_of_bounds(0, total, len))?;
                rng.gen_range(0..=max)
            }
        };
        let mut pos_two = match pos_two {
            Some(pos) => pos,
            None => {
                let min = pos_one.saturating_add(len_one);
                match len.checked_sub(len_two) {
                    Some(max) if min <= max => rng.gen_range(min..=max),
                    _ => return Err(Error::out_of_bounds(pos_one, total, len)),
                }
            }
        };

        self.check_range(pos_one, len_one)?;
        self.check_range(pos_two, len_two)?;
        if pos_one > pos_two {
            std::mem::swap(&mut pos_one, &mut pos_two);
            std::mem::swap(&mut len_one, &mut len_two);
        }
        if pos_one + len_one > pos_two {
            return Err(Error::OverlappingBlocks {
                pos_one,
                len_one,
                pos_two,
            });
        }

        self.move_block(rng, len_two, Some(pos_two), Some(pos_one + len_one))?;
        self.move_block(rng, len_one, Some(pos_one), Some(pos_two + len_two - len_one))
    }

    /// Insert `bytes` at `pos`, growing the buffer
    pub(crate) fn insert(&mut self, pos: usize, bytes: &[u8]) -> usize {
        self.data.splice(pos..pos, bytes.iter().copied());
        bytes.len()
    }

    /// Remove and return `length` bytes at `pos`, shrinking the buffer
    pub(crate) fn remove(&mut self, pos: usize, length: usize) -> Vec<u8> {
        self.data.drain(pos..pos + length).collect()
    }

    /// Validate an explicit start or draw a random one for a `length`-byte range
    fn resolve_start<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        length: usize,
        pos: Option<usize>,
    ) -> Result<usize> {
        match pos {
            Some(pos) => {
                self.check_range(pos, length)?;
                Ok(pos)
            }
            None => {
                let max = self
                    .data
                    .len()
                    .checked_sub(length)
                    .ok_or_else(|| Error::out_of_bounds(0, length, self.data.len()))?;
                Ok(rng.gen_range(0..=max))
            }
        }
    }

    fn check_range(&self, pos: usize, length: usize) -> Result<()> {
        match pos.checked_add(length) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(Error::out_of_bounds(pos, length, self.data.len())),
        }
    }
}

impl From<Vec<u8>> for WorkingBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for WorkingBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// `length` independent uniformly random bytes
pub fn random_bytes<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; length];
    rng.fill(bytes.as_mut_slice());
    bytes
}
