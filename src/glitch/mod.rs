//! Glitch sessions
//!
//! [`GlitchScope`] is the window in which a container's image data can be
//! edited: it owns the inflated working buffer and writes it back on
//! [`GlitchScope::end_glitching`]. Dropping the scope discards the edits.
//!
//! [`GlitchSession`] produces any number of independently glitched copies of
//! a container without touching the original.

mod buffer;
mod random;

pub use buffer::{random_bytes, WorkingBuffer};
pub use random::{
    random_glitches, AppliedGlitch, FixedSize, GaussianSize, GlitchOp, OperationPool,
    SizeSampler, DEFAULT_WEIGHTS, MIN_GLITCH_SIZE,
};

use crate::{
    container::PngContainer,
    error::{Error, Result},
    options::GlitchOptions,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::iter::FusedIterator;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Exclusive access to a container's inflated image data
///
/// Dereferences to the [`WorkingBuffer`], so all primitives are available
/// directly on the scope.
#[derive(Debug)]
pub struct GlitchScope<'a> {
    container: &'a mut PngContainer,
    buffer: WorkingBuffer,
    chunk_size: usize,
}

impl<'a> GlitchScope<'a> {
    pub(crate) fn begin(container: &'a mut PngContainer) -> Result<Self> {
        let chunk_size = container.first_idat_len().ok_or(Error::NoImageData)?;
        let data = container.decompress()?;
        Ok(Self::with_buffer(container, data, chunk_size))
    }

    fn with_buffer(container: &'a mut PngContainer, data: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            container,
            buffer: WorkingBuffer::new(data),
            chunk_size,
        }
    }

    pub fn buffer(&self) -> &WorkingBuffer {
        &self.buffer
    }

    /// IDAT size the buffer will be split into on end
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Spend `amount` bytes on glitches with normally distributed sizes
    pub fn random_glitches<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        amount: usize,
        mean: f64,
        deviation: f64,
    ) -> Result<Vec<AppliedGlitch>> {
        let sizes = GaussianSize::new(mean, deviation)?;
        self.random_glitches_with(rng, amount, &sizes, &OperationPool::default())
    }

    /// Spend `amount` bytes on glitches drawn from `sizes` and `pool`
    pub fn random_glitches_with<R, S>(
        &mut self,
        rng: &mut R,
        amount: usize,
        sizes: &S,
        pool: &OperationPool,
    ) -> Result<Vec<AppliedGlitch>>
    where
        R: Rng + ?Sized,
        S: SizeSampler + ?Sized,
    {
        random_glitches(&mut self.buffer, rng, amount, sizes, pool)
    }

    /// Recompress the buffer into the container and close the scope
    pub fn end_glitching(self) -> Result<()> {
        let Self {
            container,
            buffer,
            chunk_size,
        } = self;
        container.recompress_and_replace(buffer.as_slice(), chunk_size)
    }
}

impl Deref for GlitchScope<'_> {
    type Target = WorkingBuffer;

    fn deref(&self) -> &WorkingBuffer {
        &self.buffer
    }
}

impl DerefMut for GlitchScope<'_> {
    fn deref_mut(&mut self) -> &mut WorkingBuffer {
        &mut self.buffer
    }
}

/// Source of glitched copies of one PNG
///
/// The image data is inflated once; each copy starts from a fresh clone of
/// the original container and of that data.
#[derive(Debug)]
pub struct GlitchSession<R = StdRng> {
    original: PngContainer,
    pristine: Vec<u8>,
    chunk_size: usize,
    pool: OperationPool,
    rng: R,
}

impl GlitchSession<StdRng> {
    /// Session seeded from system entropy
    pub fn new(container: PngContainer) -> Result<Self> {
        Self::with_rng(container, StdRng::from_entropy())
    }

    /// Session with reproducible output
    pub fn seeded(container: PngContainer, seed: u64) -> Result<Self> {
        Self::with_rng(container, StdRng::seed_from_u64(seed))
    }

    /// Session seeded from `options.seed`, or from entropy when unset
    pub fn from_options(container: PngContainer, options: &GlitchOptions) -> Result<Self> {
        match options.seed {
            Some(seed) => Self::seeded(container, seed),
            None => Self::new(container),
        }
    }
}

impl<R: Rng> GlitchSession<R> {
    /// Session drawing all randomness from `rng`
    pub fn with_rng(container: PngContainer, rng: R) -> Result<Self> {
        let chunk_size = container.first_idat_len().ok_or(Error::NoImageData)?;
        let pristine = container.decompress()?;
        Ok(Self {
            original: container,
            pristine,
            chunk_size,
            pool: OperationPool::default(),
            rng,
        })
    }

    /// Replace the operation weights
    pub fn with_pool(mut self, pool: OperationPool) -> Self {
        self.pool = pool;
        self
    }

    /// The container copies are derived from
    pub fn original(&self) -> &PngContainer {
        &self.original
    }

    /// Inflated image data of the original
    pub fn decompressed(&self) -> &[u8] {
        &self.pristine
    }

    /// Produce one glitched copy
    pub fn glitch_once<S: SizeSampler + ?Sized>(
        &mut self,
        amount: usize,
        sizes: &S,
    ) -> Result<PngContainer> {
        let mut copy = self.original.clone();
        let mut scope = GlitchScope::with_buffer(&mut copy, self.pristine.clone(), self.chunk_size);
        let applied = scope.random_glitches_with(&mut self.rng, amount, sizes, &self.pool)?;
        scope.end_glitching()?;

        debug!(
            amount,
            operations = applied.len(),
            idat_chunks = copy.idat_chunks().count(),
            "produced glitched copy"
        );
        Ok(copy)
    }

    /// Lazily produce `copies` independently glitched containers
    ///
    /// Fails up front when `mean` or `deviation` are unusable.
    pub fn glitch_file(
        &mut self,
        amount: usize,
        mean: f64,
        deviation: f64,
        copies: usize,
    ) -> Result<GlitchedCopies<'_, R>> {
        let sizes = GaussianSize::new(mean, deviation)?;
        Ok(GlitchedCopies {
            session: self,
            amount,
            sizes,
            remaining: copies,
        })
    }

    /// [`glitch_file`](Self::glitch_file) driven by [`GlitchOptions`]
    ///
    /// The seed in `options` is not used here; it applies when the session
    /// is built with [`GlitchSession::from_options`].
    pub fn glitch_with_options(&mut self, options: &GlitchOptions) -> Result<GlitchedCopies<'_, R>> {
        self.glitch_file(
            options.amount,
            options.mean,
            options.deviation,
            options.copies,
        )
    }
}

/// Iterator over glitched copies, see [`GlitchSession::glitch_file`]
#[derive(Debug)]
pub struct GlitchedCopies<'a, R> {
    session: &'a mut GlitchSession<R>,
    amount: usize,
    sizes: GaussianSize,
    remaining: usize,
}

impl<R: Rng> Iterator for GlitchedCopies<'_, R> {
    type Item = Result<PngContainer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.session.glitch_once(self.amount, &self.sizes))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R: Rng> ExactSizeIterator for GlitchedCopies<'_, R> {}

impl<R: Rng> FusedIterator for GlitchedCopies<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{gradient_png, solid_png, PngBuilder};
    use crate::{Chunk, ChunkType};
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(1234)
    }

    fn load(bytes: &[u8]) -> PngContainer {
        PngContainer::from_bytes(bytes).unwrap()
    }

    #[test]
    fn test_scope_end_writes_buffer_back() {
        let mut png = load(&solid_png(8, 8, [0xFF, 0xFF, 0xFF]));
        let mut scope = png.begin_glitching().unwrap();
        let len = scope.len();
        scope.fill_zeros(&mut rng(), 10, Some(5)).unwrap();
        let expected = scope.buffer().as_slice().to_vec();
        scope.end_glitching().unwrap();

        let raw = png.decompress().unwrap();
        assert_eq!(raw.len(), len);
        assert_eq!(raw, expected);
        assert!(raw[5..15].iter().all(|&b| b == 0));
        assert_eq!(png.corrupt_chunks().count(), 0);
    }

    #[test]
    fn test_dropped_scope_leaves_container() {
        let mut png = load(&gradient_png(8, 8));
        let before = png.clone();
        {
            let mut scope = png.begin_glitching().unwrap();
            scope.fill_noise(&mut rng(), 50, None).unwrap();
        }
        assert_eq!(png, before);
    }

    #[test]
    fn test_begin_without_image_data() {
        let mut png = PngContainer::from_chunks(vec![Chunk::new(ChunkType::IEND, Vec::new())]);
        assert!(matches!(png.begin_glitching(), Err(Error::NoImageData)));
        assert!(matches!(
            GlitchSession::new(png),
            Err(Error::NoImageData)
        ));
    }

    #[test]
    fn test_scope_keeps_chunk_granularity() {
        let mut png = load(&PngBuilder::new(32, 32).idat_size(16).build());
        let mut scope = png.begin_glitching().unwrap();
        assert_eq!(scope.chunk_size(), 16);
        scope.random_glitches(&mut rng(), 100, 20.0, 5.0).unwrap();
        scope.end_glitching().unwrap();

        let idats: Vec<usize> = png.idat_chunks().map(Chunk::len).collect();
        assert!(idats[..idats.len() - 1].iter().all(|&n| n == 16));
    }

    #[test]
    fn test_glitch_file_count_and_isolation() {
        let png = load(&gradient_png(16, 16));
        let mut session = GlitchSession::with_rng(png.clone(), rng()).unwrap();

        let copies: Vec<PngContainer> = session
            .glitch_file(50, 10.0, 2.0, 3)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(copies.len(), 3);
        assert_eq!(session.original(), &png);
        for copy in &copies {
            let raw = copy.decompress().unwrap();
            assert_eq!(raw.len(), session.decompressed().len());
            assert_ne!(raw.as_slice(), session.decompressed());
        }
        assert_ne!(copies[0], copies[1]);
    }

    #[test]
    fn test_glitch_file_is_lazy_and_exact() {
        let mut session = GlitchSession::with_rng(load(&gradient_png(4, 4)), rng()).unwrap();
        let mut copies = session.glitch_file(10, 4.0, 1.0, 2).unwrap();
        assert_eq!(copies.len(), 2);
        assert!(copies.next().is_some());
        assert_eq!(copies.len(), 1);
        assert!(copies.next().is_some());
        assert!(copies.next().is_none());
        assert!(copies.next().is_none());
    }

    #[test]
    fn test_glitch_file_rejects_bad_deviation() {
        let mut session = GlitchSession::with_rng(load(&gradient_png(4, 4)), rng()).unwrap();
        assert!(matches!(
            session.glitch_file(10, 4.0, -1.0, 2),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_seeded_sessions_repeat() {
        let options = GlitchOptions::new().set_copies(2).set_seed(77);
        let run = || {
            let mut session =
                GlitchSession::from_options(load(&gradient_png(16, 16)), &options).unwrap();
            session
                .glitch_with_options(&options)
                .unwrap()
                .map(|copy| copy.unwrap().to_bytes())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_custom_pool() {
        let png = load(&solid_png(16, 16, [0xFF, 0xFF, 0xFF]));
        let mut session = GlitchSession::with_rng(png, rng())
            .unwrap()
            .with_pool(OperationPool::only(GlitchOp::FillZeros));
        let copy = session.glitch_once(30, &FixedSize(10)).unwrap();

        let raw = copy.decompress().unwrap();
        let zeros = raw.iter().filter(|&&b| b == 0).count();
        // Filter bytes are already zero; up to 30 more may be zeroed
        assert!(zeros > 16 && zeros <= 16 + 30);
    }
}
