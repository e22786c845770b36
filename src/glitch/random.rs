//! Randomized glitch driver
//!
//! The driver is split into three seams so it can be tested
//! deterministically: a [`SizeSampler`] for glitch sizes, an
//! [`OperationPool`] for weighted operation selection, and the per-operation
//! position sampling done inside [`WorkingBuffer`].

use super::buffer::WorkingBuffer;
use crate::error::{Error, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::Normal;
use std::fmt;
use tracing::trace;

/// Smallest size the driver applies while budget remains
pub const MIN_GLITCH_SIZE: usize = 2;

/// Default operation weights: noise is favoured over rearrangement
pub const DEFAULT_WEIGHTS: [(GlitchOp, u32); 4] = [
    (GlitchOp::FillNoise, 4),
    (GlitchOp::FillZeros, 3),
    (GlitchOp::Move, 1),
    (GlitchOp::Switch, 1),
];

/// Source of raw glitch sizes
///
/// Samples may be negative or zero; the driver clamps them.
pub trait SizeSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64;
}

/// Normally distributed sizes, truncated toward zero
#[derive(Debug, Clone, Copy)]
pub struct GaussianSize {
    normal: Normal<f64>,
}

impl GaussianSize {
    pub fn new(mean: f64, deviation: f64) -> Result<Self> {
        if !mean.is_finite() {
            return Err(Error::InvalidOptions(format!(
                "mean glitch size must be finite, got {}",
                mean
            )));
        }
        if !deviation.is_finite() || deviation < 0.0 {
            return Err(Error::InvalidOptions(format!(
                "glitch size deviation must be finite and non-negative, got {}",
                deviation
            )));
        }
        let normal = Normal::new(mean, deviation).map_err(|e| {
            Error::InvalidOptions(format!("glitch size deviation {}: {}", deviation, e))
        })?;
        Ok(Self { normal })
    }

    pub fn mean(&self) -> f64 {
        self.normal.mean()
    }

    pub fn deviation(&self) -> f64 {
        self.normal.std_dev()
    }
}

impl SizeSampler for GaussianSize {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        // `as` truncates toward zero and saturates
        self.normal.sample(rng) as i64
    }
}

/// Always the same size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSize(pub usize);

impl SizeSampler for FixedSize {
    fn sample<R: Rng + ?Sized>(&self, _rng: &mut R) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

/// A glitch primitive the driver can pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlitchOp {
    FillNoise,
    FillZeros,
    Move,
    Switch,
}

impl GlitchOp {
    pub const ALL: [GlitchOp; 4] = [
        GlitchOp::FillNoise,
        GlitchOp::FillZeros,
        GlitchOp::Move,
        GlitchOp::Switch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FillNoise => "fill_noise",
            Self::FillZeros => "fill_zeros",
            Self::Move => "move",
            Self::Switch => "switch",
        }
    }

    /// Apply this operation with `length` bytes at random positions
    pub fn apply<R: Rng + ?Sized>(
        self,
        buffer: &mut WorkingBuffer,
        rng: &mut R,
        length: usize,
    ) -> Result<()> {
        match self {
            Self::FillNoise => buffer.fill_noise(rng, length, None),
            Self::FillZeros => buffer.fill_zeros(rng, length, None),
            Self::Move => buffer.move_block(rng, length, None, None),
            Self::Switch => buffer.switch(rng, length, None, None, None),
        }
    }
}

impl fmt::Display for GlitchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted pool of operations
#[derive(Debug, Clone)]
pub struct OperationPool {
    ops: Vec<GlitchOp>,
    weights: Vec<u32>,
    index: WeightedIndex<u32>,
}

impl OperationPool {
    /// Build a pool from `(operation, weight)` pairs
    ///
    /// Fails when the table is empty or every weight is zero.
    pub fn new(table: &[(GlitchOp, u32)]) -> Result<Self> {
        let ops: Vec<GlitchOp> = table.iter().map(|&(op, _)| op).collect();
        let weights: Vec<u32> = table.iter().map(|&(_, w)| w).collect();
        let index = WeightedIndex::new(&weights)
            .map_err(|e| Error::InvalidOptions(format!("operation weights: {}", e)))?;
        Ok(Self {
            ops,
            weights,
            index,
        })
    }

    /// Pool containing a single operation
    pub fn only(op: GlitchOp) -> Self {
        match Self::new(&[(op, 1)]) {
            Ok(pool) => pool,
            Err(_) => unreachable!("a single positive weight is always valid"),
        }
    }

    /// Draw one operation
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> GlitchOp {
        self.ops[self.index.sample(rng)]
    }

    /// Combined weight of `op` in this pool
    pub fn weight(&self, op: GlitchOp) -> u32 {
        self.ops
            .iter()
            .zip(&self.weights)
            .filter(|(candidate, _)| **candidate == op)
            .map(|(_, &w)| w)
            .sum()
    }
}

impl Default for OperationPool {
    fn default() -> Self {
        Self::new(&DEFAULT_WEIGHTS).unwrap_or_else(|_| Self::only(GlitchOp::FillNoise))
    }
}

/// One operation applied by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedGlitch {
    pub op: GlitchOp,
    /// Budget consumed by this operation
    pub size: usize,
}

/// Apply random glitches to `buffer` until `amount` bytes of budget are spent
///
/// Each step draws a size from `sizes`, clamps it to
/// `[MIN_GLITCH_SIZE, remaining]`, charges it to the budget and applies one
/// operation from `pool` at random positions. The applied length is further
/// limited to the buffer length, so small buffers never fail.
pub fn random_glitches<R, S>(
    buffer: &mut WorkingBuffer,
    rng: &mut R,
    amount: usize,
    sizes: &S,
    pool: &OperationPool,
) -> Result<Vec<AppliedGlitch>>
where
    R: Rng + ?Sized,
    S: SizeSampler + ?Sized,
{
    let mut applied = Vec::new();
    let mut remaining = amount;

    while remaining > 0 {
        let sampled = sizes.sample(rng);
        let size = usize::try_from(sampled)
            .unwrap_or(0)
            .max(MIN_GLITCH_SIZE)
            .min(remaining);
        remaining -= size;

        let op = pool.choose(rng);
        let length = size.min(buffer.len());
        trace!(op = op.as_str(), size, length, remaining, "applying glitch");
        op.apply(buffer, rng, length)?;
        applied.push(AppliedGlitch { op, size });
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    struct Scripted(Vec<i64>, std::cell::Cell<usize>);

    impl SizeSampler for Scripted {
        fn sample<R: Rng + ?Sized>(&self, _rng: &mut R) -> i64 {
            let i = self.1.get();
            self.1.set(i + 1);
            self.0[i % self.0.len()]
        }
    }

    #[test]
    fn test_budget_is_spent_exactly() {
        let mut buffer = WorkingBuffer::new(vec![0x80; 4096]);
        let sizes = GaussianSize::new(20.0, 5.0).unwrap();
        let applied =
            random_glitches(&mut buffer, &mut rng(), 100, &sizes, &OperationPool::default())
                .unwrap();

        let total: usize = applied.iter().map(|g| g.size).sum();
        assert_eq!(total, 100);
        assert_eq!(buffer.len(), 4096);
        // Every step but the last is at least the minimum size
        let (_, head) = applied.split_last().unwrap();
        assert!(head.iter().all(|g| g.size >= MIN_GLITCH_SIZE));
    }

    #[test]
    fn test_sizes_are_clamped() {
        let mut buffer = WorkingBuffer::new(vec![1; 256]);
        let sizes = Scripted(vec![-40, 0, 1, 7, 1000], Default::default());
        let applied = random_glitches(
            &mut buffer,
            &mut rng(),
            30,
            &sizes,
            &OperationPool::only(GlitchOp::FillZeros),
        )
        .unwrap();

        let got: Vec<usize> = applied.iter().map(|g| g.size).collect();
        assert_eq!(got, [2, 2, 2, 7, 17]);
    }

    #[test]
    fn test_odd_remainder_ends_with_one() {
        let mut buffer = WorkingBuffer::new(vec![1; 64]);
        let applied = random_glitches(
            &mut buffer,
            &mut rng(),
            5,
            &FixedSize(2),
            &OperationPool::default(),
        )
        .unwrap();
        let got: Vec<usize> = applied.iter().map(|g| g.size).collect();
        assert_eq!(got, [2, 2, 1]);
    }

    #[test]
    fn test_zero_amount_does_nothing() {
        let mut buffer = WorkingBuffer::new(vec![1; 64]);
        let applied = random_glitches(
            &mut buffer,
            &mut rng(),
            0,
            &FixedSize(10),
            &OperationPool::default(),
        )
        .unwrap();
        assert!(applied.is_empty());
        assert_eq!(buffer.as_slice(), &[1; 64]);
    }

    #[test]
    fn test_tiny_and_empty_buffers() {
        let pool = OperationPool::default();
        let mut tiny = WorkingBuffer::new(vec![3; 3]);
        random_glitches(&mut tiny, &mut rng(), 200, &FixedSize(50), &pool).unwrap();
        assert_eq!(tiny.len(), 3);

        let mut empty = WorkingBuffer::new(Vec::new());
        let applied = random_glitches(&mut empty, &mut rng(), 40, &FixedSize(10), &pool).unwrap();
        assert_eq!(applied.len(), 4);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_only_zeros_pool() {
        let mut buffer = WorkingBuffer::new(vec![0xFF; 1000]);
        random_glitches(
            &mut buffer,
            &mut rng(),
            50,
            &FixedSize(10),
            &OperationPool::only(GlitchOp::FillZeros),
        )
        .unwrap();
        let zeros = buffer.as_slice().iter().filter(|&&b| b == 0).count();
        assert!(zeros > 0 && zeros <= 50);
    }

    #[test]
    fn test_default_weights() {
        let pool = OperationPool::default();
        for (op, (listed, weight)) in GlitchOp::ALL.iter().zip(DEFAULT_WEIGHTS) {
            assert_eq!(*op, listed);
            assert_eq!(pool.weight(*op), weight);
        }
        assert_eq!(pool.weight(GlitchOp::FillNoise), 4);
        assert_eq!(pool.weight(GlitchOp::Switch), 1);

        let mut rng = rng();
        let mut counts: HashMap<GlitchOp, usize> = HashMap::new();
        for _ in 0..9000 {
            *counts.entry(pool.choose(&mut rng)).or_default() += 1;
        }
        // Expected 4000 / 3000 / 1000 / 1000
        assert!((3700..4300).contains(&counts[&GlitchOp::FillNoise]));
        assert!((2700..3300).contains(&counts[&GlitchOp::FillZeros]));
        assert!((800..1200).contains(&counts[&GlitchOp::Move]));
        assert!((800..1200).contains(&counts[&GlitchOp::Switch]));
    }

    #[test]
    fn test_only_pool_always_picks_its_op() {
        let pool = OperationPool::only(GlitchOp::Move);
        assert_eq!(pool.weight(GlitchOp::Move), 1);
        assert_eq!(pool.weight(GlitchOp::FillNoise), 0);
        let mut rng = rng();
        assert!((0..50).all(|_| pool.choose(&mut rng) == GlitchOp::Move));
    }

    #[test]
    fn test_pool_rejects_zero_weights() {
        assert!(OperationPool::new(&[]).is_err());
        assert!(OperationPool::new(&[(GlitchOp::Move, 0), (GlitchOp::Switch, 0)]).is_err());

        let pool = OperationPool::new(&[(GlitchOp::Move, 0), (GlitchOp::Switch, 2)]).unwrap();
        let mut rng = rng();
        assert!((0..100).all(|_| pool.choose(&mut rng) == GlitchOp::Switch));
    }

    #[test]
    fn test_gaussian_validation() {
        assert!(matches!(
            GaussianSize::new(20.0, -1.0),
            Err(Error::InvalidOptions(_))
        ));
        assert!(GaussianSize::new(20.0, -0.001).is_err());
        assert!(GaussianSize::new(f64::NAN, 1.0).is_err());
        assert!(GaussianSize::new(20.0, f64::INFINITY).is_err());

        let fixed = GaussianSize::new(12.9, 0.0).unwrap();
        assert_eq!(fixed.sample(&mut rng()), 12);
        assert_eq!(fixed.mean(), 12.9);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let sizes = GaussianSize::new(20.0, 5.0).unwrap();
        let pool = OperationPool::default();
        let run = || {
            let mut buffer = WorkingBuffer::new((0..=255u8).cycle().take(2048).collect());
            let mut rng = ChaCha8Rng::seed_from_u64(99);
            random_glitches(&mut buffer, &mut rng, 300, &sizes, &pool).unwrap();
            buffer
        };
        assert_eq!(run(), run());
    }
}
