//! Glitch configuration

use crate::error::Result;
use crate::glitch::GaussianSize;

/// Parameters for a randomized glitch run
///
/// Uses a builder pattern; the defaults corrupt 100 bytes in glitches of
/// about 20 bytes (standard deviation 5) and produce one copy.
///
/// # Example
///
/// ```no_run
/// use png_glitch::{GlitchOptions, GlitchSession, PngContainer};
///
/// # fn main() -> png_glitch::Result<()> {
/// let options = GlitchOptions::new()
///     .set_amount(400)
///     .set_mean(32.0)
///     .set_copies(3)
///     .set_seed(42);
///
/// let png = PngContainer::load("in.png")?;
/// let mut session = GlitchSession::from_options(png, &options)?;
/// for (i, copy) in session.glitch_with_options(&options)?.enumerate() {
///     copy?.write(format!("in.{}.png", i))?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GlitchOptions {
    /// Total number of bytes to corrupt per copy
    pub amount: usize,

    /// Mean size of one glitch in bytes
    pub mean: f64,

    /// Standard deviation of the glitch size
    pub deviation: f64,

    /// Number of glitched copies to produce
    pub copies: usize,

    /// Seed for reproducible output; entropy is used when unset
    pub seed: Option<u64>,
}

impl Default for GlitchOptions {
    fn default() -> Self {
        Self {
            amount: 100,
            mean: 20.0,
            deviation: 5.0,
            copies: 1,
            seed: None,
        }
    }
}

impl GlitchOptions {
    /// Create options with the default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_amount(mut self, amount: usize) -> Self {
        self.amount = amount;
        self
    }

    pub fn set_mean(mut self, mean: f64) -> Self {
        self.mean = mean;
        self
    }

    pub fn set_deviation(mut self, deviation: f64) -> Self {
        self.deviation = deviation;
        self
    }

    pub fn set_copies(mut self, copies: usize) -> Self {
        self.copies = copies;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Size distribution described by `mean` and `deviation`
    pub fn size_sampler(&self) -> Result<GaussianSize> {
        GaussianSize::new(self.mean, self.deviation)
    }

    /// Check that the options describe a usable run
    pub fn validate(&self) -> Result<()> {
        self.size_sampler().map(|_| ())
    }
}
