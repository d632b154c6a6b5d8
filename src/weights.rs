//! Blur kernel weights and the taps derived from them.
//!
//! A kernel is stored as nine weights. Index 4 is the centre texel, index `4 + k`
//! is the texel `k` steps along the blur direction and index `4 - k` is the texel
//! `k` steps against it. Before a dispatch the kernel is turned into a list of
//! [`Tap`]s: either one fetch per texel ([`SamplingMode::Discrete`]) or pairs of
//! neighbouring texels merged into a single bilinear fetch
//! ([`SamplingMode::Linear`]).

use smallvec::SmallVec;

use crate::error::BlurError;

/// Number of weights in a blur kernel.
pub const KERNEL_TAPS: usize = 9;

/// Largest supported blur radius, in texels on each side of the centre.
pub const MAX_RADIUS: u32 = (KERNEL_TAPS as u32 - 1) / 2;

const CENTER: usize = MAX_RADIUS as usize;

/// Taps for one pass. Never more than [`KERNEL_TAPS`].
pub type Taps = SmallVec<[Tap; KERNEL_TAPS]>;

/// A single texture fetch of a blur pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    /// Distance from the centre texel in texels. Fractional for merged taps.
    pub offset: f32,
    pub weight: f32,
}

/// How kernel weights are turned into texture fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    /// Merge neighbouring texels into one bilinear fetch (5 fetches for a 9-tap kernel).
    #[default]
    Linear,
    /// One fetch per kernel weight.
    Discrete,
}

/// A 9-tap blur kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurWeights([f32; KERNEL_TAPS]);

impl Default for BlurWeights {
    fn default() -> Self {
        // 2.5 is the default sigma and is always valid.
        Self::gaussian_unchecked(crate::filter::DEFAULT_SIGMA)
    }
}

impl BlurWeights {
    /// Stores the kernel verbatim.
    pub fn new(weights: [f32; KERNEL_TAPS]) -> Self {
        Self(weights)
    }

    /// A normalized Gaussian kernel with standard deviation `sigma`.
    pub fn gaussian(sigma: f32) -> Result<Self, BlurError> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(BlurError::InvalidSigma(sigma));
        }
        Ok(Self::gaussian_unchecked(sigma))
    }

    fn gaussian_unchecked(sigma: f32) -> Self {
        let two_sigma_sq = 2.0 * sigma * sigma;
        // Tiny sigmas underflow to zero; the limit is all weight on the centre.
        if !two_sigma_sq.is_normal() {
            let mut weights = [0.0f32; KERNEL_TAPS];
            weights[CENTER] = 1.0;
            return Self(weights);
        }

        let mut weights = [0.0f32; KERNEL_TAPS];
        for (i, weight) in weights.iter_mut().enumerate() {
            let x = i as f32 - CENTER as f32;
            *weight = (-(x * x) / two_sigma_sq).exp();
        }

        // The centre term is exp(0) = 1 and the rest are finite, so the sum is at least 1.
        let sum: f32 = weights.iter().sum();
        for weight in weights.iter_mut() {
            *weight /= sum;
        }

        Self(weights)
    }

    pub fn as_array(&self) -> &[f32; KERNEL_TAPS] {
        &self.0
    }

    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Weight for the texel `offset` steps from the centre.
    pub fn at(&self, offset: i32) -> f32 {
        let index = CENTER as i32 + offset;
        if (0..KERNEL_TAPS as i32).contains(&index) {
            self.0[index as usize]
        } else {
            0.0
        }
    }

    /// The kernel limited to `radius` texels on each side.
    ///
    /// Weights outside the radius are zeroed and the remaining weights are scaled
    /// so they still add up to the full kernel sum. A radius of [`MAX_RADIUS`] or
    /// more returns the kernel unchanged. When the kept weights add up to zero
    /// they can't be rescaled and the result is all zeros.
    pub fn truncated(&self, radius: u32) -> [f32; KERNEL_TAPS] {
        if radius >= MAX_RADIUS {
            return self.0;
        }

        let radius = radius as usize;
        let mut weights = [0.0f32; KERNEL_TAPS];
        weights[CENTER - radius..=CENTER + radius]
            .copy_from_slice(&self.0[CENTER - radius..=CENTER + radius]);

        let kept: f32 = weights.iter().sum();
        if kept.abs() > f32::EPSILON {
            let scale = self.sum() / kept;
            for weight in weights.iter_mut() {
                *weight *= scale;
            }
        } else if weights.iter().all(|weight| *weight == 0.0) {
            tracing::warn!(radius, "no kernel weight within blur radius, blur clears the input");
        }

        weights
    }

    /// Texture fetches for one pass at the given radius.
    pub fn taps(&self, radius: u32, mode: SamplingMode) -> Taps {
        let radius = radius.min(MAX_RADIUS);
        let kernel = Self(self.truncated(radius));

        let mut taps = Taps::new();
        taps.push(Tap {
            offset: 0.0,
            weight: kernel.at(0),
        });

        for direction in [1i32, -1] {
            match mode {
                SamplingMode::Discrete => {
                    for k in 1..=radius as i32 {
                        push_nonzero(&mut taps, (direction * k) as f32, kernel.at(direction * k));
                    }
                }
                SamplingMode::Linear => kernel.push_linear_side(&mut taps, radius as i32, direction),
            }
        }

        taps
    }

    fn push_linear_side(&self, taps: &mut Taps, radius: i32, direction: i32) {
        let mut k = 1;
        while k <= radius {
            let near = self.at(direction * k);
            if k == radius {
                push_nonzero(taps, (direction * k) as f32, near);
                break;
            }

            let far = self.at(direction * (k + 1));
            let total = near + far;
            // Bilinear fetches can only blend with non-negative factors.
            if near * far < 0.0 || total.abs() <= f32::EPSILON {
                push_nonzero(taps, (direction * k) as f32, near);
                push_nonzero(taps, (direction * (k + 1)) as f32, far);
            } else {
                let offset = (k as f32 * near + (k + 1) as f32 * far) / total;
                taps.push(Tap {
                    offset: direction as f32 * offset,
                    weight: total,
                });
            }
            k += 2;
        }
    }
}

fn push_nonzero(taps: &mut Taps, offset: f32, weight: f32) {
    if weight != 0.0 {
        taps.push(Tap { offset, weight });
    }
}
