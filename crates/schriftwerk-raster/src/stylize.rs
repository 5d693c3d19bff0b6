// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ink stylization — roughen a binary ink mask to emulate organic pen texture.
//
// The only stage in the pipeline that is non-deterministic by design; all
// randomness flows through the caller-supplied RNG so a fixed seed gives
// byte-identical output.

use image::{GrayImage, Luma};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::filter::gaussian_blur_f32;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use schriftwerk_core::config::StylizeConfig;
use tracing::{debug, instrument};

/// Binarization level used when re-thresholding the perturbed mask.
const RETHRESHOLD_LEVEL: u8 = 128;

/// Perturbs binary ink masks with coherent Gaussian noise.
///
/// Pixel-independent noise alone produces salt-and-pepper speckle; the blur
/// in between spreads it into wobbly edges before re-binarization. The blur
/// divides the effective noise amplitude by roughly `2 * blur_sigma * sqrt(pi)`,
/// which is why the default `noise_sigma` is large.
pub struct InkStylizer {
    noise_sigma: f32,
    blur_sigma: f32,
}

impl InkStylizer {
    pub fn new(noise_sigma: f32, blur_sigma: f32) -> Self {
        Self {
            noise_sigma,
            blur_sigma,
        }
    }

    pub fn from_config(config: &StylizeConfig) -> Self {
        Self::new(config.noise_sigma, config.blur_sigma)
    }

    /// Roughen a binary mask (ink = 255). Output has identical dimensions
    /// and is binary again.
    #[instrument(skip_all, fields(width = mask.width(), height = mask.height()))]
    pub fn roughen(&self, mask: &GrayImage, rng: &mut impl Rng) -> GrayImage {
        let Ok(noise) = Normal::new(0.0f32, self.noise_sigma) else {
            // Zero/negative sigma: nothing to perturb.
            return mask.clone();
        };

        let (width, height) = mask.dimensions();
        let mut noisy = GrayImage::new(width, height);
        for (x, y, pixel) in mask.enumerate_pixels() {
            let perturbed = pixel.0[0] as f32 + noise.sample(rng);
            noisy.put_pixel(x, y, Luma([perturbed.clamp(0.0, 255.0) as u8]));
        }

        let blurred = if self.blur_sigma > 0.0 {
            gaussian_blur_f32(&noisy, self.blur_sigma)
        } else {
            noisy
        };

        debug!("Mask roughened");
        threshold(&blurred, RETHRESHOLD_LEVEL, ThresholdType::Binary)
    }
}
