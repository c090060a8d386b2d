//! Frequency response evaluation
//!
//! Curves are computed in closed form from the coefficients the audio path
//! is running, never by time-domain simulation, so a displayed curve always
//! matches what is heard.

use std::f64::consts::PI;

use crate::biquad::BiquadCoeffs;
use crate::chain::{FilterChain, NUM_BANDS};

/// Number of grid frequencies
pub const GRID_POINTS: usize = 300;

/// First grid frequency, in Hz
const GRID_START_HZ: f64 = 20.0;

/// Grid points per octave; consecutive frequencies differ by 2^(1/30)
const POINTS_PER_OCTAVE: f64 = 30.0;

/// Linear magnitudes, one per grid frequency
pub type MagnitudeCurve = Vec<f64>;

/// Fixed logarithmic frequency grid shared by every curve evaluation.
/// Created once at startup, never mutated.
#[derive(Debug, Clone)]
pub struct FrequencyGrid {
    freqs: Vec<f64>,
}

impl Default for FrequencyGrid {
    fn default() -> Self {
        Self::standard()
    }
}

impl FrequencyGrid {
    /// 300 frequencies from 20 Hz, 30 per octave: `f_i = 20 * 2^(i/30)`
    pub fn standard() -> Self {
        let freqs = (0..GRID_POINTS)
            .map(|i| GRID_START_HZ * 2.0_f64.powf(i as f64 / POINTS_PER_OCTAVE))
            .collect();
        Self { freqs }
    }

    #[inline]
    pub fn frequencies(&self) -> &[f64] {
        &self.freqs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Index of the grid frequency closest to `freq` (log distance)
    pub fn nearest_index(&self, freq: f64) -> usize {
        let i = (freq.max(GRID_START_HZ) / GRID_START_HZ).log2() * POINTS_PER_OCTAVE;
        (i.round() as usize).min(self.freqs.len() - 1)
    }
}

/// Magnitude of H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)
/// evaluated at z = e^(jw), w = 2 pi freq / sample_rate
pub fn magnitude_at(coeffs: &BiquadCoeffs, freq: f64, sample_rate: f64) -> f64 {
    let omega = 2.0 * PI * freq / sample_rate;
    let cos_w = omega.cos();
    let sin_w = omega.sin();
    let cos_2w = (2.0 * omega).cos();
    let sin_2w = (2.0 * omega).sin();

    // z^-1 = cos(w) - j sin(w), z^-2 = cos(2w) - j sin(2w)
    let num_re = coeffs.b0 + coeffs.b1 * cos_w + coeffs.b2 * cos_2w;
    let num_im = -coeffs.b1 * sin_w - coeffs.b2 * sin_2w;
    let den_re = 1.0 + coeffs.a1 * cos_w + coeffs.a2 * cos_2w;
    let den_im = -coeffs.a1 * sin_w - coeffs.a2 * sin_2w;

    let num_mag_sq = num_re * num_re + num_im * num_im;
    let den_mag_sq = den_re * den_re + den_im * den_im;

    (num_mag_sq / den_mag_sq.max(1e-20)).sqrt()
}

/// Magnitude curve of one band's installed coefficients.
/// Activation does not enter here; a bypassed band still has a curve.
pub fn band_curve(chain: &FilterChain, grid: &FrequencyGrid, band: usize) -> MagnitudeCurve {
    let coeffs = chain.coeffs(band);
    let sample_rate = chain.sample_rate();
    grid.frequencies()
        .iter()
        .map(|&freq| magnitude_at(&coeffs, freq, sample_rate))
        .collect()
}

/// Combined curve of the cascade: per grid frequency, the product of every
/// audible band's magnitude. Bands outside the audible mask contribute
/// nothing, exactly as if removed from the cascade.
pub fn combined_curve(chain: &FilterChain, grid: &FrequencyGrid) -> MagnitudeCurve {
    let mask = chain.audible_mask();
    let sample_rate = chain.sample_rate();
    let coeffs: Vec<BiquadCoeffs> = (0..NUM_BANDS).map(|band| chain.coeffs(band)).collect();

    grid.frequencies()
        .iter()
        .map(|&freq| {
            let mut magnitude = 1.0;
            for (band, c) in coeffs.iter().enumerate() {
                if mask & (1 << band) != 0 {
                    magnitude *= magnitude_at(c, freq, sample_rate);
                }
            }
            magnitude
        })
        .collect()
}
