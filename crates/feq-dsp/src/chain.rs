//! Fixed four-band filter cascade with bypass/solo activation
//!
//! Band order is fixed and significant: low shelf, two peaking mids, high
//! shelf, cascaded 0 -> 3. Cascading is not commutative once gain != 0 dB.

use feq_core::Sample;
use serde::{Deserialize, Serialize};

use crate::biquad::{BiquadCoeffs, BiquadSection, FilterShape};
use crate::{Processor, ProcessorConfig, StereoProcessor};

/// Number of equalizer bands
pub const NUM_BANDS: usize = 4;

/// Shape of each band, by index; never changes at runtime
pub const BAND_SHAPES: [FilterShape; NUM_BANDS] = [
    FilterShape::LowShelf,
    FilterShape::Peaking,
    FilterShape::Peaking,
    FilterShape::HighShelf,
];

/// Default sample rate for fallback
const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

/// Musical parameters of one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandParams {
    pub cutoff_hz: f64,
    pub q: f64,
    pub gain_db: f64,
}

impl BandParams {
    /// Defaults for a shape, from its parameter ranges
    pub fn default_for(shape: FilterShape) -> Self {
        Self {
            cutoff_hz: shape.cutoff_range().default,
            q: shape.q_range().default,
            gain_db: shape.gain_range().default,
        }
    }

    /// Clamp every field into the shape's bounds
    pub fn clamped(self, shape: FilterShape) -> Self {
        Self {
            cutoff_hz: shape.cutoff_range().clamp(self.cutoff_hz),
            q: shape.q_range().clamp(self.q),
            gain_db: shape.gain_range().clamp(self.gain_db),
        }
    }
}

/// Which bands are audible.
///
/// Soloing overrides every per-band bypass flag; the flags are kept so that
/// clearing the solo restores them unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    PerBandBypass { bypassed: [bool; NUM_BANDS] },
    Soloed { band: usize, saved: [bool; NUM_BANDS] },
}

impl Default for Activation {
    fn default() -> Self {
        Activation::PerBandBypass {
            bypassed: [false; NUM_BANDS],
        }
    }
}

impl Activation {
    /// Resolve into a bitmask of audible bands (bit i = band i audible)
    pub fn audible_mask(&self) -> u8 {
        match *self {
            Activation::Soloed { band, .. } => 1 << band,
            Activation::PerBandBypass { bypassed } => {
                let mut mask = 0u8;
                for (i, &off) in bypassed.iter().enumerate() {
                    if !off {
                        mask |= 1 << i;
                    }
                }
                mask
            }
        }
    }

    /// The band's own bypass flag, regardless of any active solo
    pub fn is_bypassed(&self, band: usize) -> bool {
        match *self {
            Activation::PerBandBypass { bypassed } => bypassed[band],
            Activation::Soloed { saved, .. } => saved[band],
        }
    }

    pub fn soloed_band(&self) -> Option<usize> {
        match *self {
            Activation::Soloed { band, .. } => Some(band),
            Activation::PerBandBypass { .. } => None,
        }
    }
}

/// Four-band equalizer cascade
#[derive(Debug, Clone)]
pub struct FilterChain {
    sections: [BiquadSection; NUM_BANDS],
    params: [BandParams; NUM_BANDS],
    activation: Activation,
    audible_mask: u8,
    sample_rate: f64,
}

impl FilterChain {
    pub fn new(sample_rate: f64) -> Self {
        let sr = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            DEFAULT_SAMPLE_RATE
        };

        let params = [
            BandParams::default_for(BAND_SHAPES[0]),
            BandParams::default_for(BAND_SHAPES[1]),
            BandParams::default_for(BAND_SHAPES[2]),
            BandParams::default_for(BAND_SHAPES[3]),
        ];
        let sections = std::array::from_fn(|i| {
            let p = params[i];
            BiquadSection::with_coeffs(BiquadCoeffs::design(
                BAND_SHAPES[i],
                sr,
                p.cutoff_hz,
                p.q,
                p.gain_db,
            ))
        });

        Self {
            sections,
            params,
            activation: Activation::default(),
            audible_mask: Activation::default().audible_mask(),
            sample_rate: sr,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[inline]
    pub fn band_params(&self, band: usize) -> BandParams {
        self.params[band]
    }

    #[inline]
    pub fn coeffs(&self, band: usize) -> BiquadCoeffs {
        *self.sections[band].coeffs()
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn audible_mask(&self) -> u8 {
        self.audible_mask
    }

    /// Clamp, design, and install one band's parameters.
    ///
    /// The section's delay registers are preserved; a redesign mid-stream
    /// continues the filter's history.
    pub fn set_band_params(&mut self, band: usize, params: BandParams) {
        let shape = BAND_SHAPES[band];
        let clamped = params.clamped(shape);
        let coeffs = BiquadCoeffs::design(
            shape,
            self.sample_rate,
            clamped.cutoff_hz,
            clamped.q,
            clamped.gain_db,
        );
        self.sections[band].set_coeffs(coeffs);
        self.params[band] = clamped;
        log::debug!(
            "band {band} redesigned: {:.1} Hz, Q {:.2}, {:+.1} dB",
            clamped.cutoff_hz,
            clamped.q,
            clamped.gain_db
        );
    }

    pub fn set_bypass(&mut self, band: usize, bypassed: bool) {
        match &mut self.activation {
            Activation::PerBandBypass { bypassed: flags } => flags[band] = bypassed,
            Activation::Soloed { saved, .. } => saved[band] = bypassed,
        }
        self.audible_mask = self.activation.audible_mask();
    }

    pub fn set_solo(&mut self, band: usize) {
        let saved = match self.activation {
            Activation::PerBandBypass { bypassed } => bypassed,
            Activation::Soloed { saved, .. } => saved,
        };
        self.activation = Activation::Soloed { band, saved };
        self.audible_mask = self.activation.audible_mask();
    }

    /// Drop an active solo and restore the per-band bypass flags it shadowed
    pub fn clear_solo(&mut self) {
        if let Activation::Soloed { saved, .. } = self.activation {
            self.activation = Activation::PerBandBypass { bypassed: saved };
            self.audible_mask = self.activation.audible_mask();
        }
    }

    pub fn is_bypassed(&self, band: usize) -> bool {
        self.activation.is_bypassed(band)
    }

    pub fn soloed_band(&self) -> Option<usize> {
        self.activation.soloed_band()
    }

    /// Install externally designed coefficients into one section.
    ///
    /// Audio-side path of the engine split; `params` are not touched.
    #[inline]
    pub fn install_coeffs(&mut self, band: usize, coeffs: BiquadCoeffs) {
        self.sections[band].set_coeffs(coeffs);
    }

    /// Install a full stream configuration: new rate, one coefficient set
    /// per band, all delay registers zeroed. Audio-side path of the engine
    /// split for sample-rate changes.
    pub fn configure_stream(&mut self, sample_rate: f64, coeffs: [BiquadCoeffs; NUM_BANDS]) {
        self.sample_rate = sample_rate;
        for (section, c) in self.sections.iter_mut().zip(coeffs) {
            section.set_coeffs(c);
        }
        self.reset();
    }

    /// Process a stereo block through the cascade using an explicit
    /// audible-band mask (engine path; the mask comes from an atomic)
    pub fn process_block_masked(&mut self, left: &mut [Sample], right: &mut [Sample], mask: u8) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mut out_l = *l;
            let mut out_r = *r;
            for (i, section) in self.sections.iter_mut().enumerate() {
                if mask & (1 << i) != 0 {
                    (out_l, out_r) = StereoProcessor::process_sample(section, out_l, out_r);
                }
            }
            *l = out_l;
            *r = out_r;
        }
        for section in &mut self.sections {
            section.flush_denormals();
        }
    }

    /// Process a stereo block through the cascade
    pub fn process_block(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        let mask = self.audible_mask;
        self.process_block_masked(left, right, mask);
    }
}

impl Processor for FilterChain {
    fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

impl StereoProcessor for FilterChain {
    fn process_sample(&mut self, left: Sample, right: Sample) -> (Sample, Sample) {
        let mut out_l = left;
        let mut out_r = right;
        for (i, section) in self.sections.iter_mut().enumerate() {
            if self.audible_mask & (1 << i) != 0 {
                (out_l, out_r) = StereoProcessor::process_sample(section, out_l, out_r);
            }
        }
        (out_l, out_r)
    }
}

impl ProcessorConfig for FilterChain {
    /// Re-derive every band at the new rate and reset all state.
    /// Sample-rate changes are a hard continuity boundary, not click-free.
    fn set_sample_rate(&mut self, sample_rate: f64) {
        let sr = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            DEFAULT_SAMPLE_RATE
        };
        log::info!("sample rate change: {} -> {}", self.sample_rate, sr);
        self.sample_rate = sr;
        for band in 0..NUM_BANDS {
            let p = self.params[band];
            self.sections[band].set_coeffs(BiquadCoeffs::design(
                BAND_SHAPES[band],
                sr,
                p.cutoff_hz,
                p.q,
                p.gain_db,
            ));
        }
        self.reset();
    }
}
