//! Control surface: event validation, coefficient design, curve caching
//!
//! The controller owns a mirror of the filter chain. Every mutation designs
//! coefficients into the mirror first and then hands the identical values
//! to the audio side, so response curves (computed from the mirror) can
//! never disagree with the audio path.

use std::sync::Arc;

use feq_core::{EqError, EqResult};
use feq_dsp::ProcessorConfig;
use feq_dsp::chain::{BandParams, FilterChain, NUM_BANDS};
use feq_dsp::response::{self, FrequencyGrid, MagnitudeCurve};

use crate::event::{self, ParamKind, StateKey};
use crate::sync::{EngineUpdate, SharedMask, UpdateProducer};

pub struct EqController {
    chain: FilterChain,
    grid: FrequencyGrid,
    tx: UpdateProducer,
    mask: Arc<SharedMask>,
    band_curves: [Option<MagnitudeCurve>; NUM_BANDS],
    combined_curve: Option<MagnitudeCurve>,
    pending_bands: [bool; NUM_BANDS],
    pending_stream: bool,
}

impl EqController {
    pub(crate) fn new(chain: FilterChain, tx: UpdateProducer, mask: Arc<SharedMask>) -> Self {
        Self {
            chain,
            grid: FrequencyGrid::standard(),
            tx,
            mask,
            band_curves: [None, None, None, None],
            combined_curve: None,
            pending_bands: [false; NUM_BANDS],
            pending_stream: false,
        }
    }

    fn check_band(&self, band: usize) -> EqResult<()> {
        if band < NUM_BANDS {
            Ok(())
        } else {
            Err(EqError::InvalidBandIndex(band))
        }
    }

    fn push_band_now(&mut self, band: usize) -> bool {
        self.tx.push(EngineUpdate::Band {
            band,
            coeffs: self.chain.coeffs(band),
        })
    }

    fn push_stream_now(&mut self) -> bool {
        self.tx.push(EngineUpdate::Stream {
            sample_rate: self.chain.sample_rate(),
            coeffs: std::array::from_fn(|band| self.chain.coeffs(band)),
        })
    }

    /// Re-send updates that were dropped on a full queue.
    ///
    /// Called automatically at the start of every mutation; hosts that go
    /// long stretches without control traffic can pump it directly. The
    /// mirror stays authoritative, so only the freshest values travel.
    pub fn flush_pending(&mut self) {
        if self.pending_stream {
            if !self.push_stream_now() {
                return;
            }
            self.pending_stream = false;
        }
        for band in 0..NUM_BANDS {
            if self.pending_bands[band] {
                if !self.push_band_now(band) {
                    return;
                }
                self.pending_bands[band] = false;
            }
        }
    }

    fn apply_band(&mut self, band: usize, params: BandParams) {
        self.chain.set_band_params(band, params);
        self.band_curves[band] = None;
        self.combined_curve = None;
        if !self.pending_stream && !self.push_band_now(band) {
            log::warn!("update queue full, deferring band {band} coefficients");
            self.pending_bands[band] = true;
        }
    }

    /// Set one musical parameter of one band
    pub fn set_param(&mut self, band: usize, kind: ParamKind, value: f64) -> EqResult<()> {
        self.check_band(band)?;
        self.flush_pending();
        let mut params = self.chain.band_params(band);
        match kind {
            ParamKind::Cutoff => params.cutoff_hz = value,
            ParamKind::Q => params.q = value,
            ParamKind::Gain => params.gain_db = value,
        }
        self.apply_band(band, params);
        Ok(())
    }

    /// Set all of one band's parameters at once
    pub fn set_band_params(&mut self, band: usize, params: BandParams) -> EqResult<()> {
        self.check_band(band)?;
        self.flush_pending();
        self.apply_band(band, params);
        Ok(())
    }

    pub fn set_bypass(&mut self, band: usize, bypassed: bool) -> EqResult<()> {
        self.check_band(band)?;
        self.flush_pending();
        self.chain.set_bypass(band, bypassed);
        self.mask.publish(self.chain.audible_mask());
        self.combined_curve = None;
        Ok(())
    }

    pub fn set_solo(&mut self, band: usize) -> EqResult<()> {
        self.check_band(band)?;
        self.flush_pending();
        self.chain.set_solo(band);
        self.mask.publish(self.chain.audible_mask());
        self.combined_curve = None;
        Ok(())
    }

    /// Clear an active solo, restoring the bypass flags it shadowed.
    /// When to trigger this is the caller's decision.
    pub fn clear_solo(&mut self) {
        self.flush_pending();
        self.chain.clear_solo();
        self.mask.publish(self.chain.audible_mask());
        self.combined_curve = None;
    }

    /// Change the stream sample rate. Re-derives every band and resets all
    /// filter state on the audio side at its next block; the discontinuity
    /// is expected, not smoothed.
    pub fn set_sample_rate(&mut self, sample_rate: f64) -> EqResult<()> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EqError::InvalidSampleRate(sample_rate));
        }
        self.flush_pending();
        self.chain.set_sample_rate(sample_rate);
        self.band_curves = [None, None, None, None];
        self.combined_curve = None;
        // A stream update carries all four bands; pending singles are moot
        self.pending_bands = [false; NUM_BANDS];
        if !self.push_stream_now() {
            log::warn!("update queue full, deferring stream reconfiguration");
            self.pending_stream = true;
        }
        Ok(())
    }

    pub fn band_params(&self, band: usize) -> EqResult<BandParams> {
        self.check_band(band)?;
        Ok(self.chain.band_params(band))
    }

    pub fn is_bypassed(&self, band: usize) -> EqResult<bool> {
        self.check_band(band)?;
        Ok(self.chain.is_bypassed(band))
    }

    pub fn soloed_band(&self) -> Option<usize> {
        self.chain.soloed_band()
    }

    pub fn sample_rate(&self) -> f64 {
        self.chain.sample_rate()
    }

    /// The fixed frequency grid curves are evaluated on; fetch once for
    /// axis labeling
    pub fn grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    /// Magnitude curve of one band, recomputed only after that band's
    /// coefficients changed
    pub fn band_curve(&mut self, band: usize) -> EqResult<&MagnitudeCurve> {
        self.check_band(band)?;
        let Self {
            chain,
            grid,
            band_curves,
            ..
        } = self;
        Ok(band_curves[band].get_or_insert_with(|| response::band_curve(chain, grid, band)))
    }

    /// Combined magnitude curve of the audible cascade, recomputed after
    /// any coefficient or activation change
    pub fn combined_curve(&mut self) -> &MagnitudeCurve {
        let Self {
            chain,
            grid,
            combined_curve,
            ..
        } = self;
        combined_curve.get_or_insert_with(|| response::combined_curve(chain, grid))
    }

    /// Current state as a flat list of named values, band order preserved
    pub fn snapshot(&self) -> Vec<(String, f64)> {
        let mut values = Vec::with_capacity(NUM_BANDS * 4 + 1);
        for band in 0..NUM_BANDS {
            let params = self.chain.band_params(band);
            values.push((event::param_name(band, ParamKind::Cutoff), params.cutoff_hz));
            values.push((event::param_name(band, ParamKind::Q), params.q));
            values.push((event::param_name(band, ParamKind::Gain), params.gain_db));
            values.push((
                event::bypass_name(band),
                if self.chain.is_bypassed(band) { 1.0 } else { 0.0 },
            ));
        }
        let solo = self
            .chain
            .soloed_band()
            .map(|band| band as f64)
            .unwrap_or(-1.0);
        values.push((event::SOLO_KEY.to_string(), solo));
        values
    }

    /// Replay a snapshot through the regular event API
    pub fn restore(&mut self, values: &[(String, f64)]) -> EqResult<()> {
        for (name, value) in values {
            match event::parse_name(name) {
                Some(StateKey::Param(band, kind)) => self.set_param(band, kind, *value)?,
                Some(StateKey::Bypass(band)) => self.set_bypass(band, *value != 0.0)?,
                Some(StateKey::Solo) => {
                    if *value < 0.0 {
                        self.clear_solo();
                    } else {
                        self.set_solo(value.round() as usize)?;
                    }
                }
                None => {
                    return Err(EqError::State(format!("unknown state value: {name}")));
                }
            }
        }
        Ok(())
    }
}
