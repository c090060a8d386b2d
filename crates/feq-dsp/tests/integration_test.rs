//! DSP integration tests
//!
//! Tests the complete signal flow through the four-band cascade and checks
//! that sampled response curves agree with what the audio path actually
//! does to a signal.

use approx::assert_relative_eq;

use feq_dsp::StereoProcessor;
use feq_dsp::biquad::{BiquadCoeffs, FilterShape};
use feq_dsp::chain::{BandParams, FilterChain, NUM_BANDS};
use feq_dsp::response::{self, FrequencyGrid};

const SAMPLE_RATE: f64 = 44100.0;
const BLOCK_SIZE: usize = 256;

/// Generate test sine wave
fn generate_sine(samples: usize, freq: f64) -> Vec<f64> {
    (0..samples)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE;
            (2.0 * std::f64::consts::PI * freq * t).sin()
        })
        .collect()
}

/// Generate deterministic white noise
fn generate_noise(samples: usize) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    (0..samples)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            i.hash(&mut hasher);
            let h = hasher.finish();
            (h as f64 / u64::MAX as f64) * 2.0 - 1.0
        })
        .collect()
}

/// Check signal has no NaN or Infinity
fn is_valid_signal(signal: &[f64]) -> bool {
    signal.iter().all(|&x| x.is_finite())
}

/// Calculate RMS of signal
fn rms(signal: &[f64]) -> f64 {
    let sum: f64 = signal.iter().map(|x| x * x).sum();
    (sum / signal.len() as f64).sqrt()
}

#[test]
fn test_chain_signal_integrity_extreme_settings() {
    let mut chain = FilterChain::new(SAMPLE_RATE);
    chain.set_band_params(
        0,
        BandParams {
            cutoff_hz: 600.0,
            q: 2.0,
            gain_db: 24.0,
        },
    );
    chain.set_band_params(
        1,
        BandParams {
            cutoff_hz: 20.0,
            q: 32.0,
            gain_db: -24.0,
        },
    );
    chain.set_band_params(
        2,
        BandParams {
            cutoff_hz: 20000.0,
            q: 32.0,
            gain_db: 24.0,
        },
    );
    chain.set_band_params(
        3,
        BandParams {
            cutoff_hz: 12000.0,
            q: 0.5,
            gain_db: -24.0,
        },
    );

    let noise = generate_noise(SAMPLE_RATE as usize);
    let mut left = noise.clone();
    let mut right = noise;
    for start in (0..left.len()).step_by(BLOCK_SIZE) {
        let end = (start + BLOCK_SIZE).min(left.len());
        chain.process_block(&mut left[start..end], &mut right[start..end]);
    }

    assert!(is_valid_signal(&left));
    assert!(is_valid_signal(&right));
}

#[test]
fn test_nyquist_clamped_cutoff_survives_noise() {
    // Cutoff requested at and above Nyquist must clamp, not blow up
    let mut chain = FilterChain::new(SAMPLE_RATE);
    chain.set_band_params(
        1,
        BandParams {
            cutoff_hz: SAMPLE_RATE,
            q: 5.7,
            gain_db: 12.0,
        },
    );
    assert!(chain.coeffs(1).is_finite());

    let noise = generate_noise(SAMPLE_RATE as usize);
    let mut left = noise.clone();
    let mut right = noise;
    for start in (0..left.len()).step_by(BLOCK_SIZE) {
        let end = (start + BLOCK_SIZE).min(left.len());
        chain.process_block(&mut left[start..end], &mut right[start..end]);
    }
    assert!(is_valid_signal(&left));
    assert!(is_valid_signal(&right));
}

#[test]
fn test_unity_response_across_grid_for_all_shapes() {
    let grid = FrequencyGrid::standard();
    for shape in [
        FilterShape::LowShelf,
        FilterShape::Peaking,
        FilterShape::HighShelf,
    ] {
        let cutoffs = [
            shape.cutoff_range().min,
            shape.cutoff_range().default,
            shape.cutoff_range().max,
        ];
        let qs = [shape.q_range().min, shape.q_range().default, shape.q_range().max];
        for cutoff in cutoffs {
            for q in qs {
                let coeffs = BiquadCoeffs::design(shape, SAMPLE_RATE, cutoff, q, 0.0);
                for &freq in grid.frequencies() {
                    let mag = response::magnitude_at(&coeffs, freq, SAMPLE_RATE);
                    assert_relative_eq!(mag, 1.0, max_relative = 1e-9);
                }
            }
        }
    }
}

#[test]
fn test_combined_equals_band0_when_rest_bypassed() {
    // Stream at 44100, band 0 on defaults, everything else bypassed
    let grid = FrequencyGrid::standard();
    let mut chain = FilterChain::new(SAMPLE_RATE);
    for band in 1..NUM_BANDS {
        chain.set_bypass(band, true);
    }

    let band0 = response::band_curve(&chain, &grid, 0);
    let combined = response::combined_curve(&chain, &grid);
    for (a, b) in band0.iter().zip(&combined) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn test_six_db_peak_scenario() {
    let grid = FrequencyGrid::standard();
    let mut chain = FilterChain::new(SAMPLE_RATE);
    chain.set_band_params(
        1,
        BandParams {
            cutoff_hz: 883.9,
            q: 5.7,
            gain_db: 6.0,
        },
    );

    let idx = grid.nearest_index(883.9);
    let freq = grid.frequencies()[idx];

    let combined = response::combined_curve(&chain, &grid);
    assert!((combined[idx] - 1.995).abs() < 0.01, "got {}", combined[idx]);

    // The other bands sit at 0 dB and contribute exactly unity there
    for band in [0, 2, 3] {
        let mag = response::magnitude_at(&chain.coeffs(band), freq, SAMPLE_RATE);
        assert_relative_eq!(mag, 1.0, max_relative = 1e-9);
    }
}

#[test]
fn test_curve_agrees_with_measured_sine_gain() {
    // The displayed curve must match what the audio path does to a signal
    let mut chain = FilterChain::new(SAMPLE_RATE);
    chain.set_band_params(
        1,
        BandParams {
            cutoff_hz: 883.9,
            q: 5.7,
            gain_db: 6.0,
        },
    );

    let input = generate_sine(SAMPLE_RATE as usize, 883.9);
    let mut left = input.clone();
    let mut right = input.clone();
    for start in (0..left.len()).step_by(BLOCK_SIZE) {
        let end = (start + BLOCK_SIZE).min(left.len());
        chain.process_block(&mut left[start..end], &mut right[start..end]);
    }

    // Skip the settle-in transient before measuring
    let tail = SAMPLE_RATE as usize / 4;
    let measured = rms(&left[tail..]) / rms(&input[tail..]);
    let predicted = response::magnitude_at(&chain.coeffs(1), 883.9, SAMPLE_RATE);
    assert_relative_eq!(measured, predicted, max_relative = 0.01);
}

#[test]
fn test_block_size_does_not_change_output() {
    let make_chain = || {
        let mut chain = FilterChain::new(SAMPLE_RATE);
        chain.set_band_params(
            3,
            BandParams {
                cutoff_hz: 6000.0,
                q: 0.62,
                gain_db: -9.0,
            },
        );
        chain
    };

    let input = generate_sine(4096, 2000.0);
    let mut small_l = input.clone();
    let mut small_r = input.clone();
    let mut big_l = input.clone();
    let mut big_r = input;

    let mut chain_small = make_chain();
    for start in (0..small_l.len()).step_by(64) {
        let end = start + 64;
        chain_small.process_block(&mut small_l[start..end], &mut small_r[start..end]);
    }
    let mut chain_big = make_chain();
    chain_big.process_block(&mut big_l, &mut big_r);

    for (a, b) in small_l.iter().zip(&big_l) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
    for (a, b) in small_r.iter().zip(&big_r) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn test_stereo_channels_filtered_identically() {
    let mut chain = FilterChain::new(SAMPLE_RATE);
    chain.set_band_params(
        0,
        BandParams {
            cutoff_hz: 134.2,
            q: 0.62,
            gain_db: 6.0,
        },
    );

    let input = generate_noise(8192);
    let mut left = input.clone();
    let mut right = input;
    chain.process_block(&mut left, &mut right);
    for (l, r) in left.iter().zip(&right) {
        assert_eq!(l.to_bits(), r.to_bits());
    }
}

#[test]
fn test_process_sample_matches_block_path() {
    let mut block_chain = FilterChain::new(SAMPLE_RATE);
    let mut sample_chain = FilterChain::new(SAMPLE_RATE);
    for chain in [&mut block_chain, &mut sample_chain] {
        chain.set_band_params(
            2,
            BandParams {
                cutoff_hz: 2500.0,
                q: 3.0,
                gain_db: 4.0,
            },
        );
    }

    let input = generate_sine(512, 2500.0);
    let mut left = input.clone();
    let mut right = input.clone();
    block_chain.process_block(&mut left, &mut right);

    for (i, &x) in input.iter().enumerate() {
        let (l, r) = StereoProcessor::process_sample(&mut sample_chain, x, x);
        assert_eq!(l.to_bits(), left[i].to_bits());
        assert_eq!(r.to_bits(), right[i].to_bits());
    }
}
