//! foureq: offline driver for the four-band parametric equalizer
//!
//! Reads a WAV file, runs it through the engine exactly as a host would
//! (control events first, then block-wise audio), and writes the result.
//! Optionally dumps the response curves as JSON for plotting.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use hound::{SampleFormat, WavReader, WavWriter};

use feq_engine::{EqController, EqEngine, EqProcessor, ParamKind};

const BLOCK_SIZE: usize = 512;

#[derive(Parser)]
#[command(name = "foureq", about = "Four-band parametric equalizer (offline)")]
struct Args {
    /// Input WAV file
    input: PathBuf,

    /// Output WAV file
    output: PathBuf,

    /// Band settings as IDX:CUTOFF:Q:GAIN_DB (repeatable)
    #[arg(long = "band", value_name = "IDX:CUTOFF:Q:GAIN")]
    bands: Vec<String>,

    /// Bypass a band (repeatable)
    #[arg(long = "bypass", value_name = "IDX")]
    bypass: Vec<usize>,

    /// Solo a single band
    #[arg(long, value_name = "IDX")]
    solo: Option<usize>,

    /// Write grid frequencies and response curves as JSON
    #[arg(long, value_name = "PATH")]
    dump_response: Option<PathBuf>,
}

fn parse_band_arg(arg: &str) -> Result<(usize, f64, f64, f64)> {
    let parts: Vec<&str> = arg.split(':').collect();
    if parts.len() != 4 {
        bail!("band setting must be IDX:CUTOFF:Q:GAIN, got {arg:?}");
    }
    let band: usize = parts[0].parse().context("band index")?;
    let cutoff: f64 = parts[1].parse().context("cutoff frequency")?;
    let q: f64 = parts[2].parse().context("quality factor")?;
    let gain: f64 = parts[3].parse().context("gain")?;
    Ok((band, cutoff, q, gain))
}

fn configure(controller: &mut EqController, args: &Args) -> Result<()> {
    for band_arg in &args.bands {
        let (band, cutoff, q, gain) = parse_band_arg(band_arg)?;
        controller.set_param(band, ParamKind::Cutoff, cutoff)?;
        controller.set_param(band, ParamKind::Q, q)?;
        controller.set_param(band, ParamKind::Gain, gain)?;
    }
    for &band in &args.bypass {
        controller.set_bypass(band, true)?;
    }
    if let Some(band) = args.solo {
        controller.set_solo(band)?;
    }
    Ok(())
}

fn read_input(path: &PathBuf) -> Result<(hound::WavSpec, Vec<f64>, Vec<f64>)> {
    let mut reader = WavReader::open(path).with_context(|| format!("opening {path:?}"))?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.channels > 2 {
        bail!("only mono and stereo input is supported ({} channels)", spec.channels);
    }

    let interleaved: Vec<f64> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let (left, right) = if spec.channels == 1 {
        (interleaved.clone(), interleaved)
    } else {
        let left = interleaved.iter().step_by(2).copied().collect();
        let right = interleaved.iter().skip(1).step_by(2).copied().collect();
        (left, right)
    };
    Ok((spec, left, right))
}

fn write_output(
    path: &PathBuf,
    spec: hound::WavSpec,
    left: &[f64],
    right: &[f64],
) -> Result<()> {
    let mut writer = WavWriter::create(path, spec).with_context(|| format!("creating {path:?}"))?;
    let frames = left.iter().zip(right);
    match spec.sample_format {
        SampleFormat::Float => {
            for (&l, &r) in frames {
                writer.write_sample(l as f32)?;
                if spec.channels == 2 {
                    writer.write_sample(r as f32)?;
                }
            }
        }
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            let max = scale - 1.0;
            for (&l, &r) in frames {
                writer.write_sample((l * scale).clamp(-scale, max).round() as i32)?;
                if spec.channels == 2 {
                    writer.write_sample((r * scale).clamp(-scale, max).round() as i32)?;
                }
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

fn dump_response(controller: &mut EqController, path: &PathBuf) -> Result<()> {
    let frequencies = controller.grid().frequencies().to_vec();
    let mut bands = Vec::with_capacity(4);
    for band in 0..4 {
        bands.push(controller.band_curve(band)?.clone());
    }
    let combined = controller.combined_curve().clone();

    let doc = serde_json::json!({
        "frequencies": frequencies,
        "bands": bands,
        "combined": combined,
    });
    std::fs::write(path, serde_json::to_string_pretty(&doc)?)
        .with_context(|| format!("writing {path:?}"))?;
    Ok(())
}

fn process(processor: &mut EqProcessor, left: &mut [f64], right: &mut [f64]) {
    let len = left.len();
    let mut start = 0;
    while start < len {
        let end = (start + BLOCK_SIZE).min(len);
        processor.process_block(&mut left[start..end], &mut right[start..end]);
        start = end;
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (spec, mut left, mut right) = read_input(&args.input)?;
    log::info!(
        "{:?}: {} Hz, {} ch, {} frames",
        args.input,
        spec.sample_rate,
        spec.channels,
        left.len()
    );

    let (mut controller, mut processor) = EqEngine::new(spec.sample_rate as f64, BLOCK_SIZE)?;
    configure(&mut controller, &args)?;

    process(&mut processor, &mut left, &mut right);
    write_output(&args.output, spec, &left, &right)?;
    log::info!("wrote {:?}", args.output);

    if let Some(path) = &args.dump_response {
        dump_response(&mut controller, path)?;
        log::info!("wrote response curves to {path:?}");
    }
    Ok(())
}
