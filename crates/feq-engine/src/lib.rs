//! feq-engine: control/audio split and control surface for foureq
//!
//! The equalizer runs in two execution contexts. The audio context calls
//! [`EqProcessor::process_block`] at a fixed cadence and must never block or
//! allocate. The control context owns an [`EqController`] that translates
//! parameter and activation events into coefficient designs, hands them to
//! the audio side over a lock-free queue, and answers visualization
//! requests from its own mirror of the chain — the same designer output the
//! audio path installs, so curves and sound never drift apart.

pub mod controller;
pub mod event;
pub mod processor;
pub mod sync;

use std::sync::Arc;

use feq_core::{EqError, EqResult};
use feq_dsp::chain::FilterChain;

pub use controller::EqController;
pub use event::ParamKind;
pub use processor::EqProcessor;

/// Construct a connected controller/processor pair.
pub struct EqEngine;

impl EqEngine {
    pub fn new(sample_rate: f64, block_size_hint: usize) -> EqResult<(EqController, EqProcessor)> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EqError::InvalidSampleRate(sample_rate));
        }

        let chain = FilterChain::new(sample_rate);
        let mask = Arc::new(sync::SharedMask::new(chain.audible_mask()));
        let (tx, rx) = sync::update_queue(sync::UPDATE_QUEUE_CAPACITY);

        let controller = EqController::new(chain.clone(), tx, Arc::clone(&mask));
        let processor = EqProcessor::new(chain, rx, mask, block_size_hint);

        log::info!("eq engine created: {sample_rate} Hz, block hint {block_size_hint}");
        Ok((controller, processor))
    }
}
