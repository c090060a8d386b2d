//! Audio-context side of the engine
//!
//! One bounded drain of the update queue per block, one atomic mask load,
//! then the cascade. No allocation, no locks, no unbounded loops.

use std::sync::Arc;

use feq_core::Sample;
use feq_dsp::chain::{FilterChain, NUM_BANDS};

use crate::sync::{EngineUpdate, SharedMask, UPDATE_QUEUE_CAPACITY, UpdateConsumer};

pub struct EqProcessor {
    chain: FilterChain,
    rx: UpdateConsumer,
    mask: Arc<SharedMask>,
    block_size_hint: usize,
}

impl EqProcessor {
    pub(crate) fn new(
        chain: FilterChain,
        rx: UpdateConsumer,
        mask: Arc<SharedMask>,
        block_size_hint: usize,
    ) -> Self {
        Self {
            chain,
            rx,
            mask,
            block_size_hint,
        }
    }

    /// Install pending coefficient updates, then run the block through the
    /// cascade. Activation changes published before this call are visible
    /// to this block; later ones wait for the next (stale-by-one-block).
    pub fn process_block(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        // At most one full ring of updates per block keeps the drain bounded
        for _ in 0..UPDATE_QUEUE_CAPACITY {
            match self.rx.pop() {
                Some(EngineUpdate::Band { band, coeffs }) => {
                    if band < NUM_BANDS {
                        self.chain.install_coeffs(band, coeffs);
                    }
                }
                Some(EngineUpdate::Stream {
                    sample_rate,
                    coeffs,
                }) => {
                    self.chain.configure_stream(sample_rate, coeffs);
                }
                None => break,
            }
        }

        let mask = self.mask.load();
        self.chain.process_block_masked(left, right, mask);
    }

    pub fn sample_rate(&self) -> f64 {
        self.chain.sample_rate()
    }

    /// Block length the host said to expect; purely advisory
    pub fn block_size_hint(&self) -> usize {
        self.block_size_hint
    }

    /// Zero all filter state; stream (re)initialization only, never part
    /// of an ordinary coefficient update
    pub fn reset(&mut self) {
        use feq_dsp::Processor;
        self.chain.reset();
    }
}
